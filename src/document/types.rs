//! Core document types.

use std::collections::BTreeSet;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// Inline formatting mark carried by text nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Mark {
    Bold,
    Italic,
    Underline,
    Strike,
    Code,
}

impl Mark {
    /// All marks in canonical (serialization) order.
    pub const ALL: [Self; 5] = [
        Self::Bold,
        Self::Italic,
        Self::Underline,
        Self::Strike,
        Self::Code,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Bold => "bold",
            Self::Italic => "italic",
            Self::Underline => "underline",
            Self::Strike => "strike",
            Self::Code => "code",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|mark| mark.name() == name)
    }
}

/// Ordered set of marks; iteration follows [`Mark::ALL`].
pub type MarkSet = BTreeSet<Mark>;

/// Horizontal alignment of a text block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

impl TextAlign {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Center => "center",
            Self::Right => "right",
            Self::Justify => "justify",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" => Some(Self::Left),
            "center" => Some(Self::Center),
            "right" => Some(Self::Right),
            "justify" => Some(Self::Justify),
            _ => None,
        }
    }
}

static HEX_COLOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^#(?:[0-9a-f]{3}|[0-9a-f]{4}|[0-9a-f]{6}|[0-9a-f]{8})$")
        .expect("hex color pattern is valid")
});

static FUNCTIONAL_COLOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:rgb|rgba|hsl|hsla)\(\s*[0-9.]+%?\s*(?:,\s*[0-9.]+%?\s*){2,3}\)$")
        .expect("functional color pattern is valid")
});

static NAMED_COLOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z]{3,20}$").expect("named color pattern is valid"));

/// A validated CSS color value.
///
/// Only hex, `rgb()`/`rgba()`/`hsl()`/`hsla()` and bare color names are
/// accepted, so a color can never carry a style delimiter into serialized
/// markup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Color(String);

impl Color {
    /// Parse and normalize a color string (trimmed, lowercase).
    pub fn parse(input: &str) -> Option<Self> {
        let value = input.trim().to_ascii_lowercase();
        if HEX_COLOR.is_match(&value)
            || FUNCTIONAL_COLOR.is_match(&value)
            || NAMED_COLOR.is_match(&value)
        {
            Some(Self(value))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Resolve to an RGB triple where possible (hex, `rgb()`, common names).
    pub fn to_rgb(&self) -> Option<(u8, u8, u8)> {
        let value = self.0.as_str();
        if let Some(hex) = value.strip_prefix('#') {
            return hex_to_rgb(hex);
        }
        if let Some(args) = value
            .strip_prefix("rgba(")
            .or_else(|| value.strip_prefix("rgb("))
        {
            let mut parts = args.trim_end_matches(')').split(',').map(parse_channel);
            return Some((parts.next()??, parts.next()??, parts.next()??));
        }
        named_to_rgb(value)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn hex_to_rgb(hex: &str) -> Option<(u8, u8, u8)> {
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();
    match hex.len() {
        3 | 4 => {
            let expand = |i: usize| channel(&hex[i..=i].repeat(2));
            Some((expand(0)?, expand(1)?, expand(2)?))
        }
        6 | 8 => Some((channel(&hex[0..2])?, channel(&hex[2..4])?, channel(&hex[4..6])?)),
        _ => None,
    }
}

fn parse_channel(raw: &str) -> Option<u8> {
    let raw = raw.trim();
    if let Some(pct) = raw.strip_suffix('%') {
        let pct: f32 = pct.parse().ok()?;
        // Clamped to 0..=255 before the cast
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        return Some((pct.clamp(0.0, 100.0) * 2.55).round() as u8);
    }
    let value: f32 = raw.parse().ok()?;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    Some(value.clamp(0.0, 255.0).round() as u8)
}

fn named_to_rgb(name: &str) -> Option<(u8, u8, u8)> {
    let rgb = match name {
        "black" => (0, 0, 0),
        "white" => (255, 255, 255),
        "red" => (255, 0, 0),
        "green" => (0, 128, 0),
        "blue" => (0, 0, 255),
        "yellow" => (255, 255, 0),
        "orange" => (255, 165, 0),
        "purple" => (128, 0, 128),
        "gray" | "grey" => (128, 128, 128),
        "silver" => (192, 192, 192),
        "navy" => (0, 0, 128),
        "teal" => (0, 128, 128),
        _ => return None,
    };
    Some(rgb)
}

/// Node-local style attributes.
///
/// `text_align` and `background_color` belong to text blocks; `color` and
/// `marks` belong to text nodes. Normalization clears whatever a node kind
/// does not carry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Attrs {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_align: Option<TextAlign>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_color: Option<Color>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub marks: MarkSet,
}

impl Attrs {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Keep only the attributes a text node may carry.
    pub(crate) fn text_only(&self) -> Self {
        Self {
            color: self.color.clone(),
            marks: self.marks.clone(),
            ..Self::default()
        }
    }

    /// Keep only the attributes a text block may carry.
    pub(crate) fn block_only(&self) -> Self {
        Self {
            text_align: self.text_align,
            background_color: self.background_color.clone(),
            ..Self::default()
        }
    }
}

/// A block-level attribute assignment; `None` clears the attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockAttr {
    TextAlign(Option<TextAlign>),
    BackgroundColor(Option<Color>),
}

impl BlockAttr {
    pub(crate) fn apply(&self, attrs: &mut Attrs) {
        match self {
            Self::TextAlign(align) => attrs.text_align = *align,
            Self::BackgroundColor(color) => attrs.background_color.clone_from(color),
        }
    }
}

/// List flavor used by list commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ListKind {
    Bullet,
    Ordered,
}

impl ListKind {
    pub const fn node_kind(self) -> NodeKind {
        match self {
            Self::Bullet => NodeKind::BulletList,
            Self::Ordered => NodeKind::OrderedList,
        }
    }
}

/// The tagged variant of a document node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum NodeKind {
    Doc,
    Paragraph,
    Heading { level: u8 },
    BulletList,
    OrderedList,
    ListItem,
    Blockquote,
    CodeBlock,
    HorizontalRule,
    Text { text: String },
    HardBreak,
    Image { src: String, alt: Option<String> },
    Link { href: String },
}

impl NodeKind {
    pub const fn is_inline(&self) -> bool {
        matches!(
            self,
            Self::Text { .. } | Self::HardBreak | Self::Image { .. } | Self::Link { .. }
        )
    }

    pub const fn is_block(&self) -> bool {
        !self.is_inline() && !matches!(self, Self::Doc)
    }

    /// Blocks whose children are inline content (or plain text for code).
    pub const fn is_textblock(&self) -> bool {
        matches!(self, Self::Paragraph | Self::Heading { .. } | Self::CodeBlock)
    }

    /// Blocks that occupy cursor positions.
    pub const fn is_leaf_block(&self) -> bool {
        self.is_textblock() || matches!(self, Self::HorizontalRule)
    }

    pub const fn is_list(&self) -> bool {
        matches!(self, Self::BulletList | Self::OrderedList)
    }

    pub const fn list_kind(&self) -> Option<ListKind> {
        match self {
            Self::BulletList => Some(ListKind::Bullet),
            Self::OrderedList => Some(ListKind::Ordered),
            _ => None,
        }
    }

    /// Whether a node of `child` kind may appear directly under this kind.
    pub const fn can_contain(&self, child: &Self) -> bool {
        match self {
            Self::Doc | Self::Blockquote | Self::ListItem => {
                child.is_block() && !matches!(child, Self::ListItem)
            }
            Self::BulletList | Self::OrderedList => matches!(child, Self::ListItem),
            Self::Paragraph | Self::Heading { .. } => child.is_inline(),
            Self::CodeBlock | Self::Link { .. } => matches!(child, Self::Text { .. }),
            Self::HorizontalRule
            | Self::Text { .. }
            | Self::HardBreak
            | Self::Image { .. } => false,
        }
    }
}

/// A node of the document tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Node {
    #[serde(flatten)]
    pub kind: NodeKind,
    #[serde(skip_serializing_if = "Attrs::is_empty")]
    pub attrs: Attrs,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Self>,
}

impl Node {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            attrs: Attrs::default(),
            children: Vec::new(),
        }
    }

    pub fn with_children(kind: NodeKind, children: Vec<Self>) -> Self {
        Self {
            kind,
            attrs: Attrs::default(),
            children,
        }
    }

    #[must_use]
    pub fn with_attrs(mut self, attrs: Attrs) -> Self {
        self.attrs = attrs;
        self
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new(NodeKind::Text { text: text.into() })
    }

    pub fn paragraph(children: Vec<Self>) -> Self {
        Self::with_children(NodeKind::Paragraph, children)
    }

    pub fn heading(level: u8, children: Vec<Self>) -> Self {
        Self::with_children(NodeKind::Heading { level }, children)
    }

    /// Plain text of this subtree; hard breaks become `\n`.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match &self.kind {
            NodeKind::Text { text } => out.push_str(text),
            NodeKind::HardBreak => out.push('\n'),
            _ => {
                for child in &self.children {
                    child.collect_text(out);
                }
            }
        }
    }
}

/// Errors raised by document operations.
///
/// Operations are all-or-nothing: when one of these is returned the
/// document is unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    #[error("position {pos} is outside the document (size {size})")]
    OutOfRange { pos: usize, size: usize },
    #[error("rejected: {0}")]
    Rejected(&'static str),
    #[error("invalid structure at {path:?}: {reason}")]
    Invalid { path: Vec<usize>, reason: String },
}

/// A rich-text document: a single `Doc` root holding block nodes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Document {
    root: Node,
}

impl Document {
    /// Create an empty document (a single empty paragraph).
    pub fn empty() -> Self {
        Self {
            root: Node::with_children(NodeKind::Doc, vec![Node::paragraph(Vec::new())]),
        }
    }

    /// Build a document from block nodes, normalizing the result.
    pub fn from_blocks(blocks: Vec<Node>) -> Self {
        let mut doc = Self {
            root: Node::with_children(NodeKind::Doc, blocks),
        };
        doc.normalize();
        doc
    }

    pub const fn root(&self) -> &Node {
        &self.root
    }

    pub(crate) const fn root_mut(&mut self) -> &mut Node {
        &mut self.root
    }

    /// Top-level blocks.
    pub fn blocks(&self) -> &[Node] {
        &self.root.children
    }

    /// True when the document is a single empty, unstyled paragraph.
    pub fn is_empty(&self) -> bool {
        match self.root.children.as_slice() {
            [only] => {
                only.kind == NodeKind::Paragraph
                    && only.children.is_empty()
                    && only.attrs.is_empty()
            }
            _ => false,
        }
    }

    pub fn text_content(&self) -> String {
        self.root
            .children
            .iter()
            .map(Node::text_content)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Check every structural invariant of the tree.
    ///
    /// # Errors
    /// Returns [`ModelError::Invalid`] naming the first offending node.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.root.kind != NodeKind::Doc {
            return Err(invalid(&[], "root is not a doc node"));
        }
        if self.root.children.is_empty() {
            return Err(invalid(&[], "document has no blocks"));
        }
        let mut path = Vec::new();
        validate_children(&self.root, &mut path)
    }
}

fn invalid(path: &[usize], reason: impl Into<String>) -> ModelError {
    ModelError::Invalid {
        path: path.to_vec(),
        reason: reason.into(),
    }
}

fn validate_children(node: &Node, path: &mut Vec<usize>) -> Result<(), ModelError> {
    let needs_content = matches!(
        node.kind,
        NodeKind::BulletList | NodeKind::OrderedList | NodeKind::ListItem | NodeKind::Blockquote
    );
    if needs_content && node.children.is_empty() {
        return Err(invalid(path, format!("empty {:?}", node.kind)));
    }
    let in_code = node.kind == NodeKind::CodeBlock;
    let mut previous: Option<&Node> = None;
    for (idx, child) in node.children.iter().enumerate() {
        path.push(idx);
        if !node.kind.can_contain(&child.kind) {
            return Err(invalid(
                path,
                format!("{:?} cannot contain {:?}", node.kind, child.kind),
            ));
        }
        if let NodeKind::Text { text } = &child.kind {
            if text.is_empty() {
                return Err(invalid(path, "empty text node"));
            }
            if in_code && !child.attrs.is_empty() {
                return Err(invalid(path, "styled text inside code block"));
            }
            if let Some(prev) = previous
                && matches!(prev.kind, NodeKind::Text { .. })
                && prev.attrs == child.attrs
            {
                return Err(invalid(path, "adjacent text nodes were not merged"));
            }
        }
        validate_children(child, path)?;
        path.pop();
        previous = Some(child);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_has_one_paragraph() {
        let doc = Document::empty();
        assert!(doc.is_empty());
        assert_eq!(doc.blocks().len(), 1);
        assert!(doc.validate().is_ok());
    }

    #[test]
    fn test_color_parse_accepts_common_forms() {
        assert_eq!(Color::parse(" #FF00aa ").unwrap().as_str(), "#ff00aa");
        assert!(Color::parse("#abc").is_some());
        assert!(Color::parse("rgb(10, 20, 30)").is_some());
        assert!(Color::parse("rgba(10,20,30,0.5)").is_some());
        assert!(Color::parse("rebeccapurple").is_some());
    }

    #[test]
    fn test_color_parse_rejects_injection() {
        assert!(Color::parse("red; position: fixed").is_none());
        assert!(Color::parse("\"><script>").is_none());
        assert!(Color::parse("url(x)").is_none());
        assert!(Color::parse("").is_none());
    }

    #[test]
    fn test_color_to_rgb() {
        assert_eq!(Color::parse("#f00").unwrap().to_rgb(), Some((255, 0, 0)));
        assert_eq!(
            Color::parse("#102030").unwrap().to_rgb(),
            Some((0x10, 0x20, 0x30))
        );
        assert_eq!(
            Color::parse("rgb(1, 2, 3)").unwrap().to_rgb(),
            Some((1, 2, 3))
        );
        assert_eq!(Color::parse("white").unwrap().to_rgb(), Some((255, 255, 255)));
        assert_eq!(Color::parse("hsl(0, 50%, 50%)").unwrap().to_rgb(), None);
    }

    #[test]
    fn test_list_item_only_inside_lists() {
        assert!(NodeKind::BulletList.can_contain(&NodeKind::ListItem));
        assert!(!NodeKind::Doc.can_contain(&NodeKind::ListItem));
        assert!(!NodeKind::Blockquote.can_contain(&NodeKind::ListItem));
        assert!(!NodeKind::BulletList.can_contain(&NodeKind::Paragraph));
    }

    #[test]
    fn test_code_block_contains_only_text() {
        assert!(NodeKind::CodeBlock.can_contain(&NodeKind::Text {
            text: "x".to_string()
        }));
        assert!(!NodeKind::CodeBlock.can_contain(&NodeKind::HardBreak));
    }

    #[test]
    fn test_validate_rejects_unmerged_text() {
        let doc = Document {
            root: Node::with_children(
                NodeKind::Doc,
                vec![Node::paragraph(vec![Node::text("a"), Node::text("b")])],
            ),
        };
        assert!(matches!(doc.validate(), Err(ModelError::Invalid { .. })));
    }

    #[test]
    fn test_validate_rejects_empty_list() {
        let doc = Document {
            root: Node::with_children(NodeKind::Doc, vec![Node::new(NodeKind::BulletList)]),
        };
        assert!(doc.validate().is_err());
    }

    #[test]
    fn test_mark_names_round_trip() {
        for mark in Mark::ALL {
            assert_eq!(Mark::from_name(mark.name()), Some(mark));
        }
        assert_eq!(Mark::from_name("blink"), None);
    }
}
