//! Document to visual tree.
//!
//! The read-only storefront view and the editor surface go through the same
//! attribute-to-style mapping ([`block_style`], [`span_style`]); only the
//! editable mode carries selection and toolbar state.

use serde::Serialize;

use crate::document::{Attrs, Color, Document, Mark, Node, NodeKind, Selection, TextAlign};
use crate::editor::ToolbarState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderMode {
    ReadOnly,
    Editable(Interaction),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Interaction {
    pub selection: Option<Selection>,
    pub toolbar: ToolbarState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VisualTree {
    pub blocks: Vec<VisualBlock>,
    pub interaction: Option<Interaction>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum VisualBlock {
    Text {
        role: TextRole,
        style: BlockStyle,
        spans: Vec<VisualSpan>,
        /// First cursor position inside the block.
        start: usize,
    },
    List {
        ordered: bool,
        items: Vec<Vec<VisualBlock>>,
    },
    Quote {
        blocks: Vec<VisualBlock>,
    },
    Rule {
        start: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TextRole {
    Paragraph,
    Heading(u8),
    Code,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockStyle {
    pub align: TextAlign,
    pub background: Option<Color>,
    pub monospace: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualSpan {
    pub content: SpanContent,
    pub style: SpanStyle,
    pub link: Option<String>,
}

impl VisualSpan {
    /// Positions the span occupies.
    pub fn len(&self) -> usize {
        match &self.content {
            SpanContent::Text(text) => text.chars().count(),
            SpanContent::Break | SpanContent::Image { .. } => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SpanContent {
    Text(String),
    Break,
    Image { src: String, alt: Option<String> },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SpanStyle {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strike: bool,
    pub code: bool,
    pub color: Option<Color>,
}

/// Style for a text block of `kind`.
pub fn block_style(kind: &NodeKind, attrs: &Attrs) -> BlockStyle {
    BlockStyle {
        align: attrs.text_align.unwrap_or_default(),
        background: attrs.background_color.clone(),
        monospace: matches!(kind, NodeKind::CodeBlock),
    }
}

/// Style for a run of text.
pub fn span_style(attrs: &Attrs) -> SpanStyle {
    SpanStyle {
        bold: attrs.marks.contains(&Mark::Bold),
        italic: attrs.marks.contains(&Mark::Italic),
        underline: attrs.marks.contains(&Mark::Underline),
        strike: attrs.marks.contains(&Mark::Strike),
        code: attrs.marks.contains(&Mark::Code),
        color: attrs.color.clone(),
    }
}

pub fn render(doc: &Document, mode: RenderMode) -> VisualTree {
    let mut pos = 0;
    let blocks = render_blocks(doc.blocks(), &mut pos);
    VisualTree {
        blocks,
        interaction: match mode {
            RenderMode::ReadOnly => None,
            RenderMode::Editable(interaction) => Some(interaction),
        },
    }
}

/// The storefront view.
pub fn render_read_only(doc: &Document) -> VisualTree {
    render(doc, RenderMode::ReadOnly)
}

fn render_blocks(nodes: &[Node], pos: &mut usize) -> Vec<VisualBlock> {
    nodes.iter().filter_map(|node| render_block(node, pos)).collect()
}

fn render_block(node: &Node, pos: &mut usize) -> Option<VisualBlock> {
    let block = match &node.kind {
        NodeKind::Paragraph | NodeKind::Heading { .. } | NodeKind::CodeBlock => {
            let role = match node.kind {
                NodeKind::Heading { level } => TextRole::Heading(level),
                NodeKind::CodeBlock => TextRole::Code,
                _ => TextRole::Paragraph,
            };
            let mut spans = Vec::new();
            collect_spans(&node.children, None, &mut spans);
            let start = *pos;
            *pos += spans.iter().map(VisualSpan::len).sum::<usize>() + 1;
            VisualBlock::Text {
                role,
                style: block_style(&node.kind, &node.attrs),
                spans,
                start,
            }
        }
        NodeKind::HorizontalRule => {
            let start = *pos;
            *pos += 1;
            VisualBlock::Rule { start }
        }
        NodeKind::BulletList | NodeKind::OrderedList => VisualBlock::List {
            ordered: node.kind == NodeKind::OrderedList,
            items: node
                .children
                .iter()
                .map(|item| render_blocks(&item.children, pos))
                .collect(),
        },
        NodeKind::Blockquote => VisualBlock::Quote {
            blocks: render_blocks(&node.children, pos),
        },
        // Normalized documents never hold these at block level.
        NodeKind::Doc
        | NodeKind::ListItem
        | NodeKind::Text { .. }
        | NodeKind::HardBreak
        | NodeKind::Image { .. }
        | NodeKind::Link { .. } => return None,
    };
    Some(block)
}

fn collect_spans(nodes: &[Node], link: Option<&str>, out: &mut Vec<VisualSpan>) {
    for node in nodes {
        let content = match &node.kind {
            NodeKind::Text { text } => SpanContent::Text(text.clone()),
            NodeKind::HardBreak => SpanContent::Break,
            NodeKind::Image { src, alt } => SpanContent::Image {
                src: src.clone(),
                alt: alt.clone(),
            },
            NodeKind::Link { href } => {
                collect_spans(&node.children, Some(href), out);
                continue;
            }
            _ => continue,
        };
        out.push(VisualSpan {
            content,
            style: span_style(&node.attrs),
            link: link.map(str::to_string),
        });
    }
}

/// Plain-text rendering, one line per text block.
pub fn plain_text(tree: &VisualTree) -> String {
    let mut lines = Vec::new();
    plain_blocks(&tree.blocks, "", &mut lines);
    lines.join("\n")
}

fn plain_blocks(blocks: &[VisualBlock], indent: &str, lines: &mut Vec<String>) {
    for block in blocks {
        match block {
            VisualBlock::Text { spans, .. } => {
                let mut line = indent.to_string();
                for span in spans {
                    match &span.content {
                        SpanContent::Text(text) => line.push_str(text),
                        SpanContent::Break => {
                            lines.push(std::mem::replace(&mut line, indent.to_string()));
                        }
                        SpanContent::Image { alt, .. } => {
                            line.push_str(&format!("[image: {}]", alt.as_deref().unwrap_or("")));
                        }
                    }
                }
                lines.push(line);
            }
            VisualBlock::List { ordered, items } => {
                for (idx, item) in items.iter().enumerate() {
                    let marker = if *ordered {
                        format!("{}. ", idx + 1)
                    } else {
                        "- ".to_string()
                    };
                    let mut item_lines = Vec::new();
                    plain_blocks(item, "", &mut item_lines);
                    for (n, line) in item_lines.into_iter().enumerate() {
                        let lead = if n == 0 {
                            marker.clone()
                        } else {
                            " ".repeat(marker.len())
                        };
                        lines.push(format!("{indent}{lead}{line}"));
                    }
                }
            }
            VisualBlock::Quote { blocks } => {
                plain_blocks(blocks, &format!("{indent}> "), lines);
            }
            VisualBlock::Rule { .. } => lines.push(format!("{indent}---")),
        }
    }
}
