//! Markup to document.
//!
//! Parsing never fails. Input goes through three passes: a tokenizer that
//! survives stray `<` and truncated tags, a forgiving tree builder that
//! closes what the author forgot, and a converter that maps elements onto
//! node kinds. Whatever had to be repaired is reported as [`Recovery`]
//! entries and logged at debug level.

use std::mem;

use tracing::debug;

use super::inline::{build_inline, Segment};
use super::types::{Attrs, Color, Document, Mark, Node, NodeKind, TextAlign};

/// Tuning for [`parse_with_report`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Deeper headings are coerced to this level.
    pub max_heading_level: u8,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_heading_level: 6,
        }
    }
}

/// A repair made while reading malformed markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recovery {
    StrayClosingTag(String),
    UnclosedTag(String),
    TruncatedTag,
    UnknownTag(String),
    DroppedElement(String),
}

/// Parse markup into a normalized document.
pub fn deserialize(input: &str) -> Document {
    parse_with_report(input, &ParseOptions::default()).0
}

/// Parse markup, also returning the repairs that were needed.
pub fn parse_with_report(input: &str, options: &ParseOptions) -> (Document, Vec<Recovery>) {
    let mut report = Vec::new();
    let input = input.replace("\r\n", "\n").replace('\r', "\n");
    let tokens = tokenize(&input, &mut report);
    let root = build_tree(tokens, &mut report);
    let blocks = Converter {
        options,
        report: &mut report,
    }
    .blocks(&root.children);
    for recovery in &report {
        debug!(?recovery, "recovered malformed markup");
    }
    (Document::from_blocks(blocks), report)
}

impl Document {
    pub fn from_html(input: &str) -> Self {
        deserialize(input)
    }
}

// Tokenizer

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Open {
        name: String,
        attrs: Vec<(String, String)>,
        self_closing: bool,
    },
    Close(String),
    Text(String),
}

fn tokenize(input: &str, report: &mut Vec<Recovery>) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut text = String::new();
    let mut rest = input;
    while let Some(lt) = rest.find('<') {
        text.push_str(&rest[..lt]);
        let tail = &rest[lt..];
        if let Some(body) = tail.strip_prefix("<!--") {
            rest = body.find("-->").map_or("", |end| &body[end + 3..]);
            continue;
        }
        let starts_tag = tail[1..]
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || matches!(c, '/' | '!' | '?'));
        if !starts_tag {
            text.push('<');
            rest = &tail[1..];
            continue;
        }
        let Some(gt) = find_tag_end(tail) else {
            report.push(Recovery::TruncatedTag);
            rest = "";
            break;
        };
        flush_text(&mut text, &mut tokens);
        let inner = &tail[1..gt];
        rest = &tail[gt + 1..];
        if inner.starts_with(['!', '?']) {
            continue;
        }
        if let Some(name) = inner.strip_prefix('/') {
            tokens.push(Token::Close(tag_name(name)));
        } else {
            tokens.push(parse_open_tag(inner));
        }
    }
    text.push_str(rest);
    flush_text(&mut text, &mut tokens);
    tokens
}

fn flush_text(text: &mut String, tokens: &mut Vec<Token>) {
    if !text.is_empty() {
        tokens.push(Token::Text(decode_entities(&mem::take(text))));
    }
}

/// Byte index of the `>` ending the tag at the start of `tail`, skipping
/// quoted attribute values.
fn find_tag_end(tail: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (idx, c) in tail.char_indices().skip(1) {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '>') => return Some(idx),
            (None, _) => {}
        }
    }
    None
}

fn tag_name(raw: &str) -> String {
    raw.trim()
        .chars()
        .take_while(|c| !c.is_whitespace() && *c != '/')
        .collect::<String>()
        .to_ascii_lowercase()
}

fn parse_open_tag(inner: &str) -> Token {
    let trimmed = inner.trim_end();
    let self_closing = trimmed.ends_with('/');
    let body = trimmed.trim_end_matches('/');
    let name = tag_name(body);
    let attrs = parse_attrs(&body[name.len().min(body.len())..]);
    Token::Open {
        name,
        attrs,
        self_closing,
    }
}

fn parse_attrs(raw: &str) -> Vec<(String, String)> {
    let mut attrs = Vec::new();
    let mut chars = raw.chars().peekable();
    loop {
        while chars.next_if(|c| c.is_whitespace() || *c == '/').is_some() {}
        let mut name = String::new();
        while let Some(c) = chars.next_if(|c| !c.is_whitespace() && !matches!(c, '=' | '/')) {
            name.push(c);
        }
        if name.is_empty() {
            if chars.next().is_none() {
                break;
            }
            continue;
        }
        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        let mut value = String::new();
        if chars.next_if_eq(&'=').is_some() {
            while chars.next_if(|c| c.is_whitespace()).is_some() {}
            if let Some(quote) = chars.next_if(|c| matches!(c, '"' | '\'')) {
                for c in chars.by_ref() {
                    if c == quote {
                        break;
                    }
                    value.push(c);
                }
            } else {
                while let Some(c) = chars.next_if(|c| !c.is_whitespace()) {
                    value.push(c);
                }
            }
        }
        attrs.push((name.to_ascii_lowercase(), decode_entities(&value)));
    }
    attrs
}

fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let decoded = tail[1..]
            .find(';')
            .filter(|end| *end <= 10)
            .and_then(|end| decode_entity(&tail[1..=end]).map(|c| (c, end)));
        match decoded {
            Some((c, end)) => {
                out.push(c);
                rest = &tail[end + 2..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let number = name.strip_prefix('#')?;
            let code = match number.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => number.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}

// Tree builder

const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Elements whose whole content is discarded.
const DROPPED_TAGS: &[&str] = &["script", "style", "head", "title", "template", "svg"];

/// Opening one of these closes an open paragraph or heading.
const PARAGRAPH_CLOSERS: &[&str] = &[
    "p", "h1", "h2", "h3", "h4", "h5", "h6", "ul", "ol", "li", "blockquote", "pre", "hr", "div",
    "table", "section", "article", "header", "footer", "figure", "nav", "aside", "main", "form",
    "dl", "fieldset", "details", "address",
];

const TEXT_BLOCK_TAGS: &[&str] = &["p", "h1", "h2", "h3", "h4", "h5", "h6"];

/// Elements that end the search for an open paragraph.
const SCOPE_TAGS: &[&str] = &["li", "blockquote", "ul", "ol", "td", "th", "div"];

#[derive(Debug, Default)]
struct Element {
    name: String,
    attrs: Vec<(String, String)>,
    children: Vec<Dom>,
}

impl Element {
    fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }

    fn style(&self, key: &str) -> Option<&str> {
        self.attr("style")?.split(';').find_map(|decl| {
            let (name, value) = decl.split_once(':')?;
            name.trim().eq_ignore_ascii_case(key).then_some(value.trim())
        })
    }
}

#[derive(Debug)]
enum Dom {
    Element(Element),
    Text(String),
}

fn build_tree(tokens: Vec<Token>, report: &mut Vec<Recovery>) -> Element {
    let mut stack = vec![Element::default()];
    let mut skipping: Option<(String, usize)> = None;
    for token in tokens {
        if let Some((name, depth)) = skipping.as_mut() {
            let finished = match &token {
                Token::Open {
                    name: open,
                    self_closing: false,
                    ..
                } if open.as_str() == name.as_str() => {
                    *depth += 1;
                    false
                }
                Token::Close(close) if close.as_str() == name.as_str() => {
                    if *depth == 0 {
                        true
                    } else {
                        *depth -= 1;
                        false
                    }
                }
                _ => false,
            };
            if finished {
                skipping = None;
            }
            continue;
        }
        match token {
            Token::Open {
                name,
                attrs,
                self_closing,
            } => {
                if DROPPED_TAGS.contains(&name.as_str()) {
                    report.push(Recovery::DroppedElement(name.clone()));
                    if !self_closing {
                        skipping = Some((name, 0));
                    }
                    continue;
                }
                if PARAGRAPH_CLOSERS.contains(&name.as_str()) {
                    close_open_text_block(&mut stack, report);
                }
                if name == "li" {
                    close_open_item(&mut stack, report);
                }
                let void = self_closing || VOID_TAGS.contains(&name.as_str());
                let element = Element {
                    name,
                    attrs,
                    children: Vec::new(),
                };
                if void {
                    top(&mut stack).children.push(Dom::Element(element));
                } else {
                    stack.push(element);
                }
            }
            Token::Close(name) => match stack.iter().rposition(|el| el.name == name) {
                Some(idx) if idx > 0 => close_down_to(&mut stack, idx, report),
                _ => {
                    if !VOID_TAGS.contains(&name.as_str()) {
                        report.push(Recovery::StrayClosingTag(name));
                    }
                }
            },
            Token::Text(text) => top(&mut stack).children.push(Dom::Text(text)),
        }
    }
    if let Some((name, _)) = skipping {
        report.push(Recovery::UnclosedTag(name));
    }
    close_all(&mut stack, report);
    stack.pop().unwrap_or_default()
}

fn top(stack: &mut [Element]) -> &mut Element {
    // The root element is never popped.
    let last = stack.len() - 1;
    &mut stack[last]
}

/// Close the element at `idx` and everything above it. Elements above
/// `idx` were left open by the author.
fn close_down_to(stack: &mut Vec<Element>, idx: usize, report: &mut Vec<Recovery>) {
    let idx = idx.max(1);
    while stack.len() > idx {
        let Some(element) = stack.pop() else {
            break;
        };
        if stack.len() > idx {
            note_unclosed(&element, report);
        }
        top(stack).children.push(Dom::Element(element));
    }
}

fn close_all(stack: &mut Vec<Element>, report: &mut Vec<Recovery>) {
    while stack.len() > 1 {
        let Some(element) = stack.pop() else {
            break;
        };
        note_unclosed(&element, report);
        top(stack).children.push(Dom::Element(element));
    }
}

fn note_unclosed(element: &Element, report: &mut Vec<Recovery>) {
    // Paragraphs and list items close implicitly in HTML.
    if !matches!(element.name.as_str(), "p" | "li") {
        report.push(Recovery::UnclosedTag(element.name.clone()));
    }
}

fn close_open_text_block(stack: &mut Vec<Element>, report: &mut Vec<Recovery>) {
    for idx in (1..stack.len()).rev() {
        let name = stack[idx].name.as_str();
        if TEXT_BLOCK_TAGS.contains(&name) {
            close_down_to(stack, idx, report);
            return;
        }
        if SCOPE_TAGS.contains(&name) {
            return;
        }
    }
}

fn close_open_item(stack: &mut Vec<Element>, report: &mut Vec<Recovery>) {
    for idx in (1..stack.len()).rev() {
        match stack[idx].name.as_str() {
            "li" => {
                close_down_to(stack, idx, report);
                return;
            }
            "ul" | "ol" => return,
            _ => {}
        }
    }
}

// Conversion

const INLINE_TAGS: &[&str] = &[
    "a", "abbr", "b", "big", "br", "cite", "code", "del", "dfn", "em", "font", "i", "img", "ins",
    "kbd", "label", "mark", "q", "s", "samp", "small", "span", "strike", "strong", "sub", "sup",
    "time", "tt", "u", "var",
];

const TRANSPARENT_BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "body", "caption", "center", "dd", "details", "div", "dl",
    "dt", "fieldset", "figcaption", "figure", "footer", "form", "header", "hgroup", "html",
    "main", "nav", "section", "summary", "table", "tbody", "td", "tfoot", "th", "thead", "tr",
];

const KNOWN_BLOCK_TAGS: &[&str] = &[
    "p", "h1", "h2", "h3", "h4", "h5", "h6", "ul", "ol", "li", "blockquote", "pre", "hr",
];

struct Converter<'a> {
    options: &'a ParseOptions,
    report: &'a mut Vec<Recovery>,
}

impl Converter<'_> {
    fn blocks(&mut self, children: &[Dom]) -> Vec<Node> {
        let mut out = Vec::new();
        let mut pending: Vec<Segment> = Vec::new();
        for child in children {
            let el = match child {
                Dom::Text(text) => {
                    pending.push(Segment::text(collapse_whitespace(text), Attrs::default()));
                    continue;
                }
                Dom::Element(el) => el,
            };
            let name = el.name.as_str();
            if INLINE_TAGS.contains(&name) {
                self.inline(std::slice::from_ref(child), &Attrs::default(), None, &mut pending);
                continue;
            }
            flush_paragraph(&mut pending, &mut out);
            match name {
                "p" => out.push(self.text_block(NodeKind::Paragraph, el)),
                "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                    let level: u8 = name[1..].parse().unwrap_or(1);
                    let max = self.options.max_heading_level.clamp(1, 6);
                    out.push(self.text_block(NodeKind::Heading { level: level.min(max) }, el));
                }
                "ul" => out.push(Node::with_children(NodeKind::BulletList, self.blocks(&el.children))),
                "ol" => out.push(Node::with_children(NodeKind::OrderedList, self.blocks(&el.children))),
                "li" => out.push(Node::with_children(NodeKind::ListItem, self.blocks(&el.children))),
                "blockquote" => out.push(Node::with_children(NodeKind::Blockquote, self.blocks(&el.children))),
                "pre" => out.push(
                    Node::with_children(NodeKind::CodeBlock, vec![Node::text(code_text(el))])
                        .with_attrs(block_attrs(el)),
                ),
                "hr" => out.push(Node::new(NodeKind::HorizontalRule)),
                _ => {
                    if !TRANSPARENT_BLOCK_TAGS.contains(&name) {
                        self.report.push(Recovery::UnknownTag(el.name.clone()));
                    }
                    out.extend(self.blocks(&el.children));
                }
            }
        }
        flush_paragraph(&mut pending, &mut out);
        out
    }

    fn text_block(&mut self, kind: NodeKind, el: &Element) -> Node {
        let mut segments = Vec::new();
        self.inline(&el.children, &Attrs::default(), None, &mut segments);
        Node {
            kind,
            attrs: block_attrs(el),
            children: build_inline(finish_inline(segments)),
        }
    }

    fn inline<'d>(
        &mut self,
        children: &'d [Dom],
        attrs: &Attrs,
        link: Option<&'d str>,
        out: &mut Vec<Segment>,
    ) {
        for child in children {
            let el = match child {
                Dom::Text(text) => {
                    out.push(Segment::Text {
                        text: collapse_whitespace(text),
                        attrs: attrs.clone(),
                        link: link.map(ToString::to_string),
                    });
                    continue;
                }
                Dom::Element(el) => el,
            };
            let mut attrs = attrs.clone();
            let mut link = link;
            if let Some(color) = el.style("color").and_then(Color::parse) {
                attrs.color = Some(color);
            }
            match el.name.as_str() {
                "br" => {
                    out.push(Segment::HardBreak);
                    continue;
                }
                "img" => {
                    if let Some(src) = el.attr("src").filter(|src| !src.trim().is_empty()) {
                        out.push(Segment::Image {
                            src: src.to_string(),
                            alt: el.attr("alt").map(ToString::to_string),
                        });
                    }
                    continue;
                }
                "strong" | "b" => {
                    attrs.marks.insert(Mark::Bold);
                }
                "em" | "i" => {
                    attrs.marks.insert(Mark::Italic);
                }
                "u" | "ins" => {
                    attrs.marks.insert(Mark::Underline);
                }
                "s" | "strike" | "del" => {
                    attrs.marks.insert(Mark::Strike);
                }
                "code" | "kbd" | "tt" | "samp" => {
                    attrs.marks.insert(Mark::Code);
                }
                "a" => {
                    if let Some(href) = el.attr("href").filter(|href| !href.trim().is_empty()) {
                        link = Some(href);
                    }
                }
                name => {
                    if !INLINE_TAGS.contains(&name)
                        && !KNOWN_BLOCK_TAGS.contains(&name)
                        && !TRANSPARENT_BLOCK_TAGS.contains(&name)
                    {
                        self.report.push(Recovery::UnknownTag(el.name.clone()));
                    }
                }
            }
            self.inline(&el.children, &attrs, link, out);
        }
    }
}

fn block_attrs(el: &Element) -> Attrs {
    Attrs {
        text_align: el.style("text-align").and_then(TextAlign::parse),
        background_color: el.style("background-color").and_then(Color::parse),
        ..Attrs::default()
    }
}

fn code_text(el: &Element) -> String {
    let mut text = String::new();
    collect_code_text(&el.children, &mut text);
    if let Some(Dom::Text(first)) = el.children.first()
        && first.starts_with('\n')
    {
        text.remove(0);
    }
    text
}

fn collect_code_text(children: &[Dom], out: &mut String) {
    for child in children {
        match child {
            Dom::Text(text) => out.push_str(text),
            Dom::Element(el) if el.name == "br" => out.push('\n'),
            Dom::Element(el) => collect_code_text(&el.children, out),
        }
    }
}

/// Collapse whitespace runs that span a line break into a single `\n`
/// marker; [`finish_inline`] turns markers into spaces or drops them at
/// line edges. Other whitespace is kept as written.
fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut run = String::new();
    for c in text.chars() {
        if c.is_ascii_whitespace() {
            run.push(c);
            continue;
        }
        flush_run(&mut run, &mut out);
        out.push(c);
    }
    flush_run(&mut run, &mut out);
    out
}

fn flush_run(run: &mut String, out: &mut String) {
    if run.contains(['\n', '\r']) {
        out.push('\n');
    } else {
        out.push_str(run);
    }
    run.clear();
}

fn finish_inline(mut segments: Vec<Segment>) -> Vec<Segment> {
    let len = segments.len();
    for idx in 0..len {
        let at_start = idx == 0 || matches!(segments[idx - 1], Segment::HardBreak);
        let at_end = idx + 1 == len || matches!(segments[idx + 1], Segment::HardBreak);
        if let Segment::Text { text, .. } = &mut segments[idx] {
            let mut trimmed = text.as_str();
            if at_start {
                trimmed = trimmed.trim_start_matches('\n');
            }
            if at_end {
                trimmed = trimmed.trim_end_matches('\n');
            }
            *text = trimmed.replace('\n', " ");
        }
    }
    segments
}

fn flush_paragraph(pending: &mut Vec<Segment>, out: &mut Vec<Node>) {
    if pending.is_empty() {
        return;
    }
    let segments = finish_inline(mem::take(pending));
    let blank = segments.iter().all(|seg| match seg {
        Segment::Text { text, .. } => text.trim().is_empty(),
        _ => false,
    });
    if !blank {
        out.push(Node::paragraph(build_inline(segments)));
    }
}
