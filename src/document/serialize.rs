//! Document to markup.
//!
//! The output is the HTML subset stored in `long_description` and must stay
//! byte-stable across versions. Nodes are written pre-order with no
//! whitespace between tags. Block styles go in a single `style` attribute;
//! text styles become nested wrappers.

use super::types::{Attrs, Document, Mark, Node, NodeKind};

/// Attributes added to every link.
const LINK_TARGET: &str = "_blank";
const LINK_REL: &str = "noopener noreferrer nofollow";

/// Markup for an empty document.
pub const EMPTY_DOCUMENT: &str = "<p></p>";

/// Serialize a document. Never returns an empty string.
pub fn serialize(doc: &Document) -> String {
    let mut out = String::new();
    for block in doc.blocks() {
        write_node(block, &mut out);
    }
    if out.is_empty() {
        out.push_str(EMPTY_DOCUMENT);
    }
    out
}

impl Document {
    pub fn to_html(&self) -> String {
        serialize(self)
    }
}

fn write_node(node: &Node, out: &mut String) {
    match &node.kind {
        NodeKind::Doc => write_children(node, out),
        NodeKind::Paragraph => write_container("p", node, out),
        NodeKind::Heading { level } => {
            let tag = heading_tag(*level);
            write_container(tag, node, out);
        }
        NodeKind::BulletList => write_container("ul", node, out),
        NodeKind::OrderedList => write_container("ol", node, out),
        NodeKind::ListItem => write_container("li", node, out),
        NodeKind::Blockquote => write_container("blockquote", node, out),
        NodeKind::CodeBlock => {
            open_tag("pre", &node.attrs, out);
            out.push_str("<code>");
            escape_text(&node.text_content(), out);
            out.push_str("</code></pre>");
        }
        NodeKind::HorizontalRule => out.push_str("<hr>"),
        NodeKind::Text { text } => write_text(text, &node.attrs, out),
        NodeKind::HardBreak => out.push_str("<br>"),
        NodeKind::Image { src, alt } => {
            out.push_str("<img");
            write_attr("src", src, out);
            if let Some(alt) = alt {
                write_attr("alt", alt, out);
            }
            out.push('>');
        }
        NodeKind::Link { href } => {
            out.push_str("<a");
            write_attr("href", href, out);
            write_attr("target", LINK_TARGET, out);
            write_attr("rel", LINK_REL, out);
            out.push('>');
            write_children(node, out);
            out.push_str("</a>");
        }
    }
}

const fn heading_tag(level: u8) -> &'static str {
    match level {
        0 | 1 => "h1",
        2 => "h2",
        3 => "h3",
        4 => "h4",
        5 => "h5",
        _ => "h6",
    }
}

fn write_container(tag: &str, node: &Node, out: &mut String) {
    open_tag(tag, &node.attrs, out);
    write_children(node, out);
    out.push_str("</");
    out.push_str(tag);
    out.push('>');
}

fn write_children(node: &Node, out: &mut String) {
    for child in &node.children {
        write_node(child, out);
    }
}

fn open_tag(tag: &str, attrs: &Attrs, out: &mut String) {
    out.push('<');
    out.push_str(tag);
    if let Some(style) = block_style(attrs) {
        write_attr("style", &style, out);
    }
    out.push('>');
}

/// CSS declarations for a block's attributes, in fixed order.
pub(crate) fn block_style(attrs: &Attrs) -> Option<String> {
    let mut parts = Vec::new();
    if let Some(align) = attrs.text_align {
        parts.push(format!("text-align: {}", align.as_str()));
    }
    if let Some(color) = &attrs.background_color {
        parts.push(format!("background-color: {color}"));
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("; "))
    }
}

const fn mark_tag(mark: Mark) -> &'static str {
    match mark {
        Mark::Bold => "strong",
        Mark::Italic => "em",
        Mark::Underline => "u",
        Mark::Strike => "s",
        Mark::Code => "code",
    }
}

fn write_text(text: &str, attrs: &Attrs, out: &mut String) {
    let mut closers: Vec<&str> = Vec::new();
    if let Some(color) = &attrs.color {
        out.push_str("<span");
        write_attr("style", &format!("color: {color}"), out);
        out.push('>');
        closers.push("span");
    }
    for mark in &attrs.marks {
        let tag = mark_tag(*mark);
        out.push('<');
        out.push_str(tag);
        out.push('>');
        closers.push(tag);
    }
    escape_text(text, out);
    for tag in closers.iter().rev() {
        out.push_str("</");
        out.push_str(tag);
        out.push('>');
    }
}

fn write_attr(name: &str, value: &str, out: &mut String) {
    out.push(' ');
    out.push_str(name);
    out.push_str("=\"");
    escape_attr(value, out);
    out.push('"');
}

fn escape_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}

fn escape_attr(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
}
