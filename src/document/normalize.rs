//! Structural normalization.
//!
//! Brings any tree into the legal document shape: stray inline content is
//! wrapped in paragraphs, list items are hoisted into or out of lists,
//! empty containers are dropped, code blocks are reduced to plain text and
//! adjacent identical text runs are merged.

use std::mem;

use tracing::debug;

use super::inline::{build_inline, flatten_inline, Segment};
use super::types::{Attrs, Document, Node, NodeKind};

impl Document {
    /// Restore every structural invariant in place.
    pub fn normalize(&mut self) {
        let root = self.root_mut();
        let children = mem::take(&mut root.children);
        let mut blocks = normalize_block_children(children);
        if blocks.is_empty() {
            blocks.push(Node::paragraph(Vec::new()));
        }
        root.children = blocks;
        root.attrs = Attrs::default();
    }
}

/// Normalize the children of a block container (doc, blockquote, list item).
pub(crate) fn normalize_block_children(children: Vec<Node>) -> Vec<Node> {
    let mut out = Vec::with_capacity(children.len());
    let mut pending_inline: Vec<Node> = Vec::new();
    for child in children {
        if child.kind.is_inline() {
            pending_inline.push(child);
            continue;
        }
        flush_inline(&mut pending_inline, &mut out);
        match child.kind {
            NodeKind::ListItem | NodeKind::Doc => {
                debug!(kind = ?child.kind, "hoisting misplaced container content");
                out.extend(normalize_block_children(child.children));
            }
            _ => {
                if let Some(node) = normalize_block(child) {
                    out.push(node);
                }
            }
        }
    }
    flush_inline(&mut pending_inline, &mut out);
    out
}

fn flush_inline(pending: &mut Vec<Node>, out: &mut Vec<Node>) {
    if pending.is_empty() {
        return;
    }
    let segments = flatten_inline(&mem::take(pending));
    let blank = segments.iter().all(|seg| match seg {
        Segment::Text { text, .. } => text.trim().is_empty(),
        _ => false,
    });
    if blank {
        return;
    }
    out.push(Node::paragraph(build_inline(segments)));
}

fn normalize_block(node: Node) -> Option<Node> {
    let Node {
        kind,
        attrs,
        children,
    } = node;
    match kind {
        NodeKind::Paragraph | NodeKind::Heading { .. } => {
            let kind = match kind {
                NodeKind::Heading { level } => NodeKind::Heading {
                    level: level.clamp(1, 6),
                },
                other => other,
            };
            Some(Node {
                kind,
                attrs: attrs.block_only(),
                children: build_inline(flatten_inline(&children)),
            })
        }
        NodeKind::CodeBlock => {
            let text = Node::with_children(NodeKind::CodeBlock, children).text_content();
            let children = if text.is_empty() {
                Vec::new()
            } else {
                vec![Node::text(text)]
            };
            Some(Node {
                kind: NodeKind::CodeBlock,
                attrs: attrs.block_only(),
                children,
            })
        }
        NodeKind::HorizontalRule => Some(Node::new(NodeKind::HorizontalRule)),
        NodeKind::BulletList | NodeKind::OrderedList => {
            let items = normalize_list_children(children);
            if items.is_empty() {
                None
            } else {
                Some(Node::with_children(kind, items))
            }
        }
        NodeKind::Blockquote | NodeKind::ListItem => {
            let blocks = normalize_block_children(children);
            if blocks.is_empty() {
                None
            } else {
                Some(Node::with_children(kind, blocks))
            }
        }
        NodeKind::Doc
        | NodeKind::Text { .. }
        | NodeKind::HardBreak
        | NodeKind::Image { .. }
        | NodeKind::Link { .. } => None,
    }
}

fn normalize_list_children(children: Vec<Node>) -> Vec<Node> {
    let mut items: Vec<Node> = Vec::new();
    let mut loose: Vec<Node> = Vec::new();
    for child in children {
        if child.kind == NodeKind::ListItem {
            flush_loose(&mut loose, &mut items);
            let blocks = normalize_block_children(child.children);
            if !blocks.is_empty() {
                items.push(Node::with_children(NodeKind::ListItem, blocks));
            }
        } else if child.kind.is_list() {
            // A list nested directly in a list belongs to the previous item.
            flush_loose(&mut loose, &mut items);
            if let Some(nested) = normalize_block(child) {
                match items.last_mut() {
                    Some(last) => last.children.push(nested),
                    None => items.push(Node::with_children(NodeKind::ListItem, vec![nested])),
                }
            }
        } else {
            loose.push(child);
        }
    }
    flush_loose(&mut loose, &mut items);
    items
}

fn flush_loose(loose: &mut Vec<Node>, items: &mut Vec<Node>) {
    if loose.is_empty() {
        return;
    }
    debug!(count = loose.len(), "wrapping loose list content in a list item");
    let blocks = normalize_block_children(mem::take(loose));
    if !blocks.is_empty() {
        items.push(Node::with_children(NodeKind::ListItem, blocks));
    }
}
