//! Cursor positions, selections and the leaf-block index.
//!
//! Leaf blocks (text blocks and horizontal rules) are laid out in document
//! order. A leaf covers `[start, start + size]`, and the next leaf starts one
//! position after that, so every position belongs to exactly one leaf.

use serde::Serialize;

use super::inline::inline_size;
use super::types::{Document, ModelError, Node, NodeKind};

/// An ordered, inclusive span of positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Range {
    pub from: usize,
    pub to: usize,
}

impl Range {
    /// Create a range from two positions in any order.
    pub const fn new(a: usize, b: usize) -> Self {
        if a <= b {
            Self { from: a, to: b }
        } else {
            Self { from: b, to: a }
        }
    }

    pub const fn cursor(pos: usize) -> Self {
        Self { from: pos, to: pos }
    }

    pub const fn is_collapsed(&self) -> bool {
        self.from == self.to
    }
}

/// The editor selection: `anchor` stays put, `head` moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Selection {
    pub anchor: usize,
    pub head: usize,
}

impl Selection {
    pub const fn new(anchor: usize, head: usize) -> Self {
        Self { anchor, head }
    }

    pub const fn cursor(pos: usize) -> Self {
        Self {
            anchor: pos,
            head: pos,
        }
    }

    pub const fn range(&self) -> Range {
        Range::new(self.anchor, self.head)
    }

    pub const fn is_collapsed(&self) -> bool {
        self.anchor == self.head
    }

    /// Clamp both ends into `0..=size`.
    #[must_use]
    pub fn clamped(self, size: usize) -> Self {
        Self {
            anchor: self.anchor.min(size),
            head: self.head.min(size),
        }
    }
}

/// A leaf block and where it sits in the tree and in position space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LeafBlock {
    pub path: Vec<usize>,
    pub kind: NodeKind,
    pub start: usize,
    pub size: usize,
}

impl LeafBlock {
    pub const fn end(&self) -> usize {
        self.start + self.size
    }

    pub const fn intersects(&self, range: Range) -> bool {
        self.start <= range.to && self.end() >= range.from
    }

    pub const fn contains(&self, pos: usize) -> bool {
        pos >= self.start && pos <= self.end()
    }

    /// Range clipped to this block, as block-local offsets.
    pub fn local(&self, range: Range) -> (usize, usize) {
        let from = range.from.max(self.start).min(self.end()) - self.start;
        let to = range.to.max(self.start).min(self.end()) - self.start;
        (from, to)
    }

    pub const fn is_code(&self) -> bool {
        matches!(self.kind, NodeKind::CodeBlock)
    }

    /// Text blocks that accept inline formatting.
    pub const fn is_rich(&self) -> bool {
        matches!(self.kind, NodeKind::Paragraph | NodeKind::Heading { .. })
    }
}

/// Enumerate leaf blocks in document order.
pub(crate) fn leaf_blocks(root: &Node) -> Vec<LeafBlock> {
    let mut out = Vec::new();
    let mut path = Vec::new();
    let mut next_start = 0;
    collect_leaves(root, &mut path, &mut next_start, &mut out);
    out
}

fn collect_leaves(
    node: &Node,
    path: &mut Vec<usize>,
    next_start: &mut usize,
    out: &mut Vec<LeafBlock>,
) {
    for (idx, child) in node.children.iter().enumerate() {
        path.push(idx);
        if child.kind.is_leaf_block() {
            let size = leaf_size(child);
            out.push(LeafBlock {
                path: path.clone(),
                kind: child.kind.clone(),
                start: *next_start,
                size,
            });
            *next_start += size + 1;
        } else if child.kind.is_block() {
            collect_leaves(child, path, next_start, out);
        }
        path.pop();
    }
}

fn leaf_size(node: &Node) -> usize {
    match node.kind {
        NodeKind::HorizontalRule => 0,
        NodeKind::CodeBlock => node.text_content().chars().count(),
        _ => inline_size(&node.children),
    }
}

pub(crate) fn node_at<'a>(root: &'a Node, path: &[usize]) -> Option<&'a Node> {
    path.iter()
        .try_fold(root, |node, &idx| node.children.get(idx))
}

pub(crate) fn node_at_mut<'a>(root: &'a mut Node, path: &[usize]) -> Option<&'a mut Node> {
    path.iter()
        .try_fold(root, |node, &idx| node.children.get_mut(idx))
}

impl Document {
    /// The largest valid position.
    pub fn size(&self) -> usize {
        leaf_blocks(self.root()).last().map_or(0, LeafBlock::end)
    }

    pub(crate) fn leaves(&self) -> Vec<LeafBlock> {
        leaf_blocks(self.root())
    }

    pub(crate) fn leaf_at(&self, pos: usize) -> Option<LeafBlock> {
        self.leaves().into_iter().find(|leaf| leaf.contains(pos))
    }

    /// Start and end positions of the leaf block holding `pos`.
    pub fn block_bounds(&self, pos: usize) -> Option<(usize, usize)> {
        self.leaf_at(pos).map(|leaf| (leaf.start, leaf.end()))
    }

    /// Reject ranges that reach past the end of the document.
    ///
    /// # Errors
    /// Returns [`ModelError::OutOfRange`] when `range.to` exceeds [`Document::size`].
    pub fn check_range(&self, range: Range) -> Result<(), ModelError> {
        let size = self.size();
        if range.to > size {
            return Err(ModelError::OutOfRange {
                pos: range.to,
                size,
            });
        }
        Ok(())
    }
}
