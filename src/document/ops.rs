//! Structural mutation primitives.
//!
//! Every operation works on a draft copy of the document, normalizes it and
//! only then commits, so a failed operation leaves the document untouched.
//! Operations that move the cursor return the new cursor position.

use std::ops::RangeInclusive;

use tracing::debug;

use super::inline::{
    attrs_before, build_inline, flatten_inline, from_plain, map_text_between, slice, split_at,
    to_plain, Segment,
};
use super::position::{node_at, node_at_mut, LeafBlock, Range};
use super::types::{Attrs, BlockAttr, Color, Document, ListKind, Mark, MarkSet, ModelError, Node, NodeKind};

/// A leaf block as seen by toolbar queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockContext {
    pub kind: NodeKind,
    pub attrs: Attrs,
    /// Enclosing containers, outermost first.
    pub ancestors: Vec<NodeKind>,
}

impl BlockContext {
    /// The innermost enclosing list, if any.
    pub fn list_kind(&self) -> Option<ListKind> {
        self.ancestors.iter().rev().find_map(NodeKind::list_kind)
    }

    pub fn in_blockquote(&self) -> bool {
        self.ancestors.contains(&NodeKind::Blockquote)
    }
}

impl Document {
    fn transact<T>(
        &mut self,
        op: impl FnOnce(&mut Self) -> Result<T, ModelError>,
    ) -> Result<T, ModelError> {
        let mut draft = self.clone();
        let out = op(&mut draft)?;
        draft.normalize();
        *self = draft;
        Ok(out)
    }

    pub(crate) fn leaves_in(&self, range: Range) -> Vec<LeafBlock> {
        self.leaves()
            .into_iter()
            .filter(|leaf| leaf.intersects(range))
            .collect()
    }

    fn text_leaf_at(&self, pos: usize) -> Result<LeafBlock, ModelError> {
        let leaf = self.leaf_at(pos).ok_or(ModelError::OutOfRange {
            pos,
            size: self.size(),
        })?;
        if !leaf.kind.is_textblock() {
            return Err(ModelError::Rejected("position is on a horizontal rule"));
        }
        Ok(leaf)
    }

    /// Indices of the top-level blocks touched by `range`.
    pub fn top_level_span(&self, range: Range) -> Option<RangeInclusive<usize>> {
        let leaves = self.leaves_in(range);
        let first = *leaves.first()?.path.first()?;
        let last = *leaves.last()?.path.first()?;
        Some(first..=last)
    }

    /// Toggle `mark` on every text node in `range`, splitting text at the
    /// range boundaries. Code blocks are skipped.
    ///
    /// # Errors
    /// [`ModelError::OutOfRange`] for a range past the end, and
    /// [`ModelError::Rejected`] when no markable text intersects the range.
    pub fn apply_mark(&mut self, range: Range, mark: Mark) -> Result<(), ModelError> {
        debug!(?range, mark = mark.name(), "apply mark");
        self.restyle_text(range, "no markable text in range", |attrs, _| {
            if !attrs.marks.remove(&mark) {
                attrs.marks.insert(mark);
            }
        })
    }

    /// Set or clear the text color of every text node in `range`.
    ///
    /// # Errors
    /// Same conditions as [`Document::apply_mark`].
    pub fn set_text_color(&mut self, range: Range, color: Option<&Color>) -> Result<(), ModelError> {
        self.restyle_text(range, "no colorable text in range", |attrs, _| {
            attrs.color = color.cloned();
        })
    }

    fn restyle_text(
        &mut self,
        range: Range,
        reason: &'static str,
        mut restyle: impl FnMut(&mut Attrs, &mut Option<String>),
    ) -> Result<(), ModelError> {
        self.check_range(range)?;
        self.transact(|doc| {
            let mut touched = false;
            for leaf in doc.leaves_in(range) {
                if !leaf.is_rich() {
                    continue;
                }
                let (from, to) = leaf.local(range);
                let node = node_mut(doc.root_mut(), &leaf.path)?;
                let mut segments = flatten_inline(&node.children);
                if map_text_between(&mut segments, from, to, &mut restyle) {
                    node.children = build_inline(segments);
                    touched = true;
                }
            }
            if touched {
                Ok(())
            } else {
                Err(ModelError::Rejected(reason))
            }
        })
    }

    /// Set or clear a block attribute on every text block in `range`.
    ///
    /// # Errors
    /// [`ModelError::Rejected`] when the range holds no text block.
    pub fn set_block_attribute(&mut self, range: Range, attr: &BlockAttr) -> Result<(), ModelError> {
        debug!(?range, ?attr, "set block attribute");
        self.check_range(range)?;
        self.transact(|doc| {
            let targets: Vec<LeafBlock> = doc
                .leaves_in(range)
                .into_iter()
                .filter(|leaf| leaf.kind.is_textblock())
                .collect();
            if targets.is_empty() {
                return Err(ModelError::Rejected("no text block in range"));
            }
            for leaf in targets {
                attr.apply(&mut node_mut(doc.root_mut(), &leaf.path)?.attrs);
            }
            Ok(())
        })
    }

    /// Replace the top-level blocks touched by `range` with one `kind` node
    /// holding them. List kinds wrap each block in a list item and absorb
    /// the items of lists already in the span.
    ///
    /// # Errors
    /// [`ModelError::Rejected`] when `kind` cannot contain the blocks.
    pub fn wrap_in(&mut self, range: Range, kind: NodeKind) -> Result<(), ModelError> {
        self.check_range(range)?;
        if !kind.is_block() || kind.is_leaf_block() || kind == NodeKind::ListItem {
            return Err(ModelError::Rejected("kind cannot wrap blocks"));
        }
        let span = self
            .top_level_span(range)
            .ok_or(ModelError::Rejected("no blocks in range"))?;
        debug!(?span, ?kind, "wrap blocks");
        self.transact(|doc| {
            let blocks: Vec<Node> = doc.root_mut().children.drain(span.clone()).collect();
            let children: Vec<Node> = if kind.is_list() {
                blocks
                    .into_iter()
                    .flat_map(|block| {
                        if block.kind.is_list() {
                            block.children
                        } else {
                            vec![Node::with_children(NodeKind::ListItem, vec![block])]
                        }
                    })
                    .collect()
            } else {
                blocks
            };
            if !children.iter().all(|child| kind.can_contain(&child.kind)) {
                return Err(ModelError::Rejected("wrapper cannot contain the selected blocks"));
            }
            doc.root_mut()
                .children
                .insert(*span.start(), Node::with_children(kind, children));
            Ok(())
        })
    }

    /// Unwrap the lists and blockquotes among the top-level blocks in `range`.
    ///
    /// # Errors
    /// [`ModelError::Rejected`] when nothing in the span is a container.
    pub fn lift(&mut self, range: Range) -> Result<(), ModelError> {
        self.check_range(range)?;
        let span = self
            .top_level_span(range)
            .ok_or(ModelError::Rejected("no blocks in range"))?;
        self.transact(|doc| {
            let mut lifted = false;
            for idx in span.rev() {
                let block = &doc.root().children[idx];
                let inner: Vec<Node> = match &block.kind {
                    kind if kind.is_list() => block
                        .children
                        .iter()
                        .flat_map(|item| item.children.iter().cloned())
                        .collect(),
                    NodeKind::Blockquote => block.children.clone(),
                    _ => continue,
                };
                doc.root_mut().children.splice(idx..=idx, inner);
                lifted = true;
            }
            if lifted {
                Ok(())
            } else {
                Err(ModelError::Rejected("nothing to lift"))
            }
        })
    }

    /// Retag the top-level lists in `range`.
    ///
    /// # Errors
    /// [`ModelError::Rejected`] when the span holds no list.
    pub fn set_list_kind(&mut self, range: Range, kind: ListKind) -> Result<(), ModelError> {
        self.check_range(range)?;
        let span = self
            .top_level_span(range)
            .ok_or(ModelError::Rejected("no blocks in range"))?;
        self.transact(|doc| {
            let mut found = false;
            for block in &mut doc.root_mut().children[span] {
                if block.kind.is_list() {
                    block.kind = kind.node_kind();
                    found = true;
                }
            }
            if found {
                Ok(())
            } else {
                Err(ModelError::Rejected("no list in range"))
            }
        })
    }

    /// Convert the text blocks in `range` to `kind` (paragraph, heading or
    /// code block). Block attributes are kept; entering a code block
    /// flattens inline content to plain text.
    ///
    /// # Errors
    /// [`ModelError::Rejected`] for a non-text-block kind or a range with
    /// no text block.
    pub fn set_block_kind(&mut self, range: Range, kind: &NodeKind) -> Result<(), ModelError> {
        self.check_range(range)?;
        if !kind.is_textblock() {
            return Err(ModelError::Rejected("not a text block kind"));
        }
        let to_code = *kind == NodeKind::CodeBlock;
        self.transact(|doc| {
            let mut converted = false;
            for leaf in doc.leaves_in(range) {
                if !leaf.kind.is_textblock() {
                    continue;
                }
                let node = node_mut(doc.root_mut(), &leaf.path)?;
                let segments = flatten_inline(&node.children);
                if to_code && !leaf.is_code() {
                    node.children = build_inline(vec![Segment::text(
                        to_plain(&segments),
                        Attrs::default(),
                    )]);
                } else if !to_code && leaf.is_code() {
                    node.children = build_inline(from_plain(&to_plain(&segments), &Attrs::default()));
                }
                node.kind = kind.clone();
                converted = true;
            }
            if converted {
                Ok(())
            } else {
                Err(ModelError::Rejected("no text block in range"))
            }
        })
    }

    /// Insert `text` at `pos`. Line endings are folded to `\n`, which
    /// becomes a hard break outside code blocks. Without explicit `attrs` the text inherits the style of the
    /// text before it.
    ///
    /// # Errors
    /// [`ModelError::OutOfRange`], or [`ModelError::Rejected`] for empty
    /// text or a position on a horizontal rule.
    pub fn insert_text(&mut self, pos: usize, text: &str, attrs: Option<&Attrs>) -> Result<usize, ModelError> {
        if text.is_empty() {
            return Err(ModelError::Rejected("nothing to insert"));
        }
        let text = text.replace("\r\n", "\n").replace('\r', "\n");
        let leaf = self.text_leaf_at(pos)?;
        let offset = pos - leaf.start;
        self.transact(|doc| {
            let node = node_mut(doc.root_mut(), &leaf.path)?;
            let mut segments = flatten_inline(&node.children);
            let inserted = if leaf.is_code() {
                vec![Segment::text(&text, Attrs::default())]
            } else {
                let attrs = attrs.map_or_else(|| attrs_before(&segments, offset), Attrs::text_only);
                from_plain(&text, &attrs)
            };
            insert_segments(&mut segments, offset, inserted);
            node.children = build_inline(segments);
            Ok(pos + text.chars().count())
        })
    }

    /// Insert an image or hard break at `pos`.
    ///
    /// # Errors
    /// [`ModelError::Rejected`] for other node kinds, an image without a
    /// source, or an image aimed at a code block.
    pub fn insert_inline(&mut self, pos: usize, node: Node) -> Result<usize, ModelError> {
        let segment = match node.kind {
            NodeKind::HardBreak => Segment::HardBreak,
            NodeKind::Image { src, alt } => {
                let src = src.trim();
                if src.is_empty() {
                    return Err(ModelError::Rejected("empty image source"));
                }
                Segment::Image {
                    src: src.to_string(),
                    alt,
                }
            }
            _ => return Err(ModelError::Rejected("not an insertable inline node")),
        };
        let leaf = self.text_leaf_at(pos)?;
        if leaf.is_code() {
            return match segment {
                Segment::HardBreak => self.insert_text(pos, "\n", None),
                _ => Err(ModelError::Rejected("code blocks hold plain text only")),
            };
        }
        let offset = pos - leaf.start;
        self.transact(|doc| {
            let node = node_mut(doc.root_mut(), &leaf.path)?;
            let mut segments = flatten_inline(&node.children);
            insert_segments(&mut segments, offset, vec![segment]);
            node.children = build_inline(segments);
            Ok(pos + 1)
        })
    }

    /// Link the text in `range` to `href`. A collapsed range inserts the
    /// address itself as linked text.
    ///
    /// # Errors
    /// [`ModelError::Rejected`] for an empty address or one containing
    /// whitespace, code blocks, or a range without text.
    pub fn wrap_link(&mut self, range: Range, href: &str) -> Result<usize, ModelError> {
        let href = href.trim();
        if href.is_empty() {
            return Err(ModelError::Rejected("empty link target"));
        }
        if href.chars().any(char::is_whitespace) {
            return Err(ModelError::Rejected("link target contains whitespace"));
        }
        self.check_range(range)?;
        if !range.is_collapsed() {
            self.restyle_text(range, "no linkable text in range", |_, link| {
                *link = Some(href.to_string());
            })?;
            return Ok(range.to);
        }
        let leaf = self.text_leaf_at(range.from)?;
        if leaf.is_code() {
            return Err(ModelError::Rejected("links are not allowed in code blocks"));
        }
        let offset = range.from - leaf.start;
        self.transact(|doc| {
            let node = node_mut(doc.root_mut(), &leaf.path)?;
            let mut segments = flatten_inline(&node.children);
            let attrs = attrs_before(&segments, offset);
            let linked = Segment::Text {
                text: href.to_string(),
                attrs,
                link: Some(href.to_string()),
            };
            insert_segments(&mut segments, offset, vec![linked]);
            node.children = build_inline(segments);
            Ok(range.from + href.chars().count())
        })
    }

    /// Insert a horizontal rule at `pos`, splitting the text block there.
    /// A rule never ends its container: an empty paragraph follows it.
    ///
    /// # Errors
    /// [`ModelError::OutOfRange`] for a position past the end.
    pub fn insert_horizontal_rule(&mut self, pos: usize) -> Result<usize, ModelError> {
        let leaf = self.leaf_at(pos).ok_or(ModelError::OutOfRange {
            pos,
            size: self.size(),
        })?;
        let offset = pos - leaf.start;
        self.transact(|doc| {
            let node = node_at(doc.root(), &leaf.path)
                .cloned()
                .ok_or_else(|| missing(&leaf.path))?;
            let rule = Node::new(NodeKind::HorizontalRule);
            let (replacement, rule_offset, cursor) = if !leaf.kind.is_textblock() {
                (vec![node, rule], 1, leaf.start + 2)
            } else if offset == 0 && leaf.size > 0 {
                (vec![rule, node], 0, leaf.start + 1)
            } else if offset == leaf.size {
                (vec![node, rule], 1, pos + 2)
            } else {
                let segments = flatten_inline(&node.children);
                let head = rebuilt(&node, slice(&segments, 0, offset));
                let tail = rebuilt(&node, slice(&segments, offset, leaf.size));
                (vec![head, rule, tail], 1, pos + 2)
            };
            splice_at(doc.root_mut(), &leaf.path, replacement)?;
            let (idx, parent_path) = split_path(&leaf.path)?;
            let parent = node_mut(doc.root_mut(), parent_path)?;
            let rule_idx = idx + rule_offset;
            if rule_idx + 1 == parent.children.len() {
                parent.children.push(Node::paragraph(Vec::new()));
            }
            Ok(cursor)
        })
    }

    /// Delete the content between `range.from` and `range.to`, joining the
    /// first and last blocks it touches.
    ///
    /// # Errors
    /// [`ModelError::Rejected`] for a collapsed range.
    pub fn delete_range(&mut self, range: Range) -> Result<usize, ModelError> {
        self.check_range(range)?;
        if range.is_collapsed() {
            return Err(ModelError::Rejected("empty range"));
        }
        let leaves = self.leaves_in(range);
        let (Some(first), Some(last)) = (leaves.first().cloned(), leaves.last().cloned()) else {
            return Err(ModelError::Rejected("no blocks in range"));
        };
        self.transact(|doc| {
            if first.path == last.path {
                let (from, to) = first.local(range);
                let node = node_mut(doc.root_mut(), &first.path)?;
                let segments = flatten_inline(&node.children);
                let mut kept = slice(&segments, 0, from);
                kept.extend(slice(&segments, to, first.size));
                node.children = build_inline(kept);
                return Ok(range.from);
            }

            let mut tail = if last.kind.is_textblock() {
                let (_, to) = last.local(range);
                let node = node_at(doc.root(), &last.path).ok_or_else(|| missing(&last.path))?;
                slice(&flatten_inline(&node.children), to, last.size)
            } else {
                Vec::new()
            };

            // Later leaves go first so earlier paths stay valid.
            let merge_into_first = first.kind.is_textblock();
            if merge_into_first || !last.kind.is_textblock() {
                remove_at(doc.root_mut(), &last.path)?;
            } else {
                node_mut(doc.root_mut(), &last.path)?.children = build_inline(std::mem::take(&mut tail));
            }
            for leaf in leaves[1..leaves.len() - 1].iter().rev() {
                remove_at(doc.root_mut(), &leaf.path)?;
            }
            if merge_into_first {
                let (from, _) = first.local(range);
                let node = node_mut(doc.root_mut(), &first.path)?;
                let mut segments = slice(&flatten_inline(&node.children), 0, from);
                segments.extend(adapt_segments(tail, last.is_code(), first.is_code()));
                node.children = build_inline(segments);
            } else {
                remove_at(doc.root_mut(), &first.path)?;
            }
            Ok(range.from)
        })
    }

    /// Split the block at `pos` (the Enter key). Code blocks take a newline,
    /// list items split into a new item, and an empty last item leaves its
    /// list.
    ///
    /// # Errors
    /// [`ModelError::OutOfRange`] for a position past the end.
    pub fn split_block(&mut self, pos: usize) -> Result<usize, ModelError> {
        let leaf = self.leaf_at(pos).ok_or(ModelError::OutOfRange {
            pos,
            size: self.size(),
        })?;
        if leaf.is_code() {
            return self.insert_text(pos, "\n", None);
        }
        let offset = pos - leaf.start;
        self.transact(|doc| {
            let node = node_at(doc.root(), &leaf.path)
                .cloned()
                .ok_or_else(|| missing(&leaf.path))?;
            if !leaf.kind.is_textblock() {
                splice_at(
                    doc.root_mut(),
                    &leaf.path,
                    vec![node, Node::paragraph(Vec::new())],
                )?;
                return Ok(leaf.start + 1);
            }

            let segments = flatten_inline(&node.children);
            let tail_kind = match node.kind {
                NodeKind::Heading { .. } if offset == leaf.size => NodeKind::Paragraph,
                ref kind => kind.clone(),
            };
            let tail = Node {
                kind: tail_kind,
                attrs: node.attrs.clone(),
                children: build_inline(slice(&segments, offset, leaf.size)),
            };
            let head = rebuilt(&node, slice(&segments, 0, offset));

            let (leaf_idx, item_path) = split_path(&leaf.path)?;
            let in_item = !item_path.is_empty()
                && node_at(doc.root(), item_path).is_some_and(|n| n.kind == NodeKind::ListItem);
            if !in_item {
                splice_at(doc.root_mut(), &leaf.path, vec![head, tail])?;
                return Ok(pos + 1);
            }

            let item = node_at(doc.root(), item_path)
                .cloned()
                .ok_or_else(|| missing(item_path))?;
            let (item_idx, list_path) = split_path(item_path)?;
            let list_len = node_at(doc.root(), list_path).map_or(0, |list| list.children.len());
            if leaf.size == 0 && item.children.len() == 1 && item_idx + 1 == list_len {
                debug!("leaving list from empty last item");
                remove_at(doc.root_mut(), item_path)?;
                let (list_idx, outer_path) = split_path(list_path)?;
                node_mut(doc.root_mut(), outer_path)?.children.insert(
                    list_idx + 1,
                    Node::paragraph(Vec::new()).with_attrs(node.attrs.clone()),
                );
                return Ok(leaf.start);
            }

            let mut new_item = vec![tail];
            new_item.extend(item.children[leaf_idx + 1..].iter().cloned());
            let item_mut = node_mut(doc.root_mut(), item_path)?;
            item_mut.children.truncate(leaf_idx);
            item_mut.children.push(head);
            node_mut(doc.root_mut(), list_path)?
                .children
                .insert(item_idx + 1, Node::with_children(NodeKind::ListItem, new_item));
            Ok(pos + 1)
        })
    }

    /// Marks shared by all text in `range`. For a collapsed range, the marks
    /// of the text just before the cursor.
    pub fn marks_in(&self, range: Range) -> MarkSet {
        self.text_attrs_in(range)
            .into_iter()
            .map(|attrs| attrs.marks)
            .reduce(|acc, marks| acc.intersection(&marks).copied().collect())
            .unwrap_or_default()
    }

    /// Attributes of each text run in `range`, or of the run before a
    /// collapsed cursor.
    pub fn text_attrs_in(&self, range: Range) -> Vec<Attrs> {
        let mut out = Vec::new();
        for leaf in self.leaves_in(range) {
            if !leaf.is_rich() {
                continue;
            }
            let Some(node) = node_at(self.root(), &leaf.path) else {
                continue;
            };
            let segments = flatten_inline(&node.children);
            let (from, to) = leaf.local(range);
            if range.is_collapsed() {
                out.push(attrs_before(&segments, from));
                continue;
            }
            out.extend(slice(&segments, from, to).into_iter().filter_map(|seg| match seg {
                Segment::Text { attrs, .. } => Some(attrs),
                _ => None,
            }));
        }
        out
    }

    /// The leaf blocks touched by `range` with their attributes and the
    /// kinds of the containers around them.
    pub fn blocks_in(&self, range: Range) -> Vec<BlockContext> {
        self.leaves_in(range)
            .into_iter()
            .filter_map(|leaf| {
                let node = node_at(self.root(), &leaf.path)?;
                let ancestors = (1..leaf.path.len())
                    .filter_map(|depth| node_at(self.root(), &leaf.path[..depth]))
                    .map(|n| n.kind.clone())
                    .collect();
                Some(BlockContext {
                    kind: node.kind.clone(),
                    attrs: node.attrs.clone(),
                    ancestors,
                })
            })
            .collect()
    }

    /// Kinds of the nodes enclosing `pos`, outermost first, ending with the
    /// leaf block itself.
    pub fn ancestor_kinds(&self, pos: usize) -> Vec<NodeKind> {
        let Some(leaf) = self.leaf_at(pos) else {
            return Vec::new();
        };
        (1..=leaf.path.len())
            .filter_map(|depth| node_at(self.root(), &leaf.path[..depth]).map(|n| n.kind.clone()))
            .collect()
    }
}

fn missing(path: &[usize]) -> ModelError {
    ModelError::Invalid {
        path: path.to_vec(),
        reason: "node not found".to_string(),
    }
}

fn node_mut<'a>(root: &'a mut Node, path: &[usize]) -> Result<&'a mut Node, ModelError> {
    node_at_mut(root, path).ok_or_else(|| missing(path))
}

fn split_path(path: &[usize]) -> Result<(usize, &[usize]), ModelError> {
    path.split_last()
        .map(|(idx, parent)| (*idx, parent))
        .ok_or_else(|| missing(path))
}

/// Replace the node at `path` with `nodes`.
fn splice_at(root: &mut Node, path: &[usize], nodes: Vec<Node>) -> Result<(), ModelError> {
    let (idx, parent_path) = split_path(path)?;
    let parent = node_mut(root, parent_path)?;
    if idx >= parent.children.len() {
        return Err(missing(path));
    }
    parent.children.splice(idx..=idx, nodes);
    Ok(())
}

fn remove_at(root: &mut Node, path: &[usize]) -> Result<Node, ModelError> {
    let (idx, parent_path) = split_path(path)?;
    let parent = node_mut(root, parent_path)?;
    if idx >= parent.children.len() {
        return Err(missing(path));
    }
    Ok(parent.children.remove(idx))
}

fn rebuilt(node: &Node, segments: Vec<Segment>) -> Node {
    Node {
        kind: node.kind.clone(),
        attrs: node.attrs.clone(),
        children: build_inline(segments),
    }
}

fn insert_segments(segments: &mut Vec<Segment>, offset: usize, inserted: Vec<Segment>) {
    split_at(segments, offset);
    let mut pos = 0;
    let mut idx = segments.len();
    for (i, seg) in segments.iter().enumerate() {
        if pos >= offset {
            idx = i;
            break;
        }
        pos += seg.len();
    }
    segments.splice(idx..idx, inserted);
}

/// Carry content across the code/rich boundary when blocks are joined.
fn adapt_segments(segments: Vec<Segment>, from_code: bool, to_code: bool) -> Vec<Segment> {
    if to_code {
        vec![Segment::text(to_plain(&segments), Attrs::default())]
    } else if from_code {
        from_plain(&to_plain(&segments), &Attrs::default())
    } else {
        segments
    }
}
