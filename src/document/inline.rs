//! Flat view of a text block's inline content.
//!
//! Range operations split, restyle and reassemble inline content through
//! [`Segment`] runs: links become a per-segment attribute while editing and
//! are regrouped into `Link` nodes by [`build_inline`].

use super::types::{Attrs, Node, NodeKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Segment {
    Text {
        text: String,
        attrs: Attrs,
        link: Option<String>,
    },
    HardBreak,
    Image {
        src: String,
        alt: Option<String>,
    },
}

impl Segment {
    pub(crate) fn text(text: impl Into<String>, attrs: Attrs) -> Self {
        Self::Text {
            text: text.into(),
            attrs,
            link: None,
        }
    }

    /// Number of cursor positions this segment occupies.
    pub(crate) fn len(&self) -> usize {
        match self {
            Self::Text { text, .. } => text.chars().count(),
            Self::HardBreak | Self::Image { .. } => 1,
        }
    }
}

/// Total positions covered by inline nodes.
pub(crate) fn inline_size(nodes: &[Node]) -> usize {
    nodes
        .iter()
        .map(|node| match &node.kind {
            NodeKind::Text { text } => text.chars().count(),
            NodeKind::HardBreak | NodeKind::Image { .. } => 1,
            _ => inline_size(&node.children),
        })
        .sum()
}

/// Flatten inline nodes into segments. Non-inline nodes contribute their
/// inline descendants.
pub(crate) fn flatten_inline(nodes: &[Node]) -> Vec<Segment> {
    let mut out = Vec::new();
    flatten_into(nodes, None, &mut out);
    out
}

fn flatten_into(nodes: &[Node], link: Option<&str>, out: &mut Vec<Segment>) {
    for node in nodes {
        match &node.kind {
            NodeKind::Text { text } => out.push(Segment::Text {
                text: text.clone(),
                attrs: node.attrs.text_only(),
                link: link.map(ToString::to_string),
            }),
            NodeKind::HardBreak => out.push(Segment::HardBreak),
            NodeKind::Image { src, alt } => out.push(Segment::Image {
                src: src.clone(),
                alt: alt.clone(),
            }),
            NodeKind::Link { href } => flatten_into(&node.children, Some(href), out),
            _ => flatten_into(&node.children, link, out),
        }
    }
}

/// Rebuild inline nodes: drops empty text, merges equal neighbours and
/// groups linked text into `Link` nodes.
pub(crate) fn build_inline(segments: Vec<Segment>) -> Vec<Node> {
    let mut merged: Vec<Segment> = Vec::with_capacity(segments.len());
    for seg in segments {
        if let Segment::Text { text, .. } = &seg
            && text.is_empty()
        {
            continue;
        }
        if let (
            Some(Segment::Text {
                text: prev_text,
                attrs: prev_attrs,
                link: prev_link,
            }),
            Segment::Text { text, attrs, link },
        ) = (merged.last_mut(), &seg)
            && prev_attrs == attrs
            && prev_link == link
        {
            prev_text.push_str(text);
            continue;
        }
        merged.push(seg);
    }

    let mut out: Vec<Node> = Vec::new();
    for seg in merged {
        match seg {
            Segment::Text { text, attrs, link } => {
                let node = Node::text(text).with_attrs(attrs);
                match link {
                    Some(href) => {
                        if let Some(last) = out.last_mut()
                            && matches!(&last.kind, NodeKind::Link { href: h } if *h == href)
                        {
                            last.children.push(node);
                        } else {
                            out.push(Node::with_children(NodeKind::Link { href }, vec![node]));
                        }
                    }
                    None => out.push(node),
                }
            }
            Segment::HardBreak => out.push(Node::new(NodeKind::HardBreak)),
            Segment::Image { src, alt } => out.push(Node::new(NodeKind::Image { src, alt })),
        }
    }
    out
}

/// Ensure a segment boundary exists at `offset`.
pub(crate) fn split_at(segments: &mut Vec<Segment>, offset: usize) {
    let mut pos = 0;
    for idx in 0..segments.len() {
        let len = segments[idx].len();
        if offset > pos && offset < pos + len {
            if let Segment::Text { text, attrs, link } = &segments[idx] {
                let byte = byte_index(text, offset - pos);
                let tail = Segment::Text {
                    text: text[byte..].to_string(),
                    attrs: attrs.clone(),
                    link: link.clone(),
                };
                if let Segment::Text { text, .. } = &mut segments[idx] {
                    text.truncate(byte);
                }
                segments.insert(idx + 1, tail);
            }
            return;
        }
        pos += len;
        if pos >= offset {
            return;
        }
    }
}

/// Apply `f` to the attrs of every text segment inside `[from, to)`.
///
/// Returns whether any segment was touched.
pub(crate) fn map_text_between(
    segments: &mut Vec<Segment>,
    from: usize,
    to: usize,
    mut f: impl FnMut(&mut Attrs, &mut Option<String>),
) -> bool {
    if from >= to {
        return false;
    }
    split_at(segments, from);
    split_at(segments, to);
    let mut touched = false;
    let mut pos = 0;
    for seg in segments.iter_mut() {
        let len = seg.len();
        if pos >= from
            && pos + len <= to
            && let Segment::Text { attrs, link, .. } = seg
        {
            f(attrs, link);
            touched = true;
        }
        pos += len;
    }
    touched
}

/// Segments covering `[from, to)`.
pub(crate) fn slice(segments: &[Segment], from: usize, to: usize) -> Vec<Segment> {
    let mut owned = segments.to_vec();
    split_at(&mut owned, from);
    split_at(&mut owned, to);
    let mut pos = 0;
    let mut out = Vec::new();
    for seg in owned {
        let len = seg.len();
        if pos >= from && pos + len <= to && len > 0 {
            out.push(seg);
        }
        pos += len;
    }
    out
}

/// Plain text for code blocks: breaks become newlines, images are dropped.
pub(crate) fn to_plain(segments: &[Segment]) -> String {
    let mut out = String::new();
    for seg in segments {
        match seg {
            Segment::Text { text, .. } => out.push_str(text),
            Segment::HardBreak => out.push('\n'),
            Segment::Image { .. } => {}
        }
    }
    out
}

/// Inverse of [`to_plain`]: newlines become hard breaks.
pub(crate) fn from_plain(text: &str, attrs: &Attrs) -> Vec<Segment> {
    let mut out = Vec::new();
    for (idx, line) in text.split('\n').enumerate() {
        if idx > 0 {
            out.push(Segment::HardBreak);
        }
        if !line.is_empty() {
            out.push(Segment::text(line, attrs.clone()));
        }
    }
    out
}

/// Text attrs at `offset`, inherited from the text just before it.
pub(crate) fn attrs_before(segments: &[Segment], offset: usize) -> Attrs {
    let mut pos = 0;
    let mut found = Attrs::default();
    for seg in segments {
        if pos >= offset {
            break;
        }
        found = match seg {
            Segment::Text { attrs, .. } => attrs.clone(),
            _ => Attrs::default(),
        };
        pos += seg.len();
    }
    found
}

pub(crate) fn byte_index(text: &str, char_offset: usize) -> usize {
    text.char_indices()
        .nth(char_offset)
        .map_or(text.len(), |(byte, _)| byte)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::types::Mark;

    fn bold() -> Attrs {
        Attrs {
            marks: [Mark::Bold].into_iter().collect(),
            ..Attrs::default()
        }
    }

    #[test]
    fn test_split_at_middle_of_text() {
        let mut segs = vec![Segment::text("héllo", Attrs::default())];
        split_at(&mut segs, 2);
        assert_eq!(segs.len(), 2);
        assert_eq!(segs[0], Segment::text("hé", Attrs::default()));
        assert_eq!(segs[1], Segment::text("llo", Attrs::default()));
    }

    #[test]
    fn test_split_at_existing_boundary_is_noop() {
        let mut segs = vec![
            Segment::text("ab", Attrs::default()),
            Segment::text("cd", bold()),
        ];
        split_at(&mut segs, 2);
        assert_eq!(segs.len(), 2);
    }

    #[test]
    fn test_build_inline_merges_equal_neighbours() {
        let nodes = build_inline(vec![
            Segment::text("ab", bold()),
            Segment::text("cd", bold()),
            Segment::text("", Attrs::default()),
        ]);
        assert_eq!(nodes, vec![Node::text("abcd").with_attrs(bold())]);
    }

    #[test]
    fn test_build_inline_groups_links() {
        let nodes = build_inline(vec![
            Segment::Text {
                text: "go ".to_string(),
                attrs: Attrs::default(),
                link: Some("https://a".to_string()),
            },
            Segment::Text {
                text: "here".to_string(),
                attrs: bold(),
                link: Some("https://a".to_string()),
            },
        ]);
        assert_eq!(nodes.len(), 1);
        assert_eq!(
            nodes[0].kind,
            NodeKind::Link {
                href: "https://a".to_string()
            }
        );
        assert_eq!(nodes[0].children.len(), 2);
    }

    #[test]
    fn test_map_text_between_only_touches_range() {
        let mut segs = vec![Segment::text("abcdef", Attrs::default())];
        let touched = map_text_between(&mut segs, 2, 4, |attrs, _| {
            attrs.marks.insert(Mark::Italic);
        });
        assert!(touched);
        let nodes = build_inline(segs);
        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes[1].text_content(), "cd");
        assert!(nodes[1].attrs.marks.contains(&Mark::Italic));
    }

    #[test]
    fn test_plain_round_trip() {
        let segs = from_plain("a\nb", &Attrs::default());
        assert_eq!(segs.len(), 3);
        assert_eq!(to_plain(&segs), "a\nb");
    }

    #[test]
    fn test_attrs_before_inherits_previous_text() {
        let segs = vec![
            Segment::text("ab", bold()),
            Segment::text("cd", Attrs::default()),
        ];
        assert_eq!(attrs_before(&segs, 2), bold());
        assert_eq!(attrs_before(&segs, 3), Attrs::default());
        assert_eq!(attrs_before(&segs, 0), Attrs::default());
    }
}
