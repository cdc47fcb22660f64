//! Rich-text document model.
//!
//! This module handles:
//! - The node tree and its invariants (`types`, `normalize`)
//! - Cursor positions over leaf blocks (`position`)
//! - All-or-nothing structural edits (`ops`)
//! - Conversion to and from stored markup (`serialize`, `parser`)

mod inline;
mod normalize;
mod ops;
mod parser;
mod position;
mod serialize;
mod types;

pub use ops::BlockContext;
pub use parser::{deserialize, parse_with_report, ParseOptions, Recovery};
pub use position::{Range, Selection};
pub use serialize::{serialize, EMPTY_DOCUMENT};
pub use types::{
    Attrs, BlockAttr, Color, Document, ListKind, Mark, MarkSet, ModelError, Node, NodeKind,
    TextAlign,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_round_trip() {
        let html = serialize(&Document::empty());
        assert_eq!(html, EMPTY_DOCUMENT);
        let doc = deserialize(&html);
        assert!(doc.is_empty());
        assert_eq!(doc.blocks().len(), 1);
    }

    #[test]
    fn test_edits_survive_round_trip() {
        let mut doc = deserialize("<p>hello world</p><p>second line</p>");
        doc.apply_mark(Range::new(0, 5), Mark::Bold).unwrap();
        doc.set_block_attribute(
            Range::cursor(13),
            &BlockAttr::BackgroundColor(Color::parse("#fafafa")),
        )
        .unwrap();
        doc.wrap_in(Range::cursor(13), NodeKind::Blockquote).unwrap();
        doc.wrap_link(Range::new(6, 11), "https://example.com").unwrap();
        assert_eq!(deserialize(&serialize(&doc)), doc);
    }
}
