use proptest::prelude::*;

use richdoc::document::{
    deserialize, serialize, Color, Document, ListKind, Mark, Range, Selection, TextAlign,
};
use richdoc::editor::{ColorTarget, Command, EditorSession, SessionConfig};

const TAGS: [(&str, &str); 5] = [
    ("", ""),
    ("<strong>", "</strong>"),
    ("<em>", "</em>"),
    ("<u>", "</u>"),
    ("<s>", "</s>"),
];

fn block_html(kind: u8, inner: &str) -> String {
    match kind {
        0 => format!("<p>{inner}</p>"),
        1 => format!("<h2>{inner}</h2>"),
        2 => format!("<ul><li><p>{inner}</p></li></ul>"),
        3 => format!("<blockquote><p>{inner}</p></blockquote>"),
        _ => format!(r#"<p style="text-align: center">{inner}</p>"#),
    }
}

fn listing_html() -> impl Strategy<Value = String> {
    let word = ("[a-zA-Z0-9&]{1,6}", 0..TAGS.len())
        .prop_map(|(text, tag)| format!("{}{}{}", TAGS[tag].0, text.replace('&', "&amp;"), TAGS[tag].1));
    let block = (0u8..5, prop::collection::vec(word, 1..6))
        .prop_map(|(kind, words)| block_html(kind, &words.join(" ")));
    prop::collection::vec(block, 1..6).prop_map(|blocks| blocks.concat())
}

const MARKS: [Mark; 5] = [Mark::Bold, Mark::Italic, Mark::Underline, Mark::Strike, Mark::Code];
const COLORS: [&str; 4] = ["#E11D48", "#0f0", "navy", "rgb(1, 2, 3)"];

/// One editing step. Selections are stored as fractions of the document
/// size so they stay meaningful as the document grows and shrinks.
#[derive(Debug, Clone)]
enum Edit {
    Select(usize, usize),
    Run(Command),
}

fn typed_text() -> impl Strategy<Value = String> {
    prop_oneof!["[a-zA-Z &<>\"'\t\r\n]{1,8}", any::<String>()]
}

fn color() -> impl Strategy<Value = Option<Color>> {
    prop::option::of(prop::sample::select(COLORS.to_vec())).prop_map(|c| c.and_then(Color::parse))
}

fn structural_command() -> BoxedStrategy<Command> {
    prop_oneof![
        prop::sample::select(MARKS.to_vec()).prop_map(Command::ToggleMark),
        (0u8..=3).prop_map(Command::SetHeading),
        prop::sample::select(vec![TextAlign::Left, TextAlign::Center, TextAlign::Right, TextAlign::Justify])
            .prop_map(Command::SetTextAlign),
        (any::<bool>(), color()).prop_map(|(background, color)| Command::SetColor {
            target: if background { ColorTarget::Background } else { ColorTarget::Text },
            color,
        }),
        prop::sample::select(vec![ListKind::Bullet, ListKind::Ordered]).prop_map(Command::ToggleList),
        Just(Command::ToggleCodeBlock),
        Just(Command::ToggleBlockquote),
        Just(Command::InsertHorizontalRule),
    ]
    .boxed()
}

fn typing_command() -> BoxedStrategy<Command> {
    prop_oneof![
        3 => typed_text().prop_map(Command::InsertText),
        1 => ("[a-z:/. ]{0,10}", prop::option::of("[a-z \"<]{0,6}"))
            .prop_map(|(src, alt)| Command::InsertImage { src, alt }),
        1 => "[a-z:/.?=&# \n]{0,12}".prop_map(Command::InsertLink),
        1 => Just(Command::SplitBlock),
        1 => Just(Command::InsertHardBreak),
        2 => Just(Command::DeleteBackward),
        1 => Just(Command::Undo),
        1 => Just(Command::Redo),
    ]
    .boxed()
}

fn edit() -> impl Strategy<Value = Edit> {
    prop_oneof![
        1 => (0usize..=100, 0usize..=100).prop_map(|(a, b)| Edit::Select(a, b)),
        1 => structural_command().prop_map(Edit::Run),
        2 => typing_command().prop_map(Edit::Run),
    ]
}

proptest! {
    #[test]
    fn test_edited_document_survives_serialization(edits in prop::collection::vec(edit(), 1..30)) {
        let mut session = EditorSession::from_document(Document::empty(), SessionConfig::default());
        session.focus();
        for edit in edits {
            let command = match edit {
                Edit::Select(a, b) => {
                    let size = session.document().size();
                    Command::SetSelection(Selection::new(a * size / 100, b * size / 100))
                }
                Edit::Run(command) => command,
            };
            session.apply(command);
            let doc = session.document();
            prop_assert_eq!(&deserialize(&serialize(doc)), doc);
        }
    }

    #[test]
    fn test_serialize_then_parse_is_identity(html in listing_html()) {
        let doc = deserialize(&html);
        let stored = serialize(&doc);
        prop_assert_eq!(deserialize(&stored), doc);
        prop_assert_eq!(serialize(&deserialize(&stored)), stored);
    }

    #[test]
    fn test_mark_toggled_twice_restores_document(
        html in listing_html(),
        a in 0usize..200,
        b in 0usize..200,
        mark in prop::sample::select(vec![Mark::Bold, Mark::Italic, Mark::Underline, Mark::Strike]),
    ) {
        let original = deserialize(&html);
        let size = original.size();
        let (from, to) = (a.min(b).min(size), a.max(b).min(size));
        prop_assume!(from < to);

        let mut doc = original.clone();
        prop_assume!(doc.apply_mark(Range::new(from, to), mark).is_ok());
        doc.apply_mark(Range::new(from, to), mark).unwrap();
        prop_assert_eq!(serialize(&doc), serialize(&original));
    }
}

#[test]
fn test_empty_input_serializes_to_empty_paragraph() {
    for input in ["", "<p></p>", "<ul></ul>"] {
        assert_eq!(serialize(&deserialize(input)), "<p></p>");
    }
}
