//! The editing session: one document, its selection and history, and the
//! command set the toolbar and keyboard drive.

use serde::Serialize;
use tracing::debug;

use crate::document::{
    parse_with_report, serialize, Attrs, BlockAttr, BlockContext, Color, Document, ListKind, Mark,
    MarkSet, ModelError, Node, NodeKind, ParseOptions, Range, Selection, TextAlign,
};

use super::history::{History, Snapshot};
use super::motion::{self, Direction};

/// Whether the document differs from what was last saved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum EditState {
    #[default]
    Clean,
    Dirty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorTarget {
    Text,
    Background,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    ToggleMark(Mark),
    /// Level 0 turns the blocks back into paragraphs.
    SetHeading(u8),
    SetTextAlign(TextAlign),
    SetColor {
        target: ColorTarget,
        color: Option<Color>,
    },
    ToggleList(ListKind),
    ToggleCodeBlock,
    ToggleBlockquote,
    InsertHorizontalRule,
    InsertImage {
        src: String,
        alt: Option<String>,
    },
    InsertLink(String),
    InsertText(String),
    SplitBlock,
    InsertHardBreak,
    DeleteBackward,
    Move {
        direction: Direction,
        extend: bool,
    },
    SetSelection(Selection),
    Undo,
    Redo,
}

impl Command {
    /// Commands that can change the document.
    pub const fn is_mutation(&self) -> bool {
        !matches!(
            self,
            Self::Move { .. } | Self::SetSelection(_) | Self::Undo | Self::Redo
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("no selection")]
    NoSelection,
    #[error("heading level {0} is above the maximum of {1}")]
    HeadingLevel(u8, u8),
    #[error("nothing before the cursor")]
    AtStart,
    #[error(transparent)]
    Model(#[from] ModelError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Applied,
    Unchanged,
    Rejected(Rejection),
    NothingToUndo,
    NothingToRedo,
}

impl CommandOutcome {
    pub const fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Undo depth; 0 disables history.
    pub history_limit: usize,
    /// Highest level `SetHeading` accepts.
    pub max_heading_level: u8,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            history_limit: 100,
            max_heading_level: 3,
        }
    }
}

/// What the toolbar shows for the current selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolbarState {
    pub marks: MarkSet,
    pub heading: Option<u8>,
    pub align: Option<TextAlign>,
    pub bullet_list: bool,
    pub ordered_list: bool,
    pub code_block: bool,
    pub blockquote: bool,
    pub text_color: Option<Color>,
    pub background_color: Option<Color>,
    pub can_undo: bool,
    pub can_redo: bool,
}

type ChangeCallback = Box<dyn FnMut(&str)>;

/// Work-in-progress state a command mutates before it is committed.
struct Draft {
    doc: Document,
    selection: Selection,
    stored: Option<Attrs>,
}

pub struct EditorSession {
    doc: Document,
    selection: Option<Selection>,
    history: History,
    state: EditState,
    stored: Option<Attrs>,
    config: SessionConfig,
    on_change: Option<ChangeCallback>,
}

impl EditorSession {
    /// Mount a session on stored markup. Malformed markup is repaired.
    pub fn mount(html: &str, config: SessionConfig) -> Self {
        let (doc, recoveries) = parse_with_report(html, &ParseOptions::default());
        if !recoveries.is_empty() {
            debug!(count = recoveries.len(), ?recoveries, "repaired stored markup");
        }
        Self::from_document(doc, config)
    }

    pub fn from_document(doc: Document, config: SessionConfig) -> Self {
        Self {
            doc,
            selection: None,
            history: History::new(config.history_limit),
            state: EditState::Clean,
            stored: None,
            config,
            on_change: None,
        }
    }

    /// Register the change callback. It receives the full serialized
    /// document after every accepted mutation, undo and redo.
    pub fn on_change(&mut self, callback: impl FnMut(&str) + 'static) {
        self.on_change = Some(Box::new(callback));
    }

    pub const fn document(&self) -> &Document {
        &self.doc
    }

    pub const fn selection(&self) -> Option<Selection> {
        self.selection
    }

    /// Put a cursor at the start when nothing is selected.
    pub fn focus(&mut self) {
        if self.selection.is_none() {
            self.selection = Some(Selection::cursor(0));
        }
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
        self.stored = None;
    }

    pub const fn state(&self) -> EditState {
        self.state
    }

    pub fn is_dirty(&self) -> bool {
        self.state == EditState::Dirty
    }

    /// Record that the current content has been persisted.
    pub fn mark_clean(&mut self) {
        self.state = EditState::Clean;
    }

    pub fn serialized(&self) -> String {
        serialize(&self.doc)
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// End the session, discarding history. Returns the final markup.
    pub fn unmount(self) -> String {
        self.serialized()
    }

    /// Run one command. Rejected commands leave the session untouched.
    pub fn apply(&mut self, command: Command) -> CommandOutcome {
        debug!(?command, "apply command");
        match command {
            Command::Undo => return self.undo(),
            Command::Redo => return self.redo(),
            Command::SetSelection(selection) => {
                let selection = selection.clamped(self.doc.size());
                if self.selection == Some(selection) {
                    return CommandOutcome::Unchanged;
                }
                self.selection = Some(selection);
                self.stored = None;
                return CommandOutcome::Applied;
            }
            _ => {}
        }
        let Some(selection) = self.selection else {
            return CommandOutcome::Rejected(Rejection::NoSelection);
        };
        let mut draft = Draft {
            doc: self.doc.clone(),
            selection,
            stored: self.stored.clone(),
        };
        if let Err(rejection) = self.run(&mut draft, command) {
            debug!(%rejection, "command rejected");
            return CommandOutcome::Rejected(rejection);
        }

        let content_changed = draft.doc != self.doc;
        if !content_changed && draft.selection == selection && draft.stored == self.stored {
            return CommandOutcome::Unchanged;
        }
        if content_changed {
            let before = Snapshot {
                doc: std::mem::replace(&mut self.doc, draft.doc),
                selection: self.selection,
            };
            self.history.record(before);
        }
        self.selection = Some(draft.selection.clamped(self.doc.size()));
        self.stored = draft.stored;
        if content_changed {
            self.changed();
        }
        CommandOutcome::Applied
    }

    fn run(&self, draft: &mut Draft, command: Command) -> Result<(), Rejection> {
        let range = draft.selection.range();
        match command {
            Command::ToggleMark(mark) => {
                if range.is_collapsed() {
                    let stored = draft.stored.get_or_insert_with(|| attrs_at(&draft.doc, range.from));
                    if !stored.marks.remove(&mark) {
                        stored.marks.insert(mark);
                    }
                } else {
                    draft.doc.apply_mark(range, mark)?;
                }
            }
            Command::SetHeading(level) => {
                let max = self.config.max_heading_level;
                if level > max {
                    return Err(Rejection::HeadingLevel(level, max));
                }
                let target = if level == 0
                    || all_blocks(&draft.doc, range, |b| b.kind == NodeKind::Heading { level })
                {
                    NodeKind::Paragraph
                } else {
                    NodeKind::Heading { level }
                };
                draft.doc.set_block_kind(range, &target)?;
            }
            Command::SetTextAlign(align) => {
                draft
                    .doc
                    .set_block_attribute(range, &BlockAttr::TextAlign(Some(align)))?;
            }
            Command::SetColor {
                target: ColorTarget::Text,
                color,
            } => {
                if range.is_collapsed() {
                    let stored = draft.stored.get_or_insert_with(|| attrs_at(&draft.doc, range.from));
                    stored.color = color;
                } else {
                    draft.doc.set_text_color(range, color.as_ref())?;
                }
            }
            Command::SetColor {
                target: ColorTarget::Background,
                color,
            } => {
                draft
                    .doc
                    .set_block_attribute(range, &BlockAttr::BackgroundColor(color))?;
            }
            Command::ToggleList(kind) => {
                if all_blocks(&draft.doc, range, |b| b.list_kind() == Some(kind)) {
                    draft.doc.lift(range)?;
                } else if all_blocks(&draft.doc, range, |b| b.list_kind().is_some()) {
                    draft.doc.set_list_kind(range, kind)?;
                } else {
                    draft.doc.wrap_in(range, kind.node_kind())?;
                }
            }
            Command::ToggleCodeBlock => {
                let target = if all_blocks(&draft.doc, range, |b| b.kind == NodeKind::CodeBlock) {
                    NodeKind::Paragraph
                } else {
                    NodeKind::CodeBlock
                };
                draft.doc.set_block_kind(range, &target)?;
            }
            Command::ToggleBlockquote => {
                if all_blocks(&draft.doc, range, BlockContext::in_blockquote) {
                    draft.doc.lift(range)?;
                } else {
                    draft.doc.wrap_in(range, NodeKind::Blockquote)?;
                }
            }
            Command::InsertHorizontalRule => {
                let pos = replace_selection(draft)?;
                let cursor = draft.doc.insert_horizontal_rule(pos)?;
                draft.selection = Selection::cursor(cursor);
            }
            Command::InsertImage { src, alt } => {
                let pos = replace_selection(draft)?;
                let cursor = draft.doc.insert_inline(pos, Node::new(NodeKind::Image { src, alt }))?;
                draft.selection = Selection::cursor(cursor);
            }
            Command::InsertLink(href) => {
                let cursor = draft.doc.wrap_link(range, &href)?;
                draft.selection = Selection::cursor(cursor);
            }
            Command::InsertText(text) => {
                let pos = replace_selection(draft)?;
                let cursor = draft.doc.insert_text(pos, &text, draft.stored.as_ref())?;
                draft.selection = Selection::cursor(cursor);
                draft.stored = None;
            }
            Command::SplitBlock => {
                let pos = replace_selection(draft)?;
                let cursor = draft.doc.split_block(pos)?;
                draft.selection = Selection::cursor(cursor);
            }
            Command::InsertHardBreak => {
                let pos = replace_selection(draft)?;
                let cursor = draft.doc.insert_inline(pos, Node::new(NodeKind::HardBreak))?;
                draft.selection = Selection::cursor(cursor);
            }
            Command::DeleteBackward => {
                let target = if range.is_collapsed() {
                    if range.from == 0 {
                        return Err(Rejection::AtStart);
                    }
                    Range::new(range.from - 1, range.from)
                } else {
                    range
                };
                let cursor = draft.doc.delete_range(target)?;
                draft.selection = Selection::cursor(cursor);
            }
            Command::Move { direction, extend } => {
                let head = motion::step(&draft.doc, draft.selection.head, direction);
                let anchor = if extend { draft.selection.anchor } else { head };
                draft.selection = Selection::new(anchor, head);
                draft.stored = None;
            }
            Command::SetSelection(_) | Command::Undo | Command::Redo => {}
        }
        Ok(())
    }

    fn undo(&mut self) -> CommandOutcome {
        let current = Snapshot {
            doc: self.doc.clone(),
            selection: self.selection,
        };
        match self.history.undo(current) {
            Some(previous) => {
                self.restore(previous);
                CommandOutcome::Applied
            }
            None => CommandOutcome::NothingToUndo,
        }
    }

    fn redo(&mut self) -> CommandOutcome {
        let current = Snapshot {
            doc: self.doc.clone(),
            selection: self.selection,
        };
        match self.history.redo(current) {
            Some(next) => {
                self.restore(next);
                CommandOutcome::Applied
            }
            None => CommandOutcome::NothingToRedo,
        }
    }

    fn restore(&mut self, snapshot: Snapshot) {
        self.doc = snapshot.doc;
        self.selection = snapshot.selection.map(|s| s.clamped(self.doc.size()));
        self.stored = None;
        self.changed();
    }

    fn changed(&mut self) {
        self.state = EditState::Dirty;
        if let Some(callback) = self.on_change.as_mut() {
            let html = serialize(&self.doc);
            callback(&html);
        }
    }

    /// Formatting state of the current selection.
    pub fn toolbar_state(&self) -> ToolbarState {
        let mut state = ToolbarState {
            can_undo: self.can_undo(),
            can_redo: self.can_redo(),
            ..ToolbarState::default()
        };
        let Some(selection) = self.selection else {
            return state;
        };
        let range = selection.range();
        let blocks = self.doc.blocks_in(range);
        let every = |f: &dyn Fn(&BlockContext) -> bool| !blocks.is_empty() && blocks.iter().all(f);

        match (&self.stored, range.is_collapsed()) {
            (Some(stored), true) => {
                state.marks = stored.marks.clone();
                state.text_color = stored.color.clone();
            }
            _ => {
                let runs = self.doc.text_attrs_in(range);
                state.marks = self.doc.marks_in(range);
                state.text_color = common(runs.iter().map(|attrs| attrs.color.clone())).flatten();
            }
        }
        state.heading = common(blocks.iter().map(|b| match b.kind {
            NodeKind::Heading { level } => Some(level),
            _ => None,
        }))
        .flatten();
        state.align = common(blocks.iter().map(|b| b.attrs.text_align)).flatten();
        state.background_color =
            common(blocks.iter().map(|b| b.attrs.background_color.clone())).flatten();
        state.bullet_list = every(&|b| b.list_kind() == Some(ListKind::Bullet));
        state.ordered_list = every(&|b| b.list_kind() == Some(ListKind::Ordered));
        state.code_block = every(&|b| b.kind == NodeKind::CodeBlock);
        state.blockquote = every(&BlockContext::in_blockquote);
        state
    }
}

impl std::fmt::Debug for EditorSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorSession")
            .field("selection", &self.selection)
            .field("state", &self.state)
            .field("stored", &self.stored)
            .field("config", &self.config)
            .field("undo_depth", &self.history.undo_depth())
            .finish_non_exhaustive()
    }
}

/// Delete a non-empty selection and return the cursor left behind.
fn replace_selection(draft: &mut Draft) -> Result<usize, ModelError> {
    let range = draft.selection.range();
    if range.is_collapsed() {
        return Ok(range.from);
    }
    let cursor = draft.doc.delete_range(range)?;
    draft.selection = Selection::cursor(cursor);
    Ok(cursor)
}

fn attrs_at(doc: &Document, pos: usize) -> Attrs {
    doc.text_attrs_in(Range::cursor(pos))
        .into_iter()
        .next()
        .unwrap_or_default()
}

fn all_blocks(doc: &Document, range: Range, f: impl Fn(&BlockContext) -> bool) -> bool {
    let blocks = doc.blocks_in(range);
    !blocks.is_empty() && blocks.iter().all(f)
}

/// The value shared by every item, if there is at least one and they agree.
fn common<T: PartialEq>(mut values: impl Iterator<Item = T>) -> Option<T> {
    let first = values.next()?;
    values.all(|v| v == first).then_some(first)
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    fn session(html: &str) -> EditorSession {
        let mut s = EditorSession::mount(html, SessionConfig::default());
        s.focus();
        s
    }

    fn select(s: &mut EditorSession, anchor: usize, head: usize) {
        s.apply(Command::SetSelection(Selection::new(anchor, head)));
    }

    #[test]
    fn test_mount_starts_clean_without_selection() {
        let s = EditorSession::mount("<p>hi</p>", SessionConfig::default());
        assert_eq!(s.state(), EditState::Clean);
        assert!(s.selection().is_none());
        assert!(!s.can_undo());
    }

    #[test]
    fn test_commands_without_selection_are_rejected() {
        let mut s = EditorSession::mount("<p>hi</p>", SessionConfig::default());
        let outcome = s.apply(Command::ToggleMark(Mark::Bold));
        assert_eq!(outcome, CommandOutcome::Rejected(Rejection::NoSelection));
        assert_eq!(s.state(), EditState::Clean);
    }

    #[test]
    fn test_mutation_sets_dirty_and_emits() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let mut s = session("<p>hello</p>");
        s.on_change(move |html| sink.borrow_mut().push(html.to_string()));
        select(&mut s, 0, 5);
        assert!(s.apply(Command::ToggleMark(Mark::Bold)).is_applied());
        assert!(s.is_dirty());
        assert_eq!(*seen.borrow(), vec!["<p><strong>hello</strong></p>".to_string()]);
    }

    #[test]
    fn test_selection_change_does_not_emit_or_dirty() {
        let seen = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&seen);
        let mut s = session("<p>hello</p>");
        s.on_change(move |_| *sink.borrow_mut() += 1);
        select(&mut s, 1, 3);
        s.apply(Command::Move {
            direction: Direction::Right,
            extend: true,
        });
        assert_eq!(s.selection(), Some(Selection::new(1, 4)));
        assert_eq!(*seen.borrow(), 0);
        assert_eq!(s.state(), EditState::Clean);
    }

    #[test]
    fn test_undo_redo_and_exhaustion() {
        let mut s = session("<p>ab</p>");
        select(&mut s, 2, 2);
        s.apply(Command::InsertText("c".to_string()));
        assert_eq!(s.serialized(), "<p>abc</p>");

        assert_eq!(s.apply(Command::Undo), CommandOutcome::Applied);
        assert_eq!(s.serialized(), "<p>ab</p>");
        assert_eq!(s.apply(Command::Undo), CommandOutcome::NothingToUndo);
        assert_eq!(s.apply(Command::Redo), CommandOutcome::Applied);
        assert_eq!(s.serialized(), "<p>abc</p>");
        assert_eq!(s.apply(Command::Redo), CommandOutcome::NothingToRedo);
    }

    #[test]
    fn test_undo_does_not_grow_history() {
        let mut s = session("<p>a</p>");
        select(&mut s, 1, 1);
        s.apply(Command::InsertText("b".to_string()));
        s.apply(Command::Undo);
        s.apply(Command::Redo);
        s.apply(Command::Undo);
        assert_eq!(s.apply(Command::Undo), CommandOutcome::NothingToUndo);
    }

    #[test]
    fn test_exhausted_history_leaves_content_and_selection() {
        let seen = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&seen);
        let mut s = session("<h2>Title</h2><p>body</p>");
        s.on_change(move |_| *sink.borrow_mut() += 1);
        select(&mut s, 1, 4);
        let doc = s.document().clone();
        let selection = s.selection();

        assert_eq!(s.apply(Command::Undo), CommandOutcome::NothingToUndo);
        assert_eq!(s.apply(Command::Redo), CommandOutcome::NothingToRedo);
        assert_eq!(s.document(), &doc);
        assert_eq!(s.selection(), selection);
        assert_eq!(s.state(), EditState::Clean);
        assert_eq!(*seen.borrow(), 0);
    }

    #[test]
    fn test_image_without_source_is_rejected() {
        let mut s = session("<p>ab</p>");
        select(&mut s, 2, 2);
        let outcome = s.apply(Command::InsertImage {
            src: " ".to_string(),
            alt: None,
        });
        assert!(matches!(outcome, CommandOutcome::Rejected(Rejection::Model(ModelError::Rejected(_)))));
        assert_eq!(s.serialized(), "<p>ab</p>");
        assert!(!s.can_undo());
    }

    #[test]
    fn test_heading_toggle_and_limit() {
        let mut s = session("<p>Title</p>");
        s.apply(Command::SetHeading(2));
        assert_eq!(s.serialized(), "<h2>Title</h2>");
        assert_eq!(s.toolbar_state().heading, Some(2));
        s.apply(Command::SetHeading(2));
        assert_eq!(s.serialized(), "<p>Title</p>");
        assert_eq!(
            s.apply(Command::SetHeading(4)),
            CommandOutcome::Rejected(Rejection::HeadingLevel(4, 3))
        );
    }

    #[test]
    fn test_toggle_list_wrap_retag_lift() {
        let mut s = session("<p>one</p><p>two</p>");
        select(&mut s, 0, 5);
        s.apply(Command::ToggleList(ListKind::Bullet));
        assert_eq!(s.serialized(), "<ul><li><p>one</p></li><li><p>two</p></li></ul>");
        assert!(s.toolbar_state().bullet_list);

        s.apply(Command::ToggleList(ListKind::Ordered));
        assert_eq!(s.serialized(), "<ol><li><p>one</p></li><li><p>two</p></li></ol>");

        s.apply(Command::ToggleList(ListKind::Ordered));
        assert_eq!(s.serialized(), "<p>one</p><p>two</p>");
    }

    #[test]
    fn test_toggle_blockquote_and_code_block() {
        let mut s = session("<p>x</p>");
        s.apply(Command::ToggleBlockquote);
        assert_eq!(s.serialized(), "<blockquote><p>x</p></blockquote>");
        s.apply(Command::ToggleBlockquote);
        assert_eq!(s.serialized(), "<p>x</p>");
        s.apply(Command::ToggleCodeBlock);
        assert_eq!(s.serialized(), "<pre><code>x</code></pre>");
        assert!(s.toolbar_state().code_block);
        s.apply(Command::ToggleCodeBlock);
        assert_eq!(s.serialized(), "<p>x</p>");
    }

    #[test]
    fn test_stored_marks_apply_to_typed_text() {
        let mut s = session("<p>ab</p>");
        select(&mut s, 2, 2);
        s.apply(Command::ToggleMark(Mark::Italic));
        assert!(s.toolbar_state().marks.contains(&Mark::Italic));
        assert_eq!(s.state(), EditState::Clean);
        s.apply(Command::InsertText("c".to_string()));
        assert_eq!(s.serialized(), "<p>ab<em>c</em></p>");
    }

    #[test]
    fn test_colors_and_alignment() {
        let mut s = session("<p>hello</p>");
        select(&mut s, 0, 5);
        s.apply(Command::SetColor {
            target: ColorTarget::Text,
            color: Color::parse("#ff0000"),
        });
        s.apply(Command::SetColor {
            target: ColorTarget::Background,
            color: Color::parse("yellow"),
        });
        s.apply(Command::SetTextAlign(TextAlign::Center));
        assert_eq!(
            s.serialized(),
            r#"<p style="text-align: center; background-color: yellow"><span style="color: #ff0000">hello</span></p>"#
        );
        let toolbar = s.toolbar_state();
        assert_eq!(toolbar.align, Some(TextAlign::Center));
        assert_eq!(toolbar.text_color, Color::parse("#ff0000"));
        assert_eq!(toolbar.background_color, Color::parse("yellow"));
    }

    #[test]
    fn test_typing_replaces_selection() {
        let mut s = session("<p>hello</p>");
        select(&mut s, 1, 4);
        s.apply(Command::InsertText("EY".to_string()));
        assert_eq!(s.serialized(), "<p>hEYo</p>");
        assert_eq!(s.selection(), Some(Selection::cursor(3)));
    }

    #[test]
    fn test_enter_and_backspace() {
        let mut s = session("<p>ab</p>");
        select(&mut s, 1, 1);
        s.apply(Command::SplitBlock);
        assert_eq!(s.serialized(), "<p>a</p><p>b</p>");
        assert_eq!(s.selection(), Some(Selection::cursor(2)));
        s.apply(Command::DeleteBackward);
        assert_eq!(s.serialized(), "<p>ab</p>");
        select(&mut s, 0, 0);
        assert_eq!(
            s.apply(Command::DeleteBackward),
            CommandOutcome::Rejected(Rejection::AtStart)
        );
    }

    #[test]
    fn test_insert_image_link_and_rule() {
        let mut s = session("<p>ab</p>");
        select(&mut s, 2, 2);
        s.apply(Command::InsertImage {
            src: "https://cdn/x.png".to_string(),
            alt: None,
        });
        assert_eq!(s.serialized(), r#"<p>ab<img src="https://cdn/x.png"></p>"#);
        select(&mut s, 0, 2);
        s.apply(Command::InsertLink("https://x.y".to_string()));
        assert!(s.serialized().starts_with(r#"<p><a href="https://x.y""#));
        select(&mut s, 3, 3);
        s.apply(Command::InsertHorizontalRule);
        assert!(s.serialized().ends_with("<hr><p></p>"));
    }

    #[test]
    fn test_rejected_command_keeps_state() {
        let mut s = session("<pre><code>x</code></pre>");
        select(&mut s, 0, 1);
        let before = s.serialized();
        assert!(matches!(
            s.apply(Command::ToggleMark(Mark::Bold)),
            CommandOutcome::Rejected(Rejection::Model(ModelError::Rejected(_)))
        ));
        assert_eq!(s.serialized(), before);
        assert!(!s.can_undo());
    }

    #[test]
    fn test_mark_clean_after_save() {
        let mut s = session("<p>a</p>");
        s.apply(Command::InsertText("b".to_string()));
        assert!(s.is_dirty());
        s.mark_clean();
        assert_eq!(s.state(), EditState::Clean);
    }
}
