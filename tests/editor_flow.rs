//! End-to-end editing through the host: commands in, saves out.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use richdoc::document::{deserialize, serialize, Color, Selection, TextAlign};
use richdoc::editor::{ColorTarget, Command, CommandOutcome, Focus, ManualClock, SaveStatus};
use richdoc::host::{EditorHost, HostConfig, HostError, NoticeLevel};
use richdoc::store::{
    ContentStore, MemoryBlobStore, MemoryStore, NewApplication, RecordId, StaticAuth,
};

struct Harness {
    host: EditorHost,
    store: MemoryStore,
    blobs: MemoryBlobStore,
    clock: ManualClock,
    id: RecordId,
}

impl Harness {
    fn new(long_description: &str) -> Self {
        let mut store = MemoryStore::new();
        let id = store
            .create(NewApplication {
                name: "Orbit".to_string(),
                long_description: long_description.to_string(),
                ..NewApplication::default()
            })
            .unwrap();
        let blobs = MemoryBlobStore::new();
        let clock = ManualClock::new();
        let mut host = EditorHost::new(
            Box::new(store.clone()),
            Box::new(blobs.clone()),
            Box::new(StaticAuth(true)),
            Box::new(clock.clone()),
            HostConfig::default(),
        );
        host.mount(&id).unwrap();
        Self {
            host,
            store,
            blobs,
            clock,
            id,
        }
    }

    fn run(&mut self, command: Command) -> CommandOutcome {
        self.host.dispatch(command).unwrap()
    }

    fn wait(&mut self, ms: u64) {
        self.clock.advance(ms);
        self.host.tick();
    }

    fn stored(&self) -> String {
        self.store.record(&self.id).unwrap().long_description
    }
}

#[test]
fn test_changes_within_window_coalesce_into_one_save() {
    let mut h = Harness::new("<p></p>");
    for c in ["a", "b", "c"] {
        h.run(Command::InsertText(c.to_string()));
        h.wait(300);
    }
    assert!(h.store.updates().is_empty());

    h.wait(699);
    assert!(h.store.updates().is_empty());
    h.wait(1);
    assert_eq!(h.store.updates().len(), 1);
    assert_eq!(h.stored(), "<p>abc</p>");
    assert_eq!(h.host.status(), &SaveStatus::Saved { at_ms: 1600 });
}

#[test]
fn test_each_command_is_one_undo_step() {
    let mut h = Harness::new("<p></p>");
    h.run(Command::InsertText("hello".to_string()));
    h.run(Command::SetSelection(Selection::new(0, 5)));
    h.run(Command::ToggleMark(richdoc::document::Mark::Bold));
    let session = h.host.session().unwrap();
    assert_eq!(session.serialized(), "<p><strong>hello</strong></p>");

    assert_eq!(h.run(Command::Undo), CommandOutcome::Applied);
    assert_eq!(h.host.session().unwrap().serialized(), "<p>hello</p>");
    assert_eq!(h.run(Command::Undo), CommandOutcome::Applied);
    assert_eq!(h.host.session().unwrap().serialized(), "<p></p>");
    assert_eq!(h.run(Command::Undo), CommandOutcome::NothingToUndo);

    assert_eq!(h.run(Command::Redo), CommandOutcome::Applied);
    assert_eq!(h.host.session().unwrap().serialized(), "<p>hello</p>");
}

#[test]
fn test_block_attributes_survive_save_and_remount() {
    let mut h = Harness::new("<p>centered</p><p>plain</p>");
    h.run(Command::SetSelection(Selection::cursor(2)));
    h.run(Command::SetTextAlign(TextAlign::Center));
    h.run(Command::SetColor {
        target: ColorTarget::Background,
        color: Color::parse("#fafafa"),
    });
    h.wait(1000);
    assert!(h.stored().contains("text-align: center"));

    let id = h.id.clone();
    h.host.mount(&id).unwrap();
    h.run(Command::SetSelection(Selection::cursor(2)));
    let toolbar = h.host.session().unwrap().toolbar_state();
    assert_eq!(toolbar.align, Some(TextAlign::Center));
    assert_eq!(toolbar.background_color, Color::parse("#fafafa"));

    h.run(Command::SetSelection(Selection::cursor(11)));
    let toolbar = h.host.session().unwrap().toolbar_state();
    assert_eq!(toolbar.align, None);
}

#[test]
fn test_background_survives_undo_of_later_mark() {
    let mut h = Harness::new("<p>first</p><p>second</p>");
    h.run(Command::SetSelection(Selection::cursor(2)));
    h.run(Command::SetColor {
        target: ColorTarget::Background,
        color: Color::parse("#fafafa"),
    });
    h.run(Command::SetSelection(Selection::new(7, 10)));
    assert!(h.run(Command::ToggleMark(richdoc::document::Mark::Bold)).is_applied());

    assert_eq!(h.run(Command::Undo), CommandOutcome::Applied);
    assert_eq!(h.run(Command::Redo), CommandOutcome::Applied);
    h.run(Command::SetSelection(Selection::cursor(2)));
    let toolbar = h.host.session().unwrap().toolbar_state();
    assert_eq!(toolbar.background_color, Color::parse("#fafafa"));

    h.wait(1000);
    let stored = h.stored();
    assert!(stored.starts_with(r#"<p style="background-color: #fafafa">first</p>"#));
    assert!(stored.contains("<strong>"));
}

#[test]
fn test_malformed_markup_mounts_clean() {
    let broken = "<p>unclosed <b>bold<div><p>after";
    let h = Harness::new(broken);
    let session = h.host.session().unwrap();
    assert!(!session.is_dirty());
    assert_eq!(session.serialized(), serialize(&deserialize(broken)));
    assert!(session.document().text_content().contains("after"));
}

#[test]
fn test_enter_on_toolbar_changes_nothing() {
    let mut h = Harness::new("<p>ab</p>");
    h.host.set_focus(Focus::Toolbar);
    let outcome = h
        .host
        .handle_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE))
        .unwrap();
    assert_eq!(outcome, Some(CommandOutcome::Unchanged));
    h.wait(5000);
    assert!(h.store.updates().is_empty());
    assert_eq!(h.host.session().unwrap().serialized(), "<p>ab</p>");
}

#[test]
fn test_failed_save_is_reported_and_retried() {
    let mut h = Harness::new("<p></p>");
    h.store.fail_next_updates(["network down"]);
    h.run(Command::InsertText("x".to_string()));
    h.wait(1000);

    assert!(matches!(h.host.status(), SaveStatus::Failed { .. }));
    let notices = h.host.take_notices();
    assert!(notices
        .iter()
        .any(|n| n.level == NoticeLevel::Error && n.message.contains("network down")));
    assert!(h.host.session().unwrap().is_dirty());

    assert!(h.host.retry());
    h.wait(1000);
    assert_eq!(h.stored(), "<p>x</p>");
    assert!(!h.host.session().unwrap().is_dirty());
}

#[test]
fn test_later_edit_wins_over_earlier_save() {
    let mut h = Harness::new("<p></p>");
    h.run(Command::InsertText("one".to_string()));
    assert!(h.host.save_now());
    assert_eq!(h.stored(), "<p>one</p>");

    h.run(Command::InsertText(" two".to_string()));
    h.wait(1000);
    assert_eq!(h.stored(), "<p>one two</p>");
    assert_eq!(h.store.updates().len(), 2);
}

#[test]
fn test_clearing_everything_saves_empty_paragraph() {
    let mut h = Harness::new("");
    h.run(Command::InsertText("a".to_string()));
    h.run(Command::DeleteBackward);
    h.wait(1000);
    assert_eq!(h.stored(), "<p></p>");
}

#[test]
fn test_uploaded_image_is_inserted() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("screenshot.png");
    std::fs::write(&path, b"\x89PNG fake").unwrap();

    let mut h = Harness::new("<p>see</p>");
    let outcome = h.host.insert_image_file(&path).unwrap();
    assert_eq!(outcome, CommandOutcome::Applied);

    let blob_paths = h.blobs.paths();
    assert_eq!(blob_paths.len(), 1);
    let html = h.host.session().unwrap().serialized();
    assert!(html.contains(&format!(r#"src="memory://{}""#, blob_paths[0])));
    assert!(html.contains(r#"alt="screenshot""#));
}

#[test]
fn test_mount_requires_session_and_record() {
    let store = MemoryStore::new();
    let mut host = EditorHost::new(
        Box::new(store.clone()),
        Box::new(MemoryBlobStore::new()),
        Box::new(StaticAuth(false)),
        Box::new(ManualClock::new()),
        HostConfig::default(),
    );
    assert!(matches!(
        host.mount(&RecordId::new("app-1")),
        Err(HostError::Unauthenticated)
    ));

    let mut h = Harness::new("<p></p>");
    let missing = RecordId::new("app-99");
    assert!(matches!(h.host.mount(&missing), Err(HostError::NotFound(_))));
}
