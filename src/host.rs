//! Editor host: the admin page around an [`EditorSession`].
//!
//! The host mounts a session on an application record, forwards change
//! notifications into the autosaver, persists due saves through the
//! [`ContentStore`] and surfaces failures as notices. Nothing here blocks;
//! the caller drives time by calling [`EditorHost::tick`].

use std::path::Path;
use std::sync::mpsc::{self, Receiver, Sender};

use crossterm::event::KeyEvent;
use tracing::{debug, warn};

use crate::editor::{
    translate_key, AutoSaver, Clock, Command, CommandOutcome, EditorSession, Focus, KeyOutcome,
    SaveStatus, SaveTicket, SessionConfig, DEFAULT_DEBOUNCE_MS, SAVED_STATUS_MS,
};
use crate::render::{render, Interaction, RenderMode, VisualTree};
use crate::store::{
    upload_file, ApplicationPatch, AuthProvider, BlobStore, ContentStore, RecordId, StoreError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// A message for the author, shown once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("no editor session is mounted")]
    NoSession,
    #[error("not signed in")]
    Unauthenticated,
    #[error("application {0} not found")]
    NotFound(RecordId),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostConfig {
    pub session: SessionConfig,
    pub debounce_ms: u64,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            debounce_ms: DEFAULT_DEBOUNCE_MS,
        }
    }
}

pub struct EditorHost {
    store: Box<dyn ContentStore>,
    blobs: Box<dyn BlobStore>,
    auth: Box<dyn AuthProvider>,
    clock: Box<dyn Clock>,
    config: HostConfig,
    saver: AutoSaver,
    session: Option<EditorSession>,
    record: Option<RecordId>,
    changes_tx: Sender<String>,
    changes_rx: Receiver<String>,
    notices: Vec<Notice>,
    focus: Focus,
}

impl EditorHost {
    pub fn new(
        store: Box<dyn ContentStore>,
        blobs: Box<dyn BlobStore>,
        auth: Box<dyn AuthProvider>,
        clock: Box<dyn Clock>,
        config: HostConfig,
    ) -> Self {
        let (changes_tx, changes_rx) = mpsc::channel();
        Self {
            store,
            blobs,
            auth,
            clock,
            config,
            saver: AutoSaver::new(config.debounce_ms),
            session: None,
            record: None,
            changes_tx,
            changes_rx,
            notices: Vec::new(),
            focus: Focus::Content,
        }
    }

    /// Open the editor on a record's long description. Any session already
    /// mounted is unmounted first, flushing its pending save.
    pub fn mount(&mut self, id: &RecordId) -> Result<(), HostError> {
        if !self.auth.has_session() {
            return Err(HostError::Unauthenticated);
        }
        if self.session.is_some() {
            self.unmount();
        }
        let app = self
            .store
            .read(id)?
            .ok_or_else(|| HostError::NotFound(id.clone()))?;

        let mut session = EditorSession::mount(&app.long_description, self.config.session);
        let tx = self.changes_tx.clone();
        session.on_change(move |html| {
            if tx.send(html.to_string()).is_err() {
                debug!("change receiver dropped");
            }
        });
        session.focus();

        debug!(record = %id, "editor mounted");
        self.session = Some(session);
        self.record = Some(id.clone());
        self.saver = AutoSaver::new(self.config.debounce_ms);
        self.focus = Focus::Content;
        Ok(())
    }

    /// Flush any pending save and drop the session. Returns the final markup.
    pub fn unmount(&mut self) -> Option<String> {
        self.collect_changes();
        if let Some(ticket) = self.saver.flush() {
            self.persist(ticket);
        }
        let session = self.session.take()?;
        if let Some(id) = self.record.take() {
            debug!(record = %id, "editor unmounted");
        }
        Some(session.unmount())
    }

    pub fn dispatch(&mut self, command: Command) -> Result<CommandOutcome, HostError> {
        let session = self.session.as_mut().ok_or(HostError::NoSession)?;
        let outcome = session.apply(command);
        self.collect_changes();
        Ok(outcome)
    }

    /// Route a key press through the focus-aware key map. `None` means the
    /// key is not an editor key.
    pub fn handle_key(&mut self, key: KeyEvent) -> Result<Option<CommandOutcome>, HostError> {
        match translate_key(key, self.focus) {
            KeyOutcome::Command(command) => self.dispatch(command).map(Some),
            KeyOutcome::Suppressed => {
                debug!(?key, "key suppressed outside the content area");
                Ok(Some(CommandOutcome::Unchanged))
            }
            KeyOutcome::Ignored => Ok(None),
        }
    }

    /// Upload a local image and insert it at the selection.
    pub fn insert_image_file(&mut self, path: &Path) -> Result<CommandOutcome, HostError> {
        if self.session.is_none() {
            return Err(HostError::NoSession);
        }
        let bytes = std::fs::read(path).map_err(|e| StoreError::io(path, e))?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let src = upload_file(self.blobs.as_mut(), &file_name, &bytes)?;
        let alt = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .filter(|stem| !stem.is_empty());
        self.dispatch(Command::InsertImage { src, alt })
    }

    /// Advance timers: issue a due save and expire the "saved" status.
    /// Returns whether anything visible changed.
    pub fn tick(&mut self) -> bool {
        self.collect_changes();
        let now = self.clock.now_ms();
        let mut changed = self.saver.tick(now);
        if let Some(ticket) = self.saver.poll(now) {
            self.persist(ticket);
            changed = true;
        }
        changed
    }

    /// Save the pending content now instead of waiting for the debounce.
    pub fn save_now(&mut self) -> bool {
        self.collect_changes();
        match self.saver.flush() {
            Some(ticket) => {
                self.persist(ticket);
                true
            }
            None => false,
        }
    }

    /// Re-queue the latest content after a failed save.
    pub fn retry(&mut self) -> bool {
        let now = self.clock.now_ms();
        let queued = self.saver.retry(now);
        if queued {
            self.push_notice(NoticeLevel::Info, "Retrying save");
        }
        queued
    }

    fn collect_changes(&mut self) {
        let now = self.clock.now_ms();
        while let Ok(html) = self.changes_rx.try_recv() {
            self.saver.content_changed(html, now);
        }
    }

    fn persist(&mut self, ticket: SaveTicket) {
        let Some(id) = self.record.clone() else {
            return;
        };
        let result = self
            .store
            .update(&id, &ApplicationPatch::long_description(ticket.content))
            .map_err(|err| err.to_string());
        let now = self.clock.now_ms();
        let applied = self.saver.complete(ticket.generation, result.clone(), now);
        if !applied {
            return;
        }
        match result {
            Ok(()) => {
                if !self.saver.is_pending()
                    && let Some(session) = self.session.as_mut()
                {
                    session.mark_clean();
                }
            }
            Err(message) => {
                warn!(record = %id, %message, "autosave failed");
                self.push_notice(NoticeLevel::Error, format!("Could not save: {message}"));
            }
        }
    }

    fn push_notice(&mut self, level: NoticeLevel, message: impl Into<String>) {
        self.notices.push(Notice {
            level,
            message: message.into(),
        });
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    pub const fn status(&self) -> &SaveStatus {
        self.saver.status()
    }

    pub const fn focus(&self) -> Focus {
        self.focus
    }

    pub fn set_focus(&mut self, focus: Focus) {
        self.focus = focus;
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Content => Focus::Toolbar,
            Focus::Toolbar => Focus::Content,
        };
    }

    pub const fn session(&self) -> Option<&EditorSession> {
        self.session.as_ref()
    }

    pub const fn record_id(&self) -> Option<&RecordId> {
        self.record.as_ref()
    }

    pub fn is_mounted(&self) -> bool {
        self.session.is_some()
    }

    /// Current clock reading, for callers that schedule around the host.
    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    /// Editable view of the mounted document.
    pub fn render(&self) -> Option<VisualTree> {
        let session = self.session.as_ref()?;
        let interaction = Interaction {
            selection: session.selection(),
            toolbar: session.toolbar_state(),
        };
        Some(render(session.document(), RenderMode::Editable(interaction)))
    }

    /// Earliest time at which [`Self::tick`] has work to do.
    pub fn next_deadline(&self) -> Option<u64> {
        let expiry = match self.saver.status() {
            SaveStatus::Saved { at_ms } => Some(at_ms + SAVED_STATUS_MS),
            _ => None,
        };
        match (self.saver.due_at(), expiry) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }
}

impl std::fmt::Debug for EditorHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorHost")
            .field("record", &self.record)
            .field("status", self.saver.status())
            .field("focus", &self.focus)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Selection;
    use crate::editor::ManualClock;
    use crate::store::{MemoryBlobStore, MemoryStore, NewApplication, StaticAuth};
    use crossterm::event::{KeyCode, KeyModifiers};

    fn host_with(store: &MemoryStore, clock: &ManualClock, signed_in: bool) -> EditorHost {
        EditorHost::new(
            Box::new(store.clone()),
            Box::new(MemoryBlobStore::new()),
            Box::new(StaticAuth(signed_in)),
            Box::new(clock.clone()),
            HostConfig::default(),
        )
    }

    fn seeded(html: &str) -> (MemoryStore, RecordId) {
        let mut store = MemoryStore::new();
        let id = store
            .create(NewApplication {
                name: "Notes".to_string(),
                long_description: html.to_string(),
                ..NewApplication::default()
            })
            .unwrap();
        (store, id)
    }

    #[test]
    fn test_mount_requires_session() {
        let (store, id) = seeded("<p>hi</p>");
        let clock = ManualClock::new();
        let mut host = host_with(&store, &clock, false);
        assert!(matches!(host.mount(&id), Err(HostError::Unauthenticated)));
        assert!(!host.is_mounted());
    }

    #[test]
    fn test_mount_missing_record() {
        let (store, _) = seeded("<p>hi</p>");
        let clock = ManualClock::new();
        let mut host = host_with(&store, &clock, true);
        assert!(matches!(
            host.mount(&RecordId::new("app-99")),
            Err(HostError::NotFound(_))
        ));
    }

    #[test]
    fn test_dispatch_without_session() {
        let (store, _) = seeded("<p>hi</p>");
        let clock = ManualClock::new();
        let mut host = host_with(&store, &clock, true);
        assert!(matches!(
            host.dispatch(Command::Undo),
            Err(HostError::NoSession)
        ));
    }

    #[test]
    fn test_change_is_saved_after_debounce() {
        let (store, id) = seeded("<p>hi</p>");
        let clock = ManualClock::new();
        let mut host = host_with(&store, &clock, true);
        host.mount(&id).unwrap();
        host.dispatch(Command::SetSelection(Selection::cursor(2)))
            .unwrap();
        host.dispatch(Command::InsertText("!".to_string())).unwrap();

        clock.advance(999);
        host.tick();
        assert!(store.updates().is_empty());

        clock.advance(1);
        host.tick();
        assert_eq!(store.updates().len(), 1);
        assert_eq!(store.record(&id).unwrap().long_description, "<p>hi!</p>");
        assert!(matches!(host.status(), SaveStatus::Saved { .. }));
        assert!(!host.session().unwrap().is_dirty());
    }

    #[test]
    fn test_failure_produces_error_notice() {
        let (store, id) = seeded("<p>hi</p>");
        store.fail_next_updates(["offline"]);
        let clock = ManualClock::new();
        let mut host = host_with(&store, &clock, true);
        host.mount(&id).unwrap();
        host.dispatch(Command::InsertText("a".to_string())).unwrap();
        clock.advance(1000);
        host.tick();

        let notices = host.take_notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, NoticeLevel::Error);
        assert!(notices[0].message.contains("offline"));
        assert!(host.session().unwrap().is_dirty());
        assert_eq!(host.session().unwrap().serialized(), "<p>ahi</p>");
    }

    #[test]
    fn test_enter_on_toolbar_does_not_split() {
        let (store, id) = seeded("<p>hi</p>");
        let clock = ManualClock::new();
        let mut host = host_with(&store, &clock, true);
        host.mount(&id).unwrap();
        host.toggle_focus();
        let outcome = host
            .handle_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE))
            .unwrap();
        assert_eq!(outcome, Some(CommandOutcome::Unchanged));
        assert_eq!(host.session().unwrap().serialized(), "<p>hi</p>");
        assert!(host.saver.due_at().is_none());
    }

    #[test]
    fn test_unmount_flushes_pending_save() {
        let (store, id) = seeded("<p></p>");
        let clock = ManualClock::new();
        let mut host = host_with(&store, &clock, true);
        host.mount(&id).unwrap();
        host.dispatch(Command::InsertText("draft".to_string()))
            .unwrap();
        let html = host.unmount().unwrap();
        assert_eq!(html, "<p>draft</p>");
        assert_eq!(store.record(&id).unwrap().long_description, "<p>draft</p>");
        assert!(!host.is_mounted());
    }

    #[test]
    fn test_next_deadline_tracks_debounce_and_saved_expiry() {
        let (store, id) = seeded("<p></p>");
        let clock = ManualClock::new();
        let mut host = host_with(&store, &clock, true);
        host.mount(&id).unwrap();
        assert_eq!(host.next_deadline(), None);
        host.dispatch(Command::InsertText("x".to_string())).unwrap();
        assert_eq!(host.next_deadline(), Some(1000));
        clock.advance(1000);
        host.tick();
        assert_eq!(host.next_deadline(), Some(1000 + SAVED_STATUS_MS));
    }
}
