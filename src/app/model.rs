use std::hash::{DefaultHasher, Hash, Hasher};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

use crate::document::{deserialize, Document};
use crate::host::{EditorHost, Notice, NoticeLevel};
use crate::render::{render_read_only, VisualTree};
use crate::ui::style::Theme;
use crate::ui::viewport::Viewport;

const TOAST_TTL: Duration = Duration::from_secs(4);

fn hash_bytes(bytes: &[u8]) -> u64 {
    let mut hasher = DefaultHasher::new();
    bytes.hash(&mut hasher);
    hasher.finish()
}

/// What the terminal is showing.
#[derive(Debug)]
pub enum Screen {
    /// Read-only storefront rendering of a markup file.
    Viewer {
        path: PathBuf,
        doc: Document,
        content_hash: u64,
    },
    /// The admin editor on an application record.
    Editor(Box<EditorHost>),
}

impl Default for Screen {
    fn default() -> Self {
        Self::Viewer {
            path: PathBuf::new(),
            doc: Document::empty(),
            content_hash: 0,
        }
    }
}

#[derive(Debug, Clone)]
struct Toast {
    level: NoticeLevel,
    message: String,
    expires_at: Instant,
}

/// The complete application state.
#[derive(Debug, Default)]
pub struct Model {
    pub screen: Screen,
    pub viewport: Viewport,
    pub theme: Theme,
    pub watch_enabled: bool,
    pub help_visible: bool,
    pub should_quit: bool,
    /// Config locations listed in the help overlay.
    pub config_global_path: Option<PathBuf>,
    pub config_local_path: Option<PathBuf>,
    /// Layout line of the selection head at the last draw; the viewport
    /// follows it only when it moves.
    pub cursor_line: Option<usize>,
    toast: Option<Toast>,
}

impl Model {
    pub fn viewer(path: PathBuf, source: &str, terminal_size: (u16, u16)) -> Self {
        Self {
            screen: Screen::Viewer {
                path,
                doc: deserialize(source),
                content_hash: hash_bytes(source.as_bytes()),
            },
            viewport: Viewport::new(terminal_size.0, terminal_size.1, 0),
            ..Self::default()
        }
    }

    pub fn editor(host: EditorHost, terminal_size: (u16, u16)) -> Self {
        Self {
            screen: Screen::Editor(Box::new(host)),
            viewport: Viewport::new(terminal_size.0, terminal_size.1, 0),
            ..Self::default()
        }
    }

    pub const fn is_editing(&self) -> bool {
        matches!(self.screen, Screen::Editor(_))
    }

    pub fn host(&self) -> Option<&EditorHost> {
        match &self.screen {
            Screen::Editor(host) => Some(host),
            Screen::Viewer { .. } => None,
        }
    }

    pub fn host_mut(&mut self) -> Option<&mut EditorHost> {
        match &mut self.screen {
            Screen::Editor(host) => Some(host),
            Screen::Viewer { .. } => None,
        }
    }

    pub fn file_path(&self) -> Option<&Path> {
        match &self.screen {
            Screen::Viewer { path, .. } => Some(path),
            Screen::Editor(_) => None,
        }
    }

    /// The tree to draw: read-only for the viewer, editable for the editor.
    pub fn visual_tree(&self) -> VisualTree {
        match &self.screen {
            Screen::Viewer { doc, .. } => render_read_only(doc),
            Screen::Editor(host) => host
                .render()
                .unwrap_or_else(|| render_read_only(&Document::empty())),
        }
    }

    /// Milliseconds until the editor host next needs a tick.
    pub fn editor_wait_ms(&self) -> Option<u64> {
        let host = self.host()?;
        let deadline = host.next_deadline()?;
        Some(deadline.saturating_sub(host.now_ms()))
    }

    pub(super) fn show_toast(&mut self, level: NoticeLevel, message: impl Into<String>) {
        self.toast = Some(Toast {
            level,
            message: message.into(),
            expires_at: Instant::now() + TOAST_TTL,
        });
    }

    pub(super) fn expire_toast(&mut self, now: Instant) -> bool {
        if self
            .toast
            .as_ref()
            .is_some_and(|toast| toast.expires_at <= now)
        {
            self.toast = None;
            return true;
        }
        false
    }

    pub fn active_toast(&self) -> Option<(&str, NoticeLevel)> {
        self.toast
            .as_ref()
            .map(|toast| (toast.message.as_str(), toast.level))
    }

    /// Show the most severe pending host notice.
    pub(super) fn pull_notices(&mut self) {
        let notices: Vec<Notice> = self
            .host_mut()
            .map(EditorHost::take_notices)
            .unwrap_or_default();
        let worst = notices.into_iter().max_by_key(|notice| match notice.level {
            NoticeLevel::Info => 0,
            NoticeLevel::Warning => 1,
            NoticeLevel::Error => 2,
        });
        if let Some(notice) = worst {
            self.show_toast(notice.level, notice.message);
        }
    }

    /// Re-read the viewed file. Returns whether its content changed.
    pub(super) fn reload_from_disk(&mut self) -> Result<bool> {
        let Screen::Viewer {
            path,
            doc,
            content_hash,
        } = &mut self.screen
        else {
            return Ok(false);
        };
        let source = std::fs::read_to_string(&*path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let hash = hash_bytes(source.as_bytes());
        if hash == *content_hash {
            return Ok(false);
        }
        *doc = deserialize(&source);
        *content_hash = hash;
        Ok(true)
    }
}
