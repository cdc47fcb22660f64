//! Application state and main event loop.
//!
//! This module implements The Elm Architecture (TEA):
//! - [`Model`]: The complete application state
//! - [`Message`]: All possible events and actions
//! - [`update`]: Pure function for state transitions
//! - [`App::run`]: Main event loop with rendering

mod effects;
mod event_loop;
mod input;
mod model;
mod update;

pub use model::{Model, Screen};
pub use update::{update, Message};

use std::path::PathBuf;

use crate::config::ThemeMode;
use crate::host::EditorHost;

const WATCH_DEBOUNCE_MS: u64 = 200;

enum Target {
    View { path: PathBuf, source: String },
    Edit(Box<EditorHost>),
}

/// Owns the startup settings; [`App::run`] turns them into a [`Model`].
pub struct App {
    target: Target,
    watch_enabled: bool,
    theme: ThemeMode,
    config_global_path: Option<PathBuf>,
    config_local_path: Option<PathBuf>,
}

impl App {
    /// Page through a markup file read-only.
    pub fn viewer(path: PathBuf, source: String) -> Self {
        Self::with_target(Target::View { path, source })
    }

    /// Edit the record the host has mounted.
    pub fn editor(host: EditorHost) -> Self {
        Self::with_target(Target::Edit(Box::new(host)))
    }

    const fn with_target(target: Target) -> Self {
        Self {
            target,
            watch_enabled: false,
            theme: ThemeMode::Dark,
            config_global_path: None,
            config_local_path: None,
        }
    }

    /// Reload the viewed file when it changes on disk.
    pub const fn with_watch(mut self, enabled: bool) -> Self {
        self.watch_enabled = enabled;
        self
    }

    pub const fn with_theme(mut self, theme: ThemeMode) -> Self {
        self.theme = theme;
        self
    }

    /// Set config paths to show in help.
    pub fn with_config_paths(
        mut self,
        global_path: Option<PathBuf>,
        local_path: Option<PathBuf>,
    ) -> Self {
        self.config_global_path = global_path;
        self.config_local_path = local_path;
        self
    }
}
