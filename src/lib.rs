// Only allow lints that are either transitive-dependency noise or
// genuinely opinionated style choices that don't indicate real issues.
#![allow(
    // Transitive dependency version mismatches we can't control
    clippy::multiple_crate_versions,
    // module_name_repetitions is pure style preference (e.g. store::StoreError)
    clippy::module_name_repetitions
)]

//! # Richdoc
//!
//! Rich-text authoring for app store listings.
//!
//! Richdoc keeps a listing's long description as a structured document:
//! - Paragraphs, headings, lists, quotes, code blocks and images
//! - Inline marks, links and colors
//! - Undoable editing commands over a positional selection
//! - Debounced autosave into a content store
//!
//! ## Architecture
//!
//! The terminal front end uses The Elm Architecture (TEA) pattern:
//! - **Model**: Application state
//! - **Message**: Events and actions
//! - **Update**: Pure state transitions
//! - **View**: Render to terminal
//!
//! ## Modules
//!
//! - [`document`]: Node tree, positions, edits and markup conversion
//! - [`editor`]: Editing sessions, history, key bindings and autosave
//! - [`render`]: Visual tree for read-only and editable display
//! - [`store`]: Records, blob uploads and session checks
//! - [`host`]: Wires a session to the stores and the clock
//! - [`app`]: Main application loop and state
//! - [`ui`]: Terminal UI components
//! - [`config`]: Saved defaults
//! - [`watcher`]: File watching

pub mod app;
pub mod config;
pub mod document;
pub mod editor;
pub mod host;
pub mod render;
pub mod store;
pub mod ui;
pub mod watcher;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::app::{App, Message, Model};
    pub use crate::document::{deserialize, serialize, Document};
    pub use crate::editor::{Command, EditorSession};
    pub use crate::host::EditorHost;
    pub use crate::ui::viewport::Viewport;
}
