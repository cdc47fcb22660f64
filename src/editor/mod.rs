//! Editor controller.
//!
//! An [`EditorSession`] owns one document and turns commands into model
//! operations, keeping undo history and the clean/dirty state. Keys reach it
//! through [`translate_key`]; persistence is debounced by [`AutoSaver`].

mod autosave;
mod history;
mod input;
mod motion;
mod script;
mod session;

pub use autosave::{
    AutoSaver, Clock, DelayedTask, ManualClock, SaveStatus, SaveTicket, SystemClock,
    DEFAULT_DEBOUNCE_MS, SAVED_STATUS_MS,
};
pub use history::{History, Snapshot};
pub use input::{translate_key, Focus, KeyOutcome};
pub use motion::Direction;
pub use script::{parse_script, parse_step, ScriptError, Step};
pub use session::{
    ColorTarget, Command, CommandOutcome, EditState, EditorSession, Rejection, SessionConfig,
    ToolbarState,
};
