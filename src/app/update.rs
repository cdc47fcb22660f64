use crossterm::event::KeyEvent;
use tracing::debug;

use crate::app::Model;
use crate::editor::CommandOutcome;
use crate::host::NoticeLevel;

/// All events and actions the application reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    // Navigation
    ScrollUp(usize),
    ScrollDown(usize),
    PageUp,
    PageDown,
    HalfPageUp,
    HalfPageDown,
    GoToTop,
    GoToBottom,

    // Viewer
    ToggleWatch,
    /// The viewed file changed on disk (or a reload was requested).
    FileChanged,

    // Editor
    /// A key for the editor surface.
    EditorKey(KeyEvent),
    /// Move keyboard focus between the content and the toolbar.
    ToggleFocus,
    RetrySave,
    SaveNow,
    /// Timers are due: debounced save or status expiry.
    Tick,

    // Window
    ToggleHelp,
    HideHelp,
    Resize(u16, u16),
    Quit,
}

/// Apply one message to the model.
pub fn update(mut model: Model, msg: Message) -> Model {
    match msg {
        Message::ScrollUp(n) => model.viewport.scroll_up(n),
        Message::ScrollDown(n) => model.viewport.scroll_down(n),
        Message::PageUp => model.viewport.page_up(),
        Message::PageDown => model.viewport.page_down(),
        Message::HalfPageUp => model.viewport.half_page_up(),
        Message::HalfPageDown => model.viewport.half_page_down(),
        Message::GoToTop => model.viewport.go_to_top(),
        Message::GoToBottom => model.viewport.go_to_bottom(),

        Message::ToggleWatch => {
            if !model.is_editing() {
                model.watch_enabled = !model.watch_enabled;
            }
        }
        Message::FileChanged => match model.reload_from_disk() {
            Ok(true) => model.show_toast(NoticeLevel::Info, "Reloaded"),
            Ok(false) => {}
            Err(err) => model.show_toast(NoticeLevel::Error, format!("Reload failed: {err:#}")),
        },

        Message::EditorKey(key) => {
            let result = model.host_mut().map(|host| host.handle_key(key));
            match result {
                Some(Ok(Some(outcome))) => report_outcome(&mut model, &outcome),
                Some(Ok(None)) | None => {}
                Some(Err(err)) => model.show_toast(NoticeLevel::Error, err.to_string()),
            }
            model.pull_notices();
        }
        Message::ToggleFocus => {
            if let Some(host) = model.host_mut() {
                host.toggle_focus();
            }
        }
        Message::RetrySave => {
            let retried = model.host_mut().is_some_and(|host| host.retry());
            if retried {
                model.pull_notices();
            } else if model.is_editing() {
                model.show_toast(NoticeLevel::Info, "Nothing to retry");
            }
        }
        Message::SaveNow => {
            if let Some(host) = model.host_mut() {
                host.save_now();
            }
            model.pull_notices();
        }
        Message::Tick => {
            if let Some(host) = model.host_mut() {
                host.tick();
            }
            model.pull_notices();
        }

        Message::ToggleHelp => model.help_visible = !model.help_visible,
        Message::HideHelp => model.help_visible = false,
        Message::Resize(width, height) => model.viewport.resize(width, height),
        Message::Quit => {
            if let Some(host) = model.host_mut() {
                host.unmount();
            }
            model.pull_notices();
            model.should_quit = true;
        }
    }
    model
}

fn report_outcome(model: &mut Model, outcome: &CommandOutcome) {
    match outcome {
        CommandOutcome::Rejected(reason) => {
            debug!(%reason, "command rejected");
            model.show_toast(NoticeLevel::Warning, reason.to_string());
        }
        CommandOutcome::NothingToUndo => model.show_toast(NoticeLevel::Info, "Nothing to undo"),
        CommandOutcome::NothingToRedo => model.show_toast(NoticeLevel::Info, "Nothing to redo"),
        CommandOutcome::Applied | CommandOutcome::Unchanged => {}
    }
}
