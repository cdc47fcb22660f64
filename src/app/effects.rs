use crate::app::{App, Message, Model};
use crate::host::NoticeLevel;
use crate::watcher::FileWatcher;

impl App {
    /// Effects that reach outside the model: starting and stopping the
    /// file watcher.
    pub(super) fn handle_message_side_effects(
        model: &mut Model,
        file_watcher: &mut Option<FileWatcher>,
        msg: &Message,
    ) {
        if *msg != Message::ToggleWatch || model.is_editing() {
            return;
        }
        if model.watch_enabled {
            *file_watcher = Self::start_watcher(model);
            if file_watcher.is_some() {
                model.show_toast(NoticeLevel::Info, "Watching file changes");
            }
        } else {
            *file_watcher = None;
            model.show_toast(NoticeLevel::Info, "Watch disabled");
        }
    }
}
