use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event;
use ratatui::DefaultTerminal;

use crate::app::{update, App, Message, Model};
use crate::editor::DelayedTask;
use crate::host::NoticeLevel;
use crate::ui::style::Theme;
use crate::watcher::FileWatcher;

const RESIZE_DEBOUNCE_MS: u64 = 100;
const IDLE_POLL_MS: u64 = 250;

impl App {
    /// Run the main event loop.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal cannot be initialised or drawn, or
    /// if reading terminal events fails.
    pub fn run(self) -> Result<()> {
        let mut terminal = ratatui::try_init()
            .context("Failed to initialize terminal; richdoc needs an interactive terminal")?;
        let size = terminal.size()?;

        let mut model = match self.target {
            super::Target::View { path, source } => {
                Model::viewer(path, &source, (size.width, size.height))
            }
            super::Target::Edit(host) => Model::editor(*host, (size.width, size.height)),
        };
        model.watch_enabled = self.watch_enabled && !model.is_editing();
        model.theme = Theme::for_mode(self.theme);
        model.config_global_path = self.config_global_path;
        model.config_local_path = self.config_local_path;

        let result = Self::event_loop(&mut terminal, &mut model);
        ratatui::restore();
        result
    }

    fn event_loop(terminal: &mut DefaultTerminal, model: &mut Model) -> Result<()> {
        let start = Instant::now();
        let elapsed_ms = || u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        let mut resize = DelayedTask::new(RESIZE_DEBOUNCE_MS);
        let mut file_watcher = if model.watch_enabled {
            Self::start_watcher(model)
        } else {
            None
        };
        let mut needs_render = true;

        loop {
            if model.expire_toast(Instant::now()) {
                needs_render = true;
            }

            let now_ms = elapsed_ms();
            if let Some((width, height)) = resize.take_ready(now_ms) {
                *model = update(std::mem::take(model), Message::Resize(width, height));
                needs_render = true;
            }

            if model.watch_enabled
                && file_watcher
                    .as_mut()
                    .is_some_and(|watcher| watcher.take_change_ready(now_ms))
            {
                *model = update(std::mem::take(model), Message::FileChanged);
                needs_render = true;
            }

            if model.editor_wait_ms() == Some(0) {
                *model = update(std::mem::take(model), Message::Tick);
                needs_render = true;
            }

            let poll_ms = if needs_render {
                0
            } else if resize.is_pending()
                || file_watcher.as_ref().is_some_and(FileWatcher::is_pending)
            {
                10
            } else {
                model
                    .editor_wait_ms()
                    .map_or(IDLE_POLL_MS, |wait| wait.min(IDLE_POLL_MS))
            };

            if event::poll(Duration::from_millis(poll_ms))? {
                // Coalesce bursts (key repeat, paste) into one render.
                loop {
                    let msg = Self::handle_event(&event::read()?, model, elapsed_ms(), &mut resize);
                    if let Some(msg) = msg {
                        let side_msg = msg.clone();
                        *model = update(std::mem::take(model), msg);
                        Self::handle_message_side_effects(model, &mut file_watcher, &side_msg);
                        needs_render = true;
                    }
                    if model.should_quit || !event::poll(Duration::from_millis(0))? {
                        break;
                    }
                }
            }

            if needs_render {
                terminal.draw(|frame| crate::ui::render(model, frame))?;
                needs_render = false;
            }

            if model.should_quit {
                break;
            }
        }
        Ok(())
    }

    pub(super) fn start_watcher(model: &mut Model) -> Option<FileWatcher> {
        let path = model.file_path()?.to_path_buf();
        match FileWatcher::new(&path, super::WATCH_DEBOUNCE_MS) {
            Ok(watcher) => Some(watcher),
            Err(err) => {
                model.watch_enabled = false;
                model.show_toast(NoticeLevel::Warning, format!("Watch unavailable: {err}"));
                None
            }
        }
    }
}
