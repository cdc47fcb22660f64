use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::app::{App, Message, Model};
use crate::editor::DelayedTask;

impl App {
    pub(super) fn handle_event(
        event: &Event,
        model: &Model,
        now_ms: u64,
        resize: &mut DelayedTask<(u16, u16)>,
    ) -> Option<Message> {
        match event {
            Event::Key(key) if key.kind != KeyEventKind::Release => Self::handle_key(*key, model),
            Event::Resize(width, height) => {
                resize.queue((*width, *height), now_ms);
                None
            }
            _ => None,
        }
    }

    pub(super) fn handle_key(key: KeyEvent, model: &Model) -> Option<Message> {
        if model.help_visible {
            return match key.code {
                KeyCode::Esc | KeyCode::F(1) | KeyCode::Char('?' | 'q') => Some(Message::HideHelp),
                _ => None,
            };
        }
        if model.is_editing() {
            editor_key(key)
        } else {
            viewer_key(key)
        }
    }
}

fn viewer_key(key: KeyEvent) -> Option<Message> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('q') => Some(Message::Quit),
        KeyCode::Char('c') if ctrl => Some(Message::Quit),
        KeyCode::Char('d') if ctrl => Some(Message::HalfPageDown),
        KeyCode::Char('u') if ctrl => Some(Message::HalfPageUp),
        KeyCode::Char('j') | KeyCode::Down => Some(Message::ScrollDown(1)),
        KeyCode::Char('k') | KeyCode::Up => Some(Message::ScrollUp(1)),
        KeyCode::Char(' ') | KeyCode::PageDown => Some(Message::PageDown),
        KeyCode::Char('b') | KeyCode::PageUp => Some(Message::PageUp),
        KeyCode::Char('g') | KeyCode::Home => Some(Message::GoToTop),
        KeyCode::Char('G') | KeyCode::End => Some(Message::GoToBottom),
        KeyCode::Char('w') => Some(Message::ToggleWatch),
        KeyCode::Char('r' | 'R') => Some(Message::FileChanged),
        KeyCode::Char('?') | KeyCode::F(1) => Some(Message::ToggleHelp),
        _ => None,
    }
}

/// Printable keys belong to the document; application shortcuts use
/// control chords, function keys and Tab.
fn editor_key(key: KeyEvent) -> Option<Message> {
    let only_ctrl = key.modifiers == KeyModifiers::CONTROL;
    match key.code {
        KeyCode::Esc => Some(Message::Quit),
        KeyCode::Char('q' | 'c') if only_ctrl => Some(Message::Quit),
        KeyCode::Char('r') if only_ctrl => Some(Message::RetrySave),
        KeyCode::Char('s') if only_ctrl => Some(Message::SaveNow),
        KeyCode::Tab | KeyCode::BackTab => Some(Message::ToggleFocus),
        KeyCode::F(1) => Some(Message::ToggleHelp),
        KeyCode::PageDown => Some(Message::PageDown),
        KeyCode::PageUp => Some(Message::PageUp),
        _ => Some(Message::EditorKey(key)),
    }
}
