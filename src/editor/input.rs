//! Keyboard to command translation.
//!
//! Enter pressed while a toolbar control has focus is swallowed here so it
//! can neither submit the surrounding form nor split a block.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::document::{ListKind, Mark, TextAlign};

use super::motion::Direction;
use super::session::Command;

/// Which part of the editor has keyboard focus.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Focus {
    #[default]
    Content,
    Toolbar,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOutcome {
    Command(Command),
    /// Consumed without effect.
    Suppressed,
    /// Not an editor key; let the host handle it.
    Ignored,
}

pub fn translate_key(key: KeyEvent, focus: Focus) -> KeyOutcome {
    if key.kind == KeyEventKind::Release {
        return KeyOutcome::Ignored;
    }
    if focus == Focus::Toolbar {
        return match key.code {
            KeyCode::Enter => KeyOutcome::Suppressed,
            _ => KeyOutcome::Ignored,
        };
    }

    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let shift = key.modifiers.contains(KeyModifiers::SHIFT);
    let alt = key.modifiers.contains(KeyModifiers::ALT);

    let command = match key.code {
        KeyCode::Enter if shift => Command::InsertHardBreak,
        KeyCode::Enter => Command::SplitBlock,
        KeyCode::Backspace => Command::DeleteBackward,
        KeyCode::Left => movement(Direction::Left, shift),
        KeyCode::Right => movement(Direction::Right, shift),
        KeyCode::Up => movement(Direction::Up, shift),
        KeyCode::Down => movement(Direction::Down, shift),
        KeyCode::Home => movement(Direction::Home, shift),
        KeyCode::End => movement(Direction::End, shift),
        KeyCode::Char(c) if ctrl && alt => match c {
            '0'..='6' => Command::SetHeading(c as u8 - b'0'),
            'c' | 'C' => Command::ToggleCodeBlock,
            _ => return KeyOutcome::Ignored,
        },
        KeyCode::Char(c) if ctrl => match (c.to_ascii_lowercase(), shift) {
            ('b', false) => Command::ToggleMark(Mark::Bold),
            ('i', false) => Command::ToggleMark(Mark::Italic),
            ('u', false) => Command::ToggleMark(Mark::Underline),
            ('e', false) => Command::ToggleMark(Mark::Code),
            ('s', true) => Command::ToggleMark(Mark::Strike),
            ('b', true) => Command::ToggleBlockquote,
            ('7' | '&', true) => Command::ToggleList(ListKind::Ordered),
            ('8' | '*', true) => Command::ToggleList(ListKind::Bullet),
            ('l', true) => Command::SetTextAlign(TextAlign::Left),
            ('e', true) => Command::SetTextAlign(TextAlign::Center),
            ('r', true) => Command::SetTextAlign(TextAlign::Right),
            ('j', true) => Command::SetTextAlign(TextAlign::Justify),
            ('z', false) => Command::Undo,
            ('z', true) | ('y', false) => Command::Redo,
            _ => return KeyOutcome::Ignored,
        },
        KeyCode::Char(c) if !alt => Command::InsertText(c.to_string()),
        _ => return KeyOutcome::Ignored,
    };
    KeyOutcome::Command(command)
}

const fn movement(direction: Direction, extend: bool) -> Command {
    Command::Move { direction, extend }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn test_enter_on_toolbar_is_suppressed() {
        let outcome = translate_key(key(KeyCode::Enter, KeyModifiers::NONE), Focus::Toolbar);
        assert_eq!(outcome, KeyOutcome::Suppressed);
    }

    #[test]
    fn test_enter_in_content_splits_block() {
        assert_eq!(
            translate_key(key(KeyCode::Enter, KeyModifiers::NONE), Focus::Content),
            KeyOutcome::Command(Command::SplitBlock)
        );
        assert_eq!(
            translate_key(key(KeyCode::Enter, KeyModifiers::SHIFT), Focus::Content),
            KeyOutcome::Command(Command::InsertHardBreak)
        );
    }

    #[test]
    fn test_toolbar_ignores_other_keys() {
        let outcome = translate_key(key(KeyCode::Char('x'), KeyModifiers::NONE), Focus::Toolbar);
        assert_eq!(outcome, KeyOutcome::Ignored);
    }

    #[test]
    fn test_formatting_shortcuts() {
        let ctrl = KeyModifiers::CONTROL;
        let ctrl_shift = KeyModifiers::CONTROL | KeyModifiers::SHIFT;
        let cases = [
            (key(KeyCode::Char('b'), ctrl), Command::ToggleMark(Mark::Bold)),
            (key(KeyCode::Char('S'), ctrl_shift), Command::ToggleMark(Mark::Strike)),
            (key(KeyCode::Char('B'), ctrl_shift), Command::ToggleBlockquote),
            (key(KeyCode::Char('8'), ctrl_shift), Command::ToggleList(ListKind::Bullet)),
            (key(KeyCode::Char('E'), ctrl_shift), Command::SetTextAlign(TextAlign::Center)),
            (key(KeyCode::Char('z'), ctrl), Command::Undo),
            (key(KeyCode::Char('y'), ctrl), Command::Redo),
            (
                key(KeyCode::Char('2'), KeyModifiers::CONTROL | KeyModifiers::ALT),
                Command::SetHeading(2),
            ),
        ];
        for (event, expected) in cases {
            assert_eq!(translate_key(event, Focus::Content), KeyOutcome::Command(expected));
        }
    }

    #[test]
    fn test_plain_and_shifted_characters_insert_text() {
        assert_eq!(
            translate_key(key(KeyCode::Char('A'), KeyModifiers::SHIFT), Focus::Content),
            KeyOutcome::Command(Command::InsertText("A".to_string()))
        );
    }

    #[test]
    fn test_shift_arrow_extends() {
        assert_eq!(
            translate_key(key(KeyCode::Left, KeyModifiers::SHIFT), Focus::Content),
            KeyOutcome::Command(Command::Move {
                direction: Direction::Left,
                extend: true
            })
        );
    }
}
