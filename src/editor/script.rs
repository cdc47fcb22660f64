//! Line-oriented command scripts for driving a session without a terminal.
//!
//! Each step is one line: a verb followed by arguments, e.g. `select 0 5`,
//! `bold`, `heading 2`, `type Hello world`, `wait 1500`.

use std::path::PathBuf;

use crate::document::{Color, ListKind, Mark, Selection, TextAlign};

use super::motion::Direction;
use super::session::{ColorTarget, Command};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Command(Command),
    /// Upload a local file and insert it as an image.
    UploadImage(PathBuf),
    /// Let time pass, in milliseconds.
    Wait(u64),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScriptError {
    #[error("empty step")]
    Empty,
    #[error("unknown step '{0}'")]
    UnknownStep(String),
    #[error("bad argument for '{step}': {reason}")]
    BadArgument { step: String, reason: String },
}

pub fn parse_step(line: &str) -> Result<Step, ScriptError> {
    let line = line.trim();
    let (verb, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();
    let args: Vec<&str> = rest.split_whitespace().collect();
    let bad = |reason: &str| ScriptError::BadArgument {
        step: verb.to_string(),
        reason: reason.to_string(),
    };
    let number = |idx: usize| -> Result<usize, ScriptError> {
        args.get(idx)
            .ok_or_else(|| bad("missing number"))?
            .parse()
            .map_err(|_| bad("expected a number"))
    };
    let color = || -> Result<Option<Color>, ScriptError> {
        match rest {
            "" => Err(bad("missing color")),
            "none" => Ok(None),
            value => Color::parse(value).map(Some).ok_or_else(|| bad("invalid color")),
        }
    };

    let command = match verb {
        "" => return Err(ScriptError::Empty),
        "select" => Command::SetSelection(Selection::new(number(0)?, number(1)?)),
        "cursor" => Command::SetSelection(Selection::cursor(number(0)?)),
        "wait" => {
            let ms = rest.parse().map_err(|_| bad("expected milliseconds"))?;
            return Ok(Step::Wait(ms));
        }
        "image-file" => {
            if rest.is_empty() {
                return Err(bad("missing path"));
            }
            return Ok(Step::UploadImage(PathBuf::from(rest)));
        }
        "heading" => {
            let level = number(0)?;
            let level = u8::try_from(level).map_err(|_| bad("level out of range"))?;
            Command::SetHeading(level)
        }
        "paragraph" => Command::SetHeading(0),
        "align" => Command::SetTextAlign(TextAlign::parse(rest).ok_or_else(|| bad("unknown alignment"))?),
        "bullet" => Command::ToggleList(ListKind::Bullet),
        "ordered" => Command::ToggleList(ListKind::Ordered),
        "code-block" => Command::ToggleCodeBlock,
        "quote" => Command::ToggleBlockquote,
        "hr" => Command::InsertHorizontalRule,
        "color" => Command::SetColor {
            target: ColorTarget::Text,
            color: color()?,
        },
        "bg" => Command::SetColor {
            target: ColorTarget::Background,
            color: color()?,
        },
        "image" => {
            let src = args.first().ok_or_else(|| bad("missing url"))?;
            let alt = rest[src.len()..].trim();
            Command::InsertImage {
                src: (*src).to_string(),
                alt: (!alt.is_empty()).then(|| alt.to_string()),
            }
        }
        "link" => {
            if rest.is_empty() {
                return Err(bad("missing url"));
            }
            Command::InsertLink(rest.to_string())
        }
        "type" => {
            if rest.is_empty() {
                return Err(bad("missing text"));
            }
            Command::InsertText(rest.to_string())
        }
        "enter" => Command::SplitBlock,
        "break" => Command::InsertHardBreak,
        "backspace" => Command::DeleteBackward,
        "undo" => Command::Undo,
        "redo" => Command::Redo,
        other => {
            let (name, extend) = other
                .strip_prefix("shift-")
                .map_or((other, false), |name| (name, true));
            if let Some(mark) = Mark::from_name(other) {
                Command::ToggleMark(mark)
            } else if let Some(direction) = Direction::parse(name) {
                Command::Move { direction, extend }
            } else {
                return Err(ScriptError::UnknownStep(other.to_string()));
            }
        }
    };
    Ok(Step::Command(command))
}

/// Parse a multi-line script. Blank lines and `#` comments are skipped.
pub fn parse_script(source: &str) -> Result<Vec<Step>, ScriptError> {
    source
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(parse_step)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_selection_and_marks() {
        assert_eq!(
            parse_step("select 5 1").unwrap(),
            Step::Command(Command::SetSelection(Selection::new(5, 1)))
        );
        assert_eq!(
            parse_step("bold").unwrap(),
            Step::Command(Command::ToggleMark(Mark::Bold))
        );
    }

    #[test]
    fn test_parse_text_keeps_spacing() {
        assert_eq!(
            parse_step("type Hello,  world").unwrap(),
            Step::Command(Command::InsertText("Hello,  world".to_string()))
        );
    }

    #[test]
    fn test_parse_colors() {
        assert_eq!(
            parse_step("bg none").unwrap(),
            Step::Command(Command::SetColor {
                target: ColorTarget::Background,
                color: None
            })
        );
        assert!(matches!(
            parse_step("color url(x)"),
            Err(ScriptError::BadArgument { .. })
        ));
    }

    #[test]
    fn test_parse_image_with_alt() {
        assert_eq!(
            parse_step("image https://cdn/a.png Main screen").unwrap(),
            Step::Command(Command::InsertImage {
                src: "https://cdn/a.png".to_string(),
                alt: Some("Main screen".to_string()),
            })
        );
    }

    #[test]
    fn test_parse_movement() {
        assert_eq!(
            parse_step("shift-right").unwrap(),
            Step::Command(Command::Move {
                direction: Direction::Right,
                extend: true
            })
        );
        assert_eq!(
            parse_step("home").unwrap(),
            Step::Command(Command::Move {
                direction: Direction::Home,
                extend: false
            })
        );
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(parse_step("   "), Err(ScriptError::Empty));
        assert_eq!(
            parse_step("explode"),
            Err(ScriptError::UnknownStep("explode".to_string()))
        );
        assert!(parse_step("heading x").is_err());
    }

    #[test]
    fn test_parse_script_skips_comments() {
        let steps = parse_script("# intro\ncursor 0\n\ntype hi\nwait 1000\n").unwrap();
        assert_eq!(steps.len(), 3);
        assert_eq!(steps[2], Step::Wait(1000));
    }
}
