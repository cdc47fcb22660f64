//! Terminal styles for rendered documents.
//!
//! Block roles map to theme styles; span styles and document colors are
//! layered on top. Document colors are emitted as true color when the
//! terminal supports it and as the nearest xterm-256 index otherwise.

use ratatui::style::{Color, Modifier, Style};

use crate::config::ThemeMode;
use crate::document;
use crate::render::{SpanStyle, TextRole};

#[derive(Debug, Clone)]
pub struct Theme {
    pub h1: Style,
    pub h2: Style,
    pub h3: Style,
    /// Levels 4 and deeper.
    pub h4: Style,
    pub code: Style,
    pub inline_code: Style,
    pub quote: Style,
    pub link: Style,
    pub list_marker: Style,
    pub image: Style,
    pub hr: Style,
    pub selection: Style,
    pub cursor: Style,
    pub toolbar_active: Style,
    pub toolbar_idle: Style,
    pub status_bg: Color,
    pub status_fg: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}

impl Theme {
    pub fn for_mode(mode: ThemeMode) -> Self {
        match mode {
            ThemeMode::Dark => Self::dark(),
            ThemeMode::Light => Self::light(),
        }
    }

    pub fn dark() -> Self {
        Self {
            h1: Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
            h2: Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
            h3: Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
            h4: Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::BOLD),
            code: Style::default()
                .fg(Color::Indexed(250))
                .bg(Color::Indexed(235)),
            inline_code: Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            quote: Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::ITALIC),
            link: Style::default()
                .fg(Color::LightBlue)
                .add_modifier(Modifier::UNDERLINED),
            list_marker: Style::default().fg(Color::Yellow),
            image: Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::ITALIC),
            hr: Style::default().fg(Color::Indexed(240)),
            selection: Style::default().bg(Color::Indexed(24)),
            cursor: Style::default().add_modifier(Modifier::REVERSED),
            toolbar_active: Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
            toolbar_idle: Style::default().fg(Color::Indexed(250)),
            status_bg: Color::Indexed(236),
            status_fg: Color::Indexed(252),
        }
    }

    pub fn light() -> Self {
        Self {
            h1: Style::default()
                .fg(Color::Indexed(31))
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
            h2: Style::default()
                .fg(Color::Indexed(28))
                .add_modifier(Modifier::BOLD),
            h3: Style::default()
                .fg(Color::Indexed(136))
                .add_modifier(Modifier::BOLD),
            h4: Style::default()
                .fg(Color::Indexed(25))
                .add_modifier(Modifier::BOLD),
            code: Style::default()
                .fg(Color::Indexed(238))
                .bg(Color::Indexed(254)),
            inline_code: Style::default()
                .fg(Color::Indexed(124))
                .add_modifier(Modifier::BOLD),
            quote: Style::default()
                .fg(Color::Indexed(25))
                .add_modifier(Modifier::ITALIC),
            link: Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::UNDERLINED),
            list_marker: Style::default().fg(Color::Indexed(136)),
            image: Style::default()
                .fg(Color::Indexed(90))
                .add_modifier(Modifier::ITALIC),
            hr: Style::default().fg(Color::Indexed(245)),
            selection: Style::default().bg(Color::Indexed(153)),
            cursor: Style::default().add_modifier(Modifier::REVERSED),
            toolbar_active: Style::default()
                .fg(Color::White)
                .bg(Color::Indexed(25))
                .add_modifier(Modifier::BOLD),
            toolbar_idle: Style::default().fg(Color::Indexed(240)),
            status_bg: Color::Indexed(252),
            status_fg: Color::Indexed(235),
        }
    }

    pub fn style_for_role(&self, role: TextRole) -> Style {
        match role {
            TextRole::Paragraph => Style::default(),
            TextRole::Heading(1) => self.h1,
            TextRole::Heading(2) => self.h2,
            TextRole::Heading(3) => self.h3,
            TextRole::Heading(_) => self.h4,
            TextRole::Code => self.code,
        }
    }
}

/// Layer a span's marks and color over the block style.
pub fn style_for_span(base: Style, span: &SpanStyle, in_link: bool, theme: &Theme) -> Style {
    let mut style = base;
    if span.bold {
        style = style.add_modifier(Modifier::BOLD);
    }
    if span.italic {
        style = style.add_modifier(Modifier::ITALIC);
    }
    if span.underline {
        style = style.add_modifier(Modifier::UNDERLINED);
    }
    if span.strike {
        style = style.add_modifier(Modifier::CROSSED_OUT);
    }
    if span.code {
        style = style.patch(theme.inline_code);
    }
    if in_link {
        style = style.patch(theme.link);
    }
    // Author-chosen colors win over role colors.
    if let Some(fg) = span.color.as_ref().and_then(terminal_color) {
        style = style.fg(fg).remove_modifier(Modifier::DIM);
    }
    style
}

/// A document color as a terminal color; `None` for names the model keeps
/// but cannot resolve.
pub fn terminal_color(color: &document::Color) -> Option<Color> {
    let (r, g, b) = color.to_rgb()?;
    Some(if supports_truecolor() {
        Color::Rgb(r, g, b)
    } else {
        Color::Indexed(rgb_to_xterm_256(r, g, b))
    })
}

fn supports_truecolor() -> bool {
    if let Ok(force) = std::env::var("RICHDOC_TRUECOLOR") {
        let value = force.to_ascii_lowercase();
        return matches!(value.as_str(), "1" | "true" | "yes" | "on");
    }
    supports_truecolor_from_env(
        std::env::var("COLORTERM").ok().as_deref(),
        std::env::var("TERM").ok().as_deref(),
    )
}

fn supports_truecolor_from_env(colorterm: Option<&str>, term: Option<&str>) -> bool {
    let has = |value: Option<&str>, needles: &[&str]| {
        value.is_some_and(|v| {
            let lower = v.to_ascii_lowercase();
            needles.iter().any(|needle| lower.contains(needle))
        })
    };
    has(colorterm, &["truecolor", "24bit"]) || has(term, &["direct", "truecolor"])
}

fn rgb_to_xterm_256(r: u8, g: u8, b: u8) -> u8 {
    // 0..=5 per channel
    #[allow(clippy::cast_possible_truncation)]
    let to_cube = |v: u8| ((u16::from(v) * 5) / 255) as u8;
    16 + 36 * to_cube(r) + 6 * to_cube(g) + to_cube(b)
}
