use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Padding, Paragraph};

use crate::app::Model;

pub fn render_help_overlay(model: &Model, frame: &mut Frame, area: Rect) {
    let popup_width = area.width.saturating_sub(12).max(48);
    let popup_height = area.height.saturating_sub(4).max(12);
    let popup = centered_popup_rect(popup_width, popup_height, area);

    let section = Style::default()
        .fg(Color::Yellow)
        .add_modifier(Modifier::BOLD);
    let mut lines: Vec<Line> = Vec::new();

    if model.is_editing() {
        lines.push(Line::styled("Editing", section));
        lines.extend(
            [
                "  Arrows, Home/End    Move (Shift extends)",
                "  Enter / Shift+Enter New block / line break",
                "  Ctrl-b/i/u/e        Bold, italic, underline, code",
                "  Ctrl-Shift-s        Strikethrough",
                "  Ctrl-Alt-0..6       Paragraph / heading",
                "  Ctrl-Alt-c          Code block",
                "  Ctrl-Shift-7 / 8    Ordered / bullet list",
                "  Ctrl-Shift-b        Quote",
                "  Ctrl-Shift-l/e/r/j  Align",
                "  Ctrl-z / Ctrl-y     Undo / redo",
            ]
            .map(Line::raw),
        );
        lines.push(Line::raw(""));
        lines.push(Line::styled("Saving", section));
        lines.extend(
            [
                "  (automatic)         Saved a moment after you stop typing",
                "  Ctrl-s              Save now",
                "  Ctrl-r              Retry a failed save",
                "  Tab                 Toolbar focus (Enter does nothing there)",
                "  Esc / Ctrl-q        Save and quit",
            ]
            .map(Line::raw),
        );
    } else {
        lines.push(Line::styled("Navigation", section));
        lines.extend(
            [
                "  j/k or Up/Down      Scroll",
                "  Space/PageDown      Page down",
                "  b/PageUp            Page up",
                "  Ctrl-d / Ctrl-u     Half page",
                "  g / G               Top / bottom",
            ]
            .map(Line::raw),
        );
        lines.push(Line::raw(""));
        lines.push(Line::styled("Other", section));
        lines.extend(
            [
                "  w                   Toggle watch",
                "  r                   Reload file",
                "  q / Ctrl-c          Quit",
            ]
            .map(Line::raw),
        );
    }
    lines.push(Line::raw(""));

    let path_or = |path: Option<&std::path::PathBuf>, missing: &str| {
        path.map_or_else(|| missing.to_string(), |p| p.display().to_string())
    };
    lines.push(Line::styled("Config", section));
    lines.push(Line::raw(format!(
        "  Global: {}",
        path_or(model.config_global_path.as_ref(), "<unknown>")
    )));
    lines.push(Line::raw(format!(
        "  Local override: {}",
        path_or(model.config_local_path.as_ref(), "<none>")
    )));

    let block = Block::default()
        .title("Help")
        .borders(Borders::ALL)
        .padding(Padding::uniform(1))
        .style(Style::default().bg(Color::Black).fg(Color::White));
    frame.render_widget(Clear, popup);
    frame.render_widget(Paragraph::new(lines).block(block), popup);
}

fn centered_popup_rect(width: u16, height: u16, area: Rect) -> Rect {
    let w = width.min(area.width);
    let h = height.min(area.height);
    let x = area.x + (area.width.saturating_sub(w) / 2);
    let y = area.y + (area.height.saturating_sub(h) / 2);
    Rect::new(x, y, w, h)
}
