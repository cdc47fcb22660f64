use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

use crate::app::{Model, Screen};
use crate::document::{Mark, TextAlign};
use crate::editor::{EditState, Focus};
use crate::host::NoticeLevel;

pub fn render_status_bar(model: &Model, frame: &mut Frame, area: Rect) {
    let line_info = format!(
        "Line {}/{}",
        model.viewport.offset() + 1,
        model.viewport.total_lines().max(1)
    );
    let status = match &model.screen {
        Screen::Viewer { path, .. } => {
            let filename = path
                .file_name()
                .map_or_else(|| "untitled".to_string(), |s| s.to_string_lossy().to_string());
            let watch = if model.watch_enabled { " [watching]" } else { "" };
            format!(
                " {filename}  [{}%]  {line_info}{watch}  ?:help",
                model.viewport.scroll_percent()
            )
        }
        Screen::Editor(host) => {
            let record = host.record_id().map_or("-", |id| id.as_str());
            let state = match host.session().map(|s| s.state()) {
                Some(EditState::Dirty) => "modified",
                Some(EditState::Clean) => "saved",
                None => "closed",
            };
            let save = host.status().label();
            let save = if save.is_empty() { String::new() } else { format!("  {save}") };
            format!(" {record}  [{state}]{save}  {line_info}  Tab:toolbar  F1:help")
        }
    };
    let bar = Paragraph::new(status)
        .style(Style::default().bg(model.theme.status_bg).fg(model.theme.status_fg));
    frame.render_widget(bar, area);
}

pub fn render_toast_bar(model: &Model, frame: &mut Frame, area: Rect) {
    let Some((message, level)) = model.active_toast() else {
        return;
    };
    let (prefix, style) = match level {
        NoticeLevel::Info => ("[info]", Style::default().bg(Color::DarkGray).fg(Color::White)),
        NoticeLevel::Warning => ("[warn]", Style::default().bg(Color::Yellow).fg(Color::Black)),
        NoticeLevel::Error => ("[error]", Style::default().bg(Color::Red).fg(Color::White)),
    };
    frame.render_widget(Paragraph::new(format!("{prefix} {message}")).style(style), area);
}

/// One row of toolbar buttons, lit when active for the selection.
pub fn render_toolbar(model: &Model, frame: &mut Frame, area: Rect) {
    let Some(host) = model.host() else {
        return;
    };
    let Some(session) = host.session() else {
        return;
    };
    let state = session.toolbar_state();
    let theme = &model.theme;

    let mut buttons: Vec<(String, bool)> = vec![
        ("B".into(), state.marks.contains(&Mark::Bold)),
        ("I".into(), state.marks.contains(&Mark::Italic)),
        ("U".into(), state.marks.contains(&Mark::Underline)),
        ("S".into(), state.marks.contains(&Mark::Strike)),
        ("<>".into(), state.marks.contains(&Mark::Code)),
    ];
    for level in 1..=session.config().max_heading_level {
        buttons.push((format!("H{level}"), state.heading == Some(level)));
    }
    buttons.extend([
        ("•".into(), state.bullet_list),
        ("1.".into(), state.ordered_list),
        ("{}".into(), state.code_block),
        ("\"".into(), state.blockquote),
    ]);
    for (label, align) in [
        ("L", TextAlign::Left),
        ("C", TextAlign::Center),
        ("R", TextAlign::Right),
        ("J", TextAlign::Justify),
    ] {
        buttons.push((label.into(), state.align == Some(align)));
    }
    buttons.push(("undo".into(), state.can_undo));
    buttons.push(("redo".into(), state.can_redo));

    let mut spans = vec![if host.focus() == Focus::Toolbar {
        Span::styled("> ", theme.toolbar_active)
    } else {
        Span::raw("  ")
    }];
    for (label, active) in buttons {
        let style = if active { theme.toolbar_active } else { theme.toolbar_idle };
        spans.push(Span::styled(format!(" {label} "), style));
    }
    if let Some(color) = &state.text_color {
        spans.push(Span::styled(format!(" color:{color} "), theme.toolbar_idle));
    }
    if let Some(color) = &state.background_color {
        spans.push(Span::styled(format!(" bg:{color} "), theme.toolbar_idle));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
