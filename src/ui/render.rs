use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

use crate::app::Model;

use super::{lines_for_tree, overlays, status, DOCUMENT_LEFT_PADDING};

/// Columns available to document text in a terminal `total_width` wide.
pub fn document_content_width(total_width: u16) -> u16 {
    total_width.saturating_sub(DOCUMENT_LEFT_PADDING).max(1)
}

/// Render the complete UI.
pub fn render(model: &mut Model, frame: &mut Frame) {
    let area = frame.area();
    let toolbar_rows = u16::from(model.is_editing());
    let toast_rows = u16::from(model.active_toast().is_some());
    let footer_rows = 1 + toast_rows;

    let toolbar_area = Rect { height: toolbar_rows.min(area.height), ..area };
    let doc_area = Rect {
        y: area.y + toolbar_rows,
        height: area.height.saturating_sub(toolbar_rows + footer_rows),
        ..area
    };
    let toast_area = Rect {
        y: area.y + area.height.saturating_sub(footer_rows),
        height: toast_rows,
        ..area
    };
    let status_area = Rect {
        y: area.y + area.height.saturating_sub(1),
        height: 1.min(area.height),
        ..area
    };

    if toolbar_rows > 0 {
        status::render_toolbar(model, frame, toolbar_area);
    }
    render_document(model, frame, doc_area);
    if toast_rows > 0 {
        status::render_toast_bar(model, frame, toast_area);
    }
    status::render_status_bar(model, frame, status_area);

    if model.help_visible {
        overlays::render_help_overlay(model, frame, area);
    }
}

fn render_document(model: &mut Model, frame: &mut Frame, area: Rect) {
    let inner = Rect {
        x: area.x + DOCUMENT_LEFT_PADDING.min(area.width),
        width: document_content_width(area.width).min(area.width),
        ..area
    };
    let doc = lines_for_tree(&model.visual_tree(), inner.width, &model.theme);

    model.viewport.resize(inner.width, inner.height);
    model.viewport.set_total_lines(doc.lines.len());
    if model.is_editing() && doc.cursor_line != model.cursor_line {
        if let Some(line) = doc.cursor_line {
            model.viewport.ensure_visible(line);
        }
        model.cursor_line = doc.cursor_line;
    }

    let visible = doc.lines[model.viewport.visible_range()].to_vec();
    frame.render_widget(Paragraph::new(visible), inner);
}
