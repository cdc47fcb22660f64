//! Visual tree to terminal lines.
//!
//! Text blocks are wrapped to the available width (word boundaries where
//! possible), aligned, and prefixed by a gutter that carries list markers
//! and quote bars for every enclosing container.

use ratatui::style::Style;
use ratatui::text::{Line, Span};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::document::{Range, TextAlign};
use crate::render::{BlockStyle, SpanContent, TextRole, VisualBlock, VisualSpan, VisualTree};

use super::style::{style_for_span, terminal_color, Theme};

#[derive(Debug, Clone, Default)]
pub struct DocLines {
    pub lines: Vec<Line<'static>>,
    /// Line holding the selection head, in editable trees.
    pub cursor_line: Option<usize>,
}

pub fn lines_for_tree(tree: &VisualTree, width: u16, theme: &Theme) -> DocLines {
    let selection = tree.interaction.as_ref().and_then(|i| i.selection);
    let mut layout = Layout {
        theme,
        width: usize::from(width.max(1)),
        highlight: selection.filter(|s| !s.is_collapsed()).map(|s| s.range()),
        head: selection.map(|s| s.head),
        collapsed: selection.is_some_and(|s| s.is_collapsed()),
        out: DocLines::default(),
    };
    layout.blocks(&tree.blocks, &mut Gutter::default(), Style::default(), true);
    layout.out
}

#[derive(Debug, Clone)]
struct Cell {
    ch: char,
    style: Style,
    head: bool,
}

impl Cell {
    fn width(&self) -> usize {
        self.ch.width().unwrap_or(0)
    }
}

/// Line prefix for a container: `first` on its first line, `rest` after.
#[derive(Debug, Clone, Default)]
struct Gutter {
    first: Vec<Span<'static>>,
    rest: Vec<Span<'static>>,
    started: bool,
}

impl Gutter {
    fn width(&self) -> usize {
        self.rest.iter().map(Span::width).sum()
    }

    fn next(&mut self) -> Vec<Span<'static>> {
        if self.started {
            self.rest.clone()
        } else {
            self.started = true;
            self.first.clone()
        }
    }

    fn nest(&mut self, first: Span<'static>, rest: Span<'static>) -> Self {
        let mut head = self.next();
        head.push(first);
        let mut tail = self.rest.clone();
        tail.push(rest);
        Self {
            first: head,
            rest: tail,
            started: false,
        }
    }
}

struct Layout<'a> {
    theme: &'a Theme,
    width: usize,
    highlight: Option<Range>,
    head: Option<usize>,
    collapsed: bool,
    out: DocLines,
}

impl Layout<'_> {
    fn blocks(&mut self, blocks: &[VisualBlock], gutter: &mut Gutter, base: Style, separate: bool) {
        for (idx, block) in blocks.iter().enumerate() {
            if separate && idx > 0 {
                let prefix = gutter.next();
                self.push(prefix, Vec::new(), false);
            }
            self.block(block, gutter, base);
        }
    }

    fn block(&mut self, block: &VisualBlock, gutter: &mut Gutter, base: Style) {
        match block {
            VisualBlock::Text {
                role,
                style,
                spans,
                start,
            } => self.text_block(*role, style, spans, *start, gutter, base),
            VisualBlock::Rule { start } => {
                let width = self.width.saturating_sub(gutter.width()).max(1);
                let at_head = self.head == Some(*start);
                let mut style = self.theme.hr;
                if at_head && self.collapsed {
                    style = style.patch(self.theme.cursor);
                }
                let prefix = gutter.next();
                self.push(prefix, vec![Span::styled("─".repeat(width), style)], at_head);
            }
            VisualBlock::List { ordered, items } => {
                for (n, item) in items.iter().enumerate() {
                    let marker = if *ordered {
                        format!("{}. ", n + 1)
                    } else {
                        "• ".to_string()
                    };
                    let pad = " ".repeat(marker.as_str().width());
                    let mut inner =
                        gutter.nest(Span::styled(marker, self.theme.list_marker), Span::raw(pad));
                    self.blocks(item, &mut inner, base, false);
                }
            }
            VisualBlock::Quote { blocks } => {
                let bar = Span::styled("│ ", self.theme.quote);
                let mut inner = gutter.nest(bar.clone(), bar);
                self.blocks(blocks, &mut inner, base.patch(self.theme.quote), false);
            }
        }
    }

    fn text_block(
        &mut self,
        role: TextRole,
        block_style: &BlockStyle,
        spans: &[VisualSpan],
        start: usize,
        gutter: &mut Gutter,
        inherited: Style,
    ) {
        let mut base = inherited.patch(self.theme.style_for_role(role));
        let background = block_style.background.as_ref().and_then(terminal_color);
        if let Some(bg) = background {
            base = base.bg(bg);
        }
        let fill = role == TextRole::Code || background.is_some();
        let width = self.width.saturating_sub(gutter.width()).max(1);

        let mut lines: Vec<Vec<Cell>> = vec![Vec::new()];
        let mut pos = start;
        for span in spans {
            let style = style_for_span(base, &span.style, span.link.is_some(), self.theme);
            match &span.content {
                SpanContent::Text(text) => {
                    for ch in text.chars() {
                        let cell = self.cell(ch, style, pos);
                        push_cell(&mut lines, cell);
                        pos += 1;
                    }
                }
                SpanContent::Break => {
                    self.push_head_marker(&mut lines, base, pos);
                    lines.push(Vec::new());
                    pos += 1;
                }
                SpanContent::Image { alt, .. } => {
                    let label = format!("[image: {}]", alt.as_deref().unwrap_or(""));
                    let style = style.patch(self.theme.image);
                    for (i, ch) in label.chars().enumerate() {
                        let cell = if i == 0 {
                            self.cell(ch, style, pos)
                        } else {
                            Cell {
                                ch,
                                style,
                                head: false,
                            }
                        };
                        push_cell(&mut lines, cell);
                    }
                    pos += 1;
                }
            }
        }
        self.push_head_marker(&mut lines, base, pos);

        for line in lines {
            for row in wrap(line, width) {
                self.emit_row(row, block_style.align, width, base, fill, gutter);
            }
        }
    }

    fn cell(&self, ch: char, mut style: Style, pos: usize) -> Cell {
        if let Some(range) = self.highlight
            && pos >= range.from
            && pos < range.to
        {
            style = style.patch(self.theme.selection);
        }
        let head = self.head == Some(pos);
        if head && self.collapsed {
            style = style.patch(self.theme.cursor);
        }
        Cell { ch, style, head }
    }

    /// A blank cell for a head sitting at the end of a line.
    fn push_head_marker(&self, lines: &mut Vec<Vec<Cell>>, base: Style, pos: usize) {
        if self.head != Some(pos) {
            return;
        }
        let style = if self.collapsed {
            base.patch(self.theme.cursor)
        } else {
            base
        };
        push_cell(
            lines,
            Cell {
                ch: ' ',
                style,
                head: true,
            },
        );
    }

    fn emit_row(
        &mut self,
        row: Vec<Cell>,
        align: TextAlign,
        width: usize,
        base: Style,
        fill: bool,
        gutter: &mut Gutter,
    ) {
        let used: usize = row.iter().map(Cell::width).sum();
        let slack = width.saturating_sub(used);
        let lead = match align {
            TextAlign::Center => slack / 2,
            TextAlign::Right => slack,
            TextAlign::Left | TextAlign::Justify => 0,
        };
        let pad_style = if fill { base } else { Style::default() };
        let has_head = row.iter().any(|cell| cell.head);

        let mut spans = Vec::new();
        if lead > 0 {
            spans.push(Span::styled(" ".repeat(lead), pad_style));
        }
        spans.extend(group(row));
        if fill && slack > lead {
            spans.push(Span::styled(" ".repeat(slack - lead), pad_style));
        }
        let prefix = gutter.next();
        self.push(prefix, spans, has_head);
    }

    fn push(&mut self, mut prefix: Vec<Span<'static>>, spans: Vec<Span<'static>>, has_head: bool) {
        if has_head && self.out.cursor_line.is_none() {
            self.out.cursor_line = Some(self.out.lines.len());
        }
        prefix.extend(spans);
        self.out.lines.push(Line::from(prefix));
    }
}

fn push_cell(lines: &mut Vec<Vec<Cell>>, cell: Cell) {
    if let Some(line) = lines.last_mut() {
        line.push(cell);
    } else {
        lines.push(vec![cell]);
    }
}

/// Break one logical line into rows of at most `width` columns, preferring
/// to break after a space.
fn wrap(cells: Vec<Cell>, width: usize) -> Vec<Vec<Cell>> {
    let mut rows = Vec::new();
    let mut row: Vec<Cell> = Vec::new();
    let mut row_width = 0;
    let mut last_space: Option<usize> = None;
    let mut broken = false;
    for cell in cells {
        let w = cell.width();
        if row_width + w > width && !row.is_empty() {
            if let Some(idx) = last_space
                && idx + 1 < row.len()
            {
                let carry = row.split_off(idx + 1);
                rows.push(std::mem::replace(&mut row, carry));
            } else {
                rows.push(std::mem::take(&mut row));
            }
            row_width = row.iter().map(Cell::width).sum();
            last_space = row.iter().rposition(|c| c.ch == ' ');
            broken = true;
        }
        // A wrapped row does not start with the space it broke on.
        if broken && row.is_empty() && cell.ch == ' ' && !cell.head {
            continue;
        }
        if cell.ch == ' ' {
            last_space = Some(row.len());
        }
        row_width += w;
        row.push(cell);
    }
    rows.push(row);
    rows
}

fn group(row: Vec<Cell>) -> Vec<Span<'static>> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut text = String::new();
    let mut current: Option<Style> = None;
    for cell in row {
        if current.is_some_and(|style| style != cell.style) {
            spans.push(Span::styled(std::mem::take(&mut text), current.unwrap_or_default()));
        }
        current = Some(cell.style);
        text.push(cell.ch);
    }
    if let Some(style) = current {
        spans.push(Span::styled(text, style));
    }
    spans
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{deserialize, Selection};
    use crate::editor::ToolbarState;
    use crate::render::{render, render_read_only, Interaction, RenderMode};

    fn texts(html: &str, width: u16) -> Vec<String> {
        let tree = render_read_only(&deserialize(html));
        lines_for_tree(&tree, width, &Theme::dark())
            .lines
            .iter()
            .map(line_text)
            .collect()
    }

    fn line_text(line: &Line<'_>) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_paragraphs_are_separated_by_blank_line() {
        assert_eq!(texts("<p>one</p><p>two</p>", 20), vec!["one", "", "two"]);
    }

    #[test]
    fn test_wraps_at_word_boundary() {
        let lines = texts("<p>alpha beta gamma</p>", 8);
        let trimmed: Vec<&str> = lines.iter().map(|l| l.trim_end()).collect();
        assert_eq!(trimmed, vec!["alpha", "beta", "gamma"]);
    }

    #[test]
    fn test_long_word_is_split() {
        assert_eq!(texts("<p>abcdefgh</p>", 3), vec!["abc", "def", "gh"]);
    }

    #[test]
    fn test_list_markers_and_continuation() {
        assert_eq!(
            texts("<ol><li><p>a</p></li><li><p>b</p></li></ol>", 20),
            vec!["1. a", "2. b"]
        );
        assert_eq!(
            texts("<ul><li><p>abc def</p></li></ul>", 5),
            vec!["• abc", "  def"]
        );
    }

    #[test]
    fn test_quote_gutter() {
        assert_eq!(
            texts("<blockquote><p>said</p></blockquote>", 20),
            vec!["│ said"]
        );
    }

    #[test]
    fn test_center_alignment_pads_left() {
        let lines = texts(r#"<p style="text-align: center">ab</p>"#, 10);
        assert_eq!(lines, vec!["    ab"]);
        let lines = texts(r#"<p style="text-align: right">ab</p>"#, 10);
        assert_eq!(lines, vec!["        ab"]);
    }

    #[test]
    fn test_rule_spans_width() {
        let lines = texts("<p>a</p><hr><p>b</p>", 4);
        assert_eq!(lines[2], "────");
    }

    #[test]
    fn test_image_placeholder() {
        let lines = texts(r#"<p><img src="a.png" alt="logo"></p>"#, 40);
        assert_eq!(lines, vec!["[image: logo]"]);
    }

    #[test]
    fn test_cursor_line_follows_selection_head() {
        let doc = deserialize("<p>a</p><p>b</p>");
        let tree = render(
            &doc,
            RenderMode::Editable(Interaction {
                selection: Some(Selection::cursor(2)),
                toolbar: ToolbarState::default(),
            }),
        );
        let out = lines_for_tree(&tree, 20, &Theme::dark());
        assert_eq!(out.cursor_line, Some(2));
    }

    #[test]
    fn test_cursor_at_block_end_adds_cell() {
        let doc = deserialize("<p>ab</p>");
        let tree = render(
            &doc,
            RenderMode::Editable(Interaction {
                selection: Some(Selection::cursor(2)),
                toolbar: ToolbarState::default(),
            }),
        );
        let out = lines_for_tree(&tree, 20, &Theme::dark());
        assert_eq!(line_text(&out.lines[0]), "ab ");
        assert_eq!(out.cursor_line, Some(0));
    }

    #[test]
    fn test_read_only_has_no_cursor() {
        let tree = render_read_only(&deserialize("<p>ab</p>"));
        assert_eq!(lines_for_tree(&tree, 20, &Theme::dark()).cursor_line, None);
    }
}
