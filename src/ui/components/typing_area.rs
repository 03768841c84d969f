use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph, Widget, Wrap};

use crate::session::reference::Direction;
use crate::session::render::{CaretMarker, Cell, CellStatus, RenderFrame};
use crate::ui::theme::{Theme, ThemeColors};

/// One-way projection of a render frame; never read back.
pub struct TypingArea<'a> {
    frame: &'a RenderFrame,
    direction: Direction,
    loading: bool,
    theme: &'a Theme,
}

impl<'a> TypingArea<'a> {
    pub fn new(frame: &'a RenderFrame, direction: Direction, theme: &'a Theme) -> Self {
        Self {
            frame,
            direction,
            loading: false,
            theme,
        }
    }

    pub fn loading(mut self, loading: bool) -> Self {
        self.loading = loading;
        self
    }
}

fn cell_style(cell: &Cell, colors: &ThemeColors) -> Style {
    let base = match cell.status {
        CellStatus::EndMarker => Style::default().fg(colors.end_marker()),
        CellStatus::Untouched => Style::default().fg(colors.text_pending()),
        CellStatus::Correct => Style::default().fg(colors.text_correct()),
        CellStatus::Mistyped { .. } => Style::default()
            .fg(colors.text_incorrect())
            .bg(colors.text_incorrect_bg())
            .add_modifier(Modifier::UNDERLINED),
    };
    match cell.marker {
        Some(CaretMarker::Cursor) => base
            .fg(colors.text_cursor_fg())
            .bg(colors.text_cursor_bg()),
        Some(CaretMarker::Selection) => base.bg(colors.selection_bg()),
        None => base,
    }
}

/// Mistyped spaces would be invisible; show them as a middle dot.
fn visible(ch: char) -> char {
    if ch == ' ' { '\u{00b7}' } else { ch }
}

impl Widget for TypingArea<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;

        let mut spans: Vec<Span> = Vec::with_capacity(self.frame.cells.len());
        let (cells, end) = match self.frame.cells.split_last() {
            Some((last, rest)) if last.status == CellStatus::EndMarker => (rest, Some(last)),
            _ => (self.frame.cells.as_slice(), None),
        };

        for cell in cells {
            let glyph = match cell.status {
                CellStatus::Mistyped { pressed } => visible(pressed),
                _ => cell.glyph(),
            };
            spans.push(Span::styled(glyph.to_string(), cell_style(cell, colors)));
        }
        let overflow_style = Style::default()
            .fg(colors.overflow())
            .bg(colors.text_incorrect_bg())
            .add_modifier(Modifier::UNDERLINED);
        for extra in &self.frame.overflow {
            spans.push(Span::styled(visible(extra.pressed).to_string(), overflow_style));
        }
        if let Some(end) = end {
            spans.push(Span::styled(end.glyph().to_string(), cell_style(end, colors)));
        }

        let title = if self.loading {
            " Generating next sentence... "
        } else {
            " Type the sentence "
        };
        let border = if self.loading {
            colors.accent_dim()
        } else {
            colors.border_focused()
        };
        let block = Block::bordered()
            .title(title)
            .border_style(Style::default().fg(border))
            .style(Style::default().bg(colors.bg()));

        let alignment = match self.direction {
            Direction::Ltr => Alignment::Left,
            Direction::Rtl => Alignment::Right,
        };

        Paragraph::new(Line::from(spans))
            .block(block)
            .alignment(alignment)
            .wrap(Wrap { trim: false })
            .render(area, buf);
    }
}
