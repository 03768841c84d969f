use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph, Widget};

use crate::engine::metrics::is_timed;
use crate::session::keystroke::{KeyId, Keystroke};
use crate::ui::theme::Theme;

/// The newest keystrokes of the round, one per row, newest at the bottom.
pub struct KeystrokeLog<'a> {
    log: &'a [Keystroke],
    theme: &'a Theme,
}

impl<'a> KeystrokeLog<'a> {
    pub fn new(log: &'a [Keystroke], theme: &'a Theme) -> Self {
        Self { log, theme }
    }
}

fn format_row(k: &Keystroke) -> String {
    let key = match k.key {
        KeyId::Char(' ') => "space".to_string(),
        other => other.to_string(),
    };
    let mut row = format!("{:>5}ms  {:<9} @{}", k.delta_ms, key, k.cursor_position_at_press);
    if let Some(kind) = k.mutation_kind {
        row.push_str(&format!("  {kind}"));
    }
    row
}

impl Widget for KeystrokeLog<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;
        let rows = area.height.saturating_sub(2) as usize;
        let start = self.log.len().saturating_sub(rows);

        let lines: Vec<Line> = self.log[start..]
            .iter()
            .map(|k| {
                let color = if k.mistyped {
                    colors.error()
                } else if is_timed(k) {
                    colors.fg()
                } else {
                    colors.text_pending()
                };
                Line::from(Span::styled(format_row(k), Style::default().fg(color)))
            })
            .collect();

        let title = format!(" Keystrokes ({}) ", self.log.len());
        Paragraph::new(lines)
            .block(
                Block::bordered()
                    .title(title)
                    .border_style(Style::default().fg(colors.border()))
                    .style(Style::default().bg(colors.bg())),
            )
            .render(area, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::keystroke::MutationKind;

    #[test]
    fn rows_show_delta_key_and_mutation() {
        let mut k = Keystroke::new(KeyId::Backspace, 120, 3, 3);
        k.mutation_kind = Some(MutationKind::DeleteWordBackward);
        let row = format_row(&k);
        assert!(row.starts_with("  120ms  Backspace"));
        assert!(row.ends_with("deleteWordBackward"));

        let space = Keystroke::new(KeyId::Char(' '), 0, 0, 0);
        assert!(format_row(&space).contains("space"));
    }

    #[test]
    fn shows_only_the_tail() {
        let log: Vec<Keystroke> = (0..10)
            .map(|i| Keystroke::new(KeyId::Char('a'), i * 10, i as usize, i as usize))
            .collect();
        let theme = Theme::default();
        let area = Rect::new(0, 0, 40, 5);
        let mut buf = Buffer::empty(area);
        KeystrokeLog::new(&log, &theme).render(area, &mut buf);
        let first_row: String = (1..39).map(|x| buf[(x, 1)].symbol().to_string()).collect();
        assert!(first_row.contains("70ms"), "got {first_row:?}");
    }
}
