use ratatui::buffer::Buffer;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph, Widget, Wrap};

use crate::engine::metrics::PerformanceSummary;
use crate::engine::problematic::ProblematicKeyEntry;
use crate::session::keystroke::ExpectedChar;
use crate::session::render::RenderFrame;
use crate::ui::theme::{Theme, ThemeColors};

const MAX_PROBLEM_ROWS: usize = 6;

/// Live counts for the round in progress, the last round's summary, its
/// problem keys and the coach's note.
pub struct SummaryPanel<'a> {
    frame: &'a RenderFrame,
    last_summary: Option<&'a PerformanceSummary>,
    problems: &'a [ProblematicKeyEntry],
    note: Option<&'a str>,
    theme: &'a Theme,
}

impl<'a> SummaryPanel<'a> {
    pub fn new(
        frame: &'a RenderFrame,
        last_summary: Option<&'a PerformanceSummary>,
        problems: &'a [ProblematicKeyEntry],
        note: Option<&'a str>,
        theme: &'a Theme,
    ) -> Self {
        Self {
            frame,
            last_summary,
            problems,
            note,
            theme,
        }
    }
}

fn percent_color(value: u32, colors: &ThemeColors) -> Color {
    if value >= 95 {
        colors.success()
    } else if value >= 85 {
        colors.warning()
    } else {
        colors.error()
    }
}

fn label_value(label: &str, value: String, color: Color, colors: &ThemeColors) -> Line<'static> {
    Line::from(vec![
        Span::styled(label.to_string(), Style::default().fg(colors.fg())),
        Span::styled(value, Style::default().fg(color)),
    ])
}

fn describe_problem(entry: &ProblematicKeyEntry) -> String {
    let context: String = entry.preceding_keys.iter().collect();
    let mut line = format!("{:?} {:<7} after {:?}", entry.key, entry.speed_bucket.as_str(), context);
    match entry.expected_char {
        Some(ExpectedChar::Char(ch)) if entry.mistyped => line.push_str(&format!(" (wanted {ch:?})")),
        Some(ExpectedChar::Overflow) if entry.mistyped => line.push_str(" (past end)"),
        _ => {}
    }
    line
}

impl Widget for SummaryPanel<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;

        let sections = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(5), Constraint::Min(6)])
            .split(area);

        let live = vec![
            label_value(
                "Correct: ",
                self.frame.correct_count().to_string(),
                colors.success(),
                colors,
            ),
            label_value(
                "Errors:  ",
                self.frame.mistyped_count().to_string(),
                colors.error(),
                colors,
            ),
            label_value(
                "Left:    ",
                self.frame
                    .cells
                    .len()
                    .saturating_sub(1 + self.frame.correct_count())
                    .to_string(),
                colors.text_pending(),
                colors,
            ),
        ];
        Paragraph::new(live)
            .block(
                Block::bordered()
                    .title(" Now ")
                    .border_style(Style::default().fg(colors.border()))
                    .style(Style::default().bg(colors.bg())),
            )
            .render(sections[0], buf);

        let mut lines: Vec<Line> = Vec::new();
        match self.last_summary {
            Some(last) => {
                lines.push(label_value(
                    "WPM:         ",
                    last.words_per_minute.to_string(),
                    colors.accent(),
                    colors,
                ));
                lines.push(label_value(
                    "Accuracy:    ",
                    format!("{}%", last.accuracy_percent),
                    percent_color(last.accuracy_percent, colors),
                    colors,
                ));
                lines.push(label_value(
                    "Consistency: ",
                    format!("{}%", last.consistency_percent),
                    percent_color(last.consistency_percent, colors),
                    colors,
                ));
            }
            None => lines.push(Line::from(Span::styled(
                "Finish a sentence to see your stats.",
                Style::default().fg(colors.text_pending()),
            ))),
        }

        if !self.problems.is_empty() {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                "Problem keys",
                Style::default().fg(colors.warning()),
            )));
            for entry in self.problems.iter().take(MAX_PROBLEM_ROWS) {
                let color = if entry.mistyped {
                    colors.error()
                } else {
                    colors.fg()
                };
                lines.push(Line::from(Span::styled(
                    describe_problem(entry),
                    Style::default().fg(color),
                )));
            }
        }

        if let Some(note) = self.note.filter(|n| !n.is_empty()) {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                note.to_string(),
                Style::default().fg(colors.accent()),
            )));
        }

        Paragraph::new(lines)
            .block(
                Block::bordered()
                    .title(" Last round ")
                    .border_style(Style::default().fg(colors.border()))
                    .style(Style::default().bg(colors.bg())),
            )
            .wrap(Wrap { trim: true })
            .render(sections[1], buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::problematic::SpeedBucket;

    #[test]
    fn problem_description_includes_context_and_expectation() {
        let entry = ProblematicKeyEntry {
            key: 'b',
            speed_bucket: SpeedBucket::Normal,
            preceding_keys: vec!['c'],
            mistyped: true,
            expected_char: Some(ExpectedChar::Char('a')),
        };
        let text = describe_problem(&entry);
        assert!(text.starts_with("'b' normal"));
        assert!(text.contains("after \"c\""));
        assert!(text.ends_with("(wanted 'a')"));
    }

    #[test]
    fn percent_colors_follow_thresholds() {
        let colors = ThemeColors::default();
        assert_eq!(percent_color(100, &colors), colors.success());
        assert_eq!(percent_color(90, &colors), colors.warning());
        assert_eq!(percent_color(50, &colors), colors.error());
    }
}
