//! Rendering of the live queue view.
//!
//! The frame is composed as plain lines first (header, column header,
//! window rows, footer) so the layout can be checked without a terminal.

use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

use crate::models::JobState;
use crate::queue::QUEUE_HEADER;
use crate::tui::state::ViewerState;
use crate::tui::theme::Theme;

pub const QUEUE_AT: &str = " queue at ";
pub const INSTRUCTIONS: &str = "  |  press q to quit, r to refresh";
pub const EMPTY_QUEUE: &str = "No jobs in queue";

/// Clock format shown in the header
pub const CLOCK_FORMAT: &str = "%H:%M:%S";

/// Static parts of the header
#[derive(Debug, Clone)]
pub struct HeaderInfo {
    /// `alice's` or `The whole`
    pub owner_label: String,
}

/// Width of the header block: the full header sentence or the column
/// header, whichever is wider
#[must_use]
pub fn header_width(owner_label: &str, clock: &str) -> usize {
    let sentence = owner_label.chars().count()
        + QUEUE_AT.chars().count()
        + clock.chars().count()
        + INSTRUCTIONS.chars().count();
    sentence.max(QUEUE_HEADER.chars().count())
}

/// Color for a queue row, taken from its state column when recognisable
fn row_style(row: &str, theme: &Theme) -> Style {
    // squeue's default layout puts the state code in the fifth column
    match row.split_whitespace().nth(4).map(JobState::from_state_string) {
        Some(state) if state.is_canonical() => Style::default().fg(theme.job_state_color(&state)),
        _ => Style::default().fg(theme.fg),
    }
}

fn status_line(state: &ViewerState, theme: &Theme) -> Line<'static> {
    if let Some(error) = state.refresh_error() {
        return Line::from(Span::styled(
            format!("refresh failed: {error} (showing previous snapshot)"),
            Style::default().fg(theme.error),
        ));
    }

    let total = state.lines().len();
    let text = if total == 0 {
        "0 jobs".to_string()
    } else {
        let first = state.offset() + 1;
        let last = (state.offset() + state.window()).min(total);
        format!("lines {first}-{last} of {total}")
    };
    Line::from(Span::styled(text, Style::default().fg(theme.status)))
}

/// Compose every line of the frame
#[must_use]
pub fn compose(state: &ViewerState, header: &HeaderInfo, clock: &str, theme: &Theme) -> Vec<Line<'static>> {
    let width = header_width(&header.owner_label, clock);
    let rule = || Line::from(Span::styled("-".repeat(width), Style::default().fg(theme.rule)));

    let mut lines = Vec::with_capacity(state.window() + 6);
    lines.push(Line::from(vec![
        Span::styled(
            header.owner_label.clone(),
            Style::default().fg(theme.owner).add_modifier(Modifier::BOLD),
        ),
        Span::raw(QUEUE_AT),
        Span::styled(clock.to_string(), Style::default().fg(theme.clock)),
        Span::styled(INSTRUCTIONS, Style::default().fg(theme.hint)),
    ]));
    lines.push(rule());
    lines.push(Line::from(Span::styled(
        QUEUE_HEADER,
        Style::default()
            .fg(theme.column_header)
            .add_modifier(Modifier::BOLD),
    )));
    lines.push(rule());

    if state.lines().is_empty() {
        lines.push(Line::from(Span::styled(EMPTY_QUEUE, Style::default().fg(theme.status))));
        lines.extend((1..state.window()).map(|_| Line::default()));
    } else {
        lines.extend(
            state
                .visible_rows()
                .into_iter()
                .map(|row| Line::from(Span::styled(row.to_string(), row_style(row, theme)))),
        );
    }

    lines.push(rule());
    lines.push(status_line(state, theme));
    lines
}

/// Draw one frame
pub fn render(frame: &mut Frame, state: &ViewerState, header: &HeaderInfo, clock: &str, theme: &Theme) {
    let lines = compose(state, header, clock, theme);
    frame.render_widget(Paragraph::new(lines), frame.area());
}
