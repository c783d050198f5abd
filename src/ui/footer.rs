use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::Frame;

use super::render_line;
use crate::app::DisplayState;

/// Repository and user totals followed by one badge per status category.
pub fn render_stats(frame: &mut Frame, state: &DisplayState, area: Rect) {
    let layout = state.layout;
    let mut spans = vec![Span::raw(layout.summary.as_str())];
    spans.extend(layout.badges.iter().map(|(text, _)| Span::raw(text.as_str())));
    render_line(frame, area, 0, layout.stats_row, area.width, Line::from(spans));
}

/// Clickable buttons on the left, spinner and countdown on the right.
pub fn render_buttons(frame: &mut Frame, state: &DisplayState, area: Rect) {
    let layout = state.layout;
    let spans: Vec<Span> = layout
        .buttons
        .iter()
        .flat_map(|button| {
            let mut key_style = Style::default().add_modifier(Modifier::REVERSED);
            if state.highlighted == Some(button.command) {
                key_style = key_style.add_modifier(Modifier::BOLD);
            }
            [
                Span::styled(button.key, key_style),
                Span::raw(button.caption.as_str()),
            ]
        })
        .collect();
    render_line(frame, area, 0, layout.footer_row, area.width, Line::from(spans));

    let countdown = format!("{} {}s", state.spinner, state.seconds_left);
    render_line(
        frame,
        area,
        layout.spinner_column,
        layout.footer_row,
        area.width,
        Line::raw(countdown),
    );
}
