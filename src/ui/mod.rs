mod footer;
mod grid;

use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::text::Line;
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use crate::app::DisplayState;
use crate::layout::TOOLTIP_ROW;
use crate::status::Severity;

pub fn render(frame: &mut Frame, state: &DisplayState) {
    let area = frame.area();

    if let Some(tooltip) = &state.tooltip {
        render_line(frame, area, 0, TOOLTIP_ROW, area.width, Line::raw(tooltip.as_str()));
    }

    grid::render(frame, state, area);
    footer::render_stats(frame, state, area);
    footer::render_buttons(frame, state, area);
}

/// Draw a single line starting at (`x`, `y`), clipped to `area`.
fn render_line(frame: &mut Frame, area: Rect, x: u16, y: u16, width: u16, line: Line) {
    if y >= area.bottom() || x >= area.right() {
        return;
    }
    let width = width.min(area.right() - x);
    frame.render_widget(Paragraph::new(line), Rect::new(x, y, width, 1));
}

/// Foreground and background per severity, indexed by `Severity::code() - 1`.
const COLOR_PAIRS: [(Color, Color); 7] = [
    (Color::White, Color::Cyan),
    (Color::White, Color::Red),
    (Color::White, Color::Black),
    (Color::Black, Color::Yellow),
    (Color::Blue, Color::Green),
    (Color::Red, Color::Yellow),
    (Color::White, Color::Blue),
];

pub fn severity_style(severity: Severity) -> Style {
    let (fg, bg) = COLOR_PAIRS[usize::from(severity.code() - 1)];
    Style::default().fg(fg).bg(bg)
}
