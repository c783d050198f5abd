use ratatui::layout::Rect;
use ratatui::text::{Line, Span};
use ratatui::Frame;

use super::{render_line, severity_style};
use crate::app::DisplayState;

pub fn render(frame: &mut Frame, state: &DisplayState, area: Rect) {
    let layout = state.layout;
    for (position, (name, entry)) in state.cells.iter().enumerate() {
        let (x, y) = layout.cell_origin(position);
        if y >= layout.grid_end() || y >= area.bottom() {
            break;
        }
        let text = format!("{} {}", entry.icon, name);
        let line = Line::from(Span::styled(text, severity_style(entry.severity)));
        render_line(frame, area, x, y, layout.cell_width, line);
    }
}
