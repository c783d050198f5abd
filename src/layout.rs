//! Screen geometry shared by the renderer and pointer hit-testing.
//!
//! Every column range here is derived from the exact text the renderer draws,
//! so a cell is hit exactly where it appears on screen.

use std::ops::Range;

use ratatui::text::Span;

use crate::sort::SortMode;
use crate::status::{StatusEntry, CATEGORY_COUNT, STATUS_TABLE};

pub const CELL_WIDTH: u16 = 32;
pub const TOOLTIP_ROW: u16 = 0;
pub const GRID_ROW_START: u16 = 2;
/// Columns reserved at the right edge of the footer for spinner and countdown.
pub const SPINNER_WIDTH: u16 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Quit,
    Refresh,
    CycleSort,
}

impl Command {
    pub fn tooltip(self) -> &'static str {
        match self {
            Command::Quit => "Quit application",
            Command::Refresh => "Refresh repository statuses",
            Command::CycleSort => "Change sorting mode",
        }
    }
}

/// What the pointer is over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hit {
    /// A repository cell, by repository id
    Repo(usize),
    /// A stat badge, by category index
    Badge(usize),
    Button(Command),
    None,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub command: Command,
    pub key: &'static str,
    pub caption: String,
    /// Columns covered by `key`
    pub columns: Range<u16>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayoutGeometry {
    pub cell_width: u16,
    pub columns: u16,
    pub grid_row_start: u16,
    pub grid_rows: u16,
    pub stats_row: u16,
    pub summary: String,
    pub badges: Vec<(String, Range<u16>)>,
    pub footer_row: u16,
    pub buttons: Vec<Button>,
    pub spinner_column: u16,
}

pub fn summary_text(repo_count: usize, user_count: usize) -> String {
    format!("📦{} 👥{}", repo_count, user_count)
}

pub fn badge_text(entry: &StatusEntry, count: usize) -> String {
    format!(" {}{}", entry.icon, count)
}

fn text_width(text: &str) -> u16 {
    Span::raw(text).width() as u16
}

impl LayoutGeometry {
    pub fn compute(
        width: u16,
        height: u16,
        repo_count: usize,
        user_count: usize,
        counts: &[usize; CATEGORY_COUNT],
        sort_mode: SortMode,
    ) -> Self {
        let columns = (width / CELL_WIDTH).max(1);
        let grid_rows = repo_count.div_ceil(columns as usize) as u16;
        let stats_row = height.saturating_sub(2);
        let footer_row = height.saturating_sub(1);

        let summary = summary_text(repo_count, user_count);
        let mut cursor = text_width(&summary);
        let badges = STATUS_TABLE
            .iter()
            .zip(counts)
            .map(|(entry, &count)| {
                let text = badge_text(entry, count);
                let start = cursor;
                cursor = cursor.saturating_add(text_width(&text));
                (text, start..cursor)
            })
            .collect();

        let specs = [
            (Command::Quit, "[q]", " Quit ".to_string()),
            (Command::Refresh, "[space]", " Refresh ".to_string()),
            (Command::CycleSort, "[s]", format!(" {:<12}", sort_mode.to_string())),
        ];
        let mut cursor = 0u16;
        let buttons = specs
            .into_iter()
            .map(|(command, key, caption)| {
                let start = cursor;
                let end = start.saturating_add(text_width(key));
                cursor = end.saturating_add(text_width(&caption));
                Button {
                    command,
                    key,
                    caption,
                    columns: start..end,
                }
            })
            .collect();

        Self {
            cell_width: CELL_WIDTH,
            columns,
            grid_row_start: GRID_ROW_START,
            grid_rows,
            stats_row,
            summary,
            badges,
            footer_row,
            buttons,
            spinner_column: width.saturating_sub(SPINNER_WIDTH),
        }
    }

    /// Top-left cell of the grid slot at `position` in display order.
    pub fn cell_origin(&self, position: usize) -> (u16, u16) {
        let columns = self.columns as usize;
        let x = (position % columns) as u16 * self.cell_width;
        let y = self.grid_row_start.saturating_add((position / columns) as u16);
        (x, y)
    }

    /// First row not available to the grid. Rows from here down belong to
    /// the stats and footer lines even when the grid is taller.
    pub fn grid_end(&self) -> u16 {
        self.grid_row_start
            .saturating_add(self.grid_rows)
            .min(self.stats_row)
    }

    /// Map a pointer position to what is drawn there.
    pub fn hit_test(&self, x: u16, y: u16, order: &[usize]) -> Hit {
        if y == self.footer_row {
            return self
                .buttons
                .iter()
                .find(|b| b.columns.contains(&x))
                .map_or(Hit::None, |b| Hit::Button(b.command));
        }
        if y == self.stats_row {
            return self
                .badges
                .iter()
                .position(|(_, cols)| cols.contains(&x))
                .map_or(Hit::None, Hit::Badge);
        }

        if (self.grid_row_start..self.grid_end()).contains(&y)
            && x < self.columns * self.cell_width
        {
            let position = (y - self.grid_row_start) as usize * self.columns as usize
                + (x / self.cell_width) as usize;
            return order.get(position).map_or(Hit::None, |&id| Hit::Repo(id));
        }
        Hit::None
    }
}
