//! Drawing state shared by every backend
//!
//! A backend owns one `Canvas` while running: the grid it composites from,
//! the registered color pairs and the cursor. Backends differ only in how
//! they put the canvas on screen and where events come from.

use crate::cell::Cell;
use crate::color::{ColorPair, ColorPairTable, TextAttribute};
use crate::error::Result;
use crate::grid::Grid;
use crate::renderer::CursorState;

#[derive(Debug, Clone, Default)]
pub struct Canvas {
    pub grid: Grid,
    pub colors: ColorPairTable,
    pub cursor: CursorState,
}

impl Canvas {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            grid: Grid::new(rows, cols),
            colors: ColorPairTable::new(),
            cursor: CursorState {
                visible: true,
                ..CursorState::default()
            },
        }
    }

    pub fn dimensions(&self) -> (usize, usize) {
        self.grid.dimensions()
    }

    /// Swap in a grid of the new size, keeping the overlapping content
    ///
    /// Returns false when the size did not change.
    pub fn resize(&mut self, rows: usize, cols: usize) -> bool {
        if self.grid.dimensions() == (rows, cols) {
            return false;
        }
        log::debug!(
            "grid resized {}x{} -> {}x{}",
            self.grid.rows(),
            self.grid.cols(),
            rows,
            cols
        );
        self.grid = self.grid.resized(rows, cols);
        self.clamp_cursor();
        true
    }

    pub fn move_cursor(&mut self, row: i32, col: i32) {
        let (rows, cols) = self.dimensions();
        self.cursor.row = clamp_index(row, rows);
        self.cursor.col = clamp_index(col, cols);
    }

    /// Caret coordinates are (x = column, y = row)
    pub fn set_caret(&mut self, x: i32, y: i32) {
        let (rows, cols) = self.dimensions();
        self.cursor.caret_x = clamp_index(x, cols);
        self.cursor.caret_y = clamp_index(y, rows);
    }

    fn clamp_cursor(&mut self) {
        let (rows, cols) = self.dimensions();
        let max = |n: usize| n.saturating_sub(1);
        self.cursor.row = self.cursor.row.min(max(rows));
        self.cursor.col = self.cursor.col.min(max(cols));
        self.cursor.caret_y = self.cursor.caret_y.min(max(rows));
        self.cursor.caret_x = self.cursor.caret_x.min(max(cols));
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<Cell> {
        self.grid.get(row, col).copied()
    }

    /// Colors of a cell after pair lookup and reverse video
    pub fn cell_colors(&self, cell: &Cell) -> (crate::color::Rgb, crate::color::Rgb) {
        self.colors.resolve(cell.color_pair, cell.attrs)
    }

    pub fn register_pair(
        &mut self,
        pair_id: i32,
        fg: (i32, i32, i32),
        bg: (i32, i32, i32),
    ) -> Result<ColorPair> {
        let pair = self.colors.register(pair_id, fg, bg)?;
        // Cells already using the pair pick up the new colors on the next refresh
        self.grid.mark_all_dirty();
        Ok(pair)
    }

    pub fn draw_text(
        &mut self,
        row: i32,
        col: i32,
        text: &str,
        color_pair: i32,
        attrs: TextAttribute,
    ) -> Result<()> {
        self.grid.put_text(row, col, text, color_pair, attrs)
    }
}

fn clamp_index(v: i32, len: usize) -> usize {
    (v.max(0) as usize).min(len.saturating_sub(1))
}
