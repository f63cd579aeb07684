//! Character grid - the buffer every backend composites from
//!
//! The grid is a row-major 2D array of cells. Row 0 is the top line and
//! column 0 the leftmost column. All drawing primitives clip silently: cells
//! that fall outside the grid are skipped and never raise. Only invalid
//! color pair ids and negative lengths are rejected.

use std::ops::Range;

use crate::cell::Cell;
use crate::color::{check_pair_id, TextAttribute};
use crate::error::{Error, Result};

/// Box-drawing characters used by `rect`
pub mod box_chars {
    pub const TOP_LEFT: char = '┌';
    pub const TOP_RIGHT: char = '┐';
    pub const BOTTOM_LEFT: char = '└';
    pub const BOTTOM_RIGHT: char = '┘';
    pub const HORIZONTAL: char = '─';
    pub const VERTICAL: char = '│';
}

/// The character grid
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    cells: Vec<Cell>,
    rows: usize,
    cols: usize,
    dirty: Vec<bool>,
}

impl Grid {
    /// Create a grid of blank cells
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            cells: vec![Cell::BLANK; rows * cols],
            rows,
            cols,
            dirty: vec![true; rows],
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// (rows, cols)
    pub fn dimensions(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&Cell> {
        if row < self.rows && col < self.cols {
            self.cells.get(row * self.cols + col)
        } else {
            None
        }
    }

    /// Cells of one row
    pub fn row(&self, row: usize) -> &[Cell] {
        let start = row * self.cols;
        &self.cells[start..start + self.cols]
    }

    /// Write a cell at signed coordinates, ignoring anything out of bounds
    fn put(&mut self, row: i64, col: i64, cell: Cell) {
        if row < 0 || col < 0 {
            return;
        }
        let (row, col) = (row as usize, col as usize);
        if row >= self.rows || col >= self.cols {
            return;
        }
        self.cells[row * self.cols + col] = cell;
        self.dirty[row] = true;
    }

    /// Allocate a new grid, copying the overlapping region
    ///
    /// The old grid is not mutated; new area is filled with blank cells.
    pub fn resized(&self, rows: usize, cols: usize) -> Grid {
        let mut grid = Grid::new(rows, cols);
        let copy_rows = rows.min(self.rows);
        let copy_cols = cols.min(self.cols);
        for row in 0..copy_rows {
            let src = row * self.cols;
            let dst = row * cols;
            grid.cells[dst..dst + copy_cols].copy_from_slice(&self.cells[src..src + copy_cols]);
        }
        grid
    }

    /// Fill the whole grid with blank cells
    pub fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
        self.dirty.fill(true);
    }

    /// Fill a rectangle with blank cells, clipped to the grid
    pub fn clear_region(&mut self, row: i32, col: i32, height: i32, width: i32) -> Result<()> {
        check_size(height, width)?;
        for r in clip(row as i64, row as i64 + height as i64, self.rows) {
            for c in clip(col as i64, col as i64 + width as i64, self.cols) {
                self.put(r, c, Cell::BLANK);
            }
        }
        Ok(())
    }

    /// Write text left to right starting at (row, col)
    ///
    /// Characters left of column 0 are skipped and the text stops at the
    /// right edge. A row outside the grid ignores the whole call.
    pub fn put_text(
        &mut self,
        row: i32,
        col: i32,
        text: &str,
        color_pair: i32,
        attrs: TextAttribute,
    ) -> Result<()> {
        let pair = check_pair_id(color_pair)?;
        if row < 0 || row as usize >= self.rows {
            return Ok(());
        }
        let mut c = col as i64;
        for ch in text.chars() {
            if c >= self.cols as i64 {
                break;
            }
            self.put(row as i64, c, Cell::new(ch, pair, attrs));
            c += 1;
        }
        Ok(())
    }

    /// Horizontal run of `ch`, clipped
    pub fn hline(&mut self, row: i32, col: i32, ch: char, length: i32, color_pair: i32) -> Result<()> {
        let pair = check_pair_id(color_pair)?;
        check_length(length)?;
        let cell = Cell::new(ch, pair, TextAttribute::NORMAL);
        for c in clip(col as i64, col as i64 + length as i64, self.cols) {
            self.put(row as i64, c, cell);
        }
        Ok(())
    }

    /// Vertical run of `ch`, clipped
    pub fn vline(&mut self, row: i32, col: i32, ch: char, length: i32, color_pair: i32) -> Result<()> {
        let pair = check_pair_id(color_pair)?;
        check_length(length)?;
        let cell = Cell::new(ch, pair, TextAttribute::NORMAL);
        for r in clip(row as i64, row as i64 + length as i64, self.rows) {
            self.put(r, col as i64, cell);
        }
        Ok(())
    }

    /// Rectangle outline with box-drawing characters, or a filled block of spaces
    ///
    /// Only border cells are written for outlines; the interior is left as is.
    /// A height of 1 draws a horizontal rule and a width of 1 a vertical one.
    pub fn rect(
        &mut self,
        row: i32,
        col: i32,
        height: i32,
        width: i32,
        color_pair: i32,
        filled: bool,
    ) -> Result<()> {
        let pair = check_pair_id(color_pair)?;
        check_size(height, width)?;
        if height == 0 || width == 0 {
            return Ok(());
        }

        let (top, left) = (row as i64, col as i64);
        let bottom = top + height as i64 - 1;
        let right = left + width as i64 - 1;
        let cell = |ch| Cell::new(ch, pair, TextAttribute::NORMAL);

        if filled {
            for r in clip(top, bottom + 1, self.rows) {
                for c in clip(left, right + 1, self.cols) {
                    self.put(r, c, cell(' '));
                }
            }
            return Ok(());
        }

        use box_chars::*;
        if height == 1 {
            for c in clip(left, right + 1, self.cols) {
                self.put(top, c, cell(HORIZONTAL));
            }
        } else if width == 1 {
            for r in clip(top, bottom + 1, self.rows) {
                self.put(r, left, cell(VERTICAL));
            }
        } else {
            for c in clip(left + 1, right, self.cols) {
                self.put(top, c, cell(HORIZONTAL));
                self.put(bottom, c, cell(HORIZONTAL));
            }
            for r in clip(top + 1, bottom, self.rows) {
                self.put(r, left, cell(VERTICAL));
                self.put(r, right, cell(VERTICAL));
            }
            self.put(top, left, cell(TOP_LEFT));
            self.put(top, right, cell(TOP_RIGHT));
            self.put(bottom, left, cell(BOTTOM_LEFT));
            self.put(bottom, right, cell(BOTTOM_RIGHT));
        }
        Ok(())
    }

    /// Rows modified since the last call, ascending
    pub fn take_dirty_rows(&mut self) -> Vec<usize> {
        self.take_dirty_rows_in(0..self.dirty.len())
    }

    /// Like [`Grid::take_dirty_rows`] for a band of rows; flags outside it stay set
    pub fn take_dirty_rows_in(&mut self, rows: Range<usize>) -> Vec<usize> {
        let end = rows.end.min(self.dirty.len());
        let start = rows.start.min(end);
        let band = &mut self.dirty[start..end];
        let taken = band
            .iter()
            .enumerate()
            .filter_map(|(i, d)| d.then_some(start + i))
            .collect();
        band.fill(false);
        taken
    }

    /// Rows modified and not yet taken, ascending
    pub fn dirty_rows(&self) -> Vec<usize> {
        self.dirty
            .iter()
            .enumerate()
            .filter_map(|(i, d)| d.then_some(i))
            .collect()
    }

    pub fn mark_all_dirty(&mut self) {
        self.dirty.resize(self.rows, true);
        self.dirty.fill(true);
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.iter().any(|d| *d)
    }
}

impl Default for Grid {
    fn default() -> Self {
        Grid::new(0, 0)
    }
}

/// Intersect the half-open range `start..end` with `0..limit`
fn clip(start: i64, end: i64, limit: usize) -> std::ops::Range<i64> {
    start.max(0)..end.min(limit as i64)
}

fn check_size(height: i32, width: i32) -> Result<()> {
    if height < 0 || width < 0 {
        return Err(Error::InvalidDimensions { height, width });
    }
    Ok(())
}

fn check_length(length: i32) -> Result<()> {
    if length < 0 {
        return Err(Error::InvalidArgument(format!(
            "line length must not be negative, got {}",
            length
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn text_at(grid: &Grid, row: usize, col: usize, len: usize) -> String {
        (col..col + len)
            .filter_map(|c| grid.get(row, c).map(|cell| cell.ch))
            .collect()
    }

    #[test]
    fn test_grid_new() {
        let grid = Grid::new(24, 80);
        assert_eq!(grid.dimensions(), (24, 80));
        assert!(grid.get(23, 79).is_some());
        assert!(grid.get(24, 0).is_none());
        assert!(grid.get(0, 80).is_none());
    }

    #[test]
    fn test_put_text() {
        let mut grid = Grid::new(24, 80);
        grid.put_text(0, 0, "Hello", 1, TextAttribute::NORMAL).unwrap();
        assert_eq!(text_at(&grid, 0, 0, 5), "Hello");
        for col in 0..5 {
            let cell = grid.get(0, col).unwrap();
            assert_eq!(cell.color_pair, 1);
            assert_eq!(cell.attrs, TextAttribute::NORMAL);
        }
    }

    #[test]
    fn test_put_text_clips_right_edge() {
        let mut grid = Grid::new(2, 5);
        grid.put_text(0, 3, "abcdef", 0, TextAttribute::BOLD).unwrap();
        assert_eq!(text_at(&grid, 0, 0, 5), "   ab");
        assert_eq!(grid.row(1), &[Cell::BLANK; 5]);
    }

    #[test]
    fn test_put_text_negative_col_skips() {
        let mut grid = Grid::new(1, 5);
        grid.put_text(0, -2, "abcd", 0, TextAttribute::NORMAL).unwrap();
        assert_eq!(text_at(&grid, 0, 0, 5), "cd   ");
    }

    #[test]
    fn test_put_text_invalid_pair() {
        let mut grid = Grid::new(1, 5);
        assert!(grid.put_text(0, 0, "a", 256, TextAttribute::NORMAL).is_err());
        assert!(grid.put_text(0, 0, "a", -1, TextAttribute::NORMAL).is_err());
        // Invalid pair is rejected even for out-of-bounds rows
        assert!(grid.put_text(99, 0, "a", 300, TextAttribute::NORMAL).is_err());
    }

    #[test]
    fn test_lines() {
        let mut grid = Grid::new(5, 5);
        grid.hline(1, -1, '=', 4, 2).unwrap();
        assert_eq!(text_at(&grid, 1, 0, 5), "===  ");
        grid.vline(0, 4, '|', 10, 2).unwrap();
        for row in 0..5 {
            assert_eq!(grid.get(row, 4).unwrap().ch, '|');
        }
        assert!(grid.hline(0, 0, '-', -1, 0).is_err());
        assert!(grid.vline(0, 0, '-', -3, 0).is_err());
        grid.hline(0, 0, '-', 0, 0).unwrap();
        assert_eq!(grid.get(0, 0).unwrap().ch, ' ');
    }

    #[test]
    fn test_rect_outline() {
        let mut grid = Grid::new(24, 80);
        grid.put_text(6, 15, "inside", 0, TextAttribute::NORMAL).unwrap();
        grid.rect(5, 10, 3, 20, 2, false).unwrap();

        assert_eq!(grid.get(5, 10).unwrap().ch, '┌');
        assert_eq!(grid.get(5, 29).unwrap().ch, '┐');
        assert_eq!(grid.get(7, 10).unwrap().ch, '└');
        assert_eq!(grid.get(7, 29).unwrap().ch, '┘');
        for col in 11..29 {
            assert_eq!(grid.get(5, col).unwrap().ch, '─');
            assert_eq!(grid.get(7, col).unwrap().ch, '─');
        }
        assert_eq!(grid.get(6, 10).unwrap().ch, '│');
        assert_eq!(grid.get(6, 29).unwrap().ch, '│');
        assert_eq!(grid.get(6, 10).unwrap().color_pair, 2);

        // Interior untouched
        assert_eq!(text_at(&grid, 6, 15, 6), "inside");
        assert_eq!(grid.get(6, 11).unwrap(), &Cell::BLANK);
        // Outside untouched
        assert_eq!(grid.get(4, 10).unwrap(), &Cell::BLANK);
        assert_eq!(grid.get(5, 30).unwrap(), &Cell::BLANK);
    }

    #[test]
    fn test_rect_degenerate() {
        let mut grid = Grid::new(10, 10);
        grid.rect(0, 0, 1, 4, 0, false).unwrap();
        assert_eq!(text_at(&grid, 0, 0, 4), "────");
        grid.rect(2, 5, 3, 1, 0, false).unwrap();
        for row in 2..5 {
            assert_eq!(grid.get(row, 5).unwrap().ch, '│');
        }
        grid.rect(8, 8, 0, 5, 0, false).unwrap();
        assert!(grid.rect(0, 0, -1, 5, 0, false).is_err());
    }

    #[test]
    fn test_rect_filled() {
        let mut grid = Grid::new(5, 5);
        grid.put_text(1, 1, "xx", 0, TextAttribute::NORMAL).unwrap();
        grid.rect(1, 1, 2, 2, 7, true).unwrap();
        for row in 1..3 {
            for col in 1..3 {
                assert_eq!(grid.get(row, col).unwrap(), &Cell::blank_with(7));
            }
        }
    }

    #[test]
    fn test_rect_partially_offscreen() {
        let mut grid = Grid::new(4, 4);
        grid.rect(-1, -1, 3, 3, 0, false).unwrap();
        // Only the visible part of the true border is drawn
        assert_eq!(grid.get(0, 1).unwrap().ch, '│');
        assert_eq!(grid.get(1, 0).unwrap().ch, '─');
        assert_eq!(grid.get(1, 1).unwrap().ch, '┘');
        assert_eq!(grid.get(0, 0).unwrap(), &Cell::BLANK);
    }

    #[test]
    fn test_clear_and_clear_region() {
        let mut grid = Grid::new(4, 4);
        grid.rect(0, 0, 4, 4, 3, true).unwrap();
        grid.clear_region(1, 1, 10, 10).unwrap();
        assert_eq!(grid.get(0, 0).unwrap().color_pair, 3);
        assert_eq!(grid.get(3, 3).unwrap(), &Cell::BLANK);
        assert!(grid.clear_region(0, 0, -1, 1).is_err());
        assert!(grid.clear_region(0, 0, 1, -1).is_err());

        grid.clear();
        for row in 0..4 {
            assert!(grid.row(row).iter().all(|c| *c == Cell::BLANK));
        }
    }

    #[test]
    fn test_resized_copies_overlap() {
        let mut grid = Grid::new(3, 3);
        grid.put_text(0, 0, "abc", 1, TextAttribute::NORMAL).unwrap();
        grid.put_text(2, 0, "xyz", 1, TextAttribute::NORMAL).unwrap();

        let small = grid.resized(2, 2);
        assert_eq!(small.dimensions(), (2, 2));
        assert_eq!(text_at(&small, 0, 0, 2), "ab");

        let big = small.resized(3, 3);
        assert_eq!(text_at(&big, 0, 0, 3), "ab ");
        assert_eq!(big.get(2, 0).unwrap(), &Cell::BLANK);
        // Source grid untouched
        assert_eq!(text_at(&grid, 2, 0, 3), "xyz");
    }

    #[test]
    fn test_dirty_rows() {
        let mut grid = Grid::new(4, 4);
        assert_eq!(grid.take_dirty_rows(), vec![0, 1, 2, 3]);
        assert!(!grid.is_dirty());
        grid.put_text(2, 0, "a", 0, TextAttribute::NORMAL).unwrap();
        grid.put_text(9, 0, "a", 0, TextAttribute::NORMAL).unwrap();
        assert_eq!(grid.take_dirty_rows(), vec![2]);
        assert!(grid.take_dirty_rows().is_empty());
    }

    #[test]
    fn test_dirty_rows_in_band() {
        let mut grid = Grid::new(5, 4);
        assert_eq!(grid.take_dirty_rows_in(1..3), vec![1, 2]);
        assert_eq!(grid.dirty_rows(), vec![0, 3, 4]);
        // Out of range bounds are clamped
        assert_eq!(grid.take_dirty_rows_in(4..40), vec![4]);
        assert!(grid.take_dirty_rows_in(9..12).is_empty());
        assert_eq!(grid.take_dirty_rows(), vec![0, 3]);
    }

    proptest! {
        #[test]
        fn prop_out_of_bounds_draws_leave_grid_untouched(
            row in prop_oneof![-1000i32..0, 10i32..1000],
            col in -1000i32..1000,
            text in "[a-z]{0,12}",
            len in 0i32..50,
        ) {
            let mut grid = Grid::new(10, 10);
            grid.put_text(0, 0, "seed", 1, TextAttribute::BOLD).unwrap();
            let before = grid.clone();

            grid.put_text(row, col, &text, 1, TextAttribute::NORMAL).unwrap();
            grid.hline(row, col, '-', len, 1).unwrap();
            prop_assert_eq!(&grid.cells, &before.cells);
        }

        #[test]
        fn prop_clipping_never_touches_cells_outside_request(
            row in -20i32..20,
            col in -20i32..20,
            height in 0i32..30,
            width in 0i32..30,
        ) {
            let mut grid = Grid::new(8, 12);
            grid.rect(row, col, height, width, 5, true).unwrap();
            for r in 0..8 {
                for c in 0..12 {
                    let inside = (r as i32) >= row && (r as i32) < row + height
                        && (c as i32) >= col && (c as i32) < col + width;
                    let cell = grid.get(r, c).unwrap();
                    if inside {
                        prop_assert_eq!(cell.color_pair, 5);
                    } else {
                        prop_assert_eq!(*cell, Cell::BLANK);
                    }
                }
            }
        }

        #[test]
        fn prop_resize_round_trip_preserves_overlap(
            rows in 1usize..30,
            cols in 1usize..30,
            shrink_rows in 1usize..30,
            shrink_cols in 1usize..30,
        ) {
            let mut grid = Grid::new(rows, cols);
            for r in 0..rows {
                let line: String = (0..cols).map(|c| char::from(b'a' + ((r + c) % 26) as u8)).collect();
                grid.put_text(r as i32, 0, &line, 1, TextAttribute::NORMAL).unwrap();
            }
            let restored = grid.resized(shrink_rows, shrink_cols).resized(rows, cols);
            prop_assert_eq!(restored.dimensions(), (rows, cols));
            for r in 0..rows.min(shrink_rows) {
                for c in 0..cols.min(shrink_cols) {
                    prop_assert_eq!(restored.get(r, c), grid.get(r, c));
                }
            }
        }
    }
}
