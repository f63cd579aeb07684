//! Pixel <-> grid coordinate helpers and dirty regions

use serde::{Deserialize, Serialize};

/// Largest sub-cell fraction; keeps positions strictly inside their cell
pub const MAX_SUB_CELL: f32 = 0.999_999;

/// Grid position of a pixel coordinate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridPosition {
    pub col: i64,
    pub row: i64,
    pub sub_x: f32,
    pub sub_y: f32,
}

/// Map pixel coordinates to (col, row) plus the fractional position inside the cell
///
/// The result is not clamped; pixels left of or above the window yield
/// negative cells.
pub fn screen_to_grid(x: f64, y: f64, cell_width: f32, cell_height: f32) -> GridPosition {
    let cw = f64::from(cell_width.max(1.0));
    let ch = f64::from(cell_height.max(1.0));
    let fx = x / cw;
    let fy = y / ch;
    let col = fx.floor();
    let row = fy.floor();
    GridPosition {
        col: col as i64,
        row: row as i64,
        sub_x: ((fx - col) as f32).clamp(0.0, MAX_SUB_CELL),
        sub_y: ((fy - row) as f32).clamp(0.0, MAX_SUB_CELL),
    }
}

/// Inverse of `screen_to_grid`
pub fn grid_to_screen(pos: GridPosition, cell_width: f32, cell_height: f32) -> (f64, f64) {
    (
        (pos.col as f64 + f64::from(pos.sub_x)) * f64::from(cell_width),
        (pos.row as f64 + f64::from(pos.sub_y)) * f64::from(cell_height),
    )
}

/// Clamp a signed cell position into a grid of `cols` x `rows`
pub fn clamp_to_grid(col: i64, row: i64, cols: usize, rows: usize) -> (usize, usize) {
    let clamp = |v: i64, max: usize| v.clamp(0, max.saturating_sub(1) as i64) as usize;
    (clamp(col, cols), clamp(row, rows))
}

/// A rectangle of cells to repaint, end bounds exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirtyRegion {
    pub start_row: usize,
    pub end_row: usize,
    pub start_col: usize,
    pub end_col: usize,
}

impl DirtyRegion {
    /// The whole grid
    pub fn full(rows: usize, cols: usize) -> Self {
        Self {
            start_row: 0,
            end_row: rows,
            start_col: 0,
            end_col: cols,
        }
    }

    /// Cells touched by a pixel rectangle, clamped to the grid
    #[allow(clippy::too_many_arguments)]
    pub fn from_pixels(
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        cell_width: f32,
        cell_height: f32,
        rows: usize,
        cols: usize,
    ) -> Self {
        let cw = cell_width.max(1.0);
        let ch = cell_height.max(1.0);
        let to_index = |v: f32, max: usize| (v.max(0.0) as usize).min(max);
        let start_col = to_index((x / cw).floor(), cols);
        let start_row = to_index((y / ch).floor(), rows);
        let end_col = to_index(((x + width) / cw).ceil(), cols);
        let end_row = to_index(((y + height) / ch).ceil(), rows);
        Self {
            start_row,
            end_row: end_row.max(start_row),
            start_col,
            end_col: end_col.max(start_col),
        }
    }

    /// Cells of a (row, col, height, width) request, clamped to the grid
    pub fn from_cells(row: i32, col: i32, height: i32, width: i32, rows: usize, cols: usize) -> Self {
        let clamp = |v: i64, max: usize| v.clamp(0, max as i64) as usize;
        let start_row = clamp(row as i64, rows);
        let start_col = clamp(col as i64, cols);
        let end_row = clamp(row as i64 + height.max(0) as i64, rows);
        let end_col = clamp(col as i64 + width.max(0) as i64, cols);
        Self {
            start_row,
            end_row: end_row.max(start_row),
            start_col,
            end_col: end_col.max(start_col),
        }
    }

    /// Smallest region covering a set of rows across all columns
    pub fn from_rows(rows: &[usize], cols: usize) -> Option<Self> {
        let first = *rows.iter().min()?;
        let last = *rows.iter().max()?;
        Some(Self {
            start_row: first,
            end_row: last + 1,
            start_col: 0,
            end_col: cols,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.start_row >= self.end_row || self.start_col >= self.end_col
    }

    pub fn contains(&self, row: usize, col: usize) -> bool {
        (self.start_row..self.end_row).contains(&row) && (self.start_col..self.end_col).contains(&col)
    }

    pub fn cell_count(&self) -> usize {
        (self.end_row - self.start_row) * (self.end_col - self.start_col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_screen_to_grid() {
        let pos = screen_to_grid(25.0, 40.0, 10.0, 20.0);
        assert_eq!((pos.col, pos.row), (2, 2));
        assert!((pos.sub_x - 0.5).abs() < 1e-6);
        assert_eq!(pos.sub_y, 0.0);
    }

    #[test]
    fn test_screen_to_grid_negative() {
        let pos = screen_to_grid(-5.0, 3.0, 10.0, 20.0);
        assert_eq!(pos.col, -1);
        assert_eq!(pos.row, 0);
        assert!((pos.sub_x - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_sub_cell_never_reaches_one() {
        let pos = screen_to_grid(9.999_999_9, 0.0, 10.0, 20.0);
        assert!(pos.sub_x < 1.0);
        assert_eq!(pos.col, 0);
    }

    #[test]
    fn test_grid_to_screen_inverse() {
        let pos = GridPosition {
            col: 3,
            row: 4,
            sub_x: 0.25,
            sub_y: 0.5,
        };
        let (x, y) = grid_to_screen(pos, 8.0, 16.0);
        assert_eq!((x, y), (26.0, 72.0));
        let back = screen_to_grid(x, y, 8.0, 16.0);
        assert_eq!((back.col, back.row), (3, 4));
        assert!((back.sub_x - 0.25).abs() < 1e-5);
    }

    #[test]
    fn test_clamp_to_grid() {
        assert_eq!(clamp_to_grid(-3, 5, 80, 24), (0, 5));
        assert_eq!(clamp_to_grid(100, 30, 80, 24), (79, 23));
        assert_eq!(clamp_to_grid(5, 5, 0, 0), (0, 0));
    }

    #[test]
    fn test_dirty_region_from_pixels() {
        let region = DirtyRegion::from_pixels(15.0, 10.0, 20.0, 25.0, 10.0, 20.0, 24, 80);
        assert_eq!(
            region,
            DirtyRegion {
                start_row: 0,
                end_row: 2,
                start_col: 1,
                end_col: 4,
            }
        );
    }

    #[test]
    fn test_dirty_region_clamped() {
        let region = DirtyRegion::from_pixels(-50.0, -50.0, 10_000.0, 10_000.0, 10.0, 20.0, 24, 80);
        assert_eq!(region, DirtyRegion::full(24, 80));

        let outside = DirtyRegion::from_pixels(5000.0, 5000.0, 10.0, 10.0, 10.0, 20.0, 24, 80);
        assert!(outside.is_empty());
    }

    #[test]
    fn test_dirty_region_from_cells() {
        let region = DirtyRegion::from_cells(-2, 5, 10, 100, 24, 80);
        assert_eq!(region.start_row, 0);
        assert_eq!(region.end_row, 8);
        assert_eq!(region.start_col, 5);
        assert_eq!(region.end_col, 80);
        assert!(region.contains(7, 79));
        assert!(!region.contains(8, 5));
        assert_eq!(region.cell_count(), 8 * 75);
    }

    #[test]
    fn test_dirty_region_from_rows() {
        assert_eq!(DirtyRegion::from_rows(&[], 80), None);
        let region = DirtyRegion::from_rows(&[3, 7, 5], 80).unwrap();
        assert_eq!((region.start_row, region.end_row), (3, 8));
    }
}
