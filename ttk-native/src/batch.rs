//! Background batching and color conversion caches for the painters

use std::collections::{HashMap, VecDeque};

use ttk_core::{Canvas, DirtyRegion, Rgb};

use crate::font::CellMetrics;

/// Entries kept before the cache evicts
pub const COLOR_CACHE_CAPACITY: usize = 256;

/// Bounded memo of RGB conversions (pixel words, normalized floats)
///
/// When full, the older half of the entries is dropped.
#[derive(Debug)]
pub struct ColorCache<V> {
    map: HashMap<Rgb, V>,
    order: VecDeque<Rgb>,
}

impl<V: Copy> Default for ColorCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Copy> ColorCache<V> {
    pub fn new() -> Self {
        Self {
            map: HashMap::with_capacity(COLOR_CACHE_CAPACITY),
            order: VecDeque::with_capacity(COLOR_CACHE_CAPACITY),
        }
    }

    pub fn get_or_insert_with(&mut self, rgb: Rgb, convert: impl FnOnce(Rgb) -> V) -> V {
        if let Some(value) = self.map.get(&rgb) {
            return *value;
        }
        if self.map.len() >= COLOR_CACHE_CAPACITY {
            for old in self.order.drain(..COLOR_CACHE_CAPACITY / 2) {
                self.map.remove(&old);
            }
        }
        let value = convert(rgb);
        self.map.insert(rgb, value);
        self.order.push_back(rgb);
        value
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn clear(&mut self) {
        self.map.clear();
        self.order.clear();
    }
}

/// A run of same-colored cell backgrounds in one row, in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RectBatch {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub bg: Rgb,
}

/// Merges adjacent cells sharing a background into single rectangles
#[derive(Debug, Default)]
pub struct RectangleBatcher {
    batches: Vec<RectBatch>,
}

impl RectangleBatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Background rectangles covering `region`
    ///
    /// Reverse video is applied; the cursor is not, painters draw it on top.
    pub fn build(&mut self, canvas: &Canvas, region: &DirtyRegion, metrics: CellMetrics) -> &[RectBatch] {
        self.batches.clear();
        let cw = metrics.width as i32;
        let ch = metrics.height as i32;
        for row in region.start_row..region.end_row {
            let mut run: Option<(usize, usize, Rgb)> = None;
            for col in region.start_col..region.end_col {
                let Some(cell) = canvas.cell(row, col) else {
                    continue;
                };
                let (_, bg) = canvas.cell_colors(&cell);
                run = match run {
                    Some((start, _, color)) if color == bg => Some((start, col, color)),
                    Some(done) => {
                        self.push(row, done, cw, ch);
                        Some((col, col, bg))
                    }
                    None => Some((col, col, bg)),
                };
            }
            if let Some(done) = run {
                self.push(row, done, cw, ch);
            }
        }
        &self.batches
    }

    fn push(&mut self, row: usize, (start, end, bg): (usize, usize, Rgb), cw: i32, ch: i32) {
        self.batches.push(RectBatch {
            x: start as i32 * cw,
            y: row as i32 * ch,
            width: (end - start + 1) as i32 * cw,
            height: ch,
            bg,
        });
    }
}
