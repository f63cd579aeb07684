//! Font discovery, validation and glyph rasterization
//!
//! Faces are looked up by family name in the system font database and
//! rasterized with fontdue. The grid only works with fonts whose glyphs all
//! share one advance, so every face is validated before use.

use fontdb::{Database, Family, Query};
use fontdue::{Font, FontSettings};
use ttk_core::{Error, Result};

/// Characters whose advances must agree for a font to count as monospace
pub const MONOSPACE_PROBE: [char; 5] = ['i', 'W', 'M', '1', ' '];

/// Cell size used when a face reports unusable metrics
pub const FALLBACK_CELL: CellMetrics = CellMetrics {
    width: 8.0,
    height: 16.0,
    baseline: 13.0,
};

/// Pixel size of one grid cell
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellMetrics {
    pub width: f32,
    pub height: f32,
    /// Distance from the cell top to the baseline
    pub baseline: f32,
}

impl CellMetrics {
    /// Cell metrics from a face's advance and vertical line metrics
    ///
    /// The height is ascent - descent + line gap (descent is negative). A
    /// degenerate width or height selects the 8x16 fallback cell.
    pub fn from_line_metrics(advance: f32, ascent: f32, descent: f32, line_gap: f32) -> Self {
        let width = advance.ceil();
        let height = (ascent - descent + line_gap).ceil();
        if !(width >= 1.0 && height >= 1.0) || !width.is_finite() || !height.is_finite() {
            log::warn!(
                "degenerate font metrics (advance {}, height {}), using {}x{} cells",
                advance,
                height,
                FALLBACK_CELL.width,
                FALLBACK_CELL.height
            );
            return FALLBACK_CELL;
        }
        Self {
            width,
            height,
            baseline: (ascent + line_gap / 2.0).ceil(),
        }
    }

    /// Grid size that fits in a surface, never smaller than 1x1
    ///
    /// A zero-sized surface (minimized window) falls back to 40 rows by 80
    /// columns.
    pub fn grid_for(&self, width: u32, height: u32) -> (usize, usize) {
        if width == 0 || height == 0 {
            return (40, 80);
        }
        let rows = (height as f32 / self.height).floor() as usize;
        let cols = (width as f32 / self.width).floor() as usize;
        (rows.max(1), cols.max(1))
    }

    /// Surface size in pixels for a grid
    pub fn surface_for(&self, rows: usize, cols: usize) -> (u32, u32) {
        (
            (cols as f32 * self.width).ceil() as u32,
            (rows as f32 * self.height).ceil() as u32,
        )
    }
}

/// Reject fonts whose probe characters have different advances
///
/// Widths are compared after rounding to two decimals so hinting noise does
/// not fail an otherwise monospace face.
pub fn validate_monospace(name: &str, widths: &[f32]) -> Result<()> {
    let rounded: Vec<f32> = widths.iter().map(|w| (w * 100.0).round() / 100.0).collect();
    let uniform = rounded.windows(2).all(|pair| pair[0] == pair[1]);
    if uniform {
        Ok(())
    } else {
        Err(Error::FontNotMonospace {
            name: name.to_string(),
            widths: rounded,
        })
    }
}

/// Rasterized glyph coverage
#[derive(Debug, Clone, Default)]
pub struct GlyphBitmap {
    pub bitmap: Vec<u8>,
    pub width: usize,
    pub height: usize,
    pub xmin: i32,
    pub ymin: i32,
}

impl GlyphBitmap {
    /// Widen the glyph by one pixel, each pixel taking the stronger of itself
    /// and its left neighbour
    pub fn overstruck(&self) -> GlyphBitmap {
        if self.width == 0 || self.height == 0 {
            return self.clone();
        }
        let width = self.width + 1;
        let mut bitmap = vec![0u8; width * self.height];
        for y in 0..self.height {
            for x in 0..width {
                let here = if x < self.width {
                    self.bitmap[y * self.width + x]
                } else {
                    0
                };
                let left = if x > 0 {
                    self.bitmap[y * self.width + x - 1]
                } else {
                    0
                };
                bitmap[y * width + x] = here.max(left);
            }
        }
        GlyphBitmap {
            bitmap,
            width,
            height: self.height,
            xmin: self.xmin,
            ymin: self.ymin,
        }
    }
}

/// A validated monospace face at a fixed pixel size
pub struct FontFace {
    name: String,
    font: Font,
    px: f32,
    metrics: CellMetrics,
}

impl std::fmt::Debug for FontFace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontFace")
            .field("name", &self.name)
            .field("px", &self.px)
            .field("metrics", &self.metrics)
            .finish()
    }
}

impl FontFace {
    /// Find `family` among the system fonts and prepare it at `px` pixels
    pub fn load(family: &str, px: f32) -> Result<Self> {
        let mut db = Database::new();
        db.load_system_fonts();
        log::debug!("font database holds {} faces", db.len());

        let query = Query {
            families: &[Family::Name(family)],
            ..Query::default()
        };
        let id = db.query(&query).ok_or_else(|| Error::FontNotFound {
            name: family.to_string(),
        })?;

        let font = db
            .with_face_data(id, |data, index| {
                let settings = FontSettings {
                    collection_index: index,
                    scale: px.max(1.0),
                    ..FontSettings::default()
                };
                Font::from_bytes(data, settings)
            })
            .ok_or_else(|| Error::FontNotFound {
                name: family.to_string(),
            })?
            .map_err(|err| Error::init("native", format!("cannot parse font '{}': {}", family, err)))?;

        Self::from_font(family, font, px)
    }

    /// Wrap an already parsed font, validating it
    pub fn from_font(name: &str, font: Font, px: f32) -> Result<Self> {
        let widths: Vec<f32> = MONOSPACE_PROBE
            .iter()
            .map(|&c| font.metrics(c, px).advance_width)
            .collect();
        validate_monospace(name, &widths)?;

        let metrics = match font.horizontal_line_metrics(px) {
            Some(line) => {
                CellMetrics::from_line_metrics(widths[0], line.ascent, line.descent, line.line_gap)
            }
            None => FALLBACK_CELL,
        };
        log::info!(
            "font '{}' at {}px: cell {}x{}",
            name,
            px,
            metrics.width,
            metrics.height
        );
        Ok(Self {
            name: name.to_string(),
            font,
            px,
            metrics,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metrics(&self) -> CellMetrics {
        self.metrics
    }

    /// Coverage bitmap for `c`; bold glyphs are overstruck by one pixel
    pub fn rasterize(&self, c: char, bold: bool) -> GlyphBitmap {
        let (metrics, bitmap) = self.font.rasterize(c, self.px);
        let glyph = GlyphBitmap {
            bitmap,
            width: metrics.width,
            height: metrics.height,
            xmin: metrics.xmin,
            ymin: metrics.ymin,
        };
        if bold {
            glyph.overstruck()
        } else {
            glyph
        }
    }
}
