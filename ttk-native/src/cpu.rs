//! CPU-composited painter
//!
//! Cells are composited into a retained frame buffer: batched background
//! rectangles first, then alpha-blended glyphs, underlines and the cursor.
//! Only the requested region is recomposited; the whole frame is then copied
//! into the softbuffer surface and presented.

use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::Arc;

use softbuffer::{Context, Surface};
use ttk_core::{Canvas, DirtyRegion, Error, Result, Rgb, TextAttribute};
use winit::window::Window;

use crate::batch::{ColorCache, RectangleBatcher};
use crate::font::{CellMetrics, FontFace, GlyphBitmap};
use crate::painter::Painter;

const BACKEND: &str = "cpu";

pub struct CpuPainter {
    #[allow(dead_code)]
    context: Context<Arc<Window>>,
    surface: Surface<Arc<Window>, Arc<Window>>,
    font: FontFace,
    metrics: CellMetrics,
    glyph_cache: HashMap<(char, bool), GlyphBitmap>,
    pixels: ColorCache<u32>,
    batcher: RectangleBatcher,
    frame: Vec<u32>,
    width: u32,
    height: u32,
}

impl Painter for CpuPainter {
    const BACKEND: &'static str = BACKEND;

    fn new(window: Arc<Window>, font: FontFace) -> Result<Self> {
        let context = Context::new(window.clone())
            .map_err(|e| Error::init(BACKEND, format!("cannot create drawing context: {}", e)))?;
        let surface = Surface::new(&context, window.clone())
            .map_err(|e| Error::init(BACKEND, format!("cannot create drawing surface: {}", e)))?;
        let size = window.inner_size();
        let metrics = font.metrics();

        let mut painter = Self {
            context,
            surface,
            font,
            metrics,
            glyph_cache: HashMap::with_capacity(256),
            pixels: ColorCache::new(),
            batcher: RectangleBatcher::new(),
            frame: Vec::new(),
            width: 0,
            height: 0,
        };
        painter.resize(size.width, size.height);
        Ok(painter)
    }

    fn resize(&mut self, width: u32, height: u32) {
        if (width, height) == (self.width, self.height) {
            return;
        }
        self.width = width;
        self.height = height;
        self.frame = vec![rgb_to_pixel(Rgb::BLACK); (width as usize) * (height as usize)];

        if let (Some(w), Some(h)) = (NonZeroU32::new(width), NonZeroU32::new(height)) {
            if let Err(e) = self.surface.resize(w, h) {
                log::warn!("cannot resize drawing surface to {}x{}: {}", width, height, e);
            }
        }
    }

    fn paint(&mut self, canvas: &Canvas, region: DirtyRegion) -> Result<()> {
        if self.width == 0 || self.height == 0 || region.is_empty() {
            return Ok(());
        }
        self.compose(canvas, &region);
        self.present()
    }

    fn clear_caches(&mut self) {
        self.glyph_cache.clear();
        self.pixels.clear();
    }
}

impl CpuPainter {
    fn compose(&mut self, canvas: &Canvas, region: &DirtyRegion) {
        let (bw, bh) = (self.width, self.height);
        let cw = self.metrics.width as i32;
        let ch = self.metrics.height as i32;
        let baseline = self.metrics.baseline;

        for batch in self.batcher.build(canvas, region, self.metrics) {
            let pixel = self.pixels.get_or_insert_with(batch.bg, rgb_to_pixel);
            fill_rect(&mut self.frame, bw, bh, batch.x, batch.y, batch.width, batch.height, pixel);
        }

        for row in region.start_row..region.end_row {
            for col in region.start_col..region.end_col {
                let Some(cell) = canvas.cell(row, col) else {
                    continue;
                };
                let (fg, _) = canvas.cell_colors(&cell);
                let x = col as i32 * cw;
                let y = row as i32 * ch;

                if cell.has_glyph() {
                    let bold = cell.attrs.contains(TextAttribute::BOLD);
                    let font = &self.font;
                    let glyph = self
                        .glyph_cache
                        .entry((cell.ch, bold))
                        .or_insert_with(|| font.rasterize(cell.ch, bold));
                    draw_glyph(&mut self.frame, bw, bh, x, y, glyph, fg, baseline);
                }
                if cell.attrs.contains(TextAttribute::UNDERLINE) {
                    let pixel = self.pixels.get_or_insert_with(fg, rgb_to_pixel);
                    fill_rect(&mut self.frame, bw, bh, x, y + baseline as i32 + 1, cw, 1, pixel);
                }
            }
        }

        let cursor = canvas.cursor;
        if cursor.visible && region.contains(cursor.row, cursor.col) {
            invert_rect(
                &mut self.frame,
                bw,
                bh,
                cursor.col as i32 * cw,
                cursor.row as i32 * ch,
                cw,
                ch,
            );
        }
    }

    fn present(&mut self) -> Result<()> {
        let mut buffer = self
            .surface
            .buffer_mut()
            .map_err(|e| Error::init(BACKEND, format!("cannot map surface buffer: {}", e)))?;
        if buffer.len() == self.frame.len() {
            buffer.copy_from_slice(&self.frame);
        } else {
            // Surface and frame disagree until the pending resize lands
            let n = buffer.len().min(self.frame.len());
            buffer[..n].copy_from_slice(&self.frame[..n]);
        }
        buffer
            .present()
            .map_err(|e| Error::init(BACKEND, format!("cannot present frame: {}", e)))
    }
}

fn rgb_to_pixel(c: Rgb) -> u32 {
    0xFF00_0000 | c.packed()
}

#[allow(clippy::too_many_arguments)]
fn fill_rect(buffer: &mut [u32], buf_width: u32, buf_height: u32, x: i32, y: i32, w: i32, h: i32, pixel: u32) {
    let x0 = x.max(0);
    let y0 = y.max(0);
    let x1 = (x + w).min(buf_width as i32);
    let y1 = (y + h).min(buf_height as i32);
    for py in y0..y1 {
        let start = (py as u32 * buf_width + x0 as u32) as usize;
        let end = (py as u32 * buf_width + x1.max(x0) as u32) as usize;
        if let Some(span) = buffer.get_mut(start..end) {
            span.fill(pixel);
        }
    }
}

fn invert_rect(buffer: &mut [u32], buf_width: u32, buf_height: u32, x: i32, y: i32, w: i32, h: i32) {
    for py in y.max(0)..(y + h).min(buf_height as i32) {
        for px in x.max(0)..(x + w).min(buf_width as i32) {
            let idx = (py as u32 * buf_width + px as u32) as usize;
            if let Some(p) = buffer.get_mut(idx) {
                *p ^= 0x00FF_FFFF;
            }
        }
    }
}

fn blend(existing: u32, color: Rgb, alpha: u8) -> u32 {
    if alpha == 255 {
        return rgb_to_pixel(color);
    }
    let a = u32::from(alpha);
    let ia = 255 - a;
    let mix = |src: u8, shift: u32| (u32::from(src) * a + ((existing >> shift) & 0xFF) * ia) / 255;
    0xFF00_0000 | (mix(color.r, 16) << 16) | (mix(color.g, 8) << 8) | mix(color.b, 0)
}

#[allow(clippy::too_many_arguments)]
fn draw_glyph(
    buffer: &mut [u32],
    buf_width: u32,
    buf_height: u32,
    x: i32,
    y: i32,
    glyph: &GlyphBitmap,
    color: Rgb,
    baseline: f32,
) {
    if glyph.width == 0 || glyph.height == 0 {
        return;
    }

    let gx = x + glyph.xmin;
    let gy = y + (baseline as i32) - glyph.ymin - glyph.height as i32;

    for dy in 0..glyph.height {
        let py = gy + dy as i32;
        if py < 0 || py >= buf_height as i32 {
            continue;
        }
        for dx in 0..glyph.width {
            let px = gx + dx as i32;
            if px < 0 || px >= buf_width as i32 {
                continue;
            }
            let alpha = glyph.bitmap[dy * glyph.width + dx];
            if alpha == 0 {
                continue;
            }
            let idx = (py as u32 * buf_width + px as u32) as usize;
            if let Some(p) = buffer.get_mut(idx) {
                *p = blend(*p, color, alpha);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLACK: u32 = 0xFF00_0000;

    #[test]
    fn test_fill_rect_clips() {
        let mut buf = vec![BLACK; 4 * 3];
        fill_rect(&mut buf, 4, 3, -1, 1, 3, 5, 0xFF11_2233);
        assert_eq!(&buf[0..4], &[BLACK; 4]);
        assert_eq!(&buf[4..8], &[0xFF11_2233, 0xFF11_2233, BLACK, BLACK]);
        assert_eq!(&buf[8..12], &[0xFF11_2233, 0xFF11_2233, BLACK, BLACK]);
    }

    #[test]
    fn test_blend() {
        let red = Rgb::new(255, 0, 0);
        assert_eq!(blend(BLACK, red, 255), 0xFFFF_0000);
        assert_eq!(blend(BLACK, red, 0), BLACK);
        assert_eq!(blend(0xFF00_00FF, red, 51), 0xFF33_00CC);
    }

    #[test]
    fn test_draw_glyph_sits_on_baseline() {
        let glyph = GlyphBitmap {
            bitmap: vec![255, 128],
            width: 1,
            height: 2,
            xmin: 1,
            ymin: 0,
        };
        let mut buf = vec![BLACK; 4 * 4];
        draw_glyph(&mut buf, 4, 4, 0, 0, &glyph, Rgb::WHITE, 3.0);
        // Bottom row of the glyph lands on the pixel row above the baseline
        assert_eq!(buf[4 + 1], 0xFFFF_FFFF);
        assert_eq!(buf[2 * 4 + 1], 0xFF80_8080);
        assert_eq!(buf.iter().filter(|&&p| p != BLACK).count(), 2);
    }

    #[test]
    fn test_cursor_inversion() {
        let mut buf = vec![BLACK; 2 * 2];
        invert_rect(&mut buf, 2, 2, 1, 0, 5, 5);
        assert_eq!(buf, vec![BLACK, 0xFFFF_FFFF, BLACK, 0xFFFF_FFFF]);
    }
}
