use std::sync::Arc;

use ttk_core::{Canvas, DirtyRegion, Result};
use winit::window::Window;

use crate::font::FontFace;

/// Puts a canvas on a window surface
///
/// The native renderer owns window, grid and input handling and delegates
/// only pixel production to a painter.
pub trait Painter: Sized {
    /// Backend name reported by the renderer
    const BACKEND: &'static str;

    fn new(window: Arc<Window>, font: FontFace) -> Result<Self>;

    /// Surface size changed, in physical pixels
    fn resize(&mut self, width: u32, height: u32);

    /// Repaint `region` (at least) and present the frame
    fn paint(&mut self, canvas: &Canvas, region: DirtyRegion) -> Result<()>;

    /// Drop cached glyphs and colors
    fn clear_caches(&mut self);
}
