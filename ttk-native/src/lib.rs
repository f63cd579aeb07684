//! TTK Native - windowed backends for the TTK renderer contract
//!
//! Both backends open a winit window, load a validated monospace font and
//! share one renderer implementation for input, clipboard, drag sessions and
//! menus. They differ in how pixels are produced:
//! - [`CpuRenderer`]: cells composited in software and presented through softbuffer
//! - [`GpuRenderer`]: instanced quads drawn with wgpu (feature `gpu`)

pub mod batch;
mod clipboard;
pub mod cpu;
pub mod font;
#[cfg(feature = "gpu")]
pub mod gpu;
mod host;
pub mod keymap;
mod menu;
mod painter;
mod renderer;

pub use cpu::CpuPainter;
pub use font::{CellMetrics, FontFace};
#[cfg(feature = "gpu")]
pub use gpu::GpuPainter;
pub use painter::Painter;
pub use renderer::{locate, NativeRenderer, DEFAULT_WINDOW_SIZE};

/// Software-composited window backend
pub type CpuRenderer = NativeRenderer<CpuPainter>;

/// Hardware-accelerated window backend
#[cfg(feature = "gpu")]
pub type GpuRenderer = NativeRenderer<GpuPainter>;
