//! TTK Terminal - renderer backend for ANSI terminals
//!
//! Maps the character grid onto terminal cells through crossterm and
//! translates terminal input into the unified event model. Menus, clipboard
//! and drag-and-drop are desktop features and are reported as unsupported.

mod backend;
pub mod input;
mod ops;
mod palette;

pub use backend::TerminalRenderer;
pub use ops::{CrosstermOps, TerminalGuard, TerminalOps};
pub use palette::{ColorMode, Palette};
