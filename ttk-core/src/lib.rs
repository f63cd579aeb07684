//! TTK Core - Backend-independent rendering model
//!
//! This crate provides everything the rendering backends share:
//! - The `Renderer` contract and the `EventCallback` client interface
//! - The unified input event model (keys, characters, mouse, menus, system)
//! - The character grid with clipped drawing primitives
//! - Color pairs, text attributes and palette approximations
//! - Menu bar descriptors, drag session bookkeeping and serializable commands
//!
//! The grid is deterministic: given the same sequence of drawing calls it will
//! always hold the same cells, whichever backend eventually displays it.

pub mod callback;
mod canvas;
mod cell;
pub mod color;
pub mod command;
mod drag;
mod error;
pub mod event;
pub mod geometry;
mod grid;
mod headless;
pub mod menu;
mod renderer;
mod snapshot;

pub use callback::CallbackHost;
pub use canvas::Canvas;
pub use cell::Cell;
pub use color::{ColorPair, ColorPairTable, Rgb, TextAttribute};
pub use command::{parse_commands, replay, Command};
pub use drag::{DragCompletion, DragSession, DragTracker};
pub use error::{Error, Result};
pub use event::{
    CharEvent, ClickTracker, Event, KeyCode, KeyEvent, MenuEvent, ModifierKey, MouseButton,
    MouseEvent, MouseEventKind, MouseEventSet, SystemEvent, SystemEventKind,
};
pub use geometry::DirtyRegion;
pub use grid::{box_chars, Grid};
pub use headless::HeadlessRenderer;
pub use menu::{Menu, MenuBar, MenuItem, MenuState, Shortcut};
pub use renderer::{CursorState, EventCallback, InitOptions, LifecycleState, Renderer};
pub use snapshot::{Snapshot, SnapshotCursor, SnapshotLine, SnapshotSpan};
