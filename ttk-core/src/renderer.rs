//! The renderer contract every backend implements
//!
//! Application code is written once against [`Renderer`] and runs unchanged on
//! the terminal, CPU and GPU backends. Drawing calls only write into the
//! backend's character grid; `refresh` makes them visible.
//!
//! Events reach the client through exactly one of two protocols per session:
//! - poll mode: `get_event` / `get_input`
//! - callback mode: `set_event_callback` then `run_event_loop` or
//!   `run_event_loop_iteration`

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::cell::Cell;
use crate::color::TextAttribute;
use crate::drag::DragCompletion;
use crate::error::{Error, Result};
use crate::event::{CharEvent, Event, KeyEvent, MenuEvent, MouseEvent, MouseEventSet, SystemEvent};
use crate::menu::MenuBar;

/// Window lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LifecycleState {
    #[default]
    Uninitialized,
    Initializing,
    Running,
    ShuttingDown,
    Shutdown,
}

impl LifecycleState {
    pub fn name(self) -> &'static str {
        match self {
            LifecycleState::Uninitialized => "Uninitialized",
            LifecycleState::Initializing => "Initializing",
            LifecycleState::Running => "Running",
            LifecycleState::ShuttingDown => "ShuttingDown",
            LifecycleState::Shutdown => "Shutdown",
        }
    }

    /// Error unless the renderer accepts drawing and event calls
    pub fn require_running(self) -> Result<()> {
        if self == LifecycleState::Running {
            Ok(())
        } else {
            Err(Error::NotRunning(self.name()))
        }
    }

    /// `initialize` may be called from this state
    pub fn can_initialize(self) -> bool {
        matches!(self, LifecycleState::Uninitialized | LifecycleState::Shutdown)
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parameters accepted uniformly by every backend constructor
///
/// The terminal backend ignores the window and font fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitOptions {
    pub title: String,
    pub font_name: String,
    pub font_size: f32,
    /// Explicit grid rows; derived from the window size when absent
    pub rows: Option<usize>,
    /// Explicit grid columns; derived from the window size when absent
    pub cols: Option<usize>,
    /// Key under which the platform may persist window geometry
    pub frame_autosave_name: String,
}

impl Default for InitOptions {
    fn default() -> Self {
        Self {
            title: "TTK Application".to_string(),
            font_name: "Menlo".to_string(),
            font_size: 12.0,
            rows: None,
            cols: None,
            frame_autosave_name: "TTKApplication".to_string(),
        }
    }
}

/// Visible cursor and input-method caret
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CursorState {
    pub visible: bool,
    pub row: usize,
    pub col: usize,
    /// Caret column, separate from the visible cursor
    pub caret_x: usize,
    /// Caret row
    pub caret_y: usize,
}

/// Client side of callback mode
///
/// Every handler receives the renderer that delivered the event so it can
/// draw in response. Handlers return whether they consumed the event and
/// must not block, since they run on the event loop thread.
pub trait EventCallback {
    fn on_key_event(&mut self, event: &KeyEvent, renderer: &mut dyn Renderer) -> bool;

    fn on_char_event(&mut self, event: &CharEvent, renderer: &mut dyn Renderer) -> bool;

    fn on_system_event(&mut self, event: &SystemEvent, renderer: &mut dyn Renderer) -> bool;

    fn on_mouse_event(&mut self, _event: &MouseEvent, _renderer: &mut dyn Renderer) -> bool {
        false
    }

    fn on_menu_event(&mut self, _event: &MenuEvent, _renderer: &mut dyn Renderer) -> bool {
        false
    }

    /// Called right before a native menu is shown so enabled-state can be refreshed lazily
    fn on_menu_will_open(&mut self, _renderer: &mut dyn Renderer) {}

    /// `run_event_loop` returns once this is true
    fn should_close(&self) -> bool {
        false
    }
}

/// Abstract drawing, input and window contract
pub trait Renderer {
    /// Short backend identifier used in logs and errors
    fn backend_name(&self) -> &'static str;

    /// Acquire window, device and grid
    fn initialize(&mut self) -> Result<()>;

    /// Release everything; safe to call repeatedly and after a failed initialize
    fn shutdown(&mut self);

    fn state(&self) -> LifecycleState;

    /// (rows, cols); (0, 0) before initialization
    fn get_dimensions(&self) -> (usize, usize);

    fn clear(&mut self) -> Result<()>;

    fn clear_region(&mut self, row: i32, col: i32, height: i32, width: i32) -> Result<()>;

    fn draw_text(
        &mut self,
        row: i32,
        col: i32,
        text: &str,
        color_pair: i32,
        attrs: TextAttribute,
    ) -> Result<()>;

    fn draw_hline(&mut self, row: i32, col: i32, ch: char, length: i32, color_pair: i32)
        -> Result<()>;

    fn draw_vline(&mut self, row: i32, col: i32, ch: char, length: i32, color_pair: i32)
        -> Result<()>;

    fn draw_rect(
        &mut self,
        row: i32,
        col: i32,
        height: i32,
        width: i32,
        color_pair: i32,
        filled: bool,
    ) -> Result<()>;

    fn refresh(&mut self) -> Result<()>;

    /// Performance hint; a backend may repaint everything
    fn refresh_region(&mut self, row: i32, col: i32, height: i32, width: i32) -> Result<()>;

    /// Register or replace a color pair
    ///
    /// Bad ids and components are rejected in any state; a valid pair needs a
    /// running renderer.
    fn init_color_pair(&mut self, pair_id: i32, fg: (i32, i32, i32), bg: (i32, i32, i32))
        -> Result<()>;

    fn set_cursor_visibility(&mut self, visible: bool);

    /// Move the visible cursor, clamped to the grid
    fn move_cursor(&mut self, row: i32, col: i32);

    /// Remember the input-method caret; restored by every `refresh`
    fn set_caret_position(&mut self, x: i32, y: i32);

    fn cursor(&self) -> CursorState;

    /// Cell of the grid used for rendering
    fn cell_at(&self, row: usize, col: usize) -> Option<Cell>;

    fn supports_mouse(&self) -> bool;

    fn get_supported_mouse_events(&self) -> MouseEventSet;

    /// Turn on mouse reporting; returns whether it is active
    fn enable_mouse_events(&mut self) -> bool;

    fn supports_drag_and_drop(&self) -> bool {
        false
    }

    /// Start an outgoing drag; returns immediately, outcome arrives via the completion callback
    fn start_drag_session(&mut self, _file_urls: &[String], _label: &str) -> bool {
        false
    }

    fn set_drag_completion_callback(&mut self, _callback: Option<DragCompletion>) {}

    fn supports_clipboard(&self) -> bool {
        false
    }

    /// Plain-text clipboard contents; empty on any failure
    fn get_clipboard_text(&mut self) -> String {
        String::new()
    }

    /// Replace the clipboard contents; false on any failure
    fn set_clipboard_text(&mut self, _text: &str) -> bool {
        false
    }

    fn is_desktop_mode(&self) -> bool {
        false
    }

    fn set_menu_bar(&mut self, _menu: &MenuBar) -> Result<()> {
        Ok(())
    }

    fn update_menu_item_state(&mut self, _item_id: &str, _enabled: bool) {}

    /// Next event; `-1` blocks, `0` never blocks, `n` waits at most n milliseconds
    fn get_event(&mut self, timeout_ms: i32) -> Result<Option<Event>>;

    /// Alias of `get_event`
    fn get_input(&mut self, timeout_ms: i32) -> Result<Option<Event>> {
        self.get_event(timeout_ms)
    }

    /// Arm callback mode; `None` disarms it
    fn set_event_callback(&mut self, callback: Option<Box<dyn EventCallback>>);

    /// Deliver events until the callback asks to close or a close event arrives
    fn run_event_loop(&mut self) -> Result<()>;

    /// Wait up to `timeout_ms` for events, deliver what arrived and return
    fn run_event_loop_iteration(&mut self, timeout_ms: i32) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_guards() {
        assert!(LifecycleState::Running.require_running().is_ok());
        assert!(matches!(
            LifecycleState::Uninitialized.require_running(),
            Err(Error::NotRunning("Uninitialized"))
        ));
        assert!(LifecycleState::Shutdown.can_initialize());
        assert!(!LifecycleState::Running.can_initialize());
    }

    #[test]
    fn test_init_options_defaults() {
        let opts = InitOptions::default();
        assert_eq!(opts.frame_autosave_name, "TTKApplication");
        assert_eq!(opts.rows, None);
        assert!(opts.font_size > 0.0);
    }
}
