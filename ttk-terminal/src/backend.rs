//! Terminal implementation of the renderer contract
//!
//! Drawing goes into a shadow grid. `refresh` composes the rows changed since
//! the previous refresh into one buffer of crossterm commands and writes it
//! with a single flush, so a frame never tears halfway through.

use std::time::{Duration, Instant};

use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::event::Event as TermEvent;
use crossterm::queue;
use crossterm::style::{
    Attribute, Color, Print, ResetColor, SetAttribute, SetBackgroundColor, SetForegroundColor,
};
use ttk_core::callback::{self, CallbackHost};
use ttk_core::{
    Canvas, Cell, ColorPair, CursorState, DirtyRegion, Error, Event, EventCallback, InitOptions,
    LifecycleState, MouseEventSet, Renderer, Result, Rgb, SystemEvent, SystemEventKind,
    TextAttribute,
};

use crate::input;
use crate::ops::{CrosstermOps, TerminalGuard, TerminalOps};
use crate::palette::{ColorMode, Palette};

const BACKEND: &str = "terminal";

pub struct TerminalRenderer<O: TerminalOps = CrosstermOps> {
    guard: TerminalGuard<O>,
    state: LifecycleState,
    canvas: Canvas,
    palette: Palette,
    /// Background of cells drawn with the default pair
    background: Rgb,
    callback: Option<Box<dyn EventCallback>>,
    mouse_enabled: bool,
    suspended: bool,
    frame: Vec<u8>,
}

impl TerminalRenderer<CrosstermOps> {
    /// Renderer for the controlling terminal
    ///
    /// Window and font options have no meaning in a terminal and are ignored.
    pub fn new(options: &InitOptions) -> Self {
        log::debug!("terminal backend ignores title '{}' and font options", options.title);
        Self::with_ops(CrosstermOps, ColorMode::detect())
    }
}

impl<O: TerminalOps> TerminalRenderer<O> {
    pub fn with_ops(ops: O, color_mode: ColorMode) -> Self {
        Self {
            guard: TerminalGuard::new(ops),
            state: LifecycleState::Uninitialized,
            canvas: Canvas::default(),
            palette: Palette::new(color_mode),
            background: ColorPair::DEFAULT.bg,
            callback: None,
            mouse_enabled: false,
            suspended: false,
            frame: Vec::new(),
        }
    }

    pub fn ops(&self) -> &O {
        self.guard.ops()
    }

    pub fn color_mode(&self) -> ColorMode {
        self.palette.mode()
    }

    /// Use exact RGB (or the 256-color palette) instead of the eight basic colors
    pub fn set_fullcolor_mode(&mut self, enabled: bool) {
        if self.palette.set_fullcolor(enabled) {
            log::debug!("terminal color mode now {:?}", self.palette.mode());
            self.canvas.grid.mark_all_dirty();
        }
    }

    pub fn get_fullcolor_mode(&self) -> bool {
        self.palette.is_fullcolor()
    }

    /// Forget resolved colors, e.g. after a color scheme change
    pub fn clear_color_cache(&mut self) {
        self.palette.clear_cache();
        self.canvas.grid.mark_all_dirty();
    }

    /// Set the background used by default-pair cells, blank cells included
    pub fn update_background(&mut self, bg: (i32, i32, i32)) -> Result<()> {
        self.background = Rgb::validated(bg.0, bg.1, bg.2)?;
        self.canvas.grid.mark_all_dirty();
        Ok(())
    }

    /// Hand the terminal back to the shell, e.g. to run an external program
    pub fn suspend(&mut self) -> Result<()> {
        self.state.require_running()?;
        if self.suspended {
            return Ok(());
        }
        self.guard.leave()?;
        self.suspended = true;
        log::debug!("terminal suspended");
        Ok(())
    }

    /// Take the terminal back after `suspend` and repaint everything
    pub fn resume(&mut self) -> Result<()> {
        self.state.require_running()?;
        if !self.suspended {
            return Ok(());
        }
        self.guard.enter()?;
        self.suspended = false;
        if self.mouse_enabled {
            if let Err(err) = self.guard.ops_mut().set_mouse_capture(true) {
                log::warn!("could not re-enable mouse capture: {}", err);
                self.mouse_enabled = false;
            }
        }
        let (cols, rows) = self.guard.ops().size()?;
        self.canvas.resize(usize::from(rows).max(1), usize::from(cols).max(1));
        self.canvas.grid.mark_all_dirty();
        log::debug!("terminal resumed");
        self.refresh()
    }

    fn cell_colors(&mut self, cell: &Cell) -> (Color, Color) {
        let mut pair = self.canvas.colors.lookup(cell.color_pair);
        if cell.color_pair == 0 {
            pair.bg = self.background;
        }
        let (fg, bg) = if cell.attrs.contains(TextAttribute::REVERSE) {
            (pair.bg, pair.fg)
        } else {
            (pair.fg, pair.bg)
        };
        (self.palette.resolve(fg), self.palette.resolve(bg))
    }

    /// Compose the given rows and write them with one flush
    fn paint_rows(&mut self, rows: &[usize]) -> Result<()> {
        if self.suspended {
            return Ok(());
        }
        let mut frame = std::mem::take(&mut self.frame);
        frame.clear();
        queue!(frame, Hide)?;

        let cols = self.canvas.grid.cols();
        for &row in rows {
            queue!(frame, MoveTo(0, row as u16))?;
            let mut current: Option<(Color, Color, TextAttribute)> = None;
            for col in 0..cols {
                let Some(cell) = self.canvas.cell(row, col) else {
                    continue;
                };
                let (fg, bg) = self.cell_colors(&cell);
                let style = cell.attrs & (TextAttribute::BOLD | TextAttribute::UNDERLINE);
                if current != Some((fg, bg, style)) {
                    queue!(
                        frame,
                        SetAttribute(Attribute::Reset),
                        SetForegroundColor(fg),
                        SetBackgroundColor(bg)
                    )?;
                    if style.contains(TextAttribute::BOLD) {
                        queue!(frame, SetAttribute(Attribute::Bold))?;
                    }
                    if style.contains(TextAttribute::UNDERLINE) {
                        queue!(frame, SetAttribute(Attribute::Underlined))?;
                    }
                    current = Some((fg, bg, style));
                }
                queue!(frame, Print(cell.ch))?;
            }
        }
        queue!(frame, SetAttribute(Attribute::Reset), ResetColor)?;

        // A hidden cursor parks on the caret so input methods compose in place
        let cursor = self.canvas.cursor;
        if cursor.visible {
            queue!(frame, MoveTo(cursor.col as u16, cursor.row as u16), Show)?;
        } else {
            queue!(frame, MoveTo(cursor.caret_x as u16, cursor.caret_y as u16))?;
        }

        let written = self.guard.ops_mut().write_frame(&frame);
        self.frame = frame;
        written.map_err(Error::from)
    }

    fn translate(&mut self, raw: TermEvent) -> Option<Event> {
        let (rows, cols) = self.canvas.dimensions();
        match raw {
            TermEvent::Key(key) => input::key_event(&key).map(Event::Key),
            TermEvent::Mouse(mouse) => input::mouse_event(&mouse, rows, cols).map(Event::Mouse),
            TermEvent::Resize(new_cols, new_rows) => {
                self.canvas
                    .resize(usize::from(new_rows).max(1), usize::from(new_cols).max(1));
                Some(Event::resize())
            }
            TermEvent::FocusGained => Some(Event::System(SystemEvent::new(
                SystemEventKind::FocusGained,
            ))),
            TermEvent::FocusLost => Some(Event::System(SystemEvent::new(
                SystemEventKind::FocusLost,
            ))),
            TermEvent::Paste(text) => {
                log::debug!("ignoring bracketed paste of {} bytes", text.len());
                None
            }
        }
    }
}

impl<O: TerminalOps> std::fmt::Debug for TerminalRenderer<O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TerminalRenderer")
            .field("state", &self.state)
            .field("dimensions", &self.canvas.dimensions())
            .field("color_mode", &self.palette.mode())
            .field("suspended", &self.suspended)
            .finish()
    }
}

impl<O: TerminalOps> CallbackHost for TerminalRenderer<O> {
    fn callback_slot(&mut self) -> &mut Option<Box<dyn EventCallback>> {
        &mut self.callback
    }
}

impl<O: TerminalOps> Renderer for TerminalRenderer<O> {
    fn backend_name(&self) -> &'static str {
        BACKEND
    }

    fn initialize(&mut self) -> Result<()> {
        if !self.state.can_initialize() {
            return Err(Error::init(
                BACKEND,
                format!("cannot initialize from state {}", self.state),
            ));
        }
        self.state = LifecycleState::Initializing;

        if let Err(err) = self.guard.enter() {
            self.state = LifecycleState::Uninitialized;
            return Err(Error::init(
                BACKEND,
                format!("cannot enter raw mode ({}); is stdout a terminal?", err),
            ));
        }
        let (cols, rows) = match self.guard.ops().size() {
            Ok(size) => size,
            Err(err) => {
                let _ = self.guard.leave();
                self.state = LifecycleState::Uninitialized;
                return Err(Error::init(BACKEND, format!("cannot query terminal size: {}", err)));
            }
        };

        self.canvas = Canvas::new(usize::from(rows).max(1), usize::from(cols).max(1));
        self.palette.clear_cache();
        self.suspended = false;
        self.state = LifecycleState::Running;
        log::info!(
            "terminal backend initialized: {}x{} ({:?})",
            rows,
            cols,
            self.palette.mode()
        );
        self.refresh()
    }

    fn shutdown(&mut self) {
        if matches!(self.state, LifecycleState::Uninitialized | LifecycleState::Shutdown) {
            return;
        }
        self.state = LifecycleState::ShuttingDown;
        if let Err(err) = self.guard.leave() {
            log::warn!("terminal restore failed: {}", err);
        }
        self.canvas = Canvas::default();
        self.callback = None;
        self.mouse_enabled = false;
        self.suspended = false;
        self.state = LifecycleState::Shutdown;
        log::info!("terminal backend shut down");
    }

    fn state(&self) -> LifecycleState {
        self.state
    }

    fn get_dimensions(&self) -> (usize, usize) {
        self.canvas.dimensions()
    }

    fn clear(&mut self) -> Result<()> {
        self.state.require_running()?;
        self.canvas.grid.clear();
        Ok(())
    }

    fn clear_region(&mut self, row: i32, col: i32, height: i32, width: i32) -> Result<()> {
        self.state.require_running()?;
        self.canvas.grid.clear_region(row, col, height, width)
    }

    fn draw_text(
        &mut self,
        row: i32,
        col: i32,
        text: &str,
        color_pair: i32,
        attrs: TextAttribute,
    ) -> Result<()> {
        self.state.require_running()?;
        self.canvas.draw_text(row, col, text, color_pair, attrs)
    }

    fn draw_hline(&mut self, row: i32, col: i32, ch: char, length: i32, color_pair: i32) -> Result<()> {
        self.state.require_running()?;
        self.canvas.grid.hline(row, col, ch, length, color_pair)
    }

    fn draw_vline(&mut self, row: i32, col: i32, ch: char, length: i32, color_pair: i32) -> Result<()> {
        self.state.require_running()?;
        self.canvas.grid.vline(row, col, ch, length, color_pair)
    }

    fn draw_rect(
        &mut self,
        row: i32,
        col: i32,
        height: i32,
        width: i32,
        color_pair: i32,
        filled: bool,
    ) -> Result<()> {
        self.state.require_running()?;
        self.canvas.grid.rect(row, col, height, width, color_pair, filled)
    }

    fn refresh(&mut self) -> Result<()> {
        self.state.require_running()?;
        let rows = self.canvas.grid.take_dirty_rows();
        self.paint_rows(&rows)
    }

    fn refresh_region(&mut self, row: i32, col: i32, height: i32, width: i32) -> Result<()> {
        self.state.require_running()?;
        let (grid_rows, grid_cols) = self.canvas.dimensions();
        let region = DirtyRegion::from_cells(row, col, height, width, grid_rows, grid_cols);
        if region.is_empty() {
            return Ok(());
        }
        // Whole rows are repainted, so their pending changes are on screen
        let band = region.start_row..region.end_row;
        let rows: Vec<usize> = band.clone().collect();
        self.paint_rows(&rows)?;
        self.canvas.grid.take_dirty_rows_in(band);
        Ok(())
    }

    fn init_color_pair(&mut self, pair_id: i32, fg: (i32, i32, i32), bg: (i32, i32, i32)) -> Result<()> {
        ColorPair::validated(pair_id, fg, bg)?;
        self.state.require_running()?;
        self.canvas.register_pair(pair_id, fg, bg).map(|_| ())
    }

    fn set_cursor_visibility(&mut self, visible: bool) {
        self.canvas.cursor.visible = visible;
    }

    fn move_cursor(&mut self, row: i32, col: i32) {
        self.canvas.move_cursor(row, col);
    }

    fn set_caret_position(&mut self, x: i32, y: i32) {
        self.canvas.set_caret(x, y);
    }

    fn cursor(&self) -> CursorState {
        self.canvas.cursor
    }

    fn cell_at(&self, row: usize, col: usize) -> Option<Cell> {
        self.canvas.cell(row, col)
    }

    fn supports_mouse(&self) -> bool {
        true
    }

    fn get_supported_mouse_events(&self) -> MouseEventSet {
        input::supported_mouse_events()
    }

    fn enable_mouse_events(&mut self) -> bool {
        if self.mouse_enabled {
            return true;
        }
        if self.state != LifecycleState::Running {
            return false;
        }
        match self.guard.ops_mut().set_mouse_capture(true) {
            Ok(()) => {
                self.mouse_enabled = true;
                true
            }
            Err(err) => {
                log::warn!("mouse capture unavailable: {}", err);
                false
            }
        }
    }

    fn get_event(&mut self, timeout_ms: i32) -> Result<Option<Event>> {
        self.state.require_running()?;
        if self.suspended {
            return Ok(None);
        }
        let deadline = (timeout_ms >= 0)
            .then(|| Instant::now() + Duration::from_millis(timeout_ms as u64));
        loop {
            let remaining = deadline.map(|d| d.saturating_duration_since(Instant::now()));
            let Some(raw) = self.guard.ops_mut().read_event(remaining)? else {
                return Ok(None);
            };
            if let Some(event) = self.translate(raw) {
                return Ok(Some(event));
            }
        }
    }

    fn set_event_callback(&mut self, callback: Option<Box<dyn EventCallback>>) {
        self.callback = callback;
    }

    fn run_event_loop(&mut self) -> Result<()> {
        callback::run_loop(self)
    }

    fn run_event_loop_iteration(&mut self, timeout_ms: i32) -> Result<()> {
        callback::run_iteration(self, timeout_ms).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode as TermKey, KeyEvent as TermKeyEvent, KeyModifiers};
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::io;
    use std::rc::Rc;

    #[derive(Default)]
    struct Script {
        events: VecDeque<TermEvent>,
        frames: Vec<Vec<u8>>,
        restores: usize,
        mouse: bool,
    }

    #[derive(Clone, Default)]
    struct ScriptedOps(Rc<RefCell<Script>>);

    impl TerminalOps for ScriptedOps {
        fn setup(&mut self) -> io::Result<()> {
            Ok(())
        }

        fn restore(&mut self) -> io::Result<()> {
            self.0.borrow_mut().restores += 1;
            Ok(())
        }

        fn size(&self) -> io::Result<(u16, u16)> {
            Ok((80, 24))
        }

        fn read_event(&mut self, _timeout: Option<Duration>) -> io::Result<Option<TermEvent>> {
            Ok(self.0.borrow_mut().events.pop_front())
        }

        fn set_mouse_capture(&mut self, enabled: bool) -> io::Result<()> {
            self.0.borrow_mut().mouse = enabled;
            Ok(())
        }

        fn write_frame(&mut self, frame: &[u8]) -> io::Result<()> {
            self.0.borrow_mut().frames.push(frame.to_vec());
            Ok(())
        }
    }

    fn renderer() -> (TerminalRenderer<ScriptedOps>, Rc<RefCell<Script>>) {
        let ops = ScriptedOps::default();
        let script = ops.0.clone();
        let mut renderer = TerminalRenderer::with_ops(ops, ColorMode::TrueColor);
        renderer.initialize().unwrap();
        (renderer, script)
    }

    fn last_frame(script: &Rc<RefCell<Script>>) -> String {
        String::from_utf8_lossy(script.borrow().frames.last().unwrap()).into_owned()
    }

    #[test]
    fn test_initialize_paints_full_screen() {
        let (renderer, script) = renderer();
        assert_eq!(renderer.get_dimensions(), (24, 80));
        assert_eq!(script.borrow().frames.len(), 1);
    }

    #[test]
    fn test_refresh_writes_text_in_one_frame() {
        let (mut renderer, script) = renderer();
        renderer.init_color_pair(1, (255, 0, 0), (0, 0, 0)).unwrap();
        renderer.draw_text(0, 0, "Hello", 1, TextAttribute::BOLD).unwrap();
        renderer.refresh().unwrap();

        let frame = last_frame(&script);
        assert!(frame.contains("Hello"));
        assert!(frame.contains("\x1b[38;2;255;0;0m"));
        assert_eq!(renderer.cell_at(0, 4).unwrap().ch, 'o');
    }

    #[test]
    fn test_refresh_region_paints_requested_rows_only() {
        let (mut renderer, script) = renderer();
        renderer.draw_text(2, 0, "two", 0, TextAttribute::NORMAL).unwrap();
        renderer.draw_text(9, 0, "nine", 0, TextAttribute::NORMAL).unwrap();
        renderer.refresh_region(2, 0, 1, 80).unwrap();

        let frame = last_frame(&script);
        assert!(frame.contains("two"));
        assert!(!frame.contains("nine"));

        // Row 2 is already on screen; only row 9 is left for refresh
        renderer.refresh().unwrap();
        let frame = last_frame(&script);
        assert!(frame.contains("nine"));
        assert!(!frame.contains("two"));
    }

    #[test]
    fn test_color_pairs_require_running() {
        let mut fresh = TerminalRenderer::with_ops(ScriptedOps::default(), ColorMode::TrueColor);
        assert!(matches!(
            fresh.init_color_pair(1, (255, 0, 0), (0, 0, 0)),
            Err(Error::NotRunning(_))
        ));

        let (mut renderer, _script) = renderer();
        renderer.init_color_pair(1, (255, 0, 0), (0, 0, 0)).unwrap();
        renderer.shutdown();
        assert!(matches!(
            renderer.init_color_pair(1, (255, 0, 0), (0, 0, 0)),
            Err(Error::NotRunning(_))
        ));
    }

    #[test]
    fn test_key_and_resize_events() {
        let (mut renderer, script) = renderer();
        script.borrow_mut().events.extend([
            TermEvent::Key(TermKeyEvent::new(TermKey::CapsLock, KeyModifiers::NONE)),
            TermEvent::Key(TermKeyEvent::new(TermKey::Char('x'), KeyModifiers::NONE)),
            TermEvent::Resize(40, 10),
        ]);

        match renderer.get_event(0).unwrap() {
            Some(Event::Key(key)) => assert_eq!(key.char, Some('x')),
            other => panic!("unexpected event {:?}", other),
        }
        assert_eq!(renderer.get_event(0).unwrap(), Some(Event::resize()));
        assert_eq!(renderer.get_dimensions(), (10, 40));
        assert_eq!(renderer.get_event(0).unwrap(), None);
    }

    #[test]
    fn test_desktop_features_unsupported() {
        let (mut renderer, _script) = renderer();
        assert!(!renderer.supports_clipboard());
        assert_eq!(renderer.get_clipboard_text(), "");
        assert!(!renderer.set_clipboard_text("x"));
        assert!(!renderer.supports_drag_and_drop());
        assert!(!renderer.start_drag_session(&["file:///a".into()], "a"));
        assert!(!renderer.is_desktop_mode());
    }

    #[test]
    fn test_mouse_capture() {
        let (mut renderer, script) = renderer();
        assert!(renderer.supports_mouse());
        assert!(renderer.enable_mouse_events());
        assert!(script.borrow().mouse);
    }

    #[test]
    fn test_shutdown_twice_restores_once() {
        let (mut renderer, script) = renderer();
        renderer.shutdown();
        renderer.shutdown();
        assert_eq!(renderer.state(), LifecycleState::Shutdown);
        assert_eq!(renderer.get_dimensions(), (0, 0));
        assert_eq!(script.borrow().restores, 1);
    }

    #[test]
    fn test_suspend_and_resume() {
        let (mut renderer, script) = renderer();
        renderer.suspend().unwrap();
        assert_eq!(script.borrow().restores, 1);
        renderer.draw_text(0, 0, "later", 0, TextAttribute::NORMAL).unwrap();
        let frames = script.borrow().frames.len();
        renderer.refresh().unwrap();
        assert_eq!(script.borrow().frames.len(), frames);

        renderer.resume().unwrap();
        assert!(last_frame(&script).contains("later"));
    }

    #[test]
    fn test_update_background_validates() {
        let (mut renderer, _script) = renderer();
        assert!(renderer.update_background((0, 0, 64)).is_ok());
        assert!(matches!(
            renderer.update_background((0, 300, 0)),
            Err(Error::InvalidRgb { .. })
        ));
    }

    #[test]
    fn test_fullcolor_toggle() {
        let (mut renderer, _script) = renderer();
        assert!(renderer.get_fullcolor_mode());
        renderer.set_fullcolor_mode(false);
        assert!(!renderer.get_fullcolor_mode());
        assert_eq!(renderer.color_mode(), ColorMode::Basic);
    }
}
