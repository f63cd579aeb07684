//! Window-backed implementation of the renderer contract
//!
//! `NativeRenderer` owns everything both native backends share: the window
//! and its event loop, the canvas, input translation, clipboard, drag
//! sessions and the menu bar. Pixels are produced by a [`Painter`].
//!
//! Events are collected by pumping the winit event loop from `get_event`, so
//! poll mode and callback mode run on the caller's thread.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use ttk_core::callback::{self, CallbackHost};
use ttk_core::geometry::{clamp_to_grid, screen_to_grid};
use ttk_core::{
    Canvas, Cell, CharEvent, ClickTracker, ColorPair, CursorState, DirtyRegion, DragCompletion,
    DragTracker, Error, Event, EventCallback, InitOptions, KeyCode, KeyEvent, LifecycleState,
    MenuBar, ModifierKey, MouseButton, MouseEvent, MouseEventKind, MouseEventSet, Renderer,
    Result, SystemEvent, SystemEventKind, TextAttribute,
};
use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event::{ElementState, Ime, MouseButton as WinitButton, MouseScrollDelta, WindowEvent};
use winit::window::{CursorIcon, Window};

use crate::clipboard::SystemClipboard;
use crate::font::{CellMetrics, FontFace, FALLBACK_CELL};
use crate::host::{self, WindowHost};
use crate::keymap;
use crate::menu::NativeMenu;
use crate::painter::Painter;

/// Window size used when no grid size was requested, in logical pixels
pub const DEFAULT_WINDOW_SIZE: (u32, u32) = (1024, 768);

/// Smallest grid the window can be shrunk to
const MIN_GRID: (usize, usize) = (4, 10);

/// Grid cell under a pixel position, with the position inside the cell
pub fn locate(
    position: PhysicalPosition<f64>,
    metrics: CellMetrics,
    rows: usize,
    cols: usize,
) -> (usize, usize, f32, f32) {
    let pos = screen_to_grid(position.x, position.y, metrics.width, metrics.height);
    let (col, row) = clamp_to_grid(pos.col, pos.row, cols, rows);
    (row, col, pos.sub_x, pos.sub_y)
}

fn button(button: WinitButton) -> MouseButton {
    match button {
        WinitButton::Left => MouseButton::Left,
        WinitButton::Middle => MouseButton::Middle,
        WinitButton::Right => MouseButton::Right,
        _ => MouseButton::None,
    }
}

#[derive(Debug, Default)]
struct Pointer {
    position: Option<PhysicalPosition<f64>>,
    inside: bool,
    pressed: Option<MouseButton>,
    last_cell: Option<(usize, usize)>,
    clicks: ClickTracker,
}

pub struct NativeRenderer<P: Painter> {
    options: InitOptions,
    state: LifecycleState,
    host: Option<WindowHost>,
    window: Option<Arc<Window>>,
    painter: Option<P>,
    metrics: CellMetrics,
    canvas: Canvas,
    /// Grid size chosen at initialize, restored by `reset_window_geometry`
    initial_grid: (usize, usize),
    surface_size: PhysicalSize<u32>,
    painted_cursor: CursorState,
    events: VecDeque<Event>,
    modifiers: ModifierKey,
    pointer: Pointer,
    mouse_enabled: bool,
    composing: bool,
    menu_will_open: bool,
    exit_reported: bool,
    clipboard: SystemClipboard,
    drag: DragTracker,
    menu: NativeMenu,
    callback: Option<Box<dyn EventCallback>>,
}

impl<P: Painter> NativeRenderer<P> {
    pub fn new(options: &InitOptions) -> Self {
        Self {
            options: options.clone(),
            state: LifecycleState::Uninitialized,
            host: None,
            window: None,
            painter: None,
            metrics: FALLBACK_CELL,
            canvas: Canvas::default(),
            initial_grid: (0, 0),
            surface_size: PhysicalSize::new(0, 0),
            painted_cursor: CursorState::default(),
            events: VecDeque::new(),
            modifiers: ModifierKey::NONE,
            pointer: Pointer::default(),
            mouse_enabled: false,
            composing: false,
            menu_will_open: false,
            exit_reported: false,
            clipboard: SystemClipboard::new(),
            drag: DragTracker::new(),
            menu: NativeMenu::new(),
            callback: None,
        }
    }

    pub fn options(&self) -> &InitOptions {
        &self.options
    }

    /// Cell size in physical pixels
    pub fn cell_metrics(&self) -> CellMetrics {
        self.metrics
    }

    pub fn mouse_enabled(&self) -> bool {
        self.mouse_enabled
    }

    /// Resize the window back to the grid it was created with
    pub fn reset_window_geometry(&mut self) -> Result<()> {
        self.state.require_running()?;
        let (rows, cols) = self.initial_grid;
        let (width, height) = self.metrics.surface_for(rows, cols);
        if let Some(window) = &self.window {
            log::debug!("resetting window to {}x{} ({}x{} cells)", width, height, rows, cols);
            // Applied immediately on some platforms, later via Resized on others
            if window.request_inner_size(PhysicalSize::new(width, height)).is_some() {
                self.check_resize();
            }
        }
        Ok(())
    }

    fn try_initialize(&mut self) -> Result<()> {
        let backend = P::BACKEND;
        let host = match self.host.take() {
            Some(host) => host,
            None => host::acquire(backend)?,
        };
        // Held by the renderer from here on; release() parks it on failure
        let host = self.host.insert(host);
        let scale = host.scale_factor();
        let font = FontFace::load(&self.options.font_name, self.options.font_size * scale as f32)?;
        let metrics = font.metrics();

        let default_size = (
            (f64::from(DEFAULT_WINDOW_SIZE.0) * scale).round() as u32,
            (f64::from(DEFAULT_WINDOW_SIZE.1) * scale).round() as u32,
        );
        let (default_rows, default_cols) = metrics.grid_for(default_size.0, default_size.1);
        let rows = self.options.rows.unwrap_or(default_rows).max(1);
        let cols = self.options.cols.unwrap_or(default_cols).max(1);
        let (width, height) = if self.options.rows.is_none() && self.options.cols.is_none() {
            default_size
        } else {
            metrics.surface_for(rows, cols)
        };
        let (min_width, min_height) = metrics.surface_for(MIN_GRID.0, MIN_GRID.1);
        log::debug!(
            "window autosave name '{}' not persisted on this platform",
            self.options.frame_autosave_name
        );

        let window = host.open(
            backend,
            &self.options.title,
            PhysicalSize::new(width, height),
            PhysicalSize::new(min_width, min_height),
        )?;

        let painter = P::new(window.clone(), font)?;
        window.set_ime_allowed(true);
        self.menu.attach(&window);

        self.metrics = metrics;
        self.canvas = Canvas::new(rows, cols);
        self.initial_grid = (rows, cols);
        self.surface_size = PhysicalSize::new(width, height);
        self.painted_cursor = self.canvas.cursor;
        self.painter = Some(painter);
        self.window = Some(window);
        log::info!(
            "{} backend initialized: {}x{} cells of {}x{}px",
            backend,
            rows,
            cols,
            metrics.width,
            metrics.height
        );
        Ok(())
    }

    /// Drop window resources and park the event loop for the next renderer
    fn release(&mut self) {
        if self.drag.cancel().is_some() {
            log::debug!("pending drag session cancelled by shutdown");
        }
        self.painter = None;
        self.menu.detach();
        self.window = None;
        if let Some(host) = self.host.take() {
            host::park(host);
        }
        self.clipboard.release();
        self.canvas = Canvas::default();
        self.metrics = FALLBACK_CELL;
        self.initial_grid = (0, 0);
        self.surface_size = PhysicalSize::new(0, 0);
        self.painted_cursor = CursorState::default();
        self.events.clear();
        self.modifiers = ModifierKey::NONE;
        self.pointer = Pointer::default();
        self.mouse_enabled = false;
        self.composing = false;
        self.menu_will_open = false;
        self.exit_reported = false;
        self.callback = None;
    }

    fn paint(&mut self, region: DirtyRegion) -> Result<()> {
        let Some(painter) = self.painter.as_mut() else {
            return Ok(());
        };
        painter.paint(&self.canvas, region)?;
        self.painted_cursor = self.canvas.cursor;
        self.place_ime_caret();
        Ok(())
    }

    fn place_ime_caret(&self) {
        let Some(window) = &self.window else {
            return;
        };
        let cursor = self.canvas.cursor;
        let x = (cursor.caret_x as f32 * self.metrics.width) as i32;
        let y = (cursor.caret_y as f32 * self.metrics.height) as i32;
        window.set_ime_cursor_area(
            PhysicalPosition::new(x, y),
            PhysicalSize::new(self.metrics.width as u32, self.metrics.height as u32),
        );
    }

    /// Pump the event loop once and translate what arrived
    fn pump(&mut self, timeout: Option<Duration>) {
        let Some(host) = self.host.as_mut() else {
            return;
        };
        host.pump(timeout);
        let raw = host.drain();
        let exited = host.exited();

        for event in raw {
            self.translate(event);
        }
        self.check_resize();
        for event in self.menu.poll() {
            self.events.push_back(Event::Menu(event));
        }
        if exited && !self.exit_reported {
            self.exit_reported = true;
            self.events.push_back(Event::close());
        }
        if std::mem::take(&mut self.menu_will_open) {
            callback::notify_menu_will_open(self);
        }
    }

    /// Reallocate the grid when the window no longer matches it
    fn check_resize(&mut self) {
        let Some(window) = &self.window else {
            return;
        };
        let size = window.inner_size();
        if size == self.surface_size || size.width == 0 || size.height == 0 {
            return;
        }
        self.surface_size = size;
        if let Some(painter) = self.painter.as_mut() {
            painter.resize(size.width, size.height);
        }

        let (rows, cols) = self.metrics.grid_for(size.width, size.height);
        if self.canvas.resize(rows, cols) {
            if let Some(painter) = self.painter.as_mut() {
                painter.clear_caches();
            }
            self.events.push_back(Event::resize());
        }
        self.canvas.grid.mark_all_dirty();
        window.request_redraw();
    }

    fn translate(&mut self, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                self.events.push_back(Event::close());
            }
            WindowEvent::Focused(focused) => {
                let kind = if focused {
                    self.menu_will_open = true;
                    SystemEventKind::FocusGained
                } else {
                    SystemEventKind::FocusLost
                };
                self.events.push_back(Event::System(SystemEvent::new(kind)));
            }
            WindowEvent::Resized(_) => self.check_resize(),
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                log::debug!("scale factor now {}; font size kept", scale_factor);
            }
            WindowEvent::RedrawRequested => {
                let (rows, cols) = self.canvas.dimensions();
                if let Err(e) = self.paint(DirtyRegion::full(rows, cols)) {
                    log::warn!("repaint failed: {}", e);
                }
            }
            WindowEvent::ModifiersChanged(mods) => {
                self.modifiers = keymap::modifiers(mods.state());
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state == ElementState::Pressed {
                    if let Some(key) = keymap::key_event(&event.logical_key, event.physical_key, self.modifiers)
                    {
                        self.key_pressed(key);
                    }
                }
            }
            WindowEvent::Ime(ime) => self.ime(ime),
            WindowEvent::CursorEntered { .. } => {
                self.pointer.inside = true;
                self.menu_will_open = true;
            }
            WindowEvent::CursorLeft { .. } => {
                self.pointer.inside = false;
            }
            WindowEvent::CursorMoved { position, .. } => self.pointer_moved(position),
            WindowEvent::MouseInput { state, button: b, .. } => {
                self.pointer_button(state, button(b), Instant::now());
            }
            WindowEvent::MouseWheel { delta, .. } => self.wheel(delta),
            _ => {}
        }
    }

    fn key_pressed(&mut self, key: KeyEvent) {
        if key.key_code == KeyCode::ESCAPE && self.drag.is_active() {
            self.finish_drag(false);
            return;
        }
        self.events.push_back(Event::Key(key));
    }

    fn ime(&mut self, ime: Ime) {
        match ime {
            Ime::Preedit(text, _) => self.composing = !text.is_empty(),
            Ime::Commit(text) => {
                // Plain typing already arrived as key events
                if std::mem::take(&mut self.composing) || text.chars().count() > 1 {
                    for ch in text.chars() {
                        self.events.push_back(Event::Char(CharEvent {
                            ch,
                            modifiers: ModifierKey::NONE,
                        }));
                    }
                }
            }
            Ime::Enabled | Ime::Disabled => self.composing = false,
        }
    }

    fn pointer_cell(&self) -> Option<(usize, usize, f32, f32)> {
        let position = self.pointer.position?;
        let (rows, cols) = self.canvas.dimensions();
        if rows == 0 || cols == 0 {
            return None;
        }
        Some(locate(position, self.metrics, rows, cols))
    }

    fn pointer_outside(&self) -> bool {
        match self.pointer.position {
            Some(p) => {
                !self.pointer.inside
                    || p.x < 0.0
                    || p.y < 0.0
                    || p.x >= f64::from(self.surface_size.width)
                    || p.y >= f64::from(self.surface_size.height)
            }
            None => true,
        }
    }

    fn push_mouse(&mut self, kind: MouseEventKind, button: MouseButton, cell: (usize, usize, f32, f32)) -> MouseEvent {
        let (row, col, sub_x, sub_y) = cell;
        let mut event = MouseEvent::new(kind, button, row, col).with_modifiers(self.modifiers);
        event.sub_cell_x = sub_x;
        event.sub_cell_y = sub_y;
        self.events.push_back(Event::Mouse(event));
        event
    }

    fn pointer_moved(&mut self, position: PhysicalPosition<f64>) {
        self.pointer.position = Some(position);
        if !self.mouse_enabled {
            return;
        }
        let Some(cell) = self.pointer_cell() else {
            return;
        };
        if self.pointer.last_cell == Some((cell.0, cell.1)) {
            return;
        }
        self.pointer.last_cell = Some((cell.0, cell.1));
        match self.pointer.pressed {
            Some(b) => self.push_mouse(MouseEventKind::Drag, b, cell),
            None => self.push_mouse(MouseEventKind::Move, MouseButton::None, cell),
        };
    }

    fn pointer_button(&mut self, state: ElementState, button: MouseButton, at: Instant) {
        match state {
            ElementState::Pressed => self.pointer.pressed = Some(button),
            ElementState::Released => {
                self.pointer.pressed = None;
                if self.drag.is_active() {
                    let dropped = self.pointer_outside();
                    self.finish_drag(dropped);
                }
            }
        }
        if !self.mouse_enabled {
            return;
        }
        let Some(cell) = self.pointer_cell() else {
            return;
        };
        let kind = match state {
            ElementState::Pressed => self.pointer.clicks.press(at, button, cell.0, cell.1),
            ElementState::Released => MouseEventKind::ButtonUp,
        };
        self.push_mouse(kind, button, cell);
    }

    fn wheel(&mut self, delta: MouseScrollDelta) {
        if !self.mouse_enabled {
            return;
        }
        let (dx, dy) = match delta {
            MouseScrollDelta::LineDelta(x, y) => (x, y),
            MouseScrollDelta::PixelDelta(p) => (
                (p.x / f64::from(self.metrics.width)) as f32,
                (p.y / f64::from(self.metrics.height)) as f32,
            ),
        };
        if dx == 0.0 && dy == 0.0 {
            return;
        }
        let Some(cell) = self.pointer_cell() else {
            return;
        };
        let (row, col, sub_x, sub_y) = cell;
        let mut event = MouseEvent::new(MouseEventKind::Wheel, MouseButton::None, row, col)
            .with_modifiers(self.modifiers)
            .with_scroll(dx, dy);
        event.sub_cell_x = sub_x;
        event.sub_cell_y = sub_y;
        self.events.push_back(Event::Mouse(event));
    }

    /// Complete the pending drag
    ///
    /// Dropping outside the window hands the files over through the
    /// clipboard as newline separated URLs before the callback fires.
    fn finish_drag(&mut self, dropped: bool) {
        if dropped {
            if let Some(session) = self.drag.pending() {
                let urls = session.file_urls.join("\n");
                if !self.clipboard.set_text(&urls) {
                    log::warn!("drop target unreachable: could not place files on the clipboard");
                }
            }
        }
        self.drag.finish(dropped);
        if let Some(window) = &self.window {
            window.set_cursor_icon(CursorIcon::Default);
        }
    }
}

impl<P: Painter> std::fmt::Debug for NativeRenderer<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeRenderer")
            .field("backend", &P::BACKEND)
            .field("state", &self.state)
            .field("dimensions", &self.canvas.dimensions())
            .field("metrics", &self.metrics)
            .field("queued", &self.events.len())
            .field("drag", &self.drag)
            .finish()
    }
}

impl<P: Painter> CallbackHost for NativeRenderer<P> {
    fn callback_slot(&mut self) -> &mut Option<Box<dyn EventCallback>> {
        &mut self.callback
    }
}

impl<P: Painter> Renderer for NativeRenderer<P> {
    fn backend_name(&self) -> &'static str {
        P::BACKEND
    }

    fn initialize(&mut self) -> Result<()> {
        if !self.state.can_initialize() {
            return Err(Error::init(
                P::BACKEND,
                format!("cannot initialize from state {}", self.state),
            ));
        }
        self.state = LifecycleState::Initializing;
        if let Err(e) = self.try_initialize() {
            self.release();
            self.state = LifecycleState::Uninitialized;
            return Err(e);
        }
        self.state = LifecycleState::Running;
        let (rows, cols) = self.canvas.dimensions();
        self.canvas.grid.take_dirty_rows();
        self.paint(DirtyRegion::full(rows, cols))
    }

    fn shutdown(&mut self) {
        if self.state == LifecycleState::Shutdown
            || (self.state == LifecycleState::Uninitialized && self.window.is_none())
        {
            return;
        }
        self.state = LifecycleState::ShuttingDown;
        self.release();
        self.state = LifecycleState::Shutdown;
        log::info!("{} backend shut down", P::BACKEND);
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
        let mut rows = self.canvas.grid.take_dirty_rows();
        // Old and new cursor cells repaint even when nothing was drawn
        let (old, new) = (self.painted_cursor, self.canvas.cursor);
        if old != new {
            rows.extend([old.row, new.row]);
        }
        let (grid_rows, cols) = self.canvas.dimensions();
        rows.retain(|&r| r < grid_rows);
        match DirtyRegion::from_rows(&rows, cols) {
            Some(region) => self.paint(region),
            None => {
                self.place_ime_caret();
                Ok(())
            }
        }
    }

    fn refresh_region(&mut self, row: i32, col: i32, height: i32, width: i32) -> Result<()> {
        self.state.require_running()?;
        let (rows, cols) = self.canvas.dimensions();
        let region = DirtyRegion::from_cells(row, col, height, width, rows, cols);
        if region.is_empty() {
            return Ok(());
        }
        self.paint(region)
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
        MouseEventSet::all()
    }

    fn enable_mouse_events(&mut self) -> bool {
        if self.state != LifecycleState::Running {
            return false;
        }
        self.mouse_enabled = true;
        true
    }

    fn supports_drag_and_drop(&self) -> bool {
        true
    }

    fn start_drag_session(&mut self, file_urls: &[String], label: &str) -> bool {
        if self.state != LifecycleState::Running || !self.drag.start(file_urls, label) {
            return false;
        }
        if let Some(window) = &self.window {
            window.set_cursor_icon(CursorIcon::Grabbing);
        }
        log::debug!("drag session '{}' started with {} files", label, file_urls.len());
        true
    }

    fn set_drag_completion_callback(&mut self, callback: Option<DragCompletion>) {
        self.drag.set_callback(callback);
    }

    fn supports_clipboard(&self) -> bool {
        true
    }

    fn get_clipboard_text(&mut self) -> String {
        self.clipboard.get_text()
    }

    fn set_clipboard_text(&mut self, text: &str) -> bool {
        self.clipboard.set_text(text)
    }

    fn is_desktop_mode(&self) -> bool {
        true
    }

    fn set_menu_bar(&mut self, menu: &MenuBar) -> Result<()> {
        self.menu.install(menu, self.window.as_deref());
        Ok(())
    }

    fn update_menu_item_state(&mut self, item_id: &str, enabled: bool) {
        if !self.menu.set_enabled(item_id, enabled) {
            log::debug!("no menu item '{}'", item_id);
        }
    }

    fn get_event(&mut self, timeout_ms: i32) -> Result<Option<Event>> {
        self.state.require_running()?;
        let deadline = (timeout_ms >= 0)
            .then(|| Instant::now() + Duration::from_millis(timeout_ms as u64));
        let mut pumped = false;
        loop {
            if let Some(event) = self.events.pop_front() {
                return Ok(Some(event));
            }
            if self.state != LifecycleState::Running {
                return Ok(None);
            }
            let remaining = deadline.map(|d| d.saturating_duration_since(Instant::now()));
            if pumped && remaining == Some(Duration::ZERO) {
                return Ok(None);
            }
            if self.host.as_ref().map_or(true, WindowHost::exited) && self.exit_reported {
                return Ok(None);
            }
            self.pump(remaining);
            pumped = true;
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

impl<P: Painter> Drop for NativeRenderer<P> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
