//! Headless renderer
//!
//! A complete [`Renderer`] without any display. Input comes from a scripted
//! event queue and output is inspected through [`Snapshot`]s, which makes it
//! the backend of choice for deterministic tests of application code.

use std::collections::VecDeque;

use crate::callback::{self, CallbackHost};
use crate::canvas::Canvas;
use crate::cell::Cell;
use crate::color::{ColorPair, TextAttribute};
use crate::drag::{DragCompletion, DragTracker};
use crate::error::{Error, Result};
use crate::event::{Event, MouseEventSet};
use crate::geometry::DirtyRegion;
use crate::menu::{MenuBar, MenuState};
use crate::renderer::{CursorState, EventCallback, InitOptions, LifecycleState, Renderer};
use crate::snapshot::Snapshot;

const DEFAULT_ROWS: usize = 24;
const DEFAULT_COLS: usize = 80;

pub struct HeadlessRenderer {
    options: InitOptions,
    state: LifecycleState,
    canvas: Canvas,
    events: VecDeque<Event>,
    callback: Option<Box<dyn EventCallback>>,
    clipboard: String,
    menu: Option<MenuState>,
    drag: DragTracker,
    refreshes: usize,
    last_presented: Option<DirtyRegion>,
    mouse_enabled: bool,
}

impl HeadlessRenderer {
    pub fn new(options: InitOptions) -> Self {
        Self {
            options,
            state: LifecycleState::Uninitialized,
            canvas: Canvas::default(),
            events: VecDeque::new(),
            callback: None,
            clipboard: String::new(),
            menu: None,
            drag: DragTracker::new(),
            refreshes: 0,
            last_presented: None,
            mouse_enabled: false,
        }
    }

    /// Shortcut for a grid of the given size
    pub fn with_size(rows: usize, cols: usize) -> Self {
        Self::new(InitOptions {
            rows: Some(rows),
            cols: Some(cols),
            ..InitOptions::default()
        })
    }

    /// Queue an event for `get_event` and the event loop
    pub fn push_event(&mut self, event: Event) {
        self.events.push_back(event);
    }

    pub fn pending_events(&self) -> usize {
        self.events.len()
    }

    /// Resize the grid as a window resize would, queueing a resize event
    pub fn simulate_resize(&mut self, rows: usize, cols: usize) {
        if self.canvas.resize(rows.max(1), cols.max(1)) {
            self.events.push_back(Event::resize());
        }
    }

    /// Finish the pending drag session as a drop or a cancellation
    pub fn simulate_drag_end(&mut self, completed: bool) {
        self.drag.finish(completed);
    }

    /// Snapshot of the canvas at the last `refresh`
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::from_canvas(&self.canvas)
    }

    pub fn refresh_count(&self) -> usize {
        self.refreshes
    }

    /// Region covered by the most recent `refresh` or `refresh_region`
    pub fn last_presented(&self) -> Option<DirtyRegion> {
        self.last_presented
    }

    /// Rows drawn to since they were last presented
    pub fn unpresented_rows(&self) -> Vec<usize> {
        self.canvas.grid.dirty_rows()
    }

    fn present(&mut self, region: DirtyRegion) {
        self.canvas
            .grid
            .take_dirty_rows_in(region.start_row..region.end_row);
        self.last_presented = Some(region);
        self.refreshes += 1;
    }

    pub fn menu_state(&self) -> Option<&MenuState> {
        self.menu.as_ref()
    }

    pub fn mouse_enabled(&self) -> bool {
        self.mouse_enabled
    }
}

impl Default for HeadlessRenderer {
    fn default() -> Self {
        Self::new(InitOptions::default())
    }
}

impl std::fmt::Debug for HeadlessRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeadlessRenderer")
            .field("state", &self.state)
            .field("dimensions", &self.canvas.dimensions())
            .field("pending_events", &self.events.len())
            .finish()
    }
}

impl CallbackHost for HeadlessRenderer {
    fn callback_slot(&mut self) -> &mut Option<Box<dyn EventCallback>> {
        &mut self.callback
    }
}

impl Renderer for HeadlessRenderer {
    fn backend_name(&self) -> &'static str {
        "headless"
    }

    fn initialize(&mut self) -> Result<()> {
        if !self.state.can_initialize() {
            return Err(Error::init(
                "headless",
                format!("cannot initialize from state {}", self.state),
            ));
        }
        self.state = LifecycleState::Initializing;
        let rows = self.options.rows.unwrap_or(DEFAULT_ROWS).max(1);
        let cols = self.options.cols.unwrap_or(DEFAULT_COLS).max(1);
        self.canvas = Canvas::new(rows, cols);
        self.state = LifecycleState::Running;
        log::info!("headless renderer initialized: {}x{}", rows, cols);
        Ok(())
    }

    fn shutdown(&mut self) {
        if matches!(self.state, LifecycleState::Shutdown | LifecycleState::Uninitialized) {
            return;
        }
        self.state = LifecycleState::ShuttingDown;
        self.drag.cancel();
        self.events.clear();
        self.canvas = Canvas::default();
        self.callback = None;
        self.menu = None;
        self.mouse_enabled = false;
        self.last_presented = None;
        self.state = LifecycleState::Shutdown;
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
        let (rows, cols) = self.canvas.dimensions();
        self.present(DirtyRegion::full(rows, cols));
        Ok(())
    }

    fn refresh_region(&mut self, row: i32, col: i32, height: i32, width: i32) -> Result<()> {
        self.state.require_running()?;
        let (rows, cols) = self.canvas.dimensions();
        let region = DirtyRegion::from_cells(row, col, height, width, rows, cols);
        if !region.is_empty() {
            self.present(region);
        }
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
        MouseEventSet::all()
    }

    fn enable_mouse_events(&mut self) -> bool {
        self.mouse_enabled = true;
        true
    }

    fn supports_drag_and_drop(&self) -> bool {
        true
    }

    fn start_drag_session(&mut self, file_urls: &[String], label: &str) -> bool {
        self.state == LifecycleState::Running && self.drag.start(file_urls, label)
    }

    fn set_drag_completion_callback(&mut self, callback: Option<DragCompletion>) {
        self.drag.set_callback(callback);
    }

    fn supports_clipboard(&self) -> bool {
        true
    }

    fn get_clipboard_text(&mut self) -> String {
        self.clipboard.clone()
    }

    fn set_clipboard_text(&mut self, text: &str) -> bool {
        self.clipboard = text.to_string();
        true
    }

    fn set_menu_bar(&mut self, menu: &MenuBar) -> Result<()> {
        self.menu = Some(MenuState::new(menu));
        Ok(())
    }

    fn update_menu_item_state(&mut self, item_id: &str, enabled: bool) {
        match self.menu.as_mut() {
            Some(menu) => {
                menu.set_enabled(item_id, enabled);
            }
            None => log::warn!("update_menu_item_state: no menu bar installed"),
        }
    }

    /// Scripted input never blocks; a blocking read on an exhausted script
    /// yields a close event so event loops terminate.
    fn get_event(&mut self, timeout_ms: i32) -> Result<Option<Event>> {
        self.state.require_running()?;
        match self.events.pop_front() {
            Some(event) => Ok(Some(event)),
            None if timeout_ms < 0 => Ok(Some(Event::close())),
            None => Ok(None),
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
