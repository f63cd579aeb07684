//! winit event loop and window ownership
//!
//! winit builds at most one event loop per process, even after the first one
//! is dropped. The host is therefore created once and parked in a
//! thread-local slot between renderers: every native renderer borrows it with
//! [`acquire`] and hands it back with [`park`] on shutdown, so fallback from
//! one native backend to another and re-initialization both work.
//!
//! Events are pumped on demand instead of handing control to `run`, which is
//! what lets poll mode and callback mode share one code path.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use ttk_core::{Error, Result};
use winit::dpi::PhysicalSize;
use winit::event::{Event as WinitEvent, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop, EventLoopBuilder};
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::window::{Window, WindowBuilder};

pub struct WindowHost {
    event_loop: EventLoop<()>,
    window: Option<Arc<Window>>,
    pending: VecDeque<WindowEvent>,
    exited: bool,
}

impl std::fmt::Debug for WindowHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowHost")
            .field("window", &self.window.as_ref().map(|w| w.id()))
            .field("pending", &self.pending.len())
            .field("exited", &self.exited)
            .finish()
    }
}

/// Set once the process has attempted to build its event loop
static LOOP_BUILT: AtomicBool = AtomicBool::new(false);

/// Why the only build attempt failed, replayed to every later caller
static BUILD_FAILURE: OnceLock<String> = OnceLock::new();

thread_local! {
    static PARKED: RefCell<Option<WindowHost>> = const { RefCell::new(None) };
}

/// Borrow the process event loop, building it on first use
///
/// Fails while another renderer holds the host, when it lives on a different
/// thread, or when the one build attempt failed (typically no display).
pub fn acquire(backend: &'static str) -> Result<WindowHost> {
    if let Some(host) = PARKED.with(|slot| slot.borrow_mut().take()) {
        log::trace!("reusing parked event loop");
        return Ok(host);
    }
    if LOOP_BUILT.swap(true, Ordering::SeqCst) {
        let reason = match BUILD_FAILURE.get() {
            Some(failure) => failure.clone(),
            None => "event loop is held by another native renderer or thread".to_string(),
        };
        return Err(Error::init(backend, reason));
    }
    WindowHost::build().map_err(|reason| {
        let _ = BUILD_FAILURE.set(reason.clone());
        Error::init(backend, reason)
    })
}

/// Close the host's window and return it to this thread's slot
pub fn park(mut host: WindowHost) {
    host.close();
    // Fails only while the thread is exiting, when nobody can reuse it anyway
    if PARKED.try_with(|slot| *slot.borrow_mut() = Some(host)).is_err() {
        log::debug!("thread exiting, event loop dropped");
    }
}

impl WindowHost {
    fn build() -> std::result::Result<Self, String> {
        let mut builder = EventLoopBuilder::new();
        allow_any_thread(&mut builder);
        let event_loop = builder
            .build()
            .map_err(|e| format!("cannot create event loop ({}); is a display available?", e))?;
        event_loop.set_control_flow(ControlFlow::Wait);
        log::debug!("event loop created");
        Ok(Self {
            event_loop,
            window: None,
            pending: VecDeque::new(),
            exited: false,
        })
    }

    /// Scale factor of the primary monitor, 1.0 when unknown
    pub fn scale_factor(&self) -> f64 {
        self.event_loop
            .primary_monitor()
            .map(|monitor| monitor.scale_factor())
            .unwrap_or(1.0)
    }

    /// Create the window, replacing any previous one
    pub fn open(
        &mut self,
        backend: &'static str,
        title: &str,
        size: PhysicalSize<u32>,
        min_size: PhysicalSize<u32>,
    ) -> Result<Arc<Window>> {
        let window = WindowBuilder::new()
            .with_title(title)
            .with_inner_size(size)
            .with_min_inner_size(min_size)
            .build(&self.event_loop)
            .map_err(|e| Error::init(backend, format!("cannot create window: {}", e)))?;
        let window = Arc::new(window);
        log::debug!("window {:?} opened at {}x{}", window.id(), size.width, size.height);
        self.window = Some(window.clone());
        self.pending.clear();
        self.exited = false;
        Ok(window)
    }

    /// Drop the host's handle on the window; it closes once every owner let go
    pub fn close(&mut self) {
        if let Some(window) = self.window.take() {
            window.set_visible(false);
            log::debug!("window {:?} closed", window.id());
        }
        self.pending.clear();
    }

    pub fn window(&self) -> Option<&Arc<Window>> {
        self.window.as_ref()
    }

    /// Collect window events
    ///
    /// `None` waits until something arrives, `Some(ZERO)` only drains what
    /// is already queued.
    pub fn pump(&mut self, timeout: Option<Duration>) {
        let Some(window_id) = self.window.as_ref().map(|w| w.id()) else {
            return;
        };
        let pending = &mut self.pending;
        let status = self.event_loop.pump_events(timeout, |event, elwt| {
            elwt.set_control_flow(ControlFlow::Wait);
            if let WinitEvent::WindowEvent { window_id: id, event } = event {
                if id == window_id {
                    pending.push_back(event);
                }
            }
        });
        if let PumpStatus::Exit(code) = status {
            log::debug!("event loop exited with code {}", code);
            self.exited = true;
        }
    }

    /// True once the platform ended the event loop
    pub fn exited(&self) -> bool {
        self.exited
    }

    pub fn drain(&mut self) -> Vec<WindowEvent> {
        self.pending.drain(..).collect()
    }
}

// The loop stays on whichever thread first initializes a native renderer.
// macOS has no such option and still requires the main thread.
#[cfg(all(
    unix,
    not(any(
        target_os = "macos",
        target_os = "ios",
        target_os = "android",
        target_os = "redox"
    ))
))]
fn allow_any_thread(builder: &mut EventLoopBuilder<()>) {
    use winit::platform::x11::EventLoopBuilderExtX11;
    builder.with_any_thread(true);
}

#[cfg(windows)]
fn allow_any_thread(builder: &mut EventLoopBuilder<()>) {
    use winit::platform::windows::EventLoopBuilderExtWindows;
    builder.with_any_thread(true);
}

#[cfg(not(any(
    windows,
    all(
        unix,
        not(any(
            target_os = "macos",
            target_os = "ios",
            target_os = "android",
            target_os = "redox"
        ))
    )
)))]
fn allow_any_thread(_builder: &mut EventLoopBuilder<()>) {}
