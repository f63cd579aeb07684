//! Callback-mode event delivery shared by all backends
//!
//! The callback is moved out of the backend for the duration of a handler so
//! the handler can borrow the backend mutably and draw. It is put back only
//! if the handler did not install a replacement.

use crate::error::{Error, Result};
use crate::event::{CharEvent, Event};
use crate::renderer::{EventCallback, LifecycleState, Renderer};

/// Upper bound on events delivered by one loop iteration
pub const MAX_EVENTS_PER_ITERATION: usize = 256;

/// A renderer that stores an event callback
pub trait CallbackHost: Renderer {
    fn callback_slot(&mut self) -> &mut Option<Box<dyn EventCallback>>;
}

/// Route one event to the matching handler
///
/// A key event the handler did not consume is delivered again as a
/// character event when the key produces text.
pub fn deliver(callback: &mut dyn EventCallback, event: &Event, renderer: &mut dyn Renderer) -> bool {
    match event {
        Event::Key(key) => {
            if callback.on_key_event(key, renderer) {
                return true;
            }
            match key.text_char() {
                Some(ch) => callback.on_char_event(
                    &CharEvent {
                        ch,
                        modifiers: key.modifiers,
                    },
                    renderer,
                ),
                None => false,
            }
        }
        Event::Char(ch) => callback.on_char_event(ch, renderer),
        Event::System(sys) => callback.on_system_event(sys, renderer),
        Event::Mouse(mouse) => callback.on_mouse_event(mouse, renderer),
        Event::Menu(menu) => callback.on_menu_event(menu, renderer),
    }
}

/// Deliver one event to the host's callback, if any
pub fn dispatch<R: CallbackHost>(renderer: &mut R, event: &Event) -> bool {
    let Some(mut callback) = renderer.callback_slot().take() else {
        return false;
    };
    let consumed = deliver(callback.as_mut(), event, renderer);
    restore(renderer, callback);
    consumed
}

/// Give the callback a chance to refresh menu item state before a menu opens
pub fn notify_menu_will_open<R: CallbackHost>(renderer: &mut R) {
    if let Some(mut callback) = renderer.callback_slot().take() {
        callback.on_menu_will_open(renderer);
        restore(renderer, callback);
    }
}

fn restore<R: CallbackHost>(renderer: &mut R, callback: Box<dyn EventCallback>) {
    let slot = renderer.callback_slot();
    if slot.is_none() {
        *slot = Some(callback);
    }
}

fn should_close<R: CallbackHost>(renderer: &mut R) -> bool {
    renderer
        .callback_slot()
        .as_ref()
        .map_or(false, |callback| callback.should_close())
}

/// Wait up to `timeout_ms` for an event, then deliver it and everything already queued
///
/// Returns true once a close event was delivered, the callback asked to
/// close, or the renderer left the running state. Events still queued after
/// that stay queued.
pub fn run_iteration<R: CallbackHost>(renderer: &mut R, timeout_ms: i32) -> Result<bool> {
    if renderer.callback_slot().is_none() {
        return Err(Error::CallbackNotSet);
    }
    renderer.state().require_running()?;

    let mut next = renderer.get_event(timeout_ms)?;
    let mut delivered = 0;
    while let Some(event) = next {
        dispatch(renderer, &event);
        delivered += 1;
        if event.is_close() {
            log::debug!("{}: close event delivered", renderer.backend_name());
            return Ok(true);
        }
        if renderer.state() != LifecycleState::Running || should_close(renderer) {
            return Ok(true);
        }
        if delivered >= MAX_EVENTS_PER_ITERATION {
            break;
        }
        next = renderer.get_event(0)?;
    }
    Ok(false)
}

/// Block delivering events until a close event or `should_close`
pub fn run_loop<R: CallbackHost>(renderer: &mut R) -> Result<()> {
    if renderer.callback_slot().is_none() {
        return Err(Error::CallbackNotSet);
    }
    log::debug!("{}: entering event loop", renderer.backend_name());
    while !should_close(renderer) {
        if run_iteration(renderer, -1)? {
            break;
        }
    }
    log::debug!("{}: event loop finished", renderer.backend_name());
    Ok(())
}
