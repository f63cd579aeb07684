//! System clipboard access through arboard
//!
//! Clipboard trouble is never an error for callers: reads yield an empty
//! string and writes report false.

use arboard::Clipboard;

#[derive(Default)]
pub struct SystemClipboard {
    inner: Option<Clipboard>,
}

impl std::fmt::Debug for SystemClipboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemClipboard")
            .field("connected", &self.inner.is_some())
            .finish()
    }
}

impl SystemClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    fn handle(&mut self) -> Option<&mut Clipboard> {
        if self.inner.is_none() {
            match Clipboard::new() {
                Ok(clipboard) => self.inner = Some(clipboard),
                Err(e) => {
                    log::debug!("clipboard unavailable: {}", e);
                    return None;
                }
            }
        }
        self.inner.as_mut()
    }

    pub fn get_text(&mut self) -> String {
        let Some(clipboard) = self.handle() else {
            return String::new();
        };
        match clipboard.get_text() {
            Ok(text) => text,
            Err(e) => {
                log::debug!("failed to read clipboard: {}", e);
                String::new()
            }
        }
    }

    pub fn set_text(&mut self, text: &str) -> bool {
        let Some(clipboard) = self.handle() else {
            return false;
        };
        match clipboard.set_text(text) {
            Ok(()) => {
                log::debug!("copied {} characters to clipboard", text.chars().count());
                true
            }
            Err(e) => {
                log::debug!("failed to write clipboard: {}", e);
                false
            }
        }
    }

    /// Drop the platform connection; the next access reconnects
    pub fn release(&mut self) {
        self.inner = None;
    }
}
