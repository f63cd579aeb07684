//! Outgoing drag-and-drop session bookkeeping
//!
//! A session starts synchronously and completes later, on the event loop
//! thread, when the platform reports a drop or a cancellation. The registered
//! completion callback fires exactly once per session.

/// Callback receiving `true` for a completed drop, `false` for a cancellation
pub type DragCompletion = Box<dyn FnMut(bool)>;

/// A drag in flight
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragSession {
    pub file_urls: Vec<String>,
    pub label: String,
}

/// Tracks at most one pending session and its completion callback
#[derive(Default)]
pub struct DragTracker {
    pending: Option<DragSession>,
    callback: Option<DragCompletion>,
}

impl std::fmt::Debug for DragTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DragTracker")
            .field("pending", &self.pending)
            .field("has_callback", &self.callback.is_some())
            .finish()
    }
}

impl DragTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_callback(&mut self, callback: Option<DragCompletion>) {
        self.callback = callback;
    }

    /// Begin a session; refused while another is pending or with no files
    pub fn start(&mut self, file_urls: &[String], label: &str) -> bool {
        if self.pending.is_some() {
            log::debug!("drag session already in progress");
            return false;
        }
        if file_urls.is_empty() {
            log::debug!("drag session refused: no files");
            return false;
        }
        self.pending = Some(DragSession {
            file_urls: file_urls.to_vec(),
            label: label.to_string(),
        });
        true
    }

    pub fn is_active(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending(&self) -> Option<&DragSession> {
        self.pending.as_ref()
    }

    /// End the pending session and notify the callback
    ///
    /// Returns the finished session, or `None` if nothing was pending.
    pub fn finish(&mut self, completed: bool) -> Option<DragSession> {
        let session = self.pending.take()?;
        log::debug!(
            "drag session '{}' {}",
            session.label,
            if completed { "completed" } else { "cancelled" }
        );
        if let Some(callback) = self.callback.as_mut() {
            callback(completed);
        }
        Some(session)
    }

    /// Cancel without a platform gesture, e.g. on shutdown
    pub fn cancel(&mut self) -> Option<DragSession> {
        self.finish(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recorder() -> (Rc<RefCell<Vec<bool>>>, DragCompletion) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = log.clone();
        (log, Box::new(move |ok| sink.borrow_mut().push(ok)))
    }

    #[test]
    fn test_session_completes_once() {
        let (log, cb) = recorder();
        let mut tracker = DragTracker::new();
        tracker.set_callback(Some(cb));

        assert!(tracker.start(&["file:///tmp/a.txt".to_string()], "a.txt"));
        assert!(tracker.is_active());
        assert!(tracker.finish(true).is_some());
        assert!(tracker.finish(true).is_none());
        assert_eq!(*log.borrow(), vec![true]);
    }

    #[test]
    fn test_only_one_pending_session() {
        let mut tracker = DragTracker::new();
        let urls = vec!["file:///a".to_string()];
        assert!(tracker.start(&urls, "a"));
        assert!(!tracker.start(&urls, "b"));
        assert_eq!(tracker.pending().unwrap().label, "a");
    }

    #[test]
    fn test_empty_file_list_refused() {
        let mut tracker = DragTracker::new();
        assert!(!tracker.start(&[], "nothing"));
        assert!(!tracker.is_active());
    }

    #[test]
    fn test_cancel_reports_false() {
        let (log, cb) = recorder();
        let mut tracker = DragTracker::new();
        tracker.set_callback(Some(cb));
        tracker.start(&["file:///a".to_string()], "a");
        tracker.cancel();
        assert_eq!(*log.borrow(), vec![false]);
        assert!(!tracker.is_active());
    }
}
