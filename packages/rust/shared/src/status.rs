//! Status reporting seam between pipeline stages and whatever displays them.

use crate::types::StatusEvent;

/// Receives fire-and-forget status updates.
///
/// Implementations must not block; a sink with nobody listening simply
/// drops the event.
pub trait StatusSink: Send + Sync {
    fn status(&self, event: StatusEvent);

    /// Convenience wrapper around [`StatusSink::status`].
    fn say(&self, text: &str) {
        self.status(StatusEvent::new(text));
    }
}

/// No-op sink for headless/test usage.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentStatus;

impl StatusSink for SilentStatus {
    fn status(&self, _event: StatusEvent) {}
}
