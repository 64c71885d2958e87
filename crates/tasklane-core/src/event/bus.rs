//! Broadcast bus for live run events.
//!
//! Built on `tokio::sync::broadcast`. Publishing with no active subscribers
//! is a no-op; event log adapters keep their own history.

use tasklane_types::event::RunEvent;
use tokio::sync::broadcast;

/// Fan-out of appended [`RunEvent`]s to live watchers. Clones share the
/// channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<RunEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Receiver for events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<RunEvent> {
        self.sender.subscribe()
    }

    /// Send to current watchers. Returns how many received it.
    pub fn publish(&self, event: RunEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("watchers", &self.sender.receiver_count())
            .finish()
    }
}
