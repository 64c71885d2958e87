//! Run event log port and the event stream bridge.
//!
//! The execution engine appends [`RunEvent`]s to an [`EventStore`]; the
//! [`EventBridge`] waits for a run's thread to attach and then opens a
//! history-plus-follow subscription on it.

pub mod bridge;
pub mod bus;

use std::future::Future;

use futures_util::stream::BoxStream;
use tasklane_types::error::TaskError;
use tasklane_types::event::RunEvent;

pub use bridge::EventBridge;
pub use bus::EventBus;

/// What a watch replays and follows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchOptions {
    /// Replay stored events before following.
    pub history: bool,
    /// Replay at most the events of this many most recent engine runs.
    pub max_runs: usize,
    pub thread_name: String,
    /// Keep the stream open for live events.
    pub follow: bool,
    /// Include events of threads nested under `thread_name`.
    pub follow_children: bool,
}

/// An open subscription on the event log.
pub struct EventWatch {
    /// Sequence position after the replayed history, if any was replayed.
    pub cursor: Option<String>,
    pub events: BoxStream<'static, RunEvent>,
}

impl std::fmt::Debug for EventWatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventWatch")
            .field("cursor", &self.cursor)
            .finish_non_exhaustive()
    }
}

/// Event log interface.
pub trait EventStore: Send + Sync {
    fn watch(&self, opts: WatchOptions) -> impl Future<Output = Result<EventWatch, TaskError>> + Send;
}
