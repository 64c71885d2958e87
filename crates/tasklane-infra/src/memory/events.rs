//! In-memory run event log.
//!
//! Appended events are kept in order and fanned out on an [`EventBus`].
//! A watch replays the tail of the history and then follows the bus. The
//! history keeps at most `retention` events, dropping the oldest first.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use futures_util::StreamExt;
use tasklane_core::event::{EventBus, EventStore, EventWatch, WatchOptions};
use tasklane_types::error::TaskError;
use tasklane_types::event::RunEvent;
use tokio::sync::RwLock;
use tokio::sync::broadcast::error::RecvError;

const BUS_CAPACITY: usize = 1024;

/// Events retained by [`InMemoryEventLog::new`].
const DEFAULT_RETENTION: usize = 100_000;

struct History {
    events: VecDeque<RunEvent>,
    next_sequence: u64,
}

impl History {
    /// Retained events with a sequence above `after`, oldest first.
    fn since(&self, after: u64) -> Vec<RunEvent> {
        let start = self.events.partition_point(|event| event.sequence <= after);
        self.events.range(start..).cloned().collect()
    }
}

pub struct InMemoryEventLog {
    history: Arc<RwLock<History>>,
    bus: EventBus,
    retention: usize,
}

impl InMemoryEventLog {
    pub fn new() -> Self {
        Self::with_retention(DEFAULT_RETENTION)
    }

    /// A log keeping at most `retention` events. `0` keeps everything.
    pub fn with_retention(retention: usize) -> Self {
        Self {
            history: Arc::new(RwLock::new(History {
                events: VecDeque::new(),
                next_sequence: 1,
            })),
            bus: EventBus::new(BUS_CAPACITY),
            retention,
        }
    }

    /// Append an event, assigning its sequence number, and publish it to
    /// live watchers.
    pub async fn append(&self, mut event: RunEvent) -> RunEvent {
        let mut history = self.history.write().await;
        event.sequence = history.next_sequence;
        history.next_sequence += 1;
        history.events.push_back(event.clone());
        if self.retention > 0 {
            while history.events.len() > self.retention {
                history.events.pop_front();
            }
        }
        self.bus.publish(event.clone());
        event
    }
}

impl Default for InMemoryEventLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Threads whose events belong to a watch: the watched thread and, when
/// following children, every thread transitively nested under it.
struct ThreadScope {
    threads: HashSet<String>,
    follow_children: bool,
}

impl ThreadScope {
    fn new(thread_name: &str, follow_children: bool) -> Self {
        Self {
            threads: HashSet::from([thread_name.to_string()]),
            follow_children,
        }
    }

    fn admits(&mut self, event: &RunEvent) -> bool {
        if self.threads.contains(&event.thread_name) {
            return true;
        }
        match &event.parent_thread_name {
            Some(parent) if self.follow_children && self.threads.contains(parent) => {
                self.threads.insert(event.thread_name.clone());
                true
            }
            _ => false,
        }
    }
}

/// Keep only the events of the last `max_runs` distinct engine runs.
/// `0` keeps everything.
fn tail_runs(events: Vec<RunEvent>, max_runs: usize) -> Vec<RunEvent> {
    if max_runs == 0 {
        return events;
    }

    let mut recent: VecDeque<&str> = VecDeque::new();
    for event in events.iter().rev() {
        if recent.len() == max_runs {
            break;
        }
        if !recent.contains(&event.run_id.as_str()) {
            recent.push_back(&event.run_id);
        }
    }
    let keep: HashSet<String> = recent.into_iter().map(str::to_string).collect();

    events
        .into_iter()
        .filter(|event| keep.contains(&event.run_id))
        .collect()
}

impl EventStore for InMemoryEventLog {
    async fn watch(&self, opts: WatchOptions) -> Result<EventWatch, TaskError> {
        // Subscribe before the snapshot so nothing appended in between is lost.
        let mut live = self.bus.subscribe();
        let snapshot: Vec<RunEvent> = self.history.read().await.events.iter().cloned().collect();
        let high_water = snapshot.last().map_or(0, |last| last.sequence);

        let mut scope = ThreadScope::new(&opts.thread_name, opts.follow_children);
        let replay = if opts.history {
            let relevant: Vec<RunEvent> = snapshot.into_iter().filter(|event| scope.admits(event)).collect();
            tail_runs(relevant, opts.max_runs)
        } else {
            for event in &snapshot {
                scope.admits(event);
            }
            Vec::new()
        };
        let cursor = replay.last().map(|event| event.sequence.to_string());
        let follow = opts.follow;
        let history = Arc::clone(&self.history);

        let events = async_stream::stream! {
            for event in replay {
                yield event;
            }
            // Highest sequence passed through the scope, delivered or not.
            let mut seen = high_water;
            while follow {
                match live.recv().await {
                    Ok(event) => {
                        if event.sequence <= seen {
                            continue;
                        }
                        seen = event.sequence;
                        if scope.admits(&event) {
                            yield event;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        let missed = history.read().await.since(seen);
                        if missed.first().is_some_and(|first| first.sequence > seen + 1) {
                            tracing::warn!(
                                after = seen,
                                resumed_at = missed.first().map(|e| e.sequence),
                                "event watch lagged past retention, events dropped"
                            );
                        } else {
                            tracing::debug!(skipped, "event watch lagged, catching up from history");
                        }
                        for event in missed {
                            seen = event.sequence;
                            if scope.admits(&event) {
                                yield event;
                            }
                        }
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        };

        Ok(EventWatch {
            cursor,
            events: events.boxed(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tasklane_types::event::RunEventKind;

    use super::*;

    fn content(run_id: &str, thread: &str, text: &str) -> RunEvent {
        RunEvent::new(
            run_id,
            thread,
            RunEventKind::Content {
                content: text.to_string(),
            },
        )
    }

    fn watch_opts(thread: &str, max_runs: usize, follow: bool) -> WatchOptions {
        WatchOptions {
            history: true,
            max_runs,
            thread_name: thread.to_string(),
            follow,
            follow_children: true,
        }
    }

    #[tokio::test]
    async fn append_assigns_increasing_sequence() {
        let log = InMemoryEventLog::new();
        let first = log.append(content("r1", "t1-a", "one")).await;
        let second = log.append(content("r1", "t1-a", "two")).await;
        assert_eq!(first.sequence, 1);
        assert_eq!(second.sequence, 2);
    }

    #[tokio::test]
    async fn history_is_bounded_by_runs() {
        let log = InMemoryEventLog::new();
        for run in ["r1", "r2", "r3"] {
            log.append(content(run, "t1-a", "start")).await;
            log.append(content(run, "t1-a", "end")).await;
        }

        let watch = log.watch(watch_opts("t1-a", 2, false)).await.unwrap();
        assert_eq!(watch.cursor.as_deref(), Some("6"));
        let events: Vec<RunEvent> = watch.events.collect().await;
        let runs: Vec<&str> = events.iter().map(|e| e.run_id.as_str()).collect();
        assert_eq!(runs, vec!["r2", "r2", "r3", "r3"]);
    }

    #[tokio::test]
    async fn other_threads_are_excluded_and_children_included() {
        let log = InMemoryEventLog::new();
        log.append(content("r1", "t1-a", "root")).await;
        log.append(content("r9", "t1-other", "noise")).await;
        log.append(content("r2", "t1-child", "nested").with_parent("t1-a")).await;
        log.append(content("r3", "t1-grandchild", "deeper").with_parent("t1-child")).await;

        let watch = log.watch(watch_opts("t1-a", 100, false)).await.unwrap();
        let threads: Vec<String> = watch.events.map(|e| e.thread_name).collect().await;
        assert_eq!(threads, vec!["t1-a", "t1-child", "t1-grandchild"]);
    }

    #[tokio::test]
    async fn follow_delivers_live_events_after_history() {
        let log = std::sync::Arc::new(InMemoryEventLog::new());
        log.append(content("r1", "t1-a", "old")).await;

        let mut watch = log.watch(watch_opts("t1-a", 100, true)).await.unwrap();
        let first = watch.events.next().await.unwrap();
        assert_eq!(first.sequence, 1);

        log.append(content("r2", "t1-other", "ignored")).await;
        log.append(content("r2", "t1-a", "new")).await;

        let live = tokio::time::timeout(Duration::from_secs(1), watch.events.next())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(live.sequence, 3);
        assert_eq!(live.thread_name, "t1-a");
    }

    #[tokio::test]
    async fn lagging_follower_catches_up_from_history() {
        let log = InMemoryEventLog::new();
        let opts = WatchOptions {
            history: false,
            ..watch_opts("t1-a", 100, true)
        };
        let mut watch = log.watch(opts).await.unwrap();

        let appended = BUS_CAPACITY + 476;
        for i in 0..appended {
            let thread = if i % 2 == 0 { "t1-a" } else { "t1-child" };
            let event = content("r1", thread, "tick");
            let event = if thread == "t1-child" { event.with_parent("t1-a") } else { event };
            log.append(event).await;
        }

        let mut sequences = Vec::with_capacity(appended);
        while sequences.len() < appended {
            let event = tokio::time::timeout(Duration::from_secs(1), watch.events.next())
                .await
                .unwrap()
                .unwrap();
            sequences.push(event.sequence);
        }
        let expected: Vec<u64> = (1..=appended as u64).collect();
        assert_eq!(sequences, expected);
    }

    #[tokio::test]
    async fn retention_drops_oldest_events() {
        let log = InMemoryEventLog::with_retention(3);
        for i in 0..5 {
            log.append(content("r1", "t1-a", &i.to_string())).await;
        }
        let next = log.append(content("r1", "t1-a", "next")).await;
        assert_eq!(next.sequence, 6);

        let watch = log.watch(watch_opts("t1-a", 0, false)).await.unwrap();
        let sequences: Vec<u64> = watch.events.map(|e| e.sequence).collect().await;
        assert_eq!(sequences, vec![4, 5, 6]);
    }
}
