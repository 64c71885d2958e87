//! Streams a run's event history and live updates.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tasklane_types::config::RunConfig;
use tasklane_types::error::TaskError;
use tasklane_types::resource::Resource;
use tasklane_types::task::{Caller, TaskScope};
use tasklane_types::workflow::WorkflowExecution;
use tokio_util::sync::CancellationToken;

use super::{EventStore, EventWatch, WatchOptions};
use crate::guard::authorize_run;
use crate::naming::ResourceNamer;
use crate::store::{ObjectStore, WaitOptions, wait_for};
use crate::task::resolve_task;

/// Connects a run to the event log once the engine has attached a thread.
pub struct EventBridge<S: ObjectStore, E: EventStore> {
    store: Arc<S>,
    events: Arc<E>,
    namer: ResourceNamer,
    config: RunConfig,
}

impl<S: ObjectStore, E: EventStore> EventBridge<S, E> {
    pub fn new(store: Arc<S>, events: Arc<E>, namer: ResourceNamer, config: RunConfig) -> Self {
        Self {
            store,
            events,
            namer,
            config,
        }
    }

    /// Open the event stream of a run (the caller's editor run when `run_id`
    /// is `None`).
    ///
    /// Waits for thread attachment, tolerating a run that does not exist
    /// yet, for up to `attach_timeout_secs`. The returned stream replays the
    /// last `max_history_runs` engine runs of the thread and its children,
    /// then follows live events until `cancel` fires or the log closes.
    pub async fn stream_events(
        &self,
        scope: &TaskScope,
        run_id: Option<&str>,
        caller: &Caller,
        cancel: CancellationToken,
    ) -> Result<EventWatch, TaskError> {
        let workflow = resolve_task(self.store.as_ref(), scope, caller).await?;
        let run_name = match run_id {
            Some(run_id) => run_id.to_string(),
            None => self.namer.editor_run_name(workflow.name(), &caller.user_id),
        };

        let run = wait_for::<S, WorkflowExecution, _>(
            self.store.as_ref(),
            &run_name,
            |run| run.attached_thread().is_some(),
            WaitOptions {
                timeout: Some(Duration::from_secs(self.config.attach_timeout_secs)),
                wait_for_exists: true,
                resync: Duration::from_secs(self.config.resync_interval_secs),
            },
            &cancel,
        )
        .await?;

        authorize_run(&run, workflow.name(), caller)?;

        let thread_name = run.attached_thread().unwrap_or_default().to_string();
        tracing::debug!(run_id = %run_name, thread_name, "opening event watch");

        let watch = self
            .events
            .watch(WatchOptions {
                history: true,
                max_runs: self.config.max_history_runs,
                thread_name,
                follow: true,
                follow_children: true,
            })
            .await?;

        Ok(EventWatch {
            cursor: watch.cursor,
            events: watch.events.take_until(cancel.cancelled_owned()).boxed(),
        })
    }
}
