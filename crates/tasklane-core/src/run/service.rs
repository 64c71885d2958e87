//! Run orchestration.
//!
//! Ad-hoc runs are created with a generated name and returned immediately;
//! the async engine attaches a thread later. The editor run is the one run
//! per (task, user) with a deterministic name, advanced step by step through
//! the [`StepInvoker`].

use std::sync::Arc;
use std::time::Duration;

use tasklane_types::config::RunConfig;
use tasklane_types::error::TaskError;
use tasklane_types::resource::{FieldSelector, IndexField, ObjectMeta, Resource};
use tasklane_types::task::{Caller, TaskRun, TaskRunList, TaskScope};
use tasklane_types::workflow::{Thread, WorkflowExecution, WorkflowExecutionSpec};
use tokio_util::sync::CancellationToken;

use super::render_run;
use crate::engine::{InvokeOptions, StepInvoker};
use crate::guard::authorize_run;
use crate::naming::ResourceNamer;
use crate::store::{ObjectStore, WaitOptions, update_with_retry, wait_for};
use crate::task::resolve_task;

/// Decode a run input payload.
///
/// The payload must be UTF-8. An empty payload and the empty JSON object
/// `{}` both mean "no input".
pub fn parse_input(input: &[u8]) -> Result<Option<String>, TaskError> {
    let input = std::str::from_utf8(input)
        .map_err(|_| TaskError::Validation("invalid non-utf8 input".to_string()))?;
    if input.is_empty() || input == "{}" {
        return Ok(None);
    }
    Ok(Some(input.to_string()))
}

pub struct RunService<S: ObjectStore, I: StepInvoker> {
    store: Arc<S>,
    invoker: Arc<I>,
    namer: ResourceNamer,
    config: RunConfig,
}

impl<S: ObjectStore, I: StepInvoker> RunService<S, I> {
    pub fn new(store: Arc<S>, invoker: Arc<I>, namer: ResourceNamer, config: RunConfig) -> Self {
        Self {
            store,
            invoker,
            namer,
            config,
        }
    }

    /// Start a run from a raw request payload.
    ///
    /// Without `step_id` a new ad-hoc run is created; with one, the caller's
    /// editor run is advanced to that step.
    pub async fn launch(
        &self,
        scope: &TaskScope,
        caller: &Caller,
        input: &[u8],
        step_id: Option<&str>,
    ) -> Result<TaskRun, TaskError> {
        let input = parse_input(input)?;
        match step_id.filter(|step_id| !step_id.is_empty()) {
            Some(step_id) => self.advance_editor_run(scope, caller, input, step_id).await,
            None => self.create_run(scope, caller, input).await,
        }
    }

    pub async fn create_run(
        &self,
        scope: &TaskScope,
        caller: &Caller,
        input: Option<String>,
    ) -> Result<TaskRun, TaskError> {
        let workflow = resolve_task(self.store.as_ref(), scope, caller).await?;

        let run = self
            .store
            .create(WorkflowExecution {
                metadata: ObjectMeta::generated(self.namer.workflow_execution_prefix()),
                spec: WorkflowExecutionSpec {
                    workflow_name: workflow.name().to_string(),
                    user_id: caller.user_id.clone(),
                    input,
                    step_id: None,
                },
                status: Default::default(),
            })
            .await?;

        tracing::info!(task_id = %scope.task_id, run_id = %run.name(), "created run");
        Ok(render_run(&workflow, &run))
    }

    /// Advance the caller's editor run to `step_id`, creating it on first use.
    pub async fn advance_editor_run(
        &self,
        scope: &TaskScope,
        caller: &Caller,
        input: Option<String>,
        step_id: &str,
    ) -> Result<TaskRun, TaskError> {
        let workflow = resolve_task(self.store.as_ref(), scope, caller).await?;
        let run_name = self.namer.editor_run_name(workflow.name(), &caller.user_id);

        let run = self
            .invoker
            .invoke_step(
                &workflow,
                input,
                InvokeOptions {
                    run_name,
                    user_id: caller.user_id.clone(),
                    step_id: Some(step_id.to_string()),
                },
            )
            .await?;

        tracing::info!(task_id = %scope.task_id, run_id = %run.name(), step_id, "advanced editor run");
        Ok(render_run(&workflow, &run))
    }

    /// The caller's runs of a task, without the editor run.
    pub async fn list_runs(&self, scope: &TaskScope, caller: &Caller) -> Result<TaskRunList, TaskError> {
        let workflow = resolve_task(self.store.as_ref(), scope, caller).await?;
        let editor_run = self.namer.editor_run_name(workflow.name(), &caller.user_id);

        let runs = self
            .store
            .list::<WorkflowExecution>(
                &FieldSelector::all()
                    .eq(IndexField::WorkflowName, workflow.name())
                    .eq(IndexField::UserId, &caller.user_id),
            )
            .await?;

        let items = runs
            .iter()
            .filter(|run| run.name() != editor_run)
            .map(|run| render_run(&workflow, run))
            .collect();

        Ok(TaskRunList { items })
    }

    pub async fn get_run(&self, scope: &TaskScope, caller: &Caller, run_id: &str) -> Result<TaskRun, TaskError> {
        let workflow = resolve_task(self.store.as_ref(), scope, caller).await?;
        let run = self.store.get::<WorkflowExecution>(run_id).await?;
        authorize_run(&run, workflow.name(), caller)?;
        Ok(render_run(&workflow, &run))
    }

    /// Delete a run. A missing run is an error.
    pub async fn delete_run(&self, scope: &TaskScope, caller: &Caller, run_id: &str) -> Result<(), TaskError> {
        let workflow = resolve_task(self.store.as_ref(), scope, caller).await?;
        let run = self.store.get::<WorkflowExecution>(run_id).await?;
        authorize_run(&run, workflow.name(), caller)?;
        self.store.delete::<WorkflowExecution>(run_id).await?;

        tracing::info!(task_id = %scope.task_id, run_id, "deleted run");
        Ok(())
    }

    /// Ask the engine to stop a run's thread.
    ///
    /// `run_id` defaults to the caller's editor run. Waits without a
    /// deadline for a thread to attach; only `cancel` ends the wait early.
    pub async fn abort_run(
        &self,
        scope: &TaskScope,
        caller: &Caller,
        run_id: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<TaskRun, TaskError> {
        let workflow = resolve_task(self.store.as_ref(), scope, caller).await?;
        let run_name = match run_id {
            Some(run_id) => run_id.to_string(),
            None => self.namer.editor_run_name(workflow.name(), &caller.user_id),
        };

        let run = self.store.get::<WorkflowExecution>(&run_name).await?;
        authorize_run(&run, workflow.name(), caller)?;

        let run = wait_for::<S, WorkflowExecution, _>(
            self.store.as_ref(),
            &run_name,
            |run| run.attached_thread().is_some(),
            WaitOptions {
                timeout: None,
                wait_for_exists: false,
                resync: Duration::from_secs(self.config.resync_interval_secs),
            },
            cancel,
        )
        .await?;

        if let Some(thread_name) = run.attached_thread() {
            update_with_retry(self.store.as_ref(), thread_name, |thread: &mut Thread| {
                if thread.spec.abort {
                    return false;
                }
                thread.spec.abort = true;
                true
            })
            .await?;
            tracing::info!(task_id = %scope.task_id, run_id = %run_name, thread_name, "aborted run");
        }

        Ok(render_run(&workflow, &run))
    }
}
