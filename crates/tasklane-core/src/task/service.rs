//! Task management service.
//!
//! A Task is stored as a [`Workflow`] whose name is the Task ID. Its trigger
//! is never stored on the workflow; every create and update converges the
//! trigger side resources through the [`TriggerReconciler`], and every read
//! projects them back.

use std::collections::HashMap;
use std::sync::Arc;

use tasklane_types::error::TaskError;
use tasklane_types::resource::{FieldSelector, IndexField, ObjectMeta, Resource};
use tasklane_types::task::{Caller, Task, TaskList, TaskManifest, TaskScope, Trigger};
use tasklane_types::trigger::{CronJob, EmailReceiver, Triggers, Webhook};
use tasklane_types::workflow::{Agent, Thread, Workflow, WorkflowManifest, WorkflowSpec};

use super::translate::to_workflow_manifest;
use super::{render_task, resolve_task};
use crate::naming::{ResourceNamer, generate_alias};
use crate::store::{ObjectStore, get_optional, update_with_retry};
use crate::trigger::TriggerReconciler;

/// Check a manifest before anything is written and return its trigger.
///
/// Rejects more than one trigger and schedules that are not valid cron
/// expressions.
pub fn validate_manifest(manifest: &TaskManifest) -> Result<Trigger, TaskError> {
    let trigger = manifest.trigger()?;
    if let Some(schedule) = trigger.schedule() {
        schedule
            .parse::<croner::Cron>()
            .map_err(|e| TaskError::Validation(format!("invalid schedule '{schedule}': {e}")))?;
    }
    Ok(trigger)
}

/// Service orchestrating the Task lifecycle.
///
/// Generic over the object store so tasklane-core never depends on
/// tasklane-infra.
pub struct TaskService<S: ObjectStore> {
    store: Arc<S>,
    namer: ResourceNamer,
    reconciler: TriggerReconciler<S>,
}

impl<S: ObjectStore> TaskService<S> {
    pub fn new(store: Arc<S>, namer: ResourceNamer) -> Self {
        let reconciler = TriggerReconciler::new(Arc::clone(&store), namer.clone());
        Self {
            store,
            namer,
            reconciler,
        }
    }

    /// Create a Task under `agent_id` owned by the caller.
    ///
    /// The workflow is written first, then the trigger is reconciled. If
    /// reconciliation fails the workflow is removed again best-effort and
    /// the reconciliation error is returned.
    pub async fn create_task(
        &self,
        agent_id: &str,
        caller: &Caller,
        manifest: TaskManifest,
    ) -> Result<Task, TaskError> {
        let trigger = validate_manifest(&manifest)?;
        let mut workflow_manifest = self.build_manifest(agent_id, caller, &manifest).await?;
        workflow_manifest.alias = generate_alias();

        let workflow = self
            .store
            .create(Workflow {
                metadata: ObjectMeta::generated(self.namer.workflow_prefix()),
                spec: WorkflowSpec {
                    agent_name: agent_id.to_string(),
                    user_id: caller.user_id.clone(),
                    manifest: workflow_manifest,
                },
            })
            .await?;

        let task_id = workflow.name().to_string();
        tracing::info!(task_id, agent_id, user_id = %caller.user_id, "created task");

        match self.reconciler.reconcile(&workflow, &trigger).await {
            Ok(triggers) => Ok(render_task(&workflow, &triggers)),
            Err(e) => {
                self.rollback(&workflow).await;
                Err(e)
            }
        }
    }

    /// Replace the Task's manifest and converge its trigger.
    ///
    /// The alias survives every update.
    pub async fn update_task(
        &self,
        scope: &TaskScope,
        caller: &Caller,
        manifest: TaskManifest,
    ) -> Result<Task, TaskError> {
        let trigger = validate_manifest(&manifest)?;
        let current = resolve_task(self.store.as_ref(), scope, caller).await?;
        // Rejects foreign trigger resources before anything is written.
        self.reconciler.observe(&current).await?;
        let desired = self.build_manifest(&scope.agent_id, caller, &manifest).await?;
        let fallback_alias = generate_alias();

        let workflow = update_with_retry(self.store.as_ref(), &scope.task_id, |workflow: &mut Workflow| {
            let mut next = desired.clone();
            next.alias = if workflow.spec.manifest.alias.is_empty() {
                fallback_alias.clone()
            } else {
                workflow.spec.manifest.alias.clone()
            };
            if workflow.spec.manifest == next {
                return false;
            }
            workflow.spec.manifest = next;
            true
        })
        .await?;

        tracing::info!(task_id = %scope.task_id, user_id = %caller.user_id, "updated task");

        let triggers = self.reconciler.reconcile(&workflow, &trigger).await?;
        Ok(render_task(&workflow, &triggers))
    }

    pub async fn get_task(&self, scope: &TaskScope, caller: &Caller) -> Result<Task, TaskError> {
        let workflow = resolve_task(self.store.as_ref(), scope, caller).await?;
        let triggers = self.reconciler.observe(&workflow).await?;
        Ok(render_task(&workflow, &triggers))
    }

    /// All of the caller's Tasks on an agent, each joined with its triggers.
    pub async fn list_tasks(&self, agent_id: &str, caller: &Caller) -> Result<TaskList, TaskError> {
        self.store.get::<Agent>(agent_id).await?;

        let by_user = FieldSelector::all().eq(IndexField::UserId, &caller.user_id);
        let workflows = self
            .store
            .list::<Workflow>(&by_user.clone().eq(IndexField::AgentName, agent_id))
            .await?;
        let mut cron_jobs = by_name(self.store.list::<CronJob>(&by_user).await?);
        let mut webhooks = by_name(self.store.list::<Webhook>(&by_user).await?);
        let mut email_receivers = by_name(self.store.list::<EmailReceiver>(&by_user).await?);

        let items = workflows
            .iter()
            .map(|workflow| {
                let task_id = workflow.name();
                let triggers = Triggers {
                    cron_job: cron_jobs.remove(&self.namer.cron_job_name(task_id)),
                    webhook: webhooks.remove(&self.namer.webhook_name(task_id)),
                    email_receiver: email_receivers.remove(&self.namer.email_receiver_name(task_id)),
                };
                render_task(workflow, &triggers)
            })
            .collect();

        Ok(TaskList { items })
    }

    /// Delete a Task and its trigger resources. Deleting a missing Task is
    /// not an error.
    pub async fn delete_task(&self, scope: &TaskScope, caller: &Caller) -> Result<(), TaskError> {
        let workflow = match resolve_task(self.store.as_ref(), scope, caller).await {
            Ok(workflow) => workflow,
            Err(e) if e.is_not_found() => return Ok(()),
            Err(e) => return Err(e),
        };

        self.reconciler.reconcile(&workflow, &Trigger::None).await?;
        match self.store.delete::<Workflow>(workflow.name()).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e.into()),
        }

        tracing::info!(task_id = %scope.task_id, user_id = %caller.user_id, "deleted task");
        Ok(())
    }

    /// Agent base manifest plus the caller's personal thread tools.
    async fn build_manifest(
        &self,
        agent_id: &str,
        caller: &Caller,
        manifest: &TaskManifest,
    ) -> Result<WorkflowManifest, TaskError> {
        let agent = self.store.get::<Agent>(agent_id).await?;
        let thread_name = self.namer.user_thread_name(agent_id, &caller.user_id);
        let thread = get_optional::<S, Thread>(self.store.as_ref(), &thread_name).await?;
        Ok(to_workflow_manifest(&agent.manifest, thread.as_ref(), manifest))
    }

    async fn rollback(&self, workflow: &Workflow) {
        let task_id = workflow.name();
        if let Err(e) = self.reconciler.reconcile(workflow, &Trigger::None).await {
            tracing::warn!(task_id, error = %e, "failed to remove triggers of rolled back task");
        }
        if let Err(e) = self.store.delete::<Workflow>(task_id).await {
            tracing::warn!(task_id, error = %e, "failed to roll back task");
        }
    }
}

fn by_name<R: Resource>(resources: Vec<R>) -> HashMap<String, R> {
    resources
        .into_iter()
        .map(|resource| (resource.name().to_string(), resource))
        .collect()
}
