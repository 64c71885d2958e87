//! Tasks: the user-facing view of a stored [`Workflow`] plus its triggers.

pub mod service;
pub mod translate;

use tasklane_types::error::TaskError;
use tasklane_types::task::{Caller, Task, TaskScope};
use tasklane_types::trigger::Triggers;
use tasklane_types::workflow::{Agent, Workflow};

pub use service::TaskService;

use crate::guard::authorize_task;
use crate::store::ObjectStore;

/// Fetch the task addressed by `scope` and check the caller owns it.
///
/// The agent must exist; a task of another agent or user is `Forbidden`.
pub async fn resolve_task<S: ObjectStore>(
    store: &S,
    scope: &TaskScope,
    caller: &Caller,
) -> Result<Workflow, TaskError> {
    let workflow = store.get::<Workflow>(&scope.task_id).await?;
    store.get::<Agent>(&scope.agent_id).await?;
    authorize_task(&workflow, scope, caller)?;
    Ok(workflow)
}

pub fn render_task(workflow: &Workflow, triggers: &Triggers) -> Task {
    Task {
        id: workflow.metadata.name.clone(),
        agent_id: workflow.spec.agent_name.clone(),
        alias: workflow.spec.manifest.alias.clone(),
        created_at: workflow.metadata.created_at,
        manifest: translate::to_task_manifest(&workflow.spec.manifest, triggers),
    }
}
