//! Runs: executions of a Task, stored as [`WorkflowExecution`]s.

pub mod service;

use tasklane_types::task::TaskRun;
use tasklane_types::trigger::Triggers;
use tasklane_types::workflow::{Workflow, WorkflowExecution};

pub use service::{RunService, parse_input};

use crate::task::translate::to_task_manifest;

/// Render a run with a snapshot of its task. Trigger state is not part of
/// the snapshot.
pub fn render_run(workflow: &Workflow, run: &WorkflowExecution) -> TaskRun {
    TaskRun {
        id: run.metadata.name.clone(),
        task_id: workflow.metadata.name.clone(),
        task: to_task_manifest(&workflow.spec.manifest, &Triggers::default()),
        input: run.spec.input.clone(),
        thread_id: run.attached_thread().map(str::to_string),
        step_id: run.spec.step_id.clone(),
        phase: run.status.phase,
        created_at: run.metadata.created_at,
    }
}
