//! Step invocation port of the async execution engine.

use std::future::Future;

use tasklane_types::error::TaskError;
use tasklane_types::workflow::{Workflow, WorkflowExecution};

/// Where and as whom a step is invoked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvokeOptions {
    /// Deterministic name of the run to create or advance.
    pub run_name: String,
    pub user_id: String,
    /// Step to advance to.
    pub step_id: Option<String>,
}

/// Hands work to the execution engine.
///
/// `invoke_step` must be idempotent on `run_name`: the first call creates
/// the run, later calls advance the same run to `step_id`.
pub trait StepInvoker: Send + Sync {
    fn invoke_step(
        &self,
        workflow: &Workflow,
        input: Option<String>,
        opts: InvokeOptions,
    ) -> impl Future<Output = Result<WorkflowExecution, TaskError>> + Send;
}
