//! Store-backed step invoker.
//!
//! Records the request on the run resource and leaves execution to whatever
//! engine watches the store: the run is created on first use and its input
//! and step are advanced on later calls.

use std::sync::Arc;

use tasklane_core::engine::{InvokeOptions, StepInvoker};
use tasklane_core::store::{MAX_CONFLICT_RETRIES, ObjectStore, get_optional, update_with_retry};
use tasklane_types::error::{StoreError, TaskError};
use tasklane_types::resource::{ObjectMeta, Resource};
use tasklane_types::workflow::{Workflow, WorkflowExecution, WorkflowExecutionSpec};

pub struct LocalInvoker<S: ObjectStore> {
    store: Arc<S>,
}

impl<S: ObjectStore> LocalInvoker<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }
}

impl<S: ObjectStore> StepInvoker for LocalInvoker<S> {
    async fn invoke_step(
        &self,
        workflow: &Workflow,
        input: Option<String>,
        opts: InvokeOptions,
    ) -> Result<WorkflowExecution, TaskError> {
        let store = self.store.as_ref();
        let mut attempt = 0;
        loop {
            attempt += 1;
            let existing = get_optional::<S, WorkflowExecution>(store, &opts.run_name).await?;
            let result = match existing {
                None => {
                    store
                        .create(WorkflowExecution {
                            metadata: ObjectMeta::named(&opts.run_name),
                            spec: WorkflowExecutionSpec {
                                workflow_name: workflow.name().to_string(),
                                user_id: opts.user_id.clone(),
                                input: input.clone(),
                                step_id: opts.step_id.clone(),
                            },
                            status: Default::default(),
                        })
                        .await
                }
                Some(_) => {
                    update_with_retry(store, &opts.run_name, |run: &mut WorkflowExecution| {
                        if run.spec.input == input && run.spec.step_id == opts.step_id {
                            return false;
                        }
                        run.spec.input = input.clone();
                        run.spec.step_id = opts.step_id.clone();
                        true
                    })
                    .await
                }
            };

            match result {
                Ok(run) => {
                    tracing::debug!(run_name = %opts.run_name, step_id = ?opts.step_id, "invoked step");
                    return Ok(run);
                }
                // Lost a create race, or the run vanished between read and write.
                Err(StoreError::AlreadyExists { .. } | StoreError::NotFound { .. })
                    if attempt < MAX_CONFLICT_RETRIES => {}
                Err(e) => return Err(e.into()),
            }
        }
    }
}
