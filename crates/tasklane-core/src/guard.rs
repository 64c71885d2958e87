//! Ownership checks evaluated immediately after a fetch.
//!
//! A mismatch is always `Forbidden` with a fixed message, so callers cannot
//! probe whether a resource exists under someone else.

use tasklane_types::error::TaskError;
use tasklane_types::resource::TaskOwned;
use tasklane_types::task::{Caller, TaskScope};
use tasklane_types::workflow::Workflow;

/// The task must belong to the agent in the path and to the caller.
pub fn authorize_task(workflow: &Workflow, scope: &TaskScope, caller: &Caller) -> Result<(), TaskError> {
    if workflow.spec.agent_name != scope.agent_id || workflow.spec.user_id != caller.user_id {
        return Err(TaskError::Forbidden("task does not belong to the user".to_string()));
    }
    Ok(())
}

/// The run must belong to the caller and to the task.
pub fn authorize_run<R: TaskOwned>(run: &R, task_id: &str, caller: &Caller) -> Result<(), TaskError> {
    if run.owner_user_id() != caller.user_id || run.owner_task_id() != task_id {
        return Err(TaskError::Forbidden("task run does not belong to the user".to_string()));
    }
    Ok(())
}

/// A trigger resource must carry the same owners as its task.
pub fn authorize_trigger<T: TaskOwned>(trigger: &T, workflow: &Workflow) -> Result<(), TaskError> {
    if trigger.owner_user_id() != workflow.spec.user_id || trigger.owner_task_id() != workflow.metadata.name {
        return Err(TaskError::Forbidden("trigger does not belong to the task".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use tasklane_types::resource::ObjectMeta;
    use tasklane_types::trigger::{Webhook, WebhookSpec};
    use tasklane_types::workflow::{WorkflowExecution, WorkflowExecutionSpec, WorkflowSpec};

    use super::*;

    fn workflow() -> Workflow {
        Workflow {
            metadata: ObjectMeta::named("w1abc"),
            spec: WorkflowSpec {
                agent_name: "a1".to_string(),
                user_id: "alice".to_string(),
                ..Default::default()
            },
        }
    }

    fn run(user: &str, task: &str) -> WorkflowExecution {
        WorkflowExecution {
            metadata: ObjectMeta::named("we1-xyz"),
            spec: WorkflowExecutionSpec {
                workflow_name: task.to_string(),
                user_id: user.to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn task_owner_is_authorized() {
        let scope = TaskScope::new("a1", "w1abc");
        assert!(authorize_task(&workflow(), &scope, &Caller::new("alice")).is_ok());
    }

    #[test]
    fn task_of_other_user_or_agent_is_forbidden() {
        let scope = TaskScope::new("a1", "w1abc");
        assert!(matches!(
            authorize_task(&workflow(), &scope, &Caller::new("bob")),
            Err(TaskError::Forbidden(_))
        ));

        let other_agent = TaskScope::new("a2", "w1abc");
        assert!(matches!(
            authorize_task(&workflow(), &other_agent, &Caller::new("alice")),
            Err(TaskError::Forbidden(_))
        ));
    }

    #[test]
    fn run_requires_user_and_task_match() {
        let caller = Caller::new("alice");
        assert!(authorize_run(&run("alice", "w1abc"), "w1abc", &caller).is_ok());
        assert!(authorize_run(&run("bob", "w1abc"), "w1abc", &caller).is_err());
        assert!(authorize_run(&run("alice", "w1other"), "w1abc", &caller).is_err());
    }

    #[test]
    fn trigger_with_foreign_owner_is_forbidden() {
        let mut webhook = Webhook {
            metadata: ObjectMeta::named("wh1-w1abc"),
            spec: WebhookSpec {
                workflow_name: "w1abc".to_string(),
                user_id: "alice".to_string(),
                alias: "0123456789abcdef".to_string(),
            },
        };
        assert!(authorize_trigger(&webhook, &workflow()).is_ok());

        webhook.spec.user_id = "mallory".to_string();
        assert!(matches!(
            authorize_trigger(&webhook, &workflow()),
            Err(TaskError::Forbidden(_))
        ));
    }
}
