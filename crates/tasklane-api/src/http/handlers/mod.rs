//! HTTP request handlers for the REST API.

pub mod run;
pub mod task;

/// Base path of an agent's task collection.
pub(crate) fn tasks_path(agent_id: &str) -> String {
    format!("/api/v1/agents/{agent_id}/tasks")
}

pub(crate) fn task_path(agent_id: &str, task_id: &str) -> String {
    format!("{}/{task_id}", tasks_path(agent_id))
}
