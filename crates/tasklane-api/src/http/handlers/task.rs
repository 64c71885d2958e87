//! Task CRUD handlers for the REST API.

use axum::Json;
use axum::extract::{Path, State};

use tasklane_types::task::{Task, TaskList, TaskManifest, TaskScope};

use crate::http::error::AppError;
use crate::http::extractors::auth::CallerIdentity;
use crate::http::handlers::{task_path, tasks_path};
use crate::http::response::{ApiResponse, RequestClock};
use crate::state::AppState;

fn task_links(resp: ApiResponse<Task>, agent_id: &str, task_id: &str) -> ApiResponse<Task> {
    let base = task_path(agent_id, task_id);
    resp.with_link("runs", format!("{base}/runs"))
        .with_link("events", format!("{base}/events"))
        .with_link("self", base)
}

/// POST /api/v1/agents/{agent_id}/tasks - Create a task.
pub async fn create_task(
    State(state): State<AppState>,
    CallerIdentity(caller): CallerIdentity,
    Path(agent_id): Path<String>,
    Json(body): Json<TaskManifest>,
) -> Result<Json<ApiResponse<Task>>, AppError> {
    let clock = RequestClock::start();

    let task = state.task_service.create_task(&agent_id, &caller, body).await?;
    let task_id = task.id.clone();

    Ok(Json(task_links(clock.respond(task), &agent_id, &task_id)))
}

/// GET /api/v1/agents/{agent_id}/tasks - List the caller's tasks for an agent.
pub async fn list_tasks(
    State(state): State<AppState>,
    CallerIdentity(caller): CallerIdentity,
    Path(agent_id): Path<String>,
) -> Result<Json<ApiResponse<TaskList>>, AppError> {
    let clock = RequestClock::start();

    let tasks = state.task_service.list_tasks(&agent_id, &caller).await?;

    Ok(Json(clock.respond(tasks).with_link("self", tasks_path(&agent_id))))
}

/// GET /api/v1/agents/{agent_id}/tasks/{id} - Get a task with its trigger.
pub async fn get_task(
    State(state): State<AppState>,
    CallerIdentity(caller): CallerIdentity,
    Path((agent_id, id)): Path<(String, String)>,
) -> Result<Json<ApiResponse<Task>>, AppError> {
    let clock = RequestClock::start();

    let task = state
        .task_service
        .get_task(&TaskScope::new(&agent_id, &id), &caller)
        .await?;

    Ok(Json(task_links(clock.respond(task), &agent_id, &id)))
}

/// PUT /api/v1/agents/{agent_id}/tasks/{id} - Replace a task's manifest.
pub async fn update_task(
    State(state): State<AppState>,
    CallerIdentity(caller): CallerIdentity,
    Path((agent_id, id)): Path<(String, String)>,
    Json(body): Json<TaskManifest>,
) -> Result<Json<ApiResponse<Task>>, AppError> {
    let clock = RequestClock::start();

    let task = state
        .task_service
        .update_task(&TaskScope::new(&agent_id, &id), &caller, body)
        .await?;

    Ok(Json(task_links(clock.respond(task), &agent_id, &id)))
}

/// DELETE /api/v1/agents/{agent_id}/tasks/{id} - Delete a task and its triggers.
///
/// Deleting a task that does not exist succeeds.
pub async fn delete_task(
    State(state): State<AppState>,
    CallerIdentity(caller): CallerIdentity,
    Path((agent_id, id)): Path<(String, String)>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let clock = RequestClock::start();

    state
        .task_service
        .delete_task(&TaskScope::new(&agent_id, &id), &caller)
        .await?;

    let resp = clock
        .respond(serde_json::json!({"deleted": true, "id": id}))
        .with_link("tasks", tasks_path(&agent_id));
    Ok(Json(resp))
}
