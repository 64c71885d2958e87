//! Run handlers: launch, list, get, delete, abort and the SSE event stream.

use std::convert::Infallible;
use std::time::Duration;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures_util::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;

use tasklane_types::task::{Caller, TaskRun, TaskRunList, TaskScope};

use crate::http::error::AppError;
use crate::http::extractors::auth::CallerIdentity;
use crate::http::extractors::query::RunQuery;
use crate::http::handlers::task_path;
use crate::http::response::{ApiResponse, RequestClock};
use crate::state::AppState;

fn run_links(resp: ApiResponse<TaskRun>, agent_id: &str, task_id: &str) -> ApiResponse<TaskRun> {
    let task = task_path(agent_id, task_id);
    let run = match &resp.data {
        Some(run) => format!("{task}/runs/{}", run.id),
        None => format!("{task}/runs"),
    };
    resp.with_link("events", format!("{run}/events"))
        .with_link("abort", format!("{run}/abort"))
        .with_link("self", run)
        .with_link("task", task)
}

/// POST /api/v1/agents/{agent_id}/tasks/{id}/run?step= - Start a run.
///
/// The body is the raw run input. With `step`, the caller's editor run is
/// advanced to that step instead of creating a new run.
pub async fn launch_run(
    State(state): State<AppState>,
    CallerIdentity(caller): CallerIdentity,
    Path((agent_id, id)): Path<(String, String)>,
    Query(query): Query<RunQuery>,
    body: Bytes,
) -> Result<Json<ApiResponse<TaskRun>>, AppError> {
    let clock = RequestClock::start();

    let run = state
        .run_service
        .launch(
            &TaskScope::new(&agent_id, &id),
            &caller,
            &body,
            query.step.as_deref(),
        )
        .await?;

    Ok(Json(run_links(clock.respond(run), &agent_id, &id)))
}

/// GET /api/v1/agents/{agent_id}/tasks/{id}/runs - List the caller's runs.
pub async fn list_runs(
    State(state): State<AppState>,
    CallerIdentity(caller): CallerIdentity,
    Path((agent_id, id)): Path<(String, String)>,
) -> Result<Json<ApiResponse<TaskRunList>>, AppError> {
    let clock = RequestClock::start();

    let runs = state
        .run_service
        .list_runs(&TaskScope::new(&agent_id, &id), &caller)
        .await?;

    let task = task_path(&agent_id, &id);
    let resp = clock
        .respond(runs)
        .with_link("self", format!("{task}/runs"))
        .with_link("task", task);
    Ok(Json(resp))
}

/// GET /api/v1/agents/{agent_id}/tasks/{id}/runs/{run_id} - Get a run.
pub async fn get_run(
    State(state): State<AppState>,
    CallerIdentity(caller): CallerIdentity,
    Path((agent_id, id, run_id)): Path<(String, String, String)>,
) -> Result<Json<ApiResponse<TaskRun>>, AppError> {
    let clock = RequestClock::start();

    let run = state
        .run_service
        .get_run(&TaskScope::new(&agent_id, &id), &caller, &run_id)
        .await?;

    Ok(Json(run_links(clock.respond(run), &agent_id, &id)))
}

/// DELETE /api/v1/agents/{agent_id}/tasks/{id}/runs/{run_id} - Delete a run.
pub async fn delete_run(
    State(state): State<AppState>,
    CallerIdentity(caller): CallerIdentity,
    Path((agent_id, id, run_id)): Path<(String, String, String)>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let clock = RequestClock::start();

    state
        .run_service
        .delete_run(&TaskScope::new(&agent_id, &id), &caller, &run_id)
        .await?;

    let resp = clock
        .respond(serde_json::json!({"deleted": true, "id": run_id}))
        .with_link("runs", format!("{}/runs", task_path(&agent_id, &id)));
    Ok(Json(resp))
}

/// POST /api/v1/agents/{agent_id}/tasks/{id}/abort - Abort the editor run.
pub async fn abort_editor_run(
    State(state): State<AppState>,
    CallerIdentity(caller): CallerIdentity,
    Path((agent_id, id)): Path<(String, String)>,
) -> Result<Json<ApiResponse<TaskRun>>, AppError> {
    abort(state, caller, agent_id, id, None).await
}

/// POST /api/v1/agents/{agent_id}/tasks/{id}/runs/{run_id}/abort - Abort a run.
pub async fn abort_run(
    State(state): State<AppState>,
    CallerIdentity(caller): CallerIdentity,
    Path((agent_id, id, run_id)): Path<(String, String, String)>,
) -> Result<Json<ApiResponse<TaskRun>>, AppError> {
    abort(state, caller, agent_id, id, Some(run_id)).await
}

async fn abort(
    state: AppState,
    caller: Caller,
    agent_id: String,
    id: String,
    run_id: Option<String>,
) -> Result<Json<ApiResponse<TaskRun>>, AppError> {
    let clock = RequestClock::start();

    // The wait for thread attachment has no deadline. Axum drops this future
    // when the client disconnects, which fires the guard.
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    let run = state
        .run_service
        .abort_run(
            &TaskScope::new(&agent_id, &id),
            &caller,
            run_id.as_deref(),
            &cancel,
        )
        .await?;

    tracing::info!(run = %run.id, task = %id, "run aborted");
    Ok(Json(run_links(clock.respond(run), &agent_id, &id)))
}

/// GET /api/v1/agents/{agent_id}/tasks/{id}/events - Stream editor run events.
pub async fn stream_editor_events(
    State(state): State<AppState>,
    CallerIdentity(caller): CallerIdentity,
    Path((agent_id, id)): Path<(String, String)>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    stream(state, caller, agent_id, id, None).await
}

/// GET /api/v1/agents/{agent_id}/tasks/{id}/runs/{run_id}/events - Stream run events.
pub async fn stream_run_events(
    State(state): State<AppState>,
    CallerIdentity(caller): CallerIdentity,
    Path((agent_id, id, run_id)): Path<(String, String, String)>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    stream(state, caller, agent_id, id, Some(run_id)).await
}

/// Open the event watch and adapt it to SSE frames.
///
/// Each frame is named after the event kind, carries the event as JSON and
/// uses the log sequence as its SSE id. The drop guard travels with the SSE
/// stream, so a client disconnect cancels the watch.
async fn stream(
    state: AppState,
    caller: Caller,
    agent_id: String,
    id: String,
    run_id: Option<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let cancel = CancellationToken::new();
    let guard = cancel.clone().drop_guard();

    let watch = state
        .event_bridge
        .stream_events(
            &TaskScope::new(&agent_id, &id),
            run_id.as_deref(),
            &caller,
            cancel,
        )
        .await?;
    tracing::debug!(task = %id, cursor = ?watch.cursor, "event stream opened");

    let mut events = watch.events;
    let sse_stream = async_stream::stream! {
        let _guard = guard;
        while let Some(event) = events.next().await {
            match serde_json::to_string(&event) {
                Ok(data) => {
                    yield Ok::<_, Infallible>(
                        Event::default()
                            .event(event.kind.name())
                            .id(event.sequence.to_string())
                            .data(data),
                    );
                }
                Err(e) => {
                    tracing::warn!(sequence = event.sequence, error = %e, "dropping unserializable event");
                }
            }
        }
    };

    Ok(Sse::new(sse_stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15))))
}
