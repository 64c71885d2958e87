//! Axum router configuration with middleware.
//!
//! All task routes are under `/api/v1/agents/{agent_id}/tasks`.
//! Middleware: CORS, tracing.

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Tasks
        .route(
            "/agents/{agent_id}/tasks",
            post(handlers::task::create_task).get(handlers::task::list_tasks),
        )
        .route(
            "/agents/{agent_id}/tasks/{id}",
            get(handlers::task::get_task)
                .put(handlers::task::update_task)
                .delete(handlers::task::delete_task),
        )
        // Runs
        .route(
            "/agents/{agent_id}/tasks/{id}/run",
            post(handlers::run::launch_run),
        )
        .route(
            "/agents/{agent_id}/tasks/{id}/runs",
            get(handlers::run::list_runs),
        )
        .route(
            "/agents/{agent_id}/tasks/{id}/runs/{run_id}",
            get(handlers::run::get_run).delete(handlers::run::delete_run),
        )
        .route(
            "/agents/{agent_id}/tasks/{id}/abort",
            post(handlers::run::abort_editor_run),
        )
        .route(
            "/agents/{agent_id}/tasks/{id}/runs/{run_id}/abort",
            post(handlers::run::abort_run),
        )
        // Event streams (SSE)
        .route(
            "/agents/{agent_id}/tasks/{id}/events",
            get(handlers::run::stream_editor_events),
        )
        .route(
            "/agents/{agent_id}/tasks/{id}/runs/{run_id}/events",
            get(handlers::run::stream_run_events),
        );

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health - Liveness probe (no caller identity required).
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use serde_json::{Value, json};
    use tasklane_types::config::TasklaneConfig;
    use tower::ServiceExt;

    use super::*;

    async fn app() -> Router {
        let state = AppState::new(&TasklaneConfig::default());
        state.register_agents(&["a1".to_string()]).await.unwrap();
        build_router(state)
    }

    fn request(method: Method, uri: &str, user: Option<&str>, body: Body) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(user) = user {
            builder = builder.header("x-user-id", user);
        }
        builder.body(body).unwrap()
    }

    fn json_body(value: Value) -> Body {
        Body::from(value.to_string())
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn create(app: &Router, user: &str, manifest: Value) -> String {
        let (status, body) = send(
            app,
            request(Method::POST, "/api/v1/agents/a1/tasks", Some(user), json_body(manifest)),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["data"]["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn health_needs_no_identity() {
        let app = app().await;
        let (status, body) = send(&app, request(Method::GET, "/health", None, Body::empty())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn missing_identity_is_unauthorized() {
        let app = app().await;
        let (status, body) = send(
            &app,
            request(Method::GET, "/api/v1/agents/a1/tasks", None, Body::empty()),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["errors"][0]["code"], "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn task_lifecycle_over_http() {
        let app = app().await;
        let id = create(
            &app,
            "alice",
            json!({"name": "hourly", "schedule": "0 * * * *", "steps": [{"id": "s1", "step": "check"}]}),
        )
        .await;
        let uri = format!("/api/v1/agents/a1/tasks/{id}");

        let (status, body) = send(&app, request(Method::GET, &uri, Some("alice"), Body::empty())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["schedule"], "0 * * * *");
        assert_eq!(body["_links"]["self"], uri);

        let (status, body) = send(
            &app,
            request(Method::PUT, &uri, Some("alice"), json_body(json!({"name": "hourly", "webhook": {}}))),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["data"].get("schedule").is_none());
        assert_eq!(body["data"]["webhook"], json!({}));

        let (status, body) = send(&app, request(Method::GET, &uri, Some("bob"), Body::empty())).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["errors"][0]["code"], "FORBIDDEN");

        let (status, _) = send(&app, request(Method::DELETE, &uri, Some("alice"), Body::empty())).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = send(&app, request(Method::DELETE, &uri, Some("alice"), Body::empty())).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn multiple_triggers_are_a_validation_error() {
        let app = app().await;
        let (status, body) = send(
            &app,
            request(
                Method::POST,
                "/api/v1/agents/a1/tasks",
                Some("alice"),
                json_body(json!({"name": "x", "schedule": "0 * * * *", "email": {}})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errors"][0]["code"], "VALIDATION_ERROR");
        assert!(body["data"].is_null());
    }

    #[tokio::test]
    async fn unknown_agent_is_not_found() {
        let app = app().await;
        let (status, body) = send(
            &app,
            request(Method::GET, "/api/v1/agents/nope/tasks", Some("alice"), Body::empty()),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["errors"][0]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn runs_over_http() {
        let app = app().await;
        let id = create(&app, "alice", json!({"name": "digest"})).await;
        let task = format!("/api/v1/agents/a1/tasks/{id}");

        let (status, body) = send(
            &app,
            request(Method::POST, &format!("{task}/run"), Some("alice"), Body::from("{}")),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["data"].get("input").is_none());
        let run_id = body["data"]["id"].as_str().unwrap().to_string();

        let (status, body) = send(
            &app,
            request(Method::POST, &format!("{task}/run?step=s1"), Some("alice"), Body::empty()),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["step_id"], "s1");

        let (status, body) = send(&app, request(Method::GET, &format!("{task}/runs"), Some("alice"), Body::empty())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["items"].as_array().unwrap().len(), 1);

        let run_uri = format!("{task}/runs/{run_id}");
        let (status, _) = send(&app, request(Method::GET, &run_uri, Some("bob"), Body::empty())).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = send(&app, request(Method::DELETE, &run_uri, Some("alice"), Body::empty())).await;
        assert_eq!(status, StatusCode::OK);
        let (status, body) = send(&app, request(Method::GET, &run_uri, Some("alice"), Body::empty())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["errors"][0]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn non_utf8_run_input_is_rejected() {
        let app = app().await;
        let id = create(&app, "alice", json!({"name": "digest"})).await;

        let (status, body) = send(
            &app,
            request(
                Method::POST,
                &format!("/api/v1/agents/a1/tasks/{id}/run"),
                Some("alice"),
                Body::from(vec![0xffu8, 0xfe]),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errors"][0]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn other_users_event_stream_is_forbidden() {
        let app = app().await;
        let id = create(&app, "alice", json!({"name": "digest"})).await;

        let (status, body) = send(
            &app,
            request(Method::GET, &format!("/api/v1/agents/a1/tasks/{id}/events"), Some("bob"), Body::empty()),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["errors"][0]["code"], "FORBIDDEN");
    }

    #[tokio::test]
    async fn event_stream_emits_named_sse_frames() {
        use futures_util::StreamExt;
        use tasklane_core::store::{ObjectStore, update_with_retry};
        use tasklane_types::event::{RunEvent, RunEventKind};
        use tasklane_types::resource::ObjectMeta;
        use tasklane_types::workflow::{RunPhase, Thread, ThreadSpec, WorkflowExecution};

        let state = AppState::new(&TasklaneConfig::default());
        state.register_agents(&["a1".to_string()]).await.unwrap();
        let app = build_router(state.clone());

        let id = create(&app, "alice", json!({"name": "digest"})).await;
        let task = format!("/api/v1/agents/a1/tasks/{id}");
        let (_, body) = send(&app, request(Method::POST, &format!("{task}/run"), Some("alice"), Body::empty())).await;
        let run_id = body["data"]["id"].as_str().unwrap().to_string();

        state
            .store
            .create(Thread {
                metadata: ObjectMeta::named("t1-worker"),
                spec: ThreadSpec {
                    agent_name: "a1".to_string(),
                    user_id: "alice".to_string(),
                    workflow_execution_name: Some(run_id.clone()),
                    ..Default::default()
                },
            })
            .await
            .unwrap();
        update_with_retry(state.store.as_ref(), &run_id, |run: &mut WorkflowExecution| {
            run.status.thread_name = Some("t1-worker".to_string());
            run.status.phase = RunPhase::ThreadAttached;
            true
        })
        .await
        .unwrap();
        state
            .events
            .append(RunEvent::new(
                "r1",
                "t1-worker",
                RunEventKind::Content {
                    content: "hello".to_string(),
                },
            ))
            .await;

        let resp = app
            .clone()
            .oneshot(request(
                Method::GET,
                &format!("{task}/runs/{run_id}/events"),
                Some("alice"),
                Body::empty(),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let mut frames = resp.into_body().into_data_stream();
        let chunk = tokio::time::timeout(std::time::Duration::from_secs(5), frames.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        let text = String::from_utf8(chunk.to_vec()).unwrap();
        assert!(text.contains("event: content"), "{text}");
        assert!(text.contains("\"content\":\"hello\""), "{text}");
    }
}
