mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{AGENT, Harness, alice, bob, manifest, scope};
use futures_util::StreamExt;
use tasklane_types::config::RunConfig;
use tasklane_types::error::TaskError;
use tasklane_types::event::{RunEvent, RunEventKind};
use tokio_util::sync::CancellationToken;

fn content(run_id: &str, thread: &str, text: &str) -> RunEvent {
    RunEvent::new(
        run_id,
        thread,
        RunEventKind::Content {
            content: text.to_string(),
        },
    )
}

#[tokio::test(start_paused = true)]
async fn never_attached_run_times_out() {
    let h = Harness::new().await;
    let task = h.tasks.create_task(AGENT, &alice(), manifest("digest")).await.unwrap();
    let run = h.runs.launch(&scope(&task.id), &alice(), b"", None).await.unwrap();

    let err = h
        .bridge
        .stream_events(&scope(&task.id), Some(&run.id), &alice(), CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, TaskError::Timeout(_)));
}

#[tokio::test(start_paused = true)]
async fn missing_run_times_out_rather_than_not_found() {
    let h = Harness::with_config(RunConfig {
        attach_timeout_secs: 5,
        ..Default::default()
    })
    .await;
    let task = h.tasks.create_task(AGENT, &alice(), manifest("digest")).await.unwrap();

    let err = h
        .bridge
        .stream_events(&scope(&task.id), None, &alice(), CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, TaskError::Timeout(_)));
}

#[tokio::test]
async fn replays_history_then_follows_live_events() {
    let h = Harness::new().await;
    let task = h.tasks.create_task(AGENT, &alice(), manifest("digest")).await.unwrap();
    let run = h.runs.launch(&scope(&task.id), &alice(), b"", None).await.unwrap();
    h.attach(&run.id, "t1-worker", "alice").await;

    h.events.append(content("r1", "t1-worker", "earlier")).await;
    h.events.append(content("r9", "t1-unrelated", "noise")).await;

    let cancel = CancellationToken::new();
    let mut watch = h
        .bridge
        .stream_events(&scope(&task.id), Some(&run.id), &alice(), cancel.clone())
        .await
        .unwrap();
    assert_eq!(watch.cursor.as_deref(), Some("1"));

    let first = watch.events.next().await.unwrap();
    assert_eq!(first.kind, RunEventKind::Content { content: "earlier".to_string() });

    h.events
        .append(content("r2", "t1-child", "nested").with_parent("t1-worker"))
        .await;
    let live = tokio::time::timeout(Duration::from_secs(1), watch.events.next())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(live.thread_name, "t1-child");

    cancel.cancel();
    let end = tokio::time::timeout(Duration::from_secs(1), watch.events.next())
        .await
        .unwrap();
    assert!(end.is_none());
}

#[tokio::test]
async fn waits_for_a_run_that_does_not_exist_yet() {
    let h = Arc::new(Harness::new().await);
    let task = h.tasks.create_task(AGENT, &alice(), manifest("digest")).await.unwrap();
    let s = scope(&task.id);

    let engine = {
        let h = Arc::clone(&h);
        let s = s.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            let editor = h.runs.launch(&s, &alice(), b"", Some("s1")).await.unwrap();
            h.attach(&editor.id, "t1-editor", "alice").await;
            h.events.append(content("r1", "t1-editor", "hello")).await;
        })
    };

    let watch = h
        .bridge
        .stream_events(&s, None, &alice(), CancellationToken::new())
        .await
        .unwrap();
    engine.await.unwrap();

    let mut events = watch.events;
    let event = tokio::time::timeout(Duration::from_secs(1), events.next())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(event.thread_name, "t1-editor");
}

#[tokio::test]
async fn other_users_run_stream_is_forbidden() {
    let h = Harness::new().await;
    let alices_task = h.tasks.create_task(AGENT, &alice(), manifest("digest")).await.unwrap();
    let bobs_task = h.tasks.create_task(AGENT, &bob(), manifest("bobs")).await.unwrap();
    let run = h
        .runs
        .launch(&scope(&alices_task.id), &alice(), b"", None)
        .await
        .unwrap();
    h.attach(&run.id, "t1-worker", "alice").await;

    let err = h
        .bridge
        .stream_events(&scope(&bobs_task.id), Some(&run.id), &bob(), CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, TaskError::Forbidden(_)));
}

#[tokio::test]
async fn cancelled_before_attachment_is_cancelled() {
    let h = Harness::new().await;
    let task = h.tasks.create_task(AGENT, &alice(), manifest("digest")).await.unwrap();
    let run = h.runs.launch(&scope(&task.id), &alice(), b"", None).await.unwrap();

    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = h
        .bridge
        .stream_events(&scope(&task.id), Some(&run.id), &alice(), cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, TaskError::Cancelled));
}
