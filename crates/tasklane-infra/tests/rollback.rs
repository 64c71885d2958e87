mod common;

use std::sync::Arc;

use common::{AGENT, alice, manifest};
use tasklane_core::naming::ResourceNamer;
use tasklane_core::store::{ObjectStore, StoreChange};
use tasklane_core::task::TaskService;
use tasklane_infra::memory::InMemoryObjectStore;
use tasklane_types::error::{StoreError, TaskError};
use tasklane_types::resource::{FieldSelector, ObjectMeta, Resource, ResourceKind};
use tasklane_types::task::TaskWebhook;
use tasklane_types::workflow::{Agent, AgentManifest};
use tokio::sync::broadcast;

/// Object store whose creates of one resource kind always fail.
struct FailingCreates {
    inner: InMemoryObjectStore,
    kind: ResourceKind,
}

impl ObjectStore for FailingCreates {
    async fn get<R: Resource>(&self, name: &str) -> Result<R, StoreError> {
        self.inner.get(name).await
    }

    async fn list<R: Resource>(&self, selector: &FieldSelector) -> Result<Vec<R>, StoreError> {
        self.inner.list(selector).await
    }

    async fn create<R: Resource>(&self, resource: R) -> Result<R, StoreError> {
        if R::KIND == self.kind {
            return Err(StoreError::Backend("disk full".to_string()));
        }
        self.inner.create(resource).await
    }

    async fn update<R: Resource>(&self, resource: R) -> Result<R, StoreError> {
        self.inner.update(resource).await
    }

    async fn delete<R: Resource>(&self, name: &str) -> Result<(), StoreError> {
        self.inner.delete::<R>(name).await
    }

    fn changes(&self) -> broadcast::Receiver<StoreChange> {
        self.inner.changes()
    }
}

#[tokio::test]
async fn failed_trigger_creation_rolls_back_task() {
    let store = Arc::new(FailingCreates {
        inner: InMemoryObjectStore::new(),
        kind: ResourceKind::Webhook,
    });
    store
        .create(Agent {
            metadata: ObjectMeta::named(AGENT),
            manifest: AgentManifest::default(),
        })
        .await
        .unwrap();
    let tasks = TaskService::new(Arc::clone(&store), ResourceNamer::default());

    let mut m = manifest("hook");
    m.webhook = Some(TaskWebhook {});
    let err = tasks.create_task(AGENT, &alice(), m).await.unwrap_err();

    match err {
        TaskError::Store(StoreError::Backend(msg)) => assert_eq!(msg, "disk full"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(store.inner.count(ResourceKind::Workflow), 0);
    assert_eq!(store.inner.count(ResourceKind::Webhook), 0);
}

#[tokio::test]
async fn task_without_failing_trigger_is_unaffected() {
    let store = Arc::new(FailingCreates {
        inner: InMemoryObjectStore::new(),
        kind: ResourceKind::Webhook,
    });
    store
        .create(Agent {
            metadata: ObjectMeta::named(AGENT),
            manifest: AgentManifest::default(),
        })
        .await
        .unwrap();
    let tasks = TaskService::new(Arc::clone(&store), ResourceNamer::default());

    let mut m = manifest("hourly");
    m.schedule = Some("0 * * * *".to_string());
    let task = tasks.create_task(AGENT, &alice(), m).await.unwrap();

    assert_eq!(task.manifest.schedule.as_deref(), Some("0 * * * *"));
    assert_eq!(store.inner.count(ResourceKind::Workflow), 1);
}
