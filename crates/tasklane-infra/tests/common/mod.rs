#![allow(dead_code)]

use std::sync::Arc;

use tasklane_core::event::EventBridge;
use tasklane_core::naming::ResourceNamer;
use tasklane_core::run::RunService;
use tasklane_core::store::{ObjectStore, update_with_retry};
use tasklane_core::task::TaskService;
use tasklane_infra::engine::LocalInvoker;
use tasklane_infra::memory::{InMemoryEventLog, InMemoryObjectStore};
use tasklane_types::config::{NamingConfig, RunConfig};
use tasklane_types::resource::ObjectMeta;
use tasklane_types::task::{Caller, TaskManifest, TaskScope, TaskStep};
use tasklane_types::workflow::{
    Agent, AgentManifest, RunPhase, Thread, ThreadSpec, WorkflowExecution,
};

pub const AGENT: &str = "a1";

pub type Store = InMemoryObjectStore;

pub struct Harness {
    pub store: Arc<Store>,
    pub events: Arc<InMemoryEventLog>,
    pub namer: ResourceNamer,
    pub tasks: TaskService<Store>,
    pub runs: RunService<Store, LocalInvoker<Store>>,
    pub bridge: EventBridge<Store, InMemoryEventLog>,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_config(RunConfig::default()).await
    }

    pub async fn with_config(config: RunConfig) -> Self {
        let store = Arc::new(InMemoryObjectStore::new());
        let events = Arc::new(InMemoryEventLog::with_retention(config.event_retention));
        let namer = ResourceNamer::new(NamingConfig::default());
        let invoker = Arc::new(LocalInvoker::new(Arc::clone(&store)));

        store
            .create(Agent {
                metadata: ObjectMeta::named(AGENT),
                manifest: AgentManifest {
                    name: "helper".to_string(),
                    description: "General helper".to_string(),
                    prompt: "Be helpful.".to_string(),
                    tools: vec!["web-search".to_string()],
                    model: None,
                },
            })
            .await
            .unwrap();

        Self {
            tasks: TaskService::new(Arc::clone(&store), namer.clone()),
            runs: RunService::new(Arc::clone(&store), invoker, namer.clone(), config.clone()),
            bridge: EventBridge::new(Arc::clone(&store), Arc::clone(&events), namer.clone(), config),
            store,
            events,
            namer,
        }
    }

    /// Simulate the engine attaching a worker thread to a run.
    pub async fn attach(&self, run_name: &str, thread_name: &str, user: &str) {
        self.store
            .create(Thread {
                metadata: ObjectMeta::named(thread_name),
                spec: ThreadSpec {
                    agent_name: AGENT.to_string(),
                    user_id: user.to_string(),
                    workflow_execution_name: Some(run_name.to_string()),
                    ..Default::default()
                },
            })
            .await
            .unwrap();

        update_with_retry(self.store.as_ref(), run_name, |run: &mut WorkflowExecution| {
            run.status.thread_name = Some(thread_name.to_string());
            run.status.phase = RunPhase::ThreadAttached;
            true
        })
        .await
        .unwrap();
    }
}

pub fn alice() -> Caller {
    Caller::new("alice")
}

pub fn bob() -> Caller {
    Caller::new("bob")
}

pub fn scope(task_id: &str) -> TaskScope {
    TaskScope::new(AGENT, task_id)
}

pub fn manifest(name: &str) -> TaskManifest {
    TaskManifest {
        name: name.to_string(),
        description: format!("{name} task"),
        steps: vec![TaskStep {
            id: "s1".to_string(),
            step: "Summarize my inbox".to_string(),
            branch: None,
        }],
        ..Default::default()
    }
}
