//! Application state wiring all services together.
//!
//! Services are generic over the store, invoker and event-log ports; AppState
//! pins them to the in-memory infra implementations.

use std::sync::Arc;

use tasklane_core::event::EventBridge;
use tasklane_core::naming::ResourceNamer;
use tasklane_core::run::RunService;
use tasklane_core::store::ObjectStore;
use tasklane_core::task::TaskService;
use tasklane_infra::engine::LocalInvoker;
use tasklane_infra::memory::{InMemoryEventLog, InMemoryObjectStore};
use tasklane_types::config::TasklaneConfig;
use tasklane_types::resource::ObjectMeta;
use tasklane_types::workflow::{Agent, AgentManifest};

pub type Store = InMemoryObjectStore;

/// Concrete type aliases for the service generics pinned to infra implementations.
pub type ConcreteTaskService = TaskService<Store>;
pub type ConcreteRunService = RunService<Store, LocalInvoker<Store>>;
pub type ConcreteEventBridge = EventBridge<Store, InMemoryEventLog>;

/// Shared application state holding all services.
#[derive(Clone)]
pub struct AppState {
    pub task_service: Arc<ConcreteTaskService>,
    pub run_service: Arc<ConcreteRunService>,
    pub event_bridge: Arc<ConcreteEventBridge>,
    pub store: Arc<Store>,
    /// Engine-facing event log; handlers only read it through `event_bridge`.
    #[allow(dead_code)]
    pub events: Arc<InMemoryEventLog>,
}

impl AppState {
    pub fn new(config: &TasklaneConfig) -> Self {
        let store = Arc::new(InMemoryObjectStore::new());
        let events = Arc::new(InMemoryEventLog::with_retention(config.runs.event_retention));
        let namer = ResourceNamer::new(config.naming.clone());
        let invoker = Arc::new(LocalInvoker::new(Arc::clone(&store)));

        let task_service = TaskService::new(Arc::clone(&store), namer.clone());
        let run_service = RunService::new(
            Arc::clone(&store),
            invoker,
            namer.clone(),
            config.runs.clone(),
        );
        let event_bridge = EventBridge::new(
            Arc::clone(&store),
            Arc::clone(&events),
            namer,
            config.runs.clone(),
        );

        Self {
            task_service: Arc::new(task_service),
            run_service: Arc::new(run_service),
            event_bridge: Arc::new(event_bridge),
            store,
            events,
        }
    }

    /// Register agents so tasks can be created under them.
    ///
    /// Agents that already exist are left untouched.
    pub async fn register_agents(&self, names: &[String]) -> anyhow::Result<()> {
        for name in names {
            let agent = Agent {
                metadata: ObjectMeta::named(name.as_str()),
                manifest: AgentManifest {
                    name: name.clone(),
                    ..Default::default()
                },
            };
            match self.store.create(agent).await {
                Ok(_) => tracing::info!(agent = %name, "registered agent"),
                Err(e) if e.is_already_exists() => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}
