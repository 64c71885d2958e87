//! Engine-facing resources: agents, threads, workflows and workflow
//! executions (runs).
//!
//! `Workflow` is the stored form of a Task; its name is the Task ID.
//! `WorkflowExecution` is a Run. The async engine attaches a `Thread` to a
//! run by setting `status.thread_name`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::resource::{IndexField, ObjectMeta, Resource, ResourceKind, TaskOwned};

// ---------------------------------------------------------------------------
// Manifests
// ---------------------------------------------------------------------------

/// Base configuration of an agent. Workflows start from a copy of it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentManifest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub prompt: String,
    /// Tool identifiers available to the agent, in declaration order.
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// The manifest consumed by the execution engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowManifest {
    #[serde(flatten)]
    pub agent: AgentManifest,
    #[serde(default)]
    pub steps: Vec<Step>,
    /// Parameter name -> description, for on-demand invocation.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, String>,
    /// External token for the task; assigned once, never changed.
    #[serde(default)]
    pub alias: String,
}

/// A workflow step, optionally branching.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub id: String,
    #[serde(default)]
    pub step: String,
    #[serde(rename = "if", default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<If>,
}

/// Conditional branch: `steps` when `condition` holds, `else_steps` otherwise.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct If {
    pub condition: String,
    #[serde(default)]
    pub steps: Vec<Step>,
    #[serde(rename = "else", default)]
    pub else_steps: Vec<Step>,
}

// ---------------------------------------------------------------------------
// Agent / Thread
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Agent {
    pub metadata: ObjectMeta,
    pub manifest: AgentManifest,
}

impl Resource for Agent {
    const KIND: ResourceKind = ResourceKind::Agent;

    fn meta(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn meta_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
}

/// The worker unit that actually executes steps.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Thread {
    pub metadata: ObjectMeta,
    pub spec: ThreadSpec,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThreadSpec {
    #[serde(default)]
    pub agent_name: String,
    #[serde(default)]
    pub user_id: String,
    /// Tools the user added to their personal thread with this agent.
    #[serde(default)]
    pub tools: Vec<String>,
    /// Set to request that the engine stop the thread.
    #[serde(default)]
    pub abort: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_thread_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_execution_name: Option<String>,
}

impl Resource for Thread {
    const KIND: ResourceKind = ResourceKind::Thread;

    fn meta(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn meta_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }

    fn index_fields(&self) -> Vec<(IndexField, String)> {
        vec![
            (IndexField::UserId, self.spec.user_id.clone()),
            (IndexField::AgentName, self.spec.agent_name.clone()),
        ]
    }
}

// ---------------------------------------------------------------------------
// Workflow (stored Task)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Workflow {
    pub metadata: ObjectMeta,
    pub spec: WorkflowSpec,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkflowSpec {
    pub agent_name: String,
    pub user_id: String,
    pub manifest: WorkflowManifest,
}

impl Resource for Workflow {
    const KIND: ResourceKind = ResourceKind::Workflow;

    fn meta(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn meta_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }

    fn index_fields(&self) -> Vec<(IndexField, String)> {
        vec![
            (IndexField::UserId, self.spec.user_id.clone()),
            (IndexField::AgentName, self.spec.agent_name.clone()),
        ]
    }
}

// ---------------------------------------------------------------------------
// WorkflowExecution (Run)
// ---------------------------------------------------------------------------

/// Lifecycle phase of a run.
///
/// `Created` is entered by the orchestrator. The remaining transitions are
/// driven by the async engine and only observed here.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    #[default]
    Created,
    ThreadPending,
    ThreadAttached,
    Completed,
    Aborted,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkflowExecution {
    pub metadata: ObjectMeta,
    pub spec: WorkflowExecutionSpec,
    #[serde(default)]
    pub status: WorkflowExecutionStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkflowExecutionSpec {
    /// Name of the owning workflow (the Task ID).
    pub workflow_name: String,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
    /// Step the editor run was last advanced to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkflowExecutionStatus {
    /// Set asynchronously by the engine once a worker thread is attached.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_name: Option<String>,
    #[serde(default)]
    pub phase: RunPhase,
}

impl WorkflowExecution {
    /// The attached thread, if the engine has attached one.
    pub fn attached_thread(&self) -> Option<&str> {
        self.status
            .thread_name
            .as_deref()
            .filter(|name| !name.is_empty())
    }
}

impl Resource for WorkflowExecution {
    const KIND: ResourceKind = ResourceKind::WorkflowExecution;

    fn meta(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn meta_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }

    fn index_fields(&self) -> Vec<(IndexField, String)> {
        vec![
            (IndexField::UserId, self.spec.user_id.clone()),
            (IndexField::WorkflowName, self.spec.workflow_name.clone()),
        ]
    }
}

impl TaskOwned for WorkflowExecution {
    fn owner_user_id(&self) -> &str {
        &self.spec.user_id
    }

    fn owner_task_id(&self) -> &str {
        &self.spec.workflow_name
    }
}
