//! Object store resource model.
//!
//! Every stored entity implements [`Resource`]: it has a kind, an
//! [`ObjectMeta`] (name, optional generate-name prefix, resource version),
//! and a set of indexed fields that list queries can filter on with a
//! [`FieldSelector`].

use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Kinds of resources held by the object store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Agent,
    Thread,
    Workflow,
    WorkflowExecution,
    CronJob,
    Webhook,
    EmailReceiver,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Agent => "agent",
            ResourceKind::Thread => "thread",
            ResourceKind::Workflow => "workflow",
            ResourceKind::WorkflowExecution => "workflow_execution",
            ResourceKind::CronJob => "cron_job",
            ResourceKind::Webhook => "webhook",
            ResourceKind::EmailReceiver => "email_receiver",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata common to every stored resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMeta {
    /// Unique name within the resource kind. Empty until assigned when
    /// `generate_name` is used.
    #[serde(default)]
    pub name: String,
    /// Prefix for a store-generated name. Only consulted on create when
    /// `name` is empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generate_name: Option<String>,
    /// Optimistic concurrency token. Bumped by the store on every write;
    /// an update carrying a stale version fails with `Conflict`.
    #[serde(default)]
    pub resource_version: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl ObjectMeta {
    /// Metadata for a resource with a caller-chosen name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Metadata for a resource whose name the store generates from `prefix`.
    pub fn generated(prefix: impl Into<String>) -> Self {
        Self {
            generate_name: Some(prefix.into()),
            ..Default::default()
        }
    }
}

/// Fields the object store indexes for equality filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexField {
    /// Owning user ID.
    UserId,
    /// Owning agent name.
    AgentName,
    /// Owning task / workflow reference.
    WorkflowName,
}

/// Conjunction of equality predicates over indexed fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldSelector {
    terms: Vec<(IndexField, String)>,
}

impl FieldSelector {
    /// Selector matching every resource.
    pub fn all() -> Self {
        Self::default()
    }

    /// Add an equality term.
    pub fn eq(mut self, field: IndexField, value: impl Into<String>) -> Self {
        self.terms.push((field, value.into()));
        self
    }

    /// Whether a resource with the given indexed values satisfies every term.
    pub fn matches(&self, fields: &[(IndexField, String)]) -> bool {
        self.terms.iter().all(|(field, value)| {
            fields
                .iter()
                .any(|(candidate, actual)| candidate == field && actual == value)
        })
    }
}

/// A resource that can be persisted in the object store.
pub trait Resource: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
    const KIND: ResourceKind;

    fn meta(&self) -> &ObjectMeta;

    fn meta_mut(&mut self) -> &mut ObjectMeta;

    /// Values of the indexed fields for this resource.
    fn index_fields(&self) -> Vec<(IndexField, String)> {
        Vec::new()
    }

    fn name(&self) -> &str {
        &self.meta().name
    }
}

/// A resource that belongs to a (user, task) pair.
///
/// Runs and trigger resources record both owners so access can be
/// authorized without consulting the task itself.
pub trait TaskOwned {
    fn owner_user_id(&self) -> &str;

    fn owner_task_id(&self) -> &str;
}
