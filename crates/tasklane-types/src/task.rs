//! User-facing Task types.
//!
//! A Task is the declarative automation unit users edit: a tree of steps
//! plus at most one trigger. It is stored as a [`Workflow`](crate::workflow::Workflow)
//! whose name is the Task ID; trigger state lives in side resources.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TaskError;
use crate::workflow::RunPhase;

// ---------------------------------------------------------------------------
// Manifest
// ---------------------------------------------------------------------------

/// The editable body of a Task.
///
/// On the wire the trigger is four optional fields; [`TaskManifest::trigger`]
/// collapses them into a single [`Trigger`] and rejects manifests that set
/// more than one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskManifest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub steps: Vec<TaskStep>,
    /// Cron expression.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook: Option<TaskWebhook>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<TaskEmail>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_demand: Option<TaskOnDemand>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStep {
    pub id: String,
    #[serde(default)]
    pub step: String,
    #[serde(rename = "if", default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<TaskIf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskIf {
    pub condition: String,
    #[serde(default)]
    pub steps: Vec<TaskStep>,
    #[serde(rename = "else", default)]
    pub else_steps: Vec<TaskStep>,
}

/// Marker for a webhook trigger. Configuration is derived from the Task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskWebhook {}

/// Marker for an inbound email trigger. Configuration is derived from the Task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskEmail {}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskOnDemand {
    /// Parameter name -> description.
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

// ---------------------------------------------------------------------------
// Trigger
// ---------------------------------------------------------------------------

/// The single trigger a Task declares.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Trigger {
    #[default]
    None,
    Schedule(String),
    Webhook,
    Email,
    OnDemand(BTreeMap<String, String>),
}

impl Trigger {
    pub fn schedule(&self) -> Option<&str> {
        match self {
            Trigger::Schedule(schedule) => Some(schedule),
            _ => None,
        }
    }

    pub fn is_webhook(&self) -> bool {
        matches!(self, Trigger::Webhook)
    }

    pub fn is_email(&self) -> bool {
        matches!(self, Trigger::Email)
    }
}

impl TaskManifest {
    /// The declared trigger, or a validation error if more than one of
    /// `schedule`, `webhook`, `email`, `on_demand` is set.
    pub fn trigger(&self) -> Result<Trigger, TaskError> {
        match (&self.schedule, &self.webhook, &self.email, &self.on_demand) {
            (None, None, None, None) => Ok(Trigger::None),
            (Some(schedule), None, None, None) => Ok(Trigger::Schedule(schedule.clone())),
            (None, Some(_), None, None) => Ok(Trigger::Webhook),
            (None, None, Some(_), None) => Ok(Trigger::Email),
            (None, None, None, Some(on_demand)) => Ok(Trigger::OnDemand(on_demand.params.clone())),
            _ => Err(TaskError::Validation(
                "only one trigger is allowed: schedule, webhook, email, or on_demand".to_string(),
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// API shapes
// ---------------------------------------------------------------------------

/// The authenticated caller of an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user_id: String,
}

impl Caller {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }
}

/// Path scoping for task operations: `/agents/{agent_id}/tasks/{task_id}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskScope {
    pub agent_id: String,
    pub task_id: String,
}

impl TaskScope {
    pub fn new(agent_id: impl Into<String>, task_id: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            task_id: task_id.into(),
        }
    }
}

/// A Task as returned to callers, with its trigger projected from the side
/// resources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub agent_id: String,
    pub alias: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub manifest: TaskManifest,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskList {
    pub items: Vec<Task>,
}

/// A Run as returned to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRun {
    pub id: String,
    pub task_id: String,
    /// Snapshot of the task manifest (without trigger state).
    pub task: TaskManifest,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_id: Option<String>,
    pub phase: RunPhase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskRunList {
    pub items: Vec<TaskRun>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest() -> TaskManifest {
        TaskManifest {
            name: "digest".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_no_trigger() {
        assert_eq!(manifest().trigger().unwrap(), Trigger::None);
    }

    #[test]
    fn test_single_triggers() {
        let mut m = manifest();
        m.schedule = Some("0 * * * *".to_string());
        assert_eq!(m.trigger().unwrap().schedule(), Some("0 * * * *"));

        let mut m = manifest();
        m.webhook = Some(TaskWebhook {});
        assert!(m.trigger().unwrap().is_webhook());

        let mut m = manifest();
        m.email = Some(TaskEmail {});
        assert!(m.trigger().unwrap().is_email());

        let mut m = manifest();
        m.on_demand = Some(TaskOnDemand {
            params: BTreeMap::from([("city".to_string(), "City to check".to_string())]),
        });
        match m.trigger().unwrap() {
            Trigger::OnDemand(params) => assert_eq!(params["city"], "City to check"),
            other => panic!("unexpected trigger: {other:?}"),
        }
    }

    #[test]
    fn test_multiple_triggers_rejected() {
        let mut m = manifest();
        m.schedule = Some("0 * * * *".to_string());
        m.webhook = Some(TaskWebhook {});
        assert!(matches!(m.trigger(), Err(TaskError::Validation(_))));

        let mut m = manifest();
        m.email = Some(TaskEmail {});
        m.on_demand = Some(TaskOnDemand::default());
        assert!(matches!(m.trigger(), Err(TaskError::Validation(_))));
    }

    #[test]
    fn test_manifest_deserializes_empty_trigger_objects() {
        let m: TaskManifest =
            serde_json::from_str(r#"{"name":"hook","webhook":{},"steps":[{"id":"s1","step":"do it"}]}"#)
                .unwrap();
        assert!(m.webhook.is_some());
        assert!(m.email.is_none());
        assert_eq!(m.steps[0].id, "s1");
    }

    #[test]
    fn test_task_flattens_manifest() {
        let task = Task {
            id: "w1abc".to_string(),
            agent_id: "a1".to_string(),
            alias: "0123456789abcdef".to_string(),
            created_at: None,
            manifest: TaskManifest {
                name: "digest".to_string(),
                schedule: Some("0 * * * *".to_string()),
                ..Default::default()
            },
        };
        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["name"], "digest");
        assert_eq!(json["schedule"], "0 * * * *");
        assert!(json.get("webhook").is_none());
    }
}
