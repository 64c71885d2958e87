//! Run event types delivered by the event stream.
//!
//! Events are appended by the execution engine. Each belongs to one thread
//! and one engine "run" (a single pass of a thread); nested workflow
//! executions record their parent thread so followers can include them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One event in a thread's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunEvent {
    /// Position in the event log, assigned on append.
    #[serde(default)]
    pub sequence: u64,
    /// Engine run this event belongs to. History replay is bounded by runs.
    pub run_id: String,
    pub thread_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_thread_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_execution: Option<String>,
    pub time: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: RunEventKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEventKind {
    /// The engine started a run on the thread.
    RunStarted {},

    StepStarted { step_id: String },

    /// Incremental output.
    Content { content: String },

    StepFinished { step_id: String },

    RunFinished {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

impl RunEventKind {
    /// Stable name, used as the SSE event name.
    pub fn name(&self) -> &'static str {
        match self {
            RunEventKind::RunStarted {} => "run_started",
            RunEventKind::StepStarted { .. } => "step_started",
            RunEventKind::Content { .. } => "content",
            RunEventKind::StepFinished { .. } => "step_finished",
            RunEventKind::RunFinished { .. } => "run_finished",
        }
    }
}

impl RunEvent {
    pub fn new(run_id: impl Into<String>, thread_name: impl Into<String>, kind: RunEventKind) -> Self {
        Self {
            sequence: 0,
            run_id: run_id.into(),
            thread_name: thread_name.into(),
            parent_thread_name: None,
            workflow_execution: None,
            time: Utc::now(),
            kind,
        }
    }

    /// Mark this event as coming from a thread nested under `parent`.
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent_thread_name = Some(parent.into());
        self
    }
}
