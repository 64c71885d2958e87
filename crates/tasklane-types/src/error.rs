use thiserror::Error;

use crate::resource::ResourceKind;

/// Errors returned by object store implementations.
///
/// `NotFound`, `AlreadyExists` and `Conflict` are distinguished conditions
/// that callers branch on; everything else is a backend failure that is
/// propagated unmodified.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("{kind} '{name}' not found")]
    NotFound { kind: ResourceKind, name: String },

    #[error("{kind} '{name}' already exists")]
    AlreadyExists { kind: ResourceKind, name: String },

    #[error("{kind} '{name}' was modified concurrently")]
    Conflict { kind: ResourceKind, name: String },

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, StoreError::AlreadyExists { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}

/// Errors surfaced by task and run operations.
#[derive(Debug, Error)]
pub enum TaskError {
    /// Malformed input (non-UTF-8 payload, multiple triggers, bad schedule).
    /// Always raised before any mutation.
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    /// Ownership mismatch. The message never reveals whether the resource
    /// exists under a different owner.
    #[error("{0}")]
    Forbidden(String),

    /// Waiting for a worker thread to attach exceeded its deadline.
    #[error("timed out waiting for {0}")]
    Timeout(String),

    /// The caller went away while the operation was suspended.
    #[error("request cancelled")]
    Cancelled,

    #[error(transparent)]
    Store(StoreError),
}

impl TaskError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, TaskError::NotFound(_))
    }
}

impl From<StoreError> for TaskError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { .. } => TaskError::NotFound(e.to_string()),
            other => TaskError::Store(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_display() {
        let err = StoreError::NotFound {
            kind: ResourceKind::CronJob,
            name: "cj1-w1abc".to_string(),
        };
        assert_eq!(err.to_string(), "cron_job 'cj1-w1abc' not found");
    }

    #[test]
    fn test_not_found_converts_to_task_not_found() {
        let err: TaskError = StoreError::NotFound {
            kind: ResourceKind::WorkflowExecution,
            name: "we1-abc".to_string(),
        }
        .into();
        assert!(err.is_not_found());
        assert!(err.to_string().contains("we1-abc"));
    }

    #[test]
    fn test_backend_error_propagates_unmodified() {
        let err: TaskError = StoreError::Backend("disk on fire".to_string()).into();
        match err {
            TaskError::Store(StoreError::Backend(msg)) => assert_eq!(msg, "disk on fire"),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
