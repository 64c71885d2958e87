//! Shared domain types for Tasklane.
//!
//! This crate contains the resource shapes stored in the object store
//! (Workflow, WorkflowExecution, Thread, Agent, trigger resources), the
//! user-facing Task manifest, run events, configuration, and error types.
//!
//! Zero infrastructure dependencies -- only serde, chrono, thiserror.

pub mod config;
pub mod error;
pub mod event;
pub mod resource;
pub mod task;
pub mod trigger;
pub mod workflow;
