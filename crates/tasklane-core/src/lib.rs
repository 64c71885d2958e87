//! Task reconciliation and run orchestration for Tasklane.
//!
//! This crate defines the "ports" (object store, event store, step invoker)
//! that the infrastructure layer implements, and the services built on
//! them. It depends only on `tasklane-types` -- never on `tasklane-infra`.

pub mod engine;
pub mod event;
pub mod guard;
pub mod naming;
pub mod run;
pub mod store;
pub mod task;
pub mod trigger;
