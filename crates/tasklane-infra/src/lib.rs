//! Infrastructure layer for Tasklane.
//!
//! Implements the ports defined in `tasklane-core` with in-memory adapters
//! (object store with a change feed, event log) and a store-backed step
//! invoker, and loads `config.toml`.

pub mod config;
pub mod engine;
pub mod memory;
