//! In-memory implementations of the object store and event log.
//!
//! State lives for the lifetime of the process. Suitable for a single
//! server instance and for tests.

pub mod events;
pub mod store;

pub use events::InMemoryEventLog;
pub use store::InMemoryObjectStore;
