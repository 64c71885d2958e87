//! Object store port.
//!
//! The object store is the single source of truth for tasks, runs, threads
//! and trigger resources. Services never cache resources across requests;
//! every read-then-write goes back to the store and retries on `Conflict`.

pub mod wait;

use std::future::Future;

use tasklane_types::error::StoreError;
use tasklane_types::resource::{FieldSelector, Resource, ResourceKind};
use tokio::sync::broadcast;

pub use wait::{WaitOptions, wait_for};

/// Maximum attempts for a read-modify-write cycle before giving up with the
/// last `Conflict`.
pub const MAX_CONFLICT_RETRIES: usize = 5;

/// Kind of write observed on the change feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeType {
    Created,
    Updated,
    Deleted,
}

/// One entry of the store's change feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreChange {
    pub kind: ResourceKind,
    pub name: String,
    pub change: ChangeType,
}

/// Storage interface for all resource kinds.
///
/// Uses native async fn in traits (Rust 2024 edition, no async_trait macro).
pub trait ObjectStore: Send + Sync {
    /// Fetch a resource by name. Missing resources yield
    /// [`StoreError::NotFound`].
    fn get<R: Resource>(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<R, StoreError>> + Send;

    /// List resources whose indexed fields match `selector`.
    fn list<R: Resource>(
        &self,
        selector: &FieldSelector,
    ) -> impl Future<Output = Result<Vec<R>, StoreError>> + Send;

    /// Create a resource. Fails with [`StoreError::AlreadyExists`] if the name
    /// is taken; this is the only create-if-absent primitive callers rely on.
    /// When `metadata.name` is empty the store generates one from
    /// `metadata.generate_name`.
    fn create<R: Resource>(&self, resource: R)
    -> impl Future<Output = Result<R, StoreError>> + Send;

    /// Replace a resource. Fails with [`StoreError::Conflict`] when
    /// `metadata.resource_version` is stale.
    fn update<R: Resource>(&self, resource: R)
    -> impl Future<Output = Result<R, StoreError>> + Send;

    /// Delete a resource by name. Missing resources yield
    /// [`StoreError::NotFound`].
    fn delete<R: Resource>(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Subscribe to the change feed. Only writes after the call are observed.
    fn changes(&self) -> broadcast::Receiver<StoreChange>;
}

/// Fetch a resource, mapping not-found to `None`.
pub async fn get_optional<S, R>(store: &S, name: &str) -> Result<Option<R>, StoreError>
where
    S: ObjectStore,
    R: Resource,
{
    match store.get::<R>(name).await {
        Ok(resource) => Ok(Some(resource)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

/// Read-modify-write with conflict retry.
///
/// `mutate` returns `false` when the resource already has the desired
/// state; in that case nothing is written and the current resource is
/// returned.
pub async fn update_with_retry<S, R, F>(
    store: &S,
    name: &str,
    mut mutate: F,
) -> Result<R, StoreError>
where
    S: ObjectStore,
    R: Resource,
    F: FnMut(&mut R) -> bool + Send,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        let mut resource = store.get::<R>(name).await?;
        if !mutate(&mut resource) {
            return Ok(resource);
        }
        match store.update(resource).await {
            Ok(updated) => return Ok(updated),
            Err(e) if e.is_conflict() && attempt < MAX_CONFLICT_RETRIES => {
                tracing::debug!(kind = %R::KIND, name, attempt, "update conflict, retrying");
            }
            Err(e) => return Err(e),
        }
    }
}
