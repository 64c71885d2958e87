//! DashMap-backed object store with optimistic concurrency and a broadcast
//! change feed.
//!
//! Resources are held as JSON values keyed by `(kind, name)`, next to the
//! index fields extracted at write time. Every write takes a fresh version
//! from a store-wide counter.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use rand::Rng;
use tasklane_core::store::{ChangeType, ObjectStore, StoreChange};
use tasklane_types::error::StoreError;
use tasklane_types::resource::{FieldSelector, IndexField, Resource, ResourceKind};
use tokio::sync::broadcast;

/// Characters used for generated name suffixes. No vowels, so generated
/// names never spell words.
const SUFFIX_ALPHABET: &[u8] = b"bcdfghjklmnpqrstvwxz2456789";

const SUFFIX_LEN: usize = 5;

/// Attempts at finding a free generated name.
const MAX_GENERATE_ATTEMPTS: usize = 8;

const CHANGE_FEED_CAPACITY: usize = 1024;

struct StoredObject {
    value: serde_json::Value,
    fields: Vec<(IndexField, String)>,
    version: u64,
    /// Version at creation, used to list in creation order.
    created: u64,
}

pub struct InMemoryObjectStore {
    objects: DashMap<(ResourceKind, String), StoredObject>,
    version: AtomicU64,
    changes: broadcast::Sender<StoreChange>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self {
            objects: DashMap::new(),
            version: AtomicU64::new(0),
            changes,
        }
    }

    /// Number of stored resources of `kind`.
    pub fn count(&self, kind: ResourceKind) -> usize {
        self.objects.iter().filter(|entry| entry.key().0 == kind).count()
    }

    fn next_version(&self) -> u64 {
        self.version.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn publish(&self, kind: ResourceKind, name: &str, change: ChangeType) {
        let _ = self.changes.send(StoreChange {
            kind,
            name: name.to_string(),
            change,
        });
    }

    /// Insert `resource` under its own name if that name is free.
    fn insert_new<R: Resource>(&self, mut resource: R) -> Result<R, StoreError> {
        let key = (R::KIND, resource.meta().name.clone());
        match self.objects.entry(key) {
            Entry::Occupied(entry) => Err(StoreError::AlreadyExists {
                kind: R::KIND,
                name: entry.key().1.clone(),
            }),
            Entry::Vacant(entry) => {
                let version = self.next_version();
                let meta = resource.meta_mut();
                meta.resource_version = version;
                meta.created_at = Some(Utc::now());
                entry.insert(StoredObject {
                    value: to_value(&resource)?,
                    fields: resource.index_fields(),
                    version,
                    created: version,
                });
                Ok(resource)
            }
        }
    }
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryObjectStore")
            .field("objects", &self.objects.len())
            .field("version", &self.version.load(Ordering::SeqCst))
            .finish()
    }
}

impl ObjectStore for InMemoryObjectStore {
    async fn get<R: Resource>(&self, name: &str) -> Result<R, StoreError> {
        let value = self
            .objects
            .get(&(R::KIND, name.to_string()))
            .map(|stored| stored.value.clone())
            .ok_or_else(|| StoreError::NotFound {
                kind: R::KIND,
                name: name.to_string(),
            })?;
        from_value(value)
    }

    async fn list<R: Resource>(&self, selector: &FieldSelector) -> Result<Vec<R>, StoreError> {
        let mut matched: Vec<(u64, serde_json::Value)> = self
            .objects
            .iter()
            .filter(|entry| entry.key().0 == R::KIND && selector.matches(&entry.value().fields))
            .map(|entry| (entry.value().created, entry.value().value.clone()))
            .collect();
        matched.sort_by_key(|(created, _)| *created);

        matched.into_iter().map(|(_, value)| from_value(value)).collect()
    }

    async fn create<R: Resource>(&self, resource: R) -> Result<R, StoreError> {
        let created = if resource.meta().name.is_empty() {
            let prefix = resource.meta().generate_name.clone().ok_or_else(|| {
                StoreError::Backend(format!("{} has neither name nor generate_name", R::KIND))
            })?;

            let mut attempt = 0;
            loop {
                attempt += 1;
                let mut candidate = resource.clone();
                candidate.meta_mut().name = format!("{prefix}{}", random_suffix());
                match self.insert_new(candidate) {
                    Err(e) if e.is_already_exists() && attempt < MAX_GENERATE_ATTEMPTS => continue,
                    result => break result?,
                }
            }
        } else {
            self.insert_new(resource)?
        };

        tracing::debug!(kind = %R::KIND, name = %created.name(), "stored resource created");
        self.publish(R::KIND, created.name(), ChangeType::Created);
        Ok(created)
    }

    async fn update<R: Resource>(&self, mut resource: R) -> Result<R, StoreError> {
        let name = resource.meta().name.clone();
        {
            let mut stored = self
                .objects
                .get_mut(&(R::KIND, name.clone()))
                .ok_or_else(|| StoreError::NotFound {
                    kind: R::KIND,
                    name: name.clone(),
                })?;

            if stored.version != resource.meta().resource_version {
                return Err(StoreError::Conflict {
                    kind: R::KIND,
                    name,
                });
            }

            let version = self.next_version();
            resource.meta_mut().resource_version = version;
            stored.value = to_value(&resource)?;
            stored.fields = resource.index_fields();
            stored.version = version;
        }

        self.publish(R::KIND, &name, ChangeType::Updated);
        Ok(resource)
    }

    async fn delete<R: Resource>(&self, name: &str) -> Result<(), StoreError> {
        self.objects
            .remove(&(R::KIND, name.to_string()))
            .ok_or_else(|| StoreError::NotFound {
                kind: R::KIND,
                name: name.to_string(),
            })?;

        tracing::debug!(kind = %R::KIND, name, "stored resource deleted");
        self.publish(R::KIND, name, ChangeType::Deleted);
        Ok(())
    }

    fn changes(&self) -> broadcast::Receiver<StoreChange> {
        self.changes.subscribe()
    }
}

fn random_suffix() -> String {
    let mut rng = rand::thread_rng();
    (0..SUFFIX_LEN)
        .map(|_| SUFFIX_ALPHABET[rng.gen_range(0..SUFFIX_ALPHABET.len())] as char)
        .collect()
}

fn to_value<R: Resource>(resource: &R) -> Result<serde_json::Value, StoreError> {
    serde_json::to_value(resource).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn from_value<R: Resource>(value: serde_json::Value) -> Result<R, StoreError> {
    serde_json::from_value(value).map_err(|e| StoreError::Serialization(e.to_string()))
}
