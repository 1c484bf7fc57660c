//! Unbounded in-memory store backed by `DashMap`.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use interpose_core::{CacheKey, CachedEntry};
use tracing::trace;

use crate::store::{CacheStore, DeleteStatus, StoreResult};

/// In-memory cache store.
///
/// Entries are kept until removed: there is no eviction and no TTL. Clones
/// share the same map, so a store handed to a behavior can still be inspected
/// from the outside.
///
/// # Examples
///
/// ```
/// use interpose_backend::{CacheStore, MemoryStore};
/// use interpose_core::{CacheKey, CachedEntry};
/// use http::{HeaderMap, StatusCode};
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let store = MemoryStore::new();
/// let key = CacheKey::from("GET:/data");
/// let entry = CachedEntry::new(StatusCode::OK, HeaderMap::new(), "hello".into());
///
/// store.set(&key, entry).await.unwrap();
/// assert_eq!(store.len(), 1);
/// assert!(store.get(&key).await.unwrap().is_some());
/// # });
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<DashMap<CacheKey, CachedEntry>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns `true` if an entry is stored under `key`.
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Keys of all stored entries, in no particular order.
    pub fn keys(&self) -> Vec<CacheKey> {
        self.entries.iter().map(|entry| entry.key().clone()).collect()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &CacheKey) -> StoreResult<Option<CachedEntry>> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    async fn set(&self, key: &CacheKey, entry: CachedEntry) -> StoreResult<()> {
        trace!(key = %key, size = entry.memory_size(), "memory store write");
        self.entries.insert(key.clone(), entry);
        Ok(())
    }

    async fn remove(&self, key: &CacheKey) -> StoreResult<DeleteStatus> {
        Ok(match self.entries.remove(key) {
            Some(_) => DeleteStatus::Deleted,
            None => DeleteStatus::Missing,
        })
    }

    async fn clear(&self) -> StoreResult<()> {
        self.entries.clear();
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
