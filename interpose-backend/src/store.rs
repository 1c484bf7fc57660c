use std::sync::Arc;

use async_trait::async_trait;
use interpose_core::{CacheKey, CachedEntry};

use crate::StoreError;

/// Result alias for cache store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Status of a remove operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteStatus {
    /// The entry existed and was removed.
    Deleted,
    /// No entry was stored under the key.
    Missing,
}

/// Key to [`CachedEntry`] storage used by the caching behaviors.
///
/// Writes follow last-writer-wins: a `set` replaces whatever is stored under
/// the key, with no versioning or conflict detection.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Reads the entry stored under `key`.
    async fn get(&self, key: &CacheKey) -> StoreResult<Option<CachedEntry>>;

    /// Stores `entry` under `key`, replacing any previous entry.
    async fn set(&self, key: &CacheKey, entry: CachedEntry) -> StoreResult<()>;

    /// Removes the entry stored under `key`.
    async fn remove(&self, key: &CacheKey) -> StoreResult<DeleteStatus>;

    /// Removes every entry.
    async fn clear(&self) -> StoreResult<()>;

    /// Returns the name of this store, used in logs and metric labels.
    fn name(&self) -> &str {
        "store"
    }
}

#[async_trait]
impl CacheStore for &dyn CacheStore {
    async fn get(&self, key: &CacheKey) -> StoreResult<Option<CachedEntry>> {
        (*self).get(key).await
    }

    async fn set(&self, key: &CacheKey, entry: CachedEntry) -> StoreResult<()> {
        (*self).set(key, entry).await
    }

    async fn remove(&self, key: &CacheKey) -> StoreResult<DeleteStatus> {
        (*self).remove(key).await
    }

    async fn clear(&self) -> StoreResult<()> {
        (*self).clear().await
    }

    fn name(&self) -> &str {
        (*self).name()
    }
}

#[async_trait]
impl<S> CacheStore for Box<S>
where
    S: CacheStore + ?Sized,
{
    async fn get(&self, key: &CacheKey) -> StoreResult<Option<CachedEntry>> {
        (**self).get(key).await
    }

    async fn set(&self, key: &CacheKey, entry: CachedEntry) -> StoreResult<()> {
        (**self).set(key, entry).await
    }

    async fn remove(&self, key: &CacheKey) -> StoreResult<DeleteStatus> {
        (**self).remove(key).await
    }

    async fn clear(&self) -> StoreResult<()> {
        (**self).clear().await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

#[async_trait]
impl<S> CacheStore for Arc<S>
where
    S: CacheStore + ?Sized,
{
    async fn get(&self, key: &CacheKey) -> StoreResult<Option<CachedEntry>> {
        (**self).get(key).await
    }

    async fn set(&self, key: &CacheKey, entry: CachedEntry) -> StoreResult<()> {
        (**self).set(key, entry).await
    }

    async fn remove(&self, key: &CacheKey) -> StoreResult<DeleteStatus> {
        (**self).remove(key).await
    }

    async fn clear(&self) -> StoreResult<()> {
        (**self).clear().await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
