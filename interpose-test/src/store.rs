//! Cache store double with operation counters and failure injection.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use interpose_backend::{CacheStore, DeleteStatus, MemoryStore, StoreError, StoreResult};
use interpose_core::{CacheKey, CachedEntry};

#[derive(Debug, Default)]
pub struct StoreCounters {
    pub read_count: AtomicUsize,
    pub read_hit_count: AtomicUsize,
    pub write_count: AtomicUsize,
}

#[derive(Debug, Default)]
struct Faults {
    reads: AtomicBool,
    writes: AtomicBool,
}

/// [`MemoryStore`] wrapper that counts operations and can be told to fail.
///
/// Failed operations still count. Clones share entries, counters and faults.
#[derive(Clone, Debug, Default)]
pub struct MockStore {
    pub entries: MemoryStore,
    pub counters: Arc<StoreCounters>,
    faults: Arc<Faults>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every read fail (or succeed again).
    pub fn fail_reads(&self, fail: bool) {
        self.faults.reads.store(fail, Ordering::SeqCst);
    }

    /// Makes every write fail (or succeed again).
    pub fn fail_writes(&self, fail: bool) {
        self.faults.writes.store(fail, Ordering::SeqCst);
    }

    pub fn read_count(&self) -> usize {
        self.counters.read_count.load(Ordering::SeqCst)
    }

    pub fn read_hit_count(&self) -> usize {
        self.counters.read_hit_count.load(Ordering::SeqCst)
    }

    pub fn write_count(&self) -> usize {
        self.counters.write_count.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn simulated(operation: &str) -> StoreError {
        StoreError::connection(std::io::Error::other(format!("simulated {operation} failure")))
    }
}

#[async_trait]
impl CacheStore for MockStore {
    async fn get(&self, key: &CacheKey) -> StoreResult<Option<CachedEntry>> {
        self.counters.read_count.fetch_add(1, Ordering::SeqCst);
        if self.faults.reads.load(Ordering::SeqCst) {
            return Err(Self::simulated("read"));
        }
        let entry = self.entries.get(key).await?;
        if entry.is_some() {
            self.counters.read_hit_count.fetch_add(1, Ordering::SeqCst);
        }
        Ok(entry)
    }

    async fn set(&self, key: &CacheKey, entry: CachedEntry) -> StoreResult<()> {
        self.counters.write_count.fetch_add(1, Ordering::SeqCst);
        if self.faults.writes.load(Ordering::SeqCst) {
            return Err(Self::simulated("write"));
        }
        self.entries.set(key, entry).await
    }

    async fn remove(&self, key: &CacheKey) -> StoreResult<DeleteStatus> {
        self.entries.remove(key).await
    }

    async fn clear(&self) -> StoreResult<()> {
        self.entries.clear().await
    }

    fn name(&self) -> &str {
        "mock"
    }
}
