//! In-flight call table used to coalesce concurrent equivalent calls.
//!
//! The first caller to register a key becomes the leader and performs the real
//! call; callers arriving while the entry exists subscribe to its outcome.
//! Registration and removal each run under the map's shard lock, so two
//! concurrent first arrivals can never both lead.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use interpose_core::{CacheKey, CachedEntry, Error, Result};
use tokio::sync::broadcast;

/// Response published by a leader.
#[derive(Debug, Clone)]
pub struct SharedResponse {
    /// Snapshot of the leader's response.
    pub entry: CachedEntry,
    /// Whether the leader's response was served from a cache.
    pub from_cache: bool,
}

/// Outcome shared by the leader with every waiter.
pub type SharedOutcome = Result<SharedResponse, Error>;

/// Role assigned by [`InFlightTable::join`].
pub enum Join {
    /// Perform the call and settle the entry through the guard.
    Leader(LeaderGuard),
    /// Await the leader's outcome.
    Waiter(Waiter),
}

/// Registry of currently executing coalesced calls.
#[derive(Default)]
pub struct InFlightTable {
    entries: DashMap<CacheKey, broadcast::Sender<SharedOutcome>>,
}

impl InFlightTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically joins the entry for `key`, registering one if absent.
    pub fn join(self: &Arc<Self>, key: CacheKey) -> Join {
        match self.entries.entry(key.clone()) {
            Entry::Occupied(entry) => Join::Waiter(Waiter {
                key,
                receiver: entry.get().subscribe(),
            }),
            Entry::Vacant(entry) => {
                // A single outcome is ever sent per entry.
                let (sender, _) = broadcast::channel(1);
                entry.insert(sender.clone());
                Join::Leader(LeaderGuard {
                    table: self.clone(),
                    key,
                    sender,
                    settled: false,
                })
            }
        }
    }

    /// Number of pending entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no call is in flight.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns `true` if a call for `key` is in flight.
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.contains_key(key)
    }

    fn settle(&self, key: &CacheKey, sender: &broadcast::Sender<SharedOutcome>, outcome: SharedOutcome) {
        // Remove before sending: late arrivals start a fresh call instead of
        // subscribing to a channel that has already fired.
        self.entries
            .remove_if(key, |_, registered| registered.same_channel(sender));
        let _ = sender.send(outcome);
    }
}

impl fmt::Debug for InFlightTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InFlightTable")
            .field("pending", &self.entries.len())
            .finish()
    }
}

/// Leader's handle on a pending entry.
///
/// Dropping the guard without calling [`LeaderGuard::settle`], for example
/// because the leading call was cancelled, removes the entry and fails every
/// waiter with [`Error::Abandoned`].
pub struct LeaderGuard {
    table: Arc<InFlightTable>,
    key: CacheKey,
    sender: broadcast::Sender<SharedOutcome>,
    settled: bool,
}

impl LeaderGuard {
    /// Returns the key this guard leads.
    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    /// Publishes `outcome` to all waiters and removes the entry.
    pub fn settle(mut self, outcome: SharedOutcome) {
        self.settled = true;
        self.table.settle(&self.key, &self.sender, outcome);
    }
}

impl Drop for LeaderGuard {
    fn drop(&mut self) {
        if !self.settled {
            self.table.settle(
                &self.key,
                &self.sender,
                Err(Error::Abandoned(self.key.clone())),
            );
        }
    }
}

/// Subscription to another caller's pending outcome.
pub struct Waiter {
    key: CacheKey,
    receiver: broadcast::Receiver<SharedOutcome>,
}

impl Waiter {
    /// Waits for the leader to settle.
    pub async fn outcome(mut self) -> SharedOutcome {
        match self.receiver.recv().await {
            Ok(outcome) => outcome,
            Err(_) => Err(Error::Abandoned(self.key)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::{HeaderMap, StatusCode};

    fn shared(from_cache: bool) -> SharedResponse {
        SharedResponse {
            entry: CachedEntry::new(StatusCode::OK, HeaderMap::new(), Bytes::from_static(b"shared")),
            from_cache,
        }
    }

    #[tokio::test]
    async fn first_arrival_leads_and_others_wait() {
        let table = Arc::new(InFlightTable::new());
        let key = CacheKey::from("GET:/data");

        let Join::Leader(leader) = table.join(key.clone()) else {
            panic!("first arrival must lead");
        };
        let Join::Waiter(waiter) = table.join(key.clone()) else {
            panic!("second arrival must wait");
        };
        assert!(table.contains(&key));

        leader.settle(Ok(shared(true)));
        assert!(table.is_empty());
        let outcome = waiter.outcome().await.unwrap();
        assert_eq!(outcome.entry.body(), &Bytes::from_static(b"shared"));
        assert!(outcome.from_cache);
    }

    #[tokio::test]
    async fn dropped_leader_abandons_waiters() {
        let table = Arc::new(InFlightTable::new());
        let key = CacheKey::from("GET:/data");

        let leader = table.join(key.clone());
        let Join::Waiter(waiter) = table.join(key.clone()) else {
            panic!("second arrival must wait");
        };
        drop(leader);

        assert!(table.is_empty());
        assert!(matches!(waiter.outcome().await, Err(Error::Abandoned(k)) if k == key));
    }

    #[tokio::test]
    async fn settled_key_can_lead_again() {
        let table = Arc::new(InFlightTable::new());
        let key = CacheKey::from("GET:/data");

        if let Join::Leader(leader) = table.join(key.clone()) {
            leader.settle(Err(Error::InvalidKey("boom".into())));
        }
        assert!(matches!(table.join(key), Join::Leader(_)));
    }
}
