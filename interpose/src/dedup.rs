//! Concurrent request deduplication.
//!
//! [`Dedup`] guarantees at most one transport call per key at any instant.
//! Callers arriving while a call for the same key is pending share its
//! outcome: a replay of the leader's response, or the very same error.
//!
//! Place it ahead of [`StaleWhileRevalidate`](crate::StaleWhileRevalidate) to
//! coalesce concurrent cache misses.

use std::sync::Arc;

use async_trait::async_trait;
use interpose_core::{
    Behavior, BehaviorLabel, CacheKey, CachedEntry, Context, Error, Next, Outcome, Result,
};
use tracing::debug;

use crate::concurrency::{InFlightTable, Join, SharedResponse};
use crate::predicate::{KeyGenerator, MethodAndTarget, RequestPredicate, SafeRead};

#[cfg(feature = "metrics")]
use crate::metrics::{DEDUP_LEADER_COUNTER, DEDUP_WAITER_COUNTER};

/// Dedup key recorded in the context metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DedupKey(pub CacheKey);

/// Marks a context whose response was shared from another in-flight call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Coalesced;

/// In-flight request coalescing behavior.
///
/// Background continuations always bypass deduplication so they reach the
/// transport.
pub struct Dedup {
    key_generator: Arc<dyn KeyGenerator>,
    predicate: Arc<dyn RequestPredicate>,
    in_flight: Arc<InFlightTable>,
}

impl Dedup {
    /// Creates a deduplicator with default key generator and predicate.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Creates a new [`DedupBuilder`].
    pub fn builder() -> DedupBuilder {
        DedupBuilder::default()
    }

    /// Returns the in-flight table.
    pub fn in_flight(&self) -> &InFlightTable {
        &self.in_flight
    }
}

impl Default for Dedup {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Dedup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dedup")
            .field("in_flight", &self.in_flight)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Behavior for Dedup {
    fn label(&self) -> BehaviorLabel {
        BehaviorLabel::new_static("dedup")
    }

    async fn process(&self, ctx: &mut Context, next: Next<'_>) -> Result<Outcome> {
        if ctx.is_background() || !self.predicate.check(ctx.request()) {
            return next.run(ctx).await;
        }

        let key = self.key_generator.key(ctx.request());
        if key.is_empty() {
            return Err(Error::InvalidKey(format!(
                "dedup key for {} {} is empty",
                ctx.request().method(),
                ctx.request().uri()
            )));
        }
        ctx.extensions_mut().insert(DedupKey(key.clone()));

        match self.in_flight.join(key.clone()) {
            Join::Waiter(waiter) => {
                debug!(key = %key, "Joining in-flight call");
                #[cfg(feature = "metrics")]
                metrics::counter!(*DEDUP_WAITER_COUNTER).increment(1);
                ctx.extensions_mut().insert(Coalesced);
                let shared = waiter.outcome().await?;
                ctx.set_from_cache(shared.from_cache);
                Ok(Outcome::immediate(shared.entry.to_response()))
            }
            Join::Leader(guard) => {
                debug!(key = %key, "Leading call");
                #[cfg(feature = "metrics")]
                metrics::counter!(*DEDUP_LEADER_COUNTER).increment(1);
                match lead(ctx, next).await {
                    Ok((entry, continuation)) => {
                        let replay = entry.to_response();
                        guard.settle(Ok(SharedResponse {
                            entry,
                            from_cache: ctx.from_cache(),
                        }));
                        Ok(Outcome::from_parts(replay, continuation))
                    }
                    Err(error) => {
                        guard.settle(Err(error.clone()));
                        Err(error)
                    }
                }
            }
        }
    }
}

async fn lead(ctx: &mut Context, next: Next<'_>) -> Result<(CachedEntry, Option<Context>)> {
    let (response, continuation) = next.run(ctx).await?.into_parts();
    let entry = CachedEntry::snapshot(response).await?;
    Ok((entry, continuation))
}

/// Builder for [`Dedup`].
#[derive(Default)]
pub struct DedupBuilder {
    key_generator: Option<Arc<dyn KeyGenerator>>,
    predicate: Option<Arc<dyn RequestPredicate>>,
    in_flight: Option<Arc<InFlightTable>>,
}

impl DedupBuilder {
    /// Sets the key generator. Defaults to `{method}:{target}`.
    pub fn key_generator<K>(self, key_generator: K) -> Self
    where
        K: KeyGenerator + 'static,
    {
        Self {
            key_generator: Some(Arc::new(key_generator)),
            ..self
        }
    }

    /// Sets which requests are deduplicated. Defaults to `GET` and `HEAD`.
    pub fn predicate<P>(self, predicate: P) -> Self
    where
        P: RequestPredicate + 'static,
    {
        Self {
            predicate: Some(Arc::new(predicate)),
            ..self
        }
    }

    /// Shares an in-flight table with other deduplicators.
    pub fn in_flight(self, table: Arc<InFlightTable>) -> Self {
        Self {
            in_flight: Some(table),
            ..self
        }
    }

    /// Builds the [`Dedup`] behavior.
    pub fn build(self) -> Dedup {
        Dedup {
            key_generator: self
                .key_generator
                .unwrap_or_else(|| Arc::new(MethodAndTarget)),
            predicate: self.predicate.unwrap_or_else(|| Arc::new(SafeRead)),
            in_flight: self.in_flight.unwrap_or_default(),
        }
    }
}
