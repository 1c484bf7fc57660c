#![doc = include_str!("../README.md")]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

/// In-flight call table backing the deduplicator.
///
/// [`InFlightTable`](concurrency::InFlightTable) hands out exactly one
/// leader per key; everyone else subscribes to the leader's outcome.
pub mod concurrency;

/// Coalescing of concurrent equivalent calls.
pub mod dedup;

/// Metrics collection for pipeline observability.
///
/// When the `metrics` feature is enabled, this module provides counters,
/// gauges and histograms for:
/// - SWR hits, misses, revalidations and store failures
/// - Dedup leaders and waiters
/// - Background task lifecycle
pub mod metrics;

/// Background execution of continuations.
pub mod offload;

/// Pipeline composition and execution.
pub mod pipeline;

/// Request and response predicates and key generators.
pub mod predicate;

/// Stale-while-revalidate caching.
pub mod swr;

pub use dedup::{Coalesced, Dedup, DedupBuilder, DedupKey};
pub use offload::{BackgroundRunner, RunnerConfig};
pub use pipeline::{Pipeline, PipelineBuilder};
pub use swr::{NotSet, StaleWhileRevalidate, SwrBuilder, SwrKey};

pub use interpose_core::{
    Behavior, BehaviorLabel, Body, CacheKey, CacheStatus, CachedEntry, Context, Error, Next,
    Outcome, Request, Response, Result, Transport,
};

/// The `interpose` prelude.
///
/// ```rust
/// use interpose::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        Behavior, Context, Dedup, Next, Outcome, Pipeline, Request, Response, Result,
        StaleWhileRevalidate, Transport,
    };
}
