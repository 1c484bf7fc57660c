//! Stale-while-revalidate caching behavior.
//!
//! Per call, [`StaleWhileRevalidate`] is in one of four states:
//!
//! - **not cacheable**: the request fails the request predicate and passes
//!   through untouched
//! - **revalidation**: a background continuation; the response is fetched,
//!   stored when cacheable, and a replay is returned
//! - **hit**: the cached entry is served at once with `from_cache` set, and a
//!   background continuation is attached to refresh it
//! - **miss**: the response is fetched, stored when cacheable, and a replay is
//!   returned; non-cacheable responses are returned as they came
//!
//! Concurrent misses for the same key are not coalesced here; put
//! [`Dedup`](crate::Dedup) ahead of this behavior for that.

use std::sync::Arc;

use async_trait::async_trait;
use http::{HeaderName, HeaderValue};
use interpose_backend::CacheStore;
use interpose_core::{
    Behavior, BehaviorLabel, CacheKey, CacheStatus, CachedEntry, Context, Error, Next, Outcome,
    Response, Result,
};
use tracing::{debug, warn};

use crate::predicate::{
    KeyGenerator, MethodAndTarget, RequestPredicate, ResponsePredicate, SafeRead, SuccessStatus,
};

#[cfg(feature = "metrics")]
use crate::metrics::{SWR_HIT_COUNTER, SWR_MISS_COUNTER, SWR_REVALIDATE_COUNTER, SWR_STORE_ERRORS};

/// Default header carrying the cache status when enabled.
pub const DEFAULT_CACHE_STATUS_HEADER: HeaderName = HeaderName::from_static("x-cache-status");

/// Cache key recorded in the context metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwrKey(pub CacheKey);

/// Stale-while-revalidate cache behavior over a [`CacheStore`].
///
/// # Example
///
/// ```
/// use interpose::StaleWhileRevalidate;
/// use interpose_backend::MemoryStore;
///
/// let store = MemoryStore::new();
/// let swr = StaleWhileRevalidate::builder()
///     .store(store.clone())
///     .cache_status_header(interpose::swr::DEFAULT_CACHE_STATUS_HEADER)
///     .build();
/// # let _ = swr;
/// ```
pub struct StaleWhileRevalidate<S> {
    store: S,
    key_generator: Arc<dyn KeyGenerator>,
    request_predicate: Arc<dyn RequestPredicate>,
    response_predicate: Arc<dyn ResponsePredicate>,
    status_header: Option<HeaderName>,
}

impl StaleWhileRevalidate<NotSet> {
    /// Creates a new [`SwrBuilder`].
    pub fn builder() -> SwrBuilder<NotSet> {
        SwrBuilder::new()
    }
}

impl<S> StaleWhileRevalidate<S>
where
    S: CacheStore,
{
    /// Returns the cache store.
    pub fn store(&self) -> &S {
        &self.store
    }

    async fn lookup(&self, key: &CacheKey) -> Option<CachedEntry> {
        match self.store.get(key).await {
            Ok(entry) => entry,
            Err(error) => {
                warn!(key = %key, store = self.store.name(), %error, "Cache read failed, treating as miss");
                #[cfg(feature = "metrics")]
                metrics::counter!(*SWR_STORE_ERRORS, "operation" => "read").increment(1);
                None
            }
        }
    }

    /// Snapshots and stores a cacheable response, returning its replay.
    async fn store_if_cacheable(&self, key: &CacheKey, outcome: Outcome) -> Result<Outcome> {
        let (response, continuation) = outcome.into_parts();
        if !self.response_predicate.check(&response) {
            debug!(key = %key, status = %response.status(), "Response is not cacheable");
            return Ok(Outcome::from_parts(response, continuation));
        }

        let entry = CachedEntry::snapshot(response).await?;
        let mut replay = entry.to_response();
        if let Err(error) = self.store.set(key, entry).await {
            warn!(key = %key, store = self.store.name(), %error, "Cache write failed");
            #[cfg(feature = "metrics")]
            metrics::counter!(*SWR_STORE_ERRORS, "operation" => "write").increment(1);
        }
        self.mark(&mut replay, CacheStatus::Miss);
        Ok(Outcome::from_parts(replay, continuation))
    }

    fn mark(&self, response: &mut Response, status: CacheStatus) {
        response.extensions_mut().insert(status);
        if let Some(header) = &self.status_header {
            let value = match status {
                CacheStatus::Hit => HeaderValue::from_static("HIT"),
                CacheStatus::Miss => HeaderValue::from_static("MISS"),
            };
            response.headers_mut().insert(header.clone(), value);
        }
    }
}

impl<S> std::fmt::Debug for StaleWhileRevalidate<S>
where
    S: CacheStore,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaleWhileRevalidate")
            .field("store", &self.store.name())
            .field("status_header", &self.status_header)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<S> Behavior for StaleWhileRevalidate<S>
where
    S: CacheStore + 'static,
{
    fn label(&self) -> BehaviorLabel {
        BehaviorLabel::new_static("swr")
    }

    async fn process(&self, ctx: &mut Context, next: Next<'_>) -> Result<Outcome> {
        if !self.request_predicate.check(ctx.request()) {
            return next.run(ctx).await;
        }

        let key = self.key_generator.key(ctx.request());
        if key.is_empty() {
            return Err(Error::InvalidKey(format!(
                "cache key for {} {} is empty",
                ctx.request().method(),
                ctx.request().uri()
            )));
        }
        ctx.extensions_mut().insert(SwrKey(key.clone()));

        if ctx.is_background() {
            let origin = ctx
                .background_origin()
                .map(BehaviorLabel::as_str)
                .unwrap_or("unknown");
            debug!(key = %key, origin, "Revalidating cache entry");
            #[cfg(feature = "metrics")]
            metrics::counter!(*SWR_REVALIDATE_COUNTER, "origin" => origin.to_string()).increment(1);
            let outcome = next.run(ctx).await?;
            return self.store_if_cacheable(&key, outcome).await;
        }

        if let Some(entry) = self.lookup(&key).await {
            debug!(key = %key, age_ms = entry.age().as_millis(), "Cache hit");
            #[cfg(feature = "metrics")]
            metrics::counter!(*SWR_HIT_COUNTER, "store" => self.store.name().to_string()).increment(1);
            let background = ctx.copy_for_background(self.label());
            ctx.set_from_cache(true);
            ctx.extensions_mut().insert(CacheStatus::Hit);

            let mut response = entry.to_response();
            self.mark(&mut response, CacheStatus::Hit);
            return Ok(match background {
                Ok(background) => Outcome::with_continuation(response, background),
                Err(error) => {
                    warn!(key = %key, %error, "Serving cache hit without revalidation");
                    Outcome::immediate(response)
                }
            });
        }

        debug!(key = %key, "Cache miss");
        #[cfg(feature = "metrics")]
        metrics::counter!(*SWR_MISS_COUNTER, "store" => self.store.name().to_string()).increment(1);
        ctx.extensions_mut().insert(CacheStatus::Miss);
        let outcome = next.run(ctx).await?;
        self.store_if_cacheable(&key, outcome).await
    }
}

/// Marker type for unset builder fields.
///
/// When you see `NotSet` in a compiler error, it means
/// [`SwrBuilder::store`] has not been called yet.
pub struct NotSet;

/// Builder for [`StaleWhileRevalidate`].
pub struct SwrBuilder<S> {
    store: S,
    key_generator: Arc<dyn KeyGenerator>,
    request_predicate: Arc<dyn RequestPredicate>,
    response_predicate: Arc<dyn ResponsePredicate>,
    status_header: Option<HeaderName>,
}

impl SwrBuilder<NotSet> {
    /// Creates a builder with default predicates and no store.
    pub fn new() -> Self {
        Self {
            store: NotSet,
            key_generator: Arc::new(MethodAndTarget),
            request_predicate: Arc::new(SafeRead),
            response_predicate: Arc::new(SuccessStatus),
            status_header: None,
        }
    }
}

impl Default for SwrBuilder<NotSet> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> SwrBuilder<S> {
    /// Sets the cache store.
    pub fn store<NewS>(self, store: NewS) -> SwrBuilder<NewS>
    where
        NewS: CacheStore,
    {
        SwrBuilder {
            store,
            key_generator: self.key_generator,
            request_predicate: self.request_predicate,
            response_predicate: self.response_predicate,
            status_header: self.status_header,
        }
    }

    /// Sets the cache key generator. Defaults to `{method}:{target}`.
    pub fn key_generator<K>(self, key_generator: K) -> Self
    where
        K: KeyGenerator + 'static,
    {
        Self {
            key_generator: Arc::new(key_generator),
            ..self
        }
    }

    /// Sets which requests are cached. Defaults to `GET` and `HEAD`.
    pub fn request_predicate<P>(self, predicate: P) -> Self
    where
        P: RequestPredicate + 'static,
    {
        Self {
            request_predicate: Arc::new(predicate),
            ..self
        }
    }

    /// Sets which responses are stored. Defaults to 2xx statuses.
    pub fn response_predicate<P>(self, predicate: P) -> Self
    where
        P: ResponsePredicate + 'static,
    {
        Self {
            response_predicate: Arc::new(predicate),
            ..self
        }
    }

    /// Mirrors the cache status (`HIT` or `MISS`) into `header`.
    pub fn cache_status_header(self, header: HeaderName) -> Self {
        Self {
            status_header: Some(header),
            ..self
        }
    }
}

impl<S> SwrBuilder<S>
where
    S: CacheStore,
{
    /// Builds the [`StaleWhileRevalidate`] behavior.
    pub fn build(self) -> StaleWhileRevalidate<S> {
        StaleWhileRevalidate {
            store: self.store,
            key_generator: self.key_generator,
            request_predicate: self.request_predicate,
            response_predicate: self.response_predicate,
            status_header: self.status_header,
        }
    }
}
