//! Error type shared by the pipeline, its behaviors and transports.

use std::sync::Arc;

use thiserror::Error;

use crate::key::CacheKey;

/// Type-erased, cheaply cloneable error source.
pub type SharedError = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// Boxed error accepted by the conversion helpers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result alias used across the pipeline.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors produced while executing a pipeline.
///
/// `Error` is [`Clone`]: the deduplicator hands the same failure to every
/// waiter and the background runner fans one failure out to every behavior.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Network or protocol failure reported by the terminal transport.
    #[error("transport error: {0}")]
    Transport(#[source] SharedError),

    /// The request body is a single-consumption stream and cannot be duplicated.
    #[error("request with a streaming body cannot be cloned")]
    CloneUnsupported,

    /// Reading a request or response body failed.
    #[error("body error: {0}")]
    Body(#[source] SharedError),

    /// The cache store failed.
    #[error("cache store error: {0}")]
    Store(#[source] SharedError),

    /// The call that owned an in-flight dedup entry went away before settling.
    #[error("in-flight call for key `{0}` was abandoned")]
    Abandoned(CacheKey),

    /// A key generator produced an unusable key.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// Failure raised by a user-supplied behavior.
    #[error("behavior error: {0}")]
    Behavior(#[source] SharedError),
}

impl Error {
    /// Wraps an arbitrary error as a transport failure.
    pub fn transport(error: impl Into<BoxError>) -> Self {
        Error::Transport(Arc::from(error.into()))
    }

    /// Wraps an arbitrary error as a body failure.
    pub fn body(error: impl Into<BoxError>) -> Self {
        Error::Body(Arc::from(error.into()))
    }

    /// Wraps an arbitrary error as a cache store failure.
    pub fn store(error: impl Into<BoxError>) -> Self {
        Error::Store(Arc::from(error.into()))
    }

    /// Wraps an arbitrary error as a behavior failure.
    pub fn behavior(error: impl Into<BoxError>) -> Self {
        Error::Behavior(Arc::from(error.into()))
    }

    /// Returns `true` for [`Error::Transport`].
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_))
    }
}
