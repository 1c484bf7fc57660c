//! Error types for cache store operations.

use thiserror::Error;

/// Error type for cache store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Internal store error, state or computation error.
    ///
    /// Any error not related to network interaction.
    #[error(transparent)]
    InternalError(Box<dyn std::error::Error + Send + Sync>),

    /// Network interaction error of a remote store.
    #[error(transparent)]
    ConnectionError(Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    /// Wraps an arbitrary error as an internal failure.
    pub fn internal(error: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        StoreError::InternalError(error.into())
    }

    /// Wraps an arbitrary error as a connection failure.
    pub fn connection(error: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        StoreError::ConnectionError(error.into())
    }
}

impl From<StoreError> for interpose_core::Error {
    fn from(error: StoreError) -> Self {
        interpose_core::Error::store(error)
    }
}
