use std::sync::Arc;

use async_trait::async_trait;

use crate::Response;
use crate::error::Result;
use crate::request::Request;

/// Terminal call of a pipeline: sends a request over the wire.
///
/// The response body handed back may be a single-consumption stream.
/// Timeouts, TLS and connection pooling belong to the implementation; a
/// transport-level timeout surfaces as an ordinary [`Error::Transport`].
///
/// # Examples
///
/// ```rust
/// use async_trait::async_trait;
/// use interpose_core::{Body, Request, Response, Result, Transport};
///
/// struct Echo;
///
/// #[async_trait]
/// impl Transport for Echo {
///     async fn send(&self, request: Request) -> Result<Response> {
///         Ok(Response::new(Body::from(request.uri().to_string())))
///     }
/// }
/// ```
///
/// [`Error::Transport`]: crate::Error::Transport
#[async_trait]
pub trait Transport: Send + Sync {
    /// Dispatches the request.
    async fn send(&self, request: Request) -> Result<Response>;
}

#[async_trait]
impl<T> Transport for Arc<T>
where
    T: Transport + ?Sized,
{
    async fn send(&self, request: Request) -> Result<Response> {
        (**self).send(request).await
    }
}

#[async_trait]
impl<T> Transport for Box<T>
where
    T: Transport + ?Sized,
{
    async fn send(&self, request: Request) -> Result<Response> {
        (**self).send(request).await
    }
}
