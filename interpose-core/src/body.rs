//! Request and response bodies.
//!
//! A body is either fully buffered (and therefore replayable) or a
//! single-consumption stream handed over by a transport.
//!
//! ## Body States
//!
//! - **Empty**: no payload
//! - **Full**: buffered bytes, cheap to clone
//! - **Stream**: bytes arrive from a source that can be read exactly once
//!
//! Streams are the reason [`CachedEntry`](crate::CachedEntry) exists: once a
//! response stream has been read it is gone, so anything that wants to look at
//! a response more than once has to snapshot it first.

use std::fmt;
use std::pin::Pin;

use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt, stream};

use crate::error::{BoxError, Error, Result};

/// Boxed single-consumption byte stream.
pub type BodyStream = Pin<Box<dyn Stream<Item = std::result::Result<Bytes, BoxError>> + Send>>;

/// Payload of a request or response.
#[derive(Default)]
pub enum Body {
    /// No payload.
    #[default]
    Empty,
    /// Fully buffered payload.
    Full(Bytes),
    /// Payload streamed from a single-use source.
    Stream(BodyStream),
}

impl Body {
    /// Creates an empty body.
    pub fn empty() -> Self {
        Body::Empty
    }

    /// Creates a body from a byte stream.
    pub fn from_stream<S, E>(stream: S) -> Self
    where
        S: Stream<Item = std::result::Result<Bytes, E>> + Send + 'static,
        E: Into<BoxError>,
    {
        Body::Stream(Box::pin(stream.map(|chunk| chunk.map_err(Into::into))))
    }

    /// Returns `true` if the body can be read more than once.
    pub fn is_replayable(&self) -> bool {
        !matches!(self, Body::Stream(_))
    }

    /// Returns the exact length when it is known without reading.
    pub fn exact_len(&self) -> Option<u64> {
        match self {
            Body::Empty => Some(0),
            Body::Full(bytes) => Some(bytes.len() as u64),
            Body::Stream(_) => None,
        }
    }

    /// Duplicates a replayable body. Streams return `None`.
    pub fn try_clone(&self) -> Option<Body> {
        match self {
            Body::Empty => Some(Body::Empty),
            Body::Full(bytes) => Some(Body::Full(bytes.clone())),
            Body::Stream(_) => None,
        }
    }

    /// Reads the whole body into memory.
    pub async fn collect(self) -> Result<Bytes> {
        match self {
            Body::Empty => Ok(Bytes::new()),
            Body::Full(bytes) => Ok(bytes),
            Body::Stream(mut stream) => {
                let mut buffer = BytesMut::new();
                while let Some(chunk) = stream.next().await {
                    buffer.extend_from_slice(&chunk.map_err(Error::body)?);
                }
                Ok(buffer.freeze())
            }
        }
    }

    /// Reads and discards the body, returning the number of bytes consumed.
    pub async fn drain(self) -> Result<u64> {
        match self {
            Body::Empty => Ok(0),
            Body::Full(bytes) => Ok(bytes.len() as u64),
            Body::Stream(mut stream) => {
                let mut consumed = 0u64;
                while let Some(chunk) = stream.next().await {
                    consumed += chunk.map_err(Error::body)?.len() as u64;
                }
                Ok(consumed)
            }
        }
    }

    /// Converts the body into a stream of chunks, whatever its state.
    pub fn into_stream(self) -> BodyStream {
        match self {
            Body::Empty => Box::pin(stream::empty()),
            Body::Full(bytes) => Box::pin(stream::once(async move { Ok(bytes) })),
            Body::Stream(stream) => stream,
        }
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::Empty => f.write_str("Body::Empty"),
            Body::Full(bytes) => f.debug_tuple("Body::Full").field(&bytes.len()).finish(),
            Body::Stream(_) => f.write_str("Body::Stream"),
        }
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Body::Full(bytes)
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Body::Full(Bytes::from(bytes))
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Body::Full(Bytes::from(text))
    }
}

impl From<&'static str> for Body {
    fn from(text: &'static str) -> Self {
        Body::Full(Bytes::from_static(text.as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunked(parts: &[&'static str]) -> Body {
        let chunks: Vec<std::result::Result<Bytes, std::io::Error>> = parts
            .iter()
            .map(|part| Ok(Bytes::from_static(part.as_bytes())))
            .collect();
        Body::from_stream(stream::iter(chunks))
    }

    #[tokio::test]
    async fn stream_collects_in_order() {
        let body = chunked(&["hello", " ", "world"]);
        assert!(!body.is_replayable());
        assert!(body.try_clone().is_none());
        assert_eq!(body.collect().await.unwrap(), Bytes::from_static(b"hello world"));
    }

    #[tokio::test]
    async fn stream_error_surfaces_as_body_error() {
        let chunks: Vec<std::result::Result<Bytes, std::io::Error>> = vec![
            Ok(Bytes::from_static(b"partial")),
            Err(std::io::Error::other("reset by peer")),
        ];
        let err = Body::from_stream(stream::iter(chunks)).drain().await.unwrap_err();
        assert!(matches!(err, Error::Body(_)));
    }

    #[tokio::test]
    async fn drain_counts_bytes() {
        assert_eq!(chunked(&["ab", "cde"]).drain().await.unwrap(), 5);
        assert_eq!(Body::from("xyz").drain().await.unwrap(), 3);
        assert_eq!(Body::empty().drain().await.unwrap(), 0);
    }
}
