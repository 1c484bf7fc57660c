//! Replayable response snapshots.
//!
//! A transport response body can be read exactly once. [`CachedEntry`]
//! consumes that body a single time and keeps status, headers and bytes so
//! the response can be rebuilt any number of times:
//!
//! ```
//! use interpose_core::{Body, CachedEntry, Response};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let response = Response::new(Body::from("payload"));
//! let entry = CachedEntry::snapshot(response).await.unwrap();
//!
//! let first = entry.to_response().into_body().collect().await.unwrap();
//! let second = entry.to_response().into_body().collect().await.unwrap();
//! assert_eq!(first, second);
//! # });
//! ```

use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use http::header::CONTENT_LENGTH;
use http::{HeaderMap, StatusCode};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::Response;
use crate::body::Body;
use crate::error::Result;
use crate::status::CacheStatus;

/// Reason phrase attached to a response's extensions.
///
/// `http::Response` carries no reason text of its own; transports that know
/// the phrase sent by the server insert this extension and snapshots keep it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReasonPhrase(pub SmolStr);

/// Immutable snapshot of a response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedEntry {
    #[serde(with = "http_serde::status_code")]
    status: StatusCode,
    #[serde(with = "http_serde::header_map")]
    headers: HeaderMap,
    body: Bytes,
    reason: SmolStr,
    content_length: Option<u64>,
    stored_at: DateTime<Utc>,
    /// Status set by a caching behavior on the snapshotted response.
    #[serde(skip)]
    cache_status: Option<CacheStatus>,
}

impl CachedEntry {
    /// Builds an entry from its parts.
    pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        let content_length = declared_length(&headers);
        Self {
            reason: SmolStr::new_static(status.canonical_reason().unwrap_or("")),
            status,
            headers,
            body,
            content_length,
            stored_at: Utc::now(),
            cache_status: None,
        }
    }

    /// Consumes `response`, reading its body exactly once.
    pub async fn snapshot(response: Response) -> Result<Self> {
        let (parts, body) = response.into_parts();
        let reason = parts
            .extensions
            .get::<ReasonPhrase>()
            .map(|phrase| phrase.0.clone())
            .unwrap_or_else(|| SmolStr::new_static(parts.status.canonical_reason().unwrap_or("")));
        let cache_status = parts.extensions.get::<CacheStatus>().copied();
        let bytes = body.collect().await?;
        Ok(Self {
            content_length: declared_length(&parts.headers),
            status: parts.status,
            headers: parts.headers,
            body: bytes,
            reason,
            stored_at: Utc::now(),
            cache_status,
        })
    }

    /// Rebuilds an independently consumable response with identical bytes.
    pub fn to_response(&self) -> Response {
        let mut response = Response::new(Body::Full(self.body.clone()));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers.clone();
        response
            .extensions_mut()
            .insert(ReasonPhrase(self.reason.clone()));
        if let Some(status) = self.cache_status {
            response.extensions_mut().insert(status);
        }
        response
    }

    /// Returns the status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the body bytes.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Returns the reason phrase.
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Returns the length declared by the `Content-Length` header.
    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    /// Returns the cache status carried over from the snapshotted response.
    pub fn cache_status(&self) -> Option<CacheStatus> {
        self.cache_status
    }

    /// Returns when the snapshot was taken.
    pub fn stored_at(&self) -> DateTime<Utc> {
        self.stored_at
    }

    /// Time elapsed since the snapshot was taken.
    pub fn age(&self) -> Duration {
        Utc::now()
            .signed_duration_since(self.stored_at)
            .to_std()
            .unwrap_or_default()
    }

    /// Estimated memory footprint of the entry.
    pub fn memory_size(&self) -> usize {
        let headers: usize = self
            .headers
            .iter()
            .map(|(name, value)| name.as_str().len() + value.len())
            .sum();
        size_of::<Self>() + headers + self.body.len()
    }
}

fn declared_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use http::HeaderValue;

    fn streamed_response() -> Response {
        let chunks: Vec<std::result::Result<Bytes, std::io::Error>> = vec![
            Ok(Bytes::from_static(b"{\"id\":")),
            Ok(Bytes::from_static(b"7}")),
        ];
        let mut response = Response::new(Body::from_stream(stream::iter(chunks)));
        *response.status_mut() = StatusCode::CREATED;
        response
            .headers_mut()
            .insert(CONTENT_LENGTH, HeaderValue::from_static("8"));
        response
    }

    #[tokio::test]
    async fn replays_are_byte_identical() {
        let entry = CachedEntry::snapshot(streamed_response()).await.unwrap();

        let first = entry.to_response();
        let second = entry.to_response();
        assert_eq!(first.status(), StatusCode::CREATED);
        assert_eq!(second.headers()[CONTENT_LENGTH], "8");

        let first = first.into_body().collect().await.unwrap();
        let second = second.into_body().collect().await.unwrap();
        assert_eq!(first, Bytes::from_static(b"{\"id\":7}"));
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn keeps_reason_and_declared_length() {
        let mut response = streamed_response();
        response
            .extensions_mut()
            .insert(ReasonPhrase(SmolStr::new_static("Made It")));
        let entry = CachedEntry::snapshot(response).await.unwrap();

        assert_eq!(entry.reason(), "Made It");
        assert_eq!(entry.content_length(), Some(8));
        assert_eq!(
            entry.to_response().extensions().get::<ReasonPhrase>(),
            Some(&ReasonPhrase(SmolStr::new_static("Made It")))
        );
    }

    #[tokio::test]
    async fn keeps_cache_status() {
        let mut response = streamed_response();
        response.extensions_mut().insert(CacheStatus::Hit);
        let entry = CachedEntry::snapshot(response).await.unwrap();

        assert_eq!(entry.cache_status(), Some(CacheStatus::Hit));
        assert_eq!(
            entry.to_response().extensions().get::<CacheStatus>(),
            Some(&CacheStatus::Hit)
        );

        let plain = CachedEntry::snapshot(streamed_response()).await.unwrap();
        assert_eq!(plain.to_response().extensions().get::<CacheStatus>(), None);
    }

    #[test]
    fn defaults_to_canonical_reason() {
        let entry = CachedEntry::new(StatusCode::NOT_FOUND, HeaderMap::new(), Bytes::new());
        assert_eq!(entry.reason(), "Not Found");
        assert_eq!(entry.content_length(), None);
    }

    #[test]
    fn serializes_for_persistent_stores() {
        let mut headers = HeaderMap::new();
        headers.insert("content-type", HeaderValue::from_static("application/json"));
        let entry = CachedEntry::new(StatusCode::OK, headers, Bytes::from_static(b"[1,2]"));

        let encoded = serde_json::to_string(&entry).unwrap();
        let decoded: CachedEntry = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, entry);
    }
}
