//! Cache and deduplication key type.
//!
//! Both the stale-while-revalidate cache and the deduplicator identify
//! equivalent calls by a string key computed from the request. The default
//! generator produces `{method}:{target}`:
//!
//! ```
//! use interpose_core::{CacheKey, Request};
//!
//! let request = Request::get("/data");
//! assert_eq!(CacheKey::from_request(&request).as_str(), "GET:/data");
//! ```
//!
//! [`CacheKey`] wraps a [`SmolStr`], so short keys (≤23 bytes) are stored
//! inline and cloning a long key only bumps a reference count.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::borrow::Borrow;
use std::fmt;

use crate::request::Request;

/// A key identifying equivalent calls.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(SmolStr);

impl CacheKey {
    /// Creates a key from any string-like value.
    #[inline]
    pub fn new(key: impl Into<SmolStr>) -> Self {
        Self(key.into())
    }

    /// Default key for a request: `{method}:{target}`.
    pub fn from_request(request: &Request) -> Self {
        Self(smol_str::format_smolstr!(
            "{}:{}",
            request.method(),
            request.uri()
        ))
    }

    /// Returns the key as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if the key is empty.
    ///
    /// Empty keys are rejected by the cache and dedup behaviors.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Borrow<str> for CacheKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CacheKey {
    #[inline]
    fn from(s: &str) -> Self {
        Self(SmolStr::new(s))
    }
}

impl From<String> for CacheKey {
    #[inline]
    fn from(s: String) -> Self {
        Self(SmolStr::from(s))
    }
}
