//! Pluggable decisions used by the caching and dedup behaviors.
//!
//! Each decision is a small trait with a default implementation and a blanket
//! implementation for closures, so configuration accepts either:
//!
//! ```
//! use interpose::predicate::{RequestPredicate, SafeRead};
//! use interpose::Request;
//!
//! let only_get = |request: &Request| *request.method() == http::Method::GET;
//! let request = Request::from_static(http::Method::HEAD, "/data");
//! assert!(!only_get.check(&request));
//! assert!(SafeRead.check(&request));
//! ```

use interpose_core::{CacheKey, Request, Response};

/// Decides whether a request takes part in a behavior.
pub trait RequestPredicate: Send + Sync {
    /// Returns `true` if the request qualifies.
    fn check(&self, request: &Request) -> bool;
}

impl<F> RequestPredicate for F
where
    F: Fn(&Request) -> bool + Send + Sync,
{
    fn check(&self, request: &Request) -> bool {
        self(request)
    }
}

/// Decides whether a response may be stored.
pub trait ResponsePredicate: Send + Sync {
    /// Returns `true` if the response qualifies.
    fn check(&self, response: &Response) -> bool;
}

impl<F> ResponsePredicate for F
where
    F: Fn(&Response) -> bool + Send + Sync,
{
    fn check(&self, response: &Response) -> bool {
        self(response)
    }
}

/// Computes the key identifying equivalent requests.
pub trait KeyGenerator: Send + Sync {
    /// Returns the key for `request`.
    fn key(&self, request: &Request) -> CacheKey;
}

impl<F> KeyGenerator for F
where
    F: Fn(&Request) -> CacheKey + Send + Sync,
{
    fn key(&self, request: &Request) -> CacheKey {
        self(request)
    }
}

/// Accepts safe reads: `GET` and `HEAD`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SafeRead;

impl RequestPredicate for SafeRead {
    fn check(&self, request: &Request) -> bool {
        request.is_safe_read()
    }
}

/// Accepts responses with a 2xx status.
#[derive(Debug, Clone, Copy, Default)]
pub struct SuccessStatus;

impl ResponsePredicate for SuccessStatus {
    fn check(&self, response: &Response) -> bool {
        response.status().is_success()
    }
}

/// Keys requests as `{method}:{target}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MethodAndTarget;

impl KeyGenerator for MethodAndTarget {
    fn key(&self, request: &Request) -> CacheKey {
        CacheKey::from_request(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{Method, StatusCode};
    use interpose_core::Body;

    #[test]
    fn defaults() {
        assert!(SafeRead.check(&Request::get("/a")));
        assert!(!SafeRead.check(&Request::from_static(Method::POST, "/a")));

        let mut response = Response::new(Body::empty());
        assert!(SuccessStatus.check(&response));
        *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        assert!(!SuccessStatus.check(&response));

        assert_eq!(MethodAndTarget.key(&Request::get("/a?b=1")).as_str(), "GET:/a?b=1");
    }

    #[test]
    fn closures_are_generators() {
        let by_path = |request: &Request| CacheKey::new(request.uri().path());
        assert_eq!(by_path.key(&Request::get("/a?b=1")).as_str(), "/a");
    }
}
