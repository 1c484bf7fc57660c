//! Outbound request description.

use http::{HeaderMap, HeaderName, HeaderValue, Method, Uri, Version};

use crate::body::Body;
use crate::error::{Error, Result};

/// An outbound call: method, target, headers and body.
///
/// A request is owned by exactly one [`Context`](crate::Context). Headers stay
/// mutable until the terminal transport takes the request for dispatch.
#[derive(Debug)]
pub struct Request {
    method: Method,
    uri: Uri,
    version: Version,
    headers: HeaderMap,
    body: Body,
}

impl Request {
    /// Creates a request with an empty body.
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            method,
            uri,
            version: Version::HTTP_11,
            headers: HeaderMap::new(),
            body: Body::Empty,
        }
    }

    /// Creates a request from a static target.
    ///
    /// # Panics
    ///
    /// Panics if `uri` is not a valid URI, like [`Uri::from_static`].
    pub fn from_static(method: Method, uri: &'static str) -> Self {
        Self::new(method, Uri::from_static(uri))
    }

    /// Shorthand for a `GET` request to a static target.
    pub fn get(uri: &'static str) -> Self {
        Self::from_static(Method::GET, uri)
    }

    /// Adds a header, builder style.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Replaces the body, builder style.
    pub fn with_body(mut self, body: impl Into<Body>) -> Self {
        self.body = body.into();
        self
    }

    /// Returns the request method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns a mutable reference to the method.
    pub fn method_mut(&mut self) -> &mut Method {
        &mut self.method
    }

    /// Returns the request target.
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Returns a mutable reference to the target.
    pub fn uri_mut(&mut self) -> &mut Uri {
        &mut self.uri
    }

    /// Returns the HTTP version.
    pub fn version(&self) -> Version {
        self.version
    }

    /// Returns a mutable reference to the HTTP version.
    pub fn version_mut(&mut self) -> &mut Version {
        &mut self.version
    }

    /// Returns the request headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns a mutable reference to the headers.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Returns the body.
    pub fn body(&self) -> &Body {
        &self.body
    }

    /// Returns a mutable reference to the body.
    pub fn body_mut(&mut self) -> &mut Body {
        &mut self.body
    }

    /// Returns `true` for methods that only read state (`GET`, `HEAD`).
    pub fn is_safe_read(&self) -> bool {
        self.method == Method::GET || self.method == Method::HEAD
    }

    /// Deep copy of method, target, version, headers and body.
    ///
    /// Fails with [`Error::CloneUnsupported`] when the body is a stream.
    pub fn try_clone(&self) -> Result<Request> {
        let body = self.body.try_clone().ok_or(Error::CloneUnsupported)?;
        Ok(Self {
            method: self.method.clone(),
            uri: self.uri.clone(),
            version: self.version,
            headers: self.headers.clone(),
            body,
        })
    }

    /// Copy of the request without its body.
    pub(crate) fn head(&self) -> Request {
        Self {
            method: self.method.clone(),
            uri: self.uri.clone(),
            version: self.version,
            headers: self.headers.clone(),
            body: Body::Empty,
        }
    }

    /// Hands the request over to a transport.
    ///
    /// The returned request carries the body; `self` keeps method, target and
    /// headers so behaviors can still inspect them while unwinding.
    pub fn take_for_dispatch(&mut self) -> Request {
        let mut dispatched = self.head();
        dispatched.body = std::mem::take(&mut self.body);
        dispatched
    }

    /// Splits the request into its head components and body.
    pub fn into_parts(self) -> (Method, Uri, Version, HeaderMap, Body) {
        (self.method, self.uri, self.version, self.headers, self.body)
    }
}
