//! Per-call context threaded through the pipeline.
//!
//! A [`Context`] wraps the [`Request`] together with a typed metadata bag and
//! two status flags:
//!
//! - `from_cache`: the response handed to the caller was replayed from a cache
//! - `background`: this run is a background continuation, nobody awaits it
//!
//! Behaviors share data through the metadata bag, an [`http::Extensions`]
//! map keyed by type. Each behavior defines its own small newtypes (for
//! example the deduplicator's `DedupKey`), so one behavior can read what
//! another recorded without stringly-typed lookups.

use http::Extensions;

use crate::error::Result;
use crate::label::BehaviorLabel;
use crate::request::Request;

/// State of one logical call as it travels through the pipeline.
#[derive(Debug)]
pub struct Context {
    request: Request,
    extensions: Extensions,
    from_cache: bool,
    background: bool,
    origin: Option<BehaviorLabel>,
}

impl Context {
    /// Creates a foreground context for `request`.
    pub fn new(request: Request) -> Self {
        Self {
            request,
            extensions: Extensions::new(),
            from_cache: false,
            background: false,
            origin: None,
        }
    }

    /// Returns the request.
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Returns a mutable reference to the request.
    pub fn request_mut(&mut self) -> &mut Request {
        &mut self.request
    }

    /// Consumes the context, returning its request.
    pub fn into_request(self) -> Request {
        self.request
    }

    /// Returns the metadata bag.
    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    /// Returns a mutable reference to the metadata bag.
    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }

    /// Returns `true` if the response was served from a cache.
    pub fn from_cache(&self) -> bool {
        self.from_cache
    }

    /// Sets the `from_cache` flag.
    pub fn set_from_cache(&mut self, from_cache: bool) {
        self.from_cache = from_cache;
    }

    /// Returns `true` for background continuation runs.
    pub fn is_background(&self) -> bool {
        self.background
    }

    /// Flags this context as a background run.
    pub fn mark_background(&mut self) {
        self.background = true;
    }

    /// Label of the behavior that created this continuation, if any.
    pub fn background_origin(&self) -> Option<&BehaviorLabel> {
        self.origin.as_ref()
    }

    /// Independent metadata view over the same call.
    ///
    /// Metadata is shallow-duplicated and the request head (method, target,
    /// headers) is copied. The body stays with `self`: the copy is meant for
    /// inspection, not for sending the request a second time.
    pub fn copy(&self) -> Context {
        Self {
            request: self.request.head(),
            extensions: self.extensions.clone(),
            from_cache: self.from_cache,
            background: self.background,
            origin: self.origin.clone(),
        }
    }

    /// Context for a background continuation of this call.
    ///
    /// The request is structurally cloned so it can be dispatched again and the
    /// metadata is shallow-duplicated. `origin` names the behavior asking for the
    /// continuation. The background flag itself is set by the runner right
    /// before re-execution; `from_cache` starts out cleared.
    ///
    /// Fails with [`Error::CloneUnsupported`](crate::Error::CloneUnsupported)
    /// when the request body is a single-consumption stream.
    pub fn copy_for_background(&self, origin: impl Into<BehaviorLabel>) -> Result<Context> {
        Ok(Self {
            request: self.request.try_clone()?,
            extensions: self.extensions.clone(),
            from_cache: false,
            background: self.background,
            origin: Some(origin.into()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Body, Error};
    use bytes::Bytes;
    use futures::stream;
    use http::HeaderValue;

    #[derive(Debug, Clone, PartialEq)]
    struct Attempt(u32);

    #[test]
    fn background_copy_does_not_share_headers() {
        let mut ctx = Context::new(Request::get("/data"));
        ctx.request_mut()
            .headers_mut()
            .insert("authorization", HeaderValue::from_static("Bearer a"));

        let mut background = ctx.copy_for_background("swr").unwrap();
        background
            .request_mut()
            .headers_mut()
            .insert("authorization", HeaderValue::from_static("Bearer b"));

        assert_eq!(ctx.request().headers()["authorization"], "Bearer a");
        assert_eq!(background.request().headers()["authorization"], "Bearer b");
        assert_eq!(background.background_origin().unwrap(), "swr");
        assert!(!background.is_background());
    }

    #[test]
    fn copies_duplicate_metadata_shallowly() {
        let mut ctx = Context::new(Request::get("/data"));
        ctx.extensions_mut().insert(Attempt(1));
        ctx.set_from_cache(true);

        let mut view = ctx.copy();
        view.extensions_mut().insert(Attempt(2));

        assert_eq!(ctx.extensions().get::<Attempt>(), Some(&Attempt(1)));
        assert_eq!(view.extensions().get::<Attempt>(), Some(&Attempt(2)));
        assert!(view.from_cache());

        let background = ctx.copy_for_background("swr").unwrap();
        assert_eq!(background.extensions().get::<Attempt>(), Some(&Attempt(1)));
        assert!(!background.from_cache());
    }

    #[test]
    fn streaming_request_cannot_continue_in_background() {
        let chunks: Vec<std::result::Result<Bytes, std::io::Error>> =
            vec![Ok(Bytes::from_static(b"chunk"))];
        let ctx = Context::new(
            Request::get("/upload").with_body(Body::from_stream(stream::iter(chunks))),
        );
        assert!(matches!(
            ctx.copy_for_background("swr"),
            Err(Error::CloneUnsupported)
        ));
    }
}
