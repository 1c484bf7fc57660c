//! The behavior contract and the chain cursor passed to it.
//!
//! A [`Behavior`] wraps one outbound call. It receives the call's
//! [`Context`] and a [`Next`] cursor pointing at the rest of the chain:
//!
//! - calling `next.run(ctx)` hands the call to the following behavior (or the
//!   transport, for the innermost one) and resumes once the inner part of the
//!   chain has unwound
//! - not calling it short-circuits the chain, e.g. to serve from a cache
//!
//! [`Next::run`] takes `self` by value, so a behavior cannot forward the same
//! call twice.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::context::Context;
use crate::error::{Error, Result};
use crate::label::BehaviorLabel;
use crate::outcome::Outcome;
use crate::transport::Transport;

/// One interception step of a pipeline.
///
/// # Examples
///
/// A behavior that stamps a header on every outbound call:
///
/// ```rust
/// use async_trait::async_trait;
/// use http::HeaderValue;
/// use interpose_core::{Behavior, Context, Next, Outcome, Result};
///
/// struct Stamp;
///
/// #[async_trait]
/// impl Behavior for Stamp {
///     async fn process(&self, ctx: &mut Context, next: Next<'_>) -> Result<Outcome> {
///         ctx.request_mut()
///             .headers_mut()
///             .insert("x-client", HeaderValue::from_static("interpose"));
///         next.run(ctx).await
///     }
/// }
/// ```
#[async_trait]
pub trait Behavior: Send + Sync {
    /// Name used in spans, logs and metric labels.
    fn label(&self) -> BehaviorLabel {
        BehaviorLabel::new_static(std::any::type_name::<Self>())
    }

    /// Handles one call.
    async fn process(&self, ctx: &mut Context, next: Next<'_>) -> Result<Outcome>;

    /// Called once for every failed background continuation.
    ///
    /// Every behavior of the pipeline is notified, not only the one that asked
    /// for the continuation.
    fn on_background_error(&self, _error: &Error) {}
}

#[async_trait]
impl<B> Behavior for Arc<B>
where
    B: Behavior + ?Sized,
{
    fn label(&self) -> BehaviorLabel {
        (**self).label()
    }

    async fn process(&self, ctx: &mut Context, next: Next<'_>) -> Result<Outcome> {
        (**self).process(ctx, next).await
    }

    fn on_background_error(&self, error: &Error) {
        (**self).on_background_error(error)
    }
}

/// Cursor over the remainder of a pipeline.
pub struct Next<'a> {
    behaviors: &'a [Arc<dyn Behavior>],
    transport: &'a dyn Transport,
}

impl<'a> Next<'a> {
    /// Cursor starting at the first of `behaviors` and ending at `transport`.
    pub fn new(behaviors: &'a [Arc<dyn Behavior>], transport: &'a dyn Transport) -> Self {
        Self {
            behaviors,
            transport,
        }
    }

    /// Number of behaviors left before the transport.
    pub fn remaining(&self) -> usize {
        self.behaviors.len()
    }

    /// Runs the rest of the chain for `ctx`.
    ///
    /// When no behaviors are left the request body is moved into the
    /// transport; the request head stays in `ctx`.
    pub fn run(self, ctx: &'a mut Context) -> BoxFuture<'a, Result<Outcome>> {
        match self.behaviors.split_first() {
            Some((head, tail)) => {
                let next = Next {
                    behaviors: tail,
                    transport: self.transport,
                };
                head.process(ctx, next)
            }
            None => {
                let transport = self.transport;
                Box::pin(async move {
                    let request = ctx.request_mut().take_for_dispatch();
                    transport.send(request).await.map(Outcome::immediate)
                })
            }
        }
    }
}

impl std::fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Next")
            .field("remaining", &self.behaviors.len())
            .finish_non_exhaustive()
    }
}
