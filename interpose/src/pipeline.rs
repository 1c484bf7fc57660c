//! Pipeline construction and execution.

use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;
use interpose_core::{Behavior, Context, Next, Outcome, Request, Response, Result, Transport};
use tracing::{Instrument, debug, info_span};

use crate::offload::BackgroundRunner;

/// Ordered behaviors plus the terminal transport.
pub(crate) struct Chain {
    behaviors: Vec<Arc<dyn Behavior>>,
    transport: Arc<dyn Transport>,
}

impl Chain {
    pub(crate) fn run<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, Result<Outcome>> {
        let span = info_span!(
            "pipeline",
            method = %ctx.request().method(),
            target = %ctx.request().uri(),
            background = ctx.is_background(),
        );
        Box::pin(
            Next::new(&self.behaviors, self.transport.as_ref())
                .run(ctx)
                .instrument(span),
        )
    }

    pub(crate) fn behaviors(&self) -> &[Arc<dyn Behavior>] {
        &self.behaviors
    }
}

/// A composed chain of behaviors around a transport.
///
/// Behaviors run in the order they were added and unwind in reverse. When the
/// outermost [`Outcome`] carries a continuation, the response is returned to
/// the caller and the continuation is re-run by the [`BackgroundRunner`].
///
/// Cloning a pipeline is cheap; clones share behaviors, transport and runner.
///
/// # Example
///
/// ```
/// use async_trait::async_trait;
/// use interpose::{Body, Pipeline, Request, Response, Result, Transport};
///
/// struct Static;
///
/// #[async_trait]
/// impl Transport for Static {
///     async fn send(&self, _request: Request) -> Result<Response> {
///         Ok(Response::new(Body::from("hello")))
///     }
/// }
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let pipeline = Pipeline::builder().transport(Static).build();
/// let response = pipeline.execute(Request::get("/greeting")).await.unwrap();
/// assert_eq!(response.into_body().collect().await.unwrap(), "hello");
/// # });
/// ```
#[derive(Clone)]
pub struct Pipeline {
    chain: Arc<Chain>,
    runner: BackgroundRunner,
}

impl Pipeline {
    /// Creates a new [`PipelineBuilder`].
    pub fn builder() -> PipelineBuilder<NoTransport> {
        PipelineBuilder::new()
    }

    /// Executes `request` and returns the response.
    pub async fn execute(&self, request: Request) -> Result<Response> {
        self.execute_context(Context::new(request))
            .await
            .map(|(response, _)| response)
    }

    /// Executes a prepared context.
    ///
    /// Returns the response together with the finished context, so callers can
    /// inspect flags and metadata recorded by behaviors.
    pub async fn execute_context(&self, mut ctx: Context) -> Result<(Response, Context)> {
        let outcome = self.chain.run(&mut ctx).await?;
        let (response, continuation) = outcome.into_parts();
        if let Some(background) = continuation {
            if ctx.is_background() {
                debug!("Dropping continuation produced by a background run");
            } else {
                self.runner.spawn_continuation(self.chain.clone(), background);
            }
        }
        Ok((response, ctx))
    }

    /// Runs the chain once for `ctx` without scheduling any continuation.
    pub async fn run(&self, ctx: &mut Context) -> Result<Outcome> {
        self.chain.run(ctx).await
    }

    /// Returns the background runner.
    pub fn background(&self) -> &BackgroundRunner {
        &self.runner
    }

    /// Number of behaviors in the chain.
    pub fn len(&self) -> usize {
        self.chain.behaviors.len()
    }

    /// Returns `true` if the chain has no behaviors.
    pub fn is_empty(&self) -> bool {
        self.chain.behaviors.is_empty()
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let labels: Vec<_> = self
            .chain
            .behaviors
            .iter()
            .map(|behavior| behavior.label())
            .collect();
        f.debug_struct("Pipeline")
            .field("behaviors", &labels)
            .field("runner", &self.runner)
            .finish_non_exhaustive()
    }
}

/// Marker for a builder without a transport.
///
/// When you see `NoTransport` in a compiler error, it means
/// [`PipelineBuilder::transport`] has not been called yet.
pub struct NoTransport;

/// Builder for [`Pipeline`].
pub struct PipelineBuilder<T> {
    behaviors: Vec<Arc<dyn Behavior>>,
    transport: T,
    runner: Option<BackgroundRunner>,
}

impl PipelineBuilder<NoTransport> {
    /// Creates a builder with no behaviors and no transport.
    pub fn new() -> Self {
        Self {
            behaviors: Vec::new(),
            transport: NoTransport,
            runner: None,
        }
    }
}

impl Default for PipelineBuilder<NoTransport> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> PipelineBuilder<T> {
    /// Appends a behavior. Behaviors run in the order they are added.
    pub fn with<B>(mut self, behavior: B) -> Self
    where
        B: Behavior + 'static,
    {
        self.behaviors.push(Arc::new(behavior));
        self
    }

    /// Appends a behavior that is shared with other pipelines.
    pub fn with_shared(mut self, behavior: Arc<dyn Behavior>) -> Self {
        self.behaviors.push(behavior);
        self
    }

    /// Uses `runner` for background continuations.
    pub fn runner(self, runner: BackgroundRunner) -> Self {
        Self {
            runner: Some(runner),
            ..self
        }
    }

    /// Sets the terminal transport.
    pub fn transport<U>(self, transport: U) -> PipelineBuilder<Arc<dyn Transport>>
    where
        U: Transport + 'static,
    {
        PipelineBuilder {
            behaviors: self.behaviors,
            transport: Arc::new(transport),
            runner: self.runner,
        }
    }
}

impl PipelineBuilder<Arc<dyn Transport>> {
    /// Builds the [`Pipeline`].
    pub fn build(self) -> Pipeline {
        Pipeline {
            chain: Arc::new(Chain {
                behaviors: self.behaviors,
                transport: self.transport,
            }),
            runner: self.runner.unwrap_or_default(),
        }
    }
}
