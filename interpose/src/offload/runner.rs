//! Supervised execution of background continuations.

use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use interpose_core::{BehaviorLabel, Context, Error, Result};
use smol_str::SmolStr;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{Instrument, debug, info_span, warn};

use super::config::RunnerConfig;
use crate::pipeline::Chain;

#[cfg(feature = "metrics")]
use crate::metrics::{
    BACKGROUND_TASK_DURATION, BACKGROUND_TASKS_ACTIVE, BACKGROUND_TASKS_COMPLETED,
    BACKGROUND_TASKS_FAILED, BACKGROUND_TASKS_SPAWNED,
};

/// Identifier of a spawned background task.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskId {
    /// Kind of the task, e.g. the label of the behavior that asked for it.
    pub kind: SmolStr,
    /// Unique identifier within the runner.
    pub id: u64,
}

#[derive(Debug)]
struct RunnerInner {
    config: RunnerConfig,
    tasks: DashMap<TaskId, JoinHandle<()>>,
    counter: AtomicU64,
    active: watch::Sender<usize>,
}

/// Untracks a task when it finishes, panics included.
struct TaskGuard {
    inner: Arc<RunnerInner>,
    id: TaskId,
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        if std::thread::panicking() {
            warn!(kind = %self.id.kind, "Background task panicked");
        }
        self.inner.tasks.remove(&self.id);
        self.inner.active.send_modify(|active| *active -= 1);
        #[cfg(feature = "metrics")]
        metrics::gauge!(*BACKGROUND_TASKS_ACTIVE, "kind" => self.id.kind.to_string()).decrement(1.0);
    }
}

/// Runs pipeline continuations as detached tokio tasks.
///
/// The caller gets its response as soon as the foreground run unwinds; the
/// continuation is re-executed here with the background flag set. On success
/// the response body is drained. On failure the error is delivered once to
/// `on_background_error` of every behavior, and a panicking hook does not stop
/// delivery to the rest. There are no retries, timeouts or cancellation.
///
/// Clones share the same set of tasks.
#[derive(Clone, Debug)]
pub struct BackgroundRunner {
    inner: Arc<RunnerInner>,
}

impl BackgroundRunner {
    /// Create a runner with the given configuration.
    pub fn new(config: RunnerConfig) -> Self {
        Self {
            inner: Arc::new(RunnerInner {
                config,
                tasks: DashMap::new(),
                counter: AtomicU64::new(0),
                active: watch::Sender::new(0),
            }),
        }
    }

    /// Create a runner with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(RunnerConfig::default())
    }

    /// Returns the runner configuration.
    pub fn config(&self) -> &RunnerConfig {
        &self.inner.config
    }

    /// Spawn a detached task of the given kind.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<F>(&self, kind: impl Into<SmolStr>, task: F) -> TaskId
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let id = TaskId {
            kind: kind.into(),
            id: self.inner.counter.fetch_add(1, Ordering::Relaxed),
        };
        let threshold = self.inner.config.slow_task_threshold;
        self.inner.active.send_modify(|active| *active += 1);
        #[cfg(feature = "metrics")]
        {
            metrics::counter!(*BACKGROUND_TASKS_SPAWNED, "kind" => id.kind.to_string()).increment(1);
            metrics::gauge!(*BACKGROUND_TASKS_ACTIVE, "kind" => id.kind.to_string()).increment(1.0);
        }
        let guard = TaskGuard {
            inner: self.inner.clone(),
            id: id.clone(),
        };

        // The task starts only once its handle is tracked, so the guard always
        // finds the handle to remove.
        let (registered, gate) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            let _ = gate.await;
            let start = Instant::now();
            task.await;
            let elapsed = start.elapsed();
            if let Some(threshold) = threshold
                && elapsed > threshold
            {
                warn!(
                    kind = %guard.id.kind,
                    elapsed_ms = elapsed.as_millis(),
                    threshold_ms = threshold.as_millis(),
                    "Background task exceeded slow task threshold"
                );
            }
            #[cfg(feature = "metrics")]
            Self::record_finished(elapsed, &guard.id.kind);
            drop(guard);
        });
        self.inner.tasks.insert(id.clone(), handle);
        let _ = registered.send(());

        id
    }

    /// Re-executes `context` through `chain` in the background.
    pub(crate) fn spawn_continuation(&self, chain: Arc<Chain>, mut context: Context) -> TaskId {
        let origin = context
            .background_origin()
            .cloned()
            .unwrap_or_else(|| BehaviorLabel::new_static("pipeline"));
        let span = info_span!(
            "background_task",
            origin = %origin,
            method = %context.request().method(),
            target = %context.request().uri(),
        );

        let kind = SmolStr::new(origin.as_str());

        self.spawn(
            kind,
            async move {
                context.mark_background();
                match Self::continue_in_background(&chain, &mut context).await {
                    Ok(drained) => {
                        debug!(drained_bytes = drained, "Background continuation completed");
                        #[cfg(feature = "metrics")]
                        metrics::counter!(*BACKGROUND_TASKS_COMPLETED, "kind" => origin.to_string())
                            .increment(1);
                    }
                    Err(error) => {
                        warn!(%error, "Background continuation failed");
                        #[cfg(feature = "metrics")]
                        metrics::counter!(*BACKGROUND_TASKS_FAILED, "kind" => origin.to_string())
                            .increment(1);
                        Self::fan_out(&chain, &error);
                    }
                }
            }
            .instrument(span),
        )
    }

    async fn continue_in_background(chain: &Chain, context: &mut Context) -> Result<u64> {
        let outcome = chain.run(context).await?;
        // A continuation produced by a background run is not scheduled again.
        outcome.into_response().into_body().drain().await
    }

    fn fan_out(chain: &Chain, error: &Error) {
        for behavior in chain.behaviors() {
            let delivered = catch_unwind(AssertUnwindSafe(|| behavior.on_background_error(error)));
            if delivered.is_err() {
                warn!(behavior = %behavior.label(), "Background error hook panicked");
            }
        }
    }

    /// Get the number of currently active tasks.
    pub fn active_task_count(&self) -> usize {
        *self.inner.active.borrow()
    }

    /// Check whether a task is still running.
    pub fn is_in_flight(&self, id: &TaskId) -> bool {
        self.inner
            .tasks
            .get(id)
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Wait until no task is active, including tasks spawned while waiting.
    pub async fn wait_all(&self) {
        let mut active = self.inner.active.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = active.wait_for(|count| *count == 0).await;
    }

    /// Wait for all tasks with a timeout.
    ///
    /// Returns `true` if all tasks completed within the timeout.
    pub async fn wait_all_timeout(&self, timeout: std::time::Duration) -> bool {
        tokio::time::timeout(timeout, self.wait_all()).await.is_ok()
    }

    #[cfg(feature = "metrics")]
    fn record_finished(elapsed: std::time::Duration, kind: &SmolStr) {
        metrics::histogram!(*BACKGROUND_TASK_DURATION, "kind" => kind.to_string())
            .record(elapsed.as_secs_f64());
    }
}

impl Default for BackgroundRunner {
    fn default() -> Self {
        Self::with_defaults()
    }
}
