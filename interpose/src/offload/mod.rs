//! Background execution of pipeline continuations.
//!
//! When the outermost [`Outcome`](interpose_core::Outcome) of a pipeline run
//! carries a continuation, the caller receives the immediate response and the
//! continuation is handed to a [`BackgroundRunner`]. The stale-while-revalidate
//! behavior relies on this to refresh a cache entry after serving it.
//!
//! # Example
//!
//! ```
//! use interpose::offload::{BackgroundRunner, RunnerConfig};
//! use std::time::Duration;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let runner = BackgroundRunner::new(
//!     RunnerConfig::builder()
//!         .slow_task_threshold(Duration::from_secs(5))
//!         .build(),
//! );
//! runner.spawn("warmup", async { /* ... */ });
//! runner.wait_all().await;
//! # });
//! ```

mod config;
mod runner;

pub use config::{RunnerConfig, RunnerConfigBuilder};
pub use runner::{BackgroundRunner, TaskId};
