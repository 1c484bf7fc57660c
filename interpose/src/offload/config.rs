//! Background runner configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the [`BackgroundRunner`](super::BackgroundRunner).
///
/// Deserializable with human-readable durations:
///
/// ```
/// use interpose::offload::RunnerConfig;
/// use std::time::Duration;
///
/// let config: RunnerConfig = serde_json::from_str(r#"{"slow_task_threshold": "2s"}"#).unwrap();
/// assert_eq!(config.slow_task_threshold, Some(Duration::from_secs(2)));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Log a warning when a background task runs longer than this.
    ///
    /// The task is never cancelled.
    #[serde(default, with = "humantime_serde")]
    pub slow_task_threshold: Option<Duration>,
}

impl RunnerConfig {
    /// Create a new builder for `RunnerConfig`.
    pub fn builder() -> RunnerConfigBuilder {
        RunnerConfigBuilder::default()
    }
}

/// Builder for [`RunnerConfig`].
#[derive(Debug, Clone, Default)]
pub struct RunnerConfigBuilder {
    slow_task_threshold: Option<Duration>,
}

impl RunnerConfigBuilder {
    /// Set the slow task warning threshold.
    pub fn slow_task_threshold(self, threshold: Duration) -> Self {
        Self {
            slow_task_threshold: Some(threshold),
        }
    }

    /// Build the `RunnerConfig`.
    pub fn build(self) -> RunnerConfig {
        RunnerConfig {
            slow_task_threshold: self.slow_task_threshold,
        }
    }
}
