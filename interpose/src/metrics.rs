//! Metrics declaration and initialization.
//!
//! All metric names follow `interpose_{component}_{event}`. Metrics are only
//! recorded when the `metrics` feature is enabled; without it every recording
//! site compiles away.

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
lazy_static! {
    // Stale-while-revalidate

    /// Track number of SWR cache hits.
    pub static ref SWR_HIT_COUNTER: &'static str = {
        metrics::describe_counter!(
            "interpose_swr_hit_total",
            "Total number of responses served from the SWR cache."
        );
        "interpose_swr_hit_total"
    };
    /// Track number of SWR cache misses.
    pub static ref SWR_MISS_COUNTER: &'static str = {
        metrics::describe_counter!(
            "interpose_swr_miss_total",
            "Total number of SWR cache misses."
        );
        "interpose_swr_miss_total"
    };
    /// Track number of background revalidations that reached the SWR behavior.
    pub static ref SWR_REVALIDATE_COUNTER: &'static str = {
        metrics::describe_counter!(
            "interpose_swr_revalidate_total",
            "Total number of background revalidations handled by SWR."
        );
        "interpose_swr_revalidate_total"
    };
    /// Track number of failed cache store operations.
    pub static ref SWR_STORE_ERRORS: &'static str = {
        metrics::describe_counter!(
            "interpose_swr_store_errors_total",
            "Total number of cache store read or write failures."
        );
        "interpose_swr_store_errors_total"
    };

    // Dedup

    /// Track number of calls that performed the real transport call.
    pub static ref DEDUP_LEADER_COUNTER: &'static str = {
        metrics::describe_counter!(
            "interpose_dedup_leader_total",
            "Total number of deduplicated calls that reached the transport."
        );
        "interpose_dedup_leader_total"
    };
    /// Track number of calls that shared another call's outcome.
    pub static ref DEDUP_WAITER_COUNTER: &'static str = {
        metrics::describe_counter!(
            "interpose_dedup_waiter_total",
            "Total number of calls coalesced onto an in-flight call."
        );
        "interpose_dedup_waiter_total"
    };

    // Background runner

    /// Track number of background tasks spawned.
    pub static ref BACKGROUND_TASKS_SPAWNED: &'static str = {
        metrics::describe_counter!(
            "interpose_background_tasks_spawned_total",
            "Total number of background tasks spawned."
        );
        "interpose_background_tasks_spawned_total"
    };
    /// Track number of background tasks completed successfully.
    pub static ref BACKGROUND_TASKS_COMPLETED: &'static str = {
        metrics::describe_counter!(
            "interpose_background_tasks_completed_total",
            "Total number of background tasks completed successfully."
        );
        "interpose_background_tasks_completed_total"
    };
    /// Track number of background tasks that failed.
    pub static ref BACKGROUND_TASKS_FAILED: &'static str = {
        metrics::describe_counter!(
            "interpose_background_tasks_failed_total",
            "Total number of background continuations that failed."
        );
        "interpose_background_tasks_failed_total"
    };
    /// Gauge of currently active background tasks.
    pub static ref BACKGROUND_TASKS_ACTIVE: &'static str = {
        metrics::describe_gauge!(
            "interpose_background_tasks_active",
            "Number of currently active background tasks."
        );
        "interpose_background_tasks_active"
    };
    /// Histogram of background task duration.
    pub static ref BACKGROUND_TASK_DURATION: &'static str = {
        metrics::describe_histogram!(
            "interpose_background_task_duration_seconds",
            metrics::Unit::Seconds,
            "Duration of background tasks in seconds."
        );
        "interpose_background_task_duration_seconds"
    };
}
