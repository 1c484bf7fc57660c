//! Metrics recorded by the behaviors and the background runner.

#![cfg(feature = "metrics")]

use std::time::Duration;

use interpose::{BackgroundRunner, Dedup, Pipeline, Request, StaleWhileRevalidate};
use interpose_test::{MockStore, MockTransport};
use metrics_util::debugging::{DebugValue, DebuggingRecorder};
use metrics_util::{CompositeKey, MetricKind};

type SnapshotEntry = (
    CompositeKey,
    Option<metrics::Unit>,
    Option<metrics::SharedString>,
    DebugValue,
);

/// Sum of a counter over all label sets.
fn counter(entries: &[SnapshotEntry], name: &str) -> u64 {
    entries
        .iter()
        .filter(|(key, _, _, _)| key.kind() == MetricKind::Counter && key.key().name() == name)
        .map(|(_, _, _, value)| match value {
            DebugValue::Counter(count) => *count,
            _ => 0,
        })
        .sum()
}

/// Value of a gauge for the given `kind` label.
fn gauge(entries: &[SnapshotEntry], name: &str, kind: &str) -> Option<f64> {
    entries.iter().find_map(|(key, _, _, value)| {
        let matches = key.kind() == MetricKind::Gauge
            && key.key().name() == name
            && key
                .key()
                .labels()
                .any(|l| l.key() == "kind" && l.value() == kind);
        match value {
            DebugValue::Gauge(value) if matches => Some(value.0),
            _ => None,
        }
    })
}

fn has_label(entries: &[SnapshotEntry], name: &str, label: &str, expected: &str) -> bool {
    entries.iter().any(|(key, _, _, _)| {
        key.key().name() == name
            && key
                .key()
                .labels()
                .any(|l| l.key() == label && l.value() == expected)
    })
}

#[test]
fn pipeline_records_cache_dedup_and_background_metrics() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();

    metrics::with_local_recorder(&recorder, || {
        // Single-threaded so every task records through the local recorder.
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .start_paused(true)
            .build()
            .unwrap();
        rt.block_on(async {
            let pipeline = Pipeline::builder()
                .with(Dedup::new())
                .with(StaleWhileRevalidate::builder().store(MockStore::new()).build())
                .transport(MockTransport::new().with_latency(Duration::from_millis(10)))
                .build();

            let (a, b) = tokio::join!(
                pipeline.execute(Request::get("/data")),
                pipeline.execute(Request::get("/data")),
            );
            a.unwrap();
            b.unwrap();
            pipeline.execute(Request::get("/data")).await.unwrap();
            pipeline.background().wait_all().await;
        });
    });

    let entries = snapshotter.snapshot().into_vec();

    assert_eq!(counter(&entries, "interpose_swr_miss_total"), 1);
    assert_eq!(counter(&entries, "interpose_swr_hit_total"), 1);
    assert_eq!(counter(&entries, "interpose_swr_revalidate_total"), 1);
    assert_eq!(counter(&entries, "interpose_dedup_leader_total"), 2);
    assert_eq!(counter(&entries, "interpose_dedup_waiter_total"), 1);
    assert_eq!(counter(&entries, "interpose_background_tasks_spawned_total"), 1);
    assert_eq!(counter(&entries, "interpose_background_tasks_completed_total"), 1);
    assert_eq!(counter(&entries, "interpose_background_tasks_failed_total"), 0);
    assert!(has_label(
        &entries,
        "interpose_background_tasks_spawned_total",
        "kind",
        "swr"
    ));
}

#[test]
fn panicking_task_releases_the_active_gauge() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();

    metrics::with_local_recorder(&recorder, || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let runner = BackgroundRunner::with_defaults();
            runner.spawn("boom", async {
                if std::hint::black_box(true) {
                    panic!("task failure");
                }
            });
            runner.spawn("quiet", async {});
            runner.wait_all().await;
        });
    });

    let entries = snapshotter.snapshot().into_vec();

    assert_eq!(
        gauge(&entries, "interpose_background_tasks_active", "boom"),
        Some(0.0)
    );
    assert_eq!(
        gauge(&entries, "interpose_background_tasks_active", "quiet"),
        Some(0.0)
    );
    assert_eq!(counter(&entries, "interpose_background_tasks_spawned_total"), 2);
}
