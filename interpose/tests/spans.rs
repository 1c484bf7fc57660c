use interpose::{Pipeline, Request, StaleWhileRevalidate};
use interpose_test::tracing::set_span_capture;
use interpose_test::{MockStore, MockTransport};

#[tokio::test]
async fn background_runs_are_traced_under_their_origin() {
    let (collector, _guard) = set_span_capture();
    let pipeline = Pipeline::builder()
        .with(StaleWhileRevalidate::builder().store(MockStore::new()).build())
        .transport(MockTransport::new())
        .build();

    pipeline.execute(Request::get("/data")).await.unwrap();
    pipeline.execute(Request::get("/data")).await.unwrap();
    pipeline.background().wait_all().await;

    collector.assert_span_sequence(&["pipeline", "pipeline", "background_task", "pipeline"]);

    let tasks = collector.named("background_task");
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].field("origin"), Some("swr"));
    assert_eq!(tasks[0].field("target"), Some("/data"));

    let nested = collector.children_of(&tasks[0]);
    assert_eq!(nested.len(), 1);
    assert_eq!(nested[0].name, "pipeline");
    assert_eq!(nested[0].field("background"), Some("true"));

    let foreground: Vec<_> = collector
        .named("pipeline")
        .into_iter()
        .filter(|span| span.field("background") == Some("false"))
        .collect();
    assert_eq!(foreground.len(), 2);
}
