use std::sync::Arc;

use async_trait::async_trait;
use http::StatusCode;
use interpose::{Behavior, Body, Context, Next, Outcome, Pipeline, Request, Response, Result};
use interpose_test::{Journal, MockTransport, RecordingBehavior};

/// Answers without calling inner steps.
struct ShortCircuit;

#[async_trait]
impl Behavior for ShortCircuit {
    async fn process(&self, _ctx: &mut Context, _next: Next<'_>) -> Result<Outcome> {
        let mut response = Response::new(Body::from("blocked"));
        *response.status_mut() = StatusCode::FORBIDDEN;
        Ok(Outcome::immediate(response))
    }
}

#[tokio::test]
async fn behaviors_unwind_in_reverse_order() {
    let journal = Journal::new();
    let transport = MockTransport::new();
    let pipeline = Pipeline::builder()
        .with(RecordingBehavior::new("outer", journal.clone()))
        .with(RecordingBehavior::new("inner", journal.clone()))
        .transport(transport.clone())
        .build();

    let response = pipeline.execute(Request::get("/data")).await.unwrap();

    assert_eq!(response.into_body().collect().await.unwrap(), "response #1");
    assert_eq!(journal.entries(), vec![">outer", ">inner", "<inner", "<outer"]);
    assert_eq!(transport.calls(), 1);
}

#[tokio::test]
async fn short_circuit_never_reaches_transport() {
    let journal = Journal::new();
    let transport = MockTransport::new();
    let pipeline = Pipeline::builder()
        .with(RecordingBehavior::new("outer", journal.clone()))
        .with(ShortCircuit)
        .with(RecordingBehavior::new("never", journal.clone()))
        .transport(transport.clone())
        .build();

    let response = pipeline.execute(Request::get("/data")).await.unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(journal.entries(), vec![">outer", "<outer"]);
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn transport_errors_propagate_to_caller() {
    let journal = Journal::new();
    let pipeline = Pipeline::builder()
        .with(RecordingBehavior::new("outer", journal.clone()))
        .transport(MockTransport::new().failing())
        .build();

    let error = pipeline.execute(Request::get("/data")).await.unwrap_err();

    assert!(error.is_transport());
    // The behavior still unwinds on failure.
    assert_eq!(journal.entries(), vec![">outer", "<outer"]);
    // No continuation, so no hook is told about a foreground failure.
    assert!(journal.matching("!").is_empty());
}

#[tokio::test]
async fn empty_pipeline_calls_transport_directly() {
    let transport = MockTransport::new();
    let pipeline = Pipeline::builder().transport(transport.clone()).build();

    assert!(pipeline.is_empty());
    let response = pipeline.execute(Request::get("/direct")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let seen = transport.seen();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].uri.path(), "/direct");
}

#[tokio::test]
async fn shared_behaviors_serve_several_pipelines() {
    let journal = Journal::new();
    let shared: Arc<dyn Behavior> = Arc::new(RecordingBehavior::new("shared", journal.clone()));
    let first = Pipeline::builder()
        .with_shared(shared.clone())
        .transport(MockTransport::new())
        .build();
    let second = Pipeline::builder()
        .with_shared(shared)
        .transport(MockTransport::new())
        .build();

    first.execute(Request::get("/a")).await.unwrap();
    second.execute(Request::get("/b")).await.unwrap();

    assert_eq!(journal.matching(">shared").len(), 2);
    assert!(format!("{first:?}").contains("shared"));
}

#[tokio::test]
async fn execute_context_returns_finished_context() {
    let pipeline = Pipeline::builder().transport(MockTransport::new()).build();
    let (response, ctx) = pipeline
        .execute_context(Context::new(Request::get("/data")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(!ctx.from_cache());
    assert!(!ctx.is_background());
    assert_eq!(ctx.request().uri().path(), "/data");
}
