use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use http::Method;
use interpose::concurrency::InFlightTable;
use interpose::{Coalesced, Context, Dedup, DedupKey, Error, Pipeline, Request};
use interpose_test::MockTransport;

fn pipeline(transport: &MockTransport, table: &Arc<InFlightTable>) -> Pipeline {
    Pipeline::builder()
        .with(Dedup::builder().in_flight(table.clone()).build())
        .transport(transport.clone())
        .build()
}

#[tokio::test(start_paused = true)]
async fn concurrent_calls_share_one_transport_call() {
    let transport = MockTransport::new().with_latency(Duration::from_millis(100));
    let table = Arc::new(InFlightTable::new());
    let pipeline = pipeline(&transport, &table);

    let calls = (0..5).map(|_| pipeline.execute(Request::get("/data")));
    let responses = join_all(calls).await;

    assert_eq!(transport.calls(), 1);
    for response in responses {
        let body = response.unwrap().into_body().collect().await.unwrap();
        assert_eq!(body, "response #1");
    }
    assert!(table.is_empty());
}

#[tokio::test(start_paused = true)]
async fn waiters_share_the_leaders_error() {
    let transport = MockTransport::new()
        .with_latency(Duration::from_millis(100))
        .failing();
    let table = Arc::new(InFlightTable::new());
    let pipeline = pipeline(&transport, &table);

    let calls = (0..3).map(|_| pipeline.execute(Request::get("/data")));
    let results = join_all(calls).await;

    assert_eq!(transport.calls(), 1);
    for result in results {
        assert!(result.unwrap_err().is_transport());
    }
    assert!(table.is_empty());
}

#[tokio::test(start_paused = true)]
async fn different_keys_are_not_coalesced() {
    let transport = MockTransport::new().with_latency(Duration::from_millis(100));
    let table = Arc::new(InFlightTable::new());
    let pipeline = pipeline(&transport, &table);

    let (a, b) = tokio::join!(
        pipeline.execute(Request::get("/a")),
        pipeline.execute(Request::get("/b")),
    );

    assert!(a.is_ok() && b.is_ok());
    assert_eq!(transport.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn unsafe_methods_bypass_dedup() {
    let transport = MockTransport::new().with_latency(Duration::from_millis(100));
    let table = Arc::new(InFlightTable::new());
    let pipeline = pipeline(&transport, &table);

    let (a, b) = tokio::join!(
        pipeline.execute(Request::from_static(Method::POST, "/orders")),
        pipeline.execute(Request::from_static(Method::POST, "/orders")),
    );

    assert!(a.is_ok() && b.is_ok());
    assert_eq!(transport.calls(), 2);
}

#[tokio::test]
async fn sequential_calls_are_not_coalesced() {
    let transport = MockTransport::new();
    let table = Arc::new(InFlightTable::new());
    let pipeline = pipeline(&transport, &table);

    let first = pipeline.execute(Request::get("/data")).await.unwrap();
    let second = pipeline.execute(Request::get("/data")).await.unwrap();

    assert_eq!(first.into_body().collect().await.unwrap(), "response #1");
    assert_eq!(second.into_body().collect().await.unwrap(), "response #2");
    assert_eq!(transport.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn waiters_are_marked_coalesced() {
    let transport = MockTransport::new().with_latency(Duration::from_millis(100));
    let table = Arc::new(InFlightTable::new());
    let pipeline = pipeline(&transport, &table);

    let (leader, waiter) = tokio::join!(
        pipeline.execute_context(Context::new(Request::get("/data"))),
        pipeline.execute_context(Context::new(Request::get("/data"))),
    );
    let (_, leader) = leader.unwrap();
    let (_, waiter) = waiter.unwrap();

    assert!(leader.extensions().get::<Coalesced>().is_none());
    assert!(waiter.extensions().get::<Coalesced>().is_some());
    assert_eq!(
        waiter.extensions().get::<DedupKey>().map(|key| key.0.as_str()),
        Some("GET:/data")
    );
}

#[tokio::test(start_paused = true)]
async fn cancelled_leader_releases_waiters() {
    let transport = MockTransport::new().with_latency(Duration::from_secs(1));
    let table = Arc::new(InFlightTable::new());
    let pipeline = pipeline(&transport, &table);

    let leader = tokio::spawn({
        let pipeline = pipeline.clone();
        async move { pipeline.execute(Request::get("/slow")).await }
    });
    tokio::task::yield_now().await;
    let waiter = tokio::spawn({
        let pipeline = pipeline.clone();
        async move { pipeline.execute(Request::get("/slow")).await }
    });
    tokio::task::yield_now().await;
    assert_eq!(table.len(), 1);

    leader.abort();
    let result = waiter.await.unwrap();

    assert!(matches!(result, Err(Error::Abandoned(key)) if key.as_str() == "GET:/slow"));
    assert!(table.is_empty());
}

#[tokio::test]
async fn empty_keys_are_rejected() {
    let transport = MockTransport::new();
    let pipeline = Pipeline::builder()
        .with(
            Dedup::builder()
                .key_generator(|_: &Request| interpose::CacheKey::new(""))
                .build(),
        )
        .transport(transport.clone())
        .build();

    let error = pipeline.execute(Request::get("/data")).await.unwrap_err();

    assert!(matches!(error, Error::InvalidKey(_)));
    assert_eq!(transport.calls(), 0);
}
