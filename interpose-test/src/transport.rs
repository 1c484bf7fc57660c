//! Scripted transport with call accounting.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream;
use http::{HeaderMap, Method, StatusCode, Uri};
use interpose_core::{Body, Error, Request, Response, Result, Transport};

type Responder = dyn Fn(&Request, usize) -> Result<Response> + Send + Sync;

/// Request as seen by the transport.
#[derive(Debug, Clone)]
pub struct SeenRequest {
    /// Request method.
    pub method: Method,
    /// Request target.
    pub uri: Uri,
    /// Request headers at dispatch time.
    pub headers: HeaderMap,
}

#[derive(Debug, Default)]
struct State {
    calls: AtomicUsize,
    seen: Mutex<Vec<SeenRequest>>,
}

/// Transport double that counts calls and answers from a script.
///
/// By default every call answers `200 OK` with body `response #{n}`, where
/// `n` is the 1-based call number. Clones share their call counter.
#[derive(Clone)]
pub struct MockTransport {
    latency: Duration,
    streaming: bool,
    responder: Arc<Responder>,
    state: Arc<State>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    /// Creates a transport answering `200 OK`.
    pub fn new() -> Self {
        Self {
            latency: Duration::ZERO,
            streaming: false,
            responder: Arc::new(|_: &Request, call: usize| {
                Ok(Response::new(Body::from(format!("response #{call}"))))
            }),
            state: Arc::new(State::default()),
        }
    }

    /// Delays every response by `latency`.
    pub fn with_latency(self, latency: Duration) -> Self {
        Self { latency, ..self }
    }

    /// Answers with `status` and the default body.
    pub fn with_status(self, status: StatusCode) -> Self {
        self.responding(move |_, call| {
            let mut response = Response::new(Body::from(format!("response #{call}")));
            *response.status_mut() = status;
            Ok(response)
        })
    }

    /// Answers every call with a transport error.
    pub fn failing(self) -> Self {
        self.responding(|_, call| {
            Err(Error::transport(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                format!("connection refused on call #{call}"),
            )))
        })
    }

    /// Answers through `responder`, which receives the request and the call number.
    pub fn responding<F>(self, responder: F) -> Self
    where
        F: Fn(&Request, usize) -> Result<Response> + Send + Sync + 'static,
    {
        Self {
            responder: Arc::new(responder),
            ..self
        }
    }

    /// Hands buffered response bodies out as single-consumption streams.
    pub fn streaming(self) -> Self {
        Self {
            streaming: true,
            ..self
        }
    }

    /// Number of calls received so far.
    pub fn calls(&self) -> usize {
        self.state.calls.load(Ordering::SeqCst)
    }

    /// Requests received so far, in arrival order.
    pub fn seen(&self) -> Vec<SeenRequest> {
        self.state.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: Request) -> Result<Response> {
        let call = self.state.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.seen.lock().unwrap().push(SeenRequest {
            method: request.method().clone(),
            uri: request.uri().clone(),
            headers: request.headers().clone(),
        });

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let response = (self.responder)(&request, call)?;
        if !self.streaming {
            return Ok(response);
        }
        let (parts, body) = response.into_parts();
        let bytes = body.collect().await?;
        let chunks: Vec<std::result::Result<Bytes, std::io::Error>> = bytes
            .chunks(4)
            .map(|chunk| Ok(Bytes::copy_from_slice(chunk)))
            .collect();
        Ok(Response::from_parts(
            parts,
            Body::from_stream(stream::iter(chunks)),
        ))
    }
}
