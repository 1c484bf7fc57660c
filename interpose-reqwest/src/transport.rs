//! Transport that dispatches pipeline requests through reqwest.

use async_trait::async_trait;
use bytes::Bytes;
use http::Uri;
use http_body_util::BodyExt;
use interpose_core::{Body, Error, Request, Response, Result, Transport};
use reqwest_middleware::ClientWithMiddleware;
use tracing::debug;

/// Terminal [`Transport`] backed by a reqwest client.
///
/// The client may carry its own `reqwest-middleware` stack; it runs after every
/// interpose behavior. Response bodies are handed back unbuffered, as
/// single-consumption streams.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: ClientWithMiddleware,
    base_url: Option<String>,
}

impl std::fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestTransport")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl ReqwestTransport {
    /// Creates a transport over a plain client.
    pub fn new(client: reqwest::Client) -> Self {
        Self::from_middleware(ClientWithMiddleware::from(client))
    }

    /// Creates a transport over a client with middleware.
    pub fn from_middleware(client: ClientWithMiddleware) -> Self {
        Self {
            client,
            base_url: None,
        }
    }

    /// Resolves targets without scheme and authority, such as `/data`,
    /// against `base_url`.
    pub fn with_base_url(self, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url: Some(base_url),
            ..self
        }
    }

    fn resolve(&self, uri: Uri) -> Result<Uri> {
        if uri.scheme().is_some() {
            return Ok(uri);
        }
        let Some(base) = &self.base_url else {
            return Err(Error::transport(format!(
                "relative target `{uri}` requires a base url"
            )));
        };
        let path = uri.path_and_query().map_or("/", |pq| pq.as_str());
        format!("{base}{path}").parse().map_err(Error::transport)
    }

    async fn build_request(&self, request: Request) -> Result<reqwest::Request> {
        let (method, uri, version, headers, body) = request.into_parts();
        let body = match body {
            Body::Empty => reqwest::Body::from(Bytes::new()),
            Body::Full(bytes) => reqwest::Body::from(bytes),
            // Streams are buffered so reqwest gets a sized body.
            stream @ Body::Stream(_) => reqwest::Body::from(stream.collect().await?),
        };

        let mut builder = http::Request::builder()
            .method(method)
            .uri(self.resolve(uri)?)
            .version(version);
        if let Some(target) = builder.headers_mut() {
            *target = headers;
        }
        let request = builder.body(body).map_err(Error::transport)?;
        reqwest::Request::try_from(request).map_err(Error::transport)
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: Request) -> Result<Response> {
        let request = self.build_request(request).await?;
        debug!(method = %request.method(), url = %request.url(), "Dispatching request");

        let response = self
            .client
            .execute(request)
            .await
            .map_err(Error::transport)?;

        let response: http::Response<reqwest::Body> = response.into();
        Ok(response.map(|body| Body::from_stream(body.into_data_stream())))
    }
}
