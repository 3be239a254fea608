//! HTTP proxy engine.
//!
//! # Responsibilities
//! - Forward one request to the add-on over plain HTTP
//! - Pick the request body mode (buffered vs live stream)
//! - Pick the response delivery mode (buffered vs chunked stream)
//!
//! # Design Decisions
//! - No retries, no timeout; redirects are returned as-is
//! - Content coding is undone on both legs, so encoding headers can be dropped
//! - The add-on status code is passed through unchanged

use axum::{
    body::Body,
    http::{
        header::{ACCEPT_ENCODING, CONTENT_TYPE},
        HeaderValue, Method, Request,
    },
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tower::ServiceExt;
use tower_http::decompression::Decompression;

use crate::error::IngressError;
use crate::http::request::{ProxiedRequest, RequestBody};
use crate::http::response::{delivery_mode, ChunkedBody, DeliveryMode, ProxiedResponse, ResponseBody};
use crate::observability::metrics;
use crate::security::headers::outbound_response_headers;
use crate::routing::Backend;

/// Pooled plaintext client shared by all add-on traffic.
pub type PlainClient = Client<HttpConnector, Body>;

/// [`PlainClient`] that transparently decodes compressed responses.
pub type UpstreamClient = Decompression<PlainClient>;

pub fn upstream_client() -> UpstreamClient {
    let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
    Decompression::new(client)
}

/// Forwards ingress requests to add-ons.
#[derive(Clone)]
pub struct HttpProxy {
    client: UpstreamClient,
    buffer_threshold: u64,
    chunk_size: usize,
}

impl HttpProxy {
    pub fn new(client: UpstreamClient, buffer_threshold: u64, chunk_size: usize) -> Self {
        Self {
            client,
            buffer_threshold,
            chunk_size,
        }
    }

    /// The client without response decoding, for WebSocket upgrades.
    pub fn plain_client(&self) -> PlainClient {
        self.client.get_ref().clone()
    }

    /// Stream the body to a stream-capable add-on on POST, otherwise read it fully.
    pub async fn prepare_body(
        &self,
        method: &Method,
        backend: &Backend,
        body: Body,
    ) -> Result<RequestBody, IngressError> {
        if *method == Method::POST && backend.stream {
            return Ok(RequestBody::Live(body));
        }
        let bytes = axum::body::to_bytes(body, usize::MAX).await?;
        Ok(RequestBody::Buffered(bytes))
    }

    /// Send `request` to `backend` and shape its response for the client.
    pub async fn forward(
        &self,
        backend: &Backend,
        request: ProxiedRequest,
    ) -> Result<ProxiedResponse, IngressError> {
        let url = backend.url(&request.path, request.query.as_deref());
        let live = matches!(request.body, RequestBody::Live(_));

        let mut outbound = Request::builder()
            .method(request.method.clone())
            .uri(url.as_str())
            .body(request.body.into_body())?;
        *outbound.headers_mut() = request.headers;
        // Offer only the codings the decompression layer understands.
        outbound.headers_mut().remove(ACCEPT_ENCODING);

        tracing::debug!(
            slug = %backend.slug,
            method = %request.method,
            url = %url,
            live_body = live,
            "Forwarding ingress request"
        );

        let response = self.client.clone().oneshot(outbound).await.map_err(|e| {
            tracing::error!(slug = %backend.slug, url = %url, error = %e, "Ingress error with add-on");
            IngressError::Upstream(e)
        })?;

        let (parts, body) = response.into_parts();
        let content_type: Option<HeaderValue> = parts.headers.get(CONTENT_TYPE).cloned();
        let headers = outbound_response_headers(&parts.headers);
        let body = Body::new(body);

        let mode = delivery_mode(&parts.headers, self.buffer_threshold);
        metrics::record_response_mode(mode.as_str());
        let body = match mode {
            DeliveryMode::Buffered => ResponseBody::Buffered(axum::body::to_bytes(body, usize::MAX).await?),
            DeliveryMode::Streamed => ResponseBody::Streamed(Body::from_stream(ChunkedBody::new(
                body.into_data_stream(),
                self.chunk_size,
                url,
            ))),
        };

        Ok(ProxiedResponse {
            status: parts.status,
            headers,
            content_type,
            body,
        })
    }
}
