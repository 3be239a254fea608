//! Response handling and the proxied response record.
//!
//! # Responsibilities
//! - Decide between buffered and streamed delivery
//! - Re-slice streamed bodies into bounded chunks
//! - Write the record back as a framework response
//!
//! # Design Decisions
//! - Only a declared length below the threshold is buffered
//! - A mid-stream failure ends the body as-is; headers are already out
//! - Framing headers come from the writer, never from the add-on

use std::convert::Infallible;
use std::fmt::Display;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use axum::{
    body::{Body, Bytes},
    http::{
        header::{CONTENT_LENGTH, CONTENT_TYPE},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::{IntoResponse, Response},
};
use futures_util::{Stream, StreamExt};

use crate::observability::metrics;

/// How a response body reaches the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    Buffered,
    Streamed,
}

impl DeliveryMode {
    pub fn as_str(self) -> &'static str {
        match self {
            DeliveryMode::Buffered => "buffered",
            DeliveryMode::Streamed => "streamed",
        }
    }
}

/// Buffered iff the add-on declared a content length below `threshold`.
pub fn delivery_mode(headers: &HeaderMap, threshold: u64) -> DeliveryMode {
    let declared = headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());
    match declared {
        Some(length) if length < threshold => DeliveryMode::Buffered,
        _ => DeliveryMode::Streamed,
    }
}

/// Body of a proxied response.
#[derive(Debug)]
pub enum ResponseBody {
    Buffered(Bytes),
    Streamed(Body),
}

/// One add-on response on its way to the client.
#[derive(Debug)]
pub struct ProxiedResponse {
    pub status: StatusCode,
    /// Client-facing headers, already transformed.
    pub headers: HeaderMap,
    /// Content type re-applied by the writer.
    pub content_type: Option<HeaderValue>,
    pub body: ResponseBody,
}

impl ProxiedResponse {
    pub fn mode(&self) -> DeliveryMode {
        match self.body {
            ResponseBody::Buffered(_) => DeliveryMode::Buffered,
            ResponseBody::Streamed(_) => DeliveryMode::Streamed,
        }
    }
}

impl IntoResponse for ProxiedResponse {
    fn into_response(self) -> Response {
        let body = match self.body {
            ResponseBody::Buffered(bytes) => Body::from(bytes),
            ResponseBody::Streamed(body) => body,
        };
        let mut response = Response::new(body);
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        if let Some(content_type) = self.content_type {
            response.headers_mut().insert(CONTENT_TYPE, content_type);
        }
        response
    }
}

/// Stream adapter yielding the source's bytes in chunks of at most `chunk_size`.
///
/// Data is passed on as soon as it arrives; nothing is held back to fill a
/// chunk. A source error is logged and ends the stream cleanly.
pub struct ChunkedBody<S> {
    source: S,
    pending: Bytes,
    chunk_size: usize,
    url: String,
    finished: bool,
}

impl<S> ChunkedBody<S> {
    pub fn new(source: S, chunk_size: usize, url: impl Into<String>) -> Self {
        Self {
            source,
            pending: Bytes::new(),
            chunk_size: chunk_size.max(1),
            url: url.into(),
            finished: false,
        }
    }
}

impl<S, E> Stream for ChunkedBody<S>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: Display,
{
    type Item = Result<Bytes, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        loop {
            if !this.pending.is_empty() {
                let n = this.pending.len().min(this.chunk_size);
                return Poll::Ready(Some(Ok(this.pending.split_to(n))));
            }
            if this.finished {
                return Poll::Ready(None);
            }
            match ready!(this.source.poll_next_unpin(cx)) {
                Some(Ok(bytes)) => this.pending = bytes,
                Some(Err(e)) => {
                    tracing::error!(url = %this.url, error = %e, "Stream error, response truncated");
                    metrics::record_stream_error();
                    this.finished = true;
                }
                None => this.finished = true,
            }
        }
    }
}
