//! WebSocket proxy handling.
//!
//! # Responsibilities
//! - Complete the upgrade handshake with the client
//! - Establish a WebSocket connection to the add-on
//! - Bidirectional frame forwarding
//!
//! # Data Flow
//! ```text
//! Client ←──── WebSocket frames ────→ Ingress ←──── WebSocket frames ────→ Add-on
//! ```
//!
//! # Design Decisions
//! - Frame-level forwarding in arrival order, no message buffering
//! - A close from either side is forwarded and ends the relay
//! - Errors end the relay and are logged, never surfaced to the client
//! - Ping/pong frames are relayed as control frames, unchanged
//! - Sub-protocols are offered to the add-on; it may pick none of them

use std::fmt::{self, Display};
use std::time::Duration;

use axum::{
    body::{Body, Bytes},
    extract::ws::{self, WebSocket, WebSocketUpgrade},
    http::{
        header::{
            CONNECTION, SEC_WEBSOCKET_ACCEPT, SEC_WEBSOCKET_KEY, SEC_WEBSOCKET_PROTOCOL,
            SEC_WEBSOCKET_VERSION, UPGRADE,
        },
        HeaderMap, HeaderName, HeaderValue, Request, StatusCode,
    },
    response::Response,
};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use hyper::upgrade::Upgraded;
use hyper_util::rt::TokioIo;
use tokio_tungstenite::{
    tungstenite::{
        self,
        error::ProtocolError,
        handshake::{client::generate_key, derive_accept_key},
        protocol::{frame::coding::CloseCode, CloseFrame, Role},
    },
    WebSocketStream,
};
use uuid::Uuid;

use crate::error::IngressError;
use crate::http::proxy::PlainClient;
use crate::observability::metrics;

/// Time allowed for closing both sides once a relay ends.
const TEARDOWN_GRACE: Duration = Duration::from_secs(2);

/// Handshake headers set per upgrade request, never copied from the client.
const HANDSHAKE_HEADERS: [HeaderName; 5] = [
    CONNECTION,
    UPGRADE,
    SEC_WEBSOCKET_KEY,
    SEC_WEBSOCKET_VERSION,
    SEC_WEBSOCKET_PROTOCOL,
];

pub type BackendSocket = WebSocketStream<TokioIo<Upgraded>>;

/// Close code and reason carried by a close frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseInfo {
    pub code: u16,
    pub reason: String,
}

/// A relayed WebSocket frame, independent of either side's library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Bytes),
    Ping(Bytes),
    Pong(Bytes),
    Close(Option<CloseInfo>),
}

/// Conversion between a side's message type and [`Frame`].
pub trait RelayMessage: Sized {
    /// `None` for messages that carry nothing to relay.
    fn into_frame(self) -> Option<Frame>;
    fn from_frame(frame: Frame) -> Self;
}

impl RelayMessage for Frame {
    fn into_frame(self) -> Option<Frame> {
        Some(self)
    }

    fn from_frame(frame: Frame) -> Self {
        frame
    }
}

impl RelayMessage for ws::Message {
    fn into_frame(self) -> Option<Frame> {
        let frame = match self {
            ws::Message::Text(text) => Frame::Text(text.as_str().to_owned()),
            ws::Message::Binary(data) => Frame::Binary(data),
            ws::Message::Ping(data) => Frame::Ping(data),
            ws::Message::Pong(data) => Frame::Pong(data),
            ws::Message::Close(close) => Frame::Close(close.map(|c| CloseInfo {
                code: c.code,
                reason: c.reason.as_str().to_owned(),
            })),
        };
        Some(frame)
    }

    fn from_frame(frame: Frame) -> Self {
        match frame {
            Frame::Text(text) => ws::Message::Text(text.into()),
            Frame::Binary(data) => ws::Message::Binary(data),
            Frame::Ping(data) => ws::Message::Ping(data),
            Frame::Pong(data) => ws::Message::Pong(data),
            Frame::Close(close) => ws::Message::Close(close.map(|c| ws::CloseFrame {
                code: c.code,
                reason: c.reason.into(),
            })),
        }
    }
}

impl RelayMessage for tungstenite::Message {
    fn into_frame(self) -> Option<Frame> {
        let frame = match self {
            tungstenite::Message::Text(text) => Frame::Text(text.as_str().to_owned()),
            tungstenite::Message::Binary(data) => Frame::Binary(data),
            tungstenite::Message::Ping(data) => Frame::Ping(data),
            tungstenite::Message::Pong(data) => Frame::Pong(data),
            tungstenite::Message::Close(close) => Frame::Close(close.map(|c| CloseInfo {
                code: u16::from(c.code),
                reason: c.reason.as_str().to_owned(),
            })),
            tungstenite::Message::Frame(_) => return None,
        };
        Some(frame)
    }

    fn from_frame(frame: Frame) -> Self {
        match frame {
            Frame::Text(text) => tungstenite::Message::Text(text.into()),
            Frame::Binary(data) => tungstenite::Message::Binary(data),
            Frame::Ping(data) => tungstenite::Message::Ping(data),
            Frame::Pong(data) => tungstenite::Message::Pong(data),
            Frame::Close(close) => tungstenite::Message::Close(close.map(|c| CloseFrame {
                code: CloseCode::from(c.code),
                reason: c.reason.into(),
            })),
        }
    }
}

/// Direction of one forwarding task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    ClientToBackend,
    BackendToClient,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::ClientToBackend => "client_to_backend",
            Direction::BackendToClient => "backend_to_client",
        }
    }
}

impl Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a forwarding task stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayEnd {
    /// A close frame was forwarded.
    Closed,
    /// The source ended without a close frame.
    SourceEnded,
    /// Reading from the source failed.
    SourceError,
    /// Writing to the destination failed.
    DestinationError,
}

/// Forward frames from `source` to `dest` until a close, an error or end of stream.
pub async fn forward<S, D, M, N, E, F>(source: &mut S, dest: &mut D, direction: Direction) -> RelayEnd
where
    S: Stream<Item = Result<M, E>> + Unpin,
    D: Sink<N, Error = F> + Unpin,
    M: RelayMessage,
    N: RelayMessage,
    E: Display,
    F: Display,
{
    while let Some(item) = source.next().await {
        let frame = match item {
            Ok(message) => match message.into_frame() {
                Some(frame) => frame,
                None => continue,
            },
            Err(e) => {
                tracing::debug!(direction = %direction, error = %e, "WebSocket read failed");
                return RelayEnd::SourceError;
            }
        };

        let closing = matches!(frame, Frame::Close(_));
        metrics::record_frame(direction.as_str());
        if let Err(e) = dest.send(N::from_frame(frame)).await {
            tracing::debug!(direction = %direction, error = %e, "WebSocket write failed");
            return RelayEnd::DestinationError;
        }
        if closing {
            return RelayEnd::Closed;
        }
    }
    RelayEnd::SourceEnded
}

/// Relay frames both ways until either direction stops, then close both sides.
pub async fn relay<C, B, CM, BM, CE, BE>(client: C, backend: B) -> RelayEnd
where
    C: Stream<Item = Result<CM, CE>> + Sink<CM, Error = CE> + Unpin,
    B: Stream<Item = Result<BM, BE>> + Sink<BM, Error = BE> + Unpin,
    CM: RelayMessage + Unpin,
    BM: RelayMessage + Unpin,
    CE: Display,
    BE: Display,
{
    let (mut client_tx, mut client_rx) = client.split::<CM>();
    let (mut backend_tx, mut backend_rx) = backend.split::<BM>();

    let end = tokio::select! {
        end = forward(&mut client_rx, &mut backend_tx, Direction::ClientToBackend) => end,
        end = forward(&mut backend_rx, &mut client_tx, Direction::BackendToClient) => end,
    };

    let teardown = async {
        let _ = client_tx.close().await;
        let _ = backend_tx.close().await;
    };
    if tokio::time::timeout(TEARDOWN_GRACE, teardown).await.is_err() {
        tracing::debug!("WebSocket teardown timed out");
    }
    end
}

/// Where and how to open the add-on side of a relay.
#[derive(Debug, Clone)]
pub struct RelayTarget {
    /// Add-on slug, for logging.
    pub slug: String,
    /// `http://` URL the upgrade request is sent to.
    pub url: String,
    /// Transformed request headers.
    pub headers: HeaderMap,
    /// Sub-protocols requested by the client, in order.
    pub protocols: Vec<String>,
}

/// Upgrade request for `target` carrying `key`.
fn handshake_request(target: &RelayTarget, key: &str) -> Result<Request<Body>, IngressError> {
    let mut request = Request::get(target.url.as_str()).body(Body::empty())?;
    let headers = request.headers_mut();

    for (name, value) in &target.headers {
        if !HANDSHAKE_HEADERS.contains(name) {
            headers.append(name.clone(), value.clone());
        }
    }
    headers.insert(CONNECTION, HeaderValue::from_static("Upgrade"));
    headers.insert(UPGRADE, HeaderValue::from_static("websocket"));
    headers.insert(SEC_WEBSOCKET_VERSION, HeaderValue::from_static("13"));
    headers.insert(
        SEC_WEBSOCKET_KEY,
        HeaderValue::from_str(key).map_err(axum::http::Error::from)?,
    );
    if !target.protocols.is_empty() {
        let protocols = HeaderValue::from_str(&target.protocols.join(", "))
            .map_err(axum::http::Error::from)?;
        headers.insert(SEC_WEBSOCKET_PROTOCOL, protocols);
    }
    Ok(request)
}

/// Open the add-on WebSocket with the client's headers and sub-protocols.
///
/// The handshake runs over `client` rather than the WebSocket library's own
/// connector so that an add-on choosing no sub-protocol is still accepted.
pub async fn connect_backend(
    client: &PlainClient,
    target: &RelayTarget,
) -> Result<BackendSocket, IngressError> {
    let key = generate_key();
    let request = handshake_request(target, &key)?;

    let response = client.request(request).await?;
    if response.status() != StatusCode::SWITCHING_PROTOCOLS {
        return Err(IngressError::UpgradeRefused(response.status()));
    }
    let accept = derive_accept_key(key.as_bytes());
    let accepted = response.headers().get(SEC_WEBSOCKET_ACCEPT).map(HeaderValue::as_bytes);
    if accepted != Some(accept.as_bytes()) {
        let mismatch = ProtocolError::SecWebSocketAcceptKeyMismatch;
        return Err(tungstenite::Error::Protocol(mismatch).into());
    }

    tracing::debug!(
        slug = %target.slug,
        protocol = ?response.headers().get(SEC_WEBSOCKET_PROTOCOL),
        "Add-on WebSocket connected"
    );
    let upgraded = hyper::upgrade::on(response).await?;
    Ok(WebSocketStream::from_raw_socket(TokioIo::new(upgraded), Role::Client, None).await)
}

/// Accept the client upgrade, then connect to the add-on and relay.
///
/// The client handshake completes first; if the add-on cannot be reached the
/// client receives a close with code 1011.
pub fn upgrade(ws: WebSocketUpgrade, client: PlainClient, target: RelayTarget) -> Response {
    let protocols = target.protocols.clone();
    let slug = target.slug.clone();

    ws.protocols(protocols)
        .on_failed_upgrade(move |e| {
            tracing::warn!(slug = %slug, error = %e, "Client WebSocket upgrade failed");
        })
        .on_upgrade(move |socket| run_relay(socket, client, target))
}

async fn run_relay(mut socket: WebSocket, client: PlainClient, target: RelayTarget) {
    let relay_id = Uuid::new_v4();

    let backend = match connect_backend(&client, &target).await {
        Ok(backend) => backend,
        Err(e) => {
            tracing::error!(
                relay_id = %relay_id,
                slug = %target.slug,
                url = %target.url,
                error = %e,
                "Ingress error with add-on WebSocket"
            );
            let close = ws::CloseFrame {
                code: ws::close_code::ERROR,
                reason: ws::Utf8Bytes::from_static("add-on unavailable"),
            };
            let _ = socket.send(ws::Message::Close(Some(close))).await;
            return;
        }
    };

    tracing::info!(relay_id = %relay_id, slug = %target.slug, "WebSocket relay started");
    let _active = metrics::websocket_session_started();
    let end = relay(socket, backend).await;
    tracing::info!(relay_id = %relay_id, slug = %target.slug, end = ?end, "WebSocket relay finished");
}
