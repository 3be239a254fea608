//! Request-level error taxonomy.
//!
//! Every variant is terminal for the request that produced it. Details are
//! logged where the error is raised; the client only sees a generic reason.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Errors that end an ingress or API request before a response has begun.
#[derive(Debug, Error)]
pub enum IngressError {
    /// Missing or invalid session credential.
    #[error("no valid ingress session")]
    Unauthorized,

    /// Caller failed a privileged-caller guard.
    #[error("caller is not privileged")]
    NotPrivileged,

    /// Routing token is not known to the registry.
    #[error("ingress for {0:?} not available")]
    UnknownToken(String),

    /// Connection-level failure talking to the add-on.
    #[error("upstream request failed: {0}")]
    Upstream(#[from] hyper_util::client::legacy::Error),

    /// Failure reading a request or response body before headers were sent.
    #[error("body transfer failed: {0}")]
    Body(#[from] axum::Error),

    /// WebSocket handshake with the add-on failed.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Add-on answered a WebSocket upgrade with something other than 101.
    #[error("add-on refused websocket upgrade with status {0}")]
    UpgradeRefused(StatusCode),

    /// Taking over the upgraded add-on connection failed.
    #[error("upgrade of add-on connection failed: {0}")]
    Upgrade(#[from] hyper::Error),

    /// Peer address of the inbound connection is unknown.
    #[error("peer address of the inbound connection is unavailable")]
    MissingPeerAddress,

    /// A forwarded request could not be assembled.
    #[error("invalid outbound request: {0}")]
    InvalidRequest(#[from] axum::http::Error),
}

impl IngressError {
    /// Status code surfaced to the client.
    pub fn status(&self) -> StatusCode {
        match self {
            IngressError::Unauthorized | IngressError::NotPrivileged => StatusCode::UNAUTHORIZED,
            IngressError::UnknownToken(_) => StatusCode::SERVICE_UNAVAILABLE,
            IngressError::Upstream(_)
            | IngressError::Body(_)
            | IngressError::WebSocket(_)
            | IngressError::UpgradeRefused(_)
            | IngressError::Upgrade(_) => StatusCode::BAD_GATEWAY,
            IngressError::MissingPeerAddress | IngressError::InvalidRequest(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for IngressError {
    fn into_response(self) -> Response {
        let status = self.status();
        let reason = status.canonical_reason().unwrap_or("Error");
        (status, format!("{}: {}", status.as_u16(), reason)).into_response()
    }
}
