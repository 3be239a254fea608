//! Inbound request inspection and the proxied request record.
//!
//! # Responsibilities
//! - Read the session credential from the cookie header
//! - Split the ingress path into token and add-on path
//! - Detect WebSocket upgrades and the requested sub-protocols
//! - Recover the peer address from connection metadata
//!
//! # Design Decisions
//! - Plain data record, independent of the server framework's request type
//! - Path and query are carried verbatim (still percent-encoded)

use std::net::{IpAddr, SocketAddr};

use axum::{
    body::{Body, Bytes},
    extract::ConnectInfo,
    http::{
        header::{CONNECTION, COOKIE, SEC_WEBSOCKET_PROTOCOL, UPGRADE},
        Extensions, HeaderMap, Method,
    },
};

/// Body of a proxied request.
#[derive(Debug)]
pub enum RequestBody {
    /// Fully read into memory.
    Buffered(Bytes),
    /// Live stream from the client connection.
    Live(Body),
}

impl RequestBody {
    pub fn into_body(self) -> Body {
        match self {
            RequestBody::Buffered(bytes) => Body::from(bytes),
            RequestBody::Live(body) => body,
        }
    }
}

/// One request on its way to an add-on.
#[derive(Debug)]
pub struct ProxiedRequest {
    pub method: Method,
    /// Add-on path below the token, without leading slash.
    pub path: String,
    pub query: Option<String>,
    /// Outbound headers, already transformed for the add-on.
    pub headers: HeaderMap,
    pub body: RequestBody,
    pub peer: IpAddr,
}

/// Split `/{token}/{path}` into its token and add-on path.
pub fn split_ingress_path(path: &str) -> Option<(&str, &str)> {
    let (token, rest) = path.strip_prefix('/')?.split_once('/')?;
    if token.is_empty() {
        return None;
    }
    Some((token, rest))
}

/// Value of the cookie named `name`, if present.
pub fn session_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| key.trim() == name)
        .map(|(_, value)| value.trim())
}

/// True for `Connection: ...upgrade...` together with `Upgrade: websocket`.
pub fn is_websocket_upgrade(headers: &HeaderMap) -> bool {
    let connection = headers
        .get(CONNECTION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.to_ascii_lowercase().contains("upgrade"));
    let upgrade = headers
        .get(UPGRADE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim().eq_ignore_ascii_case("websocket"));
    connection && upgrade
}

/// Sub-protocols the client asked for, in order.
pub fn requested_protocols(headers: &HeaderMap) -> Vec<String> {
    headers
        .get_all(SEC_WEBSOCKET_PROTOCOL)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(str::trim)
        .filter(|proto| !proto.is_empty())
        .map(str::to_string)
        .collect()
}

/// IP of the connected peer, from the server's connection metadata.
pub fn peer_ip(extensions: &Extensions) -> Option<IpAddr> {
    extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn splits_token_and_path() {
        assert_eq!(split_ingress_path("/abc/api/x"), Some(("abc", "api/x")));
        assert_eq!(split_ingress_path("/abc/"), Some(("abc", "")));
        assert_eq!(split_ingress_path("/abc"), None);
        assert_eq!(split_ingress_path("//x"), None);
    }

    #[test]
    fn finds_session_cookie_among_others() {
        let mut headers = HeaderMap::new();
        headers.append(COOKIE, HeaderValue::from_static("theme=dark"));
        headers.append(
            COOKIE,
            HeaderValue::from_static("a=1; ingress_session=abc123 ; b=2"),
        );
        assert_eq!(session_cookie(&headers, "ingress_session"), Some("abc123"));
        assert_eq!(session_cookie(&headers, "missing"), None);
        assert_eq!(session_cookie(&HeaderMap::new(), "ingress_session"), None);
    }

    #[test]
    fn detects_upgrade_case_insensitively() {
        let mut headers = HeaderMap::new();
        headers.insert(CONNECTION, HeaderValue::from_static("keep-alive, Upgrade"));
        headers.insert(UPGRADE, HeaderValue::from_static("WebSocket"));
        assert!(is_websocket_upgrade(&headers));

        headers.insert(UPGRADE, HeaderValue::from_static("h2c"));
        assert!(!is_websocket_upgrade(&headers));

        headers.remove(CONNECTION);
        headers.insert(UPGRADE, HeaderValue::from_static("websocket"));
        assert!(!is_websocket_upgrade(&headers));
    }

    #[test]
    fn parses_protocol_list() {
        let mut headers = HeaderMap::new();
        assert!(requested_protocols(&headers).is_empty());

        headers.insert(SEC_WEBSOCKET_PROTOCOL, HeaderValue::from_static(" chat ,  superchat"));
        assert_eq!(requested_protocols(&headers), vec!["chat", "superchat"]);
    }

    #[test]
    fn peer_ip_from_connect_info() {
        let mut extensions = Extensions::new();
        assert_eq!(peer_ip(&extensions), None);

        extensions.insert(ConnectInfo("10.0.0.5:40000".parse::<SocketAddr>().unwrap()));
        assert_eq!(peer_ip(&extensions), Some("10.0.0.5".parse().unwrap()));
    }

    #[tokio::test]
    async fn buffered_body_converts() {
        let body = RequestBody::Buffered(Bytes::from_static(b"abc")).into_body();
        let bytes = axum::body::to_bytes(body, 16).await.unwrap();
        assert_eq!(&bytes[..], b"abc");
    }
}
