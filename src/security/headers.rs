//! Header transformation for proxied traffic.
//!
//! # Responsibilities
//! - Build the outbound request header set (client → add-on)
//! - Build the outbound response header set (add-on → client)
//! - Maintain the X-Forwarded-For chain
//!
//! # Design Decisions
//! - Pure functions, applied exactly once per direction
//! - Framing headers are never copied; the outbound side recomputes them
//! - The host's own auth tokens never reach an add-on
//! - No peer address means no forwarding

use std::net::IpAddr;

use axum::http::{
    header::{
        CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE, SEC_WEBSOCKET_EXTENSIONS,
        SEC_WEBSOCKET_KEY, SEC_WEBSOCKET_PROTOCOL, SEC_WEBSOCKET_VERSION, TRANSFER_ENCODING,
    },
    HeaderMap, HeaderName, HeaderValue,
};

use crate::error::IngressError;

pub const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");

/// Renegotiated or recomputed by the outbound connection.
const REQUEST_EXCLUDED: [HeaderName; 7] = [
    CONTENT_LENGTH,
    CONTENT_ENCODING,
    TRANSFER_ENCODING,
    SEC_WEBSOCKET_EXTENSIONS,
    SEC_WEBSOCKET_PROTOCOL,
    SEC_WEBSOCKET_VERSION,
    SEC_WEBSOCKET_KEY,
];

/// Recomputed by the response writer for its own delivery mode.
const RESPONSE_EXCLUDED: [HeaderName; 4] =
    [TRANSFER_ENCODING, CONTENT_LENGTH, CONTENT_TYPE, CONTENT_ENCODING];

/// Headers to send to the add-on for an inbound request from `peer`.
///
/// Duplicate header values are preserved. `token_headers` names the host's
/// own credential headers, which are dropped.
pub fn outbound_request_headers(
    inbound: &HeaderMap,
    peer: Option<IpAddr>,
    token_headers: &[HeaderName],
) -> Result<HeaderMap, IngressError> {
    let peer = peer.ok_or(IngressError::MissingPeerAddress)?;

    let mut headers = HeaderMap::with_capacity(inbound.len() + 1);
    for (name, value) in inbound {
        if REQUEST_EXCLUDED.contains(name)
            || token_headers.contains(name)
            || *name == X_FORWARDED_FOR
        {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }

    headers.insert(X_FORWARDED_FOR, forwarded_for(inbound, peer)?);
    Ok(headers)
}

/// Headers to send to the client for an add-on response.
pub fn outbound_response_headers(backend: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(backend.len());
    for (name, value) in backend {
        if RESPONSE_EXCLUDED.contains(name) {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }
    headers
}

/// Existing X-Forwarded-For chain with `peer` appended.
fn forwarded_for(inbound: &HeaderMap, peer: IpAddr) -> Result<HeaderValue, IngressError> {
    let mut chain: Vec<u8> = Vec::new();
    for value in inbound.get_all(X_FORWARDED_FOR) {
        let value = value.as_bytes().trim_ascii();
        if value.is_empty() {
            continue;
        }
        if !chain.is_empty() {
            chain.extend_from_slice(b", ");
        }
        chain.extend_from_slice(value);
    }
    if !chain.is_empty() {
        chain.extend_from_slice(b", ");
    }
    chain.extend_from_slice(peer.to_canonical().to_string().as_bytes());

    HeaderValue::from_bytes(&chain).map_err(|e| IngressError::InvalidRequest(e.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::{CONNECTION, COOKIE, HOST, UPGRADE};

    fn token_headers() -> Vec<HeaderName> {
        vec![
            HeaderName::from_static("x-supervisor-token"),
            HeaderName::from_static("x-hassio-key"),
        ]
    }

    fn peer() -> Option<IpAddr> {
        Some("10.0.0.5".parse().unwrap())
    }

    #[test]
    fn starts_chain_with_peer() {
        let out = outbound_request_headers(&HeaderMap::new(), peer(), &token_headers()).unwrap();
        assert_eq!(out.get(X_FORWARDED_FOR).unwrap(), "10.0.0.5");
    }

    #[test]
    fn appends_peer_to_existing_chain() {
        let mut inbound = HeaderMap::new();
        inbound.insert(X_FORWARDED_FOR, HeaderValue::from_static("1.2.3.4"));
        let out = outbound_request_headers(&inbound, peer(), &token_headers()).unwrap();
        assert_eq!(out.get(X_FORWARDED_FOR).unwrap(), "1.2.3.4, 10.0.0.5");
        assert_eq!(out.get_all(X_FORWARDED_FOR).iter().count(), 1);
    }

    #[test]
    fn joins_repeated_forwarded_for_values() {
        let mut inbound = HeaderMap::new();
        inbound.append(X_FORWARDED_FOR, HeaderValue::from_static("1.1.1.1"));
        inbound.append(X_FORWARDED_FOR, HeaderValue::from_static("2.2.2.2, 3.3.3.3"));
        let out = outbound_request_headers(&inbound, peer(), &token_headers()).unwrap();
        assert_eq!(
            out.get(X_FORWARDED_FOR).unwrap(),
            "1.1.1.1, 2.2.2.2, 3.3.3.3, 10.0.0.5"
        );
    }

    #[test]
    fn canonicalises_mapped_ipv6_peer() {
        let mapped: IpAddr = "::ffff:10.0.0.5".parse().unwrap();
        let out = outbound_request_headers(&HeaderMap::new(), Some(mapped), &[]).unwrap();
        assert_eq!(out.get(X_FORWARDED_FOR).unwrap(), "10.0.0.5");

        let v6: IpAddr = "fd00::1".parse().unwrap();
        let out = outbound_request_headers(&HeaderMap::new(), Some(v6), &[]).unwrap();
        assert_eq!(out.get(X_FORWARDED_FOR).unwrap(), "fd00::1");
    }

    #[test]
    fn missing_peer_is_fatal() {
        let err = outbound_request_headers(&HeaderMap::new(), None, &token_headers()).unwrap_err();
        assert!(matches!(err, IngressError::MissingPeerAddress));
    }

    #[test]
    fn never_forwards_framing_negotiation_or_token_headers() {
        let mut inbound = HeaderMap::new();
        for name in REQUEST_EXCLUDED.iter().chain(token_headers().iter()) {
            inbound.insert(name.clone(), HeaderValue::from_static("x"));
        }
        inbound.insert(HOST, HeaderValue::from_static("homeassistant.local"));
        inbound.insert(CONNECTION, HeaderValue::from_static("Upgrade"));
        inbound.insert(UPGRADE, HeaderValue::from_static("websocket"));
        inbound.insert("X-HASSIO-KEY", HeaderValue::from_static("legacy"));

        let out = outbound_request_headers(&inbound, peer(), &token_headers()).unwrap();

        for name in REQUEST_EXCLUDED.iter().chain(token_headers().iter()) {
            assert!(!out.contains_key(name), "{name} must not be forwarded");
        }
        assert_eq!(out.get(HOST).unwrap(), "homeassistant.local");
        assert_eq!(out.get(CONNECTION).unwrap(), "Upgrade");
        assert_eq!(out.get(UPGRADE).unwrap(), "websocket");
    }

    #[test]
    fn preserves_duplicate_values() {
        let mut inbound = HeaderMap::new();
        inbound.append(COOKIE, HeaderValue::from_static("a=1"));
        inbound.append(COOKIE, HeaderValue::from_static("b=2"));
        let out = outbound_request_headers(&inbound, peer(), &[]).unwrap();
        let cookies: Vec<_> = out.get_all(COOKIE).iter().collect();
        assert_eq!(cookies, vec!["a=1", "b=2"]);
    }

    #[test]
    fn response_drops_recomputed_headers() {
        let mut backend = HeaderMap::new();
        backend.insert(TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        backend.insert(CONTENT_LENGTH, HeaderValue::from_static("12"));
        backend.insert(CONTENT_TYPE, HeaderValue::from_static("text/html"));
        backend.insert(CONTENT_ENCODING, HeaderValue::from_static("gzip"));
        backend.append("set-cookie", HeaderValue::from_static("a=1"));
        backend.append("set-cookie", HeaderValue::from_static("b=2"));
        backend.insert("x-frame-options", HeaderValue::from_static("SAMEORIGIN"));

        let out = outbound_response_headers(&backend);

        for name in RESPONSE_EXCLUDED {
            assert!(!out.contains_key(&name));
        }
        assert_eq!(out.get_all("set-cookie").iter().count(), 2);
        assert_eq!(out.get("x-frame-options").unwrap(), "SAMEORIGIN");
    }
}
