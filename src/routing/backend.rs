//! Backend abstraction.
//!
//! # Responsibilities
//! - Represent a single add-on endpoint (address, port)
//! - Build plaintext target URLs (WebSocket upgrades use the same URL)
//! - Carry the stream-capable flag used for request bodies

use std::net::Ipv6Addr;

/// Immutable snapshot of an add-on endpoint for the duration of one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backend {
    /// Add-on identifier, for logging.
    pub slug: String,
    /// Private network address.
    pub address: String,
    /// Ingress port.
    pub port: u16,
    /// Accepts streamed POST bodies.
    pub stream: bool,
}

impl Backend {
    /// `address:port`, bracketing IPv6 literals.
    pub fn authority(&self) -> String {
        if self.address.parse::<Ipv6Addr>().is_ok() {
            format!("[{}]:{}", self.address, self.port)
        } else {
            format!("{}:{}", self.address, self.port)
        }
    }

    /// `http://address:port/path[?query]`.
    ///
    /// `path` is taken verbatim (still percent-encoded) and must not start with `/`.
    pub fn url(&self, path: &str, query: Option<&str>) -> String {
        let mut url = format!("http://{}/{}", self.authority(), path);
        if let Some(query) = query.filter(|q| !q.is_empty()) {
            url.push('?');
            url.push_str(query);
        }
        url
    }
}
