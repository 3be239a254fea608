//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (tokens and slugs are unique)
//! - Validate value ranges (sizes > 0, ports valid)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: IngressConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;

use axum::http::HeaderName;
use thiserror::Error;
use url::Url;

use crate::config::schema::IngressConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("proxy.{0} must be greater than zero")]
    ZeroSize(&'static str),

    #[error("session.{0} must be greater than zero")]
    ZeroDuration(&'static str),

    #[error("proxy.token_headers contains invalid header name {0:?}")]
    InvalidHeaderName(String),

    #[error("api.api_key must not be empty")]
    EmptyApiKey,

    #[error("addon {0:?} has an empty token")]
    EmptyToken(String),

    #[error("token of addon {0:?} is already used by another addon")]
    DuplicateToken(String),

    #[error("addon slug {0:?} is declared more than once")]
    DuplicateSlug(String),

    #[error("addon {slug:?} has port 0")]
    ZeroPort { slug: String },

    #[error("addon {slug:?} has unusable address {address:?}")]
    InvalidAddress { slug: String, address: String },
}

/// Validate a deserialized configuration, collecting every error.
pub fn validate_config(config: &IngressConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.proxy.buffer_threshold_bytes == 0 {
        errors.push(ValidationError::ZeroSize("buffer_threshold_bytes"));
    }
    if config.proxy.stream_chunk_bytes == 0 {
        errors.push(ValidationError::ZeroSize("stream_chunk_bytes"));
    }
    if config.session.ttl_secs == 0 {
        errors.push(ValidationError::ZeroDuration("ttl_secs"));
    }
    if config.session.purge_interval_secs == 0 {
        errors.push(ValidationError::ZeroDuration("purge_interval_secs"));
    }
    for name in &config.proxy.token_headers {
        if HeaderName::from_bytes(name.as_bytes()).is_err() {
            errors.push(ValidationError::InvalidHeaderName(name.clone()));
        }
    }
    if config.api.api_key.is_empty() {
        errors.push(ValidationError::EmptyApiKey);
    }

    let mut tokens = HashSet::new();
    let mut slugs = HashSet::new();
    for addon in &config.addons {
        if addon.token.is_empty() {
            errors.push(ValidationError::EmptyToken(addon.slug.clone()));
        } else if !tokens.insert(addon.token.as_str()) {
            errors.push(ValidationError::DuplicateToken(addon.slug.clone()));
        }
        if !slugs.insert(addon.slug.as_str()) {
            errors.push(ValidationError::DuplicateSlug(addon.slug.clone()));
        }
        if addon.port == 0 {
            errors.push(ValidationError::ZeroPort {
                slug: addon.slug.clone(),
            });
        }
        if !is_valid_address(&addon.address, addon.port) {
            errors.push(ValidationError::InvalidAddress {
                slug: addon.slug.clone(),
                address: addon.address.clone(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_valid_address(address: &str, port: u16) -> bool {
    if address.is_empty() {
        return false;
    }
    let host = match address.parse::<std::net::Ipv6Addr>() {
        Ok(_) => format!("[{}]", address),
        Err(_) => address.to_string(),
    };
    Url::parse(&format!("http://{}:{}/", host, port))
        .map(|url| url.host_str().is_some())
        .unwrap_or(false)
}
