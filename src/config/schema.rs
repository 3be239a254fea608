//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the ingress.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Responses with a declared length below this many bytes are buffered.
pub const DEFAULT_BUFFER_THRESHOLD: u64 = 4_194_000;

/// Upper bound on a single streamed response chunk.
pub const DEFAULT_STREAM_CHUNK: usize = 4096;

/// Root configuration for the ingress proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct IngressConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Proxy engine settings.
    pub proxy: ProxyConfig,

    /// In-memory session store settings.
    pub session: SessionConfig,

    /// JSON API settings.
    pub api: ApiConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Add-ons reachable through the ingress.
    pub addons: Vec<AddonConfig>,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8099").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8099".to_string(),
        }
    }
}

/// Proxy engine configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Name of the cookie carrying the session credential.
    pub cookie_name: String,

    /// Header names carrying the host's own auth tokens (current and legacy).
    /// Never forwarded to an add-on.
    pub token_headers: Vec<String>,

    /// Declared response lengths below this are buffered, the rest streamed.
    pub buffer_threshold_bytes: u64,

    /// Maximum size of one streamed response chunk.
    pub stream_chunk_bytes: usize,

    /// Run the privileged-caller guard on ingress traffic too.
    pub require_privileged_caller: bool,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            cookie_name: "ingress_session".to_string(),
            token_headers: vec![
                "X-Supervisor-Token".to_string(),
                "X-Hassio-Key".to_string(),
            ],
            buffer_threshold_bytes: DEFAULT_BUFFER_THRESHOLD,
            stream_chunk_bytes: DEFAULT_STREAM_CHUNK,
            require_privileged_caller: false,
        }
    }
}

/// Session store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Validity window in seconds, re-armed on every successful validation.
    pub ttl_secs: u64,

    /// Interval between sweeps of expired sessions.
    pub purge_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 15 * 60,
            purge_interval_secs: 60,
        }
    }
}

/// JSON API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Secret presented by the privileged caller.
    pub api_key: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// A single add-on fronted by the ingress.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AddonConfig {
    /// Add-on identifier, used as the key of the panel listing.
    pub slug: String,

    /// Ingress token routed to this add-on.
    pub token: String,

    /// Private address of the add-on container.
    pub address: String,

    /// Ingress port of the add-on.
    pub port: u16,

    /// Add-on accepts streamed POST bodies.
    #[serde(default)]
    pub stream: bool,

    /// Panel display metadata.
    #[serde(default)]
    pub panel: PanelConfig,
}

/// Panel display metadata for an add-on.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct PanelConfig {
    pub title: String,
    pub icon: Option<String>,
    pub admin: bool,
    pub enabled: bool,
}
