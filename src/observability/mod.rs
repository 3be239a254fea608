//! Logging and metrics.
//!
//! ```text
//! ingress handler ──▶ request counter + latency histogram
//! proxy engine    ──▶ buffered/streamed counters, stream error counter
//! websocket relay ──▶ open relay gauge, relay events logged under a relay id
//!
//! tracing-subscriber (stdout)      Prometheus exporter (optional listener)
//! ```
//!
//! Every request gets an `x-request-id` at the edge; add-ons see the same id.

pub mod logging;
pub mod metrics;
