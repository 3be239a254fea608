//! Metrics collection and exposition.
//!
//! # Metrics
//! - `ingress_requests_total` (counter): dispatched requests by method, status
//! - `ingress_request_duration_seconds` (histogram): time to response headers
//! - `ingress_responses_total` (counter): responses by delivery mode
//! - `ingress_stream_errors_total` (counter): mid-stream failures
//! - `ingress_websocket_sessions_active` (gauge): live relay pairs
//! - `ingress_websocket_frames_total` (counter): relayed frames by direction
//! - `ingress_sessions_active` (gauge): sessions held by the in-memory store
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    counter!(
        "ingress_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("ingress_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_response_mode(mode: &'static str) {
    counter!("ingress_responses_total", "mode" => mode).increment(1);
}

pub fn record_stream_error() {
    counter!("ingress_stream_errors_total").increment(1);
}

/// One live relay in `ingress_websocket_sessions_active`, released on drop.
///
/// Dropping covers relays whose task is cancelled mid-flight.
#[must_use]
pub struct ActiveRelay(());

pub fn websocket_session_started() -> ActiveRelay {
    gauge!("ingress_websocket_sessions_active").increment(1.0);
    ActiveRelay(())
}

impl Drop for ActiveRelay {
    fn drop(&mut self) {
        gauge!("ingress_websocket_sessions_active").decrement(1.0);
    }
}

pub fn record_frame(direction: &'static str) {
    counter!("ingress_websocket_frames_total", "direction" => direction).increment(1);
}

pub fn record_active_sessions(count: usize) {
    gauge!("ingress_sessions_active").set(count as f64);
}
