//! JSON API consumed by the host frontend.
//!
//! # Endpoints
//! - `GET /panels`: panel metadata of every ingress-capable add-on
//! - `POST /session`: issue an ingress session (privileged)
//! - `POST /validate_session`: check and extend a session (privileged)
//!
//! Successful responses use the `{"result": "ok", "data": ...}` envelope.

pub mod auth;
pub mod handlers;
