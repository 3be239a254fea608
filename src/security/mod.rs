//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → guards.rs (ordered allow/deny predicates, privileged endpoints)
//!     → [session gate, route resolution]
//!     → headers.rs (strip framing/token headers, extend X-Forwarded-For)
//!     → Forward to add-on
//!
//! Add-on response:
//!     → headers.rs (strip headers the response writer recomputes)
//! ```
//!
//! # Design Decisions
//! - Fail closed: a missing peer address aborts the request
//! - Host credentials are stripped before anything leaves the proxy

pub mod guards;
pub mod headers;
