//! Session subsystem.
//!
//! # Data Flow
//! ```text
//! POST /session (privileged)      → store.rs creates credential
//! Cookie on ingress request       → gate.rs → SessionStore::validate_session
//!                                      → valid: expiry re-armed, request proceeds
//!                                      → invalid/absent: 401, nothing else happens
//! ```
//!
//! # Design Decisions
//! - The gate only ever sees a boolean; credential structure is opaque
//! - One validation per request, no retries
//! - Store is the only owner of mutable session state

pub mod gate;
pub mod store;

pub use gate::SessionGate;
pub use store::MemorySessionStore;

/// Source of truth for session credentials.
pub trait SessionStore: Send + Sync {
    /// Issue a new credential.
    fn create_session(&self) -> String;

    /// Report whether `session` is currently valid, extending its validity
    /// window when it is.
    fn validate_session(&self, session: &str) -> bool;
}
