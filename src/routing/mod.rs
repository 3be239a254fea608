//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Ingress path /{token}/{path...}
//!     → resolver.rs (token lookup, target URL construction)
//!     → registry.rs (token → Backend snapshot)
//!     → Return: Backend or UnknownToken
//!
//! Registry updates (config reload):
//!     AddonConfig[]
//!     → index by token
//!     → atomic swap, readers never block
//! ```
//!
//! # Design Decisions
//! - Resolved fresh per request, no caching or liveness probing here
//! - Liveness is discovered by the proxy attempt itself
//! - A Backend is an owned snapshot, immune to concurrent reloads

pub mod backend;
pub mod registry;
pub mod resolver;

pub use backend::Backend;
pub use registry::{BackendRegistry, ConfigRegistry, Panel};
pub use resolver::RouteResolver;
