//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → IngressConfig (validated, immutable)
//!     → settings handed to subsystems at startup
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → add-on table swapped atomically inside the registry
//! ```
//!
//! # Design Decisions
//! - Only the add-on table is hot-reloaded; listener and proxy settings need a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    AddonConfig, ApiConfig, IngressConfig, ListenerConfig, ObservabilityConfig, PanelConfig,
    ProxyConfig, SessionConfig,
};
