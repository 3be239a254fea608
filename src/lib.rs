//! Add-on ingress reverse proxy library.

pub mod api;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;
pub mod security;
pub mod session;

pub use config::schema::IngressConfig;
pub use error::IngressError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
