//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, dispatch)
//!     → session gate, route resolver, header transform
//!     → proxy.rs (plain request/response)  or  websocket.rs (upgrade + relay)
//!     → response.rs (buffered or chunked delivery)
//!     → Send to client
//! ```

pub mod proxy;
pub mod request;
pub mod response;
pub mod server;
pub mod websocket;

pub use proxy::HttpProxy;
pub use server::{AppState, HttpServer, IngressSettings};
