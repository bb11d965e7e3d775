//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing)
//!     → explicit route?  → forward.rs (one-shot upstream request)
//!     → otherwise        → stream fallback (crate::stream)
//!     → response.rs (header projection)
//!     → Send to client
//! ```

pub mod forward;
pub mod request;
pub mod response;
pub mod server;

pub use forward::{ForwardRoute, Forwarder};
pub use request::{RequestIdExt, UuidRequestId, X_REQUEST_ID};
pub use server::{AppState, HttpServer, ROOT_MESSAGE};
