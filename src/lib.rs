//! Stream gateway library.
//!
//! An HTTP gateway in front of a camera processing service and an auth
//! service. Camera feeds (`/video`, `/video{N}`) are relayed chunk by chunk
//! over a dedicated upstream connection per client; everything else is a
//! one-shot forward.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod routing;
pub mod stream;

pub use config::GatewayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use stream::{StreamError, StreamService};
