//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Content type requested from camera backends.
pub const MULTIPART_STREAM_TYPE: &str = "multipart/x-mixed-replace; boundary=frame";

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Backend service locations.
    pub services: ServicesConfig,

    /// Stream relay settings.
    pub stream: StreamConfig,

    /// Timeout configuration for one-shot routes.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8887").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8887".to_string(),
        }
    }
}

/// Host and port of a backend service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ServiceEndpoint {
    pub host: String,
    pub port: u16,
}

impl ServiceEndpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// `host:port`, suitable for a Host header or URI authority.
    pub fn authority(&self) -> String {
        authority(&self.host, self.port)
    }
}

impl fmt::Display for ServiceEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.authority())
    }
}

/// Join host and port, bracketing IPv6 literals.
pub fn authority(host: &str, port: u16) -> String {
    if host.contains(':') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}

/// Which backend a route talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Media,
    Auth,
}

impl Service {
    pub fn name(self) -> &'static str {
        match self {
            Service::Media => "media",
            Service::Auth => "auth",
        }
    }
}

/// Backend service locations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServicesConfig {
    /// Media/processing service serving camera streams and recordings.
    pub media: ServiceEndpoint,

    /// Authentication service.
    pub auth: ServiceEndpoint,
}

impl ServicesConfig {
    pub fn endpoint(&self, service: Service) -> &ServiceEndpoint {
        match service {
            Service::Media => &self.media,
            Service::Auth => &self.auth,
        }
    }
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            media: ServiceEndpoint::new("osp-processing-ms", 8080),
            auth: ServiceEndpoint::new("osp-authentication-ms", 8000),
        }
    }
}

/// Stream relay configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Client-facing path prefix (`/video`, `/video7`, ...).
    pub client_prefix: String,

    /// Backend path prefix substituted for `client_prefix`.
    pub backend_prefix: String,

    /// Upstream connect timeout in milliseconds.
    pub connect_timeout_ms: u64,

    /// Delay before dialing the backend, in milliseconds.
    pub open_delay_ms: u64,

    /// Accept header sent to the backend.
    pub accept: String,

    /// Client request headers copied onto the upstream request.
    pub forward_headers: Vec<String>,
}

impl StreamConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn open_delay(&self) -> Duration {
        Duration::from_millis(self.open_delay_ms)
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            client_prefix: "/video".to_string(),
            backend_prefix: "/stream".to_string(),
            connect_timeout_ms: 5000,
            open_delay_ms: 0,
            accept: MULTIPART_STREAM_TYPE.to_string(),
            forward_headers: Vec::new(),
        }
    }
}

/// Timeout configuration for one-shot routes.
///
/// Stream routes are never subject to these; they only honor
/// `stream.connect_timeout_ms`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
