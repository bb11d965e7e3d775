//! Stream route resolution.
//!
//! # Responsibilities
//! - Hold the compiled stream route and the media backend it points at
//! - Resolve a client path to a backend target or an explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Pure: no I/O, no clock, same input always yields the same target

use std::fmt;

use crate::config::{schema, GatewayConfig, ServiceEndpoint};
use crate::routing::matcher::StreamRoute;

/// A resolved backend stream endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamTarget {
    pub host: String,
    pub port: u16,
    pub path: String,
}

impl StreamTarget {
    /// `host:port` of the backend.
    pub fn authority(&self) -> String {
        schema::authority(&self.host, self.port)
    }
}

impl fmt::Display for StreamTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.authority(), self.path)
    }
}

/// Resolves client stream paths against the media backend.
#[derive(Debug, Clone)]
pub struct StreamRouter {
    route: StreamRoute,
    backend: ServiceEndpoint,
}

impl StreamRouter {
    pub fn new(route: StreamRoute, backend: ServiceEndpoint) -> Self {
        Self { route, backend }
    }

    /// Build the router from the stream prefixes and media service address.
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self::new(
            StreamRoute::new(
                config.stream.client_prefix.clone(),
                config.stream.backend_prefix.clone(),
            ),
            config.services.media.clone(),
        )
    }

    /// Resolve a normalized request path (no query string).
    pub fn resolve(&self, client_path: &str) -> Option<StreamTarget> {
        let path = self.route.backend_path(client_path)?;
        Some(StreamTarget {
            host: self.backend.host.clone(),
            port: self.backend.port,
            path,
        })
    }
}
