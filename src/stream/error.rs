//! Stream session errors and their client-visible responses.

use std::io;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Boxed error used for causes coming from hyper and http-body.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failures a stream session can end with before its response is committed.
#[derive(Debug, Error)]
pub enum StreamError {
    /// No stream route matches the requested path.
    #[error("no stream route for {0}")]
    RouteNotResolved(String),

    /// Transport connect failed or timed out.
    #[error("connect to {target} failed: {source}")]
    UpstreamConnectFailed {
        target: String,
        #[source]
        source: io::Error,
    },

    /// Connected, but the request/response exchange failed.
    #[error("upstream request to {target} failed: {source}")]
    UpstreamRequestFailed {
        target: String,
        #[source]
        source: BoxError,
    },

    /// The upstream body failed before any byte reached the client.
    #[error("relay from {target} failed: {source}")]
    RelayFailed {
        target: String,
        #[source]
        source: BoxError,
    },
}

impl StreamError {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::RouteNotResolved(_) => StatusCode::NOT_FOUND,
            Self::UpstreamConnectFailed { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::UpstreamRequestFailed { .. } => StatusCode::BAD_GATEWAY,
            Self::RelayFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RouteNotResolved(_) => "route_not_resolved",
            Self::UpstreamConnectFailed { .. } => "connect_failed",
            Self::UpstreamRequestFailed { .. } => "request_failed",
            Self::RelayFailed { .. } => "relay_failed",
        }
    }

    fn client_message(&self) -> String {
        match self {
            Self::RouteNotResolved(path) => format!("No stream found for {path}"),
            Self::UpstreamConnectFailed { .. } => "Video service unavailable".to_string(),
            Self::UpstreamRequestFailed { source, .. } => {
                format!("Error fetching stream: {source}")
            }
            Self::RelayFailed { .. } => "Stream relay failed".to_string(),
        }
    }
}

impl IntoResponse for StreamError {
    fn into_response(self) -> Response {
        (self.status_code(), self.client_message()).into_response()
    }
}
