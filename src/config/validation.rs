//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, ports valid)
//! - Validate header names and values used on upstream requests
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use axum::http::{HeaderName, HeaderValue};
use thiserror::Error;

use crate::config::schema::{GatewayConfig, Service, ServiceEndpoint};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address '{0}' is not a socket address")]
    BindAddress(String),

    #[error("services.{service}.host must not be empty")]
    EmptyHost { service: &'static str },

    #[error("services.{service}.port must be non-zero")]
    ZeroPort { service: &'static str },

    #[error("stream.connect_timeout_ms must be greater than zero")]
    ZeroConnectTimeout,

    #[error("stream.{field} '{value}' must start with '/'")]
    Prefix { field: &'static str, value: String },

    #[error("stream.client_prefix must not be '/'")]
    CatchAllPrefix,

    #[error("stream.accept '{0}' is not a valid header value")]
    Accept(String),

    #[error("stream.forward_headers entry '{0}' is not a valid header name")]
    ForwardHeader(String),

    #[error("timeouts.request_secs must be greater than zero")]
    ZeroRequestTimeout,
}

/// Check a parsed configuration, collecting every problem found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    for service in [Service::Media, Service::Auth] {
        check_endpoint(service, config.services.endpoint(service), &mut errors);
    }

    let stream = &config.stream;
    if stream.connect_timeout_ms == 0 {
        errors.push(ValidationError::ZeroConnectTimeout);
    }
    for (field, value) in [
        ("client_prefix", &stream.client_prefix),
        ("backend_prefix", &stream.backend_prefix),
    ] {
        if !value.starts_with('/') {
            errors.push(ValidationError::Prefix {
                field,
                value: value.clone(),
            });
        }
    }
    if stream.client_prefix == "/" {
        errors.push(ValidationError::CatchAllPrefix);
    }
    if HeaderValue::from_str(&stream.accept).is_err() {
        errors.push(ValidationError::Accept(stream.accept.clone()));
    }
    for name in &stream.forward_headers {
        if HeaderName::from_bytes(name.as_bytes()).is_err() {
            errors.push(ValidationError::ForwardHeader(name.clone()));
        }
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroRequestTimeout);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_endpoint(service: Service, endpoint: &ServiceEndpoint, errors: &mut Vec<ValidationError>) {
    if endpoint.host.trim().is_empty() {
        errors.push(ValidationError::EmptyHost {
            service: service.name(),
        });
    }
    if endpoint.port == 0 {
        errors.push(ValidationError::ZeroPort {
            service: service.name(),
        });
    }
}
