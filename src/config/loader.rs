//! Configuration loading from disk and the process environment.

use std::fs;
use std::path::Path;

use thiserror::Error;
use url::{Host, Url};

use crate::config::schema::{GatewayConfig, ServiceEndpoint};
use crate::config::validation::{validate_config, ValidationError};

/// Absolute URL of the media/processing service.
pub const MEDIA_SERVICE_URL_ENV: &str = "MEDIA_SERVICE_URL";
/// Older name for the media service URL, read when the primary is unset.
pub const LEGACY_MEDIA_SERVICE_URL_ENV: &str = "RASPBERRYPI_SERVICE_URL";
/// Absolute URL of the authentication service.
pub const AUTH_SERVICE_URL_ENV: &str = "AUTH_SERVICE_URL";
/// Listener bind address override.
pub const BIND_ADDRESS_ENV: &str = "GATEWAY_BIND_ADDRESS";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid {var} '{value}': {reason}")]
    ServiceUrl {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration: defaults, then the optional TOML file, then
/// environment overrides. The result is validated before it is returned.
pub fn load_config(path: Option<&Path>) -> Result<GatewayConfig, ConfigError> {
    let mut config = match path {
        Some(path) => parse_config(&fs::read_to_string(path)?)?,
        None => GatewayConfig::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Parse a TOML document. Missing sections fall back to defaults.
pub fn parse_config(content: &str) -> Result<GatewayConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Apply environment overrides using `lookup` to read variables.
pub fn apply_env_overrides<F>(config: &mut GatewayConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let media = lookup(MEDIA_SERVICE_URL_ENV)
        .map(|raw| (MEDIA_SERVICE_URL_ENV, raw))
        .or_else(|| lookup(LEGACY_MEDIA_SERVICE_URL_ENV).map(|raw| (LEGACY_MEDIA_SERVICE_URL_ENV, raw)));
    if let Some((var, raw)) = media {
        config.services.media = endpoint_from_url(var, &raw)?;
    }
    if let Some(raw) = lookup(AUTH_SERVICE_URL_ENV) {
        config.services.auth = endpoint_from_url(AUTH_SERVICE_URL_ENV, &raw)?;
    }
    if let Some(addr) = lookup(BIND_ADDRESS_ENV) {
        config.listener.bind_address = addr;
    }
    Ok(())
}

/// Extract host and port from an absolute service URL such as
/// `http://osp-processing-ms:8080`. The scheme's default port applies
/// when none is given.
pub fn endpoint_from_url(var: &'static str, raw: &str) -> Result<ServiceEndpoint, ConfigError> {
    let invalid = |reason: String| ConfigError::ServiceUrl {
        var,
        value: raw.to_string(),
        reason,
    };

    let url = Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;
    // IPv6 literals are stored without brackets so they can be dialed.
    let host = match url.host() {
        Some(Host::Domain(domain)) => domain.to_string(),
        Some(Host::Ipv4(addr)) => addr.to_string(),
        Some(Host::Ipv6(addr)) => addr.to_string(),
        None => return Err(invalid("missing host".to_string())),
    };
    let port = url
        .port_or_known_default()
        .ok_or_else(|| invalid("missing port".to_string()))?;

    Ok(ServiceEndpoint::new(host, port))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_environment_is_empty() {
        let mut config = GatewayConfig::default();
        apply_env_overrides(&mut config, env(&[])).unwrap();
        assert_eq!(
            config.services.media,
            ServiceEndpoint::new("osp-processing-ms", 8080)
        );
        assert_eq!(
            config.services.auth,
            ServiceEndpoint::new("osp-authentication-ms", 8000)
        );
        assert_eq!(config.listener.bind_address, "0.0.0.0:8887");
    }

    #[test]
    fn service_urls_override_endpoints() {
        let mut config = GatewayConfig::default();
        apply_env_overrides(
            &mut config,
            env(&[
                (MEDIA_SERVICE_URL_ENV, "http://camera-host:8081"),
                (AUTH_SERVICE_URL_ENV, "https://auth.internal"),
                (BIND_ADDRESS_ENV, "127.0.0.1:9000"),
            ]),
        )
        .unwrap();

        assert_eq!(config.services.media, ServiceEndpoint::new("camera-host", 8081));
        assert_eq!(config.services.auth, ServiceEndpoint::new("auth.internal", 443));
        assert_eq!(config.listener.bind_address, "127.0.0.1:9000");

        let mut config = GatewayConfig::default();
        apply_env_overrides(
            &mut config,
            env(&[(LEGACY_MEDIA_SERVICE_URL_ENV, "http://raspberrypi:5000")]),
        )
        .unwrap();
        assert_eq!(config.services.media, ServiceEndpoint::new("raspberrypi", 5000));

        let mut config = GatewayConfig::default();
        apply_env_overrides(
            &mut config,
            env(&[
                (MEDIA_SERVICE_URL_ENV, "http://camera-host:8081"),
                (LEGACY_MEDIA_SERVICE_URL_ENV, "http://raspberrypi:5000"),
            ]),
        )
        .unwrap();
        assert_eq!(config.services.media, ServiceEndpoint::new("camera-host", 8081));
    }

    #[test]
    fn ipv6_service_url_drops_brackets() {
        let endpoint = endpoint_from_url(MEDIA_SERVICE_URL_ENV, "http://[::1]:8080").unwrap();
        assert_eq!(endpoint, ServiceEndpoint::new("::1", 8080));
        assert_eq!(endpoint.authority(), "[::1]:8080");

        let endpoint = endpoint_from_url(MEDIA_SERVICE_URL_ENV, "http://10.0.0.7").unwrap();
        assert_eq!(endpoint, ServiceEndpoint::new("10.0.0.7", 80));
    }

    #[test]
    fn rejects_relative_service_url() {
        let mut config = GatewayConfig::default();
        let err = apply_env_overrides(&mut config, env(&[(MEDIA_SERVICE_URL_ENV, "camera:8080/x")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::ServiceUrl { var: MEDIA_SERVICE_URL_ENV, .. }
        ));
    }

    #[test]
    fn parses_partial_toml() {
        let config = parse_config(
            r#"
            [services.media]
            host = "10.0.0.5"
            port = 8081

            [stream]
            connect_timeout_ms = 1500
            forward_headers = ["authorization"]
            "#,
        )
        .unwrap();

        assert_eq!(config.services.media, ServiceEndpoint::new("10.0.0.5", 8081));
        assert_eq!(config.stream.connect_timeout_ms, 1500);
        assert_eq!(config.stream.forward_headers, vec!["authorization".to_string()]);
        assert_eq!(config.stream.client_prefix, "/video");
        assert_eq!(config.services.auth.port, 8000);
    }

    #[test]
    fn validation_errors_are_joined() {
        let err = ConfigError::Validation(vec![
            ValidationError::ZeroConnectTimeout,
            ValidationError::ZeroRequestTimeout,
        ]);
        assert_eq!(
            err.to_string(),
            "Validation failed: stream.connect_timeout_ms must be greater than zero, \
             timeouts.request_secs must be greater than zero"
        );
    }
}
