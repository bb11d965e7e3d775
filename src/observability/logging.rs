//! Structured logging.
//!
//! `RUST_LOG` wins when set; otherwise the configured level applies to the
//! gateway and tower-http (access log) targets.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ObservabilityConfig;

/// Filter directive used when `RUST_LOG` is unset.
pub fn default_directive(config: &ObservabilityConfig) -> String {
    format!(
        "stream_gateway={level},tower_http={level}",
        level = config.log_level
    )
}

/// Initialize the global tracing subscriber.
pub fn init_tracing(config: &ObservabilityConfig) {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_directive(config).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directive_uses_configured_level() {
        let config = ObservabilityConfig {
            log_level: "debug".into(),
            ..ObservabilityConfig::default()
        };
        assert_eq!(
            default_directive(&config),
            "stream_gateway=debug,tower_http=debug"
        );
    }
}
