//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): one-shot requests by method, status, upstream
//! - `gateway_request_duration_seconds` (histogram): one-shot latency
//! - `gateway_stream_sessions_active` (gauge): in-flight stream sessions
//! - `gateway_stream_sessions_total` (counter): finished sessions by outcome
//! - `gateway_stream_bytes_total` (counter): bytes relayed to clients
//!
//! Recording is a no-op until a recorder is installed with [`init_metrics`].

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a completed one-shot request.
pub fn record_request(method: &str, status: u16, upstream: &str, start: Instant) {
    let labels = [
        ("method", method.to_string()),
        ("status", status.to_string()),
        ("upstream", upstream.to_string()),
    ];
    counter!("gateway_requests_total", &labels).increment(1);
    histogram!("gateway_request_duration_seconds", &labels)
        .record(start.elapsed().as_secs_f64());
}

pub fn stream_session_started() {
    gauge!("gateway_stream_sessions_active").increment(1.0);
}

pub fn stream_session_ended() {
    gauge!("gateway_stream_sessions_active").decrement(1.0);
}

/// Record how a stream session ended and how much it relayed.
pub fn record_stream_outcome(outcome: &'static str, bytes: u64) {
    counter!("gateway_stream_sessions_total", "outcome" => outcome).increment(1);
    counter!("gateway_stream_bytes_total").increment(bytes);
}
