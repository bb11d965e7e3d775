//! Stream gateway (v1)
//!
//! Single-port HTTP gateway for the camera platform.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────────────────────────────┐
//!                        │                 STREAM GATEWAY                │
//!     Client Request     │  ┌────────┐    ┌──────────┐                  │
//!     ───────────────────┼─▶│  http  │───▶│ one-shot │──────────────────┼──▶ media / auth
//!                        │  │ server │    │ forward  │                  │
//!                        │  └───┬────┘    └──────────┘                  │
//!                        │      │ fallback                              │
//!                        │      ▼                                       │
//!                        │  ┌────────┐   ┌────────┐   ┌───────┐         │
//!     Chunked Response   │  │routing │──▶│ opener │──▶│ relay │◀────────┼─── camera stream
//!     ◀──────────────────┼──│resolver│   │ +guard │   │       │         │
//!                        │  └────────┘   └────────┘   └───────┘         │
//!                        │                                              │
//!                        │   config · observability · lifecycle         │
//!                        └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use stream_gateway::config::load_config;
use stream_gateway::http::HttpServer;
use stream_gateway::lifecycle::signals;
use stream_gateway::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "stream-gateway")]
#[command(about = "HTTP gateway relaying live camera streams", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    logging::init_tracing(&config.observability);
    tracing::info!("stream-gateway v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        media = %config.services.media,
        auth = %config.services.auth,
        connect_timeout_ms = config.stream.connect_timeout_ms,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let local_addr = listener.local_addr()?;
    tracing::info!(address = %local_addr, "Listening for connections");

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let server = HttpServer::new(config);
    let shutdown = server.shutdown();
    tokio::spawn(async move {
        signals::wait_for_signal().await;
        shutdown.trigger();
    });

    server.run(listener).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
