//! Status Service (v1)
//!
//! Polls a fixed set of downstream services and serves their aggregated
//! health over HTTP.
//!
//! # Architecture Overview
//!
//! ```text
//!                 ┌──────────────────────────────────────────────────────────┐
//!                 │                     STATUS SERVICE                        │
//!                 │                                                           │
//!                 │  ┌──────────┐    ┌──────────┐   one task per http target  │
//!                 │  │  config  │───▶│ registry │──────────┐                  │
//!                 │  └──────────┘    └──────────┘          ▼                  │
//!                 │                               ┌──────────────┐   probe    │
//!                 │                               │  scheduler   │───────────┼──▶ GET <url><health_path>
//!                 │                               └──────┬───────┘            │
//!                 │                                      │ update             │
//!                 │                                      ▼                    │
//!   GET /health   │  ┌─────────┐    ┌──────────┐  ┌──────────────┐            │
//!   GET /status  ─┼─▶│  http   │───▶│  query   │─▶│ status store │            │
//!   GET /services │  │ server  │    │  facade  │  │ (per target) │            │
//!                 │  └─────────┘    └──────────┘  └──────────────┘            │
//!                 │                                                           │
//!                 │  lifecycle (startup / signals / shutdown), observability  │
//!                 └──────────────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use tokio::net::TcpListener;

use status_service::config::{resolve_config, ObservabilityConfig};
use status_service::lifecycle::{self, signals};
use status_service::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "status-service")]
#[command(about = "Aggregated health of the pipeline services", long_about = None)]
struct Args {
    /// Path to a TOML config file. Built-in targets are used when omitted.
    #[arg(short, long, env = "STATUS_SERVICE_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match resolve_config(args.config.as_deref(), |key| std::env::var(key).ok()) {
        Ok(config) => config,
        Err(e) => {
            let _ = logging::init_logging(&ObservabilityConfig::default());
            tracing::error!(error = %e, "Refusing to start with invalid configuration");
            return Err(e.into());
        }
    };

    logging::init_logging(&config.observability)?;

    tracing::info!("status-service v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        targets = config.targets.len(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let service = lifecycle::start(config, listener).await?;

    service.run_until(signals::wait_for_shutdown_signal()).await?;
    Ok(())
}
