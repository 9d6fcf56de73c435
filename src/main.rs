//! Resource gate server.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http::server (request id, trace, catch-panic)
//!                         │
//!                         ▼
//!                     http::gate (timeout → 408) ──▶ routing::Router (first match wins)
//!                         │                 │ no match → 404
//!                         ▼                 ▼
//!                     resource::authorize (permission check → 401), then bind
//!                         │
//!                         ▼
//!                     dispatch::recover(dispatch) (405 / 501 / 500)
//!                         │
//!     Client Response     ▼
//!     ◀────────────── http::response ──▶ observability::access_log
//! ```

use clap::Parser;
use std::path::PathBuf;

use resource_gate::config::{self, ConfigError, GateConfig};
use resource_gate::http::{self, Gate, HttpServer};
use resource_gate::lifecycle::{shutdown_signal, Shutdown};
use resource_gate::notes::{self, NoteStore};
use resource_gate::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "resource-gate", version)]
#[command(about = "Serve ordered resource routes with per-method access control", long_about = None)]
struct Cli {
    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override listener.bind_address
    #[arg(short, long)]
    bind: Option<String>,

    /// Validate configuration and routes, print the route table, and exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => GateConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
        config::validate_config(&config).map_err(ConfigError::Validation)?;
    }

    logging::init(&config.observability)?;
    tracing::info!("resource-gate v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        max_body_bytes = config.limits.max_body_bytes,
        identity_header = %config.identity.user_header,
        "Configuration loaded"
    );

    let router = notes::routes(NoteStore::new())?;

    if cli.check {
        for (index, entry) in router.entries().iter().enumerate() {
            println!(
                "{:>3}  {:<24} {}",
                index,
                entry.pattern().template(),
                entry.prototype().type_name()
            );
        }
        return Ok(());
    }

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = http::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let signals = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        signals.trigger();
    });

    let server = HttpServer::new(Gate::new(router, &config));
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
