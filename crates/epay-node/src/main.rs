//! ePay node: serves payment pages and receives gateway notifications.
//!
//! Starts the HTTP server with configuration from a TOML file or defaults.

mod api;
mod config;
mod ledger;
mod render;
mod state;

use anyhow::Context;
use clap::Parser;
use epay_core::{EpayClient, Environment};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use config::{LoggingConfig, NodeConfig};
use state::NodeState;

/// ePay Node
#[derive(Parser, Debug)]
#[command(name = "epay-node", version, about = "ePay payment page and notification server")]
struct Args {
    /// Path to the configuration file (TOML).
    #[arg(short, long, default_value = "epay.toml")]
    config: PathBuf,

    /// Override the HTTP listen address.
    #[arg(long)]
    listen_addr: Option<String>,

    /// Override the HTTP port.
    #[arg(long)]
    port: Option<u16>,

    /// Override the notification route.
    #[arg(long)]
    notify_path: Option<String>,

    /// Override the gateway environment (production, sandbox).
    #[arg(long)]
    environment: Option<Environment>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,

    /// Override the log format (text, json).
    #[arg(long)]
    log_format: Option<String>,

    /// Generate a default config file and exit.
    #[arg(long)]
    init: bool,
}

fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    if logging.format.eq_ignore_ascii_case("json") {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("received shutdown signal"),
        Err(e) => tracing::error!(error = %e, "failed to listen for ctrl-c"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Handle --init flag
    if args.init {
        NodeConfig::default().save(&args.config)?;
        println!("wrote default config to {}", args.config.display());
        return Ok(());
    }

    // Load configuration
    let mut config = NodeConfig::load(&args.config)
        .with_context(|| format!("failed to load {}", args.config.display()))?;

    // Apply CLI overrides
    if let Some(listen_addr) = args.listen_addr {
        config.api.listen_addr = listen_addr;
    }
    if let Some(port) = args.port {
        config.api.port = port;
    }
    if let Some(notify_path) = args.notify_path {
        config.api.notify_path = notify_path;
    }
    if let Some(environment) = args.environment {
        config.gateway.environment = environment;
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }
    if let Some(format) = args.log_format {
        config.logging.format = format;
    }

    init_tracing(&config.logging);
    tracing::info!("ePay node v{}", env!("CARGO_PKG_VERSION"));

    let client = EpayClient::from_config(&config.gateway)
        .context("invalid [gateway] configuration (is EPAY_SECRET set?)")?;
    tracing::info!(gateway = %client.url(), cin = %client.cin(), "gateway client ready");

    let listen_addr = config.api.socket_addr()?;
    let state = Arc::new(NodeState::new(
        client,
        config.gateway.default_currency,
        config.api.notify_route(),
        config.api.max_invoices,
    ));

    api::start_api_server(listen_addr, state, shutdown_signal()).await?;

    tracing::info!("ePay node exited cleanly");
    Ok(())
}
