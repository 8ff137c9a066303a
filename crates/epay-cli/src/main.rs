//! ePay CLI: build, sign, verify and decode gateway payloads, and simulate
//! gateway notifications against a running node.
//!
//! Subcommands: init, encode, sign, verify, decode, notify.

mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// ePay merchant tooling.
#[derive(Parser, Debug)]
#[command(name = "epay", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a default epay.toml.
    Init(commands::init::InitArgs),
    /// Encode a payment request payload.
    Encode(commands::encode::EncodeArgs),
    /// Encode and sign a payment request, printing the form fields.
    Sign(commands::sign::SignArgs),
    /// Check a checksum against an encoded payload.
    Verify(commands::verify::VerifyArgs),
    /// Decode a base64 payload and show its records.
    Decode(commands::decode::DecodeArgs),
    /// Send a signed payment notification to a node, as the gateway would.
    Notify(commands::notify::NotifyArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Commands::Init(args) => commands::init::run(args),
        Commands::Encode(args) => commands::encode::run(args),
        Commands::Sign(args) => commands::sign::run(args),
        Commands::Verify(args) => commands::verify::run(args),
        Commands::Decode(args) => commands::decode::run(args),
        Commands::Notify(args) => commands::notify::run(args).await,
    }
}
