pub mod decode;
pub mod encode;
pub mod init;
pub mod notify;
pub mod sign;
pub mod verify;

use anyhow::Context;
use clap::Args;
use epay_core::{EpayClient, Environment, GatewayConfig};
use serde::Deserialize;
use std::path::PathBuf;

/// Merchant settings shared by the subcommands that need them.
///
/// Values come from the `[gateway]` section of the config file; flags win.
/// The secret can also be given through `EPAY_SECRET`.
#[derive(Args, Debug, Clone)]
pub struct GatewayArgs {
    /// Path to the configuration file (TOML).
    #[arg(short = 'C', long, default_value = "epay.toml")]
    pub config: PathBuf,

    /// Client identification number.
    #[arg(long)]
    pub cin: Option<String>,

    /// Shared secret used for checksums.
    #[arg(long)]
    pub secret: Option<String>,

    /// Gateway environment (production, sandbox).
    #[arg(long)]
    pub environment: Option<Environment>,
}

#[derive(Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    gateway: GatewayConfig,
}

impl GatewayArgs {
    /// The effective gateway settings.
    pub fn gateway(&self) -> anyhow::Result<GatewayConfig> {
        let mut gateway = if self.config.exists() {
            let contents = std::fs::read_to_string(&self.config)
                .with_context(|| format!("failed to read {}", self.config.display()))?;
            let file: ConfigFile = toml::from_str(&contents)
                .with_context(|| format!("failed to parse {}", self.config.display()))?;
            file.gateway
        } else {
            GatewayConfig::default()
        };

        if let Some(cin) = &self.cin {
            gateway.cin = cin.clone();
        }
        if let Some(environment) = self.environment {
            gateway.environment = environment;
        }
        tracing::debug!(config = %self.config.display(), ?gateway, "gateway settings resolved");
        Ok(gateway)
    }

    /// The secret: `--secret`, then `EPAY_SECRET`, then the config file.
    pub fn secret(&self, gateway: &GatewayConfig) -> String {
        match &self.secret {
            Some(secret) => secret.clone(),
            None => gateway.resolved_secret(),
        }
    }

    /// A client with credentials, for commands that sign.
    pub fn client(&self, gateway: &GatewayConfig) -> anyhow::Result<EpayClient> {
        let secret = self.secret(gateway);
        EpayClient::builder(gateway.cin.clone(), secret.as_bytes())
            .environment(gateway.environment)
            .default_language(gateway.default_language)
            .build()
            .context("gateway credentials are incomplete (set --cin and --secret or EPAY_SECRET)")
    }
}
