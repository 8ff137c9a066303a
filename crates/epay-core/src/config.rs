use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{Currency, Environment, Language};

/// Environment variable that overrides [`GatewayConfig::secret`].
pub const SECRET_ENV_VAR: &str = "EPAY_SECRET";

/// Merchant credentials and defaults, the `[gateway]` section of `epay.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Which gateway deployment to use.
    #[serde(default = "default_environment")]
    pub environment: Environment,
    /// Client identification number issued by the gateway.
    #[serde(default)]
    pub cin: String,
    /// Shared HMAC secret. Prefer setting `EPAY_SECRET` instead.
    #[serde(default)]
    pub secret: String,
    #[serde(default)]
    pub default_language: Language,
    #[serde(default)]
    pub default_currency: Currency,
}

fn default_environment() -> Environment {
    Environment::Sandbox
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            cin: String::new(),
            secret: String::new(),
            default_language: Language::default(),
            default_currency: Currency::default(),
        }
    }
}

impl GatewayConfig {
    /// The secret to sign with: `EPAY_SECRET` when set and non-empty, the
    /// configured value otherwise.
    pub fn resolved_secret(&self) -> String {
        match std::env::var(SECRET_ENV_VAR) {
            Ok(secret) if !secret.is_empty() => secret,
            _ => self.secret.clone(),
        }
    }

    /// Base URL of the configured environment.
    pub fn base_url(&self) -> &'static str {
        self.environment.base_url()
    }
}

impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("environment", &self.environment)
            .field("cin", &self.cin)
            .field("secret", &"[redacted]")
            .field("default_language", &self.default_language)
            .field("default_currency", &self.default_currency)
            .finish()
    }
}
