use rust_decimal::Decimal;
use std::fmt;
use zeroize::Zeroizing;

use crate::callback::{process_callback, CallbackReply, PaymentHandler};
use crate::config::GatewayConfig;
use crate::error::CoreError;
use crate::payment_request::{PaymentRequest, PaymentRequestBuilder};
use crate::types::{Environment, Language};

/// Merchant identity bound to one gateway deployment.
///
/// Immutable once built and safe to share between threads. The secret is
/// wiped from memory on drop and never shows up in `Debug` output.
#[derive(Clone)]
pub struct EpayClient {
    url: String,
    cin: String,
    secret: Zeroizing<Vec<u8>>,
    default_language: Language,
}

impl EpayClient {
    /// Start building a client for the production gateway.
    pub fn builder(cin: impl Into<String>, secret: impl AsRef<[u8]>) -> EpayClientBuilder {
        EpayClientBuilder {
            url: Environment::Production.base_url().to_string(),
            cin: cin.into(),
            secret: Zeroizing::new(secret.as_ref().to_vec()),
            default_language: Language::default(),
        }
    }

    /// Build a client from the `[gateway]` configuration section.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, CoreError> {
        let secret = Zeroizing::new(config.resolved_secret());
        Self::builder(config.cin.clone(), secret.as_bytes())
            .environment(config.environment)
            .default_language(config.default_language)
            .build()
    }

    /// Gateway URL requests are posted to.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn cin(&self) -> &str {
        &self.cin
    }

    pub fn default_language(&self) -> Language {
        self.default_language
    }

    /// Start a payment request with this client's URL, CIN and language.
    pub fn payment_request(
        &self,
        amount: Decimal,
        description: impl Into<String>,
        invoice: u64,
    ) -> PaymentRequestBuilder {
        PaymentRequestBuilder::new(&self.url, &self.cin, amount, description, invoice)
            .default_language(self.default_language)
    }

    /// Checksum `request` with the client secret.
    pub fn sign_request(&self, request: &PaymentRequest) -> Result<String, CoreError> {
        request.sign(&self.secret)
    }

    /// Verify and process a gateway notification.
    pub fn handle_callback<H>(&self, encoded: &str, checksum: &str, handler: &H) -> CallbackReply
    where
        H: PaymentHandler + ?Sized,
    {
        process_callback(encoded, checksum, &self.secret, handler)
    }
}

impl fmt::Debug for EpayClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EpayClient")
            .field("url", &self.url)
            .field("cin", &self.cin)
            .field("secret", &"[redacted]")
            .field("default_language", &self.default_language)
            .finish()
    }
}

/// Builder for [`EpayClient`].
pub struct EpayClientBuilder {
    url: String,
    cin: String,
    secret: Zeroizing<Vec<u8>>,
    default_language: Language,
}

impl EpayClientBuilder {
    /// Target a gateway deployment.
    pub fn environment(mut self, environment: Environment) -> Self {
        self.url = environment.base_url().to_string();
        self
    }

    /// Target the sandbox gateway.
    pub fn demo(self) -> Self {
        self.environment(Environment::Sandbox)
    }

    /// Language used for requests that do not set one.
    pub fn default_language(mut self, language: Language) -> Self {
        self.default_language = language;
        self
    }

    pub fn build(self) -> Result<EpayClient, CoreError> {
        if self.cin.trim().is_empty() {
            return Err(CoreError::InvalidField("CIN is empty".into()));
        }
        if self.secret.is_empty() {
            return Err(CoreError::InvalidField("secret is empty".into()));
        }
        tracing::debug!(url = %self.url, cin = %self.cin, "gateway client configured");
        Ok(EpayClient {
            url: self.url,
            cin: self.cin,
            secret: self.secret,
            default_language: self.default_language,
        })
    }
}
