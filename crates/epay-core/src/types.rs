use chrono::NaiveDateTime;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Production gateway endpoint.
pub const PRODUCTION_URL: &str = "https://www.epay.bg/";
/// Sandbox (demo) gateway endpoint.
pub const SANDBOX_URL: &str = "https://demo.epay.bg/";

/// Timestamp layout used on the wire: `DD.MM.YYYY HH:MM:SS`.
pub const TIMESTAMP_FORMAT: &str = "%d.%m.%Y %H:%M:%S";

/// Render a timestamp in the gateway's wire layout.
pub fn format_timestamp(t: &NaiveDateTime) -> String {
    t.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a timestamp in the gateway's wire layout.
pub fn parse_timestamp(s: &str) -> Result<NaiveDateTime, CoreError> {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
        .map_err(|e| CoreError::Parse(format!("invalid timestamp {:?}: {}", s, e)))
}

/// Smallest amount the gateway accepts (0.01).
pub fn min_amount() -> Decimal {
    Decimal::new(1, 2)
}

/// Render an amount with exactly two decimal digits.
pub fn format_amount(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    format!("{:.2}", rounded)
}

fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}

/// Language of the gateway's user interface.
///
/// Deserialization goes through [`FromStr`], so config files accept the same
/// spellings as the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum Language {
    #[default]
    #[serde(rename = "en")]
    English,
    #[serde(rename = "bg")]
    Bulgarian,
}

impl Language {
    /// Wire code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::English => "en",
            Self::Bulgarian => "bg",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "english" | "eng" | "en" => Ok(Self::English),
            "bulgarian" | "bul" | "bg" | "български" | "бг" => Ok(Self::Bulgarian),
            _ => Err(CoreError::UnsupportedLanguage(s.to_string())),
        }
    }
}

impl TryFrom<String> for Language {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Currencies the gateway settles in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum Currency {
    #[default]
    EUR,
    BGN,
    USD,
}

impl Currency {
    /// ISO 4217 code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::EUR => "EUR",
            Self::BGN => "BGN",
            Self::USD => "USD",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "euro" | "eur" => Ok(Self::EUR),
            "bgn" => Ok(Self::BGN),
            "usd" => Ok(Self::USD),
            _ => Err(CoreError::UnsupportedCurrency(s.to_string())),
        }
    }
}

impl TryFrom<String> for Currency {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Which gateway page the customer lands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum PaymentPage {
    /// Payment by a registered gateway user.
    #[serde(rename = "paylogin")]
    Login,
    /// Direct payment with a credit or debit card.
    #[default]
    #[serde(rename = "credit_paydirect")]
    DirectCard,
}

impl PaymentPage {
    /// Value of the `PAGE` form field.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Login => "paylogin",
            Self::DirectCard => "credit_paydirect",
        }
    }
}

impl fmt::Display for PaymentPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for PaymentPage {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "login" | "paylogin" | "request" => Ok(Self::Login),
            "direct" | "credit_paydirect" | "card" => Ok(Self::DirectCard),
            _ => Err(CoreError::UnsupportedPage(s.to_string())),
        }
    }
}

impl TryFrom<String> for PaymentPage {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Gateway deployment to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Environment {
    #[default]
    Production,
    Sandbox,
}

impl Environment {
    /// Base URL of the gateway for this environment.
    pub fn base_url(&self) -> &'static str {
        match self {
            Self::Production => PRODUCTION_URL,
            Self::Sandbox => SANDBOX_URL,
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Production => write!(f, "production"),
            Self::Sandbox => write!(f, "sandbox"),
        }
    }
}

impl FromStr for Environment {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "production" | "prod" => Ok(Self::Production),
            "sandbox" | "demo" => Ok(Self::Sandbox),
            _ => Err(CoreError::UnsupportedEnvironment(s.to_string())),
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Final status of a payment as reported by a callback.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PaymentStatus {
    /// Completed payment.
    Paid,
    /// Failed or cancelled payment.
    Denied,
    /// The request expired before it was paid.
    Expired,
    /// A value outside the known set, kept verbatim.
    Unknown(String),
}

impl Default for PaymentStatus {
    fn default() -> Self {
        Self::Unknown(String::new())
    }
}

impl PaymentStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Paid => "PAID",
            Self::Denied => "DENIED",
            Self::Expired => "EXPIRED",
            Self::Unknown(raw) => raw,
        }
    }

    /// Whether the value is one of the statuses the gateway documents.
    pub fn is_known(&self) -> bool {
        matches!(self, Self::Paid | Self::Denied | Self::Expired)
    }
}

impl From<&str> for PaymentStatus {
    fn from(raw: &str) -> Self {
        match raw {
            "PAID" => Self::Paid,
            "DENIED" => Self::Denied,
            "EXPIRED" => Self::Expired,
            other => Self::Unknown(other.to_string()),
        }
    }
}

impl From<String> for PaymentStatus {
    fn from(raw: String) -> Self {
        Self::from(raw.as_str())
    }
}

impl From<PaymentStatus> for String {
    fn from(status: PaymentStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
