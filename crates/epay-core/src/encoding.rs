//! The gateway's canonical `KEY=value` payload format.
//!
//! Outbound requests are rendered as newline-terminated records in a fixed
//! order and base64-encoded. Inbound callbacks use the same record layout,
//! which [`decode_payload`] and [`records`] take apart again.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;

use crate::error::CoreError;
use crate::types::{format_amount, format_timestamp, min_amount, Currency, Language};

pub const KEY_MIN: &str = "MIN";
pub const KEY_INVOICE: &str = "INVOICE";
pub const KEY_AMOUNT: &str = "AMOUNT";
pub const KEY_EXP_TIME: &str = "EXP_TIME";
pub const KEY_CURRENCY: &str = "CURRENCY";
pub const KEY_LANGUAGE: &str = "LANGUAGE";
pub const KEY_DESCRIPTION: &str = "DESCRIPTION";
pub const KEY_STATUS: &str = "STATUS";
pub const KEY_PAY_TIME: &str = "PAY_TIME";
pub const KEY_STAN: &str = "STAN";
pub const KEY_BCODE: &str = "BCODE";

/// The fields of an outbound request that end up in the encoded payload.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSet<'a> {
    pub cin: &'a str,
    pub invoice: u64,
    pub amount: Decimal,
    pub expiration_time: Option<NaiveDateTime>,
    pub currency: Option<Currency>,
    pub language: Option<Language>,
    pub description: &'a str,
}

impl FieldSet<'_> {
    /// Check every mandatory field before anything is rendered.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.cin.is_empty() {
            return Err(CoreError::InvalidField("CIN is empty".into()));
        }
        if self.invoice == 0 {
            return Err(CoreError::InvalidField("invoice must be greater than zero".into()));
        }
        if self.amount < min_amount() {
            return Err(CoreError::InvalidField(format!(
                "amount {} is below the 0.01 minimum",
                self.amount
            )));
        }
        if self.expiration_time.is_none() {
            return Err(CoreError::InvalidField("expiration time is not set".into()));
        }
        for (key, value) in [(KEY_MIN, self.cin), (KEY_DESCRIPTION, self.description)] {
            if value.contains(|c| c == '\n' || c == '\r') {
                return Err(CoreError::InvalidField(format!(
                    "{} must not contain line breaks",
                    key
                )));
            }
        }
        Ok(())
    }

    /// Render the newline-delimited `KEY=value` text.
    pub fn canonical_text(&self) -> Result<String, CoreError> {
        self.validate()?;
        let expiration_time = self
            .expiration_time
            .ok_or_else(|| CoreError::InvalidField("expiration time is not set".into()))?;

        let mut text = String::with_capacity(128);
        push_record(&mut text, KEY_MIN, self.cin);
        push_record(&mut text, KEY_INVOICE, &self.invoice.to_string());
        push_record(&mut text, KEY_AMOUNT, &format_amount(self.amount));
        push_record(&mut text, KEY_EXP_TIME, &format_timestamp(&expiration_time));

        // Optional fields are only written when set.
        if let Some(currency) = self.currency {
            push_record(&mut text, KEY_CURRENCY, currency.code());
        }
        if let Some(language) = self.language {
            push_record(&mut text, KEY_LANGUAGE, language.code());
        }
        if !self.description.is_empty() {
            push_record(&mut text, KEY_DESCRIPTION, self.description);
        }

        Ok(text)
    }

    /// Render and base64-encode the payload.
    pub fn encode(&self) -> Result<String, CoreError> {
        let text = self.canonical_text()?;
        Ok(STANDARD.encode(text.as_bytes()))
    }
}

pub(crate) fn push_record(buf: &mut String, key: &str, value: &str) {
    buf.push_str(key);
    buf.push('=');
    buf.push_str(value);
    buf.push('\n');
}

/// Base64-decode a payload back into its `KEY=value` text.
pub fn decode_payload(encoded: &str) -> Result<String, CoreError> {
    let bytes = STANDARD.decode(encoded.trim())?;
    String::from_utf8(bytes)
        .map_err(|e| CoreError::Parse(format!("payload is not valid UTF-8: {}", e)))
}

/// A single line of a decoded payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Record<'a> {
    /// `KEY=value`, split on the first `=`.
    Field { key: &'a str, value: &'a str },
    /// A non-empty line with no `=` in it.
    Malformed(&'a str),
}

/// Iterate over the records of a decoded payload, skipping blank lines.
pub fn records(text: &str) -> impl Iterator<Item = Record<'_>> {
    text.split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter(|line| !line.is_empty())
        .map(|line| match line.split_once('=') {
            Some((key, value)) => Record::Field { key, value },
            None => Record::Malformed(line),
        })
}
