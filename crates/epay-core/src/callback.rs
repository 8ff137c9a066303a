//! Processing of the gateway's asynchronous payment-status notifications.
//!
//! A notification carries an `encoded` payload and its `checksum`. The
//! checksum is verified before anything else is looked at; only then is the
//! payload decoded, parsed and handed to a [`PaymentHandler`]. Every path ends
//! in a [`CallbackReply`] whose [`body`](CallbackReply::body) is what the
//! gateway expects back.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::NaiveDateTime;
use serde::Serialize;
use std::fmt;

use crate::checksum;
use crate::encoding::{
    decode_payload, push_record, records, Record, KEY_BCODE, KEY_INVOICE, KEY_PAY_TIME, KEY_STAN,
    KEY_STATUS,
};
use crate::error::CoreError;
use crate::state_machine::{CallbackEvent, CallbackState, CallbackStateMachine};
use crate::types::{format_timestamp, parse_timestamp, PaymentStatus};

/// A payment reported by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Payment {
    /// Invoice number of the original request.
    pub invoice: u64,
    /// Final status of the payment.
    pub status: PaymentStatus,
    /// When the payment was made, in gateway local time.
    pub pay_time: Option<NaiveDateTime>,
    /// Transaction sequence number.
    pub stan: i64,
    /// Authorization code.
    pub bcode: String,
}

impl Payment {
    /// Render the payment the way the gateway reports it: `INVOICE` and
    /// `STATUS`, then `PAY_TIME`, `STAN` and `BCODE` when present.
    pub fn canonical_text(&self) -> String {
        let mut text = String::with_capacity(96);
        push_record(&mut text, KEY_INVOICE, &self.invoice.to_string());
        push_record(&mut text, KEY_STATUS, self.status.as_str());
        if let Some(pay_time) = &self.pay_time {
            push_record(&mut text, KEY_PAY_TIME, &format_timestamp(pay_time));
        }
        if self.stan != 0 {
            push_record(&mut text, KEY_STAN, &self.stan.to_string());
        }
        if !self.bcode.is_empty() {
            push_record(&mut text, KEY_BCODE, &self.bcode);
        }
        text
    }

    /// Base64 of [`canonical_text`](Self::canonical_text), as found in the
    /// `encoded` field of a notification.
    pub fn encode(&self) -> String {
        STANDARD.encode(self.canonical_text())
    }
}

/// A field that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseIssue {
    pub key: String,
    pub value: String,
    pub reason: String,
}

impl fmt::Display for ParseIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={:?}: {}", self.key, self.value, self.reason)
    }
}

/// Result of best-effort parsing: whatever could be read, plus what could not.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedCallback {
    pub payment: Payment,
    pub issues: Vec<ParseIssue>,
}

impl ParsedCallback {
    /// Whether every recognized field parsed.
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Parse decoded callback text into a [`Payment`].
///
/// Parsing never stops early: a bad `INVOICE`, `PAY_TIME` or `STAN` value is
/// recorded as an issue and the remaining records are still read. Lines
/// without `=` and unknown keys are ignored.
pub fn parse_callback(text: &str) -> ParsedCallback {
    let mut parsed = ParsedCallback::default();

    for record in records(text) {
        let (key, value) = match record {
            Record::Field { key, value } => (key, value),
            Record::Malformed(line) => {
                tracing::debug!(line, "skipping malformed callback record");
                continue;
            }
        };

        match key {
            KEY_INVOICE => match value.parse::<u64>() {
                Ok(invoice) => parsed.payment.invoice = invoice,
                Err(e) => parsed.push_issue(key, value, e.to_string()),
            },
            KEY_STATUS => {
                let status = PaymentStatus::from(value);
                if !status.is_known() {
                    tracing::warn!(status = value, "unrecognized payment status");
                }
                parsed.payment.status = status;
            }
            KEY_PAY_TIME => match parse_timestamp(value) {
                Ok(t) => parsed.payment.pay_time = Some(t),
                Err(e) => parsed.push_issue(key, value, e.to_string()),
            },
            KEY_STAN => match value.parse::<i64>() {
                Ok(stan) => parsed.payment.stan = stan,
                Err(e) => parsed.push_issue(key, value, e.to_string()),
            },
            KEY_BCODE => parsed.payment.bcode = value.to_string(),
            _ => {}
        }
    }

    parsed
}

impl ParsedCallback {
    fn push_issue(&mut self, key: &str, value: &str, reason: String) {
        tracing::warn!(key, value, %reason, "failed to parse callback field");
        self.issues.push(ParseIssue {
            key: key.to_string(),
            value: value.to_string(),
            reason,
        });
    }
}

/// Error returned by a [`PaymentHandler`].
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    /// The invoice is unknown to the merchant. Answered with `NO`.
    #[error("invalid invoice")]
    InvalidInvoice,

    /// Any other failure. Answered with `ERR`.
    #[error("{0}")]
    Failed(String),
}

/// Business logic run for every verified, cleanly parsed payment.
pub trait PaymentHandler {
    fn handle(&self, payment: &Payment) -> Result<(), HandlerError>;
}

impl<F> PaymentHandler for F
where
    F: Fn(&Payment) -> Result<(), HandlerError>,
{
    fn handle(&self, payment: &Payment) -> Result<(), HandlerError> {
        self(payment)
    }
}

/// Status word of the reply sent back to the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ReplyStatus {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "NO")]
    No,
    #[serde(rename = "ERR")]
    Err,
}

impl fmt::Display for ReplyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "OK"),
            Self::No => write!(f, "NO"),
            Self::Err => write!(f, "ERR"),
        }
    }
}

/// Why a callback ended the way it did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// The handler accepted the payment.
    Accepted,
    /// The handler did not recognize the invoice.
    InvoiceRejected,
    /// The handler failed with the given message.
    HandlerFailed(String),
    /// The checksum did not match; the payload was not inspected.
    ChecksumMismatch { expected: String, received: String },
    /// The payload was not valid base64 text.
    DecodeFailed(String),
    /// Some fields could not be parsed; the handler was not called.
    ParseFailed(Vec<ParseIssue>),
    /// The processing flow itself went wrong.
    Internal(String),
}

/// The answer to one callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackReply {
    pub invoice: u64,
    pub status: ReplyStatus,
    /// Final state reached.
    pub state: CallbackState,
    pub outcome: CallbackOutcome,
    /// The payment, when the payload got far enough to be parsed.
    pub payment: Option<Payment>,
}

impl CallbackReply {
    /// The exact reply body: `INVOICE=<n>:STATUS=<status>\n`.
    pub fn body(&self) -> String {
        format!("INVOICE={}:STATUS={}\n", self.invoice, self.status)
    }

    /// Whether the handler ran.
    pub fn handler_invoked(&self) -> bool {
        matches!(
            self.outcome,
            CallbackOutcome::Accepted
                | CallbackOutcome::InvoiceRejected
                | CallbackOutcome::HandlerFailed(_)
        )
    }
}

/// Verify, decode and parse a callback, then run `handler` on the payment.
///
/// The handler only runs when the checksum matches and every recognized
/// field parsed. The returned reply is never an error: failures are mapped to
/// the `ERR` status and described in [`CallbackReply::outcome`].
pub fn process_callback<H>(
    encoded: &str,
    checksum: &str,
    secret: &[u8],
    handler: &H,
) -> CallbackReply
where
    H: PaymentHandler + ?Sized,
{
    match run(encoded, checksum, secret, handler) {
        Ok(reply) => {
            tracing::info!(
                invoice = reply.invoice,
                status = %reply.status,
                state = %reply.state,
                "callback processed"
            );
            reply
        }
        Err(e) => {
            tracing::error!(error = %e, "callback processing failed");
            CallbackReply {
                invoice: 0,
                status: ReplyStatus::Err,
                state: CallbackState::RepliedErr,
                outcome: CallbackOutcome::Internal(e.to_string()),
                payment: None,
            }
        }
    }
}

fn run<H>(
    encoded: &str,
    checksum: &str,
    secret: &[u8],
    handler: &H,
) -> Result<CallbackReply, CoreError>
where
    H: PaymentHandler + ?Sized,
{
    let state = CallbackState::Received;

    // 1. Nothing in the payload is trusted before this passes.
    if let Err(CoreError::ChecksumMismatch { expected, received }) =
        checksum::verify_checksum(encoded.as_bytes(), secret, checksum)
    {
        tracing::warn!(%expected, %received, "callback checksum mismatch");
        let state = CallbackStateMachine::transition(state, CallbackEvent::ChecksumMismatched)?;
        return Ok(CallbackReply {
            invoice: 0,
            status: ReplyStatus::Err,
            state,
            outcome: CallbackOutcome::ChecksumMismatch { expected, received },
            payment: None,
        });
    }
    let state = CallbackStateMachine::transition(state, CallbackEvent::ChecksumMatched)?;

    // 2. Decode.
    let text = match decode_payload(encoded) {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(error = %e, "callback payload could not be decoded");
            let state = CallbackStateMachine::transition(state, CallbackEvent::DecodeFailed)?;
            return Ok(CallbackReply {
                invoice: 0,
                status: ReplyStatus::Err,
                state,
                outcome: CallbackOutcome::DecodeFailed(e.to_string()),
                payment: None,
            });
        }
    };
    let state = CallbackStateMachine::transition(state, CallbackEvent::PayloadDecoded)?;

    // 3. Parse, best effort.
    let ParsedCallback { payment, issues } = parse_callback(&text);
    if !issues.is_empty() {
        let state = CallbackStateMachine::transition(state, CallbackEvent::ParseFailed)?;
        return Ok(CallbackReply {
            invoice: payment.invoice,
            status: ReplyStatus::Err,
            state,
            outcome: CallbackOutcome::ParseFailed(issues),
            payment: Some(payment),
        });
    }
    let state = CallbackStateMachine::transition(state, CallbackEvent::FieldsParsed)?;

    // 4. Hand over to the business logic.
    let state = CallbackStateMachine::transition(state, CallbackEvent::HandlerCalled)?;
    let (event, status, outcome) = match handler.handle(&payment) {
        Ok(()) => (
            CallbackEvent::HandlerSucceeded,
            ReplyStatus::Ok,
            CallbackOutcome::Accepted,
        ),
        Err(HandlerError::InvalidInvoice) => {
            tracing::info!(invoice = payment.invoice, "handler rejected invoice");
            (
                CallbackEvent::InvoiceUnknown,
                ReplyStatus::No,
                CallbackOutcome::InvoiceRejected,
            )
        }
        Err(HandlerError::Failed(message)) => {
            tracing::error!(invoice = payment.invoice, error = %message, "payment handler error");
            (
                CallbackEvent::HandlerFailed,
                ReplyStatus::Err,
                CallbackOutcome::HandlerFailed(message),
            )
        }
    };
    let state = CallbackStateMachine::transition(state, event)?;

    Ok(CallbackReply {
        invoice: payment.invoice,
        status,
        state,
        outcome,
        payment: Some(payment),
    })
}
