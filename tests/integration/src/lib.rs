//! Fixtures shared by the integration tests.

use chrono::{NaiveDate, NaiveDateTime};
use epay_core::{EpayClient, HandlerError, Payment, PaymentHandler};
use std::sync::Mutex;

pub const CIN: &str = "D123456789";
pub const SECRET: &str = "integration-secret";

/// A sandbox client with the fixture credentials.
pub fn sandbox_client() -> EpayClient {
    match EpayClient::builder(CIN, SECRET).demo().build() {
        Ok(client) => client,
        Err(e) => panic!("fixture client: {e}"),
    }
}

/// 05.03.2024 14:30:00
pub fn fixed_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 5)
        .and_then(|d| d.and_hms_opt(14, 30, 0))
        .unwrap_or_default()
}

/// What a [`RecordingHandler`] answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    UnknownInvoice,
    Fail,
}

/// Handler that remembers every payment it sees.
pub struct RecordingHandler {
    verdict: Verdict,
    seen: Mutex<Vec<Payment>>,
}

impl RecordingHandler {
    pub fn new(verdict: Verdict) -> Self {
        Self {
            verdict,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn seen(&self) -> Vec<Payment> {
        self.seen.lock().map(|v| v.clone()).unwrap_or_default()
    }

    pub fn calls(&self) -> usize {
        self.seen().len()
    }
}

impl PaymentHandler for RecordingHandler {
    fn handle(&self, payment: &Payment) -> Result<(), HandlerError> {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(payment.clone());
        }
        match self.verdict {
            Verdict::Accept => Ok(()),
            Verdict::UnknownInvoice => Err(HandlerError::InvalidInvoice),
            Verdict::Fail => Err(HandlerError::Failed("ledger unavailable".into())),
        }
    }
}
