//! In-memory record of issued invoices and what the gateway reported for them.

use chrono::{Local, NaiveDateTime};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use epay_core::{Currency, HandlerError, Payment, PaymentHandler, PaymentRequest, PaymentStatus};
use rust_decimal::Decimal;
use serde::Serialize;

/// One issued invoice.
#[derive(Debug, Clone, Serialize)]
pub struct InvoiceEntry {
    pub invoice: u64,
    pub amount: Decimal,
    pub currency: Option<Currency>,
    pub description: String,
    pub registered_at: NaiveDateTime,
    /// Latest status reported by the gateway, if any.
    pub status: Option<PaymentStatus>,
    pub pay_time: Option<NaiveDateTime>,
    pub stan: Option<i64>,
    pub bcode: Option<String>,
    /// How many notifications were accepted for this invoice.
    pub notifications: u32,
}

impl InvoiceEntry {
    fn same_terms(&self, request: &PaymentRequest) -> bool {
        self.amount == request.amount()
            && self.currency == request.currency()
            && self.description == request.description()
    }
}

/// Default upper bound on the number of invoices kept in memory.
pub const DEFAULT_MAX_INVOICES: usize = 10_000;

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("invoice {0} was already reported by the gateway with different terms")]
    Settled(u64),

    #[error("invoice ledger is full ({0} invoices)")]
    Full(usize),
}

/// Invoices keyed by number. Acts as the callback [`PaymentHandler`].
#[derive(Debug)]
pub struct InvoiceLedger {
    entries: DashMap<u64, InvoiceEntry>,
    max_invoices: usize,
}

impl Default for InvoiceLedger {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_INVOICES)
    }
}

impl InvoiceLedger {
    pub fn new(max_invoices: usize) -> Self {
        Self {
            entries: DashMap::new(),
            max_invoices,
        }
    }

    /// Remember an invoice for which a payment page was served.
    ///
    /// An invoice the gateway has already reported on is frozen: registering
    /// it again with the same terms is a no-op, with different terms an error.
    /// New invoices are refused once the ledger holds `max_invoices`.
    pub fn register(&self, request: &PaymentRequest) -> Result<(), LedgerError> {
        let invoice = request.invoice();
        // len() locks every shard, so it must run before entry() takes one.
        if !self.entries.contains_key(&invoice) && self.entries.len() >= self.max_invoices {
            tracing::warn!(invoice, max = self.max_invoices, "invoice ledger full");
            return Err(LedgerError::Full(self.max_invoices));
        }

        match self.entries.entry(invoice) {
            Entry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();
                if entry.status.is_some() {
                    if entry.same_terms(request) {
                        return Ok(());
                    }
                    tracing::warn!(invoice, "refusing to change terms of a reported invoice");
                    return Err(LedgerError::Settled(invoice));
                }
                entry.amount = request.amount();
                entry.currency = request.currency();
                entry.description = request.description().to_string();
            }
            Entry::Vacant(vacant) => {
                vacant.insert(InvoiceEntry {
                    invoice,
                    amount: request.amount(),
                    currency: request.currency(),
                    description: request.description().to_string(),
                    registered_at: Local::now().naive_local(),
                    status: None,
                    pay_time: None,
                    stan: None,
                    bcode: None,
                    notifications: 0,
                });
            }
        }
        tracing::debug!(invoice, "invoice registered");
        Ok(())
    }

    pub fn get(&self, invoice: u64) -> Option<InvoiceEntry> {
        self.entries.get(&invoice).map(|e| e.value().clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl PaymentHandler for InvoiceLedger {
    fn handle(&self, payment: &Payment) -> Result<(), HandlerError> {
        let mut entry = self
            .entries
            .get_mut(&payment.invoice)
            .ok_or(HandlerError::InvalidInvoice)?;

        entry.status = Some(payment.status.clone());
        entry.pay_time = payment.pay_time;
        entry.stan = (payment.stan != 0).then_some(payment.stan);
        entry.bcode = (!payment.bcode.is_empty()).then(|| payment.bcode.clone());
        entry.notifications += 1;

        tracing::info!(
            invoice = payment.invoice,
            status = %payment.status,
            notifications = entry.notifications,
            "payment recorded"
        );
        Ok(())
    }
}
