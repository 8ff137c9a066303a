//! Shared node state for HTTP handlers.

use epay_core::{Currency, EpayClient};
use std::time::Instant;

use crate::ledger::InvoiceLedger;

/// Shared state for the running node, accessible from HTTP handlers.
pub struct NodeState {
    /// Gateway client holding the merchant credentials.
    pub client: EpayClient,
    /// Currency used when a request does not name one.
    pub default_currency: Currency,
    /// Route the gateway posts notifications to.
    pub notify_path: String,
    /// Invoices served so far.
    pub ledger: InvoiceLedger,
    /// When the node started.
    pub start_time: Instant,
}

impl NodeState {
    pub fn new(
        client: EpayClient,
        default_currency: Currency,
        notify_path: String,
        max_invoices: usize,
    ) -> Self {
        Self {
            client,
            default_currency,
            notify_path,
            ledger: InvoiceLedger::new(max_invoices),
            start_time: Instant::now(),
        }
    }
}
