//! Billing handlers.
//!
//! ## Commands
//! - Processing payment provider webhooks
//! - Reconciling the idempotency ledger at startup

mod handle_payment_webhook;
mod reconcile_ledger;

pub use handle_payment_webhook::{
    HandlePaymentWebhookCommand, HandlePaymentWebhookHandler, HandlePaymentWebhookResult,
};
pub use reconcile_ledger::ReconcileLedgerHandler;
