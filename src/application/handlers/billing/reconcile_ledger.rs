//! ReconcileLedgerHandler - Startup repair of unfinished ledger claims.

use std::sync::Arc;

use tracing::info;

use crate::domain::billing::{IdempotencyLedger, ReconcileReport, WebhookError};
use crate::ports::SubscriptionStore;

/// Resolves `Processing` ledger records left behind by a previous process.
///
/// Must run once before the server accepts traffic.
pub struct ReconcileLedgerHandler {
    ledger: Arc<IdempotencyLedger>,
    subscriptions: Arc<dyn SubscriptionStore>,
}

impl ReconcileLedgerHandler {
    pub fn new(ledger: Arc<IdempotencyLedger>, subscriptions: Arc<dyn SubscriptionStore>) -> Self {
        Self {
            ledger,
            subscriptions,
        }
    }

    pub async fn handle(&self) -> Result<ReconcileReport, WebhookError> {
        let report = self.ledger.reconcile(self.subscriptions.as_ref()).await?;

        info!(
            completed = report.completed,
            superseded = report.superseded,
            released = report.released,
            "ledger reconciliation finished"
        );

        Ok(report)
    }
}
