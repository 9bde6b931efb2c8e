//! HandlePaymentWebhookHandler - Command handler for inbound payment notifications.
//!
//! Runs one delivery through the pipeline: signature check, normalization,
//! idempotency claim, subscription transition, ledger completion.

use std::sync::Arc;

use tracing::{error, info, warn, Span};

use crate::domain::billing::{
    ApplyOutcome, BeginOutcome, EventNormalizer, IdempotencyLedger, NoOpReason, PaymentEvent,
    SubscriptionStateMachine, SubscriptionStatus, WebhookError, WebhookVerifier,
};
use crate::domain::foundation::VendorId;
use crate::ports::LedgerOutcome;

/// Command to handle a payment webhook.
#[derive(Debug, Clone)]
pub struct HandlePaymentWebhookCommand {
    /// Raw webhook body, exactly as received.
    pub payload: Vec<u8>,
    /// Signature header value, if the request carried one.
    pub signature: Option<String>,
}

/// Successful webhook processing.
///
/// Duplicate and stale deliveries are acknowledged too, but surface as
/// `WebhookError::DuplicateEvent` / `WebhookError::OrderingConflict` so the
/// caller can tell them apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlePaymentWebhookResult {
    /// The subscription was written.
    Applied {
        vendor_id: VendorId,
        status: SubscriptionStatus,
    },
    /// Event accepted without changing the subscription.
    Unchanged {
        vendor_id: VendorId,
        status: SubscriptionStatus,
        reason: NoOpReason,
    },
}

impl HandlePaymentWebhookResult {
    /// Short response body for the provider.
    pub fn reason(&self) -> &'static str {
        match self {
            HandlePaymentWebhookResult::Applied { .. } => "processed",
            HandlePaymentWebhookResult::Unchanged { .. } => "acknowledged",
        }
    }
}

/// Handler for processing payment provider webhooks.
pub struct HandlePaymentWebhookHandler {
    verifier: WebhookVerifier,
    normalizer: EventNormalizer,
    ledger: Arc<IdempotencyLedger>,
    machine: SubscriptionStateMachine,
}

impl HandlePaymentWebhookHandler {
    pub fn new(
        verifier: WebhookVerifier,
        normalizer: EventNormalizer,
        ledger: Arc<IdempotencyLedger>,
        machine: SubscriptionStateMachine,
    ) -> Self {
        Self {
            verifier,
            normalizer,
            ledger,
            machine,
        }
    }

    #[tracing::instrument(
        name = "payment_webhook",
        skip_all,
        fields(event_id = tracing::field::Empty, vendor_id = tracing::field::Empty)
    )]
    pub async fn handle(
        &self,
        cmd: HandlePaymentWebhookCommand,
    ) -> Result<HandlePaymentWebhookResult, WebhookError> {
        let result = self.process(&cmd).await;

        match &result {
            Ok(HandlePaymentWebhookResult::Applied { status, .. }) => {
                info!(status = status.as_str(), "subscription transitioned");
            }
            Ok(HandlePaymentWebhookResult::Unchanged { reason, .. }) => {
                info!(reason = ?reason, "event acknowledged without change");
            }
            Err(WebhookError::DuplicateEvent) => info!("duplicate delivery acknowledged"),
            Err(WebhookError::OrderingConflict) => info!("stale event acknowledged"),
            Err(err) if err.is_retryable() => error!(error = %err, "webhook processing failed"),
            Err(err) => warn!(error = %err, "webhook rejected"),
        }

        result
    }

    async fn process(
        &self,
        cmd: &HandlePaymentWebhookCommand,
    ) -> Result<HandlePaymentWebhookResult, WebhookError> {
        // 1. Nothing is read or recorded before the signature checks out
        self.verifier
            .authenticate(&cmd.payload, cmd.signature.as_deref())?;

        // 2. Normalize
        let event = self.normalizer.normalize(&cmd.payload).await?;
        let span = Span::current();
        span.record("event_id", event.event_id.as_str());
        span.record("vendor_id", event.vendor_id.as_str());

        // 3. Claim
        let claim = match self.ledger.begin_processing(&event).await? {
            BeginOutcome::Fresh(claim) => claim,
            BeginOutcome::AlreadyProcessed => return Err(WebhookError::DuplicateEvent),
            BeginOutcome::InFlight => return Err(WebhookError::EventInFlight),
        };

        // 4. Transition; a failure releases the claim so the retry runs fresh
        let applied = match claim.taken_over_from {
            Some(claimed_at) => self.machine.apply_taken_over(&event, claimed_at).await,
            None => self.machine.apply(&event).await,
        };
        let outcome = match applied {
            Ok(outcome) => outcome,
            Err(err) => {
                if let Err(release_err) = self.ledger.mark_failed(&claim).await {
                    error!(error = %release_err, "failed to release ledger claim");
                }
                return Err(err);
            }
        };

        // 5. Complete
        let (ledger_outcome, result) = Self::classify(&event, &outcome);
        if let Err(err) = self.ledger.mark_processed(&claim, ledger_outcome).await {
            // The transition is durable; startup reconciliation completes the record
            error!(error = %err, "subscription updated but ledger completion failed");
        }

        result
    }

    fn classify(
        event: &PaymentEvent,
        outcome: &ApplyOutcome,
    ) -> (LedgerOutcome, Result<HandlePaymentWebhookResult, WebhookError>) {
        match outcome {
            ApplyOutcome::Transitioned(sub) => (
                LedgerOutcome::Transitioned,
                Ok(HandlePaymentWebhookResult::Applied {
                    vendor_id: event.vendor_id.clone(),
                    status: sub.status,
                }),
            ),
            ApplyOutcome::Unchanged(sub, reason) => (
                match reason {
                    NoOpReason::Superseded => LedgerOutcome::Superseded,
                    _ => LedgerOutcome::Unchanged,
                },
                Ok(HandlePaymentWebhookResult::Unchanged {
                    vendor_id: event.vendor_id.clone(),
                    status: sub.status,
                    reason: *reason,
                }),
            ),
            ApplyOutcome::Stale(sub) => {
                warn!(
                    recorded_event_id = ?sub.last_event_id,
                    kind = event.kind.as_str(),
                    "event older than current subscription state"
                );
                (LedgerOutcome::Stale, Err(WebhookError::OrderingConflict))
            }
        }
    }
}
