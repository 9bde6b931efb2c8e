//! Applies normalized payment events to vendor subscriptions.

use std::sync::Arc;

use crate::domain::foundation::Timestamp;
use crate::ports::{SubscriptionStore, WriteResult};

use super::{Decision, NoOpReason, PaymentEvent, VendorSubscription, WebhookError};

/// Conditional write attempts before reporting a storage failure.
const MAX_WRITE_ATTEMPTS: usize = 5;

/// What `apply` did to the vendor's subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// New state was written (possibly with the same status).
    Transitioned(VendorSubscription),
    /// Nothing was written.
    Unchanged(VendorSubscription, NoOpReason),
    /// Event is older than the one behind the current state; ignored.
    Stale(VendorSubscription),
}

impl ApplyOutcome {
    pub fn subscription(&self) -> &VendorSubscription {
        match self {
            ApplyOutcome::Transitioned(sub)
            | ApplyOutcome::Unchanged(sub, _)
            | ApplyOutcome::Stale(sub) => sub,
        }
    }
}

pub struct SubscriptionStateMachine {
    store: Arc<dyn SubscriptionStore>,
}

impl SubscriptionStateMachine {
    pub fn new(store: Arc<dyn SubscriptionStore>) -> Self {
        Self { store }
    }

    /// Applies `event` to its vendor's subscription.
    ///
    /// Writes are conditional on the `last_event_id` that was read, so a
    /// concurrent writer for the same vendor forces a re-read and a fresh
    /// decision.
    ///
    /// # Errors
    ///
    /// `TransientStorageFailure` if the store fails or the write keeps
    /// conflicting.
    pub async fn apply(&self, event: &PaymentEvent) -> Result<ApplyOutcome, WebhookError> {
        self.apply_since(event, None).await
    }

    /// Applies `event` on behalf of a delivery that took over a claim first
    /// taken at `abandoned_claim_at`.
    ///
    /// The abandoned delivery may already have applied the event. If the
    /// vendor has been written since that claim by any other event, the
    /// event is reported as `Unchanged(Superseded)` instead of being applied
    /// on top of the newer state.
    pub async fn apply_taken_over(
        &self,
        event: &PaymentEvent,
        abandoned_claim_at: Timestamp,
    ) -> Result<ApplyOutcome, WebhookError> {
        self.apply_since(event, Some(abandoned_claim_at)).await
    }

    async fn apply_since(
        &self,
        event: &PaymentEvent,
        abandoned_claim_at: Option<Timestamp>,
    ) -> Result<ApplyOutcome, WebhookError> {
        for _ in 0..MAX_WRITE_ATTEMPTS {
            let current = self
                .store
                .read(&event.vendor_id)
                .await?
                .unwrap_or_else(|| VendorSubscription::inactive(event.vendor_id.clone()));

            if let Some(claimed_at) = abandoned_claim_at {
                if current.last_event_id.as_ref() != Some(&event.event_id)
                    && current.written_since(claimed_at)
                {
                    return Ok(ApplyOutcome::Unchanged(current, NoOpReason::Superseded));
                }
            }

            let next = match current.decide(event, Timestamp::now()) {
                Decision::Transition(next) => next,
                Decision::NoOp(reason) => return Ok(ApplyOutcome::Unchanged(current, reason)),
                Decision::Stale { .. } => return Ok(ApplyOutcome::Stale(current)),
            };

            let expected = current.last_event_id.as_ref();
            match self
                .store
                .conditional_write(&event.vendor_id, expected, &next)
                .await?
            {
                WriteResult::Applied => return Ok(ApplyOutcome::Transitioned(next)),
                WriteResult::Conflict => continue,
            }
        }

        Err(WebhookError::TransientStorageFailure(format!(
            "subscription write for vendor {} kept conflicting",
            event.vendor_id
        )))
    }
}
