//! Idempotency ledger - Guarantees each provider event is applied at most once.
//!
//! ## Race Condition Handling
//!
//! When multiple deliveries of one event arrive simultaneously:
//! - First to `create_if_absent` wins (PRIMARY KEY on `event_id`)
//! - Others see the existing record and get `AlreadyProcessed` or `InFlight`
//!
//! A `Processing` record whose lease has expired (the owning call died
//! between claiming and completing) can be taken over by exactly one later
//! delivery. Takeover hands the record a new claim token, so the previous
//! holder can no longer complete or release it. The new holder applies the
//! event through `SubscriptionStateMachine::apply_taken_over`, which refuses
//! to apply it over a vendor written since the original claim.

use std::sync::Arc;

use tracing::warn;
use uuid::Uuid;

use crate::domain::foundation::{EventId, Timestamp};
use crate::ports::{IdempotencyRecord, IdempotencyStore, LedgerOutcome, SaveResult, SubscriptionStore};

use super::{PaymentEvent, WebhookError};

/// Attempts made to record completion before giving up.
const MARK_PROCESSED_ATTEMPTS: usize = 3;

/// A delivery's hold on an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claim {
    pub event_id: EventId,
    pub token: Uuid,
    /// When the abandoned claim this one took over was first taken.
    pub taken_over_from: Option<Timestamp>,
}

/// Result of claiming an event for processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BeginOutcome {
    /// This call owns the event and must apply it.
    Fresh(Claim),
    /// The event was fully handled before.
    AlreadyProcessed,
    /// Another call holds a live claim on the event.
    InFlight,
}

/// Summary of a startup reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Claims whose event produced the vendor's current state.
    pub completed: usize,
    /// Claims whose vendor was written after the claim was taken.
    pub superseded: usize,
    /// Claims with no applied transition; removed so retries run fresh.
    pub released: usize,
}

pub struct IdempotencyLedger {
    store: Arc<dyn IdempotencyStore>,
    processing_timeout_secs: u64,
}

impl IdempotencyLedger {
    pub fn new(store: Arc<dyn IdempotencyStore>, processing_timeout_secs: u64) -> Self {
        Self {
            store,
            processing_timeout_secs,
        }
    }

    fn lease_cutoff(&self, now: Timestamp) -> Timestamp {
        now.minus_secs(self.processing_timeout_secs)
    }

    /// Claims `event` for processing.
    ///
    /// # Errors
    ///
    /// - `MalformedPayload` if the event id was first seen with a different body
    /// - `TransientStorageFailure` if the store is unreachable
    pub async fn begin_processing(&self, event: &PaymentEvent) -> Result<BeginOutcome, WebhookError> {
        let now = Timestamp::now();
        let record = IdempotencyRecord::processing(
            event.event_id.clone(),
            event.vendor_id.clone(),
            event.raw_payload_hash.clone(),
            now,
        );

        if self.store.create_if_absent(&record).await? == SaveResult::Inserted {
            return Ok(BeginOutcome::Fresh(Claim {
                event_id: record.event_id,
                token: record.claim_token,
                taken_over_from: None,
            }));
        }

        // Removed by a failing owner between our insert and read
        let Some(existing) = self.store.find(&event.event_id).await? else {
            return Ok(BeginOutcome::InFlight);
        };

        if existing.payload_hash != event.raw_payload_hash {
            return Err(WebhookError::MalformedPayload(
                "event id reused with a different payload".to_string(),
            ));
        }

        if existing.is_processed() {
            return Ok(BeginOutcome::AlreadyProcessed);
        }

        let cutoff = self.lease_cutoff(now);
        let token = Uuid::new_v4();
        if existing.updated_at.is_before(&cutoff)
            && self
                .store
                .reclaim_stale(&event.event_id, cutoff, now, token)
                .await?
        {
            warn!(
                first_seen_at = %existing.first_seen_at.as_datetime(),
                "taking over abandoned claim"
            );
            return Ok(BeginOutcome::Fresh(Claim {
                event_id: existing.event_id,
                token,
                taken_over_from: Some(existing.first_seen_at),
            }));
        }

        Ok(BeginOutcome::InFlight)
    }

    /// Records that the claimed event's side effect is durable.
    ///
    /// Retries transient store failures a bounded number of times and
    /// returns the last error if none succeeds. A claim taken over by a later
    /// delivery is left to that delivery.
    pub async fn mark_processed(&self, claim: &Claim, outcome: LedgerOutcome) -> Result<(), WebhookError> {
        let mut attempt = 1;
        loop {
            match self
                .store
                .complete(&claim.event_id, claim.token, outcome, Timestamp::now())
                .await
            {
                Ok(true) => return Ok(()),
                Ok(false) => {
                    warn!("claim taken over before completion; leaving it to the new holder");
                    return Ok(());
                }
                Err(err) if attempt >= MARK_PROCESSED_ATTEMPTS => return Err(err.into()),
                Err(_) => attempt += 1,
            }
        }
    }

    /// Releases the claim so the provider's retry is processed fresh.
    ///
    /// Does nothing if the claim has been taken over.
    pub async fn mark_failed(&self, claim: &Claim) -> Result<(), WebhookError> {
        self.store.remove_processing(&claim.event_id, claim.token).await?;
        Ok(())
    }

    /// Resolves claims left `Processing` past the lease timeout.
    ///
    /// Live claims held by other instances are not touched. For an expired
    /// claim:
    /// - the vendor's `last_event_id` is the claimed event: completed as
    ///   `Reconciled`
    /// - the vendor was written after the claim was first taken: completed
    ///   as `Superseded`, since the event may already have been applied
    /// - otherwise the claim is released
    pub async fn reconcile(
        &self,
        subscriptions: &dyn SubscriptionStore,
    ) -> Result<ReconcileReport, WebhookError> {
        let now = Timestamp::now();
        let mut report = ReconcileReport::default();

        for record in self.store.list_processing(self.lease_cutoff(now)).await? {
            let resolution = match subscriptions.read(&record.vendor_id).await? {
                Some(sub) if sub.last_event_id.as_ref() == Some(&record.event_id) => {
                    Some(LedgerOutcome::Reconciled)
                }
                Some(sub) if sub.written_since(record.first_seen_at) => {
                    Some(LedgerOutcome::Superseded)
                }
                _ => None,
            };

            match resolution {
                Some(outcome) => {
                    let completed = self
                        .store
                        .complete(&record.event_id, record.claim_token, outcome, now)
                        .await?;
                    match (completed, outcome) {
                        (false, _) => {}
                        (true, LedgerOutcome::Superseded) => report.superseded += 1,
                        (true, _) => report.completed += 1,
                    }
                }
                None => {
                    if self
                        .store
                        .remove_processing(&record.event_id, record.claim_token)
                        .await?
                    {
                        report.released += 1;
                    }
                }
            }
        }

        Ok(report)
    }
}
