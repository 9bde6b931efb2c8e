//! VendorSubscription aggregate.
//!
//! One record per vendor. It is only ever replaced as a whole through
//! `SubscriptionStore::conditional_write`, so `status`, `last_event_id`,
//! `last_event_at` and `last_transition_at` always change together.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{EventId, Timestamp, VendorId};

use super::{PaymentEvent, SubscriptionStatus};

/// Subscription state of a single vendor.
///
/// # Invariants
///
/// - `last_event_id` is the event that produced `status` (`None` only for a
///   vendor that has never had an event applied)
/// - `last_event_at` is the latest provider time among applied events; an
///   untimed event keeps the time recorded before it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorSubscription {
    pub vendor_id: VendorId,
    pub status: SubscriptionStatus,
    pub last_transition_at: Option<Timestamp>,
    pub last_event_id: Option<EventId>,
    pub last_event_at: Option<Timestamp>,
}

/// Why an event left the subscription untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoOpReason {
    /// Event kind is not acted on.
    UnknownKind,
    /// Subscription is cancelled.
    Terminal,
    /// The event already produced the current state.
    AlreadyApplied,
    /// An earlier, unfinished delivery of the event may have been applied
    /// before the vendor was written again.
    Superseded,
}

/// Outcome of evaluating an event against the current subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Replace the stored subscription with this one.
    Transition(VendorSubscription),
    /// Leave the subscription as is.
    NoOp(NoOpReason),
    /// The event is older than the one that produced the current state.
    Stale {
        recorded_event_id: Option<EventId>,
    },
}

impl VendorSubscription {
    /// Initial subscription for a vendor that has no stored record.
    pub fn inactive(vendor_id: VendorId) -> Self {
        Self {
            vendor_id,
            status: SubscriptionStatus::Inactive,
            last_transition_at: None,
            last_event_id: None,
            last_event_at: None,
        }
    }

    /// Returns true if a transition was recorded at or after `at`.
    pub fn written_since(&self, at: Timestamp) -> bool {
        self.last_transition_at
            .is_some_and(|written| !written.is_before(&at))
    }

    /// Returns true if `event` is known to be older than the event that
    /// produced the current state.
    ///
    /// Ordering is only derivable when both sides carry a provider timestamp
    /// and the timestamps differ. Equal or missing timestamps fall back to
    /// arrival order.
    pub fn is_stale(&self, event: &PaymentEvent) -> bool {
        match (event.occurred_at, self.last_event_at) {
            (Some(incoming), Some(recorded)) => incoming.is_before(&recorded),
            _ => false,
        }
    }

    /// Evaluates `event` against this subscription without side effects.
    pub fn decide(&self, event: &PaymentEvent, now: Timestamp) -> Decision {
        if self.last_event_id.as_ref() == Some(&event.event_id) {
            return Decision::NoOp(NoOpReason::AlreadyApplied);
        }

        if self.is_stale(event) {
            return Decision::Stale {
                recorded_event_id: self.last_event_id.clone(),
            };
        }

        match self.status.next(event.kind) {
            Some(status) => Decision::Transition(VendorSubscription {
                vendor_id: self.vendor_id.clone(),
                status,
                last_transition_at: Some(now),
                last_event_id: Some(event.event_id.clone()),
                last_event_at: event.occurred_at.or(self.last_event_at),
            }),
            None if self.status == SubscriptionStatus::Cancelled => {
                Decision::NoOp(NoOpReason::Terminal)
            }
            None => Decision::NoOp(NoOpReason::UnknownKind),
        }
    }
}
