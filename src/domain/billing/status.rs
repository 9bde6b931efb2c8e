//! Vendor subscription status state machine.
//!
//! Defines all subscription states and the transition table driven by
//! payment events.

use crate::domain::foundation::StateMachine;
use serde::{Deserialize, Serialize};

use super::PaymentEventKind;

/// Vendor subscription status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// Initial state for a new vendor. No paid listing.
    #[default]
    Inactive,

    /// Payment captured, vendor listing is live.
    Active,

    /// Latest payment failed after the subscription was active.
    PastDue,

    /// Subscription ended. Terminal.
    Cancelled,
}

impl SubscriptionStatus {
    /// Returns the status reached by applying an event of `kind`.
    ///
    /// Returns `None` when the event does not affect this status: unknown
    /// events, and anything arriving after cancellation. Targets are checked
    /// against the allowed transitions.
    pub fn next(&self, kind: PaymentEventKind) -> Option<SubscriptionStatus> {
        use PaymentEventKind as K;
        use SubscriptionStatus::*;

        if self.is_terminal() {
            return None;
        }

        let target = match (kind, self) {
            (K::PaymentCaptured, _) => Active,
            (K::PaymentFailed, Inactive) => Inactive,
            (K::PaymentFailed, _) => PastDue,
            (K::SubscriptionCancelled, _) => Cancelled,
            (K::Unknown, _) => return None,
        };

        self.transition_to(target).ok()
    }

    /// Stable storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Inactive => "inactive",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::PastDue => "past_due",
            SubscriptionStatus::Cancelled => "cancelled",
        }
    }

    /// Parses the storage representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "inactive" => Some(SubscriptionStatus::Inactive),
            "active" => Some(SubscriptionStatus::Active),
            "past_due" => Some(SubscriptionStatus::PastDue),
            "cancelled" => Some(SubscriptionStatus::Cancelled),
            _ => None,
        }
    }
}

impl StateMachine for SubscriptionStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use SubscriptionStatus::*;
        matches!(
            (self, target),
            // From INACTIVE
            (Inactive, Inactive)
                | (Inactive, Active)
                | (Inactive, Cancelled)
            // From ACTIVE
                | (Active, Active)
                | (Active, PastDue)
                | (Active, Cancelled)
            // From PAST_DUE
                | (PastDue, PastDue)
                | (PastDue, Active)
                | (PastDue, Cancelled)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use SubscriptionStatus::*;
        match self {
            Inactive => vec![Inactive, Active, Cancelled],
            Active => vec![Active, PastDue, Cancelled],
            PastDue => vec![PastDue, Active, Cancelled],
            Cancelled => vec![],
        }
    }
}
