//! Provider-agnostic payment event.
//!
//! A `PaymentEvent` is created once per inbound webhook by the normalizer,
//! consumed by the ledger and the subscription state machine, then dropped.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::domain::foundation::{EventId, Timestamp, VendorId};

/// Classification of a provider notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentEventKind {
    /// A subscription payment went through.
    PaymentCaptured,
    /// A subscription payment was declined or could not be collected.
    PaymentFailed,
    /// The provider ended the subscription.
    SubscriptionCancelled,
    /// Any provider event this service does not act on.
    Unknown,
}

impl PaymentEventKind {
    /// Classifies a provider event type string.
    pub fn from_provider_type(s: &str) -> Self {
        match s {
            "invoice.payment_succeeded"
            | "invoice.paid"
            | "checkout.session.completed"
            | "payment_intent.succeeded" => Self::PaymentCaptured,
            "invoice.payment_failed" | "payment_intent.payment_failed" => Self::PaymentFailed,
            "customer.subscription.deleted" => Self::SubscriptionCancelled,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PaymentCaptured => "payment_captured",
            Self::PaymentFailed => "payment_failed",
            Self::SubscriptionCancelled => "subscription_cancelled",
            Self::Unknown => "unknown",
        }
    }
}

/// Normalized payment notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentEvent {
    /// Provider-assigned id, the idempotency key.
    pub event_id: EventId,
    /// Vendor the notification refers to. Known to exist at creation time.
    pub vendor_id: VendorId,
    pub kind: PaymentEventKind,
    /// Raw provider type, kept for logs.
    pub provider_type: String,
    /// Hex SHA-256 of the exact raw body.
    pub raw_payload_hash: String,
    /// Provider creation time, when the payload carries one.
    pub occurred_at: Option<Timestamp>,
    pub received_at: Timestamp,
}

/// Hex-encoded SHA-256 digest of a raw webhook body.
pub fn payload_hash(raw_body: &[u8]) -> String {
    hex::encode(Sha256::digest(raw_body))
}
