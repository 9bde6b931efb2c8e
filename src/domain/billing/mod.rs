//! Billing domain module.
//!
//! Payment webhook ingestion and vendor subscription activation.
//!
//! # Module Structure
//!
//! - `webhook_verifier` - HMAC-SHA256 signature check over the raw body
//! - `event_normalizer` - Provider payload to `PaymentEvent`
//! - `idempotency_ledger` - At-most-once claim per provider event
//! - `status` - SubscriptionStatus state machine
//! - `subscription` - VendorSubscription aggregate and transition decisions
//! - `subscription_machine` - Conditional persistence of transitions
//! - `webhook_errors` - Pipeline errors and their HTTP mapping

mod event_normalizer;
mod idempotency_ledger;
mod payment_event;
mod status;
mod subscription;
mod subscription_machine;
mod webhook_errors;
mod webhook_verifier;

pub use event_normalizer::EventNormalizer;
pub use idempotency_ledger::{BeginOutcome, Claim, IdempotencyLedger, ReconcileReport};
pub use payment_event::{payload_hash, PaymentEvent, PaymentEventKind};
pub use status::SubscriptionStatus;
pub use subscription::{Decision, NoOpReason, VendorSubscription};
pub use subscription_machine::{ApplyOutcome, SubscriptionStateMachine};
pub use webhook_errors::WebhookError;
pub use webhook_verifier::{sign, verify, WebhookVerifier};
