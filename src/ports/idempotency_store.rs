//! IdempotencyStore port - Interface for tracking processed payment events.
//!
//! This port enables idempotent webhook handling by recording which provider
//! event ids have been seen and how far their processing got.
//!
//! ## Why Webhook Idempotency Matters
//!
//! Payment providers deliver the same notification more than once:
//! - Network timeouts
//! - 5xx response from our endpoint (triggers retry)
//! - Our endpoint returning success but the provider not receiving it
//!
//! `create_if_absent` is the only synchronization point of the pipeline, so
//! implementations must make it atomic across processes (PRIMARY KEY on
//! `event_id`, `ON CONFLICT DO NOTHING`).

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::foundation::{DomainError, EventId, Timestamp, VendorId};

/// Processing state of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerStatus {
    /// A delivery claimed the event and has not finished yet.
    Processing,
    /// The subscription side effect has been durably applied (or skipped).
    Processed,
}

impl LedgerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerStatus::Processing => "processing",
            LedgerStatus::Processed => "processed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "processing" => Some(LedgerStatus::Processing),
            "processed" => Some(LedgerStatus::Processed),
            _ => None,
        }
    }
}

/// What processing an event did to the vendor's subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerOutcome {
    /// A new subscription state was written.
    Transitioned,
    /// The event was accepted but changed nothing.
    Unchanged,
    /// The event was older than the recorded state and was ignored.
    Stale,
    /// An unfinished claim whose vendor was written after it was taken.
    Superseded,
    /// Recovered on startup from the subscription record.
    Reconciled,
}

impl LedgerOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerOutcome::Transitioned => "transitioned",
            LedgerOutcome::Unchanged => "unchanged",
            LedgerOutcome::Stale => "stale",
            LedgerOutcome::Superseded => "superseded",
            LedgerOutcome::Reconciled => "reconciled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "transitioned" => Some(LedgerOutcome::Transitioned),
            "unchanged" => Some(LedgerOutcome::Unchanged),
            "stale" => Some(LedgerOutcome::Stale),
            "superseded" => Some(LedgerOutcome::Superseded),
            "reconciled" => Some(LedgerOutcome::Reconciled),
            _ => None,
        }
    }
}

/// Ledger entry for one provider event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdempotencyRecord {
    pub event_id: EventId,

    /// Vendor the event targets, needed for startup reconciliation.
    pub vendor_id: VendorId,

    /// Hash of the body that first claimed this event id.
    pub payload_hash: String,

    /// Identifies the delivery currently holding the claim. Replaced when an
    /// expired claim is taken over.
    pub claim_token: Uuid,

    pub status: LedgerStatus,

    /// Set once the record is `Processed`.
    pub outcome: Option<LedgerOutcome>,

    pub first_seen_at: Timestamp,

    /// Last time the record was claimed or completed. Drives lease expiry.
    pub updated_at: Timestamp,
}

impl IdempotencyRecord {
    /// Creates a fresh `Processing` record with a new claim token.
    pub fn processing(
        event_id: EventId,
        vendor_id: VendorId,
        payload_hash: impl Into<String>,
        now: Timestamp,
    ) -> Self {
        Self {
            event_id,
            vendor_id,
            payload_hash: payload_hash.into(),
            claim_token: Uuid::new_v4(),
            status: LedgerStatus::Processing,
            outcome: None,
            first_seen_at: now,
            updated_at: now,
        }
    }

    pub fn is_processed(&self) -> bool {
        self.status == LedgerStatus::Processed
    }
}

/// Result of attempting to create a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveResult {
    /// Record was inserted (first time seeing this event).
    Inserted,
    /// Record already exists (duplicate or concurrent delivery).
    AlreadyExists,
}

/// Port for the idempotency ledger's storage.
#[async_trait]
pub trait IdempotencyStore: Send + Sync {
    /// Atomically inserts `record` unless an entry for its event id exists.
    async fn create_if_absent(&self, record: &IdempotencyRecord) -> Result<SaveResult, DomainError>;

    /// Finds the entry for an event id.
    async fn find(&self, event_id: &EventId) -> Result<Option<IdempotencyRecord>, DomainError>;

    /// Marks an entry `Processed` with the given outcome, provided it is
    /// still held by `claim_token`.
    ///
    /// Returns false when another delivery has taken the claim over.
    /// Completing an already processed entry is a no-op that keeps its first
    /// outcome and returns true.
    async fn complete(
        &self,
        event_id: &EventId,
        claim_token: Uuid,
        outcome: LedgerOutcome,
        at: Timestamp,
    ) -> Result<bool, DomainError>;

    /// Deletes the entry if it is still `Processing` and held by
    /// `claim_token`.
    ///
    /// Returns true if an entry was removed.
    async fn remove_processing(&self, event_id: &EventId, claim_token: Uuid) -> Result<bool, DomainError>;

    /// Atomically re-claims a `Processing` entry last updated before
    /// `older_than`, handing it to `claim_token` and bumping its
    /// `updated_at` to `now`.
    ///
    /// Returns true for exactly one caller per expired lease.
    async fn reclaim_stale(
        &self,
        event_id: &EventId,
        older_than: Timestamp,
        now: Timestamp,
        claim_token: Uuid,
    ) -> Result<bool, DomainError>;

    /// Lists entries still `Processing` whose `updated_at` is before
    /// `older_than`.
    async fn list_processing(&self, older_than: Timestamp) -> Result<Vec<IdempotencyRecord>, DomainError>;
}
