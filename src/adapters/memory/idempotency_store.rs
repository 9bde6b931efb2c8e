//! In-memory idempotency ledger storage.
//!
//! A single `tokio::sync::Mutex` guards the map, so every operation is atomic
//! with respect to every other. Entries do not survive a restart.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::foundation::{DomainError, ErrorCode, EventId, Timestamp};
use crate::ports::{IdempotencyRecord, IdempotencyStore, LedgerOutcome, LedgerStatus, SaveResult};

#[derive(Default)]
pub struct InMemoryIdempotencyStore {
    records: Mutex<HashMap<EventId, IdempotencyRecord>>,
}

impl InMemoryIdempotencyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries, in any status.
    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }
}

#[async_trait]
impl IdempotencyStore for InMemoryIdempotencyStore {
    async fn create_if_absent(&self, record: &IdempotencyRecord) -> Result<SaveResult, DomainError> {
        let mut records = self.records.lock().await;
        if records.contains_key(&record.event_id) {
            return Ok(SaveResult::AlreadyExists);
        }
        records.insert(record.event_id.clone(), record.clone());
        Ok(SaveResult::Inserted)
    }

    async fn find(&self, event_id: &EventId) -> Result<Option<IdempotencyRecord>, DomainError> {
        Ok(self.records.lock().await.get(event_id).cloned())
    }

    async fn complete(
        &self,
        event_id: &EventId,
        claim_token: Uuid,
        outcome: LedgerOutcome,
        at: Timestamp,
    ) -> Result<bool, DomainError> {
        let mut records = self.records.lock().await;
        let record = records.get_mut(event_id).ok_or_else(|| {
            DomainError::new(
                ErrorCode::EventNotFound,
                format!("No ledger entry for event {}", event_id),
            )
        })?;

        match record.status {
            LedgerStatus::Processed => Ok(true),
            LedgerStatus::Processing if record.claim_token == claim_token => {
                record.status = LedgerStatus::Processed;
                record.outcome = Some(outcome);
                record.updated_at = at;
                Ok(true)
            }
            LedgerStatus::Processing => Ok(false),
        }
    }

    async fn remove_processing(&self, event_id: &EventId, claim_token: Uuid) -> Result<bool, DomainError> {
        let mut records = self.records.lock().await;
        match records.get(event_id) {
            Some(record)
                if record.status == LedgerStatus::Processing
                    && record.claim_token == claim_token =>
            {
                records.remove(event_id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn reclaim_stale(
        &self,
        event_id: &EventId,
        older_than: Timestamp,
        now: Timestamp,
        claim_token: Uuid,
    ) -> Result<bool, DomainError> {
        let mut records = self.records.lock().await;
        match records.get_mut(event_id) {
            Some(record)
                if record.status == LedgerStatus::Processing
                    && record.updated_at.is_before(&older_than) =>
            {
                record.claim_token = claim_token;
                record.updated_at = now;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_processing(&self, older_than: Timestamp) -> Result<Vec<IdempotencyRecord>, DomainError> {
        Ok(self
            .records
            .lock()
            .await
            .values()
            .filter(|r| r.status == LedgerStatus::Processing && r.updated_at.is_before(&older_than))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::VendorId;

    fn record(id: &str, at: Timestamp) -> IdempotencyRecord {
        IdempotencyRecord::processing(
            EventId::new(id).unwrap(),
            VendorId::new("V1").unwrap(),
            "hash",
            at,
        )
    }

    fn later() -> Timestamp {
        Timestamp::from_datetime(*Timestamp::now().as_datetime() + chrono::Duration::seconds(1))
    }

    #[tokio::test]
    async fn second_create_reports_existing() {
        let store = InMemoryIdempotencyStore::new();
        let r = record("e1", Timestamp::now());

        assert_eq!(store.create_if_absent(&r).await.unwrap(), SaveResult::Inserted);
        assert_eq!(store.create_if_absent(&r).await.unwrap(), SaveResult::AlreadyExists);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn complete_keeps_first_outcome() {
        let store = InMemoryIdempotencyStore::new();
        let r = record("e1", Timestamp::now());
        store.create_if_absent(&r).await.unwrap();

        assert!(store
            .complete(&r.event_id, r.claim_token, LedgerOutcome::Transitioned, Timestamp::now())
            .await
            .unwrap());
        assert!(store
            .complete(&r.event_id, r.claim_token, LedgerOutcome::Stale, Timestamp::now())
            .await
            .unwrap());

        let found = store.find(&r.event_id).await.unwrap().unwrap();
        assert_eq!(found.status, LedgerStatus::Processed);
        assert_eq!(found.outcome, Some(LedgerOutcome::Transitioned));
    }

    #[tokio::test]
    async fn complete_unknown_event_fails() {
        let store = InMemoryIdempotencyStore::new();

        let result = store
            .complete(
                &EventId::new("nope").unwrap(),
                Uuid::new_v4(),
                LedgerOutcome::Unchanged,
                Timestamp::now(),
            )
            .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn processed_entries_are_never_removed() {
        let store = InMemoryIdempotencyStore::new();
        let r = record("e1", Timestamp::now());
        store.create_if_absent(&r).await.unwrap();
        store
            .complete(&r.event_id, r.claim_token, LedgerOutcome::Transitioned, Timestamp::now())
            .await
            .unwrap();

        assert!(!store.remove_processing(&r.event_id, r.claim_token).await.unwrap());
        assert!(store.find(&r.event_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn only_expired_claims_are_reclaimed() {
        let store = InMemoryIdempotencyStore::new();
        let now = Timestamp::now();
        let cutoff = now.minus_secs(60);
        store.create_if_absent(&record("old", now.minus_secs(120))).await.unwrap();
        store.create_if_absent(&record("new", now)).await.unwrap();

        let old = EventId::new("old").unwrap();
        assert!(store.reclaim_stale(&old, cutoff, now, Uuid::new_v4()).await.unwrap());
        assert!(!store.reclaim_stale(&old, cutoff, now, Uuid::new_v4()).await.unwrap());
        assert!(!store
            .reclaim_stale(&EventId::new("new").unwrap(), cutoff, now, Uuid::new_v4())
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn previous_holder_cannot_touch_a_reclaimed_claim() {
        let store = InMemoryIdempotencyStore::new();
        let now = Timestamp::now();
        let abandoned = record("e1", now.minus_secs(120));
        store.create_if_absent(&abandoned).await.unwrap();
        let successor = Uuid::new_v4();
        store
            .reclaim_stale(&abandoned.event_id, now.minus_secs(60), now, successor)
            .await
            .unwrap();

        assert!(!store
            .remove_processing(&abandoned.event_id, abandoned.claim_token)
            .await
            .unwrap());
        assert!(!store
            .complete(&abandoned.event_id, abandoned.claim_token, LedgerOutcome::Unchanged, now)
            .await
            .unwrap());

        let found = store.find(&abandoned.event_id).await.unwrap().unwrap();
        assert_eq!(found.status, LedgerStatus::Processing);
        assert_eq!(found.claim_token, successor);
        assert!(store.remove_processing(&abandoned.event_id, successor).await.unwrap());
    }

    #[tokio::test]
    async fn list_processing_skips_completed_and_live_claims() {
        let store = InMemoryIdempotencyStore::new();
        let now = Timestamp::now();
        let done = record("e1", now.minus_secs(120));
        store.create_if_absent(&done).await.unwrap();
        store.create_if_absent(&record("e2", now.minus_secs(120))).await.unwrap();
        store.create_if_absent(&record("e3", now)).await.unwrap();
        store
            .complete(&done.event_id, done.claim_token, LedgerOutcome::Unchanged, now)
            .await
            .unwrap();

        let expired = store.list_processing(now.minus_secs(60)).await.unwrap();
        let all = store.list_processing(later()).await.unwrap();

        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].event_id.as_str(), "e2");
        assert_eq!(all.len(), 2);
    }
}
