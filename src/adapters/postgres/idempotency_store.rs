//! PostgreSQL implementation of IdempotencyStore.
//!
//! The `webhook_events` primary key on `event_id` makes `create_if_absent`
//! atomic across every instance sharing the database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{DomainError, ErrorCode, EventId, Timestamp, VendorId};
use crate::ports::{IdempotencyRecord, IdempotencyStore, LedgerOutcome, LedgerStatus, SaveResult};

pub struct PostgresIdempotencyStore {
    pool: PgPool,
}

impl PostgresIdempotencyStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct LedgerRow {
    event_id: String,
    vendor_id: String,
    payload_hash: String,
    claim_token: Uuid,
    status: String,
    outcome: Option<String>,
    first_seen_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<LedgerRow> for IdempotencyRecord {
    type Error = DomainError;

    fn try_from(row: LedgerRow) -> Result<Self, Self::Error> {
        let invalid = |field: &str, value: &str| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid {} value: {}", field, value),
            )
        };

        let status = LedgerStatus::parse(&row.status).ok_or_else(|| invalid("status", &row.status))?;
        let outcome = match row.outcome.as_deref() {
            Some(s) => Some(LedgerOutcome::parse(s).ok_or_else(|| invalid("outcome", s))?),
            None => None,
        };

        Ok(IdempotencyRecord {
            event_id: EventId::new(row.event_id).map_err(|e| invalid("event_id", &e.to_string()))?,
            vendor_id: VendorId::new(row.vendor_id)
                .map_err(|e| invalid("vendor_id", &e.to_string()))?,
            payload_hash: row.payload_hash,
            claim_token: row.claim_token,
            status,
            outcome,
            first_seen_at: Timestamp::from_datetime(row.first_seen_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

const SELECT_COLUMNS: &str =
    "SELECT event_id, vendor_id, payload_hash, claim_token, status, outcome, first_seen_at, updated_at \
     FROM webhook_events";

#[async_trait]
impl IdempotencyStore for PostgresIdempotencyStore {
    async fn create_if_absent(&self, record: &IdempotencyRecord) -> Result<SaveResult, DomainError> {
        let result = sqlx::query(
            r#"
            INSERT INTO webhook_events (
                event_id, vendor_id, payload_hash, claim_token, status, outcome,
                first_seen_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (event_id) DO NOTHING
            "#,
        )
        .bind(record.event_id.as_str())
        .bind(record.vendor_id.as_str())
        .bind(&record.payload_hash)
        .bind(record.claim_token)
        .bind(record.status.as_str())
        .bind(record.outcome.map(|o| o.as_str()))
        .bind(record.first_seen_at.as_datetime())
        .bind(record.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to claim event: {}", e)))?;

        if result.rows_affected() == 0 {
            Ok(SaveResult::AlreadyExists)
        } else {
            Ok(SaveResult::Inserted)
        }
    }

    async fn find(&self, event_id: &EventId) -> Result<Option<IdempotencyRecord>, DomainError> {
        let row: Option<LedgerRow> =
            sqlx::query_as(&format!("{} WHERE event_id = $1", SELECT_COLUMNS))
                .bind(event_id.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| DomainError::database(format!("Failed to find event: {}", e)))?;

        row.map(IdempotencyRecord::try_from).transpose()
    }

    async fn complete(
        &self,
        event_id: &EventId,
        claim_token: Uuid,
        outcome: LedgerOutcome,
        at: Timestamp,
    ) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE webhook_events SET
                status = 'processed',
                outcome = $3,
                updated_at = $4
            WHERE event_id = $1 AND status = 'processing' AND claim_token = $2
            "#,
        )
        .bind(event_id.as_str())
        .bind(claim_token)
        .bind(outcome.as_str())
        .bind(at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to complete event: {}", e)))?;

        if result.rows_affected() == 1 {
            return Ok(true);
        }

        // Either already processed, held by another claim, or missing
        let status: Option<String> =
            sqlx::query_scalar("SELECT status FROM webhook_events WHERE event_id = $1")
                .bind(event_id.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| DomainError::database(format!("Failed to complete event: {}", e)))?;

        match status.as_deref().map(LedgerStatus::parse) {
            Some(Some(LedgerStatus::Processed)) => Ok(true),
            Some(Some(LedgerStatus::Processing)) => Ok(false),
            Some(None) => Err(DomainError::database(format!(
                "Invalid status value for event {}",
                event_id
            ))),
            None => Err(DomainError::new(
                ErrorCode::EventNotFound,
                format!("No ledger entry for event {}", event_id),
            )),
        }
    }

    async fn remove_processing(&self, event_id: &EventId, claim_token: Uuid) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r#"
            DELETE FROM webhook_events
            WHERE event_id = $1 AND status = 'processing' AND claim_token = $2
            "#,
        )
        .bind(event_id.as_str())
        .bind(claim_token)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to release event: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }

    async fn reclaim_stale(
        &self,
        event_id: &EventId,
        older_than: Timestamp,
        now: Timestamp,
        claim_token: Uuid,
    ) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE webhook_events SET claim_token = $4, updated_at = $3
            WHERE event_id = $1 AND status = 'processing' AND updated_at < $2
            "#,
        )
        .bind(event_id.as_str())
        .bind(older_than.as_datetime())
        .bind(now.as_datetime())
        .bind(claim_token)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to reclaim event: {}", e)))?;

        Ok(result.rows_affected() == 1)
    }

    async fn list_processing(&self, older_than: Timestamp) -> Result<Vec<IdempotencyRecord>, DomainError> {
        let rows: Vec<LedgerRow> = sqlx::query_as(&format!(
            "{} WHERE status = 'processing' AND updated_at < $1 ORDER BY first_seen_at",
            SELECT_COLUMNS
        ))
        .bind(older_than.as_datetime())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to list pending events: {}", e)))?;

        rows.into_iter().map(IdempotencyRecord::try_from).collect()
    }
}
