//! PostgreSQL implementation of SubscriptionStore.
//!
//! Every write is conditional on the `last_event_id` the caller read, so two
//! processes racing on the same vendor cannot both succeed.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::billing::{SubscriptionStatus, VendorSubscription};
use crate::domain::foundation::{DomainError, ErrorCode, EventId, Timestamp, VendorId};
use crate::ports::{SubscriptionStore, WriteResult};

pub struct PostgresSubscriptionStore {
    pool: PgPool,
}

impl PostgresSubscriptionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a vendor subscription.
#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    vendor_id: String,
    status: String,
    last_transition_at: Option<DateTime<Utc>>,
    last_event_id: Option<String>,
    last_event_at: Option<DateTime<Utc>>,
}

impl TryFrom<SubscriptionRow> for VendorSubscription {
    type Error = DomainError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        let status = SubscriptionStatus::parse(&row.status).ok_or_else(|| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid status value: {}", row.status),
            )
        })?;

        let vendor_id = VendorId::new(row.vendor_id).map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Invalid vendor_id: {}", e))
        })?;

        let last_event_id = row
            .last_event_id
            .map(EventId::new)
            .transpose()
            .map_err(|e| {
                DomainError::new(ErrorCode::DatabaseError, format!("Invalid last_event_id: {}", e))
            })?;

        Ok(VendorSubscription {
            vendor_id,
            status,
            last_transition_at: row.last_transition_at.map(Timestamp::from_datetime),
            last_event_id,
            last_event_at: row.last_event_at.map(Timestamp::from_datetime),
        })
    }
}

fn to_datetime(ts: Option<Timestamp>) -> Option<DateTime<Utc>> {
    ts.map(|t| *t.as_datetime())
}

#[async_trait]
impl SubscriptionStore for PostgresSubscriptionStore {
    async fn read(&self, vendor_id: &VendorId) -> Result<Option<VendorSubscription>, DomainError> {
        let row: Option<SubscriptionRow> = sqlx::query_as(
            r#"
            SELECT vendor_id, status, last_transition_at, last_event_id, last_event_at
            FROM vendor_subscriptions
            WHERE vendor_id = $1
            "#,
        )
        .bind(vendor_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to read subscription: {}", e)))?;

        row.map(VendorSubscription::try_from).transpose()
    }

    async fn conditional_write(
        &self,
        vendor_id: &VendorId,
        expected_last_event_id: Option<&EventId>,
        new_state: &VendorSubscription,
    ) -> Result<WriteResult, DomainError> {
        let result = match expected_last_event_id {
            // No row yet, or a row seeded without any applied event
            None => sqlx::query(
                r#"
                INSERT INTO vendor_subscriptions (
                    vendor_id, status, last_transition_at, last_event_id, last_event_at, updated_at
                ) VALUES ($1, $2, $3, $4, $5, NOW())
                ON CONFLICT (vendor_id) DO UPDATE SET
                    status = EXCLUDED.status,
                    last_transition_at = EXCLUDED.last_transition_at,
                    last_event_id = EXCLUDED.last_event_id,
                    last_event_at = EXCLUDED.last_event_at,
                    updated_at = EXCLUDED.updated_at
                WHERE vendor_subscriptions.last_event_id IS NULL
                "#,
            )
            .bind(vendor_id.as_str())
            .bind(new_state.status.as_str())
            .bind(to_datetime(new_state.last_transition_at))
            .bind(new_state.last_event_id.as_ref().map(|id| id.as_str()))
            .bind(to_datetime(new_state.last_event_at))
            .execute(&self.pool)
            .await,

            Some(expected) => sqlx::query(
                r#"
                UPDATE vendor_subscriptions SET
                    status = $2,
                    last_transition_at = $3,
                    last_event_id = $4,
                    last_event_at = $5,
                    updated_at = NOW()
                WHERE vendor_id = $1 AND last_event_id = $6
                "#,
            )
            .bind(vendor_id.as_str())
            .bind(new_state.status.as_str())
            .bind(to_datetime(new_state.last_transition_at))
            .bind(new_state.last_event_id.as_ref().map(|id| id.as_str()))
            .bind(to_datetime(new_state.last_event_at))
            .bind(expected.as_str())
            .execute(&self.pool)
            .await,
        }
        .map_err(|e| DomainError::database(format!("Failed to write subscription: {}", e)))?;

        if result.rows_affected() == 0 {
            return Ok(WriteResult::Conflict);
        }

        Ok(WriteResult::Applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(status: &str, last_event_id: Option<&str>) -> SubscriptionRow {
        SubscriptionRow {
            vendor_id: "V1".to_string(),
            status: status.to_string(),
            last_transition_at: Some(Utc::now()),
            last_event_id: last_event_id.map(str::to_string),
            last_event_at: None,
        }
    }

    #[test]
    fn row_converts_to_subscription() {
        let sub = VendorSubscription::try_from(row("past_due", Some("e2"))).unwrap();

        assert_eq!(sub.vendor_id.as_str(), "V1");
        assert_eq!(sub.status, SubscriptionStatus::PastDue);
        assert_eq!(sub.last_event_id, Some(EventId::new("e2").unwrap()));
        assert!(sub.last_event_at.is_none());
    }

    #[test]
    fn unknown_status_is_a_database_error() {
        let err = VendorSubscription::try_from(row("expired", None)).unwrap_err();
        assert_eq!(err.code, ErrorCode::DatabaseError);
    }

    #[test]
    fn blank_event_id_is_a_database_error() {
        assert!(VendorSubscription::try_from(row("active", Some(""))).is_err());
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Integration Tests (require PostgreSQL, marked ignore)
    // ════════════════════════════════════════════════════════════════════════════

    async fn live_store() -> (PostgresSubscriptionStore, PgPool) {
        let url = std::env::var("TEST_DATABASE_URL")
            .unwrap_or_else(|_| "postgresql://localhost/vendor_billing_test".to_string());
        let pool = PgPool::connect(&url).await.unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        (PostgresSubscriptionStore::new(pool.clone()), pool)
    }

    async fn seed_vendor(pool: &PgPool) -> VendorId {
        let vendor_id = format!("V-{}", uuid::Uuid::new_v4());
        sqlx::query("INSERT INTO vendors (vendor_id) VALUES ($1)")
            .bind(&vendor_id)
            .execute(pool)
            .await
            .unwrap();
        VendorId::new(vendor_id).unwrap()
    }

    fn active_after(vendor_id: &VendorId, event: &str) -> VendorSubscription {
        VendorSubscription {
            status: SubscriptionStatus::Active,
            last_transition_at: Some(Timestamp::now()),
            last_event_id: Some(EventId::new(event).unwrap()),
            ..VendorSubscription::inactive(vendor_id.clone())
        }
    }

    #[tokio::test]
    #[ignore = "Requires live PostgreSQL"]
    async fn row_seeded_without_event_accepts_first_write() {
        let (store, pool) = live_store().await;
        let vendor_id = seed_vendor(&pool).await;
        sqlx::query("INSERT INTO vendor_subscriptions (vendor_id, status) VALUES ($1, 'inactive')")
            .bind(vendor_id.as_str())
            .execute(&pool)
            .await
            .unwrap();

        let seeded = store.read(&vendor_id).await.unwrap().unwrap();
        assert!(seeded.last_event_id.is_none());

        let first = store
            .conditional_write(&vendor_id, None, &active_after(&vendor_id, "e1"))
            .await
            .unwrap();
        let second = store
            .conditional_write(&vendor_id, None, &active_after(&vendor_id, "e2"))
            .await
            .unwrap();

        assert_eq!(first, WriteResult::Applied);
        assert_eq!(second, WriteResult::Conflict);
        assert_eq!(
            store.read(&vendor_id).await.unwrap().unwrap().last_event_id,
            Some(EventId::new("e1").unwrap())
        );
    }

    #[tokio::test]
    #[ignore = "Requires live PostgreSQL"]
    async fn update_requires_expected_last_event() {
        let (store, pool) = live_store().await;
        let vendor_id = seed_vendor(&pool).await;
        store
            .conditional_write(&vendor_id, None, &active_after(&vendor_id, "e1"))
            .await
            .unwrap();

        let wrong = EventId::new("e9").unwrap();
        let right = EventId::new("e1").unwrap();

        assert_eq!(
            store
                .conditional_write(&vendor_id, Some(&wrong), &active_after(&vendor_id, "e2"))
                .await
                .unwrap(),
            WriteResult::Conflict
        );
        assert_eq!(
            store
                .conditional_write(&vendor_id, Some(&right), &active_after(&vendor_id, "e2"))
                .await
                .unwrap(),
            WriteResult::Applied
        );
    }
}
