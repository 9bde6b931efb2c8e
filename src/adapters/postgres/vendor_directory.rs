//! PostgreSQL implementation of VendorDirectory, backed by the `vendors` table.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::foundation::{DomainError, VendorId};
use crate::ports::VendorDirectory;

pub struct PostgresVendorDirectory {
    pool: PgPool,
}

impl PostgresVendorDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VendorDirectory for PostgresVendorDirectory {
    async fn vendor_exists(&self, vendor_id: &VendorId) -> Result<bool, DomainError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM vendors WHERE vendor_id = $1)")
                .bind(vendor_id.as_str())
                .fetch_one(&self.pool)
                .await
                .map_err(|e| DomainError::database(format!("Failed to look up vendor: {}", e)))?;

        Ok(exists)
    }
}
