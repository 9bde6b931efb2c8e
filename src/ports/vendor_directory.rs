//! VendorDirectory port - Existence check against the marketplace catalog.
//!
//! The catalog itself is owned elsewhere; the webhook pipeline only needs to
//! know whether a vendor reference in a payment notification is real.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, VendorId};

/// Port for resolving vendor references.
#[async_trait]
pub trait VendorDirectory: Send + Sync {
    /// Returns true if the vendor exists.
    ///
    /// # Errors
    ///
    /// - `DatabaseError` if the catalog cannot be reached
    async fn vendor_exists(&self, vendor_id: &VendorId) -> Result<bool, DomainError>;
}
