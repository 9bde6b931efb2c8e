//! SubscriptionStore port - Persistence of vendor subscription state.
//!
//! # Design
//!
//! - **Whole-record writes**: status and the event that produced it are
//!   stored as one unit, never field by field
//! - **Optimistic concurrency**: writes are conditional on the
//!   `last_event_id` the writer read, which serializes updates per vendor
//!   across processes without locks

use async_trait::async_trait;

use crate::domain::billing::VendorSubscription;
use crate::domain::foundation::{DomainError, EventId, VendorId};

/// Result of a conditional write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteResult {
    /// The stored record matched the expectation and was replaced.
    Applied,
    /// Another writer got there first; re-read and decide again.
    Conflict,
}

/// Repository port for `VendorSubscription` records.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Reads the subscription of a vendor.
    ///
    /// Returns `None` if no event has ever been applied for this vendor.
    async fn read(&self, vendor_id: &VendorId) -> Result<Option<VendorSubscription>, DomainError>;

    /// Replaces the subscription if its current `last_event_id` equals
    /// `expected_last_event_id`.
    ///
    /// `expected_last_event_id == None` means "no record exists yet"; the
    /// write then creates the record and conflicts if one appeared meanwhile.
    async fn conditional_write(
        &self,
        vendor_id: &VendorId,
        expected_last_event_id: Option<&EventId>,
        new_state: &VendorSubscription,
    ) -> Result<WriteResult, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Trait object safety test
    #[test]
    fn subscription_store_is_object_safe() {
        fn _accepts_dyn(_store: &dyn SubscriptionStore) {}
    }
}
