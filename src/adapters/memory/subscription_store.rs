//! In-memory vendor subscription storage.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

use crate::domain::billing::VendorSubscription;
use crate::domain::foundation::{DomainError, EventId, VendorId};
use crate::ports::{SubscriptionStore, WriteResult};

/// Subscriptions keyed by vendor.
///
/// `conditional_write` compares and replaces under one lock acquisition.
#[derive(Default)]
pub struct InMemorySubscriptionStore {
    subscriptions: Mutex<HashMap<VendorId, VendorSubscription>>,
}

impl InMemorySubscriptionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SubscriptionStore for InMemorySubscriptionStore {
    async fn read(&self, vendor_id: &VendorId) -> Result<Option<VendorSubscription>, DomainError> {
        Ok(self.subscriptions.lock().await.get(vendor_id).cloned())
    }

    async fn conditional_write(
        &self,
        vendor_id: &VendorId,
        expected_last_event_id: Option<&EventId>,
        new_state: &VendorSubscription,
    ) -> Result<WriteResult, DomainError> {
        let mut subscriptions = self.subscriptions.lock().await;

        let matches = match (subscriptions.get(vendor_id), expected_last_event_id) {
            (None, None) => true,
            (Some(current), expected) => current.last_event_id.as_ref() == expected,
            (None, Some(_)) => false,
        };

        if !matches {
            return Ok(WriteResult::Conflict);
        }

        subscriptions.insert(vendor_id.clone(), new_state.clone());
        Ok(WriteResult::Applied)
    }
}
