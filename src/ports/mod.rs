//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Collaborator Ports
//!
//! - `VendorDirectory` - Vendor existence check (used by the normalizer)
//! - `SubscriptionStore` - Vendor subscription state with conditional writes
//!
//! ## Webhook Ports
//!
//! - `IdempotencyStore` - Provider event ledger with atomic create-if-absent

mod idempotency_store;
mod subscription_store;
mod vendor_directory;

pub use idempotency_store::{
    IdempotencyRecord, IdempotencyStore, LedgerOutcome, LedgerStatus, SaveResult,
};
pub use subscription_store::{SubscriptionStore, WriteResult};
pub use vendor_directory::VendorDirectory;
