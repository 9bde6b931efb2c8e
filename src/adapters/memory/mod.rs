//! In-memory adapters.
//!
//! Process-local implementations of the billing ports, for tests and local
//! development without a database.

mod idempotency_store;
mod subscription_store;
mod vendor_directory;

pub use idempotency_store::InMemoryIdempotencyStore;
pub use subscription_store::InMemorySubscriptionStore;
pub use vendor_directory::InMemoryVendorDirectory;
