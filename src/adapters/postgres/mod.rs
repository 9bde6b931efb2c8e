//! PostgreSQL adapters - Database implementations for the billing ports.
//!
//! - `PostgresIdempotencyStore` - `webhook_events` ledger
//! - `PostgresSubscriptionStore` - `vendor_subscriptions` with conditional writes
//! - `PostgresVendorDirectory` - `vendors` catalog lookups
//!
//! Schema lives in `migrations/`.

mod idempotency_store;
mod subscription_store;
mod vendor_directory;

pub use idempotency_store::PostgresIdempotencyStore;
pub use subscription_store::PostgresSubscriptionStore;
pub use vendor_directory::PostgresVendorDirectory;
