//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `http` - Axum routes for the webhook endpoint
//! - `memory` - In-memory stores
//! - `postgres` - sqlx/PostgreSQL stores

pub mod http;
pub mod memory;
pub mod postgres;
