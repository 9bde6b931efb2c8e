//! HTTP adapter for billing endpoints.
//!
//! - `POST /webhooks/payments` - Payment provider notifications (signature verified)
//! - `GET /health` - Liveness check

mod handlers;
mod routes;

pub use handlers::{handle_payment_webhook, health, BillingAppState};
pub use routes::billing_router;
