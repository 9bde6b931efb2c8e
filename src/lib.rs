//! Vendor Billing - Payment webhook ingestion and subscription activation
//!
//! Receives signed payment notifications from the payment provider, applies
//! each one at most once, and keeps every vendor's subscription status in
//! step with their payments.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
