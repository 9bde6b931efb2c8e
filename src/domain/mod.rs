//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamps, errors)
//! - `billing` - Payment webhook pipeline and vendor subscription lifecycle

pub mod billing;
pub mod foundation;
