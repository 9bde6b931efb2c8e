//! Webhook error types for payment notification handling.
//!
//! Defines every error condition of the ingestion pipeline, with HTTP status
//! code mapping and retryability semantics.

use axum::http::StatusCode;
use thiserror::Error;

use crate::domain::foundation::DomainError;

/// Errors that occur during webhook processing.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Signature missing, malformed, or not matching the body.
    #[error("Authentication failure")]
    AuthenticationFailure,

    /// Payload is not the expected shape, or reuses an event id with
    /// different content.
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// Vendor reference does not resolve to a known vendor.
    #[error("Unknown vendor: {0}")]
    UnknownVendor(String),

    /// Event was already processed.
    #[error("Duplicate event")]
    DuplicateEvent,

    /// Another delivery of the same event is being processed right now.
    #[error("Event in flight")]
    EventInFlight,

    /// Event is older than the one that produced the vendor's current state.
    #[error("Ordering conflict")]
    OrderingConflict,

    /// Ledger, subscription, or vendor store unreachable.
    #[error("Transient storage failure: {0}")]
    TransientStorageFailure(String),
}

impl WebhookError {
    /// Returns true if the provider should retry delivering this webhook.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            WebhookError::TransientStorageFailure(_) | WebhookError::EventInFlight
        )
    }

    /// Maps the error to the provider-facing HTTP status code.
    ///
    /// Status codes determine the provider's retry behavior:
    /// - 2xx: Event acknowledged, no retry
    /// - 4xx: Client error, no retry
    /// - 5xx: Server error, will retry
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebhookError::AuthenticationFailure
            | WebhookError::MalformedPayload(_)
            | WebhookError::UnknownVendor(_) => StatusCode::BAD_REQUEST,

            // Benign: acknowledged so the provider stops retrying
            WebhookError::DuplicateEvent | WebhookError::OrderingConflict => StatusCode::OK,

            WebhookError::EventInFlight | WebhookError::TransientStorageFailure(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Short human-readable reason returned as the response body.
    ///
    /// Never includes payload content or storage details.
    pub fn reason(&self) -> &'static str {
        match self {
            WebhookError::AuthenticationFailure => "invalid signature",
            WebhookError::MalformedPayload(_) => "malformed payload",
            WebhookError::UnknownVendor(_) => "unknown vendor",
            WebhookError::DuplicateEvent => "already processed",
            WebhookError::EventInFlight => "event in flight, retry later",
            WebhookError::OrderingConflict => "stale event ignored",
            WebhookError::TransientStorageFailure(_) => "temporary failure, retry later",
        }
    }
}

/// Port failures are storage failures from the pipeline's point of view.
impl From<DomainError> for WebhookError {
    fn from(err: DomainError) -> Self {
        WebhookError::TransientStorageFailure(err.to_string())
    }
}
