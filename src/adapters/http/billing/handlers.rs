//! HTTP handlers for the payment webhook endpoint.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
};

use crate::application::{HandlePaymentWebhookCommand, HandlePaymentWebhookHandler};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared state for billing routes.
///
/// Cloned per request; the handler is shared behind an `Arc`.
#[derive(Clone)]
pub struct BillingAppState {
    pub webhook_handler: Arc<HandlePaymentWebhookHandler>,
    /// Name of the request header carrying the body signature.
    pub signature_header: Arc<str>,
}

impl BillingAppState {
    pub fn new(
        webhook_handler: Arc<HandlePaymentWebhookHandler>,
        signature_header: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            webhook_handler,
            signature_header: signature_header.into(),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Handlers
// ════════════════════════════════════════════════════════════════════════════════

/// POST /webhooks/payments - Handle payment provider notifications
///
/// The body is taken as raw bytes; the signature covers them exactly, so it
/// must not be parsed before verification.
pub async fn handle_payment_webhook(
    State(state): State<BillingAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, &'static str) {
    // A non-ASCII header value cannot be a valid signature
    let signature = headers
        .get(state.signature_header.as_ref())
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let cmd = HandlePaymentWebhookCommand {
        payload: body.to_vec(),
        signature,
    };

    match state.webhook_handler.handle(cmd).await {
        Ok(result) => (StatusCode::OK, result.reason()),
        Err(err) => (err.status_code(), err.reason()),
    }
}

/// GET /health - Liveness check
pub async fn health() -> &'static str {
    "ok"
}
