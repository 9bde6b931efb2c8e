//! Axum router configuration for billing endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{handle_payment_webhook, health, BillingAppState};

/// Create the billing router.
///
/// # Routes
/// - `POST /webhooks/payments` - Handle payment provider webhooks
/// - `GET /health` - Liveness check
pub fn billing_router() -> Router<BillingAppState> {
    Router::new()
        .route("/webhooks/payments", post(handle_payment_webhook))
        .route("/health", get(health))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use secrecy::SecretString;
    use tower::ServiceExt;

    use crate::adapters::memory::{
        InMemoryIdempotencyStore, InMemorySubscriptionStore, InMemoryVendorDirectory,
    };
    use crate::application::HandlePaymentWebhookHandler;
    use crate::domain::billing::{
        sign, EventNormalizer, IdempotencyLedger, SubscriptionStateMachine, SubscriptionStatus,
        WebhookVerifier,
    };
    use crate::domain::foundation::VendorId;
    use crate::ports::SubscriptionStore;

    const SECRET: &str = "whsec_router_test";
    const HEADER: &str = "X-Signature";

    // ───────────────────────────────────────────────────────────────
    // Fixtures
    // ───────────────────────────────────────────────────────────────

    fn app() -> (Router, Arc<InMemorySubscriptionStore>) {
        let subscriptions = Arc::new(InMemorySubscriptionStore::new());
        let handler = HandlePaymentWebhookHandler::new(
            WebhookVerifier::new(SecretString::new(SECRET.to_string())),
            EventNormalizer::new(Arc::new(InMemoryVendorDirectory::with_vendors(["V1"]))),
            Arc::new(IdempotencyLedger::new(
                Arc::new(InMemoryIdempotencyStore::new()),
                60,
            )),
            SubscriptionStateMachine::new(subscriptions.clone()),
        );
        let state = BillingAppState::new(Arc::new(handler), HEADER);
        (billing_router().with_state(state), subscriptions)
    }

    fn payload(id: &str, event_type: &str, vendor: &str) -> Vec<u8> {
        serde_json::to_vec(&serde_json::json!({
            "id": id,
            "type": event_type,
            "data": { "object": { "metadata": { "vendor_id": vendor } } }
        }))
        .unwrap()
    }

    fn webhook(body: Vec<u8>, signature: Option<String>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/webhooks/payments")
            .header("content-type", "application/json");
        if let Some(sig) = signature {
            builder = builder.header(HEADER, sig);
        }
        builder.body(Body::from(body)).unwrap()
    }

    fn signed(body: Vec<u8>) -> Request<Body> {
        let sig = sign(&body, SECRET.as_bytes());
        webhook(body, sig)
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, String) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    async fn status_of(store: &InMemorySubscriptionStore, vendor: &str) -> Option<SubscriptionStatus> {
        store
            .read(&VendorId::new(vendor).unwrap())
            .await
            .unwrap()
            .map(|s| s.status)
    }

    // ───────────────────────────────────────────────────────────────
    // Tests
    // ───────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn health_returns_ok() {
        let (app, _) = app();

        let (status, body) = send(
            &app,
            Request::builder().uri("/health").body(Body::empty()).unwrap(),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ok");
    }

    #[tokio::test]
    async fn captured_then_failed_ends_past_due() {
        let (app, subscriptions) = app();

        let (first, _) = send(&app, signed(payload("e1", "invoice.payment_succeeded", "V1"))).await;
        assert_eq!(first, StatusCode::OK);
        assert_eq!(status_of(&subscriptions, "V1").await, Some(SubscriptionStatus::Active));

        let (second, _) = send(&app, signed(payload("e2", "invoice.payment_failed", "V1"))).await;
        assert_eq!(second, StatusCode::OK);

        let sub = subscriptions
            .read(&VendorId::new("V1").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(sub.status, SubscriptionStatus::PastDue);
        assert_eq!(sub.last_event_id.unwrap().as_str(), "e2");
    }

    #[tokio::test]
    async fn duplicate_delivery_returns_ok_twice() {
        let (app, subscriptions) = app();
        let body = payload("e1", "invoice.payment_succeeded", "V1");

        let (first, _) = send(&app, signed(body.clone())).await;
        let (second, reason) = send(&app, signed(body)).await;

        assert_eq!(first, StatusCode::OK);
        assert_eq!(second, StatusCode::OK);
        assert_eq!(reason, "already processed");
        assert_eq!(status_of(&subscriptions, "V1").await, Some(SubscriptionStatus::Active));
    }

    #[tokio::test]
    async fn missing_signature_returns_bad_request() {
        let (app, subscriptions) = app();

        let (status, reason) = send(
            &app,
            webhook(payload("e1", "invoice.payment_succeeded", "V1"), None),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(reason, "invalid signature");
        assert_eq!(status_of(&subscriptions, "V1").await, None);
    }

    #[tokio::test]
    async fn forged_signature_returns_bad_request() {
        let (app, _) = app();
        let body = payload("e1", "invoice.payment_succeeded", "V1");
        let forged = sign(&body, b"not_the_secret");

        let (status, _) = send(&app, webhook(body, forged)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_vendor_returns_bad_request() {
        let (app, _) = app();

        let (status, reason) =
            send(&app, signed(payload("e1", "invoice.payment_succeeded", "V404"))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(reason, "unknown vendor");
    }

    #[tokio::test]
    async fn malformed_body_returns_bad_request() {
        let (app, _) = app();

        let (status, reason) = send(&app, signed(br#"{"id":"e1"}"#.to_vec())).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(reason, "malformed payload");
    }
}
