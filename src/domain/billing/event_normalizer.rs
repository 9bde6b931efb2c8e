//! Provider payload normalization.
//!
//! Turns a verified raw webhook body into a provider-agnostic
//! `PaymentEvent`. Only fields relevant to our processing are captured;
//! everything else in the provider's schema is ignored.

use std::sync::Arc;

use serde::Deserialize;

use crate::domain::foundation::{EventId, Timestamp, VendorId};
use crate::ports::VendorDirectory;

use super::payment_event::payload_hash;
use super::{PaymentEvent, PaymentEventKind, WebhookError};

/// Provider webhook envelope (simplified).
#[derive(Debug, Deserialize)]
struct ProviderEnvelope {
    /// Unique identifier for the event (evt_xxx format).
    id: String,

    /// Type of event (e.g., "invoice.payment_succeeded").
    #[serde(rename = "type")]
    event_type: String,

    /// Time at which the event was created (Unix timestamp).
    #[serde(default)]
    created: Option<i64>,

    data: ProviderData,
}

#[derive(Debug, Deserialize)]
struct ProviderData {
    object: ProviderObject,
}

#[derive(Debug, Deserialize)]
struct ProviderObject {
    metadata: ProviderMetadata,
}

/// Metadata attached by the marketplace when the subscription was created.
#[derive(Debug, Deserialize)]
struct ProviderMetadata {
    vendor_id: String,
}

/// Normalizes provider payloads, checking the vendor reference on the way.
pub struct EventNormalizer {
    vendors: Arc<dyn VendorDirectory>,
}

impl EventNormalizer {
    pub fn new(vendors: Arc<dyn VendorDirectory>) -> Self {
        Self { vendors }
    }

    /// Parses `raw_body` into a `PaymentEvent`.
    ///
    /// # Errors
    ///
    /// - `MalformedPayload` - not JSON, or required fields absent/mistyped
    /// - `UnknownVendor` - vendor reference does not resolve
    /// - `TransientStorageFailure` - vendor directory unreachable
    pub async fn normalize(&self, raw_body: &[u8]) -> Result<PaymentEvent, WebhookError> {
        let envelope: ProviderEnvelope = serde_json::from_slice(raw_body)
            .map_err(|e| WebhookError::MalformedPayload(e.to_string()))?;

        let event_id = EventId::new(envelope.id)
            .map_err(|e| WebhookError::MalformedPayload(e.to_string()))?;
        let vendor_id = VendorId::new(envelope.data.object.metadata.vendor_id)
            .map_err(|e| WebhookError::MalformedPayload(e.to_string()))?;

        let occurred_at = match envelope.created {
            Some(secs) => Some(Timestamp::from_unix_secs(secs).ok_or_else(|| {
                WebhookError::MalformedPayload("created is out of range".to_string())
            })?),
            None => None,
        };

        if !self.vendors.vendor_exists(&vendor_id).await? {
            return Err(WebhookError::UnknownVendor(vendor_id.to_string()));
        }

        Ok(PaymentEvent {
            event_id,
            vendor_id,
            kind: PaymentEventKind::from_provider_type(&envelope.event_type),
            provider_type: envelope.event_type,
            raw_payload_hash: payload_hash(raw_body),
            occurred_at,
            received_at: Timestamp::now(),
        })
    }
}
