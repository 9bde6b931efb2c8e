//! Payment webhook signature verification.
//!
//! HMAC-SHA256 over the exact raw request body, keyed with the shared
//! webhook secret. This is the single trust boundary of the pipeline:
//! nothing downstream runs unless `verify` returns true.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::webhook_errors::WebhookError;

/// Optional scheme prefix accepted in the signature header.
const SIGNATURE_PREFIX: &str = "sha256=";

/// Verifies `provided_signature` against the HMAC-SHA256 of `raw_body`.
///
/// The signature is a hex digest, optionally prefixed with `sha256=`.
/// Returns false for an empty body, an empty secret, an empty or non-hex
/// signature, or any mismatch. Never panics and has no side effects.
pub fn verify(raw_body: &[u8], provided_signature: &str, secret: &[u8]) -> bool {
    if raw_body.is_empty() || secret.is_empty() {
        return false;
    }

    let Some(provided) = decode_signature(provided_signature) else {
        return false;
    };

    match compute_signature(raw_body, secret) {
        Some(expected) => constant_time_compare(&expected, &provided),
        None => false,
    }
}

/// Produces the canonical `sha256=<hex>` signature for `raw_body`.
///
/// Used by tests and local tooling that need to forge valid deliveries.
pub fn sign(raw_body: &[u8], secret: &[u8]) -> Option<String> {
    compute_signature(raw_body, secret)
        .map(|mac| format!("{}{}", SIGNATURE_PREFIX, hex::encode(mac)))
}

fn decode_signature(header: &str) -> Option<Vec<u8>> {
    let trimmed = header.trim();
    let hex_part = trimmed.strip_prefix(SIGNATURE_PREFIX).unwrap_or(trimmed);
    if hex_part.is_empty() {
        return None;
    }
    hex::decode(hex_part).ok()
}

fn compute_signature(raw_body: &[u8], secret: &[u8]) -> Option<Vec<u8>> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret).ok()?;
    mac.update(raw_body);
    Some(mac.finalize().into_bytes().to_vec())
}

/// Performs constant-time comparison of two byte slices.
///
/// Length is not secret (it is fixed by the digest), so an early return on
/// length mismatch leaks nothing.
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

/// Verifier bound to the configured webhook secret.
pub struct WebhookVerifier {
    secret: SecretString,
}

impl WebhookVerifier {
    /// Creates a new verifier with the given webhook secret.
    pub fn new(secret: SecretString) -> Self {
        Self { secret }
    }

    /// Checks the signature header of an inbound delivery.
    ///
    /// # Errors
    ///
    /// `AuthenticationFailure` when the header is absent or does not match.
    pub fn authenticate(
        &self,
        raw_body: &[u8],
        signature_header: Option<&str>,
    ) -> Result<(), WebhookError> {
        let signature = signature_header.ok_or(WebhookError::AuthenticationFailure)?;

        if verify(raw_body, signature, self.secret.expose_secret().as_bytes()) {
            Ok(())
        } else {
            Err(WebhookError::AuthenticationFailure)
        }
    }
}
