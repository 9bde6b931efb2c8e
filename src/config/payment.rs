//! Payment webhook configuration

use axum::http::HeaderName;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::error::ValidationError;

/// Payment provider webhook settings.
///
/// `Debug` output redacts the secret.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    /// Shared HMAC secret used to sign webhook bodies
    pub webhook_secret: SecretString,

    /// Request header carrying the body signature
    #[serde(default = "default_signature_header")]
    pub signature_header: String,

    /// Seconds after which an unfinished claim on an event may be taken over
    #[serde(default = "default_processing_timeout")]
    pub processing_timeout_secs: u64,
}

impl PaymentConfig {
    /// Validate payment configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.webhook_secret.expose_secret().is_empty() {
            return Err(ValidationError::MissingRequired(
                "VENDOR_BILLING__PAYMENT__WEBHOOK_SECRET",
            ));
        }
        if HeaderName::from_bytes(self.signature_header.as_bytes()).is_err() {
            return Err(ValidationError::InvalidSignatureHeader);
        }
        if self.processing_timeout_secs == 0 || self.processing_timeout_secs > 3600 {
            return Err(ValidationError::InvalidProcessingTimeout);
        }
        Ok(())
    }
}

fn default_signature_header() -> String {
    "X-Signature".to_string()
}

fn default_processing_timeout() -> u64 {
    60
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(secret: &str) -> PaymentConfig {
        PaymentConfig {
            webhook_secret: SecretString::new(secret.to_string()),
            signature_header: default_signature_header(),
            processing_timeout_secs: default_processing_timeout(),
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(config("whsec_abc123").validate().is_ok());
    }

    #[test]
    fn test_validation_missing_secret() {
        assert!(matches!(
            config("").validate(),
            Err(ValidationError::MissingRequired("VENDOR_BILLING__PAYMENT__WEBHOOK_SECRET"))
        ));
    }

    #[test]
    fn test_validation_invalid_header_name() {
        let cfg = PaymentConfig {
            signature_header: "X Signature".to_string(),
            ..config("whsec_abc123")
        };
        assert!(matches!(
            cfg.validate(),
            Err(ValidationError::InvalidSignatureHeader)
        ));
    }

    #[test]
    fn test_validation_processing_timeout_bounds() {
        for secs in [0, 7200] {
            let cfg = PaymentConfig {
                processing_timeout_secs: secs,
                ..config("whsec_abc123")
            };
            assert!(cfg.validate().is_err());
        }
    }

    #[test]
    fn test_debug_redacts_secret() {
        let rendered = format!("{:?}", config("whsec_do_not_print"));
        assert!(!rendered.contains("whsec_do_not_print"));
    }
}
