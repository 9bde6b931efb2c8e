//! Application configuration module
//!
//! Type-safe configuration loaded from environment variables using the
//! `config` and `dotenvy` crates. Variables carry the `VENDOR_BILLING`
//! prefix and nested values are separated by double underscores.
//!
//! # Example
//!
//! ```no_run
//! use vendor_billing::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod database;
mod error;
mod payment;
mod server;

pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use payment::PaymentConfig;
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

/// Root application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment, logging)
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration (PostgreSQL connection)
    pub database: DatabaseConfig,

    /// Payment webhook configuration (secret, header, lease timeout)
    pub payment: PaymentConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `VENDOR_BILLING` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    ///
    /// # Environment Variable Format
    ///
    /// - `VENDOR_BILLING__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `VENDOR_BILLING__PAYMENT__WEBHOOK_SECRET=...` -> `payment.webhook_secret`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or values
    /// cannot be parsed.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("VENDOR_BILLING")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.payment.validate()?;
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::env;
    use std::sync::Mutex;

    // Env vars are process-global
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const VARS: &[&str] = &[
        "VENDOR_BILLING__DATABASE__URL",
        "VENDOR_BILLING__PAYMENT__WEBHOOK_SECRET",
        "VENDOR_BILLING__PAYMENT__SIGNATURE_HEADER",
        "VENDOR_BILLING__SERVER__PORT",
        "VENDOR_BILLING__SERVER__ENVIRONMENT",
    ];

    fn set_minimal_env() {
        env::set_var("VENDOR_BILLING__DATABASE__URL", "postgresql://test@localhost/billing");
        env::set_var("VENDOR_BILLING__PAYMENT__WEBHOOK_SECRET", "whsec_test");
    }

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_load_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.database.url, "postgresql://test@localhost/billing");
        assert_eq!(config.payment.webhook_secret.expose_secret(), "whsec_test");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_defaults() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.environment, Environment::Development);
        assert_eq!(config.payment.signature_header, "X-Signature");
        assert_eq!(config.payment.processing_timeout_secs, 60);
        assert!(!config.database.run_migrations);
    }

    #[test]
    fn test_overrides() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("VENDOR_BILLING__SERVER__PORT", "3000");
        env::set_var("VENDOR_BILLING__SERVER__ENVIRONMENT", "production");
        env::set_var("VENDOR_BILLING__PAYMENT__SIGNATURE_HEADER", "Provider-Signature");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.server.port, 3000);
        assert!(config.is_production());
        assert_eq!(config.payment.signature_header, "Provider-Signature");
    }

    #[test]
    fn test_missing_secret_fails_to_load() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        env::set_var("VENDOR_BILLING__DATABASE__URL", "postgresql://test@localhost/billing");
        let result = AppConfig::load();
        clear_env();

        assert!(matches!(result, Err(ConfigError::LoadError(_))));
    }

    #[test]
    fn test_empty_secret_names_its_variable() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("VENDOR_BILLING__PAYMENT__WEBHOOK_SECRET", "");
        let result = AppConfig::load();
        clear_env();

        let err = result.unwrap().validate().unwrap_err();
        assert!(err.to_string().contains("VENDOR_BILLING__PAYMENT__WEBHOOK_SECRET"));
    }
}
