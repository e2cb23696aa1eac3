//! Server configuration module.
//!
//! Configuration is loaded from environment variables with fallback to defaults.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server port
    pub http_port: u16,

    /// Path to the SQLite database file
    pub database_path: PathBuf,

    /// SMTP settings for invoice delivery
    pub smtp: SmtpConfig,

    /// Shop identity, printed on invoices and encoded in the payment QR
    pub shop: ShopConfig,
}

/// SMTP delivery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// From address, e.g. `Gent Bandenservice <facturen@example.be>`
    pub from_address: String,
    /// Upgrade the connection with STARTTLS (plain otherwise, for local relays)
    pub starttls: bool,
}

/// Shop identity used on invoices, reports and the EPC payment payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShopConfig {
    pub name: String,
    pub address: String,
    pub iban: String,
    pub vat_number: String,
    pub email: String,
    pub phone: String,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let config = ServerConfig {
            http_port: env::var("HTTP_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("HTTP_PORT".to_string()))?,

            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "factuur.db".to_string())
                .into(),

            smtp: SmtpConfig {
                host: env::var("SMTP_HOST").unwrap_or_else(|_| "localhost".to_string()),

                port: env::var("SMTP_PORT")
                    .unwrap_or_else(|_| "587".to_string())
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue("SMTP_PORT".to_string()))?,

                username: env::var("SMTP_USERNAME").unwrap_or_default(),

                password: env::var("SMTP_PASSWORD").unwrap_or_default(),

                from_address: env::var("SMTP_FROM")
                    .unwrap_or_else(|_| "facturen@localhost".to_string()),

                starttls: env::var("SMTP_STARTTLS")
                    .unwrap_or_else(|_| "true".to_string())
                    .parse()
                    .unwrap_or(true),
            },

            shop: ShopConfig {
                name: env::var("SHOP_NAME")
                    .unwrap_or_else(|_| "Gent Bandenservice".to_string()),

                address: env::var("SHOP_ADDRESS")
                    .unwrap_or_else(|_| "Dorpsstraat 1, 9000 Gent".to_string()),

                iban: env::var("SHOP_IBAN")
                    .unwrap_or_else(|_| "BE92063645863623".to_string()),

                vat_number: env::var("SHOP_VAT_NUMBER")
                    .unwrap_or_else(|_| "BE0123456789".to_string()),

                email: env::var("SHOP_EMAIL")
                    .unwrap_or_else(|_| "info@localhost".to_string()),

                phone: env::var("SHOP_PHONE").unwrap_or_default(),
            },
        };

        Ok(config)
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_with_defaults() {
        // No env vars set in the test environment for these keys.
        let config = ServerConfig::load().unwrap();
        assert!(config.http_port > 0);
        assert!(!config.shop.iban.is_empty());
    }
}
