//! Order system configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `ORDERS_DATABASE_URL` - `PostgreSQL` connection string (falls back to
//!   `DATABASE_URL`); only needed when using the Postgres-backed store
//! - `ORDERS_DEFAULT_CURRENCY` - ISO 4217 code applied to orders created
//!   without an explicit currency (default: USD)

use secrecy::SecretString;
use thiserror::Error;

const DEFAULT_CURRENCY: &str = "USD";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Order system configuration.
#[derive(Debug, Clone)]
pub struct OrdersConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: Option<SecretString>,
    /// Currency code applied when a new order carries none
    pub default_currency: String,
}

impl Default for OrdersConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            default_currency: DEFAULT_CURRENCY.to_owned(),
        }
    }
}

impl OrdersConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `ORDERS_DEFAULT_CURRENCY` is set but empty.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("ORDERS_DATABASE_URL");
        let default_currency = get_env_or_default("ORDERS_DEFAULT_CURRENCY", DEFAULT_CURRENCY);
        if default_currency.trim().is_empty() {
            return Err(ConfigError::InvalidEnvVar(
                "ORDERS_DEFAULT_CURRENCY".to_owned(),
                "currency code must not be empty".to_owned(),
            ));
        }

        Ok(Self {
            database_url,
            default_currency,
        })
    }

    /// The database URL, or an error when it was not configured.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` when no URL is set.
    pub fn require_database_url(&self) -> Result<&SecretString, ConfigError> {
        self.database_url
            .as_ref()
            .ok_or_else(|| ConfigError::MissingEnvVar("ORDERS_DATABASE_URL".to_owned()))
    }
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Option<SecretString> {
    if let Ok(value) = std::env::var(primary_key) {
        return Some(SecretString::from(value));
    }
    std::env::var("DATABASE_URL").ok().map(SecretString::from)
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
