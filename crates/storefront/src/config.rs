//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `ROSE_SHOP_API_BASE_URL` - Base URL of the remote Rose Shop API
//!   (e.g., <https://api.roseshop.example/api>)
//!
//! ## Optional
//! - `ROSE_SHOP_DATA_DIR` - Directory for the cart cache and credential
//!   file (default: `.rose-shop`)
//! - `ROSE_SHOP_HTTP_TIMEOUT_SECS` - Per-request timeout (default: 30)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront client configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Base URL of the remote Rose Shop API.
    pub api_base_url: Url,
    /// Directory holding the cart cache and credential file.
    pub data_dir: PathBuf,
    /// Per-request HTTP timeout.
    pub http_timeout: Duration,
    /// Sentry DSN for error tracking.
    pub sentry_dsn: Option<String>,
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_base_url = get_required_env("ROSE_SHOP_API_BASE_URL")?
            .parse::<Url>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("ROSE_SHOP_API_BASE_URL".to_owned(), e.to_string())
            })?;

        let data_dir = PathBuf::from(get_env_or_default("ROSE_SHOP_DATA_DIR", ".rose-shop"));

        let http_timeout = get_env_or_default("ROSE_SHOP_HTTP_TIMEOUT_SECS", "30")
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|e| {
                ConfigError::InvalidEnvVar("ROSE_SHOP_HTTP_TIMEOUT_SECS".to_owned(), e.to_string())
            })?;

        let sentry_dsn = get_optional_env("SENTRY_DSN");

        Ok(Self {
            api_base_url,
            data_dir,
            http_timeout,
            sentry_dsn,
        })
    }

    /// Path of the durable cart cache file.
    #[must_use]
    pub fn cart_cache_path(&self) -> PathBuf {
        self.data_dir.join("cart.json")
    }

    /// Path of the persisted credential file.
    #[must_use]
    pub fn credential_path(&self) -> PathBuf {
        self.data_dir.join("session.json")
    }
}

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_owned()))
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn config() -> StorefrontConfig {
        StorefrontConfig {
            api_base_url: "http://localhost:8080/api".parse().unwrap(),
            data_dir: PathBuf::from("/tmp/rose-shop"),
            http_timeout: Duration::from_secs(30),
            sentry_dsn: None,
        }
    }

    #[test]
    fn test_derived_paths() {
        let config = config();
        assert_eq!(
            config.cart_cache_path(),
            PathBuf::from("/tmp/rose-shop/cart.json")
        );
        assert_eq!(
            config.credential_path(),
            PathBuf::from("/tmp/rose-shop/session.json")
        );
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::MissingEnvVar("ROSE_SHOP_API_BASE_URL".to_owned());
        assert_eq!(
            err.to_string(),
            "Missing environment variable: ROSE_SHOP_API_BASE_URL"
        );
    }
}
