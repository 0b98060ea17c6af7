//! Remote Rose Shop API: error type, gateway contracts, and the HTTP client.
//!
//! # Architecture
//!
//! - The remote API is the source of truth for pricing, inventory, orders,
//!   and voucher eligibility - the client never computes those locally
//! - Each remote capability is a small trait (`AuthGateway`, `CartGateway`,
//!   ...) so the services can be driven by in-memory fakes in tests
//! - [`ApiClient`] is the production implementation of all of them, with
//!   in-memory caching via `moka` for catalog responses (5 minute TTL)
//!
//! An invalid or expired credential is reported as [`ApiError::Unauthorized`]
//! no matter which call detected it; the session layer reacts to that signal
//! in exactly one place rather than transport code forcing navigation.

mod cache;
mod client;
pub mod types;
mod wire;

pub use client::ApiClient;
pub use types::*;

use secrecy::SecretString;

use rose_shop_core::{CartItemId, FlowerId};

use thiserror::Error;

/// Errors that can occur when calling the remote Rose Shop API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed before a response was received.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body could not be parsed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The credential is missing, invalid, or expired.
    #[error("invalid or expired credential")]
    Unauthorized,

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Rate limited by the remote API.
    #[error("rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// The remote API rejected the request.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Message from the response envelope.
        message: String,
    },
}

impl ApiError {
    /// Whether this error means the current credential is no longer valid.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }
}

// =============================================================================
// Gateway contracts
// =============================================================================

/// Credential exchange and profile operations.
pub trait AuthGateway {
    /// Install (or remove) the bearer credential used by subsequent calls
    /// on this gateway.
    fn install_credential(&self, credential: Option<SecretString>);

    /// Exchange a username (or email) and password for an identity and a
    /// fresh credential.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthorized`] for a bad username/password pair.
    async fn login(&self, username_or_email: &str, password: &str)
    -> Result<AuthSession, ApiError>;

    /// Create a new account.
    ///
    /// # Errors
    ///
    /// Returns an error if the fields are rejected or the request fails.
    async fn register(&self, request: &RegisterRequest) -> Result<AuthSession, ApiError>;

    /// Fetch the identity for the installed credential.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthorized`] if the credential is invalid or
    /// expired.
    async fn current_identity(&self) -> Result<Identity, ApiError>;

    /// Persist a profile mutation and return the updated identity.
    ///
    /// # Errors
    ///
    /// Returns an error if the update is rejected or the credential is no
    /// longer valid.
    async fn update_profile(&self, update: &ProfileUpdate) -> Result<Identity, ApiError>;
}

/// Remote cart operations for the authenticated user.
pub trait CartGateway {
    /// Fetch the full cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    async fn fetch_cart(&self) -> Result<CartState, ApiError>;

    /// Add a flower to the cart, or increment its line.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    async fn add_line(&self, flower_id: FlowerId, quantity: u32) -> Result<(), ApiError>;

    /// Set a line's quantity.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    async fn update_line(&self, line_id: CartItemId, quantity: u32) -> Result<(), ApiError>;

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    async fn remove_line(&self, line_id: CartItemId) -> Result<(), ApiError>;

    /// Remove every line.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    async fn clear_cart(&self) -> Result<(), ApiError>;
}

/// Voucher validation and listing.
pub trait VoucherGateway {
    /// Validate a voucher code for the current user.
    ///
    /// # Errors
    ///
    /// Returns an error if the code is unknown or the request fails.
    async fn validate_voucher(&self, code: &str) -> Result<Voucher, ApiError>;

    /// List vouchers granted to the current user.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    async fn list_vouchers(&self) -> Result<Vec<Voucher>, ApiError>;
}

/// Delivery address book.
pub trait AddressGateway {
    /// List the user's addresses, including soft-deleted entries.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    async fn list_addresses(&self) -> Result<Vec<Address>, ApiError>;

    /// Create or update an address. Deletion is an upsert with the
    /// `is_deleted` flag set.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    async fn upsert_address(&self, upsert: &AddressUpsert) -> Result<Address, ApiError>;
}

/// Order creation.
pub trait OrderGateway {
    /// Create an order from the remote cart's current contents.
    ///
    /// # Errors
    ///
    /// Returns an error if the order is rejected or the request fails.
    async fn create_order(&self, request: &OrderRequest) -> Result<OrderResult, ApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let err = ApiError::NotFound("flower 42".to_owned());
        assert_eq!(err.to_string(), "not found: flower 42");

        let err = ApiError::Api {
            status: 409,
            message: "out of stock".to_owned(),
        };
        assert_eq!(err.to_string(), "API error (409): out of stock");
    }

    #[test]
    fn test_unauthorized_detection() {
        assert!(ApiError::Unauthorized.is_unauthorized());
        assert!(!ApiError::RateLimited(3).is_unauthorized());
    }

    #[test]
    fn test_rate_limited_display() {
        assert_eq!(
            ApiError::RateLimited(60).to_string(),
            "rate limited, retry after 60 seconds"
        );
    }
}
