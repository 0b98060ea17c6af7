//! Unified error handling with Sentry integration.
//!
//! Every error surfaced to the view layer carries a stable [`ErrorKind`]
//! plus a human-readable message. Binaries call [`report`] on errors they
//! show the user so transport-level failures reach Sentry.

use thiserror::Error;

use crate::api::ApiError;
use crate::services::cart::CartError;
use crate::services::checkout::CheckoutError;
use crate::services::session::SessionError;

/// Top-level error type for the storefront client.
#[derive(Debug, Error)]
pub enum StorefrontError {
    /// Session operation failed.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Cart operation failed.
    #[error(transparent)]
    Cart(#[from] CartError),

    /// Checkout operation failed.
    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    /// Remote API operation failed.
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Stable error classification, independent of the failing component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad or expired credential.
    Authentication,
    /// Malformed local input; never reached the network.
    Validation,
    /// Ineligible or invalid voucher; non-fatal to checkout.
    Voucher,
    /// Checkout attempted on an empty cart.
    EmptyCart,
    /// The remote API refused to create the order.
    OrderCreation,
    /// Another mutation was in flight; transient and retryable.
    ConcurrentModification,
    /// A local invariant would be violated (e.g. last-address deletion).
    Invariant,
    /// Network or remote-service failure.
    Transport,
}

impl StorefrontError {
    /// The stable kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Session(e) => match e {
                SessionError::InvalidCredentials => ErrorKind::Authentication,
                SessionError::NotAuthenticated => ErrorKind::Validation,
                SessionError::Api(api) => api_kind(api),
            },
            Self::Cart(e) => match e {
                CartError::Validation(_) => ErrorKind::Validation,
                CartError::ConcurrentModification => ErrorKind::ConcurrentModification,
                CartError::Api(api) => api_kind(api),
            },
            Self::Checkout(e) => match e {
                CheckoutError::EmptyCart => ErrorKind::EmptyCart,
                CheckoutError::Validation(_) => ErrorKind::Validation,
                CheckoutError::Voucher(_) => ErrorKind::Voucher,
                CheckoutError::OrderCreation(_) => ErrorKind::OrderCreation,
                CheckoutError::LastAddress => ErrorKind::Invariant,
                CheckoutError::Api(api) => api_kind(api),
            },
            Self::Api(api) => api_kind(api),
        }
    }

    /// Whether a retry can reasonably succeed without user action.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::ConcurrentModification | ErrorKind::Transport
        )
    }

    /// Whether this error means the installed credential is no longer
    /// valid and the session must be force-logged-out.
    ///
    /// A rejected explicit login ([`SessionError::InvalidCredentials`]) is
    /// not an invalidation: there was no session to invalidate.
    #[must_use]
    pub const fn is_credential_invalidation(&self) -> bool {
        match self {
            Self::Session(SessionError::Api(api))
            | Self::Cart(CartError::Api(api))
            | Self::Checkout(CheckoutError::Api(api) | CheckoutError::OrderCreation(api))
            | Self::Api(api) => api.is_unauthorized(),
            _ => false,
        }
    }
}

const fn api_kind(api: &ApiError) -> ErrorKind {
    match api {
        ApiError::Unauthorized => ErrorKind::Authentication,
        _ => ErrorKind::Transport,
    }
}

/// Capture an error to Sentry when it is worth tracking.
///
/// Transport and order-creation failures are captured; validation-level
/// rejections are not.
pub fn report(error: &StorefrontError) {
    if matches!(
        error.kind(),
        ErrorKind::Transport | ErrorKind::OrderCreation
    ) {
        let event_id = sentry::capture_error(error);
        tracing::error!(error = %error, sentry_event_id = %event_id, "operation failed");
    }
}

/// Result type alias for `StorefrontError`.
pub type Result<T> = std::result::Result<T, StorefrontError>;
