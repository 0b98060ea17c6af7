//! Business logic services for the storefront client.
//!
//! # Services
//!
//! - `session` - Who is currently authenticated, and the operations that
//!   change it
//! - `cart` - Keeping the in-memory cart consistent with the remote
//!   gateway and the durable cache
//! - `checkout` - Order submission, vouchers, and the address book

pub mod cart;
pub mod checkout;
pub mod session;

pub use cart::{CartError, CartSynchronizer};
pub use checkout::{
    CheckoutError, CheckoutForm, CheckoutOrchestrator, CheckoutOutcome, CheckoutQuote, quote,
};
pub use session::{SessionError, SessionStore};
