//! Integration tests for Rose Shop.
//!
//! The scenarios exercise the session/cart/checkout reconciliation rules
//! end to end against [`fakes::FakeGateway`], an in-memory stand-in for
//! the remote API with scripted accounts, carts, and failure injection.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p rose-shop-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `cart_sync` - refresh fallback, mutation serialization, purge-wins
//! - `session` - login/logout/restore transitions and forced logout
//! - `checkout` - order submission, vouchers, addresses, buy-now

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod fakes;
