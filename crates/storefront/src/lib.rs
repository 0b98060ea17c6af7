//! Rose Shop storefront client library.
//!
//! Client-side orchestration for the customer-facing flower shop: session
//! handling, a shopping cart reconciled with the remote API and a local
//! durable cache, and a checkout flow with vouchers and address
//! management. All business logic (pricing, inventory, orders, payments,
//! voucher eligibility) lives behind the remote HTTP API; this crate is
//! the client-side state and its synchronization rules.
//!
//! # Example
//!
//! ```rust,ignore
//! use rose_shop_storefront::config::StorefrontConfig;
//! use rose_shop_storefront::state::LiveStorefront;
//!
//! let config = StorefrontConfig::from_env()?;
//! let shop = LiveStorefront::from_config(&config)?;
//!
//! // Cached cart first, then session restore + refresh.
//! shop.start().await;
//!
//! let identity = shop.login("lan", "secret").await?;
//! shop.add_to_cart(flower_id, 2).await?;
//! println!("{} items", shop.cart_snapshot().total_quantity());
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]
// Gateway traits are consumed inside this workspace only; their futures
// never cross threads.
#![allow(async_fn_in_trait)]

pub mod api;
pub mod cache;
pub mod config;
pub mod credentials;
pub mod error;
pub mod services;
pub mod state;
