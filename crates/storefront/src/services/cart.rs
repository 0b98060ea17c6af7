//! Cart synchronizer: keeps the in-memory cart consistent with the remote
//! gateway and the local durable cache.
//!
//! The remote API owns pricing and discount logic, so the post-mutation
//! cart is never computed locally - every mutation delegates to the
//! gateway and then refreshes. The durable cache is written only here and
//! is never trusted over a successful remote fetch.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;
use tokio::sync::{Mutex, watch};
use tracing::{debug, instrument, warn};

use rose_shop_core::{CartItemId, FlowerId};

use crate::api::types::CartState;
use crate::api::{ApiError, CartGateway};
use crate::cache::CartCache;

/// Errors that can occur during cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// Malformed local input, rejected before any network call.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Another cart mutation is already in flight. Transient; retry once
    /// it completes.
    #[error("another cart update is already in flight")]
    ConcurrentModification,

    /// Remote API failure.
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Owns the authoritative in-memory [`CartState`].
///
/// Cheaply cloneable via `Arc`. Mutations are serialized: each one ends
/// with a full refresh that overwrites the state, so two interleaved
/// mutate-then-refresh sequences could apply results out of order. An
/// overlapping mutation is rejected with
/// [`CartError::ConcurrentModification`].
pub struct CartSynchronizer<G, C> {
    inner: Arc<CartInner<G, C>>,
}

impl<G, C> Clone for CartSynchronizer<G, C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct CartInner<G, C> {
    gateway: G,
    cache: C,
    state_tx: watch::Sender<CartState>,
    mutation_guard: Mutex<()>,
    /// Bumped by every purge; a refresh result from an older generation
    /// is discarded. This is how an explicit clear or logout always wins
    /// against a slower in-flight refresh.
    generation: AtomicU64,
}

impl<G: CartGateway, C: CartCache> CartSynchronizer<G, C> {
    /// Create a synchronizer holding the empty cart.
    pub fn new(gateway: G, cache: C) -> Self {
        let (state_tx, _) = watch::channel(CartState::empty());
        Self {
            inner: Arc::new(CartInner {
                gateway,
                cache,
                state_tx,
                mutation_guard: Mutex::new(()),
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// Subscribe to cart state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CartState> {
        self.inner.state_tx.subscribe()
    }

    /// The current cart snapshot.
    #[must_use]
    pub fn snapshot(&self) -> CartState {
        self.inner.state_tx.borrow().clone()
    }

    /// Total quantity across all lines.
    #[must_use]
    pub fn total_quantity(&self) -> u32 {
        self.inner.state_tx.borrow().total_quantity()
    }

    /// Publish whatever the durable cache holds, before any network
    /// activity. Called once at startup so the view layer has an
    /// immediate (possibly stale) snapshot while `refresh()` runs.
    #[instrument(skip(self))]
    pub fn restore_from_cache(&self) {
        if let Some(cached) = self.inner.cache.load() {
            debug!(lines = cached.lines().len(), "restored cart from cache");
            self.publish(cached);
        }
    }

    /// Fetch the full cart from the gateway and replace the state.
    ///
    /// On success the snapshot is mirrored into the durable cache. On
    /// gateway failure the state falls back to the cache (or the empty
    /// state) instead of surfacing an error: a transient network failure
    /// must not visibly empty the user's cart.
    #[instrument(skip(self))]
    pub async fn refresh(&self) {
        let generation = self.inner.generation.load(Ordering::Acquire);

        match self.inner.gateway.fetch_cart().await {
            Ok(cart) => {
                if self.superseded(generation) {
                    debug!("discarding refresh result superseded by purge");
                    return;
                }
                self.inner.cache.save(&cart);
                self.publish(cart);
            }
            Err(e) => {
                warn!("cart refresh failed, falling back to cache: {e}");
                if self.superseded(generation) {
                    return;
                }
                let fallback = self.inner.cache.load().unwrap_or_else(CartState::empty);
                self.publish(fallback);
            }
        }
    }

    /// Add a flower to the cart (or increment its line), then refresh.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Validation`] for a zero quantity,
    /// [`CartError::ConcurrentModification`] if another mutation is in
    /// flight, or the gateway failure with the state unchanged.
    #[instrument(skip(self))]
    pub async fn add_line(&self, flower_id: FlowerId, quantity: u32) -> Result<(), CartError> {
        if quantity == 0 {
            return Err(CartError::Validation(
                "quantity must be at least 1".to_owned(),
            ));
        }

        let _guard = self.try_mutate()?;
        self.inner.gateway.add_line(flower_id, quantity).await?;
        self.refresh().await;
        Ok(())
    }

    /// Set a line's quantity, then refresh.
    ///
    /// A request for a quantity below 1 is rejected locally before any
    /// network call; use [`remove_line`](Self::remove_line) to delete.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Validation`] for a quantity below 1,
    /// [`CartError::ConcurrentModification`] if another mutation is in
    /// flight, or the gateway failure with the state unchanged.
    #[instrument(skip(self))]
    pub async fn update_line_quantity(
        &self,
        line_id: CartItemId,
        quantity: i64,
    ) -> Result<(), CartError> {
        if quantity < 1 {
            return Err(CartError::Validation(
                "quantity must be at least 1; remove the line instead".to_owned(),
            ));
        }
        let quantity = u32::try_from(quantity)
            .map_err(|_| CartError::Validation("quantity too large".to_owned()))?;

        let _guard = self.try_mutate()?;
        self.inner.gateway.update_line(line_id, quantity).await?;
        self.refresh().await;
        Ok(())
    }

    /// Remove a line, then refresh.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::ConcurrentModification`] if another mutation
    /// is in flight, or the gateway failure with the state unchanged.
    #[instrument(skip(self))]
    pub async fn remove_line(&self, line_id: CartItemId) -> Result<(), CartError> {
        let _guard = self.try_mutate()?;
        self.inner.gateway.remove_line(line_id).await?;
        self.refresh().await;
        Ok(())
    }

    /// Clear the cart remotely (best-effort) and locally.
    ///
    /// The local state and durable cache always end up empty, regardless
    /// of the remote outcome; a failure to clear remotely after a
    /// completed order is logged, not surfaced. Queues behind an in-flight
    /// mutation rather than being rejected - clearing always wins.
    #[instrument(skip(self))]
    pub async fn clear(&self) {
        let _guard = self.inner.mutation_guard.lock().await;
        self.inner.generation.fetch_add(1, Ordering::AcqRel);

        if let Err(e) = self.inner.gateway.clear_cart().await {
            warn!("failed to clear remote cart: {e}");
        }

        self.inner.cache.clear();
        self.publish(CartState::empty());
    }

    /// Purge the local state and durable cache without touching the
    /// remote cart. Used on logout and credential invalidation, so cart
    /// contents never leak across accounts on a shared device. Always
    /// wins against any in-flight refresh.
    #[instrument(skip(self))]
    pub fn reset(&self) {
        self.inner.generation.fetch_add(1, Ordering::AcqRel);
        self.inner.cache.clear();
        self.publish(CartState::empty());
    }

    fn try_mutate(&self) -> Result<tokio::sync::MutexGuard<'_, ()>, CartError> {
        self.inner
            .mutation_guard
            .try_lock()
            .map_err(|_| CartError::ConcurrentModification)
    }

    fn superseded(&self, generation: u64) -> bool {
        self.inner.generation.load(Ordering::Acquire) != generation
    }

    fn publish(&self, state: CartState) {
        self.inner.state_tx.send_replace(state);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    use crate::api::types::CartLine;
    use crate::cache::MemoryCartCache;
    use rose_shop_core::Price;

    /// Gateway that panics on any call: proves validation and overlap
    /// rejection happen before the network.
    #[derive(Clone)]
    struct UnreachableGateway;

    impl CartGateway for UnreachableGateway {
        async fn fetch_cart(&self) -> Result<CartState, ApiError> {
            panic!("network must not be reached");
        }
        async fn add_line(&self, _: FlowerId, _: u32) -> Result<(), ApiError> {
            panic!("network must not be reached");
        }
        async fn update_line(&self, _: CartItemId, _: u32) -> Result<(), ApiError> {
            panic!("network must not be reached");
        }
        async fn remove_line(&self, _: CartItemId) -> Result<(), ApiError> {
            panic!("network must not be reached");
        }
        async fn clear_cart(&self) -> Result<(), ApiError> {
            panic!("network must not be reached");
        }
    }

    fn sample_cart() -> CartState {
        let unit = Price::vnd(50_000);
        CartState::from_remote(
            vec![CartLine {
                id: CartItemId::new(1),
                flower_id: FlowerId::new(7),
                flower_name: "Red Rose".to_owned(),
                category_name: None,
                image_url: None,
                unit_price: unit,
                quantity: 2,
                line_total: unit.times(2),
            }],
            Price::vnd(0),
            Price::vnd(0),
        )
    }

    #[tokio::test]
    async fn test_update_quantity_below_one_is_rejected_locally() {
        let cart = CartSynchronizer::new(UnreachableGateway, MemoryCartCache::new());

        for quantity in [0, -1] {
            let err = cart
                .update_line_quantity(CartItemId::new(1), quantity)
                .await
                .unwrap_err();
            assert!(matches!(err, CartError::Validation(_)));
        }
        assert!(cart.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_add_zero_quantity_is_rejected_locally() {
        let cart = CartSynchronizer::new(UnreachableGateway, MemoryCartCache::new());
        let err = cart.add_line(FlowerId::new(7), 0).await.unwrap_err();
        assert!(matches!(err, CartError::Validation(_)));
    }

    #[tokio::test]
    async fn test_restore_from_cache_publishes_cached_snapshot() {
        let cache = MemoryCartCache::new();
        cache.save(&sample_cart());

        let cart = CartSynchronizer::new(UnreachableGateway, cache);
        assert!(cart.snapshot().is_empty());

        cart.restore_from_cache();
        assert_eq!(cart.snapshot(), sample_cart());
        assert_eq!(cart.total_quantity(), 2);
    }

    #[tokio::test]
    async fn test_reset_purges_state_and_cache() {
        let cache = MemoryCartCache::new();
        cache.save(&sample_cart());

        let cart = CartSynchronizer::new(UnreachableGateway, cache.clone());
        cart.restore_from_cache();
        assert!(!cart.snapshot().is_empty());

        cart.reset();
        assert!(cart.snapshot().is_empty());
        assert!(cache.load().is_none());
    }
}
