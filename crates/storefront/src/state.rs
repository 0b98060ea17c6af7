//! The storefront facade: one object owning the session, cart, and
//! checkout components, and the wiring between them.
//!
//! Identity transitions have mandatory cart reactions (login/restore →
//! refresh, logout/invalidation → purge). The facade awaits those
//! reactions inline so their ordering is deterministic, and it is the
//! single place where a credential-invalidation signal from any gateway
//! call forces a logout.

use tracing::{instrument, warn};

use rose_shop_core::{AddressId, CartItemId, FlowerId};

use crate::api::types::{
    Address, BuyNowLine, CartState, Identity, ProfileUpdate, RegisterRequest, Voucher,
};
use crate::api::{
    AddressGateway, ApiClient, AuthGateway, CartGateway, OrderGateway, VoucherGateway,
};
use crate::cache::{CartCache, JsonFileCache};
use crate::config::StorefrontConfig;
use crate::credentials::{CredentialStore, FileCredentialStore};
use crate::error::{Result, StorefrontError};
use crate::services::cart::CartSynchronizer;
use crate::services::checkout::{CheckoutForm, CheckoutOrchestrator, CheckoutOutcome};
use crate::services::session::SessionStore;

/// The production storefront: HTTP gateway, JSON-file cache and
/// credential store.
pub type LiveStorefront = Storefront<ApiClient, JsonFileCache, FileCredentialStore>;

/// Facade over the storefront components.
///
/// Cheaply cloneable; all clones share the same underlying state.
pub struct Storefront<G, C, H> {
    gateway: G,
    session: SessionStore<G, H>,
    cart: CartSynchronizer<G, C>,
    checkout: CheckoutOrchestrator<G, C>,
}

impl<G: Clone, C, H> Clone for Storefront<G, C, H> {
    fn clone(&self) -> Self {
        Self {
            gateway: self.gateway.clone(),
            session: self.session.clone(),
            cart: self.cart.clone(),
            checkout: self.checkout.clone(),
        }
    }
}

impl LiveStorefront {
    /// Build the production stack from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: &StorefrontConfig) -> Result<Self> {
        let client = ApiClient::new(config)?;
        let cache = JsonFileCache::new(config.cart_cache_path());
        let credentials = FileCredentialStore::new(config.credential_path());
        Ok(Self::new(client, cache, credentials))
    }
}

impl<G, C, H> Storefront<G, C, H>
where
    G: AuthGateway + CartGateway + VoucherGateway + AddressGateway + OrderGateway + Clone,
    C: CartCache,
    H: CredentialStore,
{
    /// Assemble a storefront from its collaborators.
    pub fn new(gateway: G, cache: C, credentials: H) -> Self {
        let session = SessionStore::new(gateway.clone(), credentials);
        let cart = CartSynchronizer::new(gateway.clone(), cache);
        let checkout = CheckoutOrchestrator::new(gateway.clone(), cart.clone());
        Self {
            gateway,
            session,
            cart,
            checkout,
        }
    }

    /// The shared gateway (e.g. for the read-only catalog surface).
    #[must_use]
    pub const fn gateway(&self) -> &G {
        &self.gateway
    }

    /// The session component (read access and subscriptions).
    #[must_use]
    pub const fn session(&self) -> &SessionStore<G, H> {
        &self.session
    }

    /// The cart component (read access and subscriptions).
    #[must_use]
    pub const fn cart(&self) -> &CartSynchronizer<G, C> {
        &self.cart
    }

    /// The checkout component.
    #[must_use]
    pub const fn checkout(&self) -> &CheckoutOrchestrator<G, C> {
        &self.checkout
    }

    // =========================================================================
    // Startup
    // =========================================================================

    /// Start the storefront: publish the cached cart immediately, then
    /// restore the persisted session and bring the cart in line with it.
    #[instrument(skip(self))]
    pub async fn start(&self) -> Option<Identity> {
        self.cart.restore_from_cache();
        let had_credential = self.session.has_persisted_credential();

        match self.session.restore().await {
            Some(identity) => {
                self.cart.refresh().await;
                Some(identity)
            }
            None => {
                // A credential that failed to restore must not leave
                // stale cart data visible or cached. An anonymous start
                // keeps the cached snapshot.
                if had_credential {
                    self.cart.reset();
                }
                None
            }
        }
    }

    // =========================================================================
    // Session operations (with mandatory cart reactions)
    // =========================================================================

    /// Log in and load the account's cart, discarding any prior local
    /// snapshot from a different identity.
    ///
    /// # Errors
    ///
    /// Returns the session failure; the cart is untouched on error.
    #[instrument(skip(self, password))]
    pub async fn login(&self, username_or_email: &str, password: &str) -> Result<Identity> {
        let identity = self.session.login(username_or_email, password).await?;
        self.cart.refresh().await;
        Ok(identity)
    }

    /// Register a new account; otherwise identical contract to
    /// [`login`](Self::login).
    ///
    /// # Errors
    ///
    /// Returns the session failure; the cart is untouched on error.
    #[instrument(skip(self, request))]
    pub async fn register(&self, request: &RegisterRequest) -> Result<Identity> {
        let identity = self.session.register(request).await?;
        self.cart.refresh().await;
        Ok(identity)
    }

    /// Log out: discard the credential, clear the identity, then purge
    /// the cart (memory and durable cache). The ordering is mandatory -
    /// a populated cart must never remain under a cleared identity.
    #[instrument(skip(self))]
    pub fn logout(&self) {
        self.session.logout();
        self.cart.reset();
    }

    /// Update the current profile.
    ///
    /// # Errors
    ///
    /// Returns the session failure. An expired credential forces a
    /// logout, like any other gateway call.
    #[instrument(skip(self, update))]
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<Identity> {
        let result = self.session.update_profile(update).await;
        self.guard(result.map_err(StorefrontError::from))
    }

    // =========================================================================
    // Cart operations
    // =========================================================================

    /// Add a flower to the cart.
    ///
    /// # Errors
    ///
    /// Returns the cart failure with the state unchanged.
    pub async fn add_to_cart(&self, flower_id: FlowerId, quantity: u32) -> Result<()> {
        let result = self.cart.add_line(flower_id, quantity).await;
        self.guard(result.map_err(StorefrontError::from))
    }

    /// Set a cart line's quantity.
    ///
    /// # Errors
    ///
    /// Returns the cart failure with the state unchanged.
    pub async fn update_cart_line(&self, line_id: CartItemId, quantity: i64) -> Result<()> {
        let result = self.cart.update_line_quantity(line_id, quantity).await;
        self.guard(result.map_err(StorefrontError::from))
    }

    /// Remove a cart line.
    ///
    /// # Errors
    ///
    /// Returns the cart failure with the state unchanged.
    pub async fn remove_cart_line(&self, line_id: CartItemId) -> Result<()> {
        let result = self.cart.remove_line(line_id).await;
        self.guard(result.map_err(StorefrontError::from))
    }

    /// Clear the cart remotely (best-effort) and locally.
    pub async fn clear_cart(&self) {
        self.cart.clear().await;
    }

    /// The current cart snapshot.
    #[must_use]
    pub fn cart_snapshot(&self) -> CartState {
        self.cart.snapshot()
    }

    // =========================================================================
    // Checkout operations
    // =========================================================================

    /// Validate a voucher code as the active selection.
    ///
    /// # Errors
    ///
    /// Returns the checkout failure (non-fatal; submit without a
    /// selection to proceed undiscounted).
    pub async fn select_voucher(&self, code: &str) -> Result<Voucher> {
        let result = self.checkout.select_voucher(code).await;
        self.guard(result.map_err(StorefrontError::from))
    }

    /// Submit a cart checkout.
    ///
    /// # Errors
    ///
    /// Returns the checkout failure; the cart is unchanged so the user
    /// can retry.
    pub async fn submit_checkout(
        &self,
        form: &CheckoutForm,
        voucher: Option<&Voucher>,
    ) -> Result<CheckoutOutcome> {
        let result = self.checkout.submit(form, voucher).await;
        self.guard(result.map_err(StorefrontError::from))
    }

    /// Submit a buy-now checkout for a single transient line.
    ///
    /// # Errors
    ///
    /// As [`submit_checkout`](Self::submit_checkout).
    pub async fn submit_buy_now(
        &self,
        line: &BuyNowLine,
        form: &CheckoutForm,
        voucher: Option<&Voucher>,
    ) -> Result<CheckoutOutcome> {
        let result = self.checkout.submit_buy_now(line, form, voucher).await;
        self.guard(result.map_err(StorefrontError::from))
    }

    /// Callback for a completed external payment.
    pub async fn finish_external_payment(&self) {
        self.checkout.finish_external_payment().await;
    }

    /// List the user's non-deleted addresses.
    ///
    /// # Errors
    ///
    /// Returns the checkout failure.
    pub async fn list_addresses(&self) -> Result<Vec<Address>> {
        let result = self.checkout.list_addresses().await;
        self.guard(result.map_err(StorefrontError::from))
    }

    /// Create a new address.
    ///
    /// # Errors
    ///
    /// Returns the checkout failure.
    pub async fn add_address(&self, description: &str) -> Result<Address> {
        let result = self.checkout.add_address(description).await;
        self.guard(result.map_err(StorefrontError::from))
    }

    /// Soft-delete an address, refusing to drop the last one.
    ///
    /// # Errors
    ///
    /// Returns the checkout failure.
    pub async fn delete_address(&self, address_id: AddressId) -> Result<()> {
        let result = self.checkout.delete_address(address_id).await;
        self.guard(result.map_err(StorefrontError::from))
    }

    // =========================================================================
    // Forced logout
    // =========================================================================

    /// Inspect a failed operation for the credential-invalidation signal.
    ///
    /// A bad or expired credential detected on any gateway call - not
    /// just auth calls - forces a logout and cart purge before the error
    /// is surfaced.
    fn guard<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(error) = &result
            && error.is_credential_invalidation()
            && self.session.is_authenticated()
        {
            warn!("gateway reported an invalid credential; forcing logout");
            self.session.invalidate();
            self.cart.reset();
        }
        result
    }
}
