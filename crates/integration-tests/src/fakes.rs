//! In-memory fake of the remote Rose Shop API.
//!
//! One [`FakeGateway`] implements every gateway contract over scripted
//! state: accounts with per-account server carts, a flower price list,
//! vouchers, addresses, and created orders. Failure injection flags and
//! hold points let tests script transport failures and in-flight
//! interleavings deterministically.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::Notify;

use rose_shop_core::{
    AddressId, CartItemId, Email, FlowerId, OrderId, PaymentMethod, Price, UserId,
    UserVoucherStatusId,
};
use rose_shop_storefront::api::types::{
    Address, AddressUpsert, AuthSession, CartLine, CartState, Identity, OrderRequest, OrderResult,
    ProfileUpdate, RegisterRequest, UserProfile, Voucher,
};
use rose_shop_storefront::api::{
    AddressGateway, ApiError, AuthGateway, CartGateway, OrderGateway, VoucherGateway,
};

/// A scripted account known to the fake.
#[derive(Clone)]
pub struct FakeAccount {
    pub username: String,
    pub password: String,
    pub token: String,
    pub identity: Identity,
}

#[derive(Clone)]
struct FakeLine {
    line_id: i64,
    flower_id: FlowerId,
    quantity: u32,
}

#[derive(Default)]
struct FakeState {
    accounts: Vec<FakeAccount>,
    installed_token: Option<String>,
    /// Per-account server carts, keyed by token.
    carts: HashMap<String, Vec<FakeLine>>,
    /// Flower price list: id -> (name, unit price in VND).
    flowers: HashMap<FlowerId, (String, i64)>,
    vouchers: Vec<Voucher>,
    addresses: Vec<Address>,
    orders: Vec<OrderRequest>,
    next_line_id: i64,
    next_order_id: i64,
    next_address_id: i64,
    /// Returned for orders that settle externally.
    payment_url: Option<String>,
    fail_fetch: bool,
    fail_mutations: bool,
    fail_clear: bool,
    fail_order: bool,
    /// Every authenticated call reports an invalid credential.
    reject_credential: bool,
    hold_fetch: Option<Arc<Notify>>,
    hold_mutation: Option<Arc<Notify>>,
}

/// In-memory fake implementing all gateway contracts.
#[derive(Clone, Default)]
pub struct FakeGateway {
    state: Arc<Mutex<FakeState>>,
}

/// Build an identity for scripted accounts.
#[must_use]
pub fn identity(id: i64, username: &str, complete_profile: bool) -> Identity {
    let email = Email::parse(&format!("{username}@example.com")).expect("scripted email is valid");
    Identity {
        user_id: UserId::new(id),
        username: username.to_owned(),
        email,
        profile: complete_profile.then(|| UserProfile {
            full_name: Some(format!("{username} Nguyen")),
            address: Some("12 Hoa Hong, Quan 1, TP HCM".to_owned()),
            phone: None,
            avatar_url: None,
        }),
    }
}

/// A voucher usable right now.
#[must_use]
pub fn voucher(id: i64, code: &str, discount: i64) -> Voucher {
    Voucher {
        user_voucher_status_id: UserVoucherStatusId::new(id),
        code: code.to_owned(),
        discount: Decimal::from(discount),
        description: None,
        end_date: Utc::now() + Duration::days(30),
        usage_limit: Some(5),
        usage_count: Some(0),
        can_use: true,
    }
}

impl FakeGateway {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().expect("fake state poisoned")
    }

    // -------------------------------------------------------------------------
    // Scripting
    // -------------------------------------------------------------------------

    pub fn add_account(&self, account: FakeAccount) {
        let mut state = self.lock();
        state.carts.entry(account.token.clone()).or_default();
        state.accounts.push(account);
    }

    /// Convenience: one account, "lan"/"secret", token "tok-lan".
    pub fn with_default_account(&self) -> FakeAccount {
        let account = FakeAccount {
            username: "lan".to_owned(),
            password: "secret".to_owned(),
            token: "tok-lan".to_owned(),
            identity: identity(1, "lan", true),
        };
        self.add_account(account.clone());
        account
    }

    pub fn stock_flower(&self, id: i64, name: &str, unit_price: i64) {
        self.lock()
            .flowers
            .insert(FlowerId::new(id), (name.to_owned(), unit_price));
    }

    /// Put lines into an account's server cart directly.
    pub fn seed_cart(&self, token: &str, flower_id: i64, quantity: u32) {
        let mut state = self.lock();
        state.next_line_id += 1;
        let line = FakeLine {
            line_id: state.next_line_id,
            flower_id: FlowerId::new(flower_id),
            quantity,
        };
        state.carts.entry(token.to_owned()).or_default().push(line);
    }

    pub fn grant_voucher(&self, voucher: Voucher) {
        self.lock().vouchers.push(voucher);
    }

    pub fn seed_address(&self, description: &str, owner: &str) -> AddressId {
        let mut state = self.lock();
        state.next_address_id += 1;
        let id = AddressId::new(state.next_address_id);
        state.addresses.push(Address {
            address_id: id,
            description: description.to_owned(),
            user_full_name: owner.to_owned(),
            is_deleted: false,
        });
        id
    }

    pub fn set_payment_url(&self, url: &str) {
        self.lock().payment_url = Some(url.to_owned());
    }

    pub fn set_fail_fetch(&self, fail: bool) {
        self.lock().fail_fetch = fail;
    }

    pub fn set_fail_mutations(&self, fail: bool) {
        self.lock().fail_mutations = fail;
    }

    pub fn set_fail_clear(&self, fail: bool) {
        self.lock().fail_clear = fail;
    }

    pub fn set_fail_order(&self, fail: bool) {
        self.lock().fail_order = fail;
    }

    /// Make every authenticated call report an invalid credential.
    pub fn set_reject_credential(&self, reject: bool) {
        self.lock().reject_credential = reject;
    }

    /// Suspend the next `fetch_cart` calls until the returned handle is
    /// notified.
    #[must_use]
    pub fn hold_fetch(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.lock().hold_fetch = Some(Arc::clone(&gate));
        gate
    }

    /// Suspend the next mutation calls until the returned handle is
    /// notified.
    #[must_use]
    pub fn hold_mutation(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.lock().hold_mutation = Some(Arc::clone(&gate));
        gate
    }

    // -------------------------------------------------------------------------
    // Inspection
    // -------------------------------------------------------------------------

    /// Orders created so far.
    #[must_use]
    pub fn orders(&self) -> Vec<OrderRequest> {
        self.lock().orders.clone()
    }

    /// Lines currently in an account's server cart, as (flower, quantity).
    #[must_use]
    pub fn server_cart(&self, token: &str) -> Vec<(FlowerId, u32)> {
        self.lock()
            .carts
            .get(token)
            .map(|lines| lines.iter().map(|l| (l.flower_id, l.quantity)).collect())
            .unwrap_or_default()
    }

    /// The credential currently installed on the gateway, if any.
    #[must_use]
    pub fn installed_token(&self) -> Option<String> {
        self.lock().installed_token.clone()
    }

    /// Addresses that are not soft-deleted.
    #[must_use]
    pub fn live_addresses(&self) -> Vec<Address> {
        self.lock()
            .addresses
            .iter()
            .filter(|a| !a.is_deleted)
            .cloned()
            .collect()
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    fn authed_token(&self) -> Result<String, ApiError> {
        let state = self.lock();
        if state.reject_credential {
            return Err(ApiError::Unauthorized);
        }
        let token = state.installed_token.clone().ok_or(ApiError::Unauthorized)?;
        if state.accounts.iter().any(|a| a.token == token) {
            Ok(token)
        } else {
            Err(ApiError::Unauthorized)
        }
    }

    fn transport_error() -> ApiError {
        ApiError::Api {
            status: 500,
            message: "injected failure".to_owned(),
        }
    }

    fn take_fetch_gate(&self) -> Option<Arc<Notify>> {
        self.lock().hold_fetch.take()
    }

    fn take_mutation_gate(&self) -> Option<Arc<Notify>> {
        self.lock().hold_mutation.take()
    }

    fn build_cart(&self, token: &str) -> CartState {
        let state = self.lock();
        let lines = state
            .carts
            .get(token)
            .map(|lines| {
                lines
                    .iter()
                    .map(|l| {
                        let (name, unit) = state
                            .flowers
                            .get(&l.flower_id)
                            .cloned()
                            .unwrap_or_else(|| ("unknown".to_owned(), 0));
                        let unit_price = Price::vnd(unit);
                        CartLine {
                            id: CartItemId::new(l.line_id),
                            flower_id: l.flower_id,
                            flower_name: name,
                            category_name: None,
                            image_url: None,
                            unit_price,
                            quantity: l.quantity,
                            line_total: unit_price.times(l.quantity),
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();
        CartState::from_remote(lines, Price::vnd(0), Price::vnd(0))
    }
}

// =============================================================================
// Gateway implementations
// =============================================================================

impl AuthGateway for FakeGateway {
    fn install_credential(&self, credential: Option<SecretString>) {
        self.lock().installed_token = credential.map(|t| t.expose_secret().to_owned());
    }

    async fn login(
        &self,
        username_or_email: &str,
        password: &str,
    ) -> Result<AuthSession, ApiError> {
        let state = self.lock();
        state
            .accounts
            .iter()
            .find(|a| {
                (a.username == username_or_email || a.identity.email.as_str() == username_or_email)
                    && a.password == password
            })
            .map(|a| AuthSession {
                identity: a.identity.clone(),
                token: SecretString::from(a.token.clone()),
            })
            .ok_or(ApiError::Unauthorized)
    }

    async fn register(&self, request: &RegisterRequest) -> Result<AuthSession, ApiError> {
        let mut state = self.lock();
        if state.accounts.iter().any(|a| a.username == request.username) {
            return Err(ApiError::Api {
                status: 409,
                message: "username taken".to_owned(),
            });
        }
        let id = i64::try_from(state.accounts.len()).unwrap_or(0) + 100;
        let token = format!("tok-{}", request.username);
        let account = FakeAccount {
            username: request.username.clone(),
            password: request.password.clone(),
            token: token.clone(),
            identity: identity(id, &request.username, false),
        };
        state.carts.entry(token.clone()).or_default();
        let session = AuthSession {
            identity: account.identity.clone(),
            token: SecretString::from(token),
        };
        state.accounts.push(account);
        Ok(session)
    }

    async fn current_identity(&self) -> Result<Identity, ApiError> {
        let token = self.authed_token()?;
        let state = self.lock();
        state
            .accounts
            .iter()
            .find(|a| a.token == token)
            .map(|a| a.identity.clone())
            .ok_or(ApiError::Unauthorized)
    }

    async fn update_profile(&self, update: &ProfileUpdate) -> Result<Identity, ApiError> {
        let token = self.authed_token()?;
        let mut state = self.lock();
        let account = state
            .accounts
            .iter_mut()
            .find(|a| a.token == token)
            .ok_or(ApiError::Unauthorized)?;

        let mut profile = account.identity.profile.clone().unwrap_or_default();
        if update.full_name.is_some() {
            profile.full_name.clone_from(&update.full_name);
        }
        if update.address.is_some() {
            profile.address.clone_from(&update.address);
        }
        if update.phone.is_some() {
            profile.phone.clone_from(&update.phone);
        }
        account.identity.profile = Some(profile);
        Ok(account.identity.clone())
    }
}

impl CartGateway for FakeGateway {
    async fn fetch_cart(&self) -> Result<CartState, ApiError> {
        if let Some(gate) = self.take_fetch_gate() {
            gate.notified().await;
        }
        let token = self.authed_token()?;
        if self.lock().fail_fetch {
            return Err(Self::transport_error());
        }
        Ok(self.build_cart(&token))
    }

    async fn add_line(&self, flower_id: FlowerId, quantity: u32) -> Result<(), ApiError> {
        if let Some(gate) = self.take_mutation_gate() {
            gate.notified().await;
        }
        let token = self.authed_token()?;
        let mut state = self.lock();
        if state.fail_mutations {
            return Err(Self::transport_error());
        }
        state.next_line_id += 1;
        let next_line_id = state.next_line_id;
        let lines = state.carts.entry(token).or_default();
        if let Some(line) = lines.iter_mut().find(|l| l.flower_id == flower_id) {
            line.quantity += quantity;
        } else {
            lines.push(FakeLine {
                line_id: next_line_id,
                flower_id,
                quantity,
            });
        }
        Ok(())
    }

    async fn update_line(&self, line_id: CartItemId, quantity: u32) -> Result<(), ApiError> {
        if let Some(gate) = self.take_mutation_gate() {
            gate.notified().await;
        }
        let token = self.authed_token()?;
        let mut state = self.lock();
        if state.fail_mutations {
            return Err(Self::transport_error());
        }
        let lines = state.carts.entry(token).or_default();
        let line = lines
            .iter_mut()
            .find(|l| l.line_id == line_id.as_i64())
            .ok_or_else(|| ApiError::NotFound(format!("cart line {line_id}")))?;
        line.quantity = quantity;
        Ok(())
    }

    async fn remove_line(&self, line_id: CartItemId) -> Result<(), ApiError> {
        let token = self.authed_token()?;
        let mut state = self.lock();
        if state.fail_mutations {
            return Err(Self::transport_error());
        }
        let lines = state.carts.entry(token).or_default();
        lines.retain(|l| l.line_id != line_id.as_i64());
        Ok(())
    }

    async fn clear_cart(&self) -> Result<(), ApiError> {
        let token = self.authed_token()?;
        let mut state = self.lock();
        if state.fail_clear {
            return Err(Self::transport_error());
        }
        state.carts.insert(token, Vec::new());
        Ok(())
    }
}

impl VoucherGateway for FakeGateway {
    async fn validate_voucher(&self, code: &str) -> Result<Voucher, ApiError> {
        self.authed_token()?;
        let state = self.lock();
        state
            .vouchers
            .iter()
            .find(|v| v.code == code)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("voucher {code}")))
    }

    async fn list_vouchers(&self) -> Result<Vec<Voucher>, ApiError> {
        self.authed_token()?;
        Ok(self.lock().vouchers.clone())
    }
}

impl AddressGateway for FakeGateway {
    async fn list_addresses(&self) -> Result<Vec<Address>, ApiError> {
        self.authed_token()?;
        Ok(self.lock().addresses.clone())
    }

    async fn upsert_address(&self, upsert: &AddressUpsert) -> Result<Address, ApiError> {
        let token = self.authed_token()?;
        let mut state = self.lock();

        if let Some(id) = upsert.address_id {
            let address = state
                .addresses
                .iter_mut()
                .find(|a| a.address_id == id)
                .ok_or_else(|| ApiError::NotFound(format!("address {id}")))?;
            address.description.clone_from(&upsert.description);
            address.is_deleted = upsert.is_deleted;
            return Ok(address.clone());
        }

        let owner = state
            .accounts
            .iter()
            .find(|a| a.token == token)
            .map(|a| a.username.clone())
            .unwrap_or_default();
        state.next_address_id += 1;
        let address = Address {
            address_id: AddressId::new(state.next_address_id),
            description: upsert.description.clone(),
            user_full_name: owner,
            is_deleted: false,
        };
        state.addresses.push(address.clone());
        Ok(address)
    }
}

impl OrderGateway for FakeGateway {
    async fn create_order(&self, request: &OrderRequest) -> Result<OrderResult, ApiError> {
        self.authed_token()?;
        let mut state = self.lock();
        if state.fail_order {
            return Err(Self::transport_error());
        }
        state.next_order_id += 1;
        state.orders.push(request.clone());
        let payment_url = (request.payment_method == PaymentMethod::Vnpay)
            .then(|| state.payment_url.clone())
            .flatten();
        Ok(OrderResult {
            order_id: OrderId::new(state.next_order_id),
            payment_url,
        })
    }
}
