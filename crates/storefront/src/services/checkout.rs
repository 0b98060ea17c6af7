//! Checkout orchestration: order submission, vouchers, and the address
//! book.
//!
//! Two entry modes share the submission path: a regular cart checkout
//! operating on the synchronizer's current state, and a "buy now"
//! checkout carrying a single transient line that only touches the remote
//! cart at submission time.

use std::sync::LazyLock;

use chrono::Utc;
use regex::Regex;
use thiserror::Error;
use tracing::{info, instrument, warn};

use rose_shop_core::{AddressId, CurrencyCode, DeliveryMethod, OrderId, PaymentMethod, Price};

use crate::api::types::{
    Address, AddressUpsert, BuyNowLine, CartLine, OrderRequest, Voucher,
};
use crate::api::{AddressGateway, ApiError, CartGateway, OrderGateway, VoucherGateway};
use crate::cache::CartCache;
use crate::services::cart::CartSynchronizer;

/// Standard delivery fee in VND.
const STANDARD_SHIPPING_FEE: i64 = 30_000;

/// Minimum length of an address description.
const MIN_ADDRESS_LENGTH: usize = 10;

/// Accepted phone number shape: digits plus common separators.
static PHONE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9+\-\s()]+$").expect("literal pattern compiles"));

/// Errors that can occur during checkout.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Cart checkout with zero lines.
    #[error("cart is empty")]
    EmptyCart,

    /// Malformed local input, rejected before any network call.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The voucher cannot become the active selection.
    #[error("voucher cannot be applied: {0}")]
    Voucher(String),

    /// The remote API refused to create the order. The cart is unchanged,
    /// so the user can retry.
    #[error("order creation failed: {0}")]
    OrderCreation(#[source] ApiError),

    /// Deleting the owner's last remaining address.
    #[error("cannot delete the last remaining address")]
    LastAddress,

    /// Remote API failure outside order creation.
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// What the user still has to pay and how it breaks down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutQuote {
    /// Sum of line totals.
    pub subtotal: Price,
    /// Delivery fee.
    pub shipping: Price,
    /// Voucher discount on the subtotal.
    pub discount: Price,
    /// `subtotal + shipping - discount`.
    pub total: Price,
}

/// Validated checkout form fields.
#[derive(Debug, Clone)]
pub struct CheckoutForm {
    /// Contact phone number.
    pub phone_number: String,
    /// Selected delivery address.
    pub address_id: Option<AddressId>,
    /// Chosen payment method.
    pub payment_method: Option<PaymentMethod>,
    /// Chosen delivery method.
    pub delivery_method: DeliveryMethod,
}

/// The result of a submitted checkout.
#[derive(Debug, Clone)]
pub enum CheckoutOutcome {
    /// The order is placed and settled; the cart has been cleared.
    Placed {
        /// The new order's ID.
        order_id: OrderId,
    },
    /// The order is created but payment happens on an external page. The
    /// cart is cleared by
    /// [`finish_external_payment`](CheckoutOrchestrator::finish_external_payment)
    /// once that completes.
    AwaitingPayment {
        /// The new order's ID.
        order_id: OrderId,
        /// Hosted payment page to redirect to.
        payment_url: String,
    },
}

/// Orchestrates order submission and its satellites (vouchers, addresses).
pub struct CheckoutOrchestrator<G, C> {
    gateway: G,
    cart: CartSynchronizer<G, C>,
}

impl<G: Clone, C> Clone for CheckoutOrchestrator<G, C> {
    fn clone(&self) -> Self {
        Self {
            gateway: self.gateway.clone(),
            cart: self.cart.clone(),
        }
    }
}

impl<G, C> CheckoutOrchestrator<G, C>
where
    G: CartGateway + VoucherGateway + AddressGateway + OrderGateway + Clone,
    C: CartCache,
{
    /// Create an orchestrator over the given gateway and cart.
    pub const fn new(gateway: G, cart: CartSynchronizer<G, C>) -> Self {
        Self { gateway, cart }
    }

    // =========================================================================
    // Vouchers
    // =========================================================================

    /// Validate a voucher code and return it as the active selection.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::Voucher`] if the code fails remote
    /// validation, is expired, or has reached its usage limit - an
    /// ineligible voucher can never become the active selection.
    #[instrument(skip(self))]
    pub async fn select_voucher(&self, code: &str) -> Result<Voucher, CheckoutError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(CheckoutError::Validation(
                "enter a voucher code".to_owned(),
            ));
        }

        let voucher = self
            .gateway
            .validate_voucher(code)
            .await
            .map_err(|e| match e {
                ApiError::Unauthorized => CheckoutError::Api(ApiError::Unauthorized),
                other => CheckoutError::Voucher(other.to_string()),
            })?;

        let now = Utc::now();
        if voucher.is_expired(now) {
            return Err(CheckoutError::Voucher(format!("{code} has expired")));
        }
        if voucher.is_exhausted() {
            return Err(CheckoutError::Voucher(format!(
                "{code} has reached its usage limit"
            )));
        }
        if !voucher.can_use {
            return Err(CheckoutError::Voucher(format!("{code} is not available")));
        }

        Ok(voucher)
    }

    /// List vouchers granted to the current user.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn available_vouchers(&self) -> Result<Vec<Voucher>, CheckoutError> {
        Ok(self.gateway.list_vouchers().await?)
    }

    // =========================================================================
    // Submission
    // =========================================================================

    /// Submit a cart checkout.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::EmptyCart`] when the cart has zero lines,
    /// [`CheckoutError::Validation`] for missing or malformed fields, and
    /// [`CheckoutError::OrderCreation`] when the remote API refuses the
    /// order - in which case the cart is left untouched.
    #[instrument(skip(self, form, voucher))]
    pub async fn submit(
        &self,
        form: &CheckoutForm,
        voucher: Option<&Voucher>,
    ) -> Result<CheckoutOutcome, CheckoutError> {
        let (address_id, payment_method) = validate_form(form)?;

        if self.cart.snapshot().is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        self.create_and_settle(form, address_id, payment_method, voucher)
            .await
    }

    /// Submit a buy-now checkout for a single transient line.
    ///
    /// The line is added to the remote cart at submission time so order
    /// creation can treat it uniformly; it never appears in the local
    /// [`CartState`](crate::api::types::CartState) beforehand. To keep the
    /// purchase isolated, submission is refused while the remote cart
    /// still holds other lines.
    ///
    /// # Errors
    ///
    /// As [`submit`](Self::submit), plus [`CheckoutError::Validation`]
    /// when the remote cart is not empty.
    #[instrument(skip(self, line, form, voucher), fields(flower_id = %line.flower_id))]
    pub async fn submit_buy_now(
        &self,
        line: &BuyNowLine,
        form: &CheckoutForm,
        voucher: Option<&Voucher>,
    ) -> Result<CheckoutOutcome, CheckoutError> {
        let (address_id, payment_method) = validate_form(form)?;

        if line.quantity == 0 {
            return Err(CheckoutError::Validation(
                "quantity must be at least 1".to_owned(),
            ));
        }

        let remote = self.gateway.fetch_cart().await?;
        if !remote.is_empty() {
            return Err(CheckoutError::Validation(
                "cart must be empty for a direct purchase; use the regular checkout".to_owned(),
            ));
        }

        self.gateway.add_line(line.flower_id, line.quantity).await?;

        self.create_and_settle(form, address_id, payment_method, voucher)
            .await
    }

    async fn create_and_settle(
        &self,
        form: &CheckoutForm,
        address_id: AddressId,
        payment_method: PaymentMethod,
        voucher: Option<&Voucher>,
    ) -> Result<CheckoutOutcome, CheckoutError> {
        // A selection that went stale since it was validated is dropped,
        // never a blocker: the user simply has no discount applied.
        let voucher = voucher.filter(|v| {
            let eligible = v.is_eligible(Utc::now());
            if !eligible {
                warn!(code = %v.code, "dropping ineligible voucher selection");
            }
            eligible
        });

        let request = OrderRequest {
            phone_number: form.phone_number.clone(),
            payment_method,
            delivery_method: form.delivery_method,
            address_id,
            user_voucher_status_id: voucher.map(|v| v.user_voucher_status_id),
        };

        let order = self
            .gateway
            .create_order(&request)
            .await
            .map_err(|e| match e {
                ApiError::Unauthorized => CheckoutError::Api(ApiError::Unauthorized),
                other => CheckoutError::OrderCreation(other),
            })?;

        info!(order_id = %order.order_id, "order created");

        if !payment_method.settles_immediately()
            && let Some(payment_url) = order.payment_url
        {
            // Clearing is deferred to the callback after the external
            // payment completes.
            return Ok(CheckoutOutcome::AwaitingPayment {
                order_id: order.order_id,
                payment_url,
            });
        }

        // Settled at creation: clear the cart now, best-effort.
        self.cart.clear().await;

        Ok(CheckoutOutcome::Placed {
            order_id: order.order_id,
        })
    }

    /// Callback for a completed external payment: clear the cart that the
    /// submitted order consumed.
    #[instrument(skip(self))]
    pub async fn finish_external_payment(&self) {
        self.cart.clear().await;
    }

    // =========================================================================
    // Address book
    // =========================================================================

    /// List the user's non-deleted addresses.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn list_addresses(&self) -> Result<Vec<Address>, CheckoutError> {
        let addresses = self.gateway.list_addresses().await?;
        Ok(addresses.into_iter().filter(|a| !a.is_deleted).collect())
    }

    /// Create a new address.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::Validation`] for a description shorter
    /// than 10 characters.
    #[instrument(skip(self, description))]
    pub async fn add_address(&self, description: &str) -> Result<Address, CheckoutError> {
        let description = description.trim();
        if description.len() < MIN_ADDRESS_LENGTH {
            return Err(CheckoutError::Validation(format!(
                "address must be at least {MIN_ADDRESS_LENGTH} characters"
            )));
        }

        Ok(self
            .gateway
            .upsert_address(&AddressUpsert {
                address_id: None,
                description: description.to_owned(),
                is_deleted: false,
            })
            .await?)
    }

    /// Soft-delete an address.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::LastAddress`] when it is the owner's last
    /// remaining address - a checkout in progress must always have a
    /// destination left to reference.
    #[instrument(skip(self))]
    pub async fn delete_address(&self, address_id: AddressId) -> Result<(), CheckoutError> {
        let addresses = self.list_addresses().await?;

        if addresses.len() <= 1 {
            return Err(CheckoutError::LastAddress);
        }

        let target = addresses
            .into_iter()
            .find(|a| a.address_id == address_id)
            .ok_or_else(|| ApiError::NotFound(format!("address {address_id}")))?;

        self.gateway
            .upsert_address(&AddressUpsert {
                address_id: Some(target.address_id),
                description: target.description,
                is_deleted: true,
            })
            .await?;

        Ok(())
    }
}

/// Compute the displayed totals for a set of lines and an optional voucher
/// selection.
#[must_use]
pub fn quote(lines: &[CartLine], voucher: Option<&Voucher>) -> CheckoutQuote {
    let currency = lines
        .first()
        .map_or(CurrencyCode::VND, |l| l.unit_price.currency_code);
    let subtotal = lines
        .iter()
        .fold(Price::zero(currency), |acc, line| acc.plus(line.line_total));
    let shipping = Price::vnd(STANDARD_SHIPPING_FEE);
    let discount = voucher.map_or_else(|| Price::zero(currency), |v| subtotal.percent(v.discount));
    CheckoutQuote {
        subtotal,
        shipping,
        discount,
        total: subtotal.plus(shipping).minus(discount),
    }
}

fn validate_form(form: &CheckoutForm) -> Result<(AddressId, PaymentMethod), CheckoutError> {
    let phone = form.phone_number.trim();
    if phone.is_empty() || !PHONE_PATTERN.is_match(phone) {
        return Err(CheckoutError::Validation(
            "enter a valid phone number".to_owned(),
        ));
    }

    let address_id = form.address_id.ok_or_else(|| {
        CheckoutError::Validation("select a delivery address".to_owned())
    })?;

    let payment_method = form.payment_method.ok_or_else(|| {
        CheckoutError::Validation("select a payment method".to_owned())
    })?;

    Ok((address_id, payment_method))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    use chrono::Duration;
    use rust_decimal::Decimal;

    use rose_shop_core::{CartItemId, FlowerId, UserVoucherStatusId};

    fn line(qty: u32, unit: i64) -> CartLine {
        let unit = Price::vnd(unit);
        CartLine {
            id: CartItemId::new(1),
            flower_id: FlowerId::new(7),
            flower_name: "Red Rose".to_owned(),
            category_name: None,
            image_url: None,
            unit_price: unit,
            quantity: qty,
            line_total: unit.times(qty),
        }
    }

    fn voucher(discount: i64) -> Voucher {
        Voucher {
            user_voucher_status_id: UserVoucherStatusId::new(1),
            code: "SPRING10".to_owned(),
            discount: Decimal::from(discount),
            description: None,
            end_date: Utc::now() + Duration::days(7),
            usage_limit: None,
            usage_count: None,
            can_use: true,
        }
    }

    #[test]
    fn test_quote_without_voucher() {
        let q = quote(&[line(2, 50_000)], None);
        assert_eq!(q.subtotal, Price::vnd(100_000));
        assert_eq!(q.shipping, Price::vnd(30_000));
        assert!(q.discount.is_zero());
        assert_eq!(q.total, Price::vnd(130_000));
    }

    #[test]
    fn test_quote_with_ten_percent_voucher() {
        let q = quote(&[line(4, 50_000)], Some(&voucher(10)));
        assert_eq!(q.subtotal, Price::vnd(200_000));
        assert_eq!(q.discount, Price::vnd(20_000));
        assert_eq!(q.total, Price::vnd(210_000));
    }

    #[test]
    fn test_validate_form_rejects_bad_phone() {
        let mut form = CheckoutForm {
            phone_number: "09x12".to_owned(),
            address_id: Some(AddressId::new(1)),
            payment_method: Some(PaymentMethod::Cod),
            delivery_method: DeliveryMethod::Standard,
        };
        assert!(matches!(
            validate_form(&form),
            Err(CheckoutError::Validation(_))
        ));

        form.phone_number = "  ".to_owned();
        assert!(matches!(
            validate_form(&form),
            Err(CheckoutError::Validation(_))
        ));

        form.phone_number = "+84 (28) 3823-4567".to_owned();
        assert!(validate_form(&form).is_ok());
    }

    #[test]
    fn test_validate_form_requires_address_and_payment() {
        let form = CheckoutForm {
            phone_number: "0912345678".to_owned(),
            address_id: None,
            payment_method: Some(PaymentMethod::Cod),
            delivery_method: DeliveryMethod::Standard,
        };
        assert!(matches!(
            validate_form(&form),
            Err(CheckoutError::Validation(_))
        ));

        let form = CheckoutForm {
            phone_number: "0912345678".to_owned(),
            address_id: Some(AddressId::new(1)),
            payment_method: None,
            delivery_method: DeliveryMethod::Standard,
        };
        assert!(matches!(
            validate_form(&form),
            Err(CheckoutError::Validation(_))
        ));
    }
}
