//! Domain types for the Rose Shop remote API.
//!
//! These types provide a clean, ergonomic surface separate from the raw
//! JSON wire shapes (see [`super::wire`]).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use rose_shop_core::{
    AddressId, CartItemId, CategoryId, CurrencyCode, DeliveryMethod, Email, FlowerId, OrderId,
    PaymentMethod, Price, UserId, UserVoucherStatusId,
};

// =============================================================================
// Identity
// =============================================================================

/// Profile details attached to an [`Identity`].
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UserProfile {
    /// Full legal name used on deliveries.
    pub full_name: Option<String>,
    /// Free-text home address.
    pub address: Option<String>,
    /// Contact phone number.
    pub phone: Option<String>,
    /// Avatar image URL.
    pub avatar_url: Option<String>,
}

/// The signed-in user.
///
/// Replaced wholesale on every successful auth operation; there is never
/// more than one current `Identity`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    /// Unique user ID.
    pub user_id: UserId,
    /// Login / display name.
    pub username: String,
    /// Email address.
    pub email: Email,
    /// Profile details, absent until the user fills them in.
    pub profile: Option<UserProfile>,
}

impl Identity {
    /// Whether the profile carries the fields checkout requires (a
    /// non-blank full name and address).
    #[must_use]
    pub fn has_complete_profile(&self) -> bool {
        self.profile.as_ref().is_some_and(|p| {
            let filled = |s: &Option<String>| s.as_deref().is_some_and(|v| !v.trim().is_empty());
            filled(&p.full_name) && filled(&p.address)
        })
    }
}

/// A successful credential exchange: the identity plus the opaque token
/// the remote API issued for it.
#[derive(Debug, Clone)]
pub struct AuthSession {
    /// The authenticated identity.
    pub identity: Identity,
    /// Opaque bearer token.
    pub token: secrecy::SecretString,
}

/// Fields for creating a new account.
#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    /// Desired login name.
    pub username: String,
    /// Email address.
    pub email: Email,
    /// Plain-text password, sent over TLS to the remote API.
    pub password: String,
}

/// A partial profile mutation. `None` fields are left untouched.
#[derive(Debug, Clone, Serialize, Default)]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
}

// =============================================================================
// Cart
// =============================================================================

/// A line item in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    /// Cart line ID, unique within the cart.
    pub id: CartItemId,
    /// The flower this line refers to.
    pub flower_id: FlowerId,
    /// Display name.
    pub flower_name: String,
    /// Category display name.
    pub category_name: Option<String>,
    /// Product image URL.
    pub image_url: Option<String>,
    /// Price per unit.
    pub unit_price: Price,
    /// Quantity, always >= 1.
    pub quantity: u32,
    /// Line total (= unit price × quantity), as provided by the remote API.
    pub line_total: Price,
}

/// Aggregate counts and monetary totals for a cart.
///
/// Always derived from the line sequence via [`CartState`] constructors;
/// never mutated independently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartSummary {
    /// Sum of line quantities.
    pub total_quantity: u32,
    /// Number of distinct lines.
    pub total_lines: u32,
    /// Sum of line totals, before discount and shipping.
    pub subtotal: Price,
    /// Discount applied by the remote API.
    pub discount: Price,
    /// Shipping fee.
    pub shipping: Price,
    /// `subtotal + shipping - discount`.
    pub total: Price,
}

impl CartSummary {
    fn zero() -> Self {
        let zero = Price::zero(CurrencyCode::default());
        Self {
            total_quantity: 0,
            total_lines: 0,
            subtotal: zero,
            discount: zero,
            shipping: zero,
            total: zero,
        }
    }
}

/// The authoritative cart snapshot: an ordered line sequence plus its
/// derived summary.
///
/// Constructed only through [`CartState::empty`] and [`CartState::from_remote`],
/// which derive the summary counts from the lines — the summary can never
/// disagree with the line sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartState {
    lines: Vec<CartLine>,
    summary: CartSummary,
}

impl CartState {
    /// The empty cart: zero lines, zero summary.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            lines: Vec::new(),
            summary: CartSummary::zero(),
        }
    }

    /// Build a cart snapshot from remote-provided lines and monetary
    /// adjustments. Counts and the subtotal are derived from the lines;
    /// discount and shipping are taken as the remote reported them.
    #[must_use]
    pub fn from_remote(lines: Vec<CartLine>, discount: Price, shipping: Price) -> Self {
        let currency = lines
            .first()
            .map_or_else(CurrencyCode::default, |l| l.unit_price.currency_code);
        let subtotal = lines
            .iter()
            .fold(Price::zero(currency), |acc, line| acc.plus(line.line_total));
        let summary = CartSummary {
            total_quantity: lines.iter().map(|l| l.quantity).sum(),
            total_lines: u32::try_from(lines.len()).unwrap_or(u32::MAX),
            subtotal,
            discount,
            shipping,
            total: subtotal.plus(shipping).minus(discount),
        };
        Self { lines, summary }
    }

    /// Re-derive the summary from the stored lines. Used when a snapshot
    /// comes from an untrusted source (the durable cache) and its counts
    /// must be made consistent again.
    #[must_use]
    pub fn normalized(self) -> Self {
        let (discount, shipping) = (self.summary.discount, self.summary.shipping);
        Self::from_remote(self.lines, discount, shipping)
    }

    /// The ordered line sequence.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// The derived summary.
    #[must_use]
    pub const fn summary(&self) -> &CartSummary {
        &self.summary
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total quantity across all lines.
    #[must_use]
    pub const fn total_quantity(&self) -> u32 {
        self.summary.total_quantity
    }
}

// =============================================================================
// Vouchers
// =============================================================================

/// A discount voucher granted to the current user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Voucher {
    /// The user's grant of this voucher (sent with the order).
    pub user_voucher_status_id: UserVoucherStatusId,
    /// The voucher code.
    pub code: String,
    /// Percentage discount on the subtotal (e.g. 10 for 10% off).
    pub discount: Decimal,
    /// Human-readable description.
    pub description: Option<String>,
    /// Expiry timestamp.
    pub end_date: DateTime<Utc>,
    /// Maximum number of uses, if limited.
    pub usage_limit: Option<u32>,
    /// Uses so far.
    pub usage_count: Option<u32>,
    /// Remote eligibility verdict.
    pub can_use: bool,
}

impl Voucher {
    /// Whether the voucher expired before `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.end_date < now
    }

    /// Whether the usage limit has been reached.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        match (self.usage_count, self.usage_limit) {
            (Some(count), Some(limit)) => count >= limit,
            _ => false,
        }
    }

    /// Whether this voucher may become the active selection.
    #[must_use]
    pub fn is_eligible(&self, now: DateTime<Utc>) -> bool {
        self.can_use && !self.is_expired(now) && !self.is_exhausted()
    }
}

// =============================================================================
// Addresses
// =============================================================================

/// A delivery destination owned by the current user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Address {
    /// Address ID.
    pub address_id: AddressId,
    /// Free-text destination (street, district, city, province).
    pub description: String,
    /// Owner's display name, as shown on the delivery label.
    pub user_full_name: String,
    /// Soft-delete flag.
    #[serde(default)]
    pub is_deleted: bool,
}

/// Input for creating or updating an address. Deletion is an upsert with
/// `is_deleted` set.
#[derive(Debug, Clone, Serialize)]
pub struct AddressUpsert {
    /// Existing address to update, or `None` to create.
    pub address_id: Option<AddressId>,
    /// Free-text destination.
    pub description: String,
    /// Soft-delete flag.
    pub is_deleted: bool,
}

// =============================================================================
// Orders
// =============================================================================

/// Input for creating an order from the remote cart's current contents.
#[derive(Debug, Clone, Serialize)]
pub struct OrderRequest {
    /// Contact phone number.
    pub phone_number: String,
    /// How the order is paid.
    pub payment_method: PaymentMethod,
    /// How the order is delivered.
    pub delivery_method: DeliveryMethod,
    /// Selected delivery address.
    pub address_id: AddressId,
    /// Applied voucher grant, if any.
    pub user_voucher_status_id: Option<UserVoucherStatusId>,
}

/// A created order.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderResult {
    /// The new order's ID.
    pub order_id: OrderId,
    /// Hosted payment page to redirect to, for payment methods that
    /// settle externally.
    pub payment_url: Option<String>,
}

/// A transient "buy now" line, carried outside the cart until submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuyNowLine {
    /// The flower being purchased.
    pub flower_id: FlowerId,
    /// Display name.
    pub flower_name: String,
    /// Product image URL.
    pub image_url: Option<String>,
    /// Price per unit.
    pub unit_price: Price,
    /// Quantity, always >= 1.
    pub quantity: u32,
}

// =============================================================================
// Catalog
// =============================================================================

/// A flower in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flower {
    /// Flower ID.
    pub flower_id: FlowerId,
    /// Display name.
    pub name: String,
    /// Plain text description.
    pub description: Option<String>,
    /// Current price.
    pub price: Price,
    /// Product image URL.
    pub image_url: Option<String>,
    /// Category this flower belongs to.
    pub category: Option<String>,
    /// Whether the flower can currently be ordered.
    pub available: bool,
}

/// A catalog category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    /// Category ID.
    pub category_id: CategoryId,
    /// Display name.
    pub name: String,
}

/// Query parameters for the flower listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FlowerQuery {
    /// Free-text search, uncached.
    pub search: Option<String>,
    /// Restrict to a category.
    pub category: Option<CategoryId>,
    /// Zero-based page index.
    pub page: u32,
}

/// One page of the flower listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowerPage {
    /// Flowers on this page.
    pub flowers: Vec<Flower>,
    /// Whether more pages follow.
    pub has_next_page: bool,
}
