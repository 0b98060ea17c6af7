//! JSON wire shapes for the remote API, and their conversions into the
//! domain types.
//!
//! The remote service owns the wire format; these DTOs only cover the
//! fields this client consumes. Monetary amounts arrive as bare decimals
//! in VND and are wrapped into [`Price`] here.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use rose_shop_core::{CartItemId, CurrencyCode, FlowerId, Price};

use super::types::{CartLine, CartState, Flower, FlowerPage, Identity};

/// Response envelope used by every remote endpoint.
#[derive(Debug, Deserialize)]
pub(super) struct Envelope<T> {
    /// Human-readable status message.
    pub message: Option<String>,
    /// Payload, absent on failures.
    pub data: Option<T>,
}

// =============================================================================
// Requests
// =============================================================================

#[derive(Debug, Serialize)]
pub(super) struct LoginRequest<'a> {
    pub username_or_email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub(super) struct AddLineRequest {
    pub flower_id: FlowerId,
    pub quantity: u32,
}

#[derive(Debug, Serialize)]
pub(super) struct UpdateLineRequest {
    pub quantity: u32,
}

// =============================================================================
// Responses
// =============================================================================

/// Credential exchange payload.
#[derive(Debug, Deserialize)]
pub(super) struct AuthDto {
    pub token: String,
    pub user: Identity,
}

/// Cart payload.
#[derive(Debug, Deserialize)]
pub(super) struct CartDto {
    pub items: Vec<CartLineDto>,
    #[serde(default)]
    pub summary: CartSummaryDto,
}

#[derive(Debug, Deserialize)]
pub(super) struct CartLineDto {
    pub cart_item_id: CartItemId,
    pub flower_id: FlowerId,
    pub flower_name: String,
    pub category_name: Option<String>,
    pub image_url: Option<String>,
    pub unit_price: Decimal,
    pub quantity: u32,
}

#[derive(Debug, Deserialize, Default)]
pub(super) struct CartSummaryDto {
    #[serde(default)]
    pub discount: Decimal,
    #[serde(default)]
    pub shipping: Decimal,
}

/// Catalog flower payload.
#[derive(Debug, Deserialize)]
pub(super) struct FlowerDto {
    pub flower_id: FlowerId,
    pub flower_name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub image_url: Option<String>,
    pub category_name: Option<String>,
    #[serde(default = "default_true")]
    pub is_available: bool,
}

const fn default_true() -> bool {
    true
}

/// One page of the flower listing.
#[derive(Debug, Deserialize)]
pub(super) struct FlowerPageDto {
    pub items: Vec<FlowerDto>,
    #[serde(default)]
    pub has_next_page: bool,
}

// =============================================================================
// Conversions
// =============================================================================

fn vnd(amount: Decimal) -> Price {
    Price::new(amount, CurrencyCode::VND)
}

pub(super) fn convert_cart(dto: CartDto) -> CartState {
    let lines = dto.items.into_iter().map(convert_cart_line).collect();
    CartState::from_remote(lines, vnd(dto.summary.discount), vnd(dto.summary.shipping))
}

fn convert_cart_line(dto: CartLineDto) -> CartLine {
    let unit_price = vnd(dto.unit_price);
    CartLine {
        id: dto.cart_item_id,
        flower_id: dto.flower_id,
        flower_name: dto.flower_name,
        category_name: dto.category_name,
        image_url: dto.image_url,
        unit_price,
        quantity: dto.quantity,
        line_total: unit_price.times(dto.quantity),
    }
}

pub(super) fn convert_flower(dto: FlowerDto) -> Flower {
    Flower {
        flower_id: dto.flower_id,
        name: dto.flower_name,
        description: dto.description,
        price: vnd(dto.price),
        image_url: dto.image_url,
        category: dto.category_name,
        available: dto.is_available,
    }
}

pub(super) fn convert_flower_page(dto: FlowerPageDto) -> FlowerPage {
    FlowerPage {
        flowers: dto.items.into_iter().map(convert_flower).collect(),
        has_next_page: dto.has_next_page,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_cart_derives_line_totals() {
        let dto: CartDto = serde_json::from_value(serde_json::json!({
            "items": [
                {
                    "cart_item_id": 1,
                    "flower_id": 7,
                    "flower_name": "Red Rose",
                    "unit_price": "50000",
                    "quantity": 2
                }
            ],
            "summary": { "shipping": "30000" }
        }))
        .unwrap();

        let cart = convert_cart(dto);
        assert_eq!(cart.total_quantity(), 2);
        let first = cart.lines().first().unwrap();
        assert_eq!(first.line_total, Price::vnd(100_000));
        assert_eq!(cart.summary().subtotal, Price::vnd(100_000));
        assert_eq!(cart.summary().total, Price::vnd(130_000));
    }

    #[test]
    fn test_convert_cart_empty() {
        let dto: CartDto = serde_json::from_value(serde_json::json!({ "items": [] })).unwrap();
        let cart = convert_cart(dto);
        assert!(cart.is_empty());
        assert!(cart.summary().total.is_zero());
    }

    #[test]
    fn test_convert_flower_defaults_available() {
        let dto: FlowerDto = serde_json::from_value(serde_json::json!({
            "flower_id": 3,
            "flower_name": "White Lily",
            "price": "80000"
        }))
        .unwrap();
        let flower = convert_flower(dto);
        assert!(flower.available);
        assert_eq!(flower.price, Price::vnd(80_000));
    }
}
