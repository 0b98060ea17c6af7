//! Cart commands.

use rose_shop_core::{CartItemId, FlowerId};
use rose_shop_storefront::api::types::CartState;
use rose_shop_storefront::error::StorefrontError;
use rose_shop_storefront::state::LiveStorefront;

pub fn show(shop: &LiveStorefront) {
    print_cart(&shop.cart_snapshot());
}

pub async fn add(
    shop: &LiveStorefront,
    flower_id: i64,
    quantity: u32,
) -> Result<(), StorefrontError> {
    shop.add_to_cart(FlowerId::new(flower_id), quantity).await?;
    print_cart(&shop.cart_snapshot());
    Ok(())
}

pub async fn update(
    shop: &LiveStorefront,
    line_id: i64,
    quantity: i64,
) -> Result<(), StorefrontError> {
    shop.update_cart_line(CartItemId::new(line_id), quantity)
        .await?;
    print_cart(&shop.cart_snapshot());
    Ok(())
}

pub async fn remove(shop: &LiveStorefront, line_id: i64) -> Result<(), StorefrontError> {
    shop.remove_cart_line(CartItemId::new(line_id)).await?;
    print_cart(&shop.cart_snapshot());
    Ok(())
}

pub async fn clear(shop: &LiveStorefront) {
    shop.clear_cart().await;
    println!("cart cleared");
}

fn print_cart(cart: &CartState) {
    if cart.is_empty() {
        println!("cart is empty");
        return;
    }

    for line in cart.lines() {
        println!(
            "#{:<5} {} x{} @ {} = {}",
            line.id, line.flower_name, line.quantity, line.unit_price, line.line_total
        );
    }
    let summary = cart.summary();
    println!(
        "{} item(s), subtotal {}",
        summary.total_quantity, summary.subtotal
    );
}
