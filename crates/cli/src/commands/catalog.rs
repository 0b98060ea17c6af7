//! Catalog browsing commands.

use rose_shop_core::CategoryId;
use rose_shop_storefront::api::types::FlowerQuery;
use rose_shop_storefront::error::StorefrontError;
use rose_shop_storefront::state::LiveStorefront;

pub async fn list(
    shop: &LiveStorefront,
    search: Option<String>,
    category: Option<i64>,
    page: u32,
) -> Result<(), StorefrontError> {
    let query = FlowerQuery {
        search,
        category: category.map(CategoryId::new),
        page,
    };
    let listing = shop.gateway().list_flowers(&query).await?;

    if listing.flowers.is_empty() {
        println!("no flowers found");
        return Ok(());
    }

    for flower in &listing.flowers {
        let availability = if flower.available { "" } else { " (sold out)" };
        let category = flower
            .category
            .as_deref()
            .map(|c| format!(" [{c}]"))
            .unwrap_or_default();
        println!(
            "#{:<5} {}{category} - {}{availability}",
            flower.flower_id, flower.name, flower.price
        );
    }
    if listing.has_next_page {
        println!("... more on page {}", page + 1);
    }
    Ok(())
}
