//! Session commands: login, register, logout, whoami, profile.

use rose_shop_core::Email;
use rose_shop_storefront::api::types::{Identity, ProfileUpdate, RegisterRequest};
use rose_shop_storefront::error::StorefrontError;
use rose_shop_storefront::state::LiveStorefront;

pub async fn login(
    shop: &LiveStorefront,
    username: &str,
    password: &str,
) -> Result<(), StorefrontError> {
    let identity = shop.login(username, password).await?;
    print_identity(&identity);
    println!("cart: {} item(s)", shop.cart_snapshot().total_quantity());
    Ok(())
}

pub async fn register(
    shop: &LiveStorefront,
    username: &str,
    email: &str,
    password: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let email = Email::parse(email)?;
    let identity = shop
        .register(&RegisterRequest {
            username: username.to_owned(),
            email,
            password: password.to_owned(),
        })
        .await?;
    println!("welcome, {}!", identity.username);
    Ok(())
}

pub fn logout(shop: &LiveStorefront) {
    shop.logout();
    println!("signed out");
}

pub fn whoami(shop: &LiveStorefront) {
    match shop.session().current() {
        Some(identity) => print_identity(&identity),
        None => println!("not signed in"),
    }
}

pub async fn update_profile(
    shop: &LiveStorefront,
    full_name: Option<String>,
    address: Option<String>,
    phone: Option<String>,
) -> Result<(), StorefrontError> {
    let identity = shop
        .update_profile(&ProfileUpdate {
            full_name,
            address,
            phone,
            avatar_url: None,
        })
        .await?;
    print_identity(&identity);
    Ok(())
}

fn print_identity(identity: &Identity) {
    println!("{} <{}>", identity.username, identity.email);
    if let Some(profile) = &identity.profile {
        if let Some(name) = &profile.full_name {
            println!("  name:    {name}");
        }
        if let Some(address) = &profile.address {
            println!("  address: {address}");
        }
    }
    if !identity.has_complete_profile() {
        println!("  (profile incomplete - set a full name and address before checkout)");
    }
}
