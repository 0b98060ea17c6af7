//! Checkout, voucher, and address commands.

use clap::Args;

use rose_shop_core::{AddressId, DeliveryMethod, FlowerId, PaymentMethod};
use rose_shop_storefront::api::types::BuyNowLine;
use rose_shop_storefront::error::StorefrontError;
use rose_shop_storefront::services::checkout::{CheckoutForm, CheckoutOutcome};
use rose_shop_storefront::state::LiveStorefront;

/// Arguments for `rose-shop checkout`.
#[derive(Args)]
pub struct CheckoutArgs {
    /// Contact phone number
    #[arg(long)]
    pub phone: String,

    /// Delivery address ID (see `rose-shop address list`)
    #[arg(long)]
    pub address: Option<i64>,

    /// Payment method: `cod` or `vnpay`
    #[arg(long, default_value = "cod")]
    pub payment: String,

    /// Voucher code to apply
    #[arg(long)]
    pub voucher: Option<String>,

    /// Buy a single flower directly instead of checking out the cart
    #[arg(long)]
    pub buy_now: Option<i64>,

    /// Quantity for --buy-now
    #[arg(long, default_value_t = 1)]
    pub quantity: u32,
}

pub async fn submit(
    shop: &LiveStorefront,
    args: CheckoutArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(identity) = shop.session().current()
        && !identity.has_complete_profile()
    {
        println!("update your full name and address in your profile before checkout");
        return Ok(());
    }

    let payment_method = match args.payment.to_lowercase().as_str() {
        "cod" => PaymentMethod::Cod,
        "vnpay" => PaymentMethod::Vnpay,
        other => return Err(format!("unknown payment method: {other}").into()),
    };

    // An ineligible voucher is reported but never blocks the order.
    let voucher = match &args.voucher {
        Some(code) => match shop.select_voucher(code).await {
            Ok(voucher) => {
                println!("voucher {} applied (-{}%)", voucher.code, voucher.discount);
                Some(voucher)
            }
            Err(e) => {
                println!("{e}; continuing without a discount");
                None
            }
        },
        None => None,
    };

    let form = CheckoutForm {
        phone_number: args.phone,
        address_id: args.address.map(AddressId::new),
        payment_method: Some(payment_method),
        delivery_method: DeliveryMethod::Standard,
    };

    let outcome = match args.buy_now {
        Some(flower_id) => {
            let flower = shop.gateway().get_flower(FlowerId::new(flower_id)).await?;
            let line = BuyNowLine {
                flower_id: flower.flower_id,
                flower_name: flower.name,
                image_url: flower.image_url,
                unit_price: flower.price,
                quantity: args.quantity,
            };
            shop.submit_buy_now(&line, &form, voucher.as_ref()).await?
        }
        None => shop.submit_checkout(&form, voucher.as_ref()).await?,
    };

    match outcome {
        CheckoutOutcome::Placed { order_id } => {
            println!("order {order_id} placed - pay on delivery");
        }
        CheckoutOutcome::AwaitingPayment {
            order_id,
            payment_url,
        } => {
            println!("order {order_id} created - complete payment at:");
            println!("  {payment_url}");
            println!("run `rose-shop confirm-payment` once the payment has gone through");
        }
    }
    Ok(())
}

/// Callback after a completed external payment: clears the cart the
/// submitted order consumed.
pub async fn confirm_payment(shop: &LiveStorefront) {
    shop.finish_external_payment().await;
    println!("payment confirmed, cart cleared");
}

pub async fn list_vouchers(shop: &LiveStorefront) -> Result<(), StorefrontError> {
    let vouchers = shop.checkout().available_vouchers().await?;
    if vouchers.is_empty() {
        println!("no vouchers available");
        return Ok(());
    }
    let now = chrono::Utc::now();
    for voucher in vouchers {
        let state = if voucher.is_eligible(now) {
            "usable"
        } else {
            "unavailable"
        };
        println!(
            "{:<12} -{}%  until {}  [{state}]",
            voucher.code,
            voucher.discount,
            voucher.end_date.format("%Y-%m-%d")
        );
    }
    Ok(())
}

pub async fn list_addresses(shop: &LiveStorefront) -> Result<(), StorefrontError> {
    let addresses = shop.list_addresses().await?;
    if addresses.is_empty() {
        println!("no addresses yet - add one with `rose-shop address add`");
        return Ok(());
    }
    for address in addresses {
        println!(
            "#{:<5} {} - {}",
            address.address_id, address.user_full_name, address.description
        );
    }
    Ok(())
}

pub async fn add_address(
    shop: &LiveStorefront,
    description: &str,
) -> Result<(), StorefrontError> {
    let address = shop.add_address(description).await?;
    println!("added address #{}", address.address_id);
    Ok(())
}

pub async fn delete_address(shop: &LiveStorefront, address_id: i64) -> Result<(), StorefrontError> {
    shop.delete_address(AddressId::new(address_id)).await?;
    println!("deleted address #{address_id}");
    Ok(())
}
