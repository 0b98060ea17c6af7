//! Rose Shop CLI - drive the storefront client from a terminal.
//!
//! # Usage
//!
//! ```bash
//! # Sign in (loads the account's cart)
//! rose-shop login lan --password '...'
//!
//! # Browse the catalog
//! rose-shop flowers --search rose
//!
//! # Cart operations
//! rose-shop cart add 7 --quantity 2
//! rose-shop cart show
//!
//! # Place an order
//! rose-shop checkout --phone 0912345678 --address 3 --payment cod
//! ```
//!
//! Configuration comes from the environment (see
//! `rose_shop_storefront::config`); a `.env` file is honored.

#![cfg_attr(not(test), forbid(unsafe_code))]
// Terminal output is this binary's purpose.
#![allow(clippy::print_stdout)]

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use rose_shop_storefront::config::StorefrontConfig;
use rose_shop_storefront::state::LiveStorefront;

mod commands;

#[derive(Parser)]
#[command(name = "rose-shop")]
#[command(author, version, about = "Rose Shop storefront CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in with a username or email
    Login {
        /// Username or email
        username: String,

        /// Account password
        #[arg(short, long)]
        password: String,
    },
    /// Create a new account
    Register {
        /// Desired login name
        username: String,

        /// Email address
        email: String,

        /// Account password
        #[arg(short, long)]
        password: String,
    },
    /// Sign out and purge local cart data
    Logout,
    /// Show the current session
    Whoami,
    /// Update profile fields
    Profile {
        /// Full legal name
        #[arg(long)]
        full_name: Option<String>,

        /// Home address
        #[arg(long)]
        address: Option<String>,

        /// Contact phone number
        #[arg(long)]
        phone: Option<String>,
    },
    /// Browse the flower catalog
    Flowers {
        /// Free-text search
        #[arg(short, long)]
        search: Option<String>,

        /// Restrict to a category ID
        #[arg(short, long)]
        category: Option<i64>,

        /// Zero-based page index
        #[arg(long, default_value_t = 0)]
        page: u32,
    },
    /// Cart operations
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Address book
    Address {
        #[command(subcommand)]
        action: AddressAction,
    },
    /// List vouchers usable at checkout
    Vouchers,
    /// Place an order from the cart (or buy a single flower directly)
    Checkout(commands::checkout::CheckoutArgs),
    /// Confirm a completed external payment (clears the ordered cart)
    ConfirmPayment,
}

#[derive(Subcommand)]
enum CartAction {
    /// Print the current cart
    Show,
    /// Add a flower to the cart
    Add {
        /// Flower ID
        flower_id: i64,

        /// Quantity to add
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Set a line's quantity
    Update {
        /// Cart line ID
        line_id: i64,

        /// New quantity (>= 1)
        quantity: i64,
    },
    /// Remove a line
    Remove {
        /// Cart line ID
        line_id: i64,
    },
    /// Clear the cart
    Clear,
}

#[derive(Subcommand)]
enum AddressAction {
    /// List delivery addresses
    List,
    /// Add a delivery address
    Add {
        /// Full address text (street, district, city, province)
        description: String,
    },
    /// Delete a delivery address
    Delete {
        /// Address ID
        address_id: i64,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing from RUST_LOG
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let result = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = StorefrontConfig::from_env()?;

    // Keep the Sentry guard alive for the duration of the command
    let _sentry = config.sentry_dsn.as_ref().map(|dsn| {
        sentry::init((
            dsn.as_str(),
            sentry::ClientOptions {
                release: sentry::release_name!(),
                ..Default::default()
            },
        ))
    });

    let shop = LiveStorefront::from_config(&config)?;

    // Cached cart first, then session restore and refresh
    shop.start().await;

    match cli.command {
        Commands::Login { username, password } => {
            commands::session::login(&shop, &username, &password).await?;
        }
        Commands::Register {
            username,
            email,
            password,
        } => {
            commands::session::register(&shop, &username, &email, &password).await?;
        }
        Commands::Logout => commands::session::logout(&shop),
        Commands::Whoami => commands::session::whoami(&shop),
        Commands::Profile {
            full_name,
            address,
            phone,
        } => {
            commands::session::update_profile(&shop, full_name, address, phone).await?;
        }
        Commands::Flowers {
            search,
            category,
            page,
        } => {
            commands::catalog::list(&shop, search, category, page).await?;
        }
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show(&shop),
            CartAction::Add {
                flower_id,
                quantity,
            } => commands::cart::add(&shop, flower_id, quantity).await?,
            CartAction::Update { line_id, quantity } => {
                commands::cart::update(&shop, line_id, quantity).await?;
            }
            CartAction::Remove { line_id } => commands::cart::remove(&shop, line_id).await?,
            CartAction::Clear => commands::cart::clear(&shop).await,
        },
        Commands::Address { action } => match action {
            AddressAction::List => commands::checkout::list_addresses(&shop).await?,
            AddressAction::Add { description } => {
                commands::checkout::add_address(&shop, &description).await?;
            }
            AddressAction::Delete { address_id } => {
                commands::checkout::delete_address(&shop, address_id).await?;
            }
        },
        Commands::Vouchers => commands::checkout::list_vouchers(&shop).await?,
        Commands::Checkout(args) => commands::checkout::submit(&shop, args).await?,
        Commands::ConfirmPayment => commands::checkout::confirm_payment(&shop).await,
    }
    Ok(())
}
