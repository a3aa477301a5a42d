//! Cartwheel CLI - Manage a cart persisted on the local filesystem.
//!
//! # Usage
//!
//! ```bash
//! # Add two of product 42, looked up from the backend
//! cartwheel add 42 -q 2
//!
//! # Add a product from a local JSON catalog instead
//! cartwheel add A --catalog products.json
//!
//! # Change quantities
//! cartwheel update 42 5
//! cartwheel dec 42
//!
//! # Browse the catalog and check stock for what is in the cart
//! cartwheel products --category mugs --max-price 20
//! cartwheel stock --cart
//!
//! # Show the cart, then place the order
//! cartwheel show
//! cartwheel checkout --name "Ada Lovelace" --address1 "1 Main St" \
//!     --city Springfield --state IL --postal-code 62701
//! ```
//!
//! # Commands
//!
//! - `show` - Print lines, item count and total
//! - `add`, `update`, `inc`, `dec`, `remove`, `clear` - Change the cart
//! - `products` - List the catalog, optionally filtered
//! - `stock` - Query the inventory service for SKUs or the cart's lines
//! - `checkout` - Submit the cart as an order and deduct it from the cart
//! - `orders`, `order` - List placed orders or show one
//!
//! Configuration comes from the environment (see `cartwheel_cart::config`);
//! `--storage-dir` and `--key` override where the cart is kept.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use cartwheel_cart::{CartConfig, CartStore, FileBackend};
use cartwheel_core::ProductFilters;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "cartwheel")]
#[command(author, version, about = "Cartwheel cart tools")]
struct Cli {
    /// Directory holding the persisted cart (overrides `CART_STORAGE_DIR`)
    #[arg(long, global = true)]
    storage_dir: Option<PathBuf>,

    /// Storage slot for the cart (overrides `CART_STORAGE_KEY`)
    #[arg(long, global = true)]
    key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the cart
    Show,
    /// Add a product to the cart
    Add {
        /// Product id
        id: String,

        /// How many to add (values below 1 add one)
        #[arg(short, long, default_value_t = 1, allow_negative_numbers = true)]
        quantity: i64,

        /// JSON file with an array of products to look the id up in
        #[arg(long)]
        catalog: Option<PathBuf>,
    },
    /// Set the quantity of a line (0 or less removes it)
    Update {
        /// Product id
        id: String,

        /// New quantity
        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Add one more of a line
    Inc {
        /// Product id
        id: String,
    },
    /// Remove one of a line (never below 1)
    Dec {
        /// Product id
        id: String,
    },
    /// Remove a line
    Remove {
        /// Product id
        id: String,
    },
    /// Empty the cart
    Clear,
    /// List products from the catalog
    Products {
        /// Only products in this category
        #[arg(long)]
        category: Option<String>,

        /// Only products whose name or description contains this text
        #[arg(long)]
        search: Option<String>,

        /// Lowest price to include
        #[arg(long)]
        min_price: Option<Decimal>,

        /// Highest price to include
        #[arg(long)]
        max_price: Option<Decimal>,

        /// JSON file with an array of products to list instead of the backend
        #[arg(long)]
        catalog: Option<PathBuf>,
    },
    /// Show stock status for SKUs
    Stock {
        /// Product SKUs
        #[arg(required_unless_present = "cart")]
        skus: Vec<String>,

        /// Check every line in the cart instead
        #[arg(long, conflicts_with = "skus")]
        cart: bool,
    },
    /// Place an order for the cart's contents
    Checkout {
        #[command(flatten)]
        address: commands::checkout::AddressArgs,
    },
    /// List placed orders
    Orders,
    /// Show a placed order
    Order {
        /// Order id
        id: String,
    },
}

#[tokio::main]
async fn main() {
    // Logs go to stderr so stdout carries only command output
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "cartwheel_cli=info,cartwheel_cart=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = CartConfig::from_env()?;
    if let Some(dir) = cli.storage_dir {
        config.storage.dir = dir;
    }
    if let Some(key) = cli.key {
        config.storage.key = key;
    }

    let backend = FileBackend::new(&config.storage.dir);
    // Reject a bad key up front rather than silently running on an empty cart
    backend.slot_path(&config.storage.key)?;
    let store = CartStore::open(backend, config.storage.key.clone());

    match cli.command {
        Commands::Show => commands::cart::show(&store),
        Commands::Add {
            id,
            quantity,
            catalog,
        } => commands::cart::add(&store, &config, &id, quantity, catalog.as_deref()).await?,
        Commands::Update { id, quantity } => commands::cart::update(&store, &id, quantity),
        Commands::Inc { id } => commands::cart::increment(&store, &id),
        Commands::Dec { id } => commands::cart::decrement(&store, &id),
        Commands::Remove { id } => commands::cart::remove(&store, &id),
        Commands::Clear => commands::cart::clear(&store),
        Commands::Products {
            category,
            search,
            min_price,
            max_price,
            catalog,
        } => {
            let filters = ProductFilters {
                category,
                min_price,
                max_price,
                search,
            };
            commands::products::list(&config, &filters, catalog.as_deref()).await?;
        }
        Commands::Stock { cart: true, .. } => commands::stock::check_cart(&store, &config).await?,
        Commands::Stock { skus, .. } => commands::stock::show(&config, &skus).await?,
        Commands::Checkout { address } => {
            commands::checkout::run(&store, &config, address.into()).await?;
        }
        Commands::Orders => commands::orders::list(&config).await?,
        Commands::Order { id } => commands::orders::show(&config, &id).await?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_negative_update() {
        let cli = Cli::try_parse_from(["cartwheel", "update", "A", "-3"]).ok();
        assert!(matches!(
            cli.map(|c| c.command),
            Some(Commands::Update { quantity: -3, .. })
        ));
    }

    #[test]
    fn test_global_key_after_subcommand() {
        let cli = Cli::try_parse_from(["cartwheel", "show", "--key", "guest"]).ok();
        assert_eq!(cli.and_then(|c| c.key).as_deref(), Some("guest"));
    }

    #[test]
    fn test_parse_product_filters() {
        let args = ["cartwheel", "products", "--min-price", "5", "--search", "mug"];
        let cli = Cli::try_parse_from(args).ok();
        assert!(matches!(
            cli.map(|c| c.command),
            Some(Commands::Products {
                min_price: Some(price),
                search: Some(ref text),
                ..
            }) if price == Decimal::from(5) && text == "mug"
        ));
    }

    #[test]
    fn test_stock_needs_skus_or_cart() {
        let parses = |args: &[&str]| Cli::try_parse_from(args).is_ok();
        assert!(!parses(&["cartwheel", "stock"]));
        assert!(parses(&["cartwheel", "stock", "--cart"]));
        assert!(parses(&["cartwheel", "stock", "MUG", "BOWL"]));
        assert!(!parses(&["cartwheel", "stock", "MUG", "--cart"]));
    }
}
