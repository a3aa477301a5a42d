//! Cart commands.
//!
//! Every mutating command prints the cart afterwards so the result of the
//! change is visible.

use std::fmt::Write as _;
use std::path::Path;

use cartwheel_cart::{
    BackendClient, BackendError, Cart, CartConfig, CartStore, FileBackend, ProductSource,
    StaticCatalog,
};
use cartwheel_core::{Price, Product, ProductId};
use tracing::{info, warn};

type Store = CartStore<FileBackend>;

/// Print the cart.
#[allow(clippy::print_stdout)]
pub fn show(store: &Store) {
    print!("{}", render(&store.snapshot()));
}

/// Add a product, looked up in a catalog file or the backend.
///
/// # Errors
///
/// Returns an error if the catalog cannot be read, no backend is configured
/// when one is needed, or the product cannot be found.
pub async fn add(
    store: &Store,
    config: &CartConfig,
    id: &str,
    quantity: i64,
    catalog: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let id = ProductId::new(id);
    let product = match catalog {
        Some(path) => {
            let json = tokio::fs::read_to_string(path).await?;
            lookup(&StaticCatalog::from_json(&json)?, &id).await?
        }
        None => {
            let client = BackendClient::new(config.require_backend()?);
            lookup(&client, &id).await?
        }
    };

    if quantity < 1 {
        warn!(quantity, "Quantity below 1, adding one");
    }
    store.add_item(&product, quantity);
    info!(id = %id, name = %product.name, "Added to cart");
    show(store);
    Ok(())
}

async fn lookup<S: ProductSource>(source: &S, id: &ProductId) -> Result<Product, BackendError> {
    source.get_product(id).await
}

pub fn update(store: &Store, id: &str, quantity: i64) {
    report(store.update_quantity(&ProductId::new(id), quantity), id);
    show(store);
}

pub fn increment(store: &Store, id: &str) {
    report(store.increment(&ProductId::new(id)), id);
    show(store);
}

pub fn decrement(store: &Store, id: &str) {
    report(store.decrement(&ProductId::new(id)), id);
    show(store);
}

pub fn remove(store: &Store, id: &str) {
    report(store.remove_item(&ProductId::new(id)), id);
    show(store);
}

pub fn clear(store: &Store) {
    if store.clear_cart() {
        info!("Cart cleared");
    }
    show(store);
}

fn report(changed: bool, id: &str) {
    if !changed {
        info!(id, "Cart unchanged");
    }
}

/// Format a cart as a plain-text table.
pub fn render(cart: &Cart) -> String {
    if cart.is_empty() {
        return "Your cart is empty\n".to_string();
    }

    let mut out = String::new();
    for line in cart.lines() {
        let _ = writeln!(
            out,
            "{:<12} {:<30} {:>4} x {:>10} = {:>10}",
            line.product.id.as_str(),
            line.product.name,
            line.quantity,
            Price::from_amount(line.product.price).display(),
            Price::from_amount(line.line_total()).display(),
        );
    }
    let _ = writeln!(
        out,
        "Items ({}): {}",
        cart.item_count(),
        Price::from_amount(cart.total()).display()
    );
    out
}
