//! Inventory lookup commands.

use std::collections::HashMap;
use std::fmt::Write as _;

use cartwheel_cart::{BackendClient, Cart, CartConfig, CartStore, FileBackend, InventorySource};
use cartwheel_core::{ProductId, StockInfo};
use tracing::info;

/// Print the stock status of each SKU.
///
/// # Errors
///
/// Returns an error if no backend is configured or a lookup fails.
#[allow(clippy::print_stdout)]
pub async fn show(config: &CartConfig, skus: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let client = BackendClient::new(config.require_backend()?);
    for sku in skus {
        let stock = client.stock_status(sku, None).await?;
        let status = stock.status.label();
        info!(
            sku = sku.as_str(),
            available = stock.quantity,
            status,
            "Fetched stock"
        );
        println!("{sku}: {status} ({} available)", stock.quantity);
    }
    Ok(())
}

/// Check stock for every line in the cart.
///
/// # Errors
///
/// Returns an error if no backend is configured. Lines whose lookup fails
/// are reported as unknown.
#[allow(clippy::print_stdout)]
pub async fn check_cart(
    store: &CartStore<FileBackend>,
    config: &CartConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = BackendClient::new(config.require_backend()?);
    let cart = store.snapshot();
    let products: Vec<(ProductId, String)> = cart
        .lines()
        .iter()
        .filter(|line| !line.product.sku.is_empty())
        .map(|line| (line.product.id.clone(), line.product.sku.clone()))
        .collect();

    let statuses = client.stock_statuses(&products).await;
    info!(
        checked = statuses.len(),
        lines = cart.lines().len(),
        "Checked cart stock"
    );
    print!("{}", render_cart(&cart, &statuses));
    Ok(())
}

/// Format the stock of each cart line, flagging lines the stock cannot
/// cover.
pub fn render_cart(cart: &Cart, statuses: &HashMap<ProductId, StockInfo>) -> String {
    if cart.is_empty() {
        return "Your cart is empty\n".to_string();
    }

    let mut out = String::new();
    for line in cart.lines() {
        let _ = match statuses.get(&line.product.id) {
            Some(stock) if stock.quantity < i64::from(line.quantity) => writeln!(
                out,
                "{:<30} {} ({} available, {} in cart)",
                line.product.name,
                stock.status.label(),
                stock.quantity,
                line.quantity
            ),
            Some(stock) => writeln!(
                out,
                "{:<30} {} ({} available)",
                line.product.name,
                stock.status.label(),
                stock.quantity
            ),
            None => writeln!(out, "{:<30} Unknown", line.product.name),
        };
    }
    out
}
