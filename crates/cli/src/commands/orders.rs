//! Order viewing commands.

use std::fmt::Write as _;

use cartwheel_cart::{BackendClient, CartConfig, OrderService};
use cartwheel_core::{Order, OrderId, Price};
use tracing::info;

/// Print every placed order.
///
/// # Errors
///
/// Returns an error if no backend is configured or the listing fails.
#[allow(clippy::print_stdout)]
pub async fn list(config: &CartConfig) -> Result<(), Box<dyn std::error::Error>> {
    let orders = BackendClient::new(config.require_backend()?)
        .list_orders()
        .await?;

    info!(count = orders.len(), "Listed orders");
    if orders.is_empty() {
        println!("No orders yet");
    }
    for order in &orders {
        println!("{}", summary(order));
    }
    Ok(())
}

/// Print one order with its items.
///
/// # Errors
///
/// Returns an error if no backend is configured or the order cannot be
/// fetched.
#[allow(clippy::print_stdout)]
pub async fn show(config: &CartConfig, id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let order = BackendClient::new(config.require_backend()?)
        .get_order(&OrderId::new(id))
        .await?;
    print!("{}", render(&order));
    Ok(())
}

fn summary(order: &Order) -> String {
    let mut line = format!(
        "Order {} - {} - {}",
        order.id,
        order.status,
        Price::from_amount(order.total).display()
    );
    if !order.created_at.is_empty() {
        let _ = write!(line, " - {}", order.created_at);
    }
    line
}

/// Format an order with its items and shipping address.
pub fn render(order: &Order) -> String {
    let mut out = summary(order);
    out.push('\n');
    for item in &order.items {
        let _ = writeln!(
            out,
            "  {:<12} {:>4} x {:>10}",
            item.sku,
            item.quantity,
            Price::from_amount(item.price).display()
        );
    }
    if let Some(address) = &order.shipping_address {
        let _ = writeln!(
            out,
            "Ship to: {}, {}, {}, {} {}",
            address.full_name,
            address.address_line1,
            address.city,
            address.state,
            address.postal_code
        );
    }
    out
}
