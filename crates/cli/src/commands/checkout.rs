//! Checkout command.

use cartwheel_cart::{BackendClient, CartConfig, CartStore, FileBackend, checkout};
use cartwheel_core::{Price, ShippingAddress};
use clap::Args;
use tracing::info;

/// Shipping address flags.
#[derive(Debug, Args)]
pub struct AddressArgs {
    /// Recipient's full name
    #[arg(long)]
    pub name: String,

    /// Street address
    #[arg(long)]
    pub address1: String,

    /// Apartment, suite, etc.
    #[arg(long)]
    pub address2: Option<String>,

    #[arg(long)]
    pub city: String,

    /// State or province
    #[arg(long)]
    pub state: String,

    #[arg(long)]
    pub postal_code: String,

    #[arg(long, default_value = "USA")]
    pub country: String,
}

impl From<AddressArgs> for ShippingAddress {
    fn from(args: AddressArgs) -> Self {
        Self {
            full_name: args.name,
            address_line1: args.address1,
            address_line2: args.address2.filter(|line| !line.is_empty()),
            city: args.city,
            state: args.state,
            postal_code: args.postal_code,
            country: args.country,
        }
    }
}

/// Submit the cart to the order service.
///
/// # Errors
///
/// Returns an error if no backend is configured, the cart is empty, or the
/// order is rejected. The cart is kept on failure.
#[allow(clippy::print_stdout)]
pub async fn run(
    store: &CartStore<FileBackend>,
    config: &CartConfig,
    address: ShippingAddress,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = BackendClient::new(config.require_backend()?);
    let order = checkout(store, &client, Some(address)).await?;

    info!(order_id = %order.id, status = %order.status, "Checkout complete");
    println!(
        "Order {} placed ({}), total {}",
        order.id,
        order.status,
        Price::from_amount(order.total).display()
    );
    Ok(())
}
