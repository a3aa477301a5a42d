//! Checkout: submit the cart as an order, then take it out of the cart.

use cartwheel_core::{CreateOrderRequest, Order, OrderLineItem, ShippingAddress};
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::backend::{BackendError, OrderService};
use crate::cart::{Cart, CartOp};
use crate::persistence::PersistenceBackend;
use crate::store::CartStore;

/// Errors that can occur during checkout.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// There is nothing to order.
    #[error("Your cart is empty")]
    EmptyCart,

    /// The order service rejected or never received the order.
    #[error("Failed to place order: {0}")]
    Backend(#[from] BackendError),
}

/// Build the order submission for a cart's current lines.
#[must_use]
pub fn order_request(cart: &Cart, shipping_address: Option<ShippingAddress>) -> CreateOrderRequest {
    CreateOrderRequest {
        order_line_items_dto_list: cart
            .lines()
            .iter()
            .map(|line| OrderLineItem {
                sku: line.product.sku.clone(),
                price: line.product.price,
                quantity: line.quantity,
                product_id: line.product.id.clone(),
            })
            .collect(),
        shipping_address,
    }
}

/// Place an order for everything in the cart.
///
/// Once the order service accepts the order, exactly the submitted
/// quantities are taken out of the cart; anything added while the order was
/// in flight stays. On failure the cart is left exactly as it was.
///
/// # Errors
///
/// Returns `CheckoutError::EmptyCart` without contacting the order service
/// if the cart is empty, or `CheckoutError::Backend` if submission fails.
#[instrument(skip_all, fields(key = %store.key()))]
pub async fn checkout<B, O>(
    store: &CartStore<B>,
    orders: &O,
    shipping_address: Option<ShippingAddress>,
) -> Result<Order, CheckoutError>
where
    B: PersistenceBackend,
    O: OrderService + ?Sized,
{
    let cart = store.snapshot();
    if cart.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }

    let request = order_request(&cart, shipping_address);
    let order = match orders.create_order(&request).await {
        Ok(order) => order,
        Err(e) => {
            warn!(error = %e, "Order submission failed, cart kept");
            return Err(e.into());
        }
    };

    let ordered = cart
        .lines()
        .iter()
        .map(|line| (line.product.id.clone(), line.quantity))
        .collect();
    store.dispatch(CartOp::Deduct { items: ordered });
    info!(
        order_id = %order.id,
        items = cart.item_count(),
        total = %cart.total(),
        remaining = store.item_count(),
        "Order placed, ordered items removed from cart"
    );
    Ok(order)
}
