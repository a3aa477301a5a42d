//! Integration tests for Cartwheel.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p cartwheel-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `cart_properties` - Invariants that must hold over any operation sequence
//! - `cart_persistence` - Save/restore through the memory and file backends
//! - `cart_checkout` - Checkout against an in-memory order service
//!
//! This library holds the fixtures the test files share.

use cartwheel_core::{Product, ProductId};
use rust_decimal::Decimal;

/// Storage key used by the tests.
pub const KEY: &str = "cart-storage";

/// A product with a whole-unit price.
#[must_use]
pub fn product(id: &str, price: i64) -> Product {
    Product::new(id, format!("Product {id}"), Decimal::from(price))
        .with_sku(format!("SKU-{id}"))
}

/// Shorthand for a product id.
#[must_use]
pub fn pid(id: &str) -> ProductId {
    ProductId::new(id)
}
