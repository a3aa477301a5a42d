//! Cartwheel Cart - the storefront's cart state and its collaborators.
//!
//! # Architecture
//!
//! - [`cart`] holds the pure aggregate: lines plus derived item count and
//!   total, changed only through [`CartOp`] transitions
//! - [`store`] wraps a cart behind a mutex, writes it through to a
//!   [`PersistenceBackend`] after every change and notifies subscribers
//! - [`backend`] talks to the product, inventory and order services
//! - [`checkout`] turns the cart into an order and deducts the ordered
//!   lines on success
//!
//! # Example
//!
//! ```rust
//! use cartwheel_cart::{CartStore, MemoryBackend};
//! use cartwheel_core::Product;
//! use rust_decimal::Decimal;
//!
//! let store = CartStore::open(MemoryBackend::new(), "cart-storage");
//! store.add_item(&Product::new("A", "Lamp", Decimal::from(10)), 2);
//! store.add_item(&Product::new("B", "Bulb", Decimal::from(5)), 1);
//!
//! assert_eq!(store.item_count(), 3);
//! assert_eq!(store.total(), Decimal::from(25));
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod backend;
pub mod cart;
pub mod checkout;
pub mod config;
pub mod persistence;
pub mod store;

pub use backend::{
    BackendClient, BackendError, InventorySource, OrderService, ProductSource, StaticCatalog,
};
pub use cart::{Cart, CartLine, CartOp};
pub use checkout::{CheckoutError, checkout};
pub use config::{BackendConfig, CartConfig, ConfigError, StorageConfig};
pub use persistence::{FileBackend, MemoryBackend, PersistenceBackend, PersistenceError};
pub use store::{CartEvent, CartStore, SubscriptionId};
