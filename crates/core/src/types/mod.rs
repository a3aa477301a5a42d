//! Core types for Cartwheel.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod inventory;
pub mod order;
pub mod price;
pub mod product;
pub mod status;

pub use id::*;
pub use inventory::{InventoryItem, StockInfo};
pub use order::{CreateOrderRequest, Order, OrderItem, OrderLineItem, ShippingAddress};
pub use price::{CurrencyCode, Price};
pub use product::{Product, ProductFilters, ProductPage, ProductSnapshot};
pub use status::*;
