//! Product, inventory and order services the cart depends on.
//!
//! # Architecture
//!
//! - Each service is a narrow `async` trait so the cart and checkout can run
//!   against the HTTP [`BackendClient`] in production and in-memory fakes in
//!   tests
//! - [`StaticCatalog`] serves products from memory (offline use, tests)
//! - Product lookups through the HTTP client are cached via `moka`
//! - Unknown SKUs are reported as out of stock rather than as errors

mod client;

pub use client::BackendClient;

use std::collections::HashMap;

use async_trait::async_trait;
use cartwheel_core::{
    CreateOrderRequest, InventoryItem, Order, OrderId, Product, ProductFilters, ProductId,
    ProductPage, StockInfo,
};
use thiserror::Error;
use tracing::warn;

/// Errors that can occur when talking to backend services.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Service answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// Endpoint URL could not be built.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// Looks up products by id.
#[async_trait]
pub trait ProductSource: Send + Sync {
    /// Fetch a product.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::NotFound` for unknown ids, or another error if
    /// the lookup fails.
    async fn get_product(&self, id: &ProductId) -> Result<Product, BackendError>;

    /// List products matching `filters`.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing fails.
    async fn list_products(&self, filters: &ProductFilters) -> Result<ProductPage, BackendError>;
}

/// Looks up stock levels by SKU.
#[async_trait]
pub trait InventorySource: Send + Sync {
    /// Fetch the inventory record for a SKU.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::NotFound` for unknown SKUs, or another error if
    /// the lookup fails.
    async fn get_inventory(&self, sku: &str) -> Result<InventoryItem, BackendError>;

    /// Classify a SKU's availability.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`InventorySource::get_inventory`].
    async fn stock_status(
        &self,
        sku: &str,
        product_id: Option<ProductId>,
    ) -> Result<StockInfo, BackendError> {
        let item = self.get_inventory(sku).await?;
        Ok(StockInfo::from_inventory(&item, product_id))
    }

    /// Classify several products at once, keyed by product id.
    ///
    /// Products whose lookup fails are left out of the result.
    async fn stock_statuses(
        &self,
        products: &[(ProductId, String)],
    ) -> HashMap<ProductId, StockInfo> {
        let mut statuses = HashMap::with_capacity(products.len());
        for (product_id, sku) in products {
            match self.stock_status(sku, Some(product_id.clone())).await {
                Ok(info) => {
                    statuses.insert(product_id.clone(), info);
                }
                Err(e) => warn!(sku = %sku, error = %e, "Stock lookup failed, skipping"),
            }
        }
        statuses
    }
}

/// Places orders.
#[async_trait]
pub trait OrderService: Send + Sync {
    /// Submit an order.
    ///
    /// # Errors
    ///
    /// Returns an error if the order service rejects or cannot receive it.
    async fn create_order(&self, request: &CreateOrderRequest) -> Result<Order, BackendError>;

    /// Fetch a placed order.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::NotFound` for unknown ids, or another error if
    /// the lookup fails.
    async fn get_order(&self, id: &OrderId) -> Result<Order, BackendError>;

    /// List placed orders.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing fails.
    async fn list_orders(&self) -> Result<Vec<Order>, BackendError>;
}

/// Products held in memory, listed in insertion order.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    products: Vec<Product>,
}

impl StaticCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON array of products.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is not an array of products.
    pub fn from_json(json: &str) -> Result<Self, BackendError> {
        let products: Vec<Product> = serde_json::from_str(json)?;
        Ok(products.into_iter().collect())
    }

    /// Add a product, or replace the one with the same id in place.
    pub fn insert(&mut self, product: Product) {
        match self.products.iter_mut().find(|p| p.id == product.id) {
            Some(existing) => *existing = product,
            None => self.products.push(product),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.products.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

impl FromIterator<Product> for StaticCatalog {
    fn from_iter<I: IntoIterator<Item = Product>>(iter: I) -> Self {
        let mut catalog = Self::new();
        for product in iter {
            catalog.insert(product);
        }
        catalog
    }
}

#[async_trait]
impl ProductSource for StaticCatalog {
    async fn get_product(&self, id: &ProductId) -> Result<Product, BackendError> {
        self.products
            .iter()
            .find(|p| &p.id == id)
            .cloned()
            .ok_or_else(|| BackendError::NotFound(format!("Product not found: {id}")))
    }

    async fn list_products(&self, filters: &ProductFilters) -> Result<ProductPage, BackendError> {
        Ok(ProductPage::single(
            self.products
                .iter()
                .filter(|p| filters.matches(p))
                .cloned()
                .collect(),
        ))
    }
}
