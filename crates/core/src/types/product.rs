//! Product records and the snapshot a cart keeps of them.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::ProductId;

/// A product as returned by the product service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    #[serde(default)]
    pub sku: String,
    /// Category name, for display purposes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub category_ids: Vec<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images_ids: Vec<i64>,
}

impl Product {
    /// Create a product with the fields a cart needs; everything else empty.
    #[must_use]
    pub fn new(id: impl Into<ProductId>, name: impl Into<String>, price: Decimal) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            price,
            sku: String::new(),
            category: None,
            category_ids: Vec::new(),
            image_url: None,
            images_ids: Vec::new(),
        }
    }

    /// Set the SKU.
    #[must_use]
    pub fn with_sku(mut self, sku: impl Into<String>) -> Self {
        self.sku = sku.into();
        self
    }

    /// Capture the fields a cart line keeps.
    #[must_use]
    pub fn snapshot(&self) -> ProductSnapshot {
        ProductSnapshot::from(self)
    }
}

/// Copy of product fields taken when a line is added to a cart.
///
/// Later edits to the product (price changes included) never reach an
/// existing snapshot. Negative prices are floored at zero so cart totals
/// cannot go below zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSnapshot {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    #[serde(default)]
    pub sku: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl From<&Product> for ProductSnapshot {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id.clone(),
            name: product.name.clone(),
            description: product.description.clone(),
            price: product.price.max(Decimal::ZERO),
            sku: product.sku.clone(),
            image_url: product.image_url.clone(),
        }
    }
}

impl From<Product> for ProductSnapshot {
    fn from(product: Product) -> Self {
        Self {
            id: product.id,
            name: product.name,
            description: product.description,
            price: product.price.max(Decimal::ZERO),
            sku: product.sku,
            image_url: product.image_url,
        }
    }
}

/// Criteria for listing products. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilters {
    pub category: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    /// Case-insensitive substring of the name or description.
    pub search: Option<String>,
}

impl ProductFilters {
    /// Whether no criterion is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.category.is_none()
            && self.min_price.is_none()
            && self.max_price.is_none()
            && self.search.is_none()
    }

    /// Query-string pairs in the product service's parameter names.
    #[must_use]
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(category) = &self.category {
            pairs.push(("category", category.clone()));
        }
        if let Some(min) = self.min_price {
            pairs.push(("minPrice", min.to_string()));
        }
        if let Some(max) = self.max_price {
            pairs.push(("maxPrice", max.to_string()));
        }
        if let Some(search) = &self.search {
            pairs.push(("search", search.clone()));
        }
        pairs
    }

    /// Whether a product satisfies every set criterion.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        let category = self.category.as_ref().is_none_or(|wanted| {
            product
                .category
                .as_ref()
                .is_some_and(|c| c.eq_ignore_ascii_case(wanted))
        });
        let min = self.min_price.is_none_or(|min| product.price >= min);
        let max = self.max_price.is_none_or(|max| product.price <= max);
        let search = self.search.as_ref().is_none_or(|term| {
            let term = term.to_lowercase();
            product.name.to_lowercase().contains(&term)
                || product.description.to_lowercase().contains(&term)
        });
        category && min && max && search
    }
}

/// A page of products.
///
/// Some product service deployments answer with a bare array instead; that
/// form deserializes as a single page holding every product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}

impl ProductPage {
    /// A single page holding all of `products`.
    #[must_use]
    pub fn single(products: Vec<Product>) -> Self {
        let len = products.len();
        Self {
            total: u64::try_from(len).unwrap_or(u64::MAX),
            page: 1,
            page_size: u32::try_from(len).unwrap_or(u32::MAX),
            products,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawProductPage {
    Bare(Vec<Product>),
    #[serde(rename_all = "camelCase")]
    Paged {
        products: Vec<Product>,
        #[serde(default)]
        total: Option<u64>,
        #[serde(default)]
        page: Option<u32>,
        #[serde(default)]
        page_size: Option<u32>,
    },
}

impl<'de> Deserialize<'de> for ProductPage {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match RawProductPage::deserialize(deserializer)? {
            RawProductPage::Bare(products) => Self::single(products),
            RawProductPage::Paged {
                products,
                total,
                page,
                page_size,
            } => {
                let single = Self::single(products);
                Self {
                    total: total.unwrap_or(single.total),
                    page: page.unwrap_or(1),
                    page_size: page_size.unwrap_or(single.page_size),
                    products: single.products,
                }
            }
        })
    }
}
