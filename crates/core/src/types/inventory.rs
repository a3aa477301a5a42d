//! Inventory records from the inventory service.

use serde::{Deserialize, Serialize};

use super::id::ProductId;
use super::status::StockStatus;

/// Stock level for a single SKU.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    pub sku: String,
    pub quantity: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reserved_quantity: Option<i64>,
    /// Older name for `reserved_quantity`, still sent by some deployments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reserved: Option<i64>,
}

impl InventoryItem {
    /// Record for a SKU the inventory service does not know.
    #[must_use]
    pub fn out_of_stock(sku: impl Into<String>) -> Self {
        Self {
            sku: sku.into(),
            quantity: 0,
            reserved_quantity: None,
            reserved: Some(0),
        }
    }

    /// Units on hand minus units reserved by open orders.
    ///
    /// A zero `reserved_quantity` falls through to the legacy `reserved`
    /// field, since some deployments fill only the latter.
    #[must_use]
    pub fn available(&self) -> i64 {
        let reserved = self
            .reserved_quantity
            .filter(|&reserved| reserved != 0)
            .or(self.reserved)
            .unwrap_or(0);
        self.quantity.saturating_sub(reserved)
    }

    /// Classify this item's availability.
    #[must_use]
    pub fn stock_status(&self) -> StockStatus {
        StockStatus::from_available(self.available())
    }
}

/// Availability of a product, as shown next to it in the storefront.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockInfo {
    pub product_id: ProductId,
    /// Available (unreserved) units.
    pub quantity: i64,
    pub status: StockStatus,
}

impl StockInfo {
    /// Build stock info for a product from its inventory record.
    ///
    /// Falls back to the SKU as the product id when none is known.
    #[must_use]
    pub fn from_inventory(item: &InventoryItem, product_id: Option<ProductId>) -> Self {
        Self {
            product_id: product_id.unwrap_or_else(|| ProductId::new(item.sku.clone())),
            quantity: item.available(),
            status: item.stock_status(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn item(quantity: i64, reserved_quantity: Option<i64>, reserved: Option<i64>) -> InventoryItem {
        InventoryItem {
            sku: "SKU-1".to_string(),
            quantity,
            reserved_quantity,
            reserved,
        }
    }

    #[test]
    fn test_available_prefers_reserved_quantity() {
        assert_eq!(item(20, Some(5), Some(15)).available(), 15);
        assert_eq!(item(20, None, Some(15)).available(), 5);
        assert_eq!(item(20, None, None).available(), 20);
    }

    #[test]
    fn test_zero_reserved_quantity_falls_back_to_reserved() {
        assert_eq!(item(20, Some(0), Some(6)).available(), 14);
        assert_eq!(item(20, Some(0), None).available(), 20);
    }

    #[test]
    fn test_unknown_sku_is_out_of_stock() {
        let missing = InventoryItem::out_of_stock("GONE");
        assert_eq!(missing.available(), 0);
        assert_eq!(missing.stock_status(), StockStatus::OutOfStock);
    }

    #[test]
    fn test_stock_info_uses_available() {
        let info = StockInfo::from_inventory(&item(12, Some(4), None), Some(ProductId::new("7")));
        assert_eq!(info.quantity, 8);
        assert_eq!(info.status, StockStatus::LowStock);
        assert_eq!(info.product_id.as_str(), "7");
    }

    #[test]
    fn test_stock_info_falls_back_to_sku() {
        let info = StockInfo::from_inventory(&item(0, None, None), None);
        assert_eq!(info.product_id.as_str(), "SKU-1");
        assert_eq!(info.status, StockStatus::OutOfStock);
    }

    #[test]
    fn test_deserialize_legacy_reserved_field() {
        let parsed: InventoryItem =
            serde_json::from_str(r#"{"sku":"S","quantity":3,"reserved":1}"#).unwrap();
        assert_eq!(parsed.available(), 2);
    }
}
