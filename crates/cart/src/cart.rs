//! Cart aggregate and its state transitions.
//!
//! A [`Cart`] is an ordered list of [`CartLine`]s, at most one per product
//! id, in the order products were first added. Item count and total are
//! cached on the cart but only ever written by [`Cart::apply`], which
//! recomputes them from the lines after every change.
//!
//! Transitions never fail: unknown product ids are no-ops, out-of-range
//! quantities are clamped, and a change whose total would overflow is
//! rejected as a no-op.

use cartwheel_core::{Product, ProductId, ProductSnapshot};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// One product and how many of it are in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product: ProductSnapshot,
    /// Always at least 1.
    pub quantity: u32,
}

impl CartLine {
    /// Unit price times quantity, saturating at `Decimal::MAX`.
    ///
    /// Lines held by a [`Cart`] never saturate; the cart refuses changes
    /// whose totals overflow.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.product
            .price
            .saturating_mul(Decimal::from(self.quantity))
    }
}

/// A change to a cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartOp {
    /// Add `quantity` of a product, merging into an existing line.
    /// Quantities below 1 are treated as 1 and negative prices as 0.
    Add {
        product: ProductSnapshot,
        quantity: i64,
    },
    /// Set a line's quantity; zero or below removes the line.
    UpdateQuantity {
        product_id: ProductId,
        quantity: i64,
    },
    /// Drop a line.
    Remove { product_id: ProductId },
    /// One more of an existing line.
    Increment { product_id: ProductId },
    /// One fewer of an existing line; never goes below 1.
    Decrement { product_id: ProductId },
    /// Take ordered quantities out of the cart. Lines that reach zero are
    /// dropped; anything beyond the ordered quantities stays.
    Deduct { items: Vec<(ProductId, u32)> },
    /// Drop every line.
    Clear,
}

impl CartOp {
    /// Product the operation targets, if it targets exactly one.
    #[must_use]
    pub const fn product_id(&self) -> Option<&ProductId> {
        match self {
            Self::Add { product, .. } => Some(&product.id),
            Self::UpdateQuantity { product_id, .. }
            | Self::Remove { product_id }
            | Self::Increment { product_id }
            | Self::Decrement { product_id } => Some(product_id),
            Self::Deduct { .. } | Self::Clear => None,
        }
    }
}

/// Shopping cart contents with derived aggregates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cart {
    lines: Vec<CartLine>,
    item_count: u64,
    total: Decimal,
}

impl Cart {
    /// An empty cart.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a cart from stored lines.
    ///
    /// Lines sharing a product id are merged (quantities summed, first
    /// snapshot kept) and zero-quantity lines are dropped. Returns `None`
    /// if the resulting total does not fit in a `Decimal`.
    #[must_use]
    pub fn from_lines(lines: impl IntoIterator<Item = CartLine>) -> Option<Self> {
        let mut merged: Vec<CartLine> = Vec::new();
        for line in lines {
            if line.quantity == 0 {
                continue;
            }
            match merged.iter_mut().find(|m| m.product.id == line.product.id) {
                Some(existing) => {
                    existing.quantity = existing.quantity.saturating_add(line.quantity);
                }
                None => merged.push(line),
            }
        }
        let (item_count, total) = totals(&merged)?;
        Some(Self {
            lines: merged,
            item_count,
            total,
        })
    }

    /// Lines in the order they were first added.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Sum of all line quantities.
    #[must_use]
    pub const fn item_count(&self) -> u64 {
        self.item_count
    }

    /// Sum of all line totals.
    #[must_use]
    pub const fn total(&self) -> Decimal {
        self.total
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// The line for a product, if present.
    #[must_use]
    pub fn line(&self, product_id: &ProductId) -> Option<&CartLine> {
        self.lines
            .iter()
            .find(|line| &line.product.id == product_id)
    }

    /// Add `quantity` of `product` (clamped to at least 1).
    pub fn add_item(&mut self, product: &Product, quantity: i64) -> bool {
        self.apply(CartOp::Add {
            product: product.snapshot(),
            quantity,
        })
    }

    /// Set the quantity of an existing line; `quantity <= 0` removes it.
    pub fn update_quantity(&mut self, product_id: &ProductId, quantity: i64) -> bool {
        self.apply(CartOp::UpdateQuantity {
            product_id: product_id.clone(),
            quantity,
        })
    }

    pub fn remove_item(&mut self, product_id: &ProductId) -> bool {
        self.apply(CartOp::Remove {
            product_id: product_id.clone(),
        })
    }

    pub fn increment(&mut self, product_id: &ProductId) -> bool {
        self.apply(CartOp::Increment {
            product_id: product_id.clone(),
        })
    }

    pub fn decrement(&mut self, product_id: &ProductId) -> bool {
        self.apply(CartOp::Decrement {
            product_id: product_id.clone(),
        })
    }

    pub fn clear(&mut self) -> bool {
        self.apply(CartOp::Clear)
    }

    /// Apply a transition. Returns `true` if the lines changed.
    ///
    /// The transition runs against a copy of the lines; the cart is only
    /// updated once the new aggregates have been computed, so a change
    /// whose total would overflow leaves the cart untouched.
    pub fn apply(&mut self, op: CartOp) -> bool {
        let mut lines = self.lines.clone();
        if !transition(&mut lines, op) {
            return false;
        }

        let Some((item_count, total)) = totals(&lines) else {
            warn!(lines = lines.len(), "Change would overflow cart total");
            return false;
        };
        self.lines = lines;
        self.item_count = item_count;
        self.total = total;
        true
    }
}

// =============================================================================
// Transitions
// =============================================================================

fn transition(lines: &mut Vec<CartLine>, op: CartOp) -> bool {
    match op {
        CartOp::Add {
            mut product,
            quantity,
        } => {
            product.price = product.price.max(Decimal::ZERO);
            let quantity = clamp_quantity(quantity.max(1));
            match find_mut(lines, &product.id) {
                Some(line) => {
                    let merged = line.quantity.saturating_add(quantity);
                    let changed = merged != line.quantity;
                    line.quantity = merged;
                    changed
                }
                None => {
                    lines.push(CartLine { product, quantity });
                    true
                }
            }
        }
        CartOp::UpdateQuantity {
            product_id,
            quantity,
        } if quantity <= 0 => remove(lines, &product_id),
        CartOp::UpdateQuantity {
            product_id,
            quantity,
        } => set_quantity(lines, &product_id, |_| clamp_quantity(quantity)),
        CartOp::Remove { product_id } => remove(lines, &product_id),
        CartOp::Increment { product_id } => {
            set_quantity(lines, &product_id, |n| n.saturating_add(1))
        }
        CartOp::Decrement { product_id } => {
            set_quantity(lines, &product_id, |n| n.saturating_sub(1).max(1))
        }
        CartOp::Deduct { items } => {
            let mut changed = false;
            for (product_id, ordered) in items {
                if ordered == 0 {
                    continue;
                }
                match find_mut(lines, &product_id) {
                    Some(line) if line.quantity > ordered => {
                        line.quantity -= ordered;
                        changed = true;
                    }
                    Some(_) => changed |= remove(lines, &product_id),
                    None => {}
                }
            }
            changed
        }
        CartOp::Clear => {
            let changed = !lines.is_empty();
            lines.clear();
            changed
        }
    }
}

fn find_mut<'a>(lines: &'a mut [CartLine], product_id: &ProductId) -> Option<&'a mut CartLine> {
    lines.iter_mut().find(|line| &line.product.id == product_id)
}

/// Replace an existing line's quantity with `next(current)`.
fn set_quantity(
    lines: &mut [CartLine],
    product_id: &ProductId,
    next: impl FnOnce(u32) -> u32,
) -> bool {
    match find_mut(lines, product_id) {
        Some(line) => {
            let quantity = next(line.quantity);
            let changed = quantity != line.quantity;
            line.quantity = quantity;
            changed
        }
        None => false,
    }
}

fn remove(lines: &mut Vec<CartLine>, product_id: &ProductId) -> bool {
    let before = lines.len();
    lines.retain(|line| &line.product.id != product_id);
    lines.len() != before
}

/// Item count and total of `lines`, or `None` if either overflows.
fn totals(lines: &[CartLine]) -> Option<(u64, Decimal)> {
    let mut count = 0_u64;
    let mut total = Decimal::ZERO;
    for line in lines {
        let quantity = Decimal::from(line.quantity);
        total = total.checked_add(line.product.price.checked_mul(quantity)?)?;
        count = count.checked_add(u64::from(line.quantity))?;
    }
    Some((count, total))
}

/// Fit a positive quantity into a line quantity.
fn clamp_quantity(quantity: i64) -> u32 {
    u32::try_from(quantity).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: &str, price: i64) -> Product {
        Product::new(id, format!("Product {id}"), Decimal::from(price))
    }

    fn pid(id: &str) -> ProductId {
        ProductId::new(id)
    }

    #[test]
    fn test_new_cart_is_empty() {
        let cart = Cart::new();
        assert!(cart.is_empty());
        assert_eq!(cart.item_count(), 0);
        assert_eq!(cart.total(), Decimal::ZERO);
    }

    #[test]
    fn test_add_merges_same_product() {
        let mut cart = Cart::new();
        cart.add_item(&product("P", 4), 2);
        cart.add_item(&product("P", 4), 3);
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.line(&pid("P")).map(|l| l.quantity), Some(5));
        assert_eq!(cart.total(), Decimal::from(20));
    }

    #[test]
    fn test_add_keeps_first_snapshot_price() {
        let mut cart = Cart::new();
        cart.add_item(&product("P", 4), 1);
        cart.add_item(&product("P", 100), 1);
        assert_eq!(cart.total(), Decimal::from(8));
    }

    #[test]
    fn test_add_preserves_insertion_order() {
        let mut cart = Cart::new();
        cart.add_item(&product("B", 1), 1);
        cart.add_item(&product("A", 1), 1);
        cart.add_item(&product("B", 1), 1);
        let ids: Vec<&str> = cart.lines().iter().map(|l| l.product.id.as_str()).collect();
        assert_eq!(ids, ["B", "A"]);
    }

    #[test]
    fn test_add_clamps_non_positive_quantity() {
        let mut cart = Cart::new();
        assert!(cart.add_item(&product("P", 3), 0));
        assert!(cart.add_item(&product("P", 3), -7));
        assert_eq!(cart.item_count(), 2);
        assert_eq!(cart.total(), Decimal::from(6));
    }

    #[test]
    fn test_add_saturates_quantity() {
        let mut cart = Cart::new();
        cart.add_item(&product("P", 0), i64::MAX);
        assert_eq!(cart.item_count(), u64::from(u32::MAX));
        assert!(!cart.add_item(&product("P", 0), 1));
    }

    #[test]
    fn test_update_is_absolute() {
        let mut cart = Cart::new();
        cart.add_item(&product("P", 2), 1);
        assert!(cart.update_quantity(&pid("P"), 5));
        assert_eq!(cart.item_count(), 5);
        assert_eq!(cart.total(), Decimal::from(10));
    }

    #[test]
    fn test_update_to_zero_removes() {
        let mut cart = Cart::new();
        cart.add_item(&product("P", 2), 3);
        assert!(cart.update_quantity(&pid("P"), 0));
        assert!(cart.is_empty());
        assert_eq!(cart.total(), Decimal::ZERO);
    }

    #[test]
    fn test_update_negative_removes() {
        let mut cart = Cart::new();
        cart.add_item(&product("P", 2), 3);
        assert!(cart.update_quantity(&pid("P"), -1));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_update_unknown_is_noop() {
        let mut cart = Cart::new();
        cart.add_item(&product("P", 2), 3);
        let before = cart.clone();
        assert!(!cart.update_quantity(&pid("missing"), 4));
        assert_eq!(cart, before);
    }

    #[test]
    fn test_update_same_quantity_reports_unchanged() {
        let mut cart = Cart::new();
        cart.add_item(&product("P", 2), 3);
        assert!(!cart.update_quantity(&pid("P"), 3));
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut cart = Cart::new();
        cart.add_item(&product("A", 1), 1);
        cart.add_item(&product("B", 1), 1);
        assert!(cart.remove_item(&pid("A")));
        let once = cart.clone();
        assert!(!cart.remove_item(&pid("A")));
        assert_eq!(cart, once);
    }

    #[test]
    fn test_increment_and_decrement() {
        let mut cart = Cart::new();
        cart.add_item(&product("P", 3), 1);
        assert!(cart.increment(&pid("P")));
        assert_eq!(cart.item_count(), 2);
        assert!(cart.decrement(&pid("P")));
        assert_eq!(cart.item_count(), 1);
    }

    #[test]
    fn test_decrement_at_one_is_noop() {
        let mut cart = Cart::new();
        cart.add_item(&product("P", 3), 1);
        assert!(!cart.decrement(&pid("P")));
        assert_eq!(cart.line(&pid("P")).map(|l| l.quantity), Some(1));
    }

    #[test]
    fn test_increment_unknown_is_noop() {
        let mut cart = Cart::new();
        assert!(!cart.increment(&pid("P")));
        assert!(!cart.decrement(&pid("P")));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_clear() {
        let mut cart = Cart::new();
        cart.add_item(&product("A", 10), 2);
        assert!(cart.clear());
        assert_eq!(cart, Cart::new());
        assert!(!cart.clear());
    }

    #[test]
    fn test_from_lines_merges_duplicates_and_drops_zero() {
        let snapshot = product("A", 2).snapshot();
        let cart = Cart::from_lines([
            CartLine {
                product: snapshot.clone(),
                quantity: 1,
            },
            CartLine {
                product: product("Z", 9).snapshot(),
                quantity: 0,
            },
            CartLine {
                product: snapshot,
                quantity: 2,
            },
        ])
        .unwrap();
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.item_count(), 3);
        assert_eq!(cart.total(), Decimal::from(6));
    }

    #[test]
    fn test_op_product_id() {
        assert_eq!(CartOp::Clear.product_id(), None);
        assert_eq!(CartOp::Deduct { items: Vec::new() }.product_id(), None);
        let op = CartOp::Remove {
            product_id: pid("X"),
        };
        assert_eq!(op.product_id(), Some(&pid("X")));
    }

    #[test]
    fn test_overflowing_add_leaves_cart_untouched() {
        let mut cart = Cart::new();
        cart.add_item(&product("A", 1), 2);
        let before = cart.clone();

        let huge = Product::new("B", "Huge", Decimal::MAX);
        assert!(!cart.add_item(&huge, i64::MAX));
        assert_eq!(cart, before);
        assert_eq!(cart.item_count(), 2);
        assert_eq!(cart.total(), Decimal::from(2));
    }

    #[test]
    fn test_overflowing_increment_is_rejected() {
        let mut cart = Cart::new();
        let priciest = Product::new("A", "Priciest", Decimal::MAX);
        assert!(cart.add_item(&priciest, 1));
        assert!(!cart.increment(&pid("A")));
        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.total(), Decimal::MAX);
    }

    #[test]
    fn test_from_lines_rejects_overflowing_total() {
        let line = CartLine {
            product: Product::new("A", "Huge", Decimal::MAX).snapshot(),
            quantity: 2,
        };
        assert!(Cart::from_lines([line]).is_none());
    }

    #[test]
    fn test_add_floors_negative_snapshot_price() {
        let mut snapshot = product("A", 1).snapshot();
        snapshot.price = Decimal::from(-5);
        let mut cart = Cart::new();
        assert!(cart.apply(CartOp::Add {
            product: snapshot,
            quantity: 1,
        }));
        assert_eq!(cart.total(), Decimal::ZERO);
        assert_eq!(
            cart.line(&pid("A")).map(|l| l.product.price),
            Some(Decimal::ZERO)
        );
    }

    #[test]
    fn test_deduct_removes_only_ordered_quantities() {
        let mut cart = Cart::new();
        cart.add_item(&product("A", 10), 3);
        cart.add_item(&product("B", 5), 1);
        cart.add_item(&product("C", 2), 1);

        assert!(cart.apply(CartOp::Deduct {
            items: vec![(pid("A"), 2), (pid("B"), 1), (pid("missing"), 4)],
        }));
        let left: Vec<(&str, u32)> = cart
            .lines()
            .iter()
            .map(|l| (l.product.id.as_str(), l.quantity))
            .collect();
        assert_eq!(left, [("A", 1), ("C", 1)]);
        assert_eq!(cart.total(), Decimal::from(12));
    }

    #[test]
    fn test_deduct_of_absent_lines_is_noop() {
        let mut cart = Cart::new();
        cart.add_item(&product("A", 10), 1);
        assert!(!cart.apply(CartOp::Deduct {
            items: vec![(pid("Z"), 1), (pid("A"), 0)],
        }));
    }
}
