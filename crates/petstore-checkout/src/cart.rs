//! # Carts
//!
//! A cart is a mutable list of variant lines plus an optional coin
//! application. Prices and weights are **snapshotted into the line** when the
//! item is added — a price change in the catalog does not silently reprice a
//! cart, and the checkout total matches what the customer saw.
//!
//! Guest carts (`CartOwner::Guest`) are merged into the user's cart on login.

use chrono::{DateTime, Utc};
use petstore_catalog::{Dimensions, Sku, Variant};
use petstore_core::{CartId, UserId, VariantId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum quantity for a single cart line.
pub const MAX_LINE_QTY: u32 = 999;

/// Maximum number of distinct lines in a cart.
pub const MAX_LINES: usize = 100;

/// Cart operation failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CartError {
    /// Quantity outside `1..=MAX_LINE_QTY`.
    #[error("quantity must be within 1..={MAX_LINE_QTY}, got {0}")]
    QtyOutOfRange(u32),

    /// The cart has no line for this variant.
    #[error("variant {0} is not in the cart")]
    LineNotFound(VariantId),

    /// The cart already holds the maximum number of distinct lines.
    #[error("cart cannot hold more than {MAX_LINES} distinct lines")]
    TooManyLines,
}

/// Who the cart belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "user_id", rename_all = "snake_case")]
pub enum CartOwner {
    /// Anonymous storefront session.
    Guest,
    /// A registered user.
    User(UserId),
}

/// One line of a cart. Price, weight, and dimensions are snapshots taken
/// when the line was added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub variant_id: VariantId,
    pub sku: Sku,
    pub display_name: String,
    pub qty: u32,
    pub unit_price_cents: i64,
    pub weight_grams: u32,
    pub dims_mm: Dimensions,
}

impl CartLine {
    /// Snapshot a variant into a cart line.
    pub fn from_variant(variant: &Variant, qty: u32) -> Self {
        Self {
            variant_id: variant.id,
            sku: variant.sku.clone(),
            display_name: variant.display_name.clone(),
            qty,
            unit_price_cents: variant.price_cents,
            weight_grams: variant.weight_grams,
            dims_mm: variant.dims_mm,
        }
    }

    /// Line subtotal in cents, saturating.
    pub fn subtotal_cents(&self) -> i64 {
        self.unit_price_cents.saturating_mul(self.qty as i64)
    }
}

/// A shopping cart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cart {
    pub id: CartId,
    pub owner: CartOwner,
    pub lines: Vec<CartLine>,
    /// Coins the customer wants to redeem at checkout. Validated against
    /// balance and the redemption cap when the order is placed.
    pub coins_applied: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    /// Create an empty cart.
    pub fn new(owner: CartOwner) -> Self {
        let now = Utc::now();
        Self {
            id: CartId::new(),
            owner,
            lines: Vec::new(),
            coins_applied: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the cart has no lines.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Merchandise subtotal in cents across all lines, saturating.
    pub fn subtotal_cents(&self) -> i64 {
        self.lines
            .iter()
            .fold(0i64, |acc, l| acc.saturating_add(l.subtotal_cents()))
    }

    /// Add a line. If the variant is already in the cart the quantities are
    /// merged (capped validation applies to the merged total).
    pub fn add_line(&mut self, line: CartLine) -> Result<(), CartError> {
        if line.qty == 0 || line.qty > MAX_LINE_QTY {
            return Err(CartError::QtyOutOfRange(line.qty));
        }
        if let Some(existing) = self
            .lines
            .iter_mut()
            .find(|l| l.variant_id == line.variant_id)
        {
            let merged = existing.qty.saturating_add(line.qty);
            if merged > MAX_LINE_QTY {
                return Err(CartError::QtyOutOfRange(merged));
            }
            existing.qty = merged;
            // Refresh the snapshot: the add carries the current catalog price.
            existing.unit_price_cents = line.unit_price_cents;
            existing.weight_grams = line.weight_grams;
            existing.dims_mm = line.dims_mm;
            existing.display_name = line.display_name;
        } else {
            if self.lines.len() >= MAX_LINES {
                return Err(CartError::TooManyLines);
            }
            self.lines.push(line);
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Set the quantity of an existing line. Zero removes the line.
    pub fn set_qty(&mut self, variant_id: VariantId, qty: u32) -> Result<(), CartError> {
        if qty > MAX_LINE_QTY {
            return Err(CartError::QtyOutOfRange(qty));
        }
        let idx = self
            .lines
            .iter()
            .position(|l| l.variant_id == variant_id)
            .ok_or(CartError::LineNotFound(variant_id))?;
        if qty == 0 {
            self.lines.remove(idx);
        } else {
            self.lines[idx].qty = qty;
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Remove a line entirely.
    pub fn remove_line(&mut self, variant_id: VariantId) -> Result<(), CartError> {
        let idx = self
            .lines
            .iter()
            .position(|l| l.variant_id == variant_id)
            .ok_or(CartError::LineNotFound(variant_id))?;
        self.lines.remove(idx);
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Merge another cart's lines into this one (guest cart on login).
    /// Quantities for shared variants add up to the line cap; overflowing
    /// lines are capped rather than rejected — losing the merge entirely
    /// would drop the customer's selections.
    pub fn merge_from(&mut self, other: &Cart) {
        for line in &other.lines {
            if let Some(existing) = self
                .lines
                .iter_mut()
                .find(|l| l.variant_id == line.variant_id)
            {
                existing.qty = existing.qty.saturating_add(line.qty).min(MAX_LINE_QTY);
            } else if self.lines.len() < MAX_LINES {
                self.lines.push(line.clone());
            }
        }
        self.updated_at = Utc::now();
    }

    /// Record the coins the customer wants to redeem. Bounds are enforced at
    /// checkout where the balance is known.
    pub fn apply_coins(&mut self, coins: i64) {
        self.coins_applied = coins.max(0);
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use petstore_core::ProductId;

    fn line(price: i64, qty: u32) -> CartLine {
        CartLine {
            variant_id: VariantId::new(),
            sku: Sku::new("TEST-SKU").unwrap(),
            display_name: "Test".to_string(),
            qty,
            unit_price_cents: price,
            weight_grams: 500,
            dims_mm: Dimensions {
                length_mm: 100,
                width_mm: 100,
                height_mm: 100,
            },
        }
    }

    fn variant_fixture(price: i64) -> Variant {
        let now = Utc::now();
        Variant {
            id: VariantId::new(),
            product_id: ProductId::new(),
            sku: Sku::new("FIX-1").unwrap(),
            display_name: "Fixture".to_string(),
            price_cents: price,
            weight_grams: 750,
            dims_mm: Dimensions {
                length_mm: 200,
                width_mm: 150,
                height_mm: 80,
            },
            stock_on_hand: 10,
            stock_reserved: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn new_cart_is_empty() {
        let cart = Cart::new(CartOwner::Guest);
        assert!(cart.is_empty());
        assert_eq!(cart.subtotal_cents(), 0);
        assert_eq!(cart.coins_applied, 0);
    }

    #[test]
    fn from_variant_snapshots_fields() {
        let v = variant_fixture(1299);
        let l = CartLine::from_variant(&v, 3);
        assert_eq!(l.variant_id, v.id);
        assert_eq!(l.unit_price_cents, 1299);
        assert_eq!(l.weight_grams, 750);
        assert_eq!(l.qty, 3);
        assert_eq!(l.subtotal_cents(), 3897);
    }

    #[test]
    fn add_line_then_subtotal() {
        let mut cart = Cart::new(CartOwner::Guest);
        cart.add_line(line(1000, 2)).unwrap();
        cart.add_line(line(250, 4)).unwrap();
        assert_eq!(cart.lines.len(), 2);
        assert_eq!(cart.subtotal_cents(), 3000);
    }

    #[test]
    fn add_same_variant_merges_qty_and_reprices() {
        let mut cart = Cart::new(CartOwner::Guest);
        let mut l = line(1000, 2);
        cart.add_line(l.clone()).unwrap();
        l.qty = 3;
        l.unit_price_cents = 900;
        cart.add_line(l).unwrap();
        assert_eq!(cart.lines.len(), 1);
        assert_eq!(cart.lines[0].qty, 5);
        assert_eq!(cart.lines[0].unit_price_cents, 900);
    }

    #[test]
    fn add_rejects_zero_and_overflow_qty() {
        let mut cart = Cart::new(CartOwner::Guest);
        assert!(matches!(
            cart.add_line(line(100, 0)),
            Err(CartError::QtyOutOfRange(0))
        ));
        assert!(cart.add_line(line(100, 1000)).is_err());

        let mut l = line(100, 600);
        cart.add_line(l.clone()).unwrap();
        l.qty = 600;
        assert!(cart.add_line(l).is_err(), "merged 1200 exceeds the cap");
    }

    #[test]
    fn set_qty_updates_and_zero_removes() {
        let mut cart = Cart::new(CartOwner::Guest);
        let l = line(100, 2);
        let vid = l.variant_id;
        cart.add_line(l).unwrap();

        cart.set_qty(vid, 7).unwrap();
        assert_eq!(cart.lines[0].qty, 7);

        cart.set_qty(vid, 0).unwrap();
        assert!(cart.is_empty());
    }

    #[test]
    fn set_qty_unknown_variant_fails() {
        let mut cart = Cart::new(CartOwner::Guest);
        assert!(matches!(
            cart.set_qty(VariantId::new(), 1),
            Err(CartError::LineNotFound(_))
        ));
    }

    #[test]
    fn remove_line_works_once() {
        let mut cart = Cart::new(CartOwner::Guest);
        let l = line(100, 2);
        let vid = l.variant_id;
        cart.add_line(l).unwrap();
        cart.remove_line(vid).unwrap();
        assert!(cart.remove_line(vid).is_err());
    }

    #[test]
    fn merge_adds_quantities_and_new_lines() {
        let mut user_cart = Cart::new(CartOwner::User(UserId::new()));
        let shared = line(100, 2);
        user_cart.add_line(shared.clone()).unwrap();

        let mut guest = Cart::new(CartOwner::Guest);
        let mut shared_again = shared.clone();
        shared_again.qty = 3;
        guest.add_line(shared_again).unwrap();
        guest.add_line(line(500, 1)).unwrap();

        user_cart.merge_from(&guest);
        assert_eq!(user_cart.lines.len(), 2);
        assert_eq!(user_cart.lines[0].qty, 5);
    }

    #[test]
    fn merge_caps_at_max_qty() {
        let mut a = Cart::new(CartOwner::Guest);
        let l = line(100, 900);
        a.add_line(l.clone()).unwrap();
        let mut b = Cart::new(CartOwner::Guest);
        let mut l2 = l.clone();
        l2.qty = 900;
        b.add_line(l2).unwrap();

        a.merge_from(&b);
        assert_eq!(a.lines[0].qty, MAX_LINE_QTY);
    }

    #[test]
    fn apply_coins_clamps_negative_to_zero() {
        let mut cart = Cart::new(CartOwner::Guest);
        cart.apply_coins(250);
        assert_eq!(cart.coins_applied, 250);
        cart.apply_coins(-10);
        assert_eq!(cart.coins_applied, 0);
    }
}
