//! # Variants & Stock Accounting
//!
//! A variant is the purchasable unit of a product: it owns the SKU, price,
//! physical dimensions, and stock counters. Stock is tracked as two counters:
//!
//! - `stock_on_hand` — units physically in the warehouse.
//! - `stock_reserved` — units promised to placed-but-unshipped orders.
//!
//! Invariant: `stock_reserved <= stock_on_hand`. Checkout reserves, order
//! cancellation releases, and shipping commits (decrements both). All three
//! operations validate their preconditions and return [`StockError`] rather
//! than silently clamping.

use chrono::{DateTime, Utc};
use petstore_core::{ProductId, ValidationError, VariantId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stock accounting failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StockError {
    /// Requested more units than are currently available.
    #[error("insufficient stock: requested {requested}, available {available}")]
    Insufficient {
        /// Units the caller asked for.
        requested: u32,
        /// Units currently available (on hand minus reserved).
        available: u32,
    },

    /// Tried to release or commit more units than are reserved.
    #[error("not reserved: requested {requested}, reserved {reserved}")]
    NotReserved {
        /// Units the caller asked for.
        requested: u32,
        /// Units currently reserved.
        reserved: u32,
    },

    /// Quantity must be at least one.
    #[error("quantity must be positive")]
    ZeroQuantity,
}

/// Validated stock-keeping unit.
///
/// Serializes as a plain string. Construction enforces the format:
/// trimmed, uppercased input of 1–64 ASCII alphanumerics and hyphens.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sku(String);

impl Sku {
    /// Create a validated SKU. Lowercase input is uppercased.
    pub fn new(s: impl Into<String>) -> Result<Self, ValidationError> {
        let s: String = s.into();
        let s = s.trim().to_ascii_uppercase();
        if s.is_empty() {
            return Err(ValidationError::Empty { field: "sku" });
        }
        if s.len() > 64 {
            return Err(ValidationError::TooLong {
                field: "sku",
                max: 64,
            });
        }
        if !s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(ValidationError::Malformed {
                field: "sku",
                reason: "expected ASCII alphanumerics and hyphens".to_string(),
            });
        }
        Ok(Self(s))
    }

    /// The SKU as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Sku {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Package dimensions in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub length_mm: u32,
    pub width_mm: u32,
    pub height_mm: u32,
}

impl Dimensions {
    /// Volume in cubic millimetres, saturating on overflow.
    pub fn volume_mm3(&self) -> u64 {
        (self.length_mm as u64)
            .saturating_mul(self.width_mm as u64)
            .saturating_mul(self.height_mm as u64)
    }
}

/// A purchasable product variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variant {
    pub id: VariantId,
    pub product_id: ProductId,
    pub sku: Sku,
    /// Display name, e.g. "2 kg bag".
    pub display_name: String,
    /// Unit price in cents. Never negative.
    pub price_cents: i64,
    /// Actual packaged weight.
    pub weight_grams: u32,
    /// Packaged dimensions, for volumetric shipping weight.
    pub dims_mm: Dimensions,
    pub stock_on_hand: u32,
    pub stock_reserved: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Variant {
    /// Units available to sell right now.
    pub fn available(&self) -> u32 {
        self.stock_on_hand.saturating_sub(self.stock_reserved)
    }

    /// Reserve `qty` units for a placed order.
    pub fn reserve(&mut self, qty: u32) -> Result<(), StockError> {
        if qty == 0 {
            return Err(StockError::ZeroQuantity);
        }
        let available = self.available();
        if qty > available {
            return Err(StockError::Insufficient {
                requested: qty,
                available,
            });
        }
        self.stock_reserved += qty;
        Ok(())
    }

    /// Release a reservation (order cancelled before shipping).
    pub fn release(&mut self, qty: u32) -> Result<(), StockError> {
        if qty == 0 {
            return Err(StockError::ZeroQuantity);
        }
        if qty > self.stock_reserved {
            return Err(StockError::NotReserved {
                requested: qty,
                reserved: self.stock_reserved,
            });
        }
        self.stock_reserved -= qty;
        Ok(())
    }

    /// Commit a reservation: the units left the warehouse.
    /// Decrements both `stock_reserved` and `stock_on_hand`.
    pub fn commit(&mut self, qty: u32) -> Result<(), StockError> {
        if qty == 0 {
            return Err(StockError::ZeroQuantity);
        }
        if qty > self.stock_reserved {
            return Err(StockError::NotReserved {
                requested: qty,
                reserved: self.stock_reserved,
            });
        }
        self.stock_reserved -= qty;
        self.stock_on_hand -= qty;
        Ok(())
    }

    /// Absolute restock: set `stock_on_hand`, keeping existing reservations.
    /// Rejects totals below the reserved count — reservations are promises
    /// already made to customers.
    pub fn restock(&mut self, new_on_hand: u32) -> Result<(), StockError> {
        if new_on_hand < self.stock_reserved {
            return Err(StockError::NotReserved {
                requested: new_on_hand,
                reserved: self.stock_reserved,
            });
        }
        self.stock_on_hand = new_on_hand;
        Ok(())
    }

    /// Validate display name and price rules shared by the API and pack loader.
    pub fn validate_fields(display_name: &str, price_cents: i64) -> Result<(), ValidationError> {
        if display_name.trim().is_empty() {
            return Err(ValidationError::Empty {
                field: "display_name",
            });
        }
        if display_name.len() > 200 {
            return Err(ValidationError::TooLong {
                field: "display_name",
                max: 200,
            });
        }
        if price_cents < 0 {
            return Err(ValidationError::OutOfRange {
                field: "price_cents",
                min: 0,
                max: i64::MAX,
                actual: price_cents,
            });
        }
        Ok(())
    }
}
