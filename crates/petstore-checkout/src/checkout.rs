//! # Checkout
//!
//! Turns a cart into a `PENDING` order. Pure with respect to storage: the
//! caller (the API layer) is responsible for reserving stock against the
//! live catalog before accepting the outcome, and for rolling back if any
//! reservation fails. This function validates the cart, prices it, debits
//! the coin balance, and freezes the lines into an order.

use chrono::Utc;
use petstore_core::{OrderId, UserId, ValidationError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cart::{Cart, MAX_LINE_QTY};
use crate::order::{Order, OrderLine, OrderStatus};
use crate::pricing::{price_order, PricingError};
use crate::shipping::ShippingRates;

/// Checkout failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CheckoutError {
    /// Cart or address validation failed.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Pricing rejected the cart.
    #[error(transparent)]
    Pricing(#[from] PricingError),

    /// A line quantity is outside bounds.
    #[error("line quantity {qty} for {sku} is outside 1..={max}", max = MAX_LINE_QTY)]
    QtyOutOfBounds {
        /// SKU of the offending line.
        sku: String,
        /// The rejected quantity.
        qty: u32,
    },
}

/// A shipping address, validated on construction at the API boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub recipient: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub postal_code: String,
    /// ISO 3166-1 alpha-2 country code.
    pub country: String,
}

impl ShippingAddress {
    /// Validate required fields and the country code shape.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (field, value) in [
            ("recipient", &self.recipient),
            ("line1", &self.line1),
            ("city", &self.city),
            ("postal_code", &self.postal_code),
        ] {
            if value.trim().is_empty() {
                return Err(ValidationError::Empty { field });
            }
            if value.len() > 200 {
                return Err(ValidationError::TooLong { field, max: 200 });
            }
        }
        if self.country.len() != 2 || !self.country.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(ValidationError::Malformed {
                field: "country",
                reason: "expected an ISO 3166-1 alpha-2 code, e.g. \"US\"".to_string(),
            });
        }
        Ok(())
    }
}

/// Result of a successful checkout.
#[derive(Debug, Clone)]
pub struct CheckoutOutcome {
    /// The new order, in `PENDING` status.
    pub order: Order,
    /// The customer's coin balance after redemption was debited.
    pub new_coin_balance: i64,
}

/// Validate and price a cart, producing a `PENDING` order.
pub fn checkout(
    cart: &Cart,
    user_id: UserId,
    coin_balance: i64,
    rates: &ShippingRates,
    address: ShippingAddress,
) -> Result<CheckoutOutcome, CheckoutError> {
    address.validate()?;

    for line in &cart.lines {
        if line.qty == 0 || line.qty > MAX_LINE_QTY {
            return Err(CheckoutError::QtyOutOfBounds {
                sku: line.sku.as_str().to_string(),
                qty: line.qty,
            });
        }
    }

    let (totals, _quote) = price_order(cart, coin_balance, rates)?;

    let now = Utc::now();
    let order = Order {
        id: OrderId::new(),
        user_id,
        lines: cart
            .lines
            .iter()
            .map(|l| OrderLine {
                variant_id: l.variant_id,
                sku: l.sku.clone(),
                display_name: l.display_name.clone(),
                qty: l.qty,
                unit_price_cents: l.unit_price_cents,
            })
            .collect(),
        totals,
        status: OrderStatus::Pending,
        shipping_address: address,
        tracking_number: None,
        transition_log: vec![],
        placed_at: now,
        updated_at: now,
    };

    Ok(CheckoutOutcome {
        order,
        new_coin_balance: coin_balance - totals.coin_discount_cents,
    })
}
