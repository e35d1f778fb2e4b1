//! # Orders & Lifecycle State Machine
//!
//! An order is an immutable snapshot of a priced cart plus a lifecycle
//! status. The status graph:
//!
//! ```text
//! PENDING ──► PAID ──► PROCESSING ──► SHIPPED ──► DELIVERED
//!    │          │           │
//!    ▼          ▼           ▼
//! CANCELLED  CANCELLED   REFUNDED
//!               │
//!               ▼
//!            REFUNDED
//! ```
//!
//! `DELIVERED`, `CANCELLED`, and `REFUNDED` are terminal. Every transition
//! is validated by [`OrderStatus::transition`] and recorded in the order's
//! transition log — state never changes without an audit entry.

use chrono::{DateTime, Utc};
use petstore_catalog::Sku;
use petstore_core::{OrderId, StateError, UserId, VariantId};
use serde::{Deserialize, Serialize};

use crate::checkout::ShippingAddress;
use crate::pricing::OrderTotals;

/// Order lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Placed, awaiting payment.
    Pending,
    /// Payment received in full.
    Paid,
    /// Being picked and packed.
    Processing,
    /// Handed to the courier.
    Shipped,
    /// Received by the customer. Terminal.
    Delivered,
    /// Cancelled before fulfilment. Terminal.
    Cancelled,
    /// Payment returned after cancellation was no longer possible. Terminal.
    Refunded,
}

impl OrderStatus {
    /// Return the string representation of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Paid => "PAID",
            Self::Processing => "PROCESSING",
            Self::Shipped => "SHIPPED",
            Self::Delivered => "DELIVERED",
            Self::Cancelled => "CANCELLED",
            Self::Refunded => "REFUNDED",
        }
    }

    /// Whether no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled | Self::Refunded)
    }

    /// Whether `self → to` is a legal transition.
    pub fn can_transition(&self, to: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, to),
            (Pending, Paid)
                | (Pending, Cancelled)
                | (Paid, Processing)
                | (Paid, Cancelled)
                | (Paid, Refunded)
                | (Processing, Shipped)
                | (Processing, Refunded)
                | (Shipped, Delivered)
        )
    }

    /// Validate a transition, returning the new status or a structured error.
    pub fn transition(&self, to: OrderStatus) -> Result<OrderStatus, StateError> {
        if self.can_transition(to) {
            Ok(to)
        } else {
            let reason = if self.is_terminal() {
                format!("{} is terminal", self.as_str())
            } else {
                "not a legal transition".to_string()
            };
            Err(StateError::InvalidTransition {
                from: self.as_str().to_string(),
                to: to.as_str().to_string(),
                reason,
            })
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line of an order — a frozen copy of the cart line at placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub variant_id: VariantId,
    pub sku: Sku,
    pub display_name: String,
    pub qty: u32,
    pub unit_price_cents: i64,
}

/// One entry of the order's transition log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub at: DateTime<Utc>,
    /// Operator note or system annotation (tracking number, cancel reason).
    pub note: Option<String>,
}

/// A placed order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub lines: Vec<OrderLine>,
    pub totals: OrderTotals,
    pub status: OrderStatus,
    pub shipping_address: ShippingAddress,
    /// Courier tracking number, set on the `Shipped` transition.
    pub tracking_number: Option<String>,
    pub transition_log: Vec<TransitionRecord>,
    pub placed_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Apply a validated status transition, appending to the transition log.
    pub fn apply_transition(
        &mut self,
        to: OrderStatus,
        note: Option<String>,
    ) -> Result<(), StateError> {
        let from = self.status;
        self.status = from.transition(to)?;
        let now = Utc::now();
        self.transition_log.push(TransitionRecord {
            from,
            to,
            at: now,
            note,
        });
        self.updated_at = now;
        Ok(())
    }
}
