//! Order and payment persistence.
//!
//! Order lines, the shipping address, and the transition log are stored as
//! JSONB snapshots — they are written whole and never queried field-wise.
//! Rows whose JSONB fails to deserialize are skipped with an error log
//! rather than aborting the whole hydration.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use petstore_checkout::{Order, OrderTotals};
use petstore_core::{OrderId, PaymentId, UserId};

use crate::state::{PaymentMethod, PaymentRecord};

// ── Orders ──────────────────────────────────────────────────────────

/// Insert a newly placed order.
pub async fn insert_order(pool: &PgPool, record: &Order) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO orders (id, user_id, status, lines, subtotal_cents, coin_discount_cents,
         shipping_cents, grand_total_cents, coins_earned, shipping_address, tracking_number,
         transition_log, placed_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
    )
    .bind(record.id.0)
    .bind(record.user_id.0)
    .bind(record.status.as_str())
    .bind(serde_json::to_value(&record.lines).unwrap_or_else(|_| serde_json::json!([])))
    .bind(record.totals.subtotal_cents)
    .bind(record.totals.coin_discount_cents)
    .bind(record.totals.shipping_cents)
    .bind(record.totals.grand_total_cents)
    .bind(record.totals.coins_earned)
    .bind(
        serde_json::to_value(&record.shipping_address)
            .unwrap_or_else(|_| serde_json::json!({})),
    )
    .bind(&record.tracking_number)
    .bind(serde_json::to_value(&record.transition_log).unwrap_or_else(|_| serde_json::json!([])))
    .bind(record.placed_at)
    .bind(record.updated_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Update an order's status, tracking number, and transition log.
pub async fn update_order_status(pool: &PgPool, record: &Order) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE orders SET status = $1, tracking_number = $2, transition_log = $3,
         updated_at = $4 WHERE id = $5",
    )
    .bind(record.status.as_str())
    .bind(&record.tracking_number)
    .bind(serde_json::to_value(&record.transition_log).unwrap_or_else(|_| serde_json::json!([])))
    .bind(record.updated_at)
    .bind(record.id.0)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Load all orders on startup.
pub async fn load_orders(pool: &PgPool) -> Result<Vec<Order>, sqlx::Error> {
    let rows = sqlx::query_as::<_, OrderRow>(
        "SELECT id, user_id, status, lines, subtotal_cents, coin_discount_cents,
         shipping_cents, grand_total_cents, coins_earned, shipping_address, tracking_number,
         transition_log, placed_at, updated_at
         FROM orders ORDER BY placed_at",
    )
    .fetch_all(pool)
    .await?;

    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        match row.into_record() {
            Some(record) => records.push(record),
            None => {
                tracing::error!("skipping order row with undecodable payload during load_orders");
            }
        }
    }
    Ok(records)
}

fn parse_order_status(s: &str) -> Option<petstore_checkout::OrderStatus> {
    use petstore_checkout::OrderStatus::*;
    match s {
        "PENDING" => Some(Pending),
        "PAID" => Some(Paid),
        "PROCESSING" => Some(Processing),
        "SHIPPED" => Some(Shipped),
        "DELIVERED" => Some(Delivered),
        "CANCELLED" => Some(Cancelled),
        "REFUNDED" => Some(Refunded),
        other => {
            tracing::warn!(status = other, "unknown order status in database");
            None
        }
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    user_id: Uuid,
    status: String,
    lines: serde_json::Value,
    subtotal_cents: i64,
    coin_discount_cents: i64,
    shipping_cents: i64,
    grand_total_cents: i64,
    coins_earned: i64,
    shipping_address: serde_json::Value,
    tracking_number: Option<String>,
    transition_log: serde_json::Value,
    placed_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_record(self) -> Option<Order> {
        let status = parse_order_status(&self.status)?;
        let lines = match serde_json::from_value(self.lines) {
            Ok(lines) => lines,
            Err(e) => {
                tracing::warn!(id = %self.id, error = %e, "undecodable order lines");
                return None;
            }
        };
        let shipping_address = match serde_json::from_value(self.shipping_address) {
            Ok(addr) => addr,
            Err(e) => {
                tracing::warn!(id = %self.id, error = %e, "undecodable shipping address");
                return None;
            }
        };
        let transition_log = match serde_json::from_value(self.transition_log) {
            Ok(log) => log,
            Err(e) => {
                tracing::warn!(id = %self.id, error = %e, "undecodable transition log");
                return None;
            }
        };
        Some(Order {
            id: OrderId(self.id),
            user_id: UserId(self.user_id),
            lines,
            totals: OrderTotals {
                subtotal_cents: self.subtotal_cents,
                coin_discount_cents: self.coin_discount_cents,
                shipping_cents: self.shipping_cents,
                grand_total_cents: self.grand_total_cents,
                coins_earned: self.coins_earned,
            },
            status,
            shipping_address,
            tracking_number: self.tracking_number,
            transition_log,
            placed_at: self.placed_at,
            updated_at: self.updated_at,
        })
    }
}

// ── Payments ────────────────────────────────────────────────────────

/// Insert a recorded payment.
pub async fn insert_payment(pool: &PgPool, record: &PaymentRecord) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO payments (id, order_id, method, amount_cents, created_at)
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(record.id.0)
    .bind(record.order_id.0)
    .bind(record.method.as_str())
    .bind(record.amount_cents)
    .bind(record.created_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Load all payments on startup.
pub async fn load_payments(pool: &PgPool) -> Result<Vec<PaymentRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, PaymentRow>(
        "SELECT id, order_id, method, amount_cents, created_at FROM payments ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(PaymentRow::into_record).collect())
}

fn parse_payment_method(s: &str) -> PaymentMethod {
    match s {
        "card" => PaymentMethod::Card,
        "wallet" => PaymentMethod::Wallet,
        "bank_transfer" => PaymentMethod::BankTransfer,
        other => {
            tracing::warn!(
                method = other,
                "unknown payment method in database, defaulting to card"
            );
            PaymentMethod::Card
        }
    }
}

#[derive(sqlx::FromRow)]
struct PaymentRow {
    id: Uuid,
    order_id: Uuid,
    method: String,
    amount_cents: i64,
    created_at: DateTime<Utc>,
}

impl PaymentRow {
    fn into_record(self) -> PaymentRecord {
        PaymentRecord {
            id: PaymentId(self.id),
            order_id: OrderId(self.order_id),
            method: parse_payment_method(&self.method),
            amount_cents: self.amount_cents,
            created_at: self.created_at,
        }
    }
}
