//! # Order API
//!
//! - `GET /v1/orders` — own orders for customers, all (+ `status` filter) for staff
//! - `GET /v1/orders/:id` — get order (owner or staff)
//! - `POST /v1/orders/:id/cancel` — cancel while `PENDING`/`PAID`
//! - `PUT /v1/orders/:id/status` — staff-driven lifecycle transition
//! - `POST /v1/orders/:id/payments` — record payment, `PENDING` → `PAID`
//! - `GET /v1/orders/:id/payments` — payments for an order
//!
//! Lifecycle side effects live here, next to the transitions that trigger
//! them: `SHIPPED` commits reserved stock, `DELIVERED` credits loyalty
//! coins, and `CANCELLED`/`REFUNDED` release reservations and return
//! redeemed coins.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use petstore_checkout::{Order, OrderStatus};
use petstore_core::{parse_amount, OrderId, PaymentId};

use crate::auth::{require_role, CallerIdentity, Role};
use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::state::{AppState, PaymentMethod, PaymentRecord};

/// Request to transition an order's status.
#[derive(Debug, Deserialize, ToSchema)]
pub struct TransitionOrderRequest {
    #[schema(value_type = String, example = "PROCESSING")]
    pub status: OrderStatus,
    /// Required when transitioning to `SHIPPED`.
    #[serde(default)]
    pub tracking_number: Option<String>,
    /// Optional operator note for the transition log.
    #[serde(default)]
    pub note: Option<String>,
}

impl Validate for TransitionOrderRequest {
    fn validate(&self) -> Result<(), String> {
        if self.status == OrderStatus::Shipped {
            match &self.tracking_number {
                Some(t) if !t.trim().is_empty() => {}
                _ => return Err("tracking_number is required for SHIPPED".to_string()),
            }
        }
        if let Some(ref note) = self.note {
            if note.len() > 500 {
                return Err("note must not exceed 500 characters".to_string());
            }
        }
        Ok(())
    }
}

/// Request to record a payment.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RecordPaymentRequest {
    pub method: PaymentMethod,
    /// Decimal amount string; must equal the order's grand total.
    pub amount: String,
}

impl Validate for RecordPaymentRequest {
    fn validate(&self) -> Result<(), String> {
        match parse_amount(&self.amount) {
            Some(cents) if cents >= 0 => Ok(()),
            _ => Err(format!("amount {:?} is not a valid amount", self.amount)),
        }
    }
}

/// Query parameters for order listing.
#[derive(Debug, Default, Deserialize)]
pub struct OrderListQuery {
    pub status: Option<OrderStatus>,
}

/// Build the orders router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/orders", get(list_orders))
        .route("/v1/orders/:id", get(get_order))
        .route("/v1/orders/:id/cancel", post(cancel_order))
        .route("/v1/orders/:id/status", put(transition_order))
        .route(
            "/v1/orders/:id/payments",
            get(list_payments).post(record_payment),
        )
}

/// Load an order and verify the caller may see it. 404 hides other
/// customers' orders.
fn load_order(state: &AppState, id: Uuid, caller: &CallerIdentity) -> Result<Order, AppError> {
    let order = state
        .orders
        .get(&OrderId(id))
        .ok_or_else(|| AppError::NotFound(format!("order {id} not found")))?;
    if !caller.can_access_user(order.user_id) {
        return Err(AppError::NotFound(format!("order {id} not found")));
    }
    Ok(order)
}

/// Release an order's stock reservations (cancel/refund path).
fn release_reservations(state: &AppState, order: &Order) {
    state.variants.with_all_mut(|variants| {
        for line in &order.lines {
            if let Some(v) = variants.get_mut(&line.variant_id) {
                if let Err(e) = v.release(line.qty) {
                    tracing::warn!(
                        order_id = %order.id,
                        sku = %line.sku,
                        error = %e,
                        "reservation already gone during release"
                    );
                } else {
                    v.updated_at = Utc::now();
                }
            }
        }
    });
}

/// Return redeemed coins to the customer after cancel/refund.
fn refund_coins(state: &AppState, order: &Order) {
    if order.totals.coin_discount_cents == 0 {
        return;
    }
    state.users.update(&order.user_id, |u| {
        u.coin_balance = u.coin_balance.saturating_add(order.totals.coin_discount_cents);
        u.updated_at = Utc::now();
    });
}

/// Persist an order's current state, surfacing failure as 500.
async fn persist_order(state: &AppState, order: &Order) -> Result<(), AppError> {
    if let Some(pool) = &state.db_pool {
        if let Err(e) = crate::db::orders::update_order_status(pool, order).await {
            tracing::error!(order_id = %order.id, error = %e, "failed to persist order update");
            return Err(AppError::Internal(
                "order updated in-memory but database persist failed".to_string(),
            ));
        }
        for line in &order.lines {
            if let Some(variant) = state.variants.get(&line.variant_id) {
                if let Err(e) = crate::db::catalog::update_variant(pool, &variant).await {
                    tracing::error!(variant_id = %variant.id, error = %e, "failed to persist stock update");
                }
            }
        }
        if let Some(user) = state.users.get(&order.user_id) {
            if let Err(e) = crate::db::users::update_user(pool, &user).await {
                tracing::error!(user_id = %user.id, error = %e, "failed to persist balance update");
            }
        }
    }
    Ok(())
}

/// GET /v1/orders — List orders.
#[utoipa::path(
    get,
    path = "/v1/orders",
    params(("status" = Option<String>, Query, description = "Filter by status")),
    responses((status = 200, description = "List of orders")),
    tag = "orders"
)]
pub(crate) async fn list_orders(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Query(query): Query<OrderListQuery>,
) -> Json<Vec<Order>> {
    let mut orders: Vec<Order> = state
        .orders
        .list()
        .into_iter()
        .filter(|o| caller.can_access_user(o.user_id))
        .filter(|o| query.status.map_or(true, |s| o.status == s))
        .collect();
    orders.sort_by(|a, b| b.placed_at.cmp(&a.placed_at));
    Json(orders)
}

/// GET /v1/orders/:id — Get a single order.
#[utoipa::path(
    get,
    path = "/v1/orders/{id}",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order found"),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "orders"
)]
pub(crate) async fn get_order(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    load_order(&state, id, &caller).map(Json)
}

/// POST /v1/orders/:id/cancel — Cancel an order.
///
/// Owner or staff; legal while `PENDING` or `PAID`. Releases stock
/// reservations and returns redeemed coins.
#[utoipa::path(
    post,
    path = "/v1/orders/{id}/cancel",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order cancelled"),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 409, description = "Too late to cancel", body = crate::error::ErrorBody),
    ),
    tag = "orders"
)]
pub(crate) async fn cancel_order(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    load_order(&state, id, &caller)?;

    let result = state
        .orders
        .try_update(&OrderId(id), |order| {
            order.apply_transition(OrderStatus::Cancelled, Some("cancelled by request".into()))?;
            Ok::<_, petstore_core::StateError>(order.clone())
        })
        .ok_or_else(|| AppError::NotFound(format!("order {id} not found")))?;
    let order = result.map_err(AppError::from)?;

    release_reservations(&state, &order);
    refund_coins(&state, &order);
    persist_order(&state, &order).await?;

    tracing::info!(order_id = %order.id, "order cancelled");
    Ok(Json(order))
}

/// PUT /v1/orders/:id/status — Staff-driven lifecycle transition.
///
/// `SHIPPED` requires a tracking number and commits reserved stock.
/// `DELIVERED` credits the order's loyalty coins. `REFUNDED` releases
/// reservations and returns redeemed coins.
#[utoipa::path(
    put,
    path = "/v1/orders/{id}/status",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = TransitionOrderRequest,
    responses(
        (status = 200, description = "Status updated"),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 409, description = "Illegal transition", body = crate::error::ErrorBody),
    ),
    tag = "orders"
)]
pub(crate) async fn transition_order(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    body: Result<Json<TransitionOrderRequest>, JsonRejection>,
) -> Result<Json<Order>, AppError> {
    require_role(&caller, Role::Staff)?;
    let req = extract_validated_json(body)?;

    let result = state
        .orders
        .try_update(&OrderId(id), |order| {
            order.apply_transition(req.status, req.note.clone())?;
            if req.status == OrderStatus::Shipped {
                order.tracking_number = req.tracking_number.clone();
            }
            Ok::<_, petstore_core::StateError>(order.clone())
        })
        .ok_or_else(|| AppError::NotFound(format!("order {id} not found")))?;
    let order = result.map_err(AppError::from)?;

    match req.status {
        OrderStatus::Shipped => {
            // The parcel left the warehouse: reservations become real
            // decrements.
            state.variants.with_all_mut(|variants| {
                for line in &order.lines {
                    if let Some(v) = variants.get_mut(&line.variant_id) {
                        if let Err(e) = v.commit(line.qty) {
                            tracing::warn!(
                                order_id = %order.id,
                                sku = %line.sku,
                                error = %e,
                                "reservation missing during commit"
                            );
                        } else {
                            v.updated_at = Utc::now();
                        }
                    }
                }
            });
        }
        OrderStatus::Delivered => {
            if order.totals.coins_earned > 0 {
                state.users.update(&order.user_id, |u| {
                    u.coin_balance = u.coin_balance.saturating_add(order.totals.coins_earned);
                    u.updated_at = Utc::now();
                });
                tracing::info!(
                    order_id = %order.id,
                    user_id = %order.user_id,
                    coins = order.totals.coins_earned,
                    "loyalty coins credited"
                );
            }
        }
        OrderStatus::Refunded => {
            release_reservations(&state, &order);
            refund_coins(&state, &order);
        }
        _ => {}
    }

    persist_order(&state, &order).await?;
    Ok(Json(order))
}

/// POST /v1/orders/:id/payments — Record a payment.
///
/// Only `PENDING` orders accept payment, the amount must equal the grand
/// total, and a successful payment transitions the order to `PAID`.
#[utoipa::path(
    post,
    path = "/v1/orders/{id}/payments",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = RecordPaymentRequest,
    responses(
        (status = 201, description = "Payment recorded", body = PaymentRecord),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 409, description = "Order not payable", body = crate::error::ErrorBody),
        (status = 422, description = "Amount mismatch", body = crate::error::ErrorBody),
    ),
    tag = "payments"
)]
pub(crate) async fn record_payment(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    body: Result<Json<RecordPaymentRequest>, JsonRejection>,
) -> Result<(axum::http::StatusCode, Json<PaymentRecord>), AppError> {
    let req = extract_validated_json(body)?;
    let order = load_order(&state, id, &caller)?;

    let amount_cents = parse_amount(&req.amount)
        .ok_or_else(|| AppError::Validation("amount is not a valid amount".to_string()))?;
    if amount_cents != order.totals.grand_total_cents {
        return Err(AppError::Validation(format!(
            "amount {} does not match grand total {}",
            petstore_core::format_amount(amount_cents),
            petstore_core::format_amount(order.totals.grand_total_cents),
        )));
    }

    let result = state
        .orders
        .try_update(&OrderId(id), |order| {
            order.apply_transition(OrderStatus::Paid, Some(format!("paid via {}", req.method.as_str())))?;
            Ok::<_, petstore_core::StateError>(order.clone())
        })
        .ok_or_else(|| AppError::NotFound(format!("order {id} not found")))?;
    let order = result.map_err(AppError::from)?;

    let record = PaymentRecord {
        id: PaymentId::new(),
        order_id: order.id,
        method: req.method,
        amount_cents,
        created_at: Utc::now(),
    };
    state.payments.insert(record.id, record.clone());

    if let Some(pool) = &state.db_pool {
        if let Err(e) = crate::db::orders::insert_payment(pool, &record).await {
            tracing::error!(payment_id = %record.id, error = %e, "failed to persist payment");
            return Err(AppError::Internal(
                "payment recorded in-memory but database persist failed".to_string(),
            ));
        }
    }
    persist_order(&state, &order).await?;

    tracing::info!(
        order_id = %order.id,
        amount_cents,
        method = req.method.as_str(),
        "payment recorded"
    );
    Ok((axum::http::StatusCode::CREATED, Json(record)))
}

/// GET /v1/orders/:id/payments — Payments recorded against an order.
#[utoipa::path(
    get,
    path = "/v1/orders/{id}/payments",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Payments", body = Vec<PaymentRecord>),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "payments"
)]
pub(crate) async fn list_payments(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<PaymentRecord>>, AppError> {
    let order = load_order(&state, id, &caller)?;
    let mut payments: Vec<PaymentRecord> = state
        .payments
        .list()
        .into_iter()
        .filter(|p| p.order_id == order.id)
        .collect();
    payments.sort_by(|a, b| a.created_at.cmp(&b.created_at));
    Ok(Json(payments))
}
