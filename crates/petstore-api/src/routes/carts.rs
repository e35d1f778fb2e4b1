//! # Cart & Checkout API
//!
//! - `POST /v1/carts` — create a cart (guest, or bound to the caller)
//! - `GET /v1/carts/:id` — get cart
//! - `POST /v1/carts/:id/items` — add an item (snapshots price/weight)
//! - `PUT /v1/carts/:id/items/:variant_id` — set quantity (0 removes)
//! - `DELETE /v1/carts/:id/items/:variant_id` — remove a line
//! - `POST /v1/carts/:id/apply-coins` — stage coin redemption
//! - `POST /v1/carts/:id/merge` — merge a guest cart into this one
//! - `POST /v1/carts/:id/checkout` — place the order
//!
//! Checkout is the only multi-store operation in the API: it reserves stock
//! across all variants under a single write lock, debits the coin balance,
//! inserts the order, and deletes the cart. A reservation failure aborts
//! before anything else has happened.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use petstore_checkout::{
    checkout as run_checkout, Cart, CartLine, CartOwner, Order, ShippingAddress, MAX_LINE_QTY,
};
use petstore_core::{CartId, UserId, VariantId};

use crate::auth::CallerIdentity;
use crate::error::AppError;
use crate::extractors::{extract_json, extract_validated_json, Validate};
use crate::state::AppState;

/// Request to add an item to a cart.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AddItemRequest {
    pub variant_id: Uuid,
    pub qty: u32,
}

impl Validate for AddItemRequest {
    fn validate(&self) -> Result<(), String> {
        if self.qty == 0 || self.qty > MAX_LINE_QTY {
            return Err(format!("qty must be within 1..={MAX_LINE_QTY}"));
        }
        Ok(())
    }
}

/// Request to change a line's quantity.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SetQtyRequest {
    /// New quantity; zero removes the line.
    pub qty: u32,
}

impl Validate for SetQtyRequest {
    fn validate(&self) -> Result<(), String> {
        if self.qty > MAX_LINE_QTY {
            return Err(format!("qty must not exceed {MAX_LINE_QTY}"));
        }
        Ok(())
    }
}

/// Request to stage coin redemption on a cart.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ApplyCoinsRequest {
    /// Coins to redeem at checkout. Bounds are enforced when the order is
    /// placed, where the balance is known.
    pub coins: i64,
}

impl Validate for ApplyCoinsRequest {
    fn validate(&self) -> Result<(), String> {
        if self.coins < 0 {
            return Err("coins must not be negative".to_string());
        }
        Ok(())
    }
}

/// Request to merge another cart into this one.
#[derive(Debug, Deserialize, ToSchema)]
pub struct MergeCartRequest {
    pub source_cart_id: Uuid,
}

/// Request to place the order.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CheckoutRequest {
    #[schema(value_type = Object)]
    pub shipping_address: ShippingAddress,
}

impl Validate for CheckoutRequest {
    fn validate(&self) -> Result<(), String> {
        self.shipping_address.validate().map_err(|e| e.to_string())
    }
}

/// Build the carts router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/carts", post(create_cart))
        .route("/v1/carts/:id", get(get_cart))
        .route("/v1/carts/:id/items", post(add_item))
        .route(
            "/v1/carts/:id/items/:variant_id",
            put(set_qty).delete(remove_item),
        )
        .route("/v1/carts/:id/apply-coins", post(apply_coins))
        .route("/v1/carts/:id/merge", post(merge_cart))
        .route("/v1/carts/:id/checkout", post(checkout_cart))
}

/// Load a cart and verify the caller may act on it.
///
/// Guest carts are addressable by anyone holding the (unguessable) cart ID;
/// user-owned carts follow the standard ownership rules, with 404 hiding
/// other customers' carts.
fn load_cart(state: &AppState, id: Uuid, caller: &CallerIdentity) -> Result<Cart, AppError> {
    let cart = state
        .carts
        .get(&CartId(id))
        .ok_or_else(|| AppError::NotFound(format!("cart {id} not found")))?;
    match cart.owner {
        CartOwner::Guest => Ok(cart),
        CartOwner::User(owner) => {
            if caller.can_access_user(owner) {
                Ok(cart)
            } else {
                Err(AppError::NotFound(format!("cart {id} not found")))
            }
        }
    }
}

/// POST /v1/carts — Create a cart.
///
/// Bound to the caller's user when the token carries one, guest otherwise.
#[utoipa::path(
    post,
    path = "/v1/carts",
    responses((status = 201, description = "Cart created")),
    tag = "carts"
)]
pub(crate) async fn create_cart(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> (axum::http::StatusCode, Json<Cart>) {
    let owner = match caller.user_id {
        Some(user_id) => CartOwner::User(user_id),
        None => CartOwner::Guest,
    };
    let cart = Cart::new(owner);
    state.carts.insert(cart.id, cart.clone());
    (axum::http::StatusCode::CREATED, Json(cart))
}

/// GET /v1/carts/:id — Get a cart.
#[utoipa::path(
    get,
    path = "/v1/carts/{id}",
    params(("id" = Uuid, Path, description = "Cart ID")),
    responses(
        (status = 200, description = "Cart found"),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "carts"
)]
pub(crate) async fn get_cart(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<Cart>, AppError> {
    load_cart(&state, id, &caller).map(Json)
}

/// POST /v1/carts/:id/items — Add an item to a cart.
///
/// Snapshots the variant's current price, weight, and dimensions into the
/// line. Rejects variants of non-purchasable products and quantities beyond
/// current availability.
#[utoipa::path(
    post,
    path = "/v1/carts/{id}/items",
    params(("id" = Uuid, Path, description = "Cart ID")),
    request_body = AddItemRequest,
    responses(
        (status = 200, description = "Item added"),
        (status = 404, description = "Cart or variant not found", body = crate::error::ErrorBody),
        (status = 409, description = "Not enough stock", body = crate::error::ErrorBody),
    ),
    tag = "carts"
)]
pub(crate) async fn add_item(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    body: Result<Json<AddItemRequest>, JsonRejection>,
) -> Result<Json<Cart>, AppError> {
    let req = extract_validated_json(body)?;
    let cart = load_cart(&state, id, &caller)?;

    let variant_id = VariantId(req.variant_id);
    let variant = state
        .variants
        .get(&variant_id)
        .ok_or_else(|| AppError::NotFound(format!("variant {} not found", req.variant_id)))?;

    let product = state
        .products
        .get(&variant.product_id)
        .ok_or_else(|| AppError::NotFound(format!("product for variant {variant_id} not found")))?;
    if !product.purchasable() {
        return Err(AppError::Conflict(format!(
            "product {:?} is not purchasable",
            product.slug
        )));
    }

    // Soft availability check: the hard reservation happens at checkout.
    let already_in_cart = cart
        .lines
        .iter()
        .find(|l| l.variant_id == variant_id)
        .map(|l| l.qty)
        .unwrap_or(0);
    let wanted = already_in_cart.saturating_add(req.qty);
    if wanted > variant.available() {
        return Err(AppError::Conflict(format!(
            "only {} of {} available",
            variant.available(),
            variant.sku
        )));
    }

    let line = CartLine::from_variant(&variant, req.qty);
    let result = state
        .carts
        .try_update(&CartId(id), |cart| cart.add_line(line))
        .ok_or_else(|| AppError::NotFound(format!("cart {id} not found")))?;
    result.map_err(AppError::from)?;

    state
        .carts
        .get(&CartId(id))
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("cart {id} not found")))
}

/// PUT /v1/carts/:id/items/:variant_id — Set a line's quantity.
#[utoipa::path(
    put,
    path = "/v1/carts/{id}/items/{variant_id}",
    params(
        ("id" = Uuid, Path, description = "Cart ID"),
        ("variant_id" = Uuid, Path, description = "Variant ID"),
    ),
    request_body = SetQtyRequest,
    responses(
        (status = 200, description = "Quantity updated"),
        (status = 404, description = "Cart or line not found", body = crate::error::ErrorBody),
    ),
    tag = "carts"
)]
pub(crate) async fn set_qty(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path((id, variant_id)): Path<(Uuid, Uuid)>,
    body: Result<Json<SetQtyRequest>, JsonRejection>,
) -> Result<Json<Cart>, AppError> {
    let req = extract_validated_json(body)?;
    load_cart(&state, id, &caller)?;

    let result = state
        .carts
        .try_update(&CartId(id), |cart| {
            cart.set_qty(VariantId(variant_id), req.qty)
        })
        .ok_or_else(|| AppError::NotFound(format!("cart {id} not found")))?;
    result.map_err(AppError::from)?;

    state
        .carts
        .get(&CartId(id))
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("cart {id} not found")))
}

/// DELETE /v1/carts/:id/items/:variant_id — Remove a line.
#[utoipa::path(
    delete,
    path = "/v1/carts/{id}/items/{variant_id}",
    params(
        ("id" = Uuid, Path, description = "Cart ID"),
        ("variant_id" = Uuid, Path, description = "Variant ID"),
    ),
    responses(
        (status = 200, description = "Line removed"),
        (status = 404, description = "Cart or line not found", body = crate::error::ErrorBody),
    ),
    tag = "carts"
)]
pub(crate) async fn remove_item(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path((id, variant_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Cart>, AppError> {
    load_cart(&state, id, &caller)?;

    let result = state
        .carts
        .try_update(&CartId(id), |cart| cart.remove_line(VariantId(variant_id)))
        .ok_or_else(|| AppError::NotFound(format!("cart {id} not found")))?;
    result.map_err(AppError::from)?;

    state
        .carts
        .get(&CartId(id))
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("cart {id} not found")))
}

/// POST /v1/carts/:id/apply-coins — Stage coin redemption.
#[utoipa::path(
    post,
    path = "/v1/carts/{id}/apply-coins",
    params(("id" = Uuid, Path, description = "Cart ID")),
    request_body = ApplyCoinsRequest,
    responses(
        (status = 200, description = "Coins staged"),
        (status = 404, description = "Cart not found", body = crate::error::ErrorBody),
    ),
    tag = "carts"
)]
pub(crate) async fn apply_coins(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    body: Result<Json<ApplyCoinsRequest>, JsonRejection>,
) -> Result<Json<Cart>, AppError> {
    let req = extract_validated_json(body)?;
    load_cart(&state, id, &caller)?;

    state
        .carts
        .update(&CartId(id), |cart| cart.apply_coins(req.coins))
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("cart {id} not found")))
}

/// POST /v1/carts/:id/merge — Merge a guest cart into this one.
///
/// The destination must be bound to the caller's user; the source must be a
/// guest cart. The source is deleted after the merge.
#[utoipa::path(
    post,
    path = "/v1/carts/{id}/merge",
    params(("id" = Uuid, Path, description = "Destination cart ID")),
    request_body = MergeCartRequest,
    responses(
        (status = 200, description = "Carts merged"),
        (status = 404, description = "Cart not found", body = crate::error::ErrorBody),
        (status = 409, description = "Source is not a guest cart", body = crate::error::ErrorBody),
    ),
    tag = "carts"
)]
pub(crate) async fn merge_cart(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    body: Result<Json<MergeCartRequest>, JsonRejection>,
) -> Result<Json<Cart>, AppError> {
    let req = extract_json(body)?;

    let dest = load_cart(&state, id, &caller)?;
    if !matches!(dest.owner, CartOwner::User(_)) {
        return Err(AppError::Conflict(
            "merge destination must be a user-owned cart".to_string(),
        ));
    }

    let source_id = CartId(req.source_cart_id);
    let source = state
        .carts
        .get(&source_id)
        .ok_or_else(|| AppError::NotFound(format!("cart {} not found", req.source_cart_id)))?;
    if !matches!(source.owner, CartOwner::Guest) {
        return Err(AppError::Conflict(
            "merge source must be a guest cart".to_string(),
        ));
    }

    let merged = state
        .carts
        .update(&CartId(id), |cart| cart.merge_from(&source))
        .ok_or_else(|| AppError::NotFound(format!("cart {id} not found")))?;
    state.carts.remove(&source_id);

    Ok(Json(merged))
}

/// POST /v1/carts/:id/checkout — Place the order.
///
/// Reserves stock for every line under one lock, debits the staged coins,
/// creates a `PENDING` order, and deletes the cart. Returns 409 with the
/// offending SKUs when stock is insufficient.
#[utoipa::path(
    post,
    path = "/v1/carts/{id}/checkout",
    params(("id" = Uuid, Path, description = "Cart ID")),
    request_body = CheckoutRequest,
    responses(
        (status = 201, description = "Order placed"),
        (status = 404, description = "Cart not found", body = crate::error::ErrorBody),
        (status = 409, description = "Empty cart or insufficient stock", body = crate::error::ErrorBody),
        (status = 422, description = "Validation error", body = crate::error::ErrorBody),
    ),
    tag = "carts"
)]
pub(crate) async fn checkout_cart(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    body: Result<Json<CheckoutRequest>, JsonRejection>,
) -> Result<(axum::http::StatusCode, Json<Order>), AppError> {
    let req = extract_validated_json(body)?;
    let cart = load_cart(&state, id, &caller)?;

    // Checkout needs a user to bill: the cart's owner, or the caller's own
    // user when a guest cart is checked out after login.
    let user_id: UserId = match cart.owner {
        CartOwner::User(user_id) => user_id,
        CartOwner::Guest => caller.user_id.ok_or_else(|| {
            AppError::Forbidden("checkout requires a user-bound token".to_string())
        })?,
    };
    let user = state
        .users
        .get(&user_id)
        .ok_or_else(|| AppError::NotFound(format!("user {user_id} not found")))?;

    // Every line must still be purchasable.
    for line in &cart.lines {
        let variant = state.variants.get(&line.variant_id).ok_or_else(|| {
            AppError::Conflict(format!("variant {} no longer exists", line.sku))
        })?;
        let product = state.products.get(&variant.product_id).ok_or_else(|| {
            AppError::Conflict(format!("product for {} no longer exists", line.sku))
        })?;
        if !product.purchasable() {
            return Err(AppError::Conflict(format!(
                "product {:?} is no longer purchasable",
                product.slug
            )));
        }
    }

    let outcome = run_checkout(
        &cart,
        user_id,
        user.coin_balance,
        &state.shipping_rates,
        req.shipping_address,
    )
    .map_err(AppError::from)?;

    // Reserve stock for all lines atomically: validate everything first,
    // then mutate, all under one write lock.
    let reserve_result = state.variants.with_all_mut(|variants| {
        let mut shortages: Vec<serde_json::Value> = Vec::new();
        for line in &cart.lines {
            match variants.get(&line.variant_id) {
                Some(v) if line.qty <= v.available() => {}
                Some(v) => shortages.push(serde_json::json!({
                    "sku": line.sku.as_str(),
                    "requested": line.qty,
                    "available": v.available(),
                })),
                None => shortages.push(serde_json::json!({
                    "sku": line.sku.as_str(),
                    "requested": line.qty,
                    "available": 0,
                })),
            }
        }
        if !shortages.is_empty() {
            return Err(shortages);
        }
        for line in &cart.lines {
            if let Some(v) = variants.get_mut(&line.variant_id) {
                // Checked above under the same lock.
                let _ = v.reserve(line.qty);
                v.updated_at = chrono::Utc::now();
            }
        }
        Ok(())
    });
    if let Err(shortages) = reserve_result {
        return Err(AppError::ConflictWithDetails {
            message: "insufficient stock".to_string(),
            details: serde_json::json!({ "shortages": shortages }),
        });
    }

    // Debit the staged coins.
    let updated_user = state
        .users
        .update(&user_id, |u| {
            u.coin_balance = outcome.new_coin_balance;
            u.updated_at = chrono::Utc::now();
        })
        .ok_or_else(|| AppError::Internal("user vanished during checkout".to_string()))?;

    let order = outcome.order;
    state.orders.insert(order.id, order.clone());
    state.carts.remove(&CartId(id));

    // Write-through. Failure is surfaced because the order would be lost on
    // restart.
    if let Some(pool) = &state.db_pool {
        if let Err(e) = crate::db::orders::insert_order(pool, &order).await {
            tracing::error!(order_id = %order.id, error = %e, "failed to persist order");
            return Err(AppError::Internal(
                "order recorded in-memory but database persist failed".to_string(),
            ));
        }
        for line in &order.lines {
            if let Some(variant) = state.variants.get(&line.variant_id) {
                if let Err(e) = crate::db::catalog::update_variant(pool, &variant).await {
                    tracing::error!(variant_id = %variant.id, error = %e, "failed to persist reservation");
                }
            }
        }
        if let Err(e) = crate::db::users::update_user(pool, &updated_user).await {
            tracing::error!(user_id = %user_id, error = %e, "failed to persist coin debit");
        }
    }

    tracing::info!(
        order_id = %order.id,
        user_id = %user_id,
        grand_total_cents = order.totals.grand_total_cents,
        "order placed"
    );

    Ok((axum::http::StatusCode::CREATED, Json(order)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{
        body_json, customer_app_with_state, seed_user, seed_variant, staff_app_with_state,
    };
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use petstore_checkout::OrderStatus;
    use tower::ServiceExt;

    const ADDRESS: &str = r#"{"recipient":"A. Customer","line1":"1 Main St","line2":null,"city":"Springfield","postal_code":"12345","country":"US"}"#;

    fn json_req(method: &str, uri: String, body: String) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    async fn create_cart(app: &axum::Router) -> Cart {
        let req = Request::builder()
            .method("POST")
            .uri("/v1/carts")
            .body(Body::empty())
            .unwrap();
        body_json(app.clone().oneshot(req).await.unwrap()).await
    }

    #[tokio::test]
    async fn customer_cart_is_user_owned() {
        let state = AppState::new();
        let user = seed_user(&state, 0);
        let app = customer_app_with_state(router(), state, user);
        let cart = create_cart(&app).await;
        assert_eq!(cart.owner, CartOwner::User(user));
    }

    #[tokio::test]
    async fn add_update_remove_item() {
        let state = AppState::new();
        let user = seed_user(&state, 0);
        let variant = seed_variant(&state, "KIBBLE-2KG", 2499, 10);
        let app = customer_app_with_state(router(), state, user);
        let cart = create_cart(&app).await;

        let resp = app
            .clone()
            .oneshot(json_req(
                "POST",
                format!("/v1/carts/{}/items", cart.id.0),
                format!(r#"{{"variant_id":"{}","qty":2}}"#, variant.0),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let cart_now: Cart = body_json(resp).await;
        assert_eq!(cart_now.lines.len(), 1);
        assert_eq!(cart_now.lines[0].unit_price_cents, 2499);

        let resp = app
            .clone()
            .oneshot(json_req(
                "PUT",
                format!("/v1/carts/{}/items/{}", cart.id.0, variant.0),
                r#"{"qty":5}"#.to_string(),
            ))
            .await
            .unwrap();
        let cart_now: Cart = body_json(resp).await;
        assert_eq!(cart_now.lines[0].qty, 5);

        let req = Request::builder()
            .method("DELETE")
            .uri(format!("/v1/carts/{}/items/{}", cart.id.0, variant.0))
            .body(Body::empty())
            .unwrap();
        let cart_now: Cart = body_json(app.oneshot(req).await.unwrap()).await;
        assert!(cart_now.lines.is_empty());
    }

    #[tokio::test]
    async fn add_beyond_availability_conflicts() {
        let state = AppState::new();
        let user = seed_user(&state, 0);
        let variant = seed_variant(&state, "KIBBLE-2KG", 2499, 3);
        let app = customer_app_with_state(router(), state, user);
        let cart = create_cart(&app).await;

        let resp = app
            .oneshot(json_req(
                "POST",
                format!("/v1/carts/{}/items", cart.id.0),
                format!(r#"{{"variant_id":"{}","qty":4}}"#, variant.0),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn checkout_reserves_stock_and_empties_cart() {
        let state = AppState::new();
        let user = seed_user(&state, 0);
        let variant = seed_variant(&state, "KIBBLE-2KG", 2499, 10);
        let app = customer_app_with_state(router(), state.clone(), user);
        let cart = create_cart(&app).await;

        let resp = app
            .clone()
            .oneshot(json_req(
                "POST",
                format!("/v1/carts/{}/items", cart.id.0),
                format!(r#"{{"variant_id":"{}","qty":2}}"#, variant.0),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = app
            .oneshot(json_req(
                "POST",
                format!("/v1/carts/{}/checkout", cart.id.0),
                format!(r#"{{"shipping_address":{ADDRESS}}}"#),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let order: Order = body_json(resp).await;
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.totals.subtotal_cents, 4998);
        assert_eq!(order.user_id, user);

        let v = state.variants.get(&VariantId(variant.0)).unwrap();
        assert_eq!(v.stock_reserved, 2);
        assert!(!state.carts.contains(&cart.id), "cart is deleted");
        assert_eq!(state.orders.len(), 1);
    }

    #[tokio::test]
    async fn checkout_empty_cart_conflicts() {
        let state = AppState::new();
        let user = seed_user(&state, 0);
        let app = customer_app_with_state(router(), state, user);
        let cart = create_cart(&app).await;

        let resp = app
            .oneshot(json_req(
                "POST",
                format!("/v1/carts/{}/checkout", cart.id.0),
                format!(r#"{{"shipping_address":{ADDRESS}}}"#),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn checkout_with_stale_stock_lists_shortages() {
        let state = AppState::new();
        let user = seed_user(&state, 0);
        let variant = seed_variant(&state, "KIBBLE-2KG", 2499, 5);
        let app = customer_app_with_state(router(), state.clone(), user);
        let cart = create_cart(&app).await;

        let resp = app
            .clone()
            .oneshot(json_req(
                "POST",
                format!("/v1/carts/{}/items", cart.id.0),
                format!(r#"{{"variant_id":"{}","qty":5}}"#, variant.0),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        // Stock drains behind the cart's back.
        state
            .variants
            .update(&VariantId(variant.0), |v| v.stock_on_hand = 2);

        let resp = app
            .oneshot(json_req(
                "POST",
                format!("/v1/carts/{}/checkout", cart.id.0),
                format!(r#"{{"shipping_address":{ADDRESS}}}"#),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        let body: serde_json::Value = body_json(resp).await;
        assert_eq!(body["error"]["details"]["shortages"][0]["sku"], "KIBBLE-2KG");
        assert_eq!(body["error"]["details"]["shortages"][0]["available"], 2);

        // Nothing was reserved.
        let v = state.variants.get(&VariantId(variant.0)).unwrap();
        assert_eq!(v.stock_reserved, 0);
    }

    #[tokio::test]
    async fn checkout_applies_coins_and_debits_balance() {
        let state = AppState::new();
        let user = seed_user(&state, 2_000);
        let variant = seed_variant(&state, "BED-XL", 10_000, 4);
        let app = customer_app_with_state(router(), state.clone(), user);
        let cart = create_cart(&app).await;

        let resp = app
            .clone()
            .oneshot(json_req(
                "POST",
                format!("/v1/carts/{}/items", cart.id.0),
                format!(r#"{{"variant_id":"{}","qty":1}}"#, variant.0),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = app
            .clone()
            .oneshot(json_req(
                "POST",
                format!("/v1/carts/{}/apply-coins", cart.id.0),
                r#"{"coins":1500}"#.to_string(),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = app
            .oneshot(json_req(
                "POST",
                format!("/v1/carts/{}/checkout", cart.id.0),
                format!(r#"{{"shipping_address":{ADDRESS}}}"#),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let order: Order = body_json(resp).await;
        assert_eq!(order.totals.coin_discount_cents, 1500);
        assert_eq!(order.totals.shipping_cents, 0, "free over threshold");
        assert_eq!(order.totals.grand_total_cents, 8_500);

        assert_eq!(state.users.get(&user).unwrap().coin_balance, 500);
    }

    #[tokio::test]
    async fn coin_overdraw_at_checkout_is_422() {
        let state = AppState::new();
        let user = seed_user(&state, 100);
        let variant = seed_variant(&state, "TOY-BALL", 1_000, 10);
        let app = customer_app_with_state(router(), state.clone(), user);
        let cart = create_cart(&app).await;

        app.clone()
            .oneshot(json_req(
                "POST",
                format!("/v1/carts/{}/items", cart.id.0),
                format!(r#"{{"variant_id":"{}","qty":1}}"#, variant.0),
            ))
            .await
            .unwrap();
        app.clone()
            .oneshot(json_req(
                "POST",
                format!("/v1/carts/{}/apply-coins", cart.id.0),
                r#"{"coins":400}"#.to_string(),
            ))
            .await
            .unwrap();

        let resp = app
            .oneshot(json_req(
                "POST",
                format!("/v1/carts/{}/checkout", cart.id.0),
                format!(r#"{{"shipping_address":{ADDRESS}}}"#),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn merge_guest_cart_into_user_cart() {
        let state = AppState::new();
        let user = seed_user(&state, 0);
        let variant = seed_variant(&state, "KIBBLE-2KG", 2499, 10);

        // Guest adds an item.
        let guest_app = staff_app_with_state(router(), state.clone());
        let guest_cart: Cart = {
            // Staff token has no user binding → guest cart.
            let req = Request::builder()
                .method("POST")
                .uri("/v1/carts")
                .body(Body::empty())
                .unwrap();
            body_json(guest_app.clone().oneshot(req).await.unwrap()).await
        };
        assert_eq!(guest_cart.owner, CartOwner::Guest);
        guest_app
            .clone()
            .oneshot(json_req(
                "POST",
                format!("/v1/carts/{}/items", guest_cart.id.0),
                format!(r#"{{"variant_id":"{}","qty":3}}"#, variant.0),
            ))
            .await
            .unwrap();

        // Customer logs in, merges.
        let app = customer_app_with_state(router(), state.clone(), user);
        let user_cart = create_cart(&app).await;
        let resp = app
            .oneshot(json_req(
                "POST",
                format!("/v1/carts/{}/merge", user_cart.id.0),
                format!(r#"{{"source_cart_id":"{}"}}"#, guest_cart.id.0),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let merged: Cart = body_json(resp).await;
        assert_eq!(merged.lines.len(), 1);
        assert_eq!(merged.lines[0].qty, 3);
        assert!(!state.carts.contains(&guest_cart.id), "source deleted");
    }

    #[tokio::test]
    async fn other_customers_cart_is_hidden() {
        let state = AppState::new();
        let owner = seed_user(&state, 0);
        let app = customer_app_with_state(router(), state.clone(), owner);
        let cart = create_cart(&app).await;

        let other = customer_app_with_state(router(), state, UserId::new());
        let req = Request::builder()
            .method("GET")
            .uri(format!("/v1/carts/{}", cart.id.0))
            .body(Body::empty())
            .unwrap();
        assert_eq!(
            other.oneshot(req).await.unwrap().status(),
            StatusCode::NOT_FOUND
        );
    }
}
