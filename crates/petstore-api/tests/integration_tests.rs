//! End-to-end tests against the fully assembled application: real router,
//! middleware stack, and bearer-token auth. Exercises the storefront
//! journey from catalog seeding through checkout, payment, fulfilment, and
//! loyalty-coin accrual.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use petstore_api::state::{AppConfig, AppState};

const SECRET: &str = "integration-secret";

fn app_with_auth() -> (axum::Router, AppState) {
    let state = AppState::with_config(
        AppConfig {
            port: 0,
            auth_token: Some(SECRET.to_string()),
        },
        None,
    );
    (petstore_api::app(state.clone()), state)
}

fn staff_token() -> String {
    format!("staff::{SECRET}")
}

fn admin_token() -> String {
    SECRET.to_string() // legacy format → admin
}

fn customer_token(user_id: &str) -> String {
    format!("customer:{user_id}:{SECRET}")
}

fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    match body {
        Some(value) => builder
            .header("content-type", "application/json")
            .body(Body::from(value.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn json_body(resp: axum::response::Response) -> Value {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap_or_else(|e| {
        panic!(
            "body did not parse as JSON: {e}: {}",
            String::from_utf8_lossy(&bytes)
        )
    })
}

/// Seed a small catalog through the API and return (product_id, variant_id).
async fn seed_catalog(app: &axum::Router) -> (String, String) {
    let staff = staff_token();

    let resp = app
        .clone()
        .oneshot(request(
            "POST",
            "/v1/categories",
            Some(&staff),
            Some(serde_json::json!({"name": "Dog Food", "slug": "dog-food"})),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let category = json_body(resp).await;

    let resp = app
        .clone()
        .oneshot(request(
            "POST",
            "/v1/suppliers",
            Some(&staff),
            Some(serde_json::json!({
                "name": "Acme Pet Supply",
                "contact_email": "orders@acmepet.example"
            })),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let supplier = json_body(resp).await;

    let resp = app
        .clone()
        .oneshot(request(
            "POST",
            "/v1/products",
            Some(&staff),
            Some(serde_json::json!({
                "name": "Premium Kibble",
                "slug": "premium-kibble",
                "description": "Grain-free kibble for adult dogs.",
                "category_id": category["id"],
                "supplier_id": supplier["id"]
            })),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let product = json_body(resp).await;
    let product_id = product["id"].as_str().unwrap().to_string();

    // Promote to ACTIVE so it is purchasable.
    let resp = app
        .clone()
        .oneshot(request(
            "PUT",
            &format!("/v1/products/{product_id}"),
            Some(&staff),
            Some(serde_json::json!({"status": "ACTIVE"})),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/v1/products/{product_id}/variants"),
            Some(&staff),
            Some(serde_json::json!({
                "sku": "KIBBLE-2KG",
                "display_name": "2 kg bag",
                "price": "24.99",
                "weight_grams": 2000,
                "dims_mm": [300, 200, 100],
                "initial_stock": 10
            })),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let variant = json_body(resp).await;
    let variant_id = variant["id"].as_str().unwrap().to_string();

    (product_id, variant_id)
}

async fn register_customer(app: &axum::Router, email: &str) -> String {
    let resp = app
        .clone()
        .oneshot(request(
            "POST",
            "/v1/users/register",
            Some(&staff_token()),
            Some(serde_json::json!({"email": email, "display_name": "Pat"})),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let user = json_body(resp).await;
    user["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_probes_need_no_auth() {
    let (app, _) = app_with_auth();

    let resp = app
        .clone()
        .oneshot(request("GET", "/health/liveness", None, None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app
        .oneshot(request("GET", "/health/readiness", None, None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn api_requires_bearer_token() {
    let (app, _) = app_with_auth();

    let resp = app
        .clone()
        .oneshot(request("GET", "/v1/products", None, None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = app
        .oneshot(request("GET", "/v1/products", Some("wrong-token"), None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn customers_cannot_manage_catalog() {
    let (app, _) = app_with_auth();
    let user_id = register_customer(&app, "pat@example.com").await;

    let resp = app
        .oneshot(request(
            "POST",
            "/v1/categories",
            Some(&customer_token(&user_id)),
            Some(serde_json::json!({"name": "Toys", "slug": "toys"})),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn metrics_endpoint_serves_prometheus_text() {
    let (app, _) = app_with_auth();

    // Drive one authenticated request through the middleware first.
    let resp = app
        .clone()
        .oneshot(request("GET", "/v1/products", Some(&staff_token()), None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app
        .oneshot(request("GET", "/metrics", None, None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("petstore_http_requests_total"));
    assert!(text.contains("petstore_orders_total"));
}

#[tokio::test]
async fn openapi_spec_is_served() {
    let (app, _) = app_with_auth();
    let resp = app
        .oneshot(request("GET", "/openapi.json", Some(&staff_token()), None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let spec = json_body(resp).await;
    assert!(spec["paths"]["/v1/carts/{id}/checkout"].is_object());
}

#[tokio::test]
async fn full_storefront_journey() {
    let (app, state) = app_with_auth();
    let (product_id, variant_id) = seed_catalog(&app).await;
    let user_id = register_customer(&app, "pat@example.com").await;
    let customer = customer_token(&user_id);
    let staff = staff_token();

    // Customer opens a cart and adds two bags.
    let resp = app
        .clone()
        .oneshot(request("POST", "/v1/carts", Some(&customer), None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let cart = json_body(resp).await;
    let cart_id = cart["id"].as_str().unwrap().to_string();

    let resp = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/v1/carts/{cart_id}/items"),
            Some(&customer),
            Some(serde_json::json!({"variant_id": variant_id, "qty": 2})),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    // Checkout.
    let resp = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/v1/carts/{cart_id}/checkout"),
            Some(&customer),
            Some(serde_json::json!({
                "shipping_address": {
                    "recipient": "Pat Doe",
                    "line1": "1 Main St",
                    "line2": null,
                    "city": "Springfield",
                    "postal_code": "12345",
                    "country": "US"
                }
            })),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let order = json_body(resp).await;
    let order_id = order["id"].as_str().unwrap().to_string();
    // 2 × 24.99 = 49.98; 4 kg actual vs 2.4 kg volumetric → 14.99 shipping.
    assert_eq!(order["totals"]["subtotal_cents"], 4998);
    assert_eq!(order["totals"]["shipping_cents"], 1499);
    assert_eq!(order["totals"]["grand_total_cents"], 6497);
    assert_eq!(order["status"], "PENDING");

    // Pay the exact grand total.
    let resp = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/v1/orders/{order_id}/payments"),
            Some(&customer),
            Some(serde_json::json!({"method": "card", "amount": "64.97"})),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    // Staff fulfils: process → ship → deliver.
    for (body, expected) in [
        (serde_json::json!({"status": "PROCESSING"}), StatusCode::OK),
        (
            serde_json::json!({"status": "SHIPPED", "tracking_number": "TRACK-1"}),
            StatusCode::OK,
        ),
        (serde_json::json!({"status": "DELIVERED"}), StatusCode::OK),
    ] {
        let resp = app
            .clone()
            .oneshot(request(
                "PUT",
                &format!("/v1/orders/{order_id}/status"),
                Some(&staff),
                Some(body),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), expected);
    }

    // Stock left the warehouse.
    let resp = app
        .clone()
        .oneshot(request(
            "GET",
            &format!("/v1/products/{product_id}/variants"),
            Some(&customer),
            None,
        ))
        .await
        .unwrap();
    let variants = json_body(resp).await;
    assert_eq!(variants[0]["stock_on_hand"], 8);
    assert_eq!(variants[0]["stock_reserved"], 0);

    // Coins accrued on delivery: floor(4998/100) = 49.
    let resp = app
        .clone()
        .oneshot(request("GET", "/v1/users/me", Some(&customer), None))
        .await
        .unwrap();
    let me = json_body(resp).await;
    assert_eq!(me["coin_balance"], 49);

    // Customer leaves a review.
    let resp = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/v1/products/{product_id}/reviews"),
            Some(&customer),
            Some(serde_json::json!({"rating": 5, "body": "My dog approves."})),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    assert_eq!(state.orders.len(), 1);
    assert_eq!(state.reviews.len(), 1);
}

#[tokio::test]
async fn coins_redeem_on_next_order() {
    let (app, _state) = app_with_auth();
    let (_product_id, variant_id) = seed_catalog(&app).await;
    let user_id = register_customer(&app, "pat@example.com").await;
    let customer = customer_token(&user_id);

    // Admin grants promotional coins.
    let resp = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/v1/users/{user_id}/coins/grant"),
            Some(&admin_token()),
            Some(serde_json::json!({"coins": 1000})),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    // Cart with one bag, redeeming 1000 coins.
    let resp = app
        .clone()
        .oneshot(request("POST", "/v1/carts", Some(&customer), None))
        .await
        .unwrap();
    let cart = json_body(resp).await;
    let cart_id = cart["id"].as_str().unwrap().to_string();

    app.clone()
        .oneshot(request(
            "POST",
            &format!("/v1/carts/{cart_id}/items"),
            Some(&customer),
            Some(serde_json::json!({"variant_id": variant_id, "qty": 1})),
        ))
        .await
        .unwrap();
    let resp = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/v1/carts/{cart_id}/apply-coins"),
            Some(&customer),
            Some(serde_json::json!({"coins": 1000})),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/v1/carts/{cart_id}/checkout"),
            Some(&customer),
            Some(serde_json::json!({
                "shipping_address": {
                    "recipient": "Pat Doe",
                    "line1": "1 Main St",
                    "line2": null,
                    "city": "Springfield",
                    "postal_code": "12345",
                    "country": "US"
                }
            })),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let order = json_body(resp).await;
    // 24.99 − 10.00 coins + 8.99 shipping (2 kg tier).
    assert_eq!(order["totals"]["subtotal_cents"], 2499);
    assert_eq!(order["totals"]["coin_discount_cents"], 1000);
    assert_eq!(order["totals"]["shipping_cents"], 899);
    assert_eq!(order["totals"]["grand_total_cents"], 2398);

    // Balance debited immediately.
    let resp = app
        .oneshot(request("GET", "/v1/users/me", Some(&customer), None))
        .await
        .unwrap();
    let me = json_body(resp).await;
    assert_eq!(me["coin_balance"], 0);
}

#[tokio::test]
async fn cancelled_order_restores_stock_and_coins() {
    let (app, state) = app_with_auth();
    let (product_id, variant_id) = seed_catalog(&app).await;
    let user_id = register_customer(&app, "pat@example.com").await;
    let customer = customer_token(&user_id);

    let resp = app
        .clone()
        .oneshot(request("POST", "/v1/carts", Some(&customer), None))
        .await
        .unwrap();
    let cart = json_body(resp).await;
    let cart_id = cart["id"].as_str().unwrap().to_string();

    app.clone()
        .oneshot(request(
            "POST",
            &format!("/v1/carts/{cart_id}/items"),
            Some(&customer),
            Some(serde_json::json!({"variant_id": variant_id, "qty": 3})),
        ))
        .await
        .unwrap();
    let resp = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/v1/carts/{cart_id}/checkout"),
            Some(&customer),
            Some(serde_json::json!({
                "shipping_address": {
                    "recipient": "Pat Doe",
                    "line1": "1 Main St",
                    "line2": null,
                    "city": "Springfield",
                    "postal_code": "12345",
                    "country": "US"
                }
            })),
        ))
        .await
        .unwrap();
    let order = json_body(resp).await;
    let order_id = order["id"].as_str().unwrap().to_string();

    let resp = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/v1/orders/{order_id}/cancel"),
            Some(&customer),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let cancelled = json_body(resp).await;
    assert_eq!(cancelled["status"], "CANCELLED");

    let resp = app
        .oneshot(request(
            "GET",
            &format!("/v1/products/{product_id}/variants"),
            Some(&customer),
            None,
        ))
        .await
        .unwrap();
    let variants = json_body(resp).await;
    assert_eq!(variants[0]["stock_on_hand"], 10);
    assert_eq!(variants[0]["stock_reserved"], 0);

    assert_eq!(state.orders.list()[0].status.as_str(), "CANCELLED");
}
