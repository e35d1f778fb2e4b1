//! # petstore-api — Axum API Service for the Pet-Store Commerce Stack
//!
//! REST/JSON backend consumed by the storefront SPA and the admin screens.
//! Catalog and commerce logic live in `petstore-catalog` and
//! `petstore-checkout`; this crate owns HTTP concerns: routing, auth,
//! validation DTOs, rate limiting, metrics, OpenAPI, and persistence.
//!
//! ## API Surface
//!
//! | Prefix              | Module                  | Domain                |
//! |---------------------|-------------------------|-----------------------|
//! | `/v1/categories/*`  | [`routes::categories`]  | Category tree         |
//! | `/v1/suppliers/*`   | [`routes::suppliers`]   | Suppliers             |
//! | `/v1/products/*`    | [`routes::products`]    | Products & variants   |
//! | `/v1/products/*/reviews` | [`routes::reviews`] | Reviews              |
//! | `/v1/carts/*`       | [`routes::carts`]       | Carts & checkout      |
//! | `/v1/orders/*`      | [`routes::orders`]      | Orders & payments     |
//! | `/v1/shipping/*`    | [`routes::shipping`]    | Shipping quotes       |
//! | `/v1/users/*`       | [`routes::users`]       | Users & loyalty coins |
//! | `/openapi.json`     | [`openapi`]             | OpenAPI spec          |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → CorsLayer → MetricsMiddleware → AuthMiddleware → RateLimitMiddleware → Handler
//! ```
//!
//! Health probes (`/health/*`) and `/metrics` are mounted outside the auth
//! middleware so they remain accessible without credentials.

pub mod auth;
pub mod db;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::response::IntoResponse;
use axum::{Extension, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use petstore_checkout::OrderStatus;

use crate::auth::AuthConfig;
use crate::middleware::metrics::ApiMetrics;
use crate::middleware::rate_limit::{RateLimitConfig, RateLimiter};

pub use error::AppError;
pub use state::AppState;

/// Check if metrics are enabled via the `PETSTORE_METRICS_ENABLED` env var.
/// Defaults to `true` when the variable is absent or set to anything other
/// than `"false"`.
fn metrics_enabled() -> bool {
    std::env::var("PETSTORE_METRICS_ENABLED")
        .map(|v| v.to_lowercase() != "false")
        .unwrap_or(true)
}

/// Assemble the full application router with all routes and middleware.
///
/// Auth runs before rate limiting so unauthenticated requests are rejected
/// without consuming rate limit quota. Body size limit: 2 MiB.
pub fn app(state: AppState) -> Router {
    let auth_config = AuthConfig {
        token: state.config.auth_token.clone(),
    };
    let metrics = ApiMetrics::new();
    let limiter = RateLimiter::new(RateLimitConfig::default());
    let metrics_on = metrics_enabled();

    let api = Router::new()
        .merge(routes::categories::router())
        .merge(routes::suppliers::router())
        .merge(routes::products::router())
        .merge(routes::reviews::router())
        .merge(routes::carts::router())
        .merge(routes::orders::router())
        .merge(routes::shipping::router())
        .merge(routes::users::router())
        .merge(openapi::router());

    let mut api = api
        .layer(DefaultBodyLimit::max(2 * 1024 * 1024))
        .layer(from_fn(middleware::rate_limit::rate_limit_middleware))
        .layer(from_fn(auth::auth_middleware));

    if metrics_on {
        api = api
            .layer(from_fn(middleware::metrics::metrics_middleware))
            .layer(Extension(metrics.clone()));
    }

    // The storefront SPA is served from a different origin.
    let api = api
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(Extension(auth_config))
        .layer(Extension(limiter))
        .with_state(state.clone());

    // Unauthenticated health probes — readiness checks actual service health.
    let mut unauthenticated = Router::new()
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness));

    if metrics_on {
        unauthenticated = unauthenticated
            .route("/metrics", axum::routing::get(prometheus_metrics))
            .layer(Extension(metrics));
    }

    let unauthenticated = unauthenticated.with_state(state);

    Router::new().merge(unauthenticated).merge(api)
}

/// GET /metrics — Prometheus metrics scrape endpoint.
///
/// Updates domain gauges from current `AppState` on each scrape (pull
/// model), then gathers and encodes all metrics in text exposition format.
async fn prometheus_metrics(
    State(state): State<AppState>,
    Extension(metrics): Extension<ApiMetrics>,
) -> impl IntoResponse {
    // Orders by status.
    let orders = state.orders.list();
    metrics.orders_total().reset();
    for status in [
        OrderStatus::Pending,
        OrderStatus::Paid,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
        OrderStatus::Refunded,
    ] {
        let count = orders.iter().filter(|o| o.status == status).count();
        metrics
            .orders_total()
            .with_label_values(&[status.as_str()])
            .set(count as f64);
    }

    // Products by status.
    let products = state.products.list();
    metrics.products_total().reset();
    for status in [
        petstore_catalog::ProductStatus::Draft,
        petstore_catalog::ProductStatus::Active,
        petstore_catalog::ProductStatus::Discontinued,
    ] {
        let count = products.iter().filter(|p| p.status == status).count();
        metrics
            .products_total()
            .with_label_values(&[status.as_str()])
            .set(count as f64);
    }

    metrics.variants_total().set(state.variants.len() as f64);
    metrics.users_total().set(state.users.len() as f64);
    metrics.reviews_total().set(state.reviews.len() as f64);
    metrics.carts_open().set(state.carts.len() as f64);

    let coins: i64 = state
        .users
        .list()
        .iter()
        .map(|u| u.coin_balance)
        .fold(0i64, i64::saturating_add);
    metrics.coins_outstanding().set(coins as f64);

    match metrics.gather_and_encode() {
        Ok(body) => (
            StatusCode::OK,
            [(
                axum::http::header::CONTENT_TYPE,
                "text/plain; version=0.0.4; charset=utf-8",
            )],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to encode Prometheus metrics: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, e).into_response()
        }
    }
}

/// Liveness probe — always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe — verifies the application is ready to serve traffic.
///
/// Checks:
/// - In-memory stores are accessible.
/// - Database connection is healthy (when configured).
///
/// Returns 200 "ready" or 503 with a diagnostic message.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    // Verify stores are accessible (read lock acquirable).
    let _ = state.products.len();
    let _ = state.orders.len();
    let _ = state.users.len();

    // Verify database connection (when configured).
    if let Some(pool) = &state.db_pool {
        if let Err(e) = sqlx::query("SELECT 1").execute(pool).await {
            tracing::warn!("Database health check failed: {e}");
            return (StatusCode::SERVICE_UNAVAILABLE, "database unreachable").into_response();
        }
    }

    (StatusCode::OK, "ready").into_response()
}

/// Shared helpers for route handler tests.
#[cfg(test)]
pub(crate) mod test_support {
    use axum::Router;
    use chrono::Utc;
    use http_body_util::BodyExt;

    use petstore_catalog::{
        Category, Dimensions, Product, ProductStatus, Sku, Supplier, Variant,
    };
    use petstore_checkout::{Cart, CartLine, CartOwner, Order, ShippingAddress};
    use petstore_core::{CategoryId, ProductId, SupplierId, UserId, VariantId};

    use crate::auth::{CallerIdentity, Role};
    use crate::state::{AppState, UserRecord};

    /// Router with an Admin identity injected.
    pub(crate) fn admin_app_with_state(router: Router<AppState>, state: AppState) -> Router {
        router
            .layer(axum::Extension(CallerIdentity {
                role: Role::Admin,
                user_id: None,
            }))
            .with_state(state)
    }

    /// Router with a Staff identity injected.
    pub(crate) fn staff_app_with_state(router: Router<AppState>, state: AppState) -> Router {
        router
            .layer(axum::Extension(CallerIdentity {
                role: Role::Staff,
                user_id: None,
            }))
            .with_state(state)
    }

    /// Router with a Customer identity bound to `user_id`.
    pub(crate) fn customer_app_with_state(
        router: Router<AppState>,
        state: AppState,
        user_id: UserId,
    ) -> Router {
        router
            .layer(axum::Extension(CallerIdentity {
                role: Role::Customer,
                user_id: Some(user_id),
            }))
            .with_state(state)
    }

    /// Read the response body as bytes and deserialize from JSON.
    pub(crate) async fn body_json<T: serde::de::DeserializeOwned>(
        resp: axum::response::Response,
    ) -> T {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap_or_else(|e| {
            panic!(
                "body did not deserialize: {e}: {}",
                String::from_utf8_lossy(&bytes)
            )
        })
    }

    /// Seed one category and one active supplier.
    pub(crate) fn seed_taxonomy(state: &AppState) -> (CategoryId, SupplierId) {
        let now = Utc::now();
        let category = Category {
            id: CategoryId::new(),
            name: "Dog Food".to_string(),
            slug: format!("dog-food-{}", category_suffix(state)),
            parent_id: None,
            description: String::new(),
            created_at: now,
            updated_at: now,
        };
        let supplier = Supplier {
            id: SupplierId::new(),
            name: "Acme Pet Supply".to_string(),
            contact_email: "orders@acmepet.example".to_string(),
            phone: None,
            active: true,
            created_at: now,
            updated_at: now,
        };
        state.categories.insert(category.id, category.clone());
        state.suppliers.insert(supplier.id, supplier.clone());
        (category.id, supplier.id)
    }

    fn category_suffix(state: &AppState) -> usize {
        state.categories.len()
    }

    /// Seed an ACTIVE product.
    pub(crate) fn seed_product(state: &AppState, slug: &str) -> ProductId {
        let (category_id, supplier_id) = seed_taxonomy(state);
        let now = Utc::now();
        let product = Product {
            id: ProductId::new(),
            name: slug.replace('-', " "),
            slug: slug.to_string(),
            description: String::new(),
            category_id,
            supplier_id,
            status: ProductStatus::Active,
            created_at: now,
            updated_at: now,
        };
        let id = product.id;
        state.products.insert(id, product);
        id
    }

    /// Seed an ACTIVE product with one variant.
    pub(crate) fn seed_variant(
        state: &AppState,
        sku: &str,
        price_cents: i64,
        stock: u32,
    ) -> VariantId {
        let product_id = seed_product(state, &sku.to_lowercase());
        let now = Utc::now();
        let variant = Variant {
            id: VariantId::new(),
            product_id,
            sku: Sku::new(sku).unwrap(),
            display_name: format!("{sku} unit"),
            price_cents,
            weight_grams: 2_000,
            dims_mm: Dimensions {
                length_mm: 300,
                width_mm: 200,
                height_mm: 100,
            },
            stock_on_hand: stock,
            stock_reserved: 0,
            created_at: now,
            updated_at: now,
        };
        let id = variant.id;
        state.variants.insert(id, variant);
        id
    }

    /// Seed a customer with the given coin balance.
    pub(crate) fn seed_user(state: &AppState, coin_balance: i64) -> UserId {
        let now = Utc::now();
        let user = UserRecord {
            id: UserId::new(),
            email: format!("user-{}@example.com", state.users.len()),
            display_name: "Test Customer".to_string(),
            role: Role::Customer,
            coin_balance,
            created_at: now,
            updated_at: now,
        };
        let id = user.id;
        state.users.insert(id, user);
        id
    }

    fn test_address() -> ShippingAddress {
        ShippingAddress {
            recipient: "A. Customer".to_string(),
            line1: "1 Main St".to_string(),
            line2: None,
            city: "Springfield".to_string(),
            postal_code: "12345".to_string(),
            country: "US".to_string(),
        }
    }

    /// Seed a PENDING order for `qty` units of a variant, with the stock
    /// reservation taken — the state checkout would have left behind.
    pub(crate) fn seed_order(
        state: &AppState,
        user: UserId,
        variant_id: VariantId,
        qty: u32,
    ) -> Order {
        let variant = state.variants.get(&variant_id).expect("variant seeded");
        let mut cart = Cart::new(CartOwner::User(user));
        cart.add_line(CartLine::from_variant(&variant, qty)).unwrap();
        let outcome =
            petstore_checkout::checkout(&cart, user, 0, &state.shipping_rates, test_address())
                .expect("seed checkout");
        state
            .variants
            .update(&variant_id, |v| v.reserve(qty).expect("seed reserve"));
        let order = outcome.order;
        state.orders.insert(order.id, order.clone());
        order
    }
}
