//! # OpenAPI Specification Assembly
//!
//! Assembles all utoipa-documented routes into a single OpenAPI spec,
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

/// Assembled OpenAPI spec for the entire API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Petstore Commerce API",
        version = "0.3.12",
        description = "REST API for the pet-store commerce stack: catalog, carts, checkout, orders, payments, shipping quotes, reviews, and users.",
        license(name = "Apache-2.0")
    ),
    paths(
        // Categories
        crate::routes::categories::create_category,
        crate::routes::categories::list_categories,
        crate::routes::categories::get_category,
        crate::routes::categories::update_category,
        crate::routes::categories::delete_category,
        // Suppliers
        crate::routes::suppliers::create_supplier,
        crate::routes::suppliers::list_suppliers,
        crate::routes::suppliers::get_supplier,
        crate::routes::suppliers::update_supplier,
        crate::routes::suppliers::deactivate_supplier,
        // Products & variants
        crate::routes::products::create_product,
        crate::routes::products::list_products,
        crate::routes::products::get_product,
        crate::routes::products::update_product,
        crate::routes::products::discontinue_product,
        crate::routes::products::create_variant,
        crate::routes::products::list_variants,
        crate::routes::products::restock_variant,
        // Reviews
        crate::routes::reviews::create_review,
        crate::routes::reviews::list_reviews,
        crate::routes::reviews::delete_review,
        // Carts & checkout
        crate::routes::carts::create_cart,
        crate::routes::carts::get_cart,
        crate::routes::carts::add_item,
        crate::routes::carts::set_qty,
        crate::routes::carts::remove_item,
        crate::routes::carts::apply_coins,
        crate::routes::carts::merge_cart,
        crate::routes::carts::checkout_cart,
        // Orders & payments
        crate::routes::orders::list_orders,
        crate::routes::orders::get_order,
        crate::routes::orders::cancel_order,
        crate::routes::orders::transition_order,
        crate::routes::orders::record_payment,
        crate::routes::orders::list_payments,
        // Shipping
        crate::routes::shipping::quote_shipment,
        crate::routes::shipping::get_rates,
        // Users
        crate::routes::users::register_user,
        crate::routes::users::get_me,
        crate::routes::users::list_users,
        crate::routes::users::get_user,
        crate::routes::users::grant_coins,
    ),
    components(schemas(
        // API-owned record types
        crate::state::UserRecord,
        crate::state::ReviewRecord,
        crate::state::PaymentRecord,
        crate::state::PaymentMethod,
        crate::auth::Role,
        // Error types
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        // Category DTOs
        crate::routes::categories::CreateCategoryRequest,
        crate::routes::categories::UpdateCategoryRequest,
        // Supplier DTOs
        crate::routes::suppliers::CreateSupplierRequest,
        crate::routes::suppliers::UpdateSupplierRequest,
        // Product DTOs
        crate::routes::products::CreateProductRequest,
        crate::routes::products::UpdateProductRequest,
        crate::routes::products::CreateVariantRequest,
        crate::routes::products::RestockRequest,
        // Review DTOs
        crate::routes::reviews::CreateReviewRequest,
        // Cart DTOs
        crate::routes::carts::AddItemRequest,
        crate::routes::carts::SetQtyRequest,
        crate::routes::carts::ApplyCoinsRequest,
        crate::routes::carts::MergeCartRequest,
        crate::routes::carts::CheckoutRequest,
        // Order DTOs
        crate::routes::orders::TransitionOrderRequest,
        crate::routes::orders::RecordPaymentRequest,
        // Shipping DTOs
        crate::routes::shipping::QuoteLine,
        crate::routes::shipping::QuoteRequest,
        crate::routes::shipping::QuoteResponse,
        // User DTOs
        crate::routes::users::RegisterUserRequest,
        crate::routes::users::GrantCoinsRequest,
    ))
)]
pub struct ApiDoc;

/// Build the OpenAPI router serving `/openapi.json`.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(serve_openapi))
}

async fn serve_openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
