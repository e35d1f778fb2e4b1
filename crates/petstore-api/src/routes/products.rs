//! # Product & Variant API
//!
//! Products are the browsable units; variants carry SKU, price, and stock.
//!
//! - `POST /v1/products` — create product (staff)
//! - `GET /v1/products` — list with `category`, `status`, `q`, `limit`, `offset`
//! - `GET /v1/products/:id` — get product
//! - `PUT /v1/products/:id` — update product (staff)
//! - `POST /v1/products/:id/discontinue` — discontinue (staff)
//! - `POST /v1/products/:id/variants` — add variant (staff; duplicate SKU → 409)
//! - `GET /v1/products/:id/variants` — list variants
//! - `PUT /v1/variants/:id/stock` — absolute restock (staff)

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use petstore_catalog::{Dimensions, Product, ProductStatus, Sku, Variant};
use petstore_core::{parse_amount, CategoryId, ProductId, SupplierId, VariantId};

use crate::auth::{require_role, CallerIdentity, Role};
use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::state::AppState;

/// Request to create a product.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
    pub category_id: Uuid,
    pub supplier_id: Uuid,
}

impl Validate for CreateProductRequest {
    fn validate(&self) -> Result<(), String> {
        Product::validate_fields(&self.name, &self.slug, &self.description)
            .map_err(|e| e.to_string())
    }
}

/// Request to update a product.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<Uuid>,
    /// `DRAFT` → `ACTIVE` promotion happens here; discontinuation has its
    /// own endpoint so it cannot happen by accident.
    #[schema(value_type = Option<String>, example = "ACTIVE")]
    pub status: Option<ProductStatus>,
}

impl Validate for UpdateProductRequest {
    fn validate(&self) -> Result<(), String> {
        if let Some(ref name) = self.name {
            if name.trim().is_empty() {
                return Err("name must not be empty if provided".to_string());
            }
        }
        if self.status == Some(ProductStatus::Discontinued) {
            return Err("use POST /v1/products/:id/discontinue to discontinue".to_string());
        }
        Ok(())
    }
}

/// Request to add a variant to a product.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateVariantRequest {
    pub sku: String,
    pub display_name: String,
    /// Decimal price string, e.g. `"24.99"`.
    pub price: String,
    pub weight_grams: u32,
    /// `[length, width, height]` in millimetres.
    pub dims_mm: [u32; 3],
    #[serde(default)]
    pub initial_stock: u32,
}

impl Validate for CreateVariantRequest {
    fn validate(&self) -> Result<(), String> {
        Sku::new(self.sku.clone()).map_err(|e| e.to_string())?;
        match parse_amount(&self.price) {
            Some(cents) if cents >= 0 => {}
            Some(_) => return Err("price must not be negative".to_string()),
            None => return Err(format!("price {:?} is not a valid amount", self.price)),
        }
        Variant::validate_fields(&self.display_name, 0).map_err(|e| e.to_string())?;
        if self.dims_mm.iter().any(|&d| d == 0) {
            return Err("dimensions must be positive".to_string());
        }
        Ok(())
    }
}

/// Request to restock a variant (absolute on-hand count).
#[derive(Debug, Deserialize, ToSchema)]
pub struct RestockRequest {
    pub stock_on_hand: u32,
}

impl Validate for RestockRequest {
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Query parameters for product listing.
#[derive(Debug, Default, Deserialize)]
pub struct ProductListQuery {
    /// Filter by category ID.
    pub category: Option<Uuid>,
    /// Filter by lifecycle status.
    pub status: Option<ProductStatus>,
    /// Case-insensitive substring match on name and slug.
    pub q: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

const DEFAULT_PAGE_SIZE: usize = 50;
const MAX_PAGE_SIZE: usize = 200;

/// Build the products router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/products", get(list_products).post(create_product))
        .route("/v1/products/:id", get(get_product).put(update_product))
        .route("/v1/products/:id/discontinue", post(discontinue_product))
        .route(
            "/v1/products/:id/variants",
            get(list_variants).post(create_variant),
        )
        .route("/v1/variants/:id/stock", put(restock_variant))
}

/// POST /v1/products — Create a product in `DRAFT` status.
#[utoipa::path(
    post,
    path = "/v1/products",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product created"),
        (status = 409, description = "Slug already in use", body = crate::error::ErrorBody),
        (status = 422, description = "Validation error", body = crate::error::ErrorBody),
    ),
    tag = "products"
)]
pub(crate) async fn create_product(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<CreateProductRequest>, JsonRejection>,
) -> Result<(axum::http::StatusCode, Json<Product>), AppError> {
    require_role(&caller, Role::Staff)?;
    let req = extract_validated_json(body)?;

    if state.products.find(|p| p.slug == req.slug).is_some() {
        return Err(AppError::Conflict(format!(
            "product slug {:?} already in use",
            req.slug
        )));
    }

    let category_id = CategoryId(req.category_id);
    if !state.categories.contains(&category_id) {
        return Err(AppError::Validation(format!(
            "category {category_id} not found"
        )));
    }

    let supplier_id = SupplierId(req.supplier_id);
    let supplier = state
        .suppliers
        .get(&supplier_id)
        .ok_or_else(|| AppError::Validation(format!("supplier {supplier_id} not found")))?;
    if !supplier.active {
        return Err(AppError::Validation(format!(
            "supplier {supplier_id} is inactive"
        )));
    }

    let now = Utc::now();
    let record = Product {
        id: ProductId::new(),
        name: req.name,
        slug: req.slug,
        description: req.description,
        category_id,
        supplier_id,
        status: ProductStatus::Draft,
        created_at: now,
        updated_at: now,
    };

    state.products.insert(record.id, record.clone());

    if let Some(pool) = &state.db_pool {
        if let Err(e) = crate::db::catalog::insert_product(pool, &record).await {
            tracing::error!(product_id = %record.id, error = %e, "failed to persist product");
            return Err(AppError::Internal(
                "product recorded in-memory but database persist failed".to_string(),
            ));
        }
    }

    Ok((axum::http::StatusCode::CREATED, Json(record)))
}

/// GET /v1/products — List products with filters and pagination.
#[utoipa::path(
    get,
    path = "/v1/products",
    params(
        ("category" = Option<Uuid>, Query, description = "Filter by category"),
        ("status" = Option<String>, Query, description = "Filter by status"),
        ("q" = Option<String>, Query, description = "Substring match on name/slug"),
        ("limit" = Option<usize>, Query, description = "Page size (max 200)"),
        ("offset" = Option<usize>, Query, description = "Page offset"),
    ),
    responses((status = 200, description = "List of products")),
    tag = "products"
)]
pub(crate) async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductListQuery>,
) -> Json<Vec<Product>> {
    let needle = query.q.as_deref().map(str::to_lowercase);
    let category = query.category.map(CategoryId);

    let mut products: Vec<Product> = state
        .products
        .list()
        .into_iter()
        .filter(|p| category.map_or(true, |c| p.category_id == c))
        .filter(|p| query.status.is_none() || query.status == Some(p.status))
        .filter(|p| match &needle {
            Some(needle) => {
                p.name.to_lowercase().contains(needle) || p.slug.contains(needle)
            }
            None => true,
        })
        .collect();
    products.sort_by(|a, b| a.name.cmp(&b.name));

    let offset = query.offset.unwrap_or(0);
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE);
    let page = products.into_iter().skip(offset).take(limit).collect();
    Json(page)
}

/// GET /v1/products/:id — Get a single product.
#[utoipa::path(
    get,
    path = "/v1/products/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product found"),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "products"
)]
pub(crate) async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Product>, AppError> {
    state
        .products
        .get(&ProductId(id))
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("product {id} not found")))
}

/// PUT /v1/products/:id — Update a product.
#[utoipa::path(
    put,
    path = "/v1/products/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Product updated"),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 409, description = "Product is discontinued", body = crate::error::ErrorBody),
    ),
    tag = "products"
)]
pub(crate) async fn update_product(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    body: Result<Json<UpdateProductRequest>, JsonRejection>,
) -> Result<Json<Product>, AppError> {
    require_role(&caller, Role::Staff)?;
    let req = extract_validated_json(body)?;

    if let Some(category) = req.category_id {
        if !state.categories.contains(&CategoryId(category)) {
            return Err(AppError::Validation(format!(
                "category {category} not found"
            )));
        }
    }

    let result = state
        .products
        .try_update(&ProductId(id), |product| {
            if product.status == ProductStatus::Discontinued {
                return Err(AppError::Conflict(format!(
                    "product {id} is discontinued"
                )));
            }
            if let Some(ref name) = req.name {
                product.name = name.clone();
            }
            if let Some(ref description) = req.description {
                product.description = description.clone();
            }
            if let Some(category) = req.category_id {
                product.category_id = CategoryId(category);
            }
            if let Some(status) = req.status {
                product.status = status;
            }
            product.updated_at = Utc::now();
            Ok(product.clone())
        })
        .ok_or_else(|| AppError::NotFound(format!("product {id} not found")))?;
    let updated = result?;

    if let Some(pool) = &state.db_pool {
        if let Err(e) = crate::db::catalog::update_product(pool, &updated).await {
            tracing::error!(product_id = %updated.id, error = %e, "failed to persist product update");
            return Err(AppError::Internal(
                "product updated in-memory but database persist failed".to_string(),
            ));
        }
    }

    Ok(Json(updated))
}

/// POST /v1/products/:id/discontinue — Discontinue a product.
///
/// Terminal: the product stays for order history but leaves the storefront.
#[utoipa::path(
    post,
    path = "/v1/products/{id}/discontinue",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product discontinued"),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "products"
)]
pub(crate) async fn discontinue_product(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<Product>, AppError> {
    require_role(&caller, Role::Staff)?;

    let updated = state
        .products
        .update(&ProductId(id), |product| {
            product.status = ProductStatus::Discontinued;
            product.updated_at = Utc::now();
        })
        .ok_or_else(|| AppError::NotFound(format!("product {id} not found")))?;

    if let Some(pool) = &state.db_pool {
        if let Err(e) = crate::db::catalog::update_product(pool, &updated).await {
            tracing::error!(product_id = %updated.id, error = %e, "failed to persist product update");
            return Err(AppError::Internal(
                "product updated in-memory but database persist failed".to_string(),
            ));
        }
    }

    Ok(Json(updated))
}

/// POST /v1/products/:id/variants — Add a variant.
#[utoipa::path(
    post,
    path = "/v1/products/{id}/variants",
    params(("id" = Uuid, Path, description = "Product ID")),
    request_body = CreateVariantRequest,
    responses(
        (status = 201, description = "Variant created"),
        (status = 404, description = "Product not found", body = crate::error::ErrorBody),
        (status = 409, description = "SKU already in use", body = crate::error::ErrorBody),
    ),
    tag = "products"
)]
pub(crate) async fn create_variant(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    body: Result<Json<CreateVariantRequest>, JsonRejection>,
) -> Result<(axum::http::StatusCode, Json<Variant>), AppError> {
    require_role(&caller, Role::Staff)?;
    let req = extract_validated_json(body)?;

    let product_id = ProductId(id);
    if !state.products.contains(&product_id) {
        return Err(AppError::NotFound(format!("product {id} not found")));
    }

    let sku = Sku::new(req.sku).map_err(AppError::from)?;
    if state.variants.find(|v| v.sku == sku).is_some() {
        return Err(AppError::Conflict(format!(
            "sku {:?} already in use",
            sku.as_str()
        )));
    }

    // Validated in Validate::validate; parse cannot fail here.
    let price_cents = parse_amount(&req.price)
        .ok_or_else(|| AppError::Validation("price is not a valid amount".to_string()))?;

    let now = Utc::now();
    let record = Variant {
        id: VariantId::new(),
        product_id,
        sku,
        display_name: req.display_name,
        price_cents,
        weight_grams: req.weight_grams,
        dims_mm: Dimensions {
            length_mm: req.dims_mm[0],
            width_mm: req.dims_mm[1],
            height_mm: req.dims_mm[2],
        },
        stock_on_hand: req.initial_stock,
        stock_reserved: 0,
        created_at: now,
        updated_at: now,
    };

    state.variants.insert(record.id, record.clone());

    if let Some(pool) = &state.db_pool {
        if let Err(e) = crate::db::catalog::insert_variant(pool, &record).await {
            tracing::error!(variant_id = %record.id, error = %e, "failed to persist variant");
            return Err(AppError::Internal(
                "variant recorded in-memory but database persist failed".to_string(),
            ));
        }
    }

    Ok((axum::http::StatusCode::CREATED, Json(record)))
}

/// GET /v1/products/:id/variants — List a product's variants.
#[utoipa::path(
    get,
    path = "/v1/products/{id}/variants",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "List of variants"),
        (status = 404, description = "Product not found", body = crate::error::ErrorBody),
    ),
    tag = "products"
)]
pub(crate) async fn list_variants(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Variant>>, AppError> {
    let product_id = ProductId(id);
    if !state.products.contains(&product_id) {
        return Err(AppError::NotFound(format!("product {id} not found")));
    }
    let mut variants: Vec<Variant> = state
        .variants
        .list()
        .into_iter()
        .filter(|v| v.product_id == product_id)
        .collect();
    variants.sort_by(|a, b| a.sku.as_str().cmp(b.sku.as_str()));
    Ok(Json(variants))
}

/// PUT /v1/variants/:id/stock — Absolute restock.
#[utoipa::path(
    put,
    path = "/v1/variants/{id}/stock",
    params(("id" = Uuid, Path, description = "Variant ID")),
    request_body = RestockRequest,
    responses(
        (status = 200, description = "Stock updated"),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 409, description = "Below reserved count", body = crate::error::ErrorBody),
    ),
    tag = "products"
)]
pub(crate) async fn restock_variant(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    body: Result<Json<RestockRequest>, JsonRejection>,
) -> Result<Json<Variant>, AppError> {
    require_role(&caller, Role::Staff)?;
    let req = extract_validated_json(body)?;

    let result = state
        .variants
        .try_update(&VariantId(id), |variant| {
            variant.restock(req.stock_on_hand)?;
            variant.updated_at = Utc::now();
            Ok::<_, petstore_catalog::StockError>(variant.clone())
        })
        .ok_or_else(|| AppError::NotFound(format!("variant {id} not found")))?;
    let updated = result.map_err(AppError::from)?;

    if let Some(pool) = &state.db_pool {
        if let Err(e) = crate::db::catalog::update_variant(pool, &updated).await {
            tracing::error!(variant_id = %updated.id, error = %e, "failed to persist variant update");
            return Err(AppError::Internal(
                "variant updated in-memory but database persist failed".to_string(),
            ));
        }
    }

    Ok(Json(updated))
}
