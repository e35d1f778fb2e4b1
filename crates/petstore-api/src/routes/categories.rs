//! # Category API
//!
//! - `POST /v1/categories` — create category (staff)
//! - `GET /v1/categories` — list categories (public)
//! - `GET /v1/categories/:id` — get category (public)
//! - `PUT /v1/categories/:id` — update category (staff)
//! - `DELETE /v1/categories/:id` — delete category (staff; 409 while referenced)

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use petstore_catalog::Category;
use petstore_core::CategoryId;

use crate::auth::{require_role, CallerIdentity, Role};
use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::state::AppState;

/// Request to create a category.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCategoryRequest {
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub parent_id: Option<Uuid>,
    #[serde(default)]
    pub description: String,
}

impl Validate for CreateCategoryRequest {
    fn validate(&self) -> Result<(), String> {
        Category::validate_fields(&self.name, &self.slug).map_err(|e| e.to_string())
    }
}

/// Request to update a category.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCategoryRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

impl Validate for UpdateCategoryRequest {
    fn validate(&self) -> Result<(), String> {
        if let Some(ref name) = self.name {
            if name.trim().is_empty() {
                return Err("name must not be empty if provided".to_string());
            }
        }
        Ok(())
    }
}

/// Build the categories router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/categories", get(list_categories).post(create_category))
        .route(
            "/v1/categories/:id",
            get(get_category)
                .put(update_category)
                .delete(delete_category),
        )
}

/// POST /v1/categories — Create a category.
#[utoipa::path(
    post,
    path = "/v1/categories",
    request_body = CreateCategoryRequest,
    responses(
        (status = 201, description = "Category created"),
        (status = 409, description = "Slug already in use", body = crate::error::ErrorBody),
        (status = 422, description = "Validation error", body = crate::error::ErrorBody),
    ),
    tag = "categories"
)]
pub(crate) async fn create_category(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<CreateCategoryRequest>, JsonRejection>,
) -> Result<(axum::http::StatusCode, Json<Category>), AppError> {
    require_role(&caller, Role::Staff)?;
    let req = extract_validated_json(body)?;

    if state.categories.find(|c| c.slug == req.slug).is_some() {
        return Err(AppError::Conflict(format!(
            "category slug {:?} already in use",
            req.slug
        )));
    }

    let parent_id = match req.parent_id {
        Some(parent) => {
            let parent = CategoryId(parent);
            if !state.categories.contains(&parent) {
                return Err(AppError::Validation(format!(
                    "parent category {parent} not found"
                )));
            }
            Some(parent)
        }
        None => None,
    };

    let now = Utc::now();
    let record = Category {
        id: CategoryId::new(),
        name: req.name,
        slug: req.slug,
        parent_id,
        description: req.description,
        created_at: now,
        updated_at: now,
    };

    state.categories.insert(record.id, record.clone());

    // Write-through. Failure is surfaced because the in-memory record would
    // be lost on restart.
    if let Some(pool) = &state.db_pool {
        if let Err(e) = crate::db::catalog::insert_category(pool, &record).await {
            tracing::error!(category_id = %record.id, error = %e, "failed to persist category");
            return Err(AppError::Internal(
                "category recorded in-memory but database persist failed".to_string(),
            ));
        }
    }

    Ok((axum::http::StatusCode::CREATED, Json(record)))
}

/// GET /v1/categories — List all categories.
#[utoipa::path(
    get,
    path = "/v1/categories",
    responses((status = 200, description = "List of categories")),
    tag = "categories"
)]
pub(crate) async fn list_categories(State(state): State<AppState>) -> Json<Vec<Category>> {
    let mut categories = state.categories.list();
    categories.sort_by(|a, b| a.name.cmp(&b.name));
    Json(categories)
}

/// GET /v1/categories/:id — Get a single category.
#[utoipa::path(
    get,
    path = "/v1/categories/{id}",
    params(("id" = Uuid, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Category found"),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "categories"
)]
pub(crate) async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Category>, AppError> {
    state
        .categories
        .get(&CategoryId(id))
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("category {id} not found")))
}

/// PUT /v1/categories/:id — Update a category.
#[utoipa::path(
    put,
    path = "/v1/categories/{id}",
    params(("id" = Uuid, Path, description = "Category ID")),
    request_body = UpdateCategoryRequest,
    responses(
        (status = 200, description = "Category updated"),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "categories"
)]
pub(crate) async fn update_category(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    body: Result<Json<UpdateCategoryRequest>, JsonRejection>,
) -> Result<Json<Category>, AppError> {
    require_role(&caller, Role::Staff)?;
    let req = extract_validated_json(body)?;

    let updated = state
        .categories
        .update(&CategoryId(id), |category| {
            if let Some(name) = req.name {
                category.name = name;
            }
            if let Some(description) = req.description {
                category.description = description;
            }
            category.updated_at = Utc::now();
        })
        .ok_or_else(|| AppError::NotFound(format!("category {id} not found")))?;

    if let Some(pool) = &state.db_pool {
        if let Err(e) = crate::db::catalog::update_category(pool, &updated).await {
            tracing::error!(category_id = %updated.id, error = %e, "failed to persist category update");
            return Err(AppError::Internal(
                "category updated in-memory but database persist failed".to_string(),
            ));
        }
    }

    Ok(Json(updated))
}

/// DELETE /v1/categories/:id — Delete a category.
///
/// Refused with 409 while products or child categories still reference it.
#[utoipa::path(
    delete,
    path = "/v1/categories/{id}",
    params(("id" = Uuid, Path, description = "Category ID")),
    responses(
        (status = 204, description = "Category deleted"),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 409, description = "Category still referenced", body = crate::error::ErrorBody),
    ),
    tag = "categories"
)]
pub(crate) async fn delete_category(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<axum::http::StatusCode, AppError> {
    require_role(&caller, Role::Staff)?;
    let category_id = CategoryId(id);

    if !state.categories.contains(&category_id) {
        return Err(AppError::NotFound(format!("category {id} not found")));
    }
    if state
        .products
        .find(|p| p.category_id == category_id)
        .is_some()
    {
        return Err(AppError::Conflict(format!(
            "category {id} still has products"
        )));
    }
    if state
        .categories
        .find(|c| c.parent_id == Some(category_id))
        .is_some()
    {
        return Err(AppError::Conflict(format!(
            "category {id} still has child categories"
        )));
    }

    state.categories.remove(&category_id);

    if let Some(pool) = &state.db_pool {
        if let Err(e) = crate::db::catalog::delete_category(pool, category_id).await {
            tracing::error!(category_id = %id, error = %e, "failed to persist category delete");
            return Err(AppError::Internal(
                "category removed in-memory but database delete failed".to_string(),
            ));
        }
    }

    Ok(axum::http::StatusCode::NO_CONTENT)
}
