//! # Supplier API
//!
//! - `POST /v1/suppliers` — create supplier (staff)
//! - `GET /v1/suppliers` — list suppliers (staff)
//! - `GET /v1/suppliers/:id` — get supplier (staff)
//! - `PUT /v1/suppliers/:id` — update supplier (staff)
//! - `POST /v1/suppliers/:id/deactivate` — soft-deactivate (staff)

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use petstore_catalog::Supplier;
use petstore_core::SupplierId;

use crate::auth::{require_role, CallerIdentity, Role};
use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::state::AppState;

/// Request to create a supplier.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateSupplierRequest {
    pub name: String,
    pub contact_email: String,
    #[serde(default)]
    pub phone: Option<String>,
}

impl Validate for CreateSupplierRequest {
    fn validate(&self) -> Result<(), String> {
        Supplier::validate_fields(&self.name, &self.contact_email).map_err(|e| e.to_string())
    }
}

/// Request to update a supplier.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateSupplierRequest {
    pub name: Option<String>,
    pub contact_email: Option<String>,
    pub phone: Option<String>,
}

impl Validate for UpdateSupplierRequest {
    fn validate(&self) -> Result<(), String> {
        if let Some(ref name) = self.name {
            if name.trim().is_empty() {
                return Err("name must not be empty if provided".to_string());
            }
        }
        if let Some(ref email) = self.contact_email {
            petstore_catalog::supplier::validate_email(email).map_err(|e| e.to_string())?;
        }
        Ok(())
    }
}

/// Build the suppliers router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/suppliers", get(list_suppliers).post(create_supplier))
        .route("/v1/suppliers/:id", get(get_supplier).put(update_supplier))
        .route("/v1/suppliers/:id/deactivate", post(deactivate_supplier))
}

/// POST /v1/suppliers — Create a supplier.
#[utoipa::path(
    post,
    path = "/v1/suppliers",
    request_body = CreateSupplierRequest,
    responses(
        (status = 201, description = "Supplier created"),
        (status = 422, description = "Validation error", body = crate::error::ErrorBody),
    ),
    tag = "suppliers"
)]
pub(crate) async fn create_supplier(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<CreateSupplierRequest>, JsonRejection>,
) -> Result<(axum::http::StatusCode, Json<Supplier>), AppError> {
    require_role(&caller, Role::Staff)?;
    let req = extract_validated_json(body)?;

    let now = Utc::now();
    let record = Supplier {
        id: SupplierId::new(),
        name: req.name,
        contact_email: req.contact_email,
        phone: req.phone,
        active: true,
        created_at: now,
        updated_at: now,
    };

    state.suppliers.insert(record.id, record.clone());

    if let Some(pool) = &state.db_pool {
        if let Err(e) = crate::db::catalog::insert_supplier(pool, &record).await {
            tracing::error!(supplier_id = %record.id, error = %e, "failed to persist supplier");
            return Err(AppError::Internal(
                "supplier recorded in-memory but database persist failed".to_string(),
            ));
        }
    }

    Ok((axum::http::StatusCode::CREATED, Json(record)))
}

/// GET /v1/suppliers — List all suppliers.
#[utoipa::path(
    get,
    path = "/v1/suppliers",
    responses((status = 200, description = "List of suppliers")),
    tag = "suppliers"
)]
pub(crate) async fn list_suppliers(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Json<Vec<Supplier>>, AppError> {
    require_role(&caller, Role::Staff)?;
    let mut suppliers = state.suppliers.list();
    suppliers.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(Json(suppliers))
}

/// GET /v1/suppliers/:id — Get a single supplier.
#[utoipa::path(
    get,
    path = "/v1/suppliers/{id}",
    params(("id" = Uuid, Path, description = "Supplier ID")),
    responses(
        (status = 200, description = "Supplier found"),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "suppliers"
)]
pub(crate) async fn get_supplier(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<Supplier>, AppError> {
    require_role(&caller, Role::Staff)?;
    state
        .suppliers
        .get(&SupplierId(id))
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("supplier {id} not found")))
}

/// PUT /v1/suppliers/:id — Update a supplier.
#[utoipa::path(
    put,
    path = "/v1/suppliers/{id}",
    params(("id" = Uuid, Path, description = "Supplier ID")),
    request_body = UpdateSupplierRequest,
    responses(
        (status = 200, description = "Supplier updated"),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "suppliers"
)]
pub(crate) async fn update_supplier(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    body: Result<Json<UpdateSupplierRequest>, JsonRejection>,
) -> Result<Json<Supplier>, AppError> {
    require_role(&caller, Role::Staff)?;
    let req = extract_validated_json(body)?;

    let updated = state
        .suppliers
        .update(&SupplierId(id), |supplier| {
            if let Some(name) = req.name {
                supplier.name = name;
            }
            if let Some(email) = req.contact_email {
                supplier.contact_email = email;
            }
            if let Some(phone) = req.phone {
                supplier.phone = Some(phone);
            }
            supplier.updated_at = Utc::now();
        })
        .ok_or_else(|| AppError::NotFound(format!("supplier {id} not found")))?;

    if let Some(pool) = &state.db_pool {
        if let Err(e) = crate::db::catalog::update_supplier(pool, &updated).await {
            tracing::error!(supplier_id = %updated.id, error = %e, "failed to persist supplier update");
            return Err(AppError::Internal(
                "supplier updated in-memory but database persist failed".to_string(),
            ));
        }
    }

    Ok(Json(updated))
}

/// POST /v1/suppliers/:id/deactivate — Soft-deactivate a supplier.
#[utoipa::path(
    post,
    path = "/v1/suppliers/{id}/deactivate",
    params(("id" = Uuid, Path, description = "Supplier ID")),
    responses(
        (status = 200, description = "Supplier deactivated"),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "suppliers"
)]
pub(crate) async fn deactivate_supplier(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<Supplier>, AppError> {
    require_role(&caller, Role::Staff)?;

    let updated = state
        .suppliers
        .update(&SupplierId(id), |supplier| {
            supplier.active = false;
            supplier.updated_at = Utc::now();
        })
        .ok_or_else(|| AppError::NotFound(format!("supplier {id} not found")))?;

    if let Some(pool) = &state.db_pool {
        if let Err(e) = crate::db::catalog::update_supplier(pool, &updated).await {
            tracing::error!(supplier_id = %updated.id, error = %e, "failed to persist supplier update");
            return Err(AppError::Internal(
                "supplier updated in-memory but database persist failed".to_string(),
            ));
        }
    }

    Ok(Json(updated))
}
