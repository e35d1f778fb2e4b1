//! # User API
//!
//! - `POST /v1/users/register` — register a storefront account (public)
//! - `GET /v1/users/me` — own profile incl. coin balance
//! - `GET /v1/users` — list users (staff)
//! - `GET /v1/users/:id` — self or staff
//! - `POST /v1/users/:id/coins/grant` — promotional coin grant (admin)

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use petstore_catalog::supplier::validate_email;
use petstore_core::UserId;

use crate::auth::{require_role, CallerIdentity, Role};
use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::state::{AppState, UserRecord};

/// Request to register a user.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterUserRequest {
    pub email: String,
    pub display_name: String,
}

impl Validate for RegisterUserRequest {
    fn validate(&self) -> Result<(), String> {
        validate_email(&self.email).map_err(|e| e.to_string())?;
        if self.display_name.trim().is_empty() {
            return Err("display_name must not be empty".to_string());
        }
        if self.display_name.len() > 120 {
            return Err("display_name must not exceed 120 characters".to_string());
        }
        Ok(())
    }
}

/// Request to grant promotional coins.
#[derive(Debug, Deserialize, ToSchema)]
pub struct GrantCoinsRequest {
    /// Coins to add to the balance. Must be positive.
    pub coins: i64,
}

impl Validate for GrantCoinsRequest {
    fn validate(&self) -> Result<(), String> {
        if self.coins <= 0 {
            return Err("coins must be positive".to_string());
        }
        const MAX_GRANT: i64 = 1_000_000;
        if self.coins > MAX_GRANT {
            return Err(format!("coins must not exceed {MAX_GRANT} per grant"));
        }
        Ok(())
    }
}

/// Build the users router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/users/register", post(register_user))
        .route("/v1/users/me", get(get_me))
        .route("/v1/users", get(list_users))
        .route("/v1/users/:id", get(get_user))
        .route("/v1/users/:id/coins/grant", post(grant_coins))
}

/// POST /v1/users/register — Register a storefront account.
#[utoipa::path(
    post,
    path = "/v1/users/register",
    request_body = RegisterUserRequest,
    responses(
        (status = 201, description = "User registered", body = UserRecord),
        (status = 409, description = "Email already registered", body = crate::error::ErrorBody),
        (status = 422, description = "Validation error", body = crate::error::ErrorBody),
    ),
    tag = "users"
)]
pub(crate) async fn register_user(
    State(state): State<AppState>,
    body: Result<Json<RegisterUserRequest>, JsonRejection>,
) -> Result<(axum::http::StatusCode, Json<UserRecord>), AppError> {
    let req = extract_validated_json(body)?;
    let email = req.email.trim().to_lowercase();

    if state.users.find(|u| u.email == email).is_some() {
        return Err(AppError::Conflict(format!(
            "email {email:?} already registered"
        )));
    }

    let now = Utc::now();
    let record = UserRecord {
        id: UserId::new(),
        email,
        display_name: req.display_name,
        role: Role::Customer,
        coin_balance: 0,
        created_at: now,
        updated_at: now,
    };

    state.users.insert(record.id, record.clone());

    if let Some(pool) = &state.db_pool {
        if let Err(e) = crate::db::users::insert_user(pool, &record).await {
            tracing::error!(user_id = %record.id, error = %e, "failed to persist user");
            return Err(AppError::Internal(
                "user recorded in-memory but database persist failed".to_string(),
            ));
        }
    }

    Ok((axum::http::StatusCode::CREATED, Json(record)))
}

/// GET /v1/users/me — The caller's own profile.
#[utoipa::path(
    get,
    path = "/v1/users/me",
    responses(
        (status = 200, description = "Own profile", body = UserRecord),
        (status = 404, description = "No profile for this token", body = crate::error::ErrorBody),
    ),
    tag = "users"
)]
pub(crate) async fn get_me(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Json<UserRecord>, AppError> {
    let user_id = caller
        .user_id
        .ok_or_else(|| AppError::NotFound("token is not bound to a user".to_string()))?;
    state
        .users
        .get(&user_id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("user {user_id} not found")))
}

/// GET /v1/users — List all users.
#[utoipa::path(
    get,
    path = "/v1/users",
    responses((status = 200, description = "List of users", body = Vec<UserRecord>)),
    tag = "users"
)]
pub(crate) async fn list_users(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Json<Vec<UserRecord>>, AppError> {
    require_role(&caller, Role::Staff)?;
    let mut users = state.users.list();
    users.sort_by(|a, b| a.email.cmp(&b.email));
    Ok(Json(users))
}

/// GET /v1/users/:id — Get a user (self or staff).
#[utoipa::path(
    get,
    path = "/v1/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User found", body = UserRecord),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "users"
)]
pub(crate) async fn get_user(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<UserRecord>, AppError> {
    let user_id = UserId(id);
    if !caller.can_access_user(user_id) {
        // 404 instead of 403 to prevent user ID enumeration.
        return Err(AppError::NotFound(format!("user {id} not found")));
    }
    state
        .users
        .get(&user_id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("user {id} not found")))
}

/// POST /v1/users/:id/coins/grant — Promotional coin grant.
#[utoipa::path(
    post,
    path = "/v1/users/{id}/coins/grant",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = GrantCoinsRequest,
    responses(
        (status = 200, description = "Coins granted", body = UserRecord),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "users"
)]
pub(crate) async fn grant_coins(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    body: Result<Json<GrantCoinsRequest>, JsonRejection>,
) -> Result<Json<UserRecord>, AppError> {
    require_role(&caller, Role::Admin)?;
    let req = extract_validated_json(body)?;

    let updated = state
        .users
        .update(&UserId(id), |user| {
            user.coin_balance = user.coin_balance.saturating_add(req.coins);
            user.updated_at = Utc::now();
        })
        .ok_or_else(|| AppError::NotFound(format!("user {id} not found")))?;

    if let Some(pool) = &state.db_pool {
        if let Err(e) = crate::db::users::update_user(pool, &updated).await {
            tracing::error!(user_id = %updated.id, error = %e, "failed to persist coin grant");
            return Err(AppError::Internal(
                "coins granted in-memory but database persist failed".to_string(),
            ));
        }
    }

    tracing::info!(user_id = %updated.id, coins = req.coins, "promotional coins granted");
    Ok(Json(updated))
}
