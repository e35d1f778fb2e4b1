//! # Review API
//!
//! - `POST /v1/products/:id/reviews` — create review (one per user per product)
//! - `GET /v1/products/:id/reviews` — list a product's reviews
//! - `DELETE /v1/reviews/:id` — delete (author or staff)

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{delete, get};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use petstore_core::{ProductId, ReviewId};

use crate::auth::{CallerIdentity, Role};
use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::state::{AppState, ReviewRecord};

/// Request to create a review.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateReviewRequest {
    /// Star rating, 1–5.
    pub rating: u8,
    #[serde(default)]
    pub title: Option<String>,
    pub body: String,
}

impl Validate for CreateReviewRequest {
    fn validate(&self) -> Result<(), String> {
        if !(1..=5).contains(&self.rating) {
            return Err(format!("rating must be within 1..=5, got {}", self.rating));
        }
        if self.body.trim().is_empty() {
            return Err("body must not be empty".to_string());
        }
        if self.body.len() > 2000 {
            return Err("body must not exceed 2000 characters".to_string());
        }
        if let Some(ref title) = self.title {
            if title.len() > 120 {
                return Err("title must not exceed 120 characters".to_string());
            }
        }
        Ok(())
    }
}

/// Build the reviews router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/v1/products/:id/reviews",
            get(list_reviews).post(create_review),
        )
        .route("/v1/reviews/:id", delete(delete_review))
}

/// POST /v1/products/:id/reviews — Create a review.
///
/// Requires a user-bound caller. One review per user per product; a second
/// attempt returns 409.
#[utoipa::path(
    post,
    path = "/v1/products/{id}/reviews",
    params(("id" = Uuid, Path, description = "Product ID")),
    request_body = CreateReviewRequest,
    responses(
        (status = 201, description = "Review created", body = ReviewRecord),
        (status = 404, description = "Product not found", body = crate::error::ErrorBody),
        (status = 409, description = "Already reviewed", body = crate::error::ErrorBody),
    ),
    tag = "reviews"
)]
pub(crate) async fn create_review(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    body: Result<Json<CreateReviewRequest>, JsonRejection>,
) -> Result<(axum::http::StatusCode, Json<ReviewRecord>), AppError> {
    let req = extract_validated_json(body)?;

    let user_id = caller
        .user_id
        .ok_or_else(|| AppError::Forbidden("reviews require a user-bound token".to_string()))?;

    let product_id = ProductId(id);
    if !state.products.contains(&product_id) {
        return Err(AppError::NotFound(format!("product {id} not found")));
    }

    if state
        .reviews
        .find(|r| r.product_id == product_id && r.user_id == user_id)
        .is_some()
    {
        return Err(AppError::Conflict(format!(
            "user {user_id} already reviewed product {id}"
        )));
    }

    let record = ReviewRecord {
        id: ReviewId::new(),
        product_id,
        user_id,
        rating: req.rating,
        title: req.title,
        body: req.body,
        created_at: Utc::now(),
    };

    state.reviews.insert(record.id, record.clone());

    if let Some(pool) = &state.db_pool {
        if let Err(e) = crate::db::users::insert_review(pool, &record).await {
            tracing::error!(review_id = %record.id, error = %e, "failed to persist review");
            return Err(AppError::Internal(
                "review recorded in-memory but database persist failed".to_string(),
            ));
        }
    }

    Ok((axum::http::StatusCode::CREATED, Json(record)))
}

/// GET /v1/products/:id/reviews — List a product's reviews, newest first.
#[utoipa::path(
    get,
    path = "/v1/products/{id}/reviews",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "List of reviews", body = Vec<ReviewRecord>),
        (status = 404, description = "Product not found", body = crate::error::ErrorBody),
    ),
    tag = "reviews"
)]
pub(crate) async fn list_reviews(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ReviewRecord>>, AppError> {
    let product_id = ProductId(id);
    if !state.products.contains(&product_id) {
        return Err(AppError::NotFound(format!("product {id} not found")));
    }
    let mut reviews: Vec<ReviewRecord> = state
        .reviews
        .list()
        .into_iter()
        .filter(|r| r.product_id == product_id)
        .collect();
    reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(Json(reviews))
}

/// DELETE /v1/reviews/:id — Delete a review.
///
/// The author may delete their own review; staff may delete any.
#[utoipa::path(
    delete,
    path = "/v1/reviews/{id}",
    params(("id" = Uuid, Path, description = "Review ID")),
    responses(
        (status = 204, description = "Review deleted"),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "reviews"
)]
pub(crate) async fn delete_review(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<axum::http::StatusCode, AppError> {
    let review_id = ReviewId(id);
    let review = state
        .reviews
        .get(&review_id)
        .ok_or_else(|| AppError::NotFound(format!("review {id} not found")))?;

    if !caller.has_role(Role::Staff) && caller.user_id != Some(review.user_id) {
        // 404 instead of 403 to prevent review ID enumeration.
        return Err(AppError::NotFound(format!("review {id} not found")));
    }

    state.reviews.remove(&review_id);

    if let Some(pool) = &state.db_pool {
        if let Err(e) = crate::db::users::delete_review(pool, review_id).await {
            tracing::error!(review_id = %id, error = %e, "failed to persist review delete");
            return Err(AppError::Internal(
                "review removed in-memory but database delete failed".to_string(),
            ));
        }
    }

    Ok(axum::http::StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{body_json, customer_app_with_state, seed_product, staff_app_with_state};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use petstore_core::UserId;
    use tower::ServiceExt;

    fn post_review(product: Uuid, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(format!("/v1/products/{product}/reviews"))
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn create_and_list_reviews() {
        let state = AppState::new();
        let product = seed_product(&state, "premium-kibble");
        let user = UserId::new();
        let app = customer_app_with_state(router(), state.clone(), user);

        let resp = app
            .clone()
            .oneshot(post_review(
                product.0,
                r#"{"rating":5,"title":"Great","body":"My dog loves it."}"#,
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let review: ReviewRecord = body_json(resp).await;
        assert_eq!(review.rating, 5);
        assert_eq!(review.user_id, user);

        let req = Request::builder()
            .method("GET")
            .uri(format!("/v1/products/{}/reviews", product.0))
            .body(Body::empty())
            .unwrap();
        let reviews: Vec<ReviewRecord> = body_json(app.oneshot(req).await.unwrap()).await;
        assert_eq!(reviews.len(), 1);
    }

    #[tokio::test]
    async fn second_review_conflicts() {
        let state = AppState::new();
        let product = seed_product(&state, "premium-kibble");
        let app = customer_app_with_state(router(), state, UserId::new());

        let body = r#"{"rating":4,"body":"Good."}"#;
        for expected in [StatusCode::CREATED, StatusCode::CONFLICT] {
            let resp = app
                .clone()
                .oneshot(post_review(product.0, body))
                .await
                .unwrap();
            assert_eq!(resp.status(), expected);
        }
    }

    #[tokio::test]
    async fn rating_out_of_range_is_422() {
        let state = AppState::new();
        let product = seed_product(&state, "premium-kibble");
        let app = customer_app_with_state(router(), state, UserId::new());

        let resp = app
            .oneshot(post_review(product.0, r#"{"rating":6,"body":"x"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn unknown_product_is_404() {
        let app = customer_app_with_state(router(), AppState::new(), UserId::new());
        let resp = app
            .oneshot(post_review(Uuid::new_v4(), r#"{"rating":3,"body":"x"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn other_customer_cannot_delete_review() {
        let state = AppState::new();
        let product = seed_product(&state, "premium-kibble");
        let author = UserId::new();

        let app = customer_app_with_state(router(), state.clone(), author);
        let resp = app
            .oneshot(post_review(product.0, r#"{"rating":2,"body":"meh"}"#))
            .await
            .unwrap();
        let review: ReviewRecord = body_json(resp).await;

        // A different customer gets 404, not 403.
        let other = customer_app_with_state(router(), state.clone(), UserId::new());
        let req = Request::builder()
            .method("DELETE")
            .uri(format!("/v1/reviews/{}", review.id.0))
            .body(Body::empty())
            .unwrap();
        assert_eq!(
            other.oneshot(req).await.unwrap().status(),
            StatusCode::NOT_FOUND
        );

        // Staff can delete it.
        let staff = staff_app_with_state(router(), state);
        let req = Request::builder()
            .method("DELETE")
            .uri(format!("/v1/reviews/{}", review.id.0))
            .body(Body::empty())
            .unwrap();
        assert_eq!(
            staff.oneshot(req).await.unwrap().status(),
            StatusCode::NO_CONTENT
        );
    }
}
