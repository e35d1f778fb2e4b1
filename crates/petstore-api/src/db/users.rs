//! User and review persistence.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use petstore_core::{ProductId, ReviewId, UserId};

use crate::auth::Role;
use crate::state::{ReviewRecord, UserRecord};

// ── Users ───────────────────────────────────────────────────────────

/// Insert a newly registered user.
pub async fn insert_user(pool: &PgPool, record: &UserRecord) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO users (id, email, display_name, role, coin_balance, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(record.id.0)
    .bind(&record.email)
    .bind(&record.display_name)
    .bind(record.role.as_str())
    .bind(record.coin_balance)
    .bind(record.created_at)
    .bind(record.updated_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Update a user's mutable fields (profile, role, coin balance).
pub async fn update_user(pool: &PgPool, record: &UserRecord) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE users SET email = $1, display_name = $2, role = $3, coin_balance = $4,
         updated_at = $5 WHERE id = $6",
    )
    .bind(&record.email)
    .bind(&record.display_name)
    .bind(record.role.as_str())
    .bind(record.coin_balance)
    .bind(record.updated_at)
    .bind(record.id.0)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Load all users on startup.
pub async fn load_users(pool: &PgPool) -> Result<Vec<UserRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, UserRow>(
        "SELECT id, email, display_name, role, coin_balance, created_at, updated_at
         FROM users ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(UserRow::into_record).collect())
}

fn parse_role(s: &str) -> Role {
    match s {
        "admin" => Role::Admin,
        "staff" => Role::Staff,
        "customer" => Role::Customer,
        other => {
            tracing::warn!(
                role = other,
                "unknown role in database, defaulting to customer"
            );
            Role::Customer
        }
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    display_name: String,
    role: String,
    coin_balance: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn into_record(self) -> UserRecord {
        UserRecord {
            id: UserId(self.id),
            email: self.email,
            display_name: self.display_name,
            role: parse_role(&self.role),
            coin_balance: self.coin_balance,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

// ── Reviews ─────────────────────────────────────────────────────────

/// Insert a review.
pub async fn insert_review(pool: &PgPool, record: &ReviewRecord) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO reviews (id, product_id, user_id, rating, title, body, created_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(record.id.0)
    .bind(record.product_id.0)
    .bind(record.user_id.0)
    .bind(record.rating as i16)
    .bind(&record.title)
    .bind(&record.body)
    .bind(record.created_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Delete a review.
pub async fn delete_review(pool: &PgPool, id: ReviewId) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM reviews WHERE id = $1")
        .bind(id.0)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Load all reviews on startup.
pub async fn load_reviews(pool: &PgPool) -> Result<Vec<ReviewRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, ReviewRow>(
        "SELECT id, product_id, user_id, rating, title, body, created_at
         FROM reviews ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(ReviewRow::into_record).collect())
}

#[derive(sqlx::FromRow)]
struct ReviewRow {
    id: Uuid,
    product_id: Uuid,
    user_id: Uuid,
    rating: i16,
    title: Option<String>,
    body: String,
    created_at: DateTime<Utc>,
}

impl ReviewRow {
    fn into_record(self) -> ReviewRecord {
        ReviewRecord {
            id: ReviewId(self.id),
            product_id: ProductId(self.product_id),
            user_id: UserId(self.user_id),
            rating: self.rating.clamp(1, 5) as u8,
            title: self.title,
            body: self.body,
            created_at: self.created_at,
        }
    }
}
