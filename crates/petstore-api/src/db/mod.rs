//! # Database Persistence Layer
//!
//! Provides Postgres persistence for store state via SQLx.
//!
//! ## Architecture
//!
//! The database layer is **optional**. When `DATABASE_URL` is set, the API
//! persists catalog, order, payment, user, and review writes to PostgreSQL
//! and hydrates the in-memory stores from it on startup. When absent, the
//! API operates in in-memory-only mode (suitable for development and
//! testing).
//!
//! ## What is persisted
//!
//! - Categories, suppliers, products, and variants (including stock counters)
//! - Orders (lines, totals, address, and transition log as JSONB) and payments
//! - Users (including coin balances) and reviews
//!
//! ## What is NOT persisted
//!
//! Carts. They are session-scoped working state; a restart costs the
//! customer a few clicks, not money.

pub mod catalog;
pub mod orders;
pub mod users;

use sqlx::postgres::{PgPool, PgPoolOptions};

/// Connect to Postgres and run embedded migrations.
///
/// Shared by the API server and the CLI seeding path.
pub async fn connect(url: &str) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(url)
        .await?;

    tracing::info!("Connected to PostgreSQL");

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    Ok(pool)
}

/// Initialize the database connection pool and run migrations.
///
/// Returns `None` if `DATABASE_URL` is not set (in-memory-only mode).
/// Returns `Err` if the URL is set but the connection or migration fails.
pub async fn init_pool() -> Result<Option<PgPool>, sqlx::Error> {
    let url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            tracing::warn!(
                "DATABASE_URL not set — running in-memory only mode. \
                 State will not survive restarts."
            );
            return Ok(None);
        }
    };

    Ok(Some(connect(&url).await?))
}
