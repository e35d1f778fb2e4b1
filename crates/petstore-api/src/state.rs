//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers
//! via the `State` extractor.
//!
//! ## Architecture
//!
//! All reads are served from thread-safe in-memory stores; when a
//! `DATABASE_URL` is configured, writes go through to Postgres and the
//! stores are hydrated from it on startup. Domain types (products, carts,
//! orders) come from `petstore-catalog` and `petstore-checkout`; the record
//! types defined here (users, reviews, payments) are API-owned.
//!
//! Carts are deliberately not persisted — they are session-scoped working
//! state, and losing them on restart costs a customer a few clicks, not money.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use petstore_catalog::{Category, Product, Supplier, Variant};
use petstore_checkout::{Cart, Order, ShippingRates};
use petstore_core::{
    CartId, CategoryId, OrderId, PaymentId, ProductId, ReviewId, SupplierId, UserId, VariantId,
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use utoipa::ToSchema;

use crate::auth::Role;

// -- Generic In-Memory Store --------------------------------------------------

/// Thread-safe, cloneable in-memory key-value store.
///
/// All operations are synchronous (the RwLock is `parking_lot`, not
/// `tokio::sync`) because the lock is never held across `.await` points.
/// `parking_lot::RwLock` is non-poisonable — a panicking writer does not
/// permanently corrupt the store.
#[derive(Debug)]
pub struct Store<K: Eq + Hash + Copy, T: Clone + Send + Sync> {
    data: Arc<RwLock<HashMap<K, T>>>,
}

impl<K: Eq + Hash + Copy, T: Clone + Send + Sync> Clone for Store<K, T> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
        }
    }
}

impl<K: Eq + Hash + Copy, T: Clone + Send + Sync> Store<K, T> {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Insert a record, returning the previous value if the key existed.
    pub fn insert(&self, id: K, value: T) -> Option<T> {
        self.data.write().insert(id, value)
    }

    /// Retrieve a record by ID.
    pub fn get(&self, id: &K) -> Option<T> {
        self.data.read().get(id).cloned()
    }

    /// List all records.
    pub fn list(&self) -> Vec<T> {
        self.data.read().values().cloned().collect()
    }

    /// Return the first record matching a predicate.
    pub fn find(&self, mut pred: impl FnMut(&T) -> bool) -> Option<T> {
        self.data.read().values().find(|v| pred(v)).cloned()
    }

    /// Update a record in place. Returns the updated record, or `None` if
    /// not found.
    pub fn update(&self, id: &K, f: impl FnOnce(&mut T)) -> Option<T> {
        let mut guard = self.data.write();
        if let Some(entry) = guard.get_mut(id) {
            f(entry);
            Some(entry.clone())
        } else {
            None
        }
    }

    /// Atomically read-validate-update a record.
    ///
    /// The closure may inspect the current state, validate preconditions,
    /// mutate the record, and return `Ok(R)` or `Err(E)`. The entire
    /// operation runs under a single write lock, eliminating TOCTOU races
    /// between read and update.
    ///
    /// Returns `None` if the record doesn't exist, or `Some(result)` with
    /// the closure's `Result`.
    pub fn try_update<R, E>(
        &self,
        id: &K,
        f: impl FnOnce(&mut T) -> Result<R, E>,
    ) -> Option<Result<R, E>> {
        self.data.write().get_mut(id).map(f)
    }

    /// Run a closure with mutable access to the whole map.
    ///
    /// Used for multi-record invariants (reserving stock across several
    /// variants atomically). Keep the closure free of `.await`.
    pub fn with_all_mut<R>(&self, f: impl FnOnce(&mut HashMap<K, T>) -> R) -> R {
        f(&mut self.data.write())
    }

    /// Remove a record by ID.
    pub fn remove(&self, id: &K) -> Option<T> {
        self.data.write().remove(id)
    }

    /// Check if a record exists.
    pub fn contains(&self, id: &K) -> bool {
        self.data.read().contains_key(id)
    }

    /// Return the number of records.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K: Eq + Hash + Copy, T: Clone + Send + Sync> Default for Store<K, T> {
    fn default() -> Self {
        Self::new()
    }
}

// -- API-Owned Record Types ---------------------------------------------------

/// A store user.
///
/// Identity is external (the SPA authenticates against the token issuer);
/// this record carries the storefront profile and the loyalty-coin balance.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserRecord {
    #[schema(value_type = uuid::Uuid)]
    pub id: UserId,
    pub email: String,
    pub display_name: String,
    pub role: Role,
    /// Loyalty-coin balance. 1 coin = 1 cent of discount. Never negative.
    pub coin_balance: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A product review.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReviewRecord {
    #[schema(value_type = uuid::Uuid)]
    pub id: ReviewId,
    #[schema(value_type = uuid::Uuid)]
    pub product_id: ProductId,
    #[schema(value_type = uuid::Uuid)]
    pub user_id: UserId,
    /// Star rating, 1–5.
    pub rating: u8,
    pub title: Option<String>,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// Payment method accepted at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Card,
    Wallet,
    BankTransfer,
}

impl PaymentMethod {
    /// Return the string representation of this method.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Card => "card",
            Self::Wallet => "wallet",
            Self::BankTransfer => "bank_transfer",
        }
    }
}

/// A recorded payment against an order.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaymentRecord {
    #[schema(value_type = uuid::Uuid)]
    pub id: PaymentId,
    #[schema(value_type = uuid::Uuid)]
    pub order_id: OrderId,
    pub method: PaymentMethod,
    /// Amount in cents. Always equals the order's grand total.
    pub amount_cents: i64,
    pub created_at: DateTime<Utc>,
}

// -- Application State --------------------------------------------------------

/// Application configuration.
///
/// Custom `Debug` redacts the `auth_token` to prevent credential leakage in logs.
#[derive(Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Static bearer token secret. If `None`, authentication is disabled.
    pub auth_token: Option<String>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            auth_token: None,
        }
    }
}

/// Shared application state accessible to all route handlers.
///
/// Clone-friendly via `Arc` internals in each `Store`.
#[derive(Debug, Clone)]
pub struct AppState {
    // -- Catalog --
    pub categories: Store<CategoryId, Category>,
    pub suppliers: Store<SupplierId, Supplier>,
    pub products: Store<ProductId, Product>,
    pub variants: Store<VariantId, Variant>,

    // -- Commerce --
    pub carts: Store<CartId, Cart>,
    pub orders: Store<OrderId, Order>,
    pub payments: Store<PaymentId, PaymentRecord>,

    // -- Users & reviews --
    pub users: Store<UserId, UserRecord>,
    pub reviews: Store<ReviewId, ReviewRecord>,

    /// The active shipping rate table. Fixed at startup.
    pub shipping_rates: Arc<ShippingRates>,

    // -- Database persistence (optional) --
    /// PostgreSQL connection pool for durable state persistence.
    /// When `None`, the API operates in in-memory-only mode.
    pub db_pool: Option<PgPool>,

    // -- Configuration --
    pub config: AppConfig,
}

impl AppState {
    /// Create a new application state with default configuration.
    pub fn new() -> Self {
        Self::with_config(AppConfig::default(), None)
    }

    /// Create a new application state with the given configuration and
    /// optional database pool.
    pub fn with_config(config: AppConfig, db_pool: Option<PgPool>) -> Self {
        Self {
            categories: Store::new(),
            suppliers: Store::new(),
            products: Store::new(),
            variants: Store::new(),
            carts: Store::new(),
            orders: Store::new(),
            payments: Store::new(),
            users: Store::new(),
            reviews: Store::new(),
            shipping_rates: Arc::new(ShippingRates::default()),
            db_pool,
            config,
        }
    }

    /// Hydrate in-memory stores from the database.
    ///
    /// Called once on startup when a database pool is available. Carts are
    /// not persisted and start empty.
    pub async fn hydrate_from_db(&self) -> Result<(), String> {
        let pool = match &self.db_pool {
            Some(pool) => pool,
            None => return Ok(()),
        };

        let categories = crate::db::catalog::load_categories(pool)
            .await
            .map_err(|e| format!("failed to load categories: {e}"))?;
        let category_count = categories.len();
        for record in categories {
            self.categories.insert(record.id, record);
        }

        let suppliers = crate::db::catalog::load_suppliers(pool)
            .await
            .map_err(|e| format!("failed to load suppliers: {e}"))?;
        let supplier_count = suppliers.len();
        for record in suppliers {
            self.suppliers.insert(record.id, record);
        }

        let products = crate::db::catalog::load_products(pool)
            .await
            .map_err(|e| format!("failed to load products: {e}"))?;
        let product_count = products.len();
        for record in products {
            self.products.insert(record.id, record);
        }

        let variants = crate::db::catalog::load_variants(pool)
            .await
            .map_err(|e| format!("failed to load variants: {e}"))?;
        let variant_count = variants.len();
        for record in variants {
            self.variants.insert(record.id, record);
        }

        let users = crate::db::users::load_users(pool)
            .await
            .map_err(|e| format!("failed to load users: {e}"))?;
        let user_count = users.len();
        for record in users {
            self.users.insert(record.id, record);
        }

        let reviews = crate::db::users::load_reviews(pool)
            .await
            .map_err(|e| format!("failed to load reviews: {e}"))?;
        let review_count = reviews.len();
        for record in reviews {
            self.reviews.insert(record.id, record);
        }

        let orders = crate::db::orders::load_orders(pool)
            .await
            .map_err(|e| format!("failed to load orders: {e}"))?;
        let order_count = orders.len();
        for record in orders {
            self.orders.insert(record.id, record);
        }

        let payments = crate::db::orders::load_payments(pool)
            .await
            .map_err(|e| format!("failed to load payments: {e}"))?;
        let payment_count = payments.len();
        for record in payments {
            self.payments.insert(record.id, record);
        }

        tracing::info!(
            categories = category_count,
            suppliers = supplier_count,
            products = product_count,
            variants = variant_count,
            users = user_count,
            reviews = review_count,
            orders = order_count,
            payments = payment_count,
            "Hydrated in-memory stores from database"
        );

        Ok(())
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
