//! Catalog persistence: categories, suppliers, products, and variants.
//!
//! All functions take a `&PgPool`. Writes are full-row (insert) or
//! full-mutable-row (update) — the in-memory store is the source of truth
//! for the values being written. Upsert variants keyed on natural keys
//! (slug, SKU, supplier name) exist for the CLI seeding path.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use petstore_catalog::{Category, Dimensions, Product, ProductStatus, Sku, Supplier, Variant};
use petstore_core::{CategoryId, ProductId, SupplierId, VariantId};

// ── Categories ──────────────────────────────────────────────────────

/// Insert a new category.
pub async fn insert_category(pool: &PgPool, record: &Category) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO categories (id, name, slug, parent_id, description, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(record.id.0)
    .bind(&record.name)
    .bind(&record.slug)
    .bind(record.parent_id.map(|p| p.0))
    .bind(&record.description)
    .bind(record.created_at)
    .bind(record.updated_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Update a category's mutable fields.
pub async fn update_category(pool: &PgPool, record: &Category) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE categories SET name = $1, slug = $2, parent_id = $3, description = $4,
         updated_at = $5 WHERE id = $6",
    )
    .bind(&record.name)
    .bind(&record.slug)
    .bind(record.parent_id.map(|p| p.0))
    .bind(&record.description)
    .bind(record.updated_at)
    .bind(record.id.0)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Delete a category.
pub async fn delete_category(pool: &PgPool, id: CategoryId) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM categories WHERE id = $1")
        .bind(id.0)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Upsert a category by slug (seeding path).
pub async fn upsert_category(pool: &PgPool, record: &Category) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO categories (id, name, slug, parent_id, description, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7)
         ON CONFLICT (slug) DO UPDATE SET
           name = EXCLUDED.name,
           parent_id = EXCLUDED.parent_id,
           description = EXCLUDED.description,
           updated_at = EXCLUDED.updated_at",
    )
    .bind(record.id.0)
    .bind(&record.name)
    .bind(&record.slug)
    .bind(record.parent_id.map(|p| p.0))
    .bind(&record.description)
    .bind(record.created_at)
    .bind(record.updated_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Load all categories on startup.
pub async fn load_categories(pool: &PgPool) -> Result<Vec<Category>, sqlx::Error> {
    let rows = sqlx::query_as::<_, CategoryRow>(
        "SELECT id, name, slug, parent_id, description, created_at, updated_at
         FROM categories ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(CategoryRow::into_record).collect())
}

/// Fetch a category id by slug (seeding path).
pub async fn category_id_by_slug(
    pool: &PgPool,
    slug: &str,
) -> Result<Option<CategoryId>, sqlx::Error> {
    let row: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM categories WHERE slug = $1")
        .bind(slug)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|(id,)| CategoryId(id)))
}

#[derive(sqlx::FromRow)]
struct CategoryRow {
    id: Uuid,
    name: String,
    slug: String,
    parent_id: Option<Uuid>,
    description: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CategoryRow {
    fn into_record(self) -> Category {
        Category {
            id: CategoryId(self.id),
            name: self.name,
            slug: self.slug,
            parent_id: self.parent_id.map(CategoryId),
            description: self.description,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

// ── Suppliers ───────────────────────────────────────────────────────

/// Insert a new supplier.
pub async fn insert_supplier(pool: &PgPool, record: &Supplier) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO suppliers (id, name, contact_email, phone, active, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(record.id.0)
    .bind(&record.name)
    .bind(&record.contact_email)
    .bind(&record.phone)
    .bind(record.active)
    .bind(record.created_at)
    .bind(record.updated_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Update a supplier's mutable fields.
pub async fn update_supplier(pool: &PgPool, record: &Supplier) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE suppliers SET name = $1, contact_email = $2, phone = $3, active = $4,
         updated_at = $5 WHERE id = $6",
    )
    .bind(&record.name)
    .bind(&record.contact_email)
    .bind(&record.phone)
    .bind(record.active)
    .bind(record.updated_at)
    .bind(record.id.0)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Fetch a supplier id by exact name (seeding path — supplier names are
/// treated as natural keys by the pack loader).
pub async fn supplier_id_by_name(
    pool: &PgPool,
    name: &str,
) -> Result<Option<SupplierId>, sqlx::Error> {
    let row: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM suppliers WHERE name = $1")
        .bind(name)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|(id,)| SupplierId(id)))
}

/// Load all suppliers on startup.
pub async fn load_suppliers(pool: &PgPool) -> Result<Vec<Supplier>, sqlx::Error> {
    let rows = sqlx::query_as::<_, SupplierRow>(
        "SELECT id, name, contact_email, phone, active, created_at, updated_at
         FROM suppliers ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(SupplierRow::into_record).collect())
}

#[derive(sqlx::FromRow)]
struct SupplierRow {
    id: Uuid,
    name: String,
    contact_email: String,
    phone: Option<String>,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl SupplierRow {
    fn into_record(self) -> Supplier {
        Supplier {
            id: SupplierId(self.id),
            name: self.name,
            contact_email: self.contact_email,
            phone: self.phone,
            active: self.active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

// ── Products ────────────────────────────────────────────────────────

/// Insert a new product.
pub async fn insert_product(pool: &PgPool, record: &Product) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO products (id, name, slug, description, category_id, supplier_id, status,
         created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
    )
    .bind(record.id.0)
    .bind(&record.name)
    .bind(&record.slug)
    .bind(&record.description)
    .bind(record.category_id.0)
    .bind(record.supplier_id.0)
    .bind(record.status.as_str())
    .bind(record.created_at)
    .bind(record.updated_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Update a product's mutable fields.
pub async fn update_product(pool: &PgPool, record: &Product) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE products SET name = $1, slug = $2, description = $3, category_id = $4,
         supplier_id = $5, status = $6, updated_at = $7 WHERE id = $8",
    )
    .bind(&record.name)
    .bind(&record.slug)
    .bind(&record.description)
    .bind(record.category_id.0)
    .bind(record.supplier_id.0)
    .bind(record.status.as_str())
    .bind(record.updated_at)
    .bind(record.id.0)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Upsert a product by slug (seeding path).
pub async fn upsert_product(pool: &PgPool, record: &Product) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO products (id, name, slug, description, category_id, supplier_id, status,
         created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
         ON CONFLICT (slug) DO UPDATE SET
           name = EXCLUDED.name,
           description = EXCLUDED.description,
           category_id = EXCLUDED.category_id,
           supplier_id = EXCLUDED.supplier_id,
           status = EXCLUDED.status,
           updated_at = EXCLUDED.updated_at",
    )
    .bind(record.id.0)
    .bind(&record.name)
    .bind(&record.slug)
    .bind(&record.description)
    .bind(record.category_id.0)
    .bind(record.supplier_id.0)
    .bind(record.status.as_str())
    .bind(record.created_at)
    .bind(record.updated_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Fetch a product id by slug (seeding path).
pub async fn product_id_by_slug(
    pool: &PgPool,
    slug: &str,
) -> Result<Option<ProductId>, sqlx::Error> {
    let row: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM products WHERE slug = $1")
        .bind(slug)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|(id,)| ProductId(id)))
}

/// Load all products on startup.
pub async fn load_products(pool: &PgPool) -> Result<Vec<Product>, sqlx::Error> {
    let rows = sqlx::query_as::<_, ProductRow>(
        "SELECT id, name, slug, description, category_id, supplier_id, status,
         created_at, updated_at
         FROM products ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(ProductRow::into_record).collect())
}

fn parse_product_status(s: &str) -> ProductStatus {
    match s {
        "DRAFT" => ProductStatus::Draft,
        "ACTIVE" => ProductStatus::Active,
        "DISCONTINUED" => ProductStatus::Discontinued,
        other => {
            tracing::warn!(
                status = other,
                "unknown product status in database, defaulting to Draft"
            );
            ProductStatus::Draft
        }
    }
}

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    slug: String,
    description: String,
    category_id: Uuid,
    supplier_id: Uuid,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ProductRow {
    fn into_record(self) -> Product {
        Product {
            id: ProductId(self.id),
            name: self.name,
            slug: self.slug,
            description: self.description,
            category_id: CategoryId(self.category_id),
            supplier_id: SupplierId(self.supplier_id),
            status: parse_product_status(&self.status),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

// ── Variants ────────────────────────────────────────────────────────

/// Insert a new variant.
pub async fn insert_variant(pool: &PgPool, record: &Variant) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO variants (id, product_id, sku, display_name, price_cents, weight_grams,
         length_mm, width_mm, height_mm, stock_on_hand, stock_reserved, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
    )
    .bind(record.id.0)
    .bind(record.product_id.0)
    .bind(record.sku.as_str())
    .bind(&record.display_name)
    .bind(record.price_cents)
    .bind(record.weight_grams as i32)
    .bind(record.dims_mm.length_mm as i32)
    .bind(record.dims_mm.width_mm as i32)
    .bind(record.dims_mm.height_mm as i32)
    .bind(record.stock_on_hand as i32)
    .bind(record.stock_reserved as i32)
    .bind(record.created_at)
    .bind(record.updated_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Update a variant's mutable fields, including stock counters.
pub async fn update_variant(pool: &PgPool, record: &Variant) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE variants SET display_name = $1, price_cents = $2, weight_grams = $3,
         length_mm = $4, width_mm = $5, height_mm = $6, stock_on_hand = $7,
         stock_reserved = $8, updated_at = $9 WHERE id = $10",
    )
    .bind(&record.display_name)
    .bind(record.price_cents)
    .bind(record.weight_grams as i32)
    .bind(record.dims_mm.length_mm as i32)
    .bind(record.dims_mm.width_mm as i32)
    .bind(record.dims_mm.height_mm as i32)
    .bind(record.stock_on_hand as i32)
    .bind(record.stock_reserved as i32)
    .bind(record.updated_at)
    .bind(record.id.0)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Upsert a variant by SKU (seeding path).
pub async fn upsert_variant(pool: &PgPool, record: &Variant) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO variants (id, product_id, sku, display_name, price_cents, weight_grams,
         length_mm, width_mm, height_mm, stock_on_hand, stock_reserved, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
         ON CONFLICT (sku) DO UPDATE SET
           display_name = EXCLUDED.display_name,
           price_cents = EXCLUDED.price_cents,
           weight_grams = EXCLUDED.weight_grams,
           length_mm = EXCLUDED.length_mm,
           width_mm = EXCLUDED.width_mm,
           height_mm = EXCLUDED.height_mm,
           stock_on_hand = EXCLUDED.stock_on_hand,
           updated_at = EXCLUDED.updated_at",
    )
    .bind(record.id.0)
    .bind(record.product_id.0)
    .bind(record.sku.as_str())
    .bind(&record.display_name)
    .bind(record.price_cents)
    .bind(record.weight_grams as i32)
    .bind(record.dims_mm.length_mm as i32)
    .bind(record.dims_mm.width_mm as i32)
    .bind(record.dims_mm.height_mm as i32)
    .bind(record.stock_on_hand as i32)
    .bind(record.stock_reserved as i32)
    .bind(record.created_at)
    .bind(record.updated_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Load all variants on startup.
pub async fn load_variants(pool: &PgPool) -> Result<Vec<Variant>, sqlx::Error> {
    let rows = sqlx::query_as::<_, VariantRow>(
        "SELECT id, product_id, sku, display_name, price_cents, weight_grams,
         length_mm, width_mm, height_mm, stock_on_hand, stock_reserved, created_at, updated_at
         FROM variants ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;

    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        match row.into_record() {
            Some(record) => records.push(record),
            None => {
                tracing::error!("skipping variant row with invalid sku during load_variants");
            }
        }
    }
    Ok(records)
}

#[derive(sqlx::FromRow)]
struct VariantRow {
    id: Uuid,
    product_id: Uuid,
    sku: String,
    display_name: String,
    price_cents: i64,
    weight_grams: i32,
    length_mm: i32,
    width_mm: i32,
    height_mm: i32,
    stock_on_hand: i32,
    stock_reserved: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl VariantRow {
    fn into_record(self) -> Option<Variant> {
        let sku = match Sku::new(self.sku.clone()) {
            Ok(sku) => sku,
            Err(_) => {
                tracing::warn!(
                    id = %self.id,
                    sku = %self.sku,
                    "skipping variant row with invalid sku"
                );
                return None;
            }
        };
        Some(Variant {
            id: VariantId(self.id),
            product_id: ProductId(self.product_id),
            sku,
            display_name: self.display_name,
            price_cents: self.price_cents,
            weight_grams: self.weight_grams.max(0) as u32,
            dims_mm: Dimensions {
                length_mm: self.length_mm.max(0) as u32,
                width_mm: self.width_mm.max(0) as u32,
                height_mm: self.height_mm.max(0) as u32,
            },
            stock_on_hand: self.stock_on_hand.max(0) as u32,
            stock_reserved: self.stock_reserved.max(0) as u32,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
