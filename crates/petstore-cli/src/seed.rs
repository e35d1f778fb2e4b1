//! # Seed Subcommand
//!
//! Validates a catalog pack and upserts it into Postgres, keyed on natural
//! keys: category and product slugs, variant SKUs, supplier names. Re-running
//! the same pack is idempotent; stock for existing variants is overwritten
//! with the pack's counts.

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use clap::Args;

use petstore_api::db;
use petstore_catalog::{CatalogPack, Category, Dimensions, Product, ProductStatus, Sku, Supplier, Variant};
use petstore_core::{parse_amount, CategoryId, ProductId, SupplierId, VariantId};

/// Arguments for the seed subcommand.
#[derive(Args, Debug)]
pub struct SeedArgs {
    /// Path to the catalog pack YAML.
    #[arg(long)]
    pub pack: PathBuf,

    /// Postgres connection URL. Falls back to `DATABASE_URL`.
    #[arg(long)]
    pub database_url: Option<String>,
}

/// Validate the pack and upsert it into the database.
pub async fn run(args: &SeedArgs) -> anyhow::Result<()> {
    let pack = CatalogPack::load(&args.pack)
        .with_context(|| format!("loading {}", args.pack.display()))?;

    let url = match &args.database_url {
        Some(url) => url.clone(),
        None => std::env::var("DATABASE_URL")
            .context("--database-url not given and DATABASE_URL not set")?,
    };
    let pool = db::connect(&url).await.context("connecting to Postgres")?;

    let now = Utc::now();

    // Categories: two passes so parents resolve regardless of order.
    let mut category_ids: HashMap<String, CategoryId> = HashMap::new();
    for entry in &pack.categories {
        let id = match db::catalog::category_id_by_slug(&pool, &entry.slug).await? {
            Some(id) => id,
            None => CategoryId::new(),
        };
        category_ids.insert(entry.slug.clone(), id);
        let record = Category {
            id,
            name: entry.name.clone(),
            slug: entry.slug.clone(),
            parent_id: None,
            description: entry.description.clone(),
            created_at: now,
            updated_at: now,
        };
        db::catalog::upsert_category(&pool, &record)
            .await
            .with_context(|| format!("upserting category {:?}", entry.slug))?;
    }
    for entry in &pack.categories {
        if let Some(parent_slug) = &entry.parent {
            let record = Category {
                id: category_ids[&entry.slug],
                name: entry.name.clone(),
                slug: entry.slug.clone(),
                parent_id: category_ids.get(parent_slug).copied(),
                description: entry.description.clone(),
                created_at: now,
                updated_at: now,
            };
            db::catalog::upsert_category(&pool, &record)
                .await
                .with_context(|| format!("linking category {:?} to parent", entry.slug))?;
        }
    }

    // Suppliers, keyed on name.
    let mut supplier_ids: HashMap<String, SupplierId> = HashMap::new();
    for entry in &pack.suppliers {
        let id = match db::catalog::supplier_id_by_name(&pool, &entry.name).await? {
            Some(id) => {
                let record = Supplier {
                    id,
                    name: entry.name.clone(),
                    contact_email: entry.contact_email.clone(),
                    phone: entry.phone.clone(),
                    active: true,
                    created_at: now,
                    updated_at: now,
                };
                db::catalog::update_supplier(&pool, &record).await?;
                id
            }
            None => {
                let record = Supplier {
                    id: SupplierId::new(),
                    name: entry.name.clone(),
                    contact_email: entry.contact_email.clone(),
                    phone: entry.phone.clone(),
                    active: true,
                    created_at: now,
                    updated_at: now,
                };
                db::catalog::insert_supplier(&pool, &record)
                    .await
                    .with_context(|| format!("inserting supplier {:?}", entry.key))?;
                record.id
            }
        };
        supplier_ids.insert(entry.key.clone(), id);
    }

    // Products and variants.
    let mut product_count = 0usize;
    let mut variant_count = 0usize;
    for entry in &pack.products {
        let product_id = match db::catalog::product_id_by_slug(&pool, &entry.slug).await? {
            Some(id) => id,
            None => ProductId::new(),
        };
        let record = Product {
            id: product_id,
            name: entry.name.clone(),
            slug: entry.slug.clone(),
            description: entry.description.clone(),
            category_id: category_ids[&entry.category],
            supplier_id: supplier_ids[&entry.supplier],
            status: ProductStatus::Active,
            created_at: now,
            updated_at: now,
        };
        db::catalog::upsert_product(&pool, &record)
            .await
            .with_context(|| format!("upserting product {:?}", entry.slug))?;
        product_count += 1;

        for v in &entry.variants {
            // Pack validation has already vetted SKU and price.
            let sku = Sku::new(v.sku.clone())
                .map_err(|e| anyhow::anyhow!("variant {:?}: {e}", v.sku))?;
            let price_cents = parse_amount(&v.price)
                .ok_or_else(|| anyhow::anyhow!("variant {:?}: bad price {:?}", v.sku, v.price))?;
            let record = Variant {
                id: VariantId::new(),
                product_id,
                sku,
                display_name: v.display_name.clone(),
                price_cents,
                weight_grams: v.weight_grams,
                dims_mm: Dimensions {
                    length_mm: v.dims_mm[0],
                    width_mm: v.dims_mm[1],
                    height_mm: v.dims_mm[2],
                },
                stock_on_hand: v.stock,
                stock_reserved: 0,
                created_at: now,
                updated_at: now,
            };
            db::catalog::upsert_variant(&pool, &record)
                .await
                .with_context(|| format!("upserting variant {:?}", v.sku))?;
            variant_count += 1;
        }
    }

    println!(
        "seeded pack {:?}: {} categories, {} suppliers, {} products, {} variants",
        pack.name,
        pack.categories.len(),
        supplier_ids.len(),
        product_count,
        variant_count,
    );
    Ok(())
}
