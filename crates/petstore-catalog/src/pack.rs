//! # Catalog Seed Packs
//!
//! A catalog pack is a YAML document describing categories, suppliers, and
//! products-with-variants, used to bootstrap a store (CLI `seed` command) and
//! to ship fixture catalogs for tests. Packs are validated as a whole before
//! anything is applied: referential integrity, slug/SKU uniqueness, and field
//! rules all hold or the pack is rejected with the full list of problems.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use petstore_core::parse_amount;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::category::validate_slug;
use crate::product::Product;
use crate::supplier::validate_email;
use crate::variant::Sku;

/// Expected `kind` marker for catalog packs.
pub const PACK_KIND: &str = "petstore/catalog-pack";

/// Error loading or validating a catalog pack.
#[derive(Error, Debug)]
pub enum PackError {
    /// Pack file does not exist.
    #[error("pack file not found: {path}")]
    FileNotFound {
        /// The missing path.
        path: PathBuf,
    },

    /// IO failure reading the pack.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parse failure.
    #[error("yaml parse error in {path}: {source}")]
    YamlParse {
        /// File being parsed.
        path: PathBuf,
        /// Underlying serde_yaml error.
        source: serde_yaml::Error,
    },

    /// The document parsed but has the wrong `kind` marker.
    #[error("wrong pack kind: expected {expected}, got {actual}")]
    WrongKind {
        /// The kind this loader accepts.
        expected: &'static str,
        /// The kind found in the document.
        actual: String,
    },

    /// The pack parsed but failed validation. All problems are listed.
    #[error("pack validation failed with {} problem(s):\n{}", .0.len(), .0.join("\n"))]
    Invalid(Vec<String>),
}

/// A category entry in a pack.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackCategory {
    pub slug: String,
    pub name: String,
    /// Slug of the parent category within the same pack, if any.
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub description: String,
}

/// A supplier entry in a pack.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackSupplier {
    /// Pack-local key products reference.
    pub key: String,
    pub name: String,
    pub contact_email: String,
    #[serde(default)]
    pub phone: Option<String>,
}

/// A variant entry in a pack.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackVariant {
    pub sku: String,
    pub display_name: String,
    /// Decimal price string, e.g. `"24.99"`.
    pub price: String,
    pub weight_grams: u32,
    /// `[length, width, height]` in millimetres.
    pub dims_mm: [u32; 3],
    #[serde(default)]
    pub stock: u32,
}

/// A product entry in a pack.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackProduct {
    pub slug: String,
    pub name: String,
    /// Slug of the category this product belongs to.
    pub category: String,
    /// Key of the supplier this product is sourced from.
    pub supplier: String,
    #[serde(default)]
    pub description: String,
    pub variants: Vec<PackVariant>,
}

/// A parsed catalog pack.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogPack {
    /// Document kind marker; must equal [`PACK_KIND`].
    pub kind: String,
    /// Human-readable pack name.
    pub name: String,
    /// Pack version string.
    pub version: String,
    #[serde(default)]
    pub categories: Vec<PackCategory>,
    #[serde(default)]
    pub suppliers: Vec<PackSupplier>,
    #[serde(default)]
    pub products: Vec<PackProduct>,
}

impl CatalogPack {
    /// Parse a pack from YAML text. Does not validate — call [`Self::validate`].
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Load and validate a pack from a file.
    pub fn load(path: &Path) -> Result<Self, PackError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                PackError::FileNotFound {
                    path: path.to_path_buf(),
                }
            } else {
                PackError::Io(e)
            }
        })?;
        let pack = Self::from_yaml(&content).map_err(|e| PackError::YamlParse {
            path: path.to_path_buf(),
            source: e,
        })?;
        pack.validate()?;
        Ok(pack)
    }

    /// Validate the whole pack, collecting every problem rather than stopping
    /// at the first.
    pub fn validate(&self) -> Result<(), PackError> {
        if self.kind != PACK_KIND {
            return Err(PackError::WrongKind {
                expected: PACK_KIND,
                actual: self.kind.clone(),
            });
        }

        let mut problems = Vec::new();

        if self.name.trim().is_empty() {
            problems.push("pack name must not be empty".to_string());
        }

        // Categories: slug rules, uniqueness, parent references resolve.
        let mut category_slugs = HashSet::new();
        for c in &self.categories {
            if let Err(e) = validate_slug(&c.slug) {
                problems.push(format!("category {:?}: {e}", c.slug));
            }
            if !category_slugs.insert(c.slug.as_str()) {
                problems.push(format!("duplicate category slug {:?}", c.slug));
            }
            if c.name.trim().is_empty() {
                problems.push(format!("category {:?}: name must not be empty", c.slug));
            }
        }
        for c in &self.categories {
            if let Some(parent) = &c.parent {
                if !category_slugs.contains(parent.as_str()) {
                    problems.push(format!(
                        "category {:?}: unknown parent {:?}",
                        c.slug, parent
                    ));
                }
                if parent == &c.slug {
                    problems.push(format!("category {:?}: cannot be its own parent", c.slug));
                }
            }
        }

        // Suppliers: key uniqueness, email shape.
        let mut supplier_keys = HashSet::new();
        for s in &self.suppliers {
            if s.key.trim().is_empty() {
                problems.push("supplier with empty key".to_string());
            }
            if !supplier_keys.insert(s.key.as_str()) {
                problems.push(format!("duplicate supplier key {:?}", s.key));
            }
            if s.name.trim().is_empty() {
                problems.push(format!("supplier {:?}: name must not be empty", s.key));
            }
            if let Err(e) = validate_email(&s.contact_email) {
                problems.push(format!("supplier {:?}: {e}", s.key));
            }
        }

        // Products: slug uniqueness, references resolve, variants well-formed,
        // SKUs unique across the entire pack.
        let mut product_slugs = HashSet::new();
        let mut skus = HashSet::new();
        for p in &self.products {
            if let Err(e) = Product::validate_fields(&p.name, &p.slug, &p.description) {
                problems.push(format!("product {:?}: {e}", p.slug));
            }
            if !product_slugs.insert(p.slug.as_str()) {
                problems.push(format!("duplicate product slug {:?}", p.slug));
            }
            if !category_slugs.contains(p.category.as_str()) {
                problems.push(format!(
                    "product {:?}: unknown category {:?}",
                    p.slug, p.category
                ));
            }
            if !supplier_keys.contains(p.supplier.as_str()) {
                problems.push(format!(
                    "product {:?}: unknown supplier {:?}",
                    p.slug, p.supplier
                ));
            }
            if p.variants.is_empty() {
                problems.push(format!("product {:?}: must have at least one variant", p.slug));
            }
            for v in &p.variants {
                match Sku::new(v.sku.clone()) {
                    Ok(sku) => {
                        if !skus.insert(sku.as_str().to_string()) {
                            problems.push(format!("duplicate sku {:?}", sku.as_str()));
                        }
                    }
                    Err(e) => problems.push(format!("product {:?}: {e}", p.slug)),
                }
                if v.display_name.trim().is_empty() {
                    problems.push(format!(
                        "product {:?} variant {:?}: display_name must not be empty",
                        p.slug, v.sku
                    ));
                }
                match parse_amount(&v.price) {
                    Some(cents) if cents >= 0 => {}
                    Some(_) => problems.push(format!(
                        "product {:?} variant {:?}: price must not be negative",
                        p.slug, v.sku
                    )),
                    None => problems.push(format!(
                        "product {:?} variant {:?}: price {:?} is not a valid amount",
                        p.slug, v.sku, v.price
                    )),
                }
                if v.dims_mm.iter().any(|&d| d == 0) {
                    problems.push(format!(
                        "product {:?} variant {:?}: dimensions must be positive",
                        p.slug, v.sku
                    ));
                }
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(PackError::Invalid(problems))
        }
    }

    /// Total number of variants across all products.
    pub fn variant_count(&self) -> usize {
        self.products.iter().map(|p| p.variants.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const GOOD_PACK: &str = r#"
kind: petstore/catalog-pack
name: starter-catalog
version: "1"
categories:
  - slug: dog-food
    name: Dog Food
  - slug: dry-food
    name: Dry Food
    parent: dog-food
suppliers:
  - key: acme
    name: Acme Pet Supply
    contact_email: orders@acmepet.example
products:
  - slug: premium-kibble
    name: Premium Kibble
    category: dry-food
    supplier: acme
    description: Grain-free kibble for adult dogs.
    variants:
      - sku: KIBBLE-2KG
        display_name: 2 kg bag
        price: "24.99"
        weight_grams: 2000
        dims_mm: [300, 200, 100]
        stock: 50
      - sku: KIBBLE-10KG
        display_name: 10 kg bag
        price: "89.99"
        weight_grams: 10000
        dims_mm: [600, 400, 200]
        stock: 12
"#;

    #[test]
    fn good_pack_parses_and_validates() {
        let pack = CatalogPack::from_yaml(GOOD_PACK).unwrap();
        pack.validate().unwrap();
        assert_eq!(pack.categories.len(), 2);
        assert_eq!(pack.suppliers.len(), 1);
        assert_eq!(pack.products.len(), 1);
        assert_eq!(pack.variant_count(), 2);
    }

    #[test]
    fn wrong_kind_rejected() {
        let pack = CatalogPack::from_yaml(&GOOD_PACK.replace(
            "petstore/catalog-pack",
            "petstore/price-list",
        ))
        .unwrap();
        assert!(matches!(
            pack.validate().unwrap_err(),
            PackError::WrongKind { .. }
        ));
    }

    #[test]
    fn unknown_category_reference_reported() {
        let pack =
            CatalogPack::from_yaml(&GOOD_PACK.replace("category: dry-food", "category: cat-food"))
                .unwrap();
        let err = pack.validate().unwrap_err();
        let PackError::Invalid(problems) = err else {
            panic!("expected Invalid, got {err}");
        };
        assert!(problems.iter().any(|p| p.contains("unknown category")));
    }

    #[test]
    fn unknown_supplier_reference_reported() {
        let pack =
            CatalogPack::from_yaml(&GOOD_PACK.replace("supplier: acme\n", "supplier: nope\n"))
                .unwrap();
        let err = pack.validate().unwrap_err();
        let PackError::Invalid(problems) = err else {
            panic!("expected Invalid, got {err}");
        };
        assert!(problems.iter().any(|p| p.contains("unknown supplier")));
    }

    #[test]
    fn duplicate_sku_reported() {
        let pack =
            CatalogPack::from_yaml(&GOOD_PACK.replace("KIBBLE-10KG", "KIBBLE-2KG")).unwrap();
        let err = pack.validate().unwrap_err();
        let PackError::Invalid(problems) = err else {
            panic!("expected Invalid, got {err}");
        };
        assert!(problems.iter().any(|p| p.contains("duplicate sku")));
    }

    #[test]
    fn bad_price_reported() {
        let pack = CatalogPack::from_yaml(&GOOD_PACK.replace("\"24.99\"", "\"lots\"")).unwrap();
        let err = pack.validate().unwrap_err();
        let PackError::Invalid(problems) = err else {
            panic!("expected Invalid, got {err}");
        };
        assert!(problems.iter().any(|p| p.contains("not a valid amount")));
    }

    #[test]
    fn self_parent_reported() {
        let pack = CatalogPack::from_yaml(&GOOD_PACK.replace(
            "parent: dog-food",
            "parent: dry-food",
        ))
        .unwrap();
        let err = pack.validate().unwrap_err();
        let PackError::Invalid(problems) = err else {
            panic!("expected Invalid, got {err}");
        };
        assert!(problems.iter().any(|p| p.contains("own parent")));
    }

    #[test]
    fn all_problems_collected_not_just_first() {
        let broken = GOOD_PACK
            .replace("category: dry-food", "category: cat-food")
            .replace("\"24.99\"", "\"lots\"");
        let pack = CatalogPack::from_yaml(&broken).unwrap();
        let PackError::Invalid(problems) = pack.validate().unwrap_err() else {
            panic!("expected Invalid");
        };
        assert!(problems.len() >= 2, "got: {problems:?}");
    }

    #[test]
    fn load_missing_file_is_not_found() {
        let err = CatalogPack::load(Path::new("/nonexistent/pack.yaml")).unwrap_err();
        assert!(matches!(err, PackError::FileNotFound { .. }));
    }

    #[test]
    fn load_reads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(GOOD_PACK.as_bytes()).unwrap();
        let pack = CatalogPack::load(file.path()).unwrap();
        assert_eq!(pack.name, "starter-catalog");
    }
}
