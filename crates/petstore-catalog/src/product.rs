//! # Products
//!
//! A product is the browsable unit ("Premium Kibble"); its [`crate::Variant`]s
//! are the purchasable units ("2 kg bag"). Products carry lifecycle status so
//! the storefront can hide drafts and discontinued lines without deleting
//! their order history.

use chrono::{DateTime, Utc};
use petstore_core::{CategoryId, ProductId, SupplierId, ValidationError};
use serde::{Deserialize, Serialize};

use crate::category::validate_slug;

/// Product lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductStatus {
    /// Being authored; not visible on the storefront.
    Draft,
    /// Live and purchasable.
    Active,
    /// No longer sold; kept for order history. Terminal.
    Discontinued,
}

impl ProductStatus {
    /// Return the string representation of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Active => "ACTIVE",
            Self::Discontinued => "DISCONTINUED",
        }
    }
}

impl std::fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A catalog product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    /// URL-safe slug, unique across the catalog.
    pub slug: String,
    pub description: String,
    pub category_id: CategoryId,
    pub supplier_id: SupplierId,
    pub status: ProductStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Validate name/slug/description rules shared by the API and pack loader.
    pub fn validate_fields(name: &str, slug: &str, description: &str) -> Result<(), ValidationError> {
        if name.trim().is_empty() {
            return Err(ValidationError::Empty { field: "name" });
        }
        if name.len() > 200 {
            return Err(ValidationError::TooLong {
                field: "name",
                max: 200,
            });
        }
        if description.len() > 5000 {
            return Err(ValidationError::TooLong {
                field: "description",
                max: 5000,
            });
        }
        validate_slug(slug)
    }

    /// Whether the product can appear on the storefront and be added to carts.
    pub fn purchasable(&self) -> bool {
        self.status == ProductStatus::Active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_as_str_roundtrip() {
        assert_eq!(ProductStatus::Draft.as_str(), "DRAFT");
        assert_eq!(ProductStatus::Active.as_str(), "ACTIVE");
        assert_eq!(ProductStatus::Discontinued.as_str(), "DISCONTINUED");
    }

    #[test]
    fn status_serializes_screaming() {
        let json = serde_json::to_string(&ProductStatus::Active).unwrap();
        assert_eq!(json, "\"ACTIVE\"");
    }

    #[test]
    fn validate_fields_enforces_limits() {
        assert!(Product::validate_fields("Premium Kibble", "premium-kibble", "Tasty.").is_ok());
        assert!(Product::validate_fields("", "premium-kibble", "").is_err());
        assert!(Product::validate_fields("Kibble", "Premium Kibble", "").is_err());
        assert!(Product::validate_fields("Kibble", "kibble", &"d".repeat(5001)).is_err());
    }

    #[test]
    fn only_active_products_are_purchasable() {
        let now = Utc::now();
        let mut product = Product {
            id: ProductId::new(),
            name: "Premium Kibble".to_string(),
            slug: "premium-kibble".to_string(),
            description: String::new(),
            category_id: CategoryId::new(),
            supplier_id: SupplierId::new(),
            status: ProductStatus::Draft,
            created_at: now,
            updated_at: now,
        };
        assert!(!product.purchasable());
        product.status = ProductStatus::Active;
        assert!(product.purchasable());
        product.status = ProductStatus::Discontinued;
        assert!(!product.purchasable());
    }
}
