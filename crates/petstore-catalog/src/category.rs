//! # Category Tree
//!
//! Categories form a flat-with-parent-pointer tree (`parent_id`), matching
//! how the storefront renders navigation: top-level departments with one
//! level of subcategories. Deeper nesting is allowed by the data model but
//! unused by the UI.

use chrono::{DateTime, Utc};
use petstore_core::{CategoryId, ValidationError};
use serde::{Deserialize, Serialize};

/// A catalog category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    /// Display name, e.g. "Dog Food".
    pub name: String,
    /// URL-safe slug, unique across the catalog, e.g. "dog-food".
    pub slug: String,
    /// Parent category, `None` for top-level departments.
    pub parent_id: Option<CategoryId>,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Category {
    /// Validate name and slug rules shared by the API and pack loader.
    pub fn validate_fields(name: &str, slug: &str) -> Result<(), ValidationError> {
        if name.trim().is_empty() {
            return Err(ValidationError::Empty { field: "name" });
        }
        if name.len() > 120 {
            return Err(ValidationError::TooLong {
                field: "name",
                max: 120,
            });
        }
        validate_slug(slug)
    }
}

/// Validate a URL slug: non-empty, ≤ 120 chars, lowercase alphanumeric
/// segments joined by single hyphens.
pub fn validate_slug(slug: &str) -> Result<(), ValidationError> {
    if slug.is_empty() {
        return Err(ValidationError::Empty { field: "slug" });
    }
    if slug.len() > 120 {
        return Err(ValidationError::TooLong {
            field: "slug",
            max: 120,
        });
    }
    let ok = slug
        .split('-')
        .all(|seg| !seg.is_empty() && seg.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    if !ok {
        return Err(ValidationError::Malformed {
            field: "slug",
            reason: "expected lowercase alphanumeric segments joined by single hyphens".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_slugs_accepted() {
        assert!(validate_slug("dog-food").is_ok());
        assert!(validate_slug("treats").is_ok());
        assert!(validate_slug("aquarium-kits-2024").is_ok());
    }

    #[test]
    fn invalid_slugs_rejected() {
        assert!(validate_slug("").is_err());
        assert!(validate_slug("Dog-Food").is_err());
        assert!(validate_slug("dog food").is_err());
        assert!(validate_slug("dog--food").is_err());
        assert!(validate_slug("-leading").is_err());
        assert!(validate_slug("trailing-").is_err());
    }

    #[test]
    fn validate_fields_checks_name_and_slug() {
        assert!(Category::validate_fields("Dog Food", "dog-food").is_ok());
        assert!(Category::validate_fields("  ", "dog-food").is_err());
        assert!(Category::validate_fields("Dog Food", "DOG").is_err());
        assert!(Category::validate_fields(&"x".repeat(121), "dog-food").is_err());
    }
}
