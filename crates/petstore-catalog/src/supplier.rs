//! # Suppliers
//!
//! Suppliers the store sources stock from. Deactivation is soft: an inactive
//! supplier stays referenced by its products but cannot be attached to new
//! ones.

use chrono::{DateTime, Utc};
use petstore_core::{SupplierId, ValidationError};
use serde::{Deserialize, Serialize};

/// A supplier record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Supplier {
    pub id: SupplierId,
    pub name: String,
    pub contact_email: String,
    pub phone: Option<String>,
    /// Inactive suppliers cannot be attached to new products.
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Supplier {
    /// Validate name and contact email. Email checking is shape-only
    /// (`local@domain.tld`), not RFC 5321.
    pub fn validate_fields(name: &str, contact_email: &str) -> Result<(), ValidationError> {
        if name.trim().is_empty() {
            return Err(ValidationError::Empty { field: "name" });
        }
        if name.len() > 200 {
            return Err(ValidationError::TooLong {
                field: "name",
                max: 200,
            });
        }
        validate_email(contact_email)
    }
}

/// Shallow email shape check: one `@`, non-empty local part, domain with a dot.
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(ValidationError::Empty {
            field: "contact_email",
        });
    }
    if email.len() > 254 {
        return Err(ValidationError::TooLong {
            field: "contact_email",
            max: 254,
        });
    }
    let mut parts = email.splitn(2, '@');
    let local = parts.next().unwrap_or("");
    let domain = parts.next().unwrap_or("");
    if local.is_empty() || domain.is_empty() || !domain.contains('.') || domain.ends_with('.') {
        return Err(ValidationError::Malformed {
            field: "contact_email",
            reason: "expected local@domain.tld".to_string(),
        });
    }
    Ok(())
}
