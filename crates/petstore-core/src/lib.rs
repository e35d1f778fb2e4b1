#![deny(missing_docs)]

//! # petstore-core — Foundational Types for the Pet-Store Commerce Stack
//!
//! This crate defines the foundational types that every other crate in the
//! workspace depends on. It has no internal crate dependencies — only `serde`,
//! `serde_json`, `thiserror`, `chrono`, and `uuid` from the external ecosystem.
//!
//! ## Design Principles
//!
//! 1. **Newtype wrappers for domain primitives.** Every identifier is a distinct
//!    type. You cannot pass a [`CartId`] where an [`OrderId`] is expected.
//!
//! 2. **Money is integer minor units.** All amounts are `i64` cents of a single
//!    store currency. Parsing and formatting go through [`parse_amount`] and
//!    [`format_amount`]; aggregation uses checked/saturating arithmetic.
//!    Floats never touch a money path.
//!
//! 3. **[`PetstoreError`] hierarchy.** Structured errors with `thiserror` — no
//!    `Box<dyn Error>`, no `.unwrap()` outside tests.

pub mod error;
pub mod identity;
pub mod money;

// Re-export primary types at crate root for ergonomic imports.
pub use error::{PetstoreError, StateError, ValidationError};
pub use identity::{
    CartId, CategoryId, OrderId, PaymentId, ProductId, ReviewId, SupplierId, UserId, VariantId,
};
pub use money::{format_amount, parse_amount};
