//! # petstore-cli — Pet-Store Commerce Command-Line Interface
//!
//! Operator tooling for the commerce stack.
//!
//! ## Subcommands
//!
//! - `validate` — Parse and validate a catalog pack YAML
//! - `seed` — Upsert a catalog pack into Postgres
//! - `token` — Mint a bearer token in the API's format
//! - `quote` — Compute a shipping quote from weight/dimensions
//!
//! ## Crate Policy
//!
//! - CLI construction (argument parsing) is separated from business logic.
//! - Handler functions delegate to domain crates — no business logic here.

pub mod quote;
pub mod seed;
pub mod token;
pub mod validate;
