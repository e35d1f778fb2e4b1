//! # Validate Subcommand
//!
//! Parses and validates a catalog pack, printing a summary or the full
//! problem list.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

use petstore_catalog::CatalogPack;

/// Arguments for the validate subcommand.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Path to the catalog pack YAML.
    #[arg(long)]
    pub pack: PathBuf,
}

/// Load, validate, and summarize a catalog pack.
pub fn run(args: &ValidateArgs) -> anyhow::Result<()> {
    let pack = CatalogPack::load(&args.pack)
        .with_context(|| format!("validating {}", args.pack.display()))?;

    println!("pack {:?} (version {}) is valid", pack.name, pack.version);
    println!("  categories: {}", pack.categories.len());
    println!("  suppliers:  {}", pack.suppliers.len());
    println!("  products:   {}", pack.products.len());
    println!("  variants:   {}", pack.variant_count());
    Ok(())
}
