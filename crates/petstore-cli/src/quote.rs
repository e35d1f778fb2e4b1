//! # Quote Subcommand
//!
//! Computes a shipping quote with the default rate table. Handy for
//! sanity-checking tier boundaries without a running API.

use clap::Args;

use petstore_catalog::Dimensions;
use petstore_checkout::ShippingRates;
use petstore_core::{format_amount, parse_amount};

/// Arguments for the quote subcommand.
#[derive(Args, Debug)]
pub struct QuoteArgs {
    /// Actual parcel weight in grams.
    #[arg(long)]
    pub weight_grams: u64,

    /// Parcel dimensions as `LxWxH` in millimetres, e.g. `600x400x200`.
    #[arg(long)]
    pub dims: Option<String>,

    /// Merchandise subtotal (decimal, e.g. `80.00`) for the free-shipping
    /// threshold. Defaults to zero.
    #[arg(long)]
    pub subtotal: Option<String>,
}

fn parse_dims(s: &str) -> anyhow::Result<Dimensions> {
    let parts: Vec<&str> = s.split('x').collect();
    if parts.len() != 3 {
        anyhow::bail!("dims must be LxWxH, e.g. 600x400x200");
    }
    let mut values = [0u32; 3];
    for (i, part) in parts.iter().enumerate() {
        values[i] = part
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("dims component {:?}: {e}", part))?;
    }
    Ok(Dimensions {
        length_mm: values[0],
        width_mm: values[1],
        height_mm: values[2],
    })
}

/// Compute and print the quote.
pub fn run(args: &QuoteArgs) -> anyhow::Result<()> {
    let volumetric = match &args.dims {
        Some(dims) => ShippingRates::volumetric_grams(&parse_dims(dims)?),
        None => 0,
    };
    let subtotal_cents = match &args.subtotal {
        Some(s) => parse_amount(s).ok_or_else(|| anyhow::anyhow!("invalid subtotal: {s:?}"))?,
        None => 0,
    };

    let rates = ShippingRates::default();
    let quote = rates.quote(args.weight_grams, volumetric, subtotal_cents);

    println!("actual:      {} g", quote.actual_grams);
    println!("volumetric:  {} g", quote.volumetric_grams);
    println!("chargeable:  {} g", quote.chargeable_grams);
    if quote.free_threshold_applied {
        println!("cost:        0.00 (free shipping threshold)");
    } else {
        println!("cost:        {}", format_amount(quote.cost_cents));
    }
    Ok(())
}
