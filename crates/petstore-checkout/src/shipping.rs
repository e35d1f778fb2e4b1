//! # Shipping Cost Calculation
//!
//! Couriers charge on **chargeable weight**: the greater of the actual weight
//! and the volumetric weight (`volume / divisor`). A light but bulky parcel
//! (a dog bed) is charged by volume; a dense one (canned food) by the scale.
//!
//! The rate table is a sorted list of weight tiers plus a per-kilogram
//! overflow rate beyond the last tier. Orders over the free-shipping
//! threshold (evaluated on the pre-discount merchandise subtotal) ship free.

use serde::{Deserialize, Serialize};

use petstore_catalog::Dimensions;

/// Courier volumetric divisor: mm³ per gram.
///
/// `volume_mm3 / 5000` yields grams — the metric equivalent of the common
/// cm³/5 air-freight convention.
pub const VOLUMETRIC_DIVISOR: u64 = 5000;

/// One weight tier of the rate table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateTier {
    /// Upper bound of the tier, inclusive, in grams.
    pub max_grams: u64,
    /// Flat cost for parcels in this tier, in cents.
    pub cost_cents: i64,
}

/// The shipping rate table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShippingRates {
    /// Tiers sorted ascending by `max_grams`.
    pub tiers: Vec<RateTier>,
    /// Cost per started kilogram beyond the last tier, in cents.
    pub per_kg_overflow_cents: i64,
    /// Merchandise subtotal (pre-discount) at which shipping becomes free.
    pub free_shipping_threshold_cents: i64,
}

impl Default for ShippingRates {
    fn default() -> Self {
        Self {
            tiers: vec![
                RateTier {
                    max_grams: 500,
                    cost_cents: 499,
                },
                RateTier {
                    max_grams: 2_000,
                    cost_cents: 899,
                },
                RateTier {
                    max_grams: 5_000,
                    cost_cents: 1_499,
                },
                RateTier {
                    max_grams: 10_000,
                    cost_cents: 2_499,
                },
            ],
            per_kg_overflow_cents: 199,
            free_shipping_threshold_cents: 7_500,
        }
    }
}

/// Result of a shipping quote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingQuote {
    /// Actual weight of the shipment in grams.
    pub actual_grams: u64,
    /// Volumetric weight of the shipment in grams.
    pub volumetric_grams: u64,
    /// `max(actual, volumetric)` — what the courier charges on.
    pub chargeable_grams: u64,
    /// Shipping cost in cents. Zero when the free threshold applied.
    pub cost_cents: i64,
    /// Whether the free-shipping threshold zeroed the cost.
    pub free_threshold_applied: bool,
}

impl ShippingRates {
    /// Volumetric weight in grams for a single parcel of these dimensions.
    pub fn volumetric_grams(dims: &Dimensions) -> u64 {
        dims.volume_mm3() / VOLUMETRIC_DIVISOR
    }

    /// Cost in cents for a given chargeable weight, ignoring the free
    /// threshold.
    pub fn cost_for_weight(&self, chargeable_grams: u64) -> i64 {
        for tier in &self.tiers {
            if chargeable_grams <= tier.max_grams {
                return tier.cost_cents;
            }
        }
        // Beyond the last tier: last tier cost plus per-started-kg overflow.
        let Some(last) = self.tiers.last() else {
            return 0;
        };
        let overflow_grams = chargeable_grams - last.max_grams;
        let started_kgs = overflow_grams.div_ceil(1000) as i64;
        last.cost_cents
            .saturating_add(self.per_kg_overflow_cents.saturating_mul(started_kgs))
    }

    /// Quote a shipment.
    ///
    /// `actual_grams` and `volumetric_grams` describe the aggregate parcel;
    /// `merchandise_subtotal_cents` is the pre-discount subtotal used for the
    /// free-shipping threshold.
    pub fn quote(
        &self,
        actual_grams: u64,
        volumetric_grams: u64,
        merchandise_subtotal_cents: i64,
    ) -> ShippingQuote {
        let chargeable_grams = actual_grams.max(volumetric_grams);
        let free = merchandise_subtotal_cents >= self.free_shipping_threshold_cents;
        let cost_cents = if free {
            0
        } else {
            self.cost_for_weight(chargeable_grams)
        };
        ShippingQuote {
            actual_grams,
            volumetric_grams,
            chargeable_grams,
            cost_cents,
            free_threshold_applied: free,
        }
    }
}
