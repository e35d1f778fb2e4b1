//! # Order Pricing
//!
//! Assembles the four numbers on every order: merchandise subtotal, coin
//! discount, shipping, and grand total — plus the coins the order will earn
//! on delivery.
//!
//! Ordering matters and is fixed:
//! 1. Subtotal from snapshotted line prices.
//! 2. Coin discount, capped by the redemption rules (the caller has already
//!    checked the balance).
//! 3. Shipping, quoted on aggregate weight; the free-shipping threshold is
//!    evaluated on the **pre-discount** subtotal so redeeming coins cannot
//!    revoke free shipping.
//! 4. Grand total = subtotal − discount + shipping.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cart::Cart;
use crate::loyalty::{coins_earned, max_redeemable};
use crate::shipping::{ShippingQuote, ShippingRates};

/// Pricing failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PricingError {
    /// The cart has no lines.
    #[error("cart is empty")]
    EmptyCart,

    /// More coins applied than the redemption rules allow.
    #[error("coin redemption over limit: applied {applied}, max {max}")]
    CoinOverLimit {
        /// Coins the cart tried to apply.
        applied: i64,
        /// Maximum redeemable for this cart and balance.
        max: i64,
    },
}

/// The priced totals of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTotals {
    /// Merchandise subtotal before any discount, in cents.
    pub subtotal_cents: i64,
    /// Coin discount applied, in cents (1 coin = 1 cent).
    pub coin_discount_cents: i64,
    /// Shipping cost, in cents.
    pub shipping_cents: i64,
    /// What the customer pays: subtotal − discount + shipping.
    pub grand_total_cents: i64,
    /// Coins this order earns when delivered.
    pub coins_earned: i64,
}

/// Aggregate actual and volumetric weight of a cart, in grams.
pub fn cart_weights(cart: &Cart) -> (u64, u64) {
    let mut actual: u64 = 0;
    let mut volume_mm3: u64 = 0;
    for line in &cart.lines {
        let qty = line.qty as u64;
        actual = actual.saturating_add((line.weight_grams as u64).saturating_mul(qty));
        volume_mm3 = volume_mm3.saturating_add(line.dims_mm.volume_mm3().saturating_mul(qty));
    }
    (
        actual,
        volume_mm3 / crate::shipping::VOLUMETRIC_DIVISOR,
    )
}

/// Price a cart into order totals.
///
/// `coin_balance` is the customer's current balance; `cart.coins_applied`
/// must not exceed `max_redeemable(balance, subtotal)`.
pub fn price_order(
    cart: &Cart,
    coin_balance: i64,
    rates: &ShippingRates,
) -> Result<(OrderTotals, ShippingQuote), PricingError> {
    if cart.is_empty() {
        return Err(PricingError::EmptyCart);
    }

    let subtotal_cents = cart.subtotal_cents();

    let max = max_redeemable(coin_balance, subtotal_cents);
    if cart.coins_applied > max {
        return Err(PricingError::CoinOverLimit {
            applied: cart.coins_applied,
            max,
        });
    }
    let coin_discount_cents = cart.coins_applied;

    let (actual_grams, volumetric_grams) = cart_weights(cart);
    let quote = rates.quote(actual_grams, volumetric_grams, subtotal_cents);

    let net_merchandise = subtotal_cents.saturating_sub(coin_discount_cents);
    let grand_total_cents = net_merchandise.saturating_add(quote.cost_cents);

    Ok((
        OrderTotals {
            subtotal_cents,
            coin_discount_cents,
            shipping_cents: quote.cost_cents,
            grand_total_cents,
            coins_earned: coins_earned(net_merchandise),
        },
        quote,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::{CartLine, CartOwner};
    use petstore_catalog::{Dimensions, Sku};
    use petstore_core::VariantId;

    fn line(price: i64, qty: u32, weight: u32, dims: (u32, u32, u32)) -> CartLine {
        CartLine {
            variant_id: VariantId::new(),
            sku: Sku::new("TEST-SKU").unwrap(),
            display_name: "Test".to_string(),
            qty,
            unit_price_cents: price,
            weight_grams: weight,
            dims_mm: Dimensions {
                length_mm: dims.0,
                width_mm: dims.1,
                height_mm: dims.2,
            },
        }
    }

    fn cart_with(lines: Vec<CartLine>, coins: i64) -> Cart {
        let mut cart = Cart::new(CartOwner::Guest);
        for l in lines {
            cart.add_line(l).unwrap();
        }
        cart.apply_coins(coins);
        cart
    }

    #[test]
    fn empty_cart_cannot_be_priced() {
        let cart = Cart::new(CartOwner::Guest);
        assert_eq!(
            price_order(&cart, 0, &ShippingRates::default()).unwrap_err(),
            PricingError::EmptyCart
        );
    }

    #[test]
    fn plain_order_no_coins() {
        // 2 × 12.99, 800 g total, small box.
        let cart = cart_with(vec![line(1_299, 2, 400, (200, 150, 100))], 0);
        let (totals, quote) = price_order(&cart, 0, &ShippingRates::default()).unwrap();

        assert_eq!(totals.subtotal_cents, 2_598);
        assert_eq!(totals.coin_discount_cents, 0);
        // 800 g actual vs 2×(200*150*100)/5000 = 1200 g volumetric → 1200 g tier.
        assert_eq!(quote.chargeable_grams, 1_200);
        assert_eq!(totals.shipping_cents, 899);
        assert_eq!(totals.grand_total_cents, 2_598 + 899);
        assert_eq!(totals.coins_earned, 25);
    }

    #[test]
    fn coins_discount_and_reduce_earned() {
        let cart = cart_with(vec![line(10_000, 1, 400, (100, 100, 100))], 2_000);
        let (totals, _) = price_order(&cart, 5_000, &ShippingRates::default()).unwrap();

        assert_eq!(totals.subtotal_cents, 10_000);
        assert_eq!(totals.coin_discount_cents, 2_000);
        // Free shipping: pre-discount subtotal 10,000 ≥ 7,500.
        assert_eq!(totals.shipping_cents, 0);
        assert_eq!(totals.grand_total_cents, 8_000);
        // Earned on net merchandise 8,000 → 80 coins.
        assert_eq!(totals.coins_earned, 80);
    }

    #[test]
    fn coin_over_limit_rejected() {
        let cart = cart_with(vec![line(1_000, 1, 400, (100, 100, 100))], 600);
        // Cap is subtotal/2 = 500 even with a large balance.
        let err = price_order(&cart, 10_000, &ShippingRates::default()).unwrap_err();
        assert_eq!(
            err,
            PricingError::CoinOverLimit {
                applied: 600,
                max: 500
            }
        );
    }

    #[test]
    fn coin_over_balance_rejected() {
        let cart = cart_with(vec![line(10_000, 1, 400, (100, 100, 100))], 600);
        let err = price_order(&cart, 400, &ShippingRates::default()).unwrap_err();
        assert_eq!(
            err,
            PricingError::CoinOverLimit {
                applied: 600,
                max: 400
            }
        );
    }

    #[test]
    fn free_shipping_judged_on_pre_discount_subtotal() {
        // Subtotal exactly at threshold; discount takes the net below it.
        let cart = cart_with(vec![line(7_500, 1, 400, (100, 100, 100))], 3_000);
        let (totals, quote) = price_order(&cart, 3_000, &ShippingRates::default()).unwrap();
        assert!(quote.free_threshold_applied);
        assert_eq!(totals.shipping_cents, 0);
        assert_eq!(totals.grand_total_cents, 4_500);
    }

    #[test]
    fn cart_weights_aggregate_across_lines() {
        let cart = cart_with(
            vec![
                line(1_000, 2, 500, (100, 100, 100)),  // 1000 g, 2×1,000,000 mm³
                line(2_000, 1, 1_500, (200, 200, 50)), // 1500 g, 2,000,000 mm³
            ],
            0,
        );
        let (actual, volumetric) = cart_weights(&cart);
        assert_eq!(actual, 2_500);
        assert_eq!(volumetric, 4_000_000 / 5_000);
    }

    #[test]
    fn bulky_cart_charged_volumetric() {
        // A dog bed: 2 kg actual, 600×500×300 mm → 18,000 g volumetric.
        let cart = cart_with(vec![line(4_999, 1, 2_000, (600, 500, 300))], 0);
        let (totals, quote) = price_order(&cart, 0, &ShippingRates::default()).unwrap();
        assert_eq!(quote.volumetric_grams, 18_000);
        assert_eq!(quote.chargeable_grams, 18_000);
        // 8 started kgs over the 10 kg tier.
        assert_eq!(totals.shipping_cents, 2_499 + 8 * 199);
    }
}
