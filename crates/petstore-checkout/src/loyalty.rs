//! # Loyalty Coins
//!
//! Customers earn coins on delivered orders and spend them at checkout.
//!
//! - **Accrual**: 1 coin per whole currency unit of merchandise actually
//!   paid (net of coin discount, excluding shipping). Credited when the
//!   order reaches `Delivered` — not at placement, so cancelled and refunded
//!   orders never earn.
//! - **Redemption**: 1 coin = 1 cent of discount, capped at half of the
//!   merchandise subtotal and at the customer's balance.
//!
//! Balances live on the user record; this module owns only the arithmetic.

/// Redemption cap as a fraction of the merchandise subtotal: coins may cover
/// at most half the merchandise value.
pub const REDEMPTION_CAP_DIVISOR: i64 = 2;

/// Cents of merchandise per coin earned.
pub const CENTS_PER_COIN_EARNED: i64 = 100;

/// Coins earned for an order with the given net merchandise total
/// (subtotal minus coin discount), in cents.
pub fn coins_earned(net_merchandise_cents: i64) -> i64 {
    if net_merchandise_cents <= 0 {
        return 0;
    }
    net_merchandise_cents / CENTS_PER_COIN_EARNED
}

/// Maximum coins redeemable against a cart: limited by both the customer's
/// balance and half the merchandise subtotal.
pub fn max_redeemable(balance: i64, merchandise_subtotal_cents: i64) -> i64 {
    if balance <= 0 || merchandise_subtotal_cents <= 0 {
        return 0;
    }
    balance.min(merchandise_subtotal_cents / REDEMPTION_CAP_DIVISOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_coin_per_whole_unit() {
        assert_eq!(coins_earned(100), 1);
        assert_eq!(coins_earned(199), 1);
        assert_eq!(coins_earned(2_499), 24);
        assert_eq!(coins_earned(99), 0);
    }

    #[test]
    fn no_coins_on_zero_or_negative() {
        assert_eq!(coins_earned(0), 0);
        assert_eq!(coins_earned(-500), 0);
    }

    #[test]
    fn redemption_capped_by_half_subtotal() {
        // Rich balance, small cart: cap is subtotal/2.
        assert_eq!(max_redeemable(1_000_000, 2_000), 1_000);
        // Odd subtotal floors.
        assert_eq!(max_redeemable(1_000_000, 2_001), 1_000);
    }

    #[test]
    fn redemption_capped_by_balance() {
        assert_eq!(max_redeemable(300, 2_000), 300);
    }

    #[test]
    fn redemption_zero_for_empty_balance_or_cart() {
        assert_eq!(max_redeemable(0, 2_000), 0);
        assert_eq!(max_redeemable(-5, 2_000), 0);
        assert_eq!(max_redeemable(500, 0), 0);
    }
}
