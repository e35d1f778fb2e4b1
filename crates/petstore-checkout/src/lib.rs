//! # petstore-checkout — Commerce Domain
//!
//! Everything between "add to cart" and "package delivered":
//!
//! - [`cart`] — carts and line management (guest and user-owned).
//! - [`shipping`] — weight/volumetric chargeable-weight calculation and the
//!   tiered rate table.
//! - [`loyalty`] — loyalty-coin accrual and redemption rules.
//! - [`pricing`] — order totals: subtotal, coin discount, shipping, grand total.
//! - [`order`] — the order record and its lifecycle state machine.
//! - [`checkout`] — turning a cart into a `Pending` order.
//!
//! All money is `i64` cents (see `petstore_core::money`); all arithmetic in
//! this crate is checked or saturating. The API layer owns storage and stock
//! reservation; this crate owns the arithmetic and the transition rules.

pub mod cart;
pub mod checkout;
pub mod loyalty;
pub mod order;
pub mod pricing;
pub mod shipping;

pub use cart::{Cart, CartError, CartLine, CartOwner, MAX_LINE_QTY};
pub use checkout::{checkout, CheckoutError, CheckoutOutcome, ShippingAddress};
pub use loyalty::{coins_earned, max_redeemable};
pub use order::{Order, OrderLine, OrderStatus, TransitionRecord};
pub use pricing::{price_order, OrderTotals, PricingError};
pub use shipping::{RateTier, ShippingQuote, ShippingRates, VOLUMETRIC_DIVISOR};
