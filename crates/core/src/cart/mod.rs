//! Cart rules: pricing, coupon validation and checkout decisions.
//!
//! These functions are pure; the storefront services load rows from the
//! database, call into this module, and persist the outcome.

pub mod checkout;
pub mod coupon;
pub mod pricing;

pub use checkout::{ChargeQuote, CheckoutRejection, ProviderOrderAction, quote_checkout};
pub use coupon::{CouponRejection, CouponTerms, validate_coupon};
pub use pricing::{CartTotals, DiscountRule, PricedLine, unit_price};
