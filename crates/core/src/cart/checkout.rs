//! Checkout decisions.
//!
//! `quote_checkout` gates the Open/AwaitingPayment → AwaitingPayment
//! transition on the minimum chargeable amount, and
//! `ProviderOrderAction::decide` tells the caller whether an existing provider
//! order can be reused when checkout is re-entered.

use thiserror::Error;

use crate::types::{CartState, Money, MoneyError};

/// Smallest amount the payment provider accepts, in minor units (1.00).
pub const DEFAULT_MINIMUM_CHARGE_MINOR: i64 = 100;

/// Why checkout cannot proceed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckoutRejection {
    /// No open cart, or an open cart without items.
    #[error("cart is empty")]
    EmptyCart,

    /// The cart has already been paid.
    #[error("cart is already paid")]
    AlreadyPaid,

    /// Total after coupon is below the provider's minimum charge.
    #[error("Total amount in cart is less than the minimum required amount ({minimum})")]
    BelowMinimum { minimum: Money },

    /// Total could not be expressed in minor units.
    #[error("invalid cart total: {0}")]
    Amount(#[from] MoneyError),
}

/// An accepted checkout amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChargeQuote {
    /// Total after coupon.
    pub total: Money,
    /// `total` in the smallest currency unit, as sent to the provider.
    pub minor_units: i64,
}

/// Decide whether a cart in `state` with `item_count` lines and `total`
/// may enter checkout.
///
/// # Errors
///
/// Returns a [`CheckoutRejection`] for empty or paid carts and for totals
/// below `minimum`.
pub fn quote_checkout(
    state: CartState,
    item_count: usize,
    total: Money,
    minimum: Money,
) -> Result<ChargeQuote, CheckoutRejection> {
    match state {
        CartState::Empty => return Err(CheckoutRejection::EmptyCart),
        CartState::Paid => return Err(CheckoutRejection::AlreadyPaid),
        CartState::Open | CartState::AwaitingPayment => {}
    }

    if item_count == 0 {
        return Err(CheckoutRejection::EmptyCart);
    }

    let minor_units = total.to_minor_units()?;
    if minor_units < minimum.to_minor_units()? {
        return Err(CheckoutRejection::BelowMinimum { minimum });
    }

    Ok(ChargeQuote { total, minor_units })
}

/// What to do about the provider order when entering checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderOrderAction<'a> {
    /// The cart already has an order for exactly this amount.
    Reuse(&'a str),
    /// No order yet, or the amount changed since it was created.
    Create,
}

impl<'a> ProviderOrderAction<'a> {
    /// Compare the cart's recorded provider order with a fresh quote.
    #[must_use]
    pub fn decide(
        existing_order_id: Option<&'a str>,
        existing_amount_minor: Option<i64>,
        quote: &ChargeQuote,
    ) -> Self {
        match (existing_order_id, existing_amount_minor) {
            (Some(order_id), Some(amount)) if amount == quote.minor_units => Self::Reuse(order_id),
            _ => Self::Create,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::types::CurrencyCode;

    fn inr(s: &str) -> Money {
        Money::new(s.parse::<Decimal>().unwrap(), CurrencyCode::INR)
    }

    fn minimum() -> Money {
        Money::from_minor_units(DEFAULT_MINIMUM_CHARGE_MINOR, CurrencyCode::INR)
    }

    #[test]
    fn test_quote_converts_to_paise() {
        let quote = quote_checkout(CartState::Open, 2, inr("95.00"), minimum()).unwrap();
        assert_eq!(quote.minor_units, 9500);
    }

    #[test]
    fn test_exactly_one_rupee_is_accepted() {
        assert!(quote_checkout(CartState::Open, 1, inr("1.00"), minimum()).is_ok());
    }

    #[test]
    fn test_below_minimum_is_rejected() {
        for total in ["0", "0.5", "0.99", "0.999"] {
            let err = quote_checkout(CartState::Open, 1, inr(total), minimum()).unwrap_err();
            assert!(
                matches!(err, CheckoutRejection::BelowMinimum { .. }),
                "{total}"
            );
        }
    }

    #[test]
    fn test_empty_and_paid_carts_are_rejected() {
        assert_eq!(
            quote_checkout(CartState::Empty, 0, inr("10"), minimum()),
            Err(CheckoutRejection::EmptyCart)
        );
        assert_eq!(
            quote_checkout(CartState::Open, 0, inr("10"), minimum()),
            Err(CheckoutRejection::EmptyCart)
        );
        assert_eq!(
            quote_checkout(CartState::Paid, 3, inr("10"), minimum()),
            Err(CheckoutRejection::AlreadyPaid)
        );
    }

    #[test]
    fn test_reentry_reuses_order_for_same_amount() {
        let quote = quote_checkout(CartState::AwaitingPayment, 1, inr("95"), minimum()).unwrap();
        assert_eq!(
            ProviderOrderAction::decide(Some("order_A"), Some(9500), &quote),
            ProviderOrderAction::Reuse("order_A")
        );
    }

    #[test]
    fn test_reentry_creates_new_order_when_amount_changed() {
        let quote = quote_checkout(CartState::AwaitingPayment, 1, inr("95"), minimum()).unwrap();
        assert_eq!(
            ProviderOrderAction::decide(Some("order_A"), Some(10_500), &quote),
            ProviderOrderAction::Create
        );
        assert_eq!(
            ProviderOrderAction::decide(Some("order_A"), None, &quote),
            ProviderOrderAction::Create
        );
        assert_eq!(
            ProviderOrderAction::decide(None, None, &quote),
            ProviderOrderAction::Create
        );
    }

    #[test]
    fn test_below_minimum_message() {
        let err = quote_checkout(CartState::Open, 1, inr("0.10"), minimum()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Total amount in cart is less than the minimum required amount (INR 1.00)"
        );
    }
}
