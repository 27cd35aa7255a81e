//! Pricing, coupon and checkout rules through the public API.
//!
//! No services needed.

#![allow(clippy::unwrap_used)]

use chrono::{Duration, Utc};

use bazaar_core::cart::{
    CartTotals, CheckoutRejection, CouponRejection, CouponTerms, DiscountRule, PricedLine,
    ProviderOrderAction, quote_checkout, unit_price, validate_coupon,
};
use bazaar_core::cart::checkout::DEFAULT_MINIMUM_CHARGE_MINOR;
use bazaar_core::{CartState, CurrencyCode, Money};
use bazaar_integration_tests::dec;

fn coupon(minimum: &str, rule: DiscountRule) -> CouponTerms {
    CouponTerms {
        minimum_amount: dec(minimum),
        is_expired: false,
        expires_at: None,
        rule,
    }
}

fn two_item_cart() -> Vec<PricedLine> {
    vec![
        PricedLine::new(dec("40.00"), 1),
        PricedLine::new(dec("65.00"), 1),
    ]
}

fn minimum() -> Money {
    Money::from_minor_units(DEFAULT_MINIMUM_CHARGE_MINOR, CurrencyCode::INR)
}

#[test]
fn test_coupon_at_or_above_minimum_applies() {
    let lines = two_item_cart();
    let terms = coupon("50.00", DiscountRule::flat(dec("10.00")));

    let before = CartTotals::compute(&lines, None);
    assert_eq!(before.subtotal, dec("105.00"));
    assert!(validate_coupon(&terms, false, before.subtotal, Utc::now()).is_ok());

    let after = CartTotals::compute(&lines, Some(&terms.rule));
    assert_eq!(after.discount, dec("10.00"));
    assert_eq!(after.total, dec("95.00"));
}

#[test]
fn test_coupon_below_minimum_is_rejected() {
    let lines = two_item_cart();
    let terms = coupon("200.00", DiscountRule::flat(dec("10.00")));
    let totals = CartTotals::compute(&lines, None);

    let err = validate_coupon(&terms, false, totals.subtotal, Utc::now()).unwrap_err();
    assert_eq!(err.to_string(), "Amount should be greater than 200.00");
    assert_eq!(totals.total, dec("105.00"));
}

#[test]
fn test_second_coupon_is_rejected_before_other_checks() {
    let mut terms = coupon("500.00", DiscountRule::flat(dec("10.00")));
    terms.expires_at = Some(Utc::now() - Duration::days(1));

    assert_eq!(
        validate_coupon(&terms, true, dec("1.00"), Utc::now()),
        Err(CouponRejection::AlreadyApplied)
    );
    assert_eq!(
        validate_coupon(&terms, false, dec("1.00"), Utc::now()),
        Err(CouponRejection::Expired)
    );
}

#[test]
fn test_total_stays_within_zero_and_subtotal() {
    let lines = two_item_cart();
    for rule in [
        DiscountRule::flat(dec("1000.00")),
        DiscountRule::percentage(dec("150")),
        DiscountRule::flat(dec("-5.00")),
        DiscountRule::percentage(dec("12.5")),
    ] {
        let totals = CartTotals::compute(&lines, Some(&rule));
        assert!(totals.total >= dec("0"), "{rule:?}");
        assert!(totals.total <= totals.subtotal, "{rule:?}");
    }
}

#[test]
fn test_size_override_wins_over_color() {
    assert_eq!(
        unit_price(dec("40.00"), Some(dec("45.00")), Some(dec("42.00"))),
        dec("45.00")
    );
    assert_eq!(unit_price(dec("40.00"), None, Some(dec("42.00"))), dec("42.00"));
    assert_eq!(unit_price(dec("40.00"), None, None), dec("40.00"));
}

#[test]
fn test_fully_discounted_cart_cannot_reach_payment() {
    let lines = two_item_cart();
    let totals = CartTotals::compute(&lines, Some(&DiscountRule::percentage(dec("100"))));
    let total = Money::new(totals.total, CurrencyCode::INR);

    let err = quote_checkout(CartState::Open, lines.len(), total, minimum()).unwrap_err();
    assert!(matches!(err, CheckoutRejection::BelowMinimum { .. }));
}

#[test]
fn test_checkout_reuses_order_only_for_same_amount() {
    let quote = quote_checkout(
        CartState::AwaitingPayment,
        2,
        Money::new(dec("95.00"), CurrencyCode::INR),
        minimum(),
    )
    .unwrap();
    assert_eq!(quote.minor_units, 9500);

    assert_eq!(
        ProviderOrderAction::decide(Some("order_1"), Some(9500), &quote),
        ProviderOrderAction::Reuse("order_1")
    );
    assert_eq!(
        ProviderOrderAction::decide(Some("order_1"), Some(10500), &quote),
        ProviderOrderAction::Create
    );
    assert_eq!(
        ProviderOrderAction::decide(None, None, &quote),
        ProviderOrderAction::Create
    );
}

#[test]
fn test_paid_and_empty_carts_cannot_check_out() {
    let total = Money::new(dec("95.00"), CurrencyCode::INR);
    assert_eq!(
        quote_checkout(CartState::Paid, 2, total, minimum()),
        Err(CheckoutRejection::AlreadyPaid)
    );
    assert_eq!(
        quote_checkout(CartState::Open, 0, total, minimum()),
        Err(CheckoutRejection::EmptyCart)
    );
}
