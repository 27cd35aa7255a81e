//! Cart pricing calculator.
//!
//! - `unit_price` picks the variant override or the base product price
//! - `CartTotals::compute` sums line totals and applies an optional discount
//!
//! The post-discount total is clamped to `[0, subtotal]`.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::types::DiscountKind;

const ONE_HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Resolve the unit price of a line.
///
/// A size-variant price override wins over a color-variant override; with
/// neither present the base product price applies.
#[must_use]
pub fn unit_price(
    base: Decimal,
    size_override: Option<Decimal>,
    color_override: Option<Decimal>,
) -> Decimal {
    size_override.or(color_override).unwrap_or(base)
}

/// A cart line reduced to what pricing needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricedLine {
    pub unit_price: Decimal,
    pub quantity: u32,
}

impl PricedLine {
    #[must_use]
    pub const fn new(unit_price: Decimal, quantity: u32) -> Self {
        Self {
            unit_price,
            quantity,
        }
    }

    /// `unit_price * quantity`.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// A coupon's discount rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountRule {
    pub kind: DiscountKind,
    pub value: Decimal,
}

impl DiscountRule {
    #[must_use]
    pub const fn flat(value: Decimal) -> Self {
        Self {
            kind: DiscountKind::Flat,
            value,
        }
    }

    #[must_use]
    pub const fn percentage(value: Decimal) -> Self {
        Self {
            kind: DiscountKind::Percentage,
            value,
        }
    }

    /// Discount granted on `subtotal`, always within `[0, subtotal]`.
    ///
    /// Percentages are rounded half away from zero to two decimal places and
    /// clamped to 100%.
    #[must_use]
    pub fn discount_on(&self, subtotal: Decimal) -> Decimal {
        if subtotal <= Decimal::ZERO || self.value <= Decimal::ZERO {
            return Decimal::ZERO;
        }

        let raw = match self.kind {
            DiscountKind::Flat => self.value,
            DiscountKind::Percentage => {
                let pct = self.value.min(ONE_HUNDRED);
                (subtotal * pct / ONE_HUNDRED)
                    .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
            }
        };

        raw.min(subtotal)
    }
}

/// Totals for a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartTotals {
    /// Sum of line totals.
    pub subtotal: Decimal,
    /// Discount applied by the coupon (zero without one).
    pub discount: Decimal,
    /// `subtotal - discount`, never negative.
    pub total: Decimal,
}

impl CartTotals {
    /// Price a cart.
    #[must_use]
    pub fn compute<'a>(
        lines: impl IntoIterator<Item = &'a PricedLine>,
        rule: Option<&DiscountRule>,
    ) -> Self {
        let subtotal = cart_subtotal(lines);
        let discount = rule.map_or(Decimal::ZERO, |r| r.discount_on(subtotal));

        Self {
            subtotal,
            discount,
            total: (subtotal - discount).max(Decimal::ZERO),
        }
    }
}

/// Sum of `unit_price * quantity` over all lines.
#[must_use]
pub fn cart_subtotal<'a>(lines: impl IntoIterator<Item = &'a PricedLine>) -> Decimal {
    lines.into_iter().map(PricedLine::line_total).sum()
}

/// Subtotal minus the coupon discount, floored at zero.
#[must_use]
pub fn cart_total_after_coupon(subtotal: Decimal, rule: Option<&DiscountRule>) -> Decimal {
    let discount = rule.map_or(Decimal::ZERO, |r| r.discount_on(subtotal));
    (subtotal - discount).max(Decimal::ZERO)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_unit_price_precedence() {
        assert_eq!(unit_price(d("40"), None, None), d("40"));
        assert_eq!(unit_price(d("40"), None, Some(d("45"))), d("45"));
        assert_eq!(unit_price(d("40"), Some(d("50")), Some(d("45"))), d("50"));
    }

    #[test]
    fn test_subtotal_uses_quantity() {
        let lines = [
            PricedLine::new(d("40.00"), 2),
            PricedLine::new(d("65.00"), 1),
        ];
        assert_eq!(cart_subtotal(&lines), d("145.00"));
    }

    #[test]
    fn test_flat_discount_scenario() {
        let lines = [
            PricedLine::new(d("40.00"), 1),
            PricedLine::new(d("65.00"), 1),
        ];
        let totals = CartTotals::compute(&lines, Some(&DiscountRule::flat(d("10.00"))));
        assert_eq!(totals.subtotal, d("105.00"));
        assert_eq!(totals.discount, d("10.00"));
        assert_eq!(totals.total, d("95.00"));
    }

    #[test]
    fn test_flat_discount_larger_than_subtotal_floors_at_zero() {
        let lines = [PricedLine::new(d("5.00"), 1)];
        let totals = CartTotals::compute(&lines, Some(&DiscountRule::flat(d("10.00"))));
        assert_eq!(totals.discount, d("5.00"));
        assert_eq!(totals.total, Decimal::ZERO);
    }

    #[test]
    fn test_percentage_discount_rounds_half_away_from_zero() {
        // 12.5% of 99.99 = 12.49875 -> 12.50
        let rule = DiscountRule::percentage(d("12.5"));
        assert_eq!(rule.discount_on(d("99.99")), d("12.50"));
        assert_eq!(cart_total_after_coupon(d("99.99"), Some(&rule)), d("87.49"));
    }

    #[test]
    fn test_percentage_above_hundred_is_clamped() {
        let rule = DiscountRule::percentage(d("150"));
        assert_eq!(cart_total_after_coupon(d("80.00"), Some(&rule)), Decimal::ZERO);
    }

    #[test]
    fn test_negative_rule_value_grants_nothing() {
        let rule = DiscountRule::flat(d("-10"));
        assert_eq!(cart_total_after_coupon(d("20.00"), Some(&rule)), d("20.00"));
    }

    #[test]
    fn test_total_bounded_by_subtotal_for_many_rules() {
        let subtotals = ["0", "0.01", "1", "49.99", "105", "10000"];
        let rules = [
            DiscountRule::flat(d("0")),
            DiscountRule::flat(d("0.5")),
            DiscountRule::flat(d("500")),
            DiscountRule::percentage(d("1")),
            DiscountRule::percentage(d("33.33")),
            DiscountRule::percentage(d("100")),
        ];

        for subtotal in subtotals.iter().map(|s| d(s)) {
            assert_eq!(cart_total_after_coupon(subtotal, None), subtotal);
            for rule in &rules {
                let total = cart_total_after_coupon(subtotal, Some(rule));
                assert!(total >= Decimal::ZERO, "{rule:?} on {subtotal}");
                assert!(total <= subtotal, "{rule:?} on {subtotal}");
            }
        }
    }

    #[test]
    fn test_empty_cart_totals() {
        let lines: [PricedLine; 0] = [];
        let totals = CartTotals::compute(&lines, Some(&DiscountRule::flat(d("10"))));
        assert_eq!(totals.subtotal, Decimal::ZERO);
        assert_eq!(totals.total, Decimal::ZERO);
    }
}
