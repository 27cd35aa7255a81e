//! Cart aggregate as loaded from the database and priced.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use bazaar_core::cart::{CartTotals, CouponTerms, PricedLine};
use bazaar_core::{CartId, CartItemId, CartState, CouponId, ProductId, UserId};

/// A cart row.
#[derive(Debug, Clone)]
pub struct Cart {
    pub id: CartId,
    pub user_id: UserId,
    pub coupon_id: Option<CouponId>,
    pub is_paid: bool,
    /// Provider order the customer is currently asked to pay.
    pub razorpay_order_id: Option<String>,
    /// Amount (minor units) `razorpay_order_id` was created for.
    pub checkout_amount_paise: Option<i64>,
    pub razorpay_payment_id: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Cart {
    /// Checkout state derived from the persisted columns.
    #[must_use]
    pub const fn state(&self) -> CartState {
        CartState::from_columns(self.is_paid, self.razorpay_order_id.is_some())
    }
}

/// A cart item joined with its product and variants.
#[derive(Debug, Clone)]
pub struct CartLine {
    pub item_id: CartItemId,
    pub product_id: ProductId,
    pub product_name: String,
    pub size_name: Option<String>,
    pub color_name: Option<String>,
    pub quantity: u32,
    /// Resolved unit price (variant override or base price).
    pub unit_price: Decimal,
}

impl CartLine {
    /// The line reduced to what pricing needs.
    #[must_use]
    pub const fn priced(&self) -> PricedLine {
        PricedLine::new(self.unit_price, self.quantity)
    }

    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.priced().line_total()
    }

    /// "M / Red", "M", "Red" or empty.
    #[must_use]
    pub fn variant_label(&self) -> String {
        match (&self.size_name, &self.color_name) {
            (Some(size), Some(color)) => format!("{size} / {color}"),
            (Some(size), None) => size.clone(),
            (None, Some(color)) => color.clone(),
            (None, None) => String::new(),
        }
    }
}

/// A coupon record.
#[derive(Debug, Clone)]
pub struct Coupon {
    pub id: CouponId,
    pub code: String,
    pub terms: CouponTerms,
}

/// An open or paid cart with its lines, coupon and totals.
#[derive(Debug, Clone)]
pub struct PricedCart {
    pub cart: Cart,
    pub lines: Vec<CartLine>,
    pub coupon: Option<Coupon>,
    pub totals: CartTotals,
}

impl PricedCart {
    /// Price `lines` with the optional coupon.
    #[must_use]
    pub fn new(cart: Cart, lines: Vec<CartLine>, coupon: Option<Coupon>) -> Self {
        let priced: Vec<PricedLine> = lines.iter().map(CartLine::priced).collect();
        let totals = CartTotals::compute(&priced, coupon.as_ref().map(|c| &c.terms.rule));

        Self {
            cart,
            lines,
            coupon,
            totals,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bazaar_core::cart::DiscountRule;

    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn cart() -> Cart {
        Cart {
            id: CartId::new(1),
            user_id: UserId::new(1),
            coupon_id: None,
            is_paid: false,
            razorpay_order_id: None,
            checkout_amount_paise: None,
            razorpay_payment_id: None,
            paid_at: None,
            created_at: Utc::now(),
        }
    }

    fn line(id: i32, price: &str, quantity: u32) -> CartLine {
        CartLine {
            item_id: CartItemId::new(id),
            product_id: ProductId::new(id),
            product_name: format!("Product {id}"),
            size_name: None,
            color_name: None,
            quantity,
            unit_price: d(price),
        }
    }

    #[test]
    fn test_priced_cart_with_flat_coupon() {
        let coupon = Coupon {
            id: CouponId::new(1),
            code: "TEN".to_string(),
            terms: CouponTerms {
                minimum_amount: d("50.00"),
                is_expired: false,
                expires_at: None,
                rule: DiscountRule::flat(d("10.00")),
            },
        };
        let priced = PricedCart::new(
            cart(),
            vec![line(1, "40.00", 1), line(2, "65.00", 1)],
            Some(coupon),
        );

        assert_eq!(priced.totals.subtotal, d("105.00"));
        assert_eq!(priced.totals.total, d("95.00"));
    }

    #[test]
    fn test_state_follows_columns() {
        let mut c = cart();
        assert_eq!(c.state(), CartState::Open);
        c.razorpay_order_id = Some("order_1".to_string());
        assert_eq!(c.state(), CartState::AwaitingPayment);
        c.is_paid = true;
        assert_eq!(c.state(), CartState::Paid);
    }

    #[test]
    fn test_variant_label() {
        let mut l = line(1, "1", 1);
        assert_eq!(l.variant_label(), "");
        l.size_name = Some("M".to_string());
        assert_eq!(l.variant_label(), "M");
        l.color_name = Some("Red".to_string());
        assert_eq!(l.variant_label(), "M / Red");
    }
}
