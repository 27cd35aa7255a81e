//! Coupon validator.
//!
//! Checks run in a fixed order so the customer always sees the same reason
//! for a given cart: already-applied, then expiry, then minimum amount. An
//! unknown code never reaches this module (the lookup misses first) but the
//! rejection lives here so all coupon messages share one type.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::pricing::DiscountRule;

/// Why a coupon was not applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CouponRejection {
    #[error("Invalid coupon code.")]
    UnknownCode,

    /// Only one coupon per cart; remove the current one first.
    #[error("Coupon already exists.")]
    AlreadyApplied,

    #[error("Coupon code expired.")]
    Expired,

    #[error("Amount should be greater than {minimum:.2}")]
    BelowMinimum { minimum: Decimal },
}

/// The parts of a coupon record the validator looks at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouponTerms {
    pub minimum_amount: Decimal,
    /// Manually expired by staff.
    pub is_expired: bool,
    /// Optional automatic expiry.
    pub expires_at: Option<DateTime<Utc>>,
    pub rule: DiscountRule,
}

impl CouponTerms {
    /// Whether the coupon is expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.is_expired || self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Decide whether `terms` may be attached to a cart.
///
/// # Errors
///
/// Returns the first failing [`CouponRejection`].
pub fn validate_coupon(
    terms: &CouponTerms,
    cart_has_coupon: bool,
    subtotal: Decimal,
    now: DateTime<Utc>,
) -> Result<(), CouponRejection> {
    if cart_has_coupon {
        return Err(CouponRejection::AlreadyApplied);
    }

    if terms.is_expired_at(now) {
        return Err(CouponRejection::Expired);
    }

    if subtotal < terms.minimum_amount {
        return Err(CouponRejection::BelowMinimum {
            minimum: terms.minimum_amount,
        });
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn terms(minimum: &str) -> CouponTerms {
        CouponTerms {
            minimum_amount: d(minimum),
            is_expired: false,
            expires_at: None,
            rule: DiscountRule::flat(d("10.00")),
        }
    }

    #[test]
    fn test_applies_when_subtotal_meets_minimum() {
        assert_eq!(
            validate_coupon(&terms("50.00"), false, d("105.00"), Utc::now()),
            Ok(())
        );
        // Equal to the minimum is enough
        assert_eq!(
            validate_coupon(&terms("105.00"), false, d("105.00"), Utc::now()),
            Ok(())
        );
    }

    #[test]
    fn test_rejects_below_minimum_with_amount_in_message() {
        let err = validate_coupon(&terms("200.00"), false, d("105.00"), Utc::now()).unwrap_err();
        assert_eq!(
            err,
            CouponRejection::BelowMinimum {
                minimum: d("200.00")
            }
        );
        assert_eq!(err.to_string(), "Amount should be greater than 200.00");
    }

    #[test]
    fn test_already_applied_checked_before_everything() {
        let mut expired = terms("500.00");
        expired.is_expired = true;
        assert_eq!(
            validate_coupon(&expired, true, d("1.00"), Utc::now()),
            Err(CouponRejection::AlreadyApplied)
        );
    }

    #[test]
    fn test_expired_flag() {
        let mut t = terms("0");
        t.is_expired = true;
        assert_eq!(
            validate_coupon(&t, false, d("100"), Utc::now()),
            Err(CouponRejection::Expired)
        );
    }

    #[test]
    fn test_expiry_instant() {
        let now = Utc::now();
        let mut t = terms("0");

        t.expires_at = Some(now - Duration::minutes(1));
        assert!(t.is_expired_at(now));

        t.expires_at = Some(now);
        assert!(t.is_expired_at(now));

        t.expires_at = Some(now + Duration::days(1));
        assert!(!t.is_expired_at(now));
    }

    #[test]
    fn test_expired_checked_before_minimum() {
        let mut t = terms("200.00");
        t.is_expired = true;
        assert_eq!(
            validate_coupon(&t, false, d("105.00"), Utc::now()),
            Err(CouponRejection::Expired)
        );
    }
}
