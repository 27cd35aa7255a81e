//! Type-safe money representation using decimal arithmetic.
//!
//! Amounts are kept as [`Decimal`] in the currency's standard unit (rupees,
//! dollars) everywhere inside the application. Conversion to the smallest
//! currency unit (paise, cents) happens only at the payment-provider boundary
//! via [`Money::to_minor_units`].

use core::fmt;
use core::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// Errors that can occur when converting money amounts.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MoneyError {
    /// Amount is negative where only non-negative amounts are allowed.
    #[error("amount cannot be negative: {0}")]
    Negative(Decimal),
    /// Amount does not fit in the minor-unit integer range.
    #[error("amount out of range: {0}")]
    Overflow(Decimal),
    /// Unknown ISO 4217 currency code.
    #[error("unsupported currency: {0}")]
    UnsupportedCurrency(String),
}

/// An amount of money in a specific currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// Amount in the currency's standard unit (e.g., rupees, not paise).
    amount: Decimal,
    /// ISO 4217 currency code.
    currency: CurrencyCode,
}

impl Money {
    /// Create a new amount.
    #[must_use]
    pub const fn new(amount: Decimal, currency: CurrencyCode) -> Self {
        Self { amount, currency }
    }

    /// Zero in the given currency.
    #[must_use]
    pub const fn zero(currency: CurrencyCode) -> Self {
        Self::new(Decimal::ZERO, currency)
    }

    /// Build an amount from the smallest currency unit (e.g., paise).
    #[must_use]
    pub fn from_minor_units(units: i64, currency: CurrencyCode) -> Self {
        Self::new(
            Decimal::new(units, currency.minor_unit_exponent()),
            currency,
        )
    }

    /// The amount in the standard unit.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.amount
    }

    /// The currency.
    #[must_use]
    pub const fn currency(&self) -> CurrencyCode {
        self.currency
    }

    /// Convert to the smallest currency unit, truncating any fraction of a
    /// minor unit.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::Negative`] for negative amounts and
    /// [`MoneyError::Overflow`] if the result does not fit in an `i64`.
    pub fn to_minor_units(&self) -> Result<i64, MoneyError> {
        if self.amount.is_sign_negative() && !self.amount.is_zero() {
            return Err(MoneyError::Negative(self.amount));
        }

        let factor = Decimal::from(10_i64.pow(self.currency.minor_unit_exponent()));
        self.amount
            .checked_mul(factor)
            .and_then(|scaled| scaled.trunc().to_i64())
            .ok_or(MoneyError::Overflow(self.amount))
    }

    /// Format for display with the currency symbol (e.g., "₹95.00").
    #[must_use]
    pub fn display(&self) -> String {
        format!("{}{:.2}", self.currency.symbol(), self.amount)
    }
}

impl fmt::Display for Money {
    /// ASCII-only form (e.g., "INR 95.00"), safe for documents without
    /// Unicode font support.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:.2}", self.currency.code(), self.amount)
    }
}

/// ISO 4217 currency codes accepted by the payment provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    INR,
    USD,
    EUR,
    GBP,
}

impl CurrencyCode {
    /// The ISO 4217 code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::INR => "INR",
            Self::USD => "USD",
            Self::EUR => "EUR",
            Self::GBP => "GBP",
        }
    }

    /// The display symbol.
    #[must_use]
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::INR => "₹",
            Self::USD => "$",
            Self::EUR => "€",
            Self::GBP => "£",
        }
    }

    /// Number of decimal places in the smallest unit (2 for all supported
    /// currencies).
    #[must_use]
    pub const fn minor_unit_exponent(&self) -> u32 {
        2
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for CurrencyCode {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "INR" => Ok(Self::INR),
            "USD" => Ok(Self::USD),
            "EUR" => Ok(Self::EUR),
            "GBP" => Ok(Self::GBP),
            other => Err(MoneyError::UnsupportedCurrency(other.to_owned())),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn inr(s: &str) -> Money {
        Money::new(s.parse().unwrap(), CurrencyCode::INR)
    }

    #[test]
    fn test_to_minor_units() {
        assert_eq!(inr("95.00").to_minor_units().unwrap(), 9500);
        assert_eq!(inr("0.99").to_minor_units().unwrap(), 99);
        assert_eq!(inr("0").to_minor_units().unwrap(), 0);
    }

    #[test]
    fn test_to_minor_units_truncates_fraction_of_paisa() {
        assert_eq!(inr("10.129").to_minor_units().unwrap(), 1012);
    }

    #[test]
    fn test_to_minor_units_rejects_negative() {
        assert!(matches!(
            inr("-1.00").to_minor_units(),
            Err(MoneyError::Negative(_))
        ));
    }

    #[test]
    fn test_from_minor_units() {
        let m = Money::from_minor_units(10_500, CurrencyCode::INR);
        assert_eq!(m.amount(), "105.00".parse::<Decimal>().unwrap());
    }

    #[test]
    fn test_display_forms() {
        let m = inr("95");
        assert_eq!(m.display(), "₹95.00");
        assert_eq!(m.to_string(), "INR 95.00");
    }

    #[test]
    fn test_currency_from_str() {
        assert_eq!("inr".parse::<CurrencyCode>().unwrap(), CurrencyCode::INR);
        assert_eq!(" USD ".parse::<CurrencyCode>().unwrap(), CurrencyCode::USD);
        assert!("XYZ".parse::<CurrencyCode>().is_err());
    }
}
