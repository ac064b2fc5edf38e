//! Fixed-precision currency value.
//!
//! All stored money is an integer count of minor units (cents) plus an ISO
//! currency code. Arithmetic is checked: overflow and cross-currency
//! operations are errors, never silent wraparound or coercion. `Decimal` is
//! used only at the edges - parsing provider prices and formatting.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;

use crate::constants::MINOR_UNIT_SCALE;

/// Errors from money arithmetic.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MoneyError {
    #[error("Currency mismatch: {left} vs {right}")]
    CurrencyMismatch { left: String, right: String },

    #[error("Money arithmetic overflowed")]
    Overflow,

    #[error("Amount '{0}' cannot be represented in minor units")]
    InvalidAmount(String),
}

/// A monetary amount: integer minor units tagged with a currency code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    minor: i64,
    currency: String,
}

impl Money {
    pub fn new(minor: i64, currency: impl Into<String>) -> Self {
        Self {
            minor,
            currency: currency.into(),
        }
    }

    pub fn zero(currency: impl Into<String>) -> Self {
        Self::new(0, currency)
    }

    /// Convert a decimal major-unit amount (e.g. a quoted price) into minor
    /// units, rounding to the minor-unit scale.
    pub fn from_decimal(value: Decimal, currency: impl Into<String>) -> Result<Self, MoneyError> {
        let scaled = value.round_dp(MINOR_UNIT_SCALE) * Decimal::from(10i64.pow(MINOR_UNIT_SCALE));
        let minor = scaled
            .to_i64()
            .ok_or_else(|| MoneyError::InvalidAmount(value.to_string()))?;
        Ok(Self::new(minor, currency))
    }

    pub fn minor(&self) -> i64 {
        self.minor
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn is_positive(&self) -> bool {
        self.minor > 0
    }

    /// The amount in major units, exact.
    pub fn to_decimal(&self) -> Decimal {
        Decimal::from_i128_with_scale(self.minor as i128, MINOR_UNIT_SCALE)
    }

    fn require_same_currency(&self, other: &Money) -> Result<(), MoneyError> {
        if self.currency != other.currency {
            return Err(MoneyError::CurrencyMismatch {
                left: self.currency.clone(),
                right: other.currency.clone(),
            });
        }
        Ok(())
    }

    pub fn checked_add(&self, other: &Money) -> Result<Money, MoneyError> {
        self.require_same_currency(other)?;
        let minor = self
            .minor
            .checked_add(other.minor)
            .ok_or(MoneyError::Overflow)?;
        Ok(Money::new(minor, self.currency.clone()))
    }

    pub fn checked_sub(&self, other: &Money) -> Result<Money, MoneyError> {
        self.require_same_currency(other)?;
        let minor = self
            .minor
            .checked_sub(other.minor)
            .ok_or(MoneyError::Overflow)?;
        Ok(Money::new(minor, self.currency.clone()))
    }

    /// Scalar multiply by an integer quantity (price x quantity).
    pub fn checked_mul(&self, quantity: i64) -> Result<Money, MoneyError> {
        let minor = self
            .minor
            .checked_mul(quantity)
            .ok_or(MoneyError::Overflow)?;
        Ok(Money::new(minor, self.currency.clone()))
    }

    /// Total order between amounts of the same currency; comparing across
    /// currencies is an error rather than an answer.
    pub fn checked_cmp(&self, other: &Money) -> Result<Ordering, MoneyError> {
        self.require_same_currency(other)?;
        Ok(self.minor.cmp(&other.minor))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.to_decimal(), self.currency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn arithmetic_stays_in_minor_units() {
        let a = Money::new(1_050, "USD");
        let b = Money::new(25, "USD");
        assert_eq!(a.checked_add(&b).unwrap().minor(), 1_075);
        assert_eq!(a.checked_sub(&b).unwrap().minor(), 1_025);
        assert_eq!(b.checked_mul(4).unwrap().minor(), 100);
    }

    #[test]
    fn cross_currency_operations_fail() {
        let usd = Money::new(100, "USD");
        let eur = Money::new(100, "EUR");
        assert!(matches!(
            usd.checked_add(&eur),
            Err(MoneyError::CurrencyMismatch { .. })
        ));
        assert!(matches!(
            usd.checked_cmp(&eur),
            Err(MoneyError::CurrencyMismatch { .. })
        ));
    }

    #[test]
    fn overflow_is_detected() {
        let max = Money::new(i64::MAX, "USD");
        assert_eq!(max.checked_add(&Money::new(1, "USD")), Err(MoneyError::Overflow));
        assert_eq!(max.checked_mul(2), Err(MoneyError::Overflow));
    }

    #[test]
    fn from_decimal_rounds_to_cents() {
        let m = Money::from_decimal(dec!(50.0000), "USD").unwrap();
        assert_eq!(m.minor(), 5_000);

        let m = Money::from_decimal(dec!(178.7249), "USD").unwrap();
        assert_eq!(m.minor(), 17_872);
    }

    #[test]
    fn ordering_within_a_currency() {
        let small = Money::new(5_000, "USD");
        let big = Money::new(100_000, "USD");
        assert_eq!(big.checked_cmp(&small).unwrap(), Ordering::Greater);
        assert_eq!(small.checked_cmp(&small).unwrap(), Ordering::Equal);
    }

    #[test]
    fn display_shows_major_units() {
        assert_eq!(Money::new(123_456, "USD").to_string(), "1234.56 USD");
        assert_eq!(Money::new(0, "USD").to_string(), "0.00 USD");
    }
}
