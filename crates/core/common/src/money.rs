//! Currency-denominated amount

use std::{fmt, str::FromStr};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    currency::Currency,
    error::MoneyError,
    fixed::{decimal_to_raw_i64, parse_decimal, raw_i64_to_decimal},
};

/// Raw storage for a money amount, scaled by `10^9`
pub type MoneyRaw = i64;

/// An amount in a specific [`Currency`] at the currency's precision
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    /// Amount scaled by `10^9`
    pub raw: MoneyRaw,
    /// Denomination
    pub currency: Currency,
}

impl Money {
    /// Builds an amount from an `f64`, rounding to the currency precision
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::Invalid`] for non-finite or out of range input.
    pub fn new(amount: f64, currency: Currency) -> Result<Self, MoneyError> {
        if !amount.is_finite() {
            return Err(MoneyError::Invalid {
                value: amount.to_string(),
                reason: "value is not finite".to_string(),
            });
        }
        let decimal = Decimal::try_from(amount).map_err(|e| MoneyError::Invalid {
            value: amount.to_string(),
            reason: e.to_string(),
        })?;
        Self::from_decimal(decimal, currency)
    }

    /// Builds an amount from a decimal, rounding to the currency precision
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::Invalid`] when the value does not fit.
    pub fn from_decimal(amount: Decimal, currency: Currency) -> Result<Self, MoneyError> {
        let raw = decimal_to_raw_i64(amount, currency.precision).map_err(|reason| {
            MoneyError::Invalid {
                value: amount.to_string(),
                reason,
            }
        })?;
        Ok(Self { raw, currency })
    }

    /// Zero in the given currency
    #[must_use]
    pub const fn zero(currency: Currency) -> Self {
        Self { raw: 0, currency }
    }

    /// Exact decimal amount
    #[must_use]
    pub fn as_decimal(&self) -> Decimal {
        raw_i64_to_decimal(self.raw, self.currency.precision)
    }

    /// Lossy conversion to `f64`
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> f64 {
        self.raw as f64 / crate::fixed::FIXED_SCALAR
    }

    /// Adds two amounts of the same currency
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::CurrencyMismatch`] for different currencies.
    pub fn checked_add(self, rhs: Self) -> Result<Self, MoneyError> {
        self.check_currency(&rhs)?;
        let raw = self.raw.checked_add(rhs.raw).ok_or_else(|| MoneyError::Invalid {
            value: format!("{self} + {rhs}"),
            reason: "overflow".to_string(),
        })?;
        Ok(Self {
            raw,
            currency: self.currency,
        })
    }

    /// Subtracts two amounts of the same currency
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::CurrencyMismatch`] for different currencies.
    pub fn checked_sub(self, rhs: Self) -> Result<Self, MoneyError> {
        self.check_currency(&rhs)?;
        let raw = self.raw.checked_sub(rhs.raw).ok_or_else(|| MoneyError::Invalid {
            value: format!("{self} - {rhs}"),
            reason: "overflow".to_string(),
        })?;
        Ok(Self {
            raw,
            currency: self.currency,
        })
    }

    fn check_currency(&self, other: &Self) -> Result<(), MoneyError> {
        if self.currency != other.currency {
            return Err(MoneyError::CurrencyMismatch {
                left: self.currency.code.to_string(),
                right: other.currency.code.to_string(),
            });
        }
        Ok(())
    }
}

impl FromStr for Money {
    type Err = MoneyError;

    /// Parses `"<amount> <code>"`, e.g. `"12.50 USD"`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let (Some(amount), Some(code), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(MoneyError::Invalid {
                value: s.to_string(),
                reason: "expected '<amount> <currency>'".to_string(),
            });
        };
        let currency = Currency::from_code(code)?;
        let decimal = parse_decimal(amount).map_err(|reason| MoneyError::Invalid {
            value: s.to_string(),
            reason,
        })?;
        Self::from_decimal(decimal, currency)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.as_decimal(), self.currency.code)
    }
}

impl fmt::Debug for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Money({self})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let money: Money = "12.5 USD".parse().unwrap();
        assert_eq!(money.to_string(), "12.50 USD");
    }

    #[test]
    fn test_add_same_currency() {
        let a = Money::new(1.25, Currency::USD()).unwrap();
        let b = Money::new(2.0, Currency::USD()).unwrap();
        assert_eq!(a.checked_add(b).unwrap().to_string(), "3.25 USD");
        assert_eq!(b.checked_sub(a).unwrap().to_string(), "0.75 USD");
    }

    #[test]
    fn test_currency_mismatch_fails() {
        let a = Money::new(1.0, Currency::USD()).unwrap();
        let b = Money::new(1.0, Currency::AUD()).unwrap();
        assert!(matches!(
            a.checked_add(b),
            Err(MoneyError::CurrencyMismatch { .. })
        ));
    }
}
