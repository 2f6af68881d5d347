//! Fixed-point price

use std::{
    cmp::Ordering,
    fmt,
    hash::{Hash, Hasher},
    ops::{Add, Neg, Sub},
    str::FromStr,
};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    error::PriceError,
    fixed::{
        FIXED_PRECISION, FIXED_SCALAR, check_precision, decimal_to_raw_i64, parse_decimal,
        precision_step, raw_i64_to_decimal,
    },
};

/// Raw storage for a price, scaled by `10^9`
pub type PriceRaw = i64;

/// Sentinel for an undefined price
pub const PRICE_UNDEF: PriceRaw = PriceRaw::MAX;

/// Sentinel for a price produced by a failed computation
pub const PRICE_ERROR: PriceRaw = PriceRaw::MIN;

/// Largest representable price
pub const PRICE_MAX: f64 = 9_223_372_036.0;

/// Smallest representable price
pub const PRICE_MIN: f64 = -9_223_372_036.0;

const PRICE_RAW_MAX: PriceRaw = 9_223_372_036_000_000_000;
const PRICE_RAW_MIN: PriceRaw = -9_223_372_036_000_000_000;

/// A price with an explicit number of decimal places.
///
/// Equality, ordering and hashing compare the raw value only, so `1.0` at precision 1
/// equals `1.00` at precision 2.
#[derive(Clone, Copy, Default, Serialize, Deserialize)]
pub struct Price {
    /// Value scaled by `10^9`
    pub raw: PriceRaw,
    /// Number of decimal places
    pub precision: u8,
}

impl Price {
    /// Builds a price from an `f64`, rounding to `precision` places
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::Invalid`] for non-finite input, out of range values or a
    /// precision above 9.
    pub fn new(value: f64, precision: u8) -> Result<Self, PriceError> {
        if !value.is_finite() {
            return Err(PriceError::invalid(value, "value is not finite"));
        }
        if !(PRICE_MIN..=PRICE_MAX).contains(&value) {
            return Err(PriceError::invalid(
                value,
                format!("outside range [{PRICE_MIN}, {PRICE_MAX}]"),
            ));
        }
        let decimal = Decimal::try_from(value).map_err(|e| PriceError::invalid(value, e.to_string()))?;
        Self::from_decimal_dp(decimal, precision)
    }

    /// Canonical constructor from fixed-point storage
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::Invalid`] if `precision` exceeds 9, `raw` is outside the
    /// representable range or carries digits beyond `precision`.
    pub fn from_raw(raw: PriceRaw, precision: u8) -> Result<Self, PriceError> {
        check_precision(precision).map_err(|reason| PriceError::invalid(raw, reason))?;
        if raw == PRICE_UNDEF || raw == PRICE_ERROR {
            return Ok(Self { raw, precision });
        }
        if !(PRICE_RAW_MIN..=PRICE_RAW_MAX).contains(&raw) {
            return Err(PriceError::invalid(raw, "raw value out of range"));
        }
        let step = precision_step(precision) as i64;
        if raw % step != 0 {
            return Err(PriceError::invalid(
                raw,
                format!("raw value has digits beyond precision {precision}"),
            ));
        }
        Ok(Self { raw, precision })
    }

    /// Builds a price from a decimal, using its scale as the precision
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::Invalid`] if the scale exceeds 9 or the value is out of range.
    pub fn from_decimal(value: Decimal) -> Result<Self, PriceError> {
        let precision = u8::try_from(value.scale())
            .map_err(|_| PriceError::invalid(value, "scale too large"))?;
        Self::from_decimal_dp(value, precision)
    }

    /// Builds a price from a decimal rounded (half-even) to `precision` places
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::Invalid`] if `precision` exceeds 9 or the value is out of range.
    pub fn from_decimal_dp(value: Decimal, precision: u8) -> Result<Self, PriceError> {
        let raw =
            decimal_to_raw_i64(value, precision).map_err(|reason| PriceError::invalid(value, reason))?;
        if !(PRICE_RAW_MIN..=PRICE_RAW_MAX).contains(&raw) {
            return Err(PriceError::invalid(value, "value out of range"));
        }
        Ok(Self { raw, precision })
    }

    /// Zero at the given precision
    #[must_use]
    pub const fn zero(precision: u8) -> Self {
        Self { raw: 0, precision }
    }

    /// Largest price at the given precision
    #[must_use]
    pub const fn max(precision: u8) -> Self {
        Self {
            raw: PRICE_RAW_MAX,
            precision,
        }
    }

    /// Smallest price at the given precision
    #[must_use]
    pub const fn min(precision: u8) -> Self {
        Self {
            raw: PRICE_RAW_MIN,
            precision,
        }
    }

    /// Returns true for the undefined sentinel
    #[must_use]
    pub const fn is_undefined(&self) -> bool {
        self.raw == PRICE_UNDEF
    }

    /// Returns true when the value is exactly zero
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.raw == 0
    }

    /// Returns true when the value is strictly positive
    #[must_use]
    pub const fn is_positive(&self) -> bool {
        self.raw > 0 && self.raw != PRICE_UNDEF
    }

    /// Lossy conversion to `f64`
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> f64 {
        self.raw as f64 / FIXED_SCALAR
    }

    /// Exact decimal value with scale equal to the precision
    #[must_use]
    pub fn as_decimal(&self) -> Decimal {
        raw_i64_to_decimal(self.raw, self.precision)
    }

    /// Addition returning `None` outside the representable range
    #[must_use]
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        let raw = self.raw.checked_add(rhs.raw).filter(in_range)?;
        Some(Self {
            raw,
            precision: self.precision.max(rhs.precision),
        })
    }

    /// Subtraction returning `None` outside the representable range
    #[must_use]
    pub fn checked_sub(self, rhs: Self) -> Option<Self> {
        let raw = self.raw.checked_sub(rhs.raw).filter(in_range)?;
        Some(Self {
            raw,
            precision: self.precision.max(rhs.precision),
        })
    }

    /// Number of raw units per one step of `precision`
    #[must_use]
    pub const fn raw_step(&self) -> PriceRaw {
        precision_step(self.precision) as PriceRaw
    }
}

fn in_range(raw: &PriceRaw) -> bool {
    (PRICE_RAW_MIN..=PRICE_RAW_MAX).contains(raw)
}

fn saturate(raw: PriceRaw) -> PriceRaw {
    raw.clamp(PRICE_RAW_MIN, PRICE_RAW_MAX)
}

impl PartialEq for Price {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for Price {}

impl Hash for Price {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl PartialOrd for Price {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Price {
    fn cmp(&self, other: &Self) -> Ordering {
        self.raw.cmp(&other.raw)
    }
}

/// Saturates at the representable range; [`Price::checked_add`] reports overflow
impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            raw: saturate(self.raw.saturating_add(rhs.raw)),
            precision: self.precision.max(rhs.precision),
        }
    }
}

/// Saturates at the representable range; [`Price::checked_sub`] reports overflow
impl Sub for Price {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            raw: saturate(self.raw.saturating_sub(rhs.raw)),
            precision: self.precision.max(rhs.precision),
        }
    }
}

impl Neg for Price {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self {
            raw: saturate(self.raw.saturating_neg()),
            precision: self.precision,
        }
    }
}

impl FromStr for Price {
    type Err = PriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let decimal = parse_decimal(s).map_err(|reason| PriceError::invalid(s, reason))?;
        if decimal.scale() > u32::from(FIXED_PRECISION) {
            return Err(PriceError::invalid(
                s,
                format!("more than {FIXED_PRECISION} decimal places"),
            ));
        }
        Self::from_decimal(decimal)
    }
}

impl TryFrom<&str> for Price {
    type Error = PriceError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.raw {
            PRICE_UNDEF => write!(f, "UNDEF"),
            PRICE_ERROR => write!(f, "ERROR"),
            _ => write!(f, "{}", self.as_decimal()),
        }
    }
}

impl fmt::Debug for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Price({self})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case("1000.00", 2, 1_000_000_000_000)]
    #[case("0.5", 1, 500_000_000)]
    #[case("-1.25", 2, -1_250_000_000)]
    #[case("100", 0, 100_000_000_000)]
    fn test_parse_preserves_precision(
        #[case] input: &str,
        #[case] precision: u8,
        #[case] raw: PriceRaw,
    ) {
        let price: Price = input.parse().unwrap();
        assert_eq!(price.precision, precision);
        assert_eq!(price.raw, raw);
        assert_eq!(price.to_string(), input);
    }

    #[test]
    fn test_too_many_decimals_rejected() {
        assert!(matches!(
            "1.0000000001".parse::<Price>(),
            Err(PriceError::Invalid { .. })
        ));
    }

    #[test]
    fn test_non_finite_rejected() {
        assert!(Price::new(f64::NAN, 2).is_err());
        assert!(Price::new(f64::INFINITY, 2).is_err());
    }

    #[test]
    fn test_from_raw_rejects_excess_digits() {
        assert!(Price::from_raw(1_000_000_001, 2).is_err());
        assert!(Price::from_raw(1_010_000_000, 2).is_ok());
    }

    #[test]
    fn test_from_raw_rejects_bad_precision() {
        assert!(Price::from_raw(0, 10).is_err());
    }

    #[test]
    fn test_equality_ignores_precision() {
        let a: Price = "1.0".parse().unwrap();
        let b: Price = "1.00".parse().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_arithmetic_takes_max_precision() {
        let a: Price = "1.5".parse().unwrap();
        let b: Price = "0.25".parse().unwrap();
        let sum = a + b;
        assert_eq!(sum.precision, 2);
        assert_eq!(sum.to_string(), "1.75");
        assert_eq!((a - b).to_string(), "1.25");
    }

    #[test]
    fn test_overflow_is_reported_not_panicking() {
        let max = Price::max(0);
        let one: Price = "1".parse().unwrap();
        assert!(max.checked_add(one).is_none());
        assert!(Price::min(0).checked_sub(one).is_none());
        assert_eq!(max + one, max);
        assert_eq!(Price::min(0) - one, Price::min(0));
        assert_eq!(-Price::min(0), max);
        assert_eq!(max.checked_sub(one).map(|p| p + one), Some(max));
    }

    #[test]
    fn test_new_rounds() {
        let price = Price::new(1.005, 2).unwrap();
        assert_eq!(price.precision, 2);
        assert!((price.as_f64() - 1.0).abs() < 0.011);
    }

    #[test]
    fn test_undefined_display() {
        let price = Price::from_raw(PRICE_UNDEF, 0).unwrap();
        assert!(price.is_undefined());
        assert_eq!(price.to_string(), "UNDEF");
    }

    #[test]
    fn test_serde_bincode() {
        let price: Price = "99.95".parse().unwrap();
        let bytes = bincode::serialize(&price).unwrap();
        let decoded: Price = bincode::deserialize(&bytes).unwrap();
        assert_eq!(decoded, price);
        assert_eq!(decoded.precision, 2);
    }

    proptest! {
        #[test]
        fn prop_decimal_string_is_exact(units in -1_000_000_000i64..1_000_000_000i64, precision in 0u8..=6) {
            let decimal = Decimal::new(units, u32::from(precision));
            let price = Price::from_decimal(decimal).unwrap();
            prop_assert_eq!(price.as_decimal(), decimal);
            prop_assert_eq!(price.to_string().parse::<Price>().unwrap(), price);
        }
    }
}
