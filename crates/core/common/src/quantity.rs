//! Fixed-point non-negative quantity

use std::{
    cmp::Ordering,
    fmt,
    hash::{Hash, Hasher},
    ops::{Add, Sub},
    str::FromStr,
};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    error::QuantityError,
    fixed::{
        FIXED_PRECISION, FIXED_SCALAR, check_precision, decimal_to_raw_u64, parse_decimal,
        precision_step, raw_u64_to_decimal,
    },
};

/// Raw storage for a quantity, scaled by `10^9`
pub type QuantityRaw = u64;

/// Sentinel for an undefined quantity
pub const QUANTITY_UNDEF: QuantityRaw = QuantityRaw::MAX;

/// Largest representable quantity
pub const QUANTITY_MAX: f64 = 18_446_744_073.0;

const QUANTITY_RAW_MAX: QuantityRaw = 18_446_744_073_000_000_000;

/// A non-negative size with an explicit number of decimal places.
///
/// Comparison and hashing use the raw value only.
#[derive(Clone, Copy, Default, Serialize, Deserialize)]
pub struct Quantity {
    /// Value scaled by `10^9`
    pub raw: QuantityRaw,
    /// Number of decimal places
    pub precision: u8,
}

impl Quantity {
    /// Builds a quantity from an `f64`, rounding to `precision` places
    ///
    /// # Errors
    ///
    /// Returns [`QuantityError::Invalid`] for negative, non-finite or out of range input.
    pub fn new(value: f64, precision: u8) -> Result<Self, QuantityError> {
        if !value.is_finite() {
            return Err(QuantityError::invalid(value, "value is not finite"));
        }
        if !(0.0..=QUANTITY_MAX).contains(&value) {
            return Err(QuantityError::invalid(
                value,
                format!("outside range [0, {QUANTITY_MAX}]"),
            ));
        }
        let decimal =
            Decimal::try_from(value).map_err(|e| QuantityError::invalid(value, e.to_string()))?;
        Self::from_decimal_dp(decimal, precision)
    }

    /// Canonical constructor from fixed-point storage
    ///
    /// # Errors
    ///
    /// Returns [`QuantityError::Invalid`] if `precision` exceeds 9, `raw` is out of range
    /// or carries digits beyond `precision`.
    pub fn from_raw(raw: QuantityRaw, precision: u8) -> Result<Self, QuantityError> {
        check_precision(precision).map_err(|reason| QuantityError::invalid(raw, reason))?;
        if raw == QUANTITY_UNDEF {
            return Ok(Self { raw, precision });
        }
        if raw > QUANTITY_RAW_MAX {
            return Err(QuantityError::invalid(raw, "raw value out of range"));
        }
        if raw % precision_step(precision) != 0 {
            return Err(QuantityError::invalid(
                raw,
                format!("raw value has digits beyond precision {precision}"),
            ));
        }
        Ok(Self { raw, precision })
    }

    /// Builds a quantity from a decimal, using its scale as the precision
    ///
    /// # Errors
    ///
    /// Returns [`QuantityError::Invalid`] if the value is negative, out of range or the
    /// scale exceeds 9.
    pub fn from_decimal(value: Decimal) -> Result<Self, QuantityError> {
        let precision = u8::try_from(value.scale())
            .map_err(|_| QuantityError::invalid(value, "scale too large"))?;
        Self::from_decimal_dp(value, precision)
    }

    /// Builds a quantity from a decimal rounded (half-even) to `precision` places
    ///
    /// # Errors
    ///
    /// Returns [`QuantityError::Invalid`] if the value is negative or out of range.
    pub fn from_decimal_dp(value: Decimal, precision: u8) -> Result<Self, QuantityError> {
        let raw = decimal_to_raw_u64(value, precision)
            .map_err(|reason| QuantityError::invalid(value, reason))?;
        if raw > QUANTITY_RAW_MAX {
            return Err(QuantityError::invalid(value, "value out of range"));
        }
        Ok(Self { raw, precision })
    }

    /// Zero at the given precision
    #[must_use]
    pub const fn zero(precision: u8) -> Self {
        Self { raw: 0, precision }
    }

    /// Returns true for the undefined sentinel
    #[must_use]
    pub const fn is_undefined(&self) -> bool {
        self.raw == QUANTITY_UNDEF
    }

    /// Returns true when the value is exactly zero
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.raw == 0
    }

    /// Returns true when the value is strictly positive
    #[must_use]
    pub const fn is_positive(&self) -> bool {
        self.raw > 0 && self.raw != QUANTITY_UNDEF
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
        raw_u64_to_decimal(self.raw, self.precision)
    }

    /// Subtraction clamped at zero
    #[must_use]
    pub fn saturating_sub(self, rhs: Self) -> Self {
        Self {
            raw: self.raw.saturating_sub(rhs.raw),
            precision: self.precision.max(rhs.precision),
        }
    }

    /// Addition returning `None` above the representable range
    #[must_use]
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        let raw = self
            .raw
            .checked_add(rhs.raw)
            .filter(|raw| *raw <= QUANTITY_RAW_MAX)?;
        Some(Self {
            raw,
            precision: self.precision.max(rhs.precision),
        })
    }

    /// Subtraction returning `None` when `rhs` is larger
    #[must_use]
    pub fn checked_sub(self, rhs: Self) -> Option<Self> {
        let raw = self.raw.checked_sub(rhs.raw)?;
        Some(Self {
            raw,
            precision: self.precision.max(rhs.precision),
        })
    }
}

impl PartialEq for Quantity {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for Quantity {}

impl Hash for Quantity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl PartialOrd for Quantity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Quantity {
    fn cmp(&self, other: &Self) -> Ordering {
        self.raw.cmp(&other.raw)
    }
}

/// Saturates at the representable range; [`Quantity::checked_add`] reports overflow
impl Add for Quantity {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            raw: self.raw.saturating_add(rhs.raw).min(QUANTITY_RAW_MAX),
            precision: self.precision.max(rhs.precision),
        }
    }
}

/// Saturates at zero rather than wrapping
impl Sub for Quantity {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        self.saturating_sub(rhs)
    }
}

impl FromStr for Quantity {
    type Err = QuantityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let decimal = parse_decimal(s).map_err(|reason| QuantityError::invalid(s, reason))?;
        if decimal.scale() > u32::from(FIXED_PRECISION) {
            return Err(QuantityError::invalid(
                s,
                format!("more than {FIXED_PRECISION} decimal places"),
            ));
        }
        Self::from_decimal(decimal)
    }
}

impl TryFrom<&str> for Quantity {
    type Error = QuantityError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Whole units at precision zero
impl From<u64> for Quantity {
    fn from(value: u64) -> Self {
        Self {
            raw: value.saturating_mul(precision_step(0)).min(QUANTITY_RAW_MAX),
            precision: 0,
        }
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_undefined() {
            return write!(f, "UNDEF");
        }
        write!(f, "{}", self.as_decimal())
    }
}

impl fmt::Debug for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Quantity({self})")
    }
}
