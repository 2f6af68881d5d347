//! Fixed-point scaling shared by [`crate::Price`], [`crate::Quantity`] and [`crate::Money`]
//!
//! Raw values are always scaled by `10^FIXED_PRECISION`, independent of the declared
//! precision of the value. A raw value at precision `p` is a multiple of
//! `10^(FIXED_PRECISION - p)`.

use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};

/// Number of decimal places carried by every raw value
pub const FIXED_PRECISION: u8 = 9;

/// Scalar between a decimal value and its raw representation
pub const FIXED_SCALAR: f64 = 1_000_000_000.0;

/// Width in bytes of a raw value when encoded as fixed-size binary
pub const PRECISION_BYTES: i32 = 8;

/// Returns `10^(FIXED_PRECISION - precision)`, the raw step for one unit of `precision`
#[must_use]
pub const fn precision_step(precision: u8) -> u64 {
    10u64.pow((FIXED_PRECISION - precision) as u32)
}

/// Checks `precision` does not exceed [`FIXED_PRECISION`]
pub(crate) fn check_precision(precision: u8) -> Result<(), String> {
    if precision > FIXED_PRECISION {
        return Err(format!(
            "precision {precision} exceeds maximum {FIXED_PRECISION}"
        ));
    }
    Ok(())
}

/// Rounds `value` to `precision` places and scales it to a signed raw value
pub(crate) fn decimal_to_raw_i64(value: Decimal, precision: u8) -> Result<i64, String> {
    check_precision(precision)?;
    let rounded =
        value.round_dp_with_strategy(u32::from(precision), RoundingStrategy::MidpointNearestEven);
    let scaled = rounded
        .checked_mul(Decimal::from(10i64.pow(u32::from(FIXED_PRECISION))))
        .ok_or_else(|| "overflow scaling to fixed point".to_string())?;
    scaled
        .trunc()
        .to_i64()
        .ok_or_else(|| "value out of fixed-point range".to_string())
}

/// Rounds `value` to `precision` places and scales it to an unsigned raw value
pub(crate) fn decimal_to_raw_u64(value: Decimal, precision: u8) -> Result<u64, String> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err("value must be non-negative".to_string());
    }
    check_precision(precision)?;
    let rounded =
        value.round_dp_with_strategy(u32::from(precision), RoundingStrategy::MidpointNearestEven);
    let scaled = rounded
        .checked_mul(Decimal::from(10u64.pow(u32::from(FIXED_PRECISION))))
        .ok_or_else(|| "overflow scaling to fixed point".to_string())?;
    scaled
        .trunc()
        .to_u64()
        .ok_or_else(|| "value out of fixed-point range".to_string())
}

/// Exact decimal for a signed raw value at `precision`
#[must_use]
pub fn raw_i64_to_decimal(raw: i64, precision: u8) -> Decimal {
    let step = i128::from(precision_step(precision));
    Decimal::from_i128_with_scale(i128::from(raw) / step, u32::from(precision))
}

/// Exact decimal for an unsigned raw value at `precision`
#[must_use]
pub fn raw_u64_to_decimal(raw: u64, precision: u8) -> Decimal {
    let step = i128::from(precision_step(precision));
    Decimal::from_i128_with_scale(i128::from(raw) / step, u32::from(precision))
}

/// Parses a decimal string, also accepting scientific notation
pub(crate) fn parse_decimal(input: &str) -> Result<Decimal, String> {
    let trimmed = input.trim().replace('_', "");
    if trimmed.contains(['e', 'E']) {
        Decimal::from_scientific(&trimmed).map_err(|e| e.to_string())
    } else {
        trimmed.parse::<Decimal>().map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, 1_000_000_000)]
    #[case(2, 10_000_000)]
    #[case(9, 1)]
    fn test_precision_step(#[case] precision: u8, #[case] expected: u64) {
        assert_eq!(precision_step(precision), expected);
    }

    #[test]
    fn test_decimal_to_raw_rounds_half_even() {
        let value = Decimal::new(12345, 4); // 1.2345
        assert_eq!(decimal_to_raw_i64(value, 3).unwrap(), 1_234_000_000);
    }

    #[test]
    fn test_raw_round_trip_is_exact() {
        let raw = 1_000_500_000_000;
        let dec = raw_i64_to_decimal(raw, 2);
        assert_eq!(dec.to_string(), "1000.50");
        assert_eq!(decimal_to_raw_i64(dec, 2).unwrap(), raw);
    }

    #[test]
    fn test_negative_rejected_for_unsigned() {
        assert!(decimal_to_raw_u64(Decimal::new(-1, 0), 0).is_err());
    }

    #[test]
    fn test_parse_scientific() {
        assert_eq!(parse_decimal("1.5e2").unwrap(), Decimal::new(150, 0));
    }
}
