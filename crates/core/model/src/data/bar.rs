//! Bars and bar types

use std::{fmt, str::FromStr};

use common::{
    AggregationSource, BarAggregation, InstrumentId, Price, PriceType, Quantity, UnixNanos,
};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::HasTsInit;
use crate::error::{ModelError, ModelResult};

/// Step, aggregation and price type of a bar, e.g. `1-MINUTE-LAST`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BarSpecification {
    /// Number of aggregation units per bar
    pub step: u64,
    /// Aggregation unit
    pub aggregation: BarAggregation,
    /// Price source
    pub price_type: PriceType,
}

impl BarSpecification {
    /// Creates a specification
    #[must_use]
    pub const fn new(step: u64, aggregation: BarAggregation, price_type: PriceType) -> Self {
        Self {
            step,
            aggregation,
            price_type,
        }
    }

    /// Bar interval in nanoseconds for fixed time aggregations
    #[must_use]
    pub fn interval_ns(&self) -> Option<u64> {
        self.aggregation
            .step_nanos()
            .map(|unit| unit.saturating_mul(self.step))
    }
}

impl fmt::Display for BarSpecification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.step, self.aggregation, self.price_type)
    }
}

/// Instrument plus specification plus aggregation source.
///
/// Displays as `"{instrument_id}-{step}-{aggregation}-{price_type}-{source}"`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BarType {
    /// Instrument the bars are built for
    pub instrument_id: InstrumentId,
    /// Step, aggregation and price type
    pub spec: BarSpecification,
    /// Venue-built or locally built
    pub aggregation_source: AggregationSource,
}

impl BarType {
    /// Creates a bar type
    #[must_use]
    pub const fn new(
        instrument_id: InstrumentId,
        spec: BarSpecification,
        aggregation_source: AggregationSource,
    ) -> Self {
        Self {
            instrument_id,
            spec,
            aggregation_source,
        }
    }

    /// Returns true for venue-built bars
    #[must_use]
    pub fn is_externally_aggregated(&self) -> bool {
        self.aggregation_source == AggregationSource::External
    }
}

impl FromStr for BarType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| ModelError::InvalidBarType {
            value: s.to_string(),
            reason: reason.to_string(),
        };

        // Symbols may contain '-', so split from the right
        let mut parts = s.rsplitn(5, '-');
        let source = parts.next().ok_or_else(|| invalid("missing source"))?;
        let price_type = parts.next().ok_or_else(|| invalid("missing price type"))?;
        let aggregation = parts.next().ok_or_else(|| invalid("missing aggregation"))?;
        let step = parts.next().ok_or_else(|| invalid("missing step"))?;
        let instrument_id = parts.next().ok_or_else(|| invalid("missing instrument id"))?;

        let step: u64 = step.parse().map_err(|_| invalid("step is not an integer"))?;
        if step == 0 {
            return Err(invalid("step must be positive"));
        }

        Ok(Self {
            instrument_id: instrument_id
                .parse()
                .map_err(|e: common::IdentifierError| invalid(&e.to_string()))?,
            spec: BarSpecification {
                step,
                aggregation: aggregation
                    .parse()
                    .map_err(|e: common::enums::EnumParseError| invalid(&e.to_string()))?,
                price_type: price_type
                    .parse()
                    .map_err(|e: common::enums::EnumParseError| invalid(&e.to_string()))?,
            },
            aggregation_source: source
                .parse()
                .map_err(|e: common::enums::EnumParseError| invalid(&e.to_string()))?,
        })
    }
}

impl fmt::Display for BarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}",
            self.instrument_id, self.spec, self.aggregation_source
        )
    }
}

impl Serialize for BarType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for BarType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(serde::de::Error::custom)
    }
}

/// An OHLCV bar.
///
/// `ts_init` is always the close time. `ts_event` is the close time when bars are
/// timestamped on close, otherwise the open time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Bar {
    /// Bar type
    pub bar_type: BarType,
    /// Open price
    pub open: Price,
    /// High price
    pub high: Price,
    /// Low price
    pub low: Price,
    /// Close price
    pub close: Price,
    /// Volume
    pub volume: Quantity,
    /// Open or close time, see type docs
    pub ts_event: UnixNanos,
    /// Close time
    pub ts_init: UnixNanos,
}

impl Bar {
    /// Creates a bar, checking OHLC consistency
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidBar`] if `high` is below any other price, `low` is
    /// above any other price, or the prices carry different precisions.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        bar_type: BarType,
        open: Price,
        high: Price,
        low: Price,
        close: Price,
        volume: Quantity,
        ts_event: UnixNanos,
        ts_init: UnixNanos,
    ) -> ModelResult<Self> {
        let invalid = |reason: String| ModelError::InvalidBar { reason };
        if [high, low, close]
            .iter()
            .any(|price| price.precision != open.precision)
        {
            return Err(invalid("OHLC prices must share a precision".to_string()));
        }
        if high < open || high < low || high < close {
            return Err(invalid(format!("high {high} below open, low or close")));
        }
        if low > open || low > close {
            return Err(invalid(format!("low {low} above open or close")));
        }
        Ok(Self {
            bar_type,
            open,
            high,
            low,
            close,
            volume,
            ts_event,
            ts_init,
        })
    }

    /// Returns the bar with `ts_event` moved to the open time (`ts_init - interval`).
    ///
    /// Non-time bars are returned unchanged.
    #[must_use]
    pub fn with_open_time_event(mut self) -> Self {
        if let Some(interval) = self.bar_type.spec.interval_ns() {
            self.ts_event = self.ts_init.saturating_sub_ns(interval);
        }
        self
    }
}

impl HasTsInit for Bar {
    fn ts_init(&self) -> UnixNanos {
        self.ts_init
    }
}

impl fmt::Display for Bar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{},{},{},{}",
            self.bar_type, self.open, self.high, self.low, self.close, self.volume, self.ts_event
        )
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn create_test_bar_type() -> BarType {
        "AUD/USD.SIM-1-MINUTE-BID-EXTERNAL".parse().unwrap()
    }

    #[rstest]
    #[case("AUD/USD.SIM-1-MINUTE-BID-EXTERNAL")]
    #[case("ETHUSDT-PERP.BINANCE-100-TICK-LAST-INTERNAL")]
    fn test_bar_type_display_round_trip(#[case] input: &str) {
        let bar_type: BarType = input.parse().unwrap();
        assert_eq!(bar_type.to_string(), input);
    }

    #[test]
    fn test_bar_type_with_dash_in_symbol() {
        let bar_type: BarType = "ETHUSDT-PERP.BINANCE-1-MINUTE-LAST-EXTERNAL".parse().unwrap();
        assert_eq!(bar_type.instrument_id.symbol.as_str(), "ETHUSDT-PERP");
        assert_eq!(bar_type.spec.step, 1);
        assert!(bar_type.is_externally_aggregated());
    }

    #[rstest]
    #[case("AUD/USD.SIM-0-MINUTE-BID-EXTERNAL")]
    #[case("AUD/USD.SIM-1-FORTNIGHT-BID-EXTERNAL")]
    #[case("MINUTE-BID-EXTERNAL")]
    fn test_bar_type_invalid(#[case] input: &str) {
        assert!(input.parse::<BarType>().is_err());
    }

    #[test]
    fn test_bar_rejects_inconsistent_ohlc() {
        let result = Bar::new(
            create_test_bar_type(),
            "1.00010".parse().unwrap(),
            "1.00005".parse().unwrap(),
            "1.00000".parse().unwrap(),
            "1.00008".parse().unwrap(),
            "100000".parse().unwrap(),
            UnixNanos::default(),
            UnixNanos::default(),
        );
        assert!(matches!(result, Err(ModelError::InvalidBar { .. })));
    }

    #[test]
    fn test_open_time_event() {
        let bar = Bar::new(
            create_test_bar_type(),
            "1.00001".parse().unwrap(),
            "1.00004".parse().unwrap(),
            "1.00000".parse().unwrap(),
            "1.00003".parse().unwrap(),
            "100000".parse().unwrap(),
            UnixNanos::from(120_000_000_000),
            UnixNanos::from(120_000_000_000),
        )
        .unwrap()
        .with_open_time_event();
        assert_eq!(bar.ts_event, UnixNanos::from(60_000_000_000));
        assert_eq!(bar.ts_init, UnixNanos::from(120_000_000_000));
    }

    fn price(units: u32) -> Price {
        Price::new(f64::from(units) / 100_000.0, 5).unwrap()
    }

    proptest::proptest! {
        #[test]
        fn prop_bar_accepts_only_enclosing_high_low(
            open in 1u32..200_000,
            close in 1u32..200_000,
            below in 0u32..1_000,
            above in 0u32..1_000,
        ) {
            let high = open.max(close) + above;
            let low = open.min(close).saturating_sub(below);
            let volume: Quantity = "1".parse().unwrap();
            let ts = UnixNanos::default();

            let ok = Bar::new(
                create_test_bar_type(), price(open), price(high), price(low), price(close),
                volume, ts, ts,
            );
            proptest::prop_assert!(ok.is_ok());

            if open != close {
                let capped = Bar::new(
                    create_test_bar_type(), price(open), price(open.min(close)), price(low),
                    price(close), volume, ts, ts,
                );
                proptest::prop_assert!(capped.is_err());
            }
        }
    }
}
