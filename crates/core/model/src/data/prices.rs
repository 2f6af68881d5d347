//! Venue reference prices

use std::fmt;

use common::{InstrumentId, Price, UnixNanos};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::HasTsInit;

/// Mark price published by a venue
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MarkPriceUpdate {
    /// Instrument
    pub instrument_id: InstrumentId,
    /// Mark price
    pub value: Price,
    /// Venue event time
    pub ts_event: UnixNanos,
    /// Local receipt time
    pub ts_init: UnixNanos,
}

impl MarkPriceUpdate {
    /// Creates a mark price update
    #[must_use]
    pub const fn new(
        instrument_id: InstrumentId,
        value: Price,
        ts_event: UnixNanos,
        ts_init: UnixNanos,
    ) -> Self {
        Self {
            instrument_id,
            value,
            ts_event,
            ts_init,
        }
    }
}

impl HasTsInit for MarkPriceUpdate {
    fn ts_init(&self) -> UnixNanos {
        self.ts_init
    }
}

impl fmt::Display for MarkPriceUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.instrument_id, self.value, self.ts_event)
    }
}

/// Index price published by a venue
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexPriceUpdate {
    /// Instrument
    pub instrument_id: InstrumentId,
    /// Index price
    pub value: Price,
    /// Venue event time
    pub ts_event: UnixNanos,
    /// Local receipt time
    pub ts_init: UnixNanos,
}

impl IndexPriceUpdate {
    /// Creates an index price update
    #[must_use]
    pub const fn new(
        instrument_id: InstrumentId,
        value: Price,
        ts_event: UnixNanos,
        ts_init: UnixNanos,
    ) -> Self {
        Self {
            instrument_id,
            value,
            ts_event,
            ts_init,
        }
    }
}

impl HasTsInit for IndexPriceUpdate {
    fn ts_init(&self) -> UnixNanos {
        self.ts_init
    }
}

impl fmt::Display for IndexPriceUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.instrument_id, self.value, self.ts_event)
    }
}

/// Perpetual funding rate
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FundingRateUpdate {
    /// Instrument
    pub instrument_id: InstrumentId,
    /// Funding rate for the current period
    pub rate: Decimal,
    /// Time of the next funding event, when known
    pub next_funding_ns: Option<UnixNanos>,
    /// Venue event time
    pub ts_event: UnixNanos,
    /// Local receipt time
    pub ts_init: UnixNanos,
}

impl FundingRateUpdate {
    /// Creates a funding rate update
    #[must_use]
    pub const fn new(
        instrument_id: InstrumentId,
        rate: Decimal,
        next_funding_ns: Option<UnixNanos>,
        ts_event: UnixNanos,
        ts_init: UnixNanos,
    ) -> Self {
        Self {
            instrument_id,
            rate,
            next_funding_ns,
            ts_event,
            ts_init,
        }
    }
}

impl HasTsInit for FundingRateUpdate {
    fn ts_init(&self) -> UnixNanos {
        self.ts_init
    }
}

impl fmt::Display for FundingRateUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.instrument_id, self.rate, self.ts_event)
    }
}
