//! Instrument trading status and closing prices

use common::{InstrumentId, MarketStatusAction, Price, UnixNanos};
use serde::{Deserialize, Serialize};

use super::HasTsInit;

/// Change in the trading status of an instrument
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstrumentStatus {
    /// Instrument
    pub instrument_id: InstrumentId,
    /// New status
    pub action: MarketStatusAction,
    /// Venue event time
    pub ts_event: UnixNanos,
    /// Local receipt time
    pub ts_init: UnixNanos,
}

impl HasTsInit for InstrumentStatus {
    fn ts_init(&self) -> UnixNanos {
        self.ts_init
    }
}

/// Official closing price of an instrument
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstrumentClose {
    /// Instrument
    pub instrument_id: InstrumentId,
    /// Closing price
    pub close_price: Price,
    /// Venue event time
    pub ts_event: UnixNanos,
    /// Local receipt time
    pub ts_init: UnixNanos,
}

impl HasTsInit for InstrumentClose {
    fn ts_init(&self) -> UnixNanos {
        self.ts_init
    }
}
