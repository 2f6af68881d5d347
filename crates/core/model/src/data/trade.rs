//! Trade prints

use std::fmt;

use common::{AggressorSide, InstrumentId, Price, Quantity, TradeId, UnixNanos};
use serde::{Deserialize, Serialize};

use super::HasTsInit;

/// A single trade reported by a venue
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TradeTick {
    /// Traded instrument
    pub instrument_id: InstrumentId,
    /// Trade price
    pub price: Price,
    /// Trade size
    pub size: Quantity,
    /// Initiating side
    pub aggressor_side: AggressorSide,
    /// Venue trade identifier
    pub trade_id: TradeId,
    /// Venue event time
    pub ts_event: UnixNanos,
    /// Local receipt time
    pub ts_init: UnixNanos,
}

impl TradeTick {
    /// Creates a trade
    #[must_use]
    pub const fn new(
        instrument_id: InstrumentId,
        price: Price,
        size: Quantity,
        aggressor_side: AggressorSide,
        trade_id: TradeId,
        ts_event: UnixNanos,
        ts_init: UnixNanos,
    ) -> Self {
        Self {
            instrument_id,
            price,
            size,
            aggressor_side,
            trade_id,
            ts_event,
            ts_init,
        }
    }
}

impl HasTsInit for TradeTick {
    fn ts_init(&self) -> UnixNanos {
        self.ts_init
    }
}

impl fmt::Display for TradeTick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{},{},{}",
            self.instrument_id,
            self.price,
            self.size,
            self.aggressor_side,
            self.trade_id,
            self.ts_event
        )
    }
}
