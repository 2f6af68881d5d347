//! Fixed-shape ten level snapshot

use std::fmt;

use common::{InstrumentId, UnixNanos};
use serde::{Deserialize, Serialize};

use super::{HasTsInit, order::BookOrder};

/// Number of levels per side in an [`OrderBookDepth10`]
pub const DEPTH10_LEN: usize = 10;

/// Ten bid and ten ask levels with per-level order counts.
///
/// Missing levels are padded with [`BookOrder::null`] and a zero count.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBookDepth10 {
    /// Instrument of the snapshot
    pub instrument_id: InstrumentId,
    /// Bid levels, best first
    pub bids: [BookOrder; DEPTH10_LEN],
    /// Ask levels, best first
    pub asks: [BookOrder; DEPTH10_LEN],
    /// Orders at each bid level
    pub bid_counts: [u32; DEPTH10_LEN],
    /// Orders at each ask level
    pub ask_counts: [u32; DEPTH10_LEN],
    /// Record flags
    pub flags: u8,
    /// Venue sequence number
    pub sequence: u64,
    /// Venue event time
    pub ts_event: UnixNanos,
    /// Local receipt time
    pub ts_init: UnixNanos,
}

impl OrderBookDepth10 {
    /// Creates a snapshot
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub const fn new(
        instrument_id: InstrumentId,
        bids: [BookOrder; DEPTH10_LEN],
        asks: [BookOrder; DEPTH10_LEN],
        bid_counts: [u32; DEPTH10_LEN],
        ask_counts: [u32; DEPTH10_LEN],
        flags: u8,
        sequence: u64,
        ts_event: UnixNanos,
        ts_init: UnixNanos,
    ) -> Self {
        Self {
            instrument_id,
            bids,
            asks,
            bid_counts,
            ask_counts,
            flags,
            sequence,
            ts_event,
            ts_init,
        }
    }

    /// Non-padding bid levels
    pub fn bids(&self) -> impl Iterator<Item = &BookOrder> {
        self.bids.iter().filter(|order| !order.is_null())
    }

    /// Non-padding ask levels
    pub fn asks(&self) -> impl Iterator<Item = &BookOrder> {
        self.asks.iter().filter(|order| !order.is_null())
    }
}

impl HasTsInit for OrderBookDepth10 {
    fn ts_init(&self) -> UnixNanos {
        self.ts_init
    }
}

impl fmt::Display for OrderBookDepth10 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "OrderBookDepth10(instrument_id={}, flags={}, sequence={}, ts_event={}, ts_init={})",
            self.instrument_id, self.flags, self.sequence, self.ts_event, self.ts_init
        )
    }
}

#[cfg(test)]
mod tests {
    use common::{OrderSide, Price, Quantity};

    use super::*;

    #[test]
    fn test_padding_filtered() {
        let mut bids = [BookOrder::null(); DEPTH10_LEN];
        bids[0] = BookOrder::new(
            OrderSide::Buy,
            Price::from_raw(99_000_000_000, 2).unwrap(),
            Quantity::from_raw(100_000_000_000, 0).unwrap(),
            0,
        );
        let depth = OrderBookDepth10::new(
            "AAPL.XNAS".parse().unwrap(),
            bids,
            [BookOrder::null(); DEPTH10_LEN],
            [1; DEPTH10_LEN],
            [0; DEPTH10_LEN],
            0,
            0,
            UnixNanos::from(1),
            UnixNanos::from(2),
        );
        assert_eq!(depth.bids().count(), 1);
        assert_eq!(depth.asks().count(), 0);
    }
}
