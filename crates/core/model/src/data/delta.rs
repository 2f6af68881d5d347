//! Book delta records

use std::fmt;

use common::{BookAction, InstrumentId, RecordFlag, UnixNanos};
use serde::{Deserialize, Serialize};

use super::{HasTsInit, order::{BookOrder, NULL_ORDER}};
use crate::error::{ModelError, ModelResult};

/// A single change to an order book
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderBookDelta {
    /// Instrument the delta applies to
    pub instrument_id: InstrumentId,
    /// Mutation to perform
    pub action: BookAction,
    /// Order carried by the delta (null for `Clear`)
    pub order: BookOrder,
    /// [`RecordFlag`] bits
    pub flags: u8,
    /// Venue sequence number
    pub sequence: u64,
    /// Venue event time
    pub ts_event: UnixNanos,
    /// Local receipt time
    pub ts_init: UnixNanos,
}

impl OrderBookDelta {
    /// Creates a delta
    #[must_use]
    pub const fn new(
        instrument_id: InstrumentId,
        action: BookAction,
        order: BookOrder,
        flags: u8,
        sequence: u64,
        ts_event: UnixNanos,
        ts_init: UnixNanos,
    ) -> Self {
        Self {
            instrument_id,
            action,
            order,
            flags,
            sequence,
            ts_event,
            ts_init,
        }
    }

    /// A `Clear` delta, flagged as the start of a snapshot
    #[must_use]
    pub const fn clear(
        instrument_id: InstrumentId,
        sequence: u64,
        ts_event: UnixNanos,
        ts_init: UnixNanos,
    ) -> Self {
        Self {
            instrument_id,
            action: BookAction::Clear,
            order: NULL_ORDER,
            flags: RecordFlag::F_SNAPSHOT,
            sequence,
            ts_event,
            ts_init,
        }
    }

    /// Returns true when the snapshot flag is set
    #[must_use]
    pub const fn is_snapshot(&self) -> bool {
        RecordFlag::matches(self.flags, RecordFlag::F_SNAPSHOT)
    }

    /// Returns true when this is the last delta of a batch
    #[must_use]
    pub const fn is_last(&self) -> bool {
        RecordFlag::matches(self.flags, RecordFlag::F_LAST)
    }
}

impl HasTsInit for OrderBookDelta {
    fn ts_init(&self) -> UnixNanos {
        self.ts_init
    }
}

impl fmt::Display for OrderBookDelta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{},{},{},{}",
            self.instrument_id,
            self.action,
            self.order,
            self.flags,
            self.sequence,
            self.ts_event,
            self.ts_init
        )
    }
}

/// Ordered, non-empty batch of deltas for one instrument
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBookDeltas {
    /// Instrument shared by every delta
    pub instrument_id: InstrumentId,
    /// Deltas in application order
    pub deltas: Vec<OrderBookDelta>,
    /// Flags of the last delta
    pub flags: u8,
    /// Sequence of the last delta
    pub sequence: u64,
    /// Event time of the last delta
    pub ts_event: UnixNanos,
    /// Receipt time of the last delta
    pub ts_init: UnixNanos,
}

impl OrderBookDeltas {
    /// Builds a batch
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::EmptyBatch`] for an empty vector and
    /// [`ModelError::InstrumentMismatch`] when deltas reference different instruments.
    pub fn new(instrument_id: InstrumentId, deltas: Vec<OrderBookDelta>) -> ModelResult<Self> {
        let Some(last) = deltas.last().copied() else {
            return Err(ModelError::EmptyBatch {
                kind: "OrderBookDeltas",
            });
        };
        if let Some(other) = deltas.iter().find(|d| d.instrument_id != instrument_id) {
            return Err(ModelError::InstrumentMismatch {
                expected: instrument_id.to_string(),
                found: other.instrument_id.to_string(),
            });
        }
        Ok(Self {
            instrument_id,
            deltas,
            flags: last.flags,
            sequence: last.sequence,
            ts_event: last.ts_event,
            ts_init: last.ts_init,
        })
    }

    /// Number of deltas
    #[must_use]
    pub fn len(&self) -> usize {
        self.deltas.len()
    }

    /// Always false for a validly constructed batch
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty()
    }
}

impl HasTsInit for OrderBookDeltas {
    fn ts_init(&self) -> UnixNanos {
        self.ts_init
    }
}

impl fmt::Display for OrderBookDeltas {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "OrderBookDeltas(instrument_id={}, len={}, sequence={}, ts_event={})",
            self.instrument_id,
            self.deltas.len(),
            self.sequence,
            self.ts_event
        )
    }
}
