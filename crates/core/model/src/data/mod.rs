//! Normalized market data records

pub mod bar;
pub mod custom;
pub mod delta;
pub mod depth;
pub mod order;
pub mod prices;
pub mod quote;
pub mod status;
pub mod trade;

use common::{InstrumentId, UnixNanos};
use serde::{Deserialize, Serialize};

pub use bar::{Bar, BarSpecification, BarType};
pub use custom::{CustomData, DataType};
pub use delta::{OrderBookDelta, OrderBookDeltas};
pub use depth::{DEPTH10_LEN, OrderBookDepth10};
pub use order::{BookOrder, NULL_ORDER};
pub use prices::{FundingRateUpdate, IndexPriceUpdate, MarkPriceUpdate};
pub use quote::QuoteTick;
pub use status::{InstrumentClose, InstrumentStatus};
pub use trade::TradeTick;

/// Records that carry a local receipt timestamp
pub trait HasTsInit {
    /// Local receipt time
    fn ts_init(&self) -> UnixNanos;
}

/// Any market data record
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Data {
    /// Single book delta
    Delta(OrderBookDelta),
    /// Batch of book deltas
    Deltas(OrderBookDeltas),
    /// Ten level snapshot
    Depth10(Box<OrderBookDepth10>),
    /// Quote tick
    Quote(QuoteTick),
    /// Trade tick
    Trade(TradeTick),
    /// Bar
    Bar(Bar),
    /// Mark price
    MarkPriceUpdate(MarkPriceUpdate),
    /// Index price
    IndexPriceUpdate(IndexPriceUpdate),
    /// Funding rate
    FundingRate(FundingRateUpdate),
    /// Trading status change
    InstrumentStatus(InstrumentStatus),
    /// Closing price
    InstrumentClose(InstrumentClose),
    /// User-defined payload
    Custom(CustomData),
}

impl Data {
    /// Instrument the record refers to, `None` for custom data
    #[must_use]
    pub fn instrument_id(&self) -> Option<InstrumentId> {
        match self {
            Self::Delta(delta) => Some(delta.instrument_id),
            Self::Deltas(deltas) => Some(deltas.instrument_id),
            Self::Depth10(depth) => Some(depth.instrument_id),
            Self::Quote(quote) => Some(quote.instrument_id),
            Self::Trade(trade) => Some(trade.instrument_id),
            Self::Bar(bar) => Some(bar.bar_type.instrument_id),
            Self::MarkPriceUpdate(mark) => Some(mark.instrument_id),
            Self::IndexPriceUpdate(index) => Some(index.instrument_id),
            Self::FundingRate(rate) => Some(rate.instrument_id),
            Self::InstrumentStatus(status) => Some(status.instrument_id),
            Self::InstrumentClose(close) => Some(close.instrument_id),
            Self::Custom(_) => None,
        }
    }
}

impl HasTsInit for Data {
    fn ts_init(&self) -> UnixNanos {
        match self {
            Self::Delta(d) => d.ts_init(),
            Self::Deltas(d) => d.ts_init(),
            Self::Depth10(d) => d.ts_init(),
            Self::Quote(d) => d.ts_init(),
            Self::Trade(d) => d.ts_init(),
            Self::Bar(d) => d.ts_init(),
            Self::MarkPriceUpdate(d) => d.ts_init(),
            Self::IndexPriceUpdate(d) => d.ts_init(),
            Self::FundingRate(d) => d.ts_init(),
            Self::InstrumentStatus(d) => d.ts_init(),
            Self::InstrumentClose(d) => d.ts_init(),
            Self::Custom(d) => d.ts_init(),
        }
    }
}

impl From<OrderBookDeltas> for Data {
    fn from(value: OrderBookDeltas) -> Self {
        Self::Deltas(value)
    }
}

impl From<QuoteTick> for Data {
    fn from(value: QuoteTick) -> Self {
        Self::Quote(value)
    }
}

impl From<TradeTick> for Data {
    fn from(value: TradeTick) -> Self {
        Self::Trade(value)
    }
}

impl From<Bar> for Data {
    fn from(value: Bar) -> Self {
        Self::Bar(value)
    }
}
