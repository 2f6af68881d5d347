//! Subscriptions, requests and the normalized events a data client emits

use std::fmt;

use common::{BookType, ClientId, InstrumentId, UUID4, UnixNanos, Venue};
use model::{
    data::{Bar, BarType, Data, DataType, FundingRateUpdate, OrderBookDeltas, QuoteTick, TradeTick},
    instruments::InstrumentAny,
};
use serde::{Deserialize, Serialize};

/// A stream of data a client can be asked to deliver
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DataSubscription {
    /// Every instrument definition of a venue
    Instruments {
        /// Venue to follow
        venue: Venue,
    },
    /// One instrument definition
    Instrument {
        /// Instrument to follow
        instrument_id: InstrumentId,
    },
    /// Incremental book updates
    BookDeltas {
        /// Book instrument
        instrument_id: InstrumentId,
        /// Book representation
        book_type: BookType,
        /// Requested depth; `None` or 0 for the full book
        depth: Option<usize>,
        /// Whether the engine maintains a book from the deltas
        managed: bool,
    },
    /// Ten-level snapshots
    BookDepth10 {
        /// Book instrument
        instrument_id: InstrumentId,
        /// Book representation
        book_type: BookType,
    },
    /// Periodic snapshots of an engine-managed book
    BookSnapshots {
        /// Book instrument
        instrument_id: InstrumentId,
        /// Book representation
        book_type: BookType,
        /// Requested depth; `None` or 0 for the full book
        depth: Option<usize>,
        /// Publishing interval
        interval_ms: u64,
    },
    /// Top-of-book quotes
    Quotes {
        /// Quoted instrument
        instrument_id: InstrumentId,
    },
    /// Trade prints
    Trades {
        /// Traded instrument
        instrument_id: InstrumentId,
    },
    /// Bars of one bar type
    Bars {
        /// Bar type to follow
        bar_type: BarType,
    },
    /// Mark prices
    MarkPrices {
        /// Marked instrument
        instrument_id: InstrumentId,
    },
    /// Index prices
    IndexPrices {
        /// Indexed instrument
        instrument_id: InstrumentId,
    },
    /// Funding rates
    FundingRates {
        /// Perpetual instrument
        instrument_id: InstrumentId,
    },
    /// Trading status changes
    InstrumentStatus {
        /// Instrument to follow
        instrument_id: InstrumentId,
    },
    /// Closing prices
    InstrumentClose {
        /// Instrument to follow
        instrument_id: InstrumentId,
    },
    /// Custom data
    Data {
        /// Data stream name
        data_type: DataType,
    },
}

impl DataSubscription {
    /// Short name of the data kind, used in topics and logs
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Instruments { .. } => "instruments",
            Self::Instrument { .. } => "instrument",
            Self::BookDeltas { .. } => "book.deltas",
            Self::BookDepth10 { .. } => "book.depth10",
            Self::BookSnapshots { .. } => "book.snapshots",
            Self::Quotes { .. } => "quotes",
            Self::Trades { .. } => "trades",
            Self::Bars { .. } => "bars",
            Self::MarkPrices { .. } => "mark_prices",
            Self::IndexPrices { .. } => "index_prices",
            Self::FundingRates { .. } => "funding_rates",
            Self::InstrumentStatus { .. } => "status",
            Self::InstrumentClose { .. } => "close",
            Self::Data { .. } => "custom",
        }
    }

    /// Instrument the subscription is for, if any
    #[must_use]
    pub fn instrument_id(&self) -> Option<InstrumentId> {
        match self {
            Self::Instruments { .. } | Self::Data { .. } => None,
            Self::Bars { bar_type } => Some(bar_type.instrument_id),
            Self::Instrument { instrument_id }
            | Self::BookDeltas { instrument_id, .. }
            | Self::BookDepth10 { instrument_id, .. }
            | Self::BookSnapshots { instrument_id, .. }
            | Self::Quotes { instrument_id }
            | Self::Trades { instrument_id }
            | Self::MarkPrices { instrument_id }
            | Self::IndexPrices { instrument_id }
            | Self::FundingRates { instrument_id }
            | Self::InstrumentStatus { instrument_id }
            | Self::InstrumentClose { instrument_id } => Some(*instrument_id),
        }
    }

    /// Venue used to route the subscription
    #[must_use]
    pub fn venue(&self) -> Option<Venue> {
        match self {
            Self::Instruments { venue } => Some(*venue),
            Self::Data { data_type } => data_type.get("venue").map(Venue::from),
            _ => self.instrument_id().map(|id| id.venue),
        }
    }
}

impl fmt::Display for DataSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Instruments { venue } => write!(f, "instruments:{venue}"),
            Self::Bars { bar_type } => write!(f, "bars:{bar_type}"),
            Self::Data { data_type } => write!(f, "custom:{data_type}"),
            Self::BookDeltas { instrument_id, depth, .. }
            | Self::BookSnapshots { instrument_id, depth, .. } => {
                write!(f, "{}:{instrument_id}:{}", self.kind(), depth.unwrap_or(0))
            }
            other => match other.instrument_id() {
                Some(instrument_id) => write!(f, "{}:{instrument_id}", other.kind()),
                None => f.write_str(other.kind()),
            },
        }
    }
}

/// What a historical request asks for
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestKind {
    /// Every instrument of a venue
    Instruments {
        /// Venue to list
        venue: Venue,
    },
    /// One instrument definition
    Instrument {
        /// Instrument to fetch
        instrument_id: InstrumentId,
    },
    /// Historical quotes
    Quotes {
        /// Quoted instrument
        instrument_id: InstrumentId,
    },
    /// Historical trades
    Trades {
        /// Traded instrument
        instrument_id: InstrumentId,
    },
    /// Historical bars
    Bars {
        /// Bar type to fetch
        bar_type: BarType,
    },
    /// Current book snapshot
    BookSnapshot {
        /// Book instrument
        instrument_id: InstrumentId,
        /// Levels per side; `None` for the venue default
        depth: Option<usize>,
    },
}

impl RequestKind {
    /// Venue used to route the request
    #[must_use]
    pub fn venue(&self) -> Venue {
        match self {
            Self::Instruments { venue } => *venue,
            Self::Bars { bar_type } => bar_type.instrument_id.venue,
            Self::Instrument { instrument_id }
            | Self::Quotes { instrument_id }
            | Self::Trades { instrument_id }
            | Self::BookSnapshot { instrument_id, .. } => instrument_id.venue,
        }
    }
}

/// A historical data request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataRequest {
    /// Correlates the response
    pub request_id: UUID4,
    /// What to fetch
    pub kind: RequestKind,
    /// Inclusive start
    pub start: Option<UnixNanos>,
    /// Inclusive end
    pub end: Option<UnixNanos>,
    /// Maximum number of records
    pub limit: Option<usize>,
}

impl DataRequest {
    /// Creates a request with a fresh id and no bounds
    #[must_use]
    pub fn new(kind: RequestKind) -> Self {
        Self {
            request_id: UUID4::new(),
            kind,
            start: None,
            end: None,
            limit: None,
        }
    }

    /// Whether `ts` falls inside `start..=end`
    #[must_use]
    pub fn contains(&self, ts: UnixNanos) -> bool {
        self.start.is_none_or(|start| ts >= start) && self.end.is_none_or(|end| ts <= end)
    }
}

/// Records returned for a request
#[derive(Debug, Clone, PartialEq)]
pub enum ResponsePayload {
    /// Instrument definitions
    Instruments(Vec<InstrumentAny>),
    /// Quote ticks, oldest first
    Quotes(Vec<QuoteTick>),
    /// Trade ticks, oldest first
    Trades(Vec<TradeTick>),
    /// Bars, oldest first
    Bars(Vec<Bar>),
    /// Book snapshot as a clear followed by adds
    Book(OrderBookDeltas),
}

/// A client's answer to a [`DataRequest`]
#[derive(Debug, Clone, PartialEq)]
pub struct DataResponse {
    /// `request_id` of the request
    pub correlation_id: UUID4,
    /// Responding client
    pub client_id: ClientId,
    /// Returned records
    pub payload: ResponsePayload,
    /// Creation time
    pub ts_init: UnixNanos,
}

/// Normalized output of a data client
#[derive(Debug, Clone, PartialEq)]
pub enum DataEvent {
    /// Instrument definition
    Instrument(Box<InstrumentAny>),
    /// Market data record
    Data(Data),
    /// Funding rate batch
    FundingRates(Vec<FundingRateUpdate>),
    /// Answer to a historical request
    Response(DataResponse),
    /// The transport reconnected; subscriptions must be replayed
    Reconnected,
    /// Non-fatal client error
    Error(String),
    /// Undecoded venue message
    Raw(serde_json::Value),
}
