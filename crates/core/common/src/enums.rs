//! Shared enumerations
//!
//! Each enum displays and parses as its `SCREAMING_SNAKE_CASE` name.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Error for an unrecognised enum name
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid {kind} value '{value}'")]
pub struct EnumParseError {
    /// Enum type name
    pub kind: &'static str,
    /// The rejected input
    pub value: String,
}

macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident { $($(#[$vmeta:meta])* $variant:ident = $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            /// Canonical upper-case name
            #[must_use]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = EnumParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.to_ascii_uppercase().as_str() {
                    $($text => Ok(Self::$variant),)+
                    _ => Err(EnumParseError {
                        kind: stringify!($name),
                        value: s.to_string(),
                    }),
                }
            }
        }
    };
}

string_enum!(
    /// Side of an order or book entry
    OrderSide {
        /// Unspecified; used for padding entries
        NoOrderSide = "NO_ORDER_SIDE",
        /// Bid side
        Buy = "BUY",
        /// Ask side
        Sell = "SELL",
    }
);

impl OrderSide {
    /// Narrows to a specified side
    #[must_use]
    pub const fn as_specified(&self) -> Option<OrderSideSpecified> {
        match self {
            Self::Buy => Some(OrderSideSpecified::Buy),
            Self::Sell => Some(OrderSideSpecified::Sell),
            Self::NoOrderSide => None,
        }
    }

    /// Opposite side, `NoOrderSide` maps to itself
    #[must_use]
    pub const fn opposite(&self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
            Self::NoOrderSide => Self::NoOrderSide,
        }
    }
}

string_enum!(
    /// Side that is known to be either buy or sell
    OrderSideSpecified {
        /// Bid side
        Buy = "BUY",
        /// Ask side
        Sell = "SELL",
    }
);

impl OrderSideSpecified {
    /// Widens back to [`OrderSide`]
    #[must_use]
    pub const fn as_order_side(&self) -> OrderSide {
        match self {
            Self::Buy => OrderSide::Buy,
            Self::Sell => OrderSide::Sell,
        }
    }

    /// Opposite side
    #[must_use]
    pub const fn opposite(&self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }
}

string_enum!(
    /// Side that initiated a trade
    AggressorSide {
        /// Unknown aggressor
        NoAggressor = "NO_AGGRESSOR",
        /// Buyer lifted the offer
        Buyer = "BUYER",
        /// Seller hit the bid
        Seller = "SELLER",
    }
);

string_enum!(
    /// Book representation
    #[allow(non_camel_case_types)]
    BookType {
        /// Top of book, one level per side
        L1_MBP = "L1_MBP",
        /// Price-aggregated levels
        L2_MBP = "L2_MBP",
        /// Order-by-order
        L3_MBO = "L3_MBO",
    }
);

string_enum!(
    /// Book delta action
    BookAction {
        /// Insert an order
        Add = "ADD",
        /// Modify an existing order
        Update = "UPDATE",
        /// Remove an order
        Delete = "DELETE",
        /// Clear the whole book
        Clear = "CLEAR",
    }
);

string_enum!(
    /// Order type
    OrderType {
        /// Market order
        Market = "MARKET",
        /// Limit order
        Limit = "LIMIT",
        /// Stop market order
        StopMarket = "STOP_MARKET",
        /// Stop limit order
        StopLimit = "STOP_LIMIT",
        /// Market-if-touched order
        MarketIfTouched = "MARKET_IF_TOUCHED",
        /// Limit-if-touched order
        LimitIfTouched = "LIMIT_IF_TOUCHED",
        /// Market order whose unfilled remainder rests as a limit
        MarketToLimit = "MARKET_TO_LIMIT",
        /// Trailing stop market order
        TrailingStopMarket = "TRAILING_STOP_MARKET",
        /// Trailing stop limit order
        TrailingStopLimit = "TRAILING_STOP_LIMIT",
    }
);

string_enum!(
    /// Order lifecycle status
    OrderStatus {
        /// Created locally, not yet sent
        Initialized = "INITIALIZED",
        /// Refused before submission
        Denied = "DENIED",
        /// Held locally by the emulator
        Emulated = "EMULATED",
        /// Released by the emulator
        Released = "RELEASED",
        /// Sent to the venue
        Submitted = "SUBMITTED",
        /// Acknowledged by the venue
        Accepted = "ACCEPTED",
        /// Refused by the venue
        Rejected = "REJECTED",
        /// Canceled
        Canceled = "CANCELED",
        /// Expired by time in force
        Expired = "EXPIRED",
        /// Stop or touch condition met
        Triggered = "TRIGGERED",
        /// Modify request in flight
        PendingUpdate = "PENDING_UPDATE",
        /// Cancel request in flight
        PendingCancel = "PENDING_CANCEL",
        /// Some but not all quantity filled
        PartiallyFilled = "PARTIALLY_FILLED",
        /// Completely filled
        Filled = "FILLED",
    }
);

string_enum!(
    /// Time in force
    TimeInForce {
        /// Good till canceled
        Gtc = "GTC",
        /// Good till date
        Gtd = "GTD",
        /// Immediate or cancel
        Ioc = "IOC",
        /// Fill or kill
        Fok = "FOK",
        /// Good for the trading day
        Day = "DAY",
        /// Execute at the open auction
        AtTheOpen = "AT_THE_OPEN",
        /// Execute at the close auction
        AtTheClose = "AT_THE_CLOSE",
    }
);

string_enum!(
    /// Reference price used to evaluate triggers
    TriggerType {
        /// No trigger
        NoTrigger = "NO_TRIGGER",
        /// Venue default (last price)
        Default = "DEFAULT",
        /// Top of book bid or ask
        BidAsk = "BID_ASK",
        /// Last traded price
        LastPrice = "LAST_PRICE",
        /// Two consecutive last prices
        DoubleLast = "DOUBLE_LAST",
        /// Two consecutive bid or ask prices
        DoubleBidAsk = "DOUBLE_BID_ASK",
        /// Either last or bid/ask
        LastOrBidAsk = "LAST_OR_BID_ASK",
        /// Mid point of the book
        MidPoint = "MID_POINT",
        /// Mark price
        MarkPrice = "MARK_PRICE",
        /// Index price
        IndexPrice = "INDEX_PRICE",
    }
);

string_enum!(
    /// Unit of a trailing offset
    TrailingOffsetType {
        /// No trailing offset
        NoTrailingOffset = "NO_TRAILING_OFFSET",
        /// Absolute price distance
        Price = "PRICE",
        /// Basis points of the reference price
        BasisPoints = "BASIS_POINTS",
        /// Multiples of the price increment
        Ticks = "TICKS",
        /// Venue-defined price tier
        PriceTier = "PRICE_TIER",
    }
);

string_enum!(
    /// Contingent order relationship
    ContingencyType {
        /// None
        NoContingency = "NO_CONTINGENCY",
        /// One-cancels-other
        Oco = "OCO",
        /// One-triggers-other
        Oto = "OTO",
        /// One-updates-other
        Ouo = "OUO",
    }
);

string_enum!(
    /// Liquidity role of a fill
    LiquiditySide {
        /// Unknown
        NoLiquiditySide = "NO_LIQUIDITY_SIDE",
        /// Passive fill
        Maker = "MAKER",
        /// Aggressive fill
        Taker = "TAKER",
    }
);

string_enum!(
    /// Position direction
    PositionSide {
        /// No position
        NoPositionSide = "NO_POSITION_SIDE",
        /// Flat
        Flat = "FLAT",
        /// Long
        Long = "LONG",
        /// Short
        Short = "SHORT",
    }
);

string_enum!(
    /// Bar aggregation method
    BarAggregation {
        /// Count of ticks
        Tick = "TICK",
        /// Traded volume
        Volume = "VOLUME",
        /// Traded notional
        Value = "VALUE",
        /// Milliseconds
        Millisecond = "MILLISECOND",
        /// Seconds
        Second = "SECOND",
        /// Minutes
        Minute = "MINUTE",
        /// Hours
        Hour = "HOUR",
        /// Days
        Day = "DAY",
        /// Weeks
        Week = "WEEK",
        /// Months
        Month = "MONTH",
    }
);

impl BarAggregation {
    /// Length of one step in nanoseconds for fixed time aggregations
    #[must_use]
    pub const fn step_nanos(&self) -> Option<u64> {
        match self {
            Self::Millisecond => Some(1_000_000),
            Self::Second => Some(1_000_000_000),
            Self::Minute => Some(60_000_000_000),
            Self::Hour => Some(3_600_000_000_000),
            Self::Day => Some(86_400_000_000_000),
            Self::Week => Some(604_800_000_000_000),
            Self::Tick | Self::Volume | Self::Value | Self::Month => None,
        }
    }

    /// Returns true for clock-driven aggregations
    #[must_use]
    pub const fn is_time_aggregated(&self) -> bool {
        matches!(
            self,
            Self::Millisecond
                | Self::Second
                | Self::Minute
                | Self::Hour
                | Self::Day
                | Self::Week
                | Self::Month
        )
    }
}

string_enum!(
    /// Price source of a bar
    PriceType {
        /// Bid prices
        Bid = "BID",
        /// Ask prices
        Ask = "ASK",
        /// Mid prices
        Mid = "MID",
        /// Traded prices
        Last = "LAST",
        /// Mark prices
        Mark = "MARK",
    }
);

string_enum!(
    /// Where bars are built
    AggregationSource {
        /// Built by the venue
        External = "EXTERNAL",
        /// Built locally from ticks
        Internal = "INTERNAL",
    }
);

string_enum!(
    /// Broad asset class
    AssetClass {
        /// Foreign exchange
        FX = "FX",
        /// Equities
        Equity = "EQUITY",
        /// Commodities
        Commodity = "COMMODITY",
        /// Debt
        Debt = "DEBT",
        /// Indices
        Index = "INDEX",
        /// Crypto assets
        Cryptocurrency = "CRYPTOCURRENCY",
        /// Alternative assets (betting, prediction markets)
        Alternative = "ALTERNATIVE",
    }
);

string_enum!(
    /// Instrument classification
    InstrumentClass {
        /// Cash instrument
        Spot = "SPOT",
        /// Perpetual swap
        Swap = "SWAP",
        /// Dated future
        Future = "FUTURE",
        /// Futures spread
        FuturesSpread = "FUTURES_SPREAD",
        /// Forward
        Forward = "FORWARD",
        /// Contract for difference
        Cfd = "CFD",
        /// Bond
        Bond = "BOND",
        /// Option
        Option = "OPTION",
        /// Option spread
        OptionSpread = "OPTION_SPREAD",
        /// Warrant
        Warrant = "WARRANT",
        /// Sports betting
        SportsBetting = "SPORTS_BETTING",
        /// Binary option
        BinaryOption = "BINARY_OPTION",
    }
);

string_enum!(
    /// Option kind
    OptionKind {
        /// Call option
        Call = "CALL",
        /// Put option
        Put = "PUT",
    }
);

string_enum!(
    /// Currency classification
    CurrencyType {
        /// Crypto asset
        Crypto = "CRYPTO",
        /// Fiat money
        Fiat = "FIAT",
        /// Commodity-backed token
        CommodityBacked = "COMMODITY_BACKED",
    }
);

string_enum!(
    /// Market status transitions published by venues
    MarketStatusAction {
        /// No change
        None = "NONE",
        /// Pre-open phase
        PreOpen = "PRE_OPEN",
        /// Trading
        Trading = "TRADING",
        /// Halted
        Halt = "HALT",
        /// Paused
        Pause = "PAUSE",
        /// Suspended
        Suspend = "SUSPEND",
        /// Closed
        Close = "CLOSE",
    }
);

/// Bit flags carried on book deltas
pub struct RecordFlag;

impl RecordFlag {
    /// Last message in a batch
    pub const F_LAST: u8 = 1 << 7;
    /// Top-of-book message
    pub const F_TOB: u8 = 1 << 6;
    /// Message belongs to a snapshot
    pub const F_SNAPSHOT: u8 = 1 << 5;
    /// Market-by-price message
    pub const F_MBP: u8 = 1 << 4;

    /// Returns true when `flag` is set in `flags`
    #[must_use]
    pub const fn matches(flags: u8, flag: u8) -> bool {
        flags & flag != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("BUY", OrderSide::Buy)]
    #[case("sell", OrderSide::Sell)]
    fn test_order_side_parse(#[case] input: &str, #[case] expected: OrderSide) {
        assert_eq!(input.parse::<OrderSide>().unwrap(), expected);
    }

    #[test]
    fn test_display_round_trip() {
        assert_eq!(OrderStatus::PartiallyFilled.to_string(), "PARTIALLY_FILLED");
        assert_eq!(
            "PARTIALLY_FILLED".parse::<OrderStatus>().unwrap(),
            OrderStatus::PartiallyFilled
        );
        assert!("NOPE".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_record_flags() {
        let flags = RecordFlag::F_SNAPSHOT | RecordFlag::F_LAST;
        assert!(RecordFlag::matches(flags, RecordFlag::F_SNAPSHOT));
        assert!(!RecordFlag::matches(flags, RecordFlag::F_TOB));
    }

    #[test]
    fn test_bar_aggregation_steps() {
        assert_eq!(BarAggregation::Minute.step_nanos(), Some(60_000_000_000));
        assert!(BarAggregation::Tick.step_nanos().is_none());
        assert!(!BarAggregation::Tick.is_time_aggregated());
    }
}
