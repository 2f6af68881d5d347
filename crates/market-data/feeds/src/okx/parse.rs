//! Conversion from OKX records to normalized model types
//!
//! Prices and sizes arrive as decimal strings and are rounded to the instrument's
//! precisions. Times arrive as millisecond strings.

use std::str::FromStr;

use common::{
    AggressorSide, BarAggregation, BookAction, Currency, CurrencyType, Decimal, InstrumentId,
    OrderSide, Price, Quantity, RecordFlag, Symbol, TradeId, UnixNanos, Venue,
};
use model::{
    data::{
        Bar, BarType, BookOrder, DEPTH10_LEN, FundingRateUpdate, IndexPriceUpdate,
        MarkPriceUpdate, OrderBookDelta, OrderBookDeltas, OrderBookDepth10, QuoteTick,
        TradeTick,
    },
    instruments::{CryptoPerpetual, CurrencyPair, Instrument, InstrumentAny, InstrumentCore},
};

use super::messages::{OkxBook, OkxCandle, OkxFundingRate, OkxIndexTicker, OkxInstrument, OkxLevel, OkxMarkPrice, OkxTrade};
use crate::error::{FeedError, FeedResult};

const NANOS_PER_MILLI: u64 = 1_000_000;

fn decode_err(field: &str, value: &str, reason: impl std::fmt::Display) -> FeedError {
    FeedError::Decode(format!("{field} '{value}': {reason}"))
}

/// Millisecond string to nanoseconds
pub fn parse_millis(value: &str) -> FeedResult<UnixNanos> {
    let millis: u64 = value.parse().map_err(|e| decode_err("ts", value, e))?;
    Ok(UnixNanos::from(millis.saturating_mul(NANOS_PER_MILLI)))
}

/// Decimal string rounded to `precision`
pub fn parse_price(value: &str, precision: u8) -> FeedResult<Price> {
    let decimal = Decimal::from_str(value).map_err(|e| decode_err("price", value, e))?;
    Price::from_decimal_dp(decimal, precision).map_err(|e| decode_err("price", value, e))
}

/// Decimal string rounded to `precision`
pub fn parse_quantity(value: &str, precision: u8) -> FeedResult<Quantity> {
    let decimal = Decimal::from_str(value).map_err(|e| decode_err("size", value, e))?;
    Quantity::from_decimal_dp(decimal, precision).map_err(|e| decode_err("size", value, e))
}

/// Venue instrument to instrument ID
#[must_use]
pub fn instrument_id(inst_id: &str, venue: Venue) -> InstrumentId {
    InstrumentId::new(Symbol::from(inst_id), venue)
}

fn currency(code: &str) -> Currency {
    Currency::from_code(code)
        .unwrap_or_else(|_| Currency::new(code, 8, 0, code, CurrencyType::Crypto))
}

/// Builds a spot pair or perpetual from a public definition.
///
/// # Errors
///
/// Returns [`FeedError::Unsupported`] for other instrument types and
/// [`FeedError::Decode`] for malformed fields.
pub fn parse_instrument(
    def: &OkxInstrument,
    venue: Venue,
    ts_init: UnixNanos,
) -> FeedResult<InstrumentAny> {
    let id = instrument_id(&def.inst_id, venue);
    let price_increment =
        Price::from_str(&def.tick_sz).map_err(|e| decode_err("tickSz", &def.tick_sz, e))?;
    let size_increment =
        Quantity::from_str(&def.lot_sz).map_err(|e| decode_err("lotSz", &def.lot_sz, e))?;
    let ts_event = if def.list_time.is_empty() {
        ts_init
    } else {
        parse_millis(&def.list_time)?
    };
    let min_quantity = if def.min_sz.is_empty() {
        None
    } else {
        Some(parse_quantity(&def.min_sz, size_increment.precision)?)
    };
    let invalid = |e: model::error::ModelError| FeedError::Decode(e.to_string());

    match def.inst_type.as_str() {
        "SPOT" => {
            let core = InstrumentCore::new(
                id,
                Symbol::from(def.inst_id.as_str()),
                currency(&def.quote_ccy),
                price_increment,
                size_increment,
                ts_event,
                ts_init,
            )
            .with_quantity_limits(min_quantity, None);
            Ok(CurrencyPair::new(core, currency(&def.base_ccy))
                .map_err(invalid)?
                .into())
        }
        "SWAP" => {
            let is_inverse = def.ct_type == "inverse";
            let quote = def.uly.split('-').nth(1).unwrap_or(def.ct_val_ccy.as_str());
            let base = if is_inverse {
                def.settle_ccy.as_str()
            } else {
                def.ct_val_ccy.as_str()
            };
            let multiplier =
                Quantity::from_str(&def.ct_val).map_err(|e| decode_err("ctVal", &def.ct_val, e))?;
            let core = InstrumentCore::new(
                id,
                Symbol::from(def.inst_id.as_str()),
                currency(quote),
                price_increment,
                size_increment,
                ts_event,
                ts_init,
            )
            .with_multiplier(multiplier)
            .with_quantity_limits(min_quantity, None);
            Ok(CryptoPerpetual::new(
                core,
                currency(base),
                currency(&def.settle_ccy),
                is_inverse,
            )
            .map_err(invalid)?
            .into())
        }
        _ => Err(FeedError::Unsupported {
            client: venue.to_string(),
            operation: "instrument type",
        }),
    }
}

fn parse_level(
    level: &OkxLevel,
    side: OrderSide,
    instrument: &InstrumentAny,
) -> FeedResult<(BookOrder, u32)> {
    let price = parse_price(&level[0], instrument.price_precision())?;
    let size = parse_quantity(&level[1], instrument.size_precision())?;
    let count = level[3].parse().unwrap_or(0);
    Ok((BookOrder::new(side, price, size, 0), count))
}

/// Book push to deltas.
///
/// A snapshot becomes a clear followed by adds. In an update a zero size deletes the
/// level and anything else replaces it. The final delta carries `F_LAST`.
///
/// # Errors
///
/// Returns [`FeedError::Decode`] for malformed levels.
pub fn parse_book_deltas(
    instrument: &InstrumentAny,
    book: &OkxBook,
    snapshot: bool,
    ts_init: UnixNanos,
) -> FeedResult<OrderBookDeltas> {
    let id = instrument.id();
    let ts_event = parse_millis(&book.ts)?;
    let sequence = book.seq_id.map_or(0, |s| u64::try_from(s).unwrap_or(0));
    let flags = if snapshot { RecordFlag::F_SNAPSHOT } else { 0 };

    let mut deltas = Vec::with_capacity(book.bids.len() + book.asks.len() + 1);
    if snapshot {
        deltas.push(OrderBookDelta::clear(id, sequence, ts_event, ts_init));
    }
    let levels = book
        .bids
        .iter()
        .map(|l| (l, OrderSide::Buy))
        .chain(book.asks.iter().map(|l| (l, OrderSide::Sell)));
    for (level, side) in levels {
        let (order, _) = parse_level(level, side, instrument)?;
        let action = if snapshot {
            BookAction::Add
        } else if order.size.is_zero() {
            BookAction::Delete
        } else {
            BookAction::Update
        };
        deltas.push(OrderBookDelta::new(
            id, action, order, flags, sequence, ts_event, ts_init,
        ));
    }
    if let Some(last) = deltas.last_mut() {
        last.flags |= RecordFlag::F_LAST;
    }
    OrderBookDeltas::new(id, deltas).map_err(|e| FeedError::Decode(e.to_string()))
}

/// Book push to a ten-level snapshot, null-padded
///
/// # Errors
///
/// Returns [`FeedError::Decode`] for malformed levels.
pub fn parse_depth10(
    instrument: &InstrumentAny,
    book: &OkxBook,
    ts_init: UnixNanos,
) -> FeedResult<OrderBookDepth10> {
    let mut bids = [BookOrder::null(); DEPTH10_LEN];
    let mut asks = [BookOrder::null(); DEPTH10_LEN];
    let mut bid_counts = [0u32; DEPTH10_LEN];
    let mut ask_counts = [0u32; DEPTH10_LEN];

    for (i, level) in book.bids.iter().take(DEPTH10_LEN).enumerate() {
        (bids[i], bid_counts[i]) = parse_level(level, OrderSide::Buy, instrument)?;
    }
    for (i, level) in book.asks.iter().take(DEPTH10_LEN).enumerate() {
        (asks[i], ask_counts[i]) = parse_level(level, OrderSide::Sell, instrument)?;
    }

    Ok(OrderBookDepth10::new(
        instrument.id(),
        bids,
        asks,
        bid_counts,
        ask_counts,
        RecordFlag::F_SNAPSHOT | RecordFlag::F_LAST,
        book.seq_id.map_or(0, |s| u64::try_from(s).unwrap_or(0)),
        parse_millis(&book.ts)?,
        ts_init,
    ))
}

/// Best bid/offer push to a quote; `None` when either side is empty
///
/// # Errors
///
/// Returns [`FeedError::Decode`] for malformed levels.
pub fn parse_quote(
    instrument: &InstrumentAny,
    book: &OkxBook,
    ts_init: UnixNanos,
) -> FeedResult<Option<QuoteTick>> {
    let (Some(bid), Some(ask)) = (book.bids.first(), book.asks.first()) else {
        return Ok(None);
    };
    let (bid, _) = parse_level(bid, OrderSide::Buy, instrument)?;
    let (ask, _) = parse_level(ask, OrderSide::Sell, instrument)?;
    QuoteTick::new(
        instrument.id(),
        bid.price,
        ask.price,
        bid.size,
        ask.size,
        parse_millis(&book.ts)?,
        ts_init,
    )
    .map(Some)
    .map_err(|e| FeedError::Decode(e.to_string()))
}

/// Trade record to a trade tick
///
/// # Errors
///
/// Returns [`FeedError::Decode`] for malformed fields.
pub fn parse_trade(
    instrument: &InstrumentAny,
    trade: &OkxTrade,
    ts_init: UnixNanos,
) -> FeedResult<TradeTick> {
    let aggressor = match trade.side.as_str() {
        "buy" => AggressorSide::Buyer,
        "sell" => AggressorSide::Seller,
        _ => AggressorSide::NoAggressor,
    };
    Ok(TradeTick::new(
        instrument.id(),
        parse_price(&trade.px, instrument.price_precision())?,
        parse_quantity(&trade.sz, instrument.size_precision())?,
        aggressor,
        TradeId::from(trade.trade_id.as_str()),
        parse_millis(&trade.ts)?,
        ts_init,
    ))
}

/// Mark price record
///
/// # Errors
///
/// Returns [`FeedError::Decode`] for malformed fields.
pub fn parse_mark_price(
    instrument: &InstrumentAny,
    mark: &OkxMarkPrice,
    ts_init: UnixNanos,
) -> FeedResult<MarkPriceUpdate> {
    Ok(MarkPriceUpdate::new(
        instrument.id(),
        parse_price(&mark.mark_px, instrument.price_precision())?,
        parse_millis(&mark.ts)?,
        ts_init,
    ))
}

/// Index ticker record, priced at the instrument's precision
///
/// # Errors
///
/// Returns [`FeedError::Decode`] for malformed fields.
pub fn parse_index_price(
    instrument: &InstrumentAny,
    ticker: &OkxIndexTicker,
    ts_init: UnixNanos,
) -> FeedResult<IndexPriceUpdate> {
    Ok(IndexPriceUpdate::new(
        instrument.id(),
        parse_price(&ticker.idx_px, instrument.price_precision())?,
        parse_millis(&ticker.ts)?,
        ts_init,
    ))
}

/// Funding rate record
///
/// # Errors
///
/// Returns [`FeedError::Decode`] for malformed fields.
pub fn parse_funding_rate(
    instrument_id: InstrumentId,
    record: &OkxFundingRate,
    ts_init: UnixNanos,
) -> FeedResult<FundingRateUpdate> {
    let rate = Decimal::from_str(&record.funding_rate)
        .map_err(|e| decode_err("fundingRate", &record.funding_rate, e))?;
    let next_funding_ns = match record.funding_time.as_deref() {
        Some(t) if !t.is_empty() => Some(parse_millis(t)?),
        _ => None,
    };
    let ts_event = match record.ts.as_deref() {
        Some(t) if !t.is_empty() => parse_millis(t)?,
        _ => ts_init,
    };
    Ok(FundingRateUpdate::new(
        instrument_id,
        rate,
        next_funding_ns,
        ts_event,
        ts_init,
    ))
}

/// OKX bar interval for a time bar specification, e.g. `1m`, `4H`, `1D`
///
/// # Errors
///
/// Returns [`FeedError::InvalidBarType`] for aggregations OKX does not publish.
pub fn bar_interval(bar_type: &BarType) -> FeedResult<String> {
    let step = bar_type.spec.step;
    let unit = match bar_type.spec.aggregation {
        BarAggregation::Second if step == 1 => "s",
        BarAggregation::Minute if [1, 3, 5, 15, 30].contains(&step) => "m",
        BarAggregation::Hour if [1, 2, 4, 6, 12].contains(&step) => "H",
        BarAggregation::Day if [1, 2, 3].contains(&step) => "D",
        BarAggregation::Week if step == 1 => "W",
        BarAggregation::Month if [1, 3].contains(&step) => "M",
        _ => return Err(FeedError::InvalidBarType(bar_type.to_string())),
    };
    if !bar_type.is_externally_aggregated() {
        return Err(FeedError::InvalidBarType(bar_type.to_string()));
    }
    Ok(format!("{step}{unit}"))
}

/// Candle to a bar stamped at its close; `None` while the candle is still forming.
///
/// Both `ts_event` and `ts_init` are the close time so the engine can restamp to the
/// open time exactly.
///
/// # Errors
///
/// Returns [`FeedError::Decode`] for malformed candles.
pub fn parse_candle(
    bar_type: BarType,
    instrument: &InstrumentAny,
    candle: &OkxCandle,
) -> FeedResult<Option<Bar>> {
    if candle.len() < 6 {
        return Err(FeedError::Decode(format!(
            "candle with {} fields",
            candle.len()
        )));
    }
    if candle.get(8).is_some_and(|confirm| confirm == "0") {
        return Ok(None);
    }
    let open_ts = parse_millis(&candle[0])?;
    let close_ts = match bar_type.spec.interval_ns() {
        Some(interval) => UnixNanos::from(open_ts.as_u64().saturating_add(interval)),
        None => open_ts,
    };
    let pp = instrument.price_precision();
    Bar::new(
        bar_type,
        parse_price(&candle[1], pp)?,
        parse_price(&candle[2], pp)?,
        parse_price(&candle[3], pp)?,
        parse_price(&candle[4], pp)?,
        parse_quantity(&candle[5], instrument.size_precision())?,
        close_ts,
        close_ts,
    )
    .map(Some)
    .map_err(|e| FeedError::Decode(e.to_string()))
}
