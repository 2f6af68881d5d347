//! Process-wide cache of reference data, orders and latest market data

use std::{collections::VecDeque, sync::Arc};

use common::{
    ClientOrderId, Decimal, InstrumentId, OrderSide, Price, PriceType, StrategyId, Venue,
};
use lob::OrderBook;
use model::{
    data::{Bar, BarType, FundingRateUpdate, IndexPriceUpdate, MarkPriceUpdate, QuoteTick, TradeTick},
    instruments::{Instrument, InstrumentAny},
};
use oms::{OrderAny, OrderEventAny};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{CacheError, CacheResult};

/// Cache shared between the engines running on the main task
pub type SharedCache = Arc<RwLock<Cache>>;

/// Retention limits for per-instrument history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Quotes and trades kept per instrument
    pub tick_capacity: usize,
    /// Bars kept per bar type
    pub bar_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            tick_capacity: 10_000,
            bar_capacity: 10_000,
        }
    }
}

/// Latest instruments, orders, books and market data.
///
/// Histories are newest first and bounded by [`CacheConfig`]. Instruments are
/// last-writer-wins by `ts_event`: an older definition never replaces a newer one.
#[derive(Debug, Default)]
pub struct Cache {
    config: CacheConfig,
    instruments: FxHashMap<InstrumentId, InstrumentAny>,
    orders: FxHashMap<ClientOrderId, OrderAny>,
    books: FxHashMap<InstrumentId, OrderBook>,
    quotes: FxHashMap<InstrumentId, VecDeque<QuoteTick>>,
    trades: FxHashMap<InstrumentId, VecDeque<TradeTick>>,
    bars: FxHashMap<BarType, VecDeque<Bar>>,
    mark_prices: FxHashMap<InstrumentId, MarkPriceUpdate>,
    index_prices: FxHashMap<InstrumentId, IndexPriceUpdate>,
    funding_rates: FxHashMap<InstrumentId, FundingRateUpdate>,
}

fn push_front_bounded<T>(history: &mut VecDeque<T>, item: T, capacity: usize) {
    history.push_front(item);
    history.truncate(capacity.max(1));
}

impl Cache {
    #[must_use]
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Wraps a new cache for sharing
    #[must_use]
    pub fn shared(config: CacheConfig) -> SharedCache {
        Arc::new(RwLock::new(Self::new(config)))
    }

    /// Drops everything except the configuration
    pub fn reset(&mut self) {
        *self = Self::new(self.config);
        debug!("Reset cache");
    }

    // -- INSTRUMENTS -----------------------------------------------------------------------------

    /// Stores an instrument unless a newer definition is already cached.
    ///
    /// Returns whether the cache changed.
    pub fn add_instrument(&mut self, instrument: InstrumentAny) -> bool {
        let instrument_id = instrument.id();
        if let Some(existing) = self.instruments.get(&instrument_id) {
            if existing.ts_event() > instrument.ts_event() {
                debug!(
                    %instrument_id,
                    cached = %existing.ts_event(),
                    received = %instrument.ts_event(),
                    "Ignoring stale instrument definition"
                );
                return false;
            }
        }
        trace!(%instrument_id, "Caching instrument");
        self.instruments.insert(instrument_id, instrument);
        true
    }

    #[must_use]
    pub fn instrument(&self, instrument_id: &InstrumentId) -> Option<&InstrumentAny> {
        self.instruments.get(instrument_id)
    }

    /// Instrument ids, optionally for one venue, sorted
    #[must_use]
    pub fn instrument_ids(&self, venue: Option<Venue>) -> Vec<InstrumentId> {
        let mut ids: Vec<InstrumentId> = self
            .instruments
            .keys()
            .filter(|id| venue.is_none_or(|v| id.venue == v))
            .copied()
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Instruments, optionally for one venue
    #[must_use]
    pub fn instruments(&self, venue: Option<Venue>) -> Vec<&InstrumentAny> {
        self.instrument_ids(venue)
            .iter()
            .filter_map(|id| self.instruments.get(id))
            .collect()
    }

    // -- ORDERS ----------------------------------------------------------------------------------

    /// Stores a new order
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::DuplicateOrder`] if the id is already cached.
    pub fn add_order(&mut self, order: OrderAny) -> CacheResult<()> {
        let client_order_id = order.client_order_id;
        if self.orders.contains_key(&client_order_id) {
            return Err(CacheError::DuplicateOrder { client_order_id });
        }
        self.orders.insert(client_order_id, order);
        Ok(())
    }

    /// Applies an event to the cached order it belongs to
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::NotFound`] for unknown orders and [`CacheError::Order`] when
    /// the order refuses the event; the order is left unchanged in that case.
    pub fn update_order(&mut self, event: OrderEventAny) -> CacheResult<&OrderAny> {
        let client_order_id = event.client_order_id();
        let order = self
            .orders
            .get_mut(&client_order_id)
            .ok_or_else(|| CacheError::not_found("order", client_order_id))?;
        order.apply(event)?;
        Ok(order)
    }

    #[must_use]
    pub fn order(&self, client_order_id: &ClientOrderId) -> Option<&OrderAny> {
        self.orders.get(client_order_id)
    }

    pub fn order_mut(&mut self, client_order_id: &ClientOrderId) -> Option<&mut OrderAny> {
        self.orders.get_mut(client_order_id)
    }

    /// Orders of a strategy, or all orders
    #[must_use]
    pub fn orders(&self, strategy_id: Option<StrategyId>) -> Vec<&OrderAny> {
        self.orders
            .values()
            .filter(|o| strategy_id.is_none_or(|s| o.strategy_id == s))
            .collect()
    }

    /// Orders working at the venue
    #[must_use]
    pub fn orders_open(&self) -> Vec<&OrderAny> {
        self.orders.values().filter(|o| o.is_open()).collect()
    }

    /// Orders in a terminal status
    #[must_use]
    pub fn orders_closed(&self) -> Vec<&OrderAny> {
        self.orders.values().filter(|o| o.is_closed()).collect()
    }

    // -- BOOKS -----------------------------------------------------------------------------------

    /// Stores or replaces the book for its instrument
    pub fn add_order_book(&mut self, book: OrderBook) {
        self.books.insert(book.instrument_id, book);
    }

    #[must_use]
    pub fn order_book(&self, instrument_id: &InstrumentId) -> Option<&OrderBook> {
        self.books.get(instrument_id)
    }

    pub fn order_book_mut(&mut self, instrument_id: &InstrumentId) -> Option<&mut OrderBook> {
        self.books.get_mut(instrument_id)
    }

    #[must_use]
    pub fn has_order_book(&self, instrument_id: &InstrumentId) -> bool {
        self.books.contains_key(instrument_id)
    }

    // -- MARKET DATA -----------------------------------------------------------------------------

    pub fn add_quote(&mut self, quote: QuoteTick) {
        let capacity = self.config.tick_capacity;
        push_front_bounded(
            self.quotes.entry(quote.instrument_id).or_default(),
            quote,
            capacity,
        );
    }

    /// Adds historical quotes given oldest first
    pub fn add_quotes(&mut self, quotes: &[QuoteTick]) {
        for quote in quotes {
            self.add_quote(*quote);
        }
    }

    /// Latest quote
    #[must_use]
    pub fn quote(&self, instrument_id: &InstrumentId) -> Option<&QuoteTick> {
        self.quotes.get(instrument_id).and_then(VecDeque::front)
    }

    /// Cached quotes, newest first
    #[must_use]
    pub fn quotes(&self, instrument_id: &InstrumentId) -> Vec<QuoteTick> {
        self.quotes
            .get(instrument_id)
            .map(|q| q.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn add_trade(&mut self, trade: TradeTick) {
        let capacity = self.config.tick_capacity;
        push_front_bounded(
            self.trades.entry(trade.instrument_id).or_default(),
            trade,
            capacity,
        );
    }

    /// Adds historical trades given oldest first
    pub fn add_trades(&mut self, trades: &[TradeTick]) {
        for trade in trades {
            self.add_trade(*trade);
        }
    }

    /// Latest trade
    #[must_use]
    pub fn trade(&self, instrument_id: &InstrumentId) -> Option<&TradeTick> {
        self.trades.get(instrument_id).and_then(VecDeque::front)
    }

    /// Cached trades, newest first
    #[must_use]
    pub fn trades(&self, instrument_id: &InstrumentId) -> Vec<TradeTick> {
        self.trades
            .get(instrument_id)
            .map(|t| t.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn add_bar(&mut self, bar: Bar) {
        let capacity = self.config.bar_capacity;
        push_front_bounded(self.bars.entry(bar.bar_type).or_default(), bar, capacity);
    }

    /// Adds historical bars given oldest first
    pub fn add_bars(&mut self, bars: &[Bar]) {
        for bar in bars {
            self.add_bar(*bar);
        }
    }

    /// Latest bar
    #[must_use]
    pub fn bar(&self, bar_type: &BarType) -> Option<&Bar> {
        self.bars.get(bar_type).and_then(VecDeque::front)
    }

    /// Cached bars, newest first
    #[must_use]
    pub fn bars(&self, bar_type: &BarType) -> Vec<Bar> {
        self.bars
            .get(bar_type)
            .map(|b| b.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn add_mark_price(&mut self, mark: MarkPriceUpdate) {
        self.mark_prices.insert(mark.instrument_id, mark);
    }

    #[must_use]
    pub fn mark_price(&self, instrument_id: &InstrumentId) -> Option<&MarkPriceUpdate> {
        self.mark_prices.get(instrument_id)
    }

    pub fn add_index_price(&mut self, index: IndexPriceUpdate) {
        self.index_prices.insert(index.instrument_id, index);
    }

    #[must_use]
    pub fn index_price(&self, instrument_id: &InstrumentId) -> Option<&IndexPriceUpdate> {
        self.index_prices.get(instrument_id)
    }

    pub fn add_funding_rate(&mut self, rate: FundingRateUpdate) {
        self.funding_rates.insert(rate.instrument_id, rate);
    }

    #[must_use]
    pub fn funding_rate(&self, instrument_id: &InstrumentId) -> Option<&FundingRateUpdate> {
        self.funding_rates.get(instrument_id)
    }

    /// Latest price of the given type: quote sides for `Bid`/`Ask`/`Mid`, the last
    /// trade for `Last`, and the mark price for `Mark`
    #[must_use]
    pub fn price(&self, instrument_id: &InstrumentId, price_type: PriceType) -> Option<Price> {
        match price_type {
            PriceType::Bid => self.quote(instrument_id).map(|q| q.bid_price),
            PriceType::Ask => self.quote(instrument_id).map(|q| q.ask_price),
            PriceType::Mid => self.quote(instrument_id).and_then(|q| {
                let mid = (q.bid_price.as_decimal() + q.ask_price.as_decimal()) / Decimal::TWO;
                Price::from_decimal_dp(mid, q.bid_price.precision + 1).ok()
            }),
            PriceType::Last => self.trade(instrument_id).map(|t| t.price),
            PriceType::Mark => self.mark_price(instrument_id).map(|m| m.value),
        }
    }

    /// Reference price for converting a quote-denominated quantity: the last trade,
    /// else the quote side the order would take
    #[must_use]
    pub fn conversion_price(&self, instrument_id: &InstrumentId, side: OrderSide) -> Option<Price> {
        if let Some(trade) = self.trade(instrument_id) {
            return Some(trade.price);
        }
        let quote = self.quote(instrument_id)?;
        match side {
            OrderSide::Buy => Some(quote.ask_price),
            OrderSide::Sell => Some(quote.bid_price),
            OrderSide::NoOrderSide => None,
        }
    }
}
