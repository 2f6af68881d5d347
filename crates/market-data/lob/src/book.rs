//! L1/L2/L3 order book

use std::fmt;

use common::{
    BookAction, BookType, InstrumentId, OrderSide, OrderSideSpecified, Price, Quantity,
    RecordFlag, UnixNanos,
};
use indexmap::IndexMap;
use model::data::{
    BookOrder, OrderBookDelta, OrderBookDeltas, OrderBookDepth10, QuoteTick, TradeTick,
};
use rust_decimal::Decimal;

use crate::{
    analysis,
    error::{BookError, BookIntegrityError, BookResult},
    ladder::BookLadder,
    level::BookLevel,
};

/// Book for one instrument, maintained from deltas, depth snapshots or L1 ticks
#[derive(Clone, Debug)]
pub struct OrderBook {
    /// Instrument
    pub instrument_id: InstrumentId,
    /// Granularity of the book
    pub book_type: BookType,
    /// Sequence of the last applied event
    pub sequence: u64,
    /// Event time of the last applied event
    pub ts_last: UnixNanos,
    /// Number of applied mutations
    pub update_count: u64,
    pub(crate) bids: BookLadder,
    pub(crate) asks: BookLadder,
}

impl PartialEq for OrderBook {
    fn eq(&self, other: &Self) -> bool {
        self.instrument_id == other.instrument_id && self.book_type == other.book_type
    }
}

impl fmt::Display for OrderBook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "OrderBook(instrument_id={}, book_type={}, update_count={})",
            self.instrument_id, self.book_type, self.update_count
        )
    }
}

/// Normalizes an incoming order for the book type.
///
/// L1 keys each side by its side tag, L2 keys by price so each level holds one synthetic
/// order, L3 keeps venue ids unless the record is flagged market-by-price.
#[must_use]
pub fn pre_process_order(book_type: BookType, mut order: BookOrder, flags: u8) -> BookOrder {
    match book_type {
        BookType::L1_MBP => order.order_id = order.side as u64,
        BookType::L2_MBP => order.order_id = order.price.raw as u64,
        BookType::L3_MBO => {
            if RecordFlag::matches(flags, RecordFlag::F_MBP) {
                order.order_id = order.price.raw as u64;
            }
        }
    }
    order
}

impl OrderBook {
    /// Creates an empty book
    #[must_use]
    pub fn new(instrument_id: InstrumentId, book_type: BookType) -> Self {
        Self {
            instrument_id,
            book_type,
            sequence: 0,
            ts_last: UnixNanos::default(),
            update_count: 0,
            bids: BookLadder::new(OrderSideSpecified::Buy),
            asks: BookLadder::new(OrderSideSpecified::Sell),
        }
    }

    /// Clears both sides and zeroes the counters
    pub fn reset(&mut self) {
        self.bids.clear();
        self.asks.clear();
        self.sequence = 0;
        self.ts_last = UnixNanos::default();
        self.update_count = 0;
    }

    fn ladder_mut(&mut self, side: OrderSideSpecified) -> &mut BookLadder {
        match side {
            OrderSideSpecified::Buy => &mut self.bids,
            OrderSideSpecified::Sell => &mut self.asks,
        }
    }

    /// Adds an order.
    ///
    /// On L1 the side is replaced. On L2 an add at an existing level merges into the level
    /// by summing sizes.
    ///
    /// # Errors
    ///
    /// Returns [`BookError::NoOrderSide`] when the order has no side, or
    /// [`BookError::SizeOverflow`] when an L2 merge exceeds the maximum quantity.
    pub fn add(
        &mut self,
        order: BookOrder,
        flags: u8,
        sequence: u64,
        ts_event: UnixNanos,
    ) -> BookResult<()> {
        let side = order.side.as_specified().ok_or(BookError::NoOrderSide {
            action: BookAction::Add,
        })?;
        let mut order = pre_process_order(self.book_type, order, flags);
        match self.book_type {
            BookType::L1_MBP => self.replace_top(side, order),
            BookType::L2_MBP => {
                let ladder = self.ladder_mut(side);
                if let Some(existing) = ladder.level_at(order.price).and_then(|l| l.first()) {
                    order.size = existing
                        .size
                        .checked_add(order.size)
                        .ok_or(BookError::SizeOverflow { price: order.price })?;
                }
                ladder.update(order);
            }
            BookType::L3_MBO => self.ladder_mut(side).add(order),
        }
        self.increment(sequence, ts_event);
        Ok(())
    }

    /// Updates an order; on L1 the side is replaced
    ///
    /// # Errors
    ///
    /// Returns [`BookError::NoOrderSide`] when the order has no side.
    pub fn update(
        &mut self,
        order: BookOrder,
        flags: u8,
        sequence: u64,
        ts_event: UnixNanos,
    ) -> BookResult<()> {
        let side = order.side.as_specified().ok_or(BookError::NoOrderSide {
            action: BookAction::Update,
        })?;
        let order = pre_process_order(self.book_type, order, flags);
        match self.book_type {
            BookType::L1_MBP => self.replace_top(side, order),
            _ => self.ladder_mut(side).update(order),
        }
        self.increment(sequence, ts_event);
        Ok(())
    }

    /// Deletes an order; unknown ids are ignored
    ///
    /// # Errors
    ///
    /// Returns [`BookError::NoOrderSide`] when the order has no side.
    pub fn delete(
        &mut self,
        order: BookOrder,
        flags: u8,
        sequence: u64,
        ts_event: UnixNanos,
    ) -> BookResult<()> {
        let side = order.side.as_specified().ok_or(BookError::NoOrderSide {
            action: BookAction::Delete,
        })?;
        let order = pre_process_order(self.book_type, order, flags);
        if self.ladder_mut(side).remove(order.order_id).is_none() {
            tracing::debug!(
                instrument_id = %self.instrument_id,
                order_id = order.order_id,
                sequence,
                "Delete for unknown order"
            );
        }
        self.increment(sequence, ts_event);
        Ok(())
    }

    /// Clears both sides
    pub fn clear(&mut self, sequence: u64, ts_event: UnixNanos) {
        self.bids.clear();
        self.asks.clear();
        self.increment(sequence, ts_event);
    }

    /// Clears the bid side
    pub fn clear_bids(&mut self, sequence: u64, ts_event: UnixNanos) {
        self.bids.clear();
        self.increment(sequence, ts_event);
    }

    /// Clears the ask side
    pub fn clear_asks(&mut self, sequence: u64, ts_event: UnixNanos) {
        self.asks.clear();
        self.increment(sequence, ts_event);
    }

    /// Removes levels that overlap the opposite side when the book is strictly crossed.
    ///
    /// `Some(Buy)` clears crossed bids, `Some(Sell)` crossed asks, anything else both.
    /// Returns the removed levels (bids first) or `None` when nothing was removed.
    pub fn clear_stale_levels(&mut self, side: Option<OrderSide>) -> Option<Vec<BookLevel>> {
        if self.book_type == BookType::L1_MBP {
            return None;
        }
        let (best_bid, best_ask) = (self.best_bid_price()?, self.best_ask_price()?);
        if best_bid <= best_ask {
            return None;
        }

        let (clear_bids, clear_asks) = match side {
            Some(OrderSide::Buy) => (true, false),
            Some(OrderSide::Sell) => (false, true),
            _ => (true, true),
        };

        let stale_bids: Vec<_> = if clear_bids {
            self.bids
                .levels
                .keys()
                .take_while(|bp| bp.value >= best_ask)
                .copied()
                .collect()
        } else {
            Vec::new()
        };
        let stale_asks: Vec<_> = if clear_asks {
            self.asks
                .levels
                .keys()
                .take_while(|bp| bp.value <= best_bid)
                .copied()
                .collect()
        } else {
            Vec::new()
        };

        let mut removed: Vec<BookLevel> = stale_bids
            .into_iter()
            .filter_map(|bp| self.bids.remove_level(bp))
            .collect();
        let bid_count = removed.len();
        removed.extend(
            stale_asks
                .into_iter()
                .filter_map(|bp| self.asks.remove_level(bp)),
        );
        if removed.is_empty() {
            return None;
        }

        self.increment(self.sequence, self.ts_last);
        tracing::warn!(
            instrument_id = %self.instrument_id,
            bid_levels = bid_count,
            ask_levels = removed.len() - bid_count,
            %best_bid,
            %best_ask,
            "Removed stale crossed levels"
        );
        Some(removed)
    }

    /// Applies one delta.
    ///
    /// A delta without a side is resolved through the order index; unresolved updates and
    /// deletes are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`BookError::NoOrderSide`] for an add (or an unresolvable non-clear delta)
    /// without a side.
    pub fn apply_delta(&mut self, delta: &OrderBookDelta) -> BookResult<()> {
        let mut order = delta.order;

        if order.side == OrderSide::NoOrderSide && order.order_id != 0 {
            match self.resolve_side(order.order_id) {
                Some(side) => order.side = side.as_order_side(),
                None => match delta.action {
                    BookAction::Add => {
                        return Err(BookError::NoOrderSide {
                            action: delta.action,
                        });
                    }
                    BookAction::Update | BookAction::Delete => {
                        tracing::debug!(
                            order_id = order.order_id,
                            action = %delta.action,
                            "Skipping delta for unknown order"
                        );
                        return Ok(());
                    }
                    BookAction::Clear => {}
                },
            }
        }

        match delta.action {
            BookAction::Add => self.add(order, delta.flags, delta.sequence, delta.ts_event),
            BookAction::Update => self.update(order, delta.flags, delta.sequence, delta.ts_event),
            BookAction::Delete => self.delete(order, delta.flags, delta.sequence, delta.ts_event),
            BookAction::Clear => {
                self.clear(delta.sequence, delta.ts_event);
                Ok(())
            }
        }
    }

    /// Applies a batch in order, stopping at the first error
    ///
    /// # Errors
    ///
    /// Returns the first error raised by [`OrderBook::apply_delta`].
    pub fn apply_deltas(&mut self, deltas: &OrderBookDeltas) -> BookResult<()> {
        for delta in &deltas.deltas {
            self.apply_delta(delta)?;
        }
        Ok(())
    }

    /// Replaces the book with a depth-10 snapshot, skipping padding entries
    pub fn apply_depth(&mut self, depth: &OrderBookDepth10) {
        self.bids.clear();
        self.asks.clear();

        for order in depth.bids() {
            let order = pre_process_order(self.book_type, *order, depth.flags);
            if self.book_type == BookType::L1_MBP {
                self.replace_top(OrderSideSpecified::Buy, order);
            } else {
                self.bids.add(order);
            }
        }
        for order in depth.asks() {
            let order = pre_process_order(self.book_type, *order, depth.flags);
            if self.book_type == BookType::L1_MBP {
                self.replace_top(OrderSideSpecified::Sell, order);
            } else {
                self.asks.add(order);
            }
        }

        self.increment(depth.sequence, depth.ts_event);
    }

    /// Replaces top of book from a quote
    ///
    /// # Errors
    ///
    /// Returns [`BookError::InvalidBookOperation`] unless the book is L1.
    pub fn update_quote_tick(&mut self, quote: &QuoteTick) -> BookResult<()> {
        if self.book_type != BookType::L1_MBP {
            return Err(BookError::InvalidBookOperation {
                book_type: self.book_type,
                operation: "update_quote_tick",
            });
        }
        if quote.bid_price > quote.ask_price {
            tracing::warn!(
                instrument_id = %self.instrument_id,
                bid = %quote.bid_price,
                ask = %quote.ask_price,
                "Quote has crossed prices"
            );
        }
        self.replace_top(
            OrderSideSpecified::Buy,
            BookOrder::new(
                OrderSide::Buy,
                quote.bid_price,
                quote.bid_size,
                OrderSide::Buy as u64,
            ),
        );
        self.replace_top(
            OrderSideSpecified::Sell,
            BookOrder::new(
                OrderSide::Sell,
                quote.ask_price,
                quote.ask_size,
                OrderSide::Sell as u64,
            ),
        );
        self.increment(self.sequence.saturating_add(1), quote.ts_event);
        Ok(())
    }

    /// Sets both sides to the trade price and size
    ///
    /// # Errors
    ///
    /// Returns [`BookError::InvalidBookOperation`] unless the book is L1.
    pub fn update_trade_tick(&mut self, trade: &TradeTick) -> BookResult<()> {
        if self.book_type != BookType::L1_MBP {
            return Err(BookError::InvalidBookOperation {
                book_type: self.book_type,
                operation: "update_trade_tick",
            });
        }
        self.replace_top(
            OrderSideSpecified::Buy,
            BookOrder::new(OrderSide::Buy, trade.price, trade.size, OrderSide::Buy as u64),
        );
        self.replace_top(
            OrderSideSpecified::Sell,
            BookOrder::new(
                OrderSide::Sell,
                trade.price,
                trade.size,
                OrderSide::Sell as u64,
            ),
        );
        self.increment(self.sequence.saturating_add(1), trade.ts_event);
        Ok(())
    }

    fn replace_top(&mut self, side: OrderSideSpecified, order: BookOrder) {
        let ladder = self.ladder_mut(side);
        ladder.clear();
        ladder.add(order);
    }

    fn resolve_side(&self, order_id: u64) -> Option<OrderSideSpecified> {
        if self.bids.cache.contains_key(&order_id) {
            Some(OrderSideSpecified::Buy)
        } else if self.asks.cache.contains_key(&order_id) {
            Some(OrderSideSpecified::Sell)
        } else {
            None
        }
    }

    fn increment(&mut self, sequence: u64, ts_event: UnixNanos) {
        if sequence < self.sequence {
            tracing::warn!(
                instrument_id = %self.instrument_id,
                old = self.sequence,
                new = sequence,
                "Sequence went backwards"
            );
        }
        if ts_event < self.ts_last {
            tracing::warn!(
                instrument_id = %self.instrument_id,
                old = %self.ts_last,
                new = %ts_event,
                "Timestamp went backwards"
            );
        }
        self.sequence = sequence;
        self.ts_last = ts_event;
        self.update_count = self.update_count.saturating_add(1);
    }

    /// Bid levels best first, optionally truncated
    pub fn bids(&self, depth: Option<usize>) -> impl Iterator<Item = &BookLevel> {
        self.bids.iter().take(depth.unwrap_or(usize::MAX))
    }

    /// Ask levels best first, optionally truncated
    pub fn asks(&self, depth: Option<usize>) -> impl Iterator<Item = &BookLevel> {
        self.asks.iter().take(depth.unwrap_or(usize::MAX))
    }

    /// Bid levels as `price -> total size`
    #[must_use]
    pub fn bids_as_map(&self, depth: Option<usize>) -> IndexMap<Decimal, Decimal> {
        self.bids(depth)
            .map(|level| (level.price.value.as_decimal(), level.size_decimal()))
            .collect()
    }

    /// Ask levels as `price -> total size`
    #[must_use]
    pub fn asks_as_map(&self, depth: Option<usize>) -> IndexMap<Decimal, Decimal> {
        self.asks(depth)
            .map(|level| (level.price.value.as_decimal(), level.size_decimal()))
            .collect()
    }

    /// Bid sizes bucketed by `floor(price / group_size)`
    #[must_use]
    pub fn group_bids(&self, group_size: Decimal, depth: Option<usize>) -> IndexMap<Decimal, Decimal> {
        analysis::group_levels(self.bids(None), group_size, depth, true)
    }

    /// Ask sizes bucketed by `ceil(price / group_size)`
    #[must_use]
    pub fn group_asks(&self, group_size: Decimal, depth: Option<usize>) -> IndexMap<Decimal, Decimal> {
        analysis::group_levels(self.asks(None), group_size, depth, false)
    }

    /// True when the bid side has an order
    #[must_use]
    pub fn has_bid(&self) -> bool {
        self.bids.top().is_some_and(|level| !level.is_empty())
    }

    /// True when the ask side has an order
    #[must_use]
    pub fn has_ask(&self) -> bool {
        self.asks.top().is_some_and(|level| !level.is_empty())
    }

    /// Best bid price
    #[must_use]
    pub fn best_bid_price(&self) -> Option<Price> {
        self.bids.top().map(|level| level.price.value)
    }

    /// Best ask price
    #[must_use]
    pub fn best_ask_price(&self) -> Option<Price> {
        self.asks.top().map(|level| level.price.value)
    }

    /// Size of the head order at the best bid
    #[must_use]
    pub fn best_bid_size(&self) -> Option<Quantity> {
        self.bids.top().and_then(|l| l.first()).map(|o| o.size)
    }

    /// Size of the head order at the best ask
    #[must_use]
    pub fn best_ask_size(&self) -> Option<Quantity> {
        self.asks.top().and_then(|l| l.first()).map(|o| o.size)
    }

    /// `best_ask - best_bid`
    #[must_use]
    pub fn spread(&self) -> Option<f64> {
        match (self.best_ask_price(), self.best_bid_price()) {
            (Some(ask), Some(bid)) => Some(ask.as_f64() - bid.as_f64()),
            _ => None,
        }
    }

    /// `(best_ask + best_bid) / 2`
    #[must_use]
    pub fn midpoint(&self) -> Option<f64> {
        match (self.best_ask_price(), self.best_bid_price()) {
            (Some(ask), Some(bid)) => Some((ask.as_f64() + bid.as_f64()) / 2.0),
            _ => None,
        }
    }

    fn opposing(&self, side: OrderSide) -> Option<&BookLadder> {
        match side.as_specified()? {
            OrderSideSpecified::Buy => Some(&self.asks),
            OrderSideSpecified::Sell => Some(&self.bids),
        }
    }

    /// VWAP for taking `qty` on `side`, zero when the book cannot fill it
    #[must_use]
    pub fn get_avg_px_for_quantity(&self, qty: Quantity, side: OrderSide) -> f64 {
        self.opposing(side)
            .map_or(0.0, |ladder| analysis::get_avg_px_for_quantity(qty, ladder))
    }

    /// `(avg_px, executed_qty, executed_notional)` for taking `target_exposure` notional
    #[must_use]
    pub fn get_avg_px_qty_for_exposure(
        &self,
        target_exposure: Quantity,
        side: OrderSide,
    ) -> (f64, f64, f64) {
        self.opposing(side).map_or((0.0, 0.0, 0.0), |ladder| {
            analysis::get_avg_px_qty_for_exposure(target_exposure, ladder)
        })
    }

    /// Size a `side` order limited at `price` could take
    #[must_use]
    pub fn get_quantity_for_price(&self, price: Price, side: OrderSide) -> f64 {
        self.opposing(side)
            .map_or(0.0, |ladder| analysis::get_quantity_for_price(price, ladder))
    }

    /// Fills a marketable `order` would receive against the opposing side
    #[must_use]
    pub fn simulate_fills(&self, order: &BookOrder) -> Vec<(Price, Quantity)> {
        self.opposing(order.side)
            .map(|ladder| ladder.simulate_fills(order))
            .unwrap_or_default()
    }

    /// Size imbalance over the top `depth` levels in `[-1, 1]`
    #[must_use]
    pub fn imbalance(&self, depth: usize) -> Option<f64> {
        analysis::imbalance(self.bids(Some(depth)), self.asks(Some(depth)))
    }

    /// True when best bid is at or above best ask
    #[must_use]
    pub fn is_crossed(&self) -> bool {
        matches!(
            (self.best_bid_price(), self.best_ask_price()),
            (Some(bid), Some(ask)) if bid >= ask
        )
    }

    /// Checks book-type invariants: L1 holds at most one level per side, L2/L3 are uncrossed
    ///
    /// # Errors
    ///
    /// Returns the violated [`BookIntegrityError`].
    pub fn check_integrity(&self) -> Result<(), BookIntegrityError> {
        match self.book_type {
            BookType::L1_MBP => {
                for ladder in [&self.bids, &self.asks] {
                    if ladder.len() > 1 {
                        return Err(BookIntegrityError::TooManyLevels {
                            side: ladder.side,
                            count: ladder.len(),
                        });
                    }
                }
                Ok(())
            }
            BookType::L2_MBP | BookType::L3_MBO => {
                match (self.best_bid_price(), self.best_ask_price()) {
                    (Some(bid), Some(ask)) if bid >= ask => {
                        Err(BookIntegrityError::Crossed { bid, ask })
                    }
                    _ => Ok(()),
                }
            }
        }
    }

    /// CRC32 over the top `depth` levels: raw price then raw size, bids then asks
    #[must_use]
    pub fn checksum(&self, depth: usize) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        for level in self.bids(Some(depth)).chain(self.asks(Some(depth))) {
            hasher.update(&level.price.value.raw.to_le_bytes());
            hasher.update(&level.size_raw().to_le_bytes());
        }
        hasher.finalize()
    }

    /// Text ladder of the top `num_levels`, optionally grouped
    #[must_use]
    pub fn pprint(&self, num_levels: usize, group_size: Option<Decimal>) -> String {
        crate::display::pprint_book(self, num_levels, group_size)
    }
}
