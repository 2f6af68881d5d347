//! One side of the book

use std::{
    collections::BTreeMap,
    fmt::{self, Display},
};

use common::{OrderSideSpecified, Price, Quantity};
use model::data::BookOrder;
use rust_decimal::Decimal;
use rustc_hash::FxHashMap;

use crate::level::{BookLevel, BookPrice};

/// Sorted price levels for one side plus an `order_id -> price` index
#[derive(Clone, Debug)]
pub struct BookLadder {
    /// Side this ladder holds
    pub side: OrderSideSpecified,
    pub(crate) levels: BTreeMap<BookPrice, BookLevel>,
    pub(crate) cache: FxHashMap<u64, BookPrice>,
}

impl BookLadder {
    /// Creates an empty ladder
    #[must_use]
    pub fn new(side: OrderSideSpecified) -> Self {
        Self {
            side,
            levels: BTreeMap::new(),
            cache: FxHashMap::default(),
        }
    }

    /// Number of price levels
    #[must_use]
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// True when there are no levels
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Drops every level
    pub fn clear(&mut self) {
        self.levels.clear();
        self.cache.clear();
    }

    /// Best level
    #[must_use]
    pub fn top(&self) -> Option<&BookLevel> {
        self.levels.values().next()
    }

    /// Levels from best to worst
    pub fn iter(&self) -> impl Iterator<Item = &BookLevel> {
        self.levels.values()
    }

    /// Level at an exact price
    #[must_use]
    pub fn level_at(&self, price: Price) -> Option<&BookLevel> {
        self.levels.get(&BookPrice::new(price, self.side))
    }

    /// Price of a resting order
    #[must_use]
    pub fn price_of(&self, order_id: u64) -> Option<Price> {
        self.cache.get(&order_id).map(|bp| bp.value)
    }

    /// Inserts an order at the back of its level; a known id is treated as an update
    pub fn add(&mut self, order: BookOrder) {
        if self.cache.contains_key(&order.order_id) {
            self.update(order);
            return;
        }
        if order.size.is_zero() {
            return;
        }
        let book_price = BookPrice::new(order.price, self.side);
        self.cache.insert(order.order_id, book_price);
        self.levels
            .entry(book_price)
            .or_insert_with(|| BookLevel::new(book_price))
            .add(order);
    }

    /// Updates an order, moving it when its price changed
    pub fn update(&mut self, order: BookOrder) {
        if let Some(price) = self.cache.get(&order.order_id).copied() {
            if price.value == order.price {
                if let Some(level) = self.levels.get_mut(&price) {
                    level.update(order);
                    if order.size.is_zero() {
                        self.cache.remove(&order.order_id);
                    }
                    if level.is_empty() {
                        self.levels.remove(&price);
                    }
                }
                return;
            }
            self.remove(order.order_id);
        }
        if order.size.is_positive() {
            self.add(order);
        }
    }

    /// Removes an order by id, returning it if it was resting
    pub fn remove(&mut self, order_id: u64) -> Option<BookOrder> {
        let price = self.cache.remove(&order_id)?;
        let level = self.levels.get_mut(&price)?;
        let removed = level.remove_by_id(order_id);
        if level.is_empty() {
            self.levels.remove(&price);
        }
        removed
    }

    /// Removes a whole level
    pub fn remove_level(&mut self, price: BookPrice) -> Option<BookLevel> {
        let level = self.levels.remove(&price)?;
        for order_id in level.orders.keys() {
            self.cache.remove(order_id);
        }
        Some(level)
    }

    /// Exact total size across all levels
    #[must_use]
    pub fn sizes(&self) -> Decimal {
        self.levels.values().map(BookLevel::size_decimal).sum()
    }

    /// Exact total notional across all levels
    #[must_use]
    pub fn exposures(&self) -> Decimal {
        self.levels.values().map(BookLevel::exposure_decimal).sum()
    }

    /// Walks this ladder as the passive side for `order`, returning `(price, qty)` fills in
    /// priority order until the order is filled or its limit price is crossed
    #[must_use]
    pub fn simulate_fills(&self, order: &BookOrder) -> Vec<(Price, Quantity)> {
        let is_bid_ladder = self.side == OrderSideSpecified::Buy;
        let target = order.size;
        let mut filled = Quantity::zero(target.precision);
        let mut fills = Vec::new();

        for level in self.levels.values() {
            if (is_bid_ladder && level.price.value < order.price)
                || (!is_bid_ladder && level.price.value > order.price)
            {
                break;
            }
            for resting in level.iter() {
                let total = filled.checked_add(resting.size);
                if total.is_none_or(|total| total >= target) {
                    let remainder = target.saturating_sub(filled);
                    if remainder.is_positive() {
                        fills.push((resting.price, remainder));
                    }
                    return fills;
                }
                fills.push((resting.price, resting.size));
                if let Some(total) = total {
                    filled = total;
                }
            }
        }
        fills
    }
}

impl Display for BookLadder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "BookLadder(side={})", self.side)?;
        for (price, level) in &self.levels {
            writeln!(f, "  {price} -> {} orders", level.len())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use common::OrderSide;
    use rstest::rstest;

    use super::*;

    fn bid(price: &str, size: &str, id: u64) -> BookOrder {
        BookOrder::new(OrderSide::Buy, price.parse().unwrap(), size.parse().unwrap(), id)
    }

    fn ask(price: &str, size: &str, id: u64) -> BookOrder {
        BookOrder::new(OrderSide::Sell, price.parse().unwrap(), size.parse().unwrap(), id)
    }

    #[rstest]
    fn test_bids_best_first() {
        let mut ladder = BookLadder::new(OrderSideSpecified::Buy);
        ladder.add(bid("10.00", "1", 1));
        ladder.add(bid("11.00", "1", 2));
        ladder.add(bid("9.00", "1", 3));
        assert_eq!(ladder.top().unwrap().price.value, "11.00".parse().unwrap());
        assert_eq!(ladder.len(), 3);
    }

    #[rstest]
    fn test_update_moves_price_level() {
        let mut ladder = BookLadder::new(OrderSideSpecified::Sell);
        ladder.add(ask("10.00", "1", 1));
        ladder.update(ask("11.00", "2", 1));
        assert_eq!(ladder.len(), 1);
        assert_eq!(ladder.price_of(1), Some("11.00".parse().unwrap()));
    }

    #[rstest]
    fn test_update_missing_order_inserts() {
        let mut ladder = BookLadder::new(OrderSideSpecified::Sell);
        ladder.update(ask("10.00", "1", 7));
        assert_eq!(ladder.price_of(7), Some("10.00".parse().unwrap()));
    }

    #[rstest]
    fn test_remove_cleans_cache_and_level() {
        let mut ladder = BookLadder::new(OrderSideSpecified::Buy);
        ladder.add(bid("10.00", "1", 1));
        assert!(ladder.remove(1).is_some());
        assert!(ladder.is_empty());
        assert!(ladder.cache.is_empty());
        assert!(ladder.remove(1).is_none());
    }

    #[rstest]
    fn test_zero_size_update_deletes() {
        let mut ladder = BookLadder::new(OrderSideSpecified::Buy);
        ladder.add(bid("10.00", "1", 1));
        ladder.update(bid("10.00", "0", 1));
        assert!(ladder.is_empty());
        assert!(ladder.cache.is_empty());
    }

    #[rstest]
    fn test_simulate_fills_walks_asks() {
        let mut ladder = BookLadder::new(OrderSideSpecified::Sell);
        ladder.add(ask("100.00", "1", 1));
        ladder.add(ask("101.00", "2", 2));
        ladder.add(ask("102.00", "5", 3));
        let fills = ladder.simulate_fills(&bid("101.00", "2", 0));
        assert_eq!(
            fills,
            vec![
                ("100.00".parse().unwrap(), "1".parse().unwrap()),
                ("101.00".parse().unwrap(), "1".parse().unwrap()),
            ]
        );
    }

    #[rstest]
    fn test_simulate_fills_far_from_market() {
        let mut ladder = BookLadder::new(OrderSideSpecified::Sell);
        ladder.add(ask("100.00", "1", 1));
        assert!(ladder.simulate_fills(&bid("99.00", "1", 0)).is_empty());
    }

    #[rstest]
    fn test_simulate_fills_at_max_size_does_not_overflow() {
        let mut ladder = BookLadder::new(OrderSideSpecified::Sell);
        ladder.add(ask("100.00", "1", 1));
        ladder.add(ask("101.00", "18446744073", 2));
        let fills = ladder.simulate_fills(&bid("101.00", "18446744073", 0));
        assert_eq!(
            fills,
            vec![
                ("100.00".parse().unwrap(), "1".parse().unwrap()),
                ("101.00".parse().unwrap(), "18446744072".parse().unwrap()),
            ]
        );
    }

    #[rstest]
    fn test_sizes_and_exposures() {
        let mut ladder = BookLadder::new(OrderSideSpecified::Buy);
        ladder.add(bid("10.00", "2", 1));
        ladder.add(bid("5.00", "4", 2));
        assert_eq!(ladder.sizes(), Decimal::from(6));
        assert_eq!(ladder.exposures(), Decimal::from(40));
    }
}
