//! Price-triggered matching of passive orders
//!
//! An [`OrderMatchingCore`] belongs to one instrument and is driven from a single task.
//! It keeps the last bid, ask and trade price together with two price-sorted lists of
//! resting orders, and on every [`OrderMatchingCore::iterate`] reports which orders the
//! current prices have crossed. The core never fills anything itself: it hands back
//! [`MatchAction`]s for the caller to apply once the scan is over.

use std::cmp::Ordering;

use common::{ClientOrderId, InstrumentId, OrderSideSpecified, OrderType, Price, TriggerType};
use oms::OrderAny;
use tracing::{debug, trace};

use crate::error::{EngineError, EngineResult};

/// The parts of an order the matching core needs
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PassiveOrder {
    /// Order identifier
    pub client_order_id: ClientOrderId,
    /// Buy or sell
    pub side: OrderSideSpecified,
    /// Order type
    pub order_type: OrderType,
    /// Limit price
    pub price: Option<Price>,
    /// Stop or touch price
    pub trigger_price: Option<Price>,
    /// Which market price the trigger watches
    pub trigger_type: TriggerType,
    /// Post-only limit
    pub is_post_only: bool,
    /// Stop or touch condition already fired
    pub is_triggered: bool,
    /// Trailing has started (always true for non-trailing orders)
    pub is_activated: bool,
    sequence: u64,
}

impl PassiveOrder {
    /// Extracts the matching view of `order`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotPassive`] for market orders, orders without a side and
    /// market-to-limit orders that have not received their limit price yet.
    pub fn from_order(order: &OrderAny) -> EngineResult<Self> {
        let not_passive = |reason| EngineError::NotPassive {
            client_order_id: order.client_order_id,
            order_type: order.order_type(),
            reason,
        };
        let side = order
            .side_specified()
            .ok_or_else(|| not_passive("order side is not specified"))?;
        match order.order_type() {
            OrderType::Market => return Err(not_passive("market orders never rest")),
            OrderType::MarketToLimit if order.price().is_none() => {
                return Err(not_passive("market-to-limit has no limit price yet"));
            }
            _ => {}
        }

        Ok(Self {
            client_order_id: order.client_order_id,
            side,
            order_type: order.order_type(),
            price: order.price(),
            trigger_price: order.trigger_price(),
            trigger_type: order.trigger_type().unwrap_or(TriggerType::Default),
            is_post_only: order.is_post_only,
            is_triggered: order.is_triggered(),
            is_activated: order.trailing_offset().is_none_or(|t| t.is_activated),
            sequence: 0,
        })
    }

    /// Rests as a limit at `price` (plain limits and fired stop limits)
    #[must_use]
    pub const fn rests_as_limit(&self) -> bool {
        match self.order_type {
            OrderType::Limit | OrderType::MarketToLimit => true,
            OrderType::StopLimit | OrderType::LimitIfTouched | OrderType::TrailingStopLimit => {
                self.is_triggered
            }
            _ => false,
        }
    }

    /// Price the order is sorted and matched on
    #[must_use]
    pub const fn matching_price(&self) -> Option<Price> {
        if self.rests_as_limit() {
            self.price
        } else {
            self.trigger_price
        }
    }
}

/// What a price update did to one resting order
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchAction {
    /// A stop or touch condition fired; the order now rests as a limit
    Trigger {
        /// Order that fired
        client_order_id: ClientOrderId,
        /// Order side
        side: OrderSideSpecified,
        /// Market price that fired it
        price: Price,
    },
    /// The order should be filled at market
    FillMarket {
        /// Order to fill
        client_order_id: ClientOrderId,
        /// Order side
        side: OrderSideSpecified,
        /// Reference price on the side that would be taken
        price: Price,
    },
    /// The market reached the order's limit price
    FillLimit {
        /// Order to fill
        client_order_id: ClientOrderId,
        /// Order side
        side: OrderSideSpecified,
        /// Reference price on the side that would be taken
        price: Price,
    },
}

impl MatchAction {
    /// Order the action refers to
    #[must_use]
    pub const fn client_order_id(&self) -> ClientOrderId {
        match self {
            Self::Trigger {
                client_order_id, ..
            }
            | Self::FillMarket {
                client_order_id, ..
            }
            | Self::FillLimit {
                client_order_id, ..
            } => *client_order_id,
        }
    }

    /// Market price that caused the action
    #[must_use]
    pub const fn price(&self) -> Price {
        match self {
            Self::Trigger { price, .. }
            | Self::FillMarket { price, .. }
            | Self::FillLimit { price, .. } => *price,
        }
    }

    const fn removes_order(&self) -> bool {
        matches!(self, Self::FillMarket { .. } | Self::FillLimit { .. })
    }
}

/// Per-instrument matching state
#[derive(Clone, Debug)]
pub struct OrderMatchingCore {
    /// Instrument whose prices drive this core
    pub instrument_id: InstrumentId,
    /// Minimum price change of the instrument
    pub price_increment: Price,
    /// Last best bid
    pub bid: Option<Price>,
    /// Last best ask
    pub ask: Option<Price>,
    /// Last trade price
    pub last: Option<Price>,
    /// A bid has been received
    pub is_bid_initialized: bool,
    /// An ask has been received
    pub is_ask_initialized: bool,
    /// A trade has been received
    pub is_last_initialized: bool,
    // Bids best (highest) first, asks lowest first, ties in arrival order
    orders_bid: Vec<PassiveOrder>,
    orders_ask: Vec<PassiveOrder>,
    next_sequence: u64,
}

impl OrderMatchingCore {
    /// Creates an empty core with no prices
    #[must_use]
    pub const fn new(instrument_id: InstrumentId, price_increment: Price) -> Self {
        Self {
            instrument_id,
            price_increment,
            bid: None,
            ask: None,
            last: None,
            is_bid_initialized: false,
            is_ask_initialized: false,
            is_last_initialized: false,
            orders_bid: Vec::new(),
            orders_ask: Vec::new(),
            next_sequence: 0,
        }
    }

    // -- QUERIES ---------------------------------------------------------------------------------

    /// Decimal places of the instrument's prices
    #[must_use]
    pub const fn price_precision(&self) -> u8 {
        self.price_increment.precision
    }

    /// Resting order by id, either side
    #[must_use]
    pub fn get_order(&self, client_order_id: ClientOrderId) -> Option<&PassiveOrder> {
        self.orders_bid
            .iter()
            .chain(&self.orders_ask)
            .find(|o| o.client_order_id == client_order_id)
    }

    #[must_use]
    pub fn get_orders_bid(&self) -> &[PassiveOrder] {
        &self.orders_bid
    }

    #[must_use]
    pub fn get_orders_ask(&self) -> &[PassiveOrder] {
        &self.orders_ask
    }

    /// Bids then asks
    #[must_use]
    pub fn get_orders(&self) -> Vec<PassiveOrder> {
        let mut orders = self.orders_bid.clone();
        orders.extend_from_slice(&self.orders_ask);
        orders
    }

    #[must_use]
    pub fn order_exists(&self, client_order_id: ClientOrderId) -> bool {
        self.get_order(client_order_id).is_some()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.orders_bid.is_empty() && self.orders_ask.is_empty()
    }

    // -- COMMANDS --------------------------------------------------------------------------------

    pub fn set_bid_raw(&mut self, bid: Price) {
        self.bid = Some(bid);
        self.is_bid_initialized = true;
    }

    pub fn set_ask_raw(&mut self, ask: Price) {
        self.ask = Some(ask);
        self.is_ask_initialized = true;
    }

    pub fn set_last_raw(&mut self, last: Price) {
        self.last = Some(last);
        self.is_last_initialized = true;
    }

    /// Clears prices, initialization flags and every resting order
    pub fn reset(&mut self) {
        self.bid = None;
        self.ask = None;
        self.last = None;
        self.is_bid_initialized = false;
        self.is_ask_initialized = false;
        self.is_last_initialized = false;
        self.orders_bid.clear();
        self.orders_ask.clear();
        self.next_sequence = 0;
    }

    /// Adds a resting order behind every order at the same price.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::DuplicateOrder`] if the order is already held.
    pub fn add_order(&mut self, mut order: PassiveOrder) -> EngineResult<()> {
        if self.order_exists(order.client_order_id) {
            return Err(EngineError::DuplicateOrder {
                client_order_id: order.client_order_id,
            });
        }
        order.sequence = self.next_sequence;
        self.next_sequence += 1;
        self.insert_sorted(order);
        trace!(
            instrument_id = %self.instrument_id,
            client_order_id = %order.client_order_id,
            "Order added to matching core"
        );
        Ok(())
    }

    /// Removes a resting order, returning it.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::OrderNotFound`] if the order is not held.
    pub fn delete_order(&mut self, client_order_id: ClientOrderId) -> EngineResult<PassiveOrder> {
        for orders in [&mut self.orders_bid, &mut self.orders_ask] {
            if let Some(index) = orders
                .iter()
                .position(|o| o.client_order_id == client_order_id)
            {
                return Ok(orders.remove(index));
            }
        }
        Err(EngineError::OrderNotFound {
            client_order_id,
            instrument_id: self.instrument_id,
        })
    }

    /// Replaces a resting order's prices and flags, keeping its time priority.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::OrderNotFound`] if the order is not held.
    pub fn update_order(&mut self, mut order: PassiveOrder) -> EngineResult<()> {
        let existing = self.delete_order(order.client_order_id)?;
        order.sequence = existing.sequence;
        self.insert_sorted(order);
        Ok(())
    }

    fn insert_sorted(&mut self, order: PassiveOrder) {
        let orders = match order.side {
            OrderSideSpecified::Buy => &mut self.orders_bid,
            OrderSideSpecified::Sell => &mut self.orders_ask,
        };
        let index = orders.partition_point(|o| priority(o, &order) == Ordering::Less);
        orders.insert(index, order);
    }

    // -- MATCHING --------------------------------------------------------------------------------

    /// Evaluates every resting order against the current prices.
    ///
    /// Actions come back in arrival order of the orders they refer to. Orders that are to
    /// be filled leave the core before this returns; triggered orders stay and rest as
    /// limits from the next scan on. Nothing the caller does with the actions can affect
    /// this scan.
    pub fn iterate(&mut self) -> Vec<MatchAction> {
        let mut matched: Vec<(u64, MatchAction)> = self
            .orders_bid
            .iter()
            .chain(&self.orders_ask)
            .filter_map(|order| {
                self.match_order(order, false)
                    .map(|action| (order.sequence, action))
            })
            .collect();
        matched.sort_by_key(|(sequence, _)| *sequence);

        for (_, action) in &matched {
            let client_order_id = action.client_order_id();
            if action.removes_order() {
                let _ = self.delete_order(client_order_id);
            } else if let Ok(mut order) = self.delete_order(client_order_id) {
                order.is_triggered = true;
                self.insert_sorted(order);
            }
        }

        if !matched.is_empty() {
            debug!(
                instrument_id = %self.instrument_id,
                actions = matched.len(),
                "Matching core iteration"
            );
        }
        matched.into_iter().map(|(_, action)| action).collect()
    }

    /// Decides whether the current prices cross `order`.
    ///
    /// With `immediate` set the order is being checked on submission: a post-only limit
    /// that would take liquidity produces no action so the caller can refuse it.
    #[must_use]
    pub fn match_order(&self, order: &PassiveOrder, immediate: bool) -> Option<MatchAction> {
        if !order.is_activated {
            return None;
        }
        let client_order_id = order.client_order_id;
        let side = order.side;

        if order.rests_as_limit() {
            let price = order.price?;
            if !self.is_limit_matched(side, price) {
                return None;
            }
            if immediate && order.is_post_only {
                debug!(%client_order_id, "Post-only order would take liquidity");
                return None;
            }
            return Some(MatchAction::FillLimit {
                client_order_id,
                side,
                price: self.fill_price(side)?,
            });
        }

        let trigger_price = order.trigger_price?;
        let reference = self.trigger_reference(side, order.trigger_type)?;
        match order.order_type {
            OrderType::StopMarket | OrderType::TrailingStopMarket => {
                stop_crossed(side, reference, trigger_price).then_some(MatchAction::FillMarket {
                    client_order_id,
                    side,
                    price: self.fill_price(side)?,
                })
            }
            OrderType::MarketIfTouched => {
                touch_crossed(side, reference, trigger_price).then_some(MatchAction::FillMarket {
                    client_order_id,
                    side,
                    price: self.fill_price(side)?,
                })
            }
            OrderType::StopLimit | OrderType::TrailingStopLimit => {
                stop_crossed(side, reference, trigger_price).then_some(MatchAction::Trigger {
                    client_order_id,
                    side,
                    price: reference,
                })
            }
            OrderType::LimitIfTouched => {
                touch_crossed(side, reference, trigger_price).then_some(MatchAction::Trigger {
                    client_order_id,
                    side,
                    price: reference,
                })
            }
            _ => None,
        }
    }

    /// Buy fills when `ask <= price`, sell when `bid >= price`
    #[must_use]
    pub fn is_limit_matched(&self, side: OrderSideSpecified, price: Price) -> bool {
        match side {
            OrderSideSpecified::Buy => self.ask.is_some_and(|a| a <= price),
            OrderSideSpecified::Sell => self.bid.is_some_and(|b| b >= price),
        }
    }

    /// Buy stop fires when `ask >= price`, sell stop when `bid <= price`
    #[must_use]
    pub fn is_stop_matched(&self, side: OrderSideSpecified, price: Price) -> bool {
        match side {
            OrderSideSpecified::Buy => self.ask.is_some_and(|a| stop_crossed(side, a, price)),
            OrderSideSpecified::Sell => self.bid.is_some_and(|b| stop_crossed(side, b, price)),
        }
    }

    /// Buy touch fires when `ask <= price`, sell touch when `bid >= price`
    #[must_use]
    pub fn is_touch_triggered(&self, side: OrderSideSpecified, trigger_price: Price) -> bool {
        match side {
            OrderSideSpecified::Buy => self
                .ask
                .is_some_and(|a| touch_crossed(side, a, trigger_price)),
            OrderSideSpecified::Sell => self
                .bid
                .is_some_and(|b| touch_crossed(side, b, trigger_price)),
        }
    }

    /// Quote on the side an order of `side` would take, falling back to the last trade
    #[must_use]
    pub fn fill_price(&self, side: OrderSideSpecified) -> Option<Price> {
        let quote = match side {
            OrderSideSpecified::Buy => self.ask,
            OrderSideSpecified::Sell => self.bid,
        };
        quote.or(self.last)
    }

    fn trigger_reference(&self, side: OrderSideSpecified, trigger_type: TriggerType) -> Option<Price> {
        match trigger_type {
            TriggerType::LastPrice => self.last,
            _ => match side {
                OrderSideSpecified::Buy => self.ask,
                OrderSideSpecified::Sell => self.bid,
            },
        }
    }
}

fn stop_crossed(side: OrderSideSpecified, reference: Price, trigger_price: Price) -> bool {
    match side {
        OrderSideSpecified::Buy => reference >= trigger_price,
        OrderSideSpecified::Sell => reference <= trigger_price,
    }
}

fn touch_crossed(side: OrderSideSpecified, reference: Price, trigger_price: Price) -> bool {
    match side {
        OrderSideSpecified::Buy => reference <= trigger_price,
        OrderSideSpecified::Sell => reference >= trigger_price,
    }
}

// Orders without a matching price sort last
fn priority(a: &PassiveOrder, b: &PassiveOrder) -> Ordering {
    let by_price = match (a.matching_price(), b.matching_price()) {
        (Some(pa), Some(pb)) => match a.side {
            OrderSideSpecified::Buy => pb.cmp(&pa),
            OrderSideSpecified::Sell => pa.cmp(&pb),
        },
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_price.then(a.sequence.cmp(&b.sequence))
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use common::{ClientOrderId, OrderSide, Quantity};
    use oms::OrderTestBuilder;
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    use super::*;

    fn px(value: &str) -> Price {
        Price::from_str(value).unwrap()
    }

    fn passive(order_type: OrderType, side: OrderSide, id: &str, price: &str) -> PassiveOrder {
        let mut builder = OrderTestBuilder::new(order_type)
            .instrument_id(InstrumentId::from("AAPL.XNAS"))
            .client_order_id(ClientOrderId::from(id))
            .side(side)
            .quantity(Quantity::from(100));
        builder = match order_type {
            OrderType::Limit => builder.price(px(price)),
            OrderType::StopLimit | OrderType::LimitIfTouched => {
                builder.price(px(price)).trigger_price(px(price))
            }
            _ => builder.trigger_price(px(price)),
        };
        PassiveOrder::from_order(&builder.build().unwrap()).unwrap()
    }

    #[fixture]
    fn core() -> OrderMatchingCore {
        OrderMatchingCore::new(InstrumentId::from("AAPL.XNAS"), px("0.01"))
    }

    #[rstest]
    fn test_add_order_by_side(mut core: OrderMatchingCore) {
        core.add_order(passive(OrderType::Limit, OrderSide::Buy, "O-1", "100.00"))
            .unwrap();
        core.add_order(passive(OrderType::Limit, OrderSide::Sell, "O-2", "101.00"))
            .unwrap();

        assert_eq!(core.get_orders_bid().len(), 1);
        assert_eq!(core.get_orders_ask().len(), 1);
        assert_eq!(core.get_orders_bid()[0].client_order_id, ClientOrderId::from("O-1"));
        assert!(core.order_exists(ClientOrderId::from("O-2")));
    }

    #[rstest]
    fn test_add_duplicate_is_rejected(mut core: OrderMatchingCore) {
        let order = passive(OrderType::Limit, OrderSide::Buy, "O-1", "100.00");
        core.add_order(order).unwrap();
        assert!(matches!(
            core.add_order(order),
            Err(EngineError::DuplicateOrder { .. })
        ));
    }

    #[rstest]
    fn test_delete_missing_order(mut core: OrderMatchingCore) {
        let result = core.delete_order(ClientOrderId::from("O-404"));
        assert!(matches!(result, Err(EngineError::OrderNotFound { .. })));
    }

    #[rstest]
    fn test_bids_sorted_best_first_with_time_priority(mut core: OrderMatchingCore) {
        core.add_order(passive(OrderType::Limit, OrderSide::Buy, "O-1", "99.00"))
            .unwrap();
        core.add_order(passive(OrderType::Limit, OrderSide::Buy, "O-2", "100.00"))
            .unwrap();
        core.add_order(passive(OrderType::Limit, OrderSide::Buy, "O-3", "100.00"))
            .unwrap();

        let ids: Vec<_> = core
            .get_orders_bid()
            .iter()
            .map(|o| o.client_order_id.to_string())
            .collect();
        assert_eq!(ids, vec!["O-2", "O-3", "O-1"]);
    }

    #[rstest]
    fn test_update_keeps_time_priority(mut core: OrderMatchingCore) {
        core.add_order(passive(OrderType::Limit, OrderSide::Sell, "O-1", "101.00"))
            .unwrap();
        core.add_order(passive(OrderType::Limit, OrderSide::Sell, "O-2", "100.00"))
            .unwrap();

        core.update_order(passive(OrderType::Limit, OrderSide::Sell, "O-1", "100.00"))
            .unwrap();

        let ids: Vec<_> = core
            .get_orders_ask()
            .iter()
            .map(|o| o.client_order_id.to_string())
            .collect();
        assert_eq!(ids, vec!["O-1", "O-2"]);
    }

    #[rstest]
    fn test_reset(mut core: OrderMatchingCore) {
        core.add_order(passive(OrderType::Limit, OrderSide::Sell, "O-1", "100.00"))
            .unwrap();
        core.set_bid_raw(px("100.00"));
        core.set_ask_raw(px("100.01"));
        core.set_last_raw(px("100.00"));

        core.reset();

        assert!(core.bid.is_none() && core.ask.is_none() && core.last.is_none());
        assert!(!core.is_bid_initialized);
        assert!(core.is_empty());
    }

    #[rstest]
    #[case(OrderSideSpecified::Buy, "100.00", "100.00", true)]
    #[case(OrderSideSpecified::Buy, "100.01", "100.00", false)]
    #[case(OrderSideSpecified::Sell, "99.99", "100.00", false)]
    #[case(OrderSideSpecified::Sell, "100.00", "100.00", true)]
    fn test_is_limit_matched(
        mut core: OrderMatchingCore,
        #[case] side: OrderSideSpecified,
        #[case] quote: &str,
        #[case] price: &str,
        #[case] expected: bool,
    ) {
        core.set_bid_raw(px(quote));
        core.set_ask_raw(px(quote));
        assert_eq!(core.is_limit_matched(side, px(price)), expected);
    }

    #[rstest]
    #[case(OrderSideSpecified::Buy, "100.01", "100.00", true, false)]
    #[case(OrderSideSpecified::Buy, "99.99", "100.00", false, true)]
    #[case(OrderSideSpecified::Sell, "99.99", "100.00", true, false)]
    #[case(OrderSideSpecified::Sell, "100.01", "100.00", false, true)]
    fn test_stop_and_touch(
        mut core: OrderMatchingCore,
        #[case] side: OrderSideSpecified,
        #[case] quote: &str,
        #[case] trigger: &str,
        #[case] stop: bool,
        #[case] touch: bool,
    ) {
        core.set_bid_raw(px(quote));
        core.set_ask_raw(px(quote));
        assert_eq!(core.is_stop_matched(side, px(trigger)), stop);
        assert_eq!(core.is_touch_triggered(side, px(trigger)), touch);
    }

    #[rstest]
    fn test_no_prices_no_match(core: OrderMatchingCore) {
        assert!(!core.is_limit_matched(OrderSideSpecified::Buy, px("100.00")));
        assert!(!core.is_stop_matched(OrderSideSpecified::Sell, px("100.00")));
    }

    #[rstest]
    fn test_stop_limit_triggers_then_fills_next_scan(mut core: OrderMatchingCore) {
        core.add_order(passive(OrderType::StopLimit, OrderSide::Buy, "O-1", "100.00"))
            .unwrap();
        core.set_bid_raw(px("99.99"));
        core.set_ask_raw(px("100.00"));

        let actions = core.iterate();
        assert!(matches!(actions[..], [MatchAction::Trigger { .. }]));
        let held = core.get_order(ClientOrderId::from("O-1")).unwrap();
        assert!(held.is_triggered);

        let actions = core.iterate();
        assert!(matches!(actions[..], [MatchAction::FillLimit { .. }]));
        assert!(core.is_empty());
    }

    #[rstest]
    fn test_actions_follow_arrival_order(mut core: OrderMatchingCore) {
        core.add_order(passive(OrderType::Limit, OrderSide::Sell, "O-1", "100.00"))
            .unwrap();
        core.add_order(passive(OrderType::Limit, OrderSide::Buy, "O-2", "101.00"))
            .unwrap();
        core.add_order(passive(OrderType::Limit, OrderSide::Sell, "O-3", "99.00"))
            .unwrap();
        core.set_bid_raw(px("100.50"));
        core.set_ask_raw(px("100.50"));

        let ids: Vec<_> = core
            .iterate()
            .iter()
            .map(|a| a.client_order_id().to_string())
            .collect();
        assert_eq!(ids, vec!["O-1", "O-2", "O-3"]);
    }

    #[rstest]
    fn test_last_price_trigger_uses_trades(mut core: OrderMatchingCore) {
        let order = OrderTestBuilder::new(OrderType::StopMarket)
            .instrument_id(InstrumentId::from("AAPL.XNAS"))
            .side(OrderSide::Sell)
            .trigger_price(px("100.00"))
            .trigger_type(TriggerType::LastPrice)
            .build()
            .unwrap();
        core.add_order(PassiveOrder::from_order(&order).unwrap())
            .unwrap();
        core.set_bid_raw(px("99.00"));
        assert!(core.iterate().is_empty());

        core.set_last_raw(px("100.00"));
        let actions = core.iterate();
        assert_eq!(
            actions,
            vec![MatchAction::FillMarket {
                client_order_id: order.client_order_id,
                side: OrderSideSpecified::Sell,
                price: px("99.00"),
            }]
        );
    }

    #[rstest]
    fn test_immediate_post_only_is_not_filled(mut core: OrderMatchingCore) {
        let order = OrderTestBuilder::new(OrderType::Limit)
            .instrument_id(InstrumentId::from("AAPL.XNAS"))
            .price(px("100.00"))
            .post_only(true)
            .build()
            .unwrap();
        let passive = PassiveOrder::from_order(&order).unwrap();
        core.set_ask_raw(px("99.99"));

        assert!(core.match_order(&passive, true).is_none());
        assert!(core.match_order(&passive, false).is_some());
    }

    #[test]
    fn test_market_order_is_not_passive() {
        let order = OrderTestBuilder::new(OrderType::Market).build().unwrap();
        assert!(matches!(
            PassiveOrder::from_order(&order),
            Err(EngineError::NotPassive { .. })
        ));
    }
}
