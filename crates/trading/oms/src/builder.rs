//! Test order builder
//!
//! Fills every field of [`OrderInitialized`] with a usable default so tests only set what
//! they care about.

#![allow(missing_docs)]

use common::{
    ClientOrderId, ContingencyType, ExecAlgorithmId, InstrumentId, OrderListId, OrderSide,
    OrderType, Price, Quantity, StrategyId, Symbol, TimeInForce, TraderId, TrailingOffsetType,
    TriggerType, UnixNanos, Venue,
};
use indexmap::IndexMap;
use rust_decimal::Decimal;

use crate::{
    error::OmsResult,
    events::{OrderEventHeader, OrderInitialized},
    order::OrderAny,
};

/// Builder for orders used in tests and simulations
#[derive(Clone, Debug)]
pub struct OrderTestBuilder {
    order_type: OrderType,
    trader_id: TraderId,
    strategy_id: StrategyId,
    instrument_id: InstrumentId,
    client_order_id: ClientOrderId,
    side: OrderSide,
    quantity: Quantity,
    price: Option<Price>,
    trigger_price: Option<Price>,
    trigger_type: Option<TriggerType>,
    limit_offset: Option<Decimal>,
    trailing_offset: Option<Decimal>,
    trailing_offset_type: Option<TrailingOffsetType>,
    activation_price: Option<Price>,
    time_in_force: TimeInForce,
    expire_time: Option<UnixNanos>,
    post_only: bool,
    reduce_only: bool,
    quote_quantity: bool,
    display_qty: Option<Quantity>,
    emulation_trigger: Option<TriggerType>,
    trigger_instrument_id: Option<InstrumentId>,
    contingency_type: Option<ContingencyType>,
    order_list_id: Option<OrderListId>,
    linked_order_ids: Option<Vec<ClientOrderId>>,
    parent_order_id: Option<ClientOrderId>,
    exec_algorithm_id: Option<ExecAlgorithmId>,
    exec_algorithm_params: Option<IndexMap<String, String>>,
    exec_spawn_id: Option<ClientOrderId>,
    tags: Option<Vec<String>>,
    ts_init: UnixNanos,
}

impl OrderTestBuilder {
    /// Buy 100,000 `AUD/USD.SIM` with the given order type
    #[must_use]
    pub fn new(order_type: OrderType) -> Self {
        Self {
            order_type,
            trader_id: TraderId::from("TRADER-001"),
            strategy_id: StrategyId::from("S-001"),
            instrument_id: InstrumentId::new(Symbol::from("AUD/USD"), Venue::from("SIM")),
            client_order_id: ClientOrderId::from("O-1"),
            side: OrderSide::Buy,
            quantity: Quantity::from(100_000),
            price: None,
            trigger_price: None,
            trigger_type: None,
            limit_offset: None,
            trailing_offset: None,
            trailing_offset_type: None,
            activation_price: None,
            time_in_force: TimeInForce::Gtc,
            expire_time: None,
            post_only: false,
            reduce_only: false,
            quote_quantity: false,
            display_qty: None,
            emulation_trigger: None,
            trigger_instrument_id: None,
            contingency_type: None,
            order_list_id: None,
            linked_order_ids: None,
            parent_order_id: None,
            exec_algorithm_id: None,
            exec_algorithm_params: None,
            exec_spawn_id: None,
            tags: None,
            ts_init: UnixNanos::default(),
        }
    }

    #[must_use]
    pub fn trader_id(mut self, trader_id: TraderId) -> Self {
        self.trader_id = trader_id;
        self
    }

    #[must_use]
    pub fn strategy_id(mut self, strategy_id: StrategyId) -> Self {
        self.strategy_id = strategy_id;
        self
    }

    #[must_use]
    pub fn instrument_id(mut self, instrument_id: InstrumentId) -> Self {
        self.instrument_id = instrument_id;
        self
    }

    #[must_use]
    pub fn client_order_id(mut self, client_order_id: ClientOrderId) -> Self {
        self.client_order_id = client_order_id;
        self
    }

    #[must_use]
    pub fn side(mut self, side: OrderSide) -> Self {
        self.side = side;
        self
    }

    #[must_use]
    pub fn quantity(mut self, quantity: Quantity) -> Self {
        self.quantity = quantity;
        self
    }

    #[must_use]
    pub fn price(mut self, price: Price) -> Self {
        self.price = Some(price);
        self
    }

    #[must_use]
    pub fn trigger_price(mut self, trigger_price: Price) -> Self {
        self.trigger_price = Some(trigger_price);
        self
    }

    #[must_use]
    pub fn trigger_type(mut self, trigger_type: TriggerType) -> Self {
        self.trigger_type = Some(trigger_type);
        self
    }

    #[must_use]
    pub fn limit_offset(mut self, limit_offset: Decimal) -> Self {
        self.limit_offset = Some(limit_offset);
        self
    }

    #[must_use]
    pub fn trailing_offset(mut self, trailing_offset: Decimal) -> Self {
        self.trailing_offset = Some(trailing_offset);
        self
    }

    #[must_use]
    pub fn trailing_offset_type(mut self, trailing_offset_type: TrailingOffsetType) -> Self {
        self.trailing_offset_type = Some(trailing_offset_type);
        self
    }

    #[must_use]
    pub fn activation_price(mut self, activation_price: Price) -> Self {
        self.activation_price = Some(activation_price);
        self
    }

    #[must_use]
    pub fn time_in_force(mut self, time_in_force: TimeInForce) -> Self {
        self.time_in_force = time_in_force;
        self
    }

    #[must_use]
    pub fn expire_time(mut self, expire_time: UnixNanos) -> Self {
        self.expire_time = Some(expire_time);
        self
    }

    #[must_use]
    pub fn post_only(mut self, post_only: bool) -> Self {
        self.post_only = post_only;
        self
    }

    #[must_use]
    pub fn reduce_only(mut self, reduce_only: bool) -> Self {
        self.reduce_only = reduce_only;
        self
    }

    #[must_use]
    pub fn quote_quantity(mut self, quote_quantity: bool) -> Self {
        self.quote_quantity = quote_quantity;
        self
    }

    #[must_use]
    pub fn display_qty(mut self, display_qty: Quantity) -> Self {
        self.display_qty = Some(display_qty);
        self
    }

    #[must_use]
    pub fn emulation_trigger(mut self, emulation_trigger: TriggerType) -> Self {
        self.emulation_trigger = Some(emulation_trigger);
        self
    }

    #[must_use]
    pub fn trigger_instrument_id(mut self, trigger_instrument_id: InstrumentId) -> Self {
        self.trigger_instrument_id = Some(trigger_instrument_id);
        self
    }

    #[must_use]
    pub fn contingency_type(mut self, contingency_type: ContingencyType) -> Self {
        self.contingency_type = Some(contingency_type);
        self
    }

    #[must_use]
    pub fn order_list_id(mut self, order_list_id: OrderListId) -> Self {
        self.order_list_id = Some(order_list_id);
        self
    }

    #[must_use]
    pub fn linked_order_ids(mut self, linked_order_ids: Vec<ClientOrderId>) -> Self {
        self.linked_order_ids = Some(linked_order_ids);
        self
    }

    #[must_use]
    pub fn parent_order_id(mut self, parent_order_id: ClientOrderId) -> Self {
        self.parent_order_id = Some(parent_order_id);
        self
    }

    #[must_use]
    pub fn exec_algorithm_id(mut self, exec_algorithm_id: ExecAlgorithmId) -> Self {
        self.exec_algorithm_id = Some(exec_algorithm_id);
        self
    }

    #[must_use]
    pub fn exec_algorithm_params(mut self, params: IndexMap<String, String>) -> Self {
        self.exec_algorithm_params = Some(params);
        self
    }

    #[must_use]
    pub fn exec_spawn_id(mut self, exec_spawn_id: ClientOrderId) -> Self {
        self.exec_spawn_id = Some(exec_spawn_id);
        self
    }

    #[must_use]
    pub fn tags(mut self, tags: Vec<String>) -> Self {
        self.tags = Some(tags);
        self
    }

    #[must_use]
    pub fn ts_init(mut self, ts_init: UnixNanos) -> Self {
        self.ts_init = ts_init;
        self
    }

    /// The initializing event for the configured order
    #[must_use]
    pub fn build_initialized(self) -> OrderInitialized {
        OrderInitialized {
            header: OrderEventHeader::new(
                self.trader_id,
                self.strategy_id,
                self.instrument_id,
                self.client_order_id,
                self.ts_init,
                self.ts_init,
            ),
            order_side: self.side,
            order_type: self.order_type,
            quantity: self.quantity,
            time_in_force: self.time_in_force,
            post_only: self.post_only,
            reduce_only: self.reduce_only,
            quote_quantity: self.quote_quantity,
            price: self.price,
            trigger_price: self.trigger_price,
            trigger_type: self.trigger_type,
            limit_offset: self.limit_offset,
            trailing_offset: self.trailing_offset,
            trailing_offset_type: self.trailing_offset_type,
            activation_price: self.activation_price,
            expire_time: self.expire_time,
            display_qty: self.display_qty,
            emulation_trigger: self.emulation_trigger,
            trigger_instrument_id: self.trigger_instrument_id,
            contingency_type: self.contingency_type,
            order_list_id: self.order_list_id,
            linked_order_ids: self.linked_order_ids,
            parent_order_id: self.parent_order_id,
            exec_algorithm_id: self.exec_algorithm_id,
            exec_algorithm_params: self.exec_algorithm_params,
            exec_spawn_id: self.exec_spawn_id,
            tags: self.tags,
        }
    }

    /// Builds the order
    ///
    /// # Errors
    ///
    /// Returns any validation error from [`OrderAny::new`].
    pub fn build(self) -> OmsResult<OrderAny> {
        OrderAny::new(self.build_initialized())
    }
}
