//! Local emulation of order types and contingencies
//!
//! The [`OrderEmulator`] holds orders whose `emulation_trigger` is set inside one
//! [`OrderMatchingCore`] per trigger instrument. Quotes and trades move the cores; when
//! an order's condition is met it is transformed into the plain order the venue
//! understands, marked `Released` and queued for submission. The emulator also keeps the
//! members of contingent groups so fills and cancels on one order reach the others:
//!
//! * OTO: a parent fill releases its children sized to the filled quantity
//! * OCO: a fill or cancel on one order cancels the rest of the group
//! * OUO: a partial fill shrinks the rest of the group to the remaining quantity, and a
//!   full fill or cancel cancels them
//!
//! Nothing is sent anywhere directly. Every effect is queued as an [`EmulatorOutput`]
//! and collected with [`OrderEmulator::drain_outputs`].

use std::sync::Arc;

use common::{
    ClientOrderId, Clock, ContingencyType, InstrumentId, OrderSide, OrderStatus, OrderType, Price,
    Quantity, TriggerType,
};
use indexmap::IndexMap;
use model::{
    data::{QuoteTick, TradeTick},
    instruments::Instrument,
};
use oms::{OrderAny, OrderCanceled, OrderEmulated, OrderEventAny, OrderList, OrderReleased, OrderUpdated};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, error, info, trace, warn};

use crate::{
    error::{EngineError, EngineResult},
    matching_core::{OrderMatchingCore, PassiveOrder},
    trailing::{is_activation_reached, trailing_stop_calculate},
};

/// Work the emulator hands to the execution side
#[derive(Clone, Debug, PartialEq)]
pub enum EmulatorOutput {
    /// Event generated locally, already applied to the emulator's copy of the order
    Event(OrderEventAny),
    /// Order to send to its venue
    Submit(Box<OrderAny>),
    /// Cancel an order working at the venue
    CancelAtVenue(ClientOrderId),
    /// Amend an order working at the venue
    ModifyAtVenue {
        /// Order to amend
        client_order_id: ClientOrderId,
        /// New quantity
        quantity: Option<Quantity>,
        /// New limit price
        price: Option<Price>,
        /// New trigger price
        trigger_price: Option<Price>,
    },
}

/// Holds emulated orders and releases them when their conditions are met
pub struct OrderEmulator {
    clock: Arc<dyn Clock>,
    matching_cores: FxHashMap<InstrumentId, OrderMatchingCore>,
    orders: IndexMap<ClientOrderId, OrderAny>,
    subscribed_quotes: FxHashSet<InstrumentId>,
    subscribed_trades: FxHashSet<InstrumentId>,
    outputs: Vec<EmulatorOutput>,
}

impl std::fmt::Debug for OrderEmulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderEmulator")
            .field("matching_cores", &self.matching_cores.len())
            .field("orders", &self.orders.len())
            .field("pending_outputs", &self.outputs.len())
            .finish()
    }
}

impl OrderEmulator {
    /// Creates an emulator with no matching cores
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            matching_cores: FxHashMap::default(),
            orders: IndexMap::new(),
            subscribed_quotes: FxHashSet::default(),
            subscribed_trades: FxHashSet::default(),
            outputs: Vec::new(),
        }
    }

    /// Creates the matching core for an instrument, keeping an existing one
    pub fn create_matching_core(
        &mut self,
        instrument_id: InstrumentId,
        price_increment: Price,
    ) -> &mut OrderMatchingCore {
        self.matching_cores.entry(instrument_id).or_insert_with(|| {
            debug!(%instrument_id, %price_increment, "Creating matching core");
            OrderMatchingCore::new(instrument_id, price_increment)
        })
    }

    /// Creates the matching core for `instrument`
    pub fn register_instrument<I: Instrument>(&mut self, instrument: &I) {
        self.create_matching_core(instrument.id(), instrument.price_increment());
    }

    #[must_use]
    pub fn get_matching_core(&self, instrument_id: &InstrumentId) -> Option<&OrderMatchingCore> {
        self.matching_cores.get(instrument_id)
    }

    /// The emulator's copy of an order
    #[must_use]
    pub fn order(&self, client_order_id: &ClientOrderId) -> Option<&OrderAny> {
        self.orders.get(client_order_id)
    }

    /// Orders currently held in a matching core
    #[must_use]
    pub fn orders_emulated(&self) -> Vec<&OrderAny> {
        self.orders
            .values()
            .filter(|o| o.status() == OrderStatus::Emulated)
            .collect()
    }

    /// Instruments whose quotes drive emulated orders
    #[must_use]
    pub fn subscribed_quotes(&self) -> Vec<InstrumentId> {
        self.subscribed_quotes.iter().copied().collect()
    }

    /// Instruments whose trades drive emulated orders
    #[must_use]
    pub fn subscribed_trades(&self) -> Vec<InstrumentId> {
        self.subscribed_trades.iter().copied().collect()
    }

    /// Takes every queued output in the order it was produced
    pub fn drain_outputs(&mut self) -> Vec<EmulatorOutput> {
        std::mem::take(&mut self.outputs)
    }

    /// Forgets all orders, cores and subscriptions
    pub fn reset(&mut self) {
        self.matching_cores.clear();
        self.orders.clear();
        self.subscribed_quotes.clear();
        self.subscribed_trades.clear();
        self.outputs.clear();
    }

    // -- COMMANDS --------------------------------------------------------------------------------

    /// Takes ownership of an order. Orders without an emulation trigger are queued
    /// for submission straight away and only tracked for their contingencies.
    ///
    /// # Errors
    ///
    /// Returns an error if the order cannot be emulated; it is canceled locally first.
    pub fn submit_order(&mut self, order: OrderAny) -> EngineResult<()> {
        let client_order_id = order.client_order_id;
        let emulated = order.emulation_trigger.is_some();
        self.orders.insert(client_order_id, order);
        if emulated {
            self.emulate(client_order_id)
        } else {
            self.queue_submit(client_order_id);
            Ok(())
        }
    }

    /// Takes ownership of a contingent list. OTO children wait for their parent's fill.
    ///
    /// # Errors
    ///
    /// Returns the first emulation error; the other orders are still processed.
    pub fn submit_order_list(&mut self, list: OrderList) -> EngineResult<()> {
        let ids: Vec<ClientOrderId> = list.orders.iter().map(|o| o.client_order_id).collect();
        for order in list.orders {
            self.orders.insert(order.client_order_id, order);
        }

        let mut result = Ok(());
        for client_order_id in ids {
            let Some(order) = self.orders.get(&client_order_id) else {
                continue;
            };
            if self.awaits_oto_parent(order) {
                debug!(%client_order_id, "Holding OTO child until parent fills");
                continue;
            }
            let outcome = if order.emulation_trigger.is_some() {
                self.emulate(client_order_id)
            } else {
                self.queue_submit(client_order_id);
                Ok(())
            };
            if let Err(e) = outcome {
                error!(%client_order_id, error = %e, "Cannot handle order in list");
                if result.is_ok() {
                    result = Err(e);
                }
            }
        }
        result
    }

    /// Amends an order. Held orders are updated locally and re-matched; orders at
    /// the venue get a modify request.
    ///
    /// # Errors
    ///
    /// Returns an error if the order is unknown or the update is invalid.
    pub fn modify_order(
        &mut self,
        client_order_id: ClientOrderId,
        quantity: Option<Quantity>,
        price: Option<Price>,
        trigger_price: Option<Price>,
    ) -> EngineResult<()> {
        let order = self
            .orders
            .get(&client_order_id)
            .ok_or(EngineError::UnknownOrder { client_order_id })?;
        if !is_held_locally(order) {
            if !order.is_closed() {
                self.outputs.push(EmulatorOutput::ModifyAtVenue {
                    client_order_id,
                    quantity,
                    price,
                    trigger_price,
                });
            }
            return Ok(());
        }

        self.update_local(client_order_id, quantity, price, trigger_price)?;
        let trigger_instrument_id = self.trigger_instrument_id(client_order_id)?;
        self.rematch(client_order_id, trigger_instrument_id);
        Ok(())
    }

    /// Cancels an order, locally when it is still held and at the venue otherwise
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownOrder`] if the order is not managed here.
    pub fn cancel_order(&mut self, client_order_id: ClientOrderId) -> EngineResult<()> {
        let order = self
            .orders
            .get(&client_order_id)
            .ok_or(EngineError::UnknownOrder { client_order_id })?;
        if is_held_locally(order) {
            self.cancel_local(client_order_id);
        } else if !order.is_closed() && !order.is_pending_cancel() {
            self.outputs
                .push(EmulatorOutput::CancelAtVenue(client_order_id));
        } else {
            debug!(%client_order_id, status = %order.status(), "Order already closing");
        }
        Ok(())
    }

    /// Cancels every held order for an instrument, optionally on one side only
    pub fn cancel_all_orders(&mut self, instrument_id: InstrumentId, side: OrderSide) {
        let Some(core) = self.matching_cores.get(&instrument_id) else {
            return;
        };
        let ids: Vec<ClientOrderId> = match side {
            OrderSide::Buy => core.get_orders_bid().iter().map(|o| o.client_order_id).collect(),
            OrderSide::Sell => core.get_orders_ask().iter().map(|o| o.client_order_id).collect(),
            OrderSide::NoOrderSide => core
                .get_orders()
                .iter()
                .map(|o| o.client_order_id)
                .collect(),
        };
        for client_order_id in ids {
            self.cancel_local(client_order_id);
        }
    }

    // -- MARKET DATA -----------------------------------------------------------------------------

    pub fn on_quote_tick(&mut self, quote: &QuoteTick) {
        let Some(core) = self.matching_cores.get_mut(&quote.instrument_id) else {
            trace!(instrument_id = %quote.instrument_id, "No matching core for quote");
            return;
        };
        core.set_bid_raw(quote.bid_price);
        core.set_ask_raw(quote.ask_price);
        self.iterate_orders(quote.instrument_id);
    }

    pub fn on_trade_tick(&mut self, trade: &TradeTick) {
        let Some(core) = self.matching_cores.get_mut(&trade.instrument_id) else {
            trace!(instrument_id = %trade.instrument_id, "No matching core for trade");
            return;
        };
        core.set_last_raw(trade.price);
        // Without a quote feed the trade price stands in for both sides
        if !self.subscribed_quotes.contains(&trade.instrument_id) {
            core.set_bid_raw(trade.price);
            core.set_ask_raw(trade.price);
        }
        self.iterate_orders(trade.instrument_id);
    }

    /// Feeds the top of a maintained order book
    pub fn on_book_top(
        &mut self,
        instrument_id: InstrumentId,
        best_bid: Option<Price>,
        best_ask: Option<Price>,
    ) {
        let Some(core) = self.matching_cores.get_mut(&instrument_id) else {
            trace!(%instrument_id, "No matching core for book update");
            return;
        };
        if let Some(bid) = best_bid {
            core.set_bid_raw(bid);
        }
        if let Some(ask) = best_ask {
            core.set_ask_raw(ask);
        }
        self.iterate_orders(instrument_id);
    }

    // -- ORDER EVENTS ----------------------------------------------------------------------------

    /// Applies an event produced elsewhere (venue or execution engine) to a managed
    /// order and handles its contingencies. Events the emulator produced itself are
    /// already applied and must not be fed back.
    pub fn on_event(&mut self, event: OrderEventAny) {
        let client_order_id = event.client_order_id();
        let Some(order) = self.orders.get_mut(&client_order_id) else {
            trace!(%client_order_id, event = event.name(), "Event for unmanaged order");
            return;
        };
        if let Err(e) = order.apply(event.clone()) {
            warn!(%client_order_id, error = %e, "Cannot apply order event");
            return;
        }

        if order.is_closed() {
            let trigger_instrument_id =
                order.trigger_instrument_id.unwrap_or(order.instrument_id);
            if let Some(core) = self.matching_cores.get_mut(&trigger_instrument_id) {
                let _ = core.delete_order(client_order_id);
            }
        }

        match event {
            OrderEventAny::Filled(_) => self.handle_fill(client_order_id),
            OrderEventAny::Canceled(_)
            | OrderEventAny::Expired(_)
            | OrderEventAny::Rejected(_)
            | OrderEventAny::Denied(_) => self.handle_closed(client_order_id),
            _ => {}
        }
    }

    // -- INTERNAL --------------------------------------------------------------------------------

    fn emulate(&mut self, client_order_id: ClientOrderId) -> EngineResult<()> {
        let order = self
            .orders
            .get(&client_order_id)
            .ok_or(EngineError::UnknownOrder { client_order_id })?;
        let emulation_trigger = order.emulation_trigger.unwrap_or(TriggerType::NoTrigger);
        if !matches!(
            emulation_trigger,
            TriggerType::Default | TriggerType::BidAsk | TriggerType::LastPrice
        ) {
            return Err(self.refuse(
                client_order_id,
                format!("emulation trigger {emulation_trigger} not supported"),
            ));
        }
        if order.order_type() == OrderType::Market {
            return Err(self.refuse(client_order_id, "market orders cannot be emulated".into()));
        }

        let trigger_instrument_id = order.trigger_instrument_id.unwrap_or(order.instrument_id);
        if !self.matching_cores.contains_key(&trigger_instrument_id) {
            self.cancel_local(client_order_id);
            return Err(EngineError::NoMatchingCore {
                instrument_id: trigger_instrument_id,
            });
        }
        match emulation_trigger {
            TriggerType::LastPrice => self.subscribed_trades.insert(trigger_instrument_id),
            _ => self.subscribed_quotes.insert(trigger_instrument_id),
        };

        if order.is_trailing() {
            self.update_trailing_stop(client_order_id, trigger_instrument_id);
            let order = &self.orders[&client_order_id];
            let waits_for_activation = order
                .trailing_offset()
                .is_some_and(|t| t.activation_price.is_some() && !t.is_activated);
            if order.trigger_price().is_none() && !waits_for_activation {
                return Err(self.refuse(
                    client_order_id,
                    "trailing stop has no trigger price and no market data".into(),
                ));
            }
        }

        let passive = PassiveOrder::from_order(&self.orders[&client_order_id])?;
        let Some(core) = self.matching_cores.get_mut(&trigger_instrument_id) else {
            return Err(EngineError::NoMatchingCore {
                instrument_id: trigger_instrument_id,
            });
        };
        if let Some(action) = core.match_order(&passive, true) {
            debug!(%client_order_id, "Order marketable on submission");
            self.release(client_order_id, trigger_instrument_id, action.price());
            return Ok(());
        }
        core.add_order(passive)?;

        let ts = self.clock.timestamp_ns();
        let Some(order) = self.orders.get_mut(&client_order_id) else {
            return Err(EngineError::UnknownOrder { client_order_id });
        };
        if order.status() == OrderStatus::Initialized {
            let event = OrderEventAny::from(OrderEmulated {
                header: order.event_header(ts, ts),
            });
            order.apply(event.clone())?;
            self.outputs.push(EmulatorOutput::Event(event));
        }
        info!(%client_order_id, trigger_instrument_id = %trigger_instrument_id, "Emulating order");
        Ok(())
    }

    fn refuse(&mut self, client_order_id: ClientOrderId, reason: String) -> EngineError {
        error!(%client_order_id, %reason, "Cannot emulate order");
        self.cancel_local(client_order_id);
        EngineError::CannotEmulate {
            client_order_id,
            reason,
        }
    }

    fn iterate_orders(&mut self, instrument_id: InstrumentId) {
        let Some(core) = self.matching_cores.get(&instrument_id) else {
            return;
        };
        let trailing: Vec<ClientOrderId> = core
            .get_orders()
            .iter()
            .filter(|o| {
                matches!(
                    o.order_type,
                    OrderType::TrailingStopMarket | OrderType::TrailingStopLimit
                )
            })
            .map(|o| o.client_order_id)
            .collect();
        for client_order_id in trailing {
            self.update_trailing_stop(client_order_id, instrument_id);
        }

        let actions = match self.matching_cores.get_mut(&instrument_id) {
            Some(core) => core.iterate(),
            None => return,
        };
        for action in actions {
            self.release(action.client_order_id(), instrument_id, action.price());
        }
    }

    fn update_trailing_stop(&mut self, client_order_id: ClientOrderId, instrument_id: InstrumentId) {
        let Some(core) = self.matching_cores.get(&instrument_id) else {
            return;
        };
        let (bid, ask, last, price_increment) = (core.bid, core.ask, core.last, core.price_increment);
        let ts = self.clock.timestamp_ns();
        let Some(order) = self.orders.get_mut(&client_order_id) else {
            return;
        };
        if !is_activation_reached(order, bid, ask, last) {
            return;
        }
        if order.trailing_offset().is_some_and(|t| !t.is_activated) {
            order.activate_trailing();
            debug!(%client_order_id, "Trailing stop activated");
        }

        let (trigger_price, price) =
            match trailing_stop_calculate(price_increment, order, bid, ask, last) {
                Ok(update) => update,
                Err(e) => {
                    warn!(%client_order_id, error = %e, "Cannot calculate trailing stop update");
                    return;
                }
            };
        if trigger_price.is_some() || price.is_some() {
            let event = OrderEventAny::from(OrderUpdated {
                header: order.event_header(ts, ts),
                venue_order_id: order.venue_order_id(),
                account_id: order.account_id(),
                quantity: order.quantity(),
                price,
                trigger_price,
            });
            if let Err(e) = order.apply(event.clone()) {
                error!(%client_order_id, error = %e, "Cannot apply trailing stop update");
                return;
            }
            self.outputs.push(EmulatorOutput::Event(event));
        }

        if let Ok(passive) = PassiveOrder::from_order(order) {
            if let Some(core) = self.matching_cores.get_mut(&instrument_id) {
                if core.order_exists(client_order_id) {
                    let _ = core.update_order(passive);
                }
            }
        }
    }

    fn release(
        &mut self,
        client_order_id: ClientOrderId,
        instrument_id: InstrumentId,
        released_price: Price,
    ) {
        if let Some(core) = self.matching_cores.get_mut(&instrument_id) {
            let _ = core.delete_order(client_order_id);
        }
        let ts = self.clock.timestamp_ns();
        let Some(order) = self.orders.get_mut(&client_order_id) else {
            error!(%client_order_id, "Cannot release unknown order");
            return;
        };
        order.transform_for_release();
        let event = OrderEventAny::from(OrderReleased {
            header: order.event_header(ts, ts),
            released_price,
        });
        if let Err(e) = order.apply(event.clone()) {
            error!(%client_order_id, error = %e, "Cannot release order");
            return;
        }
        info!(%client_order_id, %released_price, order_type = %order.order_type(), "Releasing order");
        self.outputs.push(EmulatorOutput::Event(event));
        self.outputs
            .push(EmulatorOutput::Submit(Box::new(order.clone())));
    }

    fn cancel_local(&mut self, client_order_id: ClientOrderId) {
        let ts = self.clock.timestamp_ns();
        let Some(order) = self.orders.get_mut(&client_order_id) else {
            return;
        };
        let trigger_instrument_id = order.trigger_instrument_id.unwrap_or(order.instrument_id);
        if let Some(core) = self.matching_cores.get_mut(&trigger_instrument_id) {
            let _ = core.delete_order(client_order_id);
        }
        if order.is_closed() {
            return;
        }
        let event = OrderEventAny::from(OrderCanceled::new(
            order.event_header(ts, ts),
            order.venue_order_id(),
            order.account_id(),
        ));
        if let Err(e) = order.apply(event.clone()) {
            error!(%client_order_id, error = %e, "Cannot cancel order");
            return;
        }
        info!(%client_order_id, "Canceled order locally");
        self.outputs.push(EmulatorOutput::Event(event));
        self.handle_closed(client_order_id);
    }

    fn update_local(
        &mut self,
        client_order_id: ClientOrderId,
        quantity: Option<Quantity>,
        price: Option<Price>,
        trigger_price: Option<Price>,
    ) -> EngineResult<()> {
        let ts = self.clock.timestamp_ns();
        let order = self
            .orders
            .get_mut(&client_order_id)
            .ok_or(EngineError::UnknownOrder { client_order_id })?;
        let event = OrderEventAny::from(OrderUpdated {
            header: order.event_header(ts, ts),
            venue_order_id: order.venue_order_id(),
            account_id: order.account_id(),
            quantity: quantity.unwrap_or_else(|| order.quantity()),
            price,
            trigger_price,
        });
        order.apply(event.clone())?;
        self.outputs.push(EmulatorOutput::Event(event));
        Ok(())
    }

    // Re-evaluates a held order after an amendment
    fn rematch(&mut self, client_order_id: ClientOrderId, instrument_id: InstrumentId) {
        let Some(passive) = self
            .orders
            .get(&client_order_id)
            .and_then(|o| PassiveOrder::from_order(o).ok())
        else {
            return;
        };
        let Some(core) = self.matching_cores.get_mut(&instrument_id) else {
            return;
        };
        if !core.order_exists(client_order_id) {
            return;
        }
        let _ = core.update_order(passive);
        if let Some(action) = core.match_order(&passive, false) {
            self.release(client_order_id, instrument_id, action.price());
        }
    }

    fn modify_quantity(&mut self, client_order_id: ClientOrderId, quantity: Quantity) {
        let Some(order) = self.orders.get(&client_order_id) else {
            return;
        };
        if order.quantity() == quantity || order.is_closed() {
            return;
        }
        info!(%client_order_id, %quantity, "Updating contingent order quantity");
        if is_held_locally(order) {
            if let Err(e) = self.update_local(client_order_id, Some(quantity), None, None) {
                warn!(%client_order_id, error = %e, "Cannot update contingent order");
            }
        } else {
            self.outputs.push(EmulatorOutput::ModifyAtVenue {
                client_order_id,
                quantity: Some(quantity),
                price: None,
                trigger_price: None,
            });
        }
    }

    fn handle_fill(&mut self, client_order_id: ClientOrderId) {
        let Some(order) = self.orders.get(&client_order_id) else {
            return;
        };
        let linked = order.linked_order_ids.clone().unwrap_or_default();
        let filled_qty = order.filled_qty();
        let leaves_qty = order.leaves_qty();
        let position_id = order.position_id();
        let is_closed = order.is_closed();
        let contingency_type = order.contingency_type;

        match contingency_type {
            Some(ContingencyType::Oto) => {
                for child_id in linked {
                    let Some(child) = self.orders.get_mut(&child_id) else {
                        warn!(parent = %client_order_id, child = %child_id, "OTO child not found");
                        continue;
                    };
                    if child.position_id().is_none() && position_id.is_some() {
                        child.set_position_id(position_id);
                    }
                    if child.is_closed() {
                        continue;
                    }
                    let waiting = child.status() == OrderStatus::Initialized;
                    self.modify_quantity(child_id, filled_qty);
                    if waiting {
                        self.submit_contingent(child_id);
                    }
                }
            }
            Some(ContingencyType::Oco) => {
                for sibling_id in linked {
                    if sibling_id != client_order_id {
                        self.cancel_sibling(sibling_id);
                    }
                }
            }
            Some(ContingencyType::Ouo) => {
                for sibling_id in linked {
                    if sibling_id == client_order_id {
                        continue;
                    }
                    if is_closed {
                        self.cancel_sibling(sibling_id);
                    } else {
                        self.modify_quantity(sibling_id, leaves_qty);
                    }
                }
            }
            _ => {}
        }
    }

    fn handle_closed(&mut self, client_order_id: ClientOrderId) {
        let Some(order) = self.orders.get(&client_order_id) else {
            return;
        };
        let linked = order.linked_order_ids.clone().unwrap_or_default();
        let never_filled = order.filled_qty().is_zero();
        let contingency_type = order.contingency_type;
        match contingency_type {
            // Children of a parent that never filled are never released
            Some(ContingencyType::Oto) if never_filled => {
                for child_id in linked {
                    if self
                        .orders
                        .get(&child_id)
                        .is_some_and(|c| c.status() == OrderStatus::Initialized)
                    {
                        self.cancel_local(child_id);
                    }
                }
            }
            Some(ContingencyType::Oco | ContingencyType::Ouo) => {
                for sibling_id in linked {
                    if sibling_id != client_order_id {
                        self.cancel_sibling(sibling_id);
                    }
                }
            }
            _ => {}
        }
    }

    fn cancel_sibling(&mut self, client_order_id: ClientOrderId) {
        if let Err(e) = self.cancel_order(client_order_id) {
            warn!(%client_order_id, error = %e, "Cannot cancel contingent order");
        }
    }

    fn submit_contingent(&mut self, client_order_id: ClientOrderId) {
        let emulated = self
            .orders
            .get(&client_order_id)
            .is_some_and(|o| o.emulation_trigger.is_some());
        if emulated {
            if let Err(e) = self.emulate(client_order_id) {
                error!(%client_order_id, error = %e, "Cannot emulate contingent order");
            }
        } else {
            self.queue_submit(client_order_id);
        }
    }

    fn queue_submit(&mut self, client_order_id: ClientOrderId) {
        if let Some(order) = self.orders.get(&client_order_id) {
            debug!(%client_order_id, "Queueing order for submission");
            self.outputs
                .push(EmulatorOutput::Submit(Box::new(order.clone())));
        }
    }

    fn awaits_oto_parent(&self, order: &OrderAny) -> bool {
        order.parent_order_id.is_some_and(|parent_id| {
            self.orders.get(&parent_id).is_some_and(|parent| {
                parent.contingency_type == Some(ContingencyType::Oto)
                    && parent.filled_qty().is_zero()
            })
        })
    }

    fn trigger_instrument_id(&self, client_order_id: ClientOrderId) -> EngineResult<InstrumentId> {
        self.orders
            .get(&client_order_id)
            .map(|o| o.trigger_instrument_id.unwrap_or(o.instrument_id))
            .ok_or(EngineError::UnknownOrder { client_order_id })
    }
}

// Still owned by the emulator rather than the venue
fn is_held_locally(order: &OrderAny) -> bool {
    matches!(
        order.status(),
        OrderStatus::Initialized | OrderStatus::Emulated
    )
}
