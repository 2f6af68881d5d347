//! Order submissions passing through on their way to execution
//!
//! Orders sized in quote currency are converted to base units at the latest trade (or
//! the touch on the order's side) before they are forwarded. An order that cannot be
//! converted or forwarded is denied locally and the denial is published to its strategy.

use common::{ClientOrderId, ContingencyType, Quantity};
use model::instruments::{Instrument, InstrumentAny};
use oms::{OrderAny, OrderDenied, OrderEventAny, OrderList};
use tracing::{debug, error, info, warn};

use crate::{
    engine::DataEngine,
    messages::{BusMessage, SubmitOrder, SubmitOrderList, TradingCommand},
    topics::{EXEC_ENGINE_EXECUTE, order_events_topic},
};

impl DataEngine {
    /// Converts and forwards a single order
    pub fn handle_submit_order(&mut self, command: SubmitOrder) {
        let client_order_id = command.order.client_order_id;
        let instrument_id = command.order.instrument_id;
        self.cache_orders(std::slice::from_ref(&command.order));

        let Some(instrument) = self.cache().read().instrument(&instrument_id).cloned() else {
            warn!(%instrument_id, %client_order_id, "Cannot submit order, instrument not found");
            self.deny_order(&client_order_id, &format!("instrument-not-found {instrument_id}"));
            return;
        };

        if self.needs_conversion(&instrument, &command.order) {
            match self.base_quantity(&instrument, &command.order) {
                Ok(base) => self.set_order_base_qty(&client_order_id, base),
                Err(reason) => {
                    self.deny_order(&client_order_id, &reason);
                    return;
                }
            }
        }

        let order = self.cached_order(command.order);
        let command = SubmitOrder { order, ..command };
        let message = BusMessage::Trading(TradingCommand::SubmitOrder(Box::new(command)));
        match self.bus().send(EXEC_ENGINE_EXECUTE, message) {
            Ok(()) => debug!(%client_order_id, "Order forwarded"),
            Err(e) => {
                self.deny_order(&client_order_id, &format!("failed-to-submit-order-to-client: {e}"));
            }
        }
    }

    /// Converts and forwards an order list. Every order is denied if any conversion fails.
    pub fn handle_submit_order_list(&mut self, command: SubmitOrderList) {
        let instrument_id = command.order_list.instrument_id;
        let list_id = command.order_list.id;
        self.cache_orders(&command.order_list.orders);

        let Some(instrument) = self.cache().read().instrument(&instrument_id).cloned() else {
            warn!(%instrument_id, %list_id, "Cannot submit order list, instrument not found");
            self.deny_order_list(
                &command.order_list,
                &format!("instrument-not-found {instrument_id}"),
            );
            return;
        };

        let conversions: Result<Vec<(ClientOrderId, Quantity)>, String> = command
            .order_list
            .orders
            .iter()
            .filter(|order| self.needs_conversion(&instrument, order))
            .map(|order| {
                self.base_quantity(&instrument, order)
                    .map(|base| (order.client_order_id, base))
            })
            .collect();
        match conversions {
            Ok(conversions) => {
                for (client_order_id, base) in conversions {
                    self.set_order_base_qty(&client_order_id, base);
                }
            }
            Err(reason) => {
                self.deny_order_list(&command.order_list, &reason);
                return;
            }
        }

        let orders = command
            .order_list
            .orders
            .iter()
            .map(|order| self.cached_order(order.clone()))
            .collect();
        let order_list = OrderList {
            orders,
            ..command.order_list
        };
        let command = SubmitOrderList {
            order_list,
            ..command
        };
        let message = BusMessage::Trading(TradingCommand::SubmitOrderList(Box::new(command.clone())));
        match self.bus().send(EXEC_ENGINE_EXECUTE, message) {
            Ok(()) => debug!(%list_id, "Order list forwarded"),
            Err(e) => self.deny_order_list(
                &command.order_list,
                &format!("failed-to-submit-order-list-to-client: {e}"),
            ),
        }
    }

    fn cache_orders(&self, orders: &[OrderAny]) {
        let mut cache = self.cache().write();
        for order in orders {
            if cache.order(&order.client_order_id).is_some() {
                continue;
            }
            if let Err(e) = cache.add_order(order.clone()) {
                error!(client_order_id = %order.client_order_id, error = %e, "Failed to cache order");
            }
        }
    }

    fn cached_order(&self, order: OrderAny) -> OrderAny {
        self.cache()
            .read()
            .order(&order.client_order_id)
            .cloned()
            .unwrap_or(order)
    }

    fn needs_conversion(&self, instrument: &InstrumentAny, order: &OrderAny) -> bool {
        self.config().convert_quote_qty_to_base && !instrument.is_inverse() && order.is_quote_quantity()
    }

    fn base_quantity(&self, instrument: &InstrumentAny, order: &OrderAny) -> Result<Quantity, String> {
        let price = self
            .cache()
            .read()
            .conversion_price(&order.instrument_id, order.side);
        let Some(price) = price else {
            return Err(format!("no-price-to-convert-quote-qty {}", order.instrument_id));
        };
        instrument
            .get_base_quantity(order.quantity(), price)
            .map_err(|e| format!("failed-to-convert-quote-qty {e}"))
    }

    /// Sets the base quantity on a cached order, and on the children of an OTO parent
    fn set_order_base_qty(&self, client_order_id: &ClientOrderId, base: Quantity) {
        let mut cache = self.cache().write();
        let Some(order) = cache.order_mut(client_order_id) else {
            return;
        };
        if !order.is_quote_quantity() {
            // Converted with its parent
            return;
        }

        let original = order.quantity();
        order.convert_quote_quantity(base);
        info!(%client_order_id, quote_quantity = %original, base_quantity = %base, "Set base quantity");

        if order.contingency_type != Some(ContingencyType::Oto) {
            return;
        }
        let children = order.linked_order_ids.clone().unwrap_or_default();
        for child_id in children {
            let Some(child) = cache.order_mut(&child_id) else {
                warn!(%client_order_id, %child_id, "Linked order not cached");
                continue;
            };
            if child.quantity() != original {
                warn!(
                    %child_id,
                    child_quantity = %child.quantity(),
                    parent_quantity = %original,
                    "Linked order quantity differs from parent"
                );
            }
            if child.is_quote_quantity() {
                child.convert_quote_quantity(base);
                debug!(%child_id, base_quantity = %base, "Set base quantity from parent");
            }
        }
    }

    fn deny_order_list(&self, order_list: &OrderList, reason: &str) {
        for order in &order_list.orders {
            self.deny_order(&order.client_order_id, reason);
        }
    }

    /// Denies a cached order and publishes the denial to its strategy
    fn deny_order(&self, client_order_id: &ClientOrderId, reason: &str) {
        let ts_now = self.clock().timestamp_ns();
        let denied = {
            let cache = self.cache().read();
            let Some(order) = cache.order(client_order_id) else {
                error!(%client_order_id, %reason, "Cannot deny order, not cached");
                return;
            };
            (
                order.strategy_id,
                OrderEventAny::Denied(OrderDenied::new(order.event_header(ts_now, ts_now), reason)),
            )
        };
        let (strategy_id, event) = denied;
        warn!(%client_order_id, %reason, "Order denied");

        if let Err(e) = self.cache().write().update_order(event.clone()) {
            error!(%client_order_id, error = %e, "Failed to apply denial");
        }
        self.bus()
            .publish(&order_events_topic(&strategy_id), BusMessage::OrderEvent(event));
    }
}
