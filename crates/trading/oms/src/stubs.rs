//! Event stubs that drive an order through its lifecycle in tests

use std::str::FromStr;

use common::{AccountId, LiquiditySide, Price, Quantity, TradeId, UnixNanos, VenueOrderId};

use crate::{
    error::OmsResult,
    events::{OrderAccepted, OrderFilled, OrderSubmitted},
    order::OrderAny,
};

/// Account used by every stub event
#[must_use]
pub fn account_id() -> AccountId {
    AccountId::from("SIM-001")
}

/// Applies `OrderSubmitted`
pub fn submit(order: &mut OrderAny) {
    let ts = order.ts_last() + 1;
    let event = OrderSubmitted {
        header: order.event_header(ts, ts),
        account_id: account_id(),
    };
    order.apply(event.into()).expect("submit");
}

/// Applies `OrderAccepted` with venue order id `V-1`
pub fn accept(order: &mut OrderAny) {
    let ts = order.ts_last() + 1;
    let event = OrderAccepted {
        header: order.event_header(ts, ts),
        venue_order_id: VenueOrderId::from("V-1"),
        account_id: account_id(),
    };
    order.apply(event.into()).expect("accept");
}

/// Fill event for `order` at `last_px` without a commission
#[must_use]
pub fn filled_event(order: &OrderAny, trade_id: &str, last_qty: Quantity, last_px: &str) -> OrderFilled {
    let ts = order.ts_last() + 1;
    OrderFilled {
        header: order.event_header(ts, ts),
        venue_order_id: order
            .venue_order_id()
            .unwrap_or_else(|| VenueOrderId::from("V-1")),
        account_id: account_id(),
        trade_id: TradeId::from(trade_id),
        position_id: None,
        order_side: order.side,
        order_type: order.order_type(),
        last_qty,
        last_px: Price::from_str(last_px).expect("price"),
        currency: common::Currency::USD(),
        liquidity_side: LiquiditySide::Taker,
        commission: None,
    }
}

/// Applies a fill, returning the order's verdict
///
/// # Errors
///
/// Propagates the error from [`OrderAny::apply`].
pub fn fill(order: &mut OrderAny, trade_id: &str, last_qty: Quantity, last_px: &str) -> OmsResult<()> {
    let event = filled_event(order, trade_id, last_qty, last_px);
    order.apply(event.into())
}

/// Timestamp helper for hand-built events
#[must_use]
pub fn ts(nanos: u64) -> UnixNanos {
    UnixNanos::from(nanos)
}
