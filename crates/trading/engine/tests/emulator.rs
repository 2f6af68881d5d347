//! Order emulator scenarios: release, trailing and contingencies

use std::{str::FromStr, sync::Arc};

use common::{
    ClientOrderId, ContingencyType, InstrumentId, OrderListId, OrderSide, OrderStatus, OrderType,
    PositionId, Price, Quantity, TestClock, TradeId, TriggerType, UnixNanos, VenueOrderId,
    AggressorSide, TrailingOffsetType,
};
use engine::{EmulatorOutput, EngineError, OrderEmulator};
use model::{
    data::{QuoteTick, TradeTick},
    instruments::stubs::audusd_sim,
};
use oms::{
    OrderAccepted, OrderAny, OrderEventAny, OrderList, OrderSubmitted, OrderTestBuilder,
    stubs::{account_id, filled_event},
};
use rstest::{fixture, rstest};
use rust_decimal::Decimal;

fn px(value: &str) -> Price {
    Price::from_str(value).unwrap()
}

fn audusd() -> InstrumentId {
    InstrumentId::from("AUD/USD.SIM")
}

fn coid(value: &str) -> ClientOrderId {
    ClientOrderId::from(value)
}

fn quote(bid: &str, ask: &str) -> QuoteTick {
    QuoteTick::new(
        audusd(),
        px(bid),
        px(ask),
        Quantity::from(1_000_000),
        Quantity::from(1_000_000),
        UnixNanos::default(),
        UnixNanos::default(),
    )
    .unwrap()
}

fn trade(price: &str) -> TradeTick {
    TradeTick {
        instrument_id: audusd(),
        price: px(price),
        size: Quantity::from(10_000),
        aggressor_side: AggressorSide::Buyer,
        trade_id: TradeId::from("T-1"),
        ts_event: UnixNanos::default(),
        ts_init: UnixNanos::default(),
    }
}

fn event_names(outputs: &[EmulatorOutput]) -> Vec<&'static str> {
    outputs
        .iter()
        .map(|output| match output {
            EmulatorOutput::Event(event) => event.name(),
            EmulatorOutput::Submit(_) => "Submit",
            EmulatorOutput::CancelAtVenue(_) => "CancelAtVenue",
            EmulatorOutput::ModifyAtVenue { .. } => "ModifyAtVenue",
        })
        .collect()
}

fn submitted_and_accepted(order: &OrderAny, venue_order_id: &str) -> [OrderEventAny; 2] {
    let ts = UnixNanos::from(1);
    [
        OrderSubmitted {
            header: order.event_header(ts, ts),
            account_id: account_id(),
        }
        .into(),
        OrderAccepted {
            header: order.event_header(ts, ts),
            venue_order_id: VenueOrderId::from(venue_order_id),
            account_id: account_id(),
        }
        .into(),
    ]
}

// Drives a plain order through submission and acceptance at the venue
fn open_at_venue(emulator: &mut OrderEmulator, id: &str) {
    let order = emulator.order(&coid(id)).unwrap().clone();
    for event in submitted_and_accepted(&order, &format!("V-{id}")) {
        emulator.on_event(event);
    }
    assert_eq!(emulator.order(&coid(id)).unwrap().status(), OrderStatus::Accepted);
}

fn fill(emulator: &mut OrderEmulator, id: &str, qty: u64, position_id: Option<&str>) {
    let order = emulator.order(&coid(id)).unwrap().clone();
    let mut event = filled_event(&order, &format!("T-{id}-{qty}"), Quantity::from(qty), "1.00000");
    event.position_id = position_id.map(PositionId::from);
    emulator.on_event(event.into());
}

#[fixture]
fn emulator() -> OrderEmulator {
    let mut emulator = OrderEmulator::new(Arc::new(TestClock::new()));
    emulator.register_instrument(&audusd_sim());
    emulator
}

#[rstest]
fn test_stop_market_released_when_ask_crosses(mut emulator: OrderEmulator) {
    let order = OrderTestBuilder::new(OrderType::StopMarket)
        .side(OrderSide::Buy)
        .trigger_price(px("1.00100"))
        .emulation_trigger(TriggerType::BidAsk)
        .build()
        .unwrap();

    emulator.submit_order(order).unwrap();
    assert_eq!(event_names(&emulator.drain_outputs()), vec!["OrderEmulated"]);
    assert_eq!(emulator.orders_emulated().len(), 1);
    assert_eq!(emulator.subscribed_quotes(), vec![audusd()]);

    emulator.on_quote_tick(&quote("1.00080", "1.00090"));
    assert!(emulator.drain_outputs().is_empty());

    emulator.on_quote_tick(&quote("1.00095", "1.00100"));
    let outputs = emulator.drain_outputs();
    assert_eq!(event_names(&outputs), vec!["OrderReleased", "Submit"]);

    let EmulatorOutput::Submit(released) = &outputs[1] else {
        panic!("expected submit");
    };
    assert_eq!(released.order_type(), OrderType::Market);
    assert_eq!(released.status(), OrderStatus::Released);
    assert!(released.emulation_trigger.is_none());
    assert!(emulator.get_matching_core(&audusd()).unwrap().is_empty());
}

#[rstest]
fn test_stop_limit_released_as_limit(mut emulator: OrderEmulator) {
    let order = OrderTestBuilder::new(OrderType::StopLimit)
        .side(OrderSide::Sell)
        .price(px("0.99900"))
        .trigger_price(px("1.00000"))
        .emulation_trigger(TriggerType::Default)
        .build()
        .unwrap();
    emulator.submit_order(order).unwrap();
    emulator.drain_outputs();

    emulator.on_quote_tick(&quote("0.99990", "1.00010"));

    let outputs = emulator.drain_outputs();
    let Some(EmulatorOutput::Submit(released)) = outputs.last() else {
        panic!("expected submit");
    };
    assert_eq!(released.order_type(), OrderType::Limit);
    assert_eq!(released.price(), Some(px("0.99900")));
}

#[rstest]
fn test_marketable_limit_released_on_submission(mut emulator: OrderEmulator) {
    emulator.on_quote_tick(&quote("0.99990", "1.00000"));
    let order = OrderTestBuilder::new(OrderType::Limit)
        .side(OrderSide::Buy)
        .price(px("1.00010"))
        .emulation_trigger(TriggerType::BidAsk)
        .build()
        .unwrap();

    emulator.submit_order(order).unwrap();

    assert_eq!(
        event_names(&emulator.drain_outputs()),
        vec!["OrderReleased", "Submit"]
    );
}

#[rstest]
fn test_unsupported_emulation_trigger_cancels(mut emulator: OrderEmulator) {
    let order = OrderTestBuilder::new(OrderType::StopMarket)
        .trigger_price(px("1.00100"))
        .emulation_trigger(TriggerType::MarkPrice)
        .build()
        .unwrap();

    let result = emulator.submit_order(order);

    assert!(matches!(result, Err(EngineError::CannotEmulate { .. })));
    assert_eq!(event_names(&emulator.drain_outputs()), vec!["OrderCanceled"]);
    assert_eq!(emulator.order(&coid("O-1")).unwrap().status(), OrderStatus::Canceled);
}

#[rstest]
fn test_missing_matching_core(mut emulator: OrderEmulator) {
    let order = OrderTestBuilder::new(OrderType::StopMarket)
        .trigger_price(px("1.00100"))
        .emulation_trigger(TriggerType::BidAsk)
        .trigger_instrument_id(InstrumentId::from("EUR/USD.SIM"))
        .build()
        .unwrap();

    let result = emulator.submit_order(order);

    assert!(matches!(result, Err(EngineError::NoMatchingCore { .. })));
}

#[rstest]
fn test_cancel_emulated_order(mut emulator: OrderEmulator) {
    let order = OrderTestBuilder::new(OrderType::StopMarket)
        .trigger_price(px("1.00100"))
        .emulation_trigger(TriggerType::BidAsk)
        .build()
        .unwrap();
    emulator.submit_order(order).unwrap();
    emulator.drain_outputs();

    emulator.cancel_order(coid("O-1")).unwrap();

    assert_eq!(event_names(&emulator.drain_outputs()), vec!["OrderCanceled"]);
    assert!(emulator.get_matching_core(&audusd()).unwrap().is_empty());
}

#[rstest]
fn test_modify_held_order_rematches(mut emulator: OrderEmulator) {
    emulator.on_quote_tick(&quote("1.00000", "1.00010"));
    let order = OrderTestBuilder::new(OrderType::StopMarket)
        .side(OrderSide::Buy)
        .trigger_price(px("1.00100"))
        .emulation_trigger(TriggerType::BidAsk)
        .build()
        .unwrap();
    emulator.submit_order(order).unwrap();
    emulator.drain_outputs();

    emulator
        .modify_order(coid("O-1"), None, None, Some(px("1.00005")))
        .unwrap();

    assert_eq!(
        event_names(&emulator.drain_outputs()),
        vec!["OrderUpdated", "OrderReleased", "Submit"]
    );
}

#[rstest]
fn test_trailing_stop_follows_trades_then_releases(mut emulator: OrderEmulator) {
    emulator.on_trade_tick(&trade("1.00000"));
    let order = OrderTestBuilder::new(OrderType::TrailingStopMarket)
        .side(OrderSide::Sell)
        .trigger_type(TriggerType::LastPrice)
        .trailing_offset_type(TrailingOffsetType::Price)
        .trailing_offset(Decimal::from_str("0.00010").unwrap())
        .emulation_trigger(TriggerType::LastPrice)
        .build()
        .unwrap();

    emulator.submit_order(order).unwrap();
    assert_eq!(
        event_names(&emulator.drain_outputs()),
        vec!["OrderUpdated", "OrderEmulated"]
    );
    assert_eq!(
        emulator.order(&coid("O-1")).unwrap().trigger_price(),
        Some(px("0.99990"))
    );

    emulator.on_trade_tick(&trade("1.00050"));
    assert_eq!(event_names(&emulator.drain_outputs()), vec!["OrderUpdated"]);
    assert_eq!(
        emulator.order(&coid("O-1")).unwrap().trigger_price(),
        Some(px("1.00040"))
    );

    // Falling prices never loosen a sell trailing stop
    emulator.on_trade_tick(&trade("1.00045"));
    assert!(emulator.drain_outputs().is_empty());

    emulator.on_trade_tick(&trade("1.00040"));
    assert_eq!(
        event_names(&emulator.drain_outputs()),
        vec!["OrderReleased", "Submit"]
    );
}

#[rstest]
fn test_trailing_stop_waits_for_activation(mut emulator: OrderEmulator) {
    emulator.on_trade_tick(&trade("1.00000"));
    let order = OrderTestBuilder::new(OrderType::TrailingStopMarket)
        .side(OrderSide::Sell)
        .trigger_type(TriggerType::LastPrice)
        .trailing_offset(Decimal::from_str("0.00010").unwrap())
        .activation_price(px("1.00100"))
        .emulation_trigger(TriggerType::LastPrice)
        .build()
        .unwrap();

    emulator.submit_order(order).unwrap();
    assert_eq!(event_names(&emulator.drain_outputs()), vec!["OrderEmulated"]);

    // Inactive orders ignore the market until the activation price trades
    emulator.on_trade_tick(&trade("0.99000"));
    assert!(emulator.drain_outputs().is_empty());

    emulator.on_trade_tick(&trade("1.00100"));
    let outputs = emulator.drain_outputs();
    assert_eq!(event_names(&outputs), vec!["OrderUpdated"]);
    let order = emulator.order(&coid("O-1")).unwrap();
    assert!(order.trailing_offset().unwrap().is_activated);
    assert_eq!(order.trigger_price(), Some(px("1.00090")));
}

fn linked_pair(contingency_type: ContingencyType) -> OrderList {
    let first = OrderTestBuilder::new(OrderType::Limit)
        .client_order_id(coid("O-1"))
        .side(OrderSide::Sell)
        .price(px("1.01000"))
        .contingency_type(contingency_type)
        .order_list_id(OrderListId::from("OL-1"))
        .linked_order_ids(vec![coid("O-2")])
        .build()
        .unwrap();
    let second = OrderTestBuilder::new(OrderType::Limit)
        .client_order_id(coid("O-2"))
        .side(OrderSide::Sell)
        .price(px("1.02000"))
        .contingency_type(contingency_type)
        .order_list_id(OrderListId::from("OL-1"))
        .linked_order_ids(vec![coid("O-1")])
        .build()
        .unwrap();
    OrderList::new(OrderListId::from("OL-1"), vec![first, second], UnixNanos::default()).unwrap()
}

#[rstest]
fn test_oco_fill_cancels_sibling(mut emulator: OrderEmulator) {
    emulator.submit_order_list(linked_pair(ContingencyType::Oco)).unwrap();
    assert_eq!(event_names(&emulator.drain_outputs()), vec!["Submit", "Submit"]);
    open_at_venue(&mut emulator, "O-1");
    open_at_venue(&mut emulator, "O-2");

    fill(&mut emulator, "O-1", 100_000, None);

    assert_eq!(
        emulator.drain_outputs(),
        vec![EmulatorOutput::CancelAtVenue(coid("O-2"))]
    );
}

#[rstest]
fn test_ouo_partial_fill_shrinks_sibling(mut emulator: OrderEmulator) {
    emulator.submit_order_list(linked_pair(ContingencyType::Ouo)).unwrap();
    emulator.drain_outputs();
    open_at_venue(&mut emulator, "O-1");
    open_at_venue(&mut emulator, "O-2");

    fill(&mut emulator, "O-1", 30_000, None);

    assert_eq!(
        emulator.drain_outputs(),
        vec![EmulatorOutput::ModifyAtVenue {
            client_order_id: coid("O-2"),
            quantity: Some(Quantity::from(70_000)),
            price: None,
            trigger_price: None,
        }]
    );

    fill(&mut emulator, "O-1", 70_000, None);
    assert_eq!(
        emulator.drain_outputs(),
        vec![EmulatorOutput::CancelAtVenue(coid("O-2"))]
    );
}

fn bracket() -> OrderList {
    let parent = OrderTestBuilder::new(OrderType::Limit)
        .client_order_id(coid("O-1"))
        .side(OrderSide::Buy)
        .price(px("1.00000"))
        .contingency_type(ContingencyType::Oto)
        .order_list_id(OrderListId::from("OL-1"))
        .linked_order_ids(vec![coid("O-2")])
        .build()
        .unwrap();
    let stop_loss = OrderTestBuilder::new(OrderType::StopMarket)
        .client_order_id(coid("O-2"))
        .side(OrderSide::Sell)
        .trigger_price(px("0.99000"))
        .emulation_trigger(TriggerType::BidAsk)
        .order_list_id(OrderListId::from("OL-1"))
        .parent_order_id(coid("O-1"))
        .build()
        .unwrap();
    OrderList::new(OrderListId::from("OL-1"), vec![parent, stop_loss], UnixNanos::default())
        .unwrap()
}

#[rstest]
fn test_oto_parent_fill_releases_child(mut emulator: OrderEmulator) {
    emulator.submit_order_list(bracket()).unwrap();
    assert_eq!(event_names(&emulator.drain_outputs()), vec!["Submit"]);
    assert_eq!(emulator.order(&coid("O-2")).unwrap().status(), OrderStatus::Initialized);
    open_at_venue(&mut emulator, "O-1");

    fill(&mut emulator, "O-1", 40_000, Some("P-1"));

    assert_eq!(
        event_names(&emulator.drain_outputs()),
        vec!["OrderUpdated", "OrderEmulated"]
    );
    let child = emulator.order(&coid("O-2")).unwrap();
    assert_eq!(child.status(), OrderStatus::Emulated);
    assert_eq!(child.quantity(), Quantity::from(40_000));
    assert_eq!(child.position_id(), Some(PositionId::from("P-1")));

    fill(&mut emulator, "O-1", 60_000, Some("P-1"));

    assert_eq!(event_names(&emulator.drain_outputs()), vec!["OrderUpdated"]);
    assert_eq!(
        emulator.order(&coid("O-2")).unwrap().quantity(),
        Quantity::from(100_000)
    );
}

#[rstest]
fn test_oto_parent_canceled_cancels_waiting_child(mut emulator: OrderEmulator) {
    emulator.submit_order_list(bracket()).unwrap();
    emulator.drain_outputs();
    open_at_venue(&mut emulator, "O-1");

    let parent = emulator.order(&coid("O-1")).unwrap().clone();
    let ts = UnixNanos::from(2);
    emulator.on_event(
        oms::OrderCanceled::new(parent.event_header(ts, ts), parent.venue_order_id(), None).into(),
    );

    assert_eq!(event_names(&emulator.drain_outputs()), vec!["OrderCanceled"]);
    assert_eq!(emulator.order(&coid("O-2")).unwrap().status(), OrderStatus::Canceled);
}
