//! Matching core scenarios

use std::str::FromStr;

use common::{ClientOrderId, InstrumentId, OrderSide, OrderSideSpecified, OrderType, Price, Quantity};
use engine::{MatchAction, OrderMatchingCore, PassiveOrder};
use oms::OrderTestBuilder;
use proptest::prelude::*;

fn px(value: &str) -> Price {
    Price::from_str(value).unwrap()
}

fn eth_core() -> OrderMatchingCore {
    let mut core = OrderMatchingCore::new(InstrumentId::from("ETHUSDT-PERP.BINANCE"), px("0.01"));
    core.set_bid_raw(px("1499.00"));
    core.set_ask_raw(px("1499.50"));
    core
}

#[test]
fn test_stop_market_buy_triggers_once_ask_crosses() {
    let mut core = eth_core();
    let order = OrderTestBuilder::new(OrderType::StopMarket)
        .instrument_id(InstrumentId::from("ETHUSDT-PERP.BINANCE"))
        .side(OrderSide::Buy)
        .quantity(Quantity::from(1))
        .trigger_price(px("1500.00"))
        .build()
        .unwrap();
    core.add_order(PassiveOrder::from_order(&order).unwrap())
        .unwrap();

    core.set_ask_raw(px("1499.99"));
    assert!(core.iterate().is_empty());
    assert!(core.order_exists(order.client_order_id));

    core.set_ask_raw(px("1500.01"));
    let actions = core.iterate();

    assert_eq!(
        actions,
        vec![MatchAction::FillMarket {
            client_order_id: order.client_order_id,
            side: OrderSideSpecified::Buy,
            price: px("1500.01"),
        }]
    );
    assert!(!core.order_exists(order.client_order_id));
    assert!(core.is_empty());
}

#[test]
fn test_one_update_trips_several_stops_in_arrival_order() {
    let mut core = eth_core();
    for (id, trigger) in [("O-1", "1500.50"), ("O-2", "1500.00"), ("O-3", "1500.25")] {
        let order = OrderTestBuilder::new(OrderType::StopMarket)
            .client_order_id(ClientOrderId::from(id))
            .side(OrderSide::Buy)
            .trigger_price(px(trigger))
            .build()
            .unwrap();
        core.add_order(PassiveOrder::from_order(&order).unwrap())
            .unwrap();
    }

    core.set_ask_raw(px("1501.00"));
    let ids: Vec<String> = core
        .iterate()
        .iter()
        .map(|a| a.client_order_id().to_string())
        .collect();

    assert_eq!(ids, vec!["O-1", "O-2", "O-3"]);
}

proptest! {
    #[test]
    fn prop_orders_stay_on_their_side(
        orders in proptest::collection::vec((any::<bool>(), 1u32..10_000), 1..40)
    ) {
        let mut core = OrderMatchingCore::new(InstrumentId::from("AAPL.XNAS"), px("0.01"));
        for (i, (is_buy, cents)) in orders.iter().enumerate() {
            let order = OrderTestBuilder::new(OrderType::Limit)
                .client_order_id(ClientOrderId::from(format!("O-{i}").as_str()))
                .side(if *is_buy { OrderSide::Buy } else { OrderSide::Sell })
                .price(Price::from_raw(i64::from(*cents) * 10_000_000, 2).unwrap())
                .build()
                .unwrap();
            core.add_order(PassiveOrder::from_order(&order).unwrap()).unwrap();
        }

        prop_assert!(core.get_orders_bid().iter().all(|o| o.side == OrderSideSpecified::Buy));
        prop_assert!(core.get_orders_ask().iter().all(|o| o.side == OrderSideSpecified::Sell));
        prop_assert!(core
            .get_orders_bid()
            .windows(2)
            .all(|w| w[0].price >= w[1].price));
        prop_assert!(core
            .get_orders_ask()
            .windows(2)
            .all(|w| w[0].price <= w[1].price));
    }
}
