use std::{str::FromStr, sync::Arc, time::Duration};

use bus::MessageBus;
use cache::{Cache, CacheConfig};
use common::{
    BookAction, BookType, ClientId, ClientOrderId, ContingencyType, InstrumentId, OrderListId,
    OrderSide, OrderStatus, OrderType, Quantity, RecordFlag, StrategyId, TestClock, TraderId,
    UnixNanos, Venue,
};
use data_engine::{
    BusMessage, DataCommand, DataEngine, DataEngineConfig, DataEngineError, RequestCommand,
    SubmitOrder, SubmitOrderList, SubscriptionCommand, TradingCommand,
    topics::{
        DATA_ENGINE_EXECUTE, DATA_ENGINE_RESPONSE, EXEC_ENGINE_EXECUTE, bars_topic,
        book_snapshots_topic, deltas_topic, order_events_topic, quotes_topic,
    },
};
use feeds::{
    DataEvent, DataRequest, DataSubscription, RequestKind, ResponsePayload,
    stubs::{MockCall, MockDataClient},
};
use model::{
    data::{Bar, BarType, BookOrder, Data, OrderBookDelta, QuoteTick},
    instruments::{InstrumentAny, stubs::audusd_sim},
};
use oms::{OrderAny, OrderEventAny, OrderList, OrderTestBuilder};
use pretty_assertions::assert_eq;
use rstest::{fixture, rstest};
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;

type Calls = Arc<parking_lot::Mutex<Vec<MockCall>>>;

fn audusd() -> InstrumentId {
    InstrumentId::from("AUD/USD.SIM")
}

fn config() -> DataEngineConfig {
    DataEngineConfig {
        disconnect_grace_ms: 0,
        ..DataEngineConfig::default()
    }
}

fn engine_with(config: DataEngineConfig) -> DataEngine {
    DataEngine::new(
        config,
        Cache::shared(CacheConfig::default()),
        Arc::new(MessageBus::new()),
        Arc::new(TestClock::new()),
    )
}

#[fixture]
fn engine() -> DataEngine {
    engine_with(config())
}

fn register_sim(engine: &mut DataEngine) -> (Calls, tokio::sync::mpsc::Sender<DataEvent>) {
    let client = MockDataClient::new("SIM", Some("SIM"));
    let calls = client.calls();
    let sender = client.sender();
    engine.register_client(Box::new(client), None).unwrap();
    (calls, sender)
}

fn subscribe(subscription: DataSubscription) -> DataCommand {
    DataCommand::Subscribe(SubscriptionCommand::new(subscription, UnixNanos::default()))
}

fn unsubscribe(subscription: DataSubscription) -> DataCommand {
    DataCommand::Unsubscribe(SubscriptionCommand::new(subscription, UnixNanos::default()))
}

fn quotes_sub() -> DataSubscription {
    DataSubscription::Quotes {
        instrument_id: audusd(),
    }
}

fn deltas_sub(managed: bool) -> DataSubscription {
    DataSubscription::BookDeltas {
        instrument_id: audusd(),
        book_type: BookType::L2_MBP,
        depth: None,
        managed,
    }
}

fn snapshots_sub(interval_ms: u64) -> DataSubscription {
    DataSubscription::BookSnapshots {
        instrument_id: audusd(),
        book_type: BookType::L2_MBP,
        depth: None,
        interval_ms,
    }
}

fn quote(bid: &str, ask: &str) -> QuoteTick {
    QuoteTick::new(
        audusd(),
        bid.parse().unwrap(),
        ask.parse().unwrap(),
        Quantity::from(1_000_000),
        Quantity::from(1_000_000),
        UnixNanos::from(1),
        UnixNanos::from(1),
    )
    .unwrap()
}

fn delta(side: OrderSide, price: &str, order_id: u64, flags: u8) -> OrderBookDelta {
    OrderBookDelta::new(
        audusd(),
        BookAction::Add,
        BookOrder::new(side, price.parse().unwrap(), Quantity::from(1_000), order_id),
        flags,
        order_id,
        UnixNanos::from(order_id),
        UnixNanos::from(order_id),
    )
}

fn calls_of(calls: &Calls, kind: fn(&MockCall) -> bool) -> usize {
    calls.lock().iter().filter(|call| kind(call)).count()
}

async fn next<T>(rx: &bus::Receiver<T>) -> T {
    timeout(Duration::from_secs(2), async {
        loop {
            if let Some(message) = rx.try_recv() {
                return message;
            }
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("message within timeout")
}

// -- REGISTRATION -------------------------------------------------------------------------

#[rstest]
fn test_duplicate_registration_rejected(mut engine: DataEngine) {
    register_sim(&mut engine);

    let result = engine.register_client(Box::new(MockDataClient::new("SIM", None)), None);

    assert!(matches!(result, Err(DataEngineError::DuplicateClient { .. })));
    assert_eq!(engine.registered_clients(), vec![ClientId::from("SIM")]);
}

#[rstest]
fn test_second_default_client_rejected(mut engine: DataEngine) {
    engine
        .register_default_client(Box::new(MockDataClient::new("ANY", None)))
        .unwrap();

    let result = engine.register_default_client(Box::new(MockDataClient::new("OTHER", None)));

    assert!(matches!(
        result,
        Err(DataEngineError::DuplicateDefaultClient { existing, .. }) if existing == ClientId::from("ANY")
    ));
}

#[rstest]
fn test_routing_prefers_client_then_venue_then_default(mut engine: DataEngine) {
    register_sim(&mut engine);
    engine
        .register_client(Box::new(MockDataClient::new("ALT", None)), Some(Venue::from("ALT")))
        .unwrap();
    assert_eq!(engine.route(None, Some(Venue::from("OKX"))), None);

    engine
        .register_default_client(Box::new(MockDataClient::new("ANY", None)))
        .unwrap();

    let sim = Some(Venue::from("SIM"));
    assert_eq!(engine.route(Some(ClientId::from("ALT")), sim), Some(ClientId::from("ALT")));
    assert_eq!(engine.route(None, sim), Some(ClientId::from("SIM")));
    assert_eq!(engine.route(None, Some(Venue::from("OKX"))), Some(ClientId::from("ANY")));
}

#[rstest]
#[tokio::test]
async fn test_unroutable_subscription_fails(mut engine: DataEngine) {
    let result = engine.execute(subscribe(quotes_sub())).await;

    assert!(matches!(result, Err(DataEngineError::NoRoute { .. })));
    assert!(engine.subscribed_quotes().is_empty());
}

#[rstest]
#[tokio::test]
async fn test_deregister_drops_routes_and_subscriptions(mut engine: DataEngine) {
    register_sim(&mut engine);
    engine.execute(subscribe(quotes_sub())).await.unwrap();

    let client = engine.deregister_client(&ClientId::from("SIM")).unwrap();

    assert_eq!(client.client_id(), ClientId::from("SIM"));
    assert!(engine.subscriptions().is_empty());
    assert_eq!(engine.route(None, Some(Venue::from("SIM"))), None);
}

// -- SUBSCRIPTIONS ------------------------------------------------------------------------

#[rstest]
#[tokio::test]
async fn test_subscribe_is_idempotent(mut engine: DataEngine) {
    let (calls, _) = register_sim(&mut engine);

    engine.execute(subscribe(quotes_sub())).await.unwrap();
    engine.execute(subscribe(quotes_sub())).await.unwrap();

    assert_eq!(engine.subscribed_quotes(), vec![audusd()]);
    assert_eq!(
        calls.lock().clone(),
        vec![MockCall::Subscribe("quotes:AUD/USD.SIM".to_string())]
    );
    assert_eq!(engine.command_count(), 2);
}

#[rstest]
#[tokio::test]
async fn test_unsubscribe_uses_owner(mut engine: DataEngine) {
    let (calls, _) = register_sim(&mut engine);
    engine.execute(subscribe(quotes_sub())).await.unwrap();

    engine.execute(unsubscribe(quotes_sub())).await.unwrap();
    engine.execute(unsubscribe(quotes_sub())).await.unwrap();

    assert!(engine.subscribed_quotes().is_empty());
    assert_eq!(
        calls_of(&calls, |c| matches!(c, MockCall::Unsubscribe(_))),
        1
    );
}

#[rstest]
#[tokio::test]
async fn test_book_feed_shared_by_deltas_and_snapshots(mut engine: DataEngine) {
    let (calls, _) = register_sim(&mut engine);

    engine.execute(subscribe(deltas_sub(true))).await.unwrap();
    engine.execute(subscribe(snapshots_sub(1_000))).await.unwrap();

    assert_eq!(calls_of(&calls, |c| matches!(c, MockCall::Subscribe(_))), 1);
    assert_eq!(engine.subscribed_book_deltas(), vec![audusd()]);
    assert_eq!(engine.subscribed_book_snapshots(), vec![audusd()]);
    assert!(engine.cache().read().has_order_book(&audusd()));

    engine.execute(unsubscribe(deltas_sub(true))).await.unwrap();
    assert_eq!(calls_of(&calls, |c| matches!(c, MockCall::Unsubscribe(_))), 0);

    engine.execute(unsubscribe(snapshots_sub(1_000))).await.unwrap();
    assert_eq!(
        calls.lock().last(),
        Some(&MockCall::Unsubscribe("book.deltas:AUD/USD.SIM:0".to_string()))
    );
    assert!(engine.subscribed_book_snapshots().is_empty());
}

fn book_deltas(book_type: BookType, depth: Option<usize>) -> DataSubscription {
    DataSubscription::BookDeltas {
        instrument_id: audusd(),
        book_type,
        depth,
        managed: false,
    }
}

fn book_calls(calls: &Calls) -> Vec<MockCall> {
    calls.lock().drain(..).collect()
}

#[rstest]
#[tokio::test]
async fn test_deeper_book_subscription_widens_feed(mut engine: DataEngine) {
    let (calls, _) = register_sim(&mut engine);

    engine
        .execute(subscribe(book_deltas(BookType::L2_MBP, Some(5))))
        .await
        .unwrap();
    assert_eq!(
        book_calls(&calls),
        vec![MockCall::Subscribe("book.deltas:AUD/USD.SIM:5".to_string())]
    );

    engine
        .execute(subscribe(book_deltas(BookType::L2_MBP, Some(400))))
        .await
        .unwrap();
    assert_eq!(
        book_calls(&calls),
        vec![
            MockCall::Subscribe("book.deltas:AUD/USD.SIM:400".to_string()),
            MockCall::Unsubscribe("book.deltas:AUD/USD.SIM:5".to_string()),
        ]
    );

    // Another book type is its own venue feed
    engine
        .execute(subscribe(book_deltas(BookType::L3_MBO, None)))
        .await
        .unwrap();
    assert_eq!(
        book_calls(&calls),
        vec![MockCall::Subscribe("book.deltas:AUD/USD.SIM:0".to_string())]
    );
    assert_eq!(engine.subscriptions().len(), 3);

    // Leaving the deep consumer narrows the shared feed back
    engine
        .execute(unsubscribe(book_deltas(BookType::L2_MBP, Some(400))))
        .await
        .unwrap();
    assert_eq!(
        book_calls(&calls),
        vec![
            MockCall::Subscribe("book.deltas:AUD/USD.SIM:5".to_string()),
            MockCall::Unsubscribe("book.deltas:AUD/USD.SIM:400".to_string()),
        ]
    );

    engine
        .execute(unsubscribe(book_deltas(BookType::L2_MBP, Some(5))))
        .await
        .unwrap();
    assert_eq!(
        book_calls(&calls),
        vec![MockCall::Unsubscribe("book.deltas:AUD/USD.SIM:5".to_string())]
    );

    engine
        .execute(unsubscribe(book_deltas(BookType::L3_MBO, None)))
        .await
        .unwrap();
    assert_eq!(
        book_calls(&calls),
        vec![MockCall::Unsubscribe("book.deltas:AUD/USD.SIM:0".to_string())]
    );
    assert!(engine.subscriptions().is_empty());
}

#[rstest]
#[tokio::test]
async fn test_shallower_book_subscription_shares_deep_feed(mut engine: DataEngine) {
    let (calls, _) = register_sim(&mut engine);

    engine
        .execute(subscribe(book_deltas(BookType::L2_MBP, None)))
        .await
        .unwrap();
    engine
        .execute(subscribe(book_deltas(BookType::L2_MBP, Some(5))))
        .await
        .unwrap();
    assert_eq!(
        book_calls(&calls),
        vec![MockCall::Subscribe("book.deltas:AUD/USD.SIM:0".to_string())]
    );

    // The full-book consumer leaves; the remaining one needs only depth 5
    engine
        .execute(unsubscribe(book_deltas(BookType::L2_MBP, None)))
        .await
        .unwrap();
    assert_eq!(
        book_calls(&calls),
        vec![
            MockCall::Subscribe("book.deltas:AUD/USD.SIM:5".to_string()),
            MockCall::Unsubscribe("book.deltas:AUD/USD.SIM:0".to_string()),
        ]
    );
    assert_eq!(
        engine.subscriptions(),
        vec![book_deltas(BookType::L2_MBP, Some(5))]
    );
}

#[rstest]
#[tokio::test]
async fn test_snapshot_interval_must_be_positive(mut engine: DataEngine) {
    register_sim(&mut engine);

    let result = engine.execute(subscribe(snapshots_sub(0))).await;

    assert!(matches!(result, Err(DataEngineError::InvalidCommand { .. })));
}

#[rstest]
#[tokio::test]
async fn test_internal_bars_stay_local(mut engine: DataEngine) {
    let (calls, _) = register_sim(&mut engine);
    let bar_type = BarType::from_str("AUD/USD.SIM-1-MINUTE-BID-INTERNAL").unwrap();

    engine
        .execute(subscribe(DataSubscription::Bars { bar_type }))
        .await
        .unwrap();

    assert_eq!(engine.subscribed_bars(), vec![bar_type]);
    assert!(calls.lock().is_empty());
}

#[rstest]
#[tokio::test]
async fn test_reconnect_replays_subscriptions(mut engine: DataEngine) {
    let (calls, _) = register_sim(&mut engine);
    engine.execute(subscribe(quotes_sub())).await.unwrap();
    engine.execute(subscribe(deltas_sub(false))).await.unwrap();
    engine.execute(subscribe(snapshots_sub(500))).await.unwrap();
    let before = engine.subscriptions();
    calls.lock().clear();

    engine
        .process_event(ClientId::from("SIM"), DataEvent::Reconnected)
        .await;

    assert_eq!(engine.subscriptions(), before);
    assert_eq!(
        calls.lock().clone(),
        vec![
            MockCall::Subscribe("quotes:AUD/USD.SIM".to_string()),
            MockCall::Subscribe("book.deltas:AUD/USD.SIM:0".to_string()),
        ]
    );
}

#[rstest]
#[tokio::test]
async fn test_disconnect_unsubscribes_and_connect_resubscribes(mut engine: DataEngine) {
    let (calls, _) = register_sim(&mut engine);
    engine.connect().await.unwrap();
    engine.execute(subscribe(quotes_sub())).await.unwrap();

    engine.disconnect().await.unwrap();
    assert!(engine.check_disconnected());
    assert_eq!(
        calls.lock()[2..].to_vec(),
        vec![
            MockCall::Unsubscribe("quotes:AUD/USD.SIM".to_string()),
            MockCall::Disconnect,
        ]
    );
    assert_eq!(engine.subscribed_quotes(), vec![audusd()]);

    engine.connect().await.unwrap();
    assert!(engine.check_connected());
    assert_eq!(
        calls.lock().last(),
        Some(&MockCall::Subscribe("quotes:AUD/USD.SIM".to_string()))
    );
}

#[rstest]
#[tokio::test]
async fn test_connect_continues_past_failing_client(mut engine: DataEngine) {
    engine
        .register_client(Box::new(MockDataClient::new("BAD", Some("BAD")).failing_connect()), None)
        .unwrap();
    let (calls, _) = register_sim(&mut engine);

    let result = engine.connect().await;

    assert!(matches!(result, Err(DataEngineError::Client { operation: "connect", .. })));
    assert_eq!(calls.lock().clone(), vec![MockCall::Connect]);
    assert!(!engine.check_connected());
}

#[rstest]
#[tokio::test]
async fn test_reset_forgets_subscriptions(mut engine: DataEngine) {
    register_sim(&mut engine);
    engine.execute(subscribe(quotes_sub())).await.unwrap();

    engine.reset().unwrap();

    assert!(engine.subscriptions().is_empty());
    assert_eq!(engine.command_count(), 0);
}

// -- DATA ---------------------------------------------------------------------------------

#[rstest]
#[tokio::test]
async fn test_quote_cached_and_published(mut engine: DataEngine) {
    let (_, rx) = engine.bus().subscribe(&quotes_topic(&audusd()));
    engine.start();

    engine.process_data(Data::Quote(quote("0.79990", "0.80000")));

    assert_eq!(rx.try_recv(), Some(BusMessage::Data(Data::Quote(quote("0.79990", "0.80000")))));
    assert_eq!(
        engine.cache().read().quote(&audusd()).map(|q| q.ask_price),
        Some("0.80000".parse().unwrap())
    );
    assert_eq!(engine.data_count(), 1);
}

#[rstest]
#[tokio::test]
async fn test_instrument_event_cached_and_published(mut engine: DataEngine) {
    let topic = data_engine::topics::instrument_topic(&audusd());
    let (_, rx) = engine.bus().subscribe(&topic);
    engine.start();

    engine
        .process_event(
            ClientId::from("SIM"),
            DataEvent::Instrument(Box::new(InstrumentAny::from(audusd_sim()))),
        )
        .await;

    assert!(matches!(rx.try_recv(), Some(BusMessage::Instrument(_))));
    assert!(engine.cache().read().instrument(&audusd()).is_some());
}

#[rstest]
#[case(true, 60_000_000_000)]
#[case(false, 0)]
#[tokio::test]
async fn test_time_bar_timestamp(#[case] on_close: bool, #[case] expected_ts_event: u64) {
    let mut engine = engine_with(DataEngineConfig {
        time_bars_timestamp_on_close: on_close,
        ..config()
    });
    let bar_type = BarType::from_str("AUD/USD.SIM-1-MINUTE-LAST-EXTERNAL").unwrap();
    let price = "0.80000".parse().unwrap();
    let close_ts = UnixNanos::from(60_000_000_000);
    let bar = Bar::new(bar_type, price, price, price, price, Quantity::from(10), close_ts, close_ts)
        .unwrap();
    let (_, rx) = engine.bus().subscribe(&bars_topic(&bar_type));
    engine.start();

    engine.process_data(Data::Bar(bar));

    let Some(BusMessage::Data(Data::Bar(published))) = rx.try_recv() else {
        panic!("expected a bar");
    };
    assert_eq!(published.ts_event, UnixNanos::from(expected_ts_event));
    assert_eq!(published.ts_init, close_ts);
}

#[rstest]
#[tokio::test]
async fn test_out_of_sequence_bar_dropped() {
    let mut engine = engine_with(DataEngineConfig {
        validate_data_sequence: true,
        ..config()
    });
    let bar_type = BarType::from_str("AUD/USD.SIM-1-MINUTE-LAST-EXTERNAL").unwrap();
    let price = "0.80000".parse().unwrap();
    let bar_at = |ts: u64| {
        Bar::new(bar_type, price, price, price, price, Quantity::from(10), UnixNanos::from(ts), UnixNanos::from(ts))
            .unwrap()
    };
    engine.start();

    engine.process_data(Data::Bar(bar_at(120)));
    engine.process_data(Data::Bar(bar_at(60)));

    assert_eq!(
        engine.cache().read().bar(&bar_type).map(|b| b.ts_event),
        Some(UnixNanos::from(120))
    );
}

#[rstest]
#[tokio::test]
async fn test_deltas_update_managed_book(mut engine: DataEngine) {
    register_sim(&mut engine);
    engine.execute(subscribe(deltas_sub(true))).await.unwrap();
    let (_, rx) = engine.bus().subscribe(&deltas_topic(&audusd()));
    engine.start();

    engine.process_data(Data::Delta(delta(OrderSide::Buy, "0.79990", 1, RecordFlag::F_LAST)));
    engine.process_data(Data::Delta(delta(OrderSide::Sell, "0.80010", 2, RecordFlag::F_LAST)));

    let cache = engine.cache().read();
    let book = cache.order_book(&audusd()).unwrap();
    assert_eq!(book.best_bid_price(), Some("0.79990".parse().unwrap()));
    assert_eq!(book.best_ask_price(), Some("0.80010".parse().unwrap()));
    assert_eq!(rx.len(), 2);
}

#[rstest]
#[tokio::test]
async fn test_buffered_deltas_publish_on_last() {
    let mut engine = engine_with(DataEngineConfig {
        buffer_deltas: true,
        ..config()
    });
    let (_, rx) = engine.bus().subscribe(&deltas_topic(&audusd()));
    engine.start();

    engine.process_data(Data::Delta(delta(OrderSide::Buy, "0.79990", 1, 0)));
    engine.process_data(Data::Delta(delta(OrderSide::Buy, "0.79980", 2, 0)));
    assert!(rx.is_empty());

    engine.process_data(Data::Delta(delta(OrderSide::Sell, "0.80010", 3, RecordFlag::F_LAST)));

    let Some(BusMessage::Data(Data::Deltas(deltas))) = rx.try_recv() else {
        panic!("expected a delta batch");
    };
    assert_eq!(deltas.deltas.len(), 3);
    assert_eq!(deltas.sequence, 3);
}

// -- ORDERS -------------------------------------------------------------------------------

fn quote_qty_order(id: &str, side: OrderSide) -> OrderAny {
    OrderTestBuilder::new(OrderType::Market)
        .client_order_id(ClientOrderId::from(id))
        .side(side)
        .quote_quantity(true)
        .build()
        .unwrap()
}

fn with_instrument(engine: &DataEngine) {
    engine
        .cache()
        .write()
        .add_instrument(InstrumentAny::from(audusd_sim()));
}

#[rstest]
fn test_order_denied_without_conversion_price(mut engine: DataEngine) {
    with_instrument(&engine);
    let exec = engine.bus().register_endpoint(EXEC_ENGINE_EXECUTE).unwrap();
    let (_, events) = engine
        .bus()
        .subscribe(&order_events_topic(&StrategyId::from("S-001")));
    let order = quote_qty_order("O-1", OrderSide::Buy);

    engine.handle_submit_order(SubmitOrder::new(order, UnixNanos::default()));

    let Some(BusMessage::OrderEvent(OrderEventAny::Denied(denied))) = events.try_recv() else {
        panic!("expected a denial");
    };
    assert_eq!(denied.reason, "no-price-to-convert-quote-qty AUD/USD.SIM");
    assert!(exec.is_empty());
    assert_eq!(
        engine
            .cache()
            .read()
            .order(&ClientOrderId::from("O-1"))
            .map(OrderAny::status),
        Some(OrderStatus::Denied)
    );
}

#[rstest]
fn test_missing_instrument_denies_order(mut engine: DataEngine) {
    let exec = engine.bus().register_endpoint(EXEC_ENGINE_EXECUTE).unwrap();
    let (_, events) = engine
        .bus()
        .subscribe(&order_events_topic(&StrategyId::from("S-001")));
    let order = quote_qty_order("O-1", OrderSide::Buy);

    engine.handle_submit_order(SubmitOrder::new(order, UnixNanos::default()));

    let Some(BusMessage::OrderEvent(OrderEventAny::Denied(denied))) = events.try_recv() else {
        panic!("expected a denial");
    };
    assert_eq!(denied.reason, "instrument-not-found AUD/USD.SIM");
    assert!(exec.is_empty());
    assert_eq!(
        engine
            .cache()
            .read()
            .order(&ClientOrderId::from("O-1"))
            .map(OrderAny::status),
        Some(OrderStatus::Denied)
    );
}

#[rstest]
fn test_quote_quantity_converted_and_forwarded(mut engine: DataEngine) {
    with_instrument(&engine);
    engine.cache().write().add_quote(quote("0.79990", "0.80000"));
    let exec = engine.bus().register_endpoint(EXEC_ENGINE_EXECUTE).unwrap();

    let parent = OrderTestBuilder::new(OrderType::Market)
        .quote_quantity(true)
        .contingency_type(ContingencyType::Oto)
        .linked_order_ids(vec![ClientOrderId::from("O-2")])
        .build()
        .unwrap();
    let child = OrderTestBuilder::new(OrderType::Market)
        .client_order_id(ClientOrderId::from("O-2"))
        .side(OrderSide::Sell)
        .quote_quantity(true)
        .parent_order_id(ClientOrderId::from("O-1"))
        .build()
        .unwrap();
    engine.cache().write().add_order(child).unwrap();

    engine.handle_submit_order(SubmitOrder::new(parent, UnixNanos::default()));

    let Some(BusMessage::Trading(TradingCommand::SubmitOrder(command))) = exec.try_recv() else {
        panic!("expected a forwarded order");
    };
    assert_eq!(command.order.quantity(), Quantity::from(125_000));
    assert!(!command.order.is_quote_quantity());
    let cache = engine.cache().read();
    let child = cache.order(&ClientOrderId::from("O-2")).unwrap();
    assert_eq!(child.quantity(), Quantity::from(125_000));
    assert!(!child.is_quote_quantity());
}

#[rstest]
fn test_order_list_denied_when_any_conversion_fails(mut engine: DataEngine) {
    with_instrument(&engine);
    let exec = engine.bus().register_endpoint(EXEC_ENGINE_EXECUTE).unwrap();
    let (_, events) = engine
        .bus()
        .subscribe(&order_events_topic(&StrategyId::from("S-001")));
    let plain = OrderTestBuilder::new(OrderType::Market).build().unwrap();
    let quoted = quote_qty_order("O-2", OrderSide::Sell);
    let list = OrderList::new(OrderListId::from("OL-1"), vec![plain, quoted], UnixNanos::default())
        .unwrap();

    engine.handle_submit_order_list(SubmitOrderList::new(
        TraderId::from("TRADER-001"),
        list,
        UnixNanos::default(),
    ));

    assert!(exec.is_empty());
    assert_eq!(events.drain().len(), 2);
}

// -- RUNNER -------------------------------------------------------------------------------

async fn wait_until_registered(bus: &MessageBus<BusMessage>, endpoint: &str) {
    timeout(Duration::from_secs(2), async {
        while !bus.is_registered(endpoint) {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("endpoint registered");
}

#[rstest]
#[tokio::test]
async fn test_runner_end_to_end() {
    let mut engine = engine_with(config());
    let client = MockDataClient::new("SIM", Some("SIM"))
        .with_instruments(vec![InstrumentAny::from(audusd_sim())]);
    let calls = client.calls();
    let sender = client.sender();
    engine.register_client(Box::new(client), None).unwrap();
    let bus = Arc::clone(engine.bus());
    let responses = bus.register_endpoint(DATA_ENGINE_RESPONSE).unwrap();
    let (_, quotes) = bus.subscribe(&quotes_topic(&audusd()));
    let (_, snapshots) = bus.subscribe(&book_snapshots_topic(&audusd()));

    let cancel = CancellationToken::new();
    let task = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            engine.run(cancel).await.unwrap();
            engine
        }
    });
    wait_until_registered(&bus, DATA_ENGINE_EXECUTE).await;

    // Commands over the bus
    bus.send(DATA_ENGINE_EXECUTE, subscribe(quotes_sub()).into()).unwrap();
    bus.send(DATA_ENGINE_EXECUTE, subscribe(snapshots_sub(20)).into()).unwrap();
    let request = DataRequest::new(RequestKind::Instruments {
        venue: Venue::from("SIM"),
    });
    bus.send(
        DATA_ENGINE_EXECUTE,
        DataCommand::Request(RequestCommand::new(request.clone(), UnixNanos::default())).into(),
    )
    .unwrap();

    let BusMessage::Response(response) = next(&responses).await else {
        panic!("expected a response");
    };
    assert_eq!(response.correlation_id, request.request_id);
    assert!(matches!(response.payload, ResponsePayload::Instruments(ref v) if v.len() == 1));

    // Client events through the reader
    sender
        .send(DataEvent::Data(Data::Quote(quote("0.79990", "0.80000"))))
        .await
        .unwrap();
    assert!(matches!(next(&quotes).await, BusMessage::Data(Data::Quote(_))));

    let BusMessage::Book(book) = next(&snapshots).await else {
        panic!("expected a book snapshot");
    };
    assert_eq!(book.instrument_id, audusd());

    cancel.cancel();
    let engine = timeout(Duration::from_secs(2), task).await.unwrap().unwrap();

    assert!(!bus.is_registered(DATA_ENGINE_EXECUTE));
    assert!(engine.check_disconnected());
    assert!(engine.cache().read().instrument(&audusd()).is_some());
    let calls = calls.lock().clone();
    assert!(calls.contains(&MockCall::Unsubscribe("quotes:AUD/USD.SIM".to_string())));
    assert_eq!(calls.last(), Some(&MockCall::Disconnect));
}

#[rstest]
#[tokio::test]
async fn test_runner_forwards_orders() {
    let mut engine = engine_with(config());
    with_instrument(&engine);
    engine.cache().write().add_quote(quote("0.79990", "0.80000"));
    let bus = Arc::clone(engine.bus());
    let exec = bus.register_endpoint(EXEC_ENGINE_EXECUTE).unwrap();

    let cancel = CancellationToken::new();
    let task = tokio::spawn({
        let cancel = cancel.clone();
        async move { engine.run(cancel).await }
    });
    wait_until_registered(&bus, DATA_ENGINE_EXECUTE).await;

    let order = quote_qty_order("O-1", OrderSide::Sell);
    bus.send(
        DATA_ENGINE_EXECUTE,
        TradingCommand::SubmitOrder(Box::new(SubmitOrder::new(order, UnixNanos::default()))).into(),
    )
    .unwrap();

    let BusMessage::Trading(TradingCommand::SubmitOrder(command)) = next(&exec).await else {
        panic!("expected a forwarded order");
    };
    assert_eq!(command.order.quantity(), Quantity::from(125_016));

    cancel.cancel();
    timeout(Duration::from_secs(2), task).await.unwrap().unwrap().unwrap();
}
