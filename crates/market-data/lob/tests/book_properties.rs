//! Property tests for book invariants

use common::{BookAction, BookType, InstrumentId, OrderSide, Price, Quantity, UnixNanos};
use lob::OrderBook;
use model::data::{BookOrder, OrderBookDelta, QuoteTick};
use proptest::prelude::*;

fn instrument_id() -> InstrumentId {
    InstrumentId::new("ETHUSDT".into(), "BINANCE".into())
}

#[derive(Debug, Clone)]
struct Op {
    action: BookAction,
    side: OrderSide,
    ticks: i64,
    size: u64,
    order_id: u64,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    (
        prop_oneof![
            Just(BookAction::Add),
            Just(BookAction::Update),
            Just(BookAction::Delete)
        ],
        prop_oneof![Just(OrderSide::Buy), Just(OrderSide::Sell)],
        1_i64..40,
        0_u64..50,
        1_u64..20,
    )
        .prop_map(|(action, side, ticks, size, order_id)| Op {
            action,
            side,
            ticks,
            size,
            order_id,
        })
}

// Bids live strictly below 100.00 and asks strictly above, so no sequence can cross.
fn to_delta(op: &Op, sequence: u64) -> OrderBookDelta {
    let offset = op.ticks * 10_000_000;
    let raw = match op.side {
        OrderSide::Buy => 100_000_000_000 - offset,
        _ => 100_000_000_000 + offset,
    };
    let order_id = match op.side {
        OrderSide::Buy => op.order_id,
        _ => op.order_id + 1_000,
    };
    OrderBookDelta::new(
        instrument_id(),
        op.action,
        BookOrder::new(
            op.side,
            Price::from_raw(raw, 2).unwrap(),
            Quantity::from_raw(op.size * 1_000_000_000, 0).unwrap(),
            order_id,
        ),
        0,
        sequence,
        UnixNanos::new(sequence),
        UnixNanos::new(sequence),
    )
}

proptest! {
    #[test]
    fn prop_book_never_crossed_at_batch_end(
        ops in prop::collection::vec(op_strategy(), 1..200),
        book_type in prop_oneof![Just(BookType::L2_MBP), Just(BookType::L3_MBO)],
    ) {
        let mut book = OrderBook::new(instrument_id(), book_type);
        for (seq, op) in ops.iter().enumerate() {
            book.apply_delta(&to_delta(op, seq as u64)).unwrap();
        }
        prop_assert!(!book.is_crossed());
        prop_assert!(book.check_integrity().is_ok());
        prop_assert_eq!(book.update_count, ops.len() as u64);
        for level in book.bids(None).chain(book.asks(None)) {
            prop_assert!(!level.is_empty());
        }
    }

    #[test]
    fn prop_l1_holds_single_level(
        quotes in prop::collection::vec((1_i64..1_000, 1_i64..100, 1_u64..100), 1..100),
    ) {
        let mut book = OrderBook::new(instrument_id(), BookType::L1_MBP);
        for (seq, (bid_ticks, spread, size)) in quotes.iter().enumerate() {
            let bid = Price::from_raw(bid_ticks * 10_000_000, 2).unwrap();
            let ask = Price::from_raw((bid_ticks + spread) * 10_000_000, 2).unwrap();
            let qty = Quantity::from_raw(size * 1_000_000_000, 0).unwrap();
            let quote = QuoteTick::new(
                instrument_id(),
                bid,
                ask,
                qty,
                qty,
                UnixNanos::new(seq as u64),
                UnixNanos::new(seq as u64),
            )
            .unwrap();
            book.update_quote_tick(&quote).unwrap();
            prop_assert_eq!(book.bids(None).count(), 1);
            prop_assert_eq!(book.asks(None).count(), 1);
            prop_assert_eq!(book.best_bid_price(), Some(bid));
        }
        prop_assert!(book.check_integrity().is_ok());
    }
}

fn apply_all(book_type: BookType, ops: &[Op]) -> OrderBook {
    let mut book = OrderBook::new(instrument_id(), book_type);
    for (seq, op) in ops.iter().enumerate() {
        book.apply_delta(&to_delta(op, seq as u64)).unwrap();
    }
    book
}

fn clear_delta(sequence: u64) -> OrderBookDelta {
    OrderBookDelta::clear(
        instrument_id(),
        sequence,
        UnixNanos::new(sequence),
        UnixNanos::new(sequence),
    )
}

proptest! {
    #[test]
    fn prop_clear_is_idempotent(
        ops in prop::collection::vec(op_strategy(), 0..100),
        book_type in prop_oneof![Just(BookType::L2_MBP), Just(BookType::L3_MBO)],
    ) {
        let next = ops.len() as u64;
        let mut once = apply_all(book_type, &ops);
        once.apply_delta(&clear_delta(next)).unwrap();

        let mut twice = apply_all(book_type, &ops);
        twice.apply_delta(&clear_delta(next)).unwrap();
        twice.apply_delta(&clear_delta(next)).unwrap();

        prop_assert_eq!(once.bids(None).count(), 0);
        prop_assert_eq!(once.asks(None).count(), 0);
        prop_assert_eq!(twice.bids_as_map(None), once.bids_as_map(None));
        prop_assert_eq!(twice.asks_as_map(None), once.asks_as_map(None));
        prop_assert_eq!(twice.checksum(10), once.checksum(10));
        prop_assert_eq!(twice.sequence, once.sequence);
    }

    #[test]
    fn prop_l3_duplicate_add_keeps_single_order(
        side in prop_oneof![Just(OrderSide::Buy), Just(OrderSide::Sell)],
        ticks in 1_i64..40,
        first in 1_u64..50,
        second in 1_u64..50,
        order_id in 1_u64..20,
    ) {
        let add = |size| Op { action: BookAction::Add, side, ticks, size, order_id };
        let book = apply_all(BookType::L3_MBO, &[add(first), add(second)]);

        let levels: Vec<_> = book.bids(None).chain(book.asks(None)).collect();
        prop_assert_eq!(levels.len(), 1);
        prop_assert_eq!(levels[0].len(), 1);
        let resting = levels[0].first().unwrap();
        prop_assert_eq!(resting.size, Quantity::from_raw(second * 1_000_000_000, 0).unwrap());
        prop_assert!(book.check_integrity().is_ok());
    }

    #[test]
    fn prop_checksum_deterministic_on_replay(
        ops in prop::collection::vec(op_strategy(), 1..200),
        book_type in prop_oneof![Just(BookType::L2_MBP), Just(BookType::L3_MBO)],
        depth in 1_usize..20,
    ) {
        let first = apply_all(book_type, &ops);
        let replayed = apply_all(book_type, &ops);
        prop_assert_eq!(first.checksum(depth), replayed.checksum(depth));
        prop_assert_eq!(first.bids_as_map(None), replayed.bids_as_map(None));
        prop_assert_eq!(first.asks_as_map(None), replayed.asks_as_map(None));
    }
}
