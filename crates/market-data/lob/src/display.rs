//! Text rendering of a book

use std::fmt::Write;

use rust_decimal::Decimal;

use crate::book::OrderBook;

const COLUMN_WIDTH: usize = 14;

/// Renders asks (worst at the top) over bids as a three column ladder
pub(crate) fn pprint_book(book: &OrderBook, num_levels: usize, group_size: Option<Decimal>) -> String {
    let (bids, asks): (Vec<(Decimal, Decimal)>, Vec<(Decimal, Decimal)>) = match group_size {
        Some(group) => (
            book.group_bids(group, Some(num_levels)).into_iter().collect(),
            book.group_asks(group, Some(num_levels)).into_iter().collect(),
        ),
        None => (
            book.bids_as_map(Some(num_levels)).into_iter().collect(),
            book.asks_as_map(Some(num_levels)).into_iter().collect(),
        ),
    };

    let rule = "-".repeat(COLUMN_WIDTH * 3 + 4);
    let mut out = String::new();
    let _ = writeln!(out, "bid_levels: {}", bids.len());
    let _ = writeln!(out, "ask_levels: {}", asks.len());
    let _ = writeln!(out, "sequence: {}", book.sequence);
    let _ = writeln!(out, "update_count: {}", book.update_count);
    let _ = writeln!(out, "ts_last: {}", book.ts_last);
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(
        out,
        "|{:^w$}|{:^w$}|{:^w$}|",
        "bids",
        "price",
        "asks",
        w = COLUMN_WIDTH
    );
    let _ = writeln!(out, "{rule}");
    for (price, size) in asks.iter().rev() {
        let _ = writeln!(out, "|{:^w$}|{:^w$}|{:^w$}|", "", price, size, w = COLUMN_WIDTH);
    }
    for (price, size) in &bids {
        let _ = writeln!(out, "|{:^w$}|{:^w$}|{:^w$}|", size, price, "", w = COLUMN_WIDTH);
    }
    let _ = write!(out, "{rule}");
    out
}
