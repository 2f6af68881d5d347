//! Read-only liquidity analytics over ladders
//!
//! All accumulation happens in `Decimal`; results convert to `f64` once at the end.

use common::{OrderSideSpecified, Price, Quantity};
use indexmap::IndexMap;
use rust_decimal::{Decimal, prelude::ToPrimitive};

use crate::{ladder::BookLadder, level::BookLevel};

fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

/// VWAP of taking `qty` from `ladder`, zero when the ladder cannot fill it
#[must_use]
pub fn get_avg_px_for_quantity(qty: Quantity, ladder: &BookLadder) -> f64 {
    let target = qty.as_decimal();
    if target <= Decimal::ZERO {
        return 0.0;
    }
    let mut remaining = target;
    let mut notional = Decimal::ZERO;
    for level in ladder.iter() {
        let take = level.size_decimal().min(remaining);
        notional += take * level.price.value.as_decimal();
        remaining -= take;
        if remaining.is_zero() {
            return to_f64(notional / target);
        }
    }
    0.0
}

/// Takes up to `target_exposure` notional from `ladder`.
///
/// Returns `(avg_px, executed_qty, executed_notional)`; a thin ladder yields the partial
/// amounts actually available.
#[must_use]
pub fn get_avg_px_qty_for_exposure(target_exposure: Quantity, ladder: &BookLadder) -> (f64, f64, f64) {
    let target = target_exposure.as_decimal();
    let mut notional = Decimal::ZERO;
    let mut qty = Decimal::ZERO;
    for level in ladder.iter() {
        let price = level.price.value.as_decimal();
        if price <= Decimal::ZERO {
            continue;
        }
        let level_notional = level.exposure_decimal();
        if notional + level_notional >= target {
            let remaining = target - notional;
            qty += remaining / price;
            notional += remaining;
            break;
        }
        notional += level_notional;
        qty += level.size_decimal();
    }
    if qty.is_zero() {
        return (0.0, 0.0, 0.0);
    }
    (to_f64(notional / qty), to_f64(qty), to_f64(notional))
}

/// Cumulative size on `ladder` at prices no worse than `price` for the taker
#[must_use]
pub fn get_quantity_for_price(price: Price, ladder: &BookLadder) -> f64 {
    let within = |level: &&BookLevel| match ladder.side {
        OrderSideSpecified::Sell => level.price.value <= price,
        OrderSideSpecified::Buy => level.price.value >= price,
    };
    to_f64(
        ladder
            .iter()
            .take_while(within)
            .map(BookLevel::size_decimal)
            .sum(),
    )
}

/// `(bid_size - ask_size) / (bid_size + ask_size)` over the given levels
#[must_use]
pub fn imbalance<'a>(
    bids: impl Iterator<Item = &'a BookLevel>,
    asks: impl Iterator<Item = &'a BookLevel>,
) -> Option<f64> {
    let bid: Decimal = bids.map(BookLevel::size_decimal).sum();
    let ask: Decimal = asks.map(BookLevel::size_decimal).sum();
    let total = bid + ask;
    if total.is_zero() {
        return None;
    }
    Some(to_f64((bid - ask) / total))
}

/// Buckets level sizes by price, flooring bids and ceiling asks, truncated to `depth`
pub(crate) fn group_levels<'a>(
    levels: impl Iterator<Item = &'a BookLevel>,
    group_size: Decimal,
    depth: Option<usize>,
    is_bid: bool,
) -> IndexMap<Decimal, Decimal> {
    if group_size <= Decimal::ZERO {
        tracing::error!(%group_size, "Invalid group size, must be positive");
        return IndexMap::new();
    }
    let depth = depth.unwrap_or(usize::MAX);
    let mut grouped = IndexMap::new();
    for level in levels {
        let price = level.price.value.as_decimal();
        let bucket = if is_bid {
            (price / group_size).floor() * group_size
        } else {
            (price / group_size).ceil() * group_size
        };
        *grouped.entry(bucket).or_insert(Decimal::ZERO) += level.size_decimal();
        if grouped.len() > depth {
            grouped.pop();
            break;
        }
    }
    grouped
}
