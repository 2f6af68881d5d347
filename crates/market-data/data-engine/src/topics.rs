//! Bus addresses used by the engine
//!
//! Market data topics follow `events.data.<kind>.<venue>.<symbol>`; subscribers match
//! them exactly.

use common::{InstrumentId, StrategyId};
use model::data::{BarType, Data, DataType};

/// Endpoint receiving [`crate::DataCommand`]s and order submissions
pub const DATA_ENGINE_EXECUTE: &str = "data_engine_execute";

/// Endpoint receiving [`feeds::DataResponse`]s
pub const DATA_ENGINE_RESPONSE: &str = "data_engine_response";

/// Endpoint order submissions are forwarded to after translation
pub const EXEC_ENGINE_EXECUTE: &str = "exec_engine_execute";

fn data_topic(kind: &str, instrument_id: &InstrumentId) -> String {
    format!(
        "events.data.{kind}.{}.{}",
        instrument_id.venue, instrument_id.symbol
    )
}

#[must_use]
pub fn instrument_topic(instrument_id: &InstrumentId) -> String {
    data_topic("instrument", instrument_id)
}

#[must_use]
pub fn deltas_topic(instrument_id: &InstrumentId) -> String {
    data_topic("deltas", instrument_id)
}

#[must_use]
pub fn depth10_topic(instrument_id: &InstrumentId) -> String {
    data_topic("depth10", instrument_id)
}

/// Periodic snapshots of an engine-managed book
#[must_use]
pub fn book_snapshots_topic(instrument_id: &InstrumentId) -> String {
    data_topic("book.snapshots", instrument_id)
}

#[must_use]
pub fn quotes_topic(instrument_id: &InstrumentId) -> String {
    data_topic("quote", instrument_id)
}

#[must_use]
pub fn trades_topic(instrument_id: &InstrumentId) -> String {
    data_topic("trade", instrument_id)
}

/// Bars of one type: the data topic suffixed with the bar specification
#[must_use]
pub fn bars_topic(bar_type: &BarType) -> String {
    format!("{}.{}", data_topic("bar", &bar_type.instrument_id), bar_type.spec)
}

#[must_use]
pub fn mark_price_topic(instrument_id: &InstrumentId) -> String {
    data_topic("mark_price", instrument_id)
}

#[must_use]
pub fn index_price_topic(instrument_id: &InstrumentId) -> String {
    data_topic("index_price", instrument_id)
}

#[must_use]
pub fn funding_rate_topic(instrument_id: &InstrumentId) -> String {
    data_topic("funding_rate", instrument_id)
}

#[must_use]
pub fn instrument_status_topic(instrument_id: &InstrumentId) -> String {
    data_topic("status", instrument_id)
}

#[must_use]
pub fn instrument_close_topic(instrument_id: &InstrumentId) -> String {
    data_topic("close", instrument_id)
}

#[must_use]
pub fn custom_data_topic(data_type: &DataType) -> String {
    format!("events.data.custom.{}", data_type.topic())
}

/// Order events of one strategy
#[must_use]
pub fn order_events_topic(strategy_id: &StrategyId) -> String {
    format!("events.order.{strategy_id}")
}

/// Topic a record is published on
#[must_use]
pub fn topic_for(data: &Data) -> String {
    match data {
        Data::Delta(delta) => deltas_topic(&delta.instrument_id),
        Data::Deltas(deltas) => deltas_topic(&deltas.instrument_id),
        Data::Depth10(depth) => depth10_topic(&depth.instrument_id),
        Data::Quote(quote) => quotes_topic(&quote.instrument_id),
        Data::Trade(trade) => trades_topic(&trade.instrument_id),
        Data::Bar(bar) => bars_topic(&bar.bar_type),
        Data::MarkPriceUpdate(mark) => mark_price_topic(&mark.instrument_id),
        Data::IndexPriceUpdate(index) => index_price_topic(&index.instrument_id),
        Data::FundingRate(rate) => funding_rate_topic(&rate.instrument_id),
        Data::InstrumentStatus(status) => instrument_status_topic(&status.instrument_id),
        Data::InstrumentClose(close) => instrument_close_topic(&close.instrument_id),
        Data::Custom(custom) => custom_data_topic(&custom.data_type),
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::BTreeMap, str::FromStr};

    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(quotes_topic, "events.data.quote.BINANCE.ETHUSDT-PERP")]
    #[case(trades_topic, "events.data.trade.BINANCE.ETHUSDT-PERP")]
    #[case(deltas_topic, "events.data.deltas.BINANCE.ETHUSDT-PERP")]
    #[case(book_snapshots_topic, "events.data.book.snapshots.BINANCE.ETHUSDT-PERP")]
    #[case(mark_price_topic, "events.data.mark_price.BINANCE.ETHUSDT-PERP")]
    fn test_instrument_topics(#[case] topic: fn(&InstrumentId) -> String, #[case] expected: &str) {
        let instrument_id = InstrumentId::from("ETHUSDT-PERP.BINANCE");
        assert_eq!(topic(&instrument_id), expected);
    }

    #[rstest]
    fn test_bars_topic_carries_spec() {
        let bar_type = BarType::from_str("BTC-USDT.OKX-1-MINUTE-LAST-EXTERNAL").unwrap();
        assert_eq!(
            bars_topic(&bar_type),
            "events.data.bar.OKX.BTC-USDT.1-MINUTE-LAST"
        );
    }

    #[rstest]
    fn test_custom_and_order_topics() {
        let data_type = DataType::new(
            "Greeks",
            Some(BTreeMap::from([("venue".to_string(), "DERIBIT".to_string())])),
        );

        assert_eq!(
            custom_data_topic(&data_type),
            "events.data.custom.Greeks.venue=DERIBIT"
        );
        assert_eq!(
            order_events_topic(&StrategyId::from("S-001")),
            "events.order.S-001"
        );
    }
}
