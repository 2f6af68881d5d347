//! `OrderBookDepth10` columns
//!
//! One row per snapshot with ten columns per level attribute:
//! `bid_price_0..9`, `ask_price_0..9`, `bid_size_0..9`, `ask_size_0..9`,
//! `bid_count_0..9`, `ask_count_0..9`, then `flags`, `sequence`, `ts_event`, `ts_init`.
//! Order identifiers are not stored. Empty slots encode as zero price and size and
//! decode back to [`BookOrder::null`].

use std::{collections::HashMap, str::FromStr, sync::Arc};

use arrow::{
    array::{ArrayRef, Int64Array, UInt8Array, UInt64Array},
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use common::{InstrumentId, OrderSide, Price, Quantity, UnixNanos};
use model::data::{BookOrder, DEPTH10_LEN, OrderBookDepth10};

use super::{
    ArrowSchemaProvider, DecodeFromRecordBatch, EncodeToRecordBatch, KEY_INSTRUMENT_ID,
    KEY_PRICE_PRECISION, KEY_SIZE_PRECISION, extract_column, metadata_value, parse_precision,
};
use tracing::trace;

use crate::error::{EncodingError, EncodingResult};

const FLAGS_INDEX: usize = 6 * DEPTH10_LEN;
const SEQUENCE_INDEX: usize = FLAGS_INDEX + 1;
const TS_EVENT_INDEX: usize = FLAGS_INDEX + 2;
const TS_INIT_INDEX: usize = FLAGS_INDEX + 3;

/// Level columns in schema order with their Arrow type
const LEVEL_GROUPS: [(&str, DataType); 6] = [
    ("bid_price", DataType::Int64),
    ("ask_price", DataType::Int64),
    ("bid_size", DataType::UInt64),
    ("ask_size", DataType::UInt64),
    ("bid_count", DataType::UInt64),
    ("ask_count", DataType::UInt64),
];

fn level_name(group: &str, level: usize) -> String {
    format!("{group}_{level}")
}

impl ArrowSchemaProvider for OrderBookDepth10 {
    fn get_schema(metadata: Option<HashMap<String, String>>) -> Schema {
        let mut fields = Vec::with_capacity(TS_INIT_INDEX + 1);
        for (group, data_type) in &LEVEL_GROUPS {
            for level in 0..DEPTH10_LEN {
                fields.push(Field::new(level_name(group, level), data_type.clone(), false));
            }
        }
        fields.push(Field::new("flags", DataType::UInt8, false));
        fields.push(Field::new("sequence", DataType::UInt64, false));
        fields.push(Field::new("ts_event", DataType::UInt64, false));
        fields.push(Field::new("ts_init", DataType::UInt64, false));

        match metadata {
            Some(metadata) => Schema::new_with_metadata(fields, metadata),
            None => Schema::new(fields),
        }
    }
}

/// Schema metadata for a batch of `instrument_id` depth snapshots
#[must_use]
pub fn depth_metadata(
    instrument_id: &InstrumentId,
    price_precision: u8,
    size_precision: u8,
) -> HashMap<String, String> {
    HashMap::from([
        (KEY_INSTRUMENT_ID.to_string(), instrument_id.to_string()),
        (KEY_PRICE_PRECISION.to_string(), price_precision.to_string()),
        (KEY_SIZE_PRECISION.to_string(), size_precision.to_string()),
    ])
}

/// Precision of the first populated level, zero for an empty snapshot
fn precisions(depth: &OrderBookDepth10) -> (u8, u8) {
    depth
        .bids
        .iter()
        .chain(depth.asks.iter())
        .find(|order| !order.is_null())
        .map_or((0, 0), |order| (order.price.precision, order.size.precision))
}

fn parse_metadata(metadata: &HashMap<String, String>) -> EncodingResult<(InstrumentId, u8, u8)> {
    let instrument_id = InstrumentId::from_str(metadata_value(metadata, KEY_INSTRUMENT_ID)?)
        .map_err(|e| EncodingError::ParseError(KEY_INSTRUMENT_ID, e.to_string()))?;
    let price_precision = parse_precision(metadata, KEY_PRICE_PRECISION)?;
    let size_precision = parse_precision(metadata, KEY_SIZE_PRECISION)?;
    Ok((instrument_id, price_precision, size_precision))
}

impl EncodeToRecordBatch for OrderBookDepth10 {
    #[allow(clippy::needless_range_loop)]
    fn encode_batch(
        metadata: &HashMap<String, String>,
        data: &[Self],
    ) -> EncodingResult<RecordBatch> {
        let rows = data.len();
        trace!(rows, "Encoding depth batch");
        let mut bid_prices: Vec<_> = (0..DEPTH10_LEN).map(|_| Int64Array::builder(rows)).collect();
        let mut ask_prices: Vec<_> = (0..DEPTH10_LEN).map(|_| Int64Array::builder(rows)).collect();
        let mut bid_sizes: Vec<_> = (0..DEPTH10_LEN).map(|_| UInt64Array::builder(rows)).collect();
        let mut ask_sizes: Vec<_> = (0..DEPTH10_LEN).map(|_| UInt64Array::builder(rows)).collect();
        let mut bid_counts: Vec<_> = (0..DEPTH10_LEN).map(|_| UInt64Array::builder(rows)).collect();
        let mut ask_counts: Vec<_> = (0..DEPTH10_LEN).map(|_| UInt64Array::builder(rows)).collect();
        let mut flags = UInt8Array::builder(rows);
        let mut sequence = UInt64Array::builder(rows);
        let mut ts_event = UInt64Array::builder(rows);
        let mut ts_init = UInt64Array::builder(rows);

        for depth in data {
            for level in 0..DEPTH10_LEN {
                bid_prices[level].append_value(depth.bids[level].price.raw);
                ask_prices[level].append_value(depth.asks[level].price.raw);
                bid_sizes[level].append_value(depth.bids[level].size.raw);
                ask_sizes[level].append_value(depth.asks[level].size.raw);
                bid_counts[level].append_value(u64::from(depth.bid_counts[level]));
                ask_counts[level].append_value(u64::from(depth.ask_counts[level]));
            }
            flags.append_value(depth.flags);
            sequence.append_value(depth.sequence);
            ts_event.append_value(depth.ts_event.as_u64());
            ts_init.append_value(depth.ts_init.as_u64());
        }

        let mut columns: Vec<ArrayRef> = Vec::with_capacity(TS_INIT_INDEX + 1);
        columns.extend(bid_prices.iter_mut().map(|b| Arc::new(b.finish()) as ArrayRef));
        columns.extend(ask_prices.iter_mut().map(|b| Arc::new(b.finish()) as ArrayRef));
        for group in [&mut bid_sizes, &mut ask_sizes, &mut bid_counts, &mut ask_counts] {
            columns.extend(group.iter_mut().map(|b| Arc::new(b.finish()) as ArrayRef));
        }
        columns.push(Arc::new(flags.finish()));
        columns.push(Arc::new(sequence.finish()));
        columns.push(Arc::new(ts_event.finish()));
        columns.push(Arc::new(ts_init.finish()));

        let schema = Self::get_schema(Some(metadata.clone()));
        Ok(RecordBatch::try_new(Arc::new(schema), columns)?)
    }

    fn metadata(&self) -> HashMap<String, String> {
        let (price_precision, size_precision) = precisions(self);
        depth_metadata(&self.instrument_id, price_precision, size_precision)
    }
}

/// The ten columns of one level group, in level order
fn level_columns<'a, A: arrow::array::Array + 'static>(
    columns: &'a [ArrayRef],
    group_index: usize,
) -> EncodingResult<Vec<&'a A>> {
    let (group, data_type) = &LEVEL_GROUPS[group_index];
    (0..DEPTH10_LEN)
        .map(|level| {
            extract_column::<A>(
                columns,
                &level_name(group, level),
                group_index * DEPTH10_LEN + level,
                data_type,
            )
        })
        .collect()
}

fn decode_order(
    side: OrderSide,
    price_raw: i64,
    size_raw: u64,
    price_precision: u8,
    size_precision: u8,
) -> EncodingResult<BookOrder> {
    if price_raw == 0 && size_raw == 0 {
        return Ok(BookOrder::null());
    }
    let price = Price::from_raw(price_raw, price_precision)
        .map_err(|e| EncodingError::ParseError("price", e.to_string()))?;
    let size = Quantity::from_raw(size_raw, size_precision)
        .map_err(|e| EncodingError::ParseError("size", e.to_string()))?;
    Ok(BookOrder::new(side, price, size, 0))
}

fn narrow_count(value: u64) -> EncodingResult<u32> {
    u32::try_from(value).map_err(|e| EncodingError::ParseError("count", e.to_string()))
}

impl DecodeFromRecordBatch for OrderBookDepth10 {
    #[allow(clippy::needless_range_loop)]
    fn decode_batch(
        metadata: &HashMap<String, String>,
        batch: &RecordBatch,
    ) -> EncodingResult<Vec<Self>> {
        let (instrument_id, price_precision, size_precision) = parse_metadata(metadata)?;
        let columns = batch.columns();

        let bid_prices = level_columns::<Int64Array>(columns, 0)?;
        let ask_prices = level_columns::<Int64Array>(columns, 1)?;
        let bid_sizes = level_columns::<UInt64Array>(columns, 2)?;
        let ask_sizes = level_columns::<UInt64Array>(columns, 3)?;
        let bid_counts = level_columns::<UInt64Array>(columns, 4)?;
        let ask_counts = level_columns::<UInt64Array>(columns, 5)?;
        let flags = extract_column::<UInt8Array>(columns, "flags", FLAGS_INDEX, &DataType::UInt8)?;
        let sequence =
            extract_column::<UInt64Array>(columns, "sequence", SEQUENCE_INDEX, &DataType::UInt64)?;
        let ts_event =
            extract_column::<UInt64Array>(columns, "ts_event", TS_EVENT_INDEX, &DataType::UInt64)?;
        let ts_init =
            extract_column::<UInt64Array>(columns, "ts_init", TS_INIT_INDEX, &DataType::UInt64)?;

        let mut result = Vec::with_capacity(batch.num_rows());
        for row in 0..batch.num_rows() {
            let mut bids = [BookOrder::null(); DEPTH10_LEN];
            let mut asks = [BookOrder::null(); DEPTH10_LEN];
            let mut bid_count = [0u32; DEPTH10_LEN];
            let mut ask_count = [0u32; DEPTH10_LEN];

            for level in 0..DEPTH10_LEN {
                bids[level] = decode_order(
                    OrderSide::Buy,
                    bid_prices[level].value(row),
                    bid_sizes[level].value(row),
                    price_precision,
                    size_precision,
                )?;
                asks[level] = decode_order(
                    OrderSide::Sell,
                    ask_prices[level].value(row),
                    ask_sizes[level].value(row),
                    price_precision,
                    size_precision,
                )?;
                bid_count[level] = narrow_count(bid_counts[level].value(row))?;
                ask_count[level] = narrow_count(ask_counts[level].value(row))?;
            }

            result.push(Self::new(
                instrument_id,
                bids,
                asks,
                bid_count,
                ask_count,
                flags.value(row),
                sequence.value(row),
                UnixNanos::from(ts_event.value(row)),
                UnixNanos::from(ts_init.value(row)),
            ));
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    fn sparse_depth() -> OrderBookDepth10 {
        let mut bids = [BookOrder::null(); DEPTH10_LEN];
        let mut asks = [BookOrder::null(); DEPTH10_LEN];
        bids[0] = BookOrder::new(
            OrderSide::Buy,
            Price::from_str("1.00010").unwrap(),
            Quantity::from_str("100000").unwrap(),
            0,
        );
        asks[0] = BookOrder::new(
            OrderSide::Sell,
            Price::from_str("1.00020").unwrap(),
            Quantity::from_str("200000").unwrap(),
            0,
        );
        let mut bid_counts = [0; DEPTH10_LEN];
        let mut ask_counts = [0; DEPTH10_LEN];
        bid_counts[0] = 1;
        ask_counts[0] = 2;
        OrderBookDepth10::new(
            InstrumentId::from("AUD/USD.SIM"),
            bids,
            asks,
            bid_counts,
            ask_counts,
            0,
            42,
            UnixNanos::from(5),
            UnixNanos::from(6),
        )
    }

    #[rstest]
    fn test_schema_layout() {
        let schema = OrderBookDepth10::get_schema(None);

        assert_eq!(schema.fields().len(), 64);
        assert_eq!(schema.field(0).name(), "bid_price_0");
        assert_eq!(schema.field(19).name(), "ask_price_9");
        assert_eq!(schema.field(20).data_type(), &DataType::UInt64);
        assert_eq!(schema.field(FLAGS_INDEX).name(), "flags");
        assert_eq!(schema.field(TS_INIT_INDEX).name(), "ts_init");
    }

    #[rstest]
    fn test_metadata_from_first_populated_level() {
        let metadata = sparse_depth().metadata();

        assert_eq!(metadata[KEY_INSTRUMENT_ID], "AUD/USD.SIM");
        assert_eq!(metadata[KEY_PRICE_PRECISION], "5");
        assert_eq!(metadata[KEY_SIZE_PRECISION], "0");
    }

    #[rstest]
    fn test_null_padding_round_trips() {
        let depth = sparse_depth();
        let metadata = depth.metadata();

        let batch = OrderBookDepth10::encode_batch(&metadata, &[depth]).unwrap();
        let decoded = OrderBookDepth10::decode_batch(&metadata, &batch).unwrap();

        assert_eq!(decoded, vec![depth]);
        assert!(decoded[0].bids[1].is_null());
    }

    #[rstest]
    fn test_decode_rejects_wrong_column_type() {
        let depth = sparse_depth();
        let metadata = depth.metadata();
        let schema = Schema::new(vec![Field::new("bid_price_0", DataType::UInt8, false)]);
        let column: ArrayRef = Arc::new(UInt8Array::from(vec![1u8]));
        let batch = RecordBatch::try_new(Arc::new(schema), vec![column]).unwrap();

        let result = OrderBookDepth10::decode_batch(&metadata, &batch);

        assert!(matches!(
            result,
            Err(EncodingError::InvalidColumnType { ref name, .. }) if name == "bid_price_0"
        ));
    }
}
