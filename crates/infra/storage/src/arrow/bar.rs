//! `Bar` columns: OHLCV as fixed-width little-endian raw values plus two timestamps

use std::{collections::HashMap, str::FromStr, sync::Arc};

use arrow::{
    array::{ArrayRef, FixedSizeBinaryArray, FixedSizeBinaryBuilder, UInt64Array},
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use common::{Price, Quantity, UnixNanos, fixed::PRECISION_BYTES};
use model::data::{Bar, BarType};

use super::{
    ArrowSchemaProvider, DecodeFromRecordBatch, EncodeToRecordBatch, KEY_BAR_TYPE,
    KEY_PRICE_PRECISION, KEY_SIZE_PRECISION, extract_column, metadata_value, parse_precision,
    raw_price, raw_quantity,
};
use tracing::trace;

use crate::error::{EncodingError, EncodingResult};

const VALUE_COLUMNS: [&str; 5] = ["open", "high", "low", "close", "volume"];

impl ArrowSchemaProvider for Bar {
    fn get_schema(metadata: Option<HashMap<String, String>>) -> Schema {
        let mut fields: Vec<Field> = VALUE_COLUMNS
            .iter()
            .map(|name| Field::new(*name, DataType::FixedSizeBinary(PRECISION_BYTES), false))
            .collect();
        fields.push(Field::new("ts_event", DataType::UInt64, false));
        fields.push(Field::new("ts_init", DataType::UInt64, false));

        match metadata {
            Some(metadata) => Schema::new_with_metadata(fields, metadata),
            None => Schema::new(fields),
        }
    }
}

/// Schema metadata for a batch of `bar_type` bars
#[must_use]
pub fn bar_metadata(
    bar_type: &BarType,
    price_precision: u8,
    size_precision: u8,
) -> HashMap<String, String> {
    HashMap::from([
        (KEY_BAR_TYPE.to_string(), bar_type.to_string()),
        (KEY_PRICE_PRECISION.to_string(), price_precision.to_string()),
        (KEY_SIZE_PRECISION.to_string(), size_precision.to_string()),
    ])
}

fn parse_metadata(metadata: &HashMap<String, String>) -> EncodingResult<(BarType, u8, u8)> {
    let bar_type = BarType::from_str(metadata_value(metadata, KEY_BAR_TYPE)?)
        .map_err(|e| EncodingError::ParseError(KEY_BAR_TYPE, e.to_string()))?;
    let price_precision = parse_precision(metadata, KEY_PRICE_PRECISION)?;
    let size_precision = parse_precision(metadata, KEY_SIZE_PRECISION)?;
    Ok((bar_type, price_precision, size_precision))
}

impl EncodeToRecordBatch for Bar {
    fn encode_batch(
        metadata: &HashMap<String, String>,
        data: &[Self],
    ) -> EncodingResult<RecordBatch> {
        trace!(rows = data.len(), "Encoding bar batch");
        let mut value_builders: Vec<FixedSizeBinaryBuilder> = VALUE_COLUMNS
            .iter()
            .map(|_| FixedSizeBinaryBuilder::with_capacity(data.len(), PRECISION_BYTES))
            .collect();
        let mut ts_event_builder = UInt64Array::builder(data.len());
        let mut ts_init_builder = UInt64Array::builder(data.len());

        for bar in data {
            let values = [
                bar.open.raw.to_le_bytes(),
                bar.high.raw.to_le_bytes(),
                bar.low.raw.to_le_bytes(),
                bar.close.raw.to_le_bytes(),
                bar.volume.raw.to_le_bytes(),
            ];
            for (builder, value) in value_builders.iter_mut().zip(values) {
                builder.append_value(value)?;
            }
            ts_event_builder.append_value(bar.ts_event.as_u64());
            ts_init_builder.append_value(bar.ts_init.as_u64());
        }

        let mut columns: Vec<ArrayRef> = value_builders
            .into_iter()
            .map(|mut b| Arc::new(b.finish()) as ArrayRef)
            .collect();
        columns.push(Arc::new(ts_event_builder.finish()));
        columns.push(Arc::new(ts_init_builder.finish()));

        let schema = Self::get_schema(Some(metadata.clone()));
        Ok(RecordBatch::try_new(Arc::new(schema), columns)?)
    }

    fn metadata(&self) -> HashMap<String, String> {
        bar_metadata(&self.bar_type, self.open.precision, self.volume.precision)
    }
}

impl DecodeFromRecordBatch for Bar {
    fn decode_batch(
        metadata: &HashMap<String, String>,
        batch: &RecordBatch,
    ) -> EncodingResult<Vec<Self>> {
        let (bar_type, price_precision, size_precision) = parse_metadata(metadata)?;
        let columns = batch.columns();
        let fixed = DataType::FixedSizeBinary(PRECISION_BYTES);

        let open = extract_column::<FixedSizeBinaryArray>(columns, "open", 0, &fixed)?;
        let high = extract_column::<FixedSizeBinaryArray>(columns, "high", 1, &fixed)?;
        let low = extract_column::<FixedSizeBinaryArray>(columns, "low", 2, &fixed)?;
        let close = extract_column::<FixedSizeBinaryArray>(columns, "close", 3, &fixed)?;
        let volume = extract_column::<FixedSizeBinaryArray>(columns, "volume", 4, &fixed)?;
        let ts_event = extract_column::<UInt64Array>(columns, "ts_event", 5, &DataType::UInt64)?;
        let ts_init = extract_column::<UInt64Array>(columns, "ts_init", 6, &DataType::UInt64)?;

        let price = |array: &FixedSizeBinaryArray, row: usize, field: &'static str| {
            let raw = raw_price(array.value(row), field)?;
            Price::from_raw(raw, price_precision)
                .map_err(|e| EncodingError::ParseError(field, e.to_string()))
        };

        (0..batch.num_rows())
            .map(|row| {
                let volume_raw = raw_quantity(volume.value(row), "volume")?;
                let volume = Quantity::from_raw(volume_raw, size_precision)
                    .map_err(|e| EncodingError::ParseError("volume", e.to_string()))?;
                Ok(Self {
                    bar_type,
                    open: price(open, row, "open")?,
                    high: price(high, row, "high")?,
                    low: price(low, row, "low")?,
                    close: price(close, row, "close")?,
                    volume,
                    ts_event: UnixNanos::from(ts_event.value(row)),
                    ts_init: UnixNanos::from(ts_init.value(row)),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    use super::*;

    #[fixture]
    fn bar_type() -> BarType {
        BarType::from_str("AAPL.XNAS-1-MINUTE-LAST-EXTERNAL").unwrap()
    }

    fn bar(bar_type: BarType, open: &str, high: &str, low: &str, close: &str, ts: u64) -> Bar {
        Bar::new(
            bar_type,
            Price::from_str(open).unwrap(),
            Price::from_str(high).unwrap(),
            Price::from_str(low).unwrap(),
            Price::from_str(close).unwrap(),
            Quantity::from_str("1100").unwrap(),
            UnixNanos::from(ts),
            UnixNanos::from(ts),
        )
        .unwrap()
    }

    #[rstest]
    fn test_schema_shape() {
        let schema = Bar::get_schema(None);
        let names: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
        assert_eq!(
            names,
            vec!["open", "high", "low", "close", "volume", "ts_event", "ts_init"]
        );
        assert_eq!(
            schema.field(0).data_type(),
            &DataType::FixedSizeBinary(PRECISION_BYTES)
        );
        assert_eq!(schema.field(6).data_type(), &DataType::UInt64);
    }

    #[rstest]
    fn test_round_trip(bar_type: BarType) {
        let bars = vec![
            bar(bar_type, "100.10", "102.00", "100.00", "101.00", 1),
            bar(bar_type, "101.00", "101.50", "99.75", "100.00", 2),
        ];
        let metadata = bars[0].metadata();

        let batch = Bar::encode_batch(&metadata, &bars).unwrap();
        let decoded = Bar::decode_batch(&metadata, &batch).unwrap();

        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.schema().metadata().get(KEY_BAR_TYPE), Some(&bar_type.to_string()));
        assert_eq!(decoded, bars);
    }

    #[rstest]
    fn test_decode_requires_bar_type(bar_type: BarType) {
        let bars = vec![bar(bar_type, "1.00", "1.00", "1.00", "1.00", 1)];
        let mut metadata = bars[0].metadata();
        let batch = Bar::encode_batch(&metadata, &bars).unwrap();
        metadata.remove(KEY_BAR_TYPE);

        let result = Bar::decode_batch(&metadata, &batch);

        assert!(matches!(result, Err(EncodingError::MissingMetadata(KEY_BAR_TYPE))));
    }

    #[rstest]
    fn test_decode_rejects_unparseable_bar_type(bar_type: BarType) {
        let bars = vec![bar(bar_type, "1.00", "1.00", "1.00", "1.00", 1)];
        let mut metadata = bars[0].metadata();
        let batch = Bar::encode_batch(&metadata, &bars).unwrap();
        metadata.insert(KEY_BAR_TYPE.to_string(), "not-a-bar-type".to_string());

        let result = Bar::decode_batch(&metadata, &batch);

        assert!(matches!(result, Err(EncodingError::ParseError(KEY_BAR_TYPE, _))));
    }
}
