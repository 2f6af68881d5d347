//! Arrow record batch encodings
//!
//! Each record type declares its schema, encodes a slice of records into one
//! [`RecordBatch`] and decodes a batch back. Precisions and identifiers are not stored
//! per row: they travel in the schema metadata under [`KEY_BAR_TYPE`],
//! [`KEY_INSTRUMENT_ID`], [`KEY_PRICE_PRECISION`] and [`KEY_SIZE_PRECISION`].

pub mod bar;
pub mod depth;

use std::collections::HashMap;

use arrow::{
    array::{Array, ArrayRef},
    datatypes::{DataType, Schema},
    record_batch::RecordBatch,
};
use common::{PriceRaw, QuantityRaw, fixed::PRECISION_BYTES};

use crate::error::{EncodingError, EncodingResult};

/// Metadata key of a bar batch's bar type
pub const KEY_BAR_TYPE: &str = "bar_type";
/// Metadata key of the batch's instrument
pub const KEY_INSTRUMENT_ID: &str = "instrument_id";
/// Metadata key of the price precision shared by every row
pub const KEY_PRICE_PRECISION: &str = "price_precision";
/// Metadata key of the size precision shared by every row
pub const KEY_SIZE_PRECISION: &str = "size_precision";

/// Width in bytes of a fixed-point value column
pub const FIXED_WIDTH: usize = PRECISION_BYTES as usize;

/// Records with a fixed Arrow schema
pub trait ArrowSchemaProvider {
    /// Schema of an encoded batch, carrying `metadata` when given
    fn get_schema(metadata: Option<HashMap<String, String>>) -> Schema;
}

/// Records that encode into a [`RecordBatch`]
pub trait EncodeToRecordBatch: ArrowSchemaProvider + Sized {
    /// Encodes `data` as one batch with `metadata` attached to its schema
    ///
    /// # Errors
    ///
    /// Returns [`EncodingError::Arrow`] if the batch cannot be assembled.
    fn encode_batch(
        metadata: &HashMap<String, String>,
        data: &[Self],
    ) -> EncodingResult<RecordBatch>;

    /// Metadata describing this record's batch
    fn metadata(&self) -> HashMap<String, String>;
}

/// Records that decode from a [`RecordBatch`]
pub trait DecodeFromRecordBatch: Sized {
    /// Decodes every row of `batch` using `metadata` for precisions and identifiers
    ///
    /// # Errors
    ///
    /// Returns [`EncodingError::MissingMetadata`] or [`EncodingError::ParseError`] for
    /// unusable metadata and a column error when the batch does not match the schema.
    fn decode_batch(
        metadata: &HashMap<String, String>,
        batch: &RecordBatch,
    ) -> EncodingResult<Vec<Self>>;
}

pub(crate) fn metadata_value<'a>(
    metadata: &'a HashMap<String, String>,
    key: &'static str,
) -> EncodingResult<&'a str> {
    metadata
        .get(key)
        .map(String::as_str)
        .ok_or(EncodingError::MissingMetadata(key))
}

pub(crate) fn parse_precision(
    metadata: &HashMap<String, String>,
    key: &'static str,
) -> EncodingResult<u8> {
    metadata_value(metadata, key)?
        .parse::<u8>()
        .map_err(|e| EncodingError::ParseError(key, e.to_string()))
}

/// Column `name` at `index`, downcast to `A` after checking its type
pub(crate) fn extract_column<'a, A: Array + 'static>(
    columns: &'a [ArrayRef],
    name: &str,
    index: usize,
    expected: &DataType,
) -> EncodingResult<&'a A> {
    let column = columns.get(index).ok_or_else(|| EncodingError::MissingColumn {
        name: name.to_string(),
        index,
    })?;
    let invalid = || EncodingError::InvalidColumnType {
        name: name.to_string(),
        expected: expected.clone(),
        actual: column.data_type().clone(),
    };
    if column.data_type() != expected {
        return Err(invalid());
    }
    column.as_any().downcast_ref::<A>().ok_or_else(invalid)
}

fn width_error(field: &'static str, found: usize) -> EncodingError {
    EncodingError::ParseError(field, format!("expected {FIXED_WIDTH} bytes, found {found}"))
}

pub(crate) fn raw_price(bytes: &[u8], field: &'static str) -> EncodingResult<PriceRaw> {
    let bytes: [u8; FIXED_WIDTH] = bytes
        .try_into()
        .map_err(|_| width_error(field, bytes.len()))?;
    Ok(PriceRaw::from_le_bytes(bytes))
}

pub(crate) fn raw_quantity(bytes: &[u8], field: &'static str) -> EncodingResult<QuantityRaw> {
    let bytes: [u8; FIXED_WIDTH] = bytes
        .try_into()
        .map_err(|_| width_error(field, bytes.len()))?;
    Ok(QuantityRaw::from_le_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn test_missing_metadata() {
        let metadata = HashMap::new();
        assert!(matches!(
            parse_precision(&metadata, KEY_PRICE_PRECISION),
            Err(EncodingError::MissingMetadata(KEY_PRICE_PRECISION))
        ));
    }

    #[rstest]
    #[case("x")]
    #[case("-1")]
    #[case("256")]
    fn test_bad_precision(#[case] value: &str) {
        let metadata = HashMap::from([(KEY_SIZE_PRECISION.to_string(), value.to_string())]);
        assert!(matches!(
            parse_precision(&metadata, KEY_SIZE_PRECISION),
            Err(EncodingError::ParseError(KEY_SIZE_PRECISION, _))
        ));
    }

    #[rstest]
    fn test_raw_values_are_little_endian() {
        assert_eq!(raw_price(&(-5i64).to_le_bytes(), "p").unwrap(), -5);
        assert_eq!(raw_quantity(&7u64.to_le_bytes(), "q").unwrap(), 7);
        assert!(raw_price(&[0u8; 4], "p").is_err());
    }
}
