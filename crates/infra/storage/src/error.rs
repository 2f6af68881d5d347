//! Encoding errors

use arrow::{datatypes::DataType, error::ArrowError};
use thiserror::Error;

/// Result alias for encoding and decoding
pub type EncodingResult<T> = Result<T, EncodingError>;

/// Failures converting between records and Arrow batches
#[derive(Debug, Error)]
pub enum EncodingError {
    /// A required schema metadata key is absent
    #[error("missing metadata key '{0}'")]
    MissingMetadata(&'static str),

    /// A metadata value or column value could not be parsed
    #[error("cannot parse '{0}': {1}")]
    ParseError(&'static str, String),

    /// A required column is absent
    #[error("missing column '{name}' at index {index}")]
    MissingColumn {
        /// Expected column name
        name: String,
        /// Expected column position
        index: usize,
    },

    /// A column has the wrong Arrow type
    #[error("column '{name}' has type {actual}, expected {expected}")]
    InvalidColumnType {
        /// Column name
        name: String,
        /// Required type
        expected: DataType,
        /// Type found in the batch
        actual: DataType,
    },

    /// Arrow refused to build the batch
    #[error(transparent)]
    Arrow(#[from] ArrowError),
}
