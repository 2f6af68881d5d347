//! Error types for market data records and instruments

use thiserror::Error;

/// Validation failures when building records or instruments
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// A batch must contain at least one element
    #[error("{kind} batch cannot be empty")]
    EmptyBatch {
        /// Record type of the batch
        kind: &'static str,
    },

    /// Records of one batch must share an instrument
    #[error("Instrument mismatch: expected {expected}, found {found}")]
    InstrumentMismatch {
        /// Instrument of the batch
        expected: String,
        /// Instrument of the offending record
        found: String,
    },

    /// Two related fields carry different precisions
    #[error("Precision mismatch for {field}: {left} != {right}")]
    PrecisionMismatch {
        /// Field pair being compared
        field: &'static str,
        /// Precision of the first field
        left: u8,
        /// Precision of the second field
        right: u8,
    },

    /// OHLC values are inconsistent
    #[error("Invalid bar: {reason}")]
    InvalidBar {
        /// Which rule was violated
        reason: String,
    },

    /// A bar type string could not be parsed
    #[error("Invalid bar type '{value}': {reason}")]
    InvalidBarType {
        /// The rejected input
        value: String,
        /// Which part failed
        reason: String,
    },

    /// An instrument definition is invalid or a conversion failed
    #[error("Invalid instrument {instrument_id}: {reason}")]
    InvalidInstrument {
        /// Instrument being built or used
        instrument_id: String,
        /// Which rule was violated
        reason: String,
    },
}

/// Result alias for model operations
pub type ModelResult<T> = Result<T, ModelError>;
