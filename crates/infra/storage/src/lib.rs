//! Columnar storage encodings
//!
//! Bars and depth-10 snapshots encode to Arrow record batches with fixed schemas. The
//! instrument or bar type and the price and size precisions travel in the schema
//! metadata, so rows carry raw fixed-point values only.

#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![deny(clippy::all)]

pub mod arrow;
pub mod error;

pub use crate::arrow::{
    ArrowSchemaProvider, DecodeFromRecordBatch, EncodeToRecordBatch, bar::bar_metadata,
    depth::depth_metadata,
};
pub use error::{EncodingError, EncodingResult};
