//! Market data model and instrument definitions
//!
//! Records in [`data`] are the normalized events venue adapters emit and the order
//! book consumes. [`instruments`] holds the immutable venue-side definitions that
//! engines cache and use for precision and quantity conversion.

#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![deny(clippy::all)]

pub mod data;
pub mod error;
pub mod instruments;

pub use error::{ModelError, ModelResult};
