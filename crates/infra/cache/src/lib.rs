//! Shared cache for the trading-data plane
//!
//! [`Cache`] holds the latest instrument definitions, orders, order books and market data.
//! It is created once per process and handed to the engines as a [`SharedCache`]; every
//! mutation happens on the main task while it holds the write lock.
//!
//! [`InstrumentSnapshot`] is the adapters' view of instruments: an immutable map swapped
//! atomically on refresh so decoders never wait for the writer.

#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![deny(clippy::all)]

pub mod cache;
pub mod error;
pub mod snapshot;

pub use cache::{Cache, CacheConfig, SharedCache};
pub use error::{CacheError, CacheResult};
pub use snapshot::InstrumentSnapshot;
