//! Limit order book for L1, L2 and L3 market data
//!
//! An [`OrderBook`] keeps one [`BookLadder`] per side. Ladders hold [`BookLevel`]s sorted
//! by [`BookPrice`] (bids descending, asks ascending) and an `order_id -> price` index so
//! updates and deletes by id do not scan the book.

#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![deny(clippy::all)]

pub mod analysis;
pub mod book;
mod display;
pub mod error;
pub mod ladder;
pub mod level;

pub use book::{OrderBook, pre_process_order};
pub use error::{BookError, BookIntegrityError, BookResult};
pub use ladder::BookLadder;
pub use level::{BookLevel, BookPrice};
