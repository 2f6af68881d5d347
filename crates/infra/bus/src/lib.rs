//! In-process message bus
//!
//! [`MessageBus`] carries one message type over two kinds of address:
//!
//! - topics: exact-match publish/subscribe fan-out, e.g. `events.data.quote.BINANCE.BTCUSDT`
//! - endpoints: named point-to-point queues with a single receiver, e.g. `data_engine_execute`
//!
//! Queues are crossbeam channels, so receivers can live on any thread and publishers never
//! block.

#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![deny(clippy::all)]

pub mod bus;
pub mod channel;
pub mod error;

pub use bus::{Message, MessageBus, SubscriptionId};
pub use channel::{Receiver, RecvTimeoutError};
pub use error::{BusError, BusResult};
