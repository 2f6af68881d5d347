//! Data engine
//!
//! Sits between strategies and venue data clients:
//!
//! - routes subscribe, unsubscribe and request commands to the client serving a venue
//! - reads every client's event stream, updates the cache and managed order books, and
//!   publishes each record on its topic
//! - publishes periodic snapshots of managed books
//! - converts quote-denominated order quantities to base units on the way to execution
//!
//! Commands arrive on the `data_engine_execute` bus endpoint when the engine is driven
//! by [`DataEngine::run`], or through [`DataEngine::execute`] when embedded.

#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![deny(clippy::all)]

pub mod config;
pub mod engine;
pub mod error;
pub mod messages;
mod orders;
mod runner;
mod tasks;
pub mod topics;

pub use config::DataEngineConfig;
pub use engine::{DataEngine, EngineState};
pub use error::{DataEngineError, DataEngineResult};
pub use messages::{
    BusMessage, DataCommand, RequestCommand, SubmitOrder, SubmitOrderList, SubscriptionCommand,
    TradingCommand,
};
