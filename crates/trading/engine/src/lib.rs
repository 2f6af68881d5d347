//! Order matching and local order emulation
//!
//! - [`matching_core`]: per-instrument evaluation of resting orders against bid, ask
//!   and last prices
//! - [`trailing`]: trailing stop trigger and limit calculation
//! - [`emulator`]: holds emulated orders, releases them when triggered and manages
//!   OTO, OCO and OUO contingencies

#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![deny(clippy::all)]

pub mod emulator;
pub mod error;
pub mod matching_core;
pub mod trailing;

pub use emulator::{EmulatorOutput, OrderEmulator};
pub use error::{EngineError, EngineResult};
pub use matching_core::{MatchAction, OrderMatchingCore, PassiveOrder};
pub use trailing::{is_activation_reached, trailing_stop_calculate};
