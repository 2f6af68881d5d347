//! Core value types for the trading-data plane
//!
//! Everything here is an immutable value: fixed-point [`Price`], [`Quantity`] and
//! [`Money`], interned identifiers, nanosecond timestamps and the shared enums used by
//! the book, order and data-engine crates.

#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![deny(clippy::all)]

pub mod clock;
pub mod currency;
pub mod enums;
pub mod error;
pub mod fixed;
pub mod identifiers;
pub mod logging;
pub mod money;
pub mod price;
pub mod quantity;
pub mod time;
pub mod uuid;

pub use clock::{Clock, LiveClock, TestClock};
pub use currency::Currency;
pub use enums::*;
pub use error::{IdentifierError, MoneyError, PriceError, QuantityError};
pub use identifiers::{
    AccountId, ClientId, ClientOrderId, ExecAlgorithmId, InstrumentId, OrderListId, PositionId,
    StrategyId, Symbol, TradeId, TraderId, Venue, VenueOrderId,
};
pub use money::Money;
pub use price::{Price, PriceRaw};
pub use quantity::{Quantity, QuantityRaw};
pub use time::UnixNanos;
pub use uuid::UUID4;

/// Re-export so downstream crates agree on one decimal type
pub use rust_decimal::Decimal;
