//! Error types for matching and emulation

use common::{ClientOrderId, InstrumentId, OrderType, TrailingOffsetType, TriggerType};
use oms::OrderError;
use thiserror::Error;

/// Matching core and emulator errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The order is not held by the matching core
    #[error("Order {client_order_id} not found in matching core for {instrument_id}")]
    OrderNotFound {
        /// Order that was looked up
        client_order_id: ClientOrderId,
        /// Instrument of the matching core
        instrument_id: InstrumentId,
    },

    /// The order is already held by the matching core
    #[error("Order {client_order_id} is already held by the matching core")]
    DuplicateOrder {
        /// Order that was added twice
        client_order_id: ClientOrderId,
    },

    /// The order cannot rest in a matching core
    #[error("Order {client_order_id} ({order_type}) cannot be matched: {reason}")]
    NotPassive {
        /// Offending order
        client_order_id: ClientOrderId,
        /// Type of the order
        order_type: OrderType,
        /// Why it was refused
        reason: &'static str,
    },

    /// Trailing stops do not support this trigger type
    #[error("Trigger type {trigger_type} not supported for {context}")]
    UnsupportedTrigger {
        /// Trigger type on the order
        trigger_type: TriggerType,
        /// Operation that refused it
        context: &'static str,
    },

    /// Trailing stops do not support this offset type
    #[error("Trailing offset type {offset_type} not supported")]
    UnsupportedOffsetType {
        /// Offset type on the order
        offset_type: TrailingOffsetType,
    },

    /// The trailing price could not be represented
    #[error("Trailing stop calculation failed for {client_order_id}: {reason}")]
    Trailing {
        /// Order being trailed
        client_order_id: ClientOrderId,
        /// Underlying failure
        reason: String,
    },

    /// No matching core exists for the trigger instrument
    #[error("No matching core for {instrument_id}")]
    NoMatchingCore {
        /// Trigger instrument
        instrument_id: InstrumentId,
    },

    /// The emulator refused the order
    #[error("Cannot emulate {client_order_id}: {reason}")]
    CannotEmulate {
        /// Refused order
        client_order_id: ClientOrderId,
        /// Why it was refused
        reason: String,
    },

    /// The emulator does not know this order
    #[error("Order {client_order_id} is not managed by the emulator")]
    UnknownOrder {
        /// Order that was looked up
        client_order_id: ClientOrderId,
    },

    /// Applying an event to an order failed
    #[error(transparent)]
    Order(#[from] OrderError),
}

/// Result alias for this crate
pub type EngineResult<T> = Result<T, EngineError>;
