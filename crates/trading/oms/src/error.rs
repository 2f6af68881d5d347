//! Error types for orders and order events

use common::{ClientOrderId, OrderStatus, OrderType};
use thiserror::Error;

/// Order-specific error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OrderError {
    /// The event is not permitted from the order's current status
    #[error("Invalid state transition for {client_order_id}: {status} on {event}")]
    InvalidStateTransition {
        /// Order the event was applied to
        client_order_id: ClientOrderId,
        /// Status at the time of the event
        status: OrderStatus,
        /// Event kind that was rejected
        event: &'static str,
    },

    /// The event belongs to a different order or strategy
    #[error("Event for {event_value} applied to order with {field} {order_value}")]
    IdentityMismatch {
        /// Identity field that differs
        field: &'static str,
        /// Value held by the order
        order_value: String,
        /// Value carried by the event
        event_value: String,
    },

    /// An `Initialized` event was applied to an existing order
    #[error("Order {client_order_id} is already initialized")]
    AlreadyInitialized {
        /// Order the event was applied to
        client_order_id: ClientOrderId,
    },

    /// Quantity is zero or below what has already been filled
    #[error("Invalid quantity for {client_order_id}: {reason}")]
    InvalidQuantity {
        /// Order being built or updated
        client_order_id: ClientOrderId,
        /// Which rule was violated
        reason: String,
    },

    /// A field required by the order type is missing or malformed
    #[error("Invalid {order_type} order {client_order_id}: {reason}")]
    InvalidOrder {
        /// Order being built
        client_order_id: ClientOrderId,
        /// Order type requested
        order_type: OrderType,
        /// Which rule was violated
        reason: String,
    },

    /// Fill arithmetic overflowed or mixed precisions
    #[error("Fill rejected for {client_order_id}: {reason}")]
    InvalidFill {
        /// Order the fill was applied to
        client_order_id: ClientOrderId,
        /// Which rule was violated
        reason: String,
    },

    /// An order list violated its construction rules
    #[error("Invalid order list: {reason}")]
    InvalidOrderList {
        /// Which rule was violated
        reason: String,
    },
}

/// Type alias for order results
pub type OmsResult<T> = Result<T, OrderError>;
