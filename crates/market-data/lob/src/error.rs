//! Order book errors

use common::{BookAction, BookType, OrderSideSpecified, Price, UnixNanos};
use thiserror::Error;

/// Errors raised while mutating a book
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BookError {
    /// Operation not supported for this book type
    #[error("Invalid book operation: {operation} on {book_type} book")]
    InvalidBookOperation {
        /// Book type of the target book
        book_type: BookType,
        /// Rejected operation
        operation: &'static str,
    },

    /// Delta without a side that could not be resolved
    #[error("Delta {action} has no order side")]
    NoOrderSide {
        /// Action of the rejected delta
        action: BookAction,
    },

    /// Merged level size exceeds the representable quantity
    #[error("Size overflow merging level at {price}")]
    SizeOverflow {
        /// Level being merged into
        price: Price,
    },

    /// Book failed an integrity check
    #[error(transparent)]
    Integrity(#[from] BookIntegrityError),
}

/// Structural problems found by [`crate::OrderBook::check_integrity`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BookIntegrityError {
    /// An order id expected in the book was not found
    #[error("Order {order_id} not found (sequence={sequence}, ts_event={ts_event})")]
    OrderNotFound {
        /// Missing order id
        order_id: u64,
        /// Sequence of the delta that referenced it
        sequence: u64,
        /// Event time of the delta
        ts_event: UnixNanos,
    },

    /// Best bid is at or above best ask
    #[error("Book crossed: best bid {bid} >= best ask {ask}")]
    Crossed {
        /// Best bid
        bid: Price,
        /// Best ask
        ask: Price,
    },

    /// More levels than the book type permits
    #[error("Too many levels on {side} side for L1 book: {count}")]
    TooManyLevels {
        /// Offending side
        side: OrderSideSpecified,
        /// Number of levels found
        count: usize,
    },
}

/// Result alias for book operations
pub type BookResult<T> = Result<T, BookError>;
