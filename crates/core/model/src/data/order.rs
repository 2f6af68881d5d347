//! Book order record

use std::fmt;

use common::{OrderSide, Price, Quantity};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Padding order used for empty depth slots
pub const NULL_ORDER: BookOrder = BookOrder {
    side: OrderSide::NoOrderSide,
    price: Price {
        raw: 0,
        precision: 0,
    },
    size: Quantity {
        raw: 0,
        precision: 0,
    },
    order_id: 0,
};

/// An order resting in a book.
///
/// For L2 books `order_id` is zero on the wire (the book assigns a synthetic id per
/// level); for L3 books it is venue-unique.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BookOrder {
    /// Side of the book the order lives on
    pub side: OrderSide,
    /// Limit price
    pub price: Price,
    /// Displayed size
    pub size: Quantity,
    /// Order identifier
    pub order_id: u64,
}

impl BookOrder {
    /// Creates a book order
    #[must_use]
    pub const fn new(side: OrderSide, price: Price, size: Quantity, order_id: u64) -> Self {
        Self {
            side,
            price,
            size,
            order_id,
        }
    }

    /// Returns the padding order
    #[must_use]
    pub const fn null() -> Self {
        NULL_ORDER
    }

    /// Returns true for padding entries
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.side == OrderSide::NoOrderSide || !self.size.is_positive()
    }

    /// Exact notional value `price * size`
    #[must_use]
    pub fn exposure(&self) -> Decimal {
        self.price.as_decimal() * self.size.as_decimal()
    }

    /// Size signed by side: positive for buys, negative for sells
    #[must_use]
    pub fn signed_size(&self) -> Decimal {
        match self.side {
            OrderSide::Buy => self.size.as_decimal(),
            OrderSide::Sell => -self.size.as_decimal(),
            OrderSide::NoOrderSide => Decimal::ZERO,
        }
    }
}

impl Default for BookOrder {
    fn default() -> Self {
        NULL_ORDER
    }
}

impl fmt::Display for BookOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{}",
            self.side, self.price, self.size, self.order_id
        )
    }
}

impl fmt::Debug for BookOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BookOrder(side={}, price={}, size={}, order_id={})",
            self.side, self.price, self.size, self.order_id
        )
    }
}
