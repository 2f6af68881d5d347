//! Order model and lifecycle
//!
//! Orders are a shared header plus a tagged [`OrderKind`]. Every change goes through
//! [`OrderAny::apply`] with an [`OrderEventAny`]; the allowed status changes live in
//! [`lifecycle`]. Invalid events fail without modifying the order.

#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![deny(clippy::all)]

pub mod builder;
pub mod error;
pub mod events;
pub mod lifecycle;
pub mod list;
pub mod order;
#[cfg(any(test, feature = "stubs"))]
pub mod stubs;

pub use builder::OrderTestBuilder;
pub use error::{OmsResult, OrderError};
pub use events::{
    OrderAccepted, OrderCancelRejected, OrderCanceled, OrderDenied, OrderEmulated,
    OrderEventAny, OrderEventHeader, OrderExpired, OrderFilled, OrderInitialized,
    OrderModifyRejected, OrderPendingCancel, OrderPendingUpdate, OrderRejected, OrderReleased,
    OrderSubmitted, OrderTriggered, OrderUpdated,
};
pub use list::OrderList;
pub use order::{OrderAny, OrderKind, TrailingOffset};
