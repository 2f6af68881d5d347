//! Order lifecycle state machine
//!
//! Status changes are driven only by [`OrderEventAny`]. The allowed transitions are a
//! fixed table; anything outside it fails without touching the order.

use common::OrderStatus;

use crate::events::OrderEventAny;

/// Statuses reachable from `status` by a single event
#[must_use]
pub const fn valid_transitions(status: OrderStatus) -> &'static [OrderStatus] {
    use OrderStatus::*;

    match status {
        Initialized => &[
            Denied, Emulated, Released, Submitted, Rejected, Accepted, Canceled, Expired,
            Triggered,
        ],
        Emulated => &[Canceled, Expired, Released],
        Released => &[Submitted, Denied, Canceled],
        Submitted => &[
            PendingUpdate,
            PendingCancel,
            Rejected,
            Canceled,
            Accepted,
            PartiallyFilled,
            Filled,
        ],
        Accepted => &[
            Rejected,
            PendingUpdate,
            PendingCancel,
            Canceled,
            Triggered,
            Expired,
            PartiallyFilled,
            Filled,
        ],
        PendingUpdate => &[
            Rejected,
            Accepted,
            Canceled,
            Expired,
            Triggered,
            PendingUpdate,
            PendingCancel,
            PartiallyFilled,
            Filled,
        ],
        PendingCancel => &[
            Rejected,
            PendingCancel,
            Canceled,
            Expired,
            Accepted,
            PartiallyFilled,
            Filled,
        ],
        Triggered => &[
            Rejected,
            PendingUpdate,
            PendingCancel,
            Canceled,
            Expired,
            PartiallyFilled,
            Filled,
        ],
        PartiallyFilled => &[
            PendingUpdate,
            PendingCancel,
            Canceled,
            Expired,
            PartiallyFilled,
            Filled,
            Accepted,
        ],
        // Venues may report fills that crossed with a cancel
        Canceled => &[PartiallyFilled, Filled],
        Denied | Rejected | Expired | Filled => &[],
    }
}

/// Returns true when `from -> to` is in the transition table
#[must_use]
pub fn is_valid_transition(from: OrderStatus, to: OrderStatus) -> bool {
    valid_transitions(from).contains(&to)
}

/// Statuses that no event can leave, except delayed fills after a cancel
#[must_use]
pub const fn is_terminal(status: OrderStatus) -> bool {
    matches!(
        status,
        OrderStatus::Denied
            | OrderStatus::Rejected
            | OrderStatus::Canceled
            | OrderStatus::Expired
            | OrderStatus::Filled
    )
}

/// A cancel request may be sent from this status
#[must_use]
pub const fn can_cancel(status: OrderStatus) -> bool {
    !is_terminal(status) && !matches!(status, OrderStatus::PendingCancel)
}

/// A modify request may be sent from this status
#[must_use]
pub const fn can_amend(status: OrderStatus) -> bool {
    matches!(
        status,
        OrderStatus::Initialized
            | OrderStatus::Emulated
            | OrderStatus::Released
            | OrderStatus::Submitted
            | OrderStatus::Accepted
            | OrderStatus::Triggered
            | OrderStatus::PartiallyFilled
    )
}

/// Resolves the status `event` moves an order into.
///
/// `previous` is the status held before the order went pending, and `fully_filled`
/// tells whether a fill event would leave nothing outstanding. Returns `None` when the
/// event is not permitted from `current`.
#[must_use]
pub fn next_status(
    current: OrderStatus,
    previous: Option<OrderStatus>,
    event: &OrderEventAny,
    fully_filled: bool,
) -> Option<OrderStatus> {
    let target = match event {
        OrderEventAny::Initialized(_) => return None,
        OrderEventAny::Denied(_) => OrderStatus::Denied,
        OrderEventAny::Emulated(_) => OrderStatus::Emulated,
        OrderEventAny::Released(_) => OrderStatus::Released,
        OrderEventAny::Submitted(_) => OrderStatus::Submitted,
        OrderEventAny::Accepted(_) => OrderStatus::Accepted,
        OrderEventAny::Rejected(_) => OrderStatus::Rejected,
        OrderEventAny::Canceled(_) => OrderStatus::Canceled,
        OrderEventAny::Expired(_) => OrderStatus::Expired,
        OrderEventAny::Triggered(_) => OrderStatus::Triggered,
        OrderEventAny::PendingUpdate(_) => OrderStatus::PendingUpdate,
        OrderEventAny::PendingCancel(_) => OrderStatus::PendingCancel,
        OrderEventAny::ModifyRejected(_) | OrderEventAny::CancelRejected(_) => {
            // Restores the status held before the request went out
            return match current {
                OrderStatus::PendingUpdate | OrderStatus::PendingCancel => {
                    Some(previous.unwrap_or(OrderStatus::Accepted))
                }
                _ => None,
            };
        }
        OrderEventAny::Updated(_) => {
            return match current {
                OrderStatus::PendingUpdate => Some(previous.unwrap_or(OrderStatus::Accepted)),
                status if can_amend(status) => Some(status),
                _ => None,
            };
        }
        OrderEventAny::Filled(_) if fully_filled => OrderStatus::Filled,
        OrderEventAny::Filled(_) => OrderStatus::PartiallyFilled,
    };

    is_valid_transition(current, target).then_some(target)
}
