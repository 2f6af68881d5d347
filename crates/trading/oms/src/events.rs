//! Order events
//!
//! Every state change of an order is driven by one of these events. Each event carries
//! an [`OrderEventHeader`] with the identity of the order it applies to.

#![allow(missing_docs)]

use std::fmt;

use common::{
    AccountId, ClientOrderId, ContingencyType, Currency, ExecAlgorithmId, InstrumentId,
    LiquiditySide, Money, OrderListId, OrderSide, OrderType, PositionId, Price, Quantity,
    StrategyId, TimeInForce, TradeId, TraderId, TrailingOffsetType, TriggerType, UUID4,
    UnixNanos, VenueOrderId,
};
use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Identity and timing shared by every order event
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderEventHeader {
    /// Trader owning the strategy
    pub trader_id: TraderId,
    /// Strategy that created the order
    pub strategy_id: StrategyId,
    /// Instrument of the order
    pub instrument_id: InstrumentId,
    /// Order the event applies to
    pub client_order_id: ClientOrderId,
    /// Unique event identifier
    pub event_id: UUID4,
    /// When the event occurred
    pub ts_event: UnixNanos,
    /// When the event object was created
    pub ts_init: UnixNanos,
    /// Generated during reconciliation with the venue
    pub reconciliation: bool,
}

impl OrderEventHeader {
    /// Creates a header with a fresh event id
    #[must_use]
    pub fn new(
        trader_id: TraderId,
        strategy_id: StrategyId,
        instrument_id: InstrumentId,
        client_order_id: ClientOrderId,
        ts_event: UnixNanos,
        ts_init: UnixNanos,
    ) -> Self {
        Self {
            trader_id,
            strategy_id,
            instrument_id,
            client_order_id,
            event_id: UUID4::new(),
            ts_event,
            ts_init,
            reconciliation: false,
        }
    }
}

/// Creation parameters of an order; always the first event in its history
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderInitialized {
    pub header: OrderEventHeader,
    pub order_side: OrderSide,
    pub order_type: OrderType,
    pub quantity: Quantity,
    pub time_in_force: TimeInForce,
    pub post_only: bool,
    pub reduce_only: bool,
    pub quote_quantity: bool,
    pub price: Option<Price>,
    pub trigger_price: Option<Price>,
    pub trigger_type: Option<TriggerType>,
    pub limit_offset: Option<Decimal>,
    pub trailing_offset: Option<Decimal>,
    pub trailing_offset_type: Option<TrailingOffsetType>,
    pub activation_price: Option<Price>,
    pub expire_time: Option<UnixNanos>,
    pub display_qty: Option<Quantity>,
    pub emulation_trigger: Option<TriggerType>,
    pub trigger_instrument_id: Option<InstrumentId>,
    pub contingency_type: Option<ContingencyType>,
    pub order_list_id: Option<OrderListId>,
    pub linked_order_ids: Option<Vec<ClientOrderId>>,
    pub parent_order_id: Option<ClientOrderId>,
    pub exec_algorithm_id: Option<ExecAlgorithmId>,
    pub exec_algorithm_params: Option<IndexMap<String, String>>,
    pub exec_spawn_id: Option<ClientOrderId>,
    pub tags: Option<Vec<String>>,
}

/// Order was denied locally before reaching a venue
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDenied {
    pub header: OrderEventHeader,
    pub reason: String,
}

impl OrderDenied {
    /// Creates a denial with the given reason
    #[must_use]
    pub fn new(header: OrderEventHeader, reason: impl Into<String>) -> Self {
        Self {
            header,
            reason: reason.into(),
        }
    }
}

/// Order is now held by the local emulator
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderEmulated {
    pub header: OrderEventHeader,
}

/// Emulated order was released for submission to the venue
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderReleased {
    pub header: OrderEventHeader,
    /// Market price at the moment of release
    pub released_price: Price,
}

/// Order was sent to the venue
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSubmitted {
    pub header: OrderEventHeader,
    pub account_id: AccountId,
}

/// Venue acknowledged the order
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderAccepted {
    pub header: OrderEventHeader,
    pub venue_order_id: VenueOrderId,
    pub account_id: AccountId,
}

/// Venue rejected the order
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRejected {
    pub header: OrderEventHeader,
    pub account_id: AccountId,
    pub reason: String,
    /// Rejected because a post-only order would have taken liquidity
    pub due_post_only: bool,
}

macro_rules! venue_event {
    ($($(#[$meta:meta])* $name:ident),+ $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
            pub struct $name {
                pub header: OrderEventHeader,
                pub venue_order_id: Option<VenueOrderId>,
                pub account_id: Option<AccountId>,
            }

            impl $name {
                /// Creates the event, optionally tagged with venue identifiers
                #[must_use]
                pub const fn new(
                    header: OrderEventHeader,
                    venue_order_id: Option<VenueOrderId>,
                    account_id: Option<AccountId>,
                ) -> Self {
                    Self {
                        header,
                        venue_order_id,
                        account_id,
                    }
                }
            }
        )+
    };
}

venue_event!(
    /// Order was canceled
    OrderCanceled,
    /// Order reached its expiry
    OrderExpired,
    /// Stop or touch condition was met
    OrderTriggered,
    /// Modify request is in flight
    OrderPendingUpdate,
    /// Cancel request is in flight
    OrderPendingCancel,
);

/// Venue refused a modify request
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderModifyRejected {
    pub header: OrderEventHeader,
    pub venue_order_id: Option<VenueOrderId>,
    pub account_id: Option<AccountId>,
    pub reason: String,
}

/// Venue refused a cancel request
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCancelRejected {
    pub header: OrderEventHeader,
    pub venue_order_id: Option<VenueOrderId>,
    pub account_id: Option<AccountId>,
    pub reason: String,
}

/// Order parameters changed
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderUpdated {
    pub header: OrderEventHeader,
    pub venue_order_id: Option<VenueOrderId>,
    pub account_id: Option<AccountId>,
    pub quantity: Quantity,
    pub price: Option<Price>,
    pub trigger_price: Option<Price>,
}

/// Order was (partially) filled
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderFilled {
    pub header: OrderEventHeader,
    pub venue_order_id: VenueOrderId,
    pub account_id: AccountId,
    pub trade_id: TradeId,
    pub position_id: Option<PositionId>,
    pub order_side: OrderSide,
    pub order_type: OrderType,
    pub last_qty: Quantity,
    pub last_px: Price,
    /// Currency the fill is settled in
    pub currency: Currency,
    pub liquidity_side: LiquiditySide,
    pub commission: Option<Money>,
}

/// Any order event
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum OrderEventAny {
    Initialized(Box<OrderInitialized>),
    Denied(OrderDenied),
    Emulated(OrderEmulated),
    Released(OrderReleased),
    Submitted(OrderSubmitted),
    Accepted(OrderAccepted),
    Rejected(OrderRejected),
    Canceled(OrderCanceled),
    Expired(OrderExpired),
    Triggered(OrderTriggered),
    PendingUpdate(OrderPendingUpdate),
    PendingCancel(OrderPendingCancel),
    ModifyRejected(OrderModifyRejected),
    CancelRejected(OrderCancelRejected),
    Updated(OrderUpdated),
    Filled(OrderFilled),
}

impl OrderEventAny {
    /// Identity and timing of the event
    #[must_use]
    pub fn header(&self) -> &OrderEventHeader {
        match self {
            Self::Initialized(e) => &e.header,
            Self::Denied(e) => &e.header,
            Self::Emulated(e) => &e.header,
            Self::Released(e) => &e.header,
            Self::Submitted(e) => &e.header,
            Self::Accepted(e) => &e.header,
            Self::Rejected(e) => &e.header,
            Self::Canceled(e) => &e.header,
            Self::Expired(e) => &e.header,
            Self::Triggered(e) => &e.header,
            Self::PendingUpdate(e) => &e.header,
            Self::PendingCancel(e) => &e.header,
            Self::ModifyRejected(e) => &e.header,
            Self::CancelRejected(e) => &e.header,
            Self::Updated(e) => &e.header,
            Self::Filled(e) => &e.header,
        }
    }

    /// Event type name
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Initialized(_) => "OrderInitialized",
            Self::Denied(_) => "OrderDenied",
            Self::Emulated(_) => "OrderEmulated",
            Self::Released(_) => "OrderReleased",
            Self::Submitted(_) => "OrderSubmitted",
            Self::Accepted(_) => "OrderAccepted",
            Self::Rejected(_) => "OrderRejected",
            Self::Canceled(_) => "OrderCanceled",
            Self::Expired(_) => "OrderExpired",
            Self::Triggered(_) => "OrderTriggered",
            Self::PendingUpdate(_) => "OrderPendingUpdate",
            Self::PendingCancel(_) => "OrderPendingCancel",
            Self::ModifyRejected(_) => "OrderModifyRejected",
            Self::CancelRejected(_) => "OrderCancelRejected",
            Self::Updated(_) => "OrderUpdated",
            Self::Filled(_) => "OrderFilled",
        }
    }

    #[must_use]
    pub fn client_order_id(&self) -> ClientOrderId {
        self.header().client_order_id
    }

    #[must_use]
    pub fn strategy_id(&self) -> StrategyId {
        self.header().strategy_id
    }

    #[must_use]
    pub fn instrument_id(&self) -> InstrumentId {
        self.header().instrument_id
    }

    #[must_use]
    pub fn ts_event(&self) -> UnixNanos {
        self.header().ts_event
    }

    /// Venue order id carried by the event, if any
    #[must_use]
    pub fn venue_order_id(&self) -> Option<VenueOrderId> {
        match self {
            Self::Accepted(e) => Some(e.venue_order_id),
            Self::Filled(e) => Some(e.venue_order_id),
            Self::Canceled(e) => e.venue_order_id,
            Self::Expired(e) => e.venue_order_id,
            Self::Triggered(e) => e.venue_order_id,
            Self::PendingUpdate(e) => e.venue_order_id,
            Self::PendingCancel(e) => e.venue_order_id,
            Self::ModifyRejected(e) => e.venue_order_id,
            Self::CancelRejected(e) => e.venue_order_id,
            Self::Updated(e) => e.venue_order_id,
            _ => None,
        }
    }
}

impl fmt::Display for OrderEventAny {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let header = self.header();
        write!(
            f,
            "{}(instrument_id={}, client_order_id={}, ts_event={})",
            self.name(),
            header.instrument_id,
            header.client_order_id,
            header.ts_event
        )
    }
}

macro_rules! into_event {
    ($($variant:ident($ty:ty)),+ $(,)?) => {
        $(
            impl From<$ty> for OrderEventAny {
                fn from(value: $ty) -> Self {
                    Self::$variant(value)
                }
            }
        )+
    };
}

into_event!(
    Denied(OrderDenied),
    Emulated(OrderEmulated),
    Released(OrderReleased),
    Submitted(OrderSubmitted),
    Accepted(OrderAccepted),
    Rejected(OrderRejected),
    Canceled(OrderCanceled),
    Expired(OrderExpired),
    Triggered(OrderTriggered),
    PendingUpdate(OrderPendingUpdate),
    PendingCancel(OrderPendingCancel),
    ModifyRejected(OrderModifyRejected),
    CancelRejected(OrderCancelRejected),
    Updated(OrderUpdated),
    Filled(OrderFilled),
);

impl From<OrderInitialized> for OrderEventAny {
    fn from(value: OrderInitialized) -> Self {
        Self::Initialized(Box::new(value))
    }
}
