//! Orders
//!
//! An [`OrderAny`] is a shared header plus an [`OrderKind`] carrying the type-specific
//! prices. Orders are created from an [`OrderInitialized`] event and change only by
//! [`OrderAny::apply`].

use std::fmt;

use common::{
    AccountId, ClientOrderId, ContingencyType, Currency, ExecAlgorithmId, InstrumentId,
    LiquiditySide, Money, OrderListId, OrderSide, OrderSideSpecified, OrderStatus, OrderType,
    PositionId, PositionSide, Price, Quantity, StrategyId, TimeInForce, TradeId, TraderId,
    TrailingOffsetType, TriggerType, UUID4, UnixNanos, VenueOrderId,
};
use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    error::{OmsResult, OrderError},
    events::{OrderEventAny, OrderEventHeader, OrderFilled, OrderInitialized, OrderUpdated},
    lifecycle,
};

/// Trailing offset parameters of a trailing stop
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrailingOffset {
    /// Distance of the trigger from the reference price
    pub offset: Decimal,
    /// Unit of `offset`
    pub offset_type: TrailingOffsetType,
    /// Price the market must reach before trailing starts
    pub activation_price: Option<Price>,
    /// Trailing has started
    pub is_activated: bool,
}

/// Type-specific part of an order
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderKind {
    /// Executes at the best available price
    Market,
    /// Rests at `price`
    Limit {
        /// Limit price
        price: Price,
    },
    /// Becomes a market order once `trigger_price` is reached
    StopMarket {
        /// Stop price
        trigger_price: Price,
        /// Reference price for the trigger
        trigger_type: TriggerType,
    },
    /// Becomes a limit order at `price` once `trigger_price` is reached
    StopLimit {
        /// Limit price after triggering
        price: Price,
        /// Stop price
        trigger_price: Price,
        /// Reference price for the trigger
        trigger_type: TriggerType,
        /// The stop has fired
        is_triggered: bool,
    },
    /// Becomes a market order once the market touches `trigger_price`
    MarketIfTouched {
        /// Touch price
        trigger_price: Price,
        /// Reference price for the trigger
        trigger_type: TriggerType,
    },
    /// Becomes a limit order once the market touches `trigger_price`
    LimitIfTouched {
        /// Limit price after touching
        price: Price,
        /// Touch price
        trigger_price: Price,
        /// Reference price for the trigger
        trigger_type: TriggerType,
        /// The touch has fired
        is_triggered: bool,
    },
    /// Executes as market, the unfilled remainder rests at the first fill price
    MarketToLimit {
        /// Set from the first fill
        price: Option<Price>,
    },
    /// Stop market whose trigger follows the market
    TrailingStopMarket {
        /// Current trigger, computed on the first tick when absent
        trigger_price: Option<Price>,
        /// Reference price for the trigger
        trigger_type: TriggerType,
        /// Offset parameters
        trailing: TrailingOffset,
    },
    /// Stop limit whose trigger and limit follow the market
    TrailingStopLimit {
        /// Current limit price
        price: Option<Price>,
        /// Current trigger
        trigger_price: Option<Price>,
        /// Reference price for the trigger
        trigger_type: TriggerType,
        /// Distance of the limit from the trigger
        limit_offset: Decimal,
        /// Offset parameters
        trailing: TrailingOffset,
        /// The stop has fired
        is_triggered: bool,
    },
}

impl OrderKind {
    fn from_init(init: &OrderInitialized) -> OmsResult<Self> {
        let client_order_id = init.header.client_order_id;
        let order_type = init.order_type;
        let invalid = |reason: &str| OrderError::InvalidOrder {
            client_order_id,
            order_type,
            reason: reason.to_string(),
        };
        let price = || init.price.ok_or_else(|| invalid("price is required"));
        let trigger_price = || {
            init.trigger_price
                .ok_or_else(|| invalid("trigger price is required"))
        };
        let trigger_type = init.trigger_type.unwrap_or(TriggerType::Default);
        let trailing = || -> OmsResult<TrailingOffset> {
            let offset = init
                .trailing_offset
                .ok_or_else(|| invalid("trailing offset is required"))?;
            if offset.is_sign_negative() {
                return Err(invalid("trailing offset must be non-negative"));
            }
            Ok(TrailingOffset {
                offset,
                offset_type: init.trailing_offset_type.unwrap_or(TrailingOffsetType::Price),
                activation_price: init.activation_price,
                is_activated: init.activation_price.is_none(),
            })
        };

        let kind = match order_type {
            OrderType::Market => Self::Market,
            OrderType::Limit => Self::Limit { price: price()? },
            OrderType::StopMarket => Self::StopMarket {
                trigger_price: trigger_price()?,
                trigger_type,
            },
            OrderType::StopLimit => Self::StopLimit {
                price: price()?,
                trigger_price: trigger_price()?,
                trigger_type,
                is_triggered: false,
            },
            OrderType::MarketIfTouched => Self::MarketIfTouched {
                trigger_price: trigger_price()?,
                trigger_type,
            },
            OrderType::LimitIfTouched => Self::LimitIfTouched {
                price: price()?,
                trigger_price: trigger_price()?,
                trigger_type,
                is_triggered: false,
            },
            OrderType::MarketToLimit => Self::MarketToLimit { price: init.price },
            OrderType::TrailingStopMarket => Self::TrailingStopMarket {
                trigger_price: init.trigger_price,
                trigger_type,
                trailing: trailing()?,
            },
            OrderType::TrailingStopLimit => Self::TrailingStopLimit {
                price: init.price,
                trigger_price: init.trigger_price,
                trigger_type,
                limit_offset: init
                    .limit_offset
                    .ok_or_else(|| invalid("limit offset is required"))?,
                trailing: trailing()?,
                is_triggered: false,
            },
        };
        Ok(kind)
    }

    /// Order type of this kind
    #[must_use]
    pub const fn order_type(&self) -> OrderType {
        match self {
            Self::Market => OrderType::Market,
            Self::Limit { .. } => OrderType::Limit,
            Self::StopMarket { .. } => OrderType::StopMarket,
            Self::StopLimit { .. } => OrderType::StopLimit,
            Self::MarketIfTouched { .. } => OrderType::MarketIfTouched,
            Self::LimitIfTouched { .. } => OrderType::LimitIfTouched,
            Self::MarketToLimit { .. } => OrderType::MarketToLimit,
            Self::TrailingStopMarket { .. } => OrderType::TrailingStopMarket,
            Self::TrailingStopLimit { .. } => OrderType::TrailingStopLimit,
        }
    }

    /// Limit price, if the kind carries one
    #[must_use]
    pub const fn price(&self) -> Option<Price> {
        match self {
            Self::Limit { price }
            | Self::StopLimit { price, .. }
            | Self::LimitIfTouched { price, .. } => Some(*price),
            Self::MarketToLimit { price } | Self::TrailingStopLimit { price, .. } => *price,
            _ => None,
        }
    }

    /// Trigger price, if the kind carries one
    #[must_use]
    pub const fn trigger_price(&self) -> Option<Price> {
        match self {
            Self::StopMarket { trigger_price, .. }
            | Self::StopLimit { trigger_price, .. }
            | Self::MarketIfTouched { trigger_price, .. }
            | Self::LimitIfTouched { trigger_price, .. } => Some(*trigger_price),
            Self::TrailingStopMarket { trigger_price, .. }
            | Self::TrailingStopLimit { trigger_price, .. } => *trigger_price,
            _ => None,
        }
    }

    /// Reference price type for triggers
    #[must_use]
    pub const fn trigger_type(&self) -> Option<TriggerType> {
        match self {
            Self::StopMarket { trigger_type, .. }
            | Self::StopLimit { trigger_type, .. }
            | Self::MarketIfTouched { trigger_type, .. }
            | Self::LimitIfTouched { trigger_type, .. }
            | Self::TrailingStopMarket { trigger_type, .. }
            | Self::TrailingStopLimit { trigger_type, .. } => Some(*trigger_type),
            _ => None,
        }
    }

    fn set_price(&mut self, new_price: Price) {
        match self {
            Self::Limit { price }
            | Self::StopLimit { price, .. }
            | Self::LimitIfTouched { price, .. } => *price = new_price,
            Self::MarketToLimit { price } | Self::TrailingStopLimit { price, .. } => {
                *price = Some(new_price);
            }
            _ => {}
        }
    }

    fn set_trigger_price(&mut self, new_trigger: Price) {
        match self {
            Self::StopMarket { trigger_price, .. }
            | Self::StopLimit { trigger_price, .. }
            | Self::MarketIfTouched { trigger_price, .. }
            | Self::LimitIfTouched { trigger_price, .. } => *trigger_price = new_trigger,
            Self::TrailingStopMarket { trigger_price, .. }
            | Self::TrailingStopLimit { trigger_price, .. } => {
                *trigger_price = Some(new_trigger);
            }
            _ => {}
        }
    }
}

/// Any order: the shared header and its type-specific [`OrderKind`]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderAny {
    /// Trader owning the strategy
    pub trader_id: TraderId,
    /// Strategy that created the order
    pub strategy_id: StrategyId,
    /// Instrument traded
    pub instrument_id: InstrumentId,
    /// Locally assigned identifier
    pub client_order_id: ClientOrderId,
    /// Buy or sell
    pub side: OrderSide,
    /// Time in force
    pub time_in_force: TimeInForce,
    /// Expiry for GTD orders
    pub expire_time: Option<UnixNanos>,
    /// Must only provide liquidity
    pub is_post_only: bool,
    /// May only reduce a position
    pub is_reduce_only: bool,
    /// Visible quantity for iceberg orders
    pub display_qty: Option<Quantity>,
    /// Held locally until this trigger fires
    pub emulation_trigger: Option<TriggerType>,
    /// Instrument whose prices drive the trigger, when not the order's own
    pub trigger_instrument_id: Option<InstrumentId>,
    /// Contingency relation with `linked_order_ids`
    pub contingency_type: Option<ContingencyType>,
    /// List the order was submitted with
    pub order_list_id: Option<OrderListId>,
    /// Contingent orders
    pub linked_order_ids: Option<Vec<ClientOrderId>>,
    /// Parent of an OTO child
    pub parent_order_id: Option<ClientOrderId>,
    /// Execution algorithm handling the order
    pub exec_algorithm_id: Option<ExecAlgorithmId>,
    /// Parameters for the execution algorithm
    pub exec_algorithm_params: Option<IndexMap<String, String>>,
    /// Primary order of the spawn group
    pub exec_spawn_id: Option<ClientOrderId>,
    /// Free-form tags
    pub tags: Option<Vec<String>>,
    /// Id of the initializing event
    pub init_id: UUID4,
    /// Creation time
    pub ts_init: UnixNanos,
    kind: OrderKind,
    quantity: Quantity,
    is_quote_quantity: bool,
    status: OrderStatus,
    previous_status: Option<OrderStatus>,
    venue_order_id: Option<VenueOrderId>,
    position_id: Option<PositionId>,
    account_id: Option<AccountId>,
    last_trade_id: Option<TradeId>,
    filled_qty: Quantity,
    leaves_qty: Quantity,
    fill_notional: Decimal,
    avg_px: Option<Decimal>,
    slippage: Option<Decimal>,
    liquidity_side: Option<LiquiditySide>,
    events: Vec<OrderEventAny>,
    commissions: IndexMap<Currency, Money>,
    venue_order_ids: Vec<VenueOrderId>,
    trade_ids: Vec<TradeId>,
    ts_submitted: Option<UnixNanos>,
    ts_accepted: Option<UnixNanos>,
    ts_closed: Option<UnixNanos>,
    ts_last: UnixNanos,
}

impl OrderAny {
    /// Creates an order from its initializing event
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::InvalidQuantity`] for a zero quantity or a display quantity
    /// above it, and [`OrderError::InvalidOrder`] when a field the order type needs is
    /// missing.
    pub fn new(init: OrderInitialized) -> OmsResult<Self> {
        let header = init.header;
        if !init.quantity.is_positive() {
            return Err(OrderError::InvalidQuantity {
                client_order_id: header.client_order_id,
                reason: format!("quantity must be positive, was {}", init.quantity),
            });
        }
        if let Some(display_qty) = init.display_qty {
            if display_qty > init.quantity {
                return Err(OrderError::InvalidQuantity {
                    client_order_id: header.client_order_id,
                    reason: format!(
                        "display quantity {display_qty} exceeds quantity {}",
                        init.quantity
                    ),
                });
            }
        }
        if init.order_side == OrderSide::NoOrderSide {
            return Err(OrderError::InvalidOrder {
                client_order_id: header.client_order_id,
                order_type: init.order_type,
                reason: "order side must be BUY or SELL".to_string(),
            });
        }

        let kind = OrderKind::from_init(&init)?;
        let exec_spawn_id = match (init.exec_algorithm_id, init.exec_spawn_id) {
            (Some(_), None) => Some(header.client_order_id),
            (_, spawn_id) => spawn_id,
        };
        let emulation_trigger = init
            .emulation_trigger
            .filter(|trigger| *trigger != TriggerType::NoTrigger);
        let contingency_type = init
            .contingency_type
            .filter(|c| *c != ContingencyType::NoContingency);

        Ok(Self {
            trader_id: header.trader_id,
            strategy_id: header.strategy_id,
            instrument_id: header.instrument_id,
            client_order_id: header.client_order_id,
            side: init.order_side,
            time_in_force: init.time_in_force,
            expire_time: init.expire_time,
            is_post_only: init.post_only,
            is_reduce_only: init.reduce_only,
            display_qty: init.display_qty,
            emulation_trigger,
            trigger_instrument_id: init.trigger_instrument_id,
            contingency_type,
            order_list_id: init.order_list_id,
            linked_order_ids: init.linked_order_ids.clone(),
            parent_order_id: init.parent_order_id,
            exec_algorithm_id: init.exec_algorithm_id,
            exec_algorithm_params: init.exec_algorithm_params.clone(),
            exec_spawn_id,
            tags: init.tags.clone(),
            init_id: header.event_id,
            ts_init: header.ts_init,
            kind,
            quantity: init.quantity,
            is_quote_quantity: init.quote_quantity,
            status: OrderStatus::Initialized,
            previous_status: None,
            venue_order_id: None,
            position_id: None,
            account_id: None,
            last_trade_id: None,
            filled_qty: Quantity::zero(init.quantity.precision),
            leaves_qty: init.quantity,
            fill_notional: Decimal::ZERO,
            avg_px: None,
            slippage: None,
            liquidity_side: None,
            events: vec![OrderEventAny::from(init)],
            commissions: IndexMap::new(),
            venue_order_ids: Vec::new(),
            trade_ids: Vec::new(),
            ts_submitted: None,
            ts_accepted: None,
            ts_closed: None,
            ts_last: header.ts_event,
        })
    }

    /// Builds an event header for this order
    #[must_use]
    pub fn event_header(&self, ts_event: UnixNanos, ts_init: UnixNanos) -> OrderEventHeader {
        OrderEventHeader::new(
            self.trader_id,
            self.strategy_id,
            self.instrument_id,
            self.client_order_id,
            ts_event,
            ts_init,
        )
    }

    /// Applies `event`, moving the order through its lifecycle.
    ///
    /// On error the order is left untouched and the event is not recorded.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::IdentityMismatch`] if the event targets another order,
    /// [`OrderError::InvalidStateTransition`] when the transition is not permitted, and
    /// quantity or fill errors when the event would break `filled + leaves == quantity`.
    pub fn apply(&mut self, event: OrderEventAny) -> OmsResult<()> {
        self.check_identity(&event)?;
        if let OrderEventAny::Initialized(_) = event {
            return Err(OrderError::AlreadyInitialized {
                client_order_id: self.client_order_id,
            });
        }

        // Fallible arithmetic happens before any mutation
        let fill = match &event {
            OrderEventAny::Filled(fill) => Some(self.prepare_fill(fill)?),
            _ => None,
        };
        if let OrderEventAny::Updated(update) = &event {
            self.check_update(update)?;
        }

        let fully_filled = fill.as_ref().is_some_and(|f| f.leaves_qty.is_zero());
        let Some(new_status) =
            lifecycle::next_status(self.status, self.previous_status, &event, fully_filled)
        else {
            return Err(OrderError::InvalidStateTransition {
                client_order_id: self.client_order_id,
                status: self.status,
                event: event.name(),
            });
        };

        if !matches!(
            self.status,
            OrderStatus::PendingUpdate | OrderStatus::PendingCancel
        ) {
            self.previous_status = Some(self.status);
        }
        debug!(
            client_order_id = %self.client_order_id,
            from = %self.status,
            to = %new_status,
            event = event.name(),
            "Order transition"
        );
        self.status = new_status;

        let ts_event = event.ts_event();
        match &event {
            OrderEventAny::Denied(_)
            | OrderEventAny::Rejected(_)
            | OrderEventAny::Canceled(_)
            | OrderEventAny::Expired(_) => self.ts_closed = Some(ts_event),
            OrderEventAny::Released(_) => self.emulation_trigger = None,
            OrderEventAny::Submitted(e) => {
                self.account_id = Some(e.account_id);
                self.ts_submitted = Some(ts_event);
            }
            OrderEventAny::Accepted(e) => {
                self.account_id = Some(e.account_id);
                self.capture_venue_order_id(e.venue_order_id);
                self.ts_accepted = Some(ts_event);
            }
            OrderEventAny::Triggered(_) => self.set_triggered(),
            OrderEventAny::Updated(e) => self.update(e),
            OrderEventAny::Filled(e) => {
                if let Some(fill) = fill {
                    self.fill(e, fill);
                }
            }
            _ => {}
        }

        self.ts_last = ts_event;
        self.events.push(event);
        Ok(())
    }

    fn check_identity(&self, event: &OrderEventAny) -> OmsResult<()> {
        let header = event.header();
        if header.client_order_id != self.client_order_id {
            return Err(OrderError::IdentityMismatch {
                field: "client_order_id",
                order_value: self.client_order_id.to_string(),
                event_value: header.client_order_id.to_string(),
            });
        }
        if header.strategy_id != self.strategy_id {
            return Err(OrderError::IdentityMismatch {
                field: "strategy_id",
                order_value: self.strategy_id.to_string(),
                event_value: header.strategy_id.to_string(),
            });
        }
        Ok(())
    }

    fn check_update(&self, update: &OrderUpdated) -> OmsResult<()> {
        if update.quantity < self.filled_qty {
            return Err(OrderError::InvalidQuantity {
                client_order_id: self.client_order_id,
                reason: format!(
                    "updated quantity {} is below filled quantity {}",
                    update.quantity, self.filled_qty
                ),
            });
        }
        Ok(())
    }

    fn prepare_fill(&self, fill: &OrderFilled) -> OmsResult<PreparedFill> {
        let invalid = |reason: String| OrderError::InvalidFill {
            client_order_id: self.client_order_id,
            reason,
        };
        if !fill.last_qty.is_positive() {
            return Err(invalid(format!("last_qty must be positive, was {}", fill.last_qty)));
        }
        let filled_qty = self
            .filled_qty
            .checked_add(fill.last_qty)
            .ok_or_else(|| invalid("filled quantity overflow".to_string()))?;
        let leaves_qty = self.quantity.checked_sub(filled_qty).ok_or_else(|| {
            invalid(format!(
                "overfill: {filled_qty} filled against quantity {}",
                self.quantity
            ))
        })?;
        let fill_notional = fill
            .last_qty
            .as_decimal()
            .checked_mul(fill.last_px.as_decimal())
            .and_then(|notional| self.fill_notional.checked_add(notional))
            .ok_or_else(|| invalid("fill notional overflow".to_string()))?;
        let commission = match fill.commission {
            Some(commission) => match self.commissions.get(&commission.currency) {
                Some(total) => Some(
                    total
                        .checked_add(commission)
                        .map_err(|e| invalid(e.to_string()))?,
                ),
                None => Some(commission),
            },
            None => None,
        };
        Ok(PreparedFill {
            filled_qty,
            leaves_qty,
            fill_notional,
            commission,
        })
    }

    fn fill(&mut self, event: &OrderFilled, prepared: PreparedFill) {
        self.capture_venue_order_id(event.venue_order_id);
        self.account_id = Some(event.account_id);
        if event.position_id.is_some() {
            self.position_id = event.position_id;
        }
        self.trade_ids.push(event.trade_id);
        self.last_trade_id = Some(event.trade_id);
        self.liquidity_side = Some(event.liquidity_side);
        self.filled_qty = prepared.filled_qty;
        self.leaves_qty = prepared.leaves_qty;
        self.fill_notional = prepared.fill_notional;
        if let Some(commission) = prepared.commission {
            self.commissions.insert(commission.currency, commission);
        }
        if !self.filled_qty.is_zero() {
            self.avg_px = Some(self.fill_notional / self.filled_qty.as_decimal());
        }
        if self.ts_accepted.is_none() {
            self.ts_accepted = Some(event.header.ts_event);
        }
        if let OrderKind::MarketToLimit { price: None } = self.kind {
            self.kind = OrderKind::MarketToLimit {
                price: Some(event.last_px),
            };
        }
        if self.leaves_qty.is_zero() {
            self.ts_closed = Some(event.header.ts_event);
            if let Some(reference) = self.kind.price().or_else(|| self.kind.trigger_price()) {
                self.set_slippage(reference);
            }
        }
    }

    fn update(&mut self, event: &OrderUpdated) {
        if let Some(venue_order_id) = event.venue_order_id {
            self.capture_venue_order_id(venue_order_id);
        }
        self.quantity = event.quantity;
        self.leaves_qty = event.quantity.saturating_sub(self.filled_qty);
        if let Some(price) = event.price {
            self.kind.set_price(price);
        }
        if let Some(trigger_price) = event.trigger_price {
            self.kind.set_trigger_price(trigger_price);
        }
    }

    fn set_triggered(&mut self) {
        match &mut self.kind {
            OrderKind::StopLimit { is_triggered, .. }
            | OrderKind::LimitIfTouched { is_triggered, .. }
            | OrderKind::TrailingStopLimit { is_triggered, .. } => *is_triggered = true,
            _ => {}
        }
    }

    fn capture_venue_order_id(&mut self, venue_order_id: VenueOrderId) {
        if self.venue_order_id != Some(venue_order_id) {
            if let Some(previous) = self.venue_order_id {
                debug!(
                    client_order_id = %self.client_order_id,
                    %previous,
                    current = %venue_order_id,
                    "Venue order id changed"
                );
            }
            self.venue_order_id = Some(venue_order_id);
            self.venue_order_ids.push(venue_order_id);
        }
    }

    /// Records slippage of the average fill price against `reference`.
    ///
    /// Slippage is zero when the fill improved on the reference.
    pub fn set_slippage(&mut self, reference: Price) {
        let Some(avg_px) = self.avg_px else {
            return;
        };
        let reference = reference.as_decimal();
        let slippage = match self.side {
            OrderSide::Buy if avg_px > reference => avg_px - reference,
            OrderSide::Sell if avg_px < reference => reference - avg_px,
            _ => Decimal::ZERO,
        };
        self.slippage = Some(slippage);
    }

    /// Replaces a quote-denominated quantity with the resolved base quantity
    pub fn convert_quote_quantity(&mut self, base_quantity: Quantity) {
        if !self.is_quote_quantity {
            warn!(
                client_order_id = %self.client_order_id,
                "Order quantity is not quote denominated"
            );
            return;
        }
        self.quantity = base_quantity;
        self.leaves_qty = base_quantity.saturating_sub(self.filled_qty);
        self.is_quote_quantity = false;
    }

    /// Assigns the position an order belongs to
    pub fn set_position_id(&mut self, position_id: Option<PositionId>) {
        self.position_id = position_id;
    }

    /// Marks a trailing stop as activated
    pub fn activate_trailing(&mut self) {
        if let OrderKind::TrailingStopMarket { trailing, .. }
        | OrderKind::TrailingStopLimit { trailing, .. } = &mut self.kind
        {
            trailing.is_activated = true;
        }
    }

    /// Converts a triggered emulated order into the plain order sent to the venue.
    ///
    /// Stop and touch market orders become market orders; the limit variants become
    /// limit orders at their current limit price.
    pub fn transform_for_release(&mut self) {
        let released = match self.kind {
            OrderKind::StopMarket { .. }
            | OrderKind::MarketIfTouched { .. }
            | OrderKind::TrailingStopMarket { .. } => OrderKind::Market,
            OrderKind::StopLimit { price, .. } | OrderKind::LimitIfTouched { price, .. } => {
                OrderKind::Limit { price }
            }
            OrderKind::TrailingStopLimit {
                price: Some(price), ..
            } => OrderKind::Limit { price },
            kind => kind,
        };
        self.kind = released;
    }

    #[must_use]
    pub const fn kind(&self) -> &OrderKind {
        &self.kind
    }

    #[must_use]
    pub const fn order_type(&self) -> OrderType {
        self.kind.order_type()
    }

    #[must_use]
    pub const fn status(&self) -> OrderStatus {
        self.status
    }

    /// Status before the current pending request, restored on modify/cancel reject
    #[must_use]
    pub const fn previous_status(&self) -> Option<OrderStatus> {
        self.previous_status
    }

    #[must_use]
    pub const fn quantity(&self) -> Quantity {
        self.quantity
    }

    #[must_use]
    pub const fn filled_qty(&self) -> Quantity {
        self.filled_qty
    }

    #[must_use]
    pub const fn leaves_qty(&self) -> Quantity {
        self.leaves_qty
    }

    /// Volume weighted average fill price
    #[must_use]
    pub const fn avg_px(&self) -> Option<Decimal> {
        self.avg_px
    }

    #[must_use]
    pub const fn slippage(&self) -> Option<Decimal> {
        self.slippage
    }

    #[must_use]
    pub const fn is_quote_quantity(&self) -> bool {
        self.is_quote_quantity
    }

    #[must_use]
    pub const fn price(&self) -> Option<Price> {
        self.kind.price()
    }

    #[must_use]
    pub const fn trigger_price(&self) -> Option<Price> {
        self.kind.trigger_price()
    }

    #[must_use]
    pub const fn trigger_type(&self) -> Option<TriggerType> {
        self.kind.trigger_type()
    }

    /// Trailing offset parameters of trailing stops
    #[must_use]
    pub const fn trailing_offset(&self) -> Option<&TrailingOffset> {
        match &self.kind {
            OrderKind::TrailingStopMarket { trailing, .. }
            | OrderKind::TrailingStopLimit { trailing, .. } => Some(trailing),
            _ => None,
        }
    }

    /// Limit offset of a trailing stop limit
    #[must_use]
    pub const fn limit_offset(&self) -> Option<Decimal> {
        match self.kind {
            OrderKind::TrailingStopLimit { limit_offset, .. } => Some(limit_offset),
            _ => None,
        }
    }

    #[must_use]
    pub const fn venue_order_id(&self) -> Option<VenueOrderId> {
        self.venue_order_id
    }

    #[must_use]
    pub const fn position_id(&self) -> Option<PositionId> {
        self.position_id
    }

    #[must_use]
    pub const fn account_id(&self) -> Option<AccountId> {
        self.account_id
    }

    #[must_use]
    pub const fn last_trade_id(&self) -> Option<TradeId> {
        self.last_trade_id
    }

    #[must_use]
    pub const fn liquidity_side(&self) -> Option<LiquiditySide> {
        self.liquidity_side
    }

    /// Events in application order, starting with `OrderInitialized`
    #[must_use]
    pub fn events(&self) -> &[OrderEventAny] {
        &self.events
    }

    #[must_use]
    pub fn last_event(&self) -> Option<&OrderEventAny> {
        self.events.last()
    }

    #[must_use]
    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// The initializing event
    #[must_use]
    pub fn init_event(&self) -> Option<&OrderInitialized> {
        match self.events.first() {
            Some(OrderEventAny::Initialized(init)) => Some(init),
            _ => None,
        }
    }

    /// Accumulated commissions keyed by currency
    #[must_use]
    pub const fn commissions(&self) -> &IndexMap<Currency, Money> {
        &self.commissions
    }

    /// Every venue order id the order has carried
    #[must_use]
    pub fn venue_order_ids(&self) -> &[VenueOrderId] {
        &self.venue_order_ids
    }

    #[must_use]
    pub fn trade_ids(&self) -> &[TradeId] {
        &self.trade_ids
    }

    #[must_use]
    pub const fn ts_last(&self) -> UnixNanos {
        self.ts_last
    }

    #[must_use]
    pub const fn ts_submitted(&self) -> Option<UnixNanos> {
        self.ts_submitted
    }

    #[must_use]
    pub const fn ts_accepted(&self) -> Option<UnixNanos> {
        self.ts_accepted
    }

    #[must_use]
    pub const fn ts_closed(&self) -> Option<UnixNanos> {
        self.ts_closed
    }

    /// Side narrowed to buy or sell
    #[must_use]
    pub const fn side_specified(&self) -> Option<OrderSideSpecified> {
        self.side.as_specified()
    }

    /// Carries a limit price (a market-to-limit order only after its first fill)
    #[must_use]
    pub const fn has_price(&self) -> bool {
        match self.kind {
            OrderKind::Limit { .. }
            | OrderKind::StopLimit { .. }
            | OrderKind::LimitIfTouched { .. }
            | OrderKind::TrailingStopLimit { .. } => true,
            OrderKind::MarketToLimit { price } => price.is_some(),
            _ => false,
        }
    }

    #[must_use]
    pub const fn has_trigger_price(&self) -> bool {
        matches!(
            self.kind,
            OrderKind::StopMarket { .. }
                | OrderKind::StopLimit { .. }
                | OrderKind::MarketIfTouched { .. }
                | OrderKind::LimitIfTouched { .. }
                | OrderKind::TrailingStopMarket { .. }
                | OrderKind::TrailingStopLimit { .. }
        )
    }

    #[must_use]
    pub const fn is_trailing(&self) -> bool {
        matches!(
            self.kind,
            OrderKind::TrailingStopMarket { .. } | OrderKind::TrailingStopLimit { .. }
        )
    }

    /// Stop or touch condition has fired
    #[must_use]
    pub const fn is_triggered(&self) -> bool {
        match self.kind {
            OrderKind::StopLimit { is_triggered, .. }
            | OrderKind::LimitIfTouched { is_triggered, .. }
            | OrderKind::TrailingStopLimit { is_triggered, .. } => is_triggered,
            _ => false,
        }
    }

    #[must_use]
    pub fn is_buy(&self) -> bool {
        self.side == OrderSide::Buy
    }

    #[must_use]
    pub fn is_sell(&self) -> bool {
        self.side == OrderSide::Sell
    }

    #[must_use]
    pub fn is_passive(&self) -> bool {
        self.order_type() != OrderType::Market
    }

    #[must_use]
    pub fn is_aggressive(&self) -> bool {
        self.order_type() == OrderType::Market
    }

    #[must_use]
    pub fn is_emulated(&self) -> bool {
        self.status == OrderStatus::Emulated
    }

    /// Working at the venue or in flight
    #[must_use]
    pub const fn is_open(&self) -> bool {
        if self.emulation_trigger.is_some() {
            return false;
        }
        matches!(
            self.status,
            OrderStatus::Accepted
                | OrderStatus::Triggered
                | OrderStatus::PendingUpdate
                | OrderStatus::PendingCancel
                | OrderStatus::PartiallyFilled
        )
    }

    /// In a terminal status
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        lifecycle::is_terminal(self.status)
    }

    /// Awaiting a venue response
    #[must_use]
    pub const fn is_inflight(&self) -> bool {
        if self.emulation_trigger.is_some() {
            return false;
        }
        matches!(
            self.status,
            OrderStatus::Submitted | OrderStatus::PendingUpdate | OrderStatus::PendingCancel
        )
    }

    #[must_use]
    pub fn is_pending_update(&self) -> bool {
        self.status == OrderStatus::PendingUpdate
    }

    #[must_use]
    pub fn is_pending_cancel(&self) -> bool {
        self.status == OrderStatus::PendingCancel
    }

    /// Still held locally (not yet submitted)
    #[must_use]
    pub const fn is_active_local(&self) -> bool {
        matches!(
            self.status,
            OrderStatus::Initialized | OrderStatus::Emulated | OrderStatus::Released
        )
    }

    /// First order of an execution algorithm spawn group
    #[must_use]
    pub fn is_primary(&self) -> bool {
        self.exec_algorithm_id.is_some() && self.exec_spawn_id == Some(self.client_order_id)
    }

    /// Spawned by an execution algorithm from a primary order
    #[must_use]
    pub fn is_secondary(&self) -> bool {
        self.exec_algorithm_id.is_some()
            && self
                .exec_spawn_id
                .is_some_and(|spawn_id| spawn_id != self.client_order_id)
    }

    #[must_use]
    pub const fn is_contingency(&self) -> bool {
        self.contingency_type.is_some()
    }

    /// Parent of an OTO group
    #[must_use]
    pub fn is_parent_order(&self) -> bool {
        self.contingency_type == Some(ContingencyType::Oto)
    }

    #[must_use]
    pub const fn is_child_order(&self) -> bool {
        self.parent_order_id.is_some()
    }

    /// Filling the remaining quantity would only reduce a position of `position_side`
    /// and `position_qty`
    #[must_use]
    pub fn would_reduce_only(&self, position_side: PositionSide, position_qty: Quantity) -> bool {
        match (self.side, position_side) {
            (OrderSide::Buy, PositionSide::Short) | (OrderSide::Sell, PositionSide::Long) => {
                self.leaves_qty <= position_qty
            }
            _ => false,
        }
    }

    /// Side that closes a position of `position_side`
    #[must_use]
    pub const fn closing_side(position_side: PositionSide) -> OrderSide {
        match position_side {
            PositionSide::Long => OrderSide::Sell,
            PositionSide::Short => OrderSide::Buy,
            PositionSide::Flat | PositionSide::NoPositionSide => OrderSide::NoOrderSide,
        }
    }
}

impl fmt::Display for OrderAny {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Order({} {} {} {}",
            self.side,
            self.quantity,
            self.instrument_id,
            self.order_type(),
        )?;
        if let Some(price) = self.price() {
            write!(f, " @ {price}")?;
        }
        if let Some(trigger_price) = self.trigger_price() {
            write!(f, " trigger {trigger_price}")?;
        }
        write!(
            f,
            " {}, status={}, client_order_id={})",
            self.time_in_force, self.status, self.client_order_id
        )
    }
}

struct PreparedFill {
    filled_qty: Quantity,
    leaves_qty: Quantity,
    fill_notional: Decimal,
    commission: Option<Money>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        builder::OrderTestBuilder,
        events::{
            OrderAccepted, OrderCancelRejected, OrderCanceled, OrderModifyRejected,
            OrderPendingCancel, OrderPendingUpdate, OrderSubmitted, OrderTriggered,
        },
        stubs::{accept, fill, submit},
    };
    use common::{Currency, Money};
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};
    use std::str::FromStr;

    #[fixture]
    fn limit_order() -> OrderAny {
        OrderTestBuilder::new(OrderType::Limit)
            .instrument_id("AUD/USD.SIM".parse().unwrap())
            .side(OrderSide::Buy)
            .quantity(Quantity::from(100_000))
            .price(Price::from_str("1.00000").unwrap())
            .build()
            .unwrap()
    }

    #[rstest]
    fn test_new_order_state(limit_order: OrderAny) {
        assert_eq!(limit_order.status(), OrderStatus::Initialized);
        assert_eq!(limit_order.event_count(), 1);
        assert_eq!(limit_order.leaves_qty(), limit_order.quantity());
        assert!(limit_order.filled_qty().is_zero());
        assert!(limit_order.has_price());
        assert!(!limit_order.has_trigger_price());
        assert!(limit_order.is_active_local());
        assert!(limit_order.init_event().is_some());
    }

    #[test]
    fn test_limit_without_price_is_invalid() {
        let result = OrderTestBuilder::new(OrderType::Limit).build();
        assert!(matches!(result, Err(OrderError::InvalidOrder { .. })));
    }

    #[test]
    fn test_zero_quantity_is_invalid() {
        let result = OrderTestBuilder::new(OrderType::Market)
            .quantity(Quantity::zero(0))
            .build();
        assert!(matches!(result, Err(OrderError::InvalidQuantity { .. })));
    }

    #[rstest]
    fn test_partial_then_full_fill(mut limit_order: OrderAny) {
        submit(&mut limit_order);
        accept(&mut limit_order);
        fill(&mut limit_order, "T-1", Quantity::from(40_000), "0.99990").unwrap();

        assert_eq!(limit_order.status(), OrderStatus::PartiallyFilled);
        assert_eq!(limit_order.filled_qty(), Quantity::from(40_000));
        assert_eq!(limit_order.leaves_qty(), Quantity::from(60_000));

        fill(&mut limit_order, "T-2", Quantity::from(60_000), "1.00000").unwrap();
        assert_eq!(limit_order.status(), OrderStatus::Filled);
        assert!(limit_order.leaves_qty().is_zero());
        // (40_000 * 0.9999 + 60_000 * 1.0) / 100_000
        assert_eq!(
            limit_order.avg_px(),
            Some(Decimal::from_str("0.99996").unwrap())
        );
        // Improved on the limit, so no slippage
        assert_eq!(limit_order.slippage(), Some(Decimal::ZERO));
        assert_eq!(limit_order.trade_ids().len(), 2);
        assert!(limit_order.is_closed());
    }

    #[rstest]
    fn test_overfill_is_rejected_without_mutation(mut limit_order: OrderAny) {
        submit(&mut limit_order);
        accept(&mut limit_order);
        let events_before = limit_order.event_count();

        let result = fill(&mut limit_order, "T-1", Quantity::from(100_001), "1.00000");

        assert!(matches!(result, Err(OrderError::InvalidFill { .. })));
        assert_eq!(limit_order.status(), OrderStatus::Accepted);
        assert_eq!(limit_order.event_count(), events_before);
        assert!(limit_order.filled_qty().is_zero());
    }

    #[rstest]
    fn test_invalid_transition_leaves_order_unchanged(mut limit_order: OrderAny) {
        let header = limit_order.event_header(UnixNanos::from(1), UnixNanos::from(1));
        let event = OrderAccepted {
            header,
            venue_order_id: VenueOrderId::from("V-1"),
            account_id: AccountId::from("SIM-001"),
        };
        submit(&mut limit_order);
        accept(&mut limit_order);
        // Accepted -> Accepted is not a transition
        let result = limit_order.apply(event.into());
        assert!(matches!(
            result,
            Err(OrderError::InvalidStateTransition {
                status: OrderStatus::Accepted,
                ..
            })
        ));
        assert_eq!(limit_order.event_count(), 3);
    }

    #[rstest]
    fn test_identity_mismatch(mut limit_order: OrderAny) {
        let mut header = limit_order.event_header(UnixNanos::from(1), UnixNanos::from(1));
        header.client_order_id = ClientOrderId::from("O-OTHER");
        let event = OrderSubmitted {
            header,
            account_id: AccountId::from("SIM-001"),
        };
        let result = limit_order.apply(event.into());
        assert!(matches!(result, Err(OrderError::IdentityMismatch { .. })));
    }

    #[rstest]
    fn test_modify_rejected_restores_previous_status(mut limit_order: OrderAny) {
        submit(&mut limit_order);
        accept(&mut limit_order);
        let ts = UnixNanos::from(10);
        let pending = OrderPendingUpdate::new(limit_order.event_header(ts, ts), None, None);
        limit_order.apply(pending.into()).unwrap();
        assert_eq!(limit_order.status(), OrderStatus::PendingUpdate);

        let rejected = OrderModifyRejected {
            header: limit_order.event_header(ts, ts),
            venue_order_id: None,
            account_id: None,
            reason: "price out of band".to_string(),
        };
        limit_order.apply(rejected.into()).unwrap();
        assert_eq!(limit_order.status(), OrderStatus::Accepted);
    }

    #[rstest]
    fn test_cancel_rejected_restores_partially_filled(mut limit_order: OrderAny) {
        submit(&mut limit_order);
        accept(&mut limit_order);
        fill(&mut limit_order, "T-1", Quantity::from(1), "1.00000").unwrap();
        let ts = UnixNanos::from(10);
        let pending = OrderPendingCancel::new(limit_order.event_header(ts, ts), None, None);
        limit_order.apply(pending.into()).unwrap();
        let rejected = OrderCancelRejected {
            header: limit_order.event_header(ts, ts),
            venue_order_id: None,
            account_id: None,
            reason: "too late".to_string(),
        };
        limit_order.apply(rejected.into()).unwrap();
        assert_eq!(limit_order.status(), OrderStatus::PartiallyFilled);
    }

    #[rstest]
    fn test_update_below_filled_is_rejected(mut limit_order: OrderAny) {
        submit(&mut limit_order);
        accept(&mut limit_order);
        fill(&mut limit_order, "T-1", Quantity::from(50_000), "1.00000").unwrap();
        let ts = UnixNanos::from(20);
        let update = OrderUpdated {
            header: limit_order.event_header(ts, ts),
            venue_order_id: None,
            account_id: None,
            quantity: Quantity::from(10_000),
            price: None,
            trigger_price: None,
        };
        let result = limit_order.apply(update.into());
        assert!(matches!(result, Err(OrderError::InvalidQuantity { .. })));
        assert_eq!(limit_order.quantity(), Quantity::from(100_000));
    }

    #[rstest]
    fn test_update_changes_price_and_quantity(mut limit_order: OrderAny) {
        submit(&mut limit_order);
        accept(&mut limit_order);
        let ts = UnixNanos::from(20);
        let update = OrderUpdated {
            header: limit_order.event_header(ts, ts),
            venue_order_id: Some(VenueOrderId::from("V-2")),
            account_id: None,
            quantity: Quantity::from(50_000),
            price: Some(Price::from_str("0.99000").unwrap()),
            trigger_price: None,
        };
        limit_order.apply(update.into()).unwrap();
        assert_eq!(limit_order.status(), OrderStatus::Accepted);
        assert_eq!(limit_order.quantity(), Quantity::from(50_000));
        assert_eq!(limit_order.leaves_qty(), Quantity::from(50_000));
        assert_eq!(limit_order.price(), Some(Price::from_str("0.99000").unwrap()));
        assert_eq!(limit_order.venue_order_ids().len(), 2);
    }

    #[test]
    fn test_canceled_then_late_fill() {
        let mut order = OrderTestBuilder::new(OrderType::Market)
            .quantity(Quantity::from(10))
            .build()
            .unwrap();
        submit(&mut order);
        accept(&mut order);
        let ts = UnixNanos::from(5);
        let canceled = OrderCanceled::new(order.event_header(ts, ts), None, None);
        order.apply(canceled.into()).unwrap();
        fill(&mut order, "T-1", Quantity::from(10), "100.00").unwrap();
        assert_eq!(order.status(), OrderStatus::Filled);
    }

    #[test]
    fn test_stop_limit_triggered() {
        let mut order = OrderTestBuilder::new(OrderType::StopLimit)
            .side(OrderSide::Sell)
            .price(Price::from_str("99.00").unwrap())
            .trigger_price(Price::from_str("99.50").unwrap())
            .build()
            .unwrap();
        assert!(order.has_price());
        assert!(order.has_trigger_price());
        submit(&mut order);
        accept(&mut order);
        let ts = UnixNanos::from(3);
        let triggered = OrderTriggered::new(order.event_header(ts, ts), None, None);
        order.apply(triggered.into()).unwrap();
        assert_eq!(order.status(), OrderStatus::Triggered);
        assert!(order.is_triggered());
    }

    #[test]
    fn test_market_to_limit_takes_first_fill_price() {
        let mut order = OrderTestBuilder::new(OrderType::MarketToLimit)
            .quantity(Quantity::from(10))
            .build()
            .unwrap();
        assert!(!order.has_price());
        submit(&mut order);
        accept(&mut order);
        fill(&mut order, "T-1", Quantity::from(4), "101.25").unwrap();
        assert!(order.has_price());
        assert_eq!(order.price(), Some(Price::from_str("101.25").unwrap()));
    }

    #[test]
    fn test_commissions_accumulate_by_currency() {
        let mut order = OrderTestBuilder::new(OrderType::Market)
            .quantity(Quantity::from(10))
            .build()
            .unwrap();
        submit(&mut order);
        accept(&mut order);
        let usd = Currency::USD();
        for (trade, qty) in [("T-1", 4), ("T-2", 6)] {
            let ts = UnixNanos::from(9);
            let event = OrderFilled {
                header: order.event_header(ts, ts),
                venue_order_id: VenueOrderId::from("V-1"),
                account_id: AccountId::from("SIM-001"),
                trade_id: TradeId::from(trade),
                position_id: Some(PositionId::from("P-1")),
                order_side: OrderSide::Buy,
                order_type: OrderType::Market,
                last_qty: Quantity::from(qty),
                last_px: Price::from_str("10.00").unwrap(),
                currency: usd,
                liquidity_side: LiquiditySide::Taker,
                commission: Some(Money::from_decimal(Decimal::new(25, 2), usd).unwrap()),
            };
            order.apply(event.into()).unwrap();
        }
        assert_eq!(
            order.commissions().get(&usd).map(Money::as_decimal),
            Some(Decimal::new(50, 2))
        );
        assert_eq!(order.position_id(), Some(PositionId::from("P-1")));
        assert_eq!(order.liquidity_side(), Some(LiquiditySide::Taker));
    }

    #[test]
    fn test_slippage_for_adverse_sell() {
        let mut order = OrderTestBuilder::new(OrderType::Limit)
            .side(OrderSide::Sell)
            .quantity(Quantity::from(1))
            .price(Price::from_str("10.00").unwrap())
            .build()
            .unwrap();
        submit(&mut order);
        accept(&mut order);
        fill(&mut order, "T-1", Quantity::from(1), "9.75").unwrap();
        assert_eq!(order.slippage(), Some(Decimal::new(25, 2)));
    }

    #[test]
    fn test_exec_spawn_defaults_to_primary() {
        let order = OrderTestBuilder::new(OrderType::Market)
            .client_order_id(ClientOrderId::from("O-PRIMARY"))
            .exec_algorithm_id(ExecAlgorithmId::from("TWAP"))
            .build()
            .unwrap();
        assert_eq!(order.exec_spawn_id, Some(ClientOrderId::from("O-PRIMARY")));
        assert!(order.is_primary());
        assert!(!order.is_secondary());
    }

    #[test]
    fn test_secondary_order() {
        let order = OrderTestBuilder::new(OrderType::Market)
            .client_order_id(ClientOrderId::from("O-PRIMARY-E1"))
            .exec_algorithm_id(ExecAlgorithmId::from("TWAP"))
            .exec_spawn_id(ClientOrderId::from("O-PRIMARY"))
            .build()
            .unwrap();
        assert!(order.is_secondary());
    }

    #[rstest]
    #[case(OrderSide::Buy, PositionSide::Short, 100_000, true)]
    #[case(OrderSide::Buy, PositionSide::Short, 50_000, false)]
    #[case(OrderSide::Buy, PositionSide::Long, 100_000, false)]
    #[case(OrderSide::Sell, PositionSide::Long, 200_000, true)]
    #[case(OrderSide::Sell, PositionSide::Flat, 200_000, false)]
    fn test_would_reduce_only(
        #[case] side: OrderSide,
        #[case] position_side: PositionSide,
        #[case] position_qty: u64,
        #[case] expected: bool,
    ) {
        let order = OrderTestBuilder::new(OrderType::Market)
            .side(side)
            .quantity(Quantity::from(100_000))
            .build()
            .unwrap();
        assert_eq!(
            order.would_reduce_only(position_side, Quantity::from(position_qty)),
            expected
        );
    }

    #[test]
    fn test_transform_for_release() {
        let mut order = OrderTestBuilder::new(OrderType::StopLimit)
            .price(Price::from_str("10.10").unwrap())
            .trigger_price(Price::from_str("10.00").unwrap())
            .emulation_trigger(TriggerType::BidAsk)
            .build()
            .unwrap();
        order.transform_for_release();
        assert_eq!(
            *order.kind(),
            OrderKind::Limit {
                price: Price::from_str("10.10").unwrap()
            }
        );
        assert_eq!(order.client_order_id, ClientOrderId::from("O-1"));
    }
}
