//! Commands the engine executes and the messages it puts on the bus

use std::fmt;

use common::{ClientId, StrategyId, TraderId, UUID4, UnixNanos, Venue};
use feeds::{DataRequest, DataResponse, DataSubscription};
use indexmap::IndexMap;
use lob::OrderBook;
use model::{data::Data, instruments::InstrumentAny};
use oms::{OrderAny, OrderEventAny, OrderList};

/// Subscribe or unsubscribe request for one data stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionCommand {
    /// Stream to (un)subscribe
    pub subscription: DataSubscription,
    /// Client to use, bypassing venue routing
    pub client_id: Option<ClientId>,
    /// Venue to route by when it differs from the subscription's own
    pub venue: Option<Venue>,
    /// Command identifier
    pub command_id: UUID4,
    /// Creation time
    pub ts_init: UnixNanos,
    /// Client specific options
    pub params: Option<IndexMap<String, String>>,
}

impl SubscriptionCommand {
    /// Creates a command routed by the subscription's venue
    #[must_use]
    pub fn new(subscription: DataSubscription, ts_init: UnixNanos) -> Self {
        Self {
            subscription,
            client_id: None,
            venue: None,
            command_id: UUID4::new(),
            ts_init,
            params: None,
        }
    }

    #[must_use]
    pub fn with_client(mut self, client_id: ClientId) -> Self {
        self.client_id = Some(client_id);
        self
    }

    #[must_use]
    pub fn with_venue(mut self, venue: Venue) -> Self {
        self.venue = Some(venue);
        self
    }

    /// Venue used for routing
    #[must_use]
    pub fn route_venue(&self) -> Option<Venue> {
        self.venue.or_else(|| self.subscription.venue())
    }
}

/// Historical data request plus routing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestCommand {
    /// What to fetch
    pub request: DataRequest,
    /// Client to use, bypassing venue routing
    pub client_id: Option<ClientId>,
    /// Venue to route by when it differs from the request's own
    pub venue: Option<Venue>,
    /// Creation time
    pub ts_init: UnixNanos,
}

impl RequestCommand {
    /// Creates a command routed by the request's venue
    #[must_use]
    pub const fn new(request: DataRequest, ts_init: UnixNanos) -> Self {
        Self {
            request,
            client_id: None,
            venue: None,
            ts_init,
        }
    }

    #[must_use]
    pub const fn with_client(mut self, client_id: ClientId) -> Self {
        self.client_id = Some(client_id);
        self
    }

    /// Venue used for routing
    #[must_use]
    pub fn route_venue(&self) -> Venue {
        self.venue.unwrap_or_else(|| self.request.kind.venue())
    }
}

/// Command accepted on the `data_engine_execute` endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataCommand {
    /// Start a stream
    Subscribe(SubscriptionCommand),
    /// Stop a stream
    Unsubscribe(SubscriptionCommand),
    /// Fetch history
    Request(RequestCommand),
}

impl fmt::Display for DataCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Subscribe(cmd) => write!(f, "Subscribe({})", cmd.subscription),
            Self::Unsubscribe(cmd) => write!(f, "Unsubscribe({})", cmd.subscription),
            Self::Request(cmd) => write!(f, "Request({:?}, {})", cmd.request.kind, cmd.request.request_id),
        }
    }
}

/// Submit a single order
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitOrder {
    /// Trader
    pub trader_id: TraderId,
    /// Strategy submitting the order
    pub strategy_id: StrategyId,
    /// Order to submit
    pub order: OrderAny,
    /// Execution client, `None` for venue routing
    pub client_id: Option<ClientId>,
    /// Creation time
    pub ts_init: UnixNanos,
}

impl SubmitOrder {
    /// Submits `order` on behalf of its own trader and strategy
    #[must_use]
    pub fn new(order: OrderAny, ts_init: UnixNanos) -> Self {
        Self {
            trader_id: order.trader_id,
            strategy_id: order.strategy_id,
            order,
            client_id: None,
            ts_init,
        }
    }
}

/// Submit a contingent order list
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitOrderList {
    /// Trader
    pub trader_id: TraderId,
    /// Strategy submitting the list
    pub strategy_id: StrategyId,
    /// Orders to submit
    pub order_list: OrderList,
    /// Execution client, `None` for venue routing
    pub client_id: Option<ClientId>,
    /// Creation time
    pub ts_init: UnixNanos,
}

impl SubmitOrderList {
    /// Submits `order_list` on behalf of its strategy
    #[must_use]
    pub fn new(trader_id: TraderId, order_list: OrderList, ts_init: UnixNanos) -> Self {
        Self {
            trader_id,
            strategy_id: order_list.strategy_id,
            order_list,
            client_id: None,
            ts_init,
        }
    }
}

/// Order submission passed through the engine on its way to execution
#[derive(Debug, Clone, PartialEq)]
pub enum TradingCommand {
    /// Single order
    SubmitOrder(Box<SubmitOrder>),
    /// Order list
    SubmitOrderList(Box<SubmitOrderList>),
}

/// Everything that travels over the engine's bus
#[derive(Debug, Clone, PartialEq)]
pub enum BusMessage {
    /// Data command for the engine
    Command(DataCommand),
    /// Order submission
    Trading(TradingCommand),
    /// Market data record
    Data(Data),
    /// Instrument definition
    Instrument(Box<InstrumentAny>),
    /// Snapshot of a managed book
    Book(Box<OrderBook>),
    /// Answer to a data request
    Response(DataResponse),
    /// Order event, e.g. a denial
    OrderEvent(OrderEventAny),
}

impl From<DataCommand> for BusMessage {
    fn from(command: DataCommand) -> Self {
        Self::Command(command)
    }
}

impl From<TradingCommand> for BusMessage {
    fn from(command: TradingCommand) -> Self {
        Self::Trading(command)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use common::InstrumentId;
    use feeds::RequestKind;
    use model::data::BarType;
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn test_route_venue_prefers_explicit_venue() {
        let sub = DataSubscription::Quotes {
            instrument_id: InstrumentId::from("AUD/USD.SIM"),
        };
        let cmd = SubscriptionCommand::new(sub.clone(), UnixNanos::default());
        assert_eq!(cmd.route_venue(), Some(Venue::from("SIM")));

        let cmd = SubscriptionCommand::new(sub, UnixNanos::default()).with_venue(Venue::from("ALT"));
        assert_eq!(cmd.route_venue(), Some(Venue::from("ALT")));
    }

    #[rstest]
    fn test_request_routes_by_bar_type() {
        let bar_type = BarType::from_str("BTC-USDT.OKX-1-MINUTE-LAST-EXTERNAL").unwrap();
        let cmd = RequestCommand::new(
            DataRequest::new(RequestKind::Bars { bar_type }),
            UnixNanos::default(),
        );

        assert_eq!(cmd.route_venue(), Venue::from("OKX"));
    }

    #[rstest]
    fn test_command_display() {
        let cmd = DataCommand::Unsubscribe(SubscriptionCommand::new(
            DataSubscription::Trades {
                instrument_id: InstrumentId::from("AUD/USD.SIM"),
            },
            UnixNanos::default(),
        ));

        assert_eq!(cmd.to_string(), "Unsubscribe(trades:AUD/USD.SIM)");
    }
}
