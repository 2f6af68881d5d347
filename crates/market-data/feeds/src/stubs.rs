//! In-process data client for engine tests

use std::sync::Arc;

use common::{ClientId, InstrumentId, UnixNanos, Venue};
use model::{
    data::BarType,
    instruments::{Instrument, InstrumentAny},
};
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::{
    common::{
        adapter::DataClient,
        messages::{DataEvent, DataRequest, DataResponse, DataSubscription, ResponsePayload},
    },
    error::FeedError,
};

/// A call the engine made on the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    /// `connect`
    Connect,
    /// `disconnect`
    Disconnect,
    /// A subscribe, in the client's own terms
    Subscribe(String),
    /// An unsubscribe
    Unsubscribe(String),
    /// A request, by correlation id
    Request(common::UUID4),
}

/// Records every call and answers requests from preloaded instruments.
///
/// Events are injected through [`MockDataClient::sender`].
#[derive(Debug)]
pub struct MockDataClient {
    client_id: ClientId,
    venue: Option<Venue>,
    connected: bool,
    fail_connect: bool,
    calls: Arc<Mutex<Vec<MockCall>>>,
    instruments: Vec<InstrumentAny>,
    tx: mpsc::Sender<DataEvent>,
    rx: Option<mpsc::Receiver<DataEvent>>,
}

impl MockDataClient {
    /// Creates a disconnected client
    #[must_use]
    pub fn new(client_id: &str, venue: Option<&str>) -> Self {
        let (tx, rx) = mpsc::channel(1024);
        Self {
            client_id: ClientId::from(client_id),
            venue: venue.map(Venue::from),
            connected: false,
            fail_connect: false,
            calls: Arc::new(Mutex::new(Vec::new())),
            instruments: Vec::new(),
            tx,
            rx: Some(rx),
        }
    }

    /// Makes `connect` fail
    #[must_use]
    pub fn failing_connect(mut self) -> Self {
        self.fail_connect = true;
        self
    }

    /// Instruments returned by instrument requests
    #[must_use]
    pub fn with_instruments(mut self, instruments: Vec<InstrumentAny>) -> Self {
        self.instruments = instruments;
        self
    }

    /// Shared log of calls, readable after the client is moved into an engine
    #[must_use]
    pub fn calls(&self) -> Arc<Mutex<Vec<MockCall>>> {
        Arc::clone(&self.calls)
    }

    /// Injects events as if received from the venue
    #[must_use]
    pub fn sender(&self) -> mpsc::Sender<DataEvent> {
        self.tx.clone()
    }

    fn record(&self, call: MockCall) {
        self.calls.lock().push(call);
    }

    async fn respond(&self, request: &DataRequest, payload: ResponsePayload) -> anyhow::Result<()> {
        self.record(MockCall::Request(request.request_id));
        self.tx
            .send(DataEvent::Response(DataResponse {
                correlation_id: request.request_id,
                client_id: self.client_id,
                payload,
                ts_init: UnixNanos::default(),
            }))
            .await
            .map_err(|_| anyhow::anyhow!("event stream closed"))
    }
}

#[async_trait::async_trait]
impl DataClient for MockDataClient {
    fn client_id(&self) -> ClientId {
        self.client_id
    }

    fn venue(&self) -> Option<Venue> {
        self.venue
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn take_event_stream(&mut self) -> Option<mpsc::Receiver<DataEvent>> {
        self.rx.take()
    }

    async fn connect(&mut self) -> anyhow::Result<()> {
        self.record(MockCall::Connect);
        if self.fail_connect {
            return Err(FeedError::Transport(format!("{} refused", self.client_id)).into());
        }
        self.connected = true;
        Ok(())
    }

    async fn disconnect(&mut self) -> anyhow::Result<()> {
        self.record(MockCall::Disconnect);
        self.connected = false;
        Ok(())
    }

    // Every kind is accepted and recorded by its display form
    async fn subscribe(&mut self, subscription: &DataSubscription) -> anyhow::Result<()> {
        self.record(MockCall::Subscribe(subscription.to_string()));
        Ok(())
    }

    async fn unsubscribe(&mut self, subscription: &DataSubscription) -> anyhow::Result<()> {
        self.record(MockCall::Unsubscribe(subscription.to_string()));
        Ok(())
    }

    async fn request_instruments(
        &mut self,
        request: &DataRequest,
        venue: Venue,
    ) -> anyhow::Result<()> {
        let instruments = self
            .instruments
            .iter()
            .filter(|i| i.id().venue == venue)
            .cloned()
            .collect();
        self.respond(request, ResponsePayload::Instruments(instruments))
            .await
    }

    async fn request_instrument(
        &mut self,
        request: &DataRequest,
        instrument_id: InstrumentId,
    ) -> anyhow::Result<()> {
        let instruments = self
            .instruments
            .iter()
            .filter(|i| i.id() == instrument_id)
            .cloned()
            .collect();
        self.respond(request, ResponsePayload::Instruments(instruments))
            .await
    }

    async fn request_trades(
        &mut self,
        request: &DataRequest,
        _instrument_id: InstrumentId,
    ) -> anyhow::Result<()> {
        self.respond(request, ResponsePayload::Trades(Vec::new()))
            .await
    }

    async fn request_bars(&mut self, request: &DataRequest, _bar_type: BarType) -> anyhow::Result<()> {
        self.respond(request, ResponsePayload::Bars(Vec::new())).await
    }
}
