//! OKX v5 data client
//!
//! Public market data arrives over one WebSocket; instrument definitions and
//! historical requests go through the REST API. Decoding happens on the reader task
//! against the shared [`InstrumentSnapshot`], so it never waits on the engine.

pub mod http;
pub mod messages;
pub mod parse;

use std::sync::Arc;

use cache::InstrumentSnapshot;
use common::{BookType, ClientId, Clock, InstrumentId, LiveClock, UnixNanos, Venue};
use model::{
    data::{BarType, Data},
    instruments::InstrumentAny,
};
use parking_lot::{Mutex, RwLock};
use rustc_hash::{FxHashMap, FxHashSet};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, info, warn};

use self::{
    http::{OKX_PAGE_LIMIT, OkxHttpClient, sign},
    messages::{
        OkxArg, OkxBook, OkxCandle, OkxEvent, OkxFundingRate, OkxIndexTicker, OkxInstrument,
        OkxLoginArg, OkxMarkPrice, OkxPush, OkxRequest, OkxTrade, OkxWsFrame,
    },
    parse::{
        bar_interval, instrument_id, parse_book_deltas, parse_candle, parse_depth10,
        parse_funding_rate, parse_index_price, parse_instrument, parse_mark_price, parse_quote,
        parse_trade,
    },
};
use crate::{
    common::{
        adapter::DataClient,
        channel::BookChannel,
        config::{Credentials, DataClientConfig},
        messages::{DataEvent, DataRequest, DataResponse, ResponsePayload},
        subscription::SubscriptionTracker,
        websocket::{WebSocketClient, WebSocketConfig, WsMessage, WsSender},
    },
    error::{FeedError, FeedResult},
};

/// Production public WebSocket endpoint
pub const OKX_WS_PUBLIC_URL: &str = "wss://ws.okx.com:8443/ws/v5/public";

/// Instrument types loaded on connect
pub const OKX_INSTRUMENT_TYPES: [&str; 2] = ["SPOT", "SWAP"];

const EVENT_CAPACITY: usize = 8192;
const HEARTBEAT_MSG: &str = "ping";

/// Index name OKX publishes for an instrument: the underlying pair
fn index_name(symbol: &str) -> &str {
    symbol.strip_suffix("-SWAP").unwrap_or(symbol)
}

fn inst_type_of(symbol: &str) -> &'static str {
    if symbol.ends_with("-SWAP") { "SWAP" } else { "SPOT" }
}

/// Which outputs each channel push feeds
#[derive(Debug, Default)]
struct Routes {
    depth10: FxHashSet<String>,
    books5_deltas: FxHashSet<String>,
    bars: FxHashMap<(String, String), BarType>,
    index: FxHashMap<String, FxHashSet<InstrumentId>>,
}

/// State shared between the client and its reader task
struct Shared {
    client_id: ClientId,
    venue: Venue,
    instruments: Arc<InstrumentSnapshot>,
    tracker: Mutex<SubscriptionTracker>,
    routes: RwLock<Routes>,
    credentials: Option<Credentials>,
    clock: Arc<dyn Clock>,
}

impl Shared {
    fn instrument(&self, inst_id: &str) -> Option<InstrumentAny> {
        let instrument = self.instruments.get(&instrument_id(inst_id, self.venue));
        if instrument.is_none() {
            debug!(client = %self.client_id, inst_id, "Dropping push for unknown instrument");
        }
        instrument
    }

    /// Decodes one text frame into normalized events
    fn decode_text(&self, text: &str) -> Vec<DataEvent> {
        if text == "pong" {
            return Vec::new();
        }
        let frame: OkxWsFrame = match serde_json::from_str(text) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(client = %self.client_id, error = %e, "Undecodable OKX frame");
                return match serde_json::from_str(text) {
                    Ok(value) => vec![DataEvent::Raw(value)],
                    Err(_) => Vec::new(),
                };
            }
        };
        match frame {
            OkxWsFrame::Event(event) => self.on_event(event),
            OkxWsFrame::Push(push) => self.on_push(push),
        }
    }

    fn on_event(&self, event: OkxEvent) -> Vec<DataEvent> {
        match event.event.as_str() {
            "subscribe" => {
                if let Some(arg) = event.arg {
                    debug!(client = %self.client_id, channel = %arg.channel, "Subscription confirmed");
                    self.tracker.lock().confirm(&arg.key());
                }
                Vec::new()
            }
            "unsubscribe" => Vec::new(),
            "login" if event.code.as_deref() == Some("0") => {
                info!(client = %self.client_id, "Logged in");
                Vec::new()
            }
            _ => {
                let code = event.code.unwrap_or_default();
                let msg = event.msg.unwrap_or_default();
                if let Some(arg) = &event.arg {
                    self.tracker.lock().reject(&arg.key());
                }
                warn!(client = %self.client_id, %code, %msg, event = %event.event, "OKX error");
                vec![DataEvent::Error(format!("{} {code}: {msg}", event.event))]
            }
        }
    }

    fn on_push(&self, push: OkxPush) -> Vec<DataEvent> {
        let ts_init = self.clock.timestamp_ns();
        let snapshot = push.action.as_deref() != Some("update");
        let mut out = Vec::with_capacity(push.data.len());
        for value in push.data {
            if let Err(e) = self.decode_record(&push.arg, snapshot, value, ts_init, &mut out) {
                warn!(client = %self.client_id, channel = %push.arg.channel, error = %e, "Skipping OKX record");
            }
        }
        out
    }

    fn decode_record(
        &self,
        arg: &OkxArg,
        snapshot: bool,
        value: serde_json::Value,
        ts_init: UnixNanos,
        out: &mut Vec<DataEvent>,
    ) -> FeedResult<()> {
        let inst_id = arg.inst_id.as_deref();
        match arg.channel.as_str() {
            "books5" => {
                let book: OkxBook = serde_json::from_value(value)?;
                let (Some(inst_id), Some(instrument)) =
                    (inst_id, inst_id.and_then(|i| self.instrument(i)))
                else {
                    return Ok(());
                };
                let routes = self.routes.read();
                if routes.depth10.contains(inst_id) {
                    let depth = parse_depth10(&instrument, &book, ts_init)?;
                    out.push(DataEvent::Data(Data::Depth10(Box::new(depth))));
                }
                if routes.books5_deltas.contains(inst_id) {
                    let deltas = parse_book_deltas(&instrument, &book, true, ts_init)?;
                    out.push(DataEvent::Data(Data::Deltas(deltas)));
                }
            }
            "books" | "books50-l2-tbt" | "books-l2-tbt" => {
                let book: OkxBook = serde_json::from_value(value)?;
                if !snapshot && book.bids.is_empty() && book.asks.is_empty() {
                    return Ok(());
                }
                if let Some(instrument) = inst_id.and_then(|i| self.instrument(i)) {
                    let deltas = parse_book_deltas(&instrument, &book, snapshot, ts_init)?;
                    out.push(DataEvent::Data(Data::Deltas(deltas)));
                }
            }
            "bbo-tbt" => {
                let book: OkxBook = serde_json::from_value(value)?;
                if let Some(instrument) = inst_id.and_then(|i| self.instrument(i)) {
                    if let Some(quote) = parse_quote(&instrument, &book, ts_init)? {
                        out.push(DataEvent::Data(Data::Quote(quote)));
                    }
                }
            }
            "trades" => {
                let trade: OkxTrade = serde_json::from_value(value)?;
                if let Some(instrument) = self.instrument(&trade.inst_id) {
                    let tick = parse_trade(&instrument, &trade, ts_init)?;
                    out.push(DataEvent::Data(Data::Trade(tick)));
                }
            }
            "mark-price" => {
                let mark: OkxMarkPrice = serde_json::from_value(value)?;
                if let Some(instrument) = self.instrument(&mark.inst_id) {
                    let update = parse_mark_price(&instrument, &mark, ts_init)?;
                    out.push(DataEvent::Data(Data::MarkPriceUpdate(update)));
                }
            }
            "index-tickers" => {
                let ticker: OkxIndexTicker = serde_json::from_value(value)?;
                let targets: Vec<InstrumentId> = self
                    .routes
                    .read()
                    .index
                    .get(&ticker.inst_id)
                    .map(|ids| ids.iter().copied().collect())
                    .unwrap_or_default();
                for id in targets {
                    if let Some(instrument) = self.instruments.get(&id) {
                        let update = parse_index_price(&instrument, &ticker, ts_init)?;
                        out.push(DataEvent::Data(Data::IndexPriceUpdate(update)));
                    }
                }
            }
            "funding-rate" => {
                let record: OkxFundingRate = serde_json::from_value(value)?;
                let id = instrument_id(&record.inst_id, self.venue);
                let update = parse_funding_rate(id, &record, ts_init)?;
                out.push(DataEvent::FundingRates(vec![update]));
            }
            "instruments" => {
                let def: OkxInstrument = serde_json::from_value(value)?;
                match parse_instrument(&def, self.venue, ts_init) {
                    Ok(instrument) => {
                        self.instruments.upsert(instrument.clone());
                        out.push(DataEvent::Instrument(Box::new(instrument)));
                    }
                    Err(FeedError::Unsupported { .. }) => {}
                    Err(e) => return Err(e),
                }
            }
            channel if channel.starts_with("candle") => {
                let candle: OkxCandle = serde_json::from_value(value)?;
                let Some(inst_id) = inst_id else {
                    return Ok(());
                };
                let bar_type = self
                    .routes
                    .read()
                    .bars
                    .get(&(channel.to_string(), inst_id.to_string()))
                    .copied();
                let (Some(bar_type), Some(instrument)) = (bar_type, self.instrument(inst_id))
                else {
                    return Ok(());
                };
                if let Some(bar) = parse_candle(bar_type, &instrument, &candle)? {
                    out.push(DataEvent::Data(Data::Bar(bar)));
                }
            }
            _ => out.push(DataEvent::Raw(value)),
        }
        Ok(())
    }
}

/// Data client for the OKX venue
pub struct OkxDataClient {
    config: DataClientConfig,
    shared: Arc<Shared>,
    http: OkxHttpClient,
    ws: Option<WebSocketClient>,
    events: mpsc::Sender<DataEvent>,
    event_rx: Option<mpsc::Receiver<DataEvent>>,
    tasks: Vec<JoinHandle<()>>,
}

impl std::fmt::Debug for OkxDataClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OkxDataClient")
            .field("client_id", &self.shared.client_id)
            .field("config", &self.config)
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}

impl OkxDataClient {
    /// Creates a disconnected client.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::MissingCredentials`] when credentials are required but
    /// absent, or [`FeedError::Transport`] if the HTTP client cannot be built.
    pub fn new(
        client_id: ClientId,
        config: DataClientConfig,
        instruments: Arc<InstrumentSnapshot>,
    ) -> FeedResult<Self> {
        Self::with_clock(client_id, config, instruments, Arc::new(LiveClock))
    }

    /// Like [`OkxDataClient::new`] with an explicit clock for `ts_init`
    ///
    /// # Errors
    ///
    /// See [`OkxDataClient::new`].
    pub fn with_clock(
        client_id: ClientId,
        config: DataClientConfig,
        instruments: Arc<InstrumentSnapshot>,
        clock: Arc<dyn Clock>,
    ) -> FeedResult<Self> {
        let credentials = Credentials::resolve(&config)?;
        let http = OkxHttpClient::new(config.http_url.clone(), config.connect_timeout_secs)?;
        let (events, event_rx) = mpsc::channel(EVENT_CAPACITY);
        let shared = Arc::new(Shared {
            client_id,
            venue: config.venue,
            instruments,
            tracker: Mutex::new(SubscriptionTracker::new()),
            routes: RwLock::new(Routes::default()),
            credentials,
            clock,
        });
        Ok(Self {
            config,
            shared,
            http,
            ws: None,
            events,
            event_rx: Some(event_rx),
            tasks: Vec::new(),
        })
    }

    /// Instrument lookup used for decoding
    #[must_use]
    pub fn instruments(&self) -> Arc<InstrumentSnapshot> {
        Arc::clone(&self.shared.instruments)
    }

    /// Venue payloads currently owned by at least one subscription
    #[must_use]
    pub fn subscribed_payloads(&self) -> Vec<String> {
        self.shared.tracker.lock().payloads()
    }

    fn sender(&self) -> Option<WsSender> {
        self.ws.as_ref().map(WebSocketClient::sender)
    }

    fn send_op(sender: Option<&WsSender>, op: &'static str, args: Vec<OkxArg>) -> FeedResult<()> {
        let Some(sender) = sender else {
            return Ok(());
        };
        let text = serde_json::to_string(&OkxRequest { op, args })?;
        sender.send_text(text)
    }

    fn add(&self, arg: OkxArg, owner: &str) -> FeedResult<()> {
        let send = self.shared.tracker.lock().add(&arg.key(), owner);
        if send {
            debug!(client = %self.shared.client_id, channel = %arg.channel, owner, "Subscribing");
            Self::send_op(self.sender().as_ref(), "subscribe", vec![arg])?;
        }
        Ok(())
    }

    fn remove(&self, arg: OkxArg, owner: &str) -> FeedResult<()> {
        let send = self.shared.tracker.lock().remove(&arg.key(), owner);
        if send {
            debug!(client = %self.shared.client_id, channel = %arg.channel, owner, "Unsubscribing");
            Self::send_op(self.sender().as_ref(), "unsubscribe", vec![arg])?;
        }
        Ok(())
    }

    fn login(sender: &WsSender, credentials: &Credentials) -> FeedResult<()> {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let arg = OkxLoginArg {
            api_key: credentials.api_key.clone(),
            passphrase: credentials.api_passphrase.clone().unwrap_or_default(),
            sign: sign(&credentials.api_secret, &timestamp, "GET", "/users/self/verify")?,
            timestamp,
        };
        let text = serde_json::to_string(&OkxRequest {
            op: "login",
            args: vec![arg],
        })?;
        sender.send_text(text)
    }

    /// Sends every owned payload not yet sent on this connection
    fn replay(shared: &Shared, sender: &WsSender) -> FeedResult<()> {
        let payloads = shared.tracker.lock().replay();
        let args: Vec<OkxArg> = payloads
            .iter()
            .filter_map(|p| serde_json::from_str(p).ok())
            .collect();
        if !args.is_empty() {
            info!(client = %shared.client_id, count = args.len(), "Replaying subscriptions");
            Self::send_op(Some(sender), "subscribe", args)?;
        }
        Ok(())
    }

    async fn run_reader(shared: Arc<Shared>, sender: WsSender, mut rx: mpsc::Receiver<WsMessage>, events: mpsc::Sender<DataEvent>) {
        while let Some(message) = rx.recv().await {
            let decoded = match message {
                WsMessage::Text(text) => shared.decode_text(&text),
                WsMessage::Binary(_) => Vec::new(),
                WsMessage::Reconnected => {
                    shared.tracker.lock().on_reconnect();
                    if let Some(credentials) = &shared.credentials {
                        if let Err(e) = Self::login(&sender, credentials) {
                            warn!(client = %shared.client_id, error = %e, "Re-login failed");
                        }
                    }
                    if let Err(e) = Self::replay(&shared, &sender) {
                        warn!(client = %shared.client_id, error = %e, "Replay failed");
                    }
                    vec![DataEvent::Reconnected]
                }
            };
            for event in decoded {
                if events.send(event).await.is_err() {
                    debug!(client = %shared.client_id, "Event stream closed, stopping reader");
                    return;
                }
            }
        }
    }

    async fn fetch_instruments(
        http: &OkxHttpClient,
        venue: Venue,
        ts_init: UnixNanos,
    ) -> FeedResult<Vec<InstrumentAny>> {
        let mut instruments = Vec::new();
        for inst_type in OKX_INSTRUMENT_TYPES {
            for def in http.instruments(inst_type, None).await? {
                match parse_instrument(&def, venue, ts_init) {
                    Ok(instrument) => instruments.push(instrument),
                    Err(e) => debug!(inst_id = %def.inst_id, error = %e, "Skipping instrument"),
                }
            }
        }
        Ok(instruments)
    }

    /// Runs a REST request off the caller's task and answers on the event stream
    fn spawn_request<F>(&mut self, request: &DataRequest, fetch: F)
    where
        F: Future<Output = FeedResult<ResponsePayload>> + Send + 'static,
    {
        let events = self.events.clone();
        let client_id = self.shared.client_id;
        let clock = Arc::clone(&self.shared.clock);
        let correlation_id = request.request_id;
        self.tasks.retain(|task| !task.is_finished());
        self.tasks.push(tokio::spawn(async move {
            let event = match fetch.await {
                Ok(payload) => DataEvent::Response(DataResponse {
                    correlation_id,
                    client_id,
                    payload,
                    ts_init: clock.timestamp_ns(),
                }),
                Err(e) => {
                    warn!(client = %client_id, %correlation_id, error = %e, "Request failed");
                    DataEvent::Error(format!("request {correlation_id} failed: {e}"))
                }
            };
            let _ = events.send(event).await;
        }));
    }

    fn instrument_or_err(&self, instrument_id: &InstrumentId) -> FeedResult<InstrumentAny> {
        self.shared
            .instruments
            .get(instrument_id)
            .ok_or_else(|| FeedError::InvalidConfig(format!("unknown instrument {instrument_id}")))
    }
}

#[async_trait::async_trait]
impl DataClient for OkxDataClient {
    fn client_id(&self) -> ClientId {
        self.shared.client_id
    }

    fn venue(&self) -> Option<Venue> {
        Some(self.shared.venue)
    }

    fn is_connected(&self) -> bool {
        self.ws.as_ref().is_some_and(WebSocketClient::is_connected)
    }

    fn take_event_stream(&mut self) -> Option<mpsc::Receiver<DataEvent>> {
        self.event_rx.take()
    }

    async fn connect(&mut self) -> anyhow::Result<()> {
        if self.ws.is_some() {
            return Ok(());
        }
        let shared = Arc::clone(&self.shared);
        info!(client = %shared.client_id, "Connecting");

        let instruments =
            Self::fetch_instruments(&self.http, shared.venue, shared.clock.timestamp_ns()).await?;
        info!(client = %shared.client_id, count = instruments.len(), "Loaded instruments");
        shared
            .instruments
            .replace_venue(shared.venue, instruments.iter().cloned());
        // The consumer may not be draining yet
        let events = self.events.clone();
        self.tasks.push(tokio::spawn(async move {
            for instrument in instruments {
                if events.send(DataEvent::Instrument(Box::new(instrument))).await.is_err() {
                    break;
                }
            }
        }));

        let ws_config = WebSocketConfig {
            url: self
                .config
                .ws_url
                .clone()
                .unwrap_or_else(|| OKX_WS_PUBLIC_URL.to_string()),
            heartbeat: Some(std::time::Duration::from_secs(self.config.heartbeat_secs.max(1))),
            heartbeat_msg: Some(HEARTBEAT_MSG.to_string()),
            connect_timeout: std::time::Duration::from_secs(self.config.connect_timeout_secs),
            reconnect_timeout: std::time::Duration::from_secs(self.config.reconnect_timeout_secs),
            backoff: self.config.backoff,
        };
        let (ws, rx) = WebSocketClient::connect(ws_config).await?;
        let sender = ws.sender();
        if let Some(credentials) = &shared.credentials {
            Self::login(&sender, credentials)?;
        }
        shared.tracker.lock().on_reconnect();
        Self::replay(&shared, &sender)?;

        self.tasks.push(tokio::spawn(Self::run_reader(
            Arc::clone(&shared),
            sender,
            rx,
            self.events.clone(),
        )));
        self.ws = Some(ws);
        info!(client = %shared.client_id, "Connected");
        Ok(())
    }

    async fn disconnect(&mut self) -> anyhow::Result<()> {
        if let Some(mut ws) = self.ws.take() {
            ws.close().await;
        }
        for task in self.tasks.drain(..) {
            task.abort();
        }
        self.shared.tracker.lock().on_reconnect();
        info!(client = %self.shared.client_id, "Disconnected");
        Ok(())
    }

    async fn subscribe_instruments(&mut self, venue: Venue) -> anyhow::Result<()> {
        for inst_type in OKX_INSTRUMENT_TYPES {
            self.add(
                OkxArg::inst_type("instruments", inst_type),
                &format!("instruments:{venue}"),
            )?;
        }
        Ok(())
    }

    async fn subscribe_instrument(&mut self, instrument_id: InstrumentId) -> anyhow::Result<()> {
        let arg = OkxArg::inst_type("instruments", inst_type_of(instrument_id.symbol.as_str()));
        Ok(self.add(arg, &format!("instrument:{instrument_id}"))?)
    }

    async fn subscribe_book_deltas(
        &mut self,
        instrument_id: InstrumentId,
        book_type: BookType,
        depth: Option<usize>,
    ) -> anyhow::Result<()> {
        if book_type == BookType::L3_MBO {
            return Err(FeedError::Unsupported {
                client: self.shared.client_id.to_string(),
                operation: "L3_MBO book deltas",
            }
            .into());
        }
        let depth = depth.unwrap_or(0);
        let channel = BookChannel::select(depth, self.config.tier)?;
        let inst_id = instrument_id.symbol.to_string();
        if channel == BookChannel::Books5 {
            self.shared.routes.write().books5_deltas.insert(inst_id.clone());
        }
        let arg = OkxArg::instrument(channel.as_str(), inst_id);
        Ok(self.add(arg, &format!("book.deltas:{instrument_id}:{depth}"))?)
    }

    async fn subscribe_book_depth10(
        &mut self,
        instrument_id: InstrumentId,
        _book_type: BookType,
    ) -> anyhow::Result<()> {
        let inst_id = instrument_id.symbol.to_string();
        self.shared.routes.write().depth10.insert(inst_id.clone());
        let arg = OkxArg::instrument(BookChannel::Books5.as_str(), inst_id);
        Ok(self.add(arg, &format!("book.depth10:{instrument_id}"))?)
    }

    async fn subscribe_quotes(&mut self, instrument_id: InstrumentId) -> anyhow::Result<()> {
        let arg = OkxArg::instrument("bbo-tbt", instrument_id.symbol.as_str());
        Ok(self.add(arg, &format!("quotes:{instrument_id}"))?)
    }

    async fn subscribe_trades(&mut self, instrument_id: InstrumentId) -> anyhow::Result<()> {
        let arg = OkxArg::instrument("trades", instrument_id.symbol.as_str());
        Ok(self.add(arg, &format!("trades:{instrument_id}"))?)
    }

    async fn subscribe_bars(&mut self, bar_type: BarType) -> anyhow::Result<()> {
        let channel = format!("candle{}", bar_interval(&bar_type)?);
        let inst_id = bar_type.instrument_id.symbol.to_string();
        self.shared
            .routes
            .write()
            .bars
            .insert((channel.clone(), inst_id.clone()), bar_type);
        Ok(self.add(OkxArg::instrument(channel, inst_id), &format!("bars:{bar_type}"))?)
    }

    async fn subscribe_mark_prices(&mut self, instrument_id: InstrumentId) -> anyhow::Result<()> {
        let arg = OkxArg::instrument("mark-price", instrument_id.symbol.as_str());
        Ok(self.add(arg, &format!("mark_prices:{instrument_id}"))?)
    }

    async fn subscribe_index_prices(&mut self, instrument_id: InstrumentId) -> anyhow::Result<()> {
        let index = index_name(instrument_id.symbol.as_str()).to_string();
        self.shared
            .routes
            .write()
            .index
            .entry(index.clone())
            .or_default()
            .insert(instrument_id);
        let arg = OkxArg::instrument("index-tickers", index);
        Ok(self.add(arg, &format!("index_prices:{instrument_id}"))?)
    }

    async fn subscribe_funding_rates(&mut self, instrument_id: InstrumentId) -> anyhow::Result<()> {
        let arg = OkxArg::instrument("funding-rate", instrument_id.symbol.as_str());
        Ok(self.add(arg, &format!("funding_rates:{instrument_id}"))?)
    }

    async fn unsubscribe_instruments(&mut self, venue: Venue) -> anyhow::Result<()> {
        for inst_type in OKX_INSTRUMENT_TYPES {
            self.remove(
                OkxArg::inst_type("instruments", inst_type),
                &format!("instruments:{venue}"),
            )?;
        }
        Ok(())
    }

    async fn unsubscribe_instrument(&mut self, instrument_id: InstrumentId) -> anyhow::Result<()> {
        let arg = OkxArg::inst_type("instruments", inst_type_of(instrument_id.symbol.as_str()));
        Ok(self.remove(arg, &format!("instrument:{instrument_id}"))?)
    }

    async fn unsubscribe_book_deltas(
        &mut self,
        instrument_id: InstrumentId,
        depth: Option<usize>,
    ) -> anyhow::Result<()> {
        let depth = depth.unwrap_or(0);
        let channel = BookChannel::select(depth, self.config.tier)?;
        let inst_id = instrument_id.symbol.to_string();
        if channel == BookChannel::Books5 {
            self.shared.routes.write().books5_deltas.remove(&inst_id);
        }
        let arg = OkxArg::instrument(channel.as_str(), inst_id);
        Ok(self.remove(arg, &format!("book.deltas:{instrument_id}:{depth}"))?)
    }

    async fn unsubscribe_book_depth10(&mut self, instrument_id: InstrumentId) -> anyhow::Result<()> {
        let inst_id = instrument_id.symbol.to_string();
        self.shared.routes.write().depth10.remove(&inst_id);
        let arg = OkxArg::instrument(BookChannel::Books5.as_str(), inst_id);
        Ok(self.remove(arg, &format!("book.depth10:{instrument_id}"))?)
    }

    async fn unsubscribe_quotes(&mut self, instrument_id: InstrumentId) -> anyhow::Result<()> {
        let arg = OkxArg::instrument("bbo-tbt", instrument_id.symbol.as_str());
        Ok(self.remove(arg, &format!("quotes:{instrument_id}"))?)
    }

    async fn unsubscribe_trades(&mut self, instrument_id: InstrumentId) -> anyhow::Result<()> {
        let arg = OkxArg::instrument("trades", instrument_id.symbol.as_str());
        Ok(self.remove(arg, &format!("trades:{instrument_id}"))?)
    }

    async fn unsubscribe_bars(&mut self, bar_type: BarType) -> anyhow::Result<()> {
        let channel = format!("candle{}", bar_interval(&bar_type)?);
        let inst_id = bar_type.instrument_id.symbol.to_string();
        self.shared
            .routes
            .write()
            .bars
            .remove(&(channel.clone(), inst_id.clone()));
        Ok(self.remove(OkxArg::instrument(channel, inst_id), &format!("bars:{bar_type}"))?)
    }

    async fn unsubscribe_mark_prices(&mut self, instrument_id: InstrumentId) -> anyhow::Result<()> {
        let arg = OkxArg::instrument("mark-price", instrument_id.symbol.as_str());
        Ok(self.remove(arg, &format!("mark_prices:{instrument_id}"))?)
    }

    async fn unsubscribe_index_prices(&mut self, instrument_id: InstrumentId) -> anyhow::Result<()> {
        let index = index_name(instrument_id.symbol.as_str()).to_string();
        {
            let mut routes = self.shared.routes.write();
            if let Some(ids) = routes.index.get_mut(&index) {
                ids.remove(&instrument_id);
                if ids.is_empty() {
                    routes.index.remove(&index);
                }
            }
        }
        let arg = OkxArg::instrument("index-tickers", index);
        Ok(self.remove(arg, &format!("index_prices:{instrument_id}"))?)
    }

    async fn unsubscribe_funding_rates(
        &mut self,
        instrument_id: InstrumentId,
    ) -> anyhow::Result<()> {
        let arg = OkxArg::instrument("funding-rate", instrument_id.symbol.as_str());
        Ok(self.remove(arg, &format!("funding_rates:{instrument_id}"))?)
    }

    async fn request_instruments(
        &mut self,
        request: &DataRequest,
        venue: Venue,
    ) -> anyhow::Result<()> {
        let http = self.http.clone();
        let snapshot = Arc::clone(&self.shared.instruments);
        let ts_init = self.shared.clock.timestamp_ns();
        self.spawn_request(request, async move {
            let instruments = Self::fetch_instruments(&http, venue, ts_init).await?;
            snapshot.replace_venue(venue, instruments.iter().cloned());
            Ok(ResponsePayload::Instruments(instruments))
        });
        Ok(())
    }

    async fn request_instrument(
        &mut self,
        request: &DataRequest,
        instrument_id: InstrumentId,
    ) -> anyhow::Result<()> {
        if let Some(instrument) = self.shared.instruments.get(&instrument_id) {
            self.spawn_request(request, async move {
                Ok(ResponsePayload::Instruments(vec![instrument]))
            });
            return Ok(());
        }
        let http = self.http.clone();
        let snapshot = Arc::clone(&self.shared.instruments);
        let venue = self.shared.venue;
        let ts_init = self.shared.clock.timestamp_ns();
        self.spawn_request(request, async move {
            let symbol = instrument_id.symbol.to_string();
            let defs = http.instruments(inst_type_of(&symbol), Some(&symbol)).await?;
            let mut instruments = Vec::with_capacity(defs.len());
            for def in &defs {
                let instrument = parse_instrument(def, venue, ts_init)?;
                snapshot.upsert(instrument.clone());
                instruments.push(instrument);
            }
            Ok(ResponsePayload::Instruments(instruments))
        });
        Ok(())
    }

    async fn request_trades(
        &mut self,
        request: &DataRequest,
        instrument_id: InstrumentId,
    ) -> anyhow::Result<()> {
        let instrument = self.instrument_or_err(&instrument_id)?;
        let http = self.http.clone();
        let window = request.clone();
        let ts_init = self.shared.clock.timestamp_ns();
        self.spawn_request(request, async move {
            let limit = window.limit.unwrap_or(OKX_PAGE_LIMIT);
            let records = http.trades(instrument_id.symbol.as_str(), limit).await?;
            let mut trades = Vec::with_capacity(records.len());
            for record in records {
                let tick = parse_trade(&instrument, &OkxTrade::from(record), ts_init)?;
                if window.contains(tick.ts_event) {
                    trades.push(tick);
                }
            }
            trades.sort_by_key(|t| t.ts_event);
            Ok(ResponsePayload::Trades(trades))
        });
        Ok(())
    }

    async fn request_bars(&mut self, request: &DataRequest, bar_type: BarType) -> anyhow::Result<()> {
        let interval = bar_interval(&bar_type)?;
        let instrument = self.instrument_or_err(&bar_type.instrument_id)?;
        let http = self.http.clone();
        let window = request.clone();
        self.spawn_request(request, async move {
            let limit = window.limit.unwrap_or(OKX_PAGE_LIMIT);
            let after_ms = window.end.map(|end| end.as_u64() / 1_000_000 + 1);
            let candles = http
                .candles(bar_type.instrument_id.symbol.as_str(), &interval, after_ms, limit)
                .await?;
            let mut bars = Vec::with_capacity(candles.len());
            for candle in &candles {
                if let Some(bar) = parse_candle(bar_type, &instrument, candle)? {
                    if window.contains(bar.ts_event) {
                        bars.push(bar);
                    }
                }
            }
            bars.sort_by_key(|b| b.ts_event);
            Ok(ResponsePayload::Bars(bars))
        });
        Ok(())
    }

    async fn request_book_snapshot(
        &mut self,
        request: &DataRequest,
        instrument_id: InstrumentId,
        depth: Option<usize>,
    ) -> anyhow::Result<()> {
        let instrument = self.instrument_or_err(&instrument_id)?;
        let http = self.http.clone();
        let ts_init = self.shared.clock.timestamp_ns();
        let depth = depth.filter(|d| *d > 0).unwrap_or(400);
        self.spawn_request(request, async move {
            let book = http
                .book(instrument_id.symbol.as_str(), depth)
                .await?
                .ok_or_else(|| FeedError::Decode(format!("empty book for {instrument_id}")))?;
            let deltas = parse_book_deltas(&instrument, &book, true, ts_init)?;
            Ok(ResponsePayload::Book(deltas))
        });
        Ok(())
    }
}
