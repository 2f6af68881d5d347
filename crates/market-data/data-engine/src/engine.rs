//! The data engine
//!
//! Owns the registered data clients, routes subscription and request commands to them,
//! and turns their event streams into cache updates and bus publications. All state is
//! mutated from the task driving the engine; clients and timers feed it through queues.

use std::{fmt, sync::Arc};

use bus::{BusError, MessageBus};
use cache::SharedCache;
use common::{BookType, ClientId, Clock, InstrumentId, RecordFlag, Venue};
use feeds::{DataClient, DataEvent, DataRequest, DataResponse, DataSubscription, RequestKind, ResponsePayload};
use indexmap::IndexMap;
use lob::{BookResult, OrderBook};
use model::{
    data::{Bar, BarType, Data, DataType, FundingRateUpdate, OrderBookDelta, OrderBookDeltas},
    instruments::{Instrument, InstrumentAny},
};
use rustc_hash::FxHashMap;
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::{
    config::DataEngineConfig,
    error::{DataEngineError, DataEngineResult},
    messages::{BusMessage, DataCommand, RequestCommand, SubscriptionCommand},
    tasks::{TimerEvent, spawn_reader, spawn_refresh_timer, spawn_snapshotter},
    topics::{DATA_ENGINE_RESPONSE, book_snapshots_topic, instrument_topic, topic_for},
};

/// Lifecycle state of the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineState {
    /// Built or reset; commands are accepted, data is dropped
    #[default]
    Ready,
    /// Processing data
    Running,
    /// Timers stopped; data is dropped
    Stopped,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ready => "READY",
            Self::Running => "RUNNING",
            Self::Stopped => "STOPPED",
        })
    }
}

struct ClientEntry {
    client: Box<dyn DataClient>,
    // Parked here while no reader task owns it
    stream: Option<mpsc::Receiver<DataEvent>>,
    reader: Option<JoinHandle<mpsc::Receiver<DataEvent>>>,
    resubscribe: bool,
}

/// Book feeds are shared per instrument and book type
type BookKey = (InstrumentId, BookType);

/// One venue book feed shared by the book subscriptions of an instrument and book type.
///
/// The client is subscribed to deltas at the deepest depth any consumer asked for. A
/// deeper consumer widens the feed, the feed narrows again when that consumer leaves,
/// and the client is unsubscribed when the last consumer leaves.
struct BookFeed {
    key: BookKey,
    client_id: ClientId,
    feed: DataSubscription,
    consumers: Vec<DataSubscription>,
}

impl BookFeed {
    fn new(client_id: ClientId, key: BookKey, consumer: DataSubscription) -> Self {
        Self {
            key,
            client_id,
            feed: feed_for(key, &consumer),
            consumers: vec![consumer],
        }
    }

    /// Feed covering every consumer, `None` once the last one left
    fn wanted(&self) -> Option<DataSubscription> {
        self.consumers
            .iter()
            .rev()
            .max_by_key(|c| depth_rank(c))
            .map(|c| feed_for(self.key, c))
    }

    fn remove(&mut self, subscription: &DataSubscription) -> Option<DataSubscription> {
        let index = self
            .consumers
            .iter()
            .position(|c| c == subscription)
            .or_else(|| {
                self.consumers
                    .iter()
                    .position(|c| same_consumer(c, subscription))
            })?;
        Some(self.consumers.remove(index))
    }

    fn has_snapshot_interval(&self, interval_ms: u64) -> bool {
        self.consumers.iter().any(|c| {
            matches!(c, DataSubscription::BookSnapshots { interval_ms: i, .. } if *i == interval_ms)
        })
    }

    fn snapshot_intervals(&self) -> impl Iterator<Item = u64> + '_ {
        self.consumers.iter().filter_map(|c| match c {
            DataSubscription::BookSnapshots { interval_ms, .. } => Some(*interval_ms),
            _ => None,
        })
    }
}

fn book_key(subscription: &DataSubscription) -> Option<BookKey> {
    match subscription {
        DataSubscription::BookDeltas {
            instrument_id,
            book_type,
            ..
        }
        | DataSubscription::BookSnapshots {
            instrument_id,
            book_type,
            ..
        } => Some((*instrument_id, *book_type)),
        _ => None,
    }
}

fn book_depth(subscription: &DataSubscription) -> Option<usize> {
    match subscription {
        DataSubscription::BookDeltas { depth, .. }
        | DataSubscription::BookSnapshots { depth, .. } => *depth,
        _ => None,
    }
}

/// Orders requested depths; the full book (`None` or 0) is the deepest
fn depth_rank(subscription: &DataSubscription) -> usize {
    match book_depth(subscription) {
        None | Some(0) => usize::MAX,
        Some(depth) => depth,
    }
}

/// Client subscription serving `consumer`: deltas at its depth
fn feed_for((instrument_id, book_type): BookKey, consumer: &DataSubscription) -> DataSubscription {
    DataSubscription::BookDeltas {
        instrument_id,
        book_type,
        depth: book_depth(consumer),
        managed: false,
    }
}

// Unsubscribes need not repeat the depth they subscribed with
fn same_consumer(a: &DataSubscription, b: &DataSubscription) -> bool {
    match (a, b) {
        (DataSubscription::BookDeltas { .. }, DataSubscription::BookDeltas { .. }) => true,
        (
            DataSubscription::BookSnapshots { interval_ms: x, .. },
            DataSubscription::BookSnapshots { interval_ms: y, .. },
        ) => x == y,
        _ => false,
    }
}

/// Internally aggregated bars are built from local data and never reach a client
fn is_client_side(subscription: &DataSubscription) -> bool {
    match subscription {
        DataSubscription::Bars { bar_type } => bar_type.is_externally_aggregated(),
        _ => true,
    }
}

/// Routes data commands to clients and fans client data out to the cache and bus
pub struct DataEngine {
    config: DataEngineConfig,
    clock: Arc<dyn Clock>,
    cache: SharedCache,
    bus: Arc<MessageBus<BusMessage>>,
    state: EngineState,
    clients: IndexMap<ClientId, ClientEntry>,
    default_client: Option<ClientId>,
    routing: FxHashMap<Venue, ClientId>,
    subscriptions: IndexMap<DataSubscription, ClientId>,
    book_feeds: IndexMap<BookKey, BookFeed>,
    snapshotters: FxHashMap<(InstrumentId, u64), CancellationToken>,
    buffered_deltas: FxHashMap<InstrumentId, Vec<OrderBookDelta>>,
    pub(crate) events_tx: mpsc::Sender<(ClientId, DataEvent)>,
    pub(crate) events_rx: Option<mpsc::Receiver<(ClientId, DataEvent)>>,
    pub(crate) timer_tx: mpsc::UnboundedSender<TimerEvent>,
    pub(crate) timer_rx: Option<mpsc::UnboundedReceiver<TimerEvent>>,
    session: CancellationToken,
    timers: CancellationToken,
    refresh_task: Option<JoinHandle<()>>,
    command_count: u64,
    data_count: u64,
    request_count: u64,
    response_count: u64,
}

impl fmt::Debug for DataEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataEngine")
            .field("state", &self.state)
            .field("clients", &self.clients.keys().collect::<Vec<_>>())
            .field("default_client", &self.default_client)
            .field("subscriptions", &self.subscriptions.len())
            .field("book_feeds", &self.book_feeds.len())
            .finish_non_exhaustive()
    }
}

impl DataEngine {
    /// Creates an engine publishing on `bus` and caching into `cache`
    #[must_use]
    pub fn new(
        config: DataEngineConfig,
        cache: SharedCache,
        bus: Arc<MessageBus<BusMessage>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::channel(config.buffer_capacity.max(1));
        let (timer_tx, timer_rx) = mpsc::unbounded_channel();
        Self {
            config,
            clock,
            cache,
            bus,
            state: EngineState::Ready,
            clients: IndexMap::new(),
            default_client: None,
            routing: FxHashMap::default(),
            subscriptions: IndexMap::new(),
            book_feeds: IndexMap::new(),
            snapshotters: FxHashMap::default(),
            buffered_deltas: FxHashMap::default(),
            events_tx,
            events_rx: Some(events_rx),
            timer_tx,
            timer_rx: Some(timer_rx),
            session: CancellationToken::new(),
            timers: CancellationToken::new(),
            refresh_task: None,
            command_count: 0,
            data_count: 0,
            request_count: 0,
            response_count: 0,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &DataEngineConfig {
        &self.config
    }

    #[must_use]
    pub const fn state(&self) -> EngineState {
        self.state
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state == EngineState::Running
    }

    #[must_use]
    pub const fn cache(&self) -> &SharedCache {
        &self.cache
    }

    #[must_use]
    pub const fn bus(&self) -> &Arc<MessageBus<BusMessage>> {
        &self.bus
    }

    pub(crate) fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Commands executed since the last reset
    #[must_use]
    pub const fn command_count(&self) -> u64 {
        self.command_count
    }

    /// Data records processed since the last reset
    #[must_use]
    pub const fn data_count(&self) -> u64 {
        self.data_count
    }

    #[must_use]
    pub const fn request_count(&self) -> u64 {
        self.request_count
    }

    #[must_use]
    pub const fn response_count(&self) -> u64 {
        self.response_count
    }

    // -- REGISTRATION ---------------------------------------------------------------------

    /// Registers a client and routes `routing` (or the client's own venue) to it
    ///
    /// # Errors
    ///
    /// Returns [`DataEngineError::DuplicateClient`] when the id is taken.
    pub fn register_client(
        &mut self,
        client: Box<dyn DataClient>,
        routing: Option<Venue>,
    ) -> DataEngineResult<()> {
        let client_id = client.client_id();
        if self.clients.contains_key(&client_id) {
            return Err(DataEngineError::DuplicateClient { client_id });
        }

        let venue = routing.or_else(|| client.venue());
        if let Some(venue) = venue {
            if let Some(previous) = self.routing.insert(venue, client_id) {
                warn!(%venue, %previous, %client_id, "Venue route replaced");
            }
        }
        self.insert_client(client);
        info!(%client_id, venue = ?venue, "Registered data client");
        Ok(())
    }

    /// Registers the client used when no venue route matches
    ///
    /// # Errors
    ///
    /// Returns [`DataEngineError::DuplicateDefaultClient`] when a default exists, or
    /// [`DataEngineError::DuplicateClient`] when the id is taken.
    pub fn register_default_client(&mut self, client: Box<dyn DataClient>) -> DataEngineResult<()> {
        let client_id = client.client_id();
        if let Some(existing) = self.default_client {
            return Err(DataEngineError::DuplicateDefaultClient {
                existing,
                client_id,
            });
        }
        if self.clients.contains_key(&client_id) {
            return Err(DataEngineError::DuplicateClient { client_id });
        }

        self.insert_client(client);
        self.default_client = Some(client_id);
        info!(%client_id, "Registered default data client");
        Ok(())
    }

    fn insert_client(&mut self, mut client: Box<dyn DataClient>) {
        let client_id = client.client_id();
        let stream = client.take_event_stream();
        if stream.is_none() {
            warn!(%client_id, "Client event stream already taken, its data will not be processed");
        }
        self.clients.insert(
            client_id,
            ClientEntry {
                client,
                stream,
                reader: None,
                resubscribe: false,
            },
        );
    }

    /// Removes a client with its routes and subscriptions and hands it back.
    ///
    /// The client is not disconnected.
    ///
    /// # Errors
    ///
    /// Returns [`DataEngineError::ClientNotFound`] for an unknown id.
    pub fn deregister_client(&mut self, client_id: &ClientId) -> DataEngineResult<Box<dyn DataClient>> {
        let entry = self
            .clients
            .shift_remove(client_id)
            .ok_or(DataEngineError::ClientNotFound {
                client_id: *client_id,
            })?;

        self.routing.retain(|_, owner| owner != client_id);
        if self.default_client == Some(*client_id) {
            self.default_client = None;
        }
        self.subscriptions.retain(|_, owner| owner != client_id);

        let orphaned: Vec<(InstrumentId, u64)> = self
            .book_feeds
            .values()
            .filter(|feed| feed.client_id == *client_id)
            .flat_map(|feed| feed.snapshot_intervals().map(move |i| (feed.key.0, i)))
            .collect();
        for (instrument_id, interval_ms) in orphaned {
            self.stop_snapshotter(instrument_id, interval_ms);
        }
        self.book_feeds.retain(|_, feed| feed.client_id != *client_id);

        if let Some(reader) = entry.reader {
            reader.abort();
        }
        info!(%client_id, "Deregistered data client");
        Ok(entry.client)
    }

    /// Client ids in registration order
    #[must_use]
    pub fn registered_clients(&self) -> Vec<ClientId> {
        self.clients.keys().copied().collect()
    }

    #[must_use]
    pub const fn default_client(&self) -> Option<ClientId> {
        self.default_client
    }

    /// Resolves the client for a command: explicit id, then venue route, then default
    #[must_use]
    pub fn route(&self, client_id: Option<ClientId>, venue: Option<Venue>) -> Option<ClientId> {
        if let Some(client_id) = client_id {
            if self.clients.contains_key(&client_id) {
                return Some(client_id);
            }
            warn!(%client_id, "Requested client not registered, falling back to routing");
        }
        venue
            .and_then(|venue| self.routing.get(&venue).copied())
            .or(self.default_client)
    }

    fn client_mut(&mut self, client_id: &ClientId) -> DataEngineResult<&mut dyn DataClient> {
        self.clients
            .get_mut(client_id)
            .map(|entry| entry.client.as_mut() as &mut dyn DataClient)
            .ok_or(DataEngineError::ClientNotFound {
                client_id: *client_id,
            })
    }

    // -- LIFECYCLE ------------------------------------------------------------------------

    /// Whether every registered client reports a live connection
    #[must_use]
    pub fn check_connected(&self) -> bool {
        self.clients.values().all(|entry| entry.client.is_connected())
    }

    /// Whether no registered client reports a live connection
    #[must_use]
    pub fn check_disconnected(&self) -> bool {
        self.clients.values().all(|entry| !entry.client.is_connected())
    }

    /// Connects every client and starts reading its events.
    ///
    /// Clients connected before are resubscribed to what they served. A failing client
    /// does not stop the others.
    ///
    /// # Errors
    ///
    /// Returns the first client failure.
    pub async fn connect(&mut self) -> DataEngineResult<()> {
        let client_ids = self.registered_clients();
        let mut first_error = None;
        for client_id in client_ids {
            if let Err(e) = self.connect_client(client_id).await {
                error!(%client_id, error = %e, "Failed to connect data client");
                first_error.get_or_insert(e);
            }
        }

        if self.refresh_task.is_none() {
            if let Some(period) = self.config.instrument_refresh_interval() {
                debug!(?period, "Starting instrument refresh");
                self.refresh_task = Some(spawn_refresh_timer(
                    period,
                    self.timer_tx.clone(),
                    self.session.child_token(),
                ));
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    async fn connect_client(&mut self, client_id: ClientId) -> DataEngineResult<()> {
        let events = self.events_tx.clone();
        let cancel = self.session.child_token();
        let entry = self
            .clients
            .get_mut(&client_id)
            .ok_or(DataEngineError::ClientNotFound { client_id })?;

        entry
            .client
            .connect()
            .await
            .map_err(|e| DataEngineError::client(client_id, "connect", &e))?;
        info!(%client_id, "Data client connected");

        if entry.reader.is_none() {
            if let Some(stream) = entry.stream.take() {
                entry.reader = Some(spawn_reader(client_id, stream, events, cancel));
            }
        }
        if std::mem::take(&mut entry.resubscribe) {
            self.resubscribe(client_id).await;
        }
        Ok(())
    }

    /// Unsubscribes everything, waits the grace period, then closes every client and joins
    /// the reader tasks.
    ///
    /// Subscriptions stay recorded and are replayed on the next connect.
    ///
    /// # Errors
    ///
    /// Returns the first client failure to disconnect.
    pub async fn disconnect(&mut self) -> DataEngineResult<()> {
        self.session.cancel();

        let pending = self.client_subscriptions(None);
        for (client_id, subscription) in &pending {
            let Some(entry) = self.clients.get_mut(client_id) else {
                continue;
            };
            if !entry.client.is_connected() {
                continue;
            }
            if let Err(e) = entry.client.unsubscribe(subscription).await {
                debug!(%client_id, %subscription, error = %e, "Unsubscribe on disconnect failed");
            }
        }
        if !pending.is_empty() {
            tokio::time::sleep(self.config.disconnect_grace()).await;
        }

        let mut first_error = None;
        for (client_id, entry) in &mut self.clients {
            if let Err(e) = entry.client.disconnect().await {
                error!(%client_id, error = %e, "Failed to disconnect data client");
                first_error.get_or_insert(DataEngineError::client(*client_id, "disconnect", &e));
            }
            entry.resubscribe = true;
            if let Some(reader) = entry.reader.take() {
                match reader.await {
                    Ok(stream) => entry.stream = Some(stream),
                    Err(e) => error!(%client_id, error = %e, "Reader task failed"),
                }
            }
        }
        if let Some(task) = self.refresh_task.take() {
            if let Err(e) = task.await {
                error!(error = %e, "Refresh task failed");
            }
        }

        self.session = CancellationToken::new();
        info!("Data clients disconnected");
        first_error.map_or(Ok(()), Err)
    }

    /// Starts processing data and the snapshot timers. Must run inside a tokio runtime.
    pub fn start(&mut self) {
        self.state = EngineState::Running;
        self.timers = CancellationToken::new();
        let wanted: Vec<(InstrumentId, u64)> = self
            .book_feeds
            .values()
            .flat_map(|feed| feed.snapshot_intervals().map(move |i| (feed.key.0, i)))
            .collect();
        for (instrument_id, interval_ms) in wanted {
            self.start_snapshotter(instrument_id, interval_ms);
        }
        info!(state = %self.state, "Data engine started");
    }

    /// Stops the timers; incoming data is dropped until the next start
    pub fn stop(&mut self) {
        self.timers.cancel();
        self.snapshotters.clear();
        self.state = EngineState::Stopped;
        info!(state = %self.state, "Data engine stopped");
    }

    /// Forgets subscriptions, buffered deltas and counters
    ///
    /// # Errors
    ///
    /// Returns [`DataEngineError::InvalidState`] while running.
    pub fn reset(&mut self) -> DataEngineResult<()> {
        if self.state == EngineState::Running {
            return Err(DataEngineError::InvalidState {
                operation: "reset",
                state: self.state.to_string(),
            });
        }
        self.timers.cancel();
        self.snapshotters.clear();
        self.subscriptions.clear();
        self.book_feeds.clear();
        self.buffered_deltas.clear();
        for entry in self.clients.values_mut() {
            entry.resubscribe = false;
        }
        self.command_count = 0;
        self.data_count = 0;
        self.request_count = 0;
        self.response_count = 0;
        self.state = EngineState::Ready;
        debug!("Data engine reset");
        Ok(())
    }

    // -- COMMANDS -------------------------------------------------------------------------

    /// Executes a subscribe, unsubscribe or request command
    ///
    /// # Errors
    ///
    /// Returns an error when the command cannot be routed or the client rejects it.
    pub async fn execute(&mut self, command: DataCommand) -> DataEngineResult<()> {
        if self.config.debug {
            debug!(%command, "Executing");
        }
        self.command_count += 1;
        match command {
            DataCommand::Subscribe(cmd) => self.subscribe(cmd).await,
            DataCommand::Unsubscribe(cmd) => self.unsubscribe(cmd).await,
            DataCommand::Request(cmd) => self.request(cmd).await,
        }
    }

    async fn subscribe(&mut self, cmd: SubscriptionCommand) -> DataEngineResult<()> {
        let client_id = self
            .route(cmd.client_id, cmd.route_venue())
            .ok_or_else(|| DataEngineError::NoRoute {
                command: cmd.subscription.to_string(),
            })?;

        match &cmd.subscription {
            DataSubscription::BookDeltas {
                instrument_id,
                book_type,
                managed,
                ..
            } => {
                if *managed {
                    self.ensure_book(*instrument_id, *book_type);
                }
                self.add_book_consumer(client_id, &cmd.subscription).await
            }
            DataSubscription::BookSnapshots {
                instrument_id,
                book_type,
                interval_ms,
                ..
            } => {
                if *interval_ms == 0 {
                    return Err(DataEngineError::InvalidCommand {
                        command: cmd.subscription.to_string(),
                        reason: "snapshot interval must be positive",
                    });
                }
                self.ensure_book(*instrument_id, *book_type);
                self.add_book_consumer(client_id, &cmd.subscription).await?;
                self.start_snapshotter(*instrument_id, *interval_ms);
                Ok(())
            }
            subscription => {
                if self.subscriptions.contains_key(subscription) {
                    debug!(%subscription, "Already subscribed");
                    return Ok(());
                }
                if is_client_side(subscription) {
                    self.client_mut(&client_id)?
                        .subscribe(subscription)
                        .await
                        .map_err(|e| DataEngineError::client(client_id, "subscribe", &e))?;
                }
                info!(%client_id, %subscription, "Subscribed");
                self.subscriptions.insert(subscription.clone(), client_id);
                Ok(())
            }
        }
    }

    fn ensure_book(&self, instrument_id: InstrumentId, book_type: BookType) {
        let mut cache = self.cache.write();
        match cache.order_book(&instrument_id) {
            Some(book) if book.book_type != book_type => {
                warn!(
                    %instrument_id,
                    managed = ?book.book_type,
                    requested = ?book_type,
                    "Managed book already exists with another book type"
                );
            }
            Some(_) => {}
            None => {
                debug!(%instrument_id, ?book_type, "Created managed book");
                cache.add_order_book(OrderBook::new(instrument_id, book_type));
            }
        }
    }

    async fn add_book_consumer(
        &mut self,
        client_id: ClientId,
        subscription: &DataSubscription,
    ) -> DataEngineResult<()> {
        let Some(key) = book_key(subscription) else {
            return Ok(());
        };
        let wanted = feed_for(key, subscription);

        let Some(feed) = self.book_feeds.get_mut(&key) else {
            self.client_mut(&client_id)?
                .subscribe(&wanted)
                .await
                .map_err(|e| DataEngineError::client(client_id, "subscribe", &e))?;
            info!(%client_id, %subscription, feed = %wanted, "Subscribed");
            self.book_feeds
                .insert(key, BookFeed::new(client_id, key, subscription.clone()));
            return Ok(());
        };

        if feed.consumers.contains(subscription) {
            debug!(%subscription, "Already subscribed");
            return Ok(());
        }
        if depth_rank(&wanted) <= depth_rank(&feed.feed) {
            debug!(%subscription, feed = %feed.feed, "Sharing book feed");
            feed.consumers.push(subscription.clone());
            return Ok(());
        }

        let (owner, current) = (feed.client_id, feed.feed.clone());
        self.switch_book_feed(owner, &current, &wanted).await?;
        if let Some(feed) = self.book_feeds.get_mut(&key) {
            feed.feed = wanted;
            feed.consumers.push(subscription.clone());
        }
        Ok(())
    }

    /// Moves a client from one book feed to another, subscribing first so no updates are lost
    async fn switch_book_feed(
        &mut self,
        client_id: ClientId,
        from: &DataSubscription,
        to: &DataSubscription,
    ) -> DataEngineResult<()> {
        let client = self.client_mut(&client_id)?;
        client
            .subscribe(to)
            .await
            .map_err(|e| DataEngineError::client(client_id, "subscribe", &e))?;
        if let Err(e) = client.unsubscribe(from).await {
            warn!(%client_id, subscription = %from, error = %e, "Failed to release previous book feed");
        }
        info!(%client_id, %from, %to, "Book feed changed");
        Ok(())
    }

    async fn unsubscribe(&mut self, cmd: SubscriptionCommand) -> DataEngineResult<()> {
        match &cmd.subscription {
            DataSubscription::BookDeltas { .. } | DataSubscription::BookSnapshots { .. } => {
                self.remove_book_consumer(&cmd.subscription).await
            }
            subscription => {
                let Some(&client_id) = self.subscriptions.get(subscription) else {
                    warn!(%subscription, "Not subscribed");
                    return Ok(());
                };
                self.subscriptions.shift_remove(subscription);
                if is_client_side(subscription) {
                    self.client_mut(&client_id)?
                        .unsubscribe(subscription)
                        .await
                        .map_err(|e| DataEngineError::client(client_id, "unsubscribe", &e))?;
                }
                info!(%client_id, %subscription, "Unsubscribed");
                Ok(())
            }
        }
    }

    async fn remove_book_consumer(&mut self, subscription: &DataSubscription) -> DataEngineResult<()> {
        let Some(key) = book_key(subscription) else {
            return Ok(());
        };
        let Some(feed) = self.book_feeds.get_mut(&key) else {
            warn!(%subscription, "Not subscribed");
            return Ok(());
        };
        let Some(removed) = feed.remove(subscription) else {
            warn!(%subscription, "Not subscribed");
            return Ok(());
        };
        let (client_id, current, wanted) = (feed.client_id, feed.feed.clone(), feed.wanted());

        if let DataSubscription::BookSnapshots { interval_ms, .. } = removed {
            if !self.snapshot_interval_in_use(key.0, interval_ms) {
                self.stop_snapshotter(key.0, interval_ms);
            }
        }

        match wanted {
            None => {
                self.book_feeds.shift_remove(&key);
                self.client_mut(&client_id)?
                    .unsubscribe(&current)
                    .await
                    .map_err(|e| DataEngineError::client(client_id, "unsubscribe", &e))?;
                info!(%client_id, subscription = %current, "Unsubscribed");
            }
            Some(wanted) if depth_rank(&wanted) < depth_rank(&current) => {
                // The wider feed keeps serving everyone if narrowing fails
                match self.switch_book_feed(client_id, &current, &wanted).await {
                    Ok(()) => {
                        if let Some(feed) = self.book_feeds.get_mut(&key) {
                            feed.feed = wanted;
                        }
                    }
                    Err(e) => warn!(%subscription, error = %e, "Book feed not narrowed"),
                }
            }
            Some(_) => debug!(%subscription, "Book feed still in use"),
        }
        Ok(())
    }

    fn snapshot_interval_in_use(&self, instrument_id: InstrumentId, interval_ms: u64) -> bool {
        self.book_feeds
            .values()
            .any(|feed| feed.key.0 == instrument_id && feed.has_snapshot_interval(interval_ms))
    }

    async fn request(&mut self, cmd: RequestCommand) -> DataEngineResult<()> {
        let client_id = self
            .route(cmd.client_id, Some(cmd.route_venue()))
            .ok_or_else(|| DataEngineError::NoRoute {
                command: format!("{:?}", cmd.request.kind),
            })?;

        self.request_count += 1;
        self.client_mut(&client_id)?
            .request(&cmd.request)
            .await
            .map_err(|e| DataEngineError::client(client_id, "request", &e))?;
        debug!(%client_id, request_id = %cmd.request.request_id, "Request sent");
        Ok(())
    }

    /// Subscriptions to send to a client (or all clients), one per venue feed
    fn client_subscriptions(&self, client_id: Option<ClientId>) -> Vec<(ClientId, DataSubscription)> {
        let owned = |owner: &ClientId| client_id.is_none_or(|id| id == *owner);
        let mut subscriptions: Vec<(ClientId, DataSubscription)> = self
            .subscriptions
            .iter()
            .filter(|(sub, owner)| owned(owner) && is_client_side(sub))
            .map(|(sub, owner)| (*owner, sub.clone()))
            .collect();
        subscriptions.extend(
            self.book_feeds
                .values()
                .filter(|feed| owned(&feed.client_id))
                .map(|feed| (feed.client_id, feed.feed.clone())),
        );
        subscriptions
    }

    async fn resubscribe(&mut self, client_id: ClientId) {
        let subscriptions = self.client_subscriptions(Some(client_id));
        let Some(entry) = self.clients.get_mut(&client_id) else {
            return;
        };
        info!(%client_id, count = subscriptions.len(), "Resubscribing");
        for (_, subscription) in &subscriptions {
            if let Err(e) = entry.client.subscribe(subscription).await {
                warn!(%client_id, %subscription, error = %e, "Resubscribe failed");
            }
        }
    }

    // -- SUBSCRIPTION QUERIES -------------------------------------------------------------

    /// Every active subscription, including each book consumer
    #[must_use]
    pub fn subscriptions(&self) -> Vec<DataSubscription> {
        self.subscriptions
            .keys()
            .cloned()
            .chain(self.book_feeds.values().flat_map(|f| f.consumers.iter().cloned()))
            .collect()
    }

    fn subscribed_instrument_ids(&self, kind: &str) -> Vec<InstrumentId> {
        let mut ids: Vec<InstrumentId> = self
            .subscriptions()
            .iter()
            .filter(|sub| sub.kind() == kind)
            .filter_map(DataSubscription::instrument_id)
            .collect();
        ids.dedup();
        ids
    }

    #[must_use]
    pub fn subscribed_instruments(&self) -> Vec<InstrumentId> {
        self.subscribed_instrument_ids("instrument")
    }

    /// Venues whose full instrument list is followed
    #[must_use]
    pub fn subscribed_venues(&self) -> Vec<Venue> {
        self.subscriptions
            .keys()
            .filter_map(|sub| match sub {
                DataSubscription::Instruments { venue } => Some(*venue),
                _ => None,
            })
            .collect()
    }

    #[must_use]
    pub fn subscribed_book_deltas(&self) -> Vec<InstrumentId> {
        self.subscribed_instrument_ids("book.deltas")
    }

    #[must_use]
    pub fn subscribed_book_depth10(&self) -> Vec<InstrumentId> {
        self.subscribed_instrument_ids("book.depth10")
    }

    #[must_use]
    pub fn subscribed_book_snapshots(&self) -> Vec<InstrumentId> {
        self.subscribed_instrument_ids("book.snapshots")
    }

    #[must_use]
    pub fn subscribed_quotes(&self) -> Vec<InstrumentId> {
        self.subscribed_instrument_ids("quotes")
    }

    #[must_use]
    pub fn subscribed_trades(&self) -> Vec<InstrumentId> {
        self.subscribed_instrument_ids("trades")
    }

    #[must_use]
    pub fn subscribed_bars(&self) -> Vec<BarType> {
        self.subscriptions
            .keys()
            .filter_map(|sub| match sub {
                DataSubscription::Bars { bar_type } => Some(*bar_type),
                _ => None,
            })
            .collect()
    }

    #[must_use]
    pub fn subscribed_mark_prices(&self) -> Vec<InstrumentId> {
        self.subscribed_instrument_ids("mark_prices")
    }

    #[must_use]
    pub fn subscribed_index_prices(&self) -> Vec<InstrumentId> {
        self.subscribed_instrument_ids("index_prices")
    }

    #[must_use]
    pub fn subscribed_funding_rates(&self) -> Vec<InstrumentId> {
        self.subscribed_instrument_ids("funding_rates")
    }

    #[must_use]
    pub fn subscribed_instrument_status(&self) -> Vec<InstrumentId> {
        self.subscribed_instrument_ids("status")
    }

    #[must_use]
    pub fn subscribed_instrument_close(&self) -> Vec<InstrumentId> {
        self.subscribed_instrument_ids("close")
    }

    #[must_use]
    pub fn subscribed_custom_data(&self) -> Vec<DataType> {
        self.subscriptions
            .keys()
            .filter_map(|sub| match sub {
                DataSubscription::Data { data_type } => Some(data_type.clone()),
                _ => None,
            })
            .collect()
    }

    // -- TIMERS ---------------------------------------------------------------------------

    fn start_snapshotter(&mut self, instrument_id: InstrumentId, interval_ms: u64) {
        if self.state != EngineState::Running {
            // Started with the engine
            return;
        }
        let key = (instrument_id, interval_ms);
        if self.snapshotters.contains_key(&key) {
            return;
        }
        let token = self.timers.child_token();
        spawn_snapshotter(instrument_id, interval_ms, self.timer_tx.clone(), token.clone());
        self.snapshotters.insert(key, token);
        debug!(%instrument_id, interval_ms, "Started book snapshots");
    }

    fn stop_snapshotter(&mut self, instrument_id: InstrumentId, interval_ms: u64) {
        if let Some(token) = self.snapshotters.remove(&(instrument_id, interval_ms)) {
            token.cancel();
            debug!(%instrument_id, interval_ms, "Stopped book snapshots");
        }
    }

    pub(crate) async fn on_timer(&mut self, event: TimerEvent) {
        match event {
            TimerEvent::BookSnapshot { instrument_id, .. } => {
                self.publish_book_snapshot(&instrument_id);
            }
            TimerEvent::RefreshInstruments => self.refresh_instruments().await,
        }
    }

    fn publish_book_snapshot(&self, instrument_id: &InstrumentId) {
        let book = self.cache.read().order_book(instrument_id).cloned();
        match book {
            Some(book) => {
                self.bus.publish(
                    &book_snapshots_topic(instrument_id),
                    BusMessage::Book(Box::new(book)),
                );
            }
            None => debug!(%instrument_id, "No book to snapshot"),
        }
    }

    async fn refresh_instruments(&mut self) {
        let routes: Vec<(Venue, ClientId)> = self.routing.iter().map(|(v, c)| (*v, *c)).collect();
        for (venue, client_id) in routes {
            let Some(entry) = self.clients.get_mut(&client_id) else {
                continue;
            };
            if !entry.client.is_connected() {
                continue;
            }
            debug!(%client_id, %venue, "Refreshing instruments");
            let request = DataRequest::new(RequestKind::Instruments { venue });
            if let Err(e) = entry.client.request(&request).await {
                warn!(%client_id, %venue, error = %e, "Instrument refresh failed");
            }
        }
    }

    // -- EVENTS ---------------------------------------------------------------------------

    /// Handles one event from a client. Data is dropped unless the engine is running.
    pub async fn process_event(&mut self, client_id: ClientId, event: DataEvent) {
        if self.config.debug {
            debug!(%client_id, ?event, "Processing");
        }
        match event {
            DataEvent::Reconnected => {
                info!(%client_id, "Client reconnected");
                self.resubscribe(client_id).await;
            }
            DataEvent::Error(message) => warn!(%client_id, %message, "Data client error"),
            DataEvent::Raw(value) => trace!(%client_id, %value, "Unhandled venue message"),
            _ if self.state != EngineState::Running => {
                trace!(%client_id, state = %self.state, "Dropped event");
            }
            DataEvent::Instrument(instrument) => self.handle_instrument(*instrument),
            DataEvent::Data(data) => self.process_data(data),
            DataEvent::FundingRates(rates) => {
                for rate in rates {
                    self.handle_funding_rate(rate);
                }
            }
            DataEvent::Response(response) => self.handle_response(response),
        }
    }

    /// Caches and publishes one market data record
    pub fn process_data(&mut self, data: Data) {
        if self.state != EngineState::Running {
            trace!(state = %self.state, "Dropped data");
            return;
        }
        self.data_count += 1;
        match data {
            Data::Delta(delta) => self.handle_delta(delta),
            Data::Deltas(deltas) => self.handle_deltas(deltas),
            Data::Depth10(depth) => {
                self.update_book(&depth.instrument_id, |book| {
                    book.apply_depth(&depth);
                    Ok(())
                });
                self.publish_data(Data::Depth10(depth));
            }
            Data::Quote(quote) => {
                self.cache.write().add_quote(quote);
                self.update_book(&quote.instrument_id, |book| {
                    if book.book_type == BookType::L1_MBP {
                        book.update_quote_tick(&quote)
                    } else {
                        Ok(())
                    }
                });
                self.publish_data(data);
            }
            Data::Trade(trade) => {
                self.cache.write().add_trade(trade);
                self.update_book(&trade.instrument_id, |book| {
                    if book.book_type == BookType::L1_MBP {
                        book.update_trade_tick(&trade)
                    } else {
                        Ok(())
                    }
                });
                self.publish_data(data);
            }
            Data::Bar(bar) => self.handle_bar(bar),
            Data::MarkPriceUpdate(mark) => {
                self.cache.write().add_mark_price(mark);
                self.publish_data(data);
            }
            Data::IndexPriceUpdate(index) => {
                self.cache.write().add_index_price(index);
                self.publish_data(data);
            }
            Data::FundingRate(rate) => self.handle_funding_rate(rate),
            Data::InstrumentStatus(_) | Data::InstrumentClose(_) | Data::Custom(_) => {
                self.publish_data(data);
            }
        }
    }

    fn publish_data(&self, data: Data) {
        let topic = topic_for(&data);
        self.bus.publish(&topic, BusMessage::Data(data));
    }

    fn handle_instrument(&self, instrument: InstrumentAny) {
        let instrument_id = instrument.id();
        if !self.cache.write().add_instrument(instrument.clone()) {
            debug!(%instrument_id, "Kept newer cached instrument");
        }
        self.bus.publish(
            &instrument_topic(&instrument_id),
            BusMessage::Instrument(Box::new(instrument)),
        );
    }

    fn handle_funding_rate(&self, rate: FundingRateUpdate) {
        self.cache.write().add_funding_rate(rate);
        self.publish_data(Data::FundingRate(rate));
    }

    fn handle_delta(&mut self, delta: OrderBookDelta) {
        let instrument_id = delta.instrument_id;
        let batch = if self.config.buffer_deltas {
            self.buffered_deltas
                .entry(instrument_id)
                .or_default()
                .push(delta);
            if !RecordFlag::matches(delta.flags, RecordFlag::F_LAST) {
                return;
            }
            self.buffered_deltas
                .remove(&instrument_id)
                .unwrap_or_default()
        } else {
            vec![delta]
        };

        match OrderBookDeltas::new(instrument_id, batch) {
            Ok(deltas) => self.apply_and_publish_deltas(deltas),
            Err(e) => error!(%instrument_id, error = %e, "Invalid delta batch"),
        }
    }

    fn handle_deltas(&mut self, deltas: OrderBookDeltas) {
        let deltas = if self.config.buffer_deltas {
            let instrument_id = deltas.instrument_id;
            let is_last = RecordFlag::matches(deltas.flags, RecordFlag::F_LAST);
            self.buffered_deltas
                .entry(instrument_id)
                .or_default()
                .extend(deltas.deltas);
            if !is_last {
                return;
            }
            let buffered = self
                .buffered_deltas
                .remove(&instrument_id)
                .unwrap_or_default();
            match OrderBookDeltas::new(instrument_id, buffered) {
                Ok(deltas) => deltas,
                Err(e) => {
                    error!(%instrument_id, error = %e, "Invalid delta batch");
                    return;
                }
            }
        } else {
            deltas
        };
        self.apply_and_publish_deltas(deltas);
    }

    fn apply_and_publish_deltas(&self, deltas: OrderBookDeltas) {
        self.update_book(&deltas.instrument_id, |book| book.apply_deltas(&deltas));
        self.publish_data(Data::Deltas(deltas));
    }

    /// Applies an update to the managed book of an instrument, if there is one
    fn update_book(
        &self,
        instrument_id: &InstrumentId,
        apply: impl FnOnce(&mut OrderBook) -> BookResult<()>,
    ) {
        let mut cache = self.cache.write();
        let Some(book) = cache.order_book_mut(instrument_id) else {
            return;
        };
        if let Err(e) = apply(book) {
            error!(%instrument_id, error = %e, "Failed to update book");
        }
        if self.config.validate_book_integrity {
            if let Err(e) = book.check_integrity() {
                warn!(%instrument_id, error = %e, "Book integrity check failed");
            }
        }
    }

    fn stamp_bar(&self, bar: Bar) -> Bar {
        if self.config.time_bars_timestamp_on_close {
            bar
        } else {
            bar.with_open_time_event()
        }
    }

    fn handle_bar(&mut self, bar: Bar) {
        let bar = self.stamp_bar(bar);
        {
            let mut cache = self.cache.write();
            if self.config.validate_data_sequence {
                if let Some(last) = cache.bar(&bar.bar_type) {
                    if bar.ts_event < last.ts_event || bar.ts_init < last.ts_init {
                        warn!(
                            bar_type = %bar.bar_type,
                            ts_event = %bar.ts_event,
                            last_ts_event = %last.ts_event,
                            "Dropped out of sequence bar"
                        );
                        return;
                    }
                }
            }
            cache.add_bar(bar);
        }
        self.publish_data(Data::Bar(bar));
    }

    fn handle_response(&mut self, mut response: DataResponse) {
        self.response_count += 1;
        debug!(
            client_id = %response.client_id,
            correlation_id = %response.correlation_id,
            "Response received"
        );

        if let ResponsePayload::Bars(bars) = &mut response.payload {
            for bar in bars.iter_mut() {
                *bar = self.stamp_bar(*bar);
            }
        }
        {
            let mut cache = self.cache.write();
            match &response.payload {
                ResponsePayload::Instruments(instruments) => {
                    for instrument in instruments {
                        cache.add_instrument(instrument.clone());
                    }
                }
                ResponsePayload::Quotes(quotes) => cache.add_quotes(quotes),
                ResponsePayload::Trades(trades) => cache.add_trades(trades),
                ResponsePayload::Bars(bars) => cache.add_bars(bars),
                ResponsePayload::Book(deltas) => {
                    if let Some(book) = cache.order_book_mut(&deltas.instrument_id) {
                        if let Err(e) = book.apply_deltas(deltas) {
                            warn!(instrument_id = %deltas.instrument_id, error = %e, "Failed to apply book snapshot");
                        }
                    }
                }
            }
        }

        match self.bus.send(DATA_ENGINE_RESPONSE, BusMessage::Response(response)) {
            Ok(()) => {}
            Err(BusError::NoEndpoint { .. }) => trace!("No response endpoint registered"),
            Err(e) => warn!(error = %e, "Failed to deliver response"),
        }
    }
}
