//! Reconnecting WebSocket transport
//!
//! One session task owns the socket. It forwards inbound frames to the consumer, writes
//! outbound frames queued by [`WebSocketClient::send_text`], answers pings and sends
//! keep-alives. When the socket drops it reconnects under exponential backoff and emits
//! [`WsMessage::Reconnected`] so the owner can replay its subscriptions.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use futures_util::{SinkExt, StreamExt};
use tokio::{
    net::TcpStream,
    sync::mpsc,
    task::JoinHandle,
    time::{Instant, interval_at, sleep, timeout},
};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{backoff::ExponentialBackoff, config::BackoffConfig};
use crate::error::{FeedError, FeedResult};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Buffered inbound frames before the session task waits on the consumer
const INBOUND_CAPACITY: usize = 4096;

const ACTIVE_POLL: Duration = Duration::from_millis(10);

/// Transport settings
#[derive(Debug, Clone)]
pub struct WebSocketConfig {
    /// Endpoint URL
    pub url: String,
    /// Keep-alive interval, `None` disables it
    pub heartbeat: Option<Duration>,
    /// Text frame sent as keep-alive; a ping frame when `None`
    pub heartbeat_msg: Option<String>,
    /// Limit for the first connect
    pub connect_timeout: Duration,
    /// Limit for each reconnect attempt
    pub reconnect_timeout: Duration,
    /// Delay schedule between reconnect attempts
    pub backoff: BackoffConfig,
}

impl WebSocketConfig {
    /// Default timings for `url`
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            heartbeat: Some(Duration::from_secs(20)),
            heartbeat_msg: None,
            connect_timeout: Duration::from_secs(10),
            reconnect_timeout: Duration::from_secs(15),
            backoff: BackoffConfig::default(),
        }
    }
}

/// Inbound frame or transport signal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WsMessage {
    /// UTF-8 frame
    Text(String),
    /// Binary frame
    Binary(Vec<u8>),
    /// The socket was re-established after a drop
    Reconnected,
}

/// Cloneable handle for queueing outbound frames
#[derive(Debug, Clone)]
pub struct WsSender {
    url: Arc<str>,
    outbound: mpsc::UnboundedSender<Message>,
    connected: Arc<AtomicBool>,
}

impl WsSender {
    /// Whether the socket is currently up
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Queues a text frame.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::NotConnected`] while the socket is down or after close.
    pub fn send_text(&self, text: impl Into<String>) -> FeedResult<()> {
        if !self.is_connected() {
            return Err(FeedError::NotConnected(self.url.to_string()));
        }
        self.outbound
            .send(Message::Text(text.into()))
            .map_err(|_| FeedError::NotConnected(self.url.to_string()))
    }
}

/// Handle to a running session task
#[derive(Debug)]
pub struct WebSocketClient {
    url: String,
    outbound: mpsc::UnboundedSender<Message>,
    connected: Arc<AtomicBool>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl WebSocketClient {
    /// Connects and starts the session task.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::Timeout`] or [`FeedError::Transport`] when the first connect
    /// fails. Later drops are retried in the background.
    pub async fn connect(
        config: WebSocketConfig,
    ) -> FeedResult<(Self, mpsc::Receiver<WsMessage>)> {
        let stream = open(&config.url, config.connect_timeout, "connect").await?;
        info!(url = %config.url, "WebSocket connected");

        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_CAPACITY);
        let connected = Arc::new(AtomicBool::new(true));
        let cancel = CancellationToken::new();

        let session = Session {
            config: config.clone(),
            outbound: outbound_rx,
            inbound: inbound_tx,
            connected: Arc::clone(&connected),
            cancel: cancel.clone(),
        };
        let task = tokio::spawn(session.run(stream));

        Ok((
            Self {
                url: config.url,
                outbound,
                connected,
                cancel,
                task: Some(task),
            },
            inbound_rx,
        ))
    }

    /// Endpoint URL
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Whether the socket is currently up
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Waits for the socket to be up, e.g. while the session is reconnecting.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::Timeout`] if the socket is still down after `limit`, and
    /// [`FeedError::NotConnected`] once the client is closed.
    pub async fn wait_until_active(&self, limit: Duration) -> FeedResult<()> {
        let deadline = Instant::now() + limit;
        while !self.is_connected() {
            if self.cancel.is_cancelled() {
                return Err(FeedError::NotConnected(self.url.clone()));
            }
            if Instant::now() >= deadline {
                return Err(FeedError::Timeout {
                    operation: "wait_until_active",
                    secs: limit.as_secs(),
                });
            }
            sleep(ACTIVE_POLL).await;
        }
        Ok(())
    }

    /// Queues a text frame.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::NotConnected`] while the socket is down or after close.
    pub fn send_text(&self, text: impl Into<String>) -> FeedResult<()> {
        self.sender().send_text(text)
    }

    /// A handle other tasks can send through
    #[must_use]
    pub fn sender(&self) -> WsSender {
        WsSender {
            url: Arc::from(self.url.as_str()),
            outbound: self.outbound.clone(),
            connected: Arc::clone(&self.connected),
        }
    }

    /// Stops the session task and closes the socket
    pub async fn close(&mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if timeout(Duration::from_secs(5), task).await.is_err() {
                warn!(url = %self.url, "WebSocket session did not stop in time");
            }
        }
        self.connected.store(false, Ordering::Release);
        info!(url = %self.url, "WebSocket closed");
    }
}

impl Drop for WebSocketClient {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn open(url: &str, limit: Duration, operation: &'static str) -> FeedResult<WsStream> {
    match timeout(limit, connect_async(url)).await {
        Ok(Ok((stream, _))) => Ok(stream),
        Ok(Err(e)) => Err(e.into()),
        Err(_) => Err(FeedError::Timeout {
            operation,
            secs: limit.as_secs(),
        }),
    }
}

enum Exit {
    Shutdown,
    Dropped(String),
}

struct Session {
    config: WebSocketConfig,
    outbound: mpsc::UnboundedReceiver<Message>,
    inbound: mpsc::Sender<WsMessage>,
    connected: Arc<AtomicBool>,
    cancel: CancellationToken,
}

impl Session {
    async fn run(mut self, mut stream: WsStream) {
        let mut backoff = ExponentialBackoff::new(self.config.backoff);

        loop {
            match self.drive(&mut stream).await {
                Exit::Shutdown => break,
                Exit::Dropped(reason) => {
                    self.connected.store(false, Ordering::Release);
                    warn!(url = %self.config.url, %reason, "WebSocket dropped");
                }
            }

            // Frames queued for the dead socket are stale
            while self.outbound.try_recv().is_ok() {}

            let Some(next) = self.reconnect(&mut backoff).await else {
                break;
            };
            stream = next;
            self.connected.store(true, Ordering::Release);
            if self.inbound.send(WsMessage::Reconnected).await.is_err() {
                break;
            }
        }

        self.connected.store(false, Ordering::Release);
        debug!(url = %self.config.url, "WebSocket session stopped");
    }

    async fn reconnect(&self, backoff: &mut ExponentialBackoff) -> Option<WsStream> {
        loop {
            let delay = backoff.next_delay();
            debug!(
                url = %self.config.url,
                attempt = backoff.attempts(),
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                "WebSocket reconnect scheduled"
            );
            tokio::select! {
                () = self.cancel.cancelled() => return None,
                () = sleep(delay) => {}
            }

            match open(&self.config.url, self.config.reconnect_timeout, "reconnect").await {
                Ok(stream) => {
                    info!(url = %self.config.url, attempts = backoff.attempts(), "WebSocket reconnected");
                    backoff.reset();
                    return Some(stream);
                }
                Err(e) => warn!(url = %self.config.url, error = %e, "WebSocket reconnect failed"),
            }
        }
    }

    async fn drive(&mut self, stream: &mut WsStream) -> Exit {
        let period = self.config.heartbeat.unwrap_or(Duration::from_secs(3600));
        let mut heartbeat = interval_at(Instant::now() + period, period);

        loop {
            tokio::select! {
                () = self.cancel.cancelled() => {
                    let _ = stream.close(None).await;
                    return Exit::Shutdown;
                }
                outbound = self.outbound.recv() => {
                    let Some(message) = outbound else {
                        let _ = stream.close(None).await;
                        return Exit::Shutdown;
                    };
                    if let Err(e) = stream.send(message).await {
                        return Exit::Dropped(e.to_string());
                    }
                }
                _ = heartbeat.tick(), if self.config.heartbeat.is_some() => {
                    let beat = match &self.config.heartbeat_msg {
                        Some(text) => Message::Text(text.clone()),
                        None => Message::Ping(Vec::new()),
                    };
                    if let Err(e) = stream.send(beat).await {
                        return Exit::Dropped(e.to_string());
                    }
                }
                frame = stream.next() => {
                    let forwarded = match frame {
                        Some(Ok(Message::Text(text))) => WsMessage::Text(text),
                        Some(Ok(Message::Binary(bytes))) => WsMessage::Binary(bytes),
                        Some(Ok(Message::Ping(payload))) => {
                            if let Err(e) = stream.send(Message::Pong(payload)).await {
                                return Exit::Dropped(e.to_string());
                            }
                            continue;
                        }
                        Some(Ok(Message::Pong(_) | Message::Frame(_))) => continue,
                        Some(Ok(Message::Close(frame))) => {
                            return Exit::Dropped(format!("closed by peer: {frame:?}"));
                        }
                        Some(Err(e)) => return Exit::Dropped(e.to_string()),
                        None => return Exit::Dropped("stream ended".to_string()),
                    };
                    if self.inbound.send(forwarded).await.is_err() {
                        let _ = stream.close(None).await;
                        return Exit::Shutdown;
                    }
                }
            }
        }
    }
}
