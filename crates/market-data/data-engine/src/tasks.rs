//! Background tasks spawned by the engine
//!
//! Every task observes a cancellation token at each suspension point and reports back to
//! the engine through a queue; none of them touches engine state directly.

use std::time::Duration;

use bus::RecvTimeoutError;
use common::{ClientId, InstrumentId};
use feeds::DataEvent;
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{Instant, MissedTickBehavior, interval_at},
};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::messages::BusMessage;

/// How long the bus bridge waits before checking for cancellation again
const BRIDGE_POLL: Duration = Duration::from_millis(50);

/// Timer callbacks delivered to the engine task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TimerEvent {
    /// Publish the managed book of an instrument
    BookSnapshot {
        instrument_id: InstrumentId,
        interval_ms: u64,
    },
    /// Re-request instrument definitions from every routed client
    RefreshInstruments,
}

/// Forwards a client's events to the engine queue until cancelled or the stream ends.
///
/// The stream is handed back on completion so a later connect can resume reading it.
pub(crate) fn spawn_reader(
    client_id: ClientId,
    mut stream: mpsc::Receiver<DataEvent>,
    events: mpsc::Sender<(ClientId, DataEvent)>,
    cancel: CancellationToken,
) -> JoinHandle<mpsc::Receiver<DataEvent>> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                event = stream.recv() => {
                    let Some(event) = event else {
                        debug!(%client_id, "Event stream closed");
                        break;
                    };
                    // Back-pressure: wait for queue space, but not past cancellation
                    tokio::select! {
                        () = cancel.cancelled() => break,
                        sent = events.send((client_id, event)) => {
                            if sent.is_err() {
                                break;
                            }
                        }
                    }
                }
            }
        }
        debug!(%client_id, "Reader stopped");
        stream
    })
}

fn spawn_ticker(
    period: Duration,
    event: TimerEvent,
    timers: mpsc::UnboundedSender<TimerEvent>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    if timers.send(event).is_err() {
                        break;
                    }
                }
            }
        }
    })
}

/// Emits a snapshot tick for one instrument every `interval_ms`
pub(crate) fn spawn_snapshotter(
    instrument_id: InstrumentId,
    interval_ms: u64,
    timers: mpsc::UnboundedSender<TimerEvent>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    spawn_ticker(
        Duration::from_millis(interval_ms.max(1)),
        TimerEvent::BookSnapshot {
            instrument_id,
            interval_ms,
        },
        timers,
        cancel,
    )
}

/// Emits an instrument refresh tick every `period`
pub(crate) fn spawn_refresh_timer(
    period: Duration,
    timers: mpsc::UnboundedSender<TimerEvent>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    spawn_ticker(period, TimerEvent::RefreshInstruments, timers, cancel)
}

/// Moves messages from a bus endpoint onto the engine's async queue.
///
/// Bus receivers block, so this runs on the blocking pool and polls for cancellation.
pub(crate) fn spawn_bridge(
    endpoint: bus::Receiver<BusMessage>,
    commands: mpsc::Sender<BusMessage>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::task::spawn_blocking(move || {
        while !cancel.is_cancelled() {
            match endpoint.recv_timeout(BRIDGE_POLL) {
                Ok(message) => {
                    if commands.blocking_send(message).is_err() {
                        break;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        debug!("Bus bridge stopped");
    })
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use tokio::time::timeout;

    use super::*;

    #[rstest]
    #[tokio::test]
    async fn test_reader_forwards_and_returns_stream() {
        let (client_tx, client_rx) = mpsc::channel(8);
        let (events_tx, mut events_rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();
        let client_id = ClientId::from("SIM");

        let reader = spawn_reader(client_id, client_rx, events_tx, cancel.clone());
        client_tx.send(DataEvent::Reconnected).await.unwrap();

        let (from, event) = timeout(Duration::from_secs(1), events_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(from, client_id);
        assert_eq!(event, DataEvent::Reconnected);

        cancel.cancel();
        let mut stream = reader.await.unwrap();
        client_tx.send(DataEvent::Error("late".to_string())).await.unwrap();
        assert_eq!(stream.recv().await, Some(DataEvent::Error("late".to_string())));
    }

    #[rstest]
    #[tokio::test]
    async fn test_snapshotter_ticks_until_cancelled() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let instrument_id = InstrumentId::from("AUD/USD.SIM");

        let task = spawn_snapshotter(instrument_id, 10, tx, cancel.clone());
        let event = timeout(Duration::from_secs(1), rx.recv()).await.unwrap();

        assert_eq!(
            event,
            Some(TimerEvent::BookSnapshot {
                instrument_id,
                interval_ms: 10
            })
        );
        cancel.cancel();
        task.await.unwrap();
    }

    #[rstest]
    #[tokio::test]
    async fn test_bridge_stops_when_endpoint_removed() {
        let bus = bus::MessageBus::<BusMessage>::new();
        let endpoint = bus.register_endpoint("ep").unwrap();
        let (tx, mut rx) = mpsc::channel(8);
        let bridge = spawn_bridge(endpoint, tx, CancellationToken::new());

        bus.send(
            "ep",
            BusMessage::Response(feeds::DataResponse {
                correlation_id: common::UUID4::new(),
                client_id: ClientId::from("SIM"),
                payload: feeds::ResponsePayload::Trades(Vec::new()),
                ts_init: common::UnixNanos::default(),
            }),
        )
        .unwrap();
        assert!(matches!(
            timeout(Duration::from_secs(1), rx.recv()).await.unwrap(),
            Some(BusMessage::Response(_))
        ));

        bus.deregister_endpoint("ep");
        timeout(Duration::from_secs(1), bridge).await.unwrap().unwrap();
    }
}
