//! The engine task: one loop multiplexing bus commands, client events and timers

use anyhow::{Context, bail};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::{
    engine::DataEngine,
    messages::{BusMessage, TradingCommand},
    tasks::spawn_bridge,
    topics::DATA_ENGINE_EXECUTE,
};

impl DataEngine {
    /// Runs the engine until `cancel` fires.
    ///
    /// Registers the `data_engine_execute` endpoint, starts the engine, connects every
    /// client and processes commands, client events and timer ticks in one task, so
    /// handlers never race each other. On cancellation the clients are disconnected,
    /// the engine is stopped and the endpoint is released.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine is already running or the endpoint is taken.
    pub async fn run(&mut self, cancel: CancellationToken) -> anyhow::Result<()> {
        let Some(mut events) = self.events_rx.take() else {
            bail!("data engine event queue is already in use");
        };
        let Some(mut timers) = self.timer_rx.take() else {
            self.events_rx = Some(events);
            bail!("data engine timer queue is already in use");
        };

        let capacity = self.config().buffer_capacity.max(1);
        let endpoint = match self
            .bus()
            .register_endpoint_bounded(DATA_ENGINE_EXECUTE, capacity)
            .context("registering the data engine endpoint")
        {
            Ok(endpoint) => endpoint,
            Err(e) => {
                self.events_rx = Some(events);
                self.timer_rx = Some(timers);
                return Err(e);
            }
        };
        let (commands_tx, mut commands) = mpsc::channel(capacity);
        let bridge_cancel = cancel.child_token();
        let bridge = spawn_bridge(endpoint, commands_tx, bridge_cancel.clone());

        self.start();
        if let Err(e) = self.connect().await {
            error!(error = %e, "Not every data client connected");
        }
        info!("Data engine running");

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                Some(message) = commands.recv() => self.on_message(message).await,
                Some((client_id, event)) = events.recv() => {
                    self.process_event(client_id, event).await;
                }
                Some(timer) = timers.recv() => self.on_timer(timer).await,
                else => break,
            }
        }

        info!("Data engine shutting down");
        bridge_cancel.cancel();
        drop(commands);
        if let Err(e) = self.disconnect().await {
            error!(error = %e, "Failed to disconnect data clients");
        }
        self.stop();
        self.bus().deregister_endpoint(DATA_ENGINE_EXECUTE);
        if let Err(e) = bridge.await {
            error!(error = %e, "Bus bridge failed");
        }

        self.events_rx = Some(events);
        self.timer_rx = Some(timers);
        Ok(())
    }

    async fn on_message(&mut self, message: BusMessage) {
        match message {
            BusMessage::Command(command) => {
                let name = command.to_string();
                if let Err(e) = self.execute(command).await {
                    error!(command = %name, error = %e, "Command failed");
                }
            }
            BusMessage::Trading(TradingCommand::SubmitOrder(command)) => {
                self.handle_submit_order(*command);
            }
            BusMessage::Trading(TradingCommand::SubmitOrderList(command)) => {
                self.handle_submit_order_list(*command);
            }
            other => warn!(message = ?other, "Unexpected message on the execute endpoint"),
        }
    }
}
