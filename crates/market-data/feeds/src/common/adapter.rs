//! The venue data client contract

use common::{BookType, ClientId, InstrumentId, Venue};
use model::data::{BarType, DataType};
use tokio::sync::mpsc;

use super::messages::{DataEvent, DataRequest, DataSubscription, RequestKind};
use crate::error::FeedError;

fn unsupported(client_id: ClientId, operation: &'static str) -> anyhow::Result<()> {
    Err(FeedError::Unsupported {
        client: client_id.to_string(),
        operation,
    }
    .into())
}

/// A venue adapter delivering normalized market data.
///
/// After [`DataClient::connect`] the client pushes [`DataEvent`]s into the stream
/// returned by [`DataClient::take_event_stream`]. Per-kind subscribe, unsubscribe and
/// request methods default to an `Unsupported` error; adapters override the ones their
/// venue offers.
#[async_trait::async_trait]
pub trait DataClient: Send + Sync {
    /// Identifier the engine routes by
    fn client_id(&self) -> ClientId;

    /// Venue served, `None` for multi-venue clients
    fn venue(&self) -> Option<Venue>;

    /// Whether the transport is up
    fn is_connected(&self) -> bool;

    /// Hands over the outbound event stream. Returns `None` once taken.
    fn take_event_stream(&mut self) -> Option<mpsc::Receiver<DataEvent>>;

    /// Opens the connection
    async fn connect(&mut self) -> anyhow::Result<()>;

    /// Closes the connection and stops background tasks
    async fn disconnect(&mut self) -> anyhow::Result<()>;

    async fn subscribe_instruments(&mut self, _venue: Venue) -> anyhow::Result<()> {
        unsupported(self.client_id(), "subscribe_instruments")
    }

    async fn subscribe_instrument(&mut self, _instrument_id: InstrumentId) -> anyhow::Result<()> {
        unsupported(self.client_id(), "subscribe_instrument")
    }

    async fn subscribe_book_deltas(
        &mut self,
        _instrument_id: InstrumentId,
        _book_type: BookType,
        _depth: Option<usize>,
    ) -> anyhow::Result<()> {
        unsupported(self.client_id(), "subscribe_book_deltas")
    }

    async fn subscribe_book_depth10(
        &mut self,
        _instrument_id: InstrumentId,
        _book_type: BookType,
    ) -> anyhow::Result<()> {
        unsupported(self.client_id(), "subscribe_book_depth10")
    }

    async fn subscribe_quotes(&mut self, _instrument_id: InstrumentId) -> anyhow::Result<()> {
        unsupported(self.client_id(), "subscribe_quotes")
    }

    async fn subscribe_trades(&mut self, _instrument_id: InstrumentId) -> anyhow::Result<()> {
        unsupported(self.client_id(), "subscribe_trades")
    }

    async fn subscribe_bars(&mut self, _bar_type: BarType) -> anyhow::Result<()> {
        unsupported(self.client_id(), "subscribe_bars")
    }

    async fn subscribe_mark_prices(&mut self, _instrument_id: InstrumentId) -> anyhow::Result<()> {
        unsupported(self.client_id(), "subscribe_mark_prices")
    }

    async fn subscribe_index_prices(&mut self, _instrument_id: InstrumentId) -> anyhow::Result<()> {
        unsupported(self.client_id(), "subscribe_index_prices")
    }

    async fn subscribe_funding_rates(
        &mut self,
        _instrument_id: InstrumentId,
    ) -> anyhow::Result<()> {
        unsupported(self.client_id(), "subscribe_funding_rates")
    }

    async fn subscribe_instrument_status(
        &mut self,
        _instrument_id: InstrumentId,
    ) -> anyhow::Result<()> {
        unsupported(self.client_id(), "subscribe_instrument_status")
    }

    async fn subscribe_instrument_close(
        &mut self,
        _instrument_id: InstrumentId,
    ) -> anyhow::Result<()> {
        unsupported(self.client_id(), "subscribe_instrument_close")
    }

    async fn subscribe_data(&mut self, _data_type: DataType) -> anyhow::Result<()> {
        unsupported(self.client_id(), "subscribe_data")
    }

    async fn unsubscribe_instruments(&mut self, _venue: Venue) -> anyhow::Result<()> {
        unsupported(self.client_id(), "unsubscribe_instruments")
    }

    async fn unsubscribe_instrument(&mut self, _instrument_id: InstrumentId) -> anyhow::Result<()> {
        unsupported(self.client_id(), "unsubscribe_instrument")
    }

    async fn unsubscribe_book_deltas(
        &mut self,
        _instrument_id: InstrumentId,
        _depth: Option<usize>,
    ) -> anyhow::Result<()> {
        unsupported(self.client_id(), "unsubscribe_book_deltas")
    }

    async fn unsubscribe_book_depth10(
        &mut self,
        _instrument_id: InstrumentId,
    ) -> anyhow::Result<()> {
        unsupported(self.client_id(), "unsubscribe_book_depth10")
    }

    async fn unsubscribe_quotes(&mut self, _instrument_id: InstrumentId) -> anyhow::Result<()> {
        unsupported(self.client_id(), "unsubscribe_quotes")
    }

    async fn unsubscribe_trades(&mut self, _instrument_id: InstrumentId) -> anyhow::Result<()> {
        unsupported(self.client_id(), "unsubscribe_trades")
    }

    async fn unsubscribe_bars(&mut self, _bar_type: BarType) -> anyhow::Result<()> {
        unsupported(self.client_id(), "unsubscribe_bars")
    }

    async fn unsubscribe_mark_prices(
        &mut self,
        _instrument_id: InstrumentId,
    ) -> anyhow::Result<()> {
        unsupported(self.client_id(), "unsubscribe_mark_prices")
    }

    async fn unsubscribe_index_prices(
        &mut self,
        _instrument_id: InstrumentId,
    ) -> anyhow::Result<()> {
        unsupported(self.client_id(), "unsubscribe_index_prices")
    }

    async fn unsubscribe_funding_rates(
        &mut self,
        _instrument_id: InstrumentId,
    ) -> anyhow::Result<()> {
        unsupported(self.client_id(), "unsubscribe_funding_rates")
    }

    async fn unsubscribe_instrument_status(
        &mut self,
        _instrument_id: InstrumentId,
    ) -> anyhow::Result<()> {
        unsupported(self.client_id(), "unsubscribe_instrument_status")
    }

    async fn unsubscribe_instrument_close(
        &mut self,
        _instrument_id: InstrumentId,
    ) -> anyhow::Result<()> {
        unsupported(self.client_id(), "unsubscribe_instrument_close")
    }

    async fn unsubscribe_data(&mut self, _data_type: DataType) -> anyhow::Result<()> {
        unsupported(self.client_id(), "unsubscribe_data")
    }

    async fn request_instruments(
        &mut self,
        _request: &DataRequest,
        _venue: Venue,
    ) -> anyhow::Result<()> {
        unsupported(self.client_id(), "request_instruments")
    }

    async fn request_instrument(
        &mut self,
        _request: &DataRequest,
        _instrument_id: InstrumentId,
    ) -> anyhow::Result<()> {
        unsupported(self.client_id(), "request_instrument")
    }

    async fn request_quotes(
        &mut self,
        _request: &DataRequest,
        _instrument_id: InstrumentId,
    ) -> anyhow::Result<()> {
        unsupported(self.client_id(), "request_quotes")
    }

    async fn request_trades(
        &mut self,
        _request: &DataRequest,
        _instrument_id: InstrumentId,
    ) -> anyhow::Result<()> {
        unsupported(self.client_id(), "request_trades")
    }

    async fn request_bars(&mut self, _request: &DataRequest, _bar_type: BarType) -> anyhow::Result<()> {
        unsupported(self.client_id(), "request_bars")
    }

    async fn request_book_snapshot(
        &mut self,
        _request: &DataRequest,
        _instrument_id: InstrumentId,
        _depth: Option<usize>,
    ) -> anyhow::Result<()> {
        unsupported(self.client_id(), "request_book_snapshot")
    }

    /// Dispatches to the per-kind subscribe method.
    ///
    /// Book snapshots are served from engine-managed books fed by deltas, so they
    /// subscribe to deltas at the requested depth.
    async fn subscribe(&mut self, subscription: &DataSubscription) -> anyhow::Result<()> {
        match subscription.clone() {
            DataSubscription::Instruments { venue } => self.subscribe_instruments(venue).await,
            DataSubscription::Instrument { instrument_id } => {
                self.subscribe_instrument(instrument_id).await
            }
            DataSubscription::BookDeltas {
                instrument_id,
                book_type,
                depth,
                ..
            }
            | DataSubscription::BookSnapshots {
                instrument_id,
                book_type,
                depth,
                ..
            } => self.subscribe_book_deltas(instrument_id, book_type, depth).await,
            DataSubscription::BookDepth10 {
                instrument_id,
                book_type,
            } => self.subscribe_book_depth10(instrument_id, book_type).await,
            DataSubscription::Quotes { instrument_id } => self.subscribe_quotes(instrument_id).await,
            DataSubscription::Trades { instrument_id } => self.subscribe_trades(instrument_id).await,
            DataSubscription::Bars { bar_type } => self.subscribe_bars(bar_type).await,
            DataSubscription::MarkPrices { instrument_id } => {
                self.subscribe_mark_prices(instrument_id).await
            }
            DataSubscription::IndexPrices { instrument_id } => {
                self.subscribe_index_prices(instrument_id).await
            }
            DataSubscription::FundingRates { instrument_id } => {
                self.subscribe_funding_rates(instrument_id).await
            }
            DataSubscription::InstrumentStatus { instrument_id } => {
                self.subscribe_instrument_status(instrument_id).await
            }
            DataSubscription::InstrumentClose { instrument_id } => {
                self.subscribe_instrument_close(instrument_id).await
            }
            DataSubscription::Data { data_type } => self.subscribe_data(data_type).await,
        }
    }

    /// Dispatches to the per-kind unsubscribe method
    async fn unsubscribe(&mut self, subscription: &DataSubscription) -> anyhow::Result<()> {
        match subscription.clone() {
            DataSubscription::Instruments { venue } => self.unsubscribe_instruments(venue).await,
            DataSubscription::Instrument { instrument_id } => {
                self.unsubscribe_instrument(instrument_id).await
            }
            DataSubscription::BookDeltas {
                instrument_id,
                depth,
                ..
            }
            | DataSubscription::BookSnapshots {
                instrument_id,
                depth,
                ..
            } => self.unsubscribe_book_deltas(instrument_id, depth).await,
            DataSubscription::BookDepth10 { instrument_id, .. } => {
                self.unsubscribe_book_depth10(instrument_id).await
            }
            DataSubscription::Quotes { instrument_id } => {
                self.unsubscribe_quotes(instrument_id).await
            }
            DataSubscription::Trades { instrument_id } => {
                self.unsubscribe_trades(instrument_id).await
            }
            DataSubscription::Bars { bar_type } => self.unsubscribe_bars(bar_type).await,
            DataSubscription::MarkPrices { instrument_id } => {
                self.unsubscribe_mark_prices(instrument_id).await
            }
            DataSubscription::IndexPrices { instrument_id } => {
                self.unsubscribe_index_prices(instrument_id).await
            }
            DataSubscription::FundingRates { instrument_id } => {
                self.unsubscribe_funding_rates(instrument_id).await
            }
            DataSubscription::InstrumentStatus { instrument_id } => {
                self.unsubscribe_instrument_status(instrument_id).await
            }
            DataSubscription::InstrumentClose { instrument_id } => {
                self.unsubscribe_instrument_close(instrument_id).await
            }
            DataSubscription::Data { data_type } => self.unsubscribe_data(data_type).await,
        }
    }

    /// Dispatches to the per-kind request method. The answer arrives as
    /// [`DataEvent::Response`] on the event stream.
    async fn request(&mut self, request: &DataRequest) -> anyhow::Result<()> {
        match request.kind.clone() {
            RequestKind::Instruments { venue } => self.request_instruments(request, venue).await,
            RequestKind::Instrument { instrument_id } => {
                self.request_instrument(request, instrument_id).await
            }
            RequestKind::Quotes { instrument_id } => {
                self.request_quotes(request, instrument_id).await
            }
            RequestKind::Trades { instrument_id } => {
                self.request_trades(request, instrument_id).await
            }
            RequestKind::Bars { bar_type } => self.request_bars(request, bar_type).await,
            RequestKind::BookSnapshot {
                instrument_id,
                depth,
            } => self.request_book_snapshot(request, instrument_id, depth).await,
        }
    }
}
