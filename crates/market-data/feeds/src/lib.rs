//! Venue data clients
//!
//! - `common/`: the [`DataClient`] contract, subscription and request messages, the
//!   reconnecting WebSocket transport, backoff and credential resolution
//! - `okx/`: the OKX v5 adapter
//! - `stubs`: an in-process client for engine tests (feature `stubs`)

#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![deny(clippy::all)]

pub mod common;
pub mod error;
pub mod okx;
#[cfg(any(test, feature = "stubs"))]
pub mod stubs;

pub use crate::common::{
    BackoffConfig, BookChannel, Credentials, DataClient, DataClientConfig, DataEvent,
    DataRequest, DataResponse, DataSubscription, RequestKind, ResponsePayload,
    SubscriptionTracker, VenueTier, WebSocketClient, WebSocketConfig, WsMessage,
};
pub use error::{FeedError, FeedResult};
pub use okx::OkxDataClient;
