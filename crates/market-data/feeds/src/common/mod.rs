//! Components shared by every venue adapter

pub mod adapter;
pub mod backoff;
pub mod channel;
pub mod config;
pub mod messages;
pub mod subscription;
pub mod websocket;

pub use adapter::DataClient;
pub use backoff::ExponentialBackoff;
pub use channel::{BookChannel, VenueTier};
pub use config::{BackoffConfig, Credentials, DataClientConfig};
pub use messages::{
    DataEvent, DataRequest, DataResponse, DataSubscription, RequestKind, ResponsePayload,
};
pub use subscription::SubscriptionTracker;
pub use websocket::{WebSocketClient, WebSocketConfig, WsMessage, WsSender};
