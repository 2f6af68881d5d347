//! OKX v5 wire messages

use serde::{Deserialize, Serialize};

/// Channel plus instrument, the unit OKX subscribes by
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OkxArg {
    /// Channel name
    pub channel: String,
    /// Venue instrument, absent for instrument-type channels
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inst_id: Option<String>,
    /// Instrument type filter for the `instruments` channel
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inst_type: Option<String>,
}

impl OkxArg {
    /// Argument for an instrument channel
    #[must_use]
    pub fn instrument(channel: impl Into<String>, inst_id: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            inst_id: Some(inst_id.into()),
            inst_type: None,
        }
    }

    /// Argument for an instrument-type channel
    #[must_use]
    pub fn inst_type(channel: impl Into<String>, inst_type: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            inst_id: None,
            inst_type: Some(inst_type.into()),
        }
    }

    /// Canonical form used as the subscription key
    #[must_use]
    pub fn key(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| self.channel.clone())
    }
}

/// Outbound operation
#[derive(Debug, Serialize)]
pub struct OkxRequest<T: Serialize> {
    /// `subscribe`, `unsubscribe` or `login`
    pub op: &'static str,
    /// Operation arguments
    pub args: Vec<T>,
}

/// Login argument
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OkxLoginArg {
    /// API key
    pub api_key: String,
    /// Account passphrase
    pub passphrase: String,
    /// Seconds since the epoch, as signed
    pub timestamp: String,
    /// Base64 HMAC-SHA256 signature
    pub sign: String,
}

/// Any inbound frame other than the text `pong`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum OkxWsFrame {
    /// Operation acknowledgement or error
    Event(OkxEvent),
    /// Channel push
    Push(OkxPush),
}

/// Acknowledgement of an operation
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OkxEvent {
    /// `subscribe`, `unsubscribe`, `login` or `error`
    pub event: String,
    /// Argument acknowledged
    #[serde(default)]
    pub arg: Option<OkxArg>,
    /// Error code, `"0"` on success
    #[serde(default)]
    pub code: Option<String>,
    /// Error text
    #[serde(default)]
    pub msg: Option<String>,
}

/// Data pushed on a subscribed channel
#[derive(Debug, Deserialize)]
pub struct OkxPush {
    /// Channel and instrument
    pub arg: OkxArg,
    /// `snapshot` or `update` on book channels
    #[serde(default)]
    pub action: Option<String>,
    /// Channel records
    pub data: Vec<serde_json::Value>,
}

/// Price level: price, size, deprecated field, order count
pub type OkxLevel = [String; 4];

/// Book channel record
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OkxBook {
    /// Ask levels, best first
    #[serde(default)]
    pub asks: Vec<OkxLevel>,
    /// Bid levels, best first
    #[serde(default)]
    pub bids: Vec<OkxLevel>,
    /// Event time in milliseconds
    pub ts: String,
    /// Sequence of this update
    #[serde(default)]
    pub seq_id: Option<i64>,
}

/// Trade channel record
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OkxTrade {
    /// Venue instrument
    pub inst_id: String,
    /// Trade identifier
    pub trade_id: String,
    /// Price
    pub px: String,
    /// Size
    pub sz: String,
    /// Taker side, `buy` or `sell`
    pub side: String,
    /// Event time in milliseconds
    pub ts: String,
}

/// Mark price record
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OkxMarkPrice {
    /// Venue instrument
    pub inst_id: String,
    /// Mark price
    pub mark_px: String,
    /// Event time in milliseconds
    pub ts: String,
}

/// Index ticker record
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OkxIndexTicker {
    /// Index name
    pub inst_id: String,
    /// Index price
    pub idx_px: String,
    /// Event time in milliseconds
    pub ts: String,
}

/// Funding rate record
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OkxFundingRate {
    /// Venue instrument
    pub inst_id: String,
    /// Current funding rate
    pub funding_rate: String,
    /// Next funding time in milliseconds
    #[serde(default)]
    pub funding_time: Option<String>,
    /// Event time in milliseconds
    #[serde(default)]
    pub ts: Option<String>,
}

/// Candle: ts, open, high, low, close, volume, volume ccy, volume quote, confirm
pub type OkxCandle = Vec<String>;

/// REST envelope
#[derive(Debug, Deserialize)]
pub struct OkxResponse<T> {
    /// `"0"` on success
    pub code: String,
    /// Error text
    #[serde(default)]
    pub msg: String,
    /// Payload records
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

/// Public instrument definition
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OkxInstrument {
    /// `SPOT`, `SWAP`, ...
    pub inst_type: String,
    /// Venue instrument
    pub inst_id: String,
    /// Spot base currency
    #[serde(default)]
    pub base_ccy: String,
    /// Spot quote currency
    #[serde(default)]
    pub quote_ccy: String,
    /// Derivative settlement currency
    #[serde(default)]
    pub settle_ccy: String,
    /// Contract value
    #[serde(default)]
    pub ct_val: String,
    /// Currency of the contract value
    #[serde(default)]
    pub ct_val_ccy: String,
    /// `linear` or `inverse`
    #[serde(default)]
    pub ct_type: String,
    /// Underlying, e.g. `BTC-USDT`
    #[serde(default)]
    pub uly: String,
    /// Price increment
    pub tick_sz: String,
    /// Size increment
    pub lot_sz: String,
    /// Minimum order size
    #[serde(default)]
    pub min_sz: String,
    /// Listing time in milliseconds
    #[serde(default)]
    pub list_time: String,
}

/// REST trade record
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OkxRestTrade {
    /// Venue instrument
    pub inst_id: String,
    /// Trade identifier
    pub trade_id: String,
    /// Price
    pub px: String,
    /// Size
    pub sz: String,
    /// Taker side
    pub side: String,
    /// Event time in milliseconds
    pub ts: String,
}

impl From<OkxRestTrade> for OkxTrade {
    fn from(t: OkxRestTrade) -> Self {
        Self {
            inst_id: t.inst_id,
            trade_id: t.trade_id,
            px: t.px,
            sz: t.sz,
            side: t.side,
            ts: t.ts,
        }
    }
}
