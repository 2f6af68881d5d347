//! Error types for venue data clients

use thiserror::Error;

/// Result alias for feed operations
pub type FeedResult<T> = Result<T, FeedError>;

/// Data client error types
///
/// `Transport`, `Timeout` and `Decode` are transient: the client reconnects or skips the
/// frame. Depth, tier and channel errors reject a single subscription.
#[derive(Error, Debug)]
pub enum FeedError {
    /// Socket or HTTP failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// An operation did not complete in time
    #[error("{operation} timed out after {secs}s")]
    Timeout {
        /// What was being attempted
        operation: &'static str,
        /// Configured limit
        secs: u64,
    },

    /// A venue message could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// Book depth the venue does not offer
    #[error("invalid depth {depth}, must be one of 0, 5, 50 or 400")]
    InvalidDepth {
        /// Requested depth
        depth: usize,
    },

    /// The client's venue tier is too low for a channel
    #[error("tier {tier} insufficient for {channel} (requires tier {required})")]
    TierInsufficient {
        /// Channel requested
        channel: &'static str,
        /// Minimum tier
        required: u8,
        /// Configured tier
        tier: u8,
    },

    /// Venue channel name not recognised
    #[error("unknown channel '{0}'")]
    UnknownChannel(String),

    /// Bar type the venue does not publish
    #[error("no venue bars for {0}")]
    InvalidBarType(String),

    /// Credentials are required but were not configured
    #[error("missing {field} for {venue}: set it in the config or {env_var}")]
    MissingCredentials {
        /// Client venue
        venue: String,
        /// Which credential is absent
        field: &'static str,
        /// Environment variable consulted
        env_var: String,
    },

    /// Configuration value is unusable
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// The client has no open connection
    #[error("{0} is not connected")]
    NotConnected(String),

    /// The client does not implement an operation
    #[error("{client} does not support {operation}")]
    Unsupported {
        /// Client identifier
        client: String,
        /// Operation requested
        operation: &'static str,
    },
}

impl From<tokio_tungstenite::tungstenite::Error> for FeedError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Transport(e.to_string())
    }
}

impl From<reqwest::Error> for FeedError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Decode(e.to_string())
        } else {
            Self::Transport(e.to_string())
        }
    }
}

impl From<serde_json::Error> for FeedError {
    fn from(e: serde_json::Error) -> Self {
        Self::Decode(e.to_string())
    }
}

impl FeedError {
    /// Transient errors are retried by reconnecting or skipping a frame
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::Timeout { .. } | Self::Decode(_)
        )
    }
}
