//! Data client configuration and credentials

use std::fmt;

use common::Venue;
use serde::{Deserialize, Serialize};

use super::channel::VenueTier;
use crate::error::{FeedError, FeedResult};

/// Reconnect delay schedule
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    /// First delay in milliseconds
    pub initial_ms: u64,
    /// Upper bound on the delay before jitter
    pub max_ms: u64,
    /// Multiplier applied after each attempt
    pub factor: f64,
    /// Symmetric random jitter in milliseconds
    pub jitter_ms: u64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_ms: 250,
            max_ms: 5_000,
            factor: 2.0,
            jitter_ms: 200,
        }
    }
}

/// Settings shared by every venue data client
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataClientConfig {
    /// Venue the client connects to
    pub venue: Venue,
    /// WebSocket endpoint; `None` uses the adapter's production URL
    pub ws_url: Option<String>,
    /// REST endpoint; `None` uses the adapter's production URL
    pub http_url: Option<String>,
    /// API key, falls back to `{VENUE}_API_KEY`
    pub api_key: Option<String>,
    /// API secret, falls back to `{VENUE}_API_SECRET`
    pub api_secret: Option<String>,
    /// API passphrase, falls back to `{VENUE}_API_PASSPHRASE`
    pub api_passphrase: Option<String>,
    /// Fail construction when key or secret cannot be resolved
    pub requires_credentials: bool,
    /// Interval between keep-alive pings
    pub heartbeat_secs: u64,
    /// Limit for the initial connect
    pub connect_timeout_secs: u64,
    /// Limit for each reconnect attempt
    pub reconnect_timeout_secs: u64,
    /// Reconnect delays
    pub backoff: BackoffConfig,
    /// Account tier, gates premium book channels
    pub tier: VenueTier,
}

impl Default for DataClientConfig {
    fn default() -> Self {
        Self {
            venue: Venue::from("SIM"),
            ws_url: None,
            http_url: None,
            api_key: None,
            api_secret: None,
            api_passphrase: None,
            requires_credentials: false,
            heartbeat_secs: 20,
            connect_timeout_secs: 10,
            reconnect_timeout_secs: 15,
            backoff: BackoffConfig::default(),
            tier: VenueTier::default(),
        }
    }
}

impl DataClientConfig {
    /// Default settings for `venue`
    #[must_use]
    pub fn new(venue: Venue) -> Self {
        Self {
            venue,
            ..Self::default()
        }
    }
}

impl fmt::Debug for DataClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataClientConfig")
            .field("venue", &self.venue)
            .field("ws_url", &self.ws_url)
            .field("http_url", &self.http_url)
            .field("api_key", &self.api_key)
            .field("api_secret", &self.api_secret.as_ref().map(|_| "***"))
            .field("api_passphrase", &self.api_passphrase.as_ref().map(|_| "***"))
            .field("requires_credentials", &self.requires_credentials)
            .field("heartbeat_secs", &self.heartbeat_secs)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("reconnect_timeout_secs", &self.reconnect_timeout_secs)
            .field("backoff", &self.backoff)
            .field("tier", &self.tier)
            .finish()
    }
}

/// Resolved API credentials
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// API key
    pub api_key: String,
    /// API secret
    pub api_secret: String,
    /// Passphrase, for venues that use one
    pub api_passphrase: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("api_secret", &"***")
            .field("api_passphrase", &self.api_passphrase.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Environment variable prefix for a venue: upper case, non-alphanumerics as `_`
#[must_use]
pub fn env_prefix(venue: &Venue) -> String {
    venue
        .as_str()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}

impl Credentials {
    /// Resolves credentials from the config, then the environment.
    ///
    /// Returns `Ok(None)` when nothing is configured and credentials are optional.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::MissingCredentials`] when `requires_credentials` is set and
    /// the key or secret cannot be found.
    pub fn resolve(config: &DataClientConfig) -> FeedResult<Option<Self>> {
        Self::resolve_with(config, |name| std::env::var(name).ok())
    }

    /// Like [`Credentials::resolve`] with an explicit variable lookup
    ///
    /// # Errors
    ///
    /// See [`Credentials::resolve`].
    pub fn resolve_with(
        config: &DataClientConfig,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> FeedResult<Option<Self>> {
        let prefix = env_prefix(&config.venue);
        let key_var = format!("{prefix}_API_KEY");
        let secret_var = format!("{prefix}_API_SECRET");
        let passphrase_var = format!("{prefix}_API_PASSPHRASE");

        let non_empty = |value: Option<String>| value.filter(|v| !v.is_empty());
        let api_key = non_empty(config.api_key.clone()).or_else(|| non_empty(lookup(&key_var)));
        let api_secret =
            non_empty(config.api_secret.clone()).or_else(|| non_empty(lookup(&secret_var)));
        let api_passphrase = non_empty(config.api_passphrase.clone())
            .or_else(|| non_empty(lookup(&passphrase_var)));

        match (api_key, api_secret) {
            (Some(api_key), Some(api_secret)) => Ok(Some(Self {
                api_key,
                api_secret,
                api_passphrase,
            })),
            (key, _) if config.requires_credentials => {
                let (field, env_var) = if key.is_none() {
                    ("api_key", key_var)
                } else {
                    ("api_secret", secret_var)
                };
                Err(FeedError::MissingCredentials {
                    venue: config.venue.to_string(),
                    field,
                    env_var,
                })
            }
            _ => Ok(None),
        }
    }
}
