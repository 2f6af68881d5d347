//! Data engine configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Behaviour switches and sizing for [`crate::DataEngine`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataEngineConfig {
    /// Publish time bars with `ts_event` at the close. When false, `ts_event` is moved to
    /// the open and `ts_init` stays at the close.
    pub time_bars_timestamp_on_close: bool,
    /// Capacity of the queue between client readers and the engine
    pub buffer_capacity: usize,
    /// Instrument refresh period after connect, 0 disables it
    pub instrument_refresh_interval_secs: u64,
    /// Wait after the unsubscribe-all before sockets are closed
    pub disconnect_grace_ms: u64,
    /// Check managed books for crossing after each update
    pub validate_book_integrity: bool,
    /// Hold single deltas until one flagged `F_LAST` arrives
    pub buffer_deltas: bool,
    /// Drop bars older than the last cached bar of the same type
    pub validate_data_sequence: bool,
    /// Convert quote-denominated order quantities to base before forwarding
    pub convert_quote_qty_to_base: bool,
    /// Log every command and event at debug level
    pub debug: bool,
}

impl Default for DataEngineConfig {
    fn default() -> Self {
        Self {
            time_bars_timestamp_on_close: true,
            buffer_capacity: 1024,
            instrument_refresh_interval_secs: 0,
            disconnect_grace_ms: 100,
            validate_book_integrity: true,
            buffer_deltas: false,
            validate_data_sequence: false,
            convert_quote_qty_to_base: true,
            debug: false,
        }
    }
}

impl DataEngineConfig {
    /// Refresh period, `None` when disabled
    #[must_use]
    pub const fn instrument_refresh_interval(&self) -> Option<Duration> {
        if self.instrument_refresh_interval_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.instrument_refresh_interval_secs))
        }
    }

    #[must_use]
    pub const fn disconnect_grace(&self) -> Duration {
        Duration::from_millis(self.disconnect_grace_ms)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn test_defaults() {
        let config = DataEngineConfig::default();

        assert!(config.time_bars_timestamp_on_close);
        assert_eq!(config.buffer_capacity, 1024);
        assert_eq!(config.instrument_refresh_interval(), None);
        assert_eq!(config.disconnect_grace(), Duration::from_millis(100));
    }

    #[rstest]
    fn test_partial_json_keeps_defaults() {
        let config: DataEngineConfig =
            serde_json::from_str(r#"{"instrument_refresh_interval_secs": 60, "debug": true}"#)
                .unwrap();

        assert_eq!(
            config.instrument_refresh_interval(),
            Some(Duration::from_secs(60))
        );
        assert!(config.debug);
        assert!(config.validate_book_integrity);
    }
}
