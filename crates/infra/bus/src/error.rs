//! Bus errors

use thiserror::Error;
use ustr::Ustr;

/// Result alias for bus operations
pub type BusResult<T> = Result<T, BusError>;

/// Failures when sending through the bus
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusError {
    /// No endpoint is registered under the name
    #[error("no endpoint registered at '{endpoint}'")]
    NoEndpoint {
        /// Endpoint name
        endpoint: Ustr,
    },

    /// An endpoint is already registered under the name
    #[error("endpoint '{endpoint}' already registered")]
    DuplicateEndpoint {
        /// Endpoint name
        endpoint: Ustr,
    },

    /// The endpoint's receiver was dropped
    #[error("endpoint '{endpoint}' disconnected")]
    Disconnected {
        /// Endpoint name
        endpoint: Ustr,
    },

    /// The endpoint's bounded queue is full
    #[error("endpoint '{endpoint}' is full")]
    Full {
        /// Endpoint name
        endpoint: Ustr,
    },
}
