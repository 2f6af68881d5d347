//! Cache errors

use common::ClientOrderId;
use oms::OrderError;
use thiserror::Error;

/// Result alias for cache operations
pub type CacheResult<T> = Result<T, CacheError>;

/// Failures reading or mutating the cache
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    /// No entry exists for the key
    #[error("{kind} not found in cache: {key}")]
    NotFound {
        /// Kind of entry looked up
        kind: &'static str,
        /// Key that was looked up
        key: String,
    },

    /// An order with the same client order id is already cached
    #[error("order {client_order_id} already in cache")]
    DuplicateOrder {
        /// Duplicate id
        client_order_id: ClientOrderId,
    },

    /// The cached order refused an event
    #[error(transparent)]
    Order(#[from] OrderError),
}

impl CacheError {
    pub(crate) fn not_found(kind: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            kind,
            key: key.to_string(),
        }
    }
}
