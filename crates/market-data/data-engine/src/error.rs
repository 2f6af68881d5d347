//! Data engine errors

use common::ClientId;
use thiserror::Error;

/// Result alias for data engine operations
pub type DataEngineResult<T> = Result<T, DataEngineError>;

/// Data engine error types
///
/// Registration errors are fatal for the call that raised them. Routing and client errors
/// reject a single command; the engine keeps running.
#[derive(Error, Debug)]
pub enum DataEngineError {
    /// A client with the same id is already registered
    #[error("client {client_id} already registered")]
    DuplicateClient {
        /// Duplicate id
        client_id: ClientId,
    },

    /// A default client is already registered
    #[error("default client already registered as {existing}, cannot register {client_id}")]
    DuplicateDefaultClient {
        /// Registered default
        existing: ClientId,
        /// Rejected client
        client_id: ClientId,
    },

    /// No client is registered under the id
    #[error("client {client_id} not registered")]
    ClientNotFound {
        /// Unknown id
        client_id: ClientId,
    },

    /// Neither an explicit client, a venue route nor a default client matched
    #[error("no data client to route {command}")]
    NoRoute {
        /// Command being routed
        command: String,
    },

    /// The command cannot be executed as given
    #[error("invalid command {command}: {reason}")]
    InvalidCommand {
        /// Rejected command
        command: String,
        /// Why it was rejected
        reason: &'static str,
    },

    /// The client failed the operation
    #[error("{client_id} failed to {operation}: {message}")]
    Client {
        /// Failing client
        client_id: ClientId,
        /// Operation attempted
        operation: &'static str,
        /// Client error
        message: String,
    },

    /// The engine is not in a state that allows the operation
    #[error("cannot {operation} while {state}")]
    InvalidState {
        /// Operation attempted
        operation: &'static str,
        /// Current state
        state: String,
    },

    /// The bus refused a registration
    #[error(transparent)]
    Bus(#[from] bus::BusError),
}

impl DataEngineError {
    pub(crate) fn client(client_id: ClientId, operation: &'static str, error: &anyhow::Error) -> Self {
        Self::Client {
            client_id,
            operation,
            message: format!("{error:#}"),
        }
    }
}
