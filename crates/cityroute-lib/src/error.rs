use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Convenient result alias for the cityroute library.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level library error type.
#[derive(Debug, Error)]
pub enum Error {
    /// The document store could not be opened or queried.
    #[error("document store unavailable: {message}")]
    StoreUnavailable { message: String },

    /// A requested document (for example a map tile) does not exist.
    #[error("{kind} not found: {name}")]
    NotFound { kind: &'static str, name: String },

    /// Raised by the service façade before a graph snapshot has been loaded.
    #[error("graph not initialized; call /initialize first")]
    NotInitialized,

    /// Raised when a route is requested on a graph without nodes.
    #[error("road graph has no nodes")]
    EmptyGraph,

    /// Raised when no path connects the resolved origin and destination nodes.
    #[error("no path found between node {origin} and node {destination}")]
    NoPath { origin: i64, destination: i64 },

    /// Raised when a route cannot be rendered or exported against a graph.
    #[error("invalid route: {reason}")]
    InvalidRoute { reason: String },

    /// Raised when stored documents do not describe a consistent graph.
    #[error("data integrity error in {record}: {message}")]
    DataIntegrity { record: String, message: String },

    /// Raised when an operation exceeds its time budget.
    #[error("{operation} timed out after {budget:?}")]
    Timeout { operation: String, budget: Duration },

    /// Raised when encoding a route image fails.
    #[error("failed to render route image: {message}")]
    Render { message: String },

    /// Raised when writing an output file fails.
    #[error("failed to write {path}: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Wrapper for JSON serialization errors.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn integrity(record: impl Into<String>, message: impl Into<String>) -> Self {
        Error::DataIntegrity {
            record: record.into(),
            message: message.into(),
        }
    }

    pub(crate) fn invalid_route(reason: impl Into<String>) -> Self {
        Error::InvalidRoute {
            reason: reason.into(),
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::StoreUnavailable {
            message: err.to_string(),
        }
    }
}
