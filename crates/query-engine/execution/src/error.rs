//! Errors published by query executions.

use query_engine_materialization::{MaterializationError, ShapeMismatchError};
use thiserror::Error;

/// A backend error of any kind.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The single error an execution can publish.
///
/// Resources are released before any of these reaches the caller, and a
/// failed execution never publishes a partial list of rows.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Connection(#[from] ConnectionError),
    #[error("result columns do not fit the row type: {0}")]
    ShapeMismatch(#[from] ShapeMismatchError),
    #[error("unable to materialize row {row}: {source}")]
    Materialization {
        row: usize,
        source: MaterializationError,
    },
    #[error("unable to project row {row}: {source}")]
    Projection { row: usize, source: ProjectionError },
    /// The backend panicked, or the execution stopped before publishing.
    #[error("execution ended without publishing a result")]
    Abandoned,
}

/// A failure talking to the backend.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("unable to open connection: {0}")]
    Open(BoxError),
    #[error("unable to prepare query: {0}")]
    Prepare(BoxError),
    #[error("error executing query: {0}")]
    Execute(BoxError),
    #[error("unable to close connection: {0}")]
    Close(BoxError),
}

impl ConnectionError {
    pub fn open(err: impl Into<BoxError>) -> Self {
        ConnectionError::Open(err.into())
    }

    pub fn prepare(err: impl Into<BoxError>) -> Self {
        ConnectionError::Prepare(err.into())
    }

    pub fn execute(err: impl Into<BoxError>) -> Self {
        ConnectionError::Execute(err.into())
    }

    pub fn close(err: impl Into<BoxError>) -> Self {
        ConnectionError::Close(err.into())
    }
}

/// A row projection rejected a materialized row.
#[derive(Debug, Error)]
pub enum ProjectionError {
    #[error("{0}")]
    Message(String),
    #[error(transparent)]
    Other(BoxError),
}

impl ProjectionError {
    pub fn new(message: impl Into<String>) -> Self {
        ProjectionError::Message(message.into())
    }
}

impl Error {
    /// A short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Connection(ConnectionError::Open(_)) => "open",
            Error::Connection(ConnectionError::Prepare(_)) => "prepare",
            Error::Connection(ConnectionError::Execute(_)) => "execute",
            Error::Connection(ConnectionError::Close(_)) => "close",
            Error::ShapeMismatch(_) => "shape_mismatch",
            Error::Materialization { .. } => "materialization",
            Error::Projection { .. } => "projection",
            Error::Abandoned => "abandoned",
        }
    }
}
