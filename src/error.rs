// Error taxonomy for the whole core
//
// Precondition errors fail fast, GameStatusError fails one operation,
// ValidationError findings are data problems surfaced to the operator, and
// the consistency errors (UnhandledEvent, TransactionInProgress) signal a
// broken configuration.

use crate::domain::GameStatusError;
use crate::validation::ValidationError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    GameStatus(#[from] GameStatusError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{aggregate} already exists: {key}")]
    Duplicate { aggregate: &'static str, key: String },

    #[error("{aggregate} not found: {key}")]
    NotFound { aggregate: &'static str, key: String },

    /// An event reached the storage projection step without a projector
    #[error("no storage projector registered for event {event}")]
    UnhandledEvent { event: &'static str },

    #[error("no handler registered for command {command}")]
    NoCommandHandler { command: &'static str },

    #[error("no handler registered for query {query}")]
    NoQueryHandler { query: &'static str },

    #[error("a handler is already registered for {message}")]
    HandlerAlreadyRegistered { message: &'static str },

    #[error("a unit of work is already open against the {storage} storage")]
    TransactionInProgress { storage: &'static str },

    #[error("the unit of work is no longer open")]
    TransactionClosed,

    #[error("lookup table {table} does not match the application: expected {expected:?}, found {found:?}")]
    SchemaMismatch {
        table: &'static str,
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("configuration error: {message}")]
    Config { message: String },

    #[error("statistics source error: {message}")]
    Source { message: String },

    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV processing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn not_found(aggregate: &'static str, key: impl ToString) -> Self {
        Error::NotFound {
            aggregate,
            key: key.to_string(),
        }
    }

    pub fn duplicate(aggregate: &'static str, key: impl ToString) -> Self {
        Error::Duplicate {
            aggregate,
            key: key.to_string(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
        }
    }

    /// True for data findings the operator reviews rather than programming errors
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
