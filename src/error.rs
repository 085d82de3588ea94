//! Error types for the database access layer.
//!
//! This module defines all error types using `thiserror`. `DbError` covers
//! failures raised by this layer itself; `BlockError` is the exit taxonomy
//! for scoped blocks, where a control-flow signal must be distinguishable
//! from a genuine failure.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Missing '{key}' configuration for database '{database}'")]
    Configuration { database: String, key: String },

    #[error("Driver '{driver}' not found: {reason}")]
    DriverNotFound { driver: String, reason: String },

    #[error("Connection failed: {message}")]
    Connection { message: String },

    #[error("Database error: {message}")]
    Database {
        message: String,
        /// e.g., "42P01" for undefined table
        sql_state: Option<String>,
    },

    #[error("Transaction error: {message}")]
    Transaction { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DbError {
    /// Create a configuration error for a missing or invalid key.
    pub fn configuration(database: impl Into<String>, key: impl Into<String>) -> Self {
        Self::Configuration {
            database: database.into(),
            key: key.into(),
        }
    }

    /// Create a driver-not-found error wrapping the underlying cause.
    pub fn driver_not_found(driver: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DriverNotFound {
            driver: driver.into(),
            reason: reason.into(),
        }
    }

    /// Create a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Create a database error with optional SQL state.
    pub fn database(message: impl Into<String>, sql_state: Option<String>) -> Self {
        Self::Database {
            message: message.into(),
            sql_state,
        }
    }

    /// Create a transaction error.
    pub fn transaction(message: impl Into<String>) -> Self {
        Self::Transaction {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

/// Convert sqlx errors to DbError.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(msg) => DbError::connection(msg.to_string()),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                DbError::database(db_err.message(), code)
            }
            sqlx::Error::PoolTimedOut => DbError::connection("Connection pool acquire timed out"),
            sqlx::Error::PoolClosed => DbError::connection("Connection pool is closed"),
            sqlx::Error::Io(io_err) => DbError::connection(format!("I/O error: {}", io_err)),
            sqlx::Error::Tls(tls_err) => DbError::connection(format!("TLS error: {}", tls_err)),
            sqlx::Error::Protocol(msg) => DbError::connection(format!("Protocol error: {}", msg)),
            sqlx::Error::AnyDriverError(err) => {
                DbError::driver_not_found("any", format!("Driver error: {}", err))
            }
            sqlx::Error::RowNotFound => DbError::database("No rows returned", None),
            sqlx::Error::ColumnDecode { index, source } => {
                DbError::internal(format!("Failed to decode column {}: {}", index, source))
            }
            sqlx::Error::Decode(source) => DbError::internal(format!("Decode error: {}", source)),
            sqlx::Error::WorkerCrashed => DbError::internal("Database worker crashed"),
            _ => DbError::internal(format!("Unknown database error: {}", err)),
        }
    }
}

/// Result type alias for database operations.
pub type DbResult<T> = Result<T, DbError>;

/// Control-flow exit from a scoped block that is not a failure.
///
/// A block may bail out early (stop iterating, short-circuit a search)
/// without anything having gone wrong. Inside `with_transaction` such an
/// exit commits the work done so far instead of rolling it back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlSignal {
    label: String,
}

impl ControlSignal {
    /// Create a signal with a label callers can recognize on the way out.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl std::fmt::Display for ControlSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label)
    }
}

/// Exit taxonomy for scoped blocks.
///
/// The commit/rollback decision in `with_transaction` branches on the
/// variant: `Db` and `App` roll back, `Signal` commits and re-propagates.
#[derive(Error, Debug)]
pub enum BlockError {
    /// Failure raised by this layer.
    #[error(transparent)]
    Db(#[from] DbError),

    /// Opaque caller-defined failure raised inside the block.
    #[error("Application error: {0}")]
    App(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Control-flow exit; not a failure.
    #[error("Control signal: {0}")]
    Signal(ControlSignal),
}

impl BlockError {
    /// Wrap a caller-defined error.
    pub fn app<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::App(Box::new(err))
    }

    /// Create a control-flow signal exit.
    pub fn signal(label: impl Into<String>) -> Self {
        Self::Signal(ControlSignal::new(label))
    }

    /// True for genuine failures; false for control-flow signals.
    pub fn is_failure(&self) -> bool {
        !matches!(self, Self::Signal(_))
    }
}

/// Result type alias for scoped block execution.
pub type BlockResult<T> = Result<T, BlockError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_error_mentions_database_and_key() {
        let err = DbError::configuration("default", "driver");
        let msg = err.to_string();
        assert!(msg.contains("default"));
        assert!(msg.contains("driver"));
    }

    #[test]
    fn test_driver_not_found_wraps_reason() {
        let err = DbError::driver_not_found("oracle", "no such engine");
        assert!(err.to_string().contains("oracle"));
        assert!(err.to_string().contains("no such engine"));
    }

    #[test]
    fn test_block_error_failure_classification() {
        assert!(BlockError::from(DbError::internal("boom")).is_failure());
        assert!(BlockError::app(std::io::Error::other("boom")).is_failure());
        assert!(!BlockError::signal("early-exit").is_failure());
    }

    #[test]
    fn test_control_signal_label_round_trip() {
        let signal = ControlSignal::new("break");
        assert_eq!(signal.label(), "break");
        assert_eq!(signal.to_string(), "break");
    }

    #[test]
    fn test_sqlx_pool_closed_maps_to_connection() {
        let err = DbError::from(sqlx::Error::PoolClosed);
        assert!(matches!(err, DbError::Connection { .. }));
    }
}
