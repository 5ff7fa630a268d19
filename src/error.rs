//! Error types for the database helpers.
//!
//! This module defines all error types using `thiserror` for ergonomic error handling.
//! Driver failures are carried unchanged as the error source; the helper adds only
//! argument validation, timeouts and cancellation on top of them.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Invalid argument '{argument}': {message}")]
    InvalidArgument { argument: String, message: String },

    #[error("Connection failed: {message}")]
    Connection { message: String, suggestion: String },

    /// Raised by the driver during open/prepare/execute; not translated.
    #[error("Database error: {0}")]
    Driver(#[from] sqlx::Error),

    #[error("Timeout: {operation} exceeded {elapsed_secs}s")]
    Timeout {
        operation: String,
        elapsed_secs: u32,
    },

    #[error("Cancelled: {operation}")]
    Cancelled { operation: String },

    #[error("Unsupported: {feature} is not available on {database}")]
    Unsupported { feature: String, database: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DbError {
    /// Create an invalid argument error.
    pub fn invalid_argument(argument: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            argument: argument.into(),
            message: message.into(),
        }
    }

    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create a timeout error.
    pub fn timeout(operation: impl Into<String>, elapsed_secs: u32) -> Self {
        Self::Timeout {
            operation: operation.into(),
            elapsed_secs,
        }
    }

    /// Create a cancellation error.
    pub fn cancelled(operation: impl Into<String>) -> Self {
        Self::Cancelled {
            operation: operation.into(),
        }
    }

    /// Create an unsupported feature error.
    pub fn unsupported(feature: impl Into<String>, database: impl Into<String>) -> Self {
        Self::Unsupported {
            feature: feature.into(),
            database: database.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// SQLSTATE (or vendor code) reported by the driver, if any.
    pub fn sql_state(&self) -> Option<String> {
        match self {
            Self::Driver(sqlx::Error::Database(db_err)) => db_err.code().map(|c| c.to_string()),
            _ => None,
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connection { suggestion, .. } => Some(suggestion),
            Self::Driver(err) => Some(driver_suggestion(err)),
            Self::InvalidArgument { .. } => Some("Check the arguments passed to the helper"),
            Self::Timeout { .. } => {
                Some("Consider increasing the command timeout or optimizing the statement")
            }
            _ => None,
        }
    }
}

fn driver_suggestion(err: &sqlx::Error) -> &'static str {
    match err {
        sqlx::Error::Configuration(_) => "Check the connection string format and credentials",
        sqlx::Error::Database(_) => "Check the SQL syntax and referenced objects",
        sqlx::Error::RowNotFound => "Verify the query conditions match existing data",
        sqlx::Error::Io(_) => "Check network connectivity and database server status",
        sqlx::Error::Tls(_) => "Verify TLS configuration and certificates",
        sqlx::Error::Protocol(_) => "Check database server compatibility",
        sqlx::Error::ColumnNotFound(_) | sqlx::Error::TypeNotFound { .. } => {
            "Check the referenced columns and types"
        }
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
            "Check that the column type matches the expected value type"
        }
        _ => "Inspect the driver error for details",
    }
}

/// Result type alias for database operations.
pub type DbResult<T> = Result<T, DbError>;
