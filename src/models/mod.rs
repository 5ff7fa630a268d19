//! Data models for the database helpers.
//!
//! This module re-exports all model types used throughout the crate.

pub mod command;
pub mod connection;

// Re-export commonly used types
pub use command::{
    ColumnMetadata, Command, CommandKind, DEFAULT_COMMAND_TIMEOUT_SECS, DbParameter,
    ParamValue, ParameterDirection,
};
pub use connection::{ConnectionStringOptions, DatabaseType, mask_connection_string};
