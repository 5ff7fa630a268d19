//! DB Helpers Library
//!
//! Thin helpers that run commands against SQL databases (SQLite, PostgreSQL,
//! MySQL) through a provider factory: execute a statement, open a reader, or
//! fetch a scalar, asynchronously or blocking.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod vendor;

pub use config::Config;
pub use db::{
    ActiveTransaction, AdoHelper, BlockingAdoHelper, DataReader, DbConnection, DbRow,
    ProviderFactory, SqlxProviderFactory,
};
pub use error::{DbError, DbResult};
pub use models::{Command, CommandKind, ConnectionStringOptions, DbParameter, ParamValue};
