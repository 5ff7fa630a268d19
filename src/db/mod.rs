//! Database access layer.
//!
//! This module provides:
//! - Provider factories that open vendor connections
//! - Connections and caller-owned transactions
//! - Command preparation and parameter binding
//! - Statement execution and row decoding
//! - The async `AdoHelper` and its blocking facade

pub mod blocking;
pub mod command;
pub mod connection;
pub(crate) mod executor;
pub mod guard;
pub mod helper;
pub mod params;
pub mod provider;
pub mod reader;
pub mod types;

pub use blocking::{BlockingAdoHelper, BlockingReader};
pub use command::PreparedCommand;
pub use connection::{ActiveTransaction, DbConnection, DbTransaction};
pub use helper::AdoHelper;
pub use provider::{ProviderFactory, SqlxProviderFactory};
pub use reader::DataReader;
pub use types::DbRow;
