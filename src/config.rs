//! Configuration handling for the db-helpers command-line runner.
//!
//! This module provides configuration management via CLI arguments and environment variables.

use crate::db::{AdoHelper, SqlxProviderFactory};
use crate::error::{DbError, DbResult};
use crate::models::{
    Command, ConnectionStringOptions, DEFAULT_COMMAND_TIMEOUT_SECS, DbParameter, ParamValue,
};
use crate::vendor::sqlce::DEFAULT_IDENTITY_QUERY;
use crate::vendor::sqlite::{
    DEFAULT_DB_FILE_NAME, DEFAULT_PATH_SEGMENT, SqliteConnectionOptions,
    SqliteConnectionStringResolver,
};
use clap::{Args, Parser, Subcommand};
use std::sync::Arc;

pub const DEFAULT_CONTENT_ROOT: &str = ".";

/// Configuration for the db-helpers runner.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "db-helpers",
    about = "Run statements, readers and scalar queries against SQL databases",
    version,
    author
)]
pub struct Config {
    /// Primary connection URL (postgres://, mysql://, sqlite:).
    /// When unset, a SQLite file under the content root is used.
    #[arg(short = 'd', long = "database", value_name = "URL", env = "DB_HELPERS_DATABASE_URL")]
    pub database: Option<String>,

    /// Connection URL for reads (reader, scalar). Falls back to --database.
    #[arg(long, value_name = "URL", env = "DB_HELPERS_READ_DATABASE_URL")]
    pub read_database: Option<String>,

    /// Connection URL for writes (non-query, identity). Falls back to --database.
    #[arg(long, value_name = "URL", env = "DB_HELPERS_WRITE_DATABASE_URL")]
    pub write_database: Option<String>,

    /// Application content root for the default SQLite file
    #[arg(long, default_value = DEFAULT_CONTENT_ROOT, env = "DB_HELPERS_CONTENT_ROOT")]
    pub content_root: String,

    /// Path segment between the content root and the SQLite file
    #[arg(long, default_value = DEFAULT_PATH_SEGMENT, env = "DB_HELPERS_SQLITE_PATH_SEGMENT")]
    pub sqlite_path_segment: String,

    /// SQLite database file name
    #[arg(long, default_value = DEFAULT_DB_FILE_NAME, env = "DB_HELPERS_SQLITE_FILE")]
    pub sqlite_file: String,

    /// Create the SQLite database file if it does not exist
    #[arg(long, env = "DB_HELPERS_CREATE_IF_MISSING")]
    pub create_if_missing: bool,

    /// Command timeout in seconds
    #[arg(long, default_value_t = DEFAULT_COMMAND_TIMEOUT_SECS, env = "DB_HELPERS_TIMEOUT")]
    pub timeout: u32,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "DB_HELPERS_LOG_LEVEL")]
    pub log_level: String,

    /// Enable JSON logging format
    #[arg(long, env = "DB_HELPERS_JSON_LOGS")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub action: Action,
}

/// What to run.
#[derive(Debug, Clone, Subcommand)]
pub enum Action {
    /// Execute a statement and print the affected row count
    NonQuery {
        #[command(flatten)]
        statement: StatementArgs,
        /// Wrap the statement in a transaction
        #[arg(long)]
        transaction: bool,
    },
    /// Execute a query and print the first column of the first row
    Scalar {
        #[command(flatten)]
        statement: StatementArgs,
    },
    /// Execute a query and print every row
    Reader {
        #[command(flatten)]
        statement: StatementArgs,
        /// Decode binary columns as UTF-8 text where possible
        #[arg(long)]
        decode_binary: bool,
    },
    /// Execute an insert and print the generated identity
    Identity {
        #[command(flatten)]
        statement: StatementArgs,
        /// Query returning the identity of the last insert
        #[arg(long, default_value = DEFAULT_IDENTITY_QUERY)]
        identity_query: String,
    },
    /// Print Firebird positional placeholders for COUNT parameters
    ParamString {
        #[arg(allow_hyphen_values = true)]
        count: i64,
    },
}

/// Statement text and parameters shared by the execution subcommands.
#[derive(Debug, Clone, Args)]
pub struct StatementArgs {
    /// SQL text, or the procedure name with --procedure
    pub sql: String,

    /// Positional parameter as a JSON value (e.g. 42, "text", null).
    /// Can be specified multiple times.
    #[arg(short = 'p', long = "param", value_name = "JSON")]
    pub params: Vec<String>,

    /// Treat SQL as a stored procedure name
    #[arg(long)]
    pub procedure: bool,
}

impl StatementArgs {
    /// Build the command, parsing each parameter as JSON.
    pub fn to_command(&self, timeout_secs: u32) -> DbResult<Command> {
        let mut command = if self.procedure {
            Command::stored_procedure(self.sql.as_str())
        } else {
            Command::text(self.sql.as_str())
        };
        for (i, raw) in self.params.iter().enumerate() {
            let value: ParamValue = serde_json::from_str(raw).map_err(|e| {
                DbError::invalid_argument(
                    "param",
                    format!("Parameter {} is not a JSON value ({}): {}", i + 1, raw, e),
                )
            })?;
            command = command.with_parameter(DbParameter::new(format!("p{}", i + 1), value));
        }
        Ok(command.with_timeout(timeout_secs))
    }
}

impl Config {
    /// Resolver for the default SQLite database, honouring --database when set.
    pub fn sqlite_resolver(&self) -> SqliteConnectionStringResolver {
        let options = SqliteConnectionOptions::default()
            .with_connection_string(self.database.clone().unwrap_or_default())
            .with_path_segment(self.sqlite_path_segment.as_str())
            .with_db_file_name(self.sqlite_file.as_str());
        SqliteConnectionStringResolver::new(self.content_root.as_str(), options)
    }

    /// Connection strings for this run.
    pub fn connection_options(&self) -> ConnectionStringOptions {
        let options = ConnectionStringOptions::new(self.sqlite_resolver().resolve());
        let options = match &self.read_database {
            Some(read) => options.with_read(read.as_str()),
            None => options,
        };
        match &self.write_database {
            Some(write) => options.with_write(write.as_str()),
            None => options,
        }
    }

    /// Helper whose provider matches `connection_string`, which may differ
    /// from the primary when a read or write override is set.
    pub fn helper_for(&self, connection_string: &str) -> DbResult<AdoHelper> {
        let factory = SqlxProviderFactory::for_connection_string(connection_string)?
            .create_if_missing(self.create_if_missing);
        Ok(AdoHelper::new(Arc::new(factory)))
    }
}
