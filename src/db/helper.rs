//! The `Execute*` family.
//!
//! Every operation either opens its own connection from a connection string
//! (and always closes it before returning, except for readers which hand the
//! connection to the cursor) or runs on a caller-owned transaction, which is
//! never committed, rolled back or closed here.

use crate::db::command::PreparedCommand;
use crate::db::connection::{ActiveTransaction, ConnectionHandle, DbConnection};
use crate::db::executor;
use crate::db::guard::{bounded, cancellable};
use crate::db::provider::{ProviderFactory, SqlxProviderFactory};
use crate::db::reader::DataReader;
use crate::error::{DbError, DbResult};
use crate::models::{Command, DatabaseType, mask_connection_string};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const OPEN_OPERATION: &str = "open connection";
const BEGIN_OPERATION: &str = "begin transaction";
const EXECUTE_OPERATION: &str = "statement execution";

/// Runs commands through a provider factory.
#[derive(Debug, Clone)]
pub struct AdoHelper {
    factory: Arc<dyn ProviderFactory>,
}

impl AdoHelper {
    pub fn new(factory: Arc<dyn ProviderFactory>) -> Self {
        Self { factory }
    }

    /// Helper backed by the sqlx provider matching the connection string scheme.
    pub fn for_connection_string(connection_string: &str) -> DbResult<Self> {
        let factory = SqlxProviderFactory::for_connection_string(connection_string)?;
        Ok(Self::new(Arc::new(factory)))
    }

    pub fn factory(&self) -> &Arc<dyn ProviderFactory> {
        &self.factory
    }

    pub fn database_type(&self) -> DatabaseType {
        self.factory.database_type()
    }

    /// Open a new connection through the factory.
    pub async fn open_connection(
        &self,
        connection_string: &str,
        cancellation: Option<&CancellationToken>,
    ) -> DbResult<DbConnection> {
        require_connection_string(connection_string)?;
        debug!(
            connection = %mask_connection_string(connection_string),
            db_type = %self.database_type(),
            "Opening connection"
        );
        cancellable(
            OPEN_OPERATION,
            cancellation,
            self.factory.create_connection(connection_string),
        )
        .await
    }

    // =========================================================================
    // Non-query
    // =========================================================================

    /// Execute a statement on a new connection and return the affected row count.
    pub async fn execute_non_query(
        &self,
        connection_string: &str,
        command: &Command,
    ) -> DbResult<u64> {
        require_connection_string(connection_string)?;
        let prepared = PreparedCommand::prepare(command, self.database_type())?;
        let mut connection = self
            .open_connection(connection_string, command.cancellation.as_ref())
            .await?;

        let result = if command.use_transaction {
            match begin(&mut connection, command).await {
                Ok(mut tx) => {
                    let result = match tx.handle() {
                        Ok(handle) => non_query(handle, &prepared, command).await,
                        Err(e) => Err(e),
                    };
                    finish(tx, result).await
                }
                Err(e) => Err(e),
            }
        } else {
            non_query(connection.handle(), &prepared, command).await
        };

        release(connection, &result).await;
        result
    }

    /// Execute a statement inside a caller-owned transaction.
    pub async fn execute_non_query_in(
        &self,
        transaction: &mut ActiveTransaction<'_>,
        command: &Command,
    ) -> DbResult<u64> {
        let handle = transaction.handle()?;
        let prepared = PreparedCommand::prepare(command, handle.db_type())?;
        ignore_transaction_flag(command);
        non_query(handle, &prepared, command).await
    }

    // =========================================================================
    // Reader
    // =========================================================================

    /// Execute a query on a new connection and return a cursor over its rows.
    ///
    /// The connection is closed when the cursor is exhausted or dropped, or
    /// right away if the statement fails.
    pub async fn execute_reader(
        &self,
        connection_string: &str,
        command: &Command,
    ) -> DbResult<DataReader<'static>> {
        require_connection_string(connection_string)?;
        let prepared = PreparedCommand::prepare(command, self.database_type())?;
        let connection = self
            .open_connection(connection_string, command.cancellation.as_ref())
            .await?;
        if command.use_transaction {
            debug!("Readers never run in a helper-managed transaction");
        }

        let reader = DataReader::owned(connection, prepared, command.cancellation.clone());
        bounded(
            EXECUTE_OPERATION,
            command.timeout(),
            command.cancellation.as_ref(),
            reader.prime(),
        )
        .await
    }

    /// Execute a query inside a caller-owned transaction.
    ///
    /// The returned cursor borrows the transaction until it is dropped.
    pub async fn execute_reader_in<'t>(
        &self,
        transaction: &'t mut ActiveTransaction<'_>,
        command: &Command,
    ) -> DbResult<DataReader<'t>> {
        let handle = transaction.handle()?;
        let prepared = PreparedCommand::prepare(command, handle.db_type())?;
        ignore_transaction_flag(command);

        let reader = DataReader::borrowed(handle, prepared, command.cancellation.clone());
        bounded(
            EXECUTE_OPERATION,
            command.timeout(),
            command.cancellation.as_ref(),
            reader.prime(),
        )
        .await
    }

    // =========================================================================
    // Scalar
    // =========================================================================

    /// Execute a query on a new connection and return the first column of the first row.
    ///
    /// `None` means no row was returned; a SQL NULL is `Some(JsonValue::Null)`.
    pub async fn execute_scalar(
        &self,
        connection_string: &str,
        command: &Command,
    ) -> DbResult<Option<JsonValue>> {
        require_connection_string(connection_string)?;
        let prepared = PreparedCommand::prepare(command, self.database_type())?;
        let mut connection = self
            .open_connection(connection_string, command.cancellation.as_ref())
            .await?;

        let result = if command.use_transaction {
            match begin(&mut connection, command).await {
                Ok(mut tx) => {
                    let result = match tx.handle() {
                        Ok(handle) => scalar(handle, &prepared, command).await,
                        Err(e) => Err(e),
                    };
                    finish(tx, result).await
                }
                Err(e) => Err(e),
            }
        } else {
            scalar(connection.handle(), &prepared, command).await
        };

        release(connection, &result).await;
        result
    }

    /// Execute a scalar query inside a caller-owned transaction.
    pub async fn execute_scalar_in(
        &self,
        transaction: &mut ActiveTransaction<'_>,
        command: &Command,
    ) -> DbResult<Option<JsonValue>> {
        let handle = transaction.handle()?;
        let prepared = PreparedCommand::prepare(command, handle.db_type())?;
        ignore_transaction_flag(command);
        scalar(handle, &prepared, command).await
    }
}

pub(crate) fn require_connection_string(connection_string: &str) -> DbResult<()> {
    if connection_string.trim().is_empty() {
        return Err(DbError::invalid_argument(
            "connection_string",
            "A connection string is required to open a connection",
        ));
    }
    Ok(())
}

fn ignore_transaction_flag(command: &Command) {
    if command.use_transaction {
        debug!("Ignoring use_transaction, the caller owns the transaction");
    }
}

pub(crate) async fn non_query(
    handle: ConnectionHandle<'_>,
    prepared: &PreparedCommand,
    command: &Command,
) -> DbResult<u64> {
    let start = Instant::now();
    let affected = bounded(
        EXECUTE_OPERATION,
        command.timeout(),
        command.cancellation.as_ref(),
        async { Ok::<_, DbError>(executor::execute(handle, prepared).await?) },
    )
    .await?;
    debug!(
        rows_affected = affected,
        execution_time_ms = start.elapsed().as_millis() as u64,
        "Non-query completed"
    );
    Ok(affected)
}

pub(crate) async fn scalar(
    handle: ConnectionHandle<'_>,
    prepared: &PreparedCommand,
    command: &Command,
) -> DbResult<Option<JsonValue>> {
    let row = bounded(
        EXECUTE_OPERATION,
        command.timeout(),
        command.cancellation.as_ref(),
        async { Ok::<_, DbError>(executor::fetch_first(handle, prepared).await?) },
    )
    .await?;
    Ok(row.and_then(|r| r.get(0)))
}

async fn begin<'c>(
    connection: &'c mut DbConnection,
    command: &Command,
) -> DbResult<ActiveTransaction<'c>> {
    cancellable(
        BEGIN_OPERATION,
        command.cancellation.as_ref(),
        connection.begin(),
    )
    .await
}

/// Commit a helper-managed transaction on success, roll it back on failure.
///
/// The original failure is returned unchanged even if the rollback fails.
/// After a timeout or cancellation the transaction is dropped instead, which
/// queues the rollback behind the abandoned statement without waiting for it.
async fn finish<T>(mut transaction: ActiveTransaction<'_>, result: DbResult<T>) -> DbResult<T> {
    match result {
        Err(e) if e.is_timeout() || e.is_cancelled() => {
            debug!(
                db_type = %transaction.db_type(),
                "Abandoning helper-managed transaction after interrupted statement"
            );
            drop(transaction);
            Err(e)
        }
        Ok(value) => {
            transaction.commit().await?;
            info!(
                db_type = %transaction.db_type(),
                duration_ms = transaction.elapsed().as_millis() as u64,
                "Helper-managed transaction committed"
            );
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback_err) = transaction.rollback().await {
                warn!(
                    error = %rollback_err,
                    "Rollback of helper-managed transaction failed"
                );
            }
            Err(e)
        }
    }
}

/// Close a helper-owned connection. Failures are logged, never returned.
///
/// After a timeout or cancellation the abandoned statement may still be
/// running, so the connection is dropped rather than closed gracefully.
pub(crate) async fn release<T>(connection: DbConnection, outcome: &DbResult<T>) {
    let db_type = connection.db_type();
    if let Err(e) = outcome {
        if e.is_timeout() || e.is_cancelled() {
            debug!(db_type = %db_type, "Dropping connection after interrupted statement");
            drop(connection);
            return;
        }
    }
    if let Err(e) = connection.close().await {
        warn!(db_type = %db_type, error = %e, "Failed to close connection");
    }
}
