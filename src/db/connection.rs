//! Vendor connections and transactions.
//!
//! `DbConnection` owns one open vendor connection. `ActiveTransaction` wraps a
//! vendor transaction borrowed from a connection and remembers whether it has
//! already been committed or rolled back, so a finished transaction is rejected
//! instead of silently reused.

use crate::error::{DbError, DbResult};
use crate::models::DatabaseType;
use sqlx::{Connection, MySql, MySqlConnection, PgConnection, Postgres, Sqlite, SqliteConnection};
use std::time::{Duration, Instant};
use tracing::debug;

/// An open connection to one of the supported providers.
#[derive(Debug)]
pub enum DbConnection {
    MySql(MySqlConnection),
    Postgres(PgConnection),
    SQLite(SqliteConnection),
}

impl DbConnection {
    /// Get the database type for this connection.
    pub fn db_type(&self) -> DatabaseType {
        match self {
            DbConnection::MySql(_) => DatabaseType::MySQL,
            DbConnection::Postgres(_) => DatabaseType::PostgreSQL,
            DbConnection::SQLite(_) => DatabaseType::SQLite,
        }
    }

    /// Check that the connection is still alive.
    pub async fn ping(&mut self) -> DbResult<()> {
        match self {
            DbConnection::MySql(c) => c.ping().await?,
            DbConnection::Postgres(c) => c.ping().await?,
            DbConnection::SQLite(c) => c.ping().await?,
        }
        Ok(())
    }

    /// Begin a caller-owned transaction on this connection.
    pub async fn begin(&mut self) -> DbResult<ActiveTransaction<'_>> {
        let transaction = match self {
            DbConnection::MySql(c) => DbTransaction::MySql(c.begin().await?),
            DbConnection::Postgres(c) => DbTransaction::Postgres(c.begin().await?),
            DbConnection::SQLite(c) => DbTransaction::SQLite(c.begin().await?),
        };
        debug!(db_type = %transaction.db_type(), "Transaction started");
        Ok(ActiveTransaction::new(transaction))
    }

    /// Close the connection gracefully.
    pub async fn close(self) -> DbResult<()> {
        match self {
            DbConnection::MySql(c) => c.close().await?,
            DbConnection::Postgres(c) => c.close().await?,
            DbConnection::SQLite(c) => c.close().await?,
        }
        Ok(())
    }

    pub(crate) fn handle(&mut self) -> ConnectionHandle<'_> {
        match self {
            DbConnection::MySql(c) => ConnectionHandle::MySql(c),
            DbConnection::Postgres(c) => ConnectionHandle::Postgres(c),
            DbConnection::SQLite(c) => ConnectionHandle::SQLite(c),
        }
    }
}

/// Database-specific transaction wrapper.
pub enum DbTransaction<'c> {
    /// MySQL transaction
    MySql(sqlx::Transaction<'c, MySql>),
    /// PostgreSQL transaction
    Postgres(sqlx::Transaction<'c, Postgres>),
    /// SQLite transaction
    SQLite(sqlx::Transaction<'c, Sqlite>),
}

impl<'c> DbTransaction<'c> {
    /// Get the database type for this transaction.
    pub fn db_type(&self) -> DatabaseType {
        match self {
            DbTransaction::MySql(_) => DatabaseType::MySQL,
            DbTransaction::Postgres(_) => DatabaseType::PostgreSQL,
            DbTransaction::SQLite(_) => DatabaseType::SQLite,
        }
    }

    /// Commit the transaction.
    pub async fn commit(self) -> DbResult<()> {
        match self {
            DbTransaction::MySql(tx) => tx.commit().await?,
            DbTransaction::Postgres(tx) => tx.commit().await?,
            DbTransaction::SQLite(tx) => tx.commit().await?,
        }
        Ok(())
    }

    /// Rollback the transaction.
    pub async fn rollback(self) -> DbResult<()> {
        match self {
            DbTransaction::MySql(tx) => tx.rollback().await?,
            DbTransaction::Postgres(tx) => tx.rollback().await?,
            DbTransaction::SQLite(tx) => tx.rollback().await?,
        }
        Ok(())
    }

    pub(crate) fn handle(&mut self) -> ConnectionHandle<'_> {
        match self {
            DbTransaction::MySql(tx) => ConnectionHandle::MySql(&mut **tx),
            DbTransaction::Postgres(tx) => ConnectionHandle::Postgres(&mut **tx),
            DbTransaction::SQLite(tx) => ConnectionHandle::SQLite(&mut **tx),
        }
    }
}

impl std::fmt::Debug for DbTransaction<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("DbTransaction").field(&self.db_type()).finish()
    }
}

/// A caller-owned transaction.
///
/// Dropping an active transaction rolls it back.
#[derive(Debug)]
pub struct ActiveTransaction<'c> {
    transaction: Option<DbTransaction<'c>>,
    db_type: DatabaseType,
    started_at: Instant,
}

impl<'c> ActiveTransaction<'c> {
    pub fn new(transaction: DbTransaction<'c>) -> Self {
        Self {
            db_type: transaction.db_type(),
            transaction: Some(transaction),
            started_at: Instant::now(),
        }
    }

    pub fn db_type(&self) -> DatabaseType {
        self.db_type
    }

    /// False once the transaction has been committed or rolled back.
    pub fn is_active(&self) -> bool {
        self.transaction.is_some()
    }

    /// Time since the transaction started.
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Commit the transaction. Fails if it is no longer active.
    pub async fn commit(&mut self) -> DbResult<()> {
        let tx = self.take()?;
        tx.commit().await?;
        debug!(
            db_type = %self.db_type,
            duration_ms = self.elapsed().as_millis() as u64,
            "Transaction committed"
        );
        Ok(())
    }

    /// Roll back the transaction. Fails if it is no longer active.
    pub async fn rollback(&mut self) -> DbResult<()> {
        let tx = self.take()?;
        tx.rollback().await?;
        debug!(
            db_type = %self.db_type,
            duration_ms = self.elapsed().as_millis() as u64,
            "Transaction rolled back"
        );
        Ok(())
    }

    fn take(&mut self) -> DbResult<DbTransaction<'c>> {
        self.transaction.take().ok_or_else(inactive_error)
    }

    pub(crate) fn handle(&mut self) -> DbResult<ConnectionHandle<'_>> {
        self.transaction
            .as_mut()
            .map(DbTransaction::handle)
            .ok_or_else(inactive_error)
    }
}

fn inactive_error() -> DbError {
    DbError::invalid_argument(
        "transaction",
        "The transaction was rolled back or committed, please provide an open transaction",
    )
}

/// Borrowed vendor connection used to run a single statement.
pub(crate) enum ConnectionHandle<'a> {
    MySql(&'a mut MySqlConnection),
    Postgres(&'a mut PgConnection),
    SQLite(&'a mut SqliteConnection),
}

impl ConnectionHandle<'_> {
    pub(crate) fn db_type(&self) -> DatabaseType {
        match self {
            ConnectionHandle::MySql(_) => DatabaseType::MySQL,
            ConnectionHandle::Postgres(_) => DatabaseType::PostgreSQL,
            ConnectionHandle::SQLite(_) => DatabaseType::SQLite,
        }
    }
}
