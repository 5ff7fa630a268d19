//! Statement execution against a single vendor connection.
//!
//! The executor uses database-specific implementations organized in submodules:
//! - `mysql`: MySQL-specific execution
//! - `postgres`: PostgreSQL-specific execution
//! - `sqlite`: SQLite-specific execution
//!
//! Each submodule provides identical functionality adapted to the database's type system.
//! Timeouts, cancellation and connection lifetime are the caller's concern.

use crate::db::command::PreparedCommand;
use crate::db::connection::ConnectionHandle;
use crate::db::types::DbRow;
use futures_util::stream::BoxStream;
use futures_util::{StreamExt, TryStreamExt};
use tracing::debug;

/// Execute a statement and return the number of affected rows.
pub(crate) async fn execute(
    handle: ConnectionHandle<'_>,
    command: &PreparedCommand,
) -> Result<u64, sqlx::Error> {
    log_statement("Executing non-query", &handle, command);
    match handle {
        ConnectionHandle::MySql(c) => mysql::execute(c, command).await,
        ConnectionHandle::Postgres(c) => postgres::execute(c, command).await,
        ConnectionHandle::SQLite(c) => sqlite::execute(c, command).await,
    }
}

/// Execute a statement and return its first row, if any.
pub(crate) async fn fetch_first(
    handle: ConnectionHandle<'_>,
    command: &PreparedCommand,
) -> Result<Option<DbRow>, sqlx::Error> {
    log_statement("Executing scalar", &handle, command);
    match handle {
        ConnectionHandle::MySql(c) => Ok(mysql::fetch_first(c, command).await?.map(DbRow::MySql)),
        ConnectionHandle::Postgres(c) => {
            Ok(postgres::fetch_first(c, command).await?.map(DbRow::Postgres))
        }
        ConnectionHandle::SQLite(c) => {
            Ok(sqlite::fetch_first(c, command).await?.map(DbRow::SQLite))
        }
    }
}

/// Execute a statement and stream its rows.
pub(crate) fn fetch<'a>(
    handle: ConnectionHandle<'a>,
    command: &'a PreparedCommand,
) -> BoxStream<'a, Result<DbRow, sqlx::Error>> {
    log_statement("Executing reader", &handle, command);
    match handle {
        ConnectionHandle::MySql(c) => mysql::fetch(c, command).map_ok(DbRow::MySql).boxed(),
        ConnectionHandle::Postgres(c) => {
            postgres::fetch(c, command).map_ok(DbRow::Postgres).boxed()
        }
        ConnectionHandle::SQLite(c) => sqlite::fetch(c, command).map_ok(DbRow::SQLite).boxed(),
    }
}

fn log_statement(message: &str, handle: &ConnectionHandle<'_>, command: &PreparedCommand) {
    debug!(
        db_type = %handle.db_type(),
        sql = %command.sql,
        params = command.params.len(),
        "{}",
        message
    );
}

// =============================================================================
// Database-Specific Implementations
// =============================================================================
//
// When a command has no parameters it is sent as raw SQL; some statements
// (e.g. CREATE PROCEDURE on MySQL) cannot be prepared.

mod mysql {
    use super::*;
    use crate::db::params::bind_mysql_param;
    use sqlx::mysql::{MySqlArguments, MySqlRow};
    use sqlx::{Executor, MySql, MySqlConnection};

    fn build(command: &PreparedCommand) -> sqlx::query::Query<'_, MySql, MySqlArguments> {
        command
            .params
            .iter()
            .fold(sqlx::query(&command.sql), bind_mysql_param)
    }

    pub async fn execute(
        conn: &mut MySqlConnection,
        command: &PreparedCommand,
    ) -> Result<u64, sqlx::Error> {
        let result = if command.params.is_empty() {
            conn.execute(command.sql.as_str()).await?
        } else {
            build(command).execute(conn).await?
        };
        Ok(result.rows_affected())
    }

    pub async fn fetch_first(
        conn: &mut MySqlConnection,
        command: &PreparedCommand,
    ) -> Result<Option<MySqlRow>, sqlx::Error> {
        if command.params.is_empty() {
            conn.fetch_optional(command.sql.as_str()).await
        } else {
            build(command).fetch_optional(conn).await
        }
    }

    pub fn fetch<'a>(
        conn: &'a mut MySqlConnection,
        command: &'a PreparedCommand,
    ) -> BoxStream<'a, Result<MySqlRow, sqlx::Error>> {
        if command.params.is_empty() {
            conn.fetch(command.sql.as_str())
        } else {
            build(command).fetch(conn)
        }
    }
}

mod postgres {
    use super::*;
    use crate::db::params::bind_postgres_param;
    use sqlx::postgres::{PgArguments, PgRow};
    use sqlx::{Executor, PgConnection, Postgres};

    fn build(command: &PreparedCommand) -> sqlx::query::Query<'_, Postgres, PgArguments> {
        command
            .params
            .iter()
            .fold(sqlx::query(&command.sql), bind_postgres_param)
    }

    pub async fn execute(
        conn: &mut PgConnection,
        command: &PreparedCommand,
    ) -> Result<u64, sqlx::Error> {
        let result = if command.params.is_empty() {
            conn.execute(command.sql.as_str()).await?
        } else {
            build(command).execute(conn).await?
        };
        Ok(result.rows_affected())
    }

    pub async fn fetch_first(
        conn: &mut PgConnection,
        command: &PreparedCommand,
    ) -> Result<Option<PgRow>, sqlx::Error> {
        if command.params.is_empty() {
            conn.fetch_optional(command.sql.as_str()).await
        } else {
            build(command).fetch_optional(conn).await
        }
    }

    pub fn fetch<'a>(
        conn: &'a mut PgConnection,
        command: &'a PreparedCommand,
    ) -> BoxStream<'a, Result<PgRow, sqlx::Error>> {
        if command.params.is_empty() {
            conn.fetch(command.sql.as_str())
        } else {
            build(command).fetch(conn)
        }
    }
}

mod sqlite {
    use super::*;
    use crate::db::params::bind_sqlite_param;
    use sqlx::sqlite::{SqliteArguments, SqliteRow};
    use sqlx::{Executor, Sqlite, SqliteConnection};

    fn build(command: &PreparedCommand) -> sqlx::query::Query<'_, Sqlite, SqliteArguments<'_>> {
        command
            .params
            .iter()
            .fold(sqlx::query(&command.sql), bind_sqlite_param)
    }

    pub async fn execute(
        conn: &mut SqliteConnection,
        command: &PreparedCommand,
    ) -> Result<u64, sqlx::Error> {
        let result = if command.params.is_empty() {
            conn.execute(command.sql.as_str()).await?
        } else {
            build(command).execute(conn).await?
        };
        Ok(result.rows_affected())
    }

    pub async fn fetch_first(
        conn: &mut SqliteConnection,
        command: &PreparedCommand,
    ) -> Result<Option<SqliteRow>, sqlx::Error> {
        if command.params.is_empty() {
            conn.fetch_optional(command.sql.as_str()).await
        } else {
            build(command).fetch_optional(conn).await
        }
    }

    pub fn fetch<'a>(
        conn: &'a mut SqliteConnection,
        command: &'a PreparedCommand,
    ) -> BoxStream<'a, Result<SqliteRow, sqlx::Error>> {
        if command.params.is_empty() {
            conn.fetch(command.sql.as_str())
        } else {
            build(command).fetch(conn)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connection::DbConnection;
    use crate::models::{Command, DatabaseType};
    use sqlx::ConnectOptions;
    use sqlx::sqlite::SqliteConnectOptions;
    use std::str::FromStr;

    async fn memory_connection() -> DbConnection {
        let conn = SqliteConnectOptions::from_str("sqlite::memory:")
            .unwrap()
            .connect()
            .await
            .unwrap();
        DbConnection::SQLite(conn)
    }

    fn prepare(command: Command) -> PreparedCommand {
        PreparedCommand::prepare(&command, DatabaseType::SQLite).unwrap()
    }

    #[tokio::test]
    async fn test_execute_raw_and_bound() {
        let mut conn = memory_connection().await;
        let create = prepare(Command::text("CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT)"));
        assert_eq!(execute(conn.handle(), &create).await.unwrap(), 0);

        let insert = prepare(
            Command::text("INSERT INTO t (name) VALUES (?), (?)")
                .with_param("a", "x")
                .with_param("b", "y"),
        );
        assert_eq!(execute(conn.handle(), &insert).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_fetch_first_and_stream() {
        let mut conn = memory_connection().await;
        let first = prepare(Command::text("SELECT ? + 1").with_param("n", 41));
        let row = fetch_first(conn.handle(), &first).await.unwrap().unwrap();
        assert_eq!(row.get(0), Some(serde_json::json!(42)));

        let series = prepare(Command::text(
            "WITH RECURSIVE s(n) AS (SELECT 1 UNION ALL SELECT n + 1 FROM s WHERE n < 3) SELECT n FROM s",
        ));
        let rows: Vec<DbRow> = fetch(conn.handle(), &series).try_collect().await.unwrap();
        assert_eq!(rows.len(), 3);
    }

    #[tokio::test]
    async fn test_driver_error_is_returned() {
        let mut conn = memory_connection().await;
        let bad = prepare(Command::text("SELECT * FROM no_such_table"));
        let err = fetch_first(conn.handle(), &bad).await.unwrap_err();
        assert!(matches!(err, sqlx::Error::Database(_)));
    }
}
