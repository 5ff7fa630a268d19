//! Forward-only data reader.
//!
//! A reader returned from a connection string owns its connection and closes
//! it once the last row has been read, or when the reader is dropped early.
//! A reader returned from a caller transaction borrows the transaction for as
//! long as it lives.

use crate::db::command::PreparedCommand;
use crate::db::connection::{ConnectionHandle, DbConnection};
use crate::db::executor;
use crate::db::guard::cancellable;
use crate::db::types::DbRow;
use crate::error::{DbError, DbResult};
use async_stream::try_stream;
use futures_util::stream::{BoxStream, Stream};
use futures_util::{StreamExt, TryStreamExt};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio_util::sync::CancellationToken;
use tracing::debug;

const FETCH_OPERATION: &str = "row fetch";

/// Rows produced by `execute_reader`.
///
/// The first row is fetched before the reader is handed out, so errors raised
/// by the statement itself surface from `execute_reader` rather than from the
/// first call to `next_row`.
pub struct DataReader<'a> {
    first: Option<DbRow>,
    rows: BoxStream<'a, DbResult<DbRow>>,
    rows_read: u64,
}

impl<'a> DataReader<'a> {
    /// Reader over a connection it owns.
    pub(crate) fn owned(
        connection: DbConnection,
        command: PreparedCommand,
        cancellation: Option<CancellationToken>,
    ) -> DataReader<'static> {
        DataReader::from_stream(owned_rows(connection, command, cancellation).boxed())
    }

    /// Reader over a connection borrowed from a caller transaction.
    pub(crate) fn borrowed(
        handle: ConnectionHandle<'a>,
        command: PreparedCommand,
        cancellation: Option<CancellationToken>,
    ) -> Self {
        Self::from_stream(borrowed_rows(handle, command, cancellation).boxed())
    }

    fn from_stream(rows: BoxStream<'a, DbResult<DbRow>>) -> Self {
        Self {
            first: None,
            rows,
            rows_read: 0,
        }
    }

    /// Pull the first row so that statement errors are reported up front.
    pub(crate) async fn prime(mut self) -> DbResult<Self> {
        self.first = self.rows.try_next().await?;
        Ok(self)
    }

    /// Read the next row, or `None` when the result is exhausted.
    pub async fn next_row(&mut self) -> DbResult<Option<DbRow>> {
        let row = match self.first.take() {
            Some(row) => Some(row),
            None => self.rows.try_next().await?,
        };
        if row.is_some() {
            self.rows_read += 1;
        }
        Ok(row)
    }

    /// Read every remaining row.
    pub async fn collect_rows(mut self) -> DbResult<Vec<DbRow>> {
        let mut rows = Vec::new();
        while let Some(row) = self.next_row().await? {
            rows.push(row);
        }
        Ok(rows)
    }

    /// Number of rows handed out so far.
    pub fn rows_read(&self) -> u64 {
        self.rows_read
    }
}

impl Stream for DataReader<'_> {
    type Item = DbResult<DbRow>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if let Some(row) = this.first.take() {
            this.rows_read += 1;
            return Poll::Ready(Some(Ok(row)));
        }
        let polled = this.rows.poll_next_unpin(cx);
        if let Poll::Ready(Some(Ok(_))) = &polled {
            this.rows_read += 1;
        }
        polled
    }
}

impl std::fmt::Debug for DataReader<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataReader")
            .field("rows_read", &self.rows_read)
            .field("buffered", &self.first.is_some())
            .finish()
    }
}

fn owned_rows(
    mut connection: DbConnection,
    command: PreparedCommand,
    cancellation: Option<CancellationToken>,
) -> impl Stream<Item = DbResult<DbRow>> + Send + 'static {
    try_stream! {
        {
            let mut rows = executor::fetch(connection.handle(), &command);
            while let Some(row) = next(&mut rows, cancellation.as_ref()).await? {
                yield row;
            }
        }
        let db_type = connection.db_type();
        connection.close().await?;
        debug!(db_type = %db_type, "Reader exhausted, connection closed");
    }
}

fn borrowed_rows<'a>(
    handle: ConnectionHandle<'a>,
    command: PreparedCommand,
    cancellation: Option<CancellationToken>,
) -> impl Stream<Item = DbResult<DbRow>> + Send + 'a {
    try_stream! {
        let mut rows = executor::fetch(handle, &command);
        while let Some(row) = next(&mut rows, cancellation.as_ref()).await? {
            yield row;
        }
    }
}

async fn next(
    rows: &mut BoxStream<'_, Result<DbRow, sqlx::Error>>,
    cancellation: Option<&CancellationToken>,
) -> DbResult<Option<DbRow>> {
    cancellable(FETCH_OPERATION, cancellation, async {
        rows.try_next().await.map_err(DbError::from)
    })
    .await
}
