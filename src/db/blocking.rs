//! Synchronous `Execute*` variants.
//!
//! `BlockingAdoHelper` drives an `AdoHelper` on its own current-thread tokio
//! runtime, on the caller's thread. It must not be used from inside an async
//! runtime; call the async helper there instead.

use crate::db::connection::{ActiveTransaction, DbConnection};
use crate::db::helper::AdoHelper;
use crate::db::provider::ProviderFactory;
use crate::db::reader::DataReader;
use crate::db::types::DbRow;
use crate::error::{DbError, DbResult};
use crate::models::Command;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tokio::runtime::{Builder, Runtime};

/// Blocking wrapper over `AdoHelper`.
#[derive(Debug)]
pub struct BlockingAdoHelper {
    runtime: Runtime,
    helper: AdoHelper,
}

impl BlockingAdoHelper {
    pub fn new(factory: Arc<dyn ProviderFactory>) -> DbResult<Self> {
        Self::from_helper(AdoHelper::new(factory))
    }

    pub fn for_connection_string(connection_string: &str) -> DbResult<Self> {
        Self::from_helper(AdoHelper::for_connection_string(connection_string)?)
    }

    pub fn from_helper(helper: AdoHelper) -> DbResult<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| DbError::internal(format!("Failed to build blocking runtime: {}", e)))?;
        Ok(Self { runtime, helper })
    }

    /// The async helper this facade drives.
    pub fn helper(&self) -> &AdoHelper {
        &self.helper
    }

    pub(crate) fn block_on<F: std::future::Future>(&self, fut: F) -> F::Output {
        self.runtime.block_on(fut)
    }

    pub fn open_connection(&self, connection_string: &str) -> DbResult<DbConnection> {
        self.block_on(self.helper.open_connection(connection_string, None))
    }

    /// Begin a caller-owned transaction on `connection`.
    pub fn begin<'c>(&self, connection: &'c mut DbConnection) -> DbResult<ActiveTransaction<'c>> {
        self.block_on(connection.begin())
    }

    pub fn commit(&self, transaction: &mut ActiveTransaction<'_>) -> DbResult<()> {
        self.block_on(transaction.commit())
    }

    pub fn rollback(&self, transaction: &mut ActiveTransaction<'_>) -> DbResult<()> {
        self.block_on(transaction.rollback())
    }

    /// Close a connection opened with `open_connection`.
    pub fn close(&self, connection: DbConnection) -> DbResult<()> {
        self.block_on(connection.close())
    }

    pub fn execute_non_query(&self, connection_string: &str, command: &Command) -> DbResult<u64> {
        self.block_on(self.helper.execute_non_query(connection_string, command))
    }

    pub fn execute_non_query_in(
        &self,
        transaction: &mut ActiveTransaction<'_>,
        command: &Command,
    ) -> DbResult<u64> {
        self.block_on(self.helper.execute_non_query_in(transaction, command))
    }

    pub fn execute_scalar(
        &self,
        connection_string: &str,
        command: &Command,
    ) -> DbResult<Option<JsonValue>> {
        self.block_on(self.helper.execute_scalar(connection_string, command))
    }

    pub fn execute_scalar_in(
        &self,
        transaction: &mut ActiveTransaction<'_>,
        command: &Command,
    ) -> DbResult<Option<JsonValue>> {
        self.block_on(self.helper.execute_scalar_in(transaction, command))
    }

    /// Open a cursor on a new connection. Rows are fetched as the iterator advances.
    pub fn execute_reader(
        &self,
        connection_string: &str,
        command: &Command,
    ) -> DbResult<BlockingReader<'_>> {
        let reader = self.block_on(self.helper.execute_reader(connection_string, command))?;
        Ok(BlockingReader {
            runtime: &self.runtime,
            reader,
        })
    }

    /// Open a cursor inside a caller-owned transaction.
    pub fn execute_reader_in<'a>(
        &'a self,
        transaction: &'a mut ActiveTransaction<'_>,
        command: &Command,
    ) -> DbResult<BlockingReader<'a>> {
        let reader = self.block_on(self.helper.execute_reader_in(transaction, command))?;
        Ok(BlockingReader {
            runtime: &self.runtime,
            reader,
        })
    }
}

/// Iterator over the rows of a `DataReader`, driven by the facade's runtime.
pub struct BlockingReader<'a> {
    runtime: &'a Runtime,
    reader: DataReader<'a>,
}

impl BlockingReader<'_> {
    pub fn rows_read(&self) -> u64 {
        self.reader.rows_read()
    }
}

impl Iterator for BlockingReader<'_> {
    type Item = DbResult<DbRow>;

    fn next(&mut self) -> Option<Self::Item> {
        self.runtime.block_on(self.reader.next_row()).transpose()
    }
}

impl std::fmt::Debug for BlockingReader<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockingReader")
            .field("reader", &self.reader)
            .finish()
    }
}
