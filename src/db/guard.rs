//! Suspension-point guards.
//!
//! Every await on the driver goes through one of these so that a command's
//! cancellation token and timeout are honoured the same way everywhere.

use crate::error::{DbError, DbResult};
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

/// Race `fut` against `token`. A fired token wins and yields `DbError::Cancelled`.
pub async fn cancellable<T, F>(
    operation: &str,
    token: Option<&CancellationToken>,
    fut: F,
) -> DbResult<T>
where
    F: Future<Output = DbResult<T>>,
{
    let Some(token) = token else {
        return fut.await;
    };
    if token.is_cancelled() {
        return Err(DbError::cancelled(operation));
    }
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(DbError::cancelled(operation)),
        result = fut => result,
    }
}

/// Bound `fut` by `limit` and race it against `token`.
pub async fn bounded<T, F>(
    operation: &str,
    limit: Duration,
    token: Option<&CancellationToken>,
    fut: F,
) -> DbResult<T>
where
    F: Future<Output = DbResult<T>>,
{
    cancellable(operation, token, async {
        match timeout(limit, fut).await {
            Ok(result) => result,
            Err(_) => Err(DbError::timeout(operation, limit.as_secs() as u32)),
        }
    })
    .await
}
