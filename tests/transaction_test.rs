//! Integration tests for caller-owned transactions.

use db_helpers::db::{AdoHelper, SqlxProviderFactory};
use db_helpers::error::DbError;
use db_helpers::models::Command;
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;

async fn setup() -> (TempDir, String, AdoHelper) {
    let dir = TempDir::new().unwrap();
    let url = format!("sqlite:{}?mode=rwc", dir.path().join("tx.db").display());
    let helper = AdoHelper::new(Arc::new(SqlxProviderFactory::sqlite()));
    helper
        .execute_non_query(
            &url,
            &Command::text("CREATE TABLE accounts (id INTEGER PRIMARY KEY, balance INTEGER NOT NULL)"),
        )
        .await
        .unwrap();
    helper
        .execute_non_query(&url, &Command::text("INSERT INTO accounts (balance) VALUES (100), (50)"))
        .await
        .unwrap();
    (dir, url, helper)
}

async fn total(helper: &AdoHelper, url: &str) -> serde_json::Value {
    helper
        .execute_scalar(url, &Command::text("SELECT SUM(balance) FROM accounts"))
        .await
        .unwrap()
        .unwrap()
}

#[tokio::test]
async fn test_caller_transaction_commit() {
    let (_dir, url, helper) = setup().await;
    let mut conn = helper.open_connection(&url, None).await.unwrap();
    let mut tx = conn.begin().await.unwrap();

    let debit = Command::text("UPDATE accounts SET balance = balance - ? WHERE id = ?")
        .with_param("amount", 30)
        .with_param("id", 1);
    let credit = Command::text("UPDATE accounts SET balance = balance + ? WHERE id = ?")
        .with_param("amount", 30)
        .with_param("id", 2);
    assert_eq!(helper.execute_non_query_in(&mut tx, &debit).await.unwrap(), 1);
    assert_eq!(helper.execute_non_query_in(&mut tx, &credit).await.unwrap(), 1);

    let inside = helper
        .execute_scalar_in(
            &mut tx,
            &Command::text("SELECT balance FROM accounts WHERE id = 2"),
        )
        .await
        .unwrap();
    assert_eq!(inside, Some(json!(80)));

    tx.commit().await.unwrap();
    assert!(!tx.is_active());
    drop(tx);
    conn.close().await.unwrap();

    let balance = helper
        .execute_scalar(&url, &Command::text("SELECT balance FROM accounts WHERE id = 1"))
        .await
        .unwrap();
    assert_eq!(balance, Some(json!(70)));
    assert_eq!(total(&helper, &url).await, json!(150));
}

#[tokio::test]
async fn test_caller_transaction_rollback() {
    let (_dir, url, helper) = setup().await;
    let mut conn = helper.open_connection(&url, None).await.unwrap();
    let mut tx = conn.begin().await.unwrap();

    helper
        .execute_non_query_in(&mut tx, &Command::text("DELETE FROM accounts"))
        .await
        .unwrap();
    tx.rollback().await.unwrap();
    drop(tx);
    conn.close().await.unwrap();

    assert_eq!(total(&helper, &url).await, json!(150));
}

#[tokio::test]
async fn test_finished_transaction_is_rejected_without_executing() {
    let (_dir, url, helper) = setup().await;
    let mut conn = helper.open_connection(&url, None).await.unwrap();
    let mut tx = conn.begin().await.unwrap();
    tx.commit().await.unwrap();

    let delete = Command::text("DELETE FROM accounts");
    let err = helper.execute_non_query_in(&mut tx, &delete).await.unwrap_err();
    assert!(
        matches!(err, DbError::InvalidArgument { ref argument, .. } if argument == "transaction")
    );
    assert!(helper.execute_scalar_in(&mut tx, &delete).await.unwrap_err().is_invalid_argument());
    assert!(helper.execute_reader_in(&mut tx, &delete).await.unwrap_err().is_invalid_argument());
    assert!(tx.commit().await.unwrap_err().is_invalid_argument());
    drop(tx);
    conn.close().await.unwrap();

    assert_eq!(total(&helper, &url).await, json!(150));
}

#[tokio::test]
async fn test_use_transaction_is_ignored_inside_caller_transaction() {
    let (_dir, url, helper) = setup().await;
    let mut conn = helper.open_connection(&url, None).await.unwrap();
    let mut tx = conn.begin().await.unwrap();

    helper
        .execute_non_query_in(
            &mut tx,
            &Command::text("UPDATE accounts SET balance = 0").with_transaction(),
        )
        .await
        .unwrap();
    // Still the caller's transaction, so the caller can undo it.
    assert!(tx.is_active());
    tx.rollback().await.unwrap();
    drop(tx);
    conn.close().await.unwrap();

    assert_eq!(total(&helper, &url).await, json!(150));
}

#[tokio::test]
async fn test_reader_inside_caller_transaction() {
    let (_dir, url, helper) = setup().await;
    let mut conn = helper.open_connection(&url, None).await.unwrap();
    let mut tx = conn.begin().await.unwrap();

    helper
        .execute_non_query_in(&mut tx, &Command::text("INSERT INTO accounts (balance) VALUES (7)"))
        .await
        .unwrap();

    let rows = helper
        .execute_reader_in(&mut tx, &Command::text("SELECT balance FROM accounts ORDER BY id"))
        .await
        .unwrap()
        .collect_rows()
        .await
        .unwrap();
    let balances: Vec<_> = rows.iter().map(|r| r.get(0).unwrap()).collect();
    assert_eq!(balances, vec![json!(100), json!(50), json!(7)]);

    // The transaction is still usable once the reader is gone.
    assert!(tx.is_active());
    tx.rollback().await.unwrap();
}

#[tokio::test]
async fn test_dropped_transaction_rolls_back() {
    let (_dir, url, helper) = setup().await;
    let mut conn = helper.open_connection(&url, None).await.unwrap();
    {
        let mut tx = conn.begin().await.unwrap();
        helper
            .execute_non_query_in(&mut tx, &Command::text("DELETE FROM accounts"))
            .await
            .unwrap();
    }

    // Same connection: an uncommitted delete would still be visible here.
    let mut tx = conn.begin().await.unwrap();
    let count = helper
        .execute_scalar_in(&mut tx, &Command::text("SELECT COUNT(*) FROM accounts"))
        .await
        .unwrap();
    assert_eq!(count, Some(json!(2)));
    tx.rollback().await.unwrap();
    drop(tx);
    conn.close().await.unwrap();
}
