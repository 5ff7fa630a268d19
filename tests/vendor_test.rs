//! Integration tests for the per-vendor helpers.

use db_helpers::db::{AdoHelper, BlockingAdoHelper, SqlxProviderFactory};
use db_helpers::models::{Command, ConnectionStringOptions};
use db_helpers::vendor::sqlce::NO_IDENTITY;
use db_helpers::vendor::{
    FirebirdHelper, MssqlConnectionOptions, SqlCeHelper, SqliteConnectionOptions,
    SqliteConnectionStringResolver, param_string,
};
use serde_json::json;
use std::path::MAIN_SEPARATOR;
use std::sync::Arc;
use tempfile::TempDir;

async fn identity_setup() -> (TempDir, String, SqlCeHelper) {
    let dir = TempDir::new().unwrap();
    let url = format!("sqlite:{}?mode=rwc", dir.path().join("identity.db").display());
    let helper = AdoHelper::new(Arc::new(SqlxProviderFactory::sqlite()));
    helper
        .execute_non_query(
            &url,
            &Command::text("CREATE TABLE items (id INTEGER PRIMARY KEY AUTOINCREMENT, label TEXT)"),
        )
        .await
        .unwrap();
    helper
        .execute_non_query(&url, &Command::text("INSERT INTO items (label) VALUES ('a'), ('b')"))
        .await
        .unwrap();
    let sqlce = SqlCeHelper::from_helper(helper).with_identity_query("SELECT last_insert_rowid()");
    (dir, url, sqlce)
}

#[tokio::test]
async fn test_insert_get_identity_uses_same_connection() {
    let (_dir, url, sqlce) = identity_setup().await;
    let identity = sqlce
        .insert_get_identity(
            &url,
            &Command::text("INSERT INTO items (label) VALUES (?)").with_param("label", "c"),
        )
        .await
        .unwrap();
    // last_insert_rowid() is per connection; a fresh connection would report 0.
    assert_eq!(identity, json!(3));
}

#[tokio::test]
async fn test_insert_get_identity_skips_query_when_nothing_inserted() {
    let (_dir, url, sqlce) = identity_setup().await;
    // Would fail if it were ever executed.
    let sqlce = sqlce.with_identity_query("SELECT * FROM no_such_table");
    let identity = sqlce
        .insert_get_identity(
            &url,
            &Command::text("INSERT INTO items (label) SELECT label FROM items WHERE 0"),
        )
        .await
        .unwrap();
    assert_eq!(identity, json!(NO_IDENTITY));
    assert_eq!(identity, json!(-1));
}

#[tokio::test]
async fn test_insert_get_identity_propagates_insert_errors() {
    let (_dir, url, sqlce) = identity_setup().await;
    let err = sqlce
        .insert_get_identity(&url, &Command::text("INSERT INTO missing (x) VALUES (1)"))
        .await
        .unwrap_err();
    assert!(err.sql_state().is_some() || err.to_string().contains("no such table"));
    assert!(
        sqlce
            .insert_get_identity("", &Command::text("INSERT INTO items DEFAULT VALUES"))
            .await
            .unwrap_err()
            .is_invalid_argument()
    );
}

#[test]
fn test_insert_get_identity_blocking() {
    let dir = TempDir::new().unwrap();
    let url = format!("sqlite:{}?mode=rwc", dir.path().join("blocking.db").display());
    let runtime = BlockingAdoHelper::new(Arc::new(SqlxProviderFactory::sqlite())).unwrap();
    runtime
        .execute_non_query(&url, &Command::text("CREATE TABLE t (id INTEGER PRIMARY KEY, v TEXT)"))
        .unwrap();

    let sqlce = SqlCeHelper::from_helper(runtime.helper().clone())
        .with_identity_query("SELECT last_insert_rowid()");
    let first = sqlce
        .insert_get_identity_blocking(&runtime, &url, &Command::text("INSERT INTO t (v) VALUES ('x')"))
        .unwrap();
    let second = sqlce
        .insert_get_identity_blocking(&runtime, &url, &Command::text("INSERT INTO t (v) VALUES ('y')"))
        .unwrap();
    assert_eq!(first, json!(1));
    assert_eq!(second, json!(2));
}

#[test]
fn test_firebird_param_string() {
    assert_eq!(param_string(0).unwrap(), "");
    assert_eq!(param_string(1).unwrap(), "?");
    assert_eq!(param_string(3).unwrap(), "?,?,?");
    assert!(param_string(i64::MAX).unwrap_err().is_invalid_argument());

    let firebird = FirebirdHelper::new(Arc::new(SqlxProviderFactory::sqlite()));
    let sql = format!("INSERT INTO t VALUES ({})", firebird.param_string(4).unwrap());
    assert_eq!(sql, "INSERT INTO t VALUES (?,?,?,?)");
}

#[test]
fn test_mssql_options_fallback_and_prefix() {
    let options = MssqlConnectionOptions::new(
        ConnectionStringOptions::new("mssql://primary").with_read("   "),
    );
    assert_eq!(options.read_connection_string(), "mssql://primary");
    assert_eq!(options.write_connection_string(), "mssql://primary");
    assert_eq!(options.qualify("mp_Sites"), "[dbo].mp_Sites");
}

#[test]
fn test_sqlite_resolver() {
    let explicit = SqliteConnectionStringResolver::new(
        "/app",
        SqliteConnectionOptions::default().with_connection_string("sqlite:/data/custom.db"),
    );
    assert_eq!(explicit.resolve(), "sqlite:/data/custom.db");
    assert!(explicit.sqlite_file_path().is_empty());

    let derived = SqliteConnectionStringResolver::new("/app", SqliteConnectionOptions::default());
    let expected_path = format!(
        "/app{sep}config{sep}sqlitedb{sep}sqlite.db",
        sep = MAIN_SEPARATOR
    );
    assert_eq!(derived.sqlite_file_path(), expected_path);
    assert_eq!(derived.resolve(), format!("sqlite:{}", expected_path));
}

#[tokio::test]
async fn test_resolved_sqlite_path_opens() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().display().to_string();
    std::fs::create_dir_all(dir.path().join("config").join("sqlitedb")).unwrap();

    let resolver = SqliteConnectionStringResolver::new(root, SqliteConnectionOptions::default());
    let url = resolver.resolve();
    let helper =
        AdoHelper::new(Arc::new(SqlxProviderFactory::sqlite().create_if_missing(true)));
    let value = helper
        .execute_scalar(&url, &Command::text("SELECT 1 + 1"))
        .await
        .unwrap();
    assert_eq!(value, Some(json!(2)));
    assert!(std::path::Path::new(&resolver.sqlite_file_path()).exists());
}
