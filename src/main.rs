//! db-helpers - Main entry point.
//!
//! Runs one statement through the helper layer and prints the result as JSON.

use clap::Parser;
use db_helpers::config::{Action, Config};
use db_helpers::db::AdoHelper;
use db_helpers::error::DbResult;
use db_helpers::models::mask_connection_string;
use db_helpers::vendor::{SqlCeHelper, param_string};
use serde_json::{Value as JsonValue, json};
use tracing::{debug, error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    // Logs go to stderr; stdout carries the JSON result.
    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

/// Helper for one connection string, logged in masked form.
fn helper_for(config: &Config, connection_string: &str) -> DbResult<AdoHelper> {
    let helper = config.helper_for(connection_string)?;
    info!(
        db_type = %helper.database_type(),
        connection = %mask_connection_string(connection_string),
        "Using database"
    );
    Ok(helper)
}

async fn run(config: &Config) -> DbResult<JsonValue> {
    let options = config.connection_options();

    match &config.action {
        Action::NonQuery {
            statement,
            transaction,
        } => {
            let mut command = statement.to_command(config.timeout)?;
            if *transaction {
                command = command.with_transaction();
            }
            let cs = options.write_connection_string();
            let rows_affected = helper_for(config, cs)?.execute_non_query(cs, &command).await?;
            Ok(json!({ "rows_affected": rows_affected }))
        }
        Action::Scalar { statement } => {
            let command = statement.to_command(config.timeout)?;
            let cs = options.read_connection_string();
            let value = helper_for(config, cs)?.execute_scalar(cs, &command).await?;
            Ok(json!({ "value": value }))
        }
        Action::Reader {
            statement,
            decode_binary,
        } => {
            let command = statement.to_command(config.timeout)?;
            let cs = options.read_connection_string();
            let mut reader = helper_for(config, cs)?.execute_reader(cs, &command).await?;
            let mut rows = Vec::new();
            while let Some(row) = reader.next_row().await? {
                rows.push(JsonValue::Object(row.to_json_map(*decode_binary)));
            }
            let row_count = rows.len();
            debug!(row_count, "Reader exhausted");
            Ok(json!({ "rows": rows, "row_count": row_count }))
        }
        Action::Identity {
            statement,
            identity_query,
        } => {
            let command = statement.to_command(config.timeout)?;
            let cs = options.write_connection_string();
            let sqlce = SqlCeHelper::from_helper(helper_for(config, cs)?)
                .with_identity_query(identity_query.as_str());
            let identity = sqlce.insert_get_identity(cs, &command).await?;
            Ok(json!({ "identity": identity }))
        }
        Action::ParamString { count } => Ok(json!(param_string(*count)?)),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse configuration from command line and environment
    let config = Config::parse();

    // Initialize logging
    init_tracing(&config);

    match run(&config).await {
        Ok(output) => {
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }
        Err(e) => {
            error!(
                error = %e,
                sql_state = ?e.sql_state(),
                suggestion = ?e.suggestion(),
                "Command failed"
            );
            Err(e.into())
        }
    }
}
