//! Command preparation.
//!
//! Turns a caller's `Command` into the exact SQL text and ordered values that
//! will be sent to the driver.

use crate::error::{DbError, DbResult};
use crate::models::{Command, CommandKind, DatabaseType, ParamValue};
use tracing::debug;

/// A validated statement ready to be bound and executed.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedCommand {
    pub sql: String,
    pub params: Vec<ParamValue>,
}

impl PreparedCommand {
    /// Validate `command` and build the statement for `db_type`.
    pub fn prepare(command: &Command, db_type: DatabaseType) -> DbResult<Self> {
        if command.text.trim().is_empty() {
            return Err(DbError::invalid_argument(
                "command_text",
                "Command text must not be empty",
            ));
        }

        let params = attach_parameters(command);
        let sql = match command.kind {
            CommandKind::Text => command.text.clone(),
            CommandKind::StoredProcedure => {
                procedure_call(&command.text, params.len(), db_type)?
            }
        };

        Ok(Self { sql, params })
    }
}

/// Collect the values to bind, in order.
///
/// Input and input/output parameters without a value are sent as an explicit
/// NULL; some drivers reject a missing value for these directions. Output and
/// return-value parameters are not bound.
fn attach_parameters(command: &Command) -> Vec<ParamValue> {
    command
        .parameters
        .iter()
        .filter_map(|p| {
            if !p.direction.is_bound() {
                debug!(
                    name = %p.name,
                    direction = ?p.direction,
                    "Skipping unbound parameter"
                );
                return None;
            }
            Some(p.value.clone().unwrap_or(ParamValue::Null))
        })
        .collect()
}

/// Build the call statement for a stored procedure.
fn procedure_call(name: &str, arg_count: usize, db_type: DatabaseType) -> DbResult<String> {
    let placeholders: Vec<String> = match db_type {
        DatabaseType::MySQL => vec!["?".to_string(); arg_count],
        DatabaseType::PostgreSQL => (1..=arg_count).map(|i| format!("${}", i)).collect(),
        DatabaseType::SQLite => {
            return Err(DbError::unsupported("stored procedures", db_type.to_string()));
        }
    };
    Ok(format!("CALL {}({})", name.trim(), placeholders.join(", ")))
}
