//! Command-related data models.
//!
//! This module defines the statement a caller wants executed: its text, kind,
//! parameters and execution options.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Default command timeout in seconds.
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u32 = 30;

/// Whether the command text is a raw statement or the name of a stored procedure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    #[default]
    Text,
    StoredProcedure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterDirection {
    #[default]
    Input,
    InputOutput,
    Output,
    ReturnValue,
}

impl ParameterDirection {
    /// Whether a value for this parameter is sent to the database.
    pub fn is_bound(&self) -> bool {
        matches!(self, Self::Input | Self::InputOutput)
    }
}

/// A parameter value for parameterized statements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// NULL value
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value (stored as i64 for maximum range)
    Int(i64),
    /// Floating point value
    Float(f64),
    /// String value
    String(String),
    /// Binary data (base64 encoded in JSON)
    #[serde(with = "base64_bytes")]
    Bytes(Vec<u8>),
}

impl ParamValue {
    /// Check if this parameter is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Get the type name of this parameter for debugging.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Bytes(_) => "bytes",
        }
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        Self::Int(v.into())
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<Vec<u8>> for ParamValue {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

impl<T: Into<ParamValue>> From<Option<T>> for ParamValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Self::Null)
    }
}

/// Custom serialization for binary data as base64.
mod base64_bytes {
    use base64::{Engine as _, engine::general_purpose::STANDARD};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(bytes: &Vec<u8>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        STANDARD.encode(bytes).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(&s).map_err(serde::de::Error::custom)
    }
}

/// A named statement parameter.
///
/// Binding is positional; the name is kept for logging and stored-procedure calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DbParameter {
    pub name: String,
    /// `None` means the caller never set a value.
    #[serde(default)]
    pub value: Option<ParamValue>,
    #[serde(default)]
    pub direction: ParameterDirection,
}

impl DbParameter {
    /// Create an input parameter.
    pub fn new(name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
            direction: ParameterDirection::Input,
        }
    }

    /// Create an input parameter with no value set.
    pub fn unset(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
            direction: ParameterDirection::Input,
        }
    }

    /// Create an output parameter.
    pub fn output(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
            direction: ParameterDirection::Output,
        }
    }

    pub fn with_direction(mut self, direction: ParameterDirection) -> Self {
        self.direction = direction;
        self
    }
}

/// A statement to execute plus its execution options.
#[derive(Debug, Clone)]
pub struct Command {
    pub kind: CommandKind,
    pub text: String,
    pub parameters: Vec<DbParameter>,
    /// Default: 30
    pub timeout_secs: u32,
    /// Wrap the statement in a helper-managed transaction.
    /// Ignored when the caller supplies a transaction.
    pub use_transaction: bool,
    pub cancellation: Option<CancellationToken>,
}

impl Command {
    /// Create a raw-text command with default options.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: CommandKind::Text,
            text: text.into(),
            parameters: Vec::new(),
            timeout_secs: DEFAULT_COMMAND_TIMEOUT_SECS,
            use_transaction: false,
            cancellation: None,
        }
    }

    /// Create a stored-procedure command with default options.
    pub fn stored_procedure(name: impl Into<String>) -> Self {
        Self {
            kind: CommandKind::StoredProcedure,
            ..Self::text(name)
        }
    }

    /// Add an input parameter.
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.parameters.push(DbParameter::new(name, value));
        self
    }

    /// Add a fully specified parameter.
    pub fn with_parameter(mut self, parameter: DbParameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Set the command timeout.
    pub fn with_timeout(mut self, timeout_secs: u32) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Wrap execution in a helper-managed transaction.
    pub fn with_transaction(mut self) -> Self {
        self.use_transaction = true;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs as u64)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMetadata {
    pub name: String,
    /// Database-specific type (e.g., "int8", "varchar", "TEXT")
    pub type_name: String,
    pub nullable: bool,
}

impl ColumnMetadata {
    /// Create new column metadata.
    pub fn new(name: impl Into<String>, type_name: impl Into<String>, nullable: bool) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            nullable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_value_types() {
        assert!(ParamValue::Null.is_null());
        assert!(!ParamValue::Bool(true).is_null());
        assert_eq!(ParamValue::Int(42).type_name(), "int");
        assert_eq!(ParamValue::from("hello").type_name(), "string");
        assert_eq!(ParamValue::from(None::<i64>), ParamValue::Null);
        assert_eq!(ParamValue::from(Some(7)), ParamValue::Int(7));
    }

    #[test]
    fn test_param_value_from_json() {
        let values: Vec<ParamValue> = serde_json::from_str(r#"[null, true, 3, 1.5, "x"]"#).unwrap();
        assert_eq!(
            values,
            vec![
                ParamValue::Null,
                ParamValue::Bool(true),
                ParamValue::Int(3),
                ParamValue::Float(1.5),
                ParamValue::String("x".to_string()),
            ]
        );
    }

    #[test]
    fn test_command_defaults() {
        let cmd = Command::text("SELECT 1");
        assert_eq!(cmd.kind, CommandKind::Text);
        assert_eq!(cmd.timeout_secs, DEFAULT_COMMAND_TIMEOUT_SECS);
        assert_eq!(cmd.timeout(), Duration::from_secs(30));
        assert!(!cmd.use_transaction);
        assert!(cmd.cancellation.is_none());
        assert!(cmd.parameters.is_empty());
    }

    #[test]
    fn test_command_builder() {
        let cmd = Command::stored_procedure("add_user")
            .with_param("name", "ada")
            .with_parameter(DbParameter::output("id"))
            .with_timeout(5)
            .with_transaction();

        assert_eq!(cmd.kind, CommandKind::StoredProcedure);
        assert_eq!(cmd.text, "add_user");
        assert_eq!(cmd.parameters.len(), 2);
        assert_eq!(cmd.parameters[1].direction, ParameterDirection::Output);
        assert_eq!(cmd.timeout_secs, 5);
        assert!(cmd.use_transaction);
    }

    #[test]
    fn test_parameter_direction_binding() {
        assert!(ParameterDirection::Input.is_bound());
        assert!(ParameterDirection::InputOutput.is_bound());
        assert!(!ParameterDirection::Output.is_bound());
        assert!(!ParameterDirection::ReturnValue.is_bound());
    }

    #[test]
    fn test_unset_parameter_has_no_value() {
        let p = DbParameter::unset("missing");
        assert!(p.value.is_none());
        assert_eq!(p.direction, ParameterDirection::Input);
    }
}
