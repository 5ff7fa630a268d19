//! Row decoding.
//!
//! Vendor rows are decoded into JSON values so callers get one value type no
//! matter which provider produced the row.
//!
//! Decoding uses a two-phase approach:
//! 1. `TypeCategory` classifies column types into logical categories
//! 2. Database-specific decoders handle the actual value extraction
//!
//! SQLite is dynamically typed, so its rows are classified by the runtime type
//! of each value rather than the declared column type.

use crate::models::{ColumnMetadata, DatabaseType};
use serde_json::Value as JsonValue;
use sqlx::mysql::{MySqlRow, MySqlTypeInfo, MySqlValueRef};
use sqlx::postgres::{PgRow, PgTypeInfo, PgValueRef};
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, ColumnIndex, Decode, Row, Type, TypeInfo, ValueRef};

// =============================================================================
// Type Classification
// =============================================================================

/// Logical category for database column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Integer,
    Float,
    Decimal,
    Boolean,
    Text,
    Binary,
    Json,
    Null,
}

/// Classify a database type name into a logical category.
pub fn categorize_type(type_name: &str, db: DatabaseType) -> TypeCategory {
    let lower = type_name.to_lowercase();

    if lower == "null" {
        return TypeCategory::Null;
    }

    // Decimal/Numeric - check first as it overlaps with "numeric" in float checks
    if lower.contains("decimal") || lower.contains("numeric") {
        // SQLite's NUMERIC is actually a float
        if db == DatabaseType::SQLite {
            return TypeCategory::Float;
        }
        return TypeCategory::Decimal;
    }

    if lower.contains("int") || lower.contains("serial") || lower.contains("tiny") {
        return TypeCategory::Integer;
    }

    if lower == "bool" || lower == "boolean" {
        return TypeCategory::Boolean;
    }

    if lower.contains("float") || lower.contains("double") || lower == "real" {
        return TypeCategory::Float;
    }

    if lower == "json" || lower == "jsonb" {
        return TypeCategory::Json;
    }

    if lower.contains("blob") || lower.contains("binary") || lower == "bytea" {
        return TypeCategory::Binary;
    }

    // varchar, text, char, date, time, uuid, ...
    TypeCategory::Text
}

// =============================================================================
// Decimal Type Support
// =============================================================================

/// Raw DECIMAL/NUMERIC value kept as its exact string representation.
#[derive(Debug)]
pub struct RawDecimal(pub String);

impl Type<sqlx::MySql> for RawDecimal {
    fn type_info() -> MySqlTypeInfo {
        <String as Type<sqlx::MySql>>::type_info()
    }

    fn compatible(ty: &MySqlTypeInfo) -> bool {
        let name = ty.name().to_lowercase();
        name.contains("decimal") || name.contains("numeric")
    }
}

impl<'r> Decode<'r, sqlx::MySql> for RawDecimal {
    fn decode(value: MySqlValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as Decode<sqlx::MySql>>::decode(value)?;
        Ok(RawDecimal(s.to_string()))
    }
}

impl Type<sqlx::Postgres> for RawDecimal {
    fn type_info() -> PgTypeInfo {
        <String as Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &PgTypeInfo) -> bool {
        let name = ty.name().to_lowercase();
        name.contains("numeric") || name.contains("decimal")
    }
}

impl<'r> Decode<'r, sqlx::Postgres> for RawDecimal {
    fn decode(value: PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as Decode<sqlx::Postgres>>::decode(value)?;
        Ok(RawDecimal(s.to_string()))
    }
}

// =============================================================================
// Binary Encoding
// =============================================================================

/// Decode binary data to JSON value.
///
/// If `decode_binary` is true, attempts to decode as UTF-8 text first.
/// Falls back to base64 encoding if not valid UTF-8 or if `decode_binary` is false.
pub fn decode_binary_value(bytes: &[u8], decode_binary: bool) -> JsonValue {
    use base64::{Engine as _, engine::general_purpose::STANDARD};

    match std::str::from_utf8(bytes) {
        Ok(s) if decode_binary => JsonValue::String(s.to_string()),
        _ => JsonValue::String(STANDARD.encode(bytes)),
    }
}

// =============================================================================
// Shared Decoders
// =============================================================================

fn get_opt<'r, R, T>(row: &'r R, idx: usize) -> Option<T>
where
    R: Row,
    usize: ColumnIndex<R>,
    T: Decode<'r, R::Database> + Type<R::Database>,
{
    row.try_get::<Option<T>, _>(idx).ok().flatten()
}

fn float_json(v: f64) -> JsonValue {
    serde_json::Number::from_f64(v)
        .map(JsonValue::Number)
        .unwrap_or_else(|| JsonValue::String(v.to_string()))
}

fn decode_boolean<R>(row: &R, idx: usize) -> JsonValue
where
    R: Row,
    usize: ColumnIndex<R>,
    for<'r> bool: Decode<'r, R::Database> + Type<R::Database>,
{
    get_opt::<R, bool>(row, idx)
        .map(JsonValue::Bool)
        .unwrap_or(JsonValue::Null)
}

fn decode_float<R>(row: &R, idx: usize) -> JsonValue
where
    R: Row,
    usize: ColumnIndex<R>,
    for<'r> f64: Decode<'r, R::Database> + Type<R::Database>,
    for<'r> f32: Decode<'r, R::Database> + Type<R::Database>,
{
    if let Some(v) = get_opt::<R, f64>(row, idx) {
        return float_json(v);
    }
    get_opt::<R, f32>(row, idx)
        .map(|v| float_json(v as f64))
        .unwrap_or(JsonValue::Null)
}

fn decode_bytes<R>(row: &R, idx: usize, as_text: bool) -> JsonValue
where
    R: Row,
    usize: ColumnIndex<R>,
    for<'r> Vec<u8>: Decode<'r, R::Database> + Type<R::Database>,
{
    get_opt::<R, Vec<u8>>(row, idx)
        .map(|v| decode_binary_value(&v, as_text))
        .unwrap_or(JsonValue::Null)
}

fn decode_text<R>(row: &R, idx: usize, category: TypeCategory) -> JsonValue
where
    R: Row,
    usize: ColumnIndex<R>,
    for<'r> String: Decode<'r, R::Database> + Type<R::Database>,
{
    match get_opt::<R, String>(row, idx) {
        // JSON stored as text is returned as structured JSON when it parses
        Some(v) if category == TypeCategory::Json => {
            serde_json::from_str(&v).unwrap_or(JsonValue::String(v))
        }
        Some(v) => JsonValue::String(v),
        None => JsonValue::Null,
    }
}

// =============================================================================
// Row Decoding Trait
// =============================================================================

/// Decode vendor rows into JSON.
pub trait DecodeRow {
    /// Decode the value of column `idx`. Out-of-range columns decode as NULL.
    fn value_at(&self, idx: usize, decode_binary: bool) -> JsonValue;

    fn column_metadata(&self) -> Vec<ColumnMetadata>;

    fn column_count(&self) -> usize;

    fn column_names(&self) -> Vec<String> {
        self.column_metadata().into_iter().map(|c| c.name).collect()
    }

    fn to_json_map(&self, decode_binary: bool) -> serde_json::Map<String, JsonValue> {
        self.column_metadata()
            .into_iter()
            .enumerate()
            .map(|(idx, col)| (col.name, self.value_at(idx, decode_binary)))
            .collect()
    }
}

fn metadata_of<R: Row>(row: &R) -> Vec<ColumnMetadata> {
    row.columns()
        .iter()
        .map(|col| {
            // Result rows carry no nullability information
            ColumnMetadata::new(col.name(), col.type_info().name(), true)
        })
        .collect()
}

impl DecodeRow for MySqlRow {
    fn value_at(&self, idx: usize, decode_binary: bool) -> JsonValue {
        let Some(col) = self.columns().get(idx) else {
            return JsonValue::Null;
        };
        let category = categorize_type(col.type_info().name(), DatabaseType::MySQL);
        match category {
            TypeCategory::Decimal => decode_decimal(self, idx),
            TypeCategory::Integer => mysql::decode_integer(self, idx),
            TypeCategory::Boolean => decode_boolean(self, idx),
            TypeCategory::Float => decode_float(self, idx),
            TypeCategory::Binary => decode_bytes(self, idx, decode_binary),
            // MySQL JSON decodes directly to a JSON value
            TypeCategory::Json => get_opt::<_, JsonValue>(self, idx).unwrap_or(JsonValue::Null),
            TypeCategory::Null => JsonValue::Null,
            TypeCategory::Text => decode_text(self, idx, category),
        }
    }

    fn column_metadata(&self) -> Vec<ColumnMetadata> {
        metadata_of(self)
    }

    fn column_count(&self) -> usize {
        self.columns().len()
    }
}

impl DecodeRow for PgRow {
    fn value_at(&self, idx: usize, decode_binary: bool) -> JsonValue {
        let Some(col) = self.columns().get(idx) else {
            return JsonValue::Null;
        };
        let category = categorize_type(col.type_info().name(), DatabaseType::PostgreSQL);
        match category {
            TypeCategory::Decimal => decode_decimal(self, idx),
            TypeCategory::Integer => postgres::decode_integer(self, idx),
            TypeCategory::Boolean => decode_boolean(self, idx),
            TypeCategory::Float => decode_float(self, idx),
            TypeCategory::Binary => decode_bytes(self, idx, decode_binary),
            TypeCategory::Json => get_opt::<_, JsonValue>(self, idx).unwrap_or(JsonValue::Null),
            TypeCategory::Null => JsonValue::Null,
            TypeCategory::Text => decode_text(self, idx, category),
        }
    }

    fn column_metadata(&self) -> Vec<ColumnMetadata> {
        metadata_of(self)
    }

    fn column_count(&self) -> usize {
        self.columns().len()
    }
}

impl DecodeRow for SqliteRow {
    fn value_at(&self, idx: usize, decode_binary: bool) -> JsonValue {
        let Some(col) = self.columns().get(idx) else {
            return JsonValue::Null;
        };
        let declared = categorize_type(col.type_info().name(), DatabaseType::SQLite);
        let runtime = match self.try_get_raw(idx) {
            Ok(value) if value.is_null() => return JsonValue::Null,
            Ok(value) => categorize_type(value.type_info().name(), DatabaseType::SQLite),
            Err(_) => return JsonValue::Null,
        };
        // Booleans are stored as integers; keep the declared intent
        let category = match declared {
            TypeCategory::Boolean | TypeCategory::Json => declared,
            _ => runtime,
        };
        match category {
            TypeCategory::Integer => get_opt::<_, i64>(self, idx)
                .map(|v| JsonValue::Number(v.into()))
                .unwrap_or(JsonValue::Null),
            TypeCategory::Boolean => decode_boolean(self, idx),
            TypeCategory::Float | TypeCategory::Decimal => decode_float(self, idx),
            TypeCategory::Binary => decode_bytes(self, idx, decode_binary),
            TypeCategory::Null => JsonValue::Null,
            TypeCategory::Text | TypeCategory::Json => decode_text(self, idx, category),
        }
    }

    fn column_metadata(&self) -> Vec<ColumnMetadata> {
        metadata_of(self)
    }

    fn column_count(&self) -> usize {
        self.columns().len()
    }
}

fn decode_decimal<R>(row: &R, idx: usize) -> JsonValue
where
    R: Row,
    usize: ColumnIndex<R>,
    for<'r> RawDecimal: Decode<'r, R::Database> + Type<R::Database>,
{
    match row.try_get::<Option<RawDecimal>, _>(idx) {
        Ok(Some(v)) => JsonValue::String(v.0),
        Ok(None) => JsonValue::Null,
        Err(e) => {
            tracing::error!("Failed to decode DECIMAL: {:?}", e);
            JsonValue::Null
        }
    }
}

// =============================================================================
// Database-Specific Integer Decoders
// =============================================================================

mod mysql {
    use super::*;

    pub fn decode_integer(row: &MySqlRow, idx: usize) -> JsonValue {
        if let Ok(None) = row.try_get::<Option<i64>, _>(idx) {
            return JsonValue::Null;
        }
        if let Some(v) = get_opt::<_, i8>(row, idx) {
            return JsonValue::Number(v.into());
        }
        if let Some(v) = get_opt::<_, i16>(row, idx) {
            return JsonValue::Number(v.into());
        }
        if let Some(v) = get_opt::<_, i32>(row, idx) {
            return JsonValue::Number(v.into());
        }
        if let Some(v) = get_opt::<_, i64>(row, idx) {
            return JsonValue::Number(v.into());
        }
        // Unsigned columns
        if let Some(v) = get_opt::<_, u64>(row, idx) {
            return JsonValue::Number(v.into());
        }
        JsonValue::Null
    }
}

mod postgres {
    use super::*;

    pub fn decode_integer(row: &PgRow, idx: usize) -> JsonValue {
        if let Some(v) = get_opt::<_, i16>(row, idx) {
            return JsonValue::Number(v.into());
        }
        if let Some(v) = get_opt::<_, i32>(row, idx) {
            return JsonValue::Number(v.into());
        }
        get_opt::<_, i64>(row, idx)
            .map(|v| JsonValue::Number(v.into()))
            .unwrap_or(JsonValue::Null)
    }
}

// =============================================================================
// Provider-Neutral Row
// =============================================================================

/// A row produced by a reader, from any supported provider.
pub enum DbRow {
    MySql(MySqlRow),
    Postgres(PgRow),
    SQLite(SqliteRow),
}

impl DbRow {
    pub fn db_type(&self) -> DatabaseType {
        match self {
            DbRow::MySql(_) => DatabaseType::MySQL,
            DbRow::Postgres(_) => DatabaseType::PostgreSQL,
            DbRow::SQLite(_) => DatabaseType::SQLite,
        }
    }

    fn inner(&self) -> &dyn DecodeRow {
        match self {
            DbRow::MySql(r) => r,
            DbRow::Postgres(r) => r,
            DbRow::SQLite(r) => r,
        }
    }

    /// Value of column `idx`, or `None` if the row has no such column.
    pub fn get(&self, idx: usize) -> Option<JsonValue> {
        let row = self.inner();
        (idx < row.column_count()).then(|| row.value_at(idx, false))
    }

    /// Value of the column named `name`.
    pub fn get_by_name(&self, name: &str) -> Option<JsonValue> {
        let idx = self.columns().iter().position(|c| c == name)?;
        self.get(idx)
    }

    pub fn columns(&self) -> Vec<String> {
        self.inner().column_names()
    }

    pub fn column_metadata(&self) -> Vec<ColumnMetadata> {
        self.inner().column_metadata()
    }

    pub fn len(&self) -> usize {
        self.inner().column_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn to_json_map(&self, decode_binary: bool) -> serde_json::Map<String, JsonValue> {
        self.inner().to_json_map(decode_binary)
    }
}

impl std::fmt::Debug for DbRow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbRow")
            .field("db_type", &self.db_type())
            .field("values", &self.to_json_map(false))
            .finish()
    }
}
