//! Database-agnostic type mappings.
//!
//! This module decodes database rows into JSON maps keyed by column name. The
//! repository turns those maps into record types with `serde`.
//!
//! # Architecture
//!
//! Type conversion uses a two-phase approach:
//! 1. `TypeCategory` classifies column types into logical categories
//! 2. Database-specific decoders handle the actual value extraction
//!
//! Timestamps are rendered as RFC 3339 strings in UTC and binary columns as
//! arrays of byte values, which is what `chrono` and `Vec<u8>` deserialize from.

use crate::models::Dialect;
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde_json::Value as JsonValue;
use sqlx::mysql::{MySqlRow, MySqlTypeInfo, MySqlValueRef};
use sqlx::postgres::{PgRow, PgTypeInfo, PgValueRef};
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Decode, Row, Type, TypeInfo, ValueRef};

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
    Timestamp,
    Unknown,
}

/// Classify a database type name into a logical category.
pub fn categorize_type(type_name: &str, dialect: Dialect) -> TypeCategory {
    let lower = type_name.to_lowercase();

    // Decimal/Numeric - check first as it overlaps with "numeric" in float checks
    if lower.contains("decimal") || lower.contains("numeric") {
        // SQLite's NUMERIC is actually a float
        if dialect == Dialect::SQLite && lower == "numeric" {
            return TypeCategory::Float;
        }
        return TypeCategory::Decimal;
    }

    if lower.starts_with("timestamp") || lower == "datetime" {
        return TypeCategory::Timestamp;
    }

    // Integer types
    if lower.contains("int") || lower.contains("serial") || lower.contains("tiny") {
        return TypeCategory::Integer;
    }

    // Boolean
    if lower == "bool" || lower == "boolean" {
        return TypeCategory::Boolean;
    }

    // Float types
    if lower.contains("float")
        || lower.contains("double")
        || lower == "real"
        || lower == "float4"
        || lower == "float8"
    {
        return TypeCategory::Float;
    }

    // JSON types
    if lower == "json" || lower == "jsonb" {
        return TypeCategory::Json;
    }

    // Binary types
    if lower.contains("blob") || lower.contains("binary") || lower == "bytea" {
        return TypeCategory::Binary;
    }

    if lower.contains("char") || lower == "text" {
        return TypeCategory::Text;
    }

    // Everything else (date, time, enum, ...) is read as text
    TypeCategory::Unknown
}

// =============================================================================
// Decimal Type Support
// =============================================================================

/// Wrapper type for raw DECIMAL/NUMERIC values as strings.
/// This preserves the exact database representation.
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
// Shared Encoders
// =============================================================================

/// Binary data as a JSON array of byte values.
pub fn binary_to_json(bytes: &[u8]) -> JsonValue {
    JsonValue::Array(bytes.iter().map(|b| JsonValue::from(*b)).collect())
}

/// A UTC timestamp as an RFC 3339 string.
pub fn timestamp_to_json(ts: DateTime<Utc>) -> JsonValue {
    JsonValue::String(ts.to_rfc3339_opts(SecondsFormat::AutoSi, true))
}

fn float_to_json(v: f64) -> JsonValue {
    serde_json::Number::from_f64(v)
        .map(JsonValue::Number)
        .unwrap_or_else(|| JsonValue::String(v.to_string()))
}

// =============================================================================
// Row to JSON Trait
// =============================================================================

/// Trait for converting database rows to JSON maps.
pub trait RowToJson {
    fn to_json_map(&self) -> serde_json::Map<String, JsonValue>;
}

macro_rules! impl_row_to_json {
    ($row:ty, $dialect:expr, $decoder:ident) => {
        impl RowToJson for $row {
            fn to_json_map(&self) -> serde_json::Map<String, JsonValue> {
                self.columns()
                    .iter()
                    .enumerate()
                    .map(|(idx, col)| {
                        let category = categorize_type(col.type_info().name(), $dialect);
                        (col.name().to_string(), $decoder::decode_column(self, idx, category))
                    })
                    .collect()
            }
        }
    };
}

impl_row_to_json!(MySqlRow, Dialect::MySql, mysql);
impl_row_to_json!(PgRow, Dialect::Postgres, postgres);
impl_row_to_json!(SqliteRow, Dialect::SQLite, sqlite);

/// Decode column `$idx` as the first listed type the driver accepts.
///
/// NULL maps to `JsonValue::Null`; a column no listed type accepts does too.
macro_rules! decode_first {
    ($row:expr, $idx:expr, $to_json:expr, [$($ty:ty),+ $(,)?]) => {{
        let mut value: Option<JsonValue> = None;
        $(
            if value.is_none() {
                if let Ok(v) = $row.try_get::<Option<$ty>, _>($idx) {
                    value = Some(v.map($to_json).unwrap_or(JsonValue::Null));
                }
            }
        )+
        value.unwrap_or(JsonValue::Null)
    }};
}

/// Timestamp types the drivers hand back, normalized to UTC.
trait AsUtc {
    fn as_utc(self) -> DateTime<Utc>;
}

impl AsUtc for DateTime<Utc> {
    fn as_utc(self) -> DateTime<Utc> {
        self
    }
}

impl AsUtc for NaiveDateTime {
    fn as_utc(self) -> DateTime<Utc> {
        self.and_utc()
    }
}

// =============================================================================
// Database-Specific Decoders
// =============================================================================
//
// One `decode_column` per database; the lists name the Rust types tried for
// each category, narrowest first.

mod mysql {
    use super::*;

    pub fn decode_column(row: &MySqlRow, idx: usize, category: TypeCategory) -> JsonValue {
        match category {
            TypeCategory::Decimal => {
                decode_first!(row, idx, |v: RawDecimal| JsonValue::String(v.0), [RawDecimal])
            }
            TypeCategory::Integer => decode_first!(
                row,
                idx,
                JsonValue::from,
                [i8, i16, i32, i64, u8, u16, u32, u64]
            ),
            TypeCategory::Boolean => decode_first!(row, idx, JsonValue::Bool, [bool]),
            TypeCategory::Float => {
                decode_first!(row, idx, |v| float_to_json(f64::from(v)), [f64, f32])
            }
            TypeCategory::Binary => {
                decode_first!(row, idx, |v: Vec<u8>| binary_to_json(&v), [Vec<u8>])
            }
            TypeCategory::Json => decode_first!(row, idx, |v| v, [JsonValue]),
            TypeCategory::Timestamp => decode_first!(
                row,
                idx,
                |v| timestamp_to_json(AsUtc::as_utc(v)),
                [DateTime<Utc>, NaiveDateTime]
            ),
            TypeCategory::Text | TypeCategory::Unknown => {
                decode_first!(row, idx, JsonValue::String, [String])
            }
        }
    }
}

mod postgres {
    use super::*;

    pub fn decode_column(row: &PgRow, idx: usize, category: TypeCategory) -> JsonValue {
        match category {
            TypeCategory::Decimal => {
                decode_first!(row, idx, |v: RawDecimal| JsonValue::String(v.0), [RawDecimal])
            }
            TypeCategory::Integer => decode_first!(row, idx, JsonValue::from, [i16, i32, i64]),
            TypeCategory::Boolean => decode_first!(row, idx, JsonValue::Bool, [bool]),
            TypeCategory::Float => {
                decode_first!(row, idx, |v| float_to_json(f64::from(v)), [f64, f32])
            }
            TypeCategory::Binary => {
                decode_first!(row, idx, |v: Vec<u8>| binary_to_json(&v), [Vec<u8>])
            }
            TypeCategory::Json => decode_first!(row, idx, |v| v, [JsonValue]),
            // TIMESTAMPTZ decodes as DateTime<Utc>, TIMESTAMP only as NaiveDateTime
            TypeCategory::Timestamp => decode_first!(
                row,
                idx,
                |v| timestamp_to_json(AsUtc::as_utc(v)),
                [DateTime<Utc>, NaiveDateTime]
            ),
            TypeCategory::Text | TypeCategory::Unknown => {
                decode_first!(row, idx, JsonValue::String, [String])
            }
        }
    }
}

mod sqlite {
    use super::*;

    pub fn decode_column(row: &SqliteRow, idx: usize, category: TypeCategory) -> JsonValue {
        match category {
            TypeCategory::Integer => decode_first!(row, idx, JsonValue::from, [i64, i32]),
            TypeCategory::Boolean => decode_first!(row, idx, JsonValue::Bool, [bool]),
            TypeCategory::Float | TypeCategory::Decimal => {
                decode_first!(row, idx, float_to_json, [f64])
            }
            TypeCategory::Binary => {
                decode_first!(row, idx, |v: Vec<u8>| binary_to_json(&v), [Vec<u8>])
            }
            // Values written outside this crate may not parse; keep the text
            TypeCategory::Timestamp => match decode_first!(
                row,
                idx,
                |v| timestamp_to_json(AsUtc::as_utc(v)),
                [DateTime<Utc>, NaiveDateTime]
            ) {
                JsonValue::Null => decode_first!(row, idx, JsonValue::String, [String]),
                value => value,
            },
            // JSON is stored as TEXT and parsed against the model's columns
            TypeCategory::Json | TypeCategory::Text => {
                decode_first!(row, idx, JsonValue::String, [String])
            }
            // Expression columns (COUNT(*), ...) have no declared type; use the stored one
            TypeCategory::Unknown => match stored_category(row, idx) {
                Some(c @ (TypeCategory::Integer | TypeCategory::Float | TypeCategory::Binary)) => {
                    decode_column(row, idx, c)
                }
                _ => decode_first!(row, idx, JsonValue::String, [String]),
            },
        }
    }

    fn stored_category(row: &SqliteRow, idx: usize) -> Option<TypeCategory> {
        let raw = row.try_get_raw(idx).ok()?;
        Some(categorize_type(raw.type_info().name(), Dialect::SQLite))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_categorize_type_integer() {
        assert_eq!(
            categorize_type("INT", Dialect::MySql),
            TypeCategory::Integer
        );
        assert_eq!(
            categorize_type("BIGINT", Dialect::Postgres),
            TypeCategory::Integer
        );
        assert_eq!(
            categorize_type("INT8", Dialect::Postgres),
            TypeCategory::Integer
        );
        assert_eq!(
            categorize_type("INTEGER", Dialect::SQLite),
            TypeCategory::Integer
        );
    }

    #[test]
    fn test_categorize_type_decimal() {
        assert_eq!(
            categorize_type("DECIMAL", Dialect::MySql),
            TypeCategory::Decimal
        );
        assert_eq!(
            categorize_type("NUMERIC", Dialect::Postgres),
            TypeCategory::Decimal
        );
        // SQLite NUMERIC is a float
        assert_eq!(
            categorize_type("numeric", Dialect::SQLite),
            TypeCategory::Float
        );
    }

    #[test]
    fn test_categorize_type_timestamp() {
        assert_eq!(
            categorize_type("TIMESTAMPTZ", Dialect::Postgres),
            TypeCategory::Timestamp
        );
        assert_eq!(
            categorize_type("TIMESTAMP", Dialect::Postgres),
            TypeCategory::Timestamp
        );
        assert_eq!(
            categorize_type("DATETIME", Dialect::MySql),
            TypeCategory::Timestamp
        );
        assert_eq!(
            categorize_type("DATETIME", Dialect::SQLite),
            TypeCategory::Timestamp
        );
    }

    #[test]
    fn test_categorize_type_other() {
        assert_eq!(
            categorize_type("jsonb", Dialect::Postgres),
            TypeCategory::Json
        );
        assert_eq!(
            categorize_type("BYTEA", Dialect::Postgres),
            TypeCategory::Binary
        );
        assert_eq!(
            categorize_type("VARCHAR", Dialect::MySql),
            TypeCategory::Text
        );
        assert_eq!(
            categorize_type("BOOLEAN", Dialect::SQLite),
            TypeCategory::Boolean
        );
        assert_eq!(
            categorize_type("DATE", Dialect::Postgres),
            TypeCategory::Unknown
        );
    }

    #[test]
    fn test_binary_to_json() {
        assert_eq!(binary_to_json(&[1, 2, 255]), serde_json::json!([1, 2, 255]));
        assert_eq!(binary_to_json(&[]), serde_json::json!([]));
    }

    #[test]
    fn test_timestamp_to_json_is_rfc3339_utc() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
        assert_eq!(
            timestamp_to_json(ts),
            JsonValue::String("2024-03-01T12:30:00Z".to_string())
        );
    }
}
