//! Conversions between records, JSON maps and bound parameters.

use crate::db::JsonRow;
use crate::db::types::timestamp_to_json;
use crate::error::{DbError, DbResult};
use crate::models::{ColumnDef, ColumnType, Model, QueryParam};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value as JsonValue;

/// Text timestamp layouts SQLite and MySQL hand back.
const NAIVE_TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Serialize a record into a map keyed by field name.
pub fn to_map<T: Model>(record: &T) -> DbResult<JsonRow> {
    match serde_json::to_value(record) {
        Ok(JsonValue::Object(map)) => Ok(map),
        Ok(other) => Err(DbError::invalid_record(
            T::model_name(),
            format!("expected a struct, got {}", json_kind(&other)),
        )),
        Err(e) => Err(DbError::invalid_record(T::model_name(), e.to_string())),
    }
}

/// Deserialize a decoded row into a record.
pub fn from_row<T: Model>(row: JsonRow) -> DbResult<T> {
    serde_json::from_value(JsonValue::Object(row))
        .map_err(|e| DbError::invalid_record(T::model_name(), e.to_string()))
}

/// Whether an update should leave this field alone.
///
/// Null, `false`, `0`, `""` and empty arrays or objects count as unset.
pub fn is_zero(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => true,
        JsonValue::Bool(b) => !b,
        JsonValue::Number(n) => n.as_f64() == Some(0.0),
        JsonValue::String(s) => s.is_empty(),
        JsonValue::Array(a) => a.is_empty(),
        JsonValue::Object(o) => o.is_empty(),
    }
}

/// Convert a serialized field into a parameter for `column`.
pub fn to_param(value: &JsonValue, column: &ColumnDef) -> DbResult<QueryParam> {
    let param = match (column.column_type, value) {
        (_, JsonValue::Null) => QueryParam::Null,
        (ColumnType::Json, v) => QueryParam::Json(v.clone()),
        (ColumnType::Timestamp, JsonValue::String(s)) => match parse_timestamp(s) {
            Some(ts) => QueryParam::Timestamp(ts),
            None => QueryParam::String(s.clone()),
        },
        (ColumnType::Binary, JsonValue::Array(items)) => QueryParam::Bytes(
            items
                .iter()
                .map(|item| {
                    item.as_u64()
                        .and_then(|b| u8::try_from(b).ok())
                        .ok_or_else(|| {
                            DbError::invalid_input(format!(
                                "column '{}' expects bytes, got {}",
                                column.name, item
                            ))
                        })
                })
                .collect::<DbResult<Vec<u8>>>()?,
        ),
        (_, v) => scalar_param(v),
    };
    Ok(param)
}

/// Convert a value with no column information.
pub fn scalar_param(value: &JsonValue) -> QueryParam {
    match value {
        JsonValue::Null => QueryParam::Null,
        JsonValue::Bool(b) => QueryParam::Bool(*b),
        JsonValue::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => QueryParam::Int(i),
            (None, Some(f)) => QueryParam::Float(f),
            (None, None) => QueryParam::String(n.to_string()),
        },
        JsonValue::String(s) => QueryParam::String(s.clone()),
        other => QueryParam::Json(other.clone()),
    }
}

/// Bring driver output in line with what the model's fields deserialize from.
///
/// Booleans stored as integers become `true`/`false`, JSON stored as text is
/// parsed and timestamps are rendered as RFC 3339 in UTC.
pub fn normalize_row(row: &mut JsonRow, columns: &[ColumnDef]) {
    for column in columns {
        let Some(value) = row.get_mut(column.name) else {
            continue;
        };
        match (column.column_type, &*value) {
            (ColumnType::Boolean, JsonValue::Number(n)) => {
                *value = JsonValue::Bool(n.as_f64().is_some_and(|f| f != 0.0));
            }
            (ColumnType::Json, JsonValue::String(s)) => {
                if let Ok(parsed) = serde_json::from_str::<JsonValue>(s) {
                    *value = parsed;
                }
            }
            (ColumnType::Timestamp, JsonValue::String(s)) => {
                if let Some(ts) = parse_timestamp(s) {
                    *value = timestamp_to_json(ts);
                }
            }
            _ => {}
        }
    }
}

/// Parse RFC 3339 or a zone-less `YYYY-MM-DD HH:MM:SS` (read as UTC).
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.with_timezone(&Utc));
    }
    NAIVE_TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Key used to match association rows; numbers and strings compare by value.
pub fn match_key(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::Null => None,
        JsonValue::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}
