//! Query-related data models.
//!
//! This module defines bound parameter values, where clauses and the paginated
//! result returned by `find_all_paginated`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::error::DbError;

/// A parameter value for parameterized queries.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryParam {
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
    /// Binary data
    Bytes(Vec<u8>),
    /// JSON document
    Json(JsonValue),
    /// Point in time, stored as UTC
    Timestamp(DateTime<Utc>),
}

impl QueryParam {
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
            Self::Json(_) => "json",
            Self::Timestamp(_) => "timestamp",
        }
    }
}

macro_rules! impl_int_param {
    ($($ty:ty),+) => {
        $(
            impl From<$ty> for QueryParam {
                fn from(v: $ty) -> Self {
                    Self::Int(i64::from(v))
                }
            }
        )+
    };
}

impl_int_param!(i8, i16, i32, i64, u8, u16, u32);

/// Unsigned keys above `i64::MAX` have no column to live in.
impl TryFrom<u64> for QueryParam {
    type Error = DbError;

    fn try_from(v: u64) -> Result<Self, Self::Error> {
        i64::try_from(v).map(Self::Int).map_err(|_| {
            DbError::invalid_input(format!("{v} does not fit in a signed 64-bit column"))
        })
    }
}

impl From<bool> for QueryParam {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<f32> for QueryParam {
    fn from(v: f32) -> Self {
        Self::Float(f64::from(v))
    }
}

impl From<f64> for QueryParam {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for QueryParam {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for QueryParam {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&String> for QueryParam {
    fn from(v: &String) -> Self {
        Self::String(v.clone())
    }
}

impl From<Vec<u8>> for QueryParam {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

impl From<JsonValue> for QueryParam {
    fn from(v: JsonValue) -> Self {
        Self::Json(v)
    }
}

impl From<DateTime<Utc>> for QueryParam {
    fn from(v: DateTime<Utc>) -> Self {
        Self::Timestamp(v)
    }
}

impl<T: Into<QueryParam>> From<Option<T>> for QueryParam {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// A parameterized predicate scoping a read, update or delete.
///
/// Placeholders are written `?` whatever the dialect. The number of placeholders
/// must match the number of arguments; a mismatch is reported by the database
/// when the statement runs.
///
/// On Postgres every unquoted `?` becomes `$n`, so the JSONB operators `?`, `?|`
/// and `?&` must be written `??`, `??|` and `??&`. MySQL and SQLite have no such
/// operators and take the clause as written.
#[derive(Debug, Clone, PartialEq)]
pub struct WhereClause {
    pub query: String,
    pub args: Vec<QueryParam>,
}

impl WhereClause {
    /// A predicate with no arguments yet.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args(query: impl Into<String>, args: Vec<QueryParam>) -> Self {
        Self {
            query: query.into(),
            args,
        }
    }

    /// Append a positional argument.
    pub fn arg(mut self, value: impl Into<QueryParam>) -> Self {
        self.args.push(value.into());
        self
    }
}

/// Build a [`WhereClause`] from a predicate and its positional arguments.
///
/// ```ignore
/// let clause = where_clause!("id = ? AND title = ?", post.id, "Hello World");
/// ```
#[macro_export]
macro_rules! where_clause {
    ($query:expr $(, $arg:expr)* $(,)?) => {
        $crate::models::WhereClause::with_args(
            $query,
            vec![$($crate::models::QueryParam::from($arg)),*],
        )
    };
}

/// One page of results plus navigation metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaginatedResult<T> {
    pub results: Vec<T>,
    /// Total matching rows, independent of the page window
    pub count: u64,
    pub total_pages: u64,
    pub has_next: bool,
    pub has_prev: bool,
    /// 1-based
    pub page: u64,
    pub page_size: u64,
}

impl<T> PaginatedResult<T> {
    /// Assemble a page. `page_size` must be non-zero.
    pub fn new(results: Vec<T>, count: u64, page: u64, page_size: u64) -> Self {
        let total_pages = total_pages(count, page_size);
        Self {
            results,
            count,
            total_pages,
            has_next: page < total_pages,
            has_prev: page > 1,
            page,
            page_size,
        }
    }
}

/// `ceil(count / page_size)`.
pub fn total_pages(count: u64, page_size: u64) -> u64 {
    count.div_ceil(page_size)
}

/// Row offset of a 1-based page, or `None` when it does not fit the signed
/// 64-bit OFFSET every engine accepts.
pub fn page_offset(page: u64, page_size: u64) -> Option<u64> {
    page.saturating_sub(1)
        .checked_mul(page_size)
        .filter(|offset| i64::try_from(*offset).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_param_types() {
        assert!(QueryParam::Null.is_null());
        assert!(!QueryParam::Bool(true).is_null());
        assert_eq!(QueryParam::Int(42).type_name(), "int");
        assert_eq!(
            QueryParam::String("hello".to_string()).type_name(),
            "string"
        );
    }

    #[test]
    fn test_query_param_from_option() {
        assert_eq!(QueryParam::from(None::<i32>), QueryParam::Null);
        assert_eq!(QueryParam::from(Some(7u8)), QueryParam::Int(7));
        assert_eq!(QueryParam::from(Some("x")), QueryParam::String("x".into()));
    }

    #[test]
    fn test_where_clause_macro() {
        let clause = where_clause!("id = ? AND title = ?", 5, "Hello World");
        assert_eq!(clause.query, "id = ? AND title = ?");
        assert_eq!(
            clause.args,
            vec![QueryParam::Int(5), QueryParam::String("Hello World".into())]
        );

        let bare = where_clause!("deleted_at IS NULL");
        assert!(bare.args.is_empty());
    }

    #[test]
    fn test_where_clause_builder() {
        let clause = WhereClause::new("id = ?").arg(3i64);
        assert_eq!(clause.args, vec![QueryParam::Int(3)]);
    }

    #[test]
    fn test_total_pages_is_ceiling() {
        assert_eq!(total_pages(0, 10), 0);
        assert_eq!(total_pages(1, 10), 1);
        assert_eq!(total_pages(10, 10), 1);
        assert_eq!(total_pages(11, 10), 2);
        assert_eq!(total_pages(25, 7), 4);
    }

    #[test]
    fn test_page_offset() {
        assert_eq!(page_offset(1, 10), Some(0));
        assert_eq!(page_offset(2, 10), Some(10));
        assert_eq!(page_offset(5, 3), Some(12));
    }

    #[test]
    fn test_page_offset_out_of_range() {
        assert_eq!(page_offset(u64::MAX / 2, 10), None);
        assert_eq!(page_offset(u64::MAX, u64::MAX), None);
        assert_eq!(page_offset(2, i64::MAX as u64 + 1), None);
        assert_eq!(page_offset(2, i64::MAX as u64), Some(i64::MAX as u64));
    }

    #[test]
    fn test_query_param_from_u64() {
        assert_eq!(QueryParam::try_from(42u64).unwrap(), QueryParam::Int(42));
        assert_eq!(
            QueryParam::try_from(i64::MAX as u64).unwrap(),
            QueryParam::Int(i64::MAX)
        );
        assert!(matches!(
            QueryParam::try_from(u64::MAX),
            Err(DbError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_pagination_flags_hold_for_small_ranges() {
        for count in 0..40u64 {
            for page_size in 1..8u64 {
                for page in 1..10u64 {
                    let result = PaginatedResult::<()>::new(Vec::new(), count, page, page_size);
                    let expected = (count + page_size - 1) / page_size;
                    assert_eq!(result.total_pages, expected);
                    assert_eq!(result.has_next, page < expected);
                    assert_eq!(result.has_prev, page > 1);
                }
            }
        }
    }

    #[test]
    fn test_single_row_pages() {
        let first = PaginatedResult::new(vec![1], 1, 1, 10);
        assert_eq!(first.total_pages, 1);
        assert!(!first.has_next);
        assert!(!first.has_prev);

        let second = PaginatedResult::<i32>::new(Vec::new(), 1, 2, 10);
        assert_eq!(second.total_pages, 1);
        assert!(!second.has_next);
        assert!(second.has_prev);
    }

    #[test]
    fn test_paginated_result_serializes_field_names() {
        let page = PaginatedResult::new(vec!["a"], 1, 1, 10);
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["results"], serde_json::json!(["a"]));
        assert_eq!(json["total_pages"], 1);
        assert_eq!(json["has_next"], false);
        assert_eq!(json["has_prev"], false);
    }
}
