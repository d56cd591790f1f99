//! Error types for sqlrepo.
//!
//! This module defines all error types using `thiserror` for ergonomic error handling.
//! Connection-descriptor and DSN errors are raised before any connection attempt is
//! made; driver errors are mapped from `sqlx::Error` and passed through unchanged in
//! meaning. Nothing in this crate retries: a failed operation is reported once.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("cannot parse DSN: DSN is empty")]
    EmptyDsn,

    #[error("cannot parse DSN: {field} is empty")]
    MissingField { field: String },

    #[error("unknown dialect: {dialect}")]
    UnknownDialect { dialect: String },

    #[error("config is only valid when dialect is postgres (got {dialect})")]
    InvalidConfigForDialect { dialect: String },

    #[error("connection is not a valid dsn string or config: {message}")]
    InvalidConnectionDescriptor { message: String },

    #[error("where clause is required for {operation}")]
    NoWhereClause { operation: String },

    #[error("Connection failed: {message}")]
    Connection { message: String, suggestion: String },

    /// The pool was closed by its owner.
    #[error("connection pool is closed")]
    PoolClosed,

    #[error("Database error: {message}")]
    Database {
        message: String,
        /// e.g., "42P01" for undefined table
        sql_state: Option<String>,
        suggestion: String,
    },

    #[error("record not found in {table}")]
    RecordNotFound { table: String },

    #[error("Schema error: {message} (object: {object})")]
    Schema { message: String, object: String },

    #[error("invalid {model} record: {message}")]
    InvalidRecord { model: String, message: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DbError {
    /// Create a missing DSN field error.
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    /// Create an unknown dialect error.
    pub fn unknown_dialect(dialect: impl Into<String>) -> Self {
        Self::UnknownDialect {
            dialect: dialect.into(),
        }
    }

    pub fn invalid_config_for_dialect(dialect: impl Into<String>) -> Self {
        Self::InvalidConfigForDialect {
            dialect: dialect.into(),
        }
    }

    pub fn invalid_connection_descriptor(message: impl Into<String>) -> Self {
        Self::InvalidConnectionDescriptor {
            message: message.into(),
        }
    }

    /// Create a missing where clause error for the named operation.
    pub fn no_where_clause(operation: impl Into<String>) -> Self {
        Self::NoWhereClause {
            operation: operation.into(),
        }
    }

    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create a database error with optional SQL state.
    pub fn database(
        message: impl Into<String>,
        sql_state: Option<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::Database {
            message: message.into(),
            sql_state,
            suggestion: suggestion.into(),
        }
    }

    pub fn record_not_found(table: impl Into<String>) -> Self {
        Self::RecordNotFound {
            table: table.into(),
        }
    }

    /// Create a schema error.
    pub fn schema(message: impl Into<String>, object: impl Into<String>) -> Self {
        Self::Schema {
            message: message.into(),
            object: object.into(),
        }
    }

    /// Create an invalid record error for the named model.
    pub fn invalid_record(model: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidRecord {
            model: model.into(),
            message: message.into(),
        }
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connection { suggestion, .. } => Some(suggestion),
            Self::Database { suggestion, .. } => Some(suggestion),
            Self::PoolClosed => Some("Open a new connection; a closed pool cannot be reused"),
            Self::NoWhereClause { .. } => {
                Some("Pass a where clause that scopes the rows this operation may touch")
            }
            _ => None,
        }
    }

    /// Check if this error is retryable by the caller.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connection { .. })
    }

    /// True for errors that mean "no matching row".
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::RecordNotFound { .. })
    }
}

/// Convert sqlx errors to DbError.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(msg) => DbError::connection(
                msg.to_string(),
                "Check the connection string format and credentials",
            ),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                DbError::database(
                    db_err.message(),
                    code,
                    "Check the SQL syntax and referenced objects",
                )
            }
            sqlx::Error::RowNotFound => DbError::database(
                "No rows returned",
                None,
                "Verify the query conditions match existing data",
            ),
            sqlx::Error::PoolTimedOut => DbError::connection(
                "Timed out acquiring a pooled connection",
                "Raise max_connections or acquire_timeout",
            ),
            sqlx::Error::PoolClosed => DbError::PoolClosed,
            sqlx::Error::Io(io_err) => DbError::connection(
                format!("I/O error: {}", io_err),
                "Check network connectivity and database server status",
            ),
            sqlx::Error::Tls(tls_err) => DbError::connection(
                format!("TLS error: {}", tls_err),
                "Verify TLS configuration and certificates",
            ),
            sqlx::Error::Protocol(msg) => DbError::connection(
                format!("Protocol error: {}", msg),
                "Check database server compatibility",
            ),
            sqlx::Error::TypeNotFound { type_name } => DbError::schema(
                format!("Type not found: {}", type_name),
                type_name.to_string(),
            ),
            sqlx::Error::ColumnNotFound(col) => {
                DbError::schema(format!("Column not found: {}", col), col.to_string())
            }
            sqlx::Error::ColumnIndexOutOfBounds { index, len } => DbError::internal(format!(
                "Column index {} out of bounds (len: {})",
                index, len
            )),
            sqlx::Error::ColumnDecode { index, source } => {
                DbError::internal(format!("Failed to decode column {}: {}", index, source))
            }
            sqlx::Error::Decode(source) => DbError::internal(format!("Decode error: {}", source)),
            sqlx::Error::WorkerCrashed => DbError::internal("Database worker crashed"),
            _ => DbError::internal(format!("Unknown database error: {}", err)),
        }
    }
}

/// Result type alias for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DbError::connection("Failed to connect", "Check credentials");
        assert!(err.to_string().contains("Connection failed"));
    }

    #[test]
    fn test_missing_field_names_the_key() {
        let err = DbError::missing_field("dbname");
        assert_eq!(err.to_string(), "cannot parse DSN: dbname is empty");
    }

    #[test]
    fn test_unknown_dialect_names_the_tag() {
        let err = DbError::unknown_dialect("oracle");
        assert!(err.to_string().contains("oracle"));
    }

    #[test]
    fn test_error_suggestion() {
        let err = DbError::database(
            "Syntax error",
            Some("42601".to_string()),
            "Check SQL syntax",
        );
        assert_eq!(err.suggestion(), Some("Check SQL syntax"));
        assert!(DbError::no_where_clause("delete").suggestion().is_some());
        assert_eq!(DbError::EmptyDsn.suggestion(), None);
    }

    #[test]
    fn test_error_retryable() {
        assert!(DbError::connection("err", "sugg").is_retryable());
        assert!(!DbError::no_where_clause("update").is_retryable());
        assert!(!DbError::record_not_found("posts").is_retryable());
    }

    #[test]
    fn test_row_not_found_maps_to_database_error() {
        let err: DbError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, DbError::Database { .. }));
    }

    #[test]
    fn test_column_not_found_maps_to_schema_error() {
        let err: DbError = sqlx::Error::ColumnNotFound("missing".to_string()).into();
        match err {
            DbError::Schema { object, .. } => assert_eq!(object, "missing"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_pool_closed_is_not_retryable() {
        let err: DbError = sqlx::Error::PoolClosed.into();
        assert!(matches!(err, DbError::PoolClosed));
        assert!(!err.is_retryable());
        assert!(err.suggestion().is_some());
    }
}
