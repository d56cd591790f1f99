//! Data models for sqlrepo.
//!
//! This module re-exports all model types used throughout the crate.

pub mod connection;
pub mod query;
pub mod schema;

// Re-export commonly used types
pub use connection::{
    ConnectionDescriptor, DEFAULT_SSLMODE, DEFAULT_TIMEZONE, Dialect, DialectConfig,
    SQLITE_MEMORY_DSN, mask_dsn,
};
pub use query::{PaginatedResult, QueryParam, WhereClause, page_offset, total_pages};
pub use schema::{ColumnDef, ColumnType, Model, Relation, RelationKind};
