//! Database abstraction layer.
//!
//! This module provides database access functionality:
//! - DSN parsing and dialect resolution
//! - Connection pool management and the connection factory
//! - Statement building and query execution
//! - Row decoding and parameter binding
//! - Schema migration for model tables
//! - Database dispatch macros for reducing code duplication

#[macro_use]
pub mod macros;
pub mod dialect;
pub mod dsn;
pub mod executor;
pub mod params;
pub mod pool;
pub mod schema;
pub mod sql;
pub mod types;

pub use dialect::{DriverOptions, EngineConfig, ResolvedDialect, resolve, resolve_tag};
pub use dsn::parse_dsn;
pub use executor::{JsonRow, QueryExecutor};
pub use pool::{Database, DbPool, connect, open_pool};
pub use schema::SchemaMigrator;
pub use sql::Statement;
