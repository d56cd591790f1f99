//! sqlrepo library
//!
//! Dialect-aware connections to PostgreSQL, SQLite and MySQL, built from either
//! a key=value DSN or a structured config, plus a generic repository offering
//! find, find-all, paginated reads, create, update and delete over any record
//! type that implements [`Model`].

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod repository;

pub use config::{Config, ConnectSettings, PoolOptions, SqlLogLevel};
pub use db::{Database, connect, parse_dsn};
pub use error::{DbError, DbResult};
pub use models::{
    ColumnDef, ColumnType, ConnectionDescriptor, Dialect, DialectConfig, Model,
    PaginatedResult, QueryParam, Relation, RelationKind, WhereClause,
};
pub use repository::Repository;
