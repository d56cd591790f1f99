//! Query execution engine.
//!
//! This module runs built [`Statement`]s against a [`DbPool`] and hands rows back
//! as JSON maps.
//!
//! # Architecture
//!
//! The executor uses database-specific implementations organized in submodules:
//! - `mysql`: MySQL-specific query and write operations
//! - `postgres`: PostgreSQL-specific query and write operations
//! - `sqlite`: SQLite-specific query and write operations
//!
//! Each submodule provides identical functionality adapted to the database's type system.

use crate::config::SqlLogLevel;
use crate::db::dialect::EngineConfig;
use crate::db::params::BindParams;
use crate::db::pool::DbPool;
use crate::db::sql::Statement;
use crate::db::types::RowToJson;
use crate::error::{DbError, DbResult};
use serde_json::{Map, Value as JsonValue};
use tracing::{debug, error};

/// A decoded row, keyed by column name.
pub type JsonRow = Map<String, JsonValue>;

/// Query executor that handles database query execution.
#[derive(Debug, Clone, Copy)]
pub struct QueryExecutor {
    /// Cache statements on the connection as prepared statements
    persistent: bool,
    log_level: SqlLogLevel,
}

impl QueryExecutor {
    pub fn new(engine: &EngineConfig) -> Self {
        Self {
            persistent: engine.prepare_statements,
            log_level: engine.sql_log_level,
        }
    }

    /// Execute a SELECT and decode every row.
    pub async fn fetch_rows(&self, pool: &DbPool, stmt: &Statement) -> DbResult<Vec<JsonRow>> {
        debug!(sql = %stmt.sql, params = stmt.params.len(), "Executing query");

        let result = impl_db_dispatch!(pool, {
            MySql(p) => mysql::fetch_rows(p, stmt, self.persistent).await,
            Postgres(p) => postgres::fetch_rows(p, stmt, self.persistent).await,
            SQLite(p) => sqlite::fetch_rows(p, stmt, self.persistent).await,
        });
        self.report(stmt, result)
    }

    /// Execute a `SELECT COUNT(*) AS count ...` statement.
    pub async fn fetch_count(&self, pool: &DbPool, stmt: &Statement) -> DbResult<u64> {
        let rows = self.fetch_rows(pool, stmt).await?;
        rows.first()
            .and_then(|row| row.get("count"))
            .and_then(JsonValue::as_u64)
            .ok_or_else(|| DbError::internal("count query returned no count column"))
    }

    /// Execute a write operation (UPDATE, DELETE, DDL) and return affected rows.
    pub async fn execute_write(&self, pool: &DbPool, stmt: &Statement) -> DbResult<u64> {
        debug!(sql = %stmt.sql, params = stmt.params.len(), "Executing write operation");

        let result = impl_db_dispatch!(pool, {
            MySql(p) => mysql::execute_write(p, stmt, self.persistent).await,
            Postgres(p) => postgres::execute_write(p, stmt, self.persistent).await,
            SQLite(p) => sqlite::execute_write(p, stmt, self.persistent).await,
        });
        self.report(stmt, result)
    }

    /// Execute an INSERT, returning the generated key when `generated_key` is set.
    ///
    /// Postgres statements must end in `RETURNING key`; SQLite and MySQL report
    /// the key through the driver.
    pub async fn execute_insert(
        &self,
        pool: &DbPool,
        stmt: &Statement,
        generated_key: bool,
    ) -> DbResult<Option<JsonValue>> {
        debug!(sql = %stmt.sql, params = stmt.params.len(), "Executing insert");

        let result = impl_db_dispatch!(pool, {
            MySql(p) => mysql::execute_insert(p, stmt, self.persistent, generated_key).await,
            Postgres(p) => postgres::execute_insert(p, stmt, self.persistent, generated_key).await,
            SQLite(p) => sqlite::execute_insert(p, stmt, self.persistent, generated_key).await,
        });
        self.report(stmt, result)
    }

    fn report<T>(&self, stmt: &Statement, result: Result<T, sqlx::Error>) -> DbResult<T> {
        result.map_err(|e| {
            if self.log_level.reports_errors() {
                error!(sql = %stmt.sql, error = %e, "Statement failed");
            }
            DbError::from(e)
        })
    }
}

// =============================================================================
// Database-Specific Implementations
// =============================================================================
//
// Each module below provides the same interface adapted to its database type.
// The code structure is intentionally parallel to make differences obvious.

mod mysql {
    use super::*;
    use sqlx::MySqlPool;

    pub async fn fetch_rows(
        pool: &MySqlPool,
        stmt: &Statement,
        persistent: bool,
    ) -> Result<Vec<JsonRow>, sqlx::Error> {
        let query = sqlx::query(&stmt.sql)
            .persistent(persistent)
            .bind_params(&stmt.params);
        let rows = query.fetch_all(pool).await?;
        Ok(rows.iter().map(RowToJson::to_json_map).collect())
    }

    pub async fn execute_write(
        pool: &MySqlPool,
        stmt: &Statement,
        persistent: bool,
    ) -> Result<u64, sqlx::Error> {
        // When params is empty, execute raw SQL directly to avoid prepared statement issues
        // (some DDL doesn't support prepared statements)
        let result = if stmt.params.is_empty() {
            use sqlx::Executor;
            pool.execute(stmt.sql.as_str()).await?
        } else {
            let query = sqlx::query(&stmt.sql)
                .persistent(persistent)
                .bind_params(&stmt.params);
            query.execute(pool).await?
        };
        Ok(result.rows_affected())
    }

    pub async fn execute_insert(
        pool: &MySqlPool,
        stmt: &Statement,
        persistent: bool,
        generated_key: bool,
    ) -> Result<Option<JsonValue>, sqlx::Error> {
        let query = sqlx::query(&stmt.sql)
            .persistent(persistent)
            .bind_params(&stmt.params);
        let result = query.execute(pool).await?;
        Ok(generated_key.then(|| JsonValue::from(result.last_insert_id())))
    }
}

mod postgres {
    use super::*;
    use sqlx::PgPool;

    pub async fn fetch_rows(
        pool: &PgPool,
        stmt: &Statement,
        persistent: bool,
    ) -> Result<Vec<JsonRow>, sqlx::Error> {
        let query = sqlx::query(&stmt.sql)
            .persistent(persistent)
            .bind_params(&stmt.params);
        let rows = query.fetch_all(pool).await?;
        Ok(rows.iter().map(RowToJson::to_json_map).collect())
    }

    pub async fn execute_write(
        pool: &PgPool,
        stmt: &Statement,
        persistent: bool,
    ) -> Result<u64, sqlx::Error> {
        let result = if stmt.params.is_empty() {
            use sqlx::Executor;
            pool.execute(stmt.sql.as_str()).await?
        } else {
            let query = sqlx::query(&stmt.sql)
                .persistent(persistent)
                .bind_params(&stmt.params);
            query.execute(pool).await?
        };
        Ok(result.rows_affected())
    }

    pub async fn execute_insert(
        pool: &PgPool,
        stmt: &Statement,
        persistent: bool,
        generated_key: bool,
    ) -> Result<Option<JsonValue>, sqlx::Error> {
        let query = sqlx::query(&stmt.sql)
            .persistent(persistent)
            .bind_params(&stmt.params);
        if !generated_key {
            query.execute(pool).await?;
            return Ok(None);
        }
        let row = query.fetch_one(pool).await?;
        Ok(row.to_json_map().into_iter().next().map(|(_, v)| v))
    }
}

mod sqlite {
    use super::*;
    use sqlx::SqlitePool;

    pub async fn fetch_rows(
        pool: &SqlitePool,
        stmt: &Statement,
        persistent: bool,
    ) -> Result<Vec<JsonRow>, sqlx::Error> {
        let query = sqlx::query(&stmt.sql)
            .persistent(persistent)
            .bind_params(&stmt.params);
        let rows = query.fetch_all(pool).await?;
        Ok(rows.iter().map(RowToJson::to_json_map).collect())
    }

    pub async fn execute_write(
        pool: &SqlitePool,
        stmt: &Statement,
        persistent: bool,
    ) -> Result<u64, sqlx::Error> {
        let result = if stmt.params.is_empty() {
            use sqlx::Executor;
            pool.execute(stmt.sql.as_str()).await?
        } else {
            let query = sqlx::query(&stmt.sql)
                .persistent(persistent)
                .bind_params(&stmt.params);
            query.execute(pool).await?
        };
        Ok(result.rows_affected())
    }

    pub async fn execute_insert(
        pool: &SqlitePool,
        stmt: &Statement,
        persistent: bool,
        generated_key: bool,
    ) -> Result<Option<JsonValue>, sqlx::Error> {
        let query = sqlx::query(&stmt.sql)
            .persistent(persistent)
            .bind_params(&stmt.params);
        let result = query.execute(pool).await?;
        Ok(generated_key.then(|| JsonValue::from(result.last_insert_rowid())))
    }
}
