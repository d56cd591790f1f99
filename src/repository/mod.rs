//! Generic repository over [`Model`] types.
//!
//! One [`Repository`] serves every record type: the table, columns and
//! associations come from the type's [`Model`] implementation, and values move
//! through `serde`. Operations that could touch more rows than intended
//! (`find`, `update`, `delete`) refuse to run without a where clause.

pub mod preload;
pub mod record;

use crate::config::ConnectSettings;
use crate::db::schema::check_columns;
use crate::db::sql::{self, Window, quote_ident};
use crate::db::{Database, JsonRow, QueryExecutor, SchemaMigrator, connect};
use crate::error::{DbError, DbResult};
use crate::models::{
    ColumnDef, ConnectionDescriptor, Dialect, Model, PaginatedResult, QueryParam, WhereClause,
    page_offset,
};
use record::{from_row, is_zero, normalize_row, to_map, to_param};
use tracing::debug;

/// CRUD and pagination over a shared connection pool.
///
/// Cloning is cheap and every clone uses the same pool; the repository never
/// closes it.
#[derive(Debug, Clone)]
pub struct Repository {
    db: Database,
    executor: QueryExecutor,
}

impl Repository {
    pub fn new(db: Database) -> Self {
        let executor = QueryExecutor::new(db.engine());
        Self { db, executor }
    }

    /// Connect and wrap the connection in one step.
    pub async fn connect(
        descriptor: impl Into<ConnectionDescriptor>,
        dialect: Dialect,
        settings: &ConnectSettings,
    ) -> DbResult<Self> {
        Ok(Self::new(connect(descriptor, dialect, settings).await?))
    }

    /// The underlying connection.
    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn dialect(&self) -> Dialect {
        self.db.dialect()
    }

    /// Create or extend the table for `T`.
    pub async fn migrate<T: Model>(&self) -> DbResult<()> {
        SchemaMigrator::migrate::<T>(&self.db).await
    }

    /// Run a raw statement written with `?` placeholders; returns affected rows.
    pub async fn execute(&self, query: &str, args: Vec<QueryParam>) -> DbResult<u64> {
        let stmt = sql::raw(self.dialect(), query, args);
        self.executor.execute_write(self.db.pool(), &stmt).await
    }

    /// Load the first row matching `clause`, ordered by primary key.
    pub async fn find<T: Model>(&self, clause: Option<&WhereClause>) -> DbResult<T> {
        let clause = clause.ok_or_else(|| DbError::no_where_clause("find"))?;
        self.load::<T>(Some(clause), Some(Window { limit: 1, offset: 0 }))
            .await?
            .pop()
            .ok_or_else(|| DbError::record_not_found(T::TABLE))
    }

    /// Load every row matching `clause`, or the whole table without one.
    pub async fn find_all<T: Model>(&self, clause: Option<&WhereClause>) -> DbResult<Vec<T>> {
        self.load::<T>(clause, None).await
    }

    /// Load one page of rows matching `clause`.
    ///
    /// `page` starts at 1. `count` and `total_pages` cover every matching row,
    /// not just the returned window. A page whose row offset overflows is
    /// rejected as invalid input before any query runs.
    ///
    /// Any failure, including one in the window query after the count has
    /// succeeded, is returned as the error alone; no partial page is built.
    pub async fn find_all_paginated<T: Model>(
        &self,
        page: u64,
        page_size: u64,
        clause: Option<&WhereClause>,
    ) -> DbResult<PaginatedResult<T>> {
        if page < 1 {
            return Err(DbError::invalid_input("page must be at least 1"));
        }
        if page_size == 0 {
            return Err(DbError::invalid_input("page_size must be greater than 0"));
        }
        if i64::try_from(page_size).is_err() {
            return Err(DbError::invalid_input("page_size is out of range"));
        }
        let window = Window {
            limit: page_size,
            offset: page_offset(page, page_size)
                .ok_or_else(|| DbError::invalid_input("page is out of range for page_size"))?,
        };

        let count_stmt = sql::count(self.dialect(), T::TABLE, clause);
        let count = self
            .executor
            .fetch_count(self.db.pool(), &count_stmt)
            .await?;

        let results = self.load::<T>(clause, Some(window)).await?;
        debug!(
            table = T::TABLE,
            page,
            page_size,
            count,
            returned = results.len(),
            "Loaded page"
        );
        Ok(PaginatedResult::new(results, count, page, page_size))
    }

    /// Insert `record`, then replace it with the stored row.
    ///
    /// Null fields are left to the column default, as is a zero auto-increment
    /// primary key. Generated values are visible on `record` afterwards.
    pub async fn create<T: Model>(&self, record: &mut T) -> DbResult<()> {
        let columns = T::columns();
        check_columns(T::TABLE, T::PRIMARY_KEY, &columns)?;
        let values = to_map(record)?;

        let mut generated_key = false;
        let mut inserts = Vec::new();
        for column in &columns {
            let value = values.get(column.name).unwrap_or(&serde_json::Value::Null);
            if column.primary_key && column.auto_increment && is_zero(value) {
                generated_key = true;
                continue;
            }
            if value.is_null() {
                continue;
            }
            inserts.push((column.name, to_param(value, column)?));
        }

        let returning = generated_key.then_some(T::PRIMARY_KEY);
        let stmt = sql::insert(self.dialect(), T::TABLE, inserts, returning);
        let key = self
            .executor
            .execute_insert(self.db.pool(), &stmt, generated_key)
            .await?;

        let key = match key {
            Some(key) => key,
            None => values
                .get(T::PRIMARY_KEY)
                .cloned()
                .unwrap_or(serde_json::Value::Null),
        };
        debug!(table = T::TABLE, id = %key, "Inserted record");

        let pk_column = primary_key_column::<T>(&columns)?;
        *record = self.find_by_key::<T>(to_param(&key, pk_column)?).await?;
        Ok(())
    }

    /// Apply the non-zero fields of `updates` to the row with primary key `id`
    /// that also matches `clause`, and return the row as stored afterwards.
    ///
    /// Fails with `RecordNotFound` when no such row exists; nothing is written
    /// in that case.
    pub async fn update<T: Model>(
        &self,
        updates: &T,
        id: impl Into<QueryParam>,
        clause: Option<&WhereClause>,
    ) -> DbResult<T> {
        let clause = clause.ok_or_else(|| DbError::no_where_clause("update"))?;
        let id = id.into();
        let columns = T::columns();
        check_columns(T::TABLE, T::PRIMARY_KEY, &columns)?;

        let key = quote_ident(self.dialect(), T::PRIMARY_KEY);
        let mut args = vec![id.clone()];
        args.extend(clause.args.iter().cloned());
        let existing = WhereClause::with_args(format!("{} = ? AND ({})", key, clause.query), args);
        if self
            .load_rows::<T>(&columns, Some(&existing), Some(Window { limit: 1, offset: 0 }))
            .await?
            .is_empty()
        {
            return Err(DbError::record_not_found(T::TABLE));
        }

        let values = to_map(updates)?;
        let mut assignments = Vec::new();
        for column in columns.iter().filter(|c| !c.primary_key) {
            match values.get(column.name) {
                Some(value) if !is_zero(value) => {
                    assignments.push((column.name, to_param(value, column)?));
                }
                _ => {}
            }
        }

        if assignments.is_empty() {
            debug!(table = T::TABLE, "No fields to update");
        } else {
            let stmt = sql::update(
                self.dialect(),
                T::TABLE,
                assignments,
                T::PRIMARY_KEY,
                id.clone(),
                clause,
            );
            let affected = self.executor.execute_write(self.db.pool(), &stmt).await?;
            debug!(table = T::TABLE, affected, "Updated record");
        }

        self.find_by_key::<T>(id).await
    }

    /// Delete every row matching `clause`; returns the number removed.
    pub async fn delete<T: Model>(&self, clause: Option<&WhereClause>) -> DbResult<u64> {
        let clause = clause.ok_or_else(|| DbError::no_where_clause("delete"))?;
        let stmt = sql::delete(self.dialect(), T::TABLE, clause);
        let affected = self.executor.execute_write(self.db.pool(), &stmt).await?;
        debug!(table = T::TABLE, affected, "Deleted records");
        Ok(affected)
    }

    async fn find_by_key<T: Model>(&self, id: QueryParam) -> DbResult<T> {
        let clause = WhereClause::new(format!(
            "{} = ?",
            quote_ident(self.dialect(), T::PRIMARY_KEY)
        ))
        .arg(id);
        self.find::<T>(Some(&clause)).await
    }

    async fn load<T: Model>(
        &self,
        clause: Option<&WhereClause>,
        window: Option<Window>,
    ) -> DbResult<Vec<T>> {
        let columns = T::columns();
        check_columns(T::TABLE, T::PRIMARY_KEY, &columns)?;

        let mut rows = self.load_rows::<T>(&columns, clause, window).await?;
        preload::attach::<T>(&self.executor, &self.db, &mut rows).await?;
        rows.into_iter().map(from_row::<T>).collect()
    }

    async fn load_rows<T: Model>(
        &self,
        columns: &[ColumnDef],
        clause: Option<&WhereClause>,
        window: Option<Window>,
    ) -> DbResult<Vec<JsonRow>> {
        let names: Vec<&str> = columns.iter().map(|c| c.name).collect();
        let stmt = sql::select(
            self.dialect(),
            T::TABLE,
            &names,
            clause,
            T::PRIMARY_KEY,
            window,
        );
        let mut rows = self.executor.fetch_rows(self.db.pool(), &stmt).await?;
        for row in &mut rows {
            normalize_row(row, columns);
        }
        Ok(rows)
    }
}

fn primary_key_column<T: Model>(columns: &[ColumnDef]) -> DbResult<&ColumnDef> {
    columns
        .iter()
        .find(|c| c.name == T::PRIMARY_KEY)
        .ok_or_else(|| DbError::schema("primary key column is not declared", T::TABLE))
}
