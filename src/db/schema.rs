//! Schema migration module.
//!
//! Creates the table for a [`Model`] when it does not exist yet and adds any
//! declared columns an existing table lacks. Columns are never altered or
//! dropped.
//!
//! # Architecture
//!
//! The introspection queries are organized in the `queries` submodule with one
//! constant per database type. DDL is rendered from [`ColumnDef`]s with
//! dialect-specific type names.

use crate::db::executor::QueryExecutor;
use crate::db::pool::Database;
use crate::db::sql::{self, Statement, quote_ident};
use crate::error::{DbError, DbResult};
use crate::models::{ColumnDef, ColumnType, Dialect, Model, QueryParam, RelationKind};
use tracing::{debug, info};

// =============================================================================
// SQL Query Templates
// =============================================================================

mod queries {
    pub mod postgres {
        pub const LIST_COLUMNS: &str = r#"
            SELECT column_name::text AS column_name
            FROM information_schema.columns
            WHERE table_schema = current_schema() AND table_name = $1
            ORDER BY ordinal_position
            "#;
    }

    pub mod mysql {
        pub const LIST_COLUMNS: &str = r#"
            SELECT CONVERT(COLUMN_NAME USING utf8mb4) AS column_name
            FROM information_schema.COLUMNS
            WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ?
            ORDER BY ORDINAL_POSITION
            "#;
    }

    pub mod sqlite {
        pub const LIST_COLUMNS: &str = "SELECT name AS column_name FROM pragma_table_info(?)";
    }
}

/// A FOREIGN KEY constraint on the migrated table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyDef {
    pub column: &'static str,
    pub references_table: &'static str,
    pub references_column: &'static str,
}

/// Schema migrator for model tables.
pub struct SchemaMigrator;

impl SchemaMigrator {
    /// Create or extend the table for `T`.
    ///
    /// Belongs-to associations become FOREIGN KEY constraints unless the engine
    /// disables them; the referenced table must be migrated first on Postgres
    /// and MySQL.
    pub async fn migrate<T: Model>(db: &Database) -> DbResult<()> {
        let columns = T::columns();
        check_columns(T::TABLE, T::PRIMARY_KEY, &columns)?;

        let dialect = db.dialect();
        let executor = QueryExecutor::new(db.engine());
        let existing = Self::existing_columns(&executor, db, T::TABLE).await?;

        if existing.is_empty() {
            let foreign_keys = if db.engine().disable_foreign_key_constraint_when_migrating {
                Vec::new()
            } else {
                belongs_to_keys::<T>()
            };
            let ddl = create_table_sql(dialect, T::TABLE, &columns, &foreign_keys);
            executor
                .execute_write(db.pool(), &sql::raw(dialect, &ddl, Vec::new()))
                .await?;
            info!(table = T::TABLE, columns = columns.len(), "Created table");
            return Ok(());
        }

        for column in columns
            .iter()
            .filter(|c| !existing.iter().any(|e| e.eq_ignore_ascii_case(c.name)))
        {
            let ddl = add_column_sql(dialect, T::TABLE, column);
            executor
                .execute_write(db.pool(), &sql::raw(dialect, &ddl, Vec::new()))
                .await?;
            info!(table = T::TABLE, column = column.name, "Added column");
        }
        debug!(table = T::TABLE, "Table is up to date");
        Ok(())
    }

    /// Names of the columns `table` currently has; empty when it does not exist.
    pub async fn existing_columns(
        executor: &QueryExecutor,
        db: &Database,
        table: &str,
    ) -> DbResult<Vec<String>> {
        let query = match db.dialect() {
            Dialect::Postgres => queries::postgres::LIST_COLUMNS,
            Dialect::MySql => queries::mysql::LIST_COLUMNS,
            Dialect::SQLite => queries::sqlite::LIST_COLUMNS,
        };
        let stmt = Statement {
            sql: query.to_string(),
            params: vec![QueryParam::from(table)],
        };
        let rows = executor.fetch_rows(db.pool(), &stmt).await?;
        Ok(rows
            .iter()
            .filter_map(|row| row.get("column_name").and_then(|v| v.as_str()))
            .map(String::from)
            .collect())
    }
}

/// Check a model's column list before it is used to build SQL.
pub fn check_columns(table: &str, primary_key: &str, columns: &[ColumnDef]) -> DbResult<()> {
    if columns.is_empty() {
        return Err(DbError::schema("model declares no columns", table));
    }
    if !columns.iter().any(|c| c.name == primary_key) {
        return Err(DbError::schema(
            format!("primary key column '{}' is not declared", primary_key),
            table,
        ));
    }
    Ok(())
}

fn belongs_to_keys<T: Model>() -> Vec<ForeignKeyDef> {
    T::relations()
        .iter()
        .filter(|r| r.kind == RelationKind::BelongsTo)
        .map(|r| ForeignKeyDef {
            column: r.foreign_key,
            references_table: r.table,
            references_column: r.related_key(),
        })
        .collect()
}

/// Dialect type name for a column type.
pub fn column_type_sql(dialect: Dialect, column_type: ColumnType) -> String {
    match (dialect, column_type) {
        (Dialect::Postgres, ColumnType::Integer) => "INTEGER".into(),
        (Dialect::Postgres, ColumnType::BigInt) => "BIGINT".into(),
        (Dialect::Postgres, ColumnType::Boolean) => "BOOLEAN".into(),
        (Dialect::Postgres, ColumnType::Double) => "DOUBLE PRECISION".into(),
        (Dialect::Postgres, ColumnType::Text) => "TEXT".into(),
        (Dialect::Postgres, ColumnType::Varchar(n)) => format!("VARCHAR({})", n),
        (Dialect::Postgres, ColumnType::Binary) => "BYTEA".into(),
        (Dialect::Postgres, ColumnType::Json) => "JSONB".into(),
        (Dialect::Postgres, ColumnType::Timestamp) => "TIMESTAMPTZ".into(),

        (Dialect::SQLite, ColumnType::Integer | ColumnType::BigInt) => "INTEGER".into(),
        (Dialect::SQLite, ColumnType::Boolean) => "BOOLEAN".into(),
        (Dialect::SQLite, ColumnType::Double) => "REAL".into(),
        (Dialect::SQLite, ColumnType::Text | ColumnType::Varchar(_) | ColumnType::Json) => {
            "TEXT".into()
        }
        (Dialect::SQLite, ColumnType::Binary) => "BLOB".into(),
        (Dialect::SQLite, ColumnType::Timestamp) => "DATETIME".into(),

        (Dialect::MySql, ColumnType::Integer) => "INT".into(),
        (Dialect::MySql, ColumnType::BigInt) => "BIGINT".into(),
        (Dialect::MySql, ColumnType::Boolean) => "BOOLEAN".into(),
        (Dialect::MySql, ColumnType::Double) => "DOUBLE".into(),
        (Dialect::MySql, ColumnType::Text) => "LONGTEXT".into(),
        (Dialect::MySql, ColumnType::Varchar(n)) => format!("VARCHAR({})", n),
        (Dialect::MySql, ColumnType::Binary) => "LONGBLOB".into(),
        (Dialect::MySql, ColumnType::Json) => "JSON".into(),
        (Dialect::MySql, ColumnType::Timestamp) => "DATETIME".into(),
    }
}

/// Column definition as it appears in CREATE TABLE / ADD COLUMN.
pub fn column_definition(dialect: Dialect, column: &ColumnDef) -> String {
    let name = quote_ident(dialect, column.name);

    if column.primary_key && column.auto_increment {
        let ty = match (dialect, column.column_type) {
            (Dialect::Postgres, ColumnType::Integer) => "SERIAL PRIMARY KEY",
            (Dialect::Postgres, _) => "BIGSERIAL PRIMARY KEY",
            (Dialect::SQLite, _) => "INTEGER PRIMARY KEY AUTOINCREMENT",
            (Dialect::MySql, ColumnType::Integer) => "INT AUTO_INCREMENT PRIMARY KEY",
            (Dialect::MySql, _) => "BIGINT AUTO_INCREMENT PRIMARY KEY",
        };
        return format!("{} {}", name, ty);
    }

    let mut def = format!("{} {}", name, column_type_sql(dialect, column.column_type));
    if column.primary_key {
        def.push_str(" NOT NULL PRIMARY KEY");
        return def;
    }
    if !column.nullable {
        def.push_str(" NOT NULL");
    }
    if column.unique {
        def.push_str(" UNIQUE");
    }
    def
}

/// `CREATE TABLE IF NOT EXISTS` for a column set plus foreign keys.
pub fn create_table_sql(
    dialect: Dialect,
    table: &str,
    columns: &[ColumnDef],
    foreign_keys: &[ForeignKeyDef],
) -> String {
    let mut parts: Vec<String> = columns
        .iter()
        .map(|c| column_definition(dialect, c))
        .collect();
    parts.extend(foreign_keys.iter().map(|fk| {
        format!(
            "FOREIGN KEY ({}) REFERENCES {} ({})",
            quote_ident(dialect, fk.column),
            quote_ident(dialect, fk.references_table),
            quote_ident(dialect, fk.references_column)
        )
    }));

    format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        quote_ident(dialect, table),
        parts.join(", ")
    )
}

/// `ALTER TABLE ... ADD COLUMN` for one column.
///
/// A NOT NULL column added to a populated table needs a default, so added
/// columns are always nullable.
pub fn add_column_sql(dialect: Dialect, table: &str, column: &ColumnDef) -> String {
    let relaxed = ColumnDef {
        nullable: true,
        primary_key: false,
        auto_increment: false,
        ..column.clone()
    };
    format!(
        "ALTER TABLE {} ADD COLUMN {}",
        quote_ident(dialect, table),
        column_definition(dialect, &relaxed)
    )
}
