//! SQL statement building.
//!
//! Statements are assembled with `?` placeholders and converted to `$n` for
//! Postgres as the last step, so where-clause fragments are written the same
//! way for every dialect.

use crate::models::{Dialect, QueryParam, WhereClause};

/// A statement ready for execution.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<QueryParam>,
}

impl Statement {
    fn finish(dialect: Dialect, sql: String, params: Vec<QueryParam>) -> Self {
        let sql = match dialect {
            Dialect::Postgres => renumber_placeholders(&sql),
            Dialect::MySql | Dialect::SQLite => sql,
        };
        Self { sql, params }
    }
}

/// A caller-written statement with `?` placeholders.
pub fn raw(dialect: Dialect, sql: &str, params: Vec<QueryParam>) -> Statement {
    Statement::finish(dialect, sql.to_string(), params)
}

/// Row window for paginated reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub limit: u64,
    pub offset: u64,
}

/// Quote an identifier for `dialect`.
pub fn quote_ident(dialect: Dialect, name: &str) -> String {
    match dialect {
        Dialect::MySql => format!("`{}`", name.replace('`', "``")),
        Dialect::Postgres | Dialect::SQLite => format!("\"{}\"", name.replace('"', "\"\"")),
    }
}

fn column_list(dialect: Dialect, columns: &[&str]) -> String {
    columns
        .iter()
        .map(|c| quote_ident(dialect, c))
        .collect::<Vec<_>>()
        .join(", ")
}

fn push_where(sql: &mut String, params: &mut Vec<QueryParam>, clause: Option<&WhereClause>) {
    if let Some(clause) = clause {
        sql.push_str(" WHERE (");
        sql.push_str(&clause.query);
        sql.push(')');
        params.extend(clause.args.iter().cloned());
    }
}

/// `SELECT columns FROM table [WHERE (clause)] ORDER BY order_by [LIMIT n OFFSET m]`
pub fn select(
    dialect: Dialect,
    table: &str,
    columns: &[&str],
    clause: Option<&WhereClause>,
    order_by: &str,
    window: Option<Window>,
) -> Statement {
    let mut sql = format!(
        "SELECT {} FROM {}",
        column_list(dialect, columns),
        quote_ident(dialect, table)
    );
    let mut params = Vec::new();
    push_where(&mut sql, &mut params, clause);
    sql.push_str(&format!(" ORDER BY {}", quote_ident(dialect, order_by)));
    if let Some(window) = window {
        sql.push_str(&format!(" LIMIT {} OFFSET {}", window.limit, window.offset));
    }
    Statement::finish(dialect, sql, params)
}

/// `SELECT columns FROM table WHERE key IN (...) ORDER BY order_by`
pub fn select_in(
    dialect: Dialect,
    table: &str,
    columns: &[&str],
    key: &str,
    values: Vec<QueryParam>,
    order_by: &str,
) -> Statement {
    let placeholders = vec!["?"; values.len()].join(", ");
    let sql = format!(
        "SELECT {} FROM {} WHERE {} IN ({}) ORDER BY {}",
        column_list(dialect, columns),
        quote_ident(dialect, table),
        quote_ident(dialect, key),
        placeholders,
        quote_ident(dialect, order_by)
    );
    Statement::finish(dialect, sql, values)
}

/// `SELECT COUNT(*) AS count FROM table [WHERE (clause)]`
pub fn count(dialect: Dialect, table: &str, clause: Option<&WhereClause>) -> Statement {
    let mut sql = format!("SELECT COUNT(*) AS count FROM {}", quote_ident(dialect, table));
    let mut params = Vec::new();
    push_where(&mut sql, &mut params, clause);
    Statement::finish(dialect, sql, params)
}

/// `INSERT INTO table (columns) VALUES (...) [RETURNING key]`
///
/// `returning` is only honoured for Postgres; the other dialects report the
/// generated key through the driver's query result.
pub fn insert(
    dialect: Dialect,
    table: &str,
    values: Vec<(&str, QueryParam)>,
    returning: Option<&str>,
) -> Statement {
    let table = quote_ident(dialect, table);
    let (columns, params): (Vec<&str>, Vec<QueryParam>) = values.into_iter().unzip();

    let mut sql = if columns.is_empty() {
        match dialect {
            Dialect::MySql => format!("INSERT INTO {} () VALUES ()", table),
            Dialect::Postgres | Dialect::SQLite => format!("INSERT INTO {} DEFAULT VALUES", table),
        }
    } else {
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table,
            column_list(dialect, &columns),
            vec!["?"; columns.len()].join(", ")
        )
    };

    if let (Dialect::Postgres, Some(key)) = (dialect, returning) {
        sql.push_str(&format!(" RETURNING {}", quote_ident(dialect, key)));
    }
    Statement::finish(dialect, sql, params)
}

/// `UPDATE table SET a = ?, ... WHERE key = ? AND (clause)`
pub fn update(
    dialect: Dialect,
    table: &str,
    assignments: Vec<(&str, QueryParam)>,
    key: &str,
    id: QueryParam,
    clause: &WhereClause,
) -> Statement {
    let (columns, mut params): (Vec<&str>, Vec<QueryParam>) = assignments.into_iter().unzip();
    let sets = columns
        .iter()
        .map(|c| format!("{} = ?", quote_ident(dialect, c)))
        .collect::<Vec<_>>()
        .join(", ");

    let sql = format!(
        "UPDATE {} SET {} WHERE {} = ? AND ({})",
        quote_ident(dialect, table),
        sets,
        quote_ident(dialect, key),
        clause.query
    );
    params.push(id);
    params.extend(clause.args.iter().cloned());
    Statement::finish(dialect, sql, params)
}

/// `DELETE FROM table WHERE (clause)`
pub fn delete(dialect: Dialect, table: &str, clause: &WhereClause) -> Statement {
    let mut sql = format!("DELETE FROM {}", quote_ident(dialect, table));
    let mut params = Vec::new();
    push_where(&mut sql, &mut params, Some(clause));
    Statement::finish(dialect, sql, params)
}

/// Replace `?` placeholders with `$1`, `$2`, ... outside quoted regions.
///
/// `??` is an escaped literal `?`, for JSONB operators such as `??|`.
pub fn renumber_placeholders(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len() + 8);
    let mut quote: Option<char> = None;
    let mut n = 0;
    let mut chars = sql.chars().peekable();

    while let Some(ch) = chars.next() {
        match (quote, ch) {
            (None, '\'' | '"' | '`') => {
                quote = Some(ch);
                out.push(ch);
            }
            (Some(q), c) if c == q => {
                quote = None;
                out.push(ch);
            }
            (None, '?') if chars.peek() == Some(&'?') => {
                chars.next();
                out.push('?');
            }
            (None, '?') => {
                n += 1;
                out.push('$');
                out.push_str(&n.to_string());
            }
            _ => out.push(ch),
        }
    }
    out
}
