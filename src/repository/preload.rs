//! Eager association loading.
//!
//! Each declared relation costs one `SELECT ... WHERE key IN (...)` for the
//! whole batch of owner rows. Associations are loaded one level deep.

use crate::db::sql;
use crate::db::{Database, JsonRow, QueryExecutor};
use crate::error::DbResult;
use crate::models::{Model, Relation, RelationKind};
use crate::repository::record::{match_key, normalize_row, scalar_param};
use serde_json::Value as JsonValue;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Attach every relation declared by `T` to `rows`.
pub async fn attach<T: Model>(
    executor: &QueryExecutor,
    db: &Database,
    rows: &mut [JsonRow],
) -> DbResult<()> {
    if rows.is_empty() {
        return Ok(());
    }
    for relation in T::relations() {
        attach_relation(executor, db, &relation, T::PRIMARY_KEY, rows).await?;
    }
    Ok(())
}

async fn attach_relation(
    executor: &QueryExecutor,
    db: &Database,
    relation: &Relation,
    owner_primary_key: &'static str,
    rows: &mut [JsonRow],
) -> DbResult<()> {
    let owner_key = relation.owner_key(owner_primary_key);
    let related_key = relation.related_key();

    let mut seen = HashSet::new();
    let keys: Vec<JsonValue> = rows
        .iter()
        .filter_map(|row| row.get(owner_key))
        .filter(|value| match_key(value).is_some_and(|k| seen.insert(k)))
        .cloned()
        .collect();

    let mut grouped: HashMap<String, Vec<JsonValue>> = HashMap::new();
    if !keys.is_empty() {
        let columns = relation.related_columns();
        let names: Vec<&str> = columns.iter().map(|c| c.name).collect();
        let stmt = sql::select_in(
            db.dialect(),
            relation.table,
            &names,
            related_key,
            keys.iter().map(scalar_param).collect(),
            relation.related_primary_key(),
        );
        let related = executor.fetch_rows(db.pool(), &stmt).await?;
        debug!(
            table = relation.table,
            field = relation.field,
            owners = keys.len(),
            rows = related.len(),
            "Loaded association"
        );

        for mut row in related {
            normalize_row(&mut row, &columns);
            if let Some(key) = row.get(related_key).and_then(match_key) {
                grouped.entry(key).or_default().push(JsonValue::Object(row));
            }
        }
    }

    for row in rows.iter_mut() {
        let matches = row
            .get(owner_key)
            .and_then(match_key)
            .and_then(|k| grouped.get(&k));
        let value = match relation.kind {
            RelationKind::HasMany => JsonValue::Array(matches.cloned().unwrap_or_default()),
            RelationKind::HasOne | RelationKind::BelongsTo => matches
                .and_then(|m| m.first().cloned())
                .unwrap_or(JsonValue::Null),
        };
        row.insert(relation.field.to_string(), value);
    }
    Ok(())
}
