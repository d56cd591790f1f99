//! Integration tests against a live PostgreSQL server.
//!
//! Set `TEST_POSTGRES_DSN` to a key=value DSN, for example
//! `host=localhost user=postgres password=postgres dbname=test sslmode=disable`.

use chrono::{DateTime, TimeZone, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sqlrepo::config::ConnectSettings;
use sqlrepo::{
    ColumnDef, ColumnType, DbError, Dialect, Model, Repository, parse_dsn, where_clause,
};

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
struct Event {
    id: i64,
    name: String,
    payload: Option<serde_json::Value>,
    happened_at: Option<DateTime<Utc>>,
}

impl Model for Event {
    const TABLE: &'static str = "sqlrepo_test_events";

    fn columns() -> Vec<ColumnDef> {
        vec![
            ColumnDef::id("id"),
            ColumnDef::new("name", ColumnType::Varchar(100)).not_null(),
            ColumnDef::new("payload", ColumnType::Json),
            ColumnDef::new("happened_at", ColumnType::Timestamp),
        ]
    }
}

fn test_dsn() -> Option<String> {
    match std::env::var("TEST_POSTGRES_DSN") {
        Ok(dsn) => Some(dsn),
        Err(_) => {
            eprintln!("Skipping test: TEST_POSTGRES_DSN not set");
            None
        }
    }
}

#[tokio::test]
async fn test_postgres_crud_with_key_value_dsn() {
    let Some(dsn) = test_dsn() else {
        return;
    };

    let repo = Repository::connect(dsn.as_str(), Dialect::Postgres, &ConnectSettings::default())
        .await
        .unwrap();
    assert!(repo.database().engine().prepare_statements);
    repo.migrate::<Event>().await.unwrap();

    let name = format!("event-{}", rand::thread_rng().r#gen::<u32>());
    let happened_at = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
    let mut event = Event {
        name: name.clone(),
        payload: Some(serde_json::json!({"source": "test"})),
        happened_at: Some(happened_at),
        ..Default::default()
    };
    repo.create(&mut event).await.unwrap();
    assert!(event.id > 0);
    assert_eq!(event.happened_at, Some(happened_at));

    let clause = where_clause!("name = ?", name.as_str());
    let page = repo
        .find_all_paginated::<Event>(1, 10, Some(&clause))
        .await
        .unwrap();
    assert_eq!(page.count, 1);
    assert_eq!(page.results[0], event);

    let updated = repo
        .update(
            &Event {
                name: format!("{name}-renamed"),
                ..Default::default()
            },
            event.id,
            Some(&clause),
        )
        .await
        .unwrap();
    assert_eq!(updated.name, format!("{name}-renamed"));
    assert_eq!(updated.payload, event.payload);

    let removed = repo
        .delete::<Event>(Some(&where_clause!("id = ?", event.id)))
        .await
        .unwrap();
    assert_eq!(removed, 1);

    repo.database().close().await;
}

#[tokio::test]
async fn test_postgres_connect_with_config() {
    let Some(dsn) = test_dsn() else {
        return;
    };
    // URL-style DSNs have no key=value form to rebuild a config from
    let Ok(config) = parse_dsn(&dsn) else {
        return;
    };

    let repo = Repository::connect(config, Dialect::Postgres, &ConnectSettings::default())
        .await
        .unwrap();
    assert!(repo.database().server_version().is_some());

    let err = repo
        .find::<Event>(Some(&where_clause!("missing_column = ?", 1)))
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Database { .. } | DbError::Schema { .. }));
}
