//! Integration tests for the connection factory.
//!
//! Tests verify that:
//! - A structured config is only accepted for postgres
//! - Empty descriptors are rejected before any connection attempt
//! - Unknown dialect tags are rejected by name
//! - SQLite DSNs open working connections

use sqlrepo::config::ConnectSettings;
use sqlrepo::db::resolve_tag;
use sqlrepo::models::SQLITE_MEMORY_DSN;
use sqlrepo::{DbError, Dialect, DialectConfig, SqlLogLevel, connect};
use tempfile::TempDir;

fn sample_config() -> DialectConfig {
    DialectConfig::new("blog", "app", "secret", "localhost", "", "")
}

#[tokio::test]
async fn test_config_rejected_for_non_postgres_dialects() {
    let settings = ConnectSettings::default();
    for dialect in [Dialect::SQLite, Dialect::MySql] {
        match connect(sample_config(), dialect, &settings).await {
            Err(DbError::InvalidConfigForDialect { dialect: name }) => {
                assert_eq!(name, dialect.as_str());
            }
            other => panic!("expected InvalidConfigForDialect, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_empty_descriptor_rejected() {
    let settings = ConnectSettings::default();
    let err = connect("", Dialect::SQLite, &settings).await.unwrap_err();
    assert!(matches!(err, DbError::InvalidConnectionDescriptor { .. }));

    let err = connect("   ", Dialect::Postgres, &settings).await.unwrap_err();
    assert!(matches!(err, DbError::InvalidConnectionDescriptor { .. }));
}

#[tokio::test]
async fn test_incomplete_config_reports_missing_field() {
    let config = DialectConfig::new("blog", "app", "", "localhost", "", "");
    let err = connect(config, Dialect::Postgres, &ConnectSettings::default())
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::MissingField { ref field } if field == "password"));
}

#[test]
fn test_unknown_dialect_tags() {
    for tag in ["postgresql", "sqlite", "mssql", "", "MySQL"] {
        match resolve_tag(SQLITE_MEMORY_DSN, tag, SqlLogLevel::Silent) {
            Err(DbError::UnknownDialect { dialect }) => assert_eq!(dialect, tag),
            other => panic!("expected UnknownDialect for {tag:?}, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_sqlite_memory_connection() {
    let settings = ConnectSettings::default().with_sql_log_level(SqlLogLevel::Info);
    let db = connect(SQLITE_MEMORY_DSN, Dialect::SQLite, &settings)
        .await
        .unwrap();
    assert_eq!(db.dialect(), Dialect::SQLite);
    assert!(db.server_version().is_some());
    assert!(db.engine().sql_log_level == SqlLogLevel::Info);
    assert!(!db.engine().prepare_statements);

    db.close().await;
    assert!(db.pool().is_closed());
}

#[tokio::test]
async fn test_sqlite_file_is_created() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("blog.db");
    let dsn = format!("sqlite:{}", path.display());

    let db = connect(dsn, Dialect::SQLite, &ConnectSettings::default())
        .await
        .unwrap();
    assert!(path.exists());
    db.close().await;
}
