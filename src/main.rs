//! sqlrepo demo - Main entry point.
//!
//! Connects with the configured DSN and dialect, then walks a `Post` model
//! through create, paginated read, update and delete.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlrepo::config::Config;
use sqlrepo::{ColumnDef, ColumnType, DbResult, Model, Repository, WhereClause};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Debug, Default, Serialize, Deserialize)]
struct Post {
    id: i64,
    title: String,
    body: String,
    created_at: Option<DateTime<Utc>>,
}

impl Model for Post {
    const TABLE: &'static str = "posts";

    fn columns() -> Vec<ColumnDef> {
        vec![
            ColumnDef::id("id"),
            ColumnDef::new("title", ColumnType::Varchar(100)).not_null(),
            ColumnDef::new("body", ColumnType::Text),
            ColumnDef::new("created_at", ColumnType::Timestamp),
        ]
    }
}

/// Initialize the tracing subscriber for logging.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber.with(fmt::layer().json()).init();
    } else {
        subscriber
            .with(fmt::layer().with_target(true).with_thread_ids(false))
            .init();
    }
}

async fn run(config: &Config) -> DbResult<()> {
    let settings = config.connect_settings()?;
    let repo = Repository::connect(config.dsn.as_str(), config.dialect, &settings).await?;

    if config.migrate {
        repo.migrate::<Post>().await?;
    }

    let mut post = Post {
        title: "Hello World".to_string(),
        body: "Created by sqlrepo-demo".to_string(),
        created_at: Some(Utc::now()),
        ..Default::default()
    };
    repo.create(&mut post).await?;
    info!(id = post.id, title = %post.title, "Created post");

    let page = repo.find_all_paginated::<Post>(1, 10, None).await?;
    info!(
        count = page.count,
        total_pages = page.total_pages,
        has_next = page.has_next,
        "Loaded first page"
    );
    for post in &page.results {
        println!("{:>6}  {}", post.id, post.title);
    }

    let everything = WhereClause::new("1 = 1");
    for post in repo.find_all::<Post>(None).await? {
        let changes = Post {
            title: format!("{} (edited)", post.title),
            ..Default::default()
        };
        let updated = repo.update(&changes, post.id, Some(&everything)).await?;
        info!(id = updated.id, title = %updated.title, "Updated post");
    }

    let deleted = repo.delete::<Post>(Some(&everything)).await?;
    info!(deleted, "Deleted posts");

    repo.database().close().await;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse configuration from command line and environment
    let config = Config::parse_args();

    // Initialize logging
    init_tracing(&config);

    info!(
        dialect = %config.dialect,
        "Starting sqlrepo demo v{}",
        env!("CARGO_PKG_VERSION")
    );

    if let Err(e) = run(&config).await {
        error!(error = %e, suggestion = ?e.suggestion(), "Demo failed");
        return Err(e.into());
    }

    info!("Demo complete");
    Ok(())
}
