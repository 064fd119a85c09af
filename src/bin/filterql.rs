//! filterql CLI
//!
//! Runs a filtered, sorted, paginated query against a SQLite table and prints
//! the page as JSON.

use anyhow::Context;
use clap::Parser;
use sqlx::SqlitePool;

use filterql::cli::{self, Cli};
use filterql::config::QueryConfig;
use filterql::logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    logging::init()?;

    let cli = Cli::parse();
    let mut config = QueryConfig::from_env()?;
    if let Some(url) = cli.database_url {
        config.database_url = url;
    }

    let pool = SqlitePool::connect(&config.database_url)
        .await
        .with_context(|| format!("Failed to open {}", config.database_url))?;
    tracing::debug!(database_url = %config.database_url, "Database connected");

    let output = cli::run(&cli.command, &pool, &config).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}
