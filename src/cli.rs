//! Command-line interface for querying a SQLite table with JSON descriptors.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use sqlx::SqlitePool;

use crate::compiler::projection::{RequestedFields, compile_projection};
use crate::config::QueryConfig;
use crate::engine::PageRequest;
use crate::pagination::{Page, PageInput};
use crate::sqlite::{self, JsonRow};

#[derive(Debug, Parser)]
#[command(name = "filterql", version, about = "Filter, sort and paginate a SQLite table")]
pub struct Cli {
    /// SQLite connection URL (defaults to DATABASE_URL)
    #[arg(long, global = true)]
    pub database_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch one page of rows
    Query(QueryArgs),
    /// List the filterable and sortable fields of a table
    Fields {
        #[arg(long)]
        table: String,
    },
}

#[derive(Debug, Args)]
pub struct QueryArgs {
    #[arg(long)]
    pub table: String,

    /// Filter descriptor as JSON, e.g. '{"title":{"contains":"ring"}}'
    #[arg(long)]
    pub filter: Option<String>,

    /// Sort descriptor as JSON: an object or a list of single-field objects
    #[arg(long)]
    pub sort: Option<String>,

    /// Comma-separated columns to return (all when omitted)
    #[arg(long, value_delimiter = ',')]
    pub fields: Vec<String>,

    #[arg(long, default_value_t = 0)]
    pub skip: i64,

    /// Page size (0 uses PAGE_DEFAULT_LIMIT)
    #[arg(long, default_value_t = 0)]
    pub limit: i64,

    /// Resume after this cursor instead of using --skip
    #[arg(long, conflicts_with = "skip")]
    pub after: Option<String>,
}

fn parse_json(raw: Option<&str>, flag: &str) -> Result<Value> {
    match raw {
        Some(raw) => serde_json::from_str(raw).with_context(|| format!("Invalid {} JSON", flag)),
        None => Ok(Value::Null),
    }
}

/// Run one page query against `pool`.
pub async fn run_query(
    pool: &SqlitePool,
    config: &QueryConfig,
    args: &QueryArgs,
) -> Result<Page<JsonRow>> {
    let registry = sqlite::introspect_registry(pool, &args.table).await?;

    let filter = registry.parse_filter(&parse_json(args.filter.as_deref(), "--filter")?)?;
    let sort = registry.parse_sort(&parse_json(args.sort.as_deref(), "--sort")?)?;

    let mut projection = sqlite::introspect_projection(pool, &args.table).await?;
    compile_projection(&mut projection, &RequestedFields::from_paths(&args.fields));

    let page = match &args.after {
        Some(cursor) => PageInput::after(cursor, args.limit)?,
        None => PageInput::new(args.skip, args.limit),
    };

    let result = PageRequest::with_config(&args.table, config.pagination.clone())
        .page(page)
        .filter(filter.as_ref())
        .sort(sort.as_ref())
        .projection(&projection)
        .fetch::<JsonRow>(pool)
        .await?;
    Ok(result)
}

/// Run a command and return its JSON output.
pub async fn run(command: &Command, pool: &SqlitePool, config: &QueryConfig) -> Result<Value> {
    match command {
        Command::Query(args) => {
            let page = run_query(pool, config, args).await?;
            Ok(serde_json::to_value(page)?)
        }
        Command::Fields { table } => {
            let registry = sqlite::introspect_registry(pool, table).await?;
            Ok(serde_json::json!({
                "filter": registry.filter_names().collect::<Vec<_>>(),
                "sort": registry.sort_names().collect::<Vec<_>>(),
            }))
        }
    }
}
