//! Configuration loaded from environment variables

use std::env;

use anyhow::{Context, Result, ensure};

use crate::compiler::identifier;
use crate::compiler::sort::{SortDirection, SortKey};

/// Page size used when a request asks for none.
pub const DEFAULT_PAGE_LIMIT: i64 = 10;

/// Largest page size a request may ask for.
pub const MAX_PAGE_LIMIT: i64 = 100;

/// Defaults applied by the pagination engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationConfig {
    pub default_limit: i64,
    pub max_limit: i64,
    /// ORDER BY key used when no sort applies
    pub default_sort: SortKey,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_PAGE_LIMIT,
            max_limit: MAX_PAGE_LIMIT,
            default_sort: SortKey::default(),
        }
    }
}

/// Configuration for the `filterql` binary
#[derive(Debug, Clone)]
pub struct QueryConfig {
    /// SQLite connection URL
    pub database_url: String,

    pub pagination: PaginationConfig,
}

impl QueryConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let database_url =
            lookup("DATABASE_URL").unwrap_or_else(|| "sqlite://filterql.db".to_string());

        let default_limit = match lookup("PAGE_DEFAULT_LIMIT") {
            Some(v) => v.parse().context("Invalid PAGE_DEFAULT_LIMIT")?,
            None => DEFAULT_PAGE_LIMIT,
        };
        let max_limit = match lookup("PAGE_MAX_LIMIT") {
            Some(v) => v.parse().context("Invalid PAGE_MAX_LIMIT")?,
            None => MAX_PAGE_LIMIT,
        };
        ensure!(default_limit > 0, "PAGE_DEFAULT_LIMIT must be positive");
        ensure!(
            default_limit <= max_limit,
            "PAGE_DEFAULT_LIMIT ({}) exceeds PAGE_MAX_LIMIT ({})",
            default_limit,
            max_limit
        );

        let mut default_sort = SortKey::default();
        if let Some(column) = lookup("DEFAULT_SORT_COLUMN") {
            identifier(&column).context("Invalid DEFAULT_SORT_COLUMN")?;
            default_sort.column = column.into();
        }
        if let Some(direction) = lookup("DEFAULT_SORT_DIRECTION") {
            default_sort.direction = direction
                .to_ascii_uppercase()
                .parse::<SortDirection>()
                .context("Invalid DEFAULT_SORT_DIRECTION")?;
        }

        Ok(Self {
            database_url,
            pagination: PaginationConfig {
                default_limit,
                max_limit,
                default_sort,
            },
        })
    }
}
