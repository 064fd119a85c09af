//! Sort compiler
//!
//! A sort descriptor is either one object, where every set field becomes an
//! ORDER BY key in declaration order, or a list of objects, where each element
//! names exactly one key so that tie-breaking order is explicit. When nothing
//! applies, a default key keeps pagination deterministic.

use std::borrow::Cow;
use std::str::FromStr;

use async_graphql::Enum;
use serde::{Deserialize, Serialize};

use super::identifier;
use crate::error::{QueryError, Result};

/// Column used when no explicit sort applies.
pub const DEFAULT_SORT_COLUMN: &str = "created_at";

/// Sort direction for ORDER BY clauses.
#[derive(Enum, Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[graphql(name = "SortDirection")]
pub enum SortDirection {
    /// Ascending order (A-Z, 1-9, oldest-newest)
    #[default]
    #[graphql(name = "ASC")]
    #[serde(rename = "ASC")]
    Asc,
    /// Descending order (Z-A, 9-1, newest-oldest)
    #[graphql(name = "DESC")]
    #[serde(rename = "DESC")]
    Desc,
}

impl SortDirection {
    /// Convert to SQL order string
    pub fn to_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

impl FromStr for SortDirection {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ASC" => Ok(SortDirection::Asc),
            "DESC" => Ok(SortDirection::Desc),
            other => Err(QueryError::InvalidSortDirection(other.to_string())),
        }
    }
}

/// One ORDER BY key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub column: Cow<'static, str>,
    pub direction: SortDirection,
}

impl SortKey {
    pub fn new(column: impl Into<Cow<'static, str>>, direction: SortDirection) -> Self {
        Self {
            column: column.into(),
            direction,
        }
    }

    pub fn to_sql(&self) -> String {
        format!("{} {}", self.column, self.direction.to_sql())
    }
}

impl Default for SortKey {
    fn default() -> Self {
        SortKey::new(DEFAULT_SORT_COLUMN, SortDirection::Desc)
    }
}

/// A tagged field of a sort descriptor and its value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortField {
    pub column: Cow<'static, str>,
    pub direction: Option<SortDirection>,
}

impl SortField {
    pub fn new(column: impl Into<Cow<'static, str>>, direction: Option<SortDirection>) -> Self {
        Self {
            column: column.into(),
            direction,
        }
    }
}

/// A value that describes sort keys.
///
/// Implemented by `#[derive(SortInput)]`; fields are returned in declaration
/// order, set or not.
pub trait SortDescriptor {
    fn sort_fields(&self) -> Vec<SortField>;
}

/// A descriptor field holding a direction.
pub trait SortSource {
    fn direction(&self) -> Option<SortDirection>;
}

impl SortSource for SortDirection {
    fn direction(&self) -> Option<SortDirection> {
        Some(*self)
    }
}

impl SortSource for Option<SortDirection> {
    fn direction(&self) -> Option<SortDirection> {
        *self
    }
}

/// Single-object or list form of a sort descriptor.
#[derive(Debug, Clone, PartialEq)]
pub enum SortSpec<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> From<T> for SortSpec<T> {
    fn from(value: T) -> Self {
        SortSpec::One(value)
    }
}

impl<T> From<Vec<T>> for SortSpec<T> {
    fn from(values: Vec<T>) -> Self {
        SortSpec::Many(values)
    }
}

/// Compiled ORDER BY clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    keys: Vec<SortKey>,
}

impl OrderBy {
    pub fn keys(&self) -> &[SortKey] {
        &self.keys
    }

    /// Clause body without the `ORDER BY` keyword, e.g. `name ASC, created_at DESC`.
    pub fn to_sql(&self) -> String {
        self.keys
            .iter()
            .map(SortKey::to_sql)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn set_keys<T: SortDescriptor>(descriptor: &T) -> Vec<SortKey> {
    descriptor
        .sort_fields()
        .into_iter()
        .filter_map(|f| f.direction.map(|d| SortKey::new(f.column, d)))
        .collect()
}

/// Compile a sort descriptor, appending `fallback` when no key applies.
pub fn compile_sort<T: SortDescriptor>(
    spec: Option<&SortSpec<T>>,
    fallback: &SortKey,
) -> Result<OrderBy> {
    let mut keys = Vec::new();

    match spec {
        None => {}
        Some(SortSpec::One(descriptor)) => keys.extend(set_keys(descriptor)),
        Some(SortSpec::Many(items)) => {
            for item in items {
                let item_keys = set_keys(item);
                if item_keys.len() > 1 {
                    return Err(QueryError::MultipleSortFields);
                }
                keys.extend(item_keys);
            }
        }
    }

    if keys.is_empty() {
        keys.push(fallback.clone());
    }
    for key in &keys {
        identifier(&key.column)?;
    }

    Ok(OrderBy { keys })
}
