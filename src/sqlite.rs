//! SQLite execution
//!
//! Binds [`SqlValue`]s to sqlx queries, runs the count and data round trips
//! and decodes rows. Timestamps are bound as RFC3339 UTC text (`...Z`); the
//! filter compiler wraps date comparisons in `julianday`, so stored values may
//! use any RFC3339 offset or fractional seconds.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Number, Value};
use sqlx::query::{Query, QueryScalar};
use sqlx::sqlite::{Sqlite, SqliteArguments, SqliteRow};
use sqlx::{Column, Row, SqlitePool, TypeInfo, ValueRef};

use crate::compiler::identifier;
use crate::compiler::projection::ColumnProjection;
use crate::descriptor::FieldRegistry;
use crate::error::{QueryError, Result};
use crate::query::SelectQuery;
use crate::value::SqlValue;

/// Trait for decoding a SQLite row into an item type
pub trait FromSqlRow: Sized {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error>;
}

type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;
type SqliteCount<'q> = QueryScalar<'q, Sqlite, i64, SqliteArguments<'q>>;

fn timestamp_text(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Bind one value to a query.
pub fn bind_value<'q>(query: SqliteQuery<'q>, value: &'q SqlValue) -> SqliteQuery<'q> {
    match value {
        SqlValue::String(s) => query.bind(s.as_str()),
        SqlValue::Int(i) => query.bind(*i),
        SqlValue::Float(f) => query.bind(*f),
        SqlValue::Bool(b) => query.bind(if *b { 1i32 } else { 0i32 }),
        SqlValue::Timestamp(t) => query.bind(timestamp_text(t)),
        SqlValue::Null => query.bind(None::<String>),
    }
}

/// Bind one value to a COUNT query.
pub fn bind_count<'q>(query: SqliteCount<'q>, value: &'q SqlValue) -> SqliteCount<'q> {
    match value {
        SqlValue::String(s) => query.bind(s.as_str()),
        SqlValue::Int(i) => query.bind(*i),
        SqlValue::Float(f) => query.bind(*f),
        SqlValue::Bool(b) => query.bind(if *b { 1i32 } else { 0i32 }),
        SqlValue::Timestamp(t) => query.bind(timestamp_text(t)),
        SqlValue::Null => query.bind(None::<String>),
    }
}

/// Execute the COUNT form of a query.
pub async fn count(pool: &SqlitePool, query: &SelectQuery) -> Result<i64> {
    let (sql, values) = query.build_count_sql();
    tracing::debug!(sql = %sql, "Executing count query");

    let mut q = sqlx::query_scalar::<_, i64>(&sql);
    for value in &values {
        q = bind_count(q, value);
    }

    Ok(q.fetch_one(pool).await?)
}

/// Execute a query and decode every row.
pub async fn fetch_all<E: FromSqlRow>(pool: &SqlitePool, query: &SelectQuery) -> Result<Vec<E>> {
    let (sql, values) = query.build_sql();
    tracing::debug!(sql = %sql, "Executing page query");

    let mut q = sqlx::query(&sql);
    for value in &values {
        q = bind_value(q, value);
    }

    let rows = q.fetch_all(pool).await?;
    Ok(rows.iter().map(E::from_row).collect::<Result<Vec<_>, _>>()?)
}

/// A row decoded into a JSON object, keyed by column name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct JsonRow(pub Map<String, Value>);

impl FromSqlRow for JsonRow {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        let mut map = Map::new();
        for column in row.columns() {
            map.insert(column.name().to_string(), json_value(row, column.ordinal())?);
        }
        Ok(JsonRow(map))
    }
}

/// Decode by storage class, since SQLite columns are loosely typed.
fn json_value(row: &SqliteRow, index: usize) -> Result<Value, sqlx::Error> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }

    let type_info = raw.type_info();
    let value = match type_info.name() {
        "INTEGER" | "BOOLEAN" => Value::from(row.try_get::<i64, _>(index)?),
        "REAL" => Number::from_f64(row.try_get::<f64, _>(index)?)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        "BLOB" => {
            let bytes = row.try_get::<Vec<u8>, _>(index)?;
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        }
        _ => Value::String(row.try_get::<String, _>(index)?),
    };
    Ok(value)
}

/// A column as reported by `PRAGMA table_info`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    pub declared_type: String,
}

impl ColumnInfo {
    /// DATE, DATETIME, TIMESTAMP and TIME columns get date filters.
    pub fn is_date(&self) -> bool {
        let declared = self.declared_type.to_ascii_uppercase();
        declared.contains("DATE") || declared.contains("TIME")
    }
}

/// Columns of `table`, in table order.
pub async fn table_columns(pool: &SqlitePool, table: &str) -> Result<Vec<ColumnInfo>> {
    let sql = format!("PRAGMA table_info({})", identifier(table)?);
    tracing::debug!(sql = %sql, "Introspecting table");

    let rows = sqlx::query(&sql).fetch_all(pool).await?;
    if rows.is_empty() {
        return Err(QueryError::UnknownTable(table.to_string()));
    }

    let columns = rows
        .iter()
        .map(|row| -> Result<ColumnInfo, sqlx::Error> {
            Ok(ColumnInfo {
                name: row.try_get("name")?,
                declared_type: row.try_get("type")?,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(columns)
}

/// Register every column as filterable and sortable under its own name.
pub fn registry_for(columns: &[ColumnInfo]) -> Result<FieldRegistry> {
    columns
        .iter()
        .fold(FieldRegistry::builder(), |builder, column| {
            let builder = if column.is_date() {
                builder.date_filter(&column.name, &column.name)
            } else {
                builder.filter(&column.name, &column.name)
            };
            builder.sortable(&column.name, &column.name)
        })
        .build()
}

/// Field registry for every column of `table`.
pub async fn introspect_registry(pool: &SqlitePool, table: &str) -> Result<FieldRegistry> {
    let columns = table_columns(pool, table).await?;
    registry_for(&columns)
}

/// Projection over every column of `table`, each aliased by its own name.
pub async fn introspect_projection(pool: &SqlitePool, table: &str) -> Result<ColumnProjection> {
    let columns = table_columns(pool, table).await?;
    Ok(ColumnProjection::new(columns.into_iter().map(|c| c.name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_timestamp_text_is_utc() {
        let t = Utc.with_ymd_and_hms(2020, 9, 19, 21, 10, 35).unwrap();
        assert_eq!(timestamp_text(&t), "2020-09-19T21:10:35Z");
    }

    #[test]
    fn test_date_columns() {
        let column = |t: &str| ColumnInfo {
            name: "c".into(),
            declared_type: t.into(),
        };
        assert!(column("DATETIME").is_date());
        assert!(column("timestamp").is_date());
        assert!(!column("TEXT").is_date());
        assert!(!column("").is_date());
    }

    #[test]
    fn test_registry_for_columns() {
        let registry = registry_for(&[
            ColumnInfo {
                name: "title".into(),
                declared_type: "TEXT".into(),
            },
            ColumnInfo {
                name: "created_at".into(),
                declared_type: "TEXT NOT NULL".into(),
            },
        ])
        .unwrap();
        assert!(registry.filter_field("title").is_some());
        assert_eq!(registry.sort_column("created_at"), Some("created_at"));
    }
}
