//! Operand values and their normalization
//!
//! Every operand reaching a compiler is first reduced to a [`SqlValue`], the
//! canonical comparable form that is later bound as a query parameter.

use async_graphql::{InputValueError, InputValueResult, Number, Scalar, ScalarType, Value};
use chrono::{DateTime, NaiveDate, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{QueryError, Result};

/// A value that can be bound to a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    #[serde(skip_deserializing)]
    Timestamp(DateTime<Utc>),
}

impl SqlValue {
    /// Short name of the value kind, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            SqlValue::Null => "null",
            SqlValue::Bool(_) => "boolean",
            SqlValue::Int(_) => "integer",
            SqlValue::Float(_) => "float",
            SqlValue::String(_) => "string",
            SqlValue::Timestamp(_) => "timestamp",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SqlValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_string(&self) -> bool {
        matches!(self, SqlValue::String(_))
    }
}

/// Exposed to GraphQL as the `FilterValue` scalar: any of string, number,
/// boolean or enum literal.
#[Scalar(name = "FilterValue")]
impl ScalarType for SqlValue {
    fn parse(value: Value) -> InputValueResult<Self> {
        match value {
            Value::Null => Ok(SqlValue::Null),
            Value::Boolean(b) => Ok(SqlValue::Bool(b)),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(SqlValue::Int(i))
                } else if let Some(f) = n.as_f64() {
                    Ok(SqlValue::Float(f))
                } else {
                    Err(InputValueError::expected_type(Value::Number(n)))
                }
            }
            Value::String(s) => Ok(SqlValue::String(s)),
            Value::Enum(name) => Ok(SqlValue::String(name.to_string())),
            other => Err(InputValueError::expected_type(other)),
        }
    }

    fn to_value(&self) -> Value {
        match self {
            SqlValue::Null => Value::Null,
            SqlValue::Bool(b) => Value::Boolean(*b),
            SqlValue::Int(i) => Value::Number((*i).into()),
            SqlValue::Float(f) => Number::from_f64(*f).map_or(Value::Null, Value::Number),
            SqlValue::String(s) => Value::String(s.clone()),
            SqlValue::Timestamp(t) => {
                Value::String(t.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
        }
    }
}

/// Conversion of a Rust value into its canonical operand form.
pub trait ToSqlValue {
    fn to_sql_value(&self) -> SqlValue;
}

impl ToSqlValue for SqlValue {
    fn to_sql_value(&self) -> SqlValue {
        self.clone()
    }
}

impl ToSqlValue for str {
    fn to_sql_value(&self) -> SqlValue {
        SqlValue::String(self.to_string())
    }
}

impl ToSqlValue for String {
    fn to_sql_value(&self) -> SqlValue {
        SqlValue::String(self.clone())
    }
}

impl ToSqlValue for bool {
    fn to_sql_value(&self) -> SqlValue {
        SqlValue::Bool(*self)
    }
}

macro_rules! int_to_sql_value {
    ($($t:ty),*) => {
        $(
            impl ToSqlValue for $t {
                fn to_sql_value(&self) -> SqlValue {
                    SqlValue::Int(i64::from(*self))
                }
            }
        )*
    };
}

int_to_sql_value!(i8, i16, i32, i64, u8, u16, u32);

impl ToSqlValue for f32 {
    fn to_sql_value(&self) -> SqlValue {
        SqlValue::Float(f64::from(*self))
    }
}

impl ToSqlValue for f64 {
    fn to_sql_value(&self) -> SqlValue {
        SqlValue::Float(*self)
    }
}

impl<Tz: TimeZone> ToSqlValue for DateTime<Tz> {
    fn to_sql_value(&self) -> SqlValue {
        SqlValue::Timestamp(self.with_timezone(&Utc))
    }
}

impl ToSqlValue for NaiveDate {
    fn to_sql_value(&self) -> SqlValue {
        SqlValue::String(self.format("%Y-%m-%d").to_string())
    }
}

impl<T: ToSqlValue + ?Sized> ToSqlValue for &T {
    fn to_sql_value(&self) -> SqlValue {
        (**self).to_sql_value()
    }
}

impl<T: ToSqlValue> ToSqlValue for Option<T> {
    fn to_sql_value(&self) -> SqlValue {
        self.as_ref().map_or(SqlValue::Null, ToSqlValue::to_sql_value)
    }
}

/// Implement [`ToSqlValue`] for string-backed enums through their `Display` impl.
///
/// ```ignore
/// impl_sql_value_for_enum!(MovieStatus, LibraryType);
/// ```
#[macro_export]
macro_rules! impl_sql_value_for_enum {
    ($($t:ty),+ $(,)?) => {
        $(
            impl $crate::value::ToSqlValue for $t {
                fn to_sql_value(&self) -> $crate::value::SqlValue {
                    $crate::value::SqlValue::String(self.to_string())
                }
            }
        )+
    };
}

/// Operand of a string-only operator (`contains`, `startsWith`, `endsWith`
/// and their negations).
pub fn string_operand<'a>(operator: &'static str, value: &'a SqlValue) -> Result<&'a str> {
    value.as_str().ok_or(QueryError::NotAString { operator })
}

/// Operand of a date-typed leaf, normalized to a UTC instant.
///
/// Strings must be RFC3339 (fractional seconds of any precision accepted).
/// Anything that is neither a string nor a timestamp means the field was
/// wired to the wrong filter type.
pub fn date_operand(operator: &'static str, value: &SqlValue) -> Result<SqlValue> {
    match value {
        SqlValue::String(s) => parse_datetime(s)
            .map(SqlValue::Timestamp)
            .ok_or_else(|| QueryError::InvalidDate {
                operator,
                value: s.clone(),
            }),
        SqlValue::Timestamp(t) => Ok(SqlValue::Timestamp(*t)),
        other => Err(QueryError::UnsupportedDateValue {
            operator,
            kind: other.kind(),
        }),
    }
}

/// Parse an RFC3339 / RFC3339Nano string into UTC.
pub fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s.trim())
        .ok()
        .map(|t| t.with_timezone(&Utc))
}
