//! Filter input types for flexible querying
//!
//! An operator set attaches to exactly one column and supports:
//! - eq, notEq (equals, not equals)
//! - gte, gt, lte, lt and their negations (comparisons)
//! - contains, startsWith, endsWith and their negations (string matching)
//! - in, notIn (list membership)
//! - isNull, isNotNull (null checks)
//!
//! String equality and matching can be made case-insensitive through the
//! field/value case modifiers or the `caseInsensitive` shortcut.

use async_graphql::InputObject;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::value::{SqlValue, ToSqlValue, date_operand};

/// Generic operator set for any comparable column
#[derive(InputObject, Default, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[graphql(name = "GenericFilter")]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct GenericFilter {
    /// Equals
    pub eq: Option<SqlValue>,
    /// Not equals
    pub not_eq: Option<SqlValue>,
    /// Greater than or equal
    pub gte: Option<SqlValue>,
    /// Not greater than or equal
    pub not_gte: Option<SqlValue>,
    /// Greater than
    pub gt: Option<SqlValue>,
    /// Not greater than
    pub not_gt: Option<SqlValue>,
    /// Less than or equal
    pub lte: Option<SqlValue>,
    /// Not less than or equal
    pub not_lte: Option<SqlValue>,
    /// Less than
    pub lt: Option<SqlValue>,
    /// Not less than
    pub not_lt: Option<SqlValue>,
    /// Contains substring
    pub contains: Option<SqlValue>,
    /// Does not contain substring
    pub not_contains: Option<SqlValue>,
    /// Starts with
    pub starts_with: Option<SqlValue>,
    /// Does not start with
    pub not_starts_with: Option<SqlValue>,
    /// Ends with
    pub ends_with: Option<SqlValue>,
    /// Does not end with
    pub not_ends_with: Option<SqlValue>,
    /// In list
    #[graphql(name = "in")]
    #[serde(rename = "in")]
    pub in_list: Option<Vec<SqlValue>>,
    /// Not in list
    pub not_in: Option<Vec<SqlValue>>,
    /// Is null
    #[graphql(default)]
    pub is_null: bool,
    /// Is not null
    #[graphql(default)]
    pub is_not_null: bool,

    /// Wrap the column in `upper(...)`
    #[graphql(default)]
    pub field_uppercase: bool,
    /// Wrap the column in `lower(...)`
    #[graphql(default)]
    pub field_lowercase: bool,
    /// Wrap string operands in `upper(...)`
    #[graphql(default)]
    pub value_uppercase: bool,
    /// Wrap string operands in `lower(...)`
    #[graphql(default)]
    pub value_lowercase: bool,
    /// Same as setting both fieldLowercase and valueLowercase
    #[graphql(default)]
    pub case_insensitive: bool,
}

/// Operator set for date/timestamp columns.
///
/// Operands are RFC3339 strings (or timestamps) and are normalized to UTC
/// before compilation.
#[derive(InputObject, Default, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[graphql(name = "DateFilter")]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct DateFilter {
    /// Equals
    pub eq: Option<SqlValue>,
    /// Not equals
    pub not_eq: Option<SqlValue>,
    /// After or on
    pub gte: Option<SqlValue>,
    /// Not after or on
    pub not_gte: Option<SqlValue>,
    /// After
    pub gt: Option<SqlValue>,
    /// Not after
    pub not_gt: Option<SqlValue>,
    /// Before or on
    pub lte: Option<SqlValue>,
    /// Not before or on
    pub not_lte: Option<SqlValue>,
    /// Before
    pub lt: Option<SqlValue>,
    /// Not before
    pub not_lt: Option<SqlValue>,
    /// In list
    #[graphql(name = "in")]
    #[serde(rename = "in")]
    pub in_list: Option<Vec<SqlValue>>,
    /// Not in list
    pub not_in: Option<Vec<SqlValue>>,
    /// Is null
    #[graphql(default)]
    pub is_null: bool,
    /// Is not null
    #[graphql(default)]
    pub is_not_null: bool,
}

/// Case transform applied to one side of a comparison.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CaseTransform {
    #[default]
    Preserve,
    Lower,
    Upper,
}

impl CaseTransform {
    /// Lowercase wins when both modifiers are set.
    fn resolve(lower: bool, upper: bool) -> Self {
        if lower {
            CaseTransform::Lower
        } else if upper {
            CaseTransform::Upper
        } else {
            CaseTransform::Preserve
        }
    }

    /// Wrap a SQL expression in the transform.
    pub fn wrap(self, expr: &str) -> String {
        match self {
            CaseTransform::Preserve => expr.to_string(),
            CaseTransform::Lower => format!("lower({})", expr),
            CaseTransform::Upper => format!("upper({})", expr),
        }
    }
}

impl GenericFilter {
    /// Check if filter has any conditions
    pub fn is_empty(&self) -> bool {
        self.eq.is_none()
            && self.not_eq.is_none()
            && self.gte.is_none()
            && self.not_gte.is_none()
            && self.gt.is_none()
            && self.not_gt.is_none()
            && self.lte.is_none()
            && self.not_lte.is_none()
            && self.lt.is_none()
            && self.not_lt.is_none()
            && self.contains.is_none()
            && self.not_contains.is_none()
            && self.starts_with.is_none()
            && self.not_starts_with.is_none()
            && self.ends_with.is_none()
            && self.not_ends_with.is_none()
            && self.in_list.is_none()
            && self.not_in.is_none()
            && !self.is_null
            && !self.is_not_null
    }

    /// Transform applied to the column expression.
    pub fn field_case(&self) -> CaseTransform {
        CaseTransform::resolve(
            self.field_lowercase || self.case_insensitive,
            self.field_uppercase,
        )
    }

    /// Transform applied to string operands.
    pub fn value_case(&self) -> CaseTransform {
        CaseTransform::resolve(
            self.value_lowercase || self.case_insensitive,
            self.value_uppercase,
        )
    }

    // ========================================================================
    // Helper constructors for programmatic use
    // ========================================================================

    /// Create an equals filter
    pub fn eq(value: impl ToSqlValue) -> Self {
        Self {
            eq: Some(value.to_sql_value()),
            ..Default::default()
        }
    }

    /// Create a not-equals filter
    pub fn not_eq(value: impl ToSqlValue) -> Self {
        Self {
            not_eq: Some(value.to_sql_value()),
            ..Default::default()
        }
    }

    /// Create a greater-than-or-equal filter
    pub fn gte(value: impl ToSqlValue) -> Self {
        Self {
            gte: Some(value.to_sql_value()),
            ..Default::default()
        }
    }

    /// Create a greater-than filter
    pub fn gt(value: impl ToSqlValue) -> Self {
        Self {
            gt: Some(value.to_sql_value()),
            ..Default::default()
        }
    }

    /// Create a less-than-or-equal filter
    pub fn lte(value: impl ToSqlValue) -> Self {
        Self {
            lte: Some(value.to_sql_value()),
            ..Default::default()
        }
    }

    /// Create a less-than filter
    pub fn lt(value: impl ToSqlValue) -> Self {
        Self {
            lt: Some(value.to_sql_value()),
            ..Default::default()
        }
    }

    /// Create a contains filter
    pub fn contains(value: impl ToSqlValue) -> Self {
        Self {
            contains: Some(value.to_sql_value()),
            ..Default::default()
        }
    }

    /// Create a starts-with filter
    pub fn starts_with(value: impl ToSqlValue) -> Self {
        Self {
            starts_with: Some(value.to_sql_value()),
            ..Default::default()
        }
    }

    /// Create an ends-with filter
    pub fn ends_with(value: impl ToSqlValue) -> Self {
        Self {
            ends_with: Some(value.to_sql_value()),
            ..Default::default()
        }
    }

    /// Create an in-list filter
    pub fn in_list<T: ToSqlValue>(values: impl IntoIterator<Item = T>) -> Self {
        Self {
            in_list: Some(values.into_iter().map(|v| v.to_sql_value()).collect()),
            ..Default::default()
        }
    }

    /// Create a not-in-list filter
    pub fn not_in<T: ToSqlValue>(values: impl IntoIterator<Item = T>) -> Self {
        Self {
            not_in: Some(values.into_iter().map(|v| v.to_sql_value()).collect()),
            ..Default::default()
        }
    }

    /// Create an is-null filter
    pub fn is_null() -> Self {
        Self {
            is_null: true,
            ..Default::default()
        }
    }

    /// Create an is-not-null filter
    pub fn is_not_null() -> Self {
        Self {
            is_not_null: true,
            ..Default::default()
        }
    }

    /// Compare case-insensitively
    pub fn case_insensitive(mut self) -> Self {
        self.case_insensitive = true;
        self
    }
}

impl DateFilter {
    /// Check if filter has any conditions
    pub fn is_empty(&self) -> bool {
        self.eq.is_none()
            && self.not_eq.is_none()
            && self.gte.is_none()
            && self.not_gte.is_none()
            && self.gt.is_none()
            && self.not_gt.is_none()
            && self.lte.is_none()
            && self.not_lte.is_none()
            && self.lt.is_none()
            && self.not_lt.is_none()
            && self.in_list.is_none()
            && self.not_in.is_none()
            && !self.is_null
            && !self.is_not_null
    }

    /// Create an equals filter
    pub fn eq(value: impl ToSqlValue) -> Self {
        Self {
            eq: Some(value.to_sql_value()),
            ..Default::default()
        }
    }

    /// Create a before (less than) filter
    pub fn before(value: impl ToSqlValue) -> Self {
        Self {
            lt: Some(value.to_sql_value()),
            ..Default::default()
        }
    }

    /// Create an after (greater than) filter
    pub fn after(value: impl ToSqlValue) -> Self {
        Self {
            gt: Some(value.to_sql_value()),
            ..Default::default()
        }
    }

    /// Create a between filter (inclusive)
    pub fn between(start: impl ToSqlValue, end: impl ToSqlValue) -> Self {
        Self {
            gte: Some(start.to_sql_value()),
            lte: Some(end.to_sql_value()),
            ..Default::default()
        }
    }

    /// Parse every operand into a UTC instant and produce the generic operator set.
    pub fn to_generic(&self) -> Result<GenericFilter> {
        fn one(operator: &'static str, v: &Option<SqlValue>) -> Result<Option<SqlValue>> {
            v.as_ref().map(|v| date_operand(operator, v)).transpose()
        }
        fn many(operator: &'static str, v: &Option<Vec<SqlValue>>) -> Result<Option<Vec<SqlValue>>> {
            v.as_ref()
                .map(|items| items.iter().map(|v| date_operand(operator, v)).collect())
                .transpose()
        }

        Ok(GenericFilter {
            eq: one("eq", &self.eq)?,
            not_eq: one("notEq", &self.not_eq)?,
            gte: one("gte", &self.gte)?,
            not_gte: one("notGte", &self.not_gte)?,
            gt: one("gt", &self.gt)?,
            not_gt: one("notGt", &self.not_gt)?,
            lte: one("lte", &self.lte)?,
            not_lte: one("notLte", &self.not_lte)?,
            lt: one("lt", &self.lt)?,
            not_lt: one("notLt", &self.not_lt)?,
            in_list: many("in", &self.in_list)?,
            not_in: many("notIn", &self.not_in)?,
            is_null: self.is_null,
            is_not_null: self.is_not_null,
            ..Default::default()
        })
    }
}

/// A descriptor field that can act as a filter leaf.
///
/// Implemented for the operator-set types and their `Option`s; derived
/// descriptors call it on every field tagged with a column.
pub trait LeafSource {
    /// The generic operator set, or `None` when the field is absent.
    fn leaf_operators(&self) -> Result<Option<GenericFilter>>;
}

impl LeafSource for GenericFilter {
    fn leaf_operators(&self) -> Result<Option<GenericFilter>> {
        Ok(Some(self.clone()))
    }
}

impl LeafSource for DateFilter {
    fn leaf_operators(&self) -> Result<Option<GenericFilter>> {
        self.to_generic().map(Some)
    }
}

impl<T: LeafSource> LeafSource for Option<T> {
    fn leaf_operators(&self) -> Result<Option<GenericFilter>> {
        match self {
            Some(inner) => inner.leaf_operators(),
            None => Ok(None),
        }
    }
}

impl<T: LeafSource> LeafSource for Box<T> {
    fn leaf_operators(&self) -> Result<Option<GenericFilter>> {
        (**self).leaf_operators()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_lowercase_wins_over_uppercase() {
        let filter = GenericFilter {
            field_lowercase: true,
            field_uppercase: true,
            value_lowercase: true,
            value_uppercase: true,
            ..Default::default()
        };
        assert_eq!(filter.field_case(), CaseTransform::Lower);
        assert_eq!(filter.value_case(), CaseTransform::Lower);
    }

    #[test]
    fn test_case_insensitive_shortcut() {
        let filter = GenericFilter::eq("x").case_insensitive();
        assert_eq!(filter.field_case(), CaseTransform::Lower);
        assert_eq!(filter.value_case(), CaseTransform::Lower);

        let upper = GenericFilter {
            field_uppercase: true,
            ..Default::default()
        };
        assert_eq!(upper.field_case(), CaseTransform::Upper);
        assert_eq!(upper.value_case(), CaseTransform::Preserve);
    }

    #[test]
    fn test_is_empty() {
        assert!(GenericFilter::default().is_empty());
        assert!(!GenericFilter::is_null().is_empty());
        assert!(DateFilter::default().is_empty());
        assert!(!DateFilter::after("2020-01-01T00:00:00Z").is_empty());
    }

    #[test]
    fn test_date_filter_to_generic() {
        let filter = DateFilter {
            eq: Some("2020-09-19T23:10:35+02:00".to_sql_value()),
            in_list: Some(vec!["2020-01-01T00:00:00Z".to_sql_value()]),
            is_not_null: true,
            ..Default::default()
        };
        let generic = filter.to_generic().unwrap();
        assert_eq!(
            generic.eq,
            Some(SqlValue::Timestamp(Utc.with_ymd_and_hms(2020, 9, 19, 21, 10, 35).unwrap()))
        );
        assert_eq!(
            generic.in_list,
            Some(vec![SqlValue::Timestamp(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap())])
        );
        assert!(generic.is_not_null);
    }

    #[test]
    fn test_date_filter_reports_operator() {
        let err = DateFilter {
            not_gte: Some("not a date".to_sql_value()),
            ..Default::default()
        }
        .to_generic()
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "notGte value \"not a date\" is not a valid RFC3339 date"
        );
    }

    #[test]
    fn test_generic_filter_from_json() {
        let filter: GenericFilter =
            serde_json::from_str(r#"{"in": ["a", "b"], "caseInsensitive": true}"#).unwrap();
        assert_eq!(filter.in_list, Some(vec!["a".to_sql_value(), "b".to_sql_value()]));
        assert!(filter.case_insensitive);
        assert!(serde_json::from_str::<GenericFilter>(r#"{"equals": 1}"#).is_err());
    }
}
