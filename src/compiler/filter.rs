//! Filter compiler
//!
//! Turns a filter tree into a parameterized [`Predicate`]. Descriptor structs
//! (usually `#[derive(FilterInput)]`) produce the tree through
//! [`FilterDescriptor`]; a node's leaves, its `AND` group and its `OR` group
//! are AND-combined, each one grouped independently.

use std::borrow::Cow;

use super::identifier;
use super::predicate::Predicate;
use crate::error::Result;
use crate::filters::{CaseTransform, GenericFilter};
use crate::value::{SqlValue, string_operand};

/// A filter tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// One column's operator set.
    Leaf {
        column: Cow<'static, str>,
        operators: GenericFilter,
    },
    /// All children must match.
    And(Vec<Filter>),
    /// Any child must match.
    Or(Vec<Filter>),
}

impl Filter {
    /// Leaf for a trusted column name.
    pub fn leaf(column: impl Into<Cow<'static, str>>, operators: GenericFilter) -> Self {
        Filter::Leaf {
            column: column.into(),
            operators,
        }
    }

    pub fn and(children: impl IntoIterator<Item = Filter>) -> Self {
        Filter::And(children.into_iter().collect())
    }

    pub fn or(children: impl IntoIterator<Item = Filter>) -> Self {
        Filter::Or(children.into_iter().collect())
    }

    /// Compile the tree. `None` means the tree imposes no condition.
    pub fn compile(&self) -> Result<Option<Predicate>> {
        match self {
            Filter::Leaf { column, operators } => compile_leaf(identifier(column)?, operators),
            Filter::And(children) => Ok(Predicate::all(compile_children(children)?)),
            Filter::Or(children) => Ok(Predicate::any(compile_children(children)?)),
        }
    }
}

fn compile_children(children: &[Filter]) -> Result<Vec<Predicate>> {
    let mut compiled = Vec::with_capacity(children.len());
    for child in children {
        if let Some(predicate) = child.compile()? {
            compiled.push(predicate);
        }
    }
    Ok(compiled)
}

/// A value that describes a filter tree.
pub trait FilterDescriptor {
    fn to_filter(&self) -> Result<Filter>;
}

impl FilterDescriptor for Filter {
    fn to_filter(&self) -> Result<Filter> {
        Ok(self.clone())
    }
}

impl<T: FilterDescriptor + ?Sized> FilterDescriptor for Box<T> {
    fn to_filter(&self) -> Result<Filter> {
        (**self).to_filter()
    }
}

/// A descriptor field holding an `AND`/`OR` collection of child descriptors.
pub trait FilterGroup {
    /// Child trees, or `None` when the collection is absent or empty.
    fn group_children(&self) -> Result<Option<Vec<Filter>>>;
}

impl<T: FilterDescriptor> FilterGroup for Vec<T> {
    fn group_children(&self) -> Result<Option<Vec<Filter>>> {
        if self.is_empty() {
            return Ok(None);
        }
        self.iter()
            .map(FilterDescriptor::to_filter)
            .collect::<Result<Vec<_>>>()
            .map(Some)
    }
}

impl<T: FilterDescriptor> FilterGroup for Option<Vec<T>> {
    fn group_children(&self) -> Result<Option<Vec<Filter>>> {
        match self {
            Some(children) => children.group_children(),
            None => Ok(None),
        }
    }
}

/// Compile an optional descriptor. An absent descriptor yields no predicate.
pub fn compile_filter<D>(descriptor: Option<&D>) -> Result<Option<Predicate>>
where
    D: FilterDescriptor + ?Sized,
{
    match descriptor {
        Some(descriptor) => descriptor.to_filter()?.compile(),
        None => Ok(None),
    }
}

fn compile_leaf(column: &str, ops: &GenericFilter) -> Result<Option<Predicate>> {
    let field = ops.field_case().wrap(column);
    let value_case = ops.value_case();
    let mut parts = Vec::new();

    if let Some(value) = &ops.eq {
        parts.push(equality(column, &field, value, value_case, false));
    }
    if let Some(value) = &ops.not_eq {
        parts.push(equality(column, &field, value, value_case, true));
    }

    // Ordering comparisons ignore case modifiers.
    let comparisons = [
        (&ops.gte, ">="),
        (&ops.not_gte, "<"),
        (&ops.gt, ">"),
        (&ops.not_gt, "<="),
        (&ops.lte, "<="),
        (&ops.not_lte, ">"),
        (&ops.lt, "<"),
        (&ops.not_lt, ">="),
    ];
    for (value, op) in comparisons {
        if let Some(value) = value {
            let (lhs, rhs) = match value {
                SqlValue::Timestamp(_) => (instant(column), instant("?")),
                _ => (column.to_string(), "?".to_string()),
            };
            parts.push(Predicate::new(
                format!("{} {} {}", lhs, op, rhs),
                vec![value.clone()],
            ));
        }
    }

    let patterns: [(&Option<SqlValue>, &'static str, Pattern, bool); 6] = [
        (&ops.contains, "contains", Pattern::Contains, false),
        (&ops.not_contains, "notContains", Pattern::Contains, true),
        (&ops.starts_with, "startsWith", Pattern::Prefix, false),
        (&ops.not_starts_with, "notStartsWith", Pattern::Prefix, true),
        (&ops.ends_with, "endsWith", Pattern::Suffix, false),
        (&ops.not_ends_with, "notEndsWith", Pattern::Suffix, true),
    ];
    for (value, operator, pattern, negate) in patterns {
        if let Some(value) = value {
            let text = string_operand(operator, value)?;
            let keyword = if negate { "NOT LIKE" } else { "LIKE" };
            parts.push(Predicate::new(
                format!("{} {} {}", field, keyword, value_case.wrap("?")),
                vec![SqlValue::String(pattern.apply(text))],
            ));
        }
    }

    if let Some(values) = &ops.in_list {
        parts.extend(membership(column, &field, values, value_case, false));
    }
    if let Some(values) = &ops.not_in {
        parts.extend(membership(column, &field, values, value_case, true));
    }

    if ops.is_null {
        parts.push(Predicate::raw(format!("{} IS NULL", column)));
    }
    if ops.is_not_null {
        parts.push(Predicate::raw(format!("{} IS NOT NULL", column)));
    }

    Ok(Predicate::all(parts))
}

#[derive(Debug, Clone, Copy)]
enum Pattern {
    Contains,
    Prefix,
    Suffix,
}

impl Pattern {
    fn apply(self, text: &str) -> String {
        match self {
            Pattern::Contains => format!("%{}%", text),
            Pattern::Prefix => format!("{}%", text),
            Pattern::Suffix => format!("%{}", text),
        }
    }
}

/// Timestamp operands compare as instants; `julianday` accepts any RFC3339
/// offset and fractional seconds.
fn instant(expr: &str) -> String {
    format!("julianday({})", expr)
}

/// Placeholder for one operand; only string operands take the value transform.
fn placeholder(value: &SqlValue, case: CaseTransform) -> String {
    match value {
        SqlValue::String(_) => case.wrap("?"),
        SqlValue::Timestamp(_) => instant("?"),
        _ => "?".to_string(),
    }
}

fn equality(
    column: &str,
    field: &str,
    value: &SqlValue,
    case: CaseTransform,
    negate: bool,
) -> Predicate {
    if matches!(value, SqlValue::Null) {
        let check = if negate { "IS NOT NULL" } else { "IS NULL" };
        return Predicate::raw(format!("{} {}", field, check));
    }
    let lhs = match value {
        SqlValue::Timestamp(_) => instant(column),
        _ => field.to_string(),
    };
    let op = if negate { "<>" } else { "=" };
    Predicate::new(
        format!("{} {} {}", lhs, op, placeholder(value, case)),
        vec![value.clone()],
    )
}

fn membership(
    column: &str,
    field: &str,
    values: &[SqlValue],
    case: CaseTransform,
    negate: bool,
) -> Option<Predicate> {
    if values.is_empty() {
        // Nothing is in an empty set.
        return if negate {
            None
        } else {
            Some(Predicate::raw("1 = 0"))
        };
    }
    let temporal = values.iter().all(|v| matches!(v, SqlValue::Timestamp(_)));
    let lhs = if temporal {
        instant(column)
    } else {
        field.to_string()
    };
    let placeholders = values
        .iter()
        .map(|v| {
            if temporal {
                instant("?")
            } else if v.is_string() {
                case.wrap("?")
            } else {
                "?".to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(", ");
    let op = if negate { "NOT IN" } else { "IN" };
    Some(Predicate::new(
        format!("{} {} ({})", lhs, op, placeholders),
        values.to_vec(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QueryError;
    use crate::value::ToSqlValue;
    use assert_matches::assert_matches;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn sql(filter: &Filter) -> String {
        filter.compile().unwrap().map(|p| p.sql().to_string()).unwrap_or_default()
    }

    #[test]
    fn test_absent_descriptor_has_no_predicate() {
        assert_eq!(compile_filter::<Filter>(None).unwrap(), None);
        assert_eq!(Filter::and([]).compile().unwrap(), None);
        assert_eq!(Filter::leaf("name", GenericFilter::default()).compile().unwrap(), None);
    }

    #[test]
    fn test_or_branch_is_grouped() {
        let filter = Filter::and([
            Filter::leaf("f2", GenericFilter::eq("c")),
            Filter::or([
                Filter::leaf("f1", GenericFilter::eq("a")),
                Filter::leaf("f1", GenericFilter::eq("b")),
            ]),
        ]);
        let predicate = filter.compile().unwrap().unwrap();
        assert_eq!(predicate.sql(), "f2 = ? AND (f1 = ? OR f1 = ?)");
        assert_eq!(
            predicate.values(),
            &["c".to_sql_value(), "a".to_sql_value(), "b".to_sql_value()]
        );
    }

    #[test]
    fn test_and_group_with_several_children_is_grouped() {
        let filter = Filter::and([
            Filter::leaf("a", GenericFilter::eq(1)),
            Filter::and([
                Filter::leaf("b", GenericFilter::eq(2)),
                Filter::leaf("c", GenericFilter::eq(3)),
            ]),
            Filter::and([Filter::leaf("d", GenericFilter::eq(4))]),
        ]);
        assert_eq!(sql(&filter), "a = ? AND (b = ? AND c = ?) AND d = ?");
    }

    #[test]
    fn test_multi_operator_leaf_is_grouped() {
        let filter = Filter::or([
            Filter::leaf(
                "year",
                GenericFilter {
                    gte: Some(SqlValue::Int(1990)),
                    lt: Some(SqlValue::Int(2000)),
                    ..Default::default()
                },
            ),
            Filter::leaf("year", GenericFilter::is_null()),
        ]);
        assert_eq!(sql(&filter), "(year >= ? AND year < ?) OR year IS NULL");
    }

    #[test]
    fn test_negated_comparisons() {
        let filter = Filter::leaf(
            "n",
            GenericFilter {
                not_eq: Some(SqlValue::Int(1)),
                not_gte: Some(SqlValue::Int(2)),
                not_gt: Some(SqlValue::Int(3)),
                not_lte: Some(SqlValue::Int(4)),
                not_lt: Some(SqlValue::Int(5)),
                ..Default::default()
            },
        );
        assert_eq!(sql(&filter), "n <> ? AND n < ? AND n <= ? AND n > ? AND n >= ?");
    }

    #[test]
    fn test_like_patterns() {
        let filter = Filter::leaf(
            "title",
            GenericFilter {
                contains: Some("ring".to_sql_value()),
                not_starts_with: Some("The".to_sql_value()),
                ends_with: Some("King".to_sql_value()),
                ..Default::default()
            },
        );
        let predicate = filter.compile().unwrap().unwrap();
        assert_eq!(
            predicate.sql(),
            "title LIKE ? AND title NOT LIKE ? AND title LIKE ?"
        );
        assert_eq!(
            predicate.values(),
            &["%ring%".to_sql_value(), "The%".to_sql_value(), "%King".to_sql_value()]
        );
    }

    #[test]
    fn test_case_modifiers() {
        let filter = Filter::leaf(
            "name",
            GenericFilter {
                field_lowercase: true,
                field_uppercase: true,
                value_uppercase: true,
                ..GenericFilter::eq("Bob")
            },
        );
        assert_eq!(sql(&filter), "lower(name) = upper(?)");

        let ci = Filter::leaf("name", GenericFilter::starts_with("bo").case_insensitive());
        assert_eq!(sql(&ci), "lower(name) LIKE lower(?)");
    }

    #[test]
    fn test_case_modifiers_ignored_for_comparisons_and_nulls() {
        let filter = Filter::leaf(
            "name",
            GenericFilter {
                gt: Some("m".to_sql_value()),
                is_not_null: true,
                ..GenericFilter::default().case_insensitive()
            },
        );
        assert_eq!(sql(&filter), "name > ? AND name IS NOT NULL");
    }

    #[test]
    fn test_case_value_transform_skips_non_strings() {
        let filter = Filter::leaf(
            "code",
            GenericFilter::in_list([SqlValue::Int(1), "a".to_sql_value()]).case_insensitive(),
        );
        assert_eq!(sql(&filter), "lower(code) IN (?, lower(?))");
    }

    #[test]
    fn test_membership_edge_cases() {
        assert_eq!(
            sql(&Filter::leaf("id", GenericFilter::in_list(Vec::<i64>::new()))),
            "1 = 0"
        );
        assert_eq!(
            Filter::leaf("id", GenericFilter::not_in(Vec::<i64>::new())).compile().unwrap(),
            None
        );
        assert_eq!(
            sql(&Filter::leaf("id", GenericFilter::not_in([1, 2]))),
            "id NOT IN (?, ?)"
        );
    }

    #[test]
    fn test_timestamps_compare_as_instants() {
        let at = SqlValue::Timestamp(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap());
        let filter = Filter::leaf(
            "created_at",
            GenericFilter {
                eq: Some(at.clone()),
                gt: Some(at.clone()),
                not_in: Some(vec![at.clone(), at.clone()]),
                ..Default::default()
            },
        );
        let predicate = filter.compile().unwrap().unwrap();
        assert_eq!(
            predicate.sql(),
            "julianday(created_at) = julianday(?) AND julianday(created_at) > julianday(?) \
             AND julianday(created_at) NOT IN (julianday(?), julianday(?))"
        );
        assert_eq!(predicate.values().len(), 4);

        let nulls = Filter::leaf("created_at", GenericFilter::is_null());
        assert_eq!(sql(&nulls), "created_at IS NULL");
    }

    #[test]
    fn test_eq_null_becomes_is_null() {
        assert_eq!(sql(&Filter::leaf("x", GenericFilter::eq(SqlValue::Null))), "x IS NULL");
        assert_eq!(
            sql(&Filter::leaf("x", GenericFilter::not_eq(SqlValue::Null))),
            "x IS NOT NULL"
        );
    }

    #[test]
    fn test_contains_requires_string() {
        let err = Filter::leaf("title", GenericFilter::contains(42))
            .compile()
            .unwrap_err();
        assert_matches!(err, QueryError::NotAString { operator: "contains" });

        let err = Filter::leaf(
            "title",
            GenericFilter {
                not_ends_with: Some(true.to_sql_value()),
                ..Default::default()
            },
        )
        .compile()
        .unwrap_err();
        assert_eq!(err.to_string(), "notEndsWith value must be a string");
    }

    #[test]
    fn test_untrusted_column_rejected() {
        let err = Filter::leaf("name; DROP TABLE x", GenericFilter::eq(1))
            .compile()
            .unwrap_err();
        assert_matches!(err, QueryError::InvalidIdentifier(_));
    }
}
