//! Parameterized boolean predicates
//!
//! A [`Predicate`] is a SQL fragment using `?` placeholders together with the
//! values to bind, in placeholder order. Values are never interpolated.

use crate::value::SqlValue;

#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    sql: String,
    values: Vec<SqlValue>,
    /// Number of operands joined at the top level of `sql`.
    terms: usize,
}

impl Predicate {
    /// A single condition.
    pub fn new(sql: impl Into<String>, values: Vec<SqlValue>) -> Self {
        Self {
            sql: sql.into(),
            values,
            terms: 1,
        }
    }

    /// A condition without bound values.
    pub fn raw(sql: impl Into<String>) -> Self {
        Self::new(sql, Vec::new())
    }

    /// Join predicates with AND. Returns `None` when there is nothing to join.
    pub fn all(parts: impl IntoIterator<Item = Predicate>) -> Option<Predicate> {
        Self::join(" AND ", parts)
    }

    /// Join predicates with OR. Returns `None` when there is nothing to join.
    pub fn any(parts: impl IntoIterator<Item = Predicate>) -> Option<Predicate> {
        Self::join(" OR ", parts)
    }

    fn join(separator: &str, parts: impl IntoIterator<Item = Predicate>) -> Option<Predicate> {
        let mut parts: Vec<Predicate> = parts.into_iter().collect();
        match parts.len() {
            0 => None,
            1 => parts.pop(),
            terms => {
                let sql = parts
                    .iter()
                    .map(Predicate::grouped)
                    .collect::<Vec<_>>()
                    .join(separator);
                let values = parts.into_iter().flat_map(|p| p.values).collect();
                Some(Predicate { sql, values, terms })
            }
        }
    }

    /// The SQL, parenthesised when it joins more than one operand.
    pub fn grouped(&self) -> String {
        if self.terms > 1 {
            format!("({})", self.sql)
        } else {
            self.sql.clone()
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn values(&self) -> &[SqlValue] {
        &self.values
    }

    pub fn into_parts(self) -> (String, Vec<SqlValue>) {
        (self.sql, self.values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn eq(column: &str, value: &str) -> Predicate {
        Predicate::new(format!("{} = ?", column), vec![SqlValue::String(value.into())])
    }

    #[test]
    fn test_single_term_is_not_grouped() {
        let p = Predicate::all([eq("a", "1")]).unwrap();
        assert_eq!(p.grouped(), "a = ?");
    }

    #[test]
    fn test_or_group_inside_and() {
        let or = Predicate::any([eq("f1", "a"), eq("f1", "b")]).unwrap();
        let root = Predicate::all([eq("f2", "c"), or]).unwrap();
        assert_eq!(root.sql(), "f2 = ? AND (f1 = ? OR f1 = ?)");
        let values: Vec<_> = root.values().iter().filter_map(SqlValue::as_str).collect();
        assert_eq!(values, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_empty_join_is_none() {
        assert!(Predicate::all(Vec::new()).is_none());
        assert!(Predicate::any(Vec::new()).is_none());
    }
}
