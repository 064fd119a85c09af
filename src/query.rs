//! SELECT/COUNT query builder
//!
//! Builds parameterized SQL for one table from compiled predicates, an ORDER BY
//! clause and limit/offset. The count query shares the WHERE clause but ignores
//! ordering, projection and the page window.

use crate::compiler::identifier;
use crate::compiler::predicate::Predicate;
use crate::compiler::sort::OrderBy;
use crate::error::Result;
use crate::value::{SqlValue, ToSqlValue};

/// A query over a single table.
#[derive(Debug, Clone)]
pub struct SelectQuery {
    table: String,
    columns: Vec<String>,
    predicates: Vec<Predicate>,
    order: Option<OrderBy>,
    limit: Option<i64>,
    offset: Option<i64>,
}

impl SelectQuery {
    /// Create a query over `table`, selecting every column.
    pub fn new(table: &str) -> Result<Self> {
        Ok(Self {
            table: identifier(table)?.to_string(),
            columns: Vec::new(),
            predicates: Vec::new(),
            order: None,
            limit: None,
            offset: None,
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Restrict the selected columns. An empty list selects `*`.
    pub fn columns<I, S>(mut self, columns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut selected = Vec::new();
        for column in columns {
            let column = column.into();
            identifier(&column)?;
            selected.push(column);
        }
        self.columns = selected;
        Ok(self)
    }

    /// AND a compiled predicate onto the query. `None` is a no-op.
    pub fn filter(mut self, predicate: Option<Predicate>) -> Self {
        self.predicates.extend(predicate);
        self
    }

    /// Add a `column = ?` condition.
    pub fn where_eq(mut self, column: &str, value: impl ToSqlValue) -> Result<Self> {
        let column = identifier(column)?;
        self.predicates.push(Predicate::new(
            format!("{} = ?", column),
            vec![value.to_sql_value()],
        ));
        Ok(self)
    }

    /// Add a trusted SQL condition with its bound values. The fragment is
    /// always parenthesised.
    pub fn where_raw(mut self, condition: &str, values: Vec<SqlValue>) -> Self {
        self.predicates
            .push(Predicate::new(format!("({})", condition), values));
        self
    }

    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order = Some(order);
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset);
        self
    }

    fn where_clause(&self) -> Option<Predicate> {
        Predicate::all(self.predicates.iter().cloned())
    }

    fn push_where(&self, sql: &mut String) -> Vec<SqlValue> {
        match self.where_clause() {
            Some(predicate) => {
                let (condition, values) = predicate.into_parts();
                sql.push_str(" WHERE ");
                sql.push_str(&condition);
                values
            }
            None => Vec::new(),
        }
    }

    /// Build the data query and its bind values.
    pub fn build_sql(&self) -> (String, Vec<SqlValue>) {
        let columns = if self.columns.is_empty() {
            "*".to_string()
        } else {
            self.columns.join(", ")
        };
        let mut sql = format!("SELECT {} FROM {}", columns, self.table);
        let values = self.push_where(&mut sql);

        if let Some(ref order) = self.order {
            sql.push_str(" ORDER BY ");
            sql.push_str(&order.to_sql());
        }

        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        if let Some(offset) = self.offset {
            if offset > 0 {
                sql.push_str(&format!(" OFFSET {}", offset));
            }
        }

        (sql, values)
    }

    /// Build a COUNT query over the same WHERE clause.
    pub fn build_count_sql(&self) -> (String, Vec<SqlValue>) {
        let mut sql = format!("SELECT COUNT(*) FROM {}", self.table);
        let values = self.push_where(&mut sql);
        (sql, values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::filter::Filter;
    use crate::compiler::sort::{SortKey, SortSpec, compile_sort};
    use crate::descriptor::DynamicSort;
    use crate::error::QueryError;
    use crate::filters::GenericFilter;
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;

    fn default_order() -> OrderBy {
        compile_sort::<DynamicSort>(None::<&SortSpec<DynamicSort>>, &SortKey::default()).unwrap()
    }

    #[test]
    fn test_plain_select() {
        let query = SelectQuery::new("movies").unwrap();
        assert_eq!(query.build_sql().0, "SELECT * FROM movies");
        assert_eq!(query.build_count_sql().0, "SELECT COUNT(*) FROM movies");
    }

    #[test]
    fn test_full_select() {
        let predicate = Filter::or([
            Filter::leaf("title", GenericFilter::eq("a")),
            Filter::leaf("title", GenericFilter::eq("b")),
        ])
        .compile()
        .unwrap();
        let query = SelectQuery::new("movies")
            .unwrap()
            .columns(["id", "title"])
            .unwrap()
            .where_eq("library_id", 7)
            .unwrap()
            .filter(predicate)
            .order_by(default_order())
            .limit(5)
            .offset(20);

        let (sql, values) = query.build_sql();
        assert_eq!(
            sql,
            "SELECT id, title FROM movies WHERE library_id = ? AND (title = ? OR title = ?) \
             ORDER BY created_at DESC LIMIT 5 OFFSET 20"
        );
        assert_eq!(values.len(), 3);

        let (count, values) = query.build_count_sql();
        assert_eq!(
            count,
            "SELECT COUNT(*) FROM movies WHERE library_id = ? AND (title = ? OR title = ?)"
        );
        assert_eq!(values.len(), 3);
    }

    #[test]
    fn test_zero_offset_omitted() {
        let query = SelectQuery::new("t").unwrap().limit(10).offset(0);
        assert_eq!(query.build_sql().0, "SELECT * FROM t LIMIT 10");
    }

    #[test]
    fn test_where_raw_is_grouped() {
        let query = SelectQuery::new("t")
            .unwrap()
            .where_raw("a = ? OR b = ?", vec![SqlValue::Int(1), SqlValue::Int(2)])
            .filter(Filter::leaf("c", GenericFilter::is_null()).compile().unwrap());
        assert_eq!(
            query.build_sql().0,
            "SELECT * FROM t WHERE (a = ? OR b = ?) AND c IS NULL"
        );
    }

    #[test]
    fn test_identifiers_checked() {
        assert_matches!(SelectQuery::new("movies m"), Err(QueryError::InvalidIdentifier(_)));
        let err = SelectQuery::new("movies")
            .unwrap()
            .columns(["title", "1=1"])
            .unwrap_err();
        assert_matches!(err, QueryError::InvalidIdentifier(ref c) if c == "1=1");
    }
}
