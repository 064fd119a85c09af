//! async-graphql glue
//!
//! Converts [`QueryError`]s into GraphQL errors carrying a `code` extension and
//! builds a [`RequestedFields`] tree from a resolver's look-ahead selection.

use async_graphql::context::SelectionField;
use async_graphql::{Context, ErrorExtensions};

use crate::compiler::projection::RequestedFields;
use crate::error::QueryError;

/// Code extension for errors caused by the request.
pub const BAD_USER_INPUT: &str = "BAD_USER_INPUT";
/// Code extension for everything else.
pub const INTERNAL: &str = "INTERNAL";

/// Convert a query error, logging and masking internal ones.
pub fn graphql_error(err: QueryError) -> async_graphql::Error {
    let code = if err.is_internal() {
        tracing::error!(error = %err, "Query failed");
        INTERNAL
    } else {
        BAD_USER_INPUT
    };
    async_graphql::Error::new(err.public_message()).extend_with(|_, e| e.set("code", code))
}

/// Extension trait to surface query results from resolvers
pub trait QueryResultExt<T> {
    fn into_graphql(self) -> async_graphql::Result<T>;
}

impl<T> QueryResultExt<T> for Result<T, QueryError> {
    fn into_graphql(self) -> async_graphql::Result<T> {
        self.map_err(graphql_error)
    }
}

impl RequestedFields {
    /// Build the tree from a look-ahead selection set.
    pub fn from_selection(fields: &[SelectionField<'_>]) -> Self {
        let mut requested = RequestedFields::new();
        for field in fields {
            let children: Vec<_> = field.selection_set().collect();
            requested.insert(field.name(), RequestedFields::from_selection(&children));
        }
        requested
    }
}

/// Extension trait to get the requested fields of the current resolver
pub trait RequestedFieldsExt {
    fn requested_fields(&self) -> RequestedFields;
}

impl<'a> RequestedFieldsExt for Context<'a> {
    fn requested_fields(&self) -> RequestedFields {
        let selection: Vec<_> = self.field().selection_set().collect();
        RequestedFields::from_selection(&selection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::filter::compile_filter;
    use crate::compiler::predicate::Predicate;
    use crate::filters::{DateFilter, GenericFilter};
    use crate::pagination::{Page, PageInput};
    use crate::value::SqlValue;
    use crate::{FilterInput, define_page};
    use async_graphql::{
        EmptyMutation, EmptySubscription, InputObject, Object, Schema, SimpleObject,
    };
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[derive(SimpleObject, Debug, Clone)]
    pub struct Node {
        title: String,
        year: i32,
    }

    #[derive(SimpleObject)]
    struct Edge {
        node: Node,
    }

    #[derive(SimpleObject)]
    struct Movies {
        edges: Vec<Edge>,
        /// Node fields seen by the resolver
        selected: Vec<String>,
    }

    #[derive(InputObject, FilterInput, Default)]
    #[graphql(name = "MovieFilter")]
    struct MovieFilter {
        #[filter(column = "title")]
        title: Option<GenericFilter>,
        #[filter(column = "created_at")]
        added_at: Option<DateFilter>,
        #[graphql(name = "OR")]
        #[filter(or)]
        or: Option<Vec<MovieFilter>>,
    }

    #[derive(SimpleObject)]
    struct Compiled {
        sql: String,
        values: Vec<SqlValue>,
    }

    define_page!(NodePage, NodeEdge, Node);

    struct Query;

    #[Object]
    impl Query {
        async fn bad_input(&self) -> async_graphql::Result<i32> {
            Err(QueryError::SortNotObject).into_graphql()
        }

        async fn broken(&self) -> async_graphql::Result<i32> {
            Err(QueryError::InvalidSortDirection("UP".into())).into_graphql()
        }

        async fn compiled(&self, filter: MovieFilter) -> async_graphql::Result<Compiled> {
            let predicate = compile_filter(Some(&filter)).into_graphql()?;
            let (sql, values) = predicate.map(Predicate::into_parts).unwrap_or_default();
            Ok(Compiled { sql, values })
        }

        async fn page(&self, skip: i64) -> NodePage {
            let rows = vec![("Alien", 1979), ("Heat", 1995)];
            Page::from_items(rows, PageInput::new(skip, 2), 5)
                .map(|(title, year)| Node {
                    title: title.to_string(),
                    year,
                })
                .into()
        }

        async fn movies(&self, ctx: &Context<'_>) -> Movies {
            let fields = ctx.requested_fields();
            let selected: Vec<String> = fields
                .dive(&["edges", "node"])
                .map(|node| node.names().map(String::from).collect())
                .unwrap_or_default();
            Movies {
                edges: vec![Edge {
                    node: Node {
                        title: "Alien".into(),
                        year: 1979,
                    },
                }],
                selected,
            }
        }
    }

    fn schema() -> Schema<Query, EmptyMutation, EmptySubscription> {
        Schema::new(Query, EmptyMutation, EmptySubscription)
    }

    #[tokio::test]
    async fn test_error_codes() {
        let response = schema().execute("{ badInput }").await;
        let error = serde_json::to_value(&response.errors[0]).unwrap();
        assert_eq!(error["message"], "sort must be an object");
        assert_eq!(error["extensions"], json!({ "code": "BAD_USER_INPUT" }));

        let response = schema().execute("{ broken }").await;
        let error = serde_json::to_value(&response.errors[0]).unwrap();
        assert_eq!(error["message"], "internal error");
        assert_eq!(error["extensions"], json!({ "code": "INTERNAL" }));
    }

    #[tokio::test]
    async fn test_requested_fields_follow_selection() {
        let response = schema()
            .execute("{ movies { edges { node { year title } } selected } }")
            .await;
        assert!(response.errors.is_empty());
        let data = response.data.into_json().unwrap();
        assert_eq!(data["movies"]["selected"], json!(["title", "year"]));

        let response = schema().execute("{ movies { selected } }").await;
        let data = response.data.into_json().unwrap();
        assert_eq!(data["movies"]["selected"], json!([]));
    }

    #[tokio::test]
    async fn test_filter_argument_compiles() {
        let response = schema()
            .execute(
                r#"{
                    compiled(filter: {
                        title: { startsWith: "the", caseInsensitive: true }
                        OR: [{ title: { eq: ALIEN } }, { title: { in: [1, 2.5] } }]
                    }) { sql values }
                }"#,
            )
            .await;
        assert!(response.errors.is_empty(), "{:?}", response.errors);
        let data = response.data.into_json().unwrap();
        assert_eq!(
            data["compiled"],
            json!({
                "sql": "lower(title) LIKE lower(?) AND (title = ? OR title IN (?, ?))",
                "values": ["the%", "ALIEN", 1, 2.5]
            })
        );
    }

    #[tokio::test]
    async fn test_date_argument_is_normalized() {
        let response = schema()
            .execute(
                r#"{ compiled(filter: { addedAt: { gte: "2020-09-19T23:10:35+02:00" } }) { sql values } }"#,
            )
            .await;
        let data = response.data.into_json().unwrap();
        assert_eq!(
            data["compiled"],
            json!({
                "sql": "julianday(created_at) >= julianday(?)",
                "values": ["2020-09-19T21:10:35Z"]
            })
        );

        let response = schema()
            .execute(r#"{ compiled(filter: { addedAt: { lt: "soon" } }) { sql } }"#)
            .await;
        let error = serde_json::to_value(&response.errors[0]).unwrap();
        assert_eq!(error["extensions"], json!({ "code": "BAD_USER_INPUT" }));
    }

    #[tokio::test]
    async fn test_list_and_object_operands_rejected() {
        for query in [
            r#"{ compiled(filter: { title: { eq: [1] } }) { sql } }"#,
            r#"{ compiled(filter: { title: { eq: { a: 1 } } }) { sql } }"#,
        ] {
            let response = schema().execute(query).await;
            assert!(!response.errors.is_empty(), "{}", query);
        }
    }

    #[tokio::test]
    async fn test_page_object() {
        let response = schema()
            .execute(
                "{ page(skip: 2) { edges { cursor node { title } } \
                 pageInfo { totalRecord hasNext hasPrevious endCursor } } }",
            )
            .await;
        assert!(response.errors.is_empty(), "{:?}", response.errors);
        let data = response.data.into_json().unwrap();
        assert_eq!(
            data["page"],
            json!({
                "edges": [
                    { "cursor": "2", "node": { "title": "Alien" } },
                    { "cursor": "3", "node": { "title": "Heat" } }
                ],
                "pageInfo": {
                    "totalRecord": 5,
                    "hasNext": true,
                    "hasPrevious": true,
                    "endCursor": "3"
                }
            })
        );
    }
}
