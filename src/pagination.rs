//! Offset pagination types
//!
//! A page is requested with [`PageInput`] (`skip`/`limit`) and returned as a
//! [`Page`] whose [`PageOutput`] reports the total record count, whether pages
//! exist on either side, and the cursors of the first and last item.
//!
//! Cursors are the decimal offset of an item within the whole result set, so
//! they are positions rather than keys.
//!
//! [`define_page!`](crate::define_page) declares the GraphQL objects for a
//! page of a concrete node type.

use async_graphql::{InputObject, SimpleObject};
use serde::{Deserialize, Serialize};

use crate::config::PaginationConfig;
use crate::error::{QueryError, Result};

/// Requested page window.
#[derive(InputObject, Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[graphql(name = "PageInput")]
#[serde(default)]
pub struct PageInput {
    /// Number of items to skip
    #[graphql(default)]
    pub skip: i64,
    /// Maximum number of items to return (0 uses the configured default)
    #[graphql(default)]
    pub limit: i64,
}

impl PageInput {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self { skip, limit }
    }

    /// Page starting right after the item at `cursor`.
    pub fn after(cursor: &str, limit: i64) -> Result<Self> {
        let skip = decode_cursor(cursor)?
            .checked_add(1)
            .ok_or_else(|| QueryError::InvalidCursor(cursor.to_string()))?;
        Ok(Self { skip, limit })
    }

    /// Apply defaults: non-positive limit uses the default, limits above the
    /// maximum are capped and a negative skip starts at zero.
    pub fn normalize(&self, config: &PaginationConfig) -> PageInput {
        let limit = if self.limit <= 0 {
            config.default_limit
        } else {
            self.limit.min(config.max_limit)
        };
        PageInput {
            skip: self.skip.max(0),
            limit,
        }
    }
}

/// Information about a returned page
#[derive(SimpleObject, Serialize, Debug, Clone, Default, PartialEq, Eq)]
#[graphql(name = "PageOutput")]
#[serde(rename_all = "camelCase")]
pub struct PageOutput {
    /// Total count of items matching the filter
    pub total_record: i64,
    /// Page size used for the query
    pub limit: i64,
    /// Offset of the first item
    pub skip: i64,
    /// Are there items after this page?
    pub has_next: bool,
    /// Are there items before this page?
    pub has_previous: bool,
    /// Cursor of the first item in this page
    pub start_cursor: Option<String>,
    /// Cursor of the last item in this page
    pub end_cursor: Option<String>,
}

impl PageOutput {
    /// Derive page metadata for `returned` items fetched with `page`.
    pub fn new(page: PageInput, total_record: i64, returned: usize) -> Self {
        let last = returned
            .checked_sub(1)
            .map(|i| page.skip.saturating_add(i as i64));
        Self {
            total_record,
            limit: page.limit,
            skip: page.skip,
            has_next: page.skip.saturating_add(page.limit) < total_record,
            has_previous: page.skip > 0,
            start_cursor: last.map(|_| encode_cursor(page.skip)),
            end_cursor: last.map(encode_cursor),
        }
    }
}

/// An item and its cursor (internal use)
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Edge<T> {
    pub node: T,
    pub cursor: String,
}

/// A page of items (internal use)
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub edges: Vec<Edge<T>>,
    pub page_info: PageOutput,
}

impl<T> Page<T> {
    /// Create a page with no items
    pub fn empty(page: PageInput, total_record: i64) -> Self {
        Self {
            edges: Vec::new(),
            page_info: PageOutput::new(page, total_record, 0),
        }
    }

    /// Wrap the items fetched for `page`, numbering cursors from `page.skip`.
    pub fn from_items(items: Vec<T>, page: PageInput, total_record: i64) -> Self {
        let page_info = PageOutput::new(page, total_record, items.len());
        let edges = items
            .into_iter()
            .enumerate()
            .map(|(i, node)| Edge {
                cursor: encode_cursor(page.skip.saturating_add(i as i64)),
                node,
            })
            .collect();
        Self { edges, page_info }
    }

    pub fn nodes(&self) -> impl Iterator<Item = &T> {
        self.edges.iter().map(|e| &e.node)
    }

    pub fn into_nodes(self) -> Vec<T> {
        self.edges.into_iter().map(|e| e.node).collect()
    }

    /// Convert every node, keeping cursors and page info.
    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            edges: self
                .edges
                .into_iter()
                .map(|e| Edge {
                    node: f(e.node),
                    cursor: e.cursor,
                })
                .collect(),
            page_info: self.page_info,
        }
    }
}

/// Declare GraphQL output types for pages of one node type.
///
/// Generates a `SimpleObject` edge (`node`, `cursor`) and page (`edges`,
/// `pageInfo`), plus `From<Page<Node>>` so resolvers can return
/// `PageRequest::fetch` results with `.into()`:
///
/// ```ignore
/// define_page!(MoviePage, MovieEdge, Movie);
///
/// async fn movies(&self, ctx: &Context<'_>) -> async_graphql::Result<MoviePage> {
///     let page = request.fetch::<Movie>(pool).await.into_graphql()?;
///     Ok(page.into())
/// }
/// ```
#[macro_export]
macro_rules! define_page {
    ($page:ident, $edge:ident, $node:ty) => {
        #[derive(async_graphql::SimpleObject, Debug, Clone)]
        pub struct $edge {
            pub node: $node,
            pub cursor: String,
        }

        #[derive(async_graphql::SimpleObject, Debug, Clone)]
        pub struct $page {
            pub edges: Vec<$edge>,
            pub page_info: $crate::pagination::PageOutput,
        }

        impl From<$crate::pagination::Page<$node>> for $page {
            fn from(page: $crate::pagination::Page<$node>) -> Self {
                let $crate::pagination::Page { edges, page_info } = page;
                Self {
                    edges: edges
                        .into_iter()
                        .map(|$crate::pagination::Edge { node, cursor }| $edge { node, cursor })
                        .collect(),
                    page_info,
                }
            }
        }
    };
}

/// Encode an offset as a cursor string
pub fn encode_cursor(offset: i64) -> String {
    offset.to_string()
}

/// Decode a cursor string to an offset
pub fn decode_cursor(cursor: &str) -> Result<i64> {
    match cursor.trim().parse::<i64>() {
        Ok(offset) if offset >= 0 => Ok(offset),
        _ => Err(QueryError::InvalidCursor(cursor.to_string())),
    }
}
