//! filterql - declarative filters, sorts and projections over SQL
//!
//! Structured query descriptors (typically GraphQL input objects or JSON) are
//! compiled into parameterized SQL and executed as offset-paginated queries:
//!
//! - [`compiler`] turns filter, sort and projection descriptors into SQL fragments
//! - [`descriptor`] resolves descriptors that arrive as raw JSON
//! - [`engine`] composes the compilers with a page window and runs COUNT + SELECT
//! - [`pagination`] holds the page input/output types and cursors
//!
//! Descriptor structs derive their column metadata with [`FilterInput`],
//! [`SortInput`] and [`Projection`].

extern crate self as filterql;

pub mod compiler;
pub mod config;
pub mod descriptor;
pub mod engine;
pub mod error;
pub mod filters;
pub mod graphql;
pub mod logging;
pub mod pagination;
pub mod query;
pub mod value;

#[cfg(feature = "sqlite")]
pub mod cli;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use compiler::filter::{Filter, FilterDescriptor, compile_filter};
pub use compiler::predicate::Predicate;
pub use compiler::projection::{
    ColumnProjection, ProjectionDescriptor, RequestedFields, compile_connection_projection,
    compile_projection, selected_columns,
};
pub use compiler::sort::{OrderBy, SortDescriptor, SortDirection, SortKey, SortSpec, compile_sort};
pub use config::{PaginationConfig, QueryConfig};
pub use descriptor::FieldRegistry;
pub use engine::{PagePlan, PageRequest};
pub use error::{QueryError, Result};
pub use filters::{DateFilter, GenericFilter};
pub use pagination::{Edge, Page, PageInput, PageOutput};
pub use query::SelectQuery;
pub use value::{SqlValue, ToSqlValue};

pub use filterql_macros::{FilterInput, Projection, SortInput};
