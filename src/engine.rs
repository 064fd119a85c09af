//! Pagination engine
//!
//! A [`PageRequest`] composes the filter, sort and projection compilers with a
//! page window. The filtered base query (plus any composition hooks) is shared
//! by the COUNT round trip, while sorting, projection and limit/offset only
//! apply to the data round trip.
//!
//! ```ignore
//! let page: Page<Movie> = PageRequest::new("movies")
//!     .page(input.page.unwrap_or_default())
//!     .filter(input.filter.as_ref())
//!     .sort(input.sort.as_ref())
//!     .projection(&projection)
//!     .compose(|q| q.where_eq("library_id", library_id).map_err(Into::into))
//!     .fetch(&pool)
//!     .await?;
//! ```
//!
//! Compilation errors are held until [`PageRequest::build`], so nothing is
//! executed once any stage has failed.

use crate::compiler::filter::{FilterDescriptor, compile_filter};
use crate::compiler::predicate::Predicate;
use crate::compiler::projection::{ProjectionDescriptor, selected_columns};
use crate::compiler::sort::{OrderBy, SortDescriptor, SortSpec, compile_sort};
use crate::config::PaginationConfig;
use crate::error::{QueryError, Result};
use crate::pagination::PageInput;
use crate::query::SelectQuery;

/// A caller-supplied refinement of the filtered base query.
pub type ComposeHook<'a> = Box<dyn FnOnce(SelectQuery) -> anyhow::Result<SelectQuery> + Send + 'a>;

/// Builder for one paginated query.
pub struct PageRequest<'a> {
    table: String,
    config: PaginationConfig,
    page: PageInput,
    filter: Option<Predicate>,
    order: Option<OrderBy>,
    columns: Vec<String>,
    hooks: Vec<ComposeHook<'a>>,
    error: Option<QueryError>,
}

/// The queries of a page, ready to execute.
#[derive(Debug, Clone)]
pub struct PagePlan {
    /// Normalized page window
    pub page: PageInput,
    /// Filtered base query without ordering, projection or window
    pub count: SelectQuery,
    /// Data query
    pub select: SelectQuery,
}

impl<'a> PageRequest<'a> {
    /// Request over `table` with the default pagination settings.
    pub fn new(table: &str) -> Self {
        Self::with_config(table, PaginationConfig::default())
    }

    pub fn with_config(table: &str, config: PaginationConfig) -> Self {
        Self {
            table: table.to_string(),
            config,
            page: PageInput::default(),
            filter: None,
            order: None,
            columns: Vec::new(),
            hooks: Vec::new(),
            error: None,
        }
    }

    fn record<T>(&mut self, result: Result<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                self.error.get_or_insert(e);
                None
            }
        }
    }

    pub fn page(mut self, page: PageInput) -> Self {
        self.page = page;
        self
    }

    /// Compile a filter descriptor. `None` leaves the query unfiltered.
    pub fn filter<D>(mut self, descriptor: Option<&D>) -> Self
    where
        D: FilterDescriptor + ?Sized,
    {
        if self.error.is_none() {
            self.filter = self.record(compile_filter(descriptor)).flatten();
        }
        self
    }

    /// Compile a sort descriptor, falling back to the configured default key.
    pub fn sort<T: SortDescriptor>(mut self, spec: Option<&SortSpec<T>>) -> Self {
        if self.error.is_none() {
            let order = compile_sort(spec, &self.config.default_sort);
            self.order = self.record(order);
        }
        self
    }

    /// Select only the columns marked in `projection`; none marked selects all.
    pub fn projection<P>(mut self, projection: &P) -> Self
    where
        P: ProjectionDescriptor + ?Sized,
    {
        self.columns = selected_columns(projection);
        self
    }

    /// Refine the filtered base query, e.g. to scope it to a parent row.
    pub fn compose<F>(mut self, hook: F) -> Self
    where
        F: FnOnce(SelectQuery) -> anyhow::Result<SelectQuery> + Send + 'a,
    {
        self.hooks.push(Box::new(hook));
        self
    }

    /// Run every stage and produce the COUNT and data queries.
    pub fn build(self) -> Result<PagePlan> {
        if let Some(e) = self.error {
            return Err(e);
        }

        let page = self.page.normalize(&self.config);

        let mut base = SelectQuery::new(&self.table)?.filter(self.filter);
        for hook in self.hooks {
            base = hook(base).map_err(QueryError::Compose)?;
        }

        let order = match self.order {
            Some(order) => order,
            None => compile_sort::<NoSort>(None, &self.config.default_sort)?,
        };

        let select = base
            .clone()
            .columns(self.columns)?
            .order_by(order)
            .limit(page.limit)
            .offset(page.skip);

        tracing::debug!(
            table = %self.table,
            skip = page.skip,
            limit = page.limit,
            "Built page query"
        );

        Ok(PagePlan {
            page,
            count: base,
            select,
        })
    }

    /// Build, then run COUNT followed by the data query.
    #[cfg(feature = "sqlite")]
    pub async fn fetch<E>(self, pool: &sqlx::SqlitePool) -> Result<crate::pagination::Page<E>>
    where
        E: crate::sqlite::FromSqlRow,
    {
        self.build()?.fetch(pool).await
    }
}

impl PagePlan {
    /// Run COUNT followed by the data query.
    #[cfg(feature = "sqlite")]
    pub async fn fetch<E>(&self, pool: &sqlx::SqlitePool) -> Result<crate::pagination::Page<E>>
    where
        E: crate::sqlite::FromSqlRow,
    {
        let total = crate::sqlite::count(pool, &self.count).await?;
        let items = crate::sqlite::fetch_all(pool, &self.select).await?;
        Ok(crate::pagination::Page::from_items(items, self.page, total))
    }
}

/// Descriptor type for the default-only sort.
struct NoSort;

impl SortDescriptor for NoSort {
    fn sort_fields(&self) -> Vec<crate::compiler::sort::SortField> {
        Vec::new()
    }
}
