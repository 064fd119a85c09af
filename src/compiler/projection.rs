//! Projection compiler
//!
//! Marks the fields of a projection descriptor whose aliases appear in the
//! caller's requested-field tree, so only those columns are selected.

use std::collections::BTreeMap;

/// Alias that never matches.
pub const IGNORE_ALIAS: &str = "-";

/// Path from a connection object down to its items.
pub const CONNECTION_PATH: &[&str] = &["edges", "node"];

/// Tree of field names requested by a client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestedFields {
    children: BTreeMap<String, RequestedFields>,
}

impl RequestedFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a tree from dotted paths such as `edges.node.title`.
    pub fn from_paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut fields = Self::new();
        for path in paths {
            fields.insert_path(path.as_ref());
        }
        fields
    }

    /// Insert a dotted path, creating intermediate nodes.
    pub fn insert_path(&mut self, path: &str) {
        let mut node = self;
        for name in path.split('.').map(str::trim).filter(|n| !n.is_empty()) {
            node = node.children.entry(name.to_string()).or_default();
        }
    }

    /// Add a child subtree.
    pub fn insert(&mut self, name: impl Into<String>, child: RequestedFields) {
        self.children.insert(name.into(), child);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.children.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&RequestedFields> {
        self.children.get(name)
    }

    /// Follow a fixed chain of names, e.g. [`CONNECTION_PATH`].
    pub fn dive(&self, path: &[&str]) -> Option<&RequestedFields> {
        path.iter().try_fold(self, |node, name| node.get(name))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.children.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

/// One projectable field: its column and its raw, comma-separated alias list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectionField<'a> {
    pub column: &'a str,
    pub aliases: &'a str,
}

/// A set of boolean flags, one per projectable column.
///
/// Implemented by `#[derive(Projection)]`, which only accepts `bool` fields.
pub trait ProjectionDescriptor {
    fn field_count(&self) -> usize;
    /// Metadata of field `index`, `None` past `field_count()`.
    fn field(&self, index: usize) -> Option<ProjectionField<'_>>;
    fn is_selected(&self, index: usize) -> bool;
    fn set_selected(&mut self, index: usize, selected: bool);
}

/// Mark every field with an alias present in `requested`.
pub fn compile_projection<P>(projection: &mut P, requested: &RequestedFields)
where
    P: ProjectionDescriptor + ?Sized,
{
    for index in 0..projection.field_count() {
        let Some(field) = projection.field(index) else {
            continue;
        };
        let matched = field
            .aliases
            .split(',')
            .map(str::trim)
            .filter(|alias| !alias.is_empty() && *alias != IGNORE_ALIAS)
            .any(|alias| requested.contains(alias));
        if matched {
            projection.set_selected(index, true);
        }
    }
}

/// Like [`compile_projection`], for a selection on a connection type: the
/// item fields live under `edges → node`.
pub fn compile_connection_projection<P>(projection: &mut P, requested: &RequestedFields)
where
    P: ProjectionDescriptor + ?Sized,
{
    if let Some(node) = requested.dive(CONNECTION_PATH) {
        compile_projection(projection, node);
    }
}

/// Columns of the selected fields, in field order.
pub fn selected_columns<P>(projection: &P) -> Vec<String>
where
    P: ProjectionDescriptor + ?Sized,
{
    (0..projection.field_count())
        .filter(|&i| projection.is_selected(i))
        .filter_map(|i| projection.field(i))
        .map(|field| field.column.to_string())
        .collect()
}

/// Projection over columns known only at runtime.
#[derive(Debug, Clone, Default)]
pub struct ColumnProjection {
    fields: Vec<(String, String, bool)>,
}

impl ColumnProjection {
    /// Each column is its own alias.
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fields = columns
            .into_iter()
            .map(|c| {
                let column = c.into();
                (column.clone(), column, false)
            })
            .collect();
        Self { fields }
    }

    /// Add a column with an explicit alias list.
    pub fn with_aliases(mut self, column: impl Into<String>, aliases: impl Into<String>) -> Self {
        self.fields.push((column.into(), aliases.into(), false));
        self
    }
}

impl ProjectionDescriptor for ColumnProjection {
    fn field_count(&self) -> usize {
        self.fields.len()
    }

    fn field(&self, index: usize) -> Option<ProjectionField<'_>> {
        self.fields
            .get(index)
            .map(|(column, aliases, _)| ProjectionField { column, aliases })
    }

    fn is_selected(&self, index: usize) -> bool {
        self.fields.get(index).is_some_and(|f| f.2)
    }

    fn set_selected(&mut self, index: usize, selected: bool) {
        if let Some(field) = self.fields.get_mut(index) {
            field.2 = selected;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_paths_build_tree() {
        let fields = RequestedFields::from_paths(["edges.node.title", "edges.node.year", "pageInfo"]);
        assert!(fields.contains("edges"));
        assert!(fields.contains("pageInfo"));
        let node = fields.dive(CONNECTION_PATH).unwrap();
        assert_eq!(node.names().collect::<Vec<_>>(), vec!["title", "year"]);
        assert!(fields.dive(&["edges", "missing"]).is_none());
    }

    #[test]
    fn test_aliases_select_columns() {
        let mut projection = ColumnProjection::default()
            .with_aliases("title", "title,Title")
            .with_aliases("year", "-,releaseYear")
            .with_aliases("secret", "-");
        let requested = RequestedFields::from_paths(["Title", "releaseYear", "-"]);
        compile_projection(&mut projection, &requested);
        assert_eq!(selected_columns(&projection), vec!["title", "year"]);
    }

    #[test]
    fn test_connection_projection_dives() {
        let mut projection = ColumnProjection::new(["id", "name", "path"]);
        let requested = RequestedFields::from_paths(["edges.node.name", "id"]);
        compile_connection_projection(&mut projection, &requested);
        assert_eq!(selected_columns(&projection), vec!["name"]);
    }

    #[test]
    fn test_nothing_requested_selects_nothing() {
        let mut projection = ColumnProjection::new(["id"]);
        compile_connection_projection(&mut projection, &RequestedFields::new());
        assert!(selected_columns(&projection).is_empty());
    }

    #[test]
    fn test_out_of_range_index() {
        let mut projection = ColumnProjection::new(["id"]);
        projection.set_selected(3, true);
        assert_eq!(projection.field(3), None);
        assert!(!projection.is_selected(3));
        assert_eq!(
            projection.field(0),
            Some(ProjectionField {
                column: "id",
                aliases: "id"
            })
        );
    }
}
