//! Dynamic descriptors
//!
//! Filter and sort descriptors that arrive as raw JSON (a REST body, a GraphQL
//! `JSON` argument, the CLI) are resolved against a [`FieldRegistry`] built
//! once at start-up and read-only afterwards.
//!
//! ```json
//! {
//!   "title": { "contains": "ring", "caseInsensitive": true },
//!   "OR": [ { "year": { "lt": 1980 } }, { "year": { "isNull": true } } ]
//! }
//! ```

use serde_json::{Map, Value};

use crate::compiler::filter::Filter;
use crate::compiler::identifier;
use crate::compiler::sort::{SortDescriptor, SortDirection, SortField, SortSpec};
use crate::error::{QueryError, Result};
use crate::filters::{DateFilter, GenericFilter, LeafSource};

/// Key of the AND group in a filter object.
pub const AND_KEY: &str = "AND";
/// Key of the OR group in a filter object.
pub const OR_KEY: &str = "OR";

/// Operator-set type of a registered filter field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Generic,
    Date,
}

#[derive(Debug, Clone)]
struct FilterField {
    name: String,
    column: String,
    kind: FieldKind,
}

#[derive(Debug, Clone)]
struct SortableField {
    name: String,
    column: String,
}

/// Public field names mapped to columns, in registration order.
#[derive(Debug, Clone, Default)]
pub struct FieldRegistry {
    filters: Vec<FilterField>,
    sortable: Vec<SortableField>,
}

impl FieldRegistry {
    pub fn builder() -> FieldRegistryBuilder {
        FieldRegistryBuilder::default()
    }

    /// Column and kind of a filterable field.
    pub fn filter_field(&self, name: &str) -> Option<(&str, FieldKind)> {
        self.filters
            .iter()
            .find(|f| f.name == name)
            .map(|f| (f.column.as_str(), f.kind))
    }

    /// Column of a sortable field.
    pub fn sort_column(&self, name: &str) -> Option<&str> {
        self.sortable
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.column.as_str())
    }

    /// Filterable field names in registration order.
    pub fn filter_names(&self) -> impl Iterator<Item = &str> {
        self.filters.iter().map(|f| f.name.as_str())
    }

    /// Sortable field names in registration order.
    pub fn sort_names(&self) -> impl Iterator<Item = &str> {
        self.sortable.iter().map(|f| f.name.as_str())
    }

    /// Resolve a JSON filter object. `null` means no filter.
    pub fn parse_filter(&self, value: &Value) -> Result<Option<Filter>> {
        match value {
            Value::Null => Ok(None),
            Value::Object(map) => self.parse_node(map).map(Some),
            _ => Err(QueryError::FilterNotObject),
        }
    }

    /// Leaves first, then the AND group, then the OR group.
    fn parse_node(&self, map: &Map<String, Value>) -> Result<Filter> {
        let mut parts = Vec::new();

        for field in &self.filters {
            let Some(raw) = map.get(&field.name) else {
                continue;
            };
            if let Some(operators) = self.parse_leaf(field, raw)? {
                parts.push(Filter::leaf(field.column.clone(), operators));
            }
        }

        if let Some(children) = self.parse_group(map, AND_KEY)? {
            parts.push(Filter::And(children));
        }
        if let Some(children) = self.parse_group(map, OR_KEY)? {
            parts.push(Filter::Or(children));
        }

        Ok(Filter::And(parts))
    }

    fn parse_leaf(&self, field: &FilterField, raw: &Value) -> Result<Option<GenericFilter>> {
        let unsupported = |reason: String| QueryError::UnsupportedField {
            field: field.name.clone(),
            reason,
        };

        match raw {
            Value::Null => Ok(None),
            Value::Object(_) => match field.kind {
                FieldKind::Generic => serde_json::from_value::<GenericFilter>(raw.clone())
                    .map_err(|e| unsupported(e.to_string()))?
                    .leaf_operators(),
                // Operand kinds come from the caller here.
                FieldKind::Date => serde_json::from_value::<DateFilter>(raw.clone())
                    .map_err(|e| unsupported(e.to_string()))?
                    .leaf_operators()
                    .map_err(|e| match e {
                        QueryError::UnsupportedDateValue { operator, kind } => {
                            unsupported(format!("{} expects a date string, got {}", operator, kind))
                        }
                        other => other,
                    }),
            },
            _ => Err(unsupported("expected an object".to_string())),
        }
    }

    /// Children of an AND/OR array, skipping elements that are not objects.
    fn parse_group(&self, map: &Map<String, Value>, key: &'static str) -> Result<Option<Vec<Filter>>> {
        let items = match map.get(key) {
            None | Some(Value::Null) => return Ok(None),
            Some(Value::Array(items)) => items,
            Some(_) => {
                return Err(QueryError::UnsupportedField {
                    field: key.to_string(),
                    reason: "expected an array".to_string(),
                });
            }
        };

        let mut children = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            match item {
                Value::Object(child) => children.push(self.parse_node(child)?),
                other => {
                    tracing::debug!(group = key, index, value = %other, "Skipping non-object filter element");
                }
            }
        }

        Ok((!children.is_empty()).then_some(children))
    }

    /// Resolve a JSON sort descriptor: an object, a list of objects or `null`.
    pub fn parse_sort(&self, value: &Value) -> Result<Option<SortSpec<DynamicSort>>> {
        match value {
            Value::Null => Ok(None),
            Value::Object(map) => self.parse_sort_object(map).map(|s| Some(SortSpec::One(s))),
            Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    Value::Object(map) => self.parse_sort_object(map),
                    _ => Err(QueryError::SortNotObject),
                })
                .collect::<Result<Vec<_>>>()
                .map(|list| Some(SortSpec::Many(list))),
            _ => Err(QueryError::SortNotObject),
        }
    }

    fn parse_sort_object(&self, map: &Map<String, Value>) -> Result<DynamicSort> {
        let mut fields = Vec::new();
        for field in &self.sortable {
            let direction = match map.get(&field.name) {
                None | Some(Value::Null) => None,
                Some(Value::String(s)) => Some(s.parse::<SortDirection>()?),
                Some(other) => return Err(QueryError::InvalidSortDirection(other.to_string())),
            };
            fields.push(SortField::new(field.column.clone(), direction));
        }
        Ok(DynamicSort { fields })
    }
}

/// Registers fields; column names are checked once in [`FieldRegistryBuilder::build`].
#[derive(Debug, Default)]
pub struct FieldRegistryBuilder {
    registry: FieldRegistry,
}

impl FieldRegistryBuilder {
    /// A field filtered with the generic operator set.
    pub fn filter(self, name: impl Into<String>, column: impl Into<String>) -> Self {
        self.with_filter(name.into(), column.into(), FieldKind::Generic)
    }

    /// A field whose operands are parsed as RFC3339 dates.
    pub fn date_filter(self, name: impl Into<String>, column: impl Into<String>) -> Self {
        self.with_filter(name.into(), column.into(), FieldKind::Date)
    }

    pub fn sortable(mut self, name: impl Into<String>, column: impl Into<String>) -> Self {
        self.registry.sortable.push(SortableField {
            name: name.into(),
            column: column.into(),
        });
        self
    }

    fn with_filter(mut self, name: String, column: String, kind: FieldKind) -> Self {
        self.registry.filters.push(FilterField { name, column, kind });
        self
    }

    pub fn build(self) -> Result<FieldRegistry> {
        let filters = self.registry.filters.iter().map(|f| &f.column);
        let sortable = self.registry.sortable.iter().map(|f| &f.column);
        for column in filters.chain(sortable) {
            identifier(column)?;
        }
        Ok(self.registry)
    }
}

/// Sort object resolved from JSON.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynamicSort {
    fields: Vec<SortField>,
}

impl SortDescriptor for DynamicSort {
    fn sort_fields(&self) -> Vec<SortField> {
        self.fields.clone()
    }
}
