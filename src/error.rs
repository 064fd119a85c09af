//! Error types shared by the compilers and the pagination engine
//!
//! Errors fall into two classes:
//! - user-input errors, whose message is safe to return to the caller
//! - internal errors, which are logged and replaced by a generic message

use thiserror::Error;

pub type Result<T, E = QueryError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("filter must be an object")]
    FilterNotObject,

    #[error("sort must be an object")]
    SortNotObject,

    /// A registered field whose value is not an operator set.
    #[error("field {field} must be an operator set: {reason}")]
    UnsupportedField { field: String, reason: String },

    #[error("{operator} value must be a string")]
    NotAString { operator: &'static str },

    #[error("{operator} value {value:?} is not a valid RFC3339 date")]
    InvalidDate { operator: &'static str, value: String },

    #[error("sort list element must not have multiple fields")]
    MultipleSortFields,

    #[error("invalid cursor {0:?}")]
    InvalidCursor(String),

    #[error("invalid identifier {0:?}")]
    InvalidIdentifier(String),

    #[error("unknown table {0:?}")]
    UnknownTable(String),

    // Internal: the schema should have made these impossible.
    #[error("{operator}: date filter value not supported ({kind})")]
    UnsupportedDateValue {
        operator: &'static str,
        kind: &'static str,
    },

    #[error("invalid sort direction {0:?}")]
    InvalidSortDirection(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    /// Failure raised by a caller-supplied composition hook, passed through as-is.
    #[error(transparent)]
    Compose(anyhow::Error),
}

impl QueryError {
    /// Whether the error originates from trusted code rather than end-user input.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            QueryError::UnsupportedDateValue { .. }
                | QueryError::InvalidSortDirection(_)
                | QueryError::Database(_)
                | QueryError::Compose(_)
        )
    }

    /// Message that may be shown to the end user.
    pub fn public_message(&self) -> String {
        if self.is_internal() {
            "internal error".to_string()
        } else {
            self.to_string()
        }
    }
}
