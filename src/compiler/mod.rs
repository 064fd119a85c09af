//! Descriptor compilers
//!
//! Each compiler is pure and synchronous: it reads a descriptor and returns a
//! fresh SQL fragment, never touching shared state.
//! - [`filter`] builds WHERE predicates from filter trees
//! - [`sort`] builds ORDER BY clauses with a deterministic fallback
//! - [`projection`] picks the columns a client actually requested

pub mod filter;
pub mod predicate;
pub mod projection;
pub mod sort;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{QueryError, Result};

static IDENTIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)?$").expect("valid regex")
});

/// Check that a table or column name is safe to splice into SQL.
pub(crate) fn identifier(name: &str) -> Result<&str> {
    if IDENTIFIER.is_match(name) {
        Ok(name)
    } else {
        Err(QueryError::InvalidIdentifier(name.to_string()))
    }
}
