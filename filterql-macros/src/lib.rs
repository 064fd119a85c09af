//! Procedural macros for filterql
//!
//! This crate generates the field/column metadata the compilers need, so
//! descriptor structs are checked at compile time instead of inspected at
//! runtime:
//!
//! - `#[derive(FilterInput)]` - filter descriptor (`FilterDescriptor`)
//! - `#[derive(SortInput)]` - sort descriptor (`SortDescriptor`)
//! - `#[derive(Projection)]` - projection descriptor (`ProjectionDescriptor`)

mod filter;
mod projection;
mod sort;

use proc_macro::TokenStream;
use syn::{parse_macro_input, Data, DeriveInput, Error, Fields, FieldsNamed, Result};

/// Derive `FilterDescriptor` for a struct of operator sets.
///
/// # Usage
///
/// ```ignore
/// #[derive(async_graphql::InputObject, FilterInput)]
/// struct MovieFilter {
///     #[filter(column = "title")]
///     title: Option<GenericFilter>,
///     #[filter(column = "created_at")]
///     added_at: Option<DateFilter>,
///     #[graphql(name = "AND")]
///     #[filter(and)]
///     and: Option<Vec<MovieFilter>>,
///     #[graphql(name = "OR")]
///     #[filter(or)]
///     or: Option<Vec<MovieFilter>>,
/// }
/// ```
///
/// Fields without `#[filter]`, or with `column = "-"`, are ignored. Leaf
/// fields must implement `LeafSource`.
#[proc_macro_derive(FilterInput, attributes(filter))]
pub fn filter_input_derive(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    filter::filter_input_impl(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

/// Derive `SortDescriptor` for a struct of optional sort directions.
///
/// ```ignore
/// #[derive(async_graphql::InputObject, SortInput)]
/// struct MovieSort {
///     #[sort(column = "title")]
///     title: Option<SortDirection>,
/// }
/// ```
#[proc_macro_derive(SortInput, attributes(sort))]
pub fn sort_input_derive(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    sort::sort_input_impl(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

/// Derive `ProjectionDescriptor` for a struct of `bool` flags.
///
/// ```ignore
/// #[derive(Default, Projection)]
/// struct MovieProjection {
///     #[projection(alias = "title,name")]
///     title: bool,
///     #[projection(alias = "year", column = "release_year")]
///     year: bool,
/// }
/// ```
///
/// `alias` is a comma-separated list (entries equal to `-` never match) and
/// defaults to the field name, as does `column`.
#[proc_macro_derive(Projection, attributes(projection))]
pub fn projection_derive(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    projection::projection_impl(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

/// The named fields of a struct, or an error naming the derive.
fn named_fields<'a>(input: &'a DeriveInput, derive: &str) -> Result<&'a FieldsNamed> {
    match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => Ok(fields),
            _ => Err(Error::new_spanned(
                &input.ident,
                format!("{} requires a struct with named fields", derive),
            )),
        },
        _ => Err(Error::new_spanned(
            &input.ident,
            format!("{} can only be derived for structs", derive),
        )),
    }
}
