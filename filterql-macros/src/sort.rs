use proc_macro2::TokenStream;
use quote::quote;
use syn::{DeriveInput, Error, Field, LitStr, Result};

use crate::named_fields;

/// Column of a `#[sort(column = "...")]` field; `None` when untagged or `-`.
fn parse_sort_column(field: &Field) -> Result<Option<LitStr>> {
    let mut column = None;

    for attr in field.attrs.iter().filter(|a| a.path().is_ident("sort")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("column") {
                let value: LitStr = meta.value()?.parse()?;
                if value.value().is_empty() {
                    return Err(Error::new(value.span(), "column must not be empty"));
                }
                column = (value.value() != "-").then_some(value);
                Ok(())
            } else {
                Err(meta.error("expected `column = \"...\"`"))
            }
        })?;
    }

    Ok(column)
}

pub fn sort_input_impl(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let fields = named_fields(&input, "SortInput")?;

    let mut entries = Vec::new();
    for field in &fields.named {
        let Some(ident) = &field.ident else {
            continue;
        };
        if let Some(column) = parse_sort_column(field)? {
            entries.push(quote! {
                ::filterql::compiler::sort::SortField::new(
                    #column,
                    ::filterql::compiler::sort::SortSource::direction(&self.#ident),
                )
            });
        }
    }

    Ok(quote! {
        impl #impl_generics ::filterql::compiler::sort::SortDescriptor for #name #ty_generics #where_clause {
            fn sort_fields(&self) -> ::std::vec::Vec<::filterql::compiler::sort::SortField> {
                ::std::vec![#(#entries),*]
            }
        }
    })
}
