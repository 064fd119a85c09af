use proc_macro2::TokenStream;
use quote::quote;
use syn::{DeriveInput, Error, Field, Ident, LitStr, Result};

use crate::named_fields;

enum FilterAttr {
    Ignore,
    Column(LitStr),
    And,
    Or,
}

fn parse_filter_attr(field: &Field) -> Result<FilterAttr> {
    let mut parsed = FilterAttr::Ignore;
    let mut seen = false;

    for attr in field.attrs.iter().filter(|a| a.path().is_ident("filter")) {
        attr.parse_nested_meta(|meta| {
            if seen {
                return Err(meta.error("a field takes only one of `column`, `and` or `or`"));
            }
            seen = true;

            let ident = meta.path.get_ident().map(|i| i.to_string());
            match ident.as_deref() {
                Some("column") => {
                    let value: LitStr = meta.value()?.parse()?;
                    if value.value().is_empty() {
                        return Err(Error::new(value.span(), "column must not be empty"));
                    }
                    if value.value() != "-" {
                        parsed = FilterAttr::Column(value);
                    }
                }
                Some("and") => parsed = FilterAttr::And,
                Some("or") => parsed = FilterAttr::Or,
                _ => return Err(meta.error("expected `column = \"...\"`, `and` or `or`")),
            }
            Ok(())
        })?;
    }

    Ok(parsed)
}

fn set_group<'a>(slot: &mut Option<&'a Ident>, ident: &'a Ident, name: &str) -> Result<()> {
    if slot.is_some() {
        return Err(Error::new(
            ident.span(),
            format!("only one #[filter({})] field is allowed", name),
        ));
    }
    *slot = Some(ident);
    Ok(())
}

pub fn filter_input_impl(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let fields = named_fields(&input, "FilterInput")?;

    let mut leaves = Vec::new();
    let mut and_field = None;
    let mut or_field = None;

    for field in &fields.named {
        let Some(ident) = &field.ident else {
            continue;
        };
        match parse_filter_attr(field)? {
            FilterAttr::Ignore => {}
            FilterAttr::Column(column) => leaves.push(quote! {
                if let ::std::option::Option::Some(operators) =
                    ::filterql::filters::LeafSource::leaf_operators(&self.#ident)?
                {
                    parts.push(::filterql::compiler::filter::Filter::leaf(#column, operators));
                }
            }),
            FilterAttr::And => set_group(&mut and_field, ident, "and")?,
            FilterAttr::Or => set_group(&mut or_field, ident, "or")?,
        }
    }

    let and_group = and_field.map(|ident| {
        quote! {
            if let ::std::option::Option::Some(children) =
                ::filterql::compiler::filter::FilterGroup::group_children(&self.#ident)?
            {
                parts.push(::filterql::compiler::filter::Filter::And(children));
            }
        }
    });
    let or_group = or_field.map(|ident| {
        quote! {
            if let ::std::option::Option::Some(children) =
                ::filterql::compiler::filter::FilterGroup::group_children(&self.#ident)?
            {
                parts.push(::filterql::compiler::filter::Filter::Or(children));
            }
        }
    });

    Ok(quote! {
        impl #impl_generics ::filterql::compiler::filter::FilterDescriptor for #name #ty_generics #where_clause {
            fn to_filter(&self) -> ::filterql::Result<::filterql::compiler::filter::Filter> {
                #[allow(unused_mut)]
                let mut parts = ::std::vec::Vec::new();
                #(#leaves)*
                #and_group
                #or_group
                ::std::result::Result::Ok(::filterql::compiler::filter::Filter::And(parts))
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn derive_error(tokens: TokenStream) -> String {
        let input: DeriveInput = syn::parse2(tokens).unwrap();
        filter_input_impl(input).unwrap_err().to_string()
    }

    #[test]
    fn test_mixed_keys_rejected() {
        let message = derive_error(quote! {
            struct F {
                #[filter(column = "x", and)]
                x: Option<Vec<F>>,
            }
        });
        assert_eq!(message, "a field takes only one of `column`, `and` or `or`");

        let message = derive_error(quote! {
            struct F {
                #[filter(or)]
                #[filter(column = "x")]
                x: Option<Vec<F>>,
            }
        });
        assert_eq!(message, "a field takes only one of `column`, `and` or `or`");
    }

    #[test]
    fn test_duplicate_group_rejected() {
        let message = derive_error(quote! {
            struct F {
                #[filter(and)]
                a: Option<Vec<F>>,
                #[filter(and)]
                b: Option<Vec<F>>,
            }
        });
        assert_eq!(message, "only one #[filter(and)] field is allowed");
    }

    #[test]
    fn test_single_keys_accepted() {
        let input: DeriveInput = syn::parse2(quote! {
            struct F {
                #[filter(column = "name")]
                name: Option<GenericFilter>,
                #[filter(column = "-")]
                hidden: Option<GenericFilter>,
                #[filter(or)]
                or: Option<Vec<F>>,
            }
        })
        .unwrap();
        assert!(filter_input_impl(input).is_ok());
    }
}
