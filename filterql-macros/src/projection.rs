use proc_macro2::TokenStream;
use quote::quote;
use syn::{DeriveInput, Error, Field, Ident, LitStr, Result, Type};

use crate::named_fields;

struct ProjectionAttr {
    aliases: String,
    column: String,
}

fn is_bool(ty: &Type) -> bool {
    matches!(ty, Type::Path(p) if p.qself.is_none() && p.path.is_ident("bool"))
}

fn parse_projection_attr(field: &Field, ident: &Ident) -> Result<Option<ProjectionAttr>> {
    let mut tagged = false;
    let mut aliases = None;
    let mut column = None;

    for attr in field.attrs.iter().filter(|a| a.path().is_ident("projection")) {
        tagged = true;
        attr.parse_nested_meta(|meta| {
            let ident = meta.path.get_ident().map(|i| i.to_string());
            match ident.as_deref() {
                Some("alias") => {
                    let value: LitStr = meta.value()?.parse()?;
                    aliases = Some(value.value());
                }
                Some("column") => {
                    let value: LitStr = meta.value()?.parse()?;
                    if value.value().is_empty() {
                        return Err(Error::new(value.span(), "column must not be empty"));
                    }
                    column = Some(value.value());
                }
                _ => return Err(meta.error("expected `alias = \"...\"` or `column = \"...\"`")),
            }
            Ok(())
        })?;
    }

    if !tagged {
        return Ok(None);
    }
    if !is_bool(&field.ty) {
        return Err(Error::new_spanned(&field.ty, "field must be a boolean"));
    }

    let name = ident.to_string();
    Ok(Some(ProjectionAttr {
        aliases: aliases.unwrap_or_else(|| name.clone()),
        column: column.unwrap_or(name),
    }))
}

pub fn projection_impl(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let fields = named_fields(&input, "Projection")?;

    let mut idents = Vec::new();
    let mut columns = Vec::new();
    let mut aliases = Vec::new();
    for field in &fields.named {
        let Some(ident) = &field.ident else {
            continue;
        };
        if let Some(attr) = parse_projection_attr(field, ident)? {
            idents.push(ident.clone());
            columns.push(attr.column);
            aliases.push(attr.aliases);
        }
    }

    let count = idents.len();
    let indexes: Vec<usize> = (0..count).collect();

    Ok(quote! {
        impl #impl_generics ::filterql::compiler::projection::ProjectionDescriptor for #name #ty_generics #where_clause {
            fn field_count(&self) -> usize {
                #count
            }

            fn field(
                &self,
                index: usize,
            ) -> ::std::option::Option<::filterql::compiler::projection::ProjectionField<'_>> {
                match index {
                    #(#indexes => ::std::option::Option::Some(
                        ::filterql::compiler::projection::ProjectionField {
                            column: #columns,
                            aliases: #aliases,
                        },
                    ),)*
                    _ => ::std::option::Option::None,
                }
            }

            fn is_selected(&self, index: usize) -> bool {
                match index {
                    #(#indexes => self.#idents,)*
                    _ => false,
                }
            }

            fn set_selected(&mut self, index: usize, selected: bool) {
                match index {
                    #(#indexes => self.#idents = selected,)*
                    _ => {}
                }
            }
        }
    })
}
