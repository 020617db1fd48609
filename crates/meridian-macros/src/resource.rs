//! Expansion of `#[derive(JsonApiResource)]`.

use crate::parse::{ContainerAttrs, FieldAttrs, LookupInclude, SerdeField};
use convert_case::{Case, Casing};
use proc_macro2::TokenStream;
use quote::quote;
use syn::spanned::Spanned;
use syn::{Data, DeriveInput, Fields, Type};

/// One member of the derived struct.
struct Member<'a> {
    ident: &'a syn::Ident,
    ty: &'a Type,
    underlying: String,
    json_name: String,
    ignore: bool,
    attrs: FieldAttrs,
}

pub fn expand(input: &DeriveInput) -> syn::Result<TokenStream> {
    let container = ContainerAttrs::parse(&input.attrs)?;
    let resource_type = container.resource_type.clone().ok_or_else(|| {
        syn::Error::new(
            input.ident.span(),
            "missing #[jsonapi(resource_type = \"...\")] on the struct",
        )
    })?;

    let named = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => named,
            _ => {
                return Err(syn::Error::new(
                    input.ident.span(),
                    "JsonApiResource requires a struct with named fields",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new(
                input.ident.span(),
                "JsonApiResource can only be derived for structs",
            ))
        }
    };

    let mut members = Vec::with_capacity(named.named.len());
    for field in &named.named {
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let serde = SerdeField::parse(&field.attrs)?;
        if serde.flatten {
            return Err(syn::Error::new(
                field.span(),
                "flattened fields cannot be resource members",
            ));
        }
        let attrs = FieldAttrs::parse(&field.attrs)?;
        let rust_name = ident.to_string().trim_start_matches("r#").to_string();
        let underlying = serde.rename.clone().unwrap_or_else(|| {
            container
                .rename_all
                .map_or_else(|| rust_name.clone(), |rule| rule.apply(&rust_name))
        });
        let json_name = attrs
            .json_name
            .clone()
            .unwrap_or_else(|| rust_name.to_case(Case::Camel));
        members.push(Member {
            ident,
            ty: &field.ty,
            underlying,
            json_name,
            ignore: serde.skip || attrs.ignore,
            attrs,
        });
    }

    let id_index = find_id(input, &members)?;
    let krate = &container.krate;
    let id_ty = members[id_index].ty;
    let fields = members
        .iter()
        .enumerate()
        .map(|(i, member)| field_descriptor(krate, member, i == id_index));

    let name = &input.ident;
    let type_name = name.to_string();
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics #krate::JsonApiResource for #name #ty_generics #where_clause {
            const RESOURCE_TYPE: &'static str = #resource_type;
            type Id = #id_ty;

            fn descriptor() -> #krate::ResourceDescriptor {
                #krate::ResourceDescriptor::new(Self::RESOURCE_TYPE, #type_name)
                    #(.field(#fields))*
            }
        }
    })
}

/// Index of the id member: the one marked `#[jsonapi(id)]`, else the one
/// named `id`.
fn find_id(input: &DeriveInput, members: &[Member<'_>]) -> syn::Result<usize> {
    let mut marked = members
        .iter()
        .enumerate()
        .filter(|(_, m)| m.attrs.id)
        .map(|(i, _)| i);
    if let Some(first) = marked.next() {
        if let Some(second) = marked.next() {
            return Err(syn::Error::new(
                members[second].ident.span(),
                "only one field can be marked #[jsonapi(id)]",
            ));
        }
        if members[first].ignore {
            return Err(syn::Error::new(
                members[first].ident.span(),
                "the id field cannot be ignored",
            ));
        }
        return Ok(first);
    }
    members
        .iter()
        .position(|m| !m.ignore && m.ident == "id")
        .ok_or_else(|| {
            syn::Error::new(
                input.ident.span(),
                "no id field: add a field named `id` or mark one with #[jsonapi(id)]",
            )
        })
}

fn field_descriptor(krate: &syn::Path, member: &Member<'_>, is_id: bool) -> TokenStream {
    let underlying = &member.underlying;
    let ty = member.ty;
    let declared = quote!(#ty).to_string();
    let constructor = if is_id {
        quote!(#krate::FieldDescriptor::id(#underlying, #declared))
    } else {
        quote!(#krate::FieldDescriptor::new(#underlying, #declared))
    };

    let attrs = &member.attrs;
    let mut calls = Vec::new();
    if member.json_name != member.underlying {
        let json_name = &member.json_name;
        calls.push(quote!(.json_name(#json_name)));
    }
    if member.ignore {
        calls.push(quote!(.ignore()));
    }
    if attrs.read_only {
        calls.push(quote!(.read_only()));
    }
    if attrs.immutable {
        calls.push(quote!(.immutable()));
    }
    if let Some(postable) = attrs.postable {
        calls.push(quote!(.postable(#postable)));
    }
    if let Some(patchable) = attrs.patchable {
        calls.push(quote!(.patchable(#patchable)));
    }
    if attrs.non_sortable {
        calls.push(quote!(.non_sortable()));
    }
    if attrs.non_filterable {
        calls.push(quote!(.non_filterable()));
    }
    if let Some(parser) = &attrs.parse_with {
        calls.push(quote!(.parse_with(#parser)));
    }
    if let Some(target) = &attrs.relation_ids {
        calls.push(quote!(.relation_ids(#target)));
    }
    if let Some(lookup) = attrs.lookup_include {
        let variant = match lookup {
            LookupInclude::Always => quote!(Always),
            LookupInclude::WhenNull => quote!(WhenNull),
            LookupInclude::Never => quote!(Never),
        };
        calls.push(quote!(.lookup_include(#krate::LookupIncludeBehavior::#variant)));
    }
    if attrs.include_by_default {
        calls.push(quote!(.include_by_default()));
    }

    if calls.is_empty() {
        constructor
    } else {
        quote!(#constructor.annotate(|annotations| annotations #(#calls)*))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    fn expanded(input: DeriveInput) -> String {
        expand(&input).unwrap().to_string()
    }

    fn error(input: DeriveInput) -> String {
        expand(&input).unwrap_err().to_string()
    }

    #[test]
    fn test_default_names() {
        let out = expanded(parse_quote! {
            #[jsonapi(resource_type = "tasks")]
            struct Task {
                id: u64,
                due_date: Option<String>,
            }
        });
        assert!(out.contains("const RESOURCE_TYPE : & 'static str = \"tasks\""));
        assert!(out.contains("type Id = u64"));
        assert!(out.contains("FieldDescriptor :: id (\"id\" , \"u64\")"));
        assert!(out.contains("json_name (\"dueDate\")"));
    }

    #[test]
    fn test_serde_names_are_underlying() {
        let out = expanded(parse_quote! {
            #[jsonapi(resource_type = "tasks")]
            #[serde(rename_all = "camelCase")]
            struct Task {
                id: u64,
                due_date: Option<String>,
                #[serde(rename = "owner")]
                created_by: String,
            }
        });
        assert!(out.contains("FieldDescriptor :: new (\"dueDate\""));
        assert!(!out.contains("json_name (\"dueDate\")"));
        assert!(out.contains("FieldDescriptor :: new (\"owner\""));
        assert!(out.contains("json_name (\"createdBy\")"));
    }

    #[test]
    fn test_marked_id_and_annotations() {
        let out = expanded(parse_quote! {
            #[jsonapi(resource_type = "projects", crate = "meridian::core")]
            struct Project {
                #[jsonapi(id)]
                key: String,
                #[jsonapi(relation_ids = "Task", json_name = "tasks", lookup_include = "always")]
                task_ids: Vec<u64>,
                #[serde(skip)]
                cache: Vec<u8>,
            }
        });
        assert!(out.contains("type Id = String"));
        assert!(out.contains("meridian :: core :: FieldDescriptor :: id (\"key\""));
        assert!(out.contains(". relation_ids (\"Task\")"));
        assert!(out.contains("LookupIncludeBehavior :: Always"));
        assert!(out.contains(". ignore ()"));
    }

    #[test]
    fn test_missing_resource_type() {
        let message = error(parse_quote! {
            struct Task { id: u64 }
        });
        assert!(message.contains("resource_type"));
    }

    #[test]
    fn test_missing_id() {
        let message = error(parse_quote! {
            #[jsonapi(resource_type = "tasks")]
            struct Task { name: String }
        });
        assert!(message.contains("no id field"));
    }

    #[test]
    fn test_two_ids() {
        let message = error(parse_quote! {
            #[jsonapi(resource_type = "tasks")]
            struct Task {
                #[jsonapi(id)]
                a: u64,
                #[jsonapi(id)]
                b: u64,
            }
        });
        assert!(message.contains("only one field"));
    }

    #[test]
    fn test_rejects_enums_and_tuples() {
        assert!(expand(&parse_quote! {
            #[jsonapi(resource_type = "tasks")]
            enum Task { A }
        })
        .is_err());
        assert!(expand(&parse_quote! {
            #[jsonapi(resource_type = "tasks")]
            struct Task(u64);
        })
        .is_err());
    }
}
