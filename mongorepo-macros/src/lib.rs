//! Procedural macros for the mongorepo project.
//!
//! `#[derive(Record)]` binds a struct to its collection and to the fields the
//! repository fills in on write.
//!
//! ```ignore
//! use mongorepo::prelude::*;
//!
//! #[derive(Debug, Clone, Serialize, Deserialize, Record)]
//! #[record(collection = "people")]
//! pub struct Person {
//!     #[serde(rename = "_id")]
//!     pub id: Option<ObjectId>,
//!     pub name: String,
//!     #[record(created_at)]
//!     pub joined: Option<DateTime>,
//!     pub updated_at: Option<DateTime>,
//! }
//! ```
//!
//! - `#[record(collection = "...")]` on the struct; defaults to the type name.
//! - `#[record(id)]` on a field; defaults to the field named `id`.
//! - `#[record(created_at)]` / `#[record(updated_at)]` on fields; default to fields
//!   with those names. Without either, the timestamp is not stamped.

#[allow(unused_extern_crates)]
extern crate self as mongorepo_macros;

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{Data, DeriveInput, Field, Fields, Ident, LitStr, Result, parse_macro_input};

#[proc_macro_derive(Record, attributes(record))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match expand_record(input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Id,
    CreatedAt,
    UpdatedAt,
}

impl Role {
    fn default_name(self) -> &'static str {
        match self {
            Role::Id => "id",
            Role::CreatedAt => "created_at",
            Role::UpdatedAt => "updated_at",
        }
    }
}

fn collection_name(input: &DeriveInput) -> Result<String> {
    let mut collection = None;

    for attr in &input.attrs {
        if !attr.path().is_ident("record") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("collection") {
                let value: LitStr = meta.value()?.parse()?;
                if value.value().is_empty() {
                    return Err(syn::Error::new_spanned(value, "collection name must not be empty"));
                }
                collection = Some(value.value());
                Ok(())
            } else {
                Err(meta.error("unsupported record attribute, expected `collection = \"...\"`"))
            }
        })?;
    }

    Ok(collection.unwrap_or_else(|| input.ident.to_string()))
}

fn field_roles(field: &Field) -> Result<Vec<Role>> {
    let mut roles = Vec::new();

    for attr in &field.attrs {
        if !attr.path().is_ident("record") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            let role = if meta.path.is_ident("id") {
                Role::Id
            } else if meta.path.is_ident("created_at") {
                Role::CreatedAt
            } else if meta.path.is_ident("updated_at") {
                Role::UpdatedAt
            } else {
                return Err(meta.error(
                    "unsupported record attribute, expected `id`, `created_at` or `updated_at`",
                ));
            };

            roles.push(role);
            Ok(())
        })?;
    }

    Ok(roles)
}

/// Picks the field for `role`: an explicit `#[record(...)]` marker wins over the
/// conventional field name.
fn find_field<'a>(fields: &'a [(&'a Field, Vec<Role>)], role: Role) -> Result<Option<&'a Field>> {
    let mut marked = fields
        .iter()
        .filter(|(_, roles)| roles.contains(&role))
        .map(|(field, _)| *field);

    if let Some(field) = marked.next() {
        if let Some(duplicate) = marked.next() {
            return Err(syn::Error::new_spanned(
                duplicate,
                format!("only one field can be marked `#[record({})]`", role.default_name()),
            ));
        }
        return Ok(Some(field));
    }

    Ok(fields
        .iter()
        .map(|(field, _)| *field)
        .find(|field| field.ident.as_ref().is_some_and(|ident| ident == role.default_name())))
}

fn timestamp_accessor(method: &str, field: Option<&Field>) -> TokenStream2 {
    let method = Ident::new(method, proc_macro2::Span::call_site());

    match field.and_then(|field| field.ident.as_ref()) {
        Some(ident) => quote! {
            fn #method(
                &mut self,
            ) -> ::core::option::Option<&mut dyn ::mongorepo::record::Timestamp> {
                ::core::option::Option::Some(&mut self.#ident)
            }
        },
        None => TokenStream2::new(),
    }
}

fn expand_record(input: DeriveInput) -> Result<TokenStream2> {
    let name = &input.ident;
    let collection = collection_name(&input)?;

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => &named.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    name,
                    "Record can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                name,
                "Record can only be derived for structs",
            ));
        }
    };

    let fields = fields
        .iter()
        .map(|field| Ok((field, field_roles(field)?)))
        .collect::<Result<Vec<_>>>()?;

    let id_field = find_field(&fields, Role::Id)?.ok_or_else(|| {
        syn::Error::new_spanned(
            name,
            "Record needs an identifier: add a field named `id` or mark one with `#[record(id)]`",
        )
    })?;
    let id_ident = &id_field.ident;
    let id_ty = &id_field.ty;

    let created_at = timestamp_accessor("created_at_mut", find_field(&fields, Role::CreatedAt)?);
    let updated_at = timestamp_accessor("updated_at_mut", find_field(&fields, Role::UpdatedAt)?);

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::mongorepo::record::Record for #name #ty_generics #where_clause {
            type Id = #id_ty;

            fn collection_name() -> &'static str {
                #collection
            }

            fn id(&self) -> &Self::Id {
                &self.#id_ident
            }

            fn id_mut(&mut self) -> &mut Self::Id {
                &mut self.#id_ident
            }

            #created_at
            #updated_at
        }
    })
}
