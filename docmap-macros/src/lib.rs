//! Procedural macros for the docmap project.
//!
//! This crate provides `#[derive(Record)]`, which generates the static field schema
//! and by-name field access that the adaptor uses to map structs onto documents.

#[allow(unused_extern_crates)]
extern crate self as docmap_macros;

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{Data, DeriveInput, Fields, Ident, LitStr, Path, Type, parse_macro_input, spanned::Spanned};

/// Derives `docmap::record::Record` for a struct with named fields.
///
/// The identifier is the field marked `#[record(id)]`, otherwise a field named `id`
/// or `_id`. Every other field is declared in the schema unless marked
/// `#[record(skip)]`. `#[record(rename = "...")]` changes the document field name.
///
/// The container attribute `#[record(crate = "...")]` overrides the path to the
/// runtime crate, which defaults to `::docmap`.
#[proc_macro_derive(Record, attributes(record))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    expand_record(input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

struct RecordField {
    ident: Ident,
    name: String,
    ty: Type,
}

#[derive(Default)]
struct FieldAttrs {
    id: bool,
    skip: bool,
    rename: Option<String>,
}

fn expand_record(input: DeriveInput) -> syn::Result<TokenStream2> {
    let krate = crate_path(&input)?;
    let named = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => &named.named,
            _ => return Err(syn::Error::new(input.span(), "Record requires a struct with named fields")),
        },
        _ => return Err(syn::Error::new(input.span(), "Record can only be derived for structs")),
    };

    let mut explicit_id: Option<Ident> = None;
    let mut implicit_id: Option<usize> = None;
    let mut fields = Vec::new();

    for field in named {
        let Some(ident) = field.ident.clone() else {
            continue;
        };
        let attrs = field_attrs(field)?;
        let rust_name = ident.to_string();
        let rust_name = rust_name.trim_start_matches("r#");

        if attrs.id {
            if explicit_id.is_some() {
                return Err(syn::Error::new(field.span(), "only one field can be marked #[record(id)]"));
            }
            explicit_id = Some(ident);
            continue;
        }
        if attrs.skip {
            continue;
        }
        let record_field = RecordField {
            name: attrs.rename.unwrap_or_else(|| rust_name.to_string()),
            ident,
            ty: field.ty.clone(),
        };
        if implicit_id.is_none() && (rust_name == "id" || rust_name == "_id") {
            implicit_id = Some(fields.len());
        }

        fields.push(record_field);
    }

    // An explicit identifier leaves an implicitly named `id` in place as a plain field.
    let id_ident = match (explicit_id, implicit_id) {
        (Some(explicit), _) => Some(explicit),
        (None, Some(index)) => Some(fields.remove(index).ident),
        (None, None) => None,
    };

    if let Some(field) = fields.iter().find(|f| f.name == "_id") {
        return Err(syn::Error::new(
            field.ident.span(),
            "`_id` is reserved for the identifier; mark the field #[record(id)] or rename it",
        ));
    }

    let ident = &input.ident;
    let record_name = ident.to_string();
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let names = fields.iter().map(|f| LitStr::new(&f.name, f.ident.span())).collect::<Vec<_>>();
    let idents = fields.iter().map(|f| &f.ident).collect::<Vec<_>>();
    let type_names = fields
        .iter()
        .map(|f| {
            let ty = &f.ty;
            LitStr::new(&quote!(#ty).to_string().replace(' ', ""), ty.span())
        })
        .collect::<Vec<_>>();

    let id_field = match &id_ident {
        Some(id) => {
            let id = LitStr::new(id.to_string().trim_start_matches("r#"), id.span());
            quote!(::core::option::Option::Some(#id))
        }
        None => quote!(::core::option::Option::None),
    };

    let identifier_methods = id_ident.map(|id| quote! {
        fn identifier(&self) -> #krate::error::DocmapResult<::core::option::Option<#krate::bson::Bson>> {
            match #krate::bson::ser::serialize_to_bson(&self.#id)? {
                #krate::bson::Bson::Null => ::core::result::Result::Ok(::core::option::Option::None),
                id => ::core::result::Result::Ok(::core::option::Option::Some(id)),
            }
        }

        fn set_identifier(&mut self, id: #krate::bson::Bson) -> #krate::error::DocmapResult<bool> {
            self.#id = #krate::bson::de::deserialize_from_bson(id)?;
            ::core::result::Result::Ok(true)
        }
    });

    Ok(quote! {
        impl #impl_generics #krate::record::Record for #ident #ty_generics #where_clause {
            fn schema() -> &'static #krate::record::RecordSchema {
                static SCHEMA: #krate::record::RecordSchema = #krate::record::RecordSchema::new(
                    #record_name,
                    &[#(#krate::record::FieldDescriptor::new(#names, #type_names)),*],
                    #id_field,
                );

                &SCHEMA
            }

            fn get_field(
                &self,
                field: &str,
            ) -> #krate::error::DocmapResult<::core::option::Option<#krate::bson::Bson>> {
                match field {
                    #(#names => ::core::result::Result::Ok(::core::option::Option::Some(
                        #krate::bson::ser::serialize_to_bson(&self.#idents)?,
                    )),)*
                    _ => ::core::result::Result::Ok(::core::option::Option::None),
                }
            }

            #[allow(unused_variables)]
            fn set_field(
                &mut self,
                field: &str,
                value: #krate::bson::Bson,
            ) -> #krate::error::DocmapResult<bool> {
                match field {
                    #(#names => {
                        self.#idents = #krate::bson::de::deserialize_from_bson(value)?;
                        ::core::result::Result::Ok(true)
                    })*
                    _ => ::core::result::Result::Ok(false),
                }
            }

            #identifier_methods
        }
    })
}

fn crate_path(input: &DeriveInput) -> syn::Result<Path> {
    let mut krate: Path = syn::parse_quote!(::docmap);

    for attr in input.attrs.iter().filter(|a| a.path().is_ident("record")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("crate") {
                let value: LitStr = meta.value()?.parse()?;
                krate = value.parse()?;
                Ok(())
            } else {
                Err(meta.error("unsupported record container attribute"))
            }
        })?;
    }

    Ok(krate)
}

fn field_attrs(field: &syn::Field) -> syn::Result<FieldAttrs> {
    let mut attrs = FieldAttrs::default();

    for attr in field.attrs.iter().filter(|a| a.path().is_ident("record")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("id") {
                attrs.id = true;
            } else if meta.path.is_ident("skip") {
                attrs.skip = true;
            } else if meta.path.is_ident("rename") {
                let value: LitStr = meta.value()?.parse()?;
                attrs.rename = Some(value.value());
            } else {
                return Err(meta.error("unsupported record field attribute"));
            }
            Ok(())
        })?;
    }

    if attrs.id && attrs.skip {
        return Err(syn::Error::new(field.span(), "an identifier field cannot be skipped"));
    }

    Ok(attrs)
}
