//! Code generation for `#[derive(Bind)]`.

use proc_macro2::{Span, TokenStream};
use quote::quote;
use syn::{DeriveInput, Ident, LitStr};

use crate::parse::{BindField, BindStruct, FieldKind};

/// Expands a derive input into an `impl ::tessera::Binding`.
pub fn expand_bind(input: TokenStream) -> syn::Result<TokenStream> {
    let input: DeriveInput = syn::parse2(input)?;
    let parsed = BindStruct::parse(input)?;

    let ident = &parsed.ident;
    let (impl_generics, ty_generics, where_clause) = parsed.generics.split_for_impl();

    let bound: Vec<&BindField> = parsed
        .fields
        .iter()
        .filter(|field| field.kind != FieldKind::Skip)
        .collect();

    let describe = bound.iter().copied().map(describe_field);
    let assign = bound.iter().copied().map(assign_arm);

    let bulk_body = parsed.protobuf || parsed.json_bulk;

    let prebind_json = parsed.json_bulk.then(|| {
        quote! {
            fn prebind_json(
                &mut self,
                body: &[u8],
            ) -> ::core::result::Result<(), ::tessera::__private::serde_json::Error> {
                *self = ::tessera::__private::serde_json::from_slice(body)?;
                ::core::result::Result::Ok(())
            }
        }
    });

    let as_protobuf = parsed.protobuf.then(|| {
        quote! {
            fn as_protobuf(
                &mut self,
            ) -> ::core::option::Option<&mut dyn ::tessera::ProtobufMessage> {
                ::core::option::Option::Some(self)
            }
        }
    });

    Ok(quote! {
        impl #impl_generics ::tessera::Binding for #ident #ty_generics #where_clause {
            const BULK_BODY: bool = #bulk_body;

            fn describe(walker: &mut ::tessera::FieldWalker) {
                #(#describe)*
            }

            #[allow(unused_variables)]
            fn assign(
                &mut self,
                path: &[usize],
                raw: ::tessera::RawValue<'_>,
                loose_zero: bool,
            ) -> ::core::result::Result<(), ::tessera::ConvertError> {
                match path {
                    #(#assign)*
                    _ => ::core::result::Result::Err(::tessera::ConvertError::Unsupported),
                }
            }

            #prebind_json
            #as_protobuf
        }
    })
}

/// Emits the `walker.field(...)` or `walker.nested::<T>(...)` call for one field.
fn describe_field(field: &BindField) -> TokenStream {
    let name = LitStr::new(&field.name, Span::call_site());
    let index = field.index;

    let mut descriptor = match field.kind {
        FieldKind::Nested { .. } => quote! { ::tessera::FieldDescriptor::nested(#name, #index) },
        _ => quote! { ::tessera::FieldDescriptor::leaf(#name, #index) },
    };

    if matches!(field.kind, FieldKind::Nested { anonymous: true }) {
        descriptor = quote! { #descriptor.anonymous() };
    }
    if field.required {
        descriptor = quote! { #descriptor.required() };
    }
    for directive in &field.directives {
        let location = location_path(&directive.location);
        let lookup = match &directive.name {
            Some(name) => quote! { ::core::option::Option::Some(#name) },
            None => quote! { ::core::option::Option::None },
        };
        let required = directive.required;
        descriptor = quote! { #descriptor.directive(#location, #lookup, #required) };
    }
    for excluded in &field.excluded {
        let location = location_path(excluded);
        descriptor = quote! { #descriptor.exclude(#location) };
    }
    if let Some(expression) = &field.validation {
        descriptor = quote! { #descriptor.validate(#expression) };
    }

    match field.kind {
        FieldKind::Nested { .. } => {
            let ty = &field.ty;
            quote! { walker.nested::<#ty>(#descriptor); }
        }
        _ => quote! { walker.field(#descriptor); },
    }
}

/// Emits the `assign` match arm routing an index path to one field.
fn assign_arm(field: &BindField) -> TokenStream {
    let member = &field.member;
    let index = field.index;

    match field.kind {
        FieldKind::Nested { .. } => quote! {
            [#index, rest @ ..] => ::tessera::Binding::assign(&mut self.#member, rest, raw, loose_zero),
        },
        _ => quote! {
            [#index] => {
                self.#member = ::tessera::convert(raw, loose_zero)?;
                ::core::result::Result::Ok(())
            }
        },
    }
}

/// Maps an attribute key to its `::tessera::Location` variant.
fn location_path(tag: &str) -> TokenStream {
    let variant = match tag {
        "path" => "Path",
        "form" => "Form",
        "query" => "Query",
        "cookie" => "Cookie",
        "header" => "Header",
        "protobuf" => "Protobuf",
        "json" => "Json",
        _ => "RawBody",
    };
    let variant = Ident::new(variant, Span::call_site());
    quote! { ::tessera::Location::#variant }
}
