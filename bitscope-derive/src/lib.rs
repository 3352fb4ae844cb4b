//! # Bitscope Derive Macros
//!
//! This crate provides the procedural macros for `bitscope`:
//!
//! - `#[derive(BitObject)]` implements `Object` (named structs) or `PositionalObject`
//!   (tuple structs), plus `Serialize`.
//! - `#[derive(BitEnum)]` implements `EnumTable`, `Scalar` and `Serialize` for
//!   fieldless enums, stored by variant name.
//!
//! Compatible with `syn 2.0`.

use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::{quote, quote_spanned};
use syn::spanned::Spanned;
use syn::{
    Attribute, Data, DataEnum, DeriveInput, Expr, Fields, Generics, Ident, LitStr, Path, Type,
    parenthesized, parse_macro_input, parse_quote,
};

/// Derives `Object` (or `PositionalObject`) and `Serialize`.
///
/// Field attributes (`#[bitscope(...)]`):
///
/// - `rename = "key"`: store the field under another key.
/// - `skip`: leave the field out of the document.
/// - `flatten`: serialize a nested `Object` into the same object.
/// - `required`, `range(min, max)`, `min_size = n`, `max_size = n`, `validate = path`:
///   validators, run in the order written.
///
/// Container attribute: `deny_unknown_fields` records an error for every source key
/// that matches no field.
#[proc_macro_derive(BitObject, attributes(bitscope))]
pub fn derive_bit_object(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_object(input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// Derives `EnumTable`, `Scalar` and `Serialize` for a fieldless enum.
///
/// Variants are stored by name; `#[bitscope(rename = "name")]` overrides it.
#[proc_macro_derive(BitEnum, attributes(bitscope))]
pub fn derive_bit_enum(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_enum(input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

// --- Attributes ---

#[derive(Default)]
struct ContainerAttrs {
    deny_unknown_fields: bool,
}

#[derive(Default)]
struct FieldAttrs {
    rename: Option<String>,
    skip: bool,
    flatten: bool,
    validators: Vec<ValidatorAttr>,
}

enum ValidatorAttr {
    Required,
    Range(Expr, Expr),
    MinSize(Expr),
    MaxSize(Expr),
    Custom(Path),
}

fn parse_container_attrs(attrs: &[Attribute]) -> syn::Result<ContainerAttrs> {
    let mut out = ContainerAttrs::default();
    for attr in attrs {
        if !attr.path().is_ident("bitscope") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("deny_unknown_fields") {
                out.deny_unknown_fields = true;
                return Ok(());
            }
            Err(meta.error("Unknown bitscope container attribute. Supported: deny_unknown_fields"))
        })?;
    }
    Ok(out)
}

fn parse_field_attrs(attrs: &[Attribute]) -> syn::Result<FieldAttrs> {
    let mut out = FieldAttrs::default();
    for attr in attrs {
        if !attr.path().is_ident("bitscope") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                let name: LitStr = meta.value()?.parse()?;
                out.rename = Some(name.value());
                return Ok(());
            }
            if meta.path.is_ident("skip") {
                out.skip = true;
                return Ok(());
            }
            if meta.path.is_ident("flatten") {
                out.flatten = true;
                return Ok(());
            }
            if meta.path.is_ident("required") {
                out.validators.push(ValidatorAttr::Required);
                return Ok(());
            }
            if meta.path.is_ident("range") {
                let content;
                parenthesized!(content in meta.input);
                let min: Expr = content.parse()?;
                content.parse::<syn::Token![,]>()?;
                let max: Expr = content.parse()?;
                out.validators.push(ValidatorAttr::Range(min, max));
                return Ok(());
            }
            if meta.path.is_ident("min_size") {
                out.validators
                    .push(ValidatorAttr::MinSize(meta.value()?.parse()?));
                return Ok(());
            }
            if meta.path.is_ident("max_size") {
                out.validators
                    .push(ValidatorAttr::MaxSize(meta.value()?.parse()?));
                return Ok(());
            }
            if meta.path.is_ident("validate") {
                let path: Path = meta.value()?.parse()?;
                out.validators.push(ValidatorAttr::Custom(path));
                return Ok(());
            }
            Err(meta.error(
                "Unknown bitscope field attribute. Supported: rename, skip, flatten, required, \
                 range, min_size, max_size, validate",
            ))
        })?;
    }
    Ok(out)
}

fn parse_variant_name(attrs: &[Attribute]) -> syn::Result<Option<String>> {
    let mut rename = None;
    for attr in attrs {
        if !attr.path().is_ident("bitscope") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                let name: LitStr = meta.value()?.parse()?;
                rename = Some(name.value());
                return Ok(());
            }
            Err(meta.error("Unknown bitscope variant attribute. Supported: rename"))
        })?;
    }
    Ok(rename)
}

// --- BitObject ---

struct NamedField {
    ident: Ident,
    ty: Type,
    key: String,
    attrs: FieldAttrs,
}

fn expand_object(input: DeriveInput) -> syn::Result<TokenStream2> {
    let container = parse_container_attrs(&input.attrs)?;
    let data = match &input.data {
        Data::Struct(data) => data,
        _ => {
            return Err(syn::Error::new(
                input.ident.span(),
                "BitObject only supports structs; use BitEnum for fieldless enums",
            ));
        }
    };

    match &data.fields {
        Fields::Named(named) => {
            let mut fields = Vec::new();
            for field in &named.named {
                let attrs = parse_field_attrs(&field.attrs)?;
                let Some(ident) = field.ident.clone() else {
                    continue;
                };
                let key = attrs
                    .rename
                    .clone()
                    .unwrap_or_else(|| ident.to_string().trim_start_matches("r#").to_owned());
                fields.push(NamedField {
                    ident,
                    ty: field.ty.clone(),
                    key,
                    attrs,
                });
            }
            generate_object(&input.ident, &input.generics, &container, &fields)
        }
        Fields::Unnamed(unnamed) => {
            if container.deny_unknown_fields {
                return Err(syn::Error::new(
                    input.ident.span(),
                    "deny_unknown_fields only applies to structs with named fields",
                ));
            }
            let mut positions = Vec::new();
            for (index, field) in unnamed.unnamed.iter().enumerate() {
                let attrs = parse_field_attrs(&field.attrs)?;
                if attrs.rename.is_some() || attrs.flatten || !attrs.validators.is_empty() {
                    return Err(syn::Error::new(
                        field.span(),
                        "tuple struct fields only support the `skip` attribute",
                    ));
                }
                if !attrs.skip {
                    positions.push(syn::Index::from(index));
                }
            }
            Ok(generate_positional(&input.ident, &input.generics, &positions))
        }
        Fields::Unit => generate_object(&input.ident, &input.generics, &container, &[]),
    }
}

fn add_serialize_bounds(generics: &Generics) -> Generics {
    let mut generics = generics.clone();
    for param in generics.type_params_mut() {
        param.bounds.push(parse_quote!(::bitscope::Serialize));
    }
    generics
}

fn generate_object(
    name: &Ident,
    generics: &Generics,
    container: &ContainerAttrs,
    fields: &[NamedField],
) -> syn::Result<TokenStream2> {
    let generics = add_serialize_bounds(generics);
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let mut statements = Vec::new();
    let mut keys = Vec::new();
    for field in fields.iter().filter(|f| !f.attrs.skip) {
        let ident = &field.ident;
        if field.attrs.flatten {
            if container.deny_unknown_fields {
                return Err(syn::Error::new(
                    ident.span(),
                    "flatten cannot be combined with deny_unknown_fields",
                ));
            }
            statements.push(quote_spanned! {ident.span()=>
                ::bitscope::KeyedScope::serialize_base(scope, &mut self.#ident)?;
            });
            continue;
        }

        let key = &field.key;
        keys.push(key.clone());
        statements.push(generate_field(field, key));
    }

    let field_count = keys.len();
    let deny = if container.deny_unknown_fields {
        quote! { ::bitscope::rt::reject_unknown_fields(scope, &[#(#keys),*])?; }
    } else if statements.is_empty() {
        quote! { let _ = scope; }
    } else {
        TokenStream2::new()
    };

    Ok(quote! {
        impl #impl_generics ::bitscope::Object for #name #ty_generics #where_clause {
            const FIELD_COUNT: usize = #field_count;

            fn serialize_fields<__S: ::bitscope::KeyedScope>(
                &mut self,
                scope: &mut __S,
            ) -> ::bitscope::Result<()> {
                #(#statements)*
                #deny
                ::core::result::Result::Ok(())
            }
        }

        impl #impl_generics ::bitscope::Serialize for #name #ty_generics #where_clause {
            fn serialize<__S: ::bitscope::Slot>(&mut self, slot: __S) -> ::bitscope::Result<bool> {
                ::bitscope::rt::serialize_object(self, slot)
            }
        }
    })
}

fn generate_field(field: &NamedField, key: &str) -> TokenStream2 {
    let ident = &field.ident;
    let ty = &field.ty;
    if field.attrs.validators.is_empty() {
        return quote! {
            ::bitscope::KeyedScope::serialize_value(scope, #key, &mut self.#ident)?;
        };
    }

    let count = field.attrs.validators.len();
    let validators = field.attrs.validators.iter().map(|validator| match validator {
        ValidatorAttr::Required => quote! { &::bitscope::Required },
        ValidatorAttr::Range(min, max) => quote! {
            &::bitscope::Range::<<#ty as ::bitscope::rt::Bounded>::Bound>::new(#min, #max)
        },
        ValidatorAttr::MinSize(n) => quote! { &::bitscope::MinSize(#n) },
        ValidatorAttr::MaxSize(n) => quote! { &::bitscope::MaxSize(#n) },
        ValidatorAttr::Custom(path) => quote! { &#path },
    });

    quote! {
        {
            let validators: [&dyn ::bitscope::Validator<#ty>; #count] = [#(#validators),*];
            ::bitscope::KeyedScope::serialize_field(scope, #key, &mut self.#ident, &validators)?;
        }
    }
}

fn generate_positional(name: &Ident, generics: &Generics, positions: &[syn::Index]) -> TokenStream2 {
    let generics = add_serialize_bounds(generics);
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();
    let arity = positions.len();
    let items = positions.iter().enumerate().map(|(order, index)| {
        quote! {
            if #order < available {
                ::bitscope::UnkeyedScope::serialize_value(array, &mut self.#index)?;
            }
        }
    });

    quote! {
        impl #impl_generics ::bitscope::PositionalObject for #name #ty_generics #where_clause {
            const ARITY: usize = #arity;

            fn serialize_items<__A: ::bitscope::UnkeyedScope>(
                &mut self,
                array: &mut __A,
            ) -> ::bitscope::Result<()> {
                let available = ::bitscope::rt::fixed_len(&*array, #arity);
                #(#items)*
                ::core::result::Result::Ok(())
            }
        }

        impl #impl_generics ::bitscope::Serialize for #name #ty_generics #where_clause {
            fn serialize<__S: ::bitscope::Slot>(&mut self, slot: __S) -> ::bitscope::Result<bool> {
                ::bitscope::rt::serialize_positional(self, slot)
            }
        }
    }
}

// --- BitEnum ---

fn expand_enum(input: DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let Data::Enum(DataEnum { variants, .. }) = &input.data else {
        return Err(syn::Error::new(name.span(), "BitEnum only supports enums"));
    };
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new(
            input.generics.span(),
            "BitEnum does not support generic enums",
        ));
    }
    if variants.is_empty() {
        return Err(syn::Error::new(
            Span::call_site(),
            "BitEnum needs at least one variant",
        ));
    }

    let mut idents = Vec::new();
    let mut names = Vec::new();
    for variant in variants {
        if !matches!(variant.fields, Fields::Unit) {
            return Err(syn::Error::new(
                variant.span(),
                "BitEnum only supports fieldless variants",
            ));
        }
        let stored = parse_variant_name(&variant.attrs)?.unwrap_or_else(|| variant.ident.to_string());
        if names.contains(&stored) {
            return Err(syn::Error::new(
                variant.span(),
                format!("the name '{stored}' is used by two variants"),
            ));
        }
        idents.push(variant.ident.clone());
        names.push(stored);
    }

    Ok(quote! {
        impl ::bitscope::EnumTable for #name {
            fn to_name(&self) -> ::core::option::Option<&'static str> {
                match self {
                    #( Self::#idents => ::core::option::Option::Some(#names), )*
                }
            }

            fn from_name(name: &str) -> ::core::option::Option<Self> {
                match name {
                    #( #names => ::core::option::Option::Some(Self::#idents), )*
                    _ => ::core::option::Option::None,
                }
            }
        }

        impl ::bitscope::Scalar for #name {
            fn load_from<__N: ::bitscope::Node>(
                node: &__N,
            ) -> ::core::result::Result<Self, ::bitscope::ConversionError> {
                ::bitscope::rt::load_enum(node)
            }

            fn save_into<__N: ::bitscope::Node>(
                &self,
                node: &mut __N,
            ) -> ::core::result::Result<(), ::bitscope::ConversionError> {
                ::bitscope::rt::save_enum(self, node)
            }
        }

        impl ::bitscope::Serialize for #name {
            const IS_MAP_KEY: bool = true;

            fn serialize<__S: ::bitscope::Slot>(&mut self, slot: __S) -> ::bitscope::Result<bool> {
                ::bitscope::Slot::scalar(slot, self)
            }

            fn to_map_key(&self) -> ::core::option::Option<::std::string::String> {
                ::bitscope::EnumTable::to_name(self).map(::std::borrow::ToOwned::to_owned)
            }

            fn from_map_key(key: &str) -> ::core::option::Option<Self> {
                <Self as ::bitscope::EnumTable>::from_name(key)
            }
        }
    })
}
