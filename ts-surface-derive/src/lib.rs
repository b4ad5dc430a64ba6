//! # ts-surface derive
//!
//! `#[derive(Reflect)]` for record structs, so the field list is read from the
//! struct itself instead of being repeated by hand.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::ext::IdentExt;
use syn::spanned::Spanned;
use syn::{parse_macro_input, parse_quote, Data, DataStruct, DeriveInput, Fields, LitBool, LitStr};

/// Implements `ts_surface::Reflect` and `ts_surface::ReflectRecord` for a struct
/// with named fields.
///
/// # Example
/// ```ignore
/// #[derive(Reflect)]
/// #[ts(rename = "Account")]
/// struct AccountRow {
///     id: u64,
///     #[ts(rename = "createdAt", ts_type = "date")]
///     created_at: i64,
///     #[ts(optional)]
///     nickname: String,
///     #[ts(skip)]
///     cache: std::cell::Cell<u32>,
/// }
/// ```
#[proc_macro_derive(Reflect, attributes(ts))]
pub fn derive_reflect(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(input).unwrap_or_else(syn::Error::into_compile_error).into()
}

#[derive(Default)]
struct FieldOpts {
    rename: Option<LitStr>,
    ts_type: Option<LitStr>,
    optional: Option<LitBool>,
    skip: bool,
}

fn expand(input: DeriveInput) -> syn::Result<TokenStream2> {
    let fields = match &input.data {
        Data::Struct(DataStruct { fields: Fields::Named(named), .. }) => &named.named,
        _ => {
            return Err(syn::Error::new_spanned(
                &input.ident,
                "`Reflect` can only be derived for structs with named fields",
            ))
        }
    };
    if let Some(lifetime) = input.generics.lifetimes().next() {
        return Err(syn::Error::new_spanned(lifetime, "reflected records cannot borrow"));
    }

    let ident = &input.ident;
    let record_name = match record_rename(&input)? {
        Some(name) => name,
        None => LitStr::new(&ident.unraw().to_string(), ident.span()),
    };

    let mut generics = input.generics.clone();
    for param in generics.type_params_mut() {
        param.bounds.push(parse_quote!(::ts_surface::Reflect));
        param.bounds.push(parse_quote!('static));
    }
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let mut defs = Vec::with_capacity(fields.len());
    for field in fields {
        let opts = field_opts(field)?;
        if opts.skip {
            continue;
        }
        let Some(name) = &field.ident else { continue };
        let name = name.unraw().to_string();
        let ty = &field.ty;
        let rename = opts.rename.map(|lit| quote!(.rename(#lit)));
        let ts_type = opts.ts_type.map(|lit| quote!(.ts_type(#lit)));
        let optional = opts.optional.map(|lit| quote!(.optional(#lit)));
        defs.push(quote! {
            ::ts_surface::FieldDef::new(#name, <#ty as ::ts_surface::Reflect>::type_desc())
                #rename #ts_type #optional
        });
    }

    Ok(quote! {
        impl #impl_generics ::ts_surface::Reflect for #ident #ty_generics #where_clause {
            fn type_desc() -> ::ts_surface::TypeDesc {
                ::ts_surface::reflect::record_desc::<Self>()
            }
        }

        impl #impl_generics ::ts_surface::ReflectRecord for #ident #ty_generics #where_clause {
            const NAME: &'static str = #record_name;

            fn fields() -> ::std::vec::Vec<::ts_surface::FieldDef> {
                ::std::vec![#(#defs),*]
            }
        }
    })
}

fn record_rename(input: &DeriveInput) -> syn::Result<Option<LitStr>> {
    let mut rename = None;
    for attr in input.attrs.iter().filter(|attr| attr.path().is_ident("ts")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                rename = Some(meta.value()?.parse()?);
                Ok(())
            } else {
                Err(meta.error("unknown record option, expected `rename`"))
            }
        })?;
    }
    Ok(rename)
}

fn field_opts(field: &syn::Field) -> syn::Result<FieldOpts> {
    let mut opts = FieldOpts::default();
    for attr in field.attrs.iter().filter(|attr| attr.path().is_ident("ts")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                opts.rename = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("ts_type") {
                opts.ts_type = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("optional") {
                // bare `optional` means `optional = true`
                opts.optional = Some(if meta.input.peek(syn::Token![=]) {
                    meta.value()?.parse()?
                } else {
                    LitBool::new(true, meta.path.span())
                });
            } else if meta.path.is_ident("skip") {
                opts.skip = true;
            } else {
                return Err(meta.error(
                    "unknown field option, expected `rename`, `ts_type`, `optional` or `skip`",
                ));
            }
            Ok(())
        })?;
    }
    Ok(opts)
}
