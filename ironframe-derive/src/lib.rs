//! Derive macro implementing field-tag injection for `ironframe`.
//!
//! Rust has no runtime reflection over field attributes, so the tag grammar from
//! the framework's field-injection contract (`inject`, `inject,optional`,
//! `inject,name=X`, `inject,name=X,optional`) is expressed here as a field
//! attribute parsed at compile time instead of a runtime string tag:
//!
//! ```ignore
//! #[derive(Inject)]
//! struct Handler {
//!     #[inject]
//!     db: Arc<Database>,
//!     #[inject(name = "audit")]
//!     logger: Arc<Logger>,
//!     #[inject(optional)]
//!     cache: Option<Arc<Cache>>,
//! }
//! ```
//!
//! A required field's type must be `Arc<T>`; an optional field's type must be
//! `Option<Arc<T>>` (Rust's equivalent of "leave zero value" for a pointer-typed
//! field that failed to resolve). Fields without `#[inject]` are left untouched,
//! matching "a field without the inject keyword is ignored even if other
//! modifiers appear".

use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Fields, GenericArgument, PathArguments, Type};

#[proc_macro_derive(Inject, attributes(inject))]
pub fn derive_inject(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => &named.named,
            _ => {
                return syn::Error::new_spanned(
                    &input,
                    "Inject can only be derived for structs with named fields",
                )
                .to_compile_error()
                .into()
            }
        },
        _ => {
            return syn::Error::new_spanned(&input, "Inject can only be derived for structs")
                .to_compile_error()
                .into()
        }
    };

    let mut assignments = Vec::new();

    for field in fields {
        let tag = match parse_inject_attr(field) {
            Ok(Some(tag)) => tag,
            Ok(None) => continue,
            Err(err) => return err.to_compile_error().into(),
        };

        let field_ident = field.ident.as_ref().expect("named field");

        let name_expr = match &tag.name {
            Some(n) => quote! { ::std::option::Option::Some(#n) },
            None => quote! { ::std::option::Option::None },
        };

        let assignment = if tag.optional {
            let inner = extract_option_arc_inner(&field.ty).unwrap_or_else(|| field.ty.clone());
            quote! {
                self.#field_ident = match container.resolve_named::<#inner>(#name_expr) {
                    ::std::result::Result::Ok(v) => ::std::option::Option::Some(v),
                    ::std::result::Result::Err(::ironframe::DiError::NotFound(_)) => ::std::option::Option::None,
                    ::std::result::Result::Err(e) => return ::std::result::Result::Err(e),
                };
            }
        } else {
            let inner = extract_arc_inner(&field.ty).unwrap_or_else(|| field.ty.clone());
            quote! {
                self.#field_ident = container.resolve_named::<#inner>(#name_expr)?;
            }
        };

        assignments.push(assignment);
    }

    let expanded = quote! {
        impl #impl_generics ::ironframe::Inject for #name #ty_generics #where_clause {
            fn inject_fields(&mut self, container: &::ironframe::Container) -> ::ironframe::DiResult<()> {
                #(#assignments)*
                ::std::result::Result::Ok(())
            }
        }
    };

    expanded.into()
}

struct InjectTag {
    optional: bool,
    name: Option<String>,
}

fn parse_inject_attr(field: &syn::Field) -> syn::Result<Option<InjectTag>> {
    for attr in &field.attrs {
        if !attr.path().is_ident("inject") {
            continue;
        }

        let mut tag = InjectTag {
            optional: false,
            name: None,
        };

        if let syn::Meta::List(_) = &attr.meta {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("optional") {
                    tag.optional = true;
                    Ok(())
                } else if meta.path.is_ident("name") {
                    let value = meta.value()?;
                    let lit: syn::LitStr = value.parse()?;
                    tag.name = Some(lit.value());
                    Ok(())
                } else {
                    Err(meta.error("unrecognized inject modifier"))
                }
            })?;
        }

        return Ok(Some(tag));
    }

    Ok(None)
}

fn extract_arc_inner(ty: &Type) -> Option<Type> {
    generic_inner(ty, "Arc")
}

fn extract_option_arc_inner(ty: &Type) -> Option<Type> {
    let option_inner = generic_inner(ty, "Option")?;
    generic_inner(&option_inner, "Arc")
}

fn generic_inner(ty: &Type, ident: &str) -> Option<Type> {
    let Type::Path(type_path) = ty else {
        return None;
    };
    let segment = type_path.path.segments.last()?;
    if segment.ident != ident {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    args.args.iter().find_map(|arg| match arg {
        GenericArgument::Type(t) => Some(t.clone()),
        _ => None,
    })
}
