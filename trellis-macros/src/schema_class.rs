use crate::serde_attr;
use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::punctuated::Punctuated;
use syn::{parse_macro_input, Data, DeriveInput, Error, Expr, Fields, Path, Token};

pub fn derive_impl(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(&input) {
        Ok(tokens) => TokenStream::from(tokens),
        Err(e) => TokenStream::from(e.to_compile_error()),
    }
}

struct Property {
    key: String,
    decorators: Vec<Expr>,
}

fn expand(input: &DeriveInput) -> Result<TokenStream2, Error> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(Error::new_spanned(
                    name,
                    "SchemaClass can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(Error::new_spanned(
                name,
                "SchemaClass can only be derived for structs",
            ));
        }
    };

    let extends = parse_extends(input)?;
    let rename_all = serde_attr::rename_all(&input.attrs)?;

    let mut properties = Vec::new();
    for field in fields {
        let serde = serde_attr::field(&field.attrs)?;
        let decorators = parse_decorators(&field.attrs)?;

        if serde.flatten || serde.skip {
            if let Some(first) = decorators.first() {
                return Err(Error::new_spanned(
                    first,
                    "#[schema] has no effect on flattened or skipped fields\n\
                     hint: use #[schema_class(extends = ...)] for flattened parents",
                ));
            }
            continue;
        }
        if decorators.is_empty() {
            continue;
        }

        let ident = field
            .ident
            .as_ref()
            .ok_or_else(|| Error::new_spanned(field, "expected a named field"))?;
        let field_name = ident.to_string();
        let field_name = field_name.strip_prefix("r#").unwrap_or(&field_name);
        let key = match (&serde.rename, rename_all) {
            (Some(rename), _) => rename.clone(),
            (None, Some(rule)) => rule.apply(field_name),
            (None, None) => field_name.to_string(),
        };
        properties.push(Property { key, decorators });
    }

    let extends = extends.map(|parent| {
        quote! {
            __definition.extends::<#parent>()?;
        }
    });
    let properties = properties.iter().map(|Property { key, decorators }| {
        quote! {
            __definition.property(#key, [#(#decorators),*])?;
        }
    });

    Ok(quote! {
        impl #impl_generics ::trellis_validation::SchemaClass for #name #ty_generics #where_clause {
            fn define(
                __definition: &mut ::trellis_validation::ClassDefinition<'_>,
            ) -> ::core::result::Result<(), ::trellis_validation::DefinitionError> {
                #[allow(unused_imports)]
                use ::trellis_validation::decorators::*;

                #extends
                #(#properties)*
                ::core::result::Result::Ok(())
            }
        }
    })
}

/// `#[schema_class(extends = Parent)]`
fn parse_extends(input: &DeriveInput) -> Result<Option<Path>, Error> {
    let mut extends = None;
    for attr in input.attrs.iter().filter(|a| a.path().is_ident("schema_class")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("extends") {
                if extends.is_some() {
                    return Err(meta.error("duplicate `extends`; a class has one parent"));
                }
                extends = Some(meta.value()?.parse::<Path>()?);
                Ok(())
            } else {
                Err(meta.error("unknown schema_class option\nhint: supported options are: extends"))
            }
        })?;
    }
    Ok(extends)
}

/// Every `#[schema(...)]` expression on a field, in source order.
fn parse_decorators(attrs: &[syn::Attribute]) -> Result<Vec<Expr>, Error> {
    let mut decorators = Vec::new();
    for attr in attrs.iter().filter(|a| a.path().is_ident("schema")) {
        let list = attr.parse_args_with(Punctuated::<Expr, Token![,]>::parse_terminated)?;
        if list.is_empty() {
            return Err(Error::new_spanned(attr, "empty #[schema] attribute"));
        }
        decorators.extend(list);
    }
    Ok(decorators)
}
