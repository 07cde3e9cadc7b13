//! The subset of `#[serde(...)]` that decides property keys
//!
//! - `rename = "..."` on fields
//! - `rename_all = "..."` on containers
//! - `flatten` and `skip` on fields
//!
//! Everything else is parsed and ignored.

use syn::meta::ParseNestedMeta;
use syn::{Attribute, Error, LitStr, Token};

#[derive(Default)]
pub struct SerdeField {
    pub rename: Option<String>,
    pub flatten: bool,
    pub skip: bool,
}

pub fn field(attrs: &[Attribute]) -> Result<SerdeField, Error> {
    let mut field = SerdeField::default();
    for attr in attrs.iter().filter(|a| a.path().is_ident("serde")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                if meta.input.peek(Token![=]) {
                    let name: LitStr = meta.value()?.parse()?;
                    field.rename = Some(name.value());
                } else {
                    skip_value(&meta)?;
                }
            } else if meta.path.is_ident("flatten") {
                field.flatten = true;
            } else if meta.path.is_ident("skip") {
                field.skip = true;
            } else {
                skip_value(&meta)?;
            }
            Ok(())
        })?;
    }
    Ok(field)
}

pub fn rename_all(attrs: &[Attribute]) -> Result<Option<RenameRule>, Error> {
    let mut rule = None;
    for attr in attrs.iter().filter(|a| a.path().is_ident("serde")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename_all") && meta.input.peek(Token![=]) {
                let value: LitStr = meta.value()?.parse()?;
                rule = Some(RenameRule::parse(&value.value()).ok_or_else(|| {
                    Error::new(value.span(), format!("unknown rename_all rule: \"{}\"", value.value()))
                })?);
            } else {
                skip_value(&meta)?;
            }
            Ok(())
        })?;
    }
    Ok(rule)
}

/// Consume `= value` or `(...)` after a meta path we do not care about.
fn skip_value(meta: &ParseNestedMeta) -> Result<(), Error> {
    if meta.input.peek(Token![=]) {
        let _: syn::Expr = meta.value()?.parse()?;
    } else if meta.input.peek(syn::token::Paren) {
        let content;
        syn::parenthesized!(content in meta.input);
        let _: proc_macro2::TokenStream = content.parse()?;
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RenameRule {
    Lower,
    Upper,
    Pascal,
    Camel,
    Snake,
    ScreamingSnake,
    Kebab,
    ScreamingKebab,
}

impl RenameRule {
    fn parse(rule: &str) -> Option<Self> {
        match rule {
            "lowercase" => Some(Self::Lower),
            "UPPERCASE" => Some(Self::Upper),
            "PascalCase" => Some(Self::Pascal),
            "camelCase" => Some(Self::Camel),
            "snake_case" => Some(Self::Snake),
            "SCREAMING_SNAKE_CASE" => Some(Self::ScreamingSnake),
            "kebab-case" => Some(Self::Kebab),
            "SCREAMING-KEBAB-CASE" => Some(Self::ScreamingKebab),
            _ => None,
        }
    }

    /// Apply to a snake_case field name.
    pub fn apply(&self, field: &str) -> String {
        match self {
            Self::Lower | Self::Snake => field.to_string(),
            Self::Upper | Self::ScreamingSnake => field.to_ascii_uppercase(),
            Self::Kebab => field.replace('_', "-"),
            Self::ScreamingKebab => field.to_ascii_uppercase().replace('_', "-"),
            Self::Pascal => pascal(field),
            Self::Camel => {
                let pascal = pascal(field);
                let mut chars = pascal.chars();
                match chars.next() {
                    Some(first) => first.to_ascii_lowercase().to_string() + chars.as_str(),
                    None => pascal,
                }
            }
        }
    }
}

fn pascal(field: &str) -> String {
    field
        .split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn test_rename_rules() {
        assert_eq!(RenameRule::Camel.apply("created_at"), "createdAt");
        assert_eq!(RenameRule::Pascal.apply("created_at"), "CreatedAt");
        assert_eq!(RenameRule::Kebab.apply("created_at"), "created-at");
        assert_eq!(RenameRule::ScreamingSnake.apply("created_at"), "CREATED_AT");
    }

    #[test]
    fn test_field_attributes() {
        let attrs: Vec<Attribute> = vec![
            parse_quote!(#[serde(rename = "myProperty", skip_serializing_if = "Option::is_none")]),
            parse_quote!(#[serde(default)]),
        ];
        let field = field(&attrs).unwrap();
        assert_eq!(field.rename.as_deref(), Some("myProperty"));
        assert!(!field.flatten);

        let attrs: Vec<Attribute> = vec![parse_quote!(#[serde(flatten)])];
        assert!(super::field(&attrs).unwrap().flatten);
    }

    #[test]
    fn test_container_rename_all() {
        let attrs: Vec<Attribute> = vec![parse_quote!(#[serde(rename_all = "camelCase", deny_unknown_fields)])];
        assert_eq!(rename_all(&attrs).unwrap(), Some(RenameRule::Camel));

        let attrs: Vec<Attribute> = vec![parse_quote!(#[serde(rename_all = "Title Case")])];
        assert!(rename_all(&attrs).is_err());
    }
}
