//! Attribute parsing for the resource derive.
//!
//! Reads `#[jsonapi(...)]` and the subset of `#[serde(...)]` that changes
//! member names or drops members. Serde keys that do not affect naming are
//! skipped.

use convert_case::{Case, Casing};
use syn::meta::ParseNestedMeta;
use syn::{Attribute, LitBool, LitStr, Token};

/// Container-level `#[jsonapi(...)]` and `#[serde(...)]` settings.
#[derive(Debug)]
pub struct ContainerAttrs {
    /// Resource type on the wire.
    pub resource_type: Option<String>,
    /// Path of the core crate.
    pub krate: syn::Path,
    /// `#[serde(rename_all)]` rule.
    pub rename_all: Option<RenameRule>,
}

impl ContainerAttrs {
    pub fn parse(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut parsed = Self {
            resource_type: None,
            krate: syn::parse_quote!(::meridian_core),
            rename_all: None,
        };
        for attr in attrs {
            if attr.path().is_ident("jsonapi") {
                attr.parse_nested_meta(|meta| {
                    if meta.path.is_ident("resource_type") {
                        let value: LitStr = meta.value()?.parse()?;
                        if value.value().is_empty() {
                            return Err(meta.error("resource_type must not be empty"));
                        }
                        parsed.resource_type = Some(value.value());
                    } else if meta.path.is_ident("crate") {
                        let value: LitStr = meta.value()?.parse()?;
                        parsed.krate = value.parse()?;
                    } else {
                        return Err(meta.error("unknown jsonapi container attribute"));
                    }
                    Ok(())
                })?;
            } else if attr.path().is_ident("serde") {
                attr.parse_nested_meta(|meta| {
                    if meta.path.is_ident("rename_all") {
                        if let Some(rule) = serialize_name(&meta)? {
                            parsed.rename_all = Some(RenameRule::parse(&rule).ok_or_else(|| {
                                meta.error(format!("unknown rename_all rule: {rule}"))
                            })?);
                        }
                    } else {
                        skip_value(&meta)?;
                    }
                    Ok(())
                })?;
            }
        }
        Ok(parsed)
    }
}

/// Field-level `#[jsonapi(...)]` settings.
#[derive(Debug, Default)]
pub struct FieldAttrs {
    pub id: bool,
    pub json_name: Option<String>,
    pub ignore: bool,
    pub read_only: bool,
    pub immutable: bool,
    pub postable: Option<bool>,
    pub patchable: Option<bool>,
    pub non_sortable: bool,
    pub non_filterable: bool,
    pub parse_with: Option<String>,
    pub relation_ids: Option<String>,
    pub lookup_include: Option<LookupInclude>,
    pub include_by_default: bool,
}

impl FieldAttrs {
    pub fn parse(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut parsed = Self::default();
        for attr in attrs.iter().filter(|a| a.path().is_ident("jsonapi")) {
            attr.parse_nested_meta(|meta| {
                let path = &meta.path;
                if path.is_ident("id") {
                    parsed.id = true;
                } else if path.is_ident("json_name") {
                    let value: LitStr = meta.value()?.parse()?;
                    parsed.json_name = Some(value.value());
                } else if path.is_ident("ignore") {
                    parsed.ignore = true;
                } else if path.is_ident("read_only") {
                    parsed.read_only = true;
                } else if path.is_ident("immutable") {
                    parsed.immutable = true;
                } else if path.is_ident("postable") {
                    parsed.postable = Some(flag(&meta)?);
                } else if path.is_ident("patchable") {
                    parsed.patchable = Some(flag(&meta)?);
                } else if path.is_ident("non_sortable") {
                    parsed.non_sortable = true;
                } else if path.is_ident("non_filterable") {
                    parsed.non_filterable = true;
                } else if path.is_ident("parse_with") {
                    let value: LitStr = meta.value()?.parse()?;
                    parsed.parse_with = Some(value.value());
                } else if path.is_ident("relation_ids") {
                    let value: LitStr = meta.value()?.parse()?;
                    parsed.relation_ids = Some(value.value());
                } else if path.is_ident("lookup_include") {
                    let value: LitStr = meta.value()?.parse()?;
                    parsed.lookup_include =
                        Some(LookupInclude::parse(&value.value()).ok_or_else(|| {
                            syn::Error::new(
                                value.span(),
                                "expected \"always\", \"when_null\" or \"never\"",
                            )
                        })?);
                } else if path.is_ident("include_by_default") {
                    parsed.include_by_default = true;
                } else {
                    return Err(meta.error("unknown jsonapi field attribute"));
                }
                Ok(())
            })?;
        }
        Ok(parsed)
    }
}

/// Field-level `#[serde(...)]` settings that matter for naming.
#[derive(Debug, Default)]
pub struct SerdeField {
    pub rename: Option<String>,
    pub skip: bool,
    pub flatten: bool,
}

impl SerdeField {
    pub fn parse(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut parsed = Self::default();
        for attr in attrs.iter().filter(|a| a.path().is_ident("serde")) {
            attr.parse_nested_meta(|meta| {
                let path = &meta.path;
                if path.is_ident("rename") {
                    if let Some(name) = serialize_name(&meta)? {
                        parsed.rename = Some(name);
                    }
                } else if path.is_ident("skip")
                    || path.is_ident("skip_serializing")
                    || path.is_ident("skip_deserializing")
                {
                    parsed.skip = true;
                } else if path.is_ident("flatten") {
                    parsed.flatten = true;
                } else {
                    skip_value(&meta)?;
                }
                Ok(())
            })?;
        }
        Ok(parsed)
    }
}

/// Lookup behavior named in `lookup_include = "..."`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupInclude {
    Always,
    WhenNull,
    Never,
}

impl LookupInclude {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "always" => Some(Self::Always),
            "when_null" => Some(Self::WhenNull),
            "never" => Some(Self::Never),
            _ => None,
        }
    }
}

/// Serde `rename_all` rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
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

    /// Applies the rule to a snake_case field name.
    pub fn apply(self, field: &str) -> String {
        match self {
            Self::Lower | Self::Snake => field.to_string(),
            Self::Upper => field.to_ascii_uppercase(),
            Self::Pascal => field.to_case(Case::Pascal),
            Self::Camel => field.to_case(Case::Camel),
            Self::ScreamingSnake => field.to_ascii_uppercase(),
            Self::Kebab => field.replace('_', "-"),
            Self::ScreamingKebab => field.replace('_', "-").to_ascii_uppercase(),
        }
    }
}

/// Reads `key = "x"` or `key(serialize = "x", ...)`.
fn serialize_name(meta: &ParseNestedMeta<'_>) -> syn::Result<Option<String>> {
    if meta.input.peek(Token![=]) {
        let value: LitStr = meta.value()?.parse()?;
        return Ok(Some(value.value()));
    }
    let mut name = None;
    meta.parse_nested_meta(|nested| {
        if nested.path.is_ident("serialize") {
            let value: LitStr = nested.value()?.parse()?;
            name = Some(value.value());
        } else {
            skip_value(&nested)?;
        }
        Ok(())
    })?;
    Ok(name)
}

fn flag(meta: &ParseNestedMeta<'_>) -> syn::Result<bool> {
    if meta.input.peek(Token![=]) {
        let value: LitBool = meta.value()?.parse()?;
        Ok(value.value)
    } else {
        Ok(true)
    }
}

fn skip_value(meta: &ParseNestedMeta<'_>) -> syn::Result<()> {
    if meta.input.peek(Token![=]) {
        let _: syn::Expr = meta.value()?.parse()?;
    } else if meta.input.peek(syn::token::Paren) {
        let content;
        syn::parenthesized!(content in meta.input);
        let _: proc_macro2::TokenStream = content.parse()?;
    }
    Ok(())
}
