//! Procedural macros for Meridian resources.
//!
//! `#[derive(JsonApiResource)]` implements
//! [`JsonApiResource`](../meridian_core/trait.JsonApiResource.html) for a
//! struct with named fields, generating its `ResourceDescriptor` from the
//! field list.
//!
//! # Naming
//!
//! Serde is the accessor layer, so the underlying name of a field is its
//! serialized name: `#[serde(rename)]` and `#[serde(rename_all)]` are
//! honored, and skipped fields are ignored. The wire name defaults to the
//! camelCase form of the Rust field name and can be overridden with
//! `#[jsonapi(json_name = "...")]`.
//!
//! # Example
//!
//! ```rust,ignore
//! use meridian::prelude::*;
//!
//! #[derive(Serialize, Deserialize, JsonApiResource)]
//! #[jsonapi(resource_type = "tasks", crate = "meridian::core")]
//! struct Task {
//!     id: u64,
//!     name: String,
//!     #[jsonapi(immutable)]
//!     created_by: Option<String>,
//!     project: Option<Project>,
//!     #[jsonapi(lookup_include = "always")]
//!     tags: Vec<Tag>,
//! }
//! ```

mod parse;
mod resource;

use proc_macro::TokenStream;

/// Derives `JsonApiResource` for a struct with named fields.
///
/// # Container attributes
///
/// - `resource_type = "..."`: resource type on the wire (required)
/// - `crate = "..."`: path of the core crate, `::meridian_core` by default
///
/// # Field attributes
///
/// - `id`: the resource id; a field named `id` is used when none is marked
/// - `json_name = "..."`: wire name
/// - `ignore`: not part of the resource
/// - `read_only`, `immutable`, `postable = bool`, `patchable = bool`
/// - `non_sortable`, `non_filterable`
/// - `parse_with = "..."`: named custom value parser
/// - `relation_ids = "Type"`: the field holds ids of `Type` resources
/// - `lookup_include = "always" | "when_null" | "never"`
/// - `include_by_default`
#[proc_macro_derive(JsonApiResource, attributes(jsonapi))]
pub fn derive_json_api_resource(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input as syn::DeriveInput);
    resource::expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
