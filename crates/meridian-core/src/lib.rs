//! Core types for the Meridian JSON:API framework.
//!
//! This crate holds everything the other Meridian crates agree on:
//!
//! - [`information`]: the resource information model built from explicit
//!   [`ResourceDescriptor`]s
//! - [`document`]: the JSON:API wire document types
//! - [`query`]: parsed query specifications and raw query parameters
//! - [`entity`]: the type-erased form of domain values
//! - [`error`]: [`JsonApiError`], the error type used throughout the framework
//! - [`context`]: request-scoped metadata
//! - [`naming`] and [`parser`]: small type utilities

pub mod context;
pub mod document;
pub mod entity;
pub mod error;
pub mod information;
pub mod naming;
pub mod parser;
pub mod query;
mod resource;

pub use context::{RequestContext, RequestId};
pub use document::{
    Document, ErrorData, ErrorSource, Links, PrimaryData, Relationship, RelationshipData, Resource,
    ResourceIdentifier, JSON_API_CONTENT_TYPE,
};
pub use entity::{Entity, RelationValue};
pub use error::{ErrorCategory, JsonApiError, JsonApiResult, WriteOperation};
pub use information::{
    id_to_string, AccessorDescriptor, AccessorKind, Cardinality, DeclaredType, FieldAnnotations,
    FieldDescriptor, ImmutableWriteBehavior, InformationLookup, LookupIncludeBehavior,
    RelationStorage, ResourceDescriptor, ResourceField, ResourceFieldAccess, ResourceFieldType,
    ResourceInformation, ResourceInformationBuilder,
};
pub use parser::{TypeParser, ValueType};
pub use query::{
    ids_filter, Direction, FilterOperator, FilterSpec, IncludePath, PagingSpec, QueryAdapter,
    QueryParams, QuerySpec, SortSpec,
};
pub use resource::{IdOf, JsonApiResource};
