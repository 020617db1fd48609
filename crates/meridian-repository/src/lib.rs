//! Repository adapters and the resource registry for Meridian.
//!
//! Applications store resources through repositories. Two calling
//! conventions are supported:
//!
//! - the current one ([`ResourceRepository`], [`RelationshipRepository`]):
//!   typed, receives the parsed [`QuerySpec`], returns [`ResourceList`]s
//! - the legacy one ([`LegacyResourceRepository`],
//!   [`LegacyRelationshipRepository`]): receives raw query parameters, uses a
//!   single `save`, returns plain vectors
//!
//! Dynamic repositories implement the untyped traits directly. At
//! registration every repository is resolved into a
//! [`ResourceRepositoryInstance`] or [`RelationshipRepositoryInstance`], and
//! the adapters ([`ResourceRepositoryAdapter`],
//! [`RelationshipRepositoryAdapter`]) give the dispatcher one call shape over
//! all of them.
//!
//! [`ResourceRegistry`] binds each resource type's information to its
//! adapters.
//!
//! [`QuerySpec`]: meridian_core::QuerySpec

mod adapter;
mod current;
mod implicit;
mod instance;
mod legacy;
mod list;
mod registry;
mod response;
mod untyped;

#[cfg(test)]
mod test_support;

pub use adapter::{RelationshipRepositoryAdapter, ResourceRepositoryAdapter};
pub use current::{RelationshipRepository, ResourceRepository};
pub use implicit::ImplicitRelationshipRepository;
pub use instance::{RelationshipRepositoryInstance, RepositoryRegistration, ResourceRepositoryInstance};
pub use legacy::{LegacyRelationshipRepository, LegacyResourceRepository};
pub use list::{EntityList, ResourceList};
pub use registry::{RegistryEntry, ResourceLookup, ResourceRegistry, ResourceRegistryBuilder};
pub use response::{JsonApiResponse, ResponseData};
pub use untyped::{
    TypedLegacyRelationshipRepository, TypedLegacyResourceRepository,
    TypedRelationshipRepository, TypedResourceRepository, UntypedLegacyRelationshipRepository,
    UntypedLegacyResourceRepository, UntypedRelationshipRepository, UntypedResourceRepository,
};
