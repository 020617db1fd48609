//! Calling-convention resolution.
//!
//! A repository's convention is decided once, when it is registered: the
//! trait it implements selects the variant of [`ResourceRepositoryInstance`]
//! or [`RelationshipRepositoryInstance`]. Adapters dispatch on the variant
//! instead of probing the repository on every call.

use crate::current::{RelationshipRepository, ResourceRepository};
use crate::implicit::ImplicitRelationshipRepository;
use crate::legacy::{LegacyRelationshipRepository, LegacyResourceRepository};
use crate::untyped::{
    TypedLegacyRelationshipRepository, TypedLegacyResourceRepository,
    TypedRelationshipRepository, TypedResourceRepository, UntypedLegacyRelationshipRepository,
    UntypedLegacyResourceRepository, UntypedRelationshipRepository, UntypedResourceRepository,
};
use meridian_core::JsonApiResource;
use std::fmt;
use std::sync::Arc;

/// A registered resource repository, tagged with its convention.
#[derive(Clone)]
pub enum ResourceRepositoryInstance {
    /// Current convention.
    Current(Arc<dyn UntypedResourceRepository>),
    /// Legacy convention.
    Legacy(Arc<dyn UntypedLegacyResourceRepository>),
}

impl ResourceRepositoryInstance {
    /// Wraps a typed repository of the current convention.
    #[must_use]
    pub fn current<R: ResourceRepository>(repository: R) -> Self {
        Self::Current(Arc::new(TypedResourceRepository(repository)))
    }

    /// Wraps a typed repository of the legacy convention.
    #[must_use]
    pub fn legacy<R: LegacyResourceRepository>(repository: R) -> Self {
        Self::Legacy(Arc::new(TypedLegacyResourceRepository(repository)))
    }

    /// Name of the convention, for diagnostics.
    #[must_use]
    pub fn convention(&self) -> &'static str {
        match self {
            Self::Current(_) => "current",
            Self::Legacy(_) => "legacy",
        }
    }
}

impl fmt::Debug for ResourceRepositoryInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ResourceRepositoryInstance")
            .field(&self.convention())
            .finish()
    }
}

/// A relationship repository, tagged with its convention.
#[derive(Clone)]
pub enum RelationshipRepositoryInstance {
    /// Current convention.
    Current(Arc<dyn UntypedRelationshipRepository>),
    /// Legacy convention.
    Legacy(Arc<dyn UntypedLegacyRelationshipRepository>),
    /// Reads and writes the relationship member on the owning resource.
    Implicit(Arc<ImplicitRelationshipRepository>),
}

impl RelationshipRepositoryInstance {
    /// Wraps a typed repository of the current convention.
    #[must_use]
    pub fn current<R: RelationshipRepository>(repository: R) -> Self {
        Self::Current(Arc::new(TypedRelationshipRepository(repository)))
    }

    /// Wraps a typed repository of the legacy convention.
    #[must_use]
    pub fn legacy<R: LegacyRelationshipRepository>(repository: R) -> Self {
        Self::Legacy(Arc::new(TypedLegacyRelationshipRepository(repository)))
    }

    /// Name of the convention, for diagnostics.
    #[must_use]
    pub fn convention(&self) -> &'static str {
        match self {
            Self::Current(_) => "current",
            Self::Legacy(_) => "legacy",
            Self::Implicit(_) => "implicit",
        }
    }
}

impl fmt::Debug for RelationshipRepositoryInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RelationshipRepositoryInstance")
            .field(&self.convention())
            .finish()
    }
}

/// A repository together with the resource types it serves.
#[derive(Debug, Clone)]
pub enum RepositoryRegistration {
    /// Repository of one resource type.
    Resource {
        /// Served resource type.
        resource_type: String,
        /// The repository.
        instance: ResourceRepositoryInstance,
    },
    /// Repository of the relationships between two resource types.
    Relationship {
        /// Owning resource type.
        source_type: String,
        /// Related resource type.
        target_type: String,
        /// The repository.
        instance: RelationshipRepositoryInstance,
    },
}

impl RepositoryRegistration {
    /// Registers a typed resource repository of the current convention.
    #[must_use]
    pub fn resource<R: ResourceRepository>(repository: R) -> Self {
        Self::Resource {
            resource_type: R::Resource::RESOURCE_TYPE.to_string(),
            instance: ResourceRepositoryInstance::current(repository),
        }
    }

    /// Registers a typed resource repository of the legacy convention.
    #[must_use]
    pub fn legacy_resource<R: LegacyResourceRepository>(repository: R) -> Self {
        Self::Resource {
            resource_type: R::Resource::RESOURCE_TYPE.to_string(),
            instance: ResourceRepositoryInstance::legacy(repository),
        }
    }

    /// Registers a dynamic resource repository for `resource_type`.
    #[must_use]
    pub fn untyped_resource(
        resource_type: impl Into<String>,
        repository: Arc<dyn UntypedResourceRepository>,
    ) -> Self {
        Self::Resource {
            resource_type: resource_type.into(),
            instance: ResourceRepositoryInstance::Current(repository),
        }
    }

    /// Registers a typed relationship repository of the current convention.
    #[must_use]
    pub fn relationship<R: RelationshipRepository>(repository: R) -> Self {
        Self::Relationship {
            source_type: R::Source::RESOURCE_TYPE.to_string(),
            target_type: R::Target::RESOURCE_TYPE.to_string(),
            instance: RelationshipRepositoryInstance::current(repository),
        }
    }

    /// Registers a typed relationship repository of the legacy convention.
    #[must_use]
    pub fn legacy_relationship<R: LegacyRelationshipRepository>(repository: R) -> Self {
        Self::Relationship {
            source_type: R::Source::RESOURCE_TYPE.to_string(),
            target_type: R::Target::RESOURCE_TYPE.to_string(),
            instance: RelationshipRepositoryInstance::legacy(repository),
        }
    }

    /// Registers a dynamic relationship repository for `(source_type, target_type)`.
    #[must_use]
    pub fn untyped_relationship(
        source_type: impl Into<String>,
        target_type: impl Into<String>,
        repository: Arc<dyn UntypedRelationshipRepository>,
    ) -> Self {
        Self::Relationship {
            source_type: source_type.into(),
            target_type: target_type.into(),
            instance: RelationshipRepositoryInstance::Current(repository),
        }
    }
}
