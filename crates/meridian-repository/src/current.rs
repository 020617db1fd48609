//! Repository traits of the current calling convention.
//!
//! Repositories receive the parsed [`QuerySpec`] and return
//! [`ResourceList`]s that may carry meta information and links. Errors are
//! opaque [`anyhow::Error`]s; the dispatcher maps them to error documents.

use crate::list::ResourceList;
use async_trait::async_trait;
use meridian_core::{ids_filter, IdOf, JsonApiError, JsonApiResource, QuerySpec};

/// Storage for one resource type.
///
/// Only the finders are required; the mutating operations default to a
/// "not supported" error (405).
///
/// ```
/// use async_trait::async_trait;
/// use meridian_core::{FieldDescriptor, JsonApiResource, QuerySpec, ResourceDescriptor};
/// use meridian_repository::{ResourceList, ResourceRepository};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Clone, Serialize, Deserialize)]
/// struct Tag {
///     id: u64,
///     label: String,
/// }
///
/// impl JsonApiResource for Tag {
///     const RESOURCE_TYPE: &'static str = "tags";
///     type Id = u64;
///
///     fn descriptor() -> ResourceDescriptor {
///         ResourceDescriptor::new("tags", "Tag")
///             .field(FieldDescriptor::id("id", "u64"))
///             .field(FieldDescriptor::new("label", "String"))
///     }
/// }
///
/// struct TagRepository(Vec<Tag>);
///
/// #[async_trait]
/// impl ResourceRepository for TagRepository {
///     type Resource = Tag;
///
///     async fn find_one(&self, id: &u64, _query: &QuerySpec) -> anyhow::Result<Option<Tag>> {
///         Ok(self.0.iter().find(|t| t.id == *id).cloned())
///     }
///
///     async fn find_all(&self, _query: &QuerySpec) -> anyhow::Result<ResourceList<Tag>> {
///         Ok(ResourceList::new(self.0.clone()))
///     }
/// }
/// ```
#[async_trait]
pub trait ResourceRepository: Send + Sync + 'static {
    /// The stored resource.
    type Resource: JsonApiResource;

    /// Finds one resource by id.
    async fn find_one(
        &self,
        id: &IdOf<Self::Resource>,
        query: &QuerySpec,
    ) -> anyhow::Result<Option<Self::Resource>>;

    /// Finds all resources matching `query`.
    async fn find_all(&self, query: &QuerySpec) -> anyhow::Result<ResourceList<Self::Resource>>;

    /// Finds the resources with the given ids.
    ///
    /// The default adds an id filter to `query` and calls
    /// [`find_all`](Self::find_all).
    async fn find_all_by_ids(
        &self,
        ids: &[IdOf<Self::Resource>],
        query: &QuerySpec,
    ) -> anyhow::Result<ResourceList<Self::Resource>> {
        let descriptor = <Self::Resource as JsonApiResource>::descriptor();
        let id_member = descriptor.id_field_name().ok_or_else(|| JsonApiError::ResourceIdNotFound {
            type_name: descriptor.type_name().to_string(),
        })?;
        let values = ids
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;
        let spec = query.clone().with_filter(ids_filter(&id_member, &values)?);
        self.find_all(&spec).await
    }

    /// Stores a new resource and returns it as stored.
    async fn create(
        &self,
        _resource: Self::Resource,
        _query: &QuerySpec,
    ) -> anyhow::Result<Self::Resource> {
        Err(not_supported::<Self::Resource>("create"))
    }

    /// Replaces an existing resource and returns it as stored.
    async fn update(
        &self,
        _resource: Self::Resource,
        _query: &QuerySpec,
    ) -> anyhow::Result<Self::Resource> {
        Err(not_supported::<Self::Resource>("update"))
    }

    /// Deletes a resource.
    async fn delete(&self, _id: &IdOf<Self::Resource>, _query: &QuerySpec) -> anyhow::Result<()> {
        Err(not_supported::<Self::Resource>("delete"))
    }
}

/// Storage of the relationships from `Source` to `Target`.
///
/// Writes receive the owning resource as loaded by its resource repository,
/// reads receive the owner's id. `field_name` is the underlying member name
/// of the relationship field.
#[async_trait]
pub trait RelationshipRepository: Send + Sync + 'static {
    /// Owning resource.
    type Source: JsonApiResource;
    /// Related resource.
    type Target: JsonApiResource;

    /// Replaces a to-one relationship; `None` clears it.
    async fn set_relation(
        &self,
        source: &Self::Source,
        target_id: Option<&IdOf<Self::Target>>,
        field_name: &str,
        query: &QuerySpec,
    ) -> anyhow::Result<()>;

    /// Replaces a to-many relationship.
    async fn set_relations(
        &self,
        _source: &Self::Source,
        _target_ids: &[IdOf<Self::Target>],
        _field_name: &str,
        _query: &QuerySpec,
    ) -> anyhow::Result<()> {
        Err(not_supported::<Self::Source>("set_relations"))
    }

    /// Adds members to a to-many relationship.
    async fn add_relations(
        &self,
        _source: &Self::Source,
        _target_ids: &[IdOf<Self::Target>],
        _field_name: &str,
        _query: &QuerySpec,
    ) -> anyhow::Result<()> {
        Err(not_supported::<Self::Source>("add_relations"))
    }

    /// Removes members from a to-many relationship.
    async fn remove_relations(
        &self,
        _source: &Self::Source,
        _target_ids: &[IdOf<Self::Target>],
        _field_name: &str,
        _query: &QuerySpec,
    ) -> anyhow::Result<()> {
        Err(not_supported::<Self::Source>("remove_relations"))
    }

    /// Finds the target of a to-one relationship.
    async fn find_one_target(
        &self,
        source_id: &IdOf<Self::Source>,
        field_name: &str,
        query: &QuerySpec,
    ) -> anyhow::Result<Option<Self::Target>>;

    /// Finds the targets of a to-many relationship.
    async fn find_many_targets(
        &self,
        source_id: &IdOf<Self::Source>,
        field_name: &str,
        query: &QuerySpec,
    ) -> anyhow::Result<ResourceList<Self::Target>>;
}

pub(crate) fn not_supported<R: JsonApiResource>(operation: &str) -> anyhow::Error {
    JsonApiError::not_supported(R::RESOURCE_TYPE, operation).into()
}
