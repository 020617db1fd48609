//! Repository traits of the legacy calling convention.
//!
//! Legacy repositories receive the raw [`QueryParams`] instead of a parsed
//! spec, use a single `save` for creation and updates, must implement
//! `find_all_by_ids` themselves and return plain vectors. `find_one` reports
//! a missing resource as an error rather than `None`; the adapter turns a
//! [`JsonApiError::ResourceNotFound`](meridian_core::JsonApiError::ResourceNotFound)
//! back into an empty result.

use crate::current::not_supported;
use async_trait::async_trait;
use meridian_core::{IdOf, JsonApiResource, QueryParams};

/// Legacy storage for one resource type.
#[async_trait]
pub trait LegacyResourceRepository: Send + Sync + 'static {
    /// The stored resource.
    type Resource: JsonApiResource;

    /// Finds one resource; fails when it does not exist.
    async fn find_one(
        &self,
        id: IdOf<Self::Resource>,
        params: &QueryParams,
    ) -> anyhow::Result<Self::Resource>;

    /// Finds all resources.
    async fn find_all(&self, params: &QueryParams) -> anyhow::Result<Vec<Self::Resource>>;

    /// Finds the resources with the given ids.
    async fn find_all_by_ids(
        &self,
        ids: Vec<IdOf<Self::Resource>>,
        params: &QueryParams,
    ) -> anyhow::Result<Vec<Self::Resource>>;

    /// Creates or updates a resource.
    async fn save(&self, _resource: Self::Resource) -> anyhow::Result<Self::Resource> {
        Err(not_supported::<Self::Resource>("save"))
    }

    /// Deletes a resource.
    async fn delete(&self, _id: IdOf<Self::Resource>) -> anyhow::Result<()> {
        Err(not_supported::<Self::Resource>("delete"))
    }
}

/// Legacy storage of the relationships from `Source` to `Target`.
#[async_trait]
pub trait LegacyRelationshipRepository: Send + Sync + 'static {
    /// Owning resource.
    type Source: JsonApiResource;
    /// Related resource.
    type Target: JsonApiResource;

    /// Replaces a to-one relationship; `None` clears it.
    async fn set_relation(
        &self,
        source: Self::Source,
        target_id: Option<IdOf<Self::Target>>,
        field_name: &str,
    ) -> anyhow::Result<()>;

    /// Replaces a to-many relationship.
    async fn set_relations(
        &self,
        source: Self::Source,
        target_ids: Vec<IdOf<Self::Target>>,
        field_name: &str,
    ) -> anyhow::Result<()>;

    /// Adds members to a to-many relationship.
    async fn add_relations(
        &self,
        source: Self::Source,
        target_ids: Vec<IdOf<Self::Target>>,
        field_name: &str,
    ) -> anyhow::Result<()>;

    /// Removes members from a to-many relationship.
    async fn remove_relations(
        &self,
        source: Self::Source,
        target_ids: Vec<IdOf<Self::Target>>,
        field_name: &str,
    ) -> anyhow::Result<()>;

    /// Finds the target of a to-one relationship.
    async fn find_one_target(
        &self,
        source_id: IdOf<Self::Source>,
        field_name: &str,
        params: &QueryParams,
    ) -> anyhow::Result<Option<Self::Target>>;

    /// Finds the targets of a to-many relationship.
    async fn find_many_targets(
        &self,
        source_id: IdOf<Self::Source>,
        field_name: &str,
        params: &QueryParams,
    ) -> anyhow::Result<Vec<Self::Target>>;
}
