//! Relationships stored on the owning resource.
//!
//! When no relationship repository is registered for a `(source, target)`
//! pair, the registry installs an [`ImplicitRelationshipRepository`]. It
//! reads the relationship member of the owner through the owner's resource
//! repository and writes it back with `update`. Members holding nested
//! objects are filled with the target resources, loaded through the target's
//! resource repository; members holding ids get the ids.

use crate::adapter::ResourceRepositoryAdapter;
use crate::list::EntityList;
use meridian_core::{
    id_to_string, Entity, JsonApiError, JsonApiResult, QueryAdapter, RelationStorage,
    RelationValue, ResourceField, ResourceInformation,
};
use serde_json::Value;
use std::sync::Arc;

/// Relationship access through the owner's resource repository.
#[derive(Debug)]
pub struct ImplicitRelationshipRepository {
    owner_information: Arc<ResourceInformation>,
    target_information: Arc<ResourceInformation>,
    owner: Arc<ResourceRepositoryAdapter>,
    target: Arc<ResourceRepositoryAdapter>,
}

impl ImplicitRelationshipRepository {
    pub(crate) fn new(
        owner_information: Arc<ResourceInformation>,
        target_information: Arc<ResourceInformation>,
        owner: Arc<ResourceRepositoryAdapter>,
        target: Arc<ResourceRepositoryAdapter>,
    ) -> Self {
        Self {
            owner_information,
            target_information,
            owner,
            target,
        }
    }

    /// Owning resource type.
    #[must_use]
    pub fn source_type(&self) -> &str {
        self.owner_information.resource_type()
    }

    /// Related resource type.
    #[must_use]
    pub fn target_type(&self) -> &str {
        self.target_information.resource_type()
    }

    pub(crate) async fn set_relation(
        &self,
        source: &Entity,
        target_id: Option<&Value>,
        field: &ResourceField,
        query: &QueryAdapter,
    ) -> JsonApiResult<()> {
        let ids: Vec<Value> = target_id.cloned().into_iter().collect();
        self.write(source, &ids, field, query).await
    }

    pub(crate) async fn set_relations(
        &self,
        source: &Entity,
        target_ids: &[Value],
        field: &ResourceField,
        query: &QueryAdapter,
    ) -> JsonApiResult<()> {
        self.write(source, target_ids, field, query).await
    }

    pub(crate) async fn add_relations(
        &self,
        source: &Entity,
        target_ids: &[Value],
        field: &ResourceField,
        query: &QueryAdapter,
    ) -> JsonApiResult<()> {
        let mut ids = source.relation(field).target_ids(&self.target_information);
        for id in target_ids {
            if !ids.contains(id) {
                ids.push(id.clone());
            }
        }
        self.write(source, &ids, field, query).await
    }

    pub(crate) async fn remove_relations(
        &self,
        source: &Entity,
        target_ids: &[Value],
        field: &ResourceField,
        query: &QueryAdapter,
    ) -> JsonApiResult<()> {
        let ids: Vec<Value> = source
            .relation(field)
            .target_ids(&self.target_information)
            .into_iter()
            .filter(|id| !target_ids.contains(id))
            .collect();
        self.write(source, &ids, field, query).await
    }

    pub(crate) async fn find_one_target(
        &self,
        source_id: &Value,
        field: &ResourceField,
    ) -> JsonApiResult<Option<Entity>> {
        let owner = self.load_owner(source_id).await?;
        Ok(self.targets_of(&owner, field).await?.into_iter().next())
    }

    pub(crate) async fn find_many_targets(
        &self,
        source_id: &Value,
        field: &ResourceField,
        query: &QueryAdapter,
    ) -> JsonApiResult<EntityList> {
        let owner = self.load_owner(source_id).await?;
        let targets = self.targets_of(&owner, field).await?;
        let (page, total) = query.spec_for(self.target_type()).apply(targets);
        Ok(EntityList::new(page).with_total(total))
    }

    async fn load_owner(&self, source_id: &Value) -> JsonApiResult<Entity> {
        self.owner
            .find_one(source_id, &QueryAdapter::empty(self.source_type()))
            .await?
            .into_single()
            .ok_or_else(|| JsonApiError::resource_not_found(self.source_type(), id_to_string(source_id)))
    }

    /// Nested objects are returned as stored; bare ids are resolved through
    /// the target repository.
    async fn targets_of(&self, owner: &Entity, field: &ResourceField) -> JsonApiResult<Vec<Entity>> {
        let value = owner.relation(field);
        if let RelationValue::Absent | RelationValue::Null = value {
            return Ok(Vec::new());
        }
        if let Some(entities) = value.target_entities() {
            return Ok(entities);
        }
        let ids = value.target_ids(&self.target_information);
        self.load_targets(&ids).await
    }

    /// Loads targets in the order of `ids`; a missing target is an error.
    async fn load_targets(&self, ids: &[Value]) -> JsonApiResult<Vec<Entity>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let found = self
            .target
            .find_all_by_ids(ids, &QueryAdapter::empty(self.target_type()))
            .await?
            .into_entities();
        ids.iter()
            .map(|id| {
                found
                    .iter()
                    .find(|entity| self.target_information.entity_id(entity) == Some(id))
                    .cloned()
                    .ok_or_else(|| JsonApiError::resource_not_found(self.target_type(), id_to_string(id)))
            })
            .collect()
    }

    async fn write(
        &self,
        source: &Entity,
        target_ids: &[Value],
        field: &ResourceField,
        query: &QueryAdapter,
    ) -> JsonApiResult<()> {
        let values = match field.storage() {
            RelationStorage::Id => target_ids.to_vec(),
            RelationStorage::Object => self
                .load_targets(target_ids)
                .await?
                .into_iter()
                .map(|entity| Value::Object(entity.into_map()))
                .collect(),
        };
        let mut updated = source.clone();
        updated.set_relation(field, values);
        self.owner.update(updated, query).await?;
        Ok(())
    }
}
