//! Type-erased repositories.
//!
//! The dispatcher works on [`Entity`] values and JSON ids. Typed
//! repositories are wrapped into these traits at registration time; dynamic
//! repositories can implement them directly and be registered with an
//! explicit resource type.

use crate::current::{RelationshipRepository, ResourceRepository};
use crate::legacy::{LegacyRelationshipRepository, LegacyResourceRepository};
use crate::list::EntityList;
use async_trait::async_trait;
use meridian_core::{id_to_string, Entity, IdOf, JsonApiError, QueryParams, QuerySpec};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Type-erased resource repository of the current convention.
#[async_trait]
pub trait UntypedResourceRepository: Send + Sync {
    /// Finds one entity by id.
    async fn find_one(&self, id: &Value, query: &QuerySpec) -> anyhow::Result<Option<Entity>>;

    /// Finds all entities matching `query`.
    async fn find_all(&self, query: &QuerySpec) -> anyhow::Result<EntityList>;

    /// Finds the entities with the given ids.
    async fn find_all_by_ids(&self, ids: &[Value], query: &QuerySpec) -> anyhow::Result<EntityList>;

    /// Stores a new entity.
    async fn create(&self, entity: Entity, query: &QuerySpec) -> anyhow::Result<Entity>;

    /// Replaces an existing entity.
    async fn update(&self, entity: Entity, query: &QuerySpec) -> anyhow::Result<Entity>;

    /// Deletes an entity.
    async fn delete(&self, id: &Value, query: &QuerySpec) -> anyhow::Result<()>;
}

/// Type-erased relationship repository of the current convention.
#[async_trait]
pub trait UntypedRelationshipRepository: Send + Sync {
    /// Replaces a to-one relationship.
    async fn set_relation(
        &self,
        source: &Entity,
        target_id: Option<&Value>,
        field_name: &str,
        query: &QuerySpec,
    ) -> anyhow::Result<()>;

    /// Replaces a to-many relationship.
    async fn set_relations(
        &self,
        source: &Entity,
        target_ids: &[Value],
        field_name: &str,
        query: &QuerySpec,
    ) -> anyhow::Result<()>;

    /// Adds members to a to-many relationship.
    async fn add_relations(
        &self,
        source: &Entity,
        target_ids: &[Value],
        field_name: &str,
        query: &QuerySpec,
    ) -> anyhow::Result<()>;

    /// Removes members from a to-many relationship.
    async fn remove_relations(
        &self,
        source: &Entity,
        target_ids: &[Value],
        field_name: &str,
        query: &QuerySpec,
    ) -> anyhow::Result<()>;

    /// Finds the target of a to-one relationship.
    async fn find_one_target(
        &self,
        source_id: &Value,
        field_name: &str,
        query: &QuerySpec,
    ) -> anyhow::Result<Option<Entity>>;

    /// Finds the targets of a to-many relationship.
    async fn find_many_targets(
        &self,
        source_id: &Value,
        field_name: &str,
        query: &QuerySpec,
    ) -> anyhow::Result<EntityList>;
}

/// Type-erased resource repository of the legacy convention.
#[async_trait]
pub trait UntypedLegacyResourceRepository: Send + Sync {
    /// Finds one entity; fails when it does not exist.
    async fn find_one(&self, id: &Value, params: &QueryParams) -> anyhow::Result<Entity>;

    /// Finds all entities.
    async fn find_all(&self, params: &QueryParams) -> anyhow::Result<Vec<Entity>>;

    /// Finds the entities with the given ids.
    async fn find_all_by_ids(
        &self,
        ids: &[Value],
        params: &QueryParams,
    ) -> anyhow::Result<Vec<Entity>>;

    /// Creates or updates an entity.
    async fn save(&self, entity: Entity) -> anyhow::Result<Entity>;

    /// Deletes an entity.
    async fn delete(&self, id: &Value) -> anyhow::Result<()>;
}

/// Type-erased relationship repository of the legacy convention.
#[async_trait]
pub trait UntypedLegacyRelationshipRepository: Send + Sync {
    /// Replaces a to-one relationship.
    async fn set_relation(
        &self,
        source: &Entity,
        target_id: Option<&Value>,
        field_name: &str,
    ) -> anyhow::Result<()>;

    /// Replaces a to-many relationship.
    async fn set_relations(
        &self,
        source: &Entity,
        target_ids: &[Value],
        field_name: &str,
    ) -> anyhow::Result<()>;

    /// Adds members to a to-many relationship.
    async fn add_relations(
        &self,
        source: &Entity,
        target_ids: &[Value],
        field_name: &str,
    ) -> anyhow::Result<()>;

    /// Removes members from a to-many relationship.
    async fn remove_relations(
        &self,
        source: &Entity,
        target_ids: &[Value],
        field_name: &str,
    ) -> anyhow::Result<()>;

    /// Finds the target of a to-one relationship.
    async fn find_one_target(
        &self,
        source_id: &Value,
        field_name: &str,
        params: &QueryParams,
    ) -> anyhow::Result<Option<Entity>>;

    /// Finds the targets of a to-many relationship.
    async fn find_many_targets(
        &self,
        source_id: &Value,
        field_name: &str,
        params: &QueryParams,
    ) -> anyhow::Result<Vec<Entity>>;
}

fn id_from_value<T: DeserializeOwned>(id: &Value) -> anyhow::Result<T> {
    serde_json::from_value(id.clone())
        .map_err(|_| JsonApiError::id_parse(id_to_string(id), std::any::type_name::<T>()).into())
}

fn ids_from_values<T: DeserializeOwned>(ids: &[Value]) -> anyhow::Result<Vec<T>> {
    ids.iter().map(id_from_value).collect()
}

fn to_entity<T: Serialize>(value: &T) -> anyhow::Result<Entity> {
    Ok(Entity::from_value(value)?)
}

fn to_entities<T: Serialize>(values: Vec<T>) -> anyhow::Result<Vec<Entity>> {
    values.iter().map(to_entity).collect()
}

fn from_entity<T: DeserializeOwned>(entity: &Entity) -> anyhow::Result<T> {
    Ok(entity.clone().into_value()?)
}

/// Wraps a typed [`ResourceRepository`].
pub struct TypedResourceRepository<R>(pub R);

#[async_trait]
impl<R: ResourceRepository> UntypedResourceRepository for TypedResourceRepository<R> {
    async fn find_one(&self, id: &Value, query: &QuerySpec) -> anyhow::Result<Option<Entity>> {
        let id: IdOf<R::Resource> = id_from_value(id)?;
        self.0.find_one(&id, query).await?.as_ref().map(to_entity).transpose()
    }

    async fn find_all(&self, query: &QuerySpec) -> anyhow::Result<EntityList> {
        let list = self.0.find_all(query).await?;
        Ok(list.try_map(|r| Entity::from_value(&r))?)
    }

    async fn find_all_by_ids(&self, ids: &[Value], query: &QuerySpec) -> anyhow::Result<EntityList> {
        let ids: Vec<IdOf<R::Resource>> = ids_from_values(ids)?;
        let list = self.0.find_all_by_ids(&ids, query).await?;
        Ok(list.try_map(|r| Entity::from_value(&r))?)
    }

    async fn create(&self, entity: Entity, query: &QuerySpec) -> anyhow::Result<Entity> {
        let created = self.0.create(from_entity(&entity)?, query).await?;
        to_entity(&created)
    }

    async fn update(&self, entity: Entity, query: &QuerySpec) -> anyhow::Result<Entity> {
        let updated = self.0.update(from_entity(&entity)?, query).await?;
        to_entity(&updated)
    }

    async fn delete(&self, id: &Value, query: &QuerySpec) -> anyhow::Result<()> {
        let id: IdOf<R::Resource> = id_from_value(id)?;
        self.0.delete(&id, query).await
    }
}

/// Wraps a typed [`RelationshipRepository`].
pub struct TypedRelationshipRepository<R>(pub R);

#[async_trait]
impl<R: RelationshipRepository> UntypedRelationshipRepository for TypedRelationshipRepository<R> {
    async fn set_relation(
        &self,
        source: &Entity,
        target_id: Option<&Value>,
        field_name: &str,
        query: &QuerySpec,
    ) -> anyhow::Result<()> {
        let source: R::Source = from_entity(source)?;
        let target: Option<IdOf<R::Target>> = target_id.map(id_from_value).transpose()?;
        self.0
            .set_relation(&source, target.as_ref(), field_name, query)
            .await
    }

    async fn set_relations(
        &self,
        source: &Entity,
        target_ids: &[Value],
        field_name: &str,
        query: &QuerySpec,
    ) -> anyhow::Result<()> {
        let source: R::Source = from_entity(source)?;
        let targets: Vec<IdOf<R::Target>> = ids_from_values(target_ids)?;
        self.0.set_relations(&source, &targets, field_name, query).await
    }

    async fn add_relations(
        &self,
        source: &Entity,
        target_ids: &[Value],
        field_name: &str,
        query: &QuerySpec,
    ) -> anyhow::Result<()> {
        let source: R::Source = from_entity(source)?;
        let targets: Vec<IdOf<R::Target>> = ids_from_values(target_ids)?;
        self.0.add_relations(&source, &targets, field_name, query).await
    }

    async fn remove_relations(
        &self,
        source: &Entity,
        target_ids: &[Value],
        field_name: &str,
        query: &QuerySpec,
    ) -> anyhow::Result<()> {
        let source: R::Source = from_entity(source)?;
        let targets: Vec<IdOf<R::Target>> = ids_from_values(target_ids)?;
        self.0
            .remove_relations(&source, &targets, field_name, query)
            .await
    }

    async fn find_one_target(
        &self,
        source_id: &Value,
        field_name: &str,
        query: &QuerySpec,
    ) -> anyhow::Result<Option<Entity>> {
        let source_id: IdOf<R::Source> = id_from_value(source_id)?;
        self.0
            .find_one_target(&source_id, field_name, query)
            .await?
            .as_ref()
            .map(to_entity)
            .transpose()
    }

    async fn find_many_targets(
        &self,
        source_id: &Value,
        field_name: &str,
        query: &QuerySpec,
    ) -> anyhow::Result<EntityList> {
        let source_id: IdOf<R::Source> = id_from_value(source_id)?;
        let list = self.0.find_many_targets(&source_id, field_name, query).await?;
        Ok(list.try_map(|r| Entity::from_value(&r))?)
    }
}

/// Wraps a typed [`LegacyResourceRepository`].
pub struct TypedLegacyResourceRepository<R>(pub R);

#[async_trait]
impl<R: LegacyResourceRepository> UntypedLegacyResourceRepository
    for TypedLegacyResourceRepository<R>
{
    async fn find_one(&self, id: &Value, params: &QueryParams) -> anyhow::Result<Entity> {
        let found = self.0.find_one(id_from_value(id)?, params).await?;
        to_entity(&found)
    }

    async fn find_all(&self, params: &QueryParams) -> anyhow::Result<Vec<Entity>> {
        to_entities(self.0.find_all(params).await?)
    }

    async fn find_all_by_ids(
        &self,
        ids: &[Value],
        params: &QueryParams,
    ) -> anyhow::Result<Vec<Entity>> {
        to_entities(self.0.find_all_by_ids(ids_from_values(ids)?, params).await?)
    }

    async fn save(&self, entity: Entity) -> anyhow::Result<Entity> {
        let saved = self.0.save(from_entity(&entity)?).await?;
        to_entity(&saved)
    }

    async fn delete(&self, id: &Value) -> anyhow::Result<()> {
        self.0.delete(id_from_value(id)?).await
    }
}

/// Wraps a typed [`LegacyRelationshipRepository`].
pub struct TypedLegacyRelationshipRepository<R>(pub R);

#[async_trait]
impl<R: LegacyRelationshipRepository> UntypedLegacyRelationshipRepository
    for TypedLegacyRelationshipRepository<R>
{
    async fn set_relation(
        &self,
        source: &Entity,
        target_id: Option<&Value>,
        field_name: &str,
    ) -> anyhow::Result<()> {
        let target = target_id.map(id_from_value).transpose()?;
        self.0
            .set_relation(from_entity(source)?, target, field_name)
            .await
    }

    async fn set_relations(
        &self,
        source: &Entity,
        target_ids: &[Value],
        field_name: &str,
    ) -> anyhow::Result<()> {
        self.0
            .set_relations(from_entity(source)?, ids_from_values(target_ids)?, field_name)
            .await
    }

    async fn add_relations(
        &self,
        source: &Entity,
        target_ids: &[Value],
        field_name: &str,
    ) -> anyhow::Result<()> {
        self.0
            .add_relations(from_entity(source)?, ids_from_values(target_ids)?, field_name)
            .await
    }

    async fn remove_relations(
        &self,
        source: &Entity,
        target_ids: &[Value],
        field_name: &str,
    ) -> anyhow::Result<()> {
        self.0
            .remove_relations(from_entity(source)?, ids_from_values(target_ids)?, field_name)
            .await
    }

    async fn find_one_target(
        &self,
        source_id: &Value,
        field_name: &str,
        params: &QueryParams,
    ) -> anyhow::Result<Option<Entity>> {
        self.0
            .find_one_target(id_from_value(source_id)?, field_name, params)
            .await?
            .as_ref()
            .map(to_entity)
            .transpose()
    }

    async fn find_many_targets(
        &self,
        source_id: &Value,
        field_name: &str,
        params: &QueryParams,
    ) -> anyhow::Result<Vec<Entity>> {
        to_entities(
            self.0
                .find_many_targets(id_from_value(source_id)?, field_name, params)
                .await?,
        )
    }
}
