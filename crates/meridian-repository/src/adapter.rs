//! Uniform call surface over registered repositories.
//!
//! Adapters take the request's [`QueryAdapter`] and hand each convention the
//! form it expects: the parsed spec of the adapter's own resource type for
//! current repositories, the raw parameters for legacy ones. Results come
//! back as [`JsonApiResponse`]s. Errors pass through unchanged, with one
//! exception: a legacy `find_one` failing with
//! [`JsonApiError::ResourceNotFound`] is read as "no such resource" and
//! yields empty data, the same as a current repository returning `None`.

use crate::instance::{RelationshipRepositoryInstance, ResourceRepositoryInstance};
use crate::list::EntityList;
use crate::response::JsonApiResponse;
use meridian_core::{Entity, JsonApiError, JsonApiResult, QueryAdapter, ResourceField};
use serde_json::Value;

/// Adapter over the resource repository of one type.
#[derive(Debug, Clone)]
pub struct ResourceRepositoryAdapter {
    resource_type: String,
    instance: ResourceRepositoryInstance,
}

impl ResourceRepositoryAdapter {
    /// Creates an adapter.
    #[must_use]
    pub fn new(resource_type: impl Into<String>, instance: ResourceRepositoryInstance) -> Self {
        Self {
            resource_type: resource_type.into(),
            instance,
        }
    }

    /// Served resource type.
    #[must_use]
    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    /// The wrapped repository.
    #[must_use]
    pub fn instance(&self) -> &ResourceRepositoryInstance {
        &self.instance
    }

    /// Finds one resource; a missing resource yields empty data.
    ///
    /// Legacy repositories signal absence by failing; a
    /// [`JsonApiError::ResourceNotFound`] from them becomes empty data.
    /// Every other error is returned as is.
    pub async fn find_one(&self, id: &Value, query: &QueryAdapter) -> JsonApiResult<JsonApiResponse> {
        tracing::debug!(resource_type = %self.resource_type, %id, "find_one");
        let entity = match &self.instance {
            ResourceRepositoryInstance::Current(repository) => {
                repository
                    .find_one(id, &query.spec_for(&self.resource_type))
                    .await?
            }
            ResourceRepositoryInstance::Legacy(repository) => {
                match repository.find_one(id, query.params()).await {
                    Ok(entity) => Some(entity),
                    Err(error) if is_not_found(&error) => None,
                    Err(error) => return Err(error.into()),
                }
            }
        };
        Ok(JsonApiResponse::single(&self.resource_type, entity))
    }

    /// Finds all resources matching the query.
    pub async fn find_all(&self, query: &QueryAdapter) -> JsonApiResult<JsonApiResponse> {
        tracing::debug!(resource_type = %self.resource_type, "find_all");
        let list = match &self.instance {
            ResourceRepositoryInstance::Current(repository) => {
                repository
                    .find_all(&query.spec_for(&self.resource_type))
                    .await?
            }
            ResourceRepositoryInstance::Legacy(repository) => {
                EntityList::new(repository.find_all(query.params()).await?)
            }
        };
        Ok(JsonApiResponse::collection(&self.resource_type, list))
    }

    /// Finds the resources with the given ids.
    pub async fn find_all_by_ids(
        &self,
        ids: &[Value],
        query: &QueryAdapter,
    ) -> JsonApiResult<JsonApiResponse> {
        tracing::debug!(resource_type = %self.resource_type, count = ids.len(), "find_all_by_ids");
        let list = match &self.instance {
            ResourceRepositoryInstance::Current(repository) => {
                repository
                    .find_all_by_ids(ids, &query.spec_for(&self.resource_type))
                    .await?
            }
            ResourceRepositoryInstance::Legacy(repository) => {
                EntityList::new(repository.find_all_by_ids(ids, query.params()).await?)
            }
        };
        Ok(JsonApiResponse::collection(&self.resource_type, list))
    }

    /// Stores a new resource.
    pub async fn create(&self, entity: Entity, query: &QueryAdapter) -> JsonApiResult<JsonApiResponse> {
        tracing::debug!(resource_type = %self.resource_type, "create");
        let created = match &self.instance {
            ResourceRepositoryInstance::Current(repository) => {
                repository
                    .create(entity, &query.spec_for(&self.resource_type))
                    .await?
            }
            ResourceRepositoryInstance::Legacy(repository) => repository.save(entity).await?,
        };
        Ok(JsonApiResponse::single(&self.resource_type, Some(created)))
    }

    /// Replaces an existing resource.
    pub async fn update(&self, entity: Entity, query: &QueryAdapter) -> JsonApiResult<JsonApiResponse> {
        tracing::debug!(resource_type = %self.resource_type, "update");
        let updated = match &self.instance {
            ResourceRepositoryInstance::Current(repository) => {
                repository
                    .update(entity, &query.spec_for(&self.resource_type))
                    .await?
            }
            ResourceRepositoryInstance::Legacy(repository) => repository.save(entity).await?,
        };
        Ok(JsonApiResponse::single(&self.resource_type, Some(updated)))
    }

    /// Deletes a resource.
    pub async fn delete(&self, id: &Value, query: &QueryAdapter) -> JsonApiResult<()> {
        tracing::debug!(resource_type = %self.resource_type, %id, "delete");
        match &self.instance {
            ResourceRepositoryInstance::Current(repository) => {
                repository
                    .delete(id, &query.spec_for(&self.resource_type))
                    .await?;
            }
            ResourceRepositoryInstance::Legacy(repository) => repository.delete(id).await?,
        }
        Ok(())
    }
}

fn is_not_found(error: &anyhow::Error) -> bool {
    matches!(
        error.downcast_ref::<JsonApiError>(),
        Some(JsonApiError::ResourceNotFound { .. })
    )
}

/// Adapter over the relationships from one resource type to another.
///
/// Repositories receive the underlying member name of the field.
#[derive(Debug, Clone)]
pub struct RelationshipRepositoryAdapter {
    source_type: String,
    target_type: String,
    instance: RelationshipRepositoryInstance,
}

impl RelationshipRepositoryAdapter {
    /// Creates an adapter.
    #[must_use]
    pub fn new(
        source_type: impl Into<String>,
        target_type: impl Into<String>,
        instance: RelationshipRepositoryInstance,
    ) -> Self {
        Self {
            source_type: source_type.into(),
            target_type: target_type.into(),
            instance,
        }
    }

    /// Owning resource type.
    #[must_use]
    pub fn source_type(&self) -> &str {
        &self.source_type
    }

    /// Related resource type.
    #[must_use]
    pub fn target_type(&self) -> &str {
        &self.target_type
    }

    /// The wrapped repository.
    #[must_use]
    pub fn instance(&self) -> &RelationshipRepositoryInstance {
        &self.instance
    }

    /// Replaces a to-one relationship; `None` clears it.
    pub async fn set_relation(
        &self,
        source: &Entity,
        target_id: Option<&Value>,
        field: &ResourceField,
        query: &QueryAdapter,
    ) -> JsonApiResult<()> {
        tracing::debug!(source = %self.source_type, field = field.json_name(), "set_relation");
        let name = field.underlying_name();
        match &self.instance {
            RelationshipRepositoryInstance::Current(repository) => {
                repository
                    .set_relation(source, target_id, name, &query.spec_for(&self.source_type))
                    .await?;
            }
            RelationshipRepositoryInstance::Legacy(repository) => {
                repository.set_relation(source, target_id, name).await?;
            }
            RelationshipRepositoryInstance::Implicit(repository) => {
                repository.set_relation(source, target_id, field, query).await?;
            }
        }
        Ok(())
    }

    /// Replaces a to-many relationship.
    pub async fn set_relations(
        &self,
        source: &Entity,
        target_ids: &[Value],
        field: &ResourceField,
        query: &QueryAdapter,
    ) -> JsonApiResult<()> {
        tracing::debug!(source = %self.source_type, field = field.json_name(), count = target_ids.len(), "set_relations");
        let name = field.underlying_name();
        match &self.instance {
            RelationshipRepositoryInstance::Current(repository) => {
                repository
                    .set_relations(source, target_ids, name, &query.spec_for(&self.source_type))
                    .await?;
            }
            RelationshipRepositoryInstance::Legacy(repository) => {
                repository.set_relations(source, target_ids, name).await?;
            }
            RelationshipRepositoryInstance::Implicit(repository) => {
                repository.set_relations(source, target_ids, field, query).await?;
            }
        }
        Ok(())
    }

    /// Adds members to a to-many relationship.
    pub async fn add_relations(
        &self,
        source: &Entity,
        target_ids: &[Value],
        field: &ResourceField,
        query: &QueryAdapter,
    ) -> JsonApiResult<()> {
        tracing::debug!(source = %self.source_type, field = field.json_name(), count = target_ids.len(), "add_relations");
        let name = field.underlying_name();
        match &self.instance {
            RelationshipRepositoryInstance::Current(repository) => {
                repository
                    .add_relations(source, target_ids, name, &query.spec_for(&self.source_type))
                    .await?;
            }
            RelationshipRepositoryInstance::Legacy(repository) => {
                repository.add_relations(source, target_ids, name).await?;
            }
            RelationshipRepositoryInstance::Implicit(repository) => {
                repository.add_relations(source, target_ids, field, query).await?;
            }
        }
        Ok(())
    }

    /// Removes members from a to-many relationship.
    pub async fn remove_relations(
        &self,
        source: &Entity,
        target_ids: &[Value],
        field: &ResourceField,
        query: &QueryAdapter,
    ) -> JsonApiResult<()> {
        tracing::debug!(source = %self.source_type, field = field.json_name(), count = target_ids.len(), "remove_relations");
        let name = field.underlying_name();
        match &self.instance {
            RelationshipRepositoryInstance::Current(repository) => {
                repository
                    .remove_relations(source, target_ids, name, &query.spec_for(&self.source_type))
                    .await?;
            }
            RelationshipRepositoryInstance::Legacy(repository) => {
                repository.remove_relations(source, target_ids, name).await?;
            }
            RelationshipRepositoryInstance::Implicit(repository) => {
                repository
                    .remove_relations(source, target_ids, field, query)
                    .await?;
            }
        }
        Ok(())
    }

    /// Finds the target of a to-one relationship.
    pub async fn find_one_target(
        &self,
        source_id: &Value,
        field: &ResourceField,
        query: &QueryAdapter,
    ) -> JsonApiResult<JsonApiResponse> {
        tracing::debug!(source = %self.source_type, field = field.json_name(), "find_one_target");
        let name = field.underlying_name();
        let target = match &self.instance {
            RelationshipRepositoryInstance::Current(repository) => {
                repository
                    .find_one_target(source_id, name, &query.spec_for(&self.target_type))
                    .await?
            }
            RelationshipRepositoryInstance::Legacy(repository) => {
                repository
                    .find_one_target(source_id, name, query.params())
                    .await?
            }
            RelationshipRepositoryInstance::Implicit(repository) => {
                repository.find_one_target(source_id, field).await?
            }
        };
        Ok(JsonApiResponse::single(&self.target_type, target))
    }

    /// Finds the targets of a to-many relationship.
    pub async fn find_many_targets(
        &self,
        source_id: &Value,
        field: &ResourceField,
        query: &QueryAdapter,
    ) -> JsonApiResult<JsonApiResponse> {
        tracing::debug!(source = %self.source_type, field = field.json_name(), "find_many_targets");
        let name = field.underlying_name();
        let list = match &self.instance {
            RelationshipRepositoryInstance::Current(repository) => {
                repository
                    .find_many_targets(source_id, name, &query.spec_for(&self.target_type))
                    .await?
            }
            RelationshipRepositoryInstance::Legacy(repository) => EntityList::new(
                repository
                    .find_many_targets(source_id, name, query.params())
                    .await?,
            ),
            RelationshipRepositoryInstance::Implicit(repository) => {
                repository
                    .find_many_targets(source_id, field, query)
                    .await?
            }
        };
        Ok(JsonApiResponse::collection(&self.target_type, list))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{task, LegacyStore, Project, RecordingTaskTags, Store, Task};
    use meridian_core::{JsonApiResource, ResourceInformationBuilder};
    use serde_json::json;

    fn projects() -> Vec<Project> {
        vec![
            Project {
                id: 1,
                name: "web".into(),
            },
            Project {
                id: 2,
                name: "api".into(),
            },
        ]
    }

    #[tokio::test]
    async fn test_legacy_missing_resource_is_empty() {
        let adapter = ResourceRepositoryAdapter::new(
            "projects",
            ResourceRepositoryInstance::legacy(LegacyStore::new(projects())),
        );
        let query = QueryAdapter::empty("projects");

        let found = adapter.find_one(&json!(1), &query).await.unwrap();
        assert_eq!(found.single_entity().and_then(|e| e.get("name")), Some(&json!("web")));

        let missing = adapter.find_one(&json!(9), &query).await.unwrap();
        assert!(missing.single_entity().is_none());
    }

    #[tokio::test]
    async fn test_legacy_lists_and_save() {
        let adapter = ResourceRepositoryAdapter::new(
            "projects",
            ResourceRepositoryInstance::legacy(LegacyStore::new(projects())),
        );
        let query = QueryAdapter::empty("projects");

        let all = adapter.find_all(&query).await.unwrap();
        assert!(all.is_collection());
        assert_eq!(all.entities().count(), 2);

        let some = adapter.find_all_by_ids(&[json!(2)], &query).await.unwrap();
        assert_eq!(some.entities().count(), 1);

        let mut entity = Entity::new();
        entity.set("id", json!(3));
        entity.set("name", json!("docs"));
        let created = adapter.create(entity, &query).await.unwrap();
        assert_eq!(created.single_entity().and_then(|e| e.get("id")), Some(&json!(3)));
        assert_eq!(adapter.find_all(&query).await.unwrap().entities().count(), 3);
    }

    #[tokio::test]
    async fn test_current_find_all_by_ids_uses_id_filter() {
        let store = Store::new(vec![task(1, "a"), task(2, "b"), task(3, "c")]);
        let adapter = ResourceRepositoryAdapter::new("tasks", ResourceRepositoryInstance::current(store));
        let response = adapter
            .find_all_by_ids(&[json!(1), json!(3)], &QueryAdapter::empty("tasks"))
            .await
            .unwrap();
        let ids: Vec<_> = response.entities().filter_map(|e| e.get("id").cloned()).collect();
        assert_eq!(ids, vec![json!(1), json!(3)]);
        assert_eq!(response.total(), Some(2));
    }

    #[tokio::test]
    async fn test_repository_errors_pass_through() {
        let adapter = ResourceRepositoryAdapter::new(
            "tasks",
            ResourceRepositoryInstance::current(Store::<Task>::new(Vec::new())),
        );
        let mut entity = Entity::new();
        entity.set("id", json!(5));
        entity.set("title", json!("missing"));
        let error = adapter
            .update(entity, &QueryAdapter::empty("tasks"))
            .await
            .unwrap_err();
        assert!(matches!(error, JsonApiError::ResourceNotFound { .. }));
    }

    #[tokio::test]
    async fn test_unparseable_id_is_rejected() {
        let adapter = ResourceRepositoryAdapter::new(
            "tasks",
            ResourceRepositoryInstance::current(Store::<Task>::new(Vec::new())),
        );
        let error = adapter
            .find_one(&json!("abc"), &QueryAdapter::empty("tasks"))
            .await
            .unwrap_err();
        assert!(matches!(error, JsonApiError::IdParse { .. }));
    }

    #[tokio::test]
    async fn test_relationship_calls_are_forwarded_once() {
        let builder = ResourceInformationBuilder::new()
            .register(&Task::descriptor())
            .register(&Project::descriptor())
            .register(&crate::test_support::Tag::descriptor());
        let info = builder.build(&Task::descriptor()).unwrap();
        let field = info.find_relationship_field_by_name("tags").unwrap();

        let recorder = RecordingTaskTags::default();
        let adapter = RelationshipRepositoryAdapter::new(
            "tasks",
            "tags",
            RelationshipRepositoryInstance::current(recorder.clone()),
        );

        let source = Entity::from_value(&task(1, "a")).unwrap();
        adapter
            .remove_relations(&source, &[json!(2), json!(3)], field, &QueryAdapter::empty("tasks"))
            .await
            .unwrap();
        adapter
            .set_relation(&source, None, field, &QueryAdapter::empty("tasks"))
            .await
            .unwrap();

        assert_eq!(
            recorder.calls(),
            vec![
                "remove_relations(1, [2, 3], tags)".to_string(),
                "set_relation(1, None, tags)".to_string(),
            ]
        );

        let targets = adapter
            .find_many_targets(&json!(1), field, &QueryAdapter::empty("tasks"))
            .await
            .unwrap();
        assert_eq!(targets.resource_type(), "tags");
        assert_eq!(targets.entities().count(), 1);
    }
}
