//! Resources and repositories shared by the unit tests of this crate.

use crate::{LegacyResourceRepository, RelationshipRepository, ResourceList, ResourceRepository};
use async_trait::async_trait;
use meridian_core::{
    Entity, FieldDescriptor, IdOf, JsonApiError, JsonApiResource, QueryParams, QuerySpec,
    ResourceDescriptor,
};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

pub trait Keyed {
    fn key(&self) -> u64;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: u64,
    pub name: String,
}

impl JsonApiResource for Project {
    const RESOURCE_TYPE: &'static str = "projects";
    type Id = u64;

    fn descriptor() -> ResourceDescriptor {
        ResourceDescriptor::new(Self::RESOURCE_TYPE, "Project")
            .field(FieldDescriptor::id("id", "u64"))
            .field(FieldDescriptor::new("name", "String"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub id: u64,
    pub label: String,
}

impl JsonApiResource for Tag {
    const RESOURCE_TYPE: &'static str = "tags";
    type Id = u64;

    fn descriptor() -> ResourceDescriptor {
        ResourceDescriptor::new(Self::RESOURCE_TYPE, "Tag")
            .field(FieldDescriptor::id("id", "u64"))
            .field(FieldDescriptor::new("label", "String"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: u64,
    pub title: String,
    pub project: Option<Project>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    pub owner_id: Option<u64>,
}

impl JsonApiResource for Task {
    const RESOURCE_TYPE: &'static str = "tasks";
    type Id = u64;

    fn descriptor() -> ResourceDescriptor {
        ResourceDescriptor::new(Self::RESOURCE_TYPE, "Task")
            .field(FieldDescriptor::id("id", "u64"))
            .field(FieldDescriptor::new("title", "String"))
            .field(FieldDescriptor::new("project", "Option<Project>"))
            .field(FieldDescriptor::new("tags", "Vec<Tag>"))
            .field(
                FieldDescriptor::new("ownerId", "Option<u64>")
                    .relation_ids("Project")
                    .json_name("owner"),
            )
    }
}

impl Keyed for Project {
    fn key(&self) -> u64 {
        self.id
    }
}

impl Keyed for Tag {
    fn key(&self) -> u64 {
        self.id
    }
}

impl Keyed for Task {
    fn key(&self) -> u64 {
        self.id
    }
}

pub fn task(id: u64, title: &str) -> Task {
    Task {
        id,
        title: title.to_string(),
        project: None,
        tags: Vec::new(),
        owner_id: None,
    }
}

/// Current-convention repository over a vector, recording every call.
pub struct Store<R> {
    pub items: Mutex<Vec<R>>,
    pub calls: Mutex<Vec<String>>,
}

impl<R> Store<R> {
    pub fn new(items: Vec<R>) -> Self {
        Self {
            items: Mutex::new(items),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl<R> ResourceRepository for Store<R>
where
    R: JsonApiResource<Id = u64> + Keyed + Clone,
{
    type Resource = R;

    async fn find_one(&self, id: &u64, _query: &QuerySpec) -> anyhow::Result<Option<R>> {
        self.record(format!("find_one({id})"));
        Ok(self.items.lock().unwrap().iter().find(|r| r.key() == *id).cloned())
    }

    async fn find_all(&self, query: &QuerySpec) -> anyhow::Result<ResourceList<R>> {
        self.record("find_all");
        let entities = self
            .items
            .lock()
            .unwrap()
            .iter()
            .map(Entity::from_value)
            .collect::<Result<Vec<_>, _>>()?;
        let (page, total) = query.apply(entities);
        let items = page
            .into_iter()
            .map(Entity::into_value)
            .collect::<Result<Vec<R>, _>>()?;
        Ok(ResourceList::new(items).with_total(total))
    }

    async fn create(&self, resource: R, _query: &QuerySpec) -> anyhow::Result<R> {
        self.record(format!("create({})", resource.key()));
        self.items.lock().unwrap().push(resource.clone());
        Ok(resource)
    }

    async fn update(&self, resource: R, _query: &QuerySpec) -> anyhow::Result<R> {
        self.record(format!("update({})", resource.key()));
        let mut items = self.items.lock().unwrap();
        let slot = items
            .iter_mut()
            .find(|r| r.key() == resource.key())
            .ok_or_else(|| JsonApiError::resource_not_found(R::RESOURCE_TYPE, resource.key().to_string()))?;
        *slot = resource.clone();
        Ok(resource)
    }

    async fn delete(&self, id: &u64, _query: &QuerySpec) -> anyhow::Result<()> {
        self.record(format!("delete({id})"));
        self.items.lock().unwrap().retain(|r| r.key() != *id);
        Ok(())
    }
}

/// Legacy-convention repository over a vector.
pub struct LegacyStore<R> {
    pub items: Mutex<Vec<R>>,
}

impl<R> LegacyStore<R> {
    pub fn new(items: Vec<R>) -> Self {
        Self {
            items: Mutex::new(items),
        }
    }
}

#[async_trait]
impl<R> LegacyResourceRepository for LegacyStore<R>
where
    R: JsonApiResource<Id = u64> + Keyed + Clone,
{
    type Resource = R;

    async fn find_one(&self, id: u64, _params: &QueryParams) -> anyhow::Result<R> {
        self.items
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.key() == id)
            .cloned()
            .ok_or_else(|| JsonApiError::resource_not_found(R::RESOURCE_TYPE, id.to_string()).into())
    }

    async fn find_all(&self, _params: &QueryParams) -> anyhow::Result<Vec<R>> {
        Ok(self.items.lock().unwrap().clone())
    }

    async fn find_all_by_ids(&self, ids: Vec<u64>, _params: &QueryParams) -> anyhow::Result<Vec<R>> {
        Ok(self
            .items
            .lock()
            .unwrap()
            .iter()
            .filter(|r| ids.contains(&r.key()))
            .cloned()
            .collect())
    }

    async fn save(&self, resource: R) -> anyhow::Result<R> {
        let mut items = self.items.lock().unwrap();
        items.retain(|r| r.key() != resource.key());
        items.push(resource.clone());
        Ok(resource)
    }
}

/// Task-to-tag relationship repository that only records calls. Clones
/// share the record.
#[derive(Clone, Default)]
pub struct RecordingTaskTags {
    pub calls: Arc<Mutex<Vec<String>>>,
}

impl RecordingTaskTags {
    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl RelationshipRepository for RecordingTaskTags {
    type Source = Task;
    type Target = Tag;

    async fn set_relation(
        &self,
        source: &Task,
        target_id: Option<&IdOf<Tag>>,
        field_name: &str,
        _query: &QuerySpec,
    ) -> anyhow::Result<()> {
        self.record(format!("set_relation({}, {target_id:?}, {field_name})", source.id));
        Ok(())
    }

    async fn remove_relations(
        &self,
        source: &Task,
        target_ids: &[u64],
        field_name: &str,
        _query: &QuerySpec,
    ) -> anyhow::Result<()> {
        self.record(format!("remove_relations({}, {target_ids:?}, {field_name})", source.id));
        Ok(())
    }

    async fn find_one_target(
        &self,
        _source_id: &u64,
        _field_name: &str,
        _query: &QuerySpec,
    ) -> anyhow::Result<Option<Tag>> {
        Ok(None)
    }

    async fn find_many_targets(
        &self,
        source_id: &u64,
        field_name: &str,
        _query: &QuerySpec,
    ) -> anyhow::Result<ResourceList<Tag>> {
        self.record(format!("find_many_targets({source_id}, {field_name})"));
        Ok(ResourceList::new(vec![Tag {
            id: 9,
            label: "recorded".into(),
        }]))
    }
}
