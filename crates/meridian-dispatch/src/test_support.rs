//! In-memory resources shared by the unit tests of this crate.

use async_trait::async_trait;
use meridian_core::{Entity, FieldDescriptor, JsonApiError, QuerySpec, ResourceDescriptor};
use meridian_repository::{EntityList, ResourceRegistry, UntypedResourceRepository};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

pub const TASKS: &str = "tasks";
pub const PROJECTS: &str = "projects";
pub const TAGS: &str = "tags";

pub fn task_descriptor() -> ResourceDescriptor {
    ResourceDescriptor::new(TASKS, "Task")
        .field(FieldDescriptor::id("id", "u64"))
        .field(FieldDescriptor::new("name", "String"))
        .field(FieldDescriptor::new("due_date", "Option<String>").json_name("dueDate"))
        .field(
            FieldDescriptor::new("created_by", "Option<String>")
                .json_name("createdBy")
                .immutable(),
        )
        .field(FieldDescriptor::new("project", "Option<Project>"))
        .field(FieldDescriptor::new("tags", "Vec<Tag>"))
}

pub fn project_descriptor() -> ResourceDescriptor {
    ResourceDescriptor::new(PROJECTS, "Project")
        .field(FieldDescriptor::id("id", "u64"))
        .field(FieldDescriptor::new("name", "String"))
        .field(
            FieldDescriptor::new("task_ids", "Vec<u64>")
                .relation_ids("Task")
                .json_name("tasks"),
        )
}

pub fn tag_descriptor() -> ResourceDescriptor {
    ResourceDescriptor::new(TAGS, "Tag")
        .field(FieldDescriptor::id("id", "u64"))
        .field(FieldDescriptor::new("label", "String"))
}

/// Untyped repository over entities keyed by their `id` member. Every call
/// is recorded.
#[derive(Default)]
pub struct EntityStore {
    pub items: Mutex<Vec<Entity>>,
    pub calls: Mutex<Vec<String>>,
    pub fail_updates: Mutex<bool>,
}

impl EntityStore {
    pub fn new(items: Vec<Value>) -> Self {
        Self {
            items: Mutex::new(
                items
                    .into_iter()
                    .filter_map(|v| match v {
                        Value::Object(map) => Some(Entity::from(map)),
                        _ => None,
                    })
                    .collect(),
            ),
            ..Self::default()
        }
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn get(&self, id: u64) -> Option<Entity> {
        self.items
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.get("id") == Some(&json!(id)))
            .cloned()
    }
}

#[async_trait]
impl UntypedResourceRepository for EntityStore {
    async fn find_one(&self, id: &Value, _query: &QuerySpec) -> anyhow::Result<Option<Entity>> {
        self.record(format!("find_one({id})"));
        Ok(self
            .items
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.get("id") == Some(id))
            .cloned())
    }

    async fn find_all(&self, query: &QuerySpec) -> anyhow::Result<EntityList> {
        self.record("find_all");
        let items = self.items.lock().unwrap().clone();
        let (page, total) = query.apply(items);
        Ok(EntityList::new(page).with_total(total))
    }

    async fn find_all_by_ids(&self, ids: &[Value], _query: &QuerySpec) -> anyhow::Result<EntityList> {
        self.record(format!("find_all_by_ids({})", Value::from(ids.to_vec())));
        let items = self
            .items
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.get("id").is_some_and(|id| ids.contains(id)))
            .cloned()
            .collect();
        Ok(EntityList::new(items))
    }

    async fn create(&self, mut entity: Entity, _query: &QuerySpec) -> anyhow::Result<Entity> {
        let mut items = self.items.lock().unwrap();
        if entity.get("id").map_or(true, Value::is_null) {
            let next = items
                .iter()
                .filter_map(|e| e.get("id").and_then(Value::as_u64))
                .max()
                .unwrap_or(0)
                + 1;
            entity.set("id", json!(next));
        }
        self.record(format!("create({})", entity.get("id").cloned().unwrap_or_default()));
        items.push(entity.clone());
        Ok(entity)
    }

    async fn update(&self, entity: Entity, _query: &QuerySpec) -> anyhow::Result<Entity> {
        let id = entity.get("id").cloned().unwrap_or_default();
        self.record(format!("update({id})"));
        if *self.fail_updates.lock().unwrap() {
            anyhow::bail!("storage is read-only");
        }
        let mut items = self.items.lock().unwrap();
        let slot = items
            .iter_mut()
            .find(|e| e.get("id") == Some(&id))
            .ok_or_else(|| JsonApiError::resource_not_found("entity", id.to_string()))?;
        *slot = entity.clone();
        Ok(entity)
    }

    async fn delete(&self, id: &Value, _query: &QuerySpec) -> anyhow::Result<()> {
        self.record(format!("delete({id})"));
        self.items.lock().unwrap().retain(|e| e.get("id") != Some(id));
        Ok(())
    }
}

pub struct Stores {
    pub tasks: Arc<EntityStore>,
    pub projects: Arc<EntityStore>,
    pub tags: Arc<EntityStore>,
}

/// Tasks 1 and 2 share project 7; task 1 carries tags 1 and 2.
pub fn stores() -> Stores {
    let web = json!({"id": 7, "name": "web", "task_ids": [1, 2]});
    Stores {
        tasks: Arc::new(EntityStore::new(vec![
            json!({
                "id": 1,
                "name": "docs",
                "due_date": null,
                "created_by": "ada",
                "project": {"id": 7, "name": "web"},
                "tags": [{"id": 1, "label": "red"}, {"id": 2, "label": "blue"}],
            }),
            json!({
                "id": 2,
                "name": "tests",
                "due_date": "2026-11-01",
                "created_by": "bob",
                "project": {"id": 7, "name": "web"},
                "tags": [],
            }),
        ])),
        projects: Arc::new(EntityStore::new(vec![web])),
        tags: Arc::new(EntityStore::new(vec![
            json!({"id": 1, "label": "red"}),
            json!({"id": 2, "label": "blue"}),
            json!({"id": 3, "label": "green"}),
        ])),
    }
}

pub fn registry_with(stores: &Stores) -> ResourceRegistry {
    ResourceRegistry::builder()
        .add_descriptor(task_descriptor())
        .add_descriptor(project_descriptor())
        .add_descriptor(tag_descriptor())
        .add_untyped_repository(TASKS, Arc::clone(&stores.tasks) as Arc<dyn UntypedResourceRepository>)
        .add_untyped_repository(PROJECTS, Arc::clone(&stores.projects) as Arc<dyn UntypedResourceRepository>)
        .add_untyped_repository(TAGS, Arc::clone(&stores.tags) as Arc<dyn UntypedResourceRepository>)
        .build()
        .unwrap()
}

pub fn registry() -> (ResourceRegistry, Stores) {
    let stores = stores();
    (registry_with(&stores), stores)
}
