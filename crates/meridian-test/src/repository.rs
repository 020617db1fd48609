//! In-memory repositories that record every call.
//!
//! Both repositories are cheap handles: clones share storage and the
//! [`CallLog`], so a test can register one clone and inspect another.

use async_trait::async_trait;
use meridian_core::{Entity, IdOf, JsonApiError, JsonApiResource, QuerySpec};
use meridian_repository::{RelationshipRepository, ResourceList, ResourceRepository};
use serde_json::Value;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Shared record of repository calls, in call order.
///
/// Calls are recorded as `operation(arguments)`, with ids rendered as JSON:
/// `find_one(1)`, `remove_relations(1, tags, [2,3])`.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<String>>>,
}

impl CallLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a call.
    pub fn record(&self, call: impl Into<String>) {
        lock(&self.calls).push(call.into());
    }

    /// All recorded calls.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }

    /// Calls of one operation.
    #[must_use]
    pub fn calls_to(&self, operation: &str) -> Vec<String> {
        let prefix = format!("{operation}(");
        lock(&self.calls)
            .iter()
            .filter(|call| call.starts_with(&prefix))
            .cloned()
            .collect()
    }

    /// Returns true if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        lock(&self.calls).is_empty()
    }

    /// Forgets all recorded calls.
    pub fn clear(&self) {
        lock(&self.calls).clear();
    }
}

fn id_member<R: JsonApiResource>() -> anyhow::Result<String> {
    let descriptor = R::descriptor();
    descriptor
        .id_field_name()
        .ok_or_else(|| {
            JsonApiError::ResourceIdNotFound {
                type_name: descriptor.type_name().to_string(),
            }
            .into()
        })
}

/// Resource repository over a vector.
///
/// Resources are kept as entities. `create` assigns the next numeric id when
/// the new resource has none (a missing, `null` or `0` id).
pub struct InMemoryRepository<R> {
    items: Arc<Mutex<Vec<Entity>>>,
    calls: CallLog,
    _resource: PhantomData<fn() -> R>,
}

impl<R> Clone for InMemoryRepository<R> {
    fn clone(&self) -> Self {
        Self {
            items: Arc::clone(&self.items),
            calls: self.calls.clone(),
            _resource: PhantomData,
        }
    }
}

impl<R> std::fmt::Debug for InMemoryRepository<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryRepository")
            .field("items", &lock(&self.items).len())
            .field("calls", &self.calls)
            .finish()
    }
}

impl<R: JsonApiResource> InMemoryRepository<R> {
    /// Creates a repository holding `items`.
    pub fn new(items: impl IntoIterator<Item = R>) -> anyhow::Result<Self> {
        let items = items
            .into_iter()
            .map(|item| Entity::from_value(&item))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            items: Arc::new(Mutex::new(items)),
            calls: CallLog::new(),
            _resource: PhantomData,
        })
    }

    /// Creates an empty repository.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            items: Arc::new(Mutex::new(Vec::new())),
            calls: CallLog::new(),
            _resource: PhantomData,
        }
    }

    /// The call log.
    #[must_use]
    pub fn calls(&self) -> &CallLog {
        &self.calls
    }

    /// Number of stored resources.
    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.items).len()
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        lock(&self.items).is_empty()
    }

    /// Reads a stored resource without recording a call.
    pub fn get(&self, id: &IdOf<R>) -> anyhow::Result<Option<R>> {
        let id = serde_json::to_value(id)?;
        let member = id_member::<R>()?;
        self.by_ids(&member, std::slice::from_ref(&id))
            .into_iter()
            .next()
            .map(|entity| entity.into_value().map_err(Into::into))
            .transpose()
    }

    /// Reads every stored resource without recording a call.
    pub fn snapshot(&self) -> anyhow::Result<Vec<R>> {
        lock(&self.items)
            .iter()
            .cloned()
            .map(|entity| entity.into_value().map_err(Into::into))
            .collect()
    }

    fn by_ids(&self, member: &str, ids: &[Value]) -> Vec<Entity> {
        let items = lock(&self.items);
        ids.iter()
            .filter_map(|id| items.iter().find(|e| e.get(member) == Some(id)).cloned())
            .collect()
    }

    fn next_id(items: &[Entity], member: &str) -> Value {
        let max = items
            .iter()
            .filter_map(|e| e.get(member).and_then(Value::as_u64))
            .max()
            .unwrap_or(0);
        Value::from(max + 1)
    }
}

#[async_trait]
impl<R: JsonApiResource> ResourceRepository for InMemoryRepository<R> {
    type Resource = R;

    async fn find_one(&self, id: &IdOf<R>, _query: &QuerySpec) -> anyhow::Result<Option<R>> {
        let id = serde_json::to_value(id)?;
        self.calls.record(format!("find_one({id})"));
        let member = id_member::<R>()?;
        self.by_ids(&member, std::slice::from_ref(&id))
            .into_iter()
            .next()
            .map(|entity| entity.into_value().map_err(Into::into))
            .transpose()
    }

    async fn find_all(&self, query: &QuerySpec) -> anyhow::Result<ResourceList<R>> {
        self.calls.record("find_all()");
        let items = lock(&self.items).clone();
        let (page, total) = query.apply(items);
        let page = page
            .into_iter()
            .map(Entity::into_value)
            .collect::<Result<Vec<R>, _>>()?;
        Ok(ResourceList::new(page).with_total(total))
    }

    async fn find_all_by_ids(
        &self,
        ids: &[IdOf<R>],
        _query: &QuerySpec,
    ) -> anyhow::Result<ResourceList<R>> {
        let ids = ids
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;
        self.calls
            .record(format!("find_all_by_ids({})", Value::from(ids.clone())));
        let member = id_member::<R>()?;
        let items = self
            .by_ids(&member, &ids)
            .into_iter()
            .map(Entity::into_value)
            .collect::<Result<Vec<R>, _>>()?;
        Ok(ResourceList::new(items))
    }

    async fn create(&self, resource: R, _query: &QuerySpec) -> anyhow::Result<R> {
        let member = id_member::<R>()?;
        let mut entity = Entity::from_value(&resource)?;
        let mut items = lock(&self.items);
        if entity.get(&member).map_or(true, |id| id.is_null() || *id == Value::from(0)) {
            entity.set(member.clone(), Self::next_id(&items, &member));
        }
        let id = entity.get(&member).cloned().unwrap_or_default();
        self.calls.record(format!("create({id})"));
        if items.iter().any(|e| e.get(&member) == Some(&id)) {
            anyhow::bail!("{} {id} already exists", R::RESOURCE_TYPE);
        }
        items.push(entity.clone());
        Ok(entity.into_value()?)
    }

    async fn update(&self, resource: R, _query: &QuerySpec) -> anyhow::Result<R> {
        let member = id_member::<R>()?;
        let entity = Entity::from_value(&resource)?;
        let id = entity.get(&member).cloned().unwrap_or_default();
        self.calls.record(format!("update({id})"));
        let mut items = lock(&self.items);
        let slot = items
            .iter_mut()
            .find(|e| e.get(&member) == Some(&id))
            .ok_or_else(|| JsonApiError::resource_not_found(R::RESOURCE_TYPE, id.to_string()))?;
        *slot = entity;
        Ok(resource)
    }

    async fn delete(&self, id: &IdOf<R>, _query: &QuerySpec) -> anyhow::Result<()> {
        let id = serde_json::to_value(id)?;
        self.calls.record(format!("delete({id})"));
        let member = id_member::<R>()?;
        lock(&self.items).retain(|e| e.get(&member) != Some(&id));
        Ok(())
    }
}

/// Relationship repository keeping links in a map, resolving targets
/// through an [`InMemoryRepository`].
pub struct RecordingRelationshipRepository<S, T> {
    links: Arc<Mutex<HashMap<(String, String), Vec<Value>>>>,
    targets: InMemoryRepository<T>,
    calls: CallLog,
    _source: PhantomData<fn() -> S>,
}

impl<S, T> Clone for RecordingRelationshipRepository<S, T> {
    fn clone(&self) -> Self {
        Self {
            links: Arc::clone(&self.links),
            targets: self.targets.clone(),
            calls: self.calls.clone(),
            _source: PhantomData,
        }
    }
}

impl<S, T> std::fmt::Debug for RecordingRelationshipRepository<S, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingRelationshipRepository")
            .field("links", &lock(&self.links).len())
            .field("calls", &self.calls)
            .finish_non_exhaustive()
    }
}

impl<S: JsonApiResource, T: JsonApiResource> RecordingRelationshipRepository<S, T> {
    /// Creates a repository without links, resolving targets in `targets`.
    #[must_use]
    pub fn new(targets: InMemoryRepository<T>) -> Self {
        Self {
            links: Arc::new(Mutex::new(HashMap::new())),
            targets,
            calls: CallLog::new(),
            _source: PhantomData,
        }
    }

    /// Seeds the links of one source.
    pub fn with_links(
        self,
        source_id: &IdOf<S>,
        field_name: &str,
        target_ids: &[IdOf<T>],
    ) -> anyhow::Result<Self> {
        let key = (serde_json::to_value(source_id)?.to_string(), field_name.to_string());
        let ids = to_values::<T>(target_ids)?;
        lock(&self.links).insert(key, ids);
        Ok(self)
    }

    /// The call log.
    #[must_use]
    pub fn calls(&self) -> &CallLog {
        &self.calls
    }

    /// Linked target ids of one source.
    pub fn linked(&self, source_id: &IdOf<S>, field_name: &str) -> anyhow::Result<Vec<Value>> {
        let key = (serde_json::to_value(source_id)?.to_string(), field_name.to_string());
        Ok(lock(&self.links).get(&key).cloned().unwrap_or_default())
    }

    fn source_key(source: &S) -> anyhow::Result<String> {
        let member = id_member::<S>()?;
        let entity = Entity::from_value(source)?;
        Ok(entity.get(&member).cloned().unwrap_or_default().to_string())
    }

    fn targets_of(&self, key: &(String, String)) -> anyhow::Result<Vec<T>> {
        let ids = lock(&self.links).get(key).cloned().unwrap_or_default();
        let member = id_member::<T>()?;
        self.targets
            .by_ids(&member, &ids)
            .into_iter()
            .map(|entity| entity.into_value().map_err(Into::into))
            .collect()
    }
}

fn to_values<T: JsonApiResource>(ids: &[IdOf<T>]) -> anyhow::Result<Vec<Value>> {
    Ok(ids
        .iter()
        .map(serde_json::to_value)
        .collect::<Result<Vec<_>, _>>()?)
}

#[async_trait]
impl<S: JsonApiResource, T: JsonApiResource> RelationshipRepository
    for RecordingRelationshipRepository<S, T>
{
    type Source = S;
    type Target = T;

    async fn set_relation(
        &self,
        source: &S,
        target_id: Option<&IdOf<T>>,
        field_name: &str,
        _query: &QuerySpec,
    ) -> anyhow::Result<()> {
        let source = Self::source_key(source)?;
        let target = target_id.map(serde_json::to_value).transpose()?;
        let rendered = target.clone().unwrap_or(Value::Null);
        self.calls
            .record(format!("set_relation({source}, {field_name}, {rendered})"));
        lock(&self.links).insert(
            (source, field_name.to_string()),
            target.into_iter().collect(),
        );
        Ok(())
    }

    async fn set_relations(
        &self,
        source: &S,
        target_ids: &[IdOf<T>],
        field_name: &str,
        _query: &QuerySpec,
    ) -> anyhow::Result<()> {
        let source = Self::source_key(source)?;
        let ids = to_values::<T>(target_ids)?;
        self.calls.record(format!(
            "set_relations({source}, {field_name}, {})",
            Value::from(ids.clone())
        ));
        lock(&self.links).insert((source, field_name.to_string()), ids);
        Ok(())
    }

    async fn add_relations(
        &self,
        source: &S,
        target_ids: &[IdOf<T>],
        field_name: &str,
        _query: &QuerySpec,
    ) -> anyhow::Result<()> {
        let source = Self::source_key(source)?;
        let ids = to_values::<T>(target_ids)?;
        self.calls.record(format!(
            "add_relations({source}, {field_name}, {})",
            Value::from(ids.clone())
        ));
        let mut links = lock(&self.links);
        let linked = links.entry((source, field_name.to_string())).or_default();
        for id in ids {
            if !linked.contains(&id) {
                linked.push(id);
            }
        }
        Ok(())
    }

    async fn remove_relations(
        &self,
        source: &S,
        target_ids: &[IdOf<T>],
        field_name: &str,
        _query: &QuerySpec,
    ) -> anyhow::Result<()> {
        let source = Self::source_key(source)?;
        let ids = to_values::<T>(target_ids)?;
        self.calls.record(format!(
            "remove_relations({source}, {field_name}, {})",
            Value::from(ids.clone())
        ));
        if let Some(linked) = lock(&self.links).get_mut(&(source, field_name.to_string())) {
            linked.retain(|id| !ids.contains(id));
        }
        Ok(())
    }

    async fn find_one_target(
        &self,
        source_id: &IdOf<S>,
        field_name: &str,
        _query: &QuerySpec,
    ) -> anyhow::Result<Option<T>> {
        let source = serde_json::to_value(source_id)?.to_string();
        self.calls
            .record(format!("find_one_target({source}, {field_name})"));
        Ok(self
            .targets_of(&(source, field_name.to_string()))?
            .into_iter()
            .next())
    }

    async fn find_many_targets(
        &self,
        source_id: &IdOf<S>,
        field_name: &str,
        query: &QuerySpec,
    ) -> anyhow::Result<ResourceList<T>> {
        let source = serde_json::to_value(source_id)?.to_string();
        self.calls
            .record(format!("find_many_targets({source}, {field_name})"));
        let targets = self
            .targets_of(&(source, field_name.to_string()))?
            .iter()
            .map(Entity::from_value)
            .collect::<Result<Vec<_>, _>>()?;
        let (page, total) = query.apply(targets);
        let page = page
            .into_iter()
            .map(Entity::into_value)
            .collect::<Result<Vec<T>, _>>()?;
        Ok(ResourceList::new(page).with_total(total))
    }
}
