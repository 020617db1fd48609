use crate::list::EntityList;
use meridian_core::{Entity, Links};
use serde_json::{Map, Value};

/// Primary data of a repository result.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseData {
    /// One resource, or none.
    Single(Option<Entity>),
    /// A list of resources.
    Collection(Vec<Entity>),
}

/// The normalized result of an adapter call, ready for document mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonApiResponse {
    resource_type: String,
    data: ResponseData,
    meta: Option<Map<String, Value>>,
    links: Option<Links>,
    total: Option<u64>,
}

impl JsonApiResponse {
    /// A single-resource result.
    #[must_use]
    pub fn single(resource_type: impl Into<String>, entity: Option<Entity>) -> Self {
        Self {
            resource_type: resource_type.into(),
            data: ResponseData::Single(entity),
            meta: None,
            links: None,
            total: None,
        }
    }

    /// A collection result carrying the list's meta, links and total.
    #[must_use]
    pub fn collection(resource_type: impl Into<String>, list: EntityList) -> Self {
        Self {
            resource_type: resource_type.into(),
            data: ResponseData::Collection(list.items),
            meta: list.meta,
            links: list.links,
            total: list.total,
        }
    }

    /// Resource type of the data.
    #[must_use]
    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    /// Primary data.
    #[must_use]
    pub fn data(&self) -> &ResponseData {
        &self.data
    }

    /// Returns true for collection results.
    #[must_use]
    pub fn is_collection(&self) -> bool {
        matches!(self.data, ResponseData::Collection(_))
    }

    /// All entities of the result.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        let (single, many) = match &self.data {
            ResponseData::Single(entity) => (entity.as_ref(), &[][..]),
            ResponseData::Collection(entities) => (None, entities.as_slice()),
        };
        single.into_iter().chain(many.iter())
    }

    /// The single entity, if this is a single-resource result.
    #[must_use]
    pub fn single_entity(&self) -> Option<&Entity> {
        match &self.data {
            ResponseData::Single(entity) => entity.as_ref(),
            ResponseData::Collection(_) => None,
        }
    }

    /// Consumes the result, returning the single entity.
    #[must_use]
    pub fn into_single(self) -> Option<Entity> {
        match self.data {
            ResponseData::Single(entity) => entity,
            ResponseData::Collection(mut entities) => {
                if entities.len() == 1 {
                    entities.pop()
                } else {
                    None
                }
            }
        }
    }

    /// Consumes the result, returning all entities.
    #[must_use]
    pub fn into_entities(self) -> Vec<Entity> {
        match self.data {
            ResponseData::Single(entity) => entity.into_iter().collect(),
            ResponseData::Collection(entities) => entities,
        }
    }

    /// Top-level meta information.
    #[must_use]
    pub fn meta(&self) -> Option<&Map<String, Value>> {
        self.meta.as_ref()
    }

    /// Top-level links.
    #[must_use]
    pub fn links(&self) -> Option<&Links> {
        self.links.as_ref()
    }

    /// Matches before paging, if known.
    #[must_use]
    pub fn total(&self) -> Option<u64> {
        self.total
    }

    /// Replaces the meta information.
    #[must_use]
    pub fn with_meta(mut self, meta: Option<Map<String, Value>>) -> Self {
        self.meta = meta;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entity(id: u64) -> Entity {
        let mut entity = Entity::new();
        entity.set("id", json!(id));
        entity
    }

    #[test]
    fn test_single() {
        let response = JsonApiResponse::single("tasks", Some(entity(1)));
        assert!(!response.is_collection());
        assert_eq!(response.entities().count(), 1);
        assert_eq!(response.single_entity(), Some(&entity(1)));
        assert_eq!(response.into_single(), Some(entity(1)));
    }

    #[test]
    fn test_collection_carries_list_metadata() {
        let list = EntityList::new(vec![entity(1), entity(2)]).with_total(5);
        let response = JsonApiResponse::collection("tasks", list);
        assert!(response.is_collection());
        assert_eq!(response.total(), Some(5));
        assert_eq!(response.entities().count(), 2);
        assert_eq!(response.single_entity(), None);
        assert_eq!(response.into_entities().len(), 2);
    }

    #[test]
    fn test_empty_single() {
        let response = JsonApiResponse::single("tasks", None);
        assert_eq!(response.entities().count(), 0);
        assert!(response.into_entities().is_empty());
    }
}
