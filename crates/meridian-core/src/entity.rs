//! Type-erased domain values.
//!
//! The framework never sees concrete domain types. Typed repositories convert
//! their values to and from [`Entity`], a JSON object keyed by the underlying
//! (serialized) member names, using serde. Relationship members hold either
//! nested objects or bare ids, depending on the field's
//! [`RelationStorage`](crate::RelationStorage).

use crate::error::{JsonApiError, JsonApiResult};
use crate::information::{ResourceField, ResourceInformation};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A domain value as a JSON object keyed by underlying member names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Entity(Map<String, Value>);

impl Entity {
    /// Creates an empty entity.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serializes a domain value into an entity.
    pub fn from_value<T: Serialize>(value: &T) -> JsonApiResult<Self> {
        match serde_json::to_value(value) {
            Ok(Value::Object(map)) => Ok(Self(map)),
            Ok(other) => Err(JsonApiError::internal(format!(
                "resource serialized to {} instead of an object",
                json_kind(&other)
            ))),
            Err(e) => Err(JsonApiError::internal_with_source(
                "resource serialization failed",
                e,
            )),
        }
    }

    /// Deserializes the entity into a domain value.
    ///
    /// Failures are client errors: entity contents come from request bodies.
    pub fn into_value<T: DeserializeOwned>(self) -> JsonApiResult<T> {
        serde_json::from_value(Value::Object(self.0))
            .map_err(|e| JsonApiError::bad_body("/data", format!("invalid resource: {e}")))
    }

    /// Returns the value of a member.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Sets the value of a member.
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.0.insert(name.into(), value);
    }

    /// Removes a member.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.0.remove(name)
    }

    /// Returns `true` if the member is present, even when `null`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Borrows the underlying map.
    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Returns the underlying map.
    #[must_use]
    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    /// Reads the value of a relationship member.
    #[must_use]
    pub fn relation(&self, field: &ResourceField) -> RelationValue {
        match self.0.get(field.underlying_name()) {
            None => RelationValue::Absent,
            Some(Value::Null) => RelationValue::Null,
            Some(Value::Array(values)) => RelationValue::Many(values.clone()),
            Some(value) if field.is_collection() => RelationValue::Many(vec![value.clone()]),
            Some(value) => RelationValue::One(value.clone()),
        }
    }

    /// Writes a relationship member from ids or nested objects.
    ///
    /// To-one fields take the first value or `null`; to-many fields take an array.
    pub fn set_relation(&mut self, field: &ResourceField, values: Vec<Value>) {
        let value = if field.is_collection() {
            Value::Array(values)
        } else {
            values.into_iter().next().unwrap_or(Value::Null)
        };
        self.set(field.underlying_name(), value);
    }
}

impl From<Map<String, Value>> for Entity {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Value of a relationship member on an entity.
#[derive(Debug, Clone, PartialEq)]
pub enum RelationValue {
    /// The member is missing.
    Absent,
    /// The member is `null`.
    Null,
    /// A single nested object or id.
    One(Value),
    /// Nested objects or ids.
    Many(Vec<Value>),
}

impl RelationValue {
    /// Whether the entity carries a value.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::One(_) | Self::Many(_))
    }

    fn values(&self) -> &[Value] {
        match self {
            Self::Absent | Self::Null => &[],
            Self::One(value) => std::slice::from_ref(value),
            Self::Many(values) => values,
        }
    }

    /// Ids of the related resources; nested objects contribute their id member.
    #[must_use]
    pub fn target_ids(&self, target: &ResourceInformation) -> Vec<Value> {
        self.values()
            .iter()
            .filter_map(|value| match value {
                Value::Object(map) => map
                    .get(target.id_field().underlying_name())
                    .filter(|id| !id.is_null())
                    .cloned(),
                Value::Null => None,
                other => Some(other.clone()),
            })
            .collect()
    }

    /// The related resources, when every value is a nested object.
    #[must_use]
    pub fn target_entities(&self) -> Option<Vec<Entity>> {
        self.values()
            .iter()
            .map(|value| match value {
                Value::Object(map) => Some(Entity(map.clone())),
                _ => None,
            })
            .collect()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::information::{FieldDescriptor, ResourceDescriptor, ResourceInformationBuilder};
    use serde_json::json;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Note {
        id: u64,
        text: String,
    }

    fn infos() -> (ResourceInformation, ResourceInformation) {
        let tag = ResourceDescriptor::new("tags", "Tag").field(FieldDescriptor::id("id", "u64"));
        let task = ResourceDescriptor::new("tasks", "Task")
            .field(FieldDescriptor::id("id", "u64"))
            .field(FieldDescriptor::new("tags", "Vec<Tag>"))
            .field(FieldDescriptor::new("main", "Option<Tag>"));
        let builder = ResourceInformationBuilder::new().register(&tag).register(&task);
        (builder.build(&task).unwrap(), builder.build(&tag).unwrap())
    }

    #[test]
    fn test_round_trip_through_serde() {
        let note = Note {
            id: 3,
            text: "hello".into(),
        };
        let entity = Entity::from_value(&note).unwrap();
        assert_eq!(entity.get("text"), Some(&json!("hello")));
        assert_eq!(entity.into_value::<Note>().unwrap(), note);
    }

    #[test]
    fn test_non_object_is_rejected() {
        assert!(Entity::from_value(&5).is_err());
    }

    #[test]
    fn test_invalid_content_is_bad_request() {
        let mut entity = Entity::new();
        entity.set("id", json!("not a number"));
        let error = entity.into_value::<Note>().unwrap_err();
        assert!(matches!(error, JsonApiError::BadRequest { .. }));
    }

    #[test]
    fn test_relation_values() {
        let (task, tag) = infos();
        let tags = task.find_relationship_field_by_name("tags").unwrap();
        let main = task.find_relationship_field_by_name("main").unwrap();

        let mut entity = Entity::new();
        assert_eq!(entity.relation(tags), RelationValue::Absent);

        entity.set("main", Value::Null);
        assert_eq!(entity.relation(main), RelationValue::Null);
        assert!(!entity.relation(main).is_loaded());

        entity.set("tags", json!([{"id": 1}, {"id": 2}]));
        let value = entity.relation(tags);
        assert_eq!(value.target_ids(&tag), vec![json!(1), json!(2)]);
        assert_eq!(value.target_entities().map(|e| e.len()), Some(2));

        entity.set("tags", json!([4, 5]));
        assert_eq!(entity.relation(tags).target_ids(&tag), vec![json!(4), json!(5)]);
        assert!(entity.relation(tags).target_entities().is_none());
    }

    #[test]
    fn test_set_relation_by_cardinality() {
        let (task, _) = infos();
        let tags = task.find_relationship_field_by_name("tags").unwrap();
        let main = task.find_relationship_field_by_name("main").unwrap();

        let mut entity = Entity::new();
        entity.set_relation(tags, vec![json!(1)]);
        entity.set_relation(main, vec![]);
        assert_eq!(entity.get("tags"), Some(&json!([1])));
        assert_eq!(entity.get("main"), Some(&Value::Null));
    }
}
