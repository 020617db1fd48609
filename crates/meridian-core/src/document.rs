//! JSON:API wire document types.
//!
//! These types serialize to and from the exact JSON:API shape. The top-level
//! `data` member distinguishes between absent (`None`), `null`
//! (`Some(PrimaryData::Single(None))`), a single object and an array.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Media type of JSON:API documents.
pub const JSON_API_CONTENT_TYPE: &str = "application/vnd.api+json";

/// A JSON:API top-level document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Primary data.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_present"
    )]
    pub data: Option<PrimaryData>,
    /// Included resources, unique by `(type, id)`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub included: Vec<Resource>,
    /// Top-level meta information.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Map<String, Value>>,
    /// Top-level links.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Links>,
    /// Error objects.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<ErrorData>>,
}

impl Document {
    /// Creates a document with a single resource as primary data.
    #[must_use]
    pub fn single(resource: Resource) -> Self {
        Self {
            data: Some(PrimaryData::Single(Some(Box::new(resource)))),
            ..Self::default()
        }
    }

    /// Creates a document with `"data": null`.
    #[must_use]
    pub fn null() -> Self {
        Self {
            data: Some(PrimaryData::Single(None)),
            ..Self::default()
        }
    }

    /// Creates a document with an array of resources as primary data.
    #[must_use]
    pub fn collection(resources: Vec<Resource>) -> Self {
        Self {
            data: Some(PrimaryData::Collection(resources)),
            ..Self::default()
        }
    }

    /// Creates an error document.
    #[must_use]
    pub fn errors(errors: Vec<ErrorData>) -> Self {
        Self {
            errors: Some(errors),
            ..Self::default()
        }
    }

    /// Returns the single primary resource, if the data is a non-null object.
    #[must_use]
    pub fn single_data(&self) -> Option<&Resource> {
        match &self.data {
            Some(PrimaryData::Single(Some(resource))) => Some(resource),
            _ => None,
        }
    }

    /// Returns the primary resources, if the data is an array.
    #[must_use]
    pub fn collection_data(&self) -> Option<&[Resource]> {
        match &self.data {
            Some(PrimaryData::Collection(resources)) => Some(resources),
            _ => None,
        }
    }

    /// Returns `true` if the primary data is an array.
    #[must_use]
    pub fn is_multiple(&self) -> bool {
        matches!(self.data, Some(PrimaryData::Collection(_)))
    }

    /// Finds an included resource by type and id.
    #[must_use]
    pub fn find_included(&self, resource_type: &str, id: &str) -> Option<&Resource> {
        self.included
            .iter()
            .find(|r| r.resource_type == resource_type && r.id.as_deref() == Some(id))
    }
}

/// Primary data of a document: a single (possibly null) resource or an array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrimaryData {
    /// An array of resources.
    Collection(Vec<Resource>),
    /// A single resource or `null`.
    Single(Option<Box<Resource>>),
}

/// A resource object.
///
/// Resource identifier objects deserialize into this type as well, with empty
/// attributes and relationships.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    /// Resource id; absent for client-side creation without an id.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_optional_id"
    )]
    pub id: Option<String>,
    /// Resource type.
    #[serde(rename = "type")]
    pub resource_type: String,
    /// Attributes keyed by wire name.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub attributes: Map<String, Value>,
    /// Relationships keyed by wire name.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub relationships: IndexMap<String, Relationship>,
    /// Resource links.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Links>,
    /// Resource meta information.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Map<String, Value>>,
}

impl Resource {
    /// Creates an empty resource object.
    #[must_use]
    pub fn new(resource_type: impl Into<String>, id: Option<String>) -> Self {
        Self {
            id,
            resource_type: resource_type.into(),
            ..Self::default()
        }
    }

    /// Returns the identifier of this resource, if it has an id.
    #[must_use]
    pub fn identifier(&self) -> Option<ResourceIdentifier> {
        self.id
            .as_ref()
            .map(|id| ResourceIdentifier::new(self.resource_type.clone(), id.clone()))
    }
}

/// A resource identifier object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceIdentifier {
    /// Resource id.
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    /// Resource type.
    #[serde(rename = "type")]
    pub resource_type: String,
}

impl ResourceIdentifier {
    /// Creates an identifier.
    #[must_use]
    pub fn new(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            resource_type: resource_type.into(),
        }
    }
}

/// A relationship object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    /// Resource linkage; absent when not loaded.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_present"
    )]
    pub data: Option<RelationshipData>,
    /// Relationship links (`self`, `related`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Links>,
    /// Relationship meta information.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Map<String, Value>>,
}

/// Resource linkage of a relationship.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RelationshipData {
    /// To-many linkage.
    Many(Vec<ResourceIdentifier>),
    /// To-one linkage, `null` when empty.
    One(Option<ResourceIdentifier>),
}

impl RelationshipData {
    /// Returns all identifiers in this linkage.
    #[must_use]
    pub fn identifiers(&self) -> Vec<&ResourceIdentifier> {
        match self {
            Self::Many(ids) => ids.iter().collect(),
            Self::One(id) => id.iter().collect(),
        }
    }
}

/// Links object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Links {
    /// Link to the object itself.
    #[serde(rename = "self", default, skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,
    /// Link to the related resource(s).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related: Option<String>,
    /// First page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first: Option<String>,
    /// Previous page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev: Option<String>,
    /// Next page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
}

impl Links {
    /// Returns `true` if no link is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.self_link.is_none()
            && self.related.is_none()
            && self.first.is_none()
            && self.prev.is_none()
            && self.next.is_none()
    }
}

/// A JSON:API error object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorData {
    /// Unique identifier of this occurrence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// HTTP status code as a string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Application-specific error code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Short summary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Occurrence-specific explanation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Source of the error in the request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<ErrorSource>,
    /// Error meta information.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Map<String, Value>>,
}

/// Source of an error in the request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorSource {
    /// JSON pointer into the request body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pointer: Option<String>,
    /// Offending query parameter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter: Option<String>,
}

fn deserialize_present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

// Ids are strings on the wire, but numeric ids are accepted from lenient clients.
fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string id, found {other}"
        ))),
    }
}

fn deserialize_optional_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        other => Err(serde::de::Error::custom(format!(
            "expected string id, found {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_data_absent_null_object_array() {
        let absent: Document = serde_json::from_value(json!({"meta": {"a": 1}})).unwrap();
        assert!(absent.data.is_none());

        let null: Document = serde_json::from_value(json!({"data": null})).unwrap();
        assert_eq!(null.data, Some(PrimaryData::Single(None)));

        let single: Document =
            serde_json::from_value(json!({"data": {"type": "tasks", "id": "1"}})).unwrap();
        assert_eq!(single.single_data().and_then(|r| r.id.as_deref()), Some("1"));

        let many: Document = serde_json::from_value(json!({"data": []})).unwrap();
        assert!(many.is_multiple());
    }

    #[test]
    fn test_null_data_serializes() {
        let value = serde_json::to_value(Document::null()).unwrap();
        assert_eq!(value, json!({"data": null}));
    }

    #[test]
    fn test_numeric_ids_are_accepted() {
        let doc: Document = serde_json::from_value(json!({
            "data": [{"type": "tags", "id": 2}, {"type": "tags", "id": "3"}]
        }))
        .unwrap();
        let ids: Vec<_> = doc
            .collection_data()
            .unwrap()
            .iter()
            .filter_map(|r| r.id.clone())
            .collect();
        assert_eq!(ids, vec!["2", "3"]);
    }

    #[test]
    fn test_relationship_linkage_shapes() {
        let resource: Resource = serde_json::from_value(json!({
            "type": "tasks",
            "id": "1",
            "relationships": {
                "project": {"data": {"type": "projects", "id": "7"}},
                "tags": {"data": [{"type": "tags", "id": "2"}]},
                "owner": {"data": null},
                "watchers": {"links": {"related": "/tasks/1/watchers"}}
            }
        }))
        .unwrap();

        assert!(matches!(
            resource.relationships["project"].data,
            Some(RelationshipData::One(Some(_)))
        ));
        assert!(matches!(
            resource.relationships["tags"].data,
            Some(RelationshipData::Many(_))
        ));
        assert_eq!(
            resource.relationships["owner"].data,
            Some(RelationshipData::One(None))
        );
        assert!(resource.relationships["watchers"].data.is_none());
    }

    #[test]
    fn test_links_serialize_self_keyword() {
        let links = Links {
            self_link: Some("/tasks/1".into()),
            ..Links::default()
        };
        assert_eq!(serde_json::to_value(links).unwrap(), json!({"self": "/tasks/1"}));
    }
}
