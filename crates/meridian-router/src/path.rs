use crate::builder::RELATIONSHIPS_SEGMENT;
use crate::ids::PathIds;
use std::fmt;

/// Shape of a JSON:API path, independent of the names in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathShape {
    /// `/{type}`
    Collection,
    /// `/{type}/{ids}`
    Resource,
    /// `/{type}/{id}/{field}`
    Field,
    /// `/{type}/{id}/relationships/{field}`
    Relationship,
}

impl fmt::Display for PathShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Collection => f.write_str("collection"),
            Self::Resource => f.write_str("resource"),
            Self::Field => f.write_str("field"),
            Self::Relationship => f.write_str("relationship"),
        }
    }
}

/// A parsed request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JsonPath {
    /// All resources of a type.
    Collection {
        /// Resource type.
        resource_type: String,
    },
    /// One or more resources by id.
    Resource {
        /// Resource type.
        resource_type: String,
        /// Requested ids.
        ids: PathIds,
    },
    /// The related resources of a relationship.
    Field {
        /// Owner resource type.
        resource_type: String,
        /// Owner ids.
        ids: PathIds,
        /// Relationship name.
        field: String,
    },
    /// The linkage of a relationship.
    Relationship {
        /// Owner resource type.
        resource_type: String,
        /// Owner ids.
        ids: PathIds,
        /// Relationship name.
        field: String,
    },
}

impl JsonPath {
    /// Shape of the path.
    #[must_use]
    pub fn shape(&self) -> PathShape {
        match self {
            Self::Collection { .. } => PathShape::Collection,
            Self::Resource { .. } => PathShape::Resource,
            Self::Field { .. } => PathShape::Field,
            Self::Relationship { .. } => PathShape::Relationship,
        }
    }

    /// Resource type named by the first segment.
    #[must_use]
    pub fn resource_type(&self) -> &str {
        match self {
            Self::Collection { resource_type }
            | Self::Resource { resource_type, .. }
            | Self::Field { resource_type, .. }
            | Self::Relationship { resource_type, .. } => resource_type,
        }
    }

    /// Ids, if the path has an id segment.
    #[must_use]
    pub fn ids(&self) -> Option<&PathIds> {
        match self {
            Self::Collection { .. } => None,
            Self::Resource { ids, .. } | Self::Field { ids, .. } | Self::Relationship { ids, .. } => {
                Some(ids)
            }
        }
    }

    /// The single id, if the path has exactly one.
    #[must_use]
    pub fn single_id(&self) -> Option<&str> {
        self.ids()
            .filter(|ids| ids.len() == 1)
            .and_then(PathIds::first)
    }

    /// Field or relationship name, if any.
    #[must_use]
    pub fn element_name(&self) -> Option<&str> {
        match self {
            Self::Field { field, .. } | Self::Relationship { field, .. } => Some(field),
            _ => None,
        }
    }

    /// Whether the path addresses more than one owner resource.
    #[must_use]
    pub fn is_collection(&self) -> bool {
        self.ids().map_or(true, |ids| ids.len() != 1)
    }
}

impl fmt::Display for JsonPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Collection { resource_type } => write!(f, "/{resource_type}"),
            Self::Resource { resource_type, ids } => write!(f, "/{resource_type}/{ids}"),
            Self::Field {
                resource_type,
                ids,
                field,
            } => write!(f, "/{resource_type}/{ids}/{field}"),
            Self::Relationship {
                resource_type,
                ids,
                field,
            } => write!(f, "/{resource_type}/{ids}/{RELATIONSHIPS_SEGMENT}/{field}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn relationship() -> JsonPath {
        JsonPath::Relationship {
            resource_type: "tasks".into(),
            ids: PathIds::parse("1"),
            field: "tags".into(),
        }
    }

    #[test]
    fn test_accessors() {
        let path = relationship();
        assert_eq!(path.shape(), PathShape::Relationship);
        assert_eq!(path.resource_type(), "tasks");
        assert_eq!(path.single_id(), Some("1"));
        assert_eq!(path.element_name(), Some("tags"));
        assert!(!path.is_collection());
    }

    #[test]
    fn test_collection_paths() {
        let collection = JsonPath::Collection {
            resource_type: "tasks".into(),
        };
        assert!(collection.is_collection());
        assert_eq!(collection.single_id(), None);

        let many = JsonPath::Resource {
            resource_type: "tasks".into(),
            ids: PathIds::parse("1,2"),
        };
        assert!(many.is_collection());
        assert_eq!(many.single_id(), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(relationship().to_string(), "/tasks/1/relationships/tags");
    }
}
