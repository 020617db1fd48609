use crate::ids::PathIds;
use crate::path::JsonPath;
use meridian_core::{JsonApiError, JsonApiResult};

/// Literal segment introducing a relationship name.
pub const RELATIONSHIPS_SEGMENT: &str = "relationships";

/// Parses request paths into [`JsonPath`]s.
///
/// # Example
///
/// ```rust
/// use meridian_router::{JsonPath, PathBuilder, PathShape};
///
/// let builder = PathBuilder::new();
///
/// let path = builder.build("/tasks/1/relationships/tags").unwrap().unwrap();
/// assert_eq!(path.shape(), PathShape::Relationship);
/// assert_eq!(path.element_name(), Some("tags"));
///
/// assert!(builder.build("/").unwrap().is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct PathBuilder {
    prefix: Option<String>,
}

impl PathBuilder {
    /// Creates a builder without a path prefix.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Strips `prefix` from every path before parsing.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        let trimmed = prefix.trim_matches('/');
        self.prefix = (!trimmed.is_empty()).then(|| format!("/{trimmed}"));
        self
    }

    /// The configured prefix, normalized to `/segment[/segment...]`.
    #[must_use]
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Parses `path`.
    ///
    /// Returns `Ok(None)` when the path is outside the prefix, empty, or
    /// deeper than any JSON:API path. Returns an error for malformed
    /// relationship paths and empty id segments.
    pub fn build(&self, path: &str) -> JsonApiResult<Option<JsonPath>> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let rest = match &self.prefix {
            Some(prefix) => match path.strip_prefix(prefix.as_str()) {
                Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
                _ => return Ok(None),
            },
            None => path,
        };

        let segments: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();
        let parsed = match segments.as_slice() {
            [] => None,
            [resource_type] => Some(JsonPath::Collection {
                resource_type: decode(resource_type),
            }),
            [resource_type, ids] => Some(JsonPath::Resource {
                resource_type: decode(resource_type),
                ids: parse_ids(ids)?,
            }),
            [_, _, segment] if *segment == RELATIONSHIPS_SEGMENT => {
                return Err(JsonApiError::bad_request(
                    "relationship path is missing the relationship name",
                ));
            }
            [resource_type, ids, field] => Some(JsonPath::Field {
                resource_type: decode(resource_type),
                ids: parse_ids(ids)?,
                field: decode(field),
            }),
            [resource_type, ids, segment, field] if *segment == RELATIONSHIPS_SEGMENT => {
                Some(JsonPath::Relationship {
                    resource_type: decode(resource_type),
                    ids: parse_ids(ids)?,
                    field: decode(field),
                })
            }
            _ => None,
        };
        Ok(parsed)
    }
}

fn decode(segment: &str) -> String {
    urlencoding::decode(segment)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| segment.to_string())
}

fn parse_ids(segment: &str) -> JsonApiResult<PathIds> {
    let ids = PathIds::parse(segment);
    if ids.is_empty() {
        return Err(JsonApiError::bad_request(format!(
            "no resource id in path segment '{segment}'"
        )));
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::PathShape;

    fn shape(builder: &PathBuilder, path: &str) -> Option<PathShape> {
        builder.build(path).unwrap().map(|p| p.shape())
    }

    #[test]
    fn test_all_shapes() {
        let builder = PathBuilder::new();
        assert_eq!(shape(&builder, "/tasks"), Some(PathShape::Collection));
        assert_eq!(shape(&builder, "/tasks/"), Some(PathShape::Collection));
        assert_eq!(shape(&builder, "/tasks/1"), Some(PathShape::Resource));
        assert_eq!(shape(&builder, "/tasks/1/project"), Some(PathShape::Field));
        assert_eq!(
            shape(&builder, "/tasks/1/relationships/project"),
            Some(PathShape::Relationship)
        );
    }

    #[test]
    fn test_unmatched_paths() {
        let builder = PathBuilder::new();
        assert_eq!(shape(&builder, ""), None);
        assert_eq!(shape(&builder, "/tasks/1/project/tasks/2"), None);
        assert_eq!(shape(&builder, "/tasks/1/links/project"), None);
    }

    #[test]
    fn test_relationships_without_name_is_error() {
        let error = PathBuilder::new()
            .build("/tasks/1/relationships")
            .unwrap_err();
        assert!(matches!(error, JsonApiError::BadRequest { .. }));
    }

    #[test]
    fn test_empty_id_segment_is_error() {
        assert!(PathBuilder::new().build("/tasks/,/project").is_err());
    }

    #[test]
    fn test_prefix_handling() {
        let builder = PathBuilder::new().with_prefix("api/v1/");
        assert_eq!(builder.prefix(), Some("/api/v1"));
        assert_eq!(shape(&builder, "/api/v1/tasks"), Some(PathShape::Collection));
        assert_eq!(shape(&builder, "/api/v1"), None);
        assert_eq!(shape(&builder, "/api/v10/tasks"), None);
        assert_eq!(shape(&builder, "/tasks"), None);
    }

    #[test]
    fn test_query_string_is_ignored() {
        let path = PathBuilder::new()
            .build("/tasks/7?include=project")
            .unwrap()
            .unwrap();
        assert_eq!(path.single_id(), Some("7"));
    }

    #[test]
    fn test_multiple_ids() {
        let path = PathBuilder::new().build("/tasks/1,2,3").unwrap().unwrap();
        assert_eq!(path.ids().map(PathIds::len), Some(3));
    }
}
