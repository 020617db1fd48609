//! Per-request state handed to controllers.

use crate::mapper::DocumentMapper;
use http::Method;
use meridian_config::MeridianConfig;
use meridian_core::{
    Document, Entity, ImmutableWriteBehavior, InformationLookup, JsonApiError, JsonApiResult,
    QueryAdapter, RequestContext, ResourceField, ResourceInformation,
};
use meridian_extract::{JsonApiRequest, RequestBody};
use meridian_repository::{JsonApiResponse, RegistryEntry, ResourceRegistry};
use meridian_router::JsonPath;
use serde_json::Value;
use std::sync::Arc;

/// Engine switches that change controller behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchSettings {
    /// Accept attributes that are not part of the resource information.
    pub allow_dynamic_fields: bool,
    /// Fail or skip writes to fields that do not permit them.
    pub immutable_write_behavior: ImmutableWriteBehavior,
    /// Answer `404` instead of `data: null` for a missing single resource.
    pub return_404_on_null: bool,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            allow_dynamic_fields: false,
            immutable_write_behavior: ImmutableWriteBehavior::Fail,
            return_404_on_null: true,
        }
    }
}

impl DispatchSettings {
    /// Reads the settings from the `engine` section.
    #[must_use]
    pub fn from_config(config: &MeridianConfig) -> Self {
        Self {
            allow_dynamic_fields: config.engine.allow_dynamic_fields,
            immutable_write_behavior: config.engine.immutable_write_behavior,
            return_404_on_null: config.engine.return_404_on_null,
        }
    }
}

/// Everything a controller needs to serve one request.
///
/// The body is parsed on demand through [`RequestScope::document`], so
/// controllers that ignore the body never fail on it.
pub struct RequestScope {
    pub(crate) path: JsonPath,
    pub(crate) method: Method,
    pub(crate) registry: Arc<ResourceRegistry>,
    pub(crate) entry: RegistryEntry,
    pub(crate) field: Option<ResourceField>,
    pub(crate) query: QueryAdapter,
    pub(crate) request: JsonApiRequest,
    pub(crate) body: RequestBody,
    pub(crate) context: RequestContext,
    pub(crate) mapper: Arc<DocumentMapper>,
    pub(crate) settings: DispatchSettings,
}

impl std::fmt::Debug for RequestScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestScope")
            .field("path", &self.path)
            .field("method", &self.method)
            .field("resource_type", &self.entry.resource_type())
            .field("field", &self.field.as_ref().map(ResourceField::json_name))
            .field("request_id", &self.context.request_id())
            .finish_non_exhaustive()
    }
}

impl RequestScope {
    /// The parsed path.
    #[must_use]
    pub fn path(&self) -> &JsonPath {
        &self.path
    }

    /// The request method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The registry.
    #[must_use]
    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    /// Registry entry of the path's resource type.
    #[must_use]
    pub fn entry(&self) -> &RegistryEntry {
        &self.entry
    }

    /// Information of the path's resource type.
    #[must_use]
    pub fn information(&self) -> &ResourceInformation {
        self.entry.information()
    }

    /// Parsed query. For field paths it is rooted at the related type.
    #[must_use]
    pub fn query(&self) -> &QueryAdapter {
        &self.query
    }

    /// Request metadata.
    #[must_use]
    pub fn context(&self) -> &RequestContext {
        &self.context
    }

    /// Engine switches.
    #[must_use]
    pub fn settings(&self) -> DispatchSettings {
        self.settings
    }

    /// The relationship named by a field or relationship path.
    pub fn field(&self) -> JsonApiResult<&ResourceField> {
        self.field
            .as_ref()
            .ok_or_else(|| JsonApiError::internal("path has no relationship field"))
    }

    /// Registry entry of the type on the other side of the path's relationship.
    pub fn target_entry(&self) -> JsonApiResult<&RegistryEntry> {
        let field = self.field()?;
        let target = field.opposite_resource_type().ok_or_else(|| {
            JsonApiError::field_not_found(self.entry.resource_type(), field.json_name())
        })?;
        self.registry.get_entry(target)
    }

    /// Information of `resource_type`.
    pub fn information_of(&self, resource_type: &str) -> JsonApiResult<&ResourceInformation> {
        self.registry
            .information(resource_type)
            .ok_or_else(|| JsonApiError::not_registered(resource_type))
    }

    /// Parses the path ids into id values.
    pub fn ids(&self) -> JsonApiResult<Vec<Value>> {
        let Some(ids) = self.path.ids() else {
            return Ok(Vec::new());
        };
        let info = self.information();
        ids.iter()
            .map(|raw| info.parse_id_string(raw, self.registry.type_parser()))
            .collect()
    }

    /// Parses the single path id.
    pub fn single_id(&self) -> JsonApiResult<Value> {
        let raw = self.path.single_id().ok_or_else(|| {
            JsonApiError::bad_request(format!(
                "'{}' requires exactly one resource id",
                self.path
            ))
        })?;
        self.information()
            .parse_id_string(raw, self.registry.type_parser())
    }

    /// Parses the request body.
    ///
    /// Returns `Ok(None)` for an empty body.
    pub fn document(&self) -> JsonApiResult<Option<Document>> {
        self.body.extract(&self.request).map_err(Into::into)
    }

    /// Parses the request body, failing when it is empty.
    pub fn require_document(&self) -> JsonApiResult<Document> {
        self.document()?
            .ok_or_else(|| JsonApiError::bad_body("", "request body is required"))
    }

    /// Loads the single resource addressed by the path; `404` when missing.
    pub async fn load_source(&self) -> JsonApiResult<Entity> {
        let id = self.single_id()?;
        let query = QueryAdapter::empty(self.entry.resource_type());
        self.entry
            .repository()
            .find_one(&id, &query)
            .await?
            .into_single()
            .ok_or_else(|| {
                JsonApiError::resource_not_found(
                    self.entry.resource_type(),
                    self.information().to_id_string(&id),
                )
            })
    }

    /// Maps a repository result into a document.
    pub async fn to_document(&self, response: &JsonApiResponse) -> JsonApiResult<Document> {
        self.mapper
            .to_document(response, &self.query, &self.context)
            .await
    }

    /// The document mapper.
    #[must_use]
    pub fn mapper(&self) -> &DocumentMapper {
        &self.mapper
    }
}
