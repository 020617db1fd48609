//! Mapping repository results into JSON:API documents.
//!
//! [`DocumentMapper::to_document`] renders the primary data, resolves the
//! `included` section over the requested include paths and adds meta and
//! links:
//!
//! - attributes and relationships use wire names and honor sparse fieldsets
//! - relationship linkage comes from the entity: nested objects contribute
//!   their id, bare values are ids, `null` renders as empty linkage and a
//!   missing member renders links only
//! - every resource gets a `self` link, every relationship `self` and
//!   `related` links
//! - the total of a collection result is reported as
//!   `meta.totalResourceCount`; offset paging adds `first`, `prev` and `next`
//!   links

mod include;
mod links;

use self::include::IncludeResolver;
use self::links::{paging_links, LinkBuilder};
use meridian_config::MeridianConfig;
use meridian_core::{
    Document, Entity, JsonApiError, JsonApiResult, LookupIncludeBehavior, QueryAdapter,
    QuerySpec, RelationStorage, RelationValue, Relationship, RelationshipData, RequestContext, Resource,
    ResourceField, ResourceIdentifier, ResourceInformation, TypeParser,
};
use meridian_repository::{JsonApiResponse, ResourceRegistry};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Meta member carrying the number of matches before paging.
pub const TOTAL_RESOURCE_COUNT: &str = "totalResourceCount";

/// Renders repository results as documents.
#[derive(Debug, Clone)]
pub struct DocumentMapper {
    registry: Arc<ResourceRegistry>,
    base_url: Option<String>,
    path_prefix: Option<String>,
    lookup_behavior: LookupIncludeBehavior,
    allow_dynamic_fields: bool,
}

impl DocumentMapper {
    /// Creates a mapper with relative links.
    #[must_use]
    pub fn new(registry: Arc<ResourceRegistry>) -> Self {
        Self {
            registry,
            base_url: None,
            path_prefix: None,
            lookup_behavior: LookupIncludeBehavior::default(),
            allow_dynamic_fields: false,
        }
    }

    /// Creates a mapper from the `engine` section.
    #[must_use]
    pub fn from_config(registry: Arc<ResourceRegistry>, config: &MeridianConfig) -> Self {
        let engine = &config.engine;
        let mut mapper = Self::new(registry)
            .with_lookup_behavior(engine.lookup_behavior)
            .with_dynamic_fields(engine.allow_dynamic_fields);
        mapper.base_url.clone_from(&engine.base_url);
        mapper.path_prefix.clone_from(&engine.path_prefix);
        mapper
    }

    /// Base URL for links when the request context carries none.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Path prefix placed between base URL and resource paths.
    #[must_use]
    pub fn with_path_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.path_prefix = Some(prefix.into());
        self
    }

    /// Lookup behavior for relationships that do not declare one.
    #[must_use]
    pub fn with_lookup_behavior(mut self, behavior: LookupIncludeBehavior) -> Self {
        self.lookup_behavior = behavior;
        self
    }

    /// Renders entity members unknown to the resource information as attributes.
    #[must_use]
    pub fn with_dynamic_fields(mut self, allow: bool) -> Self {
        self.allow_dynamic_fields = allow;
        self
    }

    /// The registry.
    #[must_use]
    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    /// Default lookup behavior.
    #[must_use]
    pub fn lookup_behavior(&self) -> LookupIncludeBehavior {
        self.lookup_behavior
    }

    fn link_builder(&self, context: &RequestContext) -> LinkBuilder {
        LinkBuilder::new(
            context.base_url().or(self.base_url.as_deref()),
            self.path_prefix.as_deref(),
        )
    }

    /// Renders `response` as a document.
    ///
    /// # Errors
    ///
    /// Fails when a type is not registered or a relationship lookup fails.
    pub async fn to_document(
        &self,
        response: &JsonApiResponse,
        query: &QueryAdapter,
        context: &RequestContext,
    ) -> JsonApiResult<Document> {
        let resource_type = response.resource_type();
        let info = self.information(resource_type)?;
        let links = self.link_builder(context);
        let spec = query.spec_for(resource_type);

        let entities: Vec<&Entity> = response.entities().collect();
        let mut primaries = entities
            .iter()
            .map(|entity| self.to_resource(info, entity, &spec, &links))
            .collect::<JsonApiResult<Vec<_>>>()?;

        let included = IncludeResolver::new(self, query, &links)
            .resolve(resource_type, &entities, &mut primaries)
            .await?;

        let mut document = if response.is_collection() {
            Document::collection(primaries)
        } else {
            primaries.pop().map_or_else(Document::null, Document::single)
        };
        document.included = included;

        let mut meta = response.meta().cloned().unwrap_or_default();
        if let Some(total) = response.total() {
            meta.insert(TOTAL_RESOURCE_COUNT.to_string(), Value::from(total));
        }
        document.meta = (!meta.is_empty()).then_some(meta);

        let base_url = context.base_url().or(self.base_url.as_deref());
        document.links = response
            .links()
            .cloned()
            .or_else(|| paging_links(base_url, context, query, response.total()))
            .filter(|l| !l.is_empty());

        tracing::debug!(
            resource_type,
            included = document.included.len(),
            "document mapped"
        );
        Ok(document)
    }

    /// Renders the linkage of one relationship, as served by relationship
    /// endpoints.
    ///
    /// # Errors
    ///
    /// Fails when the target type is not registered.
    pub fn to_relationship_document(
        &self,
        source_type: &str,
        source_id: &str,
        field: &ResourceField,
        response: &JsonApiResponse,
        context: &RequestContext,
    ) -> JsonApiResult<Document> {
        let target_type = response.resource_type();
        let target_info = self.information(target_type)?;
        let identifiers: Vec<Resource> = response
            .entities()
            .filter_map(|entity| target_info.entity_id(entity))
            .map(|id| Resource::new(target_type, Some(target_info.to_id_string(id))))
            .collect();

        let mut document = if field.is_collection() {
            Document::collection(identifiers)
        } else {
            identifiers
                .into_iter()
                .next()
                .map_or_else(Document::null, Document::single)
        };
        document.links = Some(self.link_builder(context).relationship_links(
            source_type,
            source_id,
            field.json_name(),
        ));
        if let Some(total) = response.total() {
            let mut meta = Map::new();
            meta.insert(TOTAL_RESOURCE_COUNT.to_string(), Value::from(total));
            document.meta = Some(meta);
        }
        Ok(document)
    }

    /// Renders one entity.
    pub(crate) fn to_resource(
        &self,
        info: &ResourceInformation,
        entity: &Entity,
        spec: &QuerySpec,
        links: &LinkBuilder,
    ) -> JsonApiResult<Resource> {
        let id = info.entity_id(entity).map(|id| info.to_id_string(id));
        let mut resource = Resource::new(info.resource_type(), id.clone());

        for field in info.attribute_fields() {
            if !spec.is_field_included(field.underlying_name()) {
                continue;
            }
            if let Some(value) = entity.get(field.underlying_name()) {
                resource
                    .attributes
                    .insert(field.json_name().to_string(), value.clone());
            }
        }
        if self.allow_dynamic_fields {
            for (name, value) in entity.as_map() {
                if info.find_field_by_underlying_name(name).is_none() && spec.is_field_included(name) {
                    resource.attributes.insert(name.clone(), value.clone());
                }
            }
        }

        for field in info.relationship_fields() {
            if !spec.is_field_included(field.underlying_name()) {
                continue;
            }
            let target_type = field.opposite_resource_type().ok_or_else(|| {
                JsonApiError::internal(format!(
                    "relationship '{}' has no target type",
                    field.json_name()
                ))
            })?;
            let target_info = self.information(target_type)?;
            let data = match entity.relation(field) {
                RelationValue::Absent => None,
                value => {
                    let identifiers = value
                        .target_ids(target_info)
                        .iter()
                        .map(|id| ResourceIdentifier::new(target_type, target_info.to_id_string(id)))
                        .collect::<Vec<_>>();
                    Some(if field.is_collection() {
                        RelationshipData::Many(identifiers)
                    } else {
                        RelationshipData::One(identifiers.into_iter().next())
                    })
                }
            };
            let relationship_links = id
                .as_deref()
                .map(|id| links.relationship_links(info.resource_type(), id, field.json_name()));
            resource.relationships.insert(
                field.json_name().to_string(),
                Relationship {
                    data,
                    links: relationship_links,
                    meta: None,
                },
            );
        }

        resource.links = id
            .as_deref()
            .map(|id| links.resource_links(info.resource_type(), id));
        Ok(resource)
    }

    /// Reads a resource object back into an entity.
    ///
    /// Attributes and linkage are stored under their member names.
    /// Relationships storing nested objects receive objects holding only
    /// the id.
    ///
    /// # Errors
    ///
    /// Fails for unregistered types, unknown attributes (unless dynamic
    /// fields are allowed), unknown relationships and unparsable ids.
    pub fn to_entity(&self, resource: &Resource) -> JsonApiResult<Entity> {
        let info = self.information(&resource.resource_type)?;
        let parser: &TypeParser = self.registry.type_parser();
        let mut entity = Entity::new();

        if let Some(raw) = &resource.id {
            entity.set(
                info.id_field().underlying_name(),
                info.parse_id_string(raw, parser)?,
            );
        }

        for (name, value) in &resource.attributes {
            match info.find_attribute_field_by_name(name) {
                Some(field) => entity.set(field.underlying_name(), value.clone()),
                None if self.allow_dynamic_fields => entity.set(name.clone(), value.clone()),
                None => return Err(JsonApiError::field_not_found(info.resource_type(), name)),
            }
        }

        for (name, relationship) in &resource.relationships {
            let field = info
                .find_relationship_field_by_name(name)
                .ok_or_else(|| JsonApiError::field_not_found(info.resource_type(), name))?;
            let Some(data) = &relationship.data else {
                continue;
            };
            let target_type = field.opposite_resource_type().unwrap_or_default();
            let target_info = self.information(target_type)?;
            let values = data
                .identifiers()
                .into_iter()
                .map(|identifier| {
                    let id = target_info.parse_id_string(&identifier.id, parser)?;
                    Ok(match field.storage() {
                        RelationStorage::Id => id,
                        RelationStorage::Object => {
                            let mut nested = Map::new();
                            nested.insert(target_info.id_field().underlying_name().to_string(), id);
                            Value::Object(nested)
                        }
                    })
                })
                .collect::<JsonApiResult<Vec<_>>>()?;
            entity.set_relation(field, values);
        }
        Ok(entity)
    }
}
