//! Turning request resource objects into entity writes.
//!
//! Writes happen in two steps. [`WritePlan::build`] checks every attribute
//! and relationship of the body against the resource information and parses
//! all ids without touching a repository. [`WritePlan::apply`] then writes
//! the plan into an entity, loading related objects for relationships that
//! store nested objects.

use crate::DispatchSettings;
use meridian_core::{
    Entity, ImmutableWriteBehavior, InformationLookup, JsonApiError, JsonApiResult, QueryAdapter,
    RelationStorage, RelationshipData, Resource, ResourceField, ResourceIdentifier,
    ResourceInformation, TypeParser, WriteOperation,
};
use meridian_repository::ResourceRegistry;
use serde_json::Value;
use std::collections::HashMap;

/// A checked set of writes for one resource.
#[derive(Debug, Default)]
pub(crate) struct WritePlan {
    id: Option<Value>,
    attributes: Vec<(String, Value)>,
    relationships: Vec<RelationshipWrite>,
}

#[derive(Debug)]
struct RelationshipWrite {
    field: ResourceField,
    ids: Vec<Value>,
}

impl WritePlan {
    /// Checks `resource` for `operation` on the type described by `info`.
    pub(crate) fn build(
        resource: &Resource,
        info: &ResourceInformation,
        lookup: &dyn InformationLookup,
        parser: &TypeParser,
        operation: WriteOperation,
        settings: DispatchSettings,
    ) -> JsonApiResult<Self> {
        let mut plan = Self::default();

        if resource.resource_type != info.resource_type() {
            return Err(JsonApiError::bad_body(
                "/data/type",
                format!(
                    "expected type '{}', got '{}'",
                    info.resource_type(),
                    resource.resource_type
                ),
            ));
        }

        if operation == WriteOperation::Post {
            if let Some(raw) = &resource.id {
                if check_access(info.id_field(), operation, settings)? {
                    plan.id = Some(info.parse_id_string(raw, parser)?);
                }
            }
        }

        for (name, value) in &resource.attributes {
            match info.find_field_by_name(name) {
                Some(field) if field.is_id() || field.is_relationship() => {
                    return Err(JsonApiError::bad_body(
                        format!("/data/attributes/{name}"),
                        format!("'{name}' is not an attribute of '{}'", info.resource_type()),
                    ));
                }
                Some(field) => {
                    if check_access(field, operation, settings)? {
                        plan.attributes
                            .push((field.underlying_name().to_string(), value.clone()));
                    }
                }
                None if settings.allow_dynamic_fields => {
                    plan.attributes.push((name.clone(), value.clone()));
                }
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
            if !check_access(field, operation, settings)? {
                continue;
            }
            let pointer = format!("/data/relationships/{name}/data");
            let ids = parse_linkage(data, field, lookup, parser, &pointer)?;
            plan.relationships.push(RelationshipWrite {
                field: field.clone(),
                ids,
            });
        }

        Ok(plan)
    }

    /// The client-supplied id, for creation.
    pub(crate) fn id(&self) -> Option<&Value> {
        self.id.as_ref()
    }

    /// Writes the plan into `entity`.
    pub(crate) async fn apply(
        self,
        entity: &mut Entity,
        info: &ResourceInformation,
        registry: &ResourceRegistry,
    ) -> JsonApiResult<()> {
        if let Some(id) = self.id {
            entity.set(info.id_field().underlying_name(), id);
        }
        for (name, value) in self.attributes {
            entity.set(name, value);
        }
        for write in self.relationships {
            let values = match write.field.storage() {
                RelationStorage::Id => write.ids,
                RelationStorage::Object => load_targets(&write.field, &write.ids, registry).await?,
            };
            entity.set_relation(&write.field, values);
        }
        Ok(())
    }
}

/// Whether a write to `field` goes ahead; `Err` when it is forbidden and
/// forbidden writes fail.
fn check_access(
    field: &ResourceField,
    operation: WriteOperation,
    settings: DispatchSettings,
) -> JsonApiResult<bool> {
    if field.access().allows(operation) {
        return Ok(true);
    }
    match settings.immutable_write_behavior {
        ImmutableWriteBehavior::Fail => {
            Err(JsonApiError::forbidden_field(field.json_name(), operation))
        }
        ImmutableWriteBehavior::Ignore => {
            tracing::debug!(field = field.json_name(), %operation, "ignoring write to protected field");
            Ok(false)
        }
    }
}

/// Checks that `field` may be changed through a relationship endpoint.
pub(crate) fn check_relationship_access(
    field: &ResourceField,
    settings: DispatchSettings,
) -> JsonApiResult<bool> {
    check_access(field, WriteOperation::Patch, settings)
}

/// Parses relationship linkage into target ids.
pub(crate) fn parse_linkage(
    data: &RelationshipData,
    field: &ResourceField,
    lookup: &dyn InformationLookup,
    parser: &TypeParser,
    pointer: &str,
) -> JsonApiResult<Vec<Value>> {
    match (data, field.is_collection()) {
        (RelationshipData::Many(identifiers), true) => identifiers
            .iter()
            .map(|identifier| parse_identifier(identifier, field, lookup, parser, pointer))
            .collect(),
        (RelationshipData::One(identifier), false) => identifier
            .iter()
            .map(|identifier| parse_identifier(identifier, field, lookup, parser, pointer))
            .collect(),
        (RelationshipData::Many(_), false) => Err(JsonApiError::bad_body(
            pointer,
            format!("'{}' is a to-one relationship", field.json_name()),
        )),
        (RelationshipData::One(_), true) => Err(JsonApiError::bad_body(
            pointer,
            format!("'{}' is a to-many relationship", field.json_name()),
        )),
    }
}

/// Parses resource identifiers given as resource objects, as in
/// relationship endpoint bodies.
pub(crate) fn parse_identifiers<'a>(
    resources: impl IntoIterator<Item = &'a Resource>,
    field: &ResourceField,
    lookup: &dyn InformationLookup,
    parser: &TypeParser,
) -> JsonApiResult<Vec<Value>> {
    resources
        .into_iter()
        .map(|resource| {
            let identifier = resource.identifier().ok_or_else(|| {
                JsonApiError::bad_body("/data", "resource identifier without id")
            })?;
            parse_identifier(&identifier, field, lookup, parser, "/data")
        })
        .collect()
}

fn parse_identifier(
    identifier: &ResourceIdentifier,
    field: &ResourceField,
    lookup: &dyn InformationLookup,
    parser: &TypeParser,
    pointer: &str,
) -> JsonApiResult<Value> {
    let target = field
        .opposite_resource_type()
        .ok_or_else(|| JsonApiError::internal("relationship without target type"))?;
    if identifier.resource_type != target {
        return Err(JsonApiError::bad_body(
            pointer,
            format!(
                "'{}' expects '{target}', got '{}'",
                field.json_name(),
                identifier.resource_type
            ),
        ));
    }
    let info = lookup
        .information(target)
        .ok_or_else(|| JsonApiError::not_registered(target))?;
    info.parse_id_string(&identifier.id, parser)
}

/// Loads the objects behind `ids`, in the order of `ids`.
async fn load_targets(
    field: &ResourceField,
    ids: &[Value],
    registry: &ResourceRegistry,
) -> JsonApiResult<Vec<Value>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let target = field
        .opposite_resource_type()
        .ok_or_else(|| JsonApiError::internal("relationship without target type"))?;
    let entry = registry.get_entry(target)?;
    let info = entry.information();
    let response = entry
        .repository()
        .find_all_by_ids(ids, &QueryAdapter::empty(target))
        .await?;

    let mut found: HashMap<String, Entity> = response
        .into_entities()
        .into_iter()
        .filter_map(|entity| {
            let id = info.entity_id(&entity).map(|id| info.to_id_string(id))?;
            Some((id, entity))
        })
        .collect();

    ids.iter()
        .map(|id| {
            let key = info.to_id_string(id);
            found
                .remove(&key)
                .map(|entity| Value::Object(entity.into_map()))
                .ok_or_else(|| JsonApiError::resource_not_found(target, key))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{registry, TASKS};
    use meridian_core::Relationship;
    use serde_json::json;

    fn task(attributes: Value) -> Resource {
        let mut resource = Resource::new("tasks", None);
        if let Value::Object(map) = attributes {
            resource.attributes = map;
        }
        resource
    }

    fn plan(resource: &Resource, operation: WriteOperation, settings: DispatchSettings) -> JsonApiResult<WritePlan> {
        let (registry, _) = registry();
        let info = registry.get_entry(TASKS).unwrap().information().clone();
        WritePlan::build(
            resource,
            &info,
            &registry,
            registry.type_parser(),
            operation,
            settings,
        )
    }

    #[test]
    fn test_wire_names_become_member_names() {
        let resource = task(json!({"name": "docs", "dueDate": "2026-01-01"}));
        let plan = plan(&resource, WriteOperation::Post, DispatchSettings::default()).unwrap();
        let names: Vec<&str> = plan.attributes.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["name", "due_date"]);
    }

    #[test]
    fn test_forbidden_write_fails() {
        let resource = task(json!({"name": "docs", "createdBy": "eve"}));
        let error = plan(&resource, WriteOperation::Patch, DispatchSettings::default()).unwrap_err();
        assert!(matches!(
            error,
            JsonApiError::ForbiddenFieldWrite { ref field, operation: WriteOperation::Patch } if field == "createdBy"
        ));
    }

    #[test]
    fn test_forbidden_write_ignored() {
        let settings = DispatchSettings {
            immutable_write_behavior: ImmutableWriteBehavior::Ignore,
            ..DispatchSettings::default()
        };
        let resource = task(json!({"name": "docs", "createdBy": "eve"}));
        let plan = plan(&resource, WriteOperation::Patch, settings).unwrap();
        assert_eq!(plan.attributes.len(), 1);
    }

    #[test]
    fn test_unknown_attribute() {
        let resource = task(json!({"color": "red"}));
        let error = plan(&resource, WriteOperation::Post, DispatchSettings::default()).unwrap_err();
        assert!(matches!(error, JsonApiError::ResourceFieldNotFound { .. }));

        let settings = DispatchSettings {
            allow_dynamic_fields: true,
            ..DispatchSettings::default()
        };
        let plan = plan(&resource, WriteOperation::Post, settings).unwrap();
        assert_eq!(plan.attributes[0].0, "color");
    }

    #[test]
    fn test_wrong_type_is_rejected() {
        let resource = Resource::new("projects", None);
        let error = plan(&resource, WriteOperation::Post, DispatchSettings::default()).unwrap_err();
        let data = error.to_error_data();
        assert_eq!(
            data.source.and_then(|s| s.pointer).as_deref(),
            Some("/data/type")
        );
    }

    #[test]
    fn test_linkage_type_and_cardinality() {
        let mut resource = task(json!({}));
        resource.relationships.insert(
            "tags".into(),
            Relationship {
                data: Some(RelationshipData::Many(vec![ResourceIdentifier::new("projects", "1")])),
                links: None,
                meta: None,
            },
        );
        assert!(plan(&resource, WriteOperation::Post, DispatchSettings::default()).is_err());

        resource.relationships.insert(
            "tags".into(),
            Relationship {
                data: Some(RelationshipData::One(Some(ResourceIdentifier::new("tags", "1")))),
                links: None,
                meta: None,
            },
        );
        assert!(plan(&resource, WriteOperation::Post, DispatchSettings::default()).is_err());

        resource.relationships.insert(
            "tags".into(),
            Relationship {
                data: Some(RelationshipData::Many(vec![
                    ResourceIdentifier::new("tags", "1"),
                    ResourceIdentifier::new("tags", "2"),
                ])),
                links: None,
                meta: None,
            },
        );
        let plan = plan(&resource, WriteOperation::Post, DispatchSettings::default()).unwrap();
        assert_eq!(plan.relationships[0].ids, vec![json!(1), json!(2)]);
    }

    #[tokio::test]
    async fn test_apply_loads_nested_objects() {
        let (registry, _) = registry();
        let info = registry.get_entry(TASKS).unwrap().information().clone();
        let mut resource = task(json!({"name": "docs"}));
        resource.relationships.insert(
            "project".into(),
            Relationship {
                data: Some(RelationshipData::One(Some(ResourceIdentifier::new("projects", "7")))),
                links: None,
                meta: None,
            },
        );
        let plan = WritePlan::build(
            &resource,
            &info,
            &registry,
            registry.type_parser(),
            WriteOperation::Post,
            DispatchSettings::default(),
        )
        .unwrap();

        let mut entity = Entity::new();
        plan.apply(&mut entity, &info, &registry).await.unwrap();
        assert_eq!(entity.get("name"), Some(&json!("docs")));
        let project = entity.get("project").unwrap();
        assert_eq!(project["id"], json!(7));
        assert_eq!(project["name"], json!("web"));
    }

    #[tokio::test]
    async fn test_apply_missing_target() {
        let (registry, _) = registry();
        let info = registry.get_entry(TASKS).unwrap().information().clone();
        let mut resource = task(json!({}));
        resource.relationships.insert(
            "project".into(),
            Relationship {
                data: Some(RelationshipData::One(Some(ResourceIdentifier::new("projects", "99")))),
                links: None,
                meta: None,
            },
        );
        let plan = WritePlan::build(
            &resource,
            &info,
            &registry,
            registry.type_parser(),
            WriteOperation::Post,
            DispatchSettings::default(),
        )
        .unwrap();
        let error = plan.apply(&mut Entity::new(), &info, &registry).await.unwrap_err();
        assert!(matches!(error, JsonApiError::ResourceNotFound { .. }));
    }
}
