use super::{
    AccessorKind, DeclaredType, FieldAnnotations, RelationStorage, ResourceDescriptor,
    ResourceField, ResourceFieldAccess, ResourceFieldType, ResourceInformation,
};
use crate::error::{JsonApiError, JsonApiResult};
use crate::naming::{property_name_from_accessor, property_name_from_setter};
use crate::parser::ValueType;
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};

/// Builds [`ResourceInformation`] from descriptors.
///
/// The builder knows which Rust type names are resources (and under which
/// resource type), which is what decides whether a field is a relationship.
///
/// # Example
///
/// ```
/// use meridian_core::{FieldDescriptor, ResourceDescriptor, ResourceInformationBuilder};
///
/// let project = ResourceDescriptor::new("projects", "Project")
///     .field(FieldDescriptor::id("id", "u64"));
/// let task = ResourceDescriptor::new("tasks", "Task")
///     .field(FieldDescriptor::id("id", "u64"))
///     .field(FieldDescriptor::new("name", "String"))
///     .field(FieldDescriptor::new("project", "Option<Project>"));
///
/// let builder = ResourceInformationBuilder::new()
///     .register(&project)
///     .register(&task);
/// let info = builder.build(&task).unwrap();
///
/// assert_eq!(info.attribute_fields().len(), 1);
/// assert_eq!(
///     info.find_relationship_field_by_name("project")
///         .and_then(|f| f.opposite_resource_type()),
///     Some("projects")
/// );
/// ```
#[derive(Debug, Clone, Default)]
pub struct ResourceInformationBuilder {
    known_types: HashMap<String, String>,
}

struct Candidate {
    underlying_name: String,
    declared_type: DeclaredType,
    annotations: FieldAnnotations,
    from_field: bool,
}

impl ResourceInformationBuilder {
    /// Creates a builder that knows no resource types.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares that Rust type `type_name` is the resource `resource_type`.
    #[must_use]
    pub fn with_resource_type(
        mut self,
        type_name: impl Into<String>,
        resource_type: impl Into<String>,
    ) -> Self {
        self.known_types
            .insert(type_name.into(), resource_type.into());
        self
    }

    /// Declares the resource type of a descriptor; abstract descriptors are skipped.
    #[must_use]
    pub fn register(self, descriptor: &ResourceDescriptor) -> Self {
        match descriptor.resource_type() {
            Some(resource_type) => {
                let resource_type = resource_type.to_string();
                self.with_resource_type(descriptor.type_name(), resource_type)
            }
            None => self,
        }
    }

    /// Resource type registered for a Rust type name.
    #[must_use]
    pub fn known_resource_type(&self, type_name: &str) -> Option<&str> {
        self.known_types.get(type_name).map(String::as_str)
    }

    /// Builds the information for `descriptor`.
    ///
    /// Fails with [`JsonApiError::ResourceIdNotFound`] when no member is marked
    /// as id and with [`JsonApiError::InvalidResource`] on any other
    /// inconsistency.
    pub fn build(&self, descriptor: &ResourceDescriptor) -> JsonApiResult<ResourceInformation> {
        let type_name = descriptor.type_name();
        let resource_type = descriptor.resource_type().ok_or_else(|| {
            JsonApiError::invalid_resource(type_name, "no resource type declared")
        })?;

        let mut id_field = None;
        let mut attribute_fields = Vec::new();
        let mut relationship_fields = Vec::new();
        let mut json_names = HashSet::new();

        for candidate in collect_candidates(descriptor).into_values() {
            if candidate.annotations.ignore {
                continue;
            }
            let field = self.classify(type_name, candidate)?;
            if !json_names.insert(field.json_name.clone()) {
                return Err(JsonApiError::invalid_resource(
                    type_name,
                    format!("duplicate field name '{}'", field.json_name),
                ));
            }
            match field.field_type {
                ResourceFieldType::Id => {
                    if id_field.replace(field).is_some() {
                        return Err(JsonApiError::invalid_resource(
                            type_name,
                            "more than one id field",
                        ));
                    }
                }
                ResourceFieldType::Attribute => attribute_fields.push(field),
                ResourceFieldType::Relationship => relationship_fields.push(field),
            }
        }

        let id_field = id_field.ok_or_else(|| JsonApiError::ResourceIdNotFound {
            type_name: type_name.to_string(),
        })?;

        Ok(ResourceInformation {
            resource_type: resource_type.to_string(),
            type_name: type_name.to_string(),
            id_field,
            attribute_fields,
            relationship_fields,
        })
    }

    fn classify(&self, type_name: &str, candidate: Candidate) -> JsonApiResult<ResourceField> {
        let Candidate {
            underlying_name,
            declared_type,
            annotations,
            ..
        } = candidate;

        let (field_type, opposite, storage) = if annotations.id {
            (ResourceFieldType::Id, None, RelationStorage::Object)
        } else if let Some(target) = &annotations.relation_target {
            let opposite = self
                .known_types
                .get(target)
                .cloned()
                .or_else(|| {
                    self.known_types
                        .values()
                        .find(|rt| *rt == target)
                        .cloned()
                })
                .ok_or_else(|| {
                    JsonApiError::invalid_resource(
                        type_name,
                        format!("field '{underlying_name}' refers to unknown resource '{target}'"),
                    )
                })?;
            (
                ResourceFieldType::Relationship,
                Some(opposite),
                RelationStorage::Id,
            )
        } else if let Some(opposite) = self.known_types.get(declared_type.type_name()) {
            (
                ResourceFieldType::Relationship,
                Some(opposite.clone()),
                RelationStorage::Object,
            )
        } else {
            (ResourceFieldType::Attribute, None, RelationStorage::Object)
        };

        let mut access = ResourceFieldAccess::default();
        if field_type == ResourceFieldType::Id {
            access.patchable = false;
        }
        if annotations.read_only {
            access.postable = false;
            access.patchable = false;
        }
        if annotations.immutable {
            access.patchable = false;
        }
        if let Some(postable) = annotations.postable {
            access.postable = postable;
        }
        if let Some(patchable) = annotations.patchable {
            access.patchable = patchable;
        }
        if let Some(sortable) = annotations.sortable {
            access.sortable = sortable;
        }
        if let Some(filterable) = annotations.filterable {
            access.filterable = filterable;
        }

        let value_type = match &annotations.parser {
            Some(parser) => ValueType::Custom(parser.clone()),
            None => declared_type.value_type(),
        };

        Ok(ResourceField {
            json_name: annotations
                .json_name
                .clone()
                .unwrap_or_else(|| underlying_name.clone()),
            underlying_name,
            field_type,
            declared_type,
            value_type,
            opposite_resource_type: opposite,
            storage,
            access,
            lookup_include: annotations.lookup_include,
            include_by_default: annotations.include_by_default,
        })
    }
}

// Walks the descriptor chain most-derived first. A field shadows fields of the
// same name further up; accessor annotations merge into the field they name.
fn collect_candidates(descriptor: &ResourceDescriptor) -> IndexMap<String, Candidate> {
    let mut candidates: IndexMap<String, Candidate> = IndexMap::new();

    for level in descriptor.chain() {
        for field in level.fields() {
            match candidates.get_mut(field.name()) {
                Some(existing) if existing.from_field => {}
                Some(existing) => {
                    existing.annotations.merge(field.annotations());
                    existing.declared_type = field.declared_type().clone();
                    existing.from_field = true;
                }
                None => {
                    candidates.insert(
                        field.name().to_string(),
                        Candidate {
                            underlying_name: field.name().to_string(),
                            declared_type: field.declared_type().clone(),
                            annotations: field.annotations().clone(),
                            from_field: true,
                        },
                    );
                }
            }
        }

        for accessor in level.accessors() {
            let property = match accessor.kind() {
                AccessorKind::Getter => property_name_from_accessor(
                    accessor.name(),
                    accessor.declared_type().is_boolean(),
                ),
                AccessorKind::Setter => property_name_from_setter(accessor.name()),
            };
            let Some(property) = property else {
                continue;
            };
            match candidates.get_mut(&property) {
                Some(existing) => existing.annotations.merge(accessor.annotations()),
                None if accessor.kind() == AccessorKind::Getter => {
                    candidates.insert(
                        property.clone(),
                        Candidate {
                            underlying_name: property,
                            declared_type: accessor.declared_type().clone(),
                            annotations: accessor.annotations().clone(),
                            from_field: false,
                        },
                    );
                }
                None => {}
            }
        }
    }

    candidates
}
