//! Resource information model.
//!
//! [`ResourceInformation`] is the per-type metadata the framework works from:
//! which member is the id, which members are attributes, which are
//! relationships to other resource types, and what a client may do with each
//! of them. It is built from a [`ResourceDescriptor`] by
//! [`ResourceInformationBuilder`] and never changes afterwards.

mod builder;
mod descriptor;

pub use builder::ResourceInformationBuilder;
pub use descriptor::{
    AccessorDescriptor, AccessorKind, DeclaredType, FieldAnnotations, FieldDescriptor,
    ResourceDescriptor,
};

use crate::entity::Entity;
use crate::error::{JsonApiResult, WriteOperation};
use crate::parser::{TypeParser, ValueType};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Role of a field within a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceFieldType {
    /// The resource id.
    Id,
    /// A plain attribute.
    Attribute,
    /// A relationship to another resource type.
    Relationship,
}

/// Number of related resources a relationship holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cardinality {
    /// At most one.
    One,
    /// Any number.
    Many,
}

/// How the owning entity stores a relationship value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationStorage {
    /// Nested related objects.
    Object,
    /// Bare related ids.
    Id,
}

/// When the mapper asks a relationship repository for related resources.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupIncludeBehavior {
    /// Look up only when the entity carries no value for the relationship.
    #[default]
    WhenNull,
    /// Always look up, ignoring the value on the entity.
    Always,
    /// Never look up; only values carried by the entity are used.
    Never,
}

/// What happens when a write touches a field that does not permit it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImmutableWriteBehavior {
    /// Reject the request.
    #[default]
    Fail,
    /// Drop the write and continue.
    Ignore,
}

/// Access flags of a field. All flags default to `true`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceFieldAccess {
    /// May be set on creation.
    pub postable: bool,
    /// May be changed on update.
    pub patchable: bool,
    /// May be used in `sort`.
    pub sortable: bool,
    /// May be used in `filter`.
    pub filterable: bool,
}

impl Default for ResourceFieldAccess {
    fn default() -> Self {
        Self::new(true, true, true, true)
    }
}

impl ResourceFieldAccess {
    /// Creates access flags.
    #[must_use]
    pub const fn new(postable: bool, patchable: bool, sortable: bool, filterable: bool) -> Self {
        Self {
            postable,
            patchable,
            sortable,
            filterable,
        }
    }

    /// Whether the field may be written by `operation`.
    #[must_use]
    pub const fn allows(&self, operation: WriteOperation) -> bool {
        match operation {
            WriteOperation::Post => self.postable,
            WriteOperation::Patch => self.patchable,
        }
    }
}

/// A field of a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceField {
    underlying_name: String,
    json_name: String,
    field_type: ResourceFieldType,
    declared_type: DeclaredType,
    value_type: ValueType,
    opposite_resource_type: Option<String>,
    storage: RelationStorage,
    access: ResourceFieldAccess,
    lookup_include: Option<LookupIncludeBehavior>,
    include_by_default: bool,
}

impl ResourceField {
    /// Name of the member in the entity.
    #[must_use]
    pub fn underlying_name(&self) -> &str {
        &self.underlying_name
    }

    /// Name on the wire.
    #[must_use]
    pub fn json_name(&self) -> &str {
        &self.json_name
    }

    /// Field role.
    #[must_use]
    pub fn field_type(&self) -> ResourceFieldType {
        self.field_type
    }

    /// Whether this is the id field.
    #[must_use]
    pub fn is_id(&self) -> bool {
        self.field_type == ResourceFieldType::Id
    }

    /// Whether this is a relationship field.
    #[must_use]
    pub fn is_relationship(&self) -> bool {
        self.field_type == ResourceFieldType::Relationship
    }

    /// Declared type.
    #[must_use]
    pub fn declared_type(&self) -> &DeclaredType {
        &self.declared_type
    }

    /// Value type used for parsing ids and filter values.
    #[must_use]
    pub fn value_type(&self) -> &ValueType {
        &self.value_type
    }

    /// Cardinality; attributes report theirs as well.
    #[must_use]
    pub fn cardinality(&self) -> Cardinality {
        if self.declared_type.is_multi() {
            Cardinality::Many
        } else {
            Cardinality::One
        }
    }

    /// Whether the field is multi-valued.
    #[must_use]
    pub fn is_collection(&self) -> bool {
        self.cardinality() == Cardinality::Many
    }

    /// Resource type on the other side of a relationship.
    #[must_use]
    pub fn opposite_resource_type(&self) -> Option<&str> {
        self.opposite_resource_type.as_deref()
    }

    /// How the owning entity stores the relationship value.
    #[must_use]
    pub fn storage(&self) -> RelationStorage {
        self.storage
    }

    /// Access flags.
    #[must_use]
    pub fn access(&self) -> ResourceFieldAccess {
        self.access
    }

    /// Lookup behavior, `None` to use the engine default.
    #[must_use]
    pub fn lookup_include(&self) -> Option<LookupIncludeBehavior> {
        self.lookup_include
    }

    /// Whether the relationship is included without being requested.
    #[must_use]
    pub fn include_by_default(&self) -> bool {
        self.include_by_default
    }
}

/// Metadata of one resource type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceInformation {
    resource_type: String,
    type_name: String,
    id_field: ResourceField,
    attribute_fields: Vec<ResourceField>,
    relationship_fields: Vec<ResourceField>,
}

impl ResourceInformation {
    /// Resource type.
    #[must_use]
    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    /// Rust type name of the domain type.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// The id field.
    #[must_use]
    pub fn id_field(&self) -> &ResourceField {
        &self.id_field
    }

    /// Attribute fields in discovery order.
    #[must_use]
    pub fn attribute_fields(&self) -> &[ResourceField] {
        &self.attribute_fields
    }

    /// Relationship fields in discovery order.
    #[must_use]
    pub fn relationship_fields(&self) -> &[ResourceField] {
        &self.relationship_fields
    }

    /// All fields: id, attributes, relationships.
    pub fn fields(&self) -> impl Iterator<Item = &ResourceField> {
        std::iter::once(&self.id_field)
            .chain(self.attribute_fields.iter())
            .chain(self.relationship_fields.iter())
    }

    /// Finds any field by wire name.
    #[must_use]
    pub fn find_field_by_name(&self, json_name: &str) -> Option<&ResourceField> {
        self.fields().find(|f| f.json_name == json_name)
    }

    /// Finds any field by underlying name.
    #[must_use]
    pub fn find_field_by_underlying_name(&self, name: &str) -> Option<&ResourceField> {
        self.fields().find(|f| f.underlying_name == name)
    }

    /// Finds an attribute field by wire name.
    #[must_use]
    pub fn find_attribute_field_by_name(&self, json_name: &str) -> Option<&ResourceField> {
        self.attribute_fields
            .iter()
            .find(|f| f.json_name == json_name)
    }

    /// Finds a relationship field by wire name.
    #[must_use]
    pub fn find_relationship_field_by_name(&self, json_name: &str) -> Option<&ResourceField> {
        self.relationship_fields
            .iter()
            .find(|f| f.json_name == json_name)
    }

    /// Parses a string id from a path or body into the id's value type.
    pub fn parse_id_string(&self, raw: &str, parser: &TypeParser) -> JsonApiResult<Value> {
        parser.parse(raw, &self.id_field.value_type)
    }

    /// Renders an id value as the string form used on the wire.
    #[must_use]
    pub fn to_id_string(&self, id: &Value) -> String {
        id_to_string(id)
    }

    /// Reads the id of an entity of this type.
    #[must_use]
    pub fn entity_id<'a>(&self, entity: &'a Entity) -> Option<&'a Value> {
        entity
            .get(&self.id_field.underlying_name)
            .filter(|v| !v.is_null())
    }
}

/// Renders an id value as a string: strings verbatim, anything else as JSON.
#[must_use]
pub fn id_to_string(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Read access to resource information by resource type.
pub trait InformationLookup: Send + Sync {
    /// Returns the information for `resource_type`, if registered.
    fn information(&self, resource_type: &str) -> Option<&ResourceInformation>;
}

impl InformationLookup for Vec<ResourceInformation> {
    fn information(&self, resource_type: &str) -> Option<&ResourceInformation> {
        self.iter().find(|i| i.resource_type == resource_type)
    }
}
