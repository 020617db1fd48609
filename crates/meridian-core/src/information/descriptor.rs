//! Explicit resource schemas.
//!
//! A [`ResourceDescriptor`] states what a reflective framework would discover
//! at runtime: the resource type, the declared fields with their types and
//! annotations, the accessor methods, and an optional parent descriptor for
//! inherited members. Descriptors are written by hand or generated by
//! `#[derive(JsonApiResource)]`.

use super::LookupIncludeBehavior;
use crate::parser::ValueType;

/// Declared type of a field: the element type name and whether it is multi-valued.
///
/// `Option<T>` is transparent; `Vec<T>`, `HashSet<T>`, `BTreeSet<T>` and
/// `VecDeque<T>` make the field multi-valued.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeclaredType {
    type_name: String,
    multi: bool,
}

impl DeclaredType {
    /// A single-valued declaration of `type_name`.
    #[must_use]
    pub fn single(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            multi: false,
        }
    }

    /// A multi-valued declaration with element type `type_name`.
    #[must_use]
    pub fn many(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            multi: true,
        }
    }

    /// Parses a Rust type as written in source, e.g. `Option<Vec<Tag>>`.
    ///
    /// ```
    /// use meridian_core::DeclaredType;
    ///
    /// let ty = DeclaredType::from_rust_type("Option < Vec < crate::model::Tag > >");
    /// assert_eq!(ty.type_name(), "Tag");
    /// assert!(ty.is_multi());
    /// ```
    #[must_use]
    pub fn from_rust_type(source: &str) -> Self {
        let mut ty: String = source.chars().filter(|c| !c.is_whitespace()).collect();
        let mut multi = false;
        loop {
            let Some((outer, inner)) = split_generic(&ty) else {
                break;
            };
            match last_segment(outer) {
                "Option" | "Box" | "Arc" | "Rc" => ty = inner.to_string(),
                "Vec" | "HashSet" | "BTreeSet" | "VecDeque" | "IndexSet" if !multi => {
                    multi = true;
                    ty = inner.to_string();
                }
                _ => break,
            }
        }
        let type_name = if split_generic(&ty).is_some() {
            ty
        } else {
            last_segment(&ty).to_string()
        };
        Self { type_name, multi }
    }

    /// Element type name.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Whether the declaration is multi-valued.
    #[must_use]
    pub fn is_multi(&self) -> bool {
        self.multi
    }

    /// Whether the element type is `bool`.
    #[must_use]
    pub fn is_boolean(&self) -> bool {
        !self.multi && self.type_name == "bool"
    }

    /// Value type of the element type.
    #[must_use]
    pub fn value_type(&self) -> ValueType {
        ValueType::from_type_name(&self.type_name)
    }
}

impl From<&str> for DeclaredType {
    fn from(source: &str) -> Self {
        Self::from_rust_type(source)
    }
}

fn split_generic(ty: &str) -> Option<(&str, &str)> {
    let open = ty.find('<')?;
    let inner = ty.get(open + 1..ty.len().checked_sub(1)?)?;
    ty.ends_with('>').then(|| (&ty[..open], inner))
}

fn last_segment(path: &str) -> &str {
    path.rsplit("::").next().unwrap_or(path)
}

/// Metadata attached to a field or accessor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldAnnotations {
    /// The member is the resource id.
    pub id: bool,
    /// Wire name override.
    pub json_name: Option<String>,
    /// The member is not part of the resource.
    pub ignore: bool,
    /// Neither postable nor patchable.
    pub read_only: bool,
    /// Postable but not patchable.
    pub immutable: bool,
    /// Explicit postable flag.
    pub postable: Option<bool>,
    /// Explicit patchable flag.
    pub patchable: Option<bool>,
    /// Explicit sortable flag.
    pub sortable: Option<bool>,
    /// Explicit filterable flag.
    pub filterable: Option<bool>,
    /// Name of a registered custom parser for the value type.
    pub parser: Option<String>,
    /// Target resource type name for a field storing related ids.
    pub relation_target: Option<String>,
    /// Lookup behavior for the related resources.
    pub lookup_include: Option<LookupIncludeBehavior>,
    /// Include the related resources even when not requested.
    pub include_by_default: bool,
}

impl FieldAnnotations {
    /// Creates empty annotations.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fills unset values from `other`; flags are combined.
    pub fn merge(&mut self, other: &Self) {
        self.id |= other.id;
        self.ignore |= other.ignore;
        self.read_only |= other.read_only;
        self.immutable |= other.immutable;
        self.include_by_default |= other.include_by_default;
        if self.json_name.is_none() {
            self.json_name.clone_from(&other.json_name);
        }
        if self.postable.is_none() {
            self.postable = other.postable;
        }
        if self.patchable.is_none() {
            self.patchable = other.patchable;
        }
        if self.sortable.is_none() {
            self.sortable = other.sortable;
        }
        if self.filterable.is_none() {
            self.filterable = other.filterable;
        }
        if self.parser.is_none() {
            self.parser.clone_from(&other.parser);
        }
        if self.relation_target.is_none() {
            self.relation_target.clone_from(&other.relation_target);
        }
        if self.lookup_include.is_none() {
            self.lookup_include = other.lookup_include;
        }
    }

    /// Marks the member as the id.
    #[must_use]
    pub fn id(mut self) -> Self {
        self.id = true;
        self
    }

    /// Sets the wire name.
    #[must_use]
    pub fn json_name(mut self, name: impl Into<String>) -> Self {
        self.json_name = Some(name.into());
        self
    }

    /// Excludes the member from the resource.
    #[must_use]
    pub fn ignore(mut self) -> Self {
        self.ignore = true;
        self
    }

    /// Makes the member read-only.
    #[must_use]
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Makes the member writable on creation only.
    #[must_use]
    pub fn immutable(mut self) -> Self {
        self.immutable = true;
        self
    }

    /// Sets the postable flag explicitly.
    #[must_use]
    pub fn postable(mut self, postable: bool) -> Self {
        self.postable = Some(postable);
        self
    }

    /// Sets the patchable flag explicitly.
    #[must_use]
    pub fn patchable(mut self, patchable: bool) -> Self {
        self.patchable = Some(patchable);
        self
    }

    /// Disallows sorting by the member.
    #[must_use]
    pub fn non_sortable(mut self) -> Self {
        self.sortable = Some(false);
        self
    }

    /// Disallows filtering by the member.
    #[must_use]
    pub fn non_filterable(mut self) -> Self {
        self.filterable = Some(false);
        self
    }

    /// Parses values of the member with the named custom parser.
    #[must_use]
    pub fn parse_with(mut self, parser: impl Into<String>) -> Self {
        self.parser = Some(parser.into());
        self
    }

    /// Declares the member as holding ids of `target` resources.
    #[must_use]
    pub fn relation_ids(mut self, target: impl Into<String>) -> Self {
        self.relation_target = Some(target.into());
        self
    }

    /// Sets the lookup behavior for related resources.
    #[must_use]
    pub fn lookup_include(mut self, behavior: LookupIncludeBehavior) -> Self {
        self.lookup_include = Some(behavior);
        self
    }

    /// Always includes the related resources.
    #[must_use]
    pub fn include_by_default(mut self) -> Self {
        self.include_by_default = true;
        self
    }
}

/// A declared field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    name: String,
    declared_type: DeclaredType,
    annotations: FieldAnnotations,
}

impl FieldDescriptor {
    /// Declares a field by its underlying (serialized) name and type.
    #[must_use]
    pub fn new(name: impl Into<String>, declared_type: impl Into<DeclaredType>) -> Self {
        Self {
            name: name.into(),
            declared_type: declared_type.into(),
            annotations: FieldAnnotations::default(),
        }
    }

    /// Declares the id field.
    #[must_use]
    pub fn id(name: impl Into<String>, declared_type: impl Into<DeclaredType>) -> Self {
        Self::new(name, declared_type).annotate(FieldAnnotations::id)
    }

    /// Applies a change to the annotations.
    #[must_use]
    pub fn annotate(mut self, f: impl FnOnce(FieldAnnotations) -> FieldAnnotations) -> Self {
        self.annotations = f(self.annotations);
        self
    }

    /// Replaces the annotations.
    #[must_use]
    pub fn with_annotations(mut self, annotations: FieldAnnotations) -> Self {
        self.annotations = annotations;
        self
    }

    /// Sets the wire name.
    #[must_use]
    pub fn json_name(self, name: impl Into<String>) -> Self {
        self.annotate(|a| a.json_name(name))
    }

    /// Makes the field read-only.
    #[must_use]
    pub fn read_only(self) -> Self {
        self.annotate(FieldAnnotations::read_only)
    }

    /// Makes the field writable on creation only.
    #[must_use]
    pub fn immutable(self) -> Self {
        self.annotate(FieldAnnotations::immutable)
    }

    /// Excludes the field from the resource.
    #[must_use]
    pub fn ignore(self) -> Self {
        self.annotate(FieldAnnotations::ignore)
    }

    /// Declares the field as holding ids of `target` resources.
    #[must_use]
    pub fn relation_ids(self, target: impl Into<String>) -> Self {
        self.annotate(|a| a.relation_ids(target))
    }

    /// Underlying name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared type.
    #[must_use]
    pub fn declared_type(&self) -> &DeclaredType {
        &self.declared_type
    }

    /// Annotations.
    #[must_use]
    pub fn annotations(&self) -> &FieldAnnotations {
        &self.annotations
    }
}

/// Whether an accessor reads or writes a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessorKind {
    /// `getX` / `isX`.
    Getter,
    /// `setX`.
    Setter,
}

/// A declared accessor method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessorDescriptor {
    name: String,
    kind: AccessorKind,
    declared_type: DeclaredType,
    annotations: FieldAnnotations,
}

impl AccessorDescriptor {
    /// Declares a getter returning `declared_type`.
    #[must_use]
    pub fn getter(name: impl Into<String>, declared_type: impl Into<DeclaredType>) -> Self {
        Self {
            name: name.into(),
            kind: AccessorKind::Getter,
            declared_type: declared_type.into(),
            annotations: FieldAnnotations::default(),
        }
    }

    /// Declares a setter taking `declared_type`.
    #[must_use]
    pub fn setter(name: impl Into<String>, declared_type: impl Into<DeclaredType>) -> Self {
        Self {
            name: name.into(),
            kind: AccessorKind::Setter,
            declared_type: declared_type.into(),
            annotations: FieldAnnotations::default(),
        }
    }

    /// Applies a change to the annotations.
    #[must_use]
    pub fn annotate(mut self, f: impl FnOnce(FieldAnnotations) -> FieldAnnotations) -> Self {
        self.annotations = f(self.annotations);
        self
    }

    /// Method name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Accessor kind.
    #[must_use]
    pub fn kind(&self) -> AccessorKind {
        self.kind
    }

    /// Declared type.
    #[must_use]
    pub fn declared_type(&self) -> &DeclaredType {
        &self.declared_type
    }

    /// Annotations.
    #[must_use]
    pub fn annotations(&self) -> &FieldAnnotations {
        &self.annotations
    }
}

/// Explicit schema of a resource type.
///
/// # Example
///
/// ```
/// use meridian_core::{FieldDescriptor, ResourceDescriptor};
///
/// let base = ResourceDescriptor::abstract_type("Entity")
///     .field(FieldDescriptor::id("id", "u64"));
///
/// let task = ResourceDescriptor::new("tasks", "Task")
///     .extends(base)
///     .field(FieldDescriptor::new("name", "String"))
///     .field(FieldDescriptor::new("project", "Option<Project>"));
///
/// assert_eq!(task.resource_type(), Some("tasks"));
/// assert_eq!(task.id_field_name().as_deref(), Some("id"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDescriptor {
    resource_type: Option<String>,
    type_name: String,
    parent: Option<Box<ResourceDescriptor>>,
    fields: Vec<FieldDescriptor>,
    accessors: Vec<AccessorDescriptor>,
}

impl ResourceDescriptor {
    /// Creates a descriptor for a resource type backed by Rust type `type_name`.
    #[must_use]
    pub fn new(resource_type: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            resource_type: Some(resource_type.into()),
            type_name: type_name.into(),
            parent: None,
            fields: Vec::new(),
            accessors: Vec::new(),
        }
    }

    /// Creates a descriptor that only contributes members to descendants.
    #[must_use]
    pub fn abstract_type(type_name: impl Into<String>) -> Self {
        Self {
            resource_type: None,
            type_name: type_name.into(),
            parent: None,
            fields: Vec::new(),
            accessors: Vec::new(),
        }
    }

    /// Sets the parent descriptor.
    #[must_use]
    pub fn extends(mut self, parent: ResourceDescriptor) -> Self {
        self.parent = Some(Box::new(parent));
        self
    }

    /// Adds a field.
    #[must_use]
    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    /// Adds an accessor.
    #[must_use]
    pub fn accessor(mut self, accessor: AccessorDescriptor) -> Self {
        self.accessors.push(accessor);
        self
    }

    /// Resource type, `None` for abstract descriptors.
    #[must_use]
    pub fn resource_type(&self) -> Option<&str> {
        self.resource_type.as_deref()
    }

    /// Rust type name.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Parent descriptor.
    #[must_use]
    pub fn parent(&self) -> Option<&ResourceDescriptor> {
        self.parent.as_deref()
    }

    /// Fields declared at this level.
    #[must_use]
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Accessors declared at this level.
    #[must_use]
    pub fn accessors(&self) -> &[AccessorDescriptor] {
        &self.accessors
    }

    /// Iterates this descriptor and its ancestors, most-derived first.
    pub fn chain(&self) -> impl Iterator<Item = &ResourceDescriptor> {
        std::iter::successors(Some(self), |d| d.parent())
    }

    /// Underlying name of the first member marked as id along the chain.
    #[must_use]
    pub fn id_field_name(&self) -> Option<String> {
        self.chain().find_map(|level| {
            level
                .fields
                .iter()
                .find(|f| f.annotations.id && !f.annotations.ignore)
                .map(|f| f.name.clone())
                .or_else(|| {
                    level.accessors.iter().find_map(|a| {
                        if a.annotations.id && a.kind == AccessorKind::Getter {
                            crate::naming::property_name_from_accessor(
                                &a.name,
                                a.declared_type.is_boolean(),
                            )
                        } else {
                            None
                        }
                    })
                })
        })
    }
}
