//! The resource registry.
//!
//! [`ResourceRegistryBuilder`] collects resource descriptors and
//! repositories, validates them and produces an immutable
//! [`ResourceRegistry`]. The registry is built once during startup and then
//! shared (usually behind an `Arc`) by every request.
//!
//! # Example
//!
//! ```rust,ignore
//! let registry = ResourceRegistry::builder()
//!     .add_repository(TaskRepository::default())
//!     .add_repository(ProjectRepository::default())
//!     .add_relationship_repository(TaskTagRepository::default())
//!     .build()?;
//!
//! let entry = registry.get_entry("tasks")?;
//! assert_eq!(entry.information().id_field().json_name(), "id");
//! ```

use crate::adapter::{RelationshipRepositoryAdapter, ResourceRepositoryAdapter};
use crate::current::{RelationshipRepository, ResourceRepository};
use crate::implicit::ImplicitRelationshipRepository;
use crate::instance::{RelationshipRepositoryInstance, RepositoryRegistration};
use crate::legacy::{LegacyRelationshipRepository, LegacyResourceRepository};
use crate::untyped::{UntypedRelationshipRepository, UntypedResourceRepository};
use indexmap::IndexMap;
use meridian_core::{
    InformationLookup, JsonApiError, JsonApiResource, JsonApiResult, ResourceDescriptor,
    ResourceField, ResourceInformation, ResourceInformationBuilder, TypeParser,
};
use std::collections::HashMap;
use std::sync::Arc;

/// Source of resource descriptors and repositories, for example a module
/// that wires up one bounded context.
pub trait ResourceLookup {
    /// Descriptors of the resource types to register.
    fn resource_descriptors(&self) -> Vec<ResourceDescriptor>;

    /// Repositories serving those types.
    fn repositories(&self) -> Vec<RepositoryRegistration>;
}

/// Information and repositories of one resource type.
#[derive(Debug, Clone)]
pub struct RegistryEntry {
    information: Arc<ResourceInformation>,
    repository: Arc<ResourceRepositoryAdapter>,
    relationship_repositories: HashMap<String, Arc<RelationshipRepositoryAdapter>>,
}

impl RegistryEntry {
    /// Resource type.
    #[must_use]
    pub fn resource_type(&self) -> &str {
        self.information.resource_type()
    }

    /// Resource information.
    #[must_use]
    pub fn information(&self) -> &Arc<ResourceInformation> {
        &self.information
    }

    /// Resource repository adapter.
    #[must_use]
    pub fn repository(&self) -> &Arc<ResourceRepositoryAdapter> {
        &self.repository
    }

    /// Relationship repository adapter for the relationships to `target_type`.
    pub fn relationship_repository(
        &self,
        target_type: &str,
    ) -> JsonApiResult<&Arc<RelationshipRepositoryAdapter>> {
        self.relationship_repositories
            .get(target_type)
            .ok_or_else(|| JsonApiError::not_registered(target_type))
    }

    /// Relationship repository adapter serving `field`.
    pub fn relationship_repository_for(
        &self,
        field: &ResourceField,
    ) -> JsonApiResult<&Arc<RelationshipRepositoryAdapter>> {
        let target = field.opposite_resource_type().ok_or_else(|| {
            JsonApiError::field_not_found(self.resource_type(), field.json_name())
        })?;
        self.relationship_repository(target)
    }

    /// All relationship repository adapters keyed by target type.
    pub fn relationship_repositories(
        &self,
    ) -> impl Iterator<Item = (&str, &Arc<RelationshipRepositoryAdapter>)> {
        self.relationship_repositories
            .iter()
            .map(|(target, adapter)| (target.as_str(), adapter))
    }
}

/// Registered resource types, in registration order.
#[derive(Debug, Clone, Default)]
pub struct ResourceRegistry {
    entries: IndexMap<String, RegistryEntry>,
    type_names: HashMap<String, String>,
    parser: TypeParser,
}

impl ResourceRegistry {
    /// Creates a builder.
    #[must_use]
    pub fn builder() -> ResourceRegistryBuilder {
        ResourceRegistryBuilder::new()
    }

    /// Returns the entry of `resource_type`.
    pub fn get_entry(&self, resource_type: &str) -> JsonApiResult<&RegistryEntry> {
        self.find_entry(resource_type)
            .ok_or_else(|| JsonApiError::not_registered(resource_type))
    }

    /// Returns the entry of `resource_type`, if registered.
    #[must_use]
    pub fn find_entry(&self, resource_type: &str) -> Option<&RegistryEntry> {
        self.entries.get(resource_type)
    }

    /// Returns true if `resource_type` is registered.
    #[must_use]
    pub fn has_entry(&self, resource_type: &str) -> bool {
        self.entries.contains_key(resource_type)
    }

    /// Returns the entry of the domain type named `type_name`.
    #[must_use]
    pub fn entry_for_type_name(&self, type_name: &str) -> Option<&RegistryEntry> {
        self.type_names
            .get(type_name)
            .and_then(|resource_type| self.entries.get(resource_type))
    }

    /// Registered resource types.
    pub fn resource_types(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// All entries.
    pub fn entries(&self) -> impl Iterator<Item = &RegistryEntry> {
        self.entries.values()
    }

    /// Parser for ids and filter values.
    #[must_use]
    pub fn type_parser(&self) -> &TypeParser {
        &self.parser
    }

    /// Number of registered resource types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl InformationLookup for ResourceRegistry {
    fn information(&self, resource_type: &str) -> Option<&ResourceInformation> {
        self.entries
            .get(resource_type)
            .map(|entry| entry.information.as_ref())
    }
}

/// Builder for [`ResourceRegistry`].
#[derive(Debug, Default)]
pub struct ResourceRegistryBuilder {
    descriptors: Vec<ResourceDescriptor>,
    repositories: Vec<RepositoryRegistration>,
    parser: TypeParser,
}

impl ResourceRegistryBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the descriptor of `T`.
    #[must_use]
    pub fn add_resource<T: JsonApiResource>(self) -> Self {
        self.add_descriptor(T::descriptor())
    }

    /// Registers a descriptor.
    #[must_use]
    pub fn add_descriptor(mut self, descriptor: ResourceDescriptor) -> Self {
        self.descriptors.push(descriptor);
        self
    }

    fn ensure_resource<T: JsonApiResource>(mut self) -> Self {
        let known = self
            .descriptors
            .iter()
            .any(|d| d.resource_type() == Some(T::RESOURCE_TYPE));
        if !known {
            self.descriptors.push(T::descriptor());
        }
        self
    }

    /// Registers a repository of the current convention and its resource type.
    #[must_use]
    pub fn add_repository<R: ResourceRepository>(self, repository: R) -> Self {
        self.ensure_resource::<R::Resource>()
            .add_registration(RepositoryRegistration::resource(repository))
    }

    /// Registers a repository of the legacy convention and its resource type.
    #[must_use]
    pub fn add_legacy_repository<R: LegacyResourceRepository>(self, repository: R) -> Self {
        self.ensure_resource::<R::Resource>()
            .add_registration(RepositoryRegistration::legacy_resource(repository))
    }

    /// Registers a dynamic repository for an already registered type.
    #[must_use]
    pub fn add_untyped_repository(
        self,
        resource_type: impl Into<String>,
        repository: Arc<dyn UntypedResourceRepository>,
    ) -> Self {
        self.add_registration(RepositoryRegistration::untyped_resource(resource_type, repository))
    }

    /// Registers a relationship repository of the current convention.
    #[must_use]
    pub fn add_relationship_repository<R: RelationshipRepository>(self, repository: R) -> Self {
        self.ensure_resource::<R::Source>()
            .ensure_resource::<R::Target>()
            .add_registration(RepositoryRegistration::relationship(repository))
    }

    /// Registers a relationship repository of the legacy convention.
    #[must_use]
    pub fn add_legacy_relationship_repository<R: LegacyRelationshipRepository>(
        self,
        repository: R,
    ) -> Self {
        self.ensure_resource::<R::Source>()
            .ensure_resource::<R::Target>()
            .add_registration(RepositoryRegistration::legacy_relationship(repository))
    }

    /// Registers a dynamic relationship repository for `(source_type, target_type)`.
    #[must_use]
    pub fn add_untyped_relationship_repository(
        self,
        source_type: impl Into<String>,
        target_type: impl Into<String>,
        repository: Arc<dyn UntypedRelationshipRepository>,
    ) -> Self {
        self.add_registration(RepositoryRegistration::untyped_relationship(
            source_type,
            target_type,
            repository,
        ))
    }

    /// Adds a prepared registration.
    #[must_use]
    pub fn add_registration(mut self, registration: RepositoryRegistration) -> Self {
        self.repositories.push(registration);
        self
    }

    /// Adds everything `lookup` provides.
    #[must_use]
    pub fn with_lookup(mut self, lookup: &dyn ResourceLookup) -> Self {
        self.descriptors.extend(lookup.resource_descriptors());
        self.repositories.extend(lookup.repositories());
        self
    }

    /// Sets the parser for ids and filter values.
    #[must_use]
    pub fn type_parser(mut self, parser: TypeParser) -> Self {
        self.parser = parser;
        self
    }

    /// Validates the registrations and builds the registry.
    ///
    /// Fails when a descriptor is invalid or registered twice, when a
    /// repository serves an unknown type or a type already served, when a
    /// resource has no repository, or when a relationship repository
    /// connects types without a relationship between them. Relationships
    /// without a dedicated repository get an implicit one.
    pub fn build(self) -> JsonApiResult<ResourceRegistry> {
        let information_builder = self
            .descriptors
            .iter()
            .fold(ResourceInformationBuilder::new(), |builder, descriptor| {
                builder.register(descriptor)
            });

        let mut informations: IndexMap<String, Arc<ResourceInformation>> = IndexMap::new();
        for descriptor in &self.descriptors {
            let information = information_builder.build(descriptor)?;
            let resource_type = information.resource_type().to_string();
            if informations.contains_key(&resource_type) {
                return Err(JsonApiError::invalid_resource(
                    descriptor.type_name(),
                    format!("resource type '{resource_type}' is registered twice"),
                ));
            }
            informations.insert(resource_type, Arc::new(information));
        }

        let mut repositories: HashMap<String, Arc<ResourceRepositoryAdapter>> = HashMap::new();
        let mut relationship_registrations = Vec::new();
        for registration in self.repositories {
            match registration {
                RepositoryRegistration::Resource {
                    resource_type,
                    instance,
                } => {
                    if !informations.contains_key(&resource_type) {
                        return Err(JsonApiError::invalid_repository(
                            resource_type,
                            "resource type is not registered",
                        ));
                    }
                    if repositories.contains_key(&resource_type) {
                        return Err(JsonApiError::invalid_repository(
                            resource_type,
                            "more than one resource repository registered",
                        ));
                    }
                    let adapter = ResourceRepositoryAdapter::new(resource_type.clone(), instance);
                    repositories.insert(resource_type, Arc::new(adapter));
                }
                RepositoryRegistration::Relationship {
                    source_type,
                    target_type,
                    instance,
                } => relationship_registrations.push((source_type, target_type, instance)),
            }
        }

        for resource_type in informations.keys() {
            if !repositories.contains_key(resource_type) {
                return Err(JsonApiError::invalid_repository(
                    resource_type.clone(),
                    "no resource repository registered",
                ));
            }
        }

        let mut explicit: HashMap<(String, String), Arc<RelationshipRepositoryAdapter>> =
            HashMap::new();
        for (source_type, target_type, instance) in relationship_registrations {
            if let RelationshipRepositoryInstance::Implicit(_) = instance {
                return Err(JsonApiError::invalid_repository(
                    source_type,
                    "implicit relationship repositories are created by the registry",
                ));
            }
            let source = informations.get(&source_type).ok_or_else(|| {
                JsonApiError::invalid_repository(
                    source_type.clone(),
                    "source resource type is not registered",
                )
            })?;
            if !informations.contains_key(&target_type) {
                return Err(JsonApiError::invalid_repository(
                    source_type,
                    format!("target resource type '{target_type}' is not registered"),
                ));
            }
            let related = source
                .relationship_fields()
                .iter()
                .any(|field| field.opposite_resource_type() == Some(target_type.as_str()));
            if !related {
                return Err(JsonApiError::invalid_repository(
                    source_type,
                    format!("no relationship field targets '{target_type}'"),
                ));
            }
            let key = (source_type.clone(), target_type.clone());
            if explicit.contains_key(&key) {
                return Err(JsonApiError::invalid_repository(
                    source_type,
                    format!("more than one relationship repository for '{target_type}'"),
                ));
            }
            let adapter = RelationshipRepositoryAdapter::new(source_type, target_type, instance);
            explicit.insert(key, Arc::new(adapter));
        }

        let lookup_repository = |resource_type: &str| {
            repositories.get(resource_type).cloned().ok_or_else(|| {
                JsonApiError::invalid_repository(resource_type, "no resource repository registered")
            })
        };

        let mut entries = IndexMap::new();
        for (resource_type, information) in &informations {
            let repository = lookup_repository(resource_type)?;
            let mut relationship_repositories = HashMap::new();
            for field in information.relationship_fields() {
                let Some(target_type) = field.opposite_resource_type() else {
                    continue;
                };
                if relationship_repositories.contains_key(target_type) {
                    continue;
                }
                let target = informations
                    .get(target_type)
                    .ok_or_else(|| JsonApiError::not_registered(target_type))?;
                let key = (resource_type.clone(), target_type.to_string());
                let adapter = match explicit.get(&key) {
                    Some(adapter) => Arc::clone(adapter),
                    None => {
                        tracing::debug!(
                            source = %resource_type,
                            target = %target_type,
                            "using implicit relationship repository"
                        );
                        let implicit = ImplicitRelationshipRepository::new(
                            Arc::clone(information),
                            Arc::clone(target),
                            Arc::clone(&repository),
                            lookup_repository(target_type)?,
                        );
                        Arc::new(RelationshipRepositoryAdapter::new(
                            resource_type.clone(),
                            target_type,
                            RelationshipRepositoryInstance::Implicit(Arc::new(implicit)),
                        ))
                    }
                };
                relationship_repositories.insert(target_type.to_string(), adapter);
            }
            entries.insert(
                resource_type.clone(),
                RegistryEntry {
                    information: Arc::clone(information),
                    repository,
                    relationship_repositories,
                },
            );
        }

        let type_names = informations
            .values()
            .map(|info| (info.type_name().to_string(), info.resource_type().to_string()))
            .collect();

        tracing::info!(resources = entries.len(), "resource registry built");
        Ok(ResourceRegistry {
            entries,
            type_names,
            parser: self.parser,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{task, LegacyStore, Project, RecordingTaskTags, Store, Tag, Task};
    use meridian_core::ResourceFieldType;

    fn full_builder() -> ResourceRegistryBuilder {
        ResourceRegistry::builder()
            .add_repository(Store::new(vec![task(1, "write docs")]))
            .add_legacy_repository(LegacyStore::<Project>::new(Vec::new()))
            .add_repository(Store::<Tag>::new(Vec::new()))
    }

    #[test]
    fn test_build_registers_all_types() {
        let registry = full_builder().build().unwrap();
        assert_eq!(
            registry.resource_types().collect::<Vec<_>>(),
            vec!["tasks", "projects", "tags"]
        );
        assert!(registry.has_entry("tasks"));
        assert_eq!(
            registry.entry_for_type_name("Project").map(RegistryEntry::resource_type),
            Some("projects")
        );
        assert_eq!(
            registry.get_entry("projects").unwrap().repository().instance().convention(),
            "legacy"
        );
    }

    #[test]
    fn test_unknown_type_is_not_registered() {
        let registry = full_builder().build().unwrap();
        let error = registry.get_entry("users").unwrap_err();
        assert!(matches!(error, JsonApiError::ResourceNotRegistered { .. }));
        assert_eq!(error.status_code().as_u16(), 404);
    }

    #[test]
    fn test_information_lookup() {
        let registry = full_builder().build().unwrap();
        let info = registry.information("tasks").unwrap();
        let project = info.find_field_by_name("project").unwrap();
        assert_eq!(project.field_type(), ResourceFieldType::Relationship);
        assert_eq!(project.opposite_resource_type(), Some("projects"));
        assert!(registry.information("nope").is_none());
    }

    #[test]
    fn test_missing_repository_fails() {
        let error = ResourceRegistry::builder()
            .add_resource::<Tag>()
            .build()
            .unwrap_err();
        assert!(matches!(error, JsonApiError::InvalidRepository { .. }));
    }

    #[test]
    fn test_duplicate_repository_fails() {
        let error = ResourceRegistry::builder()
            .add_repository(Store::<Tag>::new(Vec::new()))
            .add_legacy_repository(LegacyStore::<Tag>::new(Vec::new()))
            .build()
            .unwrap_err();
        assert!(error.to_string().contains("more than one"));
    }

    #[test]
    fn test_duplicate_descriptor_fails() {
        let error = ResourceRegistry::builder()
            .add_resource::<Tag>()
            .add_resource::<Tag>()
            .add_repository(Store::<Tag>::new(Vec::new()))
            .build()
            .unwrap_err();
        assert!(matches!(error, JsonApiError::InvalidResource { .. }));
    }

    #[test]
    fn test_unknown_relationship_target_fails() {
        // `owner` names the Project type, which is not registered.
        let error = ResourceRegistry::builder()
            .add_repository(Store::<Task>::new(Vec::new()))
            .build()
            .unwrap_err();
        assert!(matches!(error, JsonApiError::InvalidResource { .. }));
    }

    #[test]
    fn test_relationship_repository_without_relationship_fails() {
        let error = ResourceRegistry::builder()
            .add_repository(Store::<Tag>::new(Vec::new()))
            .add_untyped_relationship_repository(
                "tags",
                "tags",
                Arc::new(crate::TypedRelationshipRepository(RecordingTaskTags::default())),
            )
            .build()
            .unwrap_err();
        assert!(error.to_string().contains("no relationship field targets"));
    }

    #[test]
    fn test_explicit_and_implicit_relationship_repositories() {
        let registry = full_builder()
            .add_relationship_repository(RecordingTaskTags::default())
            .build()
            .unwrap();
        let entry = registry.get_entry("tasks").unwrap();
        assert_eq!(
            entry.relationship_repository("tags").unwrap().instance().convention(),
            "current"
        );
        assert_eq!(
            entry.relationship_repository("projects").unwrap().instance().convention(),
            "implicit"
        );
        assert_eq!(entry.relationship_repositories().count(), 2);
        assert!(entry.relationship_repository("users").is_err());
    }

    struct Module;

    impl ResourceLookup for Module {
        fn resource_descriptors(&self) -> Vec<ResourceDescriptor> {
            vec![Tag::descriptor()]
        }

        fn repositories(&self) -> Vec<RepositoryRegistration> {
            vec![RepositoryRegistration::resource(Store::<Tag>::new(Vec::new()))]
        }
    }

    #[test]
    fn test_with_lookup() {
        let registry = ResourceRegistry::builder()
            .with_lookup(&Module)
            .build()
            .unwrap();
        assert_eq!(registry.len(), 1);
        assert!(registry.has_entry("tags"));
    }
}
