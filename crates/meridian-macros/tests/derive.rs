//! Derived descriptors fed through the information builder.

use meridian_core::{
    Cardinality, JsonApiResource, LookupIncludeBehavior, RelationStorage,
    ResourceInformationBuilder,
};
use meridian_macros::JsonApiResource;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonApiResource)]
#[jsonapi(resource_type = "projects")]
struct Project {
    id: u64,
    name: String,
    #[jsonapi(relation_ids = "Task", json_name = "tasks")]
    task_ids: Vec<u64>,
}

#[derive(Debug, Serialize, Deserialize, JsonApiResource)]
#[jsonapi(resource_type = "tags")]
struct Tag {
    id: u64,
    label: String,
}

#[derive(Debug, Serialize, Deserialize, JsonApiResource)]
#[jsonapi(resource_type = "tasks")]
struct Task {
    id: u64,
    name: String,
    due_date: Option<String>,
    #[jsonapi(immutable)]
    created_by: Option<String>,
    #[jsonapi(read_only, non_sortable)]
    revision: u32,
    project: Option<Project>,
    #[jsonapi(lookup_include = "always")]
    tags: Vec<Tag>,
    #[serde(skip)]
    scratch: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, JsonApiResource)]
#[jsonapi(resource_type = "users")]
#[serde(rename_all = "camelCase")]
struct User {
    #[jsonapi(id)]
    login: String,
    display_name: String,
}

fn builder() -> ResourceInformationBuilder {
    ResourceInformationBuilder::new()
        .register(&Project::descriptor())
        .register(&Tag::descriptor())
        .register(&Task::descriptor())
        .register(&User::descriptor())
}

#[test]
fn test_resource_type_and_id() {
    assert_eq!(Task::RESOURCE_TYPE, "tasks");
    let id: <Task as JsonApiResource>::Id = 7u64;
    assert_eq!(id, 7);

    let info = builder().build(&Task::descriptor()).unwrap();
    assert_eq!(info.resource_type(), "tasks");
    assert_eq!(info.id_field().json_name(), "id");
}

#[test]
fn test_wire_names_and_access() {
    let info = builder().build(&Task::descriptor()).unwrap();

    let due = info.find_attribute_field_by_name("dueDate").unwrap();
    assert_eq!(due.underlying_name(), "due_date");

    let created_by = info.find_attribute_field_by_name("createdBy").unwrap();
    assert!(created_by.access().postable);
    assert!(!created_by.access().patchable);

    let revision = info.find_attribute_field_by_name("revision").unwrap();
    assert!(!revision.access().postable);
    assert!(!revision.access().sortable);

    assert!(info.find_field_by_underlying_name("scratch").is_none());
}

#[test]
fn test_relationships() {
    let info = builder().build(&Task::descriptor()).unwrap();

    let project = info.find_relationship_field_by_name("project").unwrap();
    assert_eq!(project.opposite_resource_type(), Some("projects"));
    assert_eq!(project.cardinality(), Cardinality::One);
    assert_eq!(project.storage(), RelationStorage::Object);

    let tags = info.find_relationship_field_by_name("tags").unwrap();
    assert_eq!(tags.cardinality(), Cardinality::Many);
    assert_eq!(tags.lookup_include(), Some(LookupIncludeBehavior::Always));

    let project_info = builder().build(&Project::descriptor()).unwrap();
    let tasks = project_info.find_relationship_field_by_name("tasks").unwrap();
    assert_eq!(tasks.underlying_name(), "task_ids");
    assert_eq!(tasks.opposite_resource_type(), Some("tasks"));
    assert_eq!(tasks.storage(), RelationStorage::Id);
}

#[test]
fn test_serde_rename_all() {
    let info = builder().build(&User::descriptor()).unwrap();
    assert_eq!(info.id_field().underlying_name(), "login");

    let name = info.find_attribute_field_by_name("displayName").unwrap();
    assert_eq!(name.underlying_name(), "displayName");

    let user = User {
        login: "ada".into(),
        display_name: "Ada".into(),
    };
    let value = serde_json::to_value(&user).unwrap();
    assert_eq!(value["displayName"], "Ada");
}
