//! Relationship endpoints, nested creation and compound documents.

use http::StatusCode;
use meridian::prelude::*;
use meridian_test::{Fixtures, TestClient};
use serde_json::json;

fn client() -> (Fixtures, TestClient) {
    let fixtures = Fixtures::seeded().unwrap();
    let client = fixtures.client().unwrap();
    (fixtures, client)
}

fn linkage_ids(resource: &Resource, name: &str) -> Vec<String> {
    resource.relationships[name]
        .data
        .as_ref()
        .map(|data| data.identifiers().iter().map(|i| i.id.clone()).collect())
        .unwrap_or_default()
}

#[tokio::test]
async fn test_include_is_deduplicated() {
    let (_fixtures, client) = client();

    let response = client.get("/tasks?include=project").send().await;
    response.assert_success();

    let projects = response.included("projects");
    assert_eq!(projects.len(), 1);
    assert_eq!(projects[0].id.as_deref(), Some("7"));
    assert_eq!(projects[0].attributes["name"], json!("web"));
    for task in response.data() {
        assert_eq!(linkage_ids(task, "project"), vec!["7"]);
    }
}

#[tokio::test]
async fn test_cyclic_include_terminates() {
    let (_fixtures, client) = client();

    let response = client.get("/tasks?include=project.tasks.project").send().await;
    response.assert_success();

    // Tasks reached through the project are already primary data.
    let document = response.require_document().unwrap();
    assert_eq!(document.included.len(), 1);
    let project = &document.included[0];
    assert_eq!(project.resource_type, "projects");
    assert_eq!(linkage_ids(project, "tasks"), vec!["1", "2"]);
}

#[tokio::test]
async fn test_include_of_to_many() {
    let (_fixtures, client) = client();

    let response = client.get("/tasks/1?include=tags").send().await;
    response.assert_success();

    let labels: Vec<_> = response
        .included("tags")
        .iter()
        .map(|tag| tag.attributes["label"].clone())
        .collect();
    assert_eq!(labels, vec![json!("red"), json!("blue"), json!("green")]);
    assert_eq!(linkage_ids(response.data()[0], "tags"), vec!["1", "2", "3"]);
}

#[tokio::test]
async fn test_related_resources() {
    let (fixtures, client) = client();

    let response = client.get("/tasks/1/tags?sort=label").send().await;
    response.assert_success();
    assert_eq!(response.data_ids(), vec!["2", "3", "1"]);
    assert_eq!(
        fixtures.task_tags.calls().calls_to("find_many_targets"),
        vec!["find_many_targets(1, tags)"]
    );

    let project = client.get("/tasks/2/project").send().await;
    project.assert_success();
    assert_eq!(project.data_ids(), vec!["7"]);
}

#[tokio::test]
async fn test_nested_create_links_new_resource() {
    let (fixtures, client) = client();

    let created = client
        .post("/tasks/1/project")
        .json(&json!({ "data": { "type": "projects", "attributes": { "name": "X" } } }))
        .send()
        .await;
    created.assert_status(StatusCode::CREATED);
    assert_eq!(created.data_ids(), vec!["8"]);
    assert_eq!(fixtures.projects.len(), 2);

    let task = client.get("/tasks/1?include=project").send().await;
    task.assert_success();
    assert_eq!(linkage_ids(task.data()[0], "project"), vec!["8"]);
    let included = task.included("projects");
    assert_eq!(included.len(), 1);
    assert_eq!(included[0].attributes["name"], json!("X"));
}

#[tokio::test]
async fn test_nested_create_on_to_many_uses_add_relations() {
    let (fixtures, client) = client();

    client
        .post("/tasks/2/tags")
        .json(&json!({ "data": { "type": "tags", "attributes": { "label": "new" } } }))
        .send()
        .await
        .assert_status(StatusCode::CREATED);
    assert_eq!(
        fixtures.task_tags.calls().calls(),
        vec!["add_relations(2, tags, [4])"]
    );
}

#[tokio::test]
async fn test_relationship_linkage() {
    let (_fixtures, client) = client();

    let response = client.get("/tasks/1/relationships/tags").send().await;
    response.assert_success();
    let data = response.data();
    assert!(data.iter().all(|r| r.attributes.is_empty()));
    assert_eq!(response.data_ids(), vec!["1", "2", "3"]);
}

#[tokio::test]
async fn test_remove_from_to_many_is_one_call() {
    let (fixtures, client) = client();

    client
        .delete("/tasks/1/relationships/tags")
        .json(&json!({
            "data": [ { "type": "tags", "id": "2" }, { "type": "tags", "id": "3" } ]
        }))
        .send()
        .await
        .assert_status(StatusCode::NO_CONTENT);

    assert_eq!(
        fixtures.task_tags.calls().calls(),
        vec!["remove_relations(1, tags, [2,3])"]
    );
    assert_eq!(fixtures.task_tags.linked(&1, "tags").unwrap(), vec![json!(1)]);
}

#[tokio::test]
async fn test_add_and_replace_to_many() {
    let (fixtures, client) = client();

    client
        .post("/tasks/2/relationships/tags")
        .json(&json!({ "data": [ { "type": "tags", "id": "3" } ] }))
        .send()
        .await
        .assert_status(StatusCode::NO_CONTENT);
    client
        .patch("/tasks/1/relationships/tags")
        .json(&json!({ "data": [] }))
        .send()
        .await
        .assert_status(StatusCode::NO_CONTENT);

    assert_eq!(
        fixtures.task_tags.calls().calls(),
        vec!["add_relations(2, tags, [3])", "set_relations(1, tags, [])"]
    );
    assert!(fixtures.task_tags.linked(&1, "tags").unwrap().is_empty());
}

#[tokio::test]
async fn test_to_one_delete_ignores_body() {
    let (fixtures, client) = client();

    client
        .delete("/tasks/1/relationships/project")
        .header("content-type", "application/vnd.api+json")
        .body("{not json")
        .send()
        .await
        .assert_status(StatusCode::NO_CONTENT);

    assert_eq!(fixtures.tasks.get(&1).unwrap().unwrap().project, None);
}

#[tokio::test]
async fn test_to_one_delete_without_body() {
    let (fixtures, client) = client();

    client
        .delete("/tasks/2/relationships/project")
        .send()
        .await
        .assert_status(StatusCode::NO_CONTENT);

    assert_eq!(fixtures.tasks.get(&2).unwrap().unwrap().project, None);
    assert_eq!(fixtures.tasks.calls().calls_to("update"), vec!["update(2)"]);
}

#[tokio::test]
async fn test_included_linkage_skips_deleted_targets() {
    let (_fixtures, client) = client();

    client
        .delete("/tasks/2")
        .send()
        .await
        .assert_status(StatusCode::NO_CONTENT);

    let response = client.get("/projects/7?include=tasks").send().await;
    response.assert_success();
    assert_eq!(linkage_ids(response.data()[0], "tasks"), vec!["1"]);
    let included: Vec<_> = response
        .included("tasks")
        .iter()
        .filter_map(|task| task.id.clone())
        .collect();
    assert_eq!(included, vec!["1"]);
}

#[tokio::test]
async fn test_to_one_patch_replaces_owner_member() {
    let (fixtures, client) = client();

    client
        .patch("/tasks/2/relationships/project")
        .json(&json!({ "data": null }))
        .send()
        .await
        .assert_status(StatusCode::NO_CONTENT);
    assert_eq!(fixtures.tasks.get(&2).unwrap().unwrap().project, None);

    client
        .patch("/tasks/2/relationships/project")
        .json(&json!({ "data": { "type": "projects", "id": "7" } }))
        .send()
        .await
        .assert_status(StatusCode::NO_CONTENT);
    let project = fixtures.tasks.get(&2).unwrap().unwrap().project.unwrap();
    assert_eq!(project.name, "web");
}

#[tokio::test]
async fn test_add_to_to_one_is_rejected() {
    let (fixtures, client) = client();

    let response = client
        .post("/tasks/1/relationships/project")
        .json(&json!({ "data": { "type": "projects", "id": "7" } }))
        .send()
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert!(fixtures.tasks.calls().calls_to("update").is_empty());
}

#[tokio::test]
async fn test_unknown_target_id_is_not_found() {
    let (fixtures, client) = client();

    let response = client
        .patch("/tasks/1/relationships/project")
        .json(&json!({ "data": { "type": "projects", "id": "404" } }))
        .send()
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
    assert!(fixtures.tasks.calls().calls_to("update").is_empty());
}
