//! Tasks, projects and tags.
//!
//! | task | name | project | tags |
//! |---|---|---|---|
//! | 1 | docs | 7 | 1, 2, 3 |
//! | 2 | tests | 7 | |
//!
//! Task-to-tag links go through a [`RecordingRelationshipRepository`]; the
//! task-to-project relationship is stored on the task.

use crate::client::TestClient;
use crate::error::TestError;
use crate::repository::{InMemoryRepository, RecordingRelationshipRepository};
use meridian_config::MeridianConfig;
use meridian_dispatch::RequestDispatcher;
use meridian_macros::JsonApiResource;
use meridian_repository::ResourceRegistry;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonApiResource)]
#[jsonapi(resource_type = "projects")]
#[serde(default)]
pub struct Project {
    /// Id; `0` until created.
    pub id: u64,
    /// Name.
    pub name: String,
    /// Ids of the project's tasks.
    #[jsonapi(relation_ids = "Task", json_name = "tasks")]
    pub task_ids: Vec<u64>,
}

/// A tag.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonApiResource)]
#[jsonapi(resource_type = "tags")]
#[serde(default)]
pub struct Tag {
    /// Id; `0` until created.
    pub id: u64,
    /// Label.
    pub label: String,
}

/// A task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonApiResource)]
#[jsonapi(resource_type = "tasks")]
#[serde(default)]
pub struct Task {
    /// Id; `0` until created.
    pub id: u64,
    /// Name.
    pub name: String,
    /// Due date, `YYYY-MM-DD`.
    pub due_date: Option<String>,
    /// Author; set on creation only.
    #[jsonapi(immutable)]
    pub created_by: Option<String>,
    /// Server-maintained revision.
    #[jsonapi(read_only)]
    pub revision: u32,
    /// Owning project.
    pub project: Option<Project>,
    /// Tags.
    pub tags: Vec<Tag>,
}

fn tag(id: u64, label: &str) -> Tag {
    Tag {
        id,
        label: label.to_string(),
    }
}

/// Seeded repositories for tasks, projects and tags.
#[derive(Debug, Clone)]
pub struct Fixtures {
    /// Task repository.
    pub tasks: InMemoryRepository<Task>,
    /// Project repository.
    pub projects: InMemoryRepository<Project>,
    /// Tag repository.
    pub tags: InMemoryRepository<Tag>,
    /// Task-to-tag relationship repository.
    pub task_tags: RecordingRelationshipRepository<Task, Tag>,
}

impl Fixtures {
    /// Creates the seeded repositories.
    pub fn seeded() -> Result<Self, TestError> {
        let web = Project {
            id: 7,
            name: "web".to_string(),
            task_ids: vec![1, 2],
        };
        let tags = vec![tag(1, "red"), tag(2, "blue"), tag(3, "green")];
        let tasks = vec![
            Task {
                id: 1,
                name: "docs".to_string(),
                created_by: Some("ada".to_string()),
                revision: 3,
                project: Some(web.clone()),
                tags: tags.clone(),
                ..Task::default()
            },
            Task {
                id: 2,
                name: "tests".to_string(),
                due_date: Some("2026-11-01".to_string()),
                created_by: Some("bob".to_string()),
                revision: 1,
                project: Some(web.clone()),
                ..Task::default()
            },
        ];

        let tags = InMemoryRepository::new(tags).map_err(setup)?;
        let task_tags = RecordingRelationshipRepository::new(tags.clone())
            .with_links(&1, "tags", &[1, 2, 3])
            .map_err(setup)?;
        Ok(Self {
            tasks: InMemoryRepository::new(tasks).map_err(setup)?,
            projects: InMemoryRepository::new([web]).map_err(setup)?,
            tags,
            task_tags,
        })
    }

    /// Builds a registry over clones of the repositories.
    pub fn registry(&self) -> Result<ResourceRegistry, TestError> {
        Ok(ResourceRegistry::builder()
            .add_repository(self.tasks.clone())
            .add_repository(self.projects.clone())
            .add_repository(self.tags.clone())
            .add_relationship_repository(self.task_tags.clone())
            .build()?)
    }

    /// Builds a dispatcher with `config`.
    pub fn dispatcher(&self, config: &MeridianConfig) -> Result<RequestDispatcher, TestError> {
        Ok(RequestDispatcher::builder(Arc::new(self.registry()?))
            .config(config)
            .build()?)
    }

    /// Builds a client with the default configuration.
    pub fn client(&self) -> Result<TestClient, TestError> {
        Ok(TestClient::new(self.dispatcher(&MeridianConfig::default())?))
    }
}

fn setup(error: anyhow::Error) -> TestError {
    match error.downcast::<meridian_core::JsonApiError>() {
        Ok(error) => TestError::Setup(error),
        Err(error) => TestError::Setup(meridian_core::JsonApiError::internal(error.to_string())),
    }
}
