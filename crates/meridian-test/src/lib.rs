//! # Meridian Test
//!
//! Test utilities for Meridian: requests are dispatched in memory, with no
//! transport in between.
//!
//! - [`TestClient`]: fluent requests against a [`RequestDispatcher`], with
//!   responses read back from their wire form
//! - [`InMemoryRepository`], [`RecordingRelationshipRepository`]: repositories
//!   over vectors that record every call in a [`CallLog`]
//! - [`Fixtures`]: tasks, projects and tags, ready to register
//!
//! ## Example
//!
//! ```
//! use meridian_test::Fixtures;
//!
//! let fixtures = Fixtures::seeded().unwrap();
//! let response = tokio_test::block_on(async {
//!     let client = fixtures.client().unwrap();
//!     client.get("/tasks/1/relationships/tags").send().await
//! });
//!
//! assert_eq!(response.status_code(), 200);
//! assert_eq!(response.data_ids(), vec!["1", "2", "3"]);
//! assert_eq!(
//!     fixtures.task_tags.calls().calls(),
//!     vec!["find_many_targets(1, tags)"]
//! );
//! ```
//!
//! [`RequestDispatcher`]: meridian_dispatch::RequestDispatcher

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod client;
mod error;
mod fixtures;
mod repository;
mod response;

pub use client::{TestClient, TestClientRequest};
pub use error::TestError;
pub use fixtures::{Fixtures, Project, Tag, Task};
pub use repository::{CallLog, InMemoryRepository, RecordingRelationshipRepository};
pub use response::TestResponse;
