//! # Meridian Dispatch
//!
//! The request pipeline of the Meridian JSON:API framework.
//!
//! ```text
//! JsonApiRequest → PathBuilder → ControllerRegistry → QuerySpec → AccessGuard
//!                                                                     ↓
//! Response ← ExceptionMapperRegistry ← DocumentMapper ← Controller ←──┘
//! ```
//!
//! - [`RequestDispatcher`] runs a request through path parsing, controller
//!   selection, query parsing and authorization, then hands a
//!   [`RequestScope`] to the selected [`Controller`]
//! - the eleven default controllers serve every JSON:API operation against
//!   the repositories of the [`ResourceRegistry`](meridian_repository::ResourceRegistry)
//! - [`DocumentMapper`] turns repository results into documents, resolving
//!   `include` paths with deduplication
//! - [`ExceptionMapperRegistry`] renders failures as error documents
//!
//! ## Example
//!
//! ```
//! use http::Method;
//! use meridian_dispatch::{AccessPolicy, ControllerRegistry};
//!
//! let controllers = ControllerRegistry::with_defaults();
//! assert_eq!(controllers.len(), 11);
//!
//! let policy = AccessPolicy::builder().allow_reads("tasks").build();
//! assert!(policy.permits("tasks", &Method::GET));
//! assert!(!policy.permits("tasks", &Method::DELETE));
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod controller;
mod dispatcher;
mod exception;
mod guard;
mod mapper;
mod response;
mod scope;

#[cfg(test)]
mod test_support;

pub use controller::{
    CollectionGet, Controller, ControllerRegistry, FieldResourceGet, FieldResourcePost,
    RelationshipsResourceDelete, RelationshipsResourceGet, RelationshipsResourcePatch,
    RelationshipsResourcePost, ResourceDelete, ResourceGet, ResourcePatch, ResourcePost,
};
pub use dispatcher::{RequestDispatcher, RequestDispatcherBuilder};
pub use exception::{ExceptionMapper, ExceptionMapperRegistry, ExceptionMapperRegistryBuilder};
pub use guard::{AccessGuard, AccessPolicy, AccessPolicyBuilder, AccessRequest};
pub use mapper::{DocumentMapper, TOTAL_RESOURCE_COUNT};
pub use response::Response;
pub use scope::{DispatchSettings, RequestScope};
