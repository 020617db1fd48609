//! JSON:API path parsing for Meridian.
//!
//! JSON:API fixes the URL layout, so there is no route table to configure.
//! [`PathBuilder`] turns a request path into a [`JsonPath`], one of four
//! shapes:
//!
//! ```text
//! /{type}                                  Collection
//! /{type}/{id}[,{id}...]                   Resource
//! /{type}/{id}/{field}                     Field
//! /{type}/{id}/relationships/{field}       Relationship
//! ```
//!
//! Parsing is purely syntactic; checking the resource type and field names
//! against the registry is left to the dispatcher. [`MethodTable`] maps HTTP
//! methods to handlers for one path shape.
//!
//! # Example
//!
//! ```rust
//! use meridian_router::{JsonPath, PathBuilder, PathShape};
//!
//! let builder = PathBuilder::new().with_prefix("/api");
//! let path = builder.build("/api/tasks/1,2").unwrap().unwrap();
//!
//! assert_eq!(path.shape(), PathShape::Resource);
//! assert_eq!(path.resource_type(), "tasks");
//! assert!(path.is_collection());
//! ```

mod builder;
mod ids;
mod method_table;
mod path;

pub use builder::{PathBuilder, RELATIONSHIPS_SEGMENT};
pub use ids::PathIds;
pub use method_table::MethodTable;
pub use path::{JsonPath, PathShape};
