//! # Meridian
//!
//! A JSON:API resource framework: declare resources, register repositories,
//! and dispatch JSON:API requests against them.
//!
//! ```text
//! #[derive(JsonApiResource)] ─→ ResourceRegistry ←─ repositories
//!                                      │
//! JsonApiRequest ─→ RequestDispatcher ─┴─→ Response (JSON:API document)
//! ```
//!
//! | Crate | Re-exported as | Contents |
//! |---|---|---|
//! | `meridian-core` | [`core`] | resource information, documents, queries, errors |
//! | `meridian-router` | [`router`] | path parsing |
//! | `meridian-extract` | [`extract`] | requests, query and body parsing |
//! | `meridian-repository` | [`repository`] | repository conventions, the registry |
//! | `meridian-dispatch` | [`dispatch`] | controllers, document mapping, error mapping |
//! | `meridian-config` | [`config`] | layered configuration |
//! | `meridian-telemetry` | [`telemetry`] | logging and metrics |
//!
//! ## Example
//!
//! ```rust,ignore
//! use meridian::prelude::*;
//!
//! #[derive(Serialize, Deserialize, JsonApiResource)]
//! #[jsonapi(resource_type = "tags", crate = "meridian::core")]
//! struct Tag {
//!     id: u64,
//!     label: String,
//! }
//!
//! let registry = ResourceRegistry::builder()
//!     .add_repository(TagRepository::default())
//!     .build()?;
//! let dispatcher = RequestDispatcher::builder(Arc::new(registry))
//!     .config(&ConfigLoader::new().load()?)
//!     .build()?;
//!
//! let response = dispatcher.dispatch(&request).await;
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export core types
pub use meridian_core as core;

// Re-export path parsing
pub use meridian_router as router;

// Re-export request extraction
pub use meridian_extract as extract;

// Re-export repositories and the registry
pub use meridian_repository as repository;

// Re-export dispatch
pub use meridian_dispatch as dispatch;

// Re-export configuration
pub use meridian_config as config;

// Re-export telemetry
pub use meridian_telemetry as telemetry;

// Re-export the derive macro
pub use meridian_macros::JsonApiResource;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust
/// use meridian::prelude::*;
///
/// let config = MeridianConfig::default();
/// assert_eq!(config.engine.lookup_behavior, LookupIncludeBehavior::WhenNull);
/// ```
pub mod prelude {
    pub use meridian_core::{
        Document, Entity, FieldDescriptor, IdOf, ImmutableWriteBehavior, JsonApiError,
        JsonApiResource, JsonApiResult, LookupIncludeBehavior, QuerySpec, RequestContext,
        Resource, ResourceDescriptor,
    };

    // Re-export the derive macro
    pub use meridian_macros::JsonApiResource;

    // Re-export repository conventions
    pub use meridian_repository::{
        LegacyRelationshipRepository, LegacyResourceRepository, RelationshipRepository,
        ResourceList, ResourceRegistry, ResourceRepository,
    };

    // Re-export dispatch types
    pub use meridian_dispatch::{
        AccessGuard, AccessPolicy, ExceptionMapperRegistry, RequestDispatcher, Response,
    };

    // Re-export requests
    pub use meridian_extract::JsonApiRequest;

    // Re-export configuration
    pub use meridian_config::{ConfigLoader, MeridianConfig};

    // Re-export logging
    pub use meridian_telemetry::{init_logging, LogConfig};
}
