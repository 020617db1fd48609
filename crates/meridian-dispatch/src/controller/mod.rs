//! Controllers and their `(path shape, method)` table.
//!
//! Every JSON:API operation is served by one [`Controller`]. The
//! [`ControllerRegistry`] keys controllers by [`PathShape`] and [`Method`];
//! registering a second controller for a key is an error.
//!
//! | Shape | GET | POST | PATCH | DELETE |
//! |---|---|---|---|---|
//! | `/{type}` | [`CollectionGet`] | [`ResourcePost`] | | |
//! | `/{type}/{ids}` | [`ResourceGet`] | | [`ResourcePatch`] | [`ResourceDelete`] |
//! | `/{type}/{id}/{field}` | [`FieldResourceGet`] | [`FieldResourcePost`] | | |
//! | `/{type}/{id}/relationships/{field}` | [`RelationshipsResourceGet`] | [`RelationshipsResourcePost`] | [`RelationshipsResourcePatch`] | [`RelationshipsResourceDelete`] |

mod body;
mod collection;
mod field;
mod relationships;
mod resource;

pub use collection::{CollectionGet, ResourcePost};
pub use field::{FieldResourceGet, FieldResourcePost};
pub use relationships::{
    RelationshipsResourceDelete, RelationshipsResourceGet, RelationshipsResourcePatch,
    RelationshipsResourcePost,
};
pub use resource::{ResourceDelete, ResourceGet, ResourcePatch};

use crate::{RequestScope, Response};
use async_trait::async_trait;
use http::Method;
use meridian_core::{JsonApiError, JsonApiResult};
use meridian_router::{JsonPath, MethodTable, PathShape};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Serves one JSON:API operation.
#[async_trait]
pub trait Controller: Send + Sync {
    /// Name used in logs and metrics.
    fn name(&self) -> &'static str;

    /// Path shape served.
    fn path_shape(&self) -> PathShape;

    /// Method served.
    fn method(&self) -> Method;

    /// Final check after the table lookup.
    fn is_acceptable(&self, path: &JsonPath, method: &Method) -> bool {
        path.shape() == self.path_shape() && *method == self.method()
    }

    /// Handles the request.
    async fn handle(&self, scope: &RequestScope) -> JsonApiResult<Response>;
}

/// Controllers keyed by path shape and method.
///
/// # Example
///
/// ```rust
/// use http::Method;
/// use meridian_dispatch::ControllerRegistry;
/// use meridian_router::PathBuilder;
///
/// let registry = ControllerRegistry::with_defaults();
/// assert_eq!(registry.len(), 11);
///
/// let path = PathBuilder::new().build("/tasks/1/relationships/tags").unwrap().unwrap();
/// let controller = registry.select(&path, &Method::DELETE).unwrap();
/// assert_eq!(controller.name(), "RelationshipsResourceDelete");
///
/// let collection = PathBuilder::new().build("/tasks").unwrap().unwrap();
/// let error = registry.select(&collection, &Method::DELETE).err().unwrap();
/// assert_eq!(error.status_code().as_u16(), 405);
/// ```
#[derive(Default, Clone)]
pub struct ControllerRegistry {
    tables: HashMap<PathShape, MethodTable<Arc<dyn Controller>>>,
}

impl fmt::Debug for ControllerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().map(|c| c.name()).collect();
        f.debug_struct("ControllerRegistry")
            .field("controllers", &names)
            .finish()
    }
}

impl ControllerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with the eleven standard controllers.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        let defaults: [Arc<dyn Controller>; 11] = [
            Arc::new(CollectionGet),
            Arc::new(ResourcePost),
            Arc::new(ResourceGet),
            Arc::new(ResourcePatch),
            Arc::new(ResourceDelete),
            Arc::new(FieldResourceGet),
            Arc::new(FieldResourcePost),
            Arc::new(RelationshipsResourceGet),
            Arc::new(RelationshipsResourcePost),
            Arc::new(RelationshipsResourcePatch),
            Arc::new(RelationshipsResourceDelete),
        ];
        for controller in defaults {
            let shape = controller.path_shape();
            let method = controller.method();
            // Keys of the defaults are distinct.
            let _ = registry
                .tables
                .entry(shape)
                .or_default()
                .insert(&method, controller);
        }
        registry
    }

    /// Registers a controller.
    ///
    /// # Errors
    ///
    /// Fails when a controller is already registered for the same shape and
    /// method, or the method is not a JSON:API method.
    pub fn register(&mut self, controller: impl Controller + 'static) -> JsonApiResult<()> {
        self.register_arc(Arc::new(controller))
    }

    /// Registers a shared controller.
    ///
    /// # Errors
    ///
    /// See [`register`](Self::register).
    pub fn register_arc(&mut self, controller: Arc<dyn Controller>) -> JsonApiResult<()> {
        let shape = controller.path_shape();
        let method = controller.method();
        let table = self.tables.entry(shape).or_default();
        table.insert(&method, controller).map_err(|rejected| {
            let existing = table.get(&method).map_or("none", |c| c.name());
            JsonApiError::internal(format!(
                "cannot register {} for {method} on {shape} paths: taken by {existing}",
                rejected.name()
            ))
        })
    }

    /// Replaces the controller for its shape and method.
    pub fn replace(&mut self, controller: Arc<dyn Controller>) -> JsonApiResult<()> {
        let shape = controller.path_shape();
        let method = controller.method();
        let table = self.tables.entry(shape).or_default();
        let mut rebuilt = MethodTable::new();
        for (existing_method, existing) in table.iter() {
            if existing_method != method {
                let _ = rebuilt.insert(&existing_method, Arc::clone(existing));
            }
        }
        rebuilt.insert(&method, controller).map_err(|rejected| {
            JsonApiError::internal(format!(
                "cannot register {} for {method}: not a JSON:API method",
                rejected.name()
            ))
        })?;
        *table = rebuilt;
        Ok(())
    }

    /// Selects the controller for `path` and `method`.
    ///
    /// # Errors
    ///
    /// A routing error: `404` when nothing serves the shape, `405` when the
    /// shape is served but not for `method`.
    pub fn select(&self, path: &JsonPath, method: &Method) -> JsonApiResult<&Arc<dyn Controller>> {
        let table = self
            .tables
            .get(&path.shape())
            .filter(|table| table.has_any_method())
            .ok_or_else(|| JsonApiError::routing(method.as_str(), path.to_string(), false))?;
        let controller = table
            .get(method)
            .ok_or_else(|| JsonApiError::routing(method.as_str(), path.to_string(), true))?;
        if !controller.is_acceptable(path, method) {
            tracing::debug!(controller = controller.name(), %path, "controller declined path");
            return Err(JsonApiError::routing(method.as_str(), path.to_string(), false));
        }
        tracing::debug!(controller = controller.name(), %path, %method, "controller selected");
        Ok(controller)
    }

    /// Number of registered controllers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Returns true if no controller is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates the registered controllers.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Controller>> {
        self.tables
            .values()
            .flat_map(|table| table.iter().map(|(_, controller)| controller))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_router::PathBuilder;

    struct Echo(Method);

    #[async_trait]
    impl Controller for Echo {
        fn name(&self) -> &'static str {
            "Echo"
        }

        fn path_shape(&self) -> PathShape {
            PathShape::Collection
        }

        fn method(&self) -> Method {
            self.0.clone()
        }

        async fn handle(&self, _scope: &RequestScope) -> JsonApiResult<Response> {
            Ok(Response::no_content())
        }
    }

    fn path(raw: &str) -> JsonPath {
        PathBuilder::new().build(raw).unwrap().unwrap()
    }

    #[test]
    fn test_defaults_cover_every_operation() {
        let registry = ControllerRegistry::with_defaults();
        let cases = [
            ("/tasks", Method::GET, "CollectionGet"),
            ("/tasks", Method::POST, "ResourcePost"),
            ("/tasks/1", Method::GET, "ResourceGet"),
            ("/tasks/1,2", Method::GET, "ResourceGet"),
            ("/tasks/1", Method::PATCH, "ResourcePatch"),
            ("/tasks/1", Method::DELETE, "ResourceDelete"),
            ("/tasks/1/project", Method::GET, "FieldResourceGet"),
            ("/tasks/1/project", Method::POST, "FieldResourcePost"),
            ("/tasks/1/relationships/tags", Method::GET, "RelationshipsResourceGet"),
            ("/tasks/1/relationships/tags", Method::POST, "RelationshipsResourcePost"),
            ("/tasks/1/relationships/tags", Method::PATCH, "RelationshipsResourcePatch"),
            ("/tasks/1/relationships/tags", Method::DELETE, "RelationshipsResourceDelete"),
        ];
        for (raw, method, expected) in cases {
            let controller = registry.select(&path(raw), &method).unwrap();
            assert_eq!(controller.name(), expected, "{method} {raw}");
        }
    }

    #[test]
    fn test_duplicate_registration_is_rejected() {
        let mut registry = ControllerRegistry::with_defaults();
        let error = registry.register(Echo(Method::GET)).unwrap_err();
        assert!(error.to_string().contains("CollectionGet"));
        assert_eq!(registry.len(), 11);
    }

    #[test]
    fn test_replace_swaps_one_method() {
        let mut registry = ControllerRegistry::with_defaults();
        registry.replace(Arc::new(Echo(Method::GET))).unwrap();
        assert_eq!(registry.select(&path("/tasks"), &Method::GET).unwrap().name(), "Echo");
        assert_eq!(
            registry.select(&path("/tasks"), &Method::POST).unwrap().name(),
            "ResourcePost"
        );
    }

    #[test]
    fn test_unserved_shape_is_not_found() {
        let mut registry = ControllerRegistry::new();
        registry.register(Echo(Method::GET)).unwrap();
        let error = registry.select(&path("/tasks/1"), &Method::GET).err().unwrap();
        assert_eq!(error.status_code().as_u16(), 404);
    }

    #[test]
    fn test_unserved_method_is_not_allowed() {
        let registry = ControllerRegistry::with_defaults();
        let error = registry
            .select(&path("/tasks/1/project"), &Method::DELETE)
            .err().unwrap();
        assert_eq!(error.status_code().as_u16(), 405);
    }

    #[test]
    fn test_field_post_requires_single_id() {
        let registry = ControllerRegistry::with_defaults();
        let error = registry
            .select(&path("/tasks/1,2/project"), &Method::POST)
            .err().unwrap();
        assert_eq!(error.status_code().as_u16(), 404);
    }
}
