//! The request pipeline.
//!
//! [`RequestDispatcher::dispatch`] runs one request end to end:
//!
//! 1. parse the path (an optional prefix is stripped)
//! 2. select the controller for `(shape, method)`
//! 3. resolve the resource type and relationship in the registry
//! 4. parse the query against the addressed type (the related type for
//!    field and relationship paths)
//! 5. consult the [`AccessGuard`], if any
//! 6. run the controller
//!
//! Failures at any step become error documents through the
//! [`ExceptionMapperRegistry`]. Each request runs in an `info` span carrying
//! request id, method, path and controller, and is counted in the request
//! metrics.

use crate::controller::{Controller, ControllerRegistry};
use crate::exception::ExceptionMapperRegistry;
use crate::guard::{AccessGuard, AccessRequest};
use crate::mapper::DocumentMapper;
use crate::response::Response;
use crate::scope::{DispatchSettings, RequestScope};
use meridian_config::MeridianConfig;
use meridian_core::{JsonApiError, JsonApiResult, QueryAdapter, RequestContext};
use meridian_extract::{
    parse_query_params, JsonApiRequest, QueryParserSettings, QuerySpecDeserializer, RequestBody,
};
use meridian_repository::ResourceRegistry;
use meridian_router::{PathBuilder, PathShape};
use meridian_telemetry::{record_repository_error, record_request, InFlightGuard};
use std::fmt;
use std::sync::Arc;
use tracing::Instrument;

/// Dispatches JSON:API requests to controllers.
pub struct RequestDispatcher {
    registry: Arc<ResourceRegistry>,
    controllers: ControllerRegistry,
    paths: PathBuilder,
    query_parser: QuerySpecDeserializer,
    body: RequestBody,
    mapper: Arc<DocumentMapper>,
    exception_mappers: ExceptionMapperRegistry,
    guard: Option<Arc<dyn AccessGuard>>,
    settings: DispatchSettings,
    base_url: Option<String>,
}

impl fmt::Debug for RequestDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestDispatcher")
            .field("resource_types", &self.registry.resource_types().collect::<Vec<_>>())
            .field("controllers", &self.controllers)
            .field("prefix", &self.paths.prefix())
            .field("guarded", &self.guard.is_some())
            .finish_non_exhaustive()
    }
}

impl RequestDispatcher {
    /// Creates a builder over `registry`.
    #[must_use]
    pub fn builder(registry: Arc<ResourceRegistry>) -> RequestDispatcherBuilder {
        RequestDispatcherBuilder::new(registry)
    }

    /// The registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<ResourceRegistry> {
        &self.registry
    }

    /// The controller table.
    #[must_use]
    pub fn controllers(&self) -> &ControllerRegistry {
        &self.controllers
    }

    /// The document mapper.
    #[must_use]
    pub fn mapper(&self) -> &Arc<DocumentMapper> {
        &self.mapper
    }

    /// Dispatches `request` with a fresh request context.
    pub async fn dispatch(&self, request: &JsonApiRequest) -> Response {
        self.dispatch_with_context(request, RequestContext::new())
            .await
    }

    /// Dispatches `request` within `context`.
    ///
    /// The context receives the request path and headers; a base URL from
    /// configuration is used when the context has none.
    pub async fn dispatch_with_context(
        &self,
        request: &JsonApiRequest,
        context: RequestContext,
    ) -> Response {
        let mut context = context
            .with_path(request.path())
            .with_headers(request.headers().clone());
        if context.base_url().is_none() {
            if let Some(base_url) = &self.base_url {
                context = context.with_base_url(base_url.clone());
            }
        }

        let span = tracing::info_span!(
            "jsonapi_request",
            request_id = %context.request_id(),
            method = %request.method(),
            path = request.path(),
            controller = tracing::field::Empty,
            status = tracing::field::Empty,
        );
        self.run(request, context).instrument(span).await
    }

    async fn run(&self, request: &JsonApiRequest, context: RequestContext) -> Response {
        let _in_flight = InFlightGuard::new();
        let mut controller_name = "none";
        let mut resource_type = None;

        let result = self
            .try_dispatch(request, &context, &mut controller_name, &mut resource_type)
            .await;
        let response = match result {
            Ok(response) => response,
            Err(error) => self.error_response(&error, resource_type.as_deref()),
        };

        let span = tracing::Span::current();
        span.record("controller", controller_name);
        span.record("status", response.status().as_u16());
        tracing::info!(
            status = response.status().as_u16(),
            elapsed_ms = context.elapsed().as_millis() as u64,
            "request completed"
        );
        record_request(controller_name, response.status().as_u16(), context.elapsed());
        response
    }

    async fn try_dispatch(
        &self,
        request: &JsonApiRequest,
        context: &RequestContext,
        controller_name: &mut &'static str,
        resource_type: &mut Option<String>,
    ) -> JsonApiResult<Response> {
        let method = request.method();
        let path = self
            .paths
            .build(request.path())?
            .ok_or_else(|| JsonApiError::routing(method.as_str(), request.path(), false))?;
        *resource_type = Some(path.resource_type().to_string());

        let controller = self.controllers.select(&path, method)?;
        *controller_name = controller.name();

        let entry = self.registry.get_entry(path.resource_type())?.clone();
        let field = match path.element_name() {
            Some(name) => Some(
                entry
                    .information()
                    .find_relationship_field_by_name(name)
                    .cloned()
                    .ok_or_else(|| JsonApiError::field_not_found(entry.resource_type(), name))?,
            ),
            None => None,
        };

        let query_root = match &field {
            Some(field) if matches!(path.shape(), PathShape::Field | PathShape::Relationship) => {
                let target = field.opposite_resource_type().ok_or_else(|| {
                    JsonApiError::field_not_found(entry.resource_type(), field.json_name())
                })?;
                self.registry.get_entry(target)?.information().clone()
            }
            _ => entry.information().clone(),
        };
        let params = parse_query_params(request.query_string())?;
        let spec = self
            .query_parser
            .deserialize(&query_root, self.registry.as_ref(), &params)?;
        let query = QueryAdapter::new(spec, params);

        if let Some(guard) = &self.guard {
            guard
                .check(&AccessRequest {
                    method,
                    resource_type: entry.resource_type(),
                    field: field.as_ref().map(|f| f.json_name()),
                    context,
                })
                .await?;
        }

        let scope = RequestScope {
            path,
            method: method.clone(),
            registry: Arc::clone(&self.registry),
            entry,
            field,
            query,
            request: request.clone(),
            body: self.body,
            context: context.clone(),
            mapper: Arc::clone(&self.mapper),
            settings: self.settings,
        };
        controller.handle(&scope).await
    }

    fn error_response(&self, error: &JsonApiError, resource_type: Option<&str>) -> Response {
        let response = self.exception_mappers.to_response(error);
        if response.status().is_server_error() {
            tracing::warn!(error = %error, code = error.error_code(), "request failed");
        } else {
            tracing::debug!(error = %error, code = error.error_code(), "request rejected");
        }
        if matches!(error, JsonApiError::Repository(_) | JsonApiError::PartialFailure { .. }) {
            record_repository_error(resource_type.unwrap_or("unknown"));
        }
        response
    }
}

/// Builder for [`RequestDispatcher`].
pub struct RequestDispatcherBuilder {
    registry: Arc<ResourceRegistry>,
    config: MeridianConfig,
    guard: Option<Arc<dyn AccessGuard>>,
    exception_mappers: ExceptionMapperRegistry,
    controllers: Vec<Arc<dyn Controller>>,
    replacements: Vec<Arc<dyn Controller>>,
    without_defaults: bool,
}

impl fmt::Debug for RequestDispatcherBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestDispatcherBuilder")
            .field("config", &self.config)
            .field("guarded", &self.guard.is_some())
            .field("exception_mappers", &self.exception_mappers.len())
            .field("controllers", &self.controllers.len())
            .finish_non_exhaustive()
    }
}

impl RequestDispatcherBuilder {
    fn new(registry: Arc<ResourceRegistry>) -> Self {
        Self {
            registry,
            config: MeridianConfig::default(),
            guard: None,
            exception_mappers: ExceptionMapperRegistry::new(),
            controllers: Vec::new(),
            replacements: Vec::new(),
            without_defaults: false,
        }
    }

    /// Applies engine, query and body settings.
    #[must_use]
    pub fn config(mut self, config: &MeridianConfig) -> Self {
        self.config = config.clone();
        self
    }

    /// Authorizes requests with `guard`.
    #[must_use]
    pub fn guard(mut self, guard: impl AccessGuard + 'static) -> Self {
        self.guard = Some(Arc::new(guard));
        self
    }

    /// Renders repository errors with `mappers`.
    #[must_use]
    pub fn exception_mappers(mut self, mappers: ExceptionMapperRegistry) -> Self {
        self.exception_mappers = mappers;
        self
    }

    /// Adds a controller for a `(shape, method)` not served by the defaults.
    #[must_use]
    pub fn controller(mut self, controller: impl Controller + 'static) -> Self {
        self.controllers.push(Arc::new(controller));
        self
    }

    /// Replaces the default controller for the same `(shape, method)`.
    #[must_use]
    pub fn replace_controller(mut self, controller: impl Controller + 'static) -> Self {
        self.replacements.push(Arc::new(controller));
        self
    }

    /// Starts from an empty controller table.
    #[must_use]
    pub fn without_default_controllers(mut self) -> Self {
        self.without_defaults = true;
        self
    }

    /// Builds the dispatcher.
    ///
    /// # Errors
    ///
    /// Fails when two controllers claim the same `(shape, method)`.
    pub fn build(self) -> JsonApiResult<RequestDispatcher> {
        let mut controllers = if self.without_defaults {
            ControllerRegistry::new()
        } else {
            ControllerRegistry::with_defaults()
        };
        for controller in self.controllers {
            controllers.register_arc(controller)?;
        }
        for controller in self.replacements {
            controllers.replace(controller)?;
        }

        let config = &self.config;
        let mut paths = PathBuilder::new();
        if let Some(prefix) = &config.engine.path_prefix {
            paths = paths.with_prefix(prefix.clone());
        }
        let query_parser = QuerySpecDeserializer::new(QueryParserSettings {
            default_page_limit: config.query.default_page_limit,
            max_page_limit: config.query.max_page_limit,
            allow_unknown_parameters: config.query.allow_unknown_parameters,
        })
        .with_type_parser(self.registry.type_parser().clone());
        let mapper = Arc::new(DocumentMapper::from_config(Arc::clone(&self.registry), config));

        tracing::debug!(
            resource_types = self.registry.len(),
            controllers = controllers.len(),
            "dispatcher built"
        );
        Ok(RequestDispatcher {
            registry: self.registry,
            controllers,
            paths,
            query_parser,
            body: RequestBody::new(config.body.max_body_bytes),
            mapper,
            exception_mappers: self.exception_mappers,
            guard: self.guard,
            settings: DispatchSettings::from_config(config),
            base_url: config.engine.base_url.clone(),
        })
    }
}
