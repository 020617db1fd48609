//! Controllers for `/{type}`.

use super::body::WritePlan;
use super::Controller;
use crate::{RequestScope, Response};
use async_trait::async_trait;
use http::Method;
use meridian_core::{Entity, JsonApiError, JsonApiResult, Resource, WriteOperation};
use meridian_router::PathShape;

/// `GET /{type}`: all resources matching the query.
#[derive(Debug, Clone, Copy, Default)]
pub struct CollectionGet;

#[async_trait]
impl Controller for CollectionGet {
    fn name(&self) -> &'static str {
        "CollectionGet"
    }

    fn path_shape(&self) -> PathShape {
        PathShape::Collection
    }

    fn method(&self) -> Method {
        Method::GET
    }

    async fn handle(&self, scope: &RequestScope) -> JsonApiResult<Response> {
        let response = scope.entry().repository().find_all(scope.query()).await?;
        Ok(Response::ok(scope.to_document(&response).await?))
    }
}

/// `POST /{type}`: creates a resource.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResourcePost;

#[async_trait]
impl Controller for ResourcePost {
    fn name(&self) -> &'static str {
        "ResourcePost"
    }

    fn path_shape(&self) -> PathShape {
        PathShape::Collection
    }

    fn method(&self) -> Method {
        Method::POST
    }

    async fn handle(&self, scope: &RequestScope) -> JsonApiResult<Response> {
        let document = scope.require_document()?;
        let resource = single_resource(&document)?;
        let info = scope.information();
        let plan = WritePlan::build(
            resource,
            info,
            scope.registry(),
            scope.registry().type_parser(),
            WriteOperation::Post,
            scope.settings(),
        )?;

        let mut entity = Entity::new();
        plan.apply(&mut entity, info, scope.registry()).await?;
        let created = scope
            .entry()
            .repository()
            .create(entity, scope.query())
            .await?;
        Ok(Response::created(scope.to_document(&created).await?))
    }
}

/// The single resource object of a request document.
pub(super) fn single_resource(document: &meridian_core::Document) -> JsonApiResult<&Resource> {
    document
        .single_data()
        .ok_or_else(|| JsonApiError::bad_body("/data", "expected a single resource object"))
}
