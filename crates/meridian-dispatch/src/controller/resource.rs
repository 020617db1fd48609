//! Controllers for `/{type}/{ids}`.

use super::body::WritePlan;
use super::collection::single_resource;
use super::Controller;
use crate::{RequestScope, Response};
use async_trait::async_trait;
use http::Method;
use meridian_core::{Document, JsonApiError, JsonApiResult, WriteOperation};
use meridian_router::{JsonPath, PathShape};

/// `GET /{type}/{id}` and `GET /{type}/{id},{id}...`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResourceGet;

#[async_trait]
impl Controller for ResourceGet {
    fn name(&self) -> &'static str {
        "ResourceGet"
    }

    fn path_shape(&self) -> PathShape {
        PathShape::Resource
    }

    fn method(&self) -> Method {
        Method::GET
    }

    async fn handle(&self, scope: &RequestScope) -> JsonApiResult<Response> {
        let repository = scope.entry().repository();
        if scope.path().is_collection() {
            let ids = scope.ids()?;
            let response = repository.find_all_by_ids(&ids, scope.query()).await?;
            return Ok(Response::ok(scope.to_document(&response).await?));
        }

        let id = scope.single_id()?;
        let response = repository.find_one(&id, scope.query()).await?;
        if response.single_entity().is_none() {
            if scope.settings().return_404_on_null {
                return Err(JsonApiError::resource_not_found(
                    scope.entry().resource_type(),
                    scope.information().to_id_string(&id),
                ));
            }
            return Ok(Response::ok(Document::null()));
        }
        Ok(Response::ok(scope.to_document(&response).await?))
    }
}

/// `PATCH /{type}/{id}`: updates attributes and relationships.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResourcePatch;

#[async_trait]
impl Controller for ResourcePatch {
    fn name(&self) -> &'static str {
        "ResourcePatch"
    }

    fn path_shape(&self) -> PathShape {
        PathShape::Resource
    }

    fn method(&self) -> Method {
        Method::PATCH
    }

    fn is_acceptable(&self, path: &JsonPath, method: &Method) -> bool {
        path.shape() == PathShape::Resource && *method == Method::PATCH && !path.is_collection()
    }

    async fn handle(&self, scope: &RequestScope) -> JsonApiResult<Response> {
        let id = scope.single_id()?;
        let info = scope.information();
        let document = scope.require_document()?;
        let resource = single_resource(&document)?;

        if let Some(body_id) = &resource.id {
            let body_id = info.parse_id_string(body_id, scope.registry().type_parser())?;
            if body_id != id {
                return Err(JsonApiError::bad_body(
                    "/data/id",
                    format!(
                        "id '{}' does not match the path id '{}'",
                        info.to_id_string(&body_id),
                        info.to_id_string(&id)
                    ),
                ));
            }
        }

        let plan = WritePlan::build(
            resource,
            info,
            scope.registry(),
            scope.registry().type_parser(),
            WriteOperation::Patch,
            scope.settings(),
        )?;

        let mut entity = scope
            .entry()
            .repository()
            .find_one(&id, scope.query())
            .await?
            .into_single()
            .ok_or_else(|| {
                JsonApiError::resource_not_found(info.resource_type(), info.to_id_string(&id))
            })?;
        plan.apply(&mut entity, info, scope.registry()).await?;

        let updated = scope
            .entry()
            .repository()
            .update(entity, scope.query())
            .await?;
        Ok(Response::ok(scope.to_document(&updated).await?))
    }
}

/// `DELETE /{type}/{ids}`: one repository delete per id.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResourceDelete;

#[async_trait]
impl Controller for ResourceDelete {
    fn name(&self) -> &'static str {
        "ResourceDelete"
    }

    fn path_shape(&self) -> PathShape {
        PathShape::Resource
    }

    fn method(&self) -> Method {
        Method::DELETE
    }

    async fn handle(&self, scope: &RequestScope) -> JsonApiResult<Response> {
        let repository = scope.entry().repository();
        for id in scope.ids()? {
            repository.delete(&id, scope.query()).await?;
        }
        Ok(Response::no_content())
    }
}
