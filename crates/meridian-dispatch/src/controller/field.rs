//! Controllers for `/{type}/{id}/{field}`.
//!
//! The query of a field path is rooted at the related type, so include and
//! fieldset parameters apply to the related resources.

use super::body::WritePlan;
use super::collection::single_resource;
use super::Controller;
use crate::{RequestScope, Response};
use async_trait::async_trait;
use http::Method;
use meridian_core::{Entity, JsonApiError, JsonApiResult, WriteOperation};
use meridian_repository::JsonApiResponse;
use meridian_router::{JsonPath, PathShape};

/// `GET /{type}/{id}/{field}`: the related resources.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldResourceGet;

#[async_trait]
impl Controller for FieldResourceGet {
    fn name(&self) -> &'static str {
        "FieldResourceGet"
    }

    fn path_shape(&self) -> PathShape {
        PathShape::Field
    }

    fn method(&self) -> Method {
        Method::GET
    }

    async fn handle(&self, scope: &RequestScope) -> JsonApiResult<Response> {
        let response = find_targets(scope).await?;
        Ok(Response::ok(scope.to_document(&response).await?))
    }
}

/// Reads the targets of the path's relationship through its relationship
/// repository.
pub(super) async fn find_targets(scope: &RequestScope) -> JsonApiResult<JsonApiResponse> {
    let field = scope.field()?;
    let id = scope.single_id()?;
    let adapter = scope.entry().relationship_repository_for(field)?;
    if field.is_collection() {
        adapter.find_many_targets(&id, field, scope.query()).await
    } else {
        adapter.find_one_target(&id, field, scope.query()).await
    }
}

/// `POST /{type}/{id}/{field}`: creates a related resource and links it to
/// the owner.
///
/// The target is created first through its own repository; linking follows
/// through the relationship repository (`add_relations` for to-many,
/// `set_relation` for to-one). When linking fails the target stays created
/// and the error carries its document.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldResourcePost;

#[async_trait]
impl Controller for FieldResourcePost {
    fn name(&self) -> &'static str {
        "FieldResourcePost"
    }

    fn path_shape(&self) -> PathShape {
        PathShape::Field
    }

    fn method(&self) -> Method {
        Method::POST
    }

    fn is_acceptable(&self, path: &JsonPath, method: &Method) -> bool {
        path.shape() == PathShape::Field && *method == Method::POST && !path.is_collection()
    }

    async fn handle(&self, scope: &RequestScope) -> JsonApiResult<Response> {
        let field = scope.field()?;
        let target = scope.target_entry()?;
        let target_info = target.information();

        let document = scope.require_document()?;
        let resource = single_resource(&document)?;
        let plan = WritePlan::build(
            resource,
            target_info,
            scope.registry(),
            scope.registry().type_parser(),
            WriteOperation::Post,
            scope.settings(),
        )?;

        let source = scope.load_source().await?;

        let mut entity = Entity::new();
        plan.apply(&mut entity, target_info, scope.registry()).await?;
        let created = target.repository().create(entity, scope.query()).await?;
        let created_id = created
            .single_entity()
            .and_then(|entity| target_info.entity_id(entity))
            .cloned()
            .ok_or_else(|| {
                JsonApiError::internal(format!(
                    "repository of '{}' returned a resource without id",
                    target_info.resource_type()
                ))
            })?;
        let created_document = scope.to_document(&created).await?;

        let adapter = scope.entry().relationship_repository_for(field)?;
        let linked = if field.is_collection() {
            adapter
                .add_relations(&source, std::slice::from_ref(&created_id), field, scope.query())
                .await
        } else {
            adapter
                .set_relation(&source, Some(&created_id), field, scope.query())
                .await
        };

        match linked {
            Ok(()) => Ok(Response::created(created_document)),
            Err(cause) => {
                tracing::error!(
                    resource_type = scope.entry().resource_type(),
                    field = field.json_name(),
                    created = %target_info.to_id_string(&created_id),
                    error = %cause,
                    "created resource could not be linked"
                );
                Err(JsonApiError::partial_failure(created_document, cause))
            }
        }
    }
}
