//! Controllers for `/{type}/{id}/relationships/{field}`.
//!
//! Mutations go through the relationship repository serving the field and
//! require the field to be patchable. To-one relationships are replaced
//! with `PATCH` and cleared with `DELETE`; to-many relationships accept
//! `POST` (add), `PATCH` (replace) and `DELETE` (remove).

use super::body::{check_relationship_access, parse_identifiers};
use super::field::find_targets;
use super::Controller;
use crate::{RequestScope, Response};
use async_trait::async_trait;
use http::Method;
use meridian_core::{Document, JsonApiError, JsonApiResult, PrimaryData, ResourceField};
use meridian_router::PathShape;
use serde_json::Value;

/// `GET /{type}/{id}/relationships/{field}`: the linkage only.
#[derive(Debug, Clone, Copy, Default)]
pub struct RelationshipsResourceGet;

#[async_trait]
impl Controller for RelationshipsResourceGet {
    fn name(&self) -> &'static str {
        "RelationshipsResourceGet"
    }

    fn path_shape(&self) -> PathShape {
        PathShape::Relationship
    }

    fn method(&self) -> Method {
        Method::GET
    }

    async fn handle(&self, scope: &RequestScope) -> JsonApiResult<Response> {
        let field = scope.field()?;
        let id = scope.single_id()?;
        let response = find_targets(scope).await?;
        let document = scope.mapper().to_relationship_document(
            scope.entry().resource_type(),
            &scope.information().to_id_string(&id),
            field,
            &response,
            scope.context(),
        )?;
        Ok(Response::ok(document))
    }
}

/// `POST /{type}/{id}/relationships/{field}`: adds to a to-many relationship.
#[derive(Debug, Clone, Copy, Default)]
pub struct RelationshipsResourcePost;

#[async_trait]
impl Controller for RelationshipsResourcePost {
    fn name(&self) -> &'static str {
        "RelationshipsResourcePost"
    }

    fn path_shape(&self) -> PathShape {
        PathShape::Relationship
    }

    fn method(&self) -> Method {
        Method::POST
    }

    async fn handle(&self, scope: &RequestScope) -> JsonApiResult<Response> {
        let field = scope.field()?;
        if !field.is_collection() {
            return Err(JsonApiError::bad_request(format!(
                "cannot add to to-one relationship '{}'; use PATCH",
                field.json_name()
            )));
        }
        if !check_relationship_access(field, scope.settings())? {
            return Ok(Response::no_content());
        }
        let ids = many_ids(scope, field)?;
        let source = scope.load_source().await?;
        scope
            .entry()
            .relationship_repository_for(field)?
            .add_relations(&source, &ids, field, scope.query())
            .await?;
        Ok(Response::no_content())
    }
}

/// `PATCH /{type}/{id}/relationships/{field}`: replaces a relationship.
#[derive(Debug, Clone, Copy, Default)]
pub struct RelationshipsResourcePatch;

#[async_trait]
impl Controller for RelationshipsResourcePatch {
    fn name(&self) -> &'static str {
        "RelationshipsResourcePatch"
    }

    fn path_shape(&self) -> PathShape {
        PathShape::Relationship
    }

    fn method(&self) -> Method {
        Method::PATCH
    }

    async fn handle(&self, scope: &RequestScope) -> JsonApiResult<Response> {
        let field = scope.field()?;
        if !check_relationship_access(field, scope.settings())? {
            return Ok(Response::no_content());
        }
        let adapter = scope.entry().relationship_repository_for(field)?;

        if field.is_collection() {
            let ids = many_ids(scope, field)?;
            let source = scope.load_source().await?;
            adapter
                .set_relations(&source, &ids, field, scope.query())
                .await?;
        } else {
            let id = one_id(scope, field)?;
            let source = scope.load_source().await?;
            adapter
                .set_relation(&source, id.as_ref(), field, scope.query())
                .await?;
        }
        Ok(Response::no_content())
    }
}

/// `DELETE /{type}/{id}/relationships/{field}`.
///
/// To-many: removes the listed members in one repository call. To-one:
/// clears the relationship; the body is not read.
#[derive(Debug, Clone, Copy, Default)]
pub struct RelationshipsResourceDelete;

#[async_trait]
impl Controller for RelationshipsResourceDelete {
    fn name(&self) -> &'static str {
        "RelationshipsResourceDelete"
    }

    fn path_shape(&self) -> PathShape {
        PathShape::Relationship
    }

    fn method(&self) -> Method {
        Method::DELETE
    }

    async fn handle(&self, scope: &RequestScope) -> JsonApiResult<Response> {
        let field = scope.field()?;
        if !check_relationship_access(field, scope.settings())? {
            return Ok(Response::no_content());
        }
        let adapter = scope.entry().relationship_repository_for(field)?;

        if field.is_collection() {
            let ids = many_ids(scope, field)?;
            let source = scope.load_source().await?;
            adapter
                .remove_relations(&source, &ids, field, scope.query())
                .await?;
        } else {
            let source = scope.load_source().await?;
            adapter
                .set_relation(&source, None, field, scope.query())
                .await?;
        }
        Ok(Response::no_content())
    }
}

/// Target ids of a to-many linkage body: `{"data": [{"type", "id"}, ...]}`.
fn many_ids(scope: &RequestScope, field: &ResourceField) -> JsonApiResult<Vec<Value>> {
    let document = scope.require_document()?;
    match &document.data {
        Some(PrimaryData::Collection(resources)) => parse_identifiers(
            resources,
            field,
            scope.registry(),
            scope.registry().type_parser(),
        ),
        _ => Err(JsonApiError::bad_body(
            "/data",
            format!("'{}' expects an array of resource identifiers", field.json_name()),
        )),
    }
}

/// Target id of a to-one linkage body; `None` for `{"data": null}`.
fn one_id(scope: &RequestScope, field: &ResourceField) -> JsonApiResult<Option<Value>> {
    let document: Document = scope.require_document()?;
    match &document.data {
        Some(PrimaryData::Single(None)) => Ok(None),
        Some(PrimaryData::Single(Some(resource))) => parse_identifiers(
            [resource.as_ref()],
            field,
            scope.registry(),
            scope.registry().type_parser(),
        )
        .map(|ids| ids.into_iter().next()),
        _ => Err(JsonApiError::bad_body(
            "/data",
            format!("'{}' expects a resource identifier or null", field.json_name()),
        )),
    }
}
