//! Error types for Meridian.
//!
//! [`JsonApiError`] is the single error type flowing through path parsing,
//! registry lookups, controllers and repository adapters. Every variant maps
//! to an [`ErrorCategory`], which in turn maps to an HTTP status code, and can
//! be rendered as a JSON:API [`ErrorData`] object.
//!
//! Repository implementations return their own failures as
//! [`JsonApiError::Repository`] (usually through `?` on an `anyhow::Error`).
//! Those are passed through unchanged by the framework and translated into
//! error documents by the exception mapper registry at the dispatch boundary.

use crate::document::{Document, ErrorData, ErrorSource};
use http::StatusCode;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type alias using [`JsonApiError`].
pub type JsonApiResult<T> = Result<T, JsonApiError>;

/// Categories of errors for classification and status mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Malformed path, query or body.
    BadRequest,
    /// Missing or invalid credentials.
    Unauthorized,
    /// Permission denied, including writes to protected fields.
    Forbidden,
    /// Unknown resource type, missing resource or unmatched path.
    NotFound,
    /// Known path shape without a handler for the verb.
    MethodNotAllowed,
    /// Request body exceeds the configured limit.
    PayloadTooLarge,
    /// Request body has an unsupported content type.
    UnsupportedMediaType,
    /// Internal failures, including unmapped repository errors.
    Internal,
}

impl ErrorCategory {
    /// Returns the default HTTP status code for this error category.
    #[must_use]
    pub const fn default_status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// The kind of write a field access check is performed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WriteOperation {
    /// Creation of a new resource.
    Post,
    /// Modification of an existing resource.
    Patch,
}

impl fmt::Display for WriteOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Post => f.write_str("POST"),
            Self::Patch => f.write_str("PATCH"),
        }
    }
}

/// Standard error type for Meridian.
///
/// # Example
///
/// ```
/// use meridian_core::{ErrorCategory, JsonApiError};
///
/// let error = JsonApiError::resource_not_found("tasks", "42");
/// assert_eq!(error.category(), ErrorCategory::NotFound);
/// assert_eq!(error.status_code().as_u16(), 404);
/// ```
#[derive(Error, Debug)]
pub enum JsonApiError {
    /// No controller accepts the request.
    #[error("no handler for {method} {path}")]
    Routing {
        /// Request method.
        method: String,
        /// Request path.
        path: String,
        /// The path shape is known but not for this method.
        method_not_allowed: bool,
    },

    /// The resource type in the path is not registered.
    #[error("resource type '{resource_type}' is not registered")]
    ResourceNotRegistered {
        /// Requested resource type.
        resource_type: String,
    },

    /// A single resource lookup found nothing.
    #[error("resource '{resource_type}' with id '{id}' not found")]
    ResourceNotFound {
        /// Resource type.
        resource_type: String,
        /// Requested identifier.
        id: String,
    },

    /// A field name in a path, query or body is unknown.
    #[error("field '{field}' not found on resource '{resource_type}'")]
    ResourceFieldNotFound {
        /// Resource type the field was looked up on.
        resource_type: String,
        /// Wire name of the field.
        field: String,
    },

    /// A write touches a field that does not permit it.
    #[error("field '{field}' cannot be written by {operation}")]
    ForbiddenFieldWrite {
        /// Wire name of the field.
        field: String,
        /// The write operation that was rejected.
        operation: WriteOperation,
    },

    /// An identifier could not be parsed into the id type.
    #[error("cannot parse '{value}' as {expected}")]
    IdParse {
        /// Raw value.
        value: String,
        /// Name of the expected type.
        expected: String,
    },

    /// The query or body is malformed.
    #[error("bad request: {message}")]
    BadRequest {
        /// Human-readable error message.
        message: String,
        /// Offending query parameter, if any.
        parameter: Option<String>,
        /// JSON pointer into the body, if any.
        pointer: Option<String>,
    },

    /// The body exceeds the configured size limit.
    #[error("request body of {actual} bytes exceeds the limit of {limit} bytes")]
    PayloadTooLarge {
        /// Configured limit in bytes.
        limit: usize,
        /// Actual size in bytes.
        actual: usize,
    },

    /// The body has a content type other than JSON:API or JSON.
    #[error("unsupported content type '{content_type}'")]
    UnsupportedMediaType {
        /// The received content type.
        content_type: String,
    },

    /// Authentication failed.
    #[error("unauthorized: {message}")]
    Unauthorized {
        /// Human-readable error message.
        message: String,
    },

    /// Authorization denied.
    #[error("forbidden: {message}")]
    Forbidden {
        /// Human-readable error message.
        message: String,
    },

    /// The repository does not implement the requested operation.
    #[error("operation '{operation}' is not supported for '{resource_type}'")]
    MethodNotAllowed {
        /// Resource type.
        resource_type: String,
        /// Repository operation name.
        operation: String,
    },

    /// A repository failed.
    #[error("repository failure: {0}")]
    Repository(#[source] anyhow::Error),

    /// A multi-step write created a resource but could not complete.
    #[error("created resource could not be linked: {cause}")]
    PartialFailure {
        /// Document of the resource created before the failure.
        created: Box<Document>,
        /// The failure of the later step.
        #[source]
        cause: Box<JsonApiError>,
    },

    /// A resource descriptor exposes no id field.
    #[error("resource '{type_name}' declares no id field")]
    ResourceIdNotFound {
        /// Rust type name of the resource.
        type_name: String,
    },

    /// A resource descriptor is inconsistent.
    #[error("invalid resource '{type_name}': {reason}")]
    InvalidResource {
        /// Rust type name of the resource.
        type_name: String,
        /// Why the descriptor was rejected.
        reason: String,
    },

    /// A repository registration cannot be served.
    #[error("invalid repository for '{resource_type}': {reason}")]
    InvalidRepository {
        /// Resource type of the registration.
        resource_type: String,
        /// Why the registration was rejected.
        reason: String,
    },

    /// Internal server error.
    #[error("internal error: {message}")]
    Internal {
        /// Human-readable error message.
        message: String,
        /// The underlying error (not exposed to clients).
        #[source]
        source: Option<anyhow::Error>,
    },
}

impl JsonApiError {
    /// Creates a routing error.
    #[must_use]
    pub fn routing(
        method: impl Into<String>,
        path: impl Into<String>,
        method_not_allowed: bool,
    ) -> Self {
        Self::Routing {
            method: method.into(),
            path: path.into(),
            method_not_allowed,
        }
    }

    /// Creates a resource-not-registered error.
    #[must_use]
    pub fn not_registered(resource_type: impl Into<String>) -> Self {
        Self::ResourceNotRegistered {
            resource_type: resource_type.into(),
        }
    }

    /// Creates a resource-not-found error.
    #[must_use]
    pub fn resource_not_found(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::ResourceNotFound {
            resource_type: resource_type.into(),
            id: id.into(),
        }
    }

    /// Creates a field-not-found error.
    #[must_use]
    pub fn field_not_found(resource_type: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ResourceFieldNotFound {
            resource_type: resource_type.into(),
            field: field.into(),
        }
    }

    /// Creates a forbidden-field-write error.
    #[must_use]
    pub fn forbidden_field(field: impl Into<String>, operation: WriteOperation) -> Self {
        Self::ForbiddenFieldWrite {
            field: field.into(),
            operation,
        }
    }

    /// Creates an id parse error.
    #[must_use]
    pub fn id_parse(value: impl Into<String>, expected: impl Into<String>) -> Self {
        Self::IdParse {
            value: value.into(),
            expected: expected.into(),
        }
    }

    /// Creates a bad request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
            parameter: None,
            pointer: None,
        }
    }

    /// Creates a bad request error pointing at a query parameter.
    #[must_use]
    pub fn bad_parameter(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
            parameter: Some(parameter.into()),
            pointer: None,
        }
    }

    /// Creates a bad request error pointing into the request body.
    #[must_use]
    pub fn bad_body(pointer: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
            parameter: None,
            pointer: Some(pointer.into()),
        }
    }

    /// Creates an unauthorized error.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    /// Creates a forbidden error.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    /// Creates an error for a repository operation that is not implemented.
    #[must_use]
    pub fn not_supported(resource_type: impl Into<String>, operation: impl Into<String>) -> Self {
        Self::MethodNotAllowed {
            resource_type: resource_type.into(),
            operation: operation.into(),
        }
    }

    /// Wraps an opaque repository failure.
    pub fn repository(source: impl Into<anyhow::Error>) -> Self {
        Self::Repository(source.into())
    }

    /// Creates a partial failure from the created document and the later failure.
    #[must_use]
    pub fn partial_failure(created: Document, cause: JsonApiError) -> Self {
        Self::PartialFailure {
            created: Box::new(created),
            cause: Box::new(cause),
        }
    }

    /// Creates an invalid resource error.
    #[must_use]
    pub fn invalid_resource(type_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidResource {
            type_name: type_name.into(),
            reason: reason.into(),
        }
    }

    /// Creates an invalid repository error.
    #[must_use]
    pub fn invalid_repository(resource_type: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidRepository {
            resource_type: resource_type.into(),
            reason: reason.into(),
        }
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an internal error with a source error.
    pub fn internal_with_source(
        message: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::Internal {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Returns the error category.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Routing {
                method_not_allowed: true,
                ..
            }
            | Self::MethodNotAllowed { .. } => ErrorCategory::MethodNotAllowed,
            Self::Routing { .. }
            | Self::ResourceNotRegistered { .. }
            | Self::ResourceNotFound { .. } => ErrorCategory::NotFound,
            Self::ResourceFieldNotFound { .. } | Self::IdParse { .. } | Self::BadRequest { .. } => {
                ErrorCategory::BadRequest
            }
            Self::ForbiddenFieldWrite { .. } | Self::Forbidden { .. } => ErrorCategory::Forbidden,
            Self::Unauthorized { .. } => ErrorCategory::Unauthorized,
            Self::PayloadTooLarge { .. } => ErrorCategory::PayloadTooLarge,
            Self::UnsupportedMediaType { .. } => ErrorCategory::UnsupportedMediaType,
            Self::PartialFailure { cause, .. } => cause.category(),
            Self::Repository(_)
            | Self::ResourceIdNotFound { .. }
            | Self::InvalidResource { .. }
            | Self::InvalidRepository { .. }
            | Self::Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        self.category().default_status_code()
    }

    /// Returns a machine-readable error code.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Routing { .. } => "ROUTING_ERROR",
            Self::ResourceNotRegistered { .. } => "RESOURCE_NOT_REGISTERED",
            Self::ResourceNotFound { .. } => "RESOURCE_NOT_FOUND",
            Self::ResourceFieldNotFound { .. } => "RESOURCE_FIELD_NOT_FOUND",
            Self::ForbiddenFieldWrite { .. } => "FORBIDDEN_FIELD_WRITE",
            Self::IdParse { .. } => "INVALID_ID",
            Self::BadRequest { .. } => "BAD_REQUEST",
            Self::PayloadTooLarge { .. } => "PAYLOAD_TOO_LARGE",
            Self::UnsupportedMediaType { .. } => "UNSUPPORTED_MEDIA_TYPE",
            Self::Unauthorized { .. } => "UNAUTHORIZED",
            Self::Forbidden { .. } => "FORBIDDEN",
            Self::MethodNotAllowed { .. } => "METHOD_NOT_ALLOWED",
            Self::PartialFailure { cause, .. } => cause.error_code(),
            Self::Repository(_)
            | Self::ResourceIdNotFound { .. }
            | Self::InvalidResource { .. }
            | Self::InvalidRepository { .. }
            | Self::Internal { .. } => "INTERNAL_SERVER_ERROR",
        }
    }

    /// Returns `true` for errors whose message must not reach clients.
    #[must_use]
    pub fn is_internal(&self) -> bool {
        match self {
            Self::PartialFailure { cause, .. } => cause.is_internal(),
            _ => self.category() == ErrorCategory::Internal,
        }
    }

    /// Converts this error to a JSON:API error object.
    ///
    /// Internal errors carry a generic detail only.
    #[must_use]
    pub fn to_error_data(&self) -> ErrorData {
        if let Self::PartialFailure { cause, .. } = self {
            return cause.to_error_data();
        }
        let status = self.status_code();
        let detail = if self.is_internal() {
            "an internal error occurred".to_string()
        } else {
            self.to_string()
        };
        let source = match self {
            Self::BadRequest {
                parameter,
                pointer,
                ..
            } if parameter.is_some() || pointer.is_some() => Some(ErrorSource {
                pointer: pointer.clone(),
                parameter: parameter.clone(),
            }),
            Self::ForbiddenFieldWrite { field, .. } => Some(ErrorSource {
                pointer: Some(format!("/data/attributes/{field}")),
                parameter: None,
            }),
            _ => None,
        };
        ErrorData {
            id: None,
            status: Some(status.as_u16().to_string()),
            code: Some(self.error_code().to_string()),
            title: status.canonical_reason().map(ToString::to_string),
            detail: Some(detail),
            source,
            meta: None,
        }
    }
}

impl From<anyhow::Error> for JsonApiError {
    fn from(source: anyhow::Error) -> Self {
        match source.downcast::<JsonApiError>() {
            Ok(error) => error,
            Err(source) => Self::Repository(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_maps_to_404() {
        let error = JsonApiError::resource_not_found("tasks", "1");
        assert_eq!(error.category(), ErrorCategory::NotFound);
        assert_eq!(error.status_code(), StatusCode::NOT_FOUND);
        assert!(error.to_string().contains("tasks"));
    }

    #[test]
    fn test_routing_distinguishes_405() {
        assert_eq!(
            JsonApiError::routing("PUT", "/tasks", true).status_code(),
            StatusCode::METHOD_NOT_ALLOWED
        );
        assert_eq!(
            JsonApiError::routing("GET", "/a/b/c/d/e", false).status_code(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_forbidden_field_write() {
        let error = JsonApiError::forbidden_field("createdAt", WriteOperation::Patch);
        assert_eq!(error.status_code(), StatusCode::FORBIDDEN);
        assert!(error.to_string().contains("PATCH"));

        let data = error.to_error_data();
        assert_eq!(data.status.as_deref(), Some("403"));
        assert_eq!(
            data.source.and_then(|s| s.pointer).as_deref(),
            Some("/data/attributes/createdAt")
        );
    }

    #[test]
    fn test_repository_error_hides_detail() {
        let error = JsonApiError::from(anyhow::anyhow!("connection refused on 10.0.0.1"));
        assert!(matches!(error, JsonApiError::Repository(_)));
        let data = error.to_error_data();
        assert_eq!(data.status.as_deref(), Some("500"));
        assert!(!data.detail.unwrap_or_default().contains("10.0.0.1"));
    }

    #[test]
    fn test_anyhow_wrapping_json_api_error_is_unwrapped() {
        let wrapped = anyhow::Error::new(JsonApiError::unauthorized("token expired"));
        let error = JsonApiError::from(wrapped);
        assert_eq!(error.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_partial_failure_uses_cause_status() {
        let error = JsonApiError::partial_failure(
            Document::default(),
            JsonApiError::forbidden("link denied"),
        );
        assert_eq!(error.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(error.error_code(), "FORBIDDEN");
    }

    #[test]
    fn test_bad_parameter_source() {
        let data = JsonApiError::bad_parameter("page[limit]", "limit too large").to_error_data();
        assert_eq!(data.code.as_deref(), Some("BAD_REQUEST"));
        assert_eq!(
            data.source.and_then(|s| s.parameter).as_deref(),
            Some("page[limit]")
        );
    }

    #[test]
    fn test_all_error_categories_have_status_codes() {
        let categories = [
            ErrorCategory::BadRequest,
            ErrorCategory::Unauthorized,
            ErrorCategory::Forbidden,
            ErrorCategory::NotFound,
            ErrorCategory::MethodNotAllowed,
            ErrorCategory::PayloadTooLarge,
            ErrorCategory::UnsupportedMediaType,
            ErrorCategory::Internal,
        ];

        for category in categories {
            let status = category.default_status_code();
            assert!(
                status.is_client_error() || status.is_server_error(),
                "Category {:?} should map to error status code, got {}",
                category,
                status
            );
        }
    }
}
