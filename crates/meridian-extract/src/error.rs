//! Extraction error types.
//!
//! [`ExtractionError`] records where extraction failed (query string, body,
//! content type) and converts into [`JsonApiError`] so the dispatcher can
//! render it as an error document.

use http::StatusCode;
use meridian_core::JsonApiError;
use std::fmt;

/// Part of the request being extracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionSource {
    /// Query string parameters
    Query,
    /// Request body
    Body,
    /// Content-Type header
    ContentType,
}

impl fmt::Display for ExtractionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Query => write!(f, "query"),
            Self::Body => write!(f, "body"),
            Self::ContentType => write!(f, "content-type"),
        }
    }
}

/// Error raised while extracting a request.
///
/// # Example
///
/// ```rust
/// use meridian_extract::{ExtractionError, ExtractionSource};
/// use http::StatusCode;
///
/// let err = ExtractionError::unknown_parameter("foo");
/// assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
/// assert_eq!(err.extraction_source(), ExtractionSource::Query);
/// assert_eq!(err.field(), Some("foo"));
/// ```
#[derive(Debug)]
pub struct ExtractionError {
    extraction_source: ExtractionSource,
    kind: ExtractionErrorKind,
    field: Option<String>,
    message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExtractionErrorKind {
    /// A parameter value is malformed or refers to something unknown
    InvalidValue,
    /// The parameter itself is not recognized
    UnknownParameter,
    /// The body is not a JSON:API document
    DeserializationFailed,
    /// The body exceeds the size limit
    PayloadTooLarge { limit: usize, actual: usize },
    /// The content type is not a JSON media type
    UnsupportedMediaType,
}

impl ExtractionError {
    /// Creates an error for a malformed query parameter value.
    #[must_use]
    pub fn invalid_parameter(parameter: impl Into<String>, details: impl Into<String>) -> Self {
        let parameter = parameter.into();
        let details = details.into();
        Self {
            extraction_source: ExtractionSource::Query,
            kind: ExtractionErrorKind::InvalidValue,
            message: format!("invalid query parameter '{parameter}': {details}"),
            field: Some(parameter),
        }
    }

    /// Creates an error for an unrecognized query parameter.
    #[must_use]
    pub fn unknown_parameter(parameter: impl Into<String>) -> Self {
        let parameter = parameter.into();
        Self {
            extraction_source: ExtractionSource::Query,
            kind: ExtractionErrorKind::UnknownParameter,
            message: format!("unknown query parameter '{parameter}'"),
            field: Some(parameter),
        }
    }

    /// Creates an error for an unparseable query string.
    #[must_use]
    pub fn malformed_query(error: impl Into<String>) -> Self {
        Self {
            extraction_source: ExtractionSource::Query,
            kind: ExtractionErrorKind::DeserializationFailed,
            message: format!("failed to parse query string: {}", error.into()),
            field: None,
        }
    }

    /// Creates an error for a body that is not a valid document.
    #[must_use]
    pub fn deserialization_failed(error: impl Into<String>) -> Self {
        Self {
            extraction_source: ExtractionSource::Body,
            kind: ExtractionErrorKind::DeserializationFailed,
            message: format!("failed to deserialize body: {}", error.into()),
            field: None,
        }
    }

    /// Creates an error for a body over the size limit.
    #[must_use]
    pub fn payload_too_large(limit: usize, actual: usize) -> Self {
        Self {
            extraction_source: ExtractionSource::Body,
            kind: ExtractionErrorKind::PayloadTooLarge { limit, actual },
            message: format!("payload too large: max {limit} bytes, got {actual} bytes"),
            field: None,
        }
    }

    /// Creates an error for a non-JSON content type.
    #[must_use]
    pub fn unsupported_media_type(actual: Option<&str>) -> Self {
        let actual = actual.unwrap_or("none");
        Self {
            extraction_source: ExtractionSource::ContentType,
            kind: ExtractionErrorKind::UnsupportedMediaType,
            message: format!(
                "unsupported content type: expected '{}', got '{actual}'",
                meridian_core::JSON_API_CONTENT_TYPE
            ),
            field: Some(actual.to_string()),
        }
    }

    /// Returns the extraction source.
    #[must_use]
    pub fn extraction_source(&self) -> ExtractionSource {
        self.extraction_source
    }

    /// Returns the parameter name (or content type) if applicable.
    #[must_use]
    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    /// Returns the error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self.kind {
            ExtractionErrorKind::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ExtractionErrorKind::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    /// Returns a machine-readable error code.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self.kind {
            ExtractionErrorKind::InvalidValue => "INVALID_PARAMETER",
            ExtractionErrorKind::UnknownParameter => "UNKNOWN_PARAMETER",
            ExtractionErrorKind::DeserializationFailed => "DESERIALIZATION_FAILED",
            ExtractionErrorKind::PayloadTooLarge { .. } => "PAYLOAD_TOO_LARGE",
            ExtractionErrorKind::UnsupportedMediaType => "UNSUPPORTED_MEDIA_TYPE",
        }
    }
}

impl fmt::Display for ExtractionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ExtractionError {}

impl From<ExtractionError> for JsonApiError {
    fn from(error: ExtractionError) -> Self {
        match error.kind {
            ExtractionErrorKind::PayloadTooLarge { limit, actual } => {
                JsonApiError::PayloadTooLarge { limit, actual }
            }
            ExtractionErrorKind::UnsupportedMediaType => JsonApiError::UnsupportedMediaType {
                content_type: error.field.unwrap_or_default(),
            },
            _ => match (error.extraction_source, error.field) {
                (ExtractionSource::Query, Some(parameter)) => {
                    JsonApiError::bad_parameter(parameter, error.message)
                }
                (ExtractionSource::Body, _) => JsonApiError::bad_body("/data", error.message),
                _ => JsonApiError::bad_request(error.message),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_parameter() {
        let err = ExtractionError::invalid_parameter("sort", "unknown field 'x'");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.error_code(), "INVALID_PARAMETER");
        assert!(err.to_string().contains("sort"));
        assert!(err.to_string().contains("unknown field 'x'"));
    }

    #[test]
    fn test_payload_too_large() {
        let err = ExtractionError::payload_too_large(1024, 2048);
        assert_eq!(err.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(err.extraction_source(), ExtractionSource::Body);

        let converted = JsonApiError::from(err);
        assert!(matches!(
            converted,
            JsonApiError::PayloadTooLarge {
                limit: 1024,
                actual: 2048
            }
        ));
    }

    #[test]
    fn test_unsupported_media_type() {
        let err = ExtractionError::unsupported_media_type(Some("text/plain"));
        assert_eq!(err.status_code(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert!(err.to_string().contains("text/plain"));

        let converted = JsonApiError::from(err);
        assert_eq!(converted.status_code(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[test]
    fn test_query_error_keeps_parameter() {
        let converted = JsonApiError::from(ExtractionError::unknown_parameter("foo"));
        let data = converted.to_error_data();
        assert_eq!(data.status.as_deref(), Some("400"));
        assert_eq!(
            data.source.and_then(|s| s.parameter).as_deref(),
            Some("foo")
        );
    }

    #[test]
    fn test_body_error_points_at_data() {
        let converted = JsonApiError::from(ExtractionError::deserialization_failed("eof"));
        let data = converted.to_error_data();
        assert_eq!(data.source.and_then(|s| s.pointer).as_deref(), Some("/data"));
    }
}
