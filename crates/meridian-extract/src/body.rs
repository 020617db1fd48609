//! Request document extraction.

use crate::{ExtractionError, JsonApiRequest};
use meridian_core::Document;

/// Default maximum body size (1 MB).
pub const DEFAULT_MAX_BODY_SIZE: usize = 1024 * 1024;

/// Extracts the JSON:API document from a request body.
///
/// The body must be `application/vnd.api+json` or `application/json`
/// (media type parameters are tolerated). A missing content type is
/// accepted when the body is empty.
///
/// # Example
///
/// ```rust
/// use meridian_extract::{JsonApiRequest, RequestBody, DEFAULT_MAX_BODY_SIZE};
/// use http::Method;
///
/// let request = JsonApiRequest::builder()
///     .method(Method::POST)
///     .uri("/tasks")
///     .json_body(&serde_json::json!({
///         "data": {"type": "tasks", "attributes": {"title": "Write docs"}}
///     }))
///     .build();
///
/// let document = RequestBody::new(DEFAULT_MAX_BODY_SIZE)
///     .extract(&request)
///     .unwrap()
///     .unwrap();
/// assert_eq!(document.single_data().unwrap().resource_type, "tasks");
/// ```
#[derive(Debug, Clone, Copy)]
pub struct RequestBody {
    max_size: usize,
}

impl Default for RequestBody {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_BODY_SIZE)
    }
}

impl RequestBody {
    /// Creates an extractor with the given size limit in bytes.
    #[must_use]
    pub const fn new(max_size: usize) -> Self {
        Self { max_size }
    }

    /// The size limit in bytes.
    #[must_use]
    pub const fn max_size(&self) -> usize {
        self.max_size
    }

    /// Parses the body.
    ///
    /// Returns `Ok(None)` for an empty (or whitespace-only) body.
    pub fn extract(&self, request: &JsonApiRequest) -> Result<Option<Document>, ExtractionError> {
        let body = request.body();
        if body.len() > self.max_size {
            return Err(ExtractionError::payload_too_large(self.max_size, body.len()));
        }
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }

        let content_type = request.content_type();
        if !content_type.is_some_and(is_json_media_type) {
            tracing::debug!(content_type = ?content_type, "rejecting request body");
            return Err(ExtractionError::unsupported_media_type(content_type));
        }

        serde_json::from_slice(body)
            .map(Some)
            .map_err(|e| ExtractionError::deserialization_failed(e.to_string()))
    }
}

fn is_json_media_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence == meridian_core::JSON_API_CONTENT_TYPE || essence == "application/json"
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;

    fn post(content_type: Option<&str>, body: &'static str) -> JsonApiRequest {
        let mut builder = JsonApiRequest::builder()
            .method(Method::POST)
            .uri("/tasks")
            .body(body);
        if let Some(content_type) = content_type {
            builder = builder.header("content-type", content_type);
        }
        builder.build()
    }

    #[test]
    fn test_empty_body_is_none() {
        let request = post(None, "");
        assert!(RequestBody::default().extract(&request).unwrap().is_none());

        let request = post(None, "  \n");
        assert!(RequestBody::default().extract(&request).unwrap().is_none());
    }

    #[test]
    fn test_accepts_json_media_types() {
        for content_type in [
            "application/vnd.api+json",
            "application/json",
            "application/json; charset=utf-8",
            "Application/JSON",
        ] {
            let request = post(Some(content_type), r#"{"data": null}"#);
            let document = RequestBody::default().extract(&request).unwrap().unwrap();
            assert!(document.data.is_some(), "{content_type}");
        }
    }

    #[test]
    fn test_rejects_other_media_types() {
        let request = post(Some("text/plain"), r#"{"data": null}"#);
        let err = RequestBody::default().extract(&request).unwrap_err();
        assert_eq!(err.status_code(), http::StatusCode::UNSUPPORTED_MEDIA_TYPE);

        let request = post(None, r#"{"data": null}"#);
        assert!(RequestBody::default().extract(&request).is_err());
    }

    #[test]
    fn test_size_limit() {
        let request = post(Some("application/json"), r#"{"data": null}"#);
        let err = RequestBody::new(4).extract(&request).unwrap_err();
        assert_eq!(err.status_code(), http::StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn test_malformed_json() {
        let request = post(Some("application/vnd.api+json"), "{not json");
        let err = RequestBody::default().extract(&request).unwrap_err();
        assert_eq!(err.error_code(), "DESERIALIZATION_FAILED");
    }
}
