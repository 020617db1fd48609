//! Test response wrapper.

use crate::error::TestError;
use bytes::Bytes;
use http::{header, HeaderMap, StatusCode};
use meridian_core::{Document, ErrorData, Resource};
use meridian_dispatch::Response;
use serde::de::DeserializeOwned;

/// A dispatched response, read back from its wire form.
#[derive(Debug, Clone)]
pub struct TestResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
    document: Option<Document>,
}

impl TestResponse {
    /// Serializes `response` and parses the body back into a document.
    pub fn from_response(response: Response) -> Result<Self, TestError> {
        let (parts, body) = response.into_http().into_parts();
        let document = if body.is_empty() {
            None
        } else {
            Some(serde_json::from_slice(&body)?)
        };
        Ok(Self {
            status: parts.status,
            headers: parts.headers,
            body,
            document,
        })
    }

    /// Returns the status code.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the status code as a u16.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.status.as_u16()
    }

    /// Returns true if the status is successful (2xx).
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Returns the Content-Type header value.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }

    /// Returns the raw body bytes.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// The response document.
    #[must_use]
    pub fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }

    /// The response document, or an error for bodiless responses.
    pub fn require_document(&self) -> Result<&Document, TestError> {
        self.document
            .as_ref()
            .ok_or(TestError::NoDocument(self.status.as_u16()))
    }

    /// Deserializes the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, TestError> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Deserializes the body as a JSON value.
    pub fn json_value(&self) -> Result<serde_json::Value, TestError> {
        self.json()
    }

    /// Primary data resources: the collection, or the single resource.
    #[must_use]
    pub fn data(&self) -> Vec<&Resource> {
        let Some(document) = &self.document else {
            return Vec::new();
        };
        match (document.collection_data(), document.single_data()) {
            (Some(resources), _) => resources.iter().collect(),
            (None, Some(resource)) => vec![resource],
            (None, None) => Vec::new(),
        }
    }

    /// Ids of the primary data resources.
    #[must_use]
    pub fn data_ids(&self) -> Vec<String> {
        self.data()
            .into_iter()
            .filter_map(|r| r.id.clone())
            .collect()
    }

    /// Included resources of `resource_type`.
    #[must_use]
    pub fn included(&self, resource_type: &str) -> Vec<&Resource> {
        self.document
            .iter()
            .flat_map(|d| d.included.iter())
            .filter(|r| r.resource_type == resource_type)
            .collect()
    }

    /// Error objects of an error document.
    #[must_use]
    pub fn errors(&self) -> &[ErrorData] {
        self.document
            .as_ref()
            .and_then(|d| d.errors.as_deref())
            .unwrap_or_default()
    }

    /// Error codes of an error document.
    #[must_use]
    pub fn error_codes(&self) -> Vec<&str> {
        self.errors()
            .iter()
            .filter_map(|e| e.code.as_deref())
            .collect()
    }

    /// Asserts that the status code equals the expected value.
    ///
    /// # Panics
    ///
    /// Panics if the status code doesn't match.
    pub fn assert_status(&self, expected: StatusCode) -> &Self {
        assert_eq!(
            self.status,
            expected,
            "Expected status {}, got {}: {}",
            expected,
            self.status,
            String::from_utf8_lossy(&self.body)
        );
        self
    }

    /// Asserts that the response is successful (2xx).
    ///
    /// # Panics
    ///
    /// Panics if the status is not 2xx.
    pub fn assert_success(&self) -> &Self {
        assert!(
            self.is_success(),
            "Expected success status, got {}: {}",
            self.status,
            String::from_utf8_lossy(&self.body)
        );
        self
    }

    /// Asserts that the first error object carries `code`.
    ///
    /// # Panics
    ///
    /// Panics if there is no error object or the code differs.
    pub fn assert_error_code(&self, code: &str) -> &Self {
        assert_eq!(
            self.error_codes().first().copied(),
            Some(code),
            "Expected error code {code}"
        );
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_core::JsonApiError;

    #[test]
    fn test_document_is_read_back() {
        let document = Document::collection(vec![
            Resource::new("tasks", Some("1".into())),
            Resource::new("tasks", Some("2".into())),
        ]);
        let response = TestResponse::from_response(Response::ok(document)).unwrap();

        response.assert_status(StatusCode::OK);
        assert_eq!(response.data_ids(), vec!["1", "2"]);
        assert_eq!(response.content_type(), Some(meridian_core::JSON_API_CONTENT_TYPE));
    }

    #[test]
    fn test_no_content() {
        let response = TestResponse::from_response(Response::no_content()).unwrap();
        assert!(response.document().is_none());
        assert!(response.require_document().is_err());
        assert!(response.data().is_empty());
    }

    #[test]
    fn test_error_codes() {
        let error = JsonApiError::resource_not_found("tasks", "9");
        let document = Document::errors(vec![error.to_error_data()]);
        let response =
            TestResponse::from_response(Response::new(StatusCode::NOT_FOUND, Some(document)))
                .unwrap();
        response.assert_error_code("RESOURCE_NOT_FOUND");
    }
}
