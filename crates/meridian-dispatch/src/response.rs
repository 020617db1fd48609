//! Controller results.

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderValue, StatusCode};
use meridian_core::{Document, JSON_API_CONTENT_TYPE};

/// A document with its status code.
///
/// # Example
///
/// ```
/// use meridian_core::Document;
/// use meridian_dispatch::Response;
///
/// let response = Response::ok(Document::null());
/// assert_eq!(response.status().as_u16(), 200);
///
/// let http = Response::no_content().into_http();
/// assert!(http.body().is_empty());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    document: Option<Document>,
    status: StatusCode,
}

impl Response {
    /// Creates a response.
    #[must_use]
    pub fn new(status: StatusCode, document: Option<Document>) -> Self {
        Self { document, status }
    }

    /// `200 OK` with `document`.
    #[must_use]
    pub fn ok(document: Document) -> Self {
        Self::new(StatusCode::OK, Some(document))
    }

    /// `201 Created` with `document`.
    #[must_use]
    pub fn created(document: Document) -> Self {
        Self::new(StatusCode::CREATED, Some(document))
    }

    /// `204 No Content`.
    #[must_use]
    pub fn no_content() -> Self {
        Self::new(StatusCode::NO_CONTENT, None)
    }

    /// Status code.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Document, absent for `204`.
    #[must_use]
    pub fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }

    /// Takes the document.
    #[must_use]
    pub fn into_document(self) -> Option<Document> {
        self.document
    }

    /// Returns true for 2xx statuses.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Serializes into an HTTP response with the JSON:API content type.
    #[must_use]
    pub fn into_http(self) -> http::Response<Bytes> {
        let mut response = http::Response::new(Bytes::new());
        *response.status_mut() = self.status;
        if let Some(document) = self.document {
            match serde_json::to_vec(&document) {
                Ok(body) => {
                    *response.body_mut() = Bytes::from(body);
                    response
                        .headers_mut()
                        .insert(CONTENT_TYPE, HeaderValue::from_static(JSON_API_CONTENT_TYPE));
                }
                Err(error) => {
                    tracing::error!(%error, "failed to serialize response document");
                    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
                }
            }
        }
        response
    }
}
