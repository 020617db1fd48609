//! In-memory client over a [`RequestDispatcher`].

use crate::error::TestError;
use crate::response::TestResponse;
use http::Method;
use meridian_core::RequestContext;
use meridian_dispatch::RequestDispatcher;
use meridian_extract::{JsonApiRequest, JsonApiRequestBuilder};
use serde::Serialize;
use std::sync::Arc;

/// A test client dispatching requests without a transport.
///
/// # Example
///
/// ```ignore
/// let fixtures = Fixtures::seeded()?;
/// let client = fixtures.client()?;
///
/// let response = client.get("/tasks?include=project").send().await;
/// response.assert_status(StatusCode::OK);
/// assert_eq!(response.included("projects").len(), 1);
/// ```
#[must_use]
#[derive(Debug, Clone)]
pub struct TestClient {
    dispatcher: Arc<RequestDispatcher>,
    default_headers: Vec<(String, String)>,
}

impl TestClient {
    /// Creates a client over `dispatcher`.
    pub fn new(dispatcher: RequestDispatcher) -> Self {
        Self::from_arc(Arc::new(dispatcher))
    }

    /// Creates a client over a shared dispatcher.
    pub fn from_arc(dispatcher: Arc<RequestDispatcher>) -> Self {
        Self {
            dispatcher,
            default_headers: Vec::new(),
        }
    }

    /// Adds a default header that will be included in all requests.
    pub fn with_default_header(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    /// The dispatcher.
    #[must_use]
    pub fn dispatcher(&self) -> &RequestDispatcher {
        &self.dispatcher
    }

    /// Creates a GET request builder.
    pub fn get(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::GET, uri)
    }

    /// Creates a POST request builder.
    pub fn post(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::POST, uri)
    }

    /// Creates a PATCH request builder.
    pub fn patch(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::PATCH, uri)
    }

    /// Creates a DELETE request builder.
    pub fn delete(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::DELETE, uri)
    }

    /// Creates a request builder with a custom method.
    pub fn request(&self, method: Method, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        let mut builder = JsonApiRequest::builder().method(method).uri(uri.as_ref());
        for (name, value) in &self.default_headers {
            builder = builder.header(name, value);
        }
        TestClientRequest {
            client: self,
            builder,
            context: None,
            error: None,
        }
    }
}

/// A request builder bound to a test client.
#[must_use]
pub struct TestClientRequest<'a> {
    client: &'a TestClient,
    builder: JsonApiRequestBuilder,
    context: Option<RequestContext>,
    error: Option<TestError>,
}

impl TestClientRequest<'_> {
    /// Sets a header on the request.
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.builder = self.builder.header(name.as_ref(), value.as_ref());
        self
    }

    /// Sets the Authorization header with a Bearer token.
    pub fn bearer_token(self, token: impl AsRef<str>) -> Self {
        let value = format!("Bearer {}", token.as_ref());
        self.header("authorization", value)
    }

    /// Sets the raw request body.
    pub fn body(mut self, body: impl Into<bytes::Bytes>) -> Self {
        self.builder = self.builder.body(body);
        self
    }

    /// Sets a JSON:API body.
    pub fn json<T: Serialize>(mut self, value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(value) => self.builder = self.builder.json_body(&value),
            Err(error) => self.error = Some(TestError::Json(error)),
        }
        self
    }

    /// Dispatches within `context` instead of a fresh one.
    pub fn context(mut self, context: RequestContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Sends the request and returns the response.
    ///
    /// # Panics
    ///
    /// Panics if the body cannot be serialized or the response cannot be
    /// read back.
    pub async fn send(self) -> TestResponse {
        match self.try_send().await {
            Ok(response) => response,
            Err(error) => panic!("request failed: {error}"),
        }
    }

    /// Sends the request and returns a Result.
    pub async fn try_send(self) -> Result<TestResponse, TestError> {
        if let Some(error) = self.error {
            return Err(error);
        }
        let request = self.builder.build();
        let dispatcher = &self.client.dispatcher;
        let response = match self.context {
            Some(context) => dispatcher.dispatch_with_context(&request, context).await,
            None => dispatcher.dispatch(&request).await,
        };
        TestResponse::from_response(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::Fixtures;
    use http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn test_get_collection() {
        let fixtures = Fixtures::seeded().unwrap();
        let client = fixtures.client().unwrap();

        let response = client.get("/tasks").send().await;
        response.assert_status(StatusCode::OK);
        assert_eq!(response.data_ids(), vec!["1", "2"]);
        assert_eq!(fixtures.tasks.calls().calls_to("find_all"), vec!["find_all()"]);
    }

    #[tokio::test]
    async fn test_post_and_read_back() {
        let fixtures = Fixtures::seeded().unwrap();
        let client = fixtures.client().unwrap();

        let response = client
            .post("/tags")
            .json(&json!({"data": {"type": "tags", "attributes": {"label": "urgent"}}}))
            .send()
            .await;
        response.assert_status(StatusCode::CREATED);
        assert_eq!(response.data_ids(), vec!["4"]);

        let stored = fixtures.tags.get(&4).unwrap().unwrap();
        assert_eq!(stored.label, "urgent");
    }

    #[tokio::test]
    async fn test_default_headers_reach_the_guard() {
        let fixtures = Fixtures::seeded().unwrap();
        let dispatcher = RequestDispatcher::builder(Arc::new(fixtures.registry().unwrap()))
            .guard(
                meridian_dispatch::AccessPolicy::builder()
                    .require_authorization_header()
                    .build(),
            )
            .build()
            .unwrap();

        let anonymous = TestClient::new(dispatcher);
        let response = anonymous.get("/tags").send().await;
        response.assert_status(StatusCode::UNAUTHORIZED);

        let client = anonymous.with_default_header("authorization", "Bearer t");
        client.get("/tags").send().await.assert_status(StatusCode::OK);
    }
}
