//! Authorization of dispatched requests.
//!
//! The dispatcher asks the configured [`AccessGuard`] before a controller
//! runs. A guard answers with `Ok(())`, [`JsonApiError::Unauthorized`] or
//! [`JsonApiError::Forbidden`].
//!
//! [`AccessPolicy`] is a simple table-based guard:
//!
//! ```
//! use http::Method;
//! use meridian_dispatch::AccessPolicy;
//!
//! let policy = AccessPolicy::builder()
//!     .allow("tasks", [Method::GET, Method::POST])
//!     .allow_reads("projects")
//!     .build();
//!
//! assert!(policy.permits("tasks", &Method::POST));
//! assert!(!policy.permits("projects", &Method::DELETE));
//! ```

use async_trait::async_trait;
use http::header::AUTHORIZATION;
use http::Method;
use meridian_core::{JsonApiError, JsonApiResult, RequestContext};
use std::collections::{HashMap, HashSet};

/// What a guard decides on.
#[derive(Debug, Clone, Copy)]
pub struct AccessRequest<'a> {
    /// Request method.
    pub method: &'a Method,
    /// Resource type of the path.
    pub resource_type: &'a str,
    /// Relationship name for field and relationship paths.
    pub field: Option<&'a str>,
    /// Request metadata, including headers.
    pub context: &'a RequestContext,
}

/// Authorization collaborator of the dispatcher.
#[async_trait]
pub trait AccessGuard: Send + Sync {
    /// Allows or rejects the request.
    async fn check(&self, request: &AccessRequest<'_>) -> JsonApiResult<()>;
}

#[derive(Debug, Clone)]
enum PolicyMode {
    AllowAll,
    DenyAll,
    Rules(HashMap<String, HashSet<Method>>),
}

/// Permits methods per resource type.
#[derive(Debug, Clone)]
pub struct AccessPolicy {
    mode: PolicyMode,
    require_authorization_header: bool,
}

impl AccessPolicy {
    /// Permits everything.
    #[must_use]
    pub fn allow_all() -> Self {
        Self {
            mode: PolicyMode::AllowAll,
            require_authorization_header: false,
        }
    }

    /// Rejects everything with `403`.
    #[must_use]
    pub fn deny_all() -> Self {
        Self {
            mode: PolicyMode::DenyAll,
            require_authorization_header: false,
        }
    }

    /// Creates a rule-based policy builder. Unlisted types are denied.
    #[must_use]
    pub fn builder() -> AccessPolicyBuilder {
        AccessPolicyBuilder::default()
    }

    /// Whether `method` is permitted on `resource_type`.
    #[must_use]
    pub fn permits(&self, resource_type: &str, method: &Method) -> bool {
        match &self.mode {
            PolicyMode::AllowAll => true,
            PolicyMode::DenyAll => false,
            PolicyMode::Rules(rules) => rules
                .get(resource_type)
                .is_some_and(|methods| methods.contains(method)),
        }
    }
}

#[async_trait]
impl AccessGuard for AccessPolicy {
    async fn check(&self, request: &AccessRequest<'_>) -> JsonApiResult<()> {
        if self.require_authorization_header
            && !request.context.headers().contains_key(AUTHORIZATION)
        {
            return Err(JsonApiError::unauthorized("missing Authorization header"));
        }
        if self.permits(request.resource_type, request.method) {
            Ok(())
        } else {
            Err(JsonApiError::forbidden(format!(
                "{} on '{}' is not permitted",
                request.method, request.resource_type
            )))
        }
    }
}

/// Builder for rule-based [`AccessPolicy`]s.
#[derive(Debug, Default)]
pub struct AccessPolicyBuilder {
    rules: HashMap<String, HashSet<Method>>,
    require_authorization_header: bool,
}

impl AccessPolicyBuilder {
    /// Permits `methods` on `resource_type`.
    #[must_use]
    pub fn allow(
        mut self,
        resource_type: impl Into<String>,
        methods: impl IntoIterator<Item = Method>,
    ) -> Self {
        self.rules
            .entry(resource_type.into())
            .or_default()
            .extend(methods);
        self
    }

    /// Permits `GET` on `resource_type`.
    #[must_use]
    pub fn allow_reads(self, resource_type: impl Into<String>) -> Self {
        self.allow(resource_type, [Method::GET])
    }

    /// Permits every JSON:API method on `resource_type`.
    #[must_use]
    pub fn allow_writes(self, resource_type: impl Into<String>) -> Self {
        self.allow(
            resource_type,
            [Method::GET, Method::POST, Method::PATCH, Method::DELETE],
        )
    }

    /// Answers `401` to requests without an `Authorization` header.
    #[must_use]
    pub fn require_authorization_header(mut self) -> Self {
        self.require_authorization_header = true;
        self
    }

    /// Builds the policy.
    #[must_use]
    pub fn build(self) -> AccessPolicy {
        AccessPolicy {
            mode: PolicyMode::Rules(self.rules),
            require_authorization_header: self.require_authorization_header,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{HeaderMap, HeaderValue};

    fn request<'a>(method: &'a Method, resource_type: &'a str, context: &'a RequestContext) -> AccessRequest<'a> {
        AccessRequest {
            method,
            resource_type,
            field: None,
            context,
        }
    }

    #[tokio::test]
    async fn test_allow_and_deny_all() {
        let context = RequestContext::new();
        let delete = Method::DELETE;
        assert!(AccessPolicy::allow_all()
            .check(&request(&delete, "tasks", &context))
            .await
            .is_ok());
        let error = AccessPolicy::deny_all()
            .check(&request(&delete, "tasks", &context))
            .await
            .unwrap_err();
        assert!(matches!(error, JsonApiError::Forbidden { .. }));
    }

    #[tokio::test]
    async fn test_rules() {
        let policy = AccessPolicy::builder()
            .allow_writes("tasks")
            .allow_reads("projects")
            .build();
        let context = RequestContext::new();
        let get = Method::GET;
        let patch = Method::PATCH;

        assert!(policy.check(&request(&patch, "tasks", &context)).await.is_ok());
        assert!(policy.check(&request(&get, "projects", &context)).await.is_ok());
        assert!(policy.check(&request(&patch, "projects", &context)).await.is_err());
        assert!(policy.check(&request(&get, "tags", &context)).await.is_err());
    }

    #[tokio::test]
    async fn test_authorization_header_required() {
        let policy = AccessPolicy::builder()
            .allow_reads("tasks")
            .require_authorization_header()
            .build();
        let get = Method::GET;

        let anonymous = RequestContext::new();
        let error = policy
            .check(&request(&get, "tasks", &anonymous))
            .await
            .unwrap_err();
        assert_eq!(error.status_code().as_u16(), 401);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer t"));
        let authenticated = RequestContext::new().with_headers(headers);
        assert!(policy.check(&request(&get, "tasks", &authenticated)).await.is_ok());
    }
}
