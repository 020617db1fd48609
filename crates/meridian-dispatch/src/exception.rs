//! Translation of errors into error documents.
//!
//! The [`ExceptionMapperRegistry`] turns a [`JsonApiError`] into a
//! [`Response`] carrying `{ "errors": [...] }`. Framework errors render
//! through [`JsonApiError::to_error_data`]. Repository failures are opaque
//! `anyhow` errors: the registry walks their cause chain, outermost first,
//! and uses the first registered mapper whose error type matches. A
//! [`JsonApiError`] found in the chain renders as itself. Anything else
//! becomes a generic `500` without internal detail.
//!
//! # Example
//!
//! ```
//! use meridian_core::{ErrorData, JsonApiError};
//! use meridian_dispatch::ExceptionMapperRegistry;
//!
//! #[derive(Debug)]
//! struct QuotaExceeded;
//!
//! impl std::fmt::Display for QuotaExceeded {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         f.write_str("quota exceeded")
//!     }
//! }
//!
//! impl std::error::Error for QuotaExceeded {}
//!
//! let mappers = ExceptionMapperRegistry::builder()
//!     .add(|error: &QuotaExceeded| ErrorData {
//!         status: Some("429".into()),
//!         detail: Some(error.to_string()),
//!         ..ErrorData::default()
//!     })
//!     .build();
//!
//! let error = JsonApiError::repository(QuotaExceeded);
//! assert_eq!(mappers.to_response(&error).status().as_u16(), 429);
//! ```

use crate::response::Response;
use http::StatusCode;
use meridian_core::{Document, ErrorData, JsonApiError, PrimaryData};
use serde_json::Map;
use std::error::Error as StdError;
use std::marker::PhantomData;

/// Renders errors of one concrete type.
pub trait ExceptionMapper: Send + Sync {
    /// Returns the error object if `error` is of the mapped type.
    fn map(&self, error: &(dyn StdError + 'static)) -> Option<ErrorData>;
}

struct FnMapper<E, F> {
    render: F,
    _error: PhantomData<fn(&E)>,
}

impl<E, F> ExceptionMapper for FnMapper<E, F>
where
    E: StdError + 'static,
    F: Fn(&E) -> ErrorData + Send + Sync,
{
    fn map(&self, error: &(dyn StdError + 'static)) -> Option<ErrorData> {
        error.downcast_ref::<E>().map(&self.render)
    }
}

/// Error mappers, consulted in registration order.
#[derive(Default)]
pub struct ExceptionMapperRegistry {
    mappers: Vec<Box<dyn ExceptionMapper>>,
}

impl std::fmt::Debug for ExceptionMapperRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExceptionMapperRegistry")
            .field("mappers", &self.mappers.len())
            .finish()
    }
}

impl ExceptionMapperRegistry {
    /// Creates a registry with only the built-in mapping.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder.
    #[must_use]
    pub fn builder() -> ExceptionMapperRegistryBuilder {
        ExceptionMapperRegistryBuilder::default()
    }

    /// Number of user mappers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.mappers.len()
    }

    /// Returns true without user mappers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mappers.is_empty()
    }

    /// Renders `error` as an error object.
    #[must_use]
    pub fn to_error_data(&self, error: &JsonApiError) -> ErrorData {
        match error {
            JsonApiError::Repository(source) => self.map_chain(source),
            JsonApiError::PartialFailure { created, cause } => {
                let mut data = self.to_error_data(cause);
                if let Some(PrimaryData::Single(Some(resource))) = &created.data {
                    if let Ok(value) = serde_json::to_value(resource) {
                        data.meta
                            .get_or_insert_with(Map::new)
                            .insert("created".to_string(), value);
                    }
                }
                data
            }
            other => other.to_error_data(),
        }
    }

    /// Renders `error` as an error response.
    #[must_use]
    pub fn to_response(&self, error: &JsonApiError) -> Response {
        let data = self.to_error_data(error);
        let status = data
            .status
            .as_deref()
            .and_then(|s| s.parse::<u16>().ok())
            .and_then(|s| StatusCode::from_u16(s).ok())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Response::new(status, Some(Document::errors(vec![data])))
    }

    fn map_chain(&self, source: &anyhow::Error) -> ErrorData {
        for cause in source.chain() {
            if let Some(data) = self.mappers.iter().find_map(|m| m.map(cause)) {
                return data;
            }
            if let Some(error) = cause.downcast_ref::<JsonApiError>() {
                return self.to_error_data(error);
            }
        }
        JsonApiError::Repository(anyhow::anyhow!("unmapped repository error")).to_error_data()
    }
}

/// Builder for [`ExceptionMapperRegistry`].
#[derive(Default)]
pub struct ExceptionMapperRegistryBuilder {
    mappers: Vec<Box<dyn ExceptionMapper>>,
}

impl ExceptionMapperRegistryBuilder {
    /// Maps errors of type `E` with `render`.
    ///
    /// The returned object should carry a `status`; without one the response
    /// is a `500`.
    #[must_use]
    pub fn add<E, F>(mut self, render: F) -> Self
    where
        E: StdError + 'static,
        F: Fn(&E) -> ErrorData + Send + Sync + 'static,
    {
        self.mappers.push(Box::new(FnMapper {
            render,
            _error: PhantomData,
        }));
        self
    }

    /// Adds a mapper implementation.
    #[must_use]
    pub fn add_mapper(mut self, mapper: impl ExceptionMapper + 'static) -> Self {
        self.mappers.push(Box::new(mapper));
        self
    }

    /// Builds the registry.
    #[must_use]
    pub fn build(self) -> ExceptionMapperRegistry {
        ExceptionMapperRegistry {
            mappers: self.mappers,
        }
    }
}
