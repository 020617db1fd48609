//! Request extraction for Meridian.
//!
//! This crate turns the transport-neutral [`JsonApiRequest`] into the typed
//! inputs of the dispatch pipeline:
//!
//! - [`parse_query_params`]: the raw query string as [`QueryParams`]
//! - [`QuerySpecDeserializer`]: validated [`QuerySpec`]s, checked against the
//!   resource information of the addressed type (unknown fields, sortable
//!   and filterable flags, page limits)
//! - [`RequestBody`]: the JSON:API request document, with content type and
//!   size checks
//!
//! Failures are reported as [`ExtractionError`], which converts into
//! [`JsonApiError`](meridian_core::JsonApiError).
//!
//! [`QueryParams`]: meridian_core::QueryParams
//! [`QuerySpec`]: meridian_core::QuerySpec

mod body;
mod error;
mod query;
mod request;

pub use body::{RequestBody, DEFAULT_MAX_BODY_SIZE};
pub use error::{ExtractionError, ExtractionSource};
pub use query::{parse_query_params, QueryParserSettings, QuerySpecDeserializer};
pub use request::{JsonApiRequest, JsonApiRequestBuilder};
