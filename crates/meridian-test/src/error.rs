//! Test error types.

use meridian_core::JsonApiError;
use thiserror::Error;

/// Errors that can occur during testing.
#[derive(Debug, Error)]
pub enum TestError {
    /// JSON serialization or deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Building the registry or the dispatcher failed.
    #[error("setup error: {0}")]
    Setup(#[from] JsonApiError),

    /// The response carried no document.
    #[error("response has no document (status {0})")]
    NoDocument(u16),
}
