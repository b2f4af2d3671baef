//! Demo server errors

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

/// Body returned for any internal failure
pub const UNEXPECTED_ERROR_BODY: &str = "Encountered an unexpected error";

/// Demo server error type
#[derive(Debug, Error)]
pub enum DemoServerError {
    /// Listener or socket failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Response body could not be encoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid setting
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl IntoResponse for DemoServerError {
    fn into_response(self) -> Response {
        error!("Request failed: {}", self);
        (StatusCode::INTERNAL_SERVER_ERROR, UNEXPECTED_ERROR_BODY).into_response()
    }
}
