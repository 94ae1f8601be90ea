//! Error types for the cache server
//!
//! Provides unified error handling using thiserror.
//!
//! The storage engine and the executor report ordinary outcomes (missing key,
//! full queue, entry too large) as booleans; this type is used where those
//! outcomes cross into startup code or the HTTP layer.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Cache Error Enum ==
/// Unified error type for the cache server.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Store or executor settings that cannot produce a working server
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Key not found in cache
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Key already stored and the command requires it to be absent
    #[error("Key already exists: {0}")]
    AlreadyExists(String),

    /// Entry is larger than a whole shard
    #[error("Entry too large: {0}")]
    EntryTooLarge(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Executor refused the work (queue full or shutting down)
    #[error("Server overloaded: {0}")]
    Overloaded(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::AlreadyExists(_) => StatusCode::CONFLICT,
            CacheError::EntryTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::Overloaded(_) => StatusCode::SERVICE_UNAVAILABLE,
            CacheError::InvalidConfig(_) | CacheError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache server.
pub type Result<T> = std::result::Result<T, CacheError>;
