//! Error types for biohub-regions
//!
//! `RegionError` is what the resolution engine returns; `ApiError` is its
//! HTTP rendering.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Region resolution errors
///
/// None of these are retried internally; each is surfaced to the caller.
#[derive(Debug, Error)]
pub enum RegionError {
    /// Input feature or geometry is malformed
    #[error("Validation error: {0}")]
    Validation(String),

    /// Spatial database could not convert a geometry
    #[error("Projection error: {0}")]
    Projection(String),

    /// Transport failure or non-success status from the feature service
    #[error("Remote query error: {0}")]
    RemoteQuery(String),

    /// Feature service response did not have the expected structure
    #[error("Response schema error: {0}")]
    ResponseSchema(String),

    /// Transaction lifecycle failure (open/commit/rollback)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result type for region resolution
pub type RegionResult<T> = Result<T, RegionError>;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Resolution engine failure
    #[error(transparent)]
    Region(#[from] RegionError),

    /// biohub-common error
    #[error("Common error: {0}")]
    Common(#[from] biohub_common::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Region(err) => {
                let message = err.to_string();
                match err {
                    RegionError::Validation(_) => {
                        (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message)
                    }
                    RegionError::Projection(_) => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "PROJECTION_ERROR",
                        message,
                    ),
                    RegionError::RemoteQuery(_) => {
                        (StatusCode::BAD_GATEWAY, "REMOTE_QUERY_ERROR", message)
                    }
                    RegionError::ResponseSchema(_) => {
                        (StatusCode::BAD_GATEWAY, "RESPONSE_SCHEMA_ERROR", message)
                    }
                    RegionError::Database(_) => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "DATABASE_ERROR",
                        message,
                    ),
                }
            }
            ApiError::Common(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "COMMON_ERROR",
                err.to_string(),
            ),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
