// crates/server/src/error.rs
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use dw_migrate_core::InventoryError;
use serde::Serialize;
use thiserror::Error;
use ts_rs::TS;

use crate::jobs::JobError;

/// Structured JSON error response for API errors
#[derive(Debug, Serialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../src/types/generated/"))]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: Some(details.into()),
        }
    }
}

/// API error types that map to HTTP status codes
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Job(#[from] JobError),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_response) = match &self {
            ApiError::Job(job_err) => job_error_response(job_err),
            ApiError::Internal(msg) => {
                tracing::error!(message = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new("Internal server error"),
                )
            }
            ApiError::BadRequest(msg) => {
                tracing::warn!(message = %msg, "Bad request");
                (
                    StatusCode::BAD_REQUEST,
                    ErrorResponse::with_details("Bad request", msg.clone()),
                )
            }
            ApiError::Conflict(msg) => {
                tracing::warn!(message = %msg, "Conflict");
                (
                    StatusCode::CONFLICT,
                    ErrorResponse::with_details("Conflict", msg.clone()),
                )
            }
        };

        (status, Json(error_response)).into_response()
    }
}

fn job_error_response(err: &JobError) -> (StatusCode, ErrorResponse) {
    match err {
        JobError::NotFound(id) => {
            tracing::warn!(job_id = %id, "Job not found");
            (
                StatusCode::NOT_FOUND,
                ErrorResponse::with_details("Job not found", format!("Job ID: {}", id)),
            )
        }
        JobError::NoObjects => {
            tracing::warn!("Migration requested with no objects");
            (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new("No objects found to migrate"),
            )
        }
        JobError::InvalidRequest(msg) => {
            tracing::warn!(message = %msg, "Invalid migration request");
            (
                StatusCode::BAD_REQUEST,
                ErrorResponse::with_details("Bad request", msg.clone()),
            )
        }
        JobError::Extraction(inv_err) => {
            let (status, error_msg) = match inv_err {
                InventoryError::NotFound { path } => {
                    tracing::warn!(path = %path.display(), "Inventory file not found");
                    (StatusCode::BAD_REQUEST, "Inventory file not found")
                }
                InventoryError::PermissionDenied { path } => {
                    tracing::warn!(path = %path.display(), "Permission denied reading inventory");
                    (StatusCode::BAD_REQUEST, "Cannot read inventory file")
                }
                InventoryError::Io { path, source } => {
                    tracing::error!(path = %path.display(), error = %source, "IO error reading inventory");
                    (StatusCode::BAD_REQUEST, "IO error reading inventory")
                }
                InventoryError::Malformed { message } => {
                    tracing::warn!(message = %message, "Malformed inventory");
                    (StatusCode::BAD_REQUEST, "Malformed inventory document")
                }
            };
            (status, ErrorResponse::with_details(error_msg, inv_err.to_string()))
        }
        JobError::AlreadyTerminal(id) => {
            tracing::warn!(job_id = %id, "Job already finished");
            (
                StatusCode::CONFLICT,
                ErrorResponse::with_details("Job already finished", format!("Job ID: {}", id)),
            )
        }
        JobError::Duplicate(_) | JobError::AlreadyInitialized(_) | JobError::NotTerminal(_) => {
            tracing::error!(error = %err, "Job engine invariant violated");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::new("Internal server error"),
            )
        }
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
