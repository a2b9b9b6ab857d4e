use crate::orchestration::MutationError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Internal server error: {0}")]
    Internal(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    /// Failure reported by an upstream API, relayed with its status.
    #[error("Upstream error {status}: {message}")]
    Upstream { status: u16, message: String },
}

impl From<MutationError> for AppError {
    fn from(err: MutationError) -> Self {
        match err {
            MutationError::NothingToChange | MutationError::MissingStorePrice(_) => {
                AppError::BadRequest(err.to_string())
            }
            MutationError::NotFound(_) => AppError::NotFound(err.to_string()),
            MutationError::Busy(_) | MutationError::BulkInProgress => {
                AppError::Conflict(err.to_string())
            }
            MutationError::Upstream(e) => {
                let status = e.status_code();
                let message = match e {
                    crate::datasource::DataSourceError::HttpError { message, .. } => message,
                    other => other.to_string(),
                };
                AppError::Upstream { status, message }
            }
        }
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::Upstream { status, message } => (
                StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
                message,
            ),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}
