use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use instagate_core::{CoreError, ErrorExt, StorageError};
use serde_json::json;
use thiserror::Error;

/// Failure of a request handler, already reduced to what the caller sees.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Media absent both locally and in remote storage.
    #[error("{0}")]
    NotFound(String),

    /// Remote storage unreachable or failing.
    #[error("{0}")]
    UpstreamFetch(String),

    /// Everything the platform client (or anything else) reported.
    #[error("{0}")]
    BadRequest(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::UpstreamFetch(_) => StatusCode::BAD_GATEWAY,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    pub fn detail(&self) -> &str {
        match self {
            ApiError::NotFound(detail)
            | ApiError::UpstreamFetch(detail)
            | ApiError::BadRequest(detail) => detail,
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(error: CoreError) -> Self {
        match &error {
            CoreError::Storage(StorageError::UpstreamFetch { .. }) | CoreError::Network(_) => {
                error.log_error();
            }
            _ => {
                error.log_warn();
            }
        }

        match error {
            CoreError::Storage(storage) => storage.into(),
            CoreError::NotFound { resource } => {
                ApiError::NotFound(format!("File not found: {}", resource))
            }
            CoreError::Platform(platform) => ApiError::BadRequest(platform.to_string()),
            other => ApiError::BadRequest(other.to_string()),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(error: StorageError) -> Self {
        match error {
            StorageError::NotFound { .. } => ApiError::NotFound(error.to_string()),
            StorageError::UpstreamFetch { .. } => ApiError::UpstreamFetch(error.to_string()),
            StorageError::Transport(_) => ApiError::BadRequest(error.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(json!({ "detail": self.detail() }))).into_response()
    }
}
