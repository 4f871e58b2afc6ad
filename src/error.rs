use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::db::StoreError;

/// Errors surfaced to HTTP clients as `{"message": ...}`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Mapping for create and update: storage failures are blamed on the input.
    pub fn client(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => AppError::NotFound(StoreError::NotFound.to_string()),
            StoreError::OperationFailed(message) => AppError::BadRequest(message),
        }
    }

    /// Mapping for list, delete and report: storage failures are server errors.
    pub fn server(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => AppError::NotFound(StoreError::NotFound.to_string()),
            StoreError::OperationFailed(message) => AppError::Internal(message),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();

        if status.is_server_error() {
            error!(status = status.as_u16(), %message, "Request failed");
        } else {
            warn!(status = status.as_u16(), %message, "Request rejected");
        }

        (status, Json(json!({ "message": message }))).into_response()
    }
}
