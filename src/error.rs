use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Business outcome on a well-formed request ("no match", "too many faces").
    #[error("{0}")]
    User(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Face service error: {message}")]
    FaceService { retryable: bool, message: String },

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Response classes seen by API callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    User,
    Service,
}

impl AppError {
    pub fn face(retryable: bool, message: impl Into<String>) -> Self {
        AppError::FaceService {
            retryable,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Validation(_) => ErrorKind::Validation,
            AppError::User(_) => ErrorKind::User,
            _ => ErrorKind::Service,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::FaceService {
                retryable: true,
                ..
            } | AppError::Timeout(_)
        )
    }

    /// Non-retryable face service failures carry a message meant for the caller.
    pub fn surface_face_error(self) -> Self {
        match self {
            AppError::FaceService {
                retryable: false,
                message,
            } => AppError::User(message),
            other => other,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::User => StatusCode::OK,
            ErrorKind::Service => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            AppError::Validation(msg) => json!({ "error": msg }),
            AppError::User(msg) => json!({ "userError": true, "message": msg }),
            err => {
                tracing::error!("Request failed: {}", err);
                json!({ "error": "Internal server error" })
            }
        };
        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
