use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use sqlx::migrate::MigrateError;
use thiserror::Error;
use uuid::Uuid;

/// SQLSTATE codes Postgres reports when a transaction loses a race
const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";

/// Top-level error type for the entire application
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Storage conflict: {0}")]
    StorageConflict(String),

    #[error("Settlement error: {0}")]
    Settlement(#[from] SettlementError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Settlement-related errors
#[derive(Error, Debug)]
pub enum SettlementError {
    #[error("Draw not found: {0}")]
    DrawNotFound(Uuid),

    #[error("Draw {draw_id} in invalid state: {current}, expected: {expected}")]
    InvalidState {
        draw_id: Uuid,
        current: String,
        expected: String,
    },

    #[error("Draw {0} has no winning item")]
    MissingWinner(Uuid),
}

/// Coarse classification used by callers that only care about the category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    InvalidState,
    StorageConflict,
    StorageFailure,
    InvalidInput,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::InvalidState => "INVALID_STATE",
            ErrorKind::StorageConflict => "STORAGE_CONFLICT",
            ErrorKind::StorageFailure => "STORAGE_FAILURE",
            ErrorKind::InvalidInput => "INVALID_INPUT",
            ErrorKind::Internal => "INTERNAL_ERROR",
        }
    }
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Database(_) => ErrorKind::StorageFailure,
            AppError::StorageConflict(_) => ErrorKind::StorageConflict,
            AppError::Settlement(SettlementError::DrawNotFound(_)) | AppError::NotFound(_) => {
                ErrorKind::NotFound
            }
            AppError::Settlement(SettlementError::InvalidState { .. })
            | AppError::Settlement(SettlementError::MissingWinner(_)) => ErrorKind::InvalidState,
            AppError::InvalidInput(_) => ErrorKind::InvalidInput,
            AppError::Config(_) | AppError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Conflicts are safe to retry: a rolled-back settlement left nothing behind.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::StorageConflict
    }
}

impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_error) = &error {
            if let Some(code) = db_error.code() {
                if code == SERIALIZATION_FAILURE || code == DEADLOCK_DETECTED {
                    return AppError::StorageConflict(db_error.message().to_string());
                }
            }
        }
        AppError::Database(error)
    }
}

impl From<MigrateError> for AppError {
    fn from(error: MigrateError) -> Self {
        AppError::Internal(format!("Migration error: {:?}", error))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        AppError::Internal(format!("Metadata serialization error: {}", error))
    }
}

impl From<config::ConfigError> for AppError {
    fn from(error: config::ConfigError) -> Self {
        AppError::Config(error.to_string())
    }
}

/// API error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let retryable = self.is_retryable();
        let (status, message, details) = match &self {
            AppError::Settlement(SettlementError::DrawNotFound(draw_id)) => (
                StatusCode::NOT_FOUND,
                self.to_string(),
                Some(serde_json::json!({ "draw_id": draw_id })),
            ),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string(), None),
            AppError::Settlement(SettlementError::InvalidState {
                draw_id,
                current,
                expected,
            }) => (
                StatusCode::CONFLICT,
                self.to_string(),
                Some(serde_json::json!({
                    "draw_id": draw_id,
                    "current": current,
                    "expected": expected,
                })),
            ),
            AppError::Settlement(SettlementError::MissingWinner(draw_id)) => (
                StatusCode::CONFLICT,
                self.to_string(),
                Some(serde_json::json!({ "draw_id": draw_id })),
            ),
            AppError::StorageConflict(_) => (
                StatusCode::CONFLICT,
                "Draw is already being settled, retry later".to_string(),
                Some(serde_json::json!({ "retryable": retryable })),
            ),
            AppError::InvalidInput(_) => (StatusCode::BAD_REQUEST, self.to_string(), None),
            AppError::Database(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "A database error occurred".to_string(),
                None,
            ),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "An internal error occurred".to_string(),
                None,
            ),
        };

        let body = Json(ErrorResponse {
            error: message,
            error_code: kind.as_str().to_string(),
            details,
        });

        (status, body).into_response()
    }
}

/// Result type alias for the application
pub type AppResult<T> = Result<T, AppError>;
