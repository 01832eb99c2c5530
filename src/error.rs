use std::backtrace::Backtrace;
use std::error::Error as StdError;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use validator::ValidationErrors;

/// AppError
///
/// The single error taxonomy shared by the repository layer and the HTTP handlers.
/// Each variant maps onto exactly one status code in the `IntoResponse` impl below.
#[derive(Error, Debug)]
pub enum AppError {
    /// Missing or malformed input (400).
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A uniqueness constraint would be violated (409).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The addressed row does not exist, or vanished between read and write (404).
    #[error("Not found")]
    NotFound,

    /// Bad credentials or a missing/invalid/expired bearer token (401).
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// A fault caught with full diagnostic detail. Only registration produces this variant;
    /// the payload exposes internals and is meant for development use.
    #[error("Unexpected error: {message}")]
    Unexpected {
        message: String,
        inner: Option<String>,
        stack: String,
    },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("Token settings missing: {0}")]
    TokenSettings(&'static str),

    #[error("Password hashing error: {0}")]
    Hashing(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Wraps any error into `Unexpected`, capturing its direct source and the current backtrace.
    pub fn unexpected(err: &(dyn StdError + 'static)) -> Self {
        AppError::Unexpected {
            message: err.to_string(),
            inner: err.source().map(|source| source.to_string()),
            stack: Backtrace::force_capture().to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Unexpected { .. }
            | AppError::Database(_)
            | AppError::Token(_)
            | AppError::TokenSettings(_)
            | AppError::Hashing(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            AppError::Validation(message)
            | AppError::Conflict(message)
            | AppError::Unauthorized(message) => {
                (status, Json(json!({ "message": message }))).into_response()
            }
            AppError::NotFound => status.into_response(),
            AppError::Unexpected {
                message,
                inner,
                stack,
            } => {
                tracing::error!("unexpected fault: {}", message);
                (
                    status,
                    Json(json!({
                        "message": "Internal server error",
                        "error": message,
                        "innerException": inner,
                        "stackTrace": stack,
                    })),
                )
                    .into_response()
            }
            other => {
                // Store, token and hashing faults stay opaque to the client.
                tracing::error!("request failed: {:?}", other);
                (status, Json(json!({ "message": "Internal server error" }))).into_response()
            }
        }
    }
}
