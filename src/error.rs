use axum::{
    Json,
    extract::{multipart::MultipartError, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;
use utoipa::ToSchema;

use crate::validators::ValidationErrors;

/// AppError
///
/// The single error type returned by handlers, repositories and stores.
/// Every variant renders the same JSON envelope `{error, message, details?, timestamp}`,
/// so clients never have to special-case a resource.
///
/// Validation problems are carried as data (`details`) rather than collapsed into a
/// generic failure; only `Database`, `Storage` and `Internal` map to 500, and those
/// hide their cause from the client (it is logged instead).
#[derive(Debug, Error)]
pub enum AppError {
    #[error("request validation failed")]
    Validation { details: ValidationErrors },

    #[error("{title}: {message}")]
    BadRequest { title: &'static str, message: String },

    #[error("{title}: {message}")]
    Unauthorized { title: &'static str, message: String },

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    /// Structural failure of a bulk import (unreadable workbook, missing columns).
    #[error("import validation failed")]
    ImportRejected {
        errors: Vec<String>,
        warnings: Vec<String>,
    },

    #[error("database error: {0}")]
    Database(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// ErrorEnvelope
///
/// Wire shape of every error response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorEnvelope {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    pub timestamp: String,
}

impl AppError {
    pub fn bad_request(title: &'static str, message: impl Into<String>) -> Self {
        AppError::BadRequest {
            title,
            message: message.into(),
        }
    }

    pub fn unauthorized(title: &'static str, message: impl Into<String>) -> Self {
        AppError::Unauthorized {
            title,
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation { .. }
            | AppError::BadRequest { .. }
            | AppError::ImportRejected { .. } => StatusCode::BAD_REQUEST,
            AppError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Database(_) | AppError::Storage(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn envelope(&self) -> ErrorEnvelope {
        let (error, message, details) = match self {
            AppError::Validation { details } => (
                "Validation Error".to_string(),
                "Request validation failed".to_string(),
                Some(json!(details)),
            ),
            AppError::BadRequest { title, message } => (title.to_string(), message.clone(), None),
            AppError::Unauthorized { title, message } => (title.to_string(), message.clone(), None),
            AppError::Forbidden(message) => ("Access denied".to_string(), message.clone(), None),
            AppError::NotFound(resource) => {
                ("Not Found".to_string(), format!("{resource} not found"), None)
            }
            AppError::ImportRejected { errors, warnings } => (
                "Import validation failed".to_string(),
                "The uploaded file contains errors".to_string(),
                Some(json!({ "errors": errors, "warnings": warnings })),
            ),
            AppError::Database(_) | AppError::Storage(_) | AppError::Internal(_) => (
                "Internal Server Error".to_string(),
                "An unexpected error occurred".to_string(),
                None,
            ),
        };

        ErrorEnvelope {
            error,
            message,
            details,
            timestamp: timestamp_now(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(self.envelope())).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Database(err.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::bad_request("Invalid request", rejection.body_text())
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        AppError::bad_request("Invalid request", format!("Malformed multipart body: {}", err.body_text()))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::bad_request("Invalid request", format!("Malformed JSON body: {err}"))
    }
}

/// RFC 3339 UTC timestamp with a `Z` suffix, used in every envelope.
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

pub type AppResult<T> = Result<T, AppError>;
