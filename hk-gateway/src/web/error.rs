//! Handler errors.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::{error, warn};

use crate::domain::DomainError;
use crate::eta::RenderError;

use super::dto::ErrorResponse;

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    BadRequest { message: String },
    NotFound { message: String, details: Option<String> },
    Internal { message: String, details: Option<String> },
}

impl AppError {
    pub fn not_found(message: impl Into<String>) -> Self {
        AppError::NotFound {
            message: message.into(),
            details: None,
        }
    }

    pub fn internal(message: impl Into<String>, details: impl ToString) -> Self {
        AppError::Internal {
            message: message.into(),
            details: Some(details.to_string()),
        }
    }
}

impl From<DomainError> for AppError {
    fn from(e: DomainError) -> Self {
        AppError::BadRequest {
            message: e.to_string(),
        }
    }
}

impl From<RenderError> for AppError {
    fn from(e: RenderError) -> Self {
        AppError::internal("Failed to render CSV", e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match self {
            AppError::BadRequest { message } => (StatusCode::BAD_REQUEST, message, None),
            AppError::NotFound { message, details } => (StatusCode::NOT_FOUND, message, details),
            AppError::Internal { message, details } => {
                (StatusCode::INTERNAL_SERVER_ERROR, message, details)
            }
        };

        if status.is_server_error() {
            error!(
                %status,
                error = %error,
                details = details.as_deref().unwrap_or_default(),
                "Request failed"
            );
        } else {
            warn!(%status, error = %error, "Request rejected");
        }

        (status, Json(ErrorResponse { error, details })).into_response()
    }
}
