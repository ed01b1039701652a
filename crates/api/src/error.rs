//! HTTP error responses.
//!
//! Handlers return `Result<_, ApiError>`; anything convertible into `AppError`
//! converts with `?` and renders as `{"error": ..., "code": ...}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use lectern_shared::AppError;
use serde::Serialize;
use tracing::{error, warn};

/// JSON error body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Human readable message.
    pub error: String,
    /// Machine readable error code.
    pub code: &'static str,
}

/// Error type returned by handlers.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl<E> From<E> for ApiError
where
    E: Into<AppError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl ApiError {
    /// Message shown to the client. Server-side failures are not detailed.
    fn client_message(&self) -> String {
        match &self.0 {
            AppError::NotFound(_) | AppError::Validation(_) => self.0.to_string(),
            AppError::Database(_) => "Database error".to_string(),
            AppError::ExternalService(_) => "File storage error".to_string(),
            AppError::Internal(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if self.0.is_server_error() {
            error!(error = %self.0, code = self.0.error_code(), "Request failed");
        } else {
            warn!(error = %self.0, code = self.0.error_code(), "Request rejected");
        }

        let body = ErrorResponse {
            error: self.client_message(),
            code: self.0.error_code(),
        };
        (status, Json(body)).into_response()
    }
}
