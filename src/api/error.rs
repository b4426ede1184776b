//! Mapping of core errors onto HTTP responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::warn;

use super::types::ErrorResponse;
use crate::error::SimError;

/// Error returned by handlers, rendered as `{"error": ...}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }
}

impl From<SimError> for ApiError {
    fn from(e: SimError) -> Self {
        let status = match &e {
            SimError::NotFound(_) => StatusCode::NOT_FOUND,
            SimError::NotActive(_) | SimError::NotSimulating(_) => StatusCode::CONFLICT,
            SimError::Initialization { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            SimError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
            SimError::Step(_) | SimError::Export(_) | SimError::Spawn(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        if status.is_server_error() {
            warn!(error = %e, "request failed");
        }
        Self {
            status,
            message: e.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}
