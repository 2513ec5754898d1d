//! Mapping of remote failures onto HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::warn;

use crate::error::RemoteError;

/// JSON error body: `{"error": "<KIND>", "message": "<text>"}`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

/// Handler error wrapper so `?` on a [`RemoteError`] yields a response.
#[derive(Debug)]
pub struct ApiError(pub RemoteError);

impl From<RemoteError> for ApiError {
    fn from(err: RemoteError) -> Self {
        Self(err)
    }
}

#[must_use]
pub fn status_for(err: &RemoteError) -> StatusCode {
    match err {
        RemoteError::NotFound { .. } => StatusCode::NOT_FOUND,
        RemoteError::Validation { .. } | RemoteError::UnknownAction { .. } => {
            StatusCode::BAD_REQUEST
        }
        RemoteError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        RemoteError::Transport { .. } => StatusCode::BAD_GATEWAY,
        RemoteError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            warn!(kind = self.0.kind(), error = %self.0, "request failed");
        }
        let body = ErrorBody {
            error: self.0.kind(),
            message: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
