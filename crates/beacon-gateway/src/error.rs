// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mapping of [`BeaconError`] onto HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use beacon_core::BeaconError;

/// JSON body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

/// Handler error wrapper so `?` works on [`BeaconError`] in handlers.
#[derive(Debug)]
pub struct ApiError(pub BeaconError);

impl From<BeaconError> for ApiError {
    fn from(err: BeaconError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match &self.0 {
            BeaconError::NotFound { .. } => StatusCode::NOT_FOUND,
            BeaconError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            BeaconError::InvalidTransition { .. } => StatusCode::CONFLICT,
            BeaconError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            BeaconError::Gateway { .. } => StatusCode::BAD_GATEWAY,
            BeaconError::Config(_) | BeaconError::Storage { .. } | BeaconError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = if status.is_server_error() {
            // Internal details stay in the log.
            tracing::error!(error = %self.0, "request failed");
            status
                .canonical_reason()
                .unwrap_or("internal error")
                .to_string()
        } else {
            self.0.to_string()
        };
        (status, Json(ErrorResponse::new(message))).into_response()
    }
}

/// Result type of API handlers.
pub type ApiResult<T> = Result<T, ApiError>;
