//! Maps domain errors onto HTTP responses.
//!
//! Body shape for every failure: `{"error": <kind>, "message": <text>}`.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use cl_core::AppError;
use serde_json::json;
use tracing::error;

#[derive(Debug)]
pub enum ApiError {
    App(AppError),
    /// Failed login. Kept apart from role refusals, which are 403.
    BadCredentials(String),
    /// The request could not be decoded (body, path or query).
    Malformed(String),
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError::App(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Malformed(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::Malformed(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Malformed(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, message) = match self {
            ApiError::Malformed(msg) => (StatusCode::BAD_REQUEST, "validation_error", msg),
            ApiError::BadCredentials(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg),
            ApiError::App(err) => {
                let kind = err.kind();
                match err {
                    AppError::Validation(msg) => (StatusCode::BAD_REQUEST, kind, msg),
                    AppError::NotFound(..) => (StatusCode::NOT_FOUND, kind, err.to_string()),
                    AppError::InvalidState(msg) => (StatusCode::CONFLICT, kind, msg),
                    AppError::Conflict(msg) => (StatusCode::CONFLICT, kind, msg),
                    AppError::Unauthorized(msg) => (StatusCode::FORBIDDEN, kind, msg),
                    AppError::Internal(msg) => {
                        error!(error = %msg, "request failed");
                        (
                            StatusCode::INTERNAL_SERVER_ERROR,
                            kind,
                            "internal server error".to_string(),
                        )
                    }
                }
            }
        };

        (status, Json(json!({ "error": kind, "message": message }))).into_response()
    }
}
