//! API error handling.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::error;

/// API error type.
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    Unavailable(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Unavailable(msg) => {
                error!(error = %msg, "Job store unavailable");
                (StatusCode::SERVICE_UNAVAILABLE, msg)
            }
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

impl From<renderq_core::Error> for ApiError {
    fn from(err: renderq_core::Error) -> Self {
        use renderq_core::Error;
        match err {
            Error::NoJobsAvailable | Error::NotFound(_) => ApiError::NotFound(err.to_string()),
            Error::InvalidTransition(_) => ApiError::BadRequest(err.to_string()),
            Error::AlreadyClaimed(_) => ApiError::Conflict(err.to_string()),
            Error::StoreUnavailable(_) => ApiError::Unavailable(err.to_string()),
        }
    }
}
