//! Error responses.
//!
//! Every failure on the request path collapses to one generic answer:
//! `500 {"error":"internal_error"}`. Details go to the log only.

use std::any::Any;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Error body code returned to callers.
pub const INTERNAL_ERROR: &str = "internal_error";

/// Error returned by handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiError {
    Internal,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": INTERNAL_ERROR })),
            )
                .into_response(),
        }
    }
}

/// Response used when a handler panics.
pub fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(panic = %detail, "Handler panicked");
    ApiError::Internal.into_response()
}
