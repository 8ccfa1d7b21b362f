//! Error-to-HTTP response conversion.
//!
//! Route handlers return `Result<T, AppError>`; any [`sb_core::Error`]
//! converts with `?`. The JSON body carries the request ID of the request
//! being served, when the request-ID middleware is in the stack.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::middleware::request_id::current_request_id;

/// Wrapper so we can implement `IntoResponse` for an external type.
#[derive(Debug)]
pub struct AppError {
    inner: sb_core::Error,
}

impl AppError {
    pub fn new(inner: sb_core::Error) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &sb_core::Error {
        &self.inner
    }
}

impl From<sb_core::Error> for AppError {
    fn from(e: sb_core::Error) -> Self {
        Self::new(e)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(sb_core::Error::InvalidInput(format!(
            "Invalid request body: {}",
            rejection.body_text()
        )))
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::new(sb_core::Error::InvalidInput(rejection.body_text()))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.inner.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(status = %status, error = %self.inner, "Server error in handler");
        } else {
            tracing::debug!(status = %status, error = %self.inner, "Request rejected");
        }

        let body = json!({
            "error": self.inner.to_string(),
            "code": self.inner.code(),
            "request_id": current_request_id(),
        });

        (status, axum::Json(body)).into_response()
    }
}
