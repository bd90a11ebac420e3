//! HTTP error responses.

use super::upload::UploadError;
use crate::error::VoxsqlError;
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{error, warn};

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// An error rendered as `{"error": "..."}` with a status code.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// Map an upload failure.
    ///
    /// Refused file types get `rejected`; unreadable forms count as missing
    /// the file unless the body was too large.
    pub fn from_upload(e: UploadError, rejected: &str, missing: &str) -> Self {
        match e {
            UploadError::Rejected(_) => Self::bad_request(rejected),
            UploadError::Multipart(e) if e.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                Self::new(e.status(), e.body_text())
            }
            UploadError::Multipart(_) => Self::bad_request(missing),
            UploadError::Io(e) => Self::internal(e.to_string()),
        }
    }
}

impl From<VoxsqlError> for ApiError {
    fn from(e: VoxsqlError) -> Self {
        Self::internal(e.to_string())
    }
}

/// Unparsable bodies are a 400; a body over the size limit keeps its 413.
impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        match e.status() {
            StatusCode::PAYLOAD_TOO_LARGE => Self::new(e.status(), e.body_text()),
            _ => Self::bad_request(e.body_text()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = %self.status, "{}", self.message);
        } else {
            warn!(status = %self.status, "{}", self.message);
        }

        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}
