//! API error types.

use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use ladder_models::ErrorKind;
use ladder_worker::WorkerError;
use serde::Serialize;
use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("No video file in request")]
    UploadMissing,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    Worker(#[from] WorkerError),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Error category, reported as `code` in the response body.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::UploadMissing => ErrorKind::UploadMissing,
            ApiError::BadRequest(_) => ErrorKind::InvalidRequest,
            ApiError::NotFound(_) => ErrorKind::JobNotFound,
            ApiError::Internal(_) => ErrorKind::Internal,
            ApiError::Worker(e) => e.kind(),
        }
    }

    fn status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::UploadMissing | ErrorKind::InvalidRequest => StatusCode::BAD_REQUEST,
            ErrorKind::JobNotFound => StatusCode::NOT_FOUND,
            ErrorKind::ServerBusy => StatusCode::TOO_MANY_REQUESTS,
            ErrorKind::ProbeFailure
            | ErrorKind::EncodeFailure
            | ErrorKind::PackagingFailure
            | ErrorKind::Cancelled
            | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<std::io::Error> for ApiError {
    fn from(e: std::io::Error) -> Self {
        Self::Internal(e.to_string())
    }
}

impl From<MultipartError> for ApiError {
    fn from(e: MultipartError) -> Self {
        Self::BadRequest(format!("Malformed multipart body: {}", e.body_text()))
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
    code: &'static str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Don't expose internal error details in production
        let detail = if status == StatusCode::INTERNAL_SERVER_ERROR
            && std::env::var("ENVIRONMENT").unwrap_or_default() == "production"
        {
            "An internal error occurred".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorResponse {
            detail,
            code: self.kind().as_str(),
        };

        (status, Json(body)).into_response()
    }
}
