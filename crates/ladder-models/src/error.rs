//! Model-level errors and the job error vocabulary.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for model parsing and validation.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised while parsing or validating model values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("Invalid resolution '{0}', expected WIDTHxHEIGHT")]
    InvalidResolution(String),

    #[error("Invalid bitrate '{0}'")]
    InvalidBitrate(String),

    #[error("Invalid rendition: {0}")]
    InvalidRendition(String),

    #[error("Invalid rendition catalog: {0}")]
    InvalidCatalog(String),
}

/// Failure categories surfaced through job status and API errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// No file in the upload request
    UploadMissing,
    /// Admission denied
    ServerBusy,
    /// Source metadata could not be determined
    ProbeFailure,
    /// One rendition's encoder invocation failed
    EncodeFailure,
    /// Archive creation failed after the job was done
    PackagingFailure,
    /// Unknown job id
    JobNotFound,
    /// Job or task cancelled before completion
    Cancelled,
    /// Malformed request parameters (e.g. extra qualities)
    InvalidRequest,
    /// Anything else that is not the caller's fault
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::UploadMissing => "UploadMissing",
            ErrorKind::ServerBusy => "ServerBusy",
            ErrorKind::ProbeFailure => "ProbeFailure",
            ErrorKind::EncodeFailure => "EncodeFailure",
            ErrorKind::PackagingFailure => "PackagingFailure",
            ErrorKind::JobNotFound => "JobNotFound",
            ErrorKind::Cancelled => "Cancelled",
            ErrorKind::InvalidRequest => "InvalidRequest",
            ErrorKind::Internal => "Internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recorded failure: category plus human-readable detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobError {
    pub kind: ErrorKind,
    pub message: String,
}

impl JobError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for JobError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}
