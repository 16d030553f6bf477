//! Worker error types.

use ladder_media::MediaError;
use ladder_models::{ErrorKind, JobError, JobId, JobStatus, ModelError};
use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Probe failed: {0}")]
    ProbeFailed(String),

    #[error("Encode failed: {0}")]
    EncodeFailed(String),

    #[error("Packaging failed: {0}")]
    PackagingFailed(String),

    #[error("Server busy: {0} jobs already in flight")]
    ServerBusy(usize),

    #[error("Job not found: {0}")]
    JobNotFound(JobId),

    #[error("Job {job_id}: illegal transition {from} -> {to}")]
    InvalidTransition {
        job_id: JobId,
        from: JobStatus,
        to: JobStatus,
    },

    #[error("Job {job_id}: outcome for '{label}' already recorded")]
    OutcomeAlreadyRecorded { job_id: JobId, label: String },

    #[error("Cancelled")]
    Cancelled,

    #[error("Job task exited before registering the job")]
    JobTaskLost,

    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("Invalid input: {0}")]
    Model(#[from] ModelError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn probe_failed(msg: impl Into<String>) -> Self {
        Self::ProbeFailed(msg.into())
    }

    pub fn encode_failed(msg: impl Into<String>) -> Self {
        Self::EncodeFailed(msg.into())
    }

    pub fn packaging_failed(msg: impl Into<String>) -> Self {
        Self::PackagingFailed(msg.into())
    }

    /// Failure category recorded on jobs and surfaced by the API.
    pub fn kind(&self) -> ErrorKind {
        match self {
            WorkerError::ProbeFailed(_) => ErrorKind::ProbeFailure,
            WorkerError::EncodeFailed(_) => ErrorKind::EncodeFailure,
            WorkerError::PackagingFailed(_) => ErrorKind::PackagingFailure,
            WorkerError::ServerBusy(_) => ErrorKind::ServerBusy,
            WorkerError::JobNotFound(_) => ErrorKind::JobNotFound,
            WorkerError::Cancelled => ErrorKind::Cancelled,
            WorkerError::Media(MediaError::Cancelled) => ErrorKind::Cancelled,
            // Tool failures are attributed to the encode
            WorkerError::Media(_) => ErrorKind::EncodeFailure,
            WorkerError::Model(_) => ErrorKind::InvalidRequest,
            WorkerError::InvalidTransition { .. }
            | WorkerError::OutcomeAlreadyRecorded { .. }
            | WorkerError::JobTaskLost
            | WorkerError::Io(_) => ErrorKind::Internal,
        }
    }

    /// Recorded form of this error.
    pub fn to_job_error(&self) -> JobError {
        JobError::new(self.kind(), self.to_string())
    }
}
