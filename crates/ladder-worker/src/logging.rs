//! Structured job logging utilities.
//!
//! Every event carries the job id and the operation, and optionally the
//! rendition label, so per-job logs can be filtered out of JSON output.

use tracing::{error, info, warn, Span};

use ladder_models::JobId;

/// Job logger for structured logging with consistent formatting.
#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: String,
    operation: String,
    rendition: Option<String>,
}

impl JobLogger {
    /// Create a new job logger for a specific job and operation
    /// (e.g. "hls_ladder", "packaging").
    pub fn new(job_id: &JobId, operation: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
            operation: operation.to_string(),
            rendition: None,
        }
    }

    /// Same job and operation, scoped to one rendition.
    pub fn for_rendition(&self, label: &str) -> Self {
        Self {
            rendition: Some(label.to_string()),
            ..self.clone()
        }
    }

    fn rendition(&self) -> &str {
        self.rendition.as_deref().unwrap_or("-")
    }

    pub fn log_start(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            operation = %self.operation,
            rendition = %self.rendition(),
            "Job started: {}", message
        );
    }

    pub fn log_progress(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            operation = %self.operation,
            rendition = %self.rendition(),
            "Job progress: {}", message
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            job_id = %self.job_id,
            operation = %self.operation,
            rendition = %self.rendition(),
            "Job warning: {}", message
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            job_id = %self.job_id,
            operation = %self.operation,
            rendition = %self.rendition(),
            "Job error: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            operation = %self.operation,
            rendition = %self.rendition(),
            "Job completed: {}", message
        );
    }

    /// Span wrapping a whole job run.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "job",
            job_id = %self.job_id,
            operation = %self.operation
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_logger_creation() {
        let job_id = JobId::new();
        let logger = JobLogger::new(&job_id, "hls_ladder");

        assert_eq!(logger.job_id, job_id.to_string());
        assert_eq!(logger.operation, "hls_ladder");
        assert_eq!(logger.rendition(), "-");
    }

    #[test]
    fn test_rendition_scope() {
        let logger = JobLogger::new(&JobId::new(), "hls_ladder").for_rendition("720p");
        assert_eq!(logger.rendition(), "720p");
        assert_eq!(logger.operation, "hls_ladder");
    }
}
