//! Per-rendition encode outcomes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::JobError;
use crate::rendition::RenditionSpec;

/// Result of one rendition's encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutcomeStatus {
    Succeeded,
    Failed,
}

/// Recorded once per planned rendition; immutable afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenditionOutcome {
    pub spec: RenditionSpec,
    pub status: OutcomeStatus,
    /// Public URI of the playlist (e.g. `/hls/<job>/stream-720p.m3u8`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JobError>,
    pub finished_at: DateTime<Utc>,
}

impl RenditionOutcome {
    pub fn succeeded(spec: RenditionSpec, artifact_uri: impl Into<String>) -> Self {
        Self {
            spec,
            status: OutcomeStatus::Succeeded,
            artifact_uri: Some(artifact_uri.into()),
            error: None,
            finished_at: Utc::now(),
        }
    }

    pub fn failed(spec: RenditionSpec, error: JobError) -> Self {
        Self {
            spec,
            status: OutcomeStatus::Failed,
            artifact_uri: None,
            error: Some(error),
            finished_at: Utc::now(),
        }
    }

    pub fn label(&self) -> &str {
        &self.spec.label
    }

    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Succeeded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::rendition::Resolution;

    fn spec() -> RenditionSpec {
        RenditionSpec::catalog_entry("360p", Resolution::new(640, 360), "800k")
    }

    #[test]
    fn test_succeeded_outcome() {
        let outcome = RenditionOutcome::succeeded(spec(), "/hls/job/stream-360p.m3u8");
        assert!(outcome.is_success());
        assert_eq!(outcome.label(), "360p");
        assert!(outcome.error.is_none());
    }

    #[test]
    fn test_failed_outcome_serialization() {
        let outcome = RenditionOutcome::failed(
            spec(),
            JobError::new(ErrorKind::EncodeFailure, "exit code 1"),
        );
        assert!(!outcome.is_success());

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "Failed");
        assert_eq!(json["error"]["kind"], "EncodeFailure");
        assert!(json.get("artifactUri").is_none());
    }
}
