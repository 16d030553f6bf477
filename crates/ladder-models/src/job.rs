//! Conversion job definitions.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::JobError;
use crate::outcome::RenditionOutcome;
use crate::rendition::RenditionSpec;

/// Unique identifier for a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the string has the shape of a generated id (a UUID).
    ///
    /// Used to reject path-like identifiers before they reach the filesystem.
    pub fn is_well_formed(s: &str) -> bool {
        Uuid::parse_str(s).is_ok()
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Job lifecycle state.
///
/// Transitions are monotonic: `Pending -> Processing -> {Done, Failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum JobStatus {
    /// Accepted, not started
    #[default]
    Pending,
    /// Probing or encoding
    Processing,
    /// Every planned rendition succeeded
    Done,
    /// Probe failed, a rendition failed, or the job was cancelled
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "Pending",
            JobStatus::Processing => "Processing",
            JobStatus::Done => "Done",
            JobStatus::Failed => "Failed",
        }
    }

    /// Check if this is a terminal state (no more updates expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Failed)
    }

    /// Whether `self -> next` is a legal lifecycle edge.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::Processing)
                | (JobStatus::Processing, JobStatus::Done)
                | (JobStatus::Processing, JobStatus::Failed)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a job's status timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub status: JobStatus,
    pub at: DateTime<Utc>,
}

/// A conversion job: one per accepted upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    /// Unique job ID
    pub id: JobId,

    /// Lifecycle state
    pub status: JobStatus,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,

    /// When processing started
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    /// When the job reached a terminal status
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,

    /// Uploaded source file
    pub source_path: PathBuf,

    /// `<output_root>/<job id>`; playlists and segments land here
    pub output_dir: PathBuf,

    /// Extra renditions requested with the upload
    #[serde(default)]
    pub requested_extras: Vec<RenditionSpec>,

    /// Renditions selected for this job, in encode order
    #[serde(default)]
    pub plan: Vec<RenditionSpec>,

    /// Outcomes keyed by rendition label
    #[serde(default)]
    pub outcomes: HashMap<String, RenditionOutcome>,

    /// Why the job failed, if it did
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terminal_error: Option<JobError>,

    /// Packaged archive, set once packaging succeeds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archive_path: Option<PathBuf>,

    /// Packaging failure; does not change a `Done` status
    #[serde(skip_serializing_if = "Option::is_none")]
    pub packaging_error: Option<JobError>,

    /// Status timeline, oldest first
    #[serde(default)]
    pub history: Vec<StatusChange>,
}

impl Job {
    /// Create a pending job whose output directory is derived from its id.
    pub fn new(
        id: JobId,
        source_path: impl Into<PathBuf>,
        output_root: impl AsRef<Path>,
        requested_extras: Vec<RenditionSpec>,
    ) -> Self {
        let now = Utc::now();
        let output_dir = output_root.as_ref().join(id.as_str());

        Self {
            id,
            status: JobStatus::Pending,
            created_at: now,
            updated_at: now,
            started_at: None,
            finished_at: None,
            source_path: source_path.into(),
            output_dir,
            requested_extras,
            plan: Vec::new(),
            outcomes: HashMap::new(),
            terminal_error: None,
            archive_path: None,
            packaging_error: None,
            history: vec![StatusChange {
                status: JobStatus::Pending,
                at: now,
            }],
        }
    }

    /// Apply a lifecycle transition. Returns `false` (and changes nothing)
    /// if the edge is not allowed.
    pub fn transition(&mut self, next: JobStatus) -> bool {
        if !self.status.can_transition_to(next) {
            return false;
        }

        let now = Utc::now();
        self.status = next;
        self.updated_at = now;
        match next {
            JobStatus::Processing => self.started_at = Some(now),
            JobStatus::Done | JobStatus::Failed => self.finished_at = Some(now),
            JobStatus::Pending => {}
        }
        self.history.push(StatusChange { status: next, at: now });
        true
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Playlist URIs of succeeded renditions, in plan order.
    pub fn outputs(&self) -> Vec<String> {
        self.plan
            .iter()
            .filter_map(|spec| self.outcomes.get(&spec.label))
            .filter_map(|outcome| outcome.artifact_uri.clone())
            .collect()
    }

    /// Outcomes in plan order (planned renditions without an outcome are skipped).
    pub fn ordered_outcomes(&self) -> Vec<&RenditionOutcome> {
        self.plan
            .iter()
            .filter_map(|spec| self.outcomes.get(&spec.label))
            .collect()
    }

    /// Whether every planned rendition has a succeeded outcome.
    pub fn all_succeeded(&self) -> bool {
        self.plan.iter().all(|spec| {
            self.outcomes
                .get(&spec.label)
                .map(RenditionOutcome::is_success)
                .unwrap_or(false)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, JobError};
    use crate::rendition::Resolution;

    fn job() -> Job {
        Job::new(JobId::new(), "/tmp/uploads/in.mp4", "/tmp/output", Vec::new())
    }

    #[test]
    fn test_job_creation() {
        let job = job();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.output_dir, PathBuf::from("/tmp/output").join(job.id.as_str()));
        assert_eq!(job.history.len(), 1);
        assert!(JobId::is_well_formed(job.id.as_str()));
    }

    #[test]
    fn test_job_state_transitions() {
        let mut job = job();

        assert!(!job.transition(JobStatus::Done));
        assert!(job.transition(JobStatus::Processing));
        assert!(job.started_at.is_some());
        assert!(!job.transition(JobStatus::Pending));
        assert!(job.transition(JobStatus::Done));
        assert!(job.is_terminal());
        assert!(!job.transition(JobStatus::Failed));
        assert!(!job.transition(JobStatus::Processing));

        let seen: Vec<_> = job.history.iter().map(|c| c.status).collect();
        assert_eq!(seen, [JobStatus::Pending, JobStatus::Processing, JobStatus::Done]);
    }

    #[test]
    fn test_outputs_follow_plan_order() {
        let mut job = job();
        let low = RenditionSpec::catalog_entry("360p", Resolution::new(640, 360), "800k");
        let high = RenditionSpec::catalog_entry("720p", Resolution::new(1280, 720), "1500k");
        job.plan = vec![low.clone(), high.clone()];

        job.outcomes.insert(
            "720p".into(),
            RenditionOutcome::succeeded(high, "/hls/x/stream-720p.m3u8"),
        );
        assert!(!job.all_succeeded());

        job.outcomes.insert(
            "360p".into(),
            RenditionOutcome::succeeded(low, "/hls/x/stream-360p.m3u8"),
        );
        assert!(job.all_succeeded());
        assert_eq!(
            job.outputs(),
            ["/hls/x/stream-360p.m3u8", "/hls/x/stream-720p.m3u8"]
        );
    }

    #[test]
    fn test_failed_outcome_excluded_from_outputs() {
        let mut job = job();
        let spec = RenditionSpec::catalog_entry("360p", Resolution::new(640, 360), "800k");
        job.plan = vec![spec.clone()];
        job.outcomes.insert(
            "360p".into(),
            RenditionOutcome::failed(spec, JobError::new(ErrorKind::EncodeFailure, "boom")),
        );

        assert!(!job.all_succeeded());
        assert!(job.outputs().is_empty());
        assert_eq!(job.ordered_outcomes().len(), 1);
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(serde_json::to_string(&JobStatus::Done).unwrap(), "\"Done\"");
        assert_eq!(JobStatus::Processing.to_string(), "Processing");
    }
}
