//! In-memory job registry.
//!
//! The registry is the only writer of job state. Readers get cloned
//! snapshots, so a status response never sees a half-applied update.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use ladder_models::{Job, JobError, JobId, JobStatus, RenditionOutcome, RenditionSpec};
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{WorkerError, WorkerResult};

#[derive(Debug)]
pub struct JobRegistry {
    output_root: PathBuf,
    jobs: RwLock<HashMap<JobId, Job>>,
}

impl JobRegistry {
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self {
            output_root: output_root.into(),
            jobs: RwLock::new(HashMap::new()),
        }
    }

    /// Root under which `<job id>/` directories and `<job id>.zip` archives live.
    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// Create and insert a pending job. The job is complete before anyone can read it.
    pub async fn create(
        &self,
        source_path: impl Into<PathBuf>,
        extras: Vec<RenditionSpec>,
    ) -> Job {
        let job = Job::new(JobId::new(), source_path, &self.output_root, extras);
        self.jobs.write().await.insert(job.id.clone(), job.clone());
        debug!(job_id = %job.id, "Registered job");
        job
    }

    /// Snapshot of a job.
    pub async fn get(&self, id: &JobId) -> WorkerResult<Job> {
        self.jobs
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| WorkerError::JobNotFound(id.clone()))
    }

    pub async fn set_status(&self, id: &JobId, status: JobStatus) -> WorkerResult<()> {
        self.update(id, |job| transition(job, status)).await
    }

    pub async fn set_plan(&self, id: &JobId, plan: Vec<RenditionSpec>) -> WorkerResult<()> {
        self.update(id, |job| {
            job.plan = plan;
            job.updated_at = chrono::Utc::now();
            Ok(())
        })
        .await
    }

    /// Record a rendition outcome. Each label is recorded at most once.
    pub async fn record_outcome(&self, id: &JobId, outcome: RenditionOutcome) -> WorkerResult<()> {
        self.update(id, |job| {
            let label = outcome.label().to_string();
            if job.outcomes.contains_key(&label) {
                return Err(WorkerError::OutcomeAlreadyRecorded {
                    job_id: job.id.clone(),
                    label,
                });
            }
            job.outcomes.insert(label, outcome);
            job.updated_at = chrono::Utc::now();
            Ok(())
        })
        .await
    }

    /// Move a job to `Failed` with its terminal error.
    pub async fn fail(&self, id: &JobId, error: JobError) -> WorkerResult<()> {
        self.update(id, |job| {
            transition(job, JobStatus::Failed)?;
            job.terminal_error = Some(error);
            Ok(())
        })
        .await
    }

    pub async fn set_archive_path(&self, id: &JobId, path: PathBuf) -> WorkerResult<()> {
        self.update(id, |job| {
            job.archive_path = Some(path);
            job.packaging_error = None;
            job.updated_at = chrono::Utc::now();
            Ok(())
        })
        .await
    }

    /// Record a packaging failure. The job status is left as it is.
    pub async fn set_packaging_error(&self, id: &JobId, error: JobError) -> WorkerResult<()> {
        self.update(id, |job| {
            job.packaging_error = Some(error);
            job.updated_at = chrono::Utc::now();
            Ok(())
        })
        .await
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }

    async fn update<R>(
        &self,
        id: &JobId,
        f: impl FnOnce(&mut Job) -> WorkerResult<R>,
    ) -> WorkerResult<R> {
        let mut jobs = self.jobs.write().await;
        let job = jobs
            .get_mut(id)
            .ok_or_else(|| WorkerError::JobNotFound(id.clone()))?;
        f(job)
    }
}

fn transition(job: &mut Job, next: JobStatus) -> WorkerResult<()> {
    let from = job.status;
    if job.transition(next) {
        Ok(())
    } else {
        Err(WorkerError::InvalidTransition {
            job_id: job.id.clone(),
            from,
            to: next,
        })
    }
}
