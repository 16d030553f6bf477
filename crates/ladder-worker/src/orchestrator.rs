//! Encode orchestration for one job.
//!
//! Probe, plan, fan out one task per rendition, join them all, then settle
//! the job status. Packaging runs only for `Done` jobs and never changes the
//! status. Nothing here returns an error to the caller: every failure ends
//! up recorded on the job.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use ladder_media::HlsSettings;
use ladder_models::{
    ErrorKind, Job, JobError, JobId, JobStatus, RenditionOutcome, RenditionSpec,
};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::admission::AdmissionPermit;
use crate::config::WorkerConfig;
use crate::encoder::{EncodeRequest, Encoder};
use crate::error::WorkerError;
use crate::logging::JobLogger;
use crate::metrics;
use crate::packager::Packager;
use crate::planner::RenditionPlanner;
use crate::prober::{Prober, SourceInfo};
use crate::registry::JobRegistry;

/// Per-job encode settings.
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub encode_timeout: Duration,
    pub hls: HlsSettings,
    /// Prefix for logged links, e.g. `https://media.example.com`
    pub public_base_url: Option<String>,
}

impl From<&WorkerConfig> for OrchestratorSettings {
    fn from(config: &WorkerConfig) -> Self {
        Self {
            encode_timeout: config.encode_timeout,
            hls: config.hls.clone(),
            public_base_url: config.public_base_url.clone(),
        }
    }
}

/// Drives a single job from `Pending` to a terminal status.
pub struct EncodeOrchestrator {
    registry: Arc<JobRegistry>,
    planner: RenditionPlanner,
    prober: Arc<dyn Prober>,
    encoder: Arc<dyn Encoder>,
    packager: Arc<dyn Packager>,
    settings: OrchestratorSettings,
}

impl EncodeOrchestrator {
    pub fn new(
        registry: Arc<JobRegistry>,
        planner: RenditionPlanner,
        prober: Arc<dyn Prober>,
        encoder: Arc<dyn Encoder>,
        packager: Arc<dyn Packager>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            registry,
            planner,
            prober,
            encoder,
            packager,
            settings,
        }
    }

    /// Process a job. The admission permit is released as soon as the job
    /// reaches a terminal status, before packaging starts.
    pub async fn run(&self, job_id: JobId, permit: AdmissionPermit, cancel: CancellationToken) -> JobStatus {
        let logger = JobLogger::new(&job_id, "hls_ladder");
        let span = logger.create_span();

        let status = self
            .process(&job_id, &logger, &cancel)
            .instrument(span.clone())
            .await;
        drop(permit);
        metrics::record_job_finished(status);

        if status == JobStatus::Done {
            self.package(&job_id).instrument(span).await;
        }

        status
    }

    async fn process(&self, job_id: &JobId, logger: &JobLogger, cancel: &CancellationToken) -> JobStatus {
        if let Err(e) = self.registry.set_status(job_id, JobStatus::Processing).await {
            logger.log_error(&format!("cannot start: {e}"));
            return self.current_status(job_id).await;
        }

        let job = match self.registry.get(job_id).await {
            Ok(job) => job,
            Err(e) => {
                logger.log_error(&e.to_string());
                return JobStatus::Failed;
            }
        };
        logger.log_start(&format!("source {}", job.source_path.display()));

        let source = match self.probe(&job.source_path, cancel).await {
            Ok(source) => source,
            Err(error) => {
                logger.log_error(&format!("probe failed: {}", error.message));
                return self.settle_failed(job_id, error).await;
            }
        };

        let plan = self.planner.plan(source.height, &job.requested_extras);
        logger.log_progress(&format!(
            "source height {}px, planned [{}]",
            source.height,
            plan.iter().map(|s| s.label.as_str()).collect::<Vec<_>>().join(", ")
        ));

        if let Err(e) = self.registry.set_plan(job_id, plan.clone()).await {
            logger.log_error(&e.to_string());
            return self.current_status(job_id).await;
        }

        if let Err(e) = tokio::fs::create_dir_all(&job.output_dir).await {
            let error = JobError::new(
                ErrorKind::EncodeFailure,
                format!("cannot create {}: {e}", job.output_dir.display()),
            );
            logger.log_error(&error.message);
            return self.settle_failed(job_id, error).await;
        }

        self.encode_all(&job, &plan, source, logger, cancel).await;

        self.settle(job_id, logger, cancel).await
    }

    /// Probe the source, racing the job's cancellation.
    async fn probe(&self, source: &Path, cancel: &CancellationToken) -> Result<SourceInfo, JobError> {
        let result = tokio::select! {
            r = self.prober.probe(source) => r,
            _ = cancel.cancelled() => Err(WorkerError::Cancelled),
        };

        result.map_err(|e| match e {
            WorkerError::Cancelled => e.to_job_error(),
            other => JobError::new(ErrorKind::ProbeFailure, other.to_string()),
        })
    }

    async fn encode_all(
        &self,
        job: &Job,
        plan: &[RenditionSpec],
        info: SourceInfo,
        logger: &JobLogger,
        cancel: &CancellationToken,
    ) {
        let handles: Vec<_> = plan
            .iter()
            .map(|spec| {
                let task = RenditionTask {
                    registry: Arc::clone(&self.registry),
                    encoder: Arc::clone(&self.encoder),
                    request: EncodeRequest {
                        job_id: job.id.clone(),
                        source: job.source_path.clone(),
                        output_dir: job.output_dir.clone(),
                        spec: spec.clone(),
                        hls: self.settings.hls.clone(),
                        source_duration_secs: info.duration_secs,
                    },
                    timeout: self.settings.encode_timeout,
                    cancel: cancel.child_token(),
                    logger: logger.for_rendition(&spec.label),
                };
                tokio::spawn(task.run().in_current_span())
            })
            .collect();

        let results = join_all(handles).await;

        // A task that panicked never recorded its outcome
        for (spec, result) in plan.iter().zip(results) {
            if let Err(join_error) = result {
                let error = JobError::new(
                    ErrorKind::EncodeFailure,
                    format!("encode task aborted: {join_error}"),
                );
                logger.for_rendition(&spec.label).log_error(&error.message);
                let outcome = RenditionOutcome::failed(spec.clone(), error);
                if let Err(e) = self.registry.record_outcome(&job.id, outcome).await {
                    logger.log_warning(&e.to_string());
                }
            }
        }
    }

    /// Decide the terminal status from the recorded outcomes.
    async fn settle(&self, job_id: &JobId, logger: &JobLogger, cancel: &CancellationToken) -> JobStatus {
        let job = match self.registry.get(job_id).await {
            Ok(job) => job,
            Err(e) => {
                logger.log_error(&e.to_string());
                return JobStatus::Failed;
            }
        };

        if job.all_succeeded() {
            if let Err(e) = self.registry.set_status(job_id, JobStatus::Done).await {
                logger.log_error(&e.to_string());
                return self.current_status(job_id).await;
            }
            logger.log_completion(&format!("{} renditions ready", job.plan.len()));
            for uri in job.outputs() {
                logger.log_progress(&format!("HLS link: {}", self.link(&uri)));
            }
            return JobStatus::Done;
        }

        let failed: Vec<&str> = job
            .ordered_outcomes()
            .into_iter()
            .filter(|o| !o.is_success())
            .map(|o| o.label())
            .collect();

        let kind = if cancel.is_cancelled() {
            ErrorKind::Cancelled
        } else {
            ErrorKind::EncodeFailure
        };
        let error = JobError::new(
            kind,
            format!(
                "{} of {} renditions failed: {}",
                failed.len(),
                job.plan.len(),
                failed.join(", ")
            ),
        );
        logger.log_error(&error.message);
        self.settle_failed(job_id, error).await
    }

    async fn settle_failed(&self, job_id: &JobId, error: JobError) -> JobStatus {
        if let Err(e) = self.registry.fail(job_id, error).await {
            tracing::error!(job_id = %job_id, "Cannot mark job failed: {}", e);
        }
        self.current_status(job_id).await
    }

    async fn current_status(&self, job_id: &JobId) -> JobStatus {
        self.registry
            .get(job_id)
            .await
            .map(|job| job.status)
            .unwrap_or(JobStatus::Failed)
    }

    /// Zip the job directory into `<output_root>/<job id>.zip`.
    async fn package(&self, job_id: &JobId) {
        let logger = JobLogger::new(job_id, "packaging");
        let job = match self.registry.get(job_id).await {
            Ok(job) => job,
            Err(e) => {
                logger.log_error(&e.to_string());
                return;
            }
        };

        let archive: PathBuf = self
            .registry
            .output_root()
            .join(format!("{}.zip", job_id.as_str()));

        let recorded = match self.packager.package(&job.output_dir, &archive).await {
            Ok(bytes) => {
                metrics::record_archive(bytes);
                logger.log_completion(&format!("archive {} ({} bytes)", archive.display(), bytes));
                logger.log_progress(&format!(
                    "Download link: {}",
                    self.link(&format!("/download/{}.zip", job_id.as_str()))
                ));
                self.registry.set_archive_path(job_id, archive).await
            }
            Err(e) => {
                metrics::record_packaging_failure();
                logger.log_error(&e.to_string());
                self.registry
                    .set_packaging_error(job_id, JobError::new(ErrorKind::PackagingFailure, e.to_string()))
                    .await
            }
        };

        if let Err(e) = recorded {
            logger.log_warning(&e.to_string());
        }
    }

    fn link(&self, path: &str) -> String {
        match &self.settings.public_base_url {
            Some(base) => format!("{}{}", base.trim_end_matches('/'), path),
            None => path.to_string(),
        }
    }
}

/// One rendition's encode, run on its own task.
struct RenditionTask {
    registry: Arc<JobRegistry>,
    encoder: Arc<dyn Encoder>,
    request: EncodeRequest,
    timeout: Duration,
    cancel: CancellationToken,
    logger: JobLogger,
}

impl RenditionTask {
    /// Encode and record exactly one outcome for this rendition.
    async fn run(self) {
        let started = Instant::now();
        let job_id = self.request.job_id.clone();
        let spec = self.request.spec.clone();
        let uri = format!("/hls/{}/{}", job_id.as_str(), spec.playlist_name());

        let encode = tokio::time::timeout(
            self.timeout,
            self.encoder.encode(self.request, self.cancel.clone()),
        );

        // Dropping the encode future kills the encoder process
        let result = tokio::select! {
            r = encode => match r {
                Ok(r) => r,
                Err(_) => Err(WorkerError::encode_failed(format!(
                    "timed out after {}s",
                    self.timeout.as_secs_f64()
                ))),
            },
            _ = self.cancel.cancelled() => Err(WorkerError::Cancelled),
        };

        let elapsed = started.elapsed().as_secs_f64();
        let outcome = match result {
            Ok(_) => {
                self.logger.log_completion(&format!("encoded in {elapsed:.1}s"));
                RenditionOutcome::succeeded(spec.clone(), uri)
            }
            Err(e) => {
                let kind = match e.kind() {
                    ErrorKind::Cancelled => ErrorKind::Cancelled,
                    _ => ErrorKind::EncodeFailure,
                };
                self.logger.log_error(&e.to_string());
                RenditionOutcome::failed(spec.clone(), JobError::new(kind, e.to_string()))
            }
        };
        metrics::record_rendition(&spec.label, outcome.is_success(), elapsed);

        if let Err(e) = self.registry.record_outcome(&job_id, outcome).await {
            self.logger.log_warning(&e.to_string());
        }
    }
}
