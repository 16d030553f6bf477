//! Job executor: the facade the HTTP layer talks to.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use ladder_models::{Job, JobId, RenditionSpec};
use tokio::sync::{oneshot, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::admission::{AdmissionController, AdmissionPermit};
use crate::config::WorkerConfig;
use crate::encoder::{Encoder, FfmpegHlsEncoder};
use crate::error::{WorkerError, WorkerResult};
use crate::metrics;
use crate::orchestrator::{EncodeOrchestrator, OrchestratorSettings};
use crate::packager::{Packager, ZipPackager};
use crate::planner::RenditionPlanner;
use crate::prober::{FfprobeProber, Prober};
use crate::registry::JobRegistry;

/// Poll interval while draining on shutdown.
const DRAIN_POLL: Duration = Duration::from_millis(50);

/// Admits, starts, tracks and cancels jobs.
pub struct JobExecutor {
    config: WorkerConfig,
    registry: Arc<JobRegistry>,
    admission: AdmissionController,
    orchestrator: Arc<EncodeOrchestrator>,
    /// Parent of every job token; cancelled on shutdown
    root_cancel: CancellationToken,
    /// Tokens of jobs whose task is still running
    running: Arc<Mutex<HashMap<JobId, CancellationToken>>>,
}

impl JobExecutor {
    /// Create an executor backed by ffprobe, ffmpeg and zip.
    pub fn new(config: WorkerConfig) -> Self {
        Self::with_components(
            config,
            Arc::new(FfprobeProber),
            Arc::new(FfmpegHlsEncoder),
            Arc::new(ZipPackager),
        )
    }

    /// Create an executor with custom collaborators.
    pub fn with_components(
        config: WorkerConfig,
        prober: Arc<dyn Prober>,
        encoder: Arc<dyn Encoder>,
        packager: Arc<dyn Packager>,
    ) -> Self {
        let registry = Arc::new(JobRegistry::new(config.output_dir.clone()));
        let orchestrator = Arc::new(EncodeOrchestrator::new(
            Arc::clone(&registry),
            RenditionPlanner::new(config.catalog.clone()),
            prober,
            encoder,
            packager,
            OrchestratorSettings::from(&config),
        ));

        info!(
            "Job executor ready: admission {:?}, {} catalog renditions, encode timeout {:?}",
            config.admission,
            config.catalog.len(),
            config.encode_timeout
        );

        Self {
            admission: AdmissionController::new(config.admission),
            config,
            registry,
            orchestrator,
            root_cancel: CancellationToken::new(),
            running: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    pub fn admission(&self) -> &AdmissionController {
        &self.admission
    }

    /// Claim an admission slot for a job that is about to be uploaded.
    ///
    /// Fails with `ServerBusy` when admission is full, or once shutdown has
    /// begun. Dropping the permit gives the slot back.
    pub fn admit(&self) -> WorkerResult<AdmissionPermit> {
        if self.root_cancel.is_cancelled() {
            metrics::record_job_rejected();
            return Err(WorkerError::ServerBusy(self.admission.in_flight()));
        }

        let permit = self.admission.try_admit().inspect_err(|_| {
            metrics::record_job_rejected();
        })?;
        metrics::record_job_admitted();
        Ok(permit)
    }

    /// Register a job for `source_path` and process it in the background.
    ///
    /// The job task is spawned before anything is awaited and registers the
    /// job itself, so dropping this future never strands a `Pending` job.
    pub async fn start(
        &self,
        permit: AdmissionPermit,
        source_path: impl Into<PathBuf>,
        extras: Vec<RenditionSpec>,
    ) -> WorkerResult<JobId> {
        let source_path = source_path.into();
        let cancel = self.root_cancel.child_token();
        let registry = Arc::clone(&self.registry);
        let orchestrator = Arc::clone(&self.orchestrator);
        let running = Arc::clone(&self.running);
        let (registered_tx, registered_rx) = oneshot::channel();

        tokio::spawn(async move {
            let job = registry.create(source_path, extras).await;
            let job_id = job.id;
            running.lock().await.insert(job_id.clone(), cancel.clone());
            info!(job_id = %job_id, "Job accepted");
            // The caller may be gone; the job runs regardless
            let _ = registered_tx.send(job_id.clone());

            orchestrator.run(job_id.clone(), permit, cancel).await;
            running.lock().await.remove(&job_id);
        });

        registered_rx.await.map_err(|_| WorkerError::JobTaskLost)
    }

    /// Snapshot of a job.
    pub async fn status(&self, id: &JobId) -> WorkerResult<Job> {
        self.registry.get(id).await
    }

    /// Request cancellation of a running job; returns the current snapshot.
    ///
    /// Finished jobs are returned unchanged.
    pub async fn cancel(&self, id: &JobId) -> WorkerResult<Job> {
        let job = self.registry.get(id).await?;
        if job.status.is_terminal() {
            return Ok(job);
        }

        if let Some(token) = self.running.lock().await.get(id) {
            info!(job_id = %id, "Cancelling job");
            token.cancel();
        }
        Ok(job)
    }

    /// Jobs whose background task has not finished yet.
    pub async fn running_jobs(&self) -> usize {
        self.running.lock().await.len()
    }

    /// Cancel every running job and wait, up to the shutdown timeout, for
    /// their tasks to finish.
    pub async fn shutdown(&self) {
        info!("Shutting down job executor");
        self.root_cancel.cancel();

        let drained = tokio::time::timeout(self.config.shutdown_timeout, async {
            while self.running_jobs().await > 0 {
                tokio::time::sleep(DRAIN_POLL).await;
            }
        })
        .await;

        match drained {
            Ok(()) => info!("Job executor stopped"),
            Err(_) => warn!(
                "Shutdown timeout reached with {} jobs still running",
                self.running_jobs().await
            ),
        }
    }

    /// Wait until a job reaches a terminal status or `timeout` elapses.
    pub async fn wait_for_terminal(&self, id: &JobId, timeout: Duration) -> WorkerResult<Job> {
        let waited = tokio::time::timeout(timeout, async {
            loop {
                let job = self.registry.get(id).await?;
                if job.status.is_terminal() {
                    return Ok::<Job, WorkerError>(job);
                }
                tokio::time::sleep(DRAIN_POLL).await;
            }
        })
        .await;

        match waited {
            Ok(result) => result,
            Err(_) => self.registry.get(id).await,
        }
    }
}

impl Drop for JobExecutor {
    fn drop(&mut self) {
        self.root_cancel.cancel();
    }
}

impl std::fmt::Debug for JobExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobExecutor")
            .field("config", &self.config)
            .field("in_flight", &self.admission.in_flight())
            .finish()
    }
}
