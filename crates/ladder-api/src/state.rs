//! Application state.

use std::sync::Arc;

use ladder_worker::{JobExecutor, WorkerConfig};
use tracing::info;

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub executor: Arc<JobExecutor>,
}

impl AppState {
    /// Create the state with an ffmpeg-backed executor, creating the upload
    /// and output directories if needed.
    pub async fn new(config: ApiConfig, mut worker: WorkerConfig) -> anyhow::Result<Self> {
        if worker.public_base_url.is_none() {
            worker.public_base_url = config.public_base_url.clone();
        }
        Self::with_executor(config, JobExecutor::new(worker)).await
    }

    /// Create the state around an existing executor.
    pub async fn with_executor(config: ApiConfig, executor: JobExecutor) -> anyhow::Result<Self> {
        let worker = executor.config();
        tokio::fs::create_dir_all(&worker.upload_dir).await?;
        tokio::fs::create_dir_all(&worker.output_dir).await?;
        info!(
            "Uploads in {}, output in {}",
            worker.upload_dir.display(),
            worker.output_dir.display()
        );

        Ok(Self {
            config,
            executor: Arc::new(executor),
        })
    }
}
