//! Rendition encoding seam.

use std::path::PathBuf;

use async_trait::async_trait;
use ladder_media::{hls_rendition_command, FfmpegRunner, HlsSettings};
use ladder_models::{JobId, RenditionSpec};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::WorkerResult;

/// Everything one encode task needs.
#[derive(Debug, Clone)]
pub struct EncodeRequest {
    pub job_id: JobId,
    pub source: PathBuf,
    pub output_dir: PathBuf,
    pub spec: RenditionSpec,
    pub hls: HlsSettings,
    /// Source duration for progress reporting, 0 when unknown
    pub source_duration_secs: f64,
}

/// A finished rendition on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedRendition {
    pub playlist: PathBuf,
}

#[async_trait]
pub trait Encoder: Send + Sync {
    /// Encode one rendition. Implementations stop early when `cancel` fires,
    /// and must not leave a process behind if the future is dropped.
    async fn encode(
        &self,
        request: EncodeRequest,
        cancel: CancellationToken,
    ) -> WorkerResult<EncodedRendition>;
}

/// Encodes HLS renditions with the ffmpeg CLI.
#[derive(Debug, Default, Clone, Copy)]
pub struct FfmpegHlsEncoder;

#[async_trait]
impl Encoder for FfmpegHlsEncoder {
    async fn encode(
        &self,
        request: EncodeRequest,
        cancel: CancellationToken,
    ) -> WorkerResult<EncodedRendition> {
        let cmd = hls_rendition_command(
            &request.source,
            &request.output_dir,
            &request.spec,
            &request.hls,
        );
        let playlist = cmd.output().to_path_buf();

        let job_id = request.job_id.clone();
        let label = request.spec.label.clone();
        let duration = request.source_duration_secs;

        FfmpegRunner::new()
            .with_cancel(cancel)
            .run_with_progress(&cmd, move |progress| {
                if let Some(pct) = progress.percentage(duration) {
                    debug!(job_id = %job_id, label = %label, "Encode progress {:.0}%", pct);
                }
            })
            .await?;

        Ok(EncodedRendition { playlist })
    }
}
