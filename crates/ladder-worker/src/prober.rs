//! Source probing seam.

use std::path::Path;

use async_trait::async_trait;
use ladder_media::probe_video;

use crate::error::{WorkerError, WorkerResult};

/// What planning needs from a source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceInfo {
    /// Height of the first video stream; always positive
    pub height: u32,
    /// Duration in seconds, 0 when unknown
    pub duration_secs: f64,
}

#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, source: &Path) -> WorkerResult<SourceInfo>;
}

/// ffprobe-backed prober.
#[derive(Debug, Default, Clone, Copy)]
pub struct FfprobeProber;

#[async_trait]
impl Prober for FfprobeProber {
    async fn probe(&self, source: &Path) -> WorkerResult<SourceInfo> {
        let info = probe_video(source)
            .await
            .map_err(|e| WorkerError::probe_failed(e.to_string()))?;

        if info.height == 0 {
            return Err(WorkerError::probe_failed("source reports a height of 0"));
        }

        Ok(SourceInfo {
            height: info.height,
            duration_secs: info.duration,
        })
    }
}
