//! Fake collaborators for orchestrator and executor tests.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use ladder_media::MediaError;
use tokio_util::sync::CancellationToken;

use crate::encoder::{EncodeRequest, EncodedRendition, Encoder};
use crate::error::{WorkerError, WorkerResult};
use crate::packager::Packager;
use crate::prober::{Prober, SourceInfo};

pub struct FakeProber {
    result: Result<SourceInfo, String>,
    delay: Duration,
}

impl FakeProber {
    pub fn height(height: u32) -> Self {
        Self {
            result: Ok(SourceInfo {
                height,
                duration_secs: 30.0,
            }),
            delay: Duration::ZERO,
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            result: Err(message.to_string()),
            delay: Duration::ZERO,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl Prober for FakeProber {
    async fn probe(&self, _source: &Path) -> WorkerResult<SourceInfo> {
        tokio::time::sleep(self.delay).await;
        self.result.clone().map_err(WorkerError::probe_failed)
    }
}

/// Writes a stub playlist per rendition, with per-label failure modes.
#[derive(Default)]
pub struct FakeEncoder {
    failing: HashSet<String>,
    panicking: HashSet<String>,
    hanging: HashSet<String>,
    delays: HashMap<String, Duration>,
    calls: Mutex<Vec<String>>,
}

impl FakeEncoder {
    pub fn fail(mut self, label: &str) -> Self {
        self.failing.insert(label.to_string());
        self
    }

    pub fn panic_on(mut self, label: &str) -> Self {
        self.panicking.insert(label.to_string());
        self
    }

    /// Never finishes on its own; only cancellation or a deadline ends it.
    pub fn hang(mut self, label: &str) -> Self {
        self.hanging.insert(label.to_string());
        self
    }

    pub fn delay(mut self, label: &str, delay: Duration) -> Self {
        self.delays.insert(label.to_string(), delay);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Encoder for FakeEncoder {
    async fn encode(
        &self,
        request: EncodeRequest,
        cancel: CancellationToken,
    ) -> WorkerResult<EncodedRendition> {
        let label = request.spec.label.clone();
        self.calls.lock().unwrap().push(label.clone());

        if self.hanging.contains(&label) {
            cancel.cancelled().await;
            return Err(WorkerError::Cancelled);
        }

        if let Some(delay) = self.delays.get(&label) {
            tokio::select! {
                _ = tokio::time::sleep(*delay) => {}
                _ = cancel.cancelled() => return Err(WorkerError::Cancelled),
            }
        }

        if self.panicking.contains(&label) {
            panic!("encoder crashed on {label}");
        }

        if self.failing.contains(&label) {
            return Err(WorkerError::Media(MediaError::ffmpeg_failed(
                "FFmpeg exited with non-zero status",
                Some("Invalid data found when processing input".to_string()),
                Some(1),
            )));
        }

        let playlist = request.output_dir.join(request.spec.playlist_name());
        tokio::fs::write(&playlist, "#EXTM3U\n#EXT-X-ENDLIST\n").await?;
        Ok(EncodedRendition { playlist })
    }
}

#[derive(Default)]
pub struct FakePackager {
    fail: bool,
    calls: AtomicUsize,
}

impl FakePackager {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Packager for FakePackager {
    async fn package(&self, _dir: &Path, archive: &Path) -> WorkerResult<u64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(WorkerError::packaging_failed("disk full"));
        }
        tokio::fs::write(archive, b"PK\x05\x06").await?;
        Ok(4)
    }
}
