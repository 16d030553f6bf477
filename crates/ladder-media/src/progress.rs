//! FFmpeg progress parsing.

use serde::{Deserialize, Serialize};

/// Progress information from FFmpeg's `-progress` stream.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FfmpegProgress {
    /// Current frame number
    pub frame: u64,
    /// Current FPS
    pub fps: f64,
    /// Output time in milliseconds
    pub out_time_ms: i64,
    /// Output time as string (HH:MM:SS.microseconds)
    pub out_time: String,
    /// Encoding speed (e.g., 1.5 = 1.5x realtime)
    pub speed: f64,
    /// Whether encoding is complete
    pub is_complete: bool,
}

impl FfmpegProgress {
    /// Progress percentage given the source duration in seconds.
    ///
    /// Returns `None` when the duration is unknown (ffprobe reported nothing).
    pub fn percentage(&self, source_duration_secs: f64) -> Option<f64> {
        if self.is_complete {
            return Some(100.0);
        }
        if source_duration_secs <= 0.0 {
            return None;
        }
        let done_secs = self.out_time_ms as f64 / 1000.0;
        Some((done_secs / source_duration_secs * 100.0).clamp(0.0, 100.0))
    }
}
