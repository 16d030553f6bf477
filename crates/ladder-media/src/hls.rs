//! HLS encode command construction.

use std::path::{Path, PathBuf};

use ladder_models::RenditionSpec;
use serde::{Deserialize, Serialize};

use crate::command::FfmpegCommand;

/// Segmenting parameters shared by every rendition of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HlsSettings {
    /// Target segment length (`-hls_time`)
    pub segment_seconds: u32,
    /// Playlist length, 0 keeps every segment (`-hls_list_size`)
    pub playlist_size: u32,
    /// First segment number (`-start_number`)
    pub start_number: u32,
    /// H.264 encoder
    pub video_codec: String,
}

impl Default for HlsSettings {
    fn default() -> Self {
        Self {
            segment_seconds: 10,
            playlist_size: 0,
            start_number: 0,
            video_codec: "libx264".to_string(),
        }
    }
}

/// Playlist path for a rendition inside a job's output directory.
pub fn playlist_path(output_dir: &Path, spec: &RenditionSpec) -> PathBuf {
    output_dir.join(spec.playlist_name())
}

/// Build the ffmpeg invocation that turns `source` into one HLS rendition.
///
/// Output: `<output_dir>/stream-<label>.m3u8` plus `stream-<label>_NNN.ts` segments.
/// Baseline profile at level 3.0 keeps the streams playable on old devices.
pub fn hls_rendition_command(
    source: &Path,
    output_dir: &Path,
    spec: &RenditionSpec,
    settings: &HlsSettings,
) -> FfmpegCommand {
    let segment_path = output_dir.join(spec.segment_pattern());

    FfmpegCommand::new(source, playlist_path(output_dir, spec))
        .video_filter(spec.resolution.scale_filter())
        .video_codec(settings.video_codec.as_str())
        .video_bitrate(spec.bitrate.as_str())
        .output_args(["-profile:v", "baseline", "-level", "3.0"])
        .output_arg("-start_number")
        .output_arg(settings.start_number.to_string())
        .output_arg("-hls_time")
        .output_arg(settings.segment_seconds.to_string())
        .output_arg("-hls_list_size")
        .output_arg(settings.playlist_size.to_string())
        .output_arg("-hls_segment_filename")
        .output_arg(segment_path.to_string_lossy())
        .format("hls")
}
