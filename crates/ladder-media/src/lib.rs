//! FFmpeg CLI wrapper for HLS rendition encoding.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building
//! - Progress parsing from `-progress pipe:2`
//! - Cancellation and deadlines via tokio
//! - Source probing with ffprobe
//! - HLS rendition commands and zip packaging of job output

pub mod archive;
pub mod command;
pub mod error;
pub mod hls;
pub mod probe;
pub mod progress;

pub use archive::zip_directory;
pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use hls::{hls_rendition_command, playlist_path, HlsSettings};
pub use probe::{parse_probe_output, probe_video, VideoInfo};
pub use progress::FfmpegProgress;
