//! Worker configuration.

use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use ladder_media::HlsSettings;
use ladder_models::RenditionCatalog;
use tracing::warn;

/// How many jobs may be processing at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AdmissionPolicy {
    /// Accept every upload
    #[default]
    Unbounded,
    /// Reject uploads once this many jobs are in flight
    Bounded(NonZeroUsize),
}

impl FromStr for AdmissionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "unlimited" | "unbounded" => Ok(Self::Unbounded),
            n => n
                .parse::<NonZeroUsize>()
                .map(Self::Bounded)
                .map_err(|_| format!("expected 'unlimited' or a positive integer, got '{s}'")),
        }
    }
}

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Root of per-job output directories and archives
    pub output_dir: PathBuf,
    /// Where uploads are stored before encoding
    pub upload_dir: PathBuf,
    /// Job admission limit
    pub admission: AdmissionPolicy,
    /// Deadline for a single rendition encode
    pub encode_timeout: Duration,
    /// Segmenting parameters applied to every rendition
    pub hls: HlsSettings,
    /// Candidate renditions, lowest first
    pub catalog: RenditionCatalog,
    /// Graceful shutdown timeout
    pub shutdown_timeout: Duration,
    /// Prefix for absolute links in logs
    pub public_base_url: Option<String>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("/tmp/output"),
            upload_dir: PathBuf::from("/tmp/uploads"),
            admission: AdmissionPolicy::Unbounded,
            encode_timeout: Duration::from_secs(3600), // 1 hour
            hls: HlsSettings::default(),
            catalog: RenditionCatalog::standard(),
            shutdown_timeout: Duration::from_secs(30),
            public_base_url: None,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    ///
    /// Malformed values are logged and replaced by their defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let admission = match std::env::var("LADDER_MAX_CONCURRENT_JOBS") {
            Ok(raw) => raw.parse().unwrap_or_else(|e| {
                warn!("Ignoring LADDER_MAX_CONCURRENT_JOBS: {}", e);
                defaults.admission
            }),
            Err(_) => defaults.admission,
        };

        let catalog = match std::env::var("LADDER_RENDITION_CATALOG") {
            Ok(raw) => RenditionCatalog::parse(&raw).unwrap_or_else(|e| {
                warn!("Ignoring LADDER_RENDITION_CATALOG: {}", e);
                defaults.catalog.clone()
            }),
            Err(_) => defaults.catalog.clone(),
        };

        Self {
            output_dir: std::env::var("LADDER_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            upload_dir: std::env::var("LADDER_UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),
            admission,
            encode_timeout: Duration::from_secs(env_parse("LADDER_ENCODE_TIMEOUT_SECS", 3600)),
            hls: HlsSettings {
                segment_seconds: env_parse("LADDER_SEGMENT_SECONDS", defaults.hls.segment_seconds),
                playlist_size: env_parse("LADDER_PLAYLIST_SIZE", defaults.hls.playlist_size),
                ..defaults.hls
            },
            catalog,
            shutdown_timeout: Duration::from_secs(env_parse("LADDER_SHUTDOWN_TIMEOUT_SECS", 30)),
            public_base_url: std::env::var("PUBLIC_BASE_URL")
                .ok()
                .filter(|s| !s.trim().is_empty()),
        }
    }
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}
