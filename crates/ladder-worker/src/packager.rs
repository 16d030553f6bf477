//! Archive packaging seam.

use std::path::Path;

use async_trait::async_trait;
use ladder_media::zip_directory;

use crate::error::{WorkerError, WorkerResult};

#[async_trait]
pub trait Packager: Send + Sync {
    /// Package `dir` into `archive`; returns the archive size in bytes.
    async fn package(&self, dir: &Path, archive: &Path) -> WorkerResult<u64>;
}

/// Deflate zip of the whole job directory.
#[derive(Debug, Default, Clone, Copy)]
pub struct ZipPackager;

#[async_trait]
impl Packager for ZipPackager {
    async fn package(&self, dir: &Path, archive: &Path) -> WorkerResult<u64> {
        zip_directory(dir, archive)
            .await
            .map_err(|e| WorkerError::packaging_failed(e.to_string()))
    }
}
