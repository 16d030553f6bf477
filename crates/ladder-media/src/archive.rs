//! Zip packaging of a job's output directory.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{MediaError, MediaResult};

/// Deflate level used for archives.
const COMPRESSION_LEVEL: i64 = 9;

/// Zip every file under `src_dir` into `dest`, with paths relative to `src_dir`.
///
/// The archive is written next to `dest` under a temporary name and renamed
/// into place, so a reader never observes a half-written zip.
/// Returns the size of the finished archive in bytes.
pub async fn zip_directory(src_dir: impl AsRef<Path>, dest: impl AsRef<Path>) -> MediaResult<u64> {
    let src_dir = src_dir.as_ref().to_path_buf();
    let dest = dest.as_ref().to_path_buf();

    if !src_dir.is_dir() {
        return Err(MediaError::FileNotFound(src_dir));
    }

    tokio::task::spawn_blocking(move || write_archive(&src_dir, &dest))
        .await
        .map_err(|e| MediaError::internal(format!("archive task failed: {e}")))?
}

fn write_archive(src_dir: &Path, dest: &Path) -> MediaResult<u64> {
    let tmp = partial_path(dest);
    let result = write_entries(src_dir, &tmp);

    match result {
        Ok(()) => {
            std::fs::rename(&tmp, dest)?;
            let bytes = std::fs::metadata(dest)?.len();
            debug!("Archived {} into {} ({} bytes)", src_dir.display(), dest.display(), bytes);
            Ok(bytes)
        }
        Err(e) => {
            let _ = std::fs::remove_file(&tmp);
            Err(e)
        }
    }
}

fn write_entries(src_dir: &Path, tmp: &Path) -> MediaResult<()> {
    let file = File::create(tmp)?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(COMPRESSION_LEVEL));

    for entry in WalkDir::new(src_dir).sort_by_file_name() {
        let entry = entry.map_err(|e| MediaError::archive(e.to_string()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(src_dir)
            .map_err(|e| MediaError::archive(e.to_string()))?;
        // Zip entries always use forward slashes
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        zip.start_file(name, options)?;
        let mut input = File::open(entry.path())?;
        io::copy(&mut input, &mut zip)?;
    }

    zip.finish()?;
    Ok(())
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".partial");
    dest.with_file_name(name)
}
