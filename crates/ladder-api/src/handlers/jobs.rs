//! Job handlers: upload, status polling and cancellation.

use std::path::{Path as FsPath, PathBuf};

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};
use uuid::Uuid;

use ladder_models::{Job, JobError, JobId, JobStatus, RenditionRequest, RenditionSpec};

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

/// Multipart field carrying the source video.
const VIDEO_FIELD: &str = "video";
/// Multipart field carrying a JSON array of extra renditions.
const QUALITIES_FIELD: &str = "additionalQualities";

// ============================================================================
// Types
// ============================================================================

/// Response to an accepted upload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertResponse {
    pub job_id: String,
    pub message: String,
}

/// One planned rendition as seen by a poller.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenditionView {
    pub label: String,
    pub resolution: String,
    pub bitrate: String,
    /// `Pending` until the encode finishes, then `Succeeded` or `Failed`
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JobError>,
}

/// Job status response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatusResponse {
    pub job_id: String,
    pub status: JobStatus,
    /// Playlist URIs of succeeded renditions, in plan order
    pub outputs: Vec<String>,
    pub renditions: Vec<RenditionView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JobError>,
    /// Download URI, once the archive exists
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archive: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub packaging_error: Option<JobError>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Job> for JobStatusResponse {
    fn from(job: Job) -> Self {
        let renditions = job
            .plan
            .iter()
            .map(|spec| {
                let outcome = job.outcomes.get(&spec.label);
                RenditionView {
                    label: spec.label.clone(),
                    resolution: spec.resolution.to_string(),
                    bitrate: spec.bitrate.clone(),
                    status: outcome
                        .map(|o| format!("{:?}", o.status))
                        .unwrap_or_else(|| "Pending".to_string()),
                    uri: outcome.and_then(|o| o.artifact_uri.clone()),
                    error: outcome.and_then(|o| o.error.clone()),
                }
            })
            .collect();

        Self {
            job_id: job.id.to_string(),
            status: job.status,
            outputs: job.outputs(),
            renditions,
            error: job.terminal_error.clone(),
            archive: job
                .archive_path
                .as_ref()
                .map(|_| format!("/download/{}.zip", job.id)),
            packaging_error: job.packaging_error.clone(),
            created_at: job.created_at,
            updated_at: job.updated_at,
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Accept an upload and start converting it.
///
/// The uploaded file is removed again if the request is rejected.
pub async fn convert(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<ConvertResponse>)> {
    let upload_dir = state.executor.config().upload_dir.clone();

    let mut upload = Upload::default();
    let accepted = accept(&state, &upload_dir, multipart, &mut upload).await;

    match accepted {
        Ok(job_id) => {
            if let Some(base) = &state.config.public_base_url {
                info!(job_id = %job_id, "Status link: {}/status/{}", base.trim_end_matches('/'), job_id);
            }
            Ok((
                StatusCode::ACCEPTED,
                Json(ConvertResponse {
                    job_id: job_id.to_string(),
                    message: "Video received, processing started".to_string(),
                }),
            ))
        }
        Err(e) => {
            upload.discard().await;
            Err(e)
        }
    }
}

/// Poll a job.
pub async fn job_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<JobStatusResponse>> {
    let job = state.executor.status(&parse_job_id(&job_id)?).await?;
    Ok(Json(job.into()))
}

/// Cancel a job that is still running.
pub async fn cancel_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<(StatusCode, Json<JobStatusResponse>)> {
    let job = state.executor.cancel(&parse_job_id(&job_id)?).await?;
    Ok((StatusCode::ACCEPTED, Json(job.into())))
}

// ============================================================================
// Helpers
// ============================================================================

/// Files written while reading a request.
#[derive(Default)]
struct Upload {
    video: Option<PathBuf>,
}

impl Upload {
    async fn discard(&mut self) {
        if let Some(path) = self.video.take() {
            if let Err(e) = tokio::fs::remove_file(&path).await {
                warn!("Failed to remove rejected upload {}: {}", path.display(), e);
            }
        }
    }
}

async fn accept(
    state: &AppState,
    upload_dir: &FsPath,
    mut multipart: Multipart,
    upload: &mut Upload,
) -> ApiResult<JobId> {
    // Claim a slot before any bytes reach the disk
    let permit = state.executor.admit()?;
    let mut qualities: Option<String> = None;
    let mut bytes = 0u64;

    while let Some(mut field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some(VIDEO_FIELD) if upload.video.is_none() => {
                let original = field.file_name().unwrap_or("upload").to_string();
                let path = upload_dir.join(upload_file_name(&original));

                let mut file = OpenOptions::new()
                    .write(true)
                    .create_new(true)
                    .open(&path)
                    .await?;
                upload.video = Some(path);
                while let Some(chunk) = field.chunk().await? {
                    file.write_all(&chunk).await?;
                    bytes += chunk.len() as u64;
                }
                file.flush().await?;
            }
            Some(QUALITIES_FIELD) => qualities = Some(field.text().await?),
            _ => {}
        }
    }

    let source = match &upload.video {
        Some(path) if bytes > 0 => path.clone(),
        _ => return Err(ApiError::UploadMissing),
    };

    let extras = parse_extra_qualities(qualities.as_deref())?;
    let job_id = state.executor.start(permit, source, extras).await?;
    metrics::record_upload(bytes);

    Ok(job_id)
}

/// Parse the `additionalQualities` field; absent or blank means none.
pub fn parse_extra_qualities(raw: Option<&str>) -> ApiResult<Vec<RenditionSpec>> {
    let raw = match raw.map(str::trim) {
        Some(raw) if !raw.is_empty() => raw,
        _ => return Ok(Vec::new()),
    };

    let requests: Vec<RenditionRequest> = serde_json::from_str(raw)
        .map_err(|e| ApiError::bad_request(format!("additionalQualities: {e}")))?;

    requests
        .into_iter()
        .map(|r| {
            r.into_spec()
                .map_err(|e| ApiError::bad_request(format!("additionalQualities: {e}")))
        })
        .collect()
}

/// `<millis>-<uuid>-<name>`: unique per upload, still recognizable on disk.
fn upload_file_name(original: &str) -> String {
    format!(
        "{}-{}-{}",
        Utc::now().timestamp_millis(),
        Uuid::new_v4().simple(),
        sanitize_file_name(original)
    )
}

/// Keep the client's file name readable but safe to join onto a directory.
fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Ids are generated UUIDs; anything else cannot name a job.
fn parse_job_id(raw: &str) -> ApiResult<JobId> {
    if JobId::is_well_formed(raw) {
        Ok(JobId::from_string(raw))
    } else {
        Err(ApiError::not_found(format!("Job {raw} does not exist")))
    }
}
