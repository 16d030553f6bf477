//! Archive download.

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, HeaderValue};
use axum::response::{IntoResponse, Response};
use tokio_util::io::ReaderStream;

use ladder_models::JobId;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Stream `<job id>.zip` once packaging has finished.
pub async fn download_archive(
    State(state): State<AppState>,
    Path(archive): Path<String>,
) -> ApiResult<Response> {
    let job_id = archive
        .strip_suffix(".zip")
        .filter(|id| JobId::is_well_formed(id))
        .map(JobId::from_string)
        .ok_or_else(|| ApiError::not_found(format!("Archive {archive} does not exist")))?;

    let job = state.executor.status(&job_id).await?;
    let path = job
        .archive_path
        .ok_or_else(|| ApiError::not_found(format!("Archive for job {job_id} is not ready")))?;

    let file = tokio::fs::File::open(&path)
        .await
        .map_err(|_| ApiError::not_found(format!("Archive for job {job_id} is missing")))?;
    let length = file.metadata().await?.len();

    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{job_id}.zip\""))
        .map_err(|e| ApiError::internal(e.to_string()))?;

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/zip")),
            (header::CONTENT_DISPOSITION, disposition),
            (header::CONTENT_LENGTH, HeaderValue::from(length)),
        ],
        Body::from_stream(ReaderStream::new(file)),
    )
        .into_response())
}
