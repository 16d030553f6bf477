//! HTTP-level tests against the router with fake media tools.

use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use ladder_api::{create_router, ApiConfig, AppState};
use ladder_models::{JobId, JobStatus};
use ladder_worker::{
    AdmissionPolicy, EncodeRequest, EncodedRendition, Encoder, JobExecutor, Packager, Prober,
    SourceInfo, WorkerConfig, WorkerError, WorkerResult,
};

const BOUNDARY: &str = "ladder-test-boundary";

struct FixedProber;

#[async_trait]
impl Prober for FixedProber {
    async fn probe(&self, _source: &Path) -> WorkerResult<SourceInfo> {
        Ok(SourceInfo {
            height: 720,
            duration_secs: 12.0,
        })
    }
}

/// Writes a one-line playlist, or waits for cancellation when `hang` is set.
struct PlaylistEncoder {
    hang: bool,
}

#[async_trait]
impl Encoder for PlaylistEncoder {
    async fn encode(
        &self,
        request: EncodeRequest,
        cancel: CancellationToken,
    ) -> WorkerResult<EncodedRendition> {
        if self.hang {
            cancel.cancelled().await;
            return Err(WorkerError::Cancelled);
        }

        let playlist = request.output_dir.join(request.spec.playlist_name());
        tokio::fs::write(&playlist, "#EXTM3U\n").await?;
        Ok(EncodedRendition { playlist })
    }
}

struct StubPackager;

#[async_trait]
impl Packager for StubPackager {
    async fn package(&self, _dir: &Path, archive: &Path) -> WorkerResult<u64> {
        tokio::fs::write(archive, b"PK\x05\x06zip").await?;
        Ok(7)
    }
}

struct TestApp {
    router: Router,
    state: AppState,
    _tmp: TempDir,
}

async fn test_app(admission: AdmissionPolicy, hang: bool) -> TestApp {
    let tmp = TempDir::new().unwrap();
    let worker = WorkerConfig {
        output_dir: tmp.path().join("output"),
        upload_dir: tmp.path().join("uploads"),
        admission,
        encode_timeout: Duration::from_secs(10),
        ..WorkerConfig::default()
    };

    let executor = JobExecutor::with_components(
        worker,
        Arc::new(FixedProber),
        Arc::new(PlaylistEncoder { hang }),
        Arc::new(StubPackager),
    );
    let state = AppState::with_executor(ApiConfig::default(), executor)
        .await
        .unwrap();

    TestApp {
        router: create_router(state.clone(), None),
        state,
        _tmp: tmp,
    }
}

fn multipart_request(video: Option<&[u8]>, qualities: Option<&str>) -> Request<Body> {
    let mut body = Vec::new();
    if let Some(bytes) = video {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"video\"; filename=\"clip.mp4\"\r\nContent-Type: video/mp4\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    if let Some(json) = qualities {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"additionalQualities\"\r\n\r\n{json}\r\n"
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/convert")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: &TestApp, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

async fn send_json(app: &TestApp, request: Request<Body>) -> (StatusCode, Value) {
    let (status, body) = send(app, request).await;
    (status, serde_json::from_slice(&body).unwrap())
}

async fn uploads(app: &TestApp) -> usize {
    std::fs::read_dir(&app.state.executor.config().upload_dir)
        .unwrap()
        .count()
}

#[tokio::test]
async fn test_health() {
    let app = test_app(AdmissionPolicy::Unbounded, false).await;

    let (status, body) = send_json(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_unknown_job_is_not_found() {
    let app = test_app(AdmissionPolicy::Unbounded, false).await;

    let (status, body) = send_json(&app, get(&format!("/status/{}", JobId::new()))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "JobNotFound");

    let (status, _) = send_json(&app, get("/status/not-a-job")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, get(&format!("/download/{}.zip", JobId::new()))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_convert_without_video() {
    let app = test_app(AdmissionPolicy::Unbounded, false).await;

    let (status, body) = send_json(&app, multipart_request(None, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "UploadMissing");

    let (status, body) = send_json(&app, multipart_request(Some(b""), None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "UploadMissing");
    assert_eq!(uploads(&app).await, 0);
}

#[tokio::test]
async fn test_convert_with_invalid_qualities() {
    let app = test_app(AdmissionPolicy::Unbounded, false).await;

    let request = multipart_request(
        Some(b"video-bytes"),
        Some(r#"[{"resolution":"huge","bitrate":"1000k","label":"x"}]"#),
    );
    let (status, body) = send_json(&app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "InvalidRequest");
    assert_eq!(uploads(&app).await, 0);
    assert!(app.state.executor.registry().is_empty().await);
}

#[tokio::test]
async fn test_convert_to_download() {
    let app = test_app(AdmissionPolicy::Unbounded, false).await;

    let request = multipart_request(
        Some(b"video-bytes"),
        Some(r#"[{"resolution":"426x240","bitrate":"400k","label":"240p"}]"#),
    );
    let (status, body) = send_json(&app, request).await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let job_id = JobId::from_string(body["jobId"].as_str().unwrap());
    let job = app
        .state
        .executor
        .wait_for_terminal(&job_id, Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(job.status, JobStatus::Done);

    // Archive is written after Done; poll for it
    let mut body = Value::Null;
    for _ in 0..50 {
        let (status, polled) = send_json(&app, get(&format!("/status/{job_id}"))).await;
        assert_eq!(status, StatusCode::OK);
        body = polled;
        if body["archive"].is_string() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    assert_eq!(body["status"], "Done");
    let outputs = body["outputs"].as_array().unwrap();
    assert!(!outputs.is_empty());
    assert!(outputs
        .iter()
        .any(|o| o == &Value::from(format!("/hls/{job_id}/stream-240p.m3u8"))));
    assert!(body["renditions"]
        .as_array()
        .unwrap()
        .iter()
        .all(|r| r["status"] == "Succeeded"));

    let archive = body["archive"].as_str().unwrap().to_string();
    assert_eq!(archive, format!("/download/{job_id}.zip"));

    let (status, playlist) = send(&app, get(&format!("/hls/{job_id}/stream-240p.m3u8"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(playlist, b"#EXTM3U\n");

    let response = app.router.clone().oneshot(get(&archive)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/zip"
    );
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"PK\x05\x06zip");
}

#[tokio::test]
async fn test_busy_server_rejects_and_cleans_up() {
    let one = NonZeroUsize::new(1).unwrap();
    let app = test_app(AdmissionPolicy::Bounded(one), true).await;

    let (status, body) = send_json(&app, multipart_request(Some(b"first"), None)).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let first = body["jobId"].as_str().unwrap().to_string();

    // Rejected before the body is streamed: no second file on disk
    let (status, body) = send_json(&app, multipart_request(Some(b"second"), None)).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["code"], "ServerBusy");
    assert_eq!(uploads(&app).await, 1);
    assert_eq!(app.state.executor.admission().in_flight(), 1);
    assert_eq!(app.state.executor.registry().len().await, 1);

    let cancel = Request::builder()
        .method("POST")
        .uri(format!("/cancel/{first}"))
        .body(Body::empty())
        .unwrap();
    let (status, _) = send_json(&app, cancel).await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let job = app
        .state
        .executor
        .wait_for_terminal(&JobId::from_string(first), Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(job.status, JobStatus::Failed);

    // The permit is dropped just after the terminal status is written
    for _ in 0..50 {
        if app.state.executor.admission().in_flight() == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let (status, _) = send_json(&app, multipart_request(Some(b"third"), None)).await;
    assert_eq!(status, StatusCode::ACCEPTED);
}

#[tokio::test]
async fn test_rejected_upload_writes_nothing() {
    let one = NonZeroUsize::new(1).unwrap();
    let app = test_app(AdmissionPolicy::Bounded(one), true).await;

    // Hold the only slot directly
    let permit = app.state.executor.admit().unwrap();

    let big = vec![7u8; 256 * 1024];
    let (status, body) = send_json(&app, multipart_request(Some(&big), None)).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["code"], "ServerBusy");
    assert_eq!(uploads(&app).await, 0);

    drop(permit);
    assert_eq!(app.state.executor.admission().in_flight(), 0);

    let (status, _) = send_json(&app, multipart_request(Some(b"after"), None)).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(uploads(&app).await, 1);
}

#[tokio::test]
async fn test_concurrent_uploads_with_same_name_keep_their_bytes() {
    let app = test_app(AdmissionPolicy::Unbounded, false).await;

    for round in 0..10 {
        let first = format!("first-{round}").into_bytes();
        let second = format!("second-{round}-longer").into_bytes();

        let (a, b) = tokio::join!(
            send_json(&app, multipart_request(Some(&first), None)),
            send_json(&app, multipart_request(Some(&second), None)),
        );
        assert_eq!(a.0, StatusCode::ACCEPTED);
        assert_eq!(b.0, StatusCode::ACCEPTED);

        let a = JobId::from_string(a.1["jobId"].as_str().unwrap());
        let b = JobId::from_string(b.1["jobId"].as_str().unwrap());
        let a = app.state.executor.status(&a).await.unwrap();
        let b = app.state.executor.status(&b).await.unwrap();

        assert_ne!(a.source_path, b.source_path);
        assert_eq!(std::fs::read(&a.source_path).unwrap(), first);
        assert_eq!(std::fs::read(&b.source_path).unwrap(), second);
    }

    assert_eq!(uploads(&app).await, 20);
}
