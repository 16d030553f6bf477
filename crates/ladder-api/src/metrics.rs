//! Prometheus metrics for the API server.

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use ladder_models::JobId;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::time::Instant;

/// Install the Prometheus recorder. Job and encode metrics recorded by the
/// worker land in the same registry.
pub fn init_metrics() -> anyhow::Result<PrometheusHandle> {
    Ok(PrometheusBuilder::new().install_recorder()?)
}

/// Metric names as constants for consistency.
pub mod names {
    pub const HTTP_REQUESTS_TOTAL: &str = "ladder_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "ladder_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "ladder_http_requests_in_flight";
    pub const UPLOAD_BYTES: &str = "ladder_upload_bytes";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record the size of an accepted upload.
pub fn record_upload(bytes: u64) {
    histogram!(names::UPLOAD_BYTES).record(bytes as f64);
}

/// Collapse job ids and artifact names so label cardinality stays bounded.
fn sanitize_path(path: &str) -> String {
    let mut segments = path.split('/').peekable();
    let mut out: Vec<&str> = Vec::new();

    while let Some(segment) = segments.next() {
        match segment {
            "hls" => {
                out.push("hls");
                if segments.next().is_some() {
                    out.push(":id");
                }
                if segments.peek().is_some() {
                    out.push(":file");
                }
                break;
            }
            s if JobId::is_well_formed(s) => out.push(":id"),
            s if s.strip_suffix(".zip").is_some_and(JobId::is_well_formed) => out.push(":id.zip"),
            s => out.push(s),
        }
    }

    out.join("/")
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);

    let response = next.run(request).await;

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &path, status, duration);

    response
}
