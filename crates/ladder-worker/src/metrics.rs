//! Job and encode metrics.
//!
//! Recorded through the `metrics` facade; the API binary installs the
//! Prometheus recorder.

use metrics::{counter, histogram};

use ladder_models::JobStatus;

/// Metric names as constants for consistency.
pub mod names {
    pub const JOBS_ADMITTED_TOTAL: &str = "ladder_jobs_admitted_total";
    pub const JOBS_REJECTED_TOTAL: &str = "ladder_jobs_rejected_total";
    pub const JOBS_FINISHED_TOTAL: &str = "ladder_jobs_finished_total";

    pub const RENDITIONS_TOTAL: &str = "ladder_renditions_total";
    pub const ENCODE_DURATION_SECONDS: &str = "ladder_encode_duration_seconds";

    pub const ARCHIVE_BYTES: &str = "ladder_archive_bytes";
    pub const PACKAGING_FAILURES_TOTAL: &str = "ladder_packaging_failures_total";
}

pub fn record_job_admitted() {
    counter!(names::JOBS_ADMITTED_TOTAL).increment(1);
}

pub fn record_job_rejected() {
    counter!(names::JOBS_REJECTED_TOTAL).increment(1);
}

/// Record a job reaching a terminal status.
pub fn record_job_finished(status: JobStatus) {
    let labels = [("status", status.as_str().to_string())];
    counter!(names::JOBS_FINISHED_TOTAL, &labels).increment(1);
}

/// Record one rendition encode.
pub fn record_rendition(label: &str, succeeded: bool, duration_secs: f64) {
    let labels = [
        ("label", label.to_string()),
        ("outcome", if succeeded { "succeeded" } else { "failed" }.to_string()),
    ];
    counter!(names::RENDITIONS_TOTAL, &labels).increment(1);
    histogram!(names::ENCODE_DURATION_SECONDS, &labels).record(duration_secs);
}

pub fn record_archive(bytes: u64) {
    histogram!(names::ARCHIVE_BYTES).record(bytes as f64);
}

pub fn record_packaging_failure() {
    counter!(names::PACKAGING_FAILURES_TOTAL).increment(1);
}
