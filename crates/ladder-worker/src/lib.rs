//! Rendition ladder worker.
//!
//! This crate provides:
//! - Rendition planning from a catalog and caller extras
//! - An in-memory job registry with monotonic status transitions
//! - Admission control for concurrent jobs
//! - Concurrent HLS encode orchestration with deadlines and cancellation
//! - Zip packaging of finished jobs

pub mod admission;
pub mod config;
pub mod encoder;
pub mod error;
pub mod executor;
pub mod logging;
pub mod metrics;
pub mod orchestrator;
pub mod packager;
pub mod planner;
pub mod prober;
pub mod registry;

#[cfg(test)]
pub(crate) mod test_support;

pub use admission::{AdmissionController, AdmissionPermit};
pub use config::{AdmissionPolicy, WorkerConfig};
pub use encoder::{EncodeRequest, EncodedRendition, Encoder, FfmpegHlsEncoder};
pub use error::{WorkerError, WorkerResult};
pub use executor::JobExecutor;
pub use logging::JobLogger;
pub use orchestrator::{EncodeOrchestrator, OrchestratorSettings};
pub use packager::{Packager, ZipPackager};
pub use planner::RenditionPlanner;
pub use prober::{FfprobeProber, Prober, SourceInfo};
pub use registry::JobRegistry;
