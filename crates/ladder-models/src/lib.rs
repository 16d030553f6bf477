//! Shared data models for the rendition ladder service.
//!
//! This crate provides Serde-serializable types for:
//! - Rendition specs and the quality ladder catalog
//! - Conversion jobs and their lifecycle
//! - Per-rendition outcomes and error kinds

pub mod catalog;
pub mod error;
pub mod job;
pub mod outcome;
pub mod rendition;

// Re-export common types
pub use catalog::RenditionCatalog;
pub use error::{ErrorKind, JobError, ModelError, ModelResult};
pub use job::{Job, JobId, JobStatus, StatusChange};
pub use outcome::{OutcomeStatus, RenditionOutcome};
pub use rendition::{RenditionRequest, RenditionSpec, Resolution};
