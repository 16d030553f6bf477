//! Axum HTTP API for the rendition ladder service.
//!
//! This crate provides:
//! - Upload intake and job submission
//! - Status polling and cancellation
//! - HLS artifact serving and archive download
//! - Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
