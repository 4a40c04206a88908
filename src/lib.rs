// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod aggregate;
pub mod api;
pub mod config;
pub mod error;
pub mod ingest;
pub mod metrics;
pub mod rank;
pub mod snapshot;

use std::sync::Arc;

// ---- Re-exports for stable public API ----
pub use crate::api::router;
pub use crate::ingest::types::Source;
pub use crate::ingest::Pipeline;
pub use crate::snapshot::Snapshot;

use crate::config::EvaluationConfig;
use crate::ingest::providers::HttpResolver;

/// Build the production router: sources are fetched over HTTP.
pub fn app(config: &EvaluationConfig) -> anyhow::Result<axum::Router> {
    config.validate()?;
    let resolver = HttpResolver::new()?;
    let pipeline = Pipeline::new(Arc::new(resolver), config.clone());
    Ok(api::router(pipeline))
}
