// src/lib.rs
// Public library surface shared by both binaries and the integration tests.

pub mod aggregate;
pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod model;
pub mod telemetry;
pub mod upstream;

// ---- Re-exports for stable public API ----
pub use crate::api::{router, AppState};
pub use crate::config::ServiceConfig;
pub use crate::engine::{BerriesOutput, ScoringContext};
pub use crate::error::BerriesError;

use axum::Router;

/// Build the full application from config: loads both models, wires the HTTP
/// upstreams, and mounts `/metrics` when a recorder handle is supplied.
/// Fails if either model artifact cannot be loaded.
pub fn app(
    cfg: &ServiceConfig,
    metrics: Option<&crate::metrics::Metrics>,
) -> anyhow::Result<Router> {
    let scoring = ScoringContext::from_config(cfg)?;
    let mut router = api::router(AppState::new(scoring));
    if let Some(m) = metrics {
        router = router.merge(m.router());
    }
    Ok(router)
}
