//! Thin HTTP adapters (spec §6): routing only, no business logic. Every
//! handler delegates straight to `AppState`'s `Scheduler`/`PipelineService`.

pub(crate) mod fill;
pub(crate) mod health;
pub(crate) mod metrics;
pub(crate) mod stream;

use axum::{
    Router,
    routing::{get, post},
};

use crate::app::AppState;

pub(crate) fn router(state: AppState) -> Router {
    Router::new()
        .route("/health/ready", get(health::ready))
        .route("/health/live", get(health::live))
        .route("/metrics", get(metrics::exporter))
        .route("/v1/fill", get(fill::run).post(fill::run))
        .route("/v1/genres/{genre}/fill-now", post(stream::fill_now))
        .with_state(state)
}
