//! Telemetry facade: structured logging plus a Prometheus registry, bundled
//! behind one handle so `app.rs` only has to thread a single value around.

pub(crate) mod metrics;
pub(crate) mod tracing_init;

use std::sync::Arc;

use anyhow::Result;
use prometheus::{Encoder, Registry, TextEncoder};

use self::metrics::Metrics;

#[derive(Debug, Clone)]
pub struct Telemetry {
    metrics: Arc<Metrics>,
}

impl Telemetry {
    pub fn new() -> Result<Self> {
        tracing_init::init()?;
        let registry = Arc::new(Registry::new());
        let metrics = Arc::new(Metrics::new(Arc::clone(&registry))?);
        Ok(Self { metrics })
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn record_ready_probe(&self) {
        ::tracing::debug!("ready probe recorded");
    }

    pub fn record_live_probe(&self) {
        ::tracing::debug!("live probe recorded");
    }

    pub fn record_fill_invocation(&self, genre: &str, manual: bool) {
        self.metrics.fills_triggered.inc();
        ::tracing::info!(genre, manual, "fill window invoked");
    }

    pub fn record_fill_result(&self, genre: &str, result: &crate::pipeline::PipelineFillResult) {
        self.metrics.puzzles_created.inc_by(f64::from(result.puzzles_created));
        self.metrics.groups_generated.inc_by(f64::from(result.groups_generated));
        self.metrics.groups_saved.inc_by(f64::from(result.groups_saved));
        if !result.errors.is_empty() {
            self.metrics.fill_errors.inc_by(result.errors.len() as f64);
        }
        ::tracing::info!(
            genre,
            puzzles_created = result.puzzles_created,
            empty_days_remaining = result.empty_days_remaining,
            ai_generation_triggered = result.ai_generation_triggered,
            "fill window completed"
        );
    }

    pub fn render_prometheus(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = prometheus::gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer).ok();
        String::from_utf8(buffer).unwrap_or_default()
    }
}
