//! Prometheus metric definitions for the pipeline.

use std::sync::Arc;

use prometheus::{Counter, Histogram, Registry, register_counter_with_registry, register_histogram_with_registry};

#[derive(Debug, Clone)]
pub struct Metrics {
    pub fills_triggered: Counter,
    pub fill_errors: Counter,
    pub puzzles_created: Counter,
    pub groups_generated: Counter,
    pub groups_saved: Counter,
    pub verification_failures: Counter,
    pub fill_duration: Histogram,
    pub llm_call_duration: Histogram,
    pub catalog_call_duration: Histogram,
}

impl Metrics {
    #[allow(clippy::too_many_lines)]
    pub fn new(registry: Arc<Registry>) -> Result<Self, prometheus::Error> {
        Ok(Self {
            fills_triggered: register_counter_with_registry!(
                "puzzle_fills_triggered_total",
                "Total number of FillWindow invocations",
                registry
            )?,
            fill_errors: register_counter_with_registry!(
                "puzzle_fill_errors_total",
                "Total number of per-date errors recorded across fill runs",
                registry
            )?,
            puzzles_created: register_counter_with_registry!(
                "puzzle_puzzles_created_total",
                "Total number of puzzles published",
                registry
            )?,
            groups_generated: register_counter_with_registry!(
                "puzzle_groups_generated_total",
                "Total number of candidate groups returned by the LLM",
                registry
            )?,
            groups_saved: register_counter_with_registry!(
                "puzzle_groups_saved_total",
                "Total number of groups persisted after verification",
                registry
            )?,
            verification_failures: register_counter_with_registry!(
                "puzzle_verification_failures_total",
                "Total number of candidate groups dropped for failed verification",
                registry
            )?,
            fill_duration: register_histogram_with_registry!(
                "puzzle_fill_duration_seconds",
                "Wall-clock duration of a FillWindow run",
                registry
            )?,
            llm_call_duration: register_histogram_with_registry!(
                "puzzle_llm_call_duration_seconds",
                "Wall-clock duration of a single LLM generation call",
                registry
            )?,
            catalog_call_duration: register_histogram_with_registry!(
                "puzzle_catalog_call_duration_seconds",
                "Wall-clock duration of a single external catalog search",
                registry
            )?,
        })
    }
}
