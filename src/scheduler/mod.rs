//! Schedules the recurring `FillWindow` batch and exposes the same
//! orchestration to the manual/interactive HTTP entry points.

pub(crate) mod cadence;
pub mod daemon;

use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use tokio_util::sync::CancellationToken;

use crate::llm::LlmCredentialSource;
use crate::observability::Telemetry;
use crate::pipeline::{PipelineFillResult, PipelineService, StageSink};
use crate::store::dao::traits::PipelineConfigStore;
use crate::store::models::Genre;

#[derive(Clone)]
pub struct Scheduler {
    service: Arc<PipelineService>,
    config_store: Arc<dyn PipelineConfigStore>,
    telemetry: Telemetry,
    shutdown: CancellationToken,
}

impl Scheduler {
    pub fn new(service: Arc<PipelineService>, config_store: Arc<dyn PipelineConfigStore>, telemetry: Telemetry) -> Self {
        Self {
            service,
            config_store,
            telemetry,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn trigger_shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Runs `FillWindow` for a single genre — used by both the cron/manual
    /// batch entry point and the interactive "Fill Now" stage-streaming one.
    pub async fn fill_genre(
        &self,
        genre: &Genre,
        credentials: &dyn LlmCredentialSource,
        manual: bool,
        stage_sink: Option<&StageSink>,
    ) -> Result<PipelineFillResult> {
        let config = self.config_store.get(genre).await?;
        self.telemetry.record_fill_invocation(genre.as_str(), manual);
        let today = Utc::now().date_naive();
        let result = self
            .service
            .fill_window(genre, &config, today, credentials, &self.shutdown, stage_sink)
            .await?;
        self.telemetry.record_fill_result(genre.as_str(), &result);
        Ok(result)
    }

    /// Runs `FillWindow` for every enabled genre, one task per genre (spec
    /// §5: "each genre's pipeline is independent and runs in its own task").
    pub async fn fill_all_enabled(
        &self,
        credentials: Arc<dyn LlmCredentialSource>,
    ) -> Result<Vec<(Genre, Result<PipelineFillResult>)>> {
        let enabled = self.config_store.list_enabled().await?;
        let mut handles = Vec::with_capacity(enabled.len());
        for (genre, _config) in enabled {
            let scheduler = self.clone();
            let credentials = Arc::clone(&credentials);
            handles.push(tokio::spawn(async move {
                let outcome = scheduler.fill_genre(&genre, credentials.as_ref(), false, None).await;
                (genre, outcome)
            }));
        }

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            results.push(handle.await.map_err(|err| anyhow::anyhow!(err))?);
        }
        Ok(results)
    }
}
