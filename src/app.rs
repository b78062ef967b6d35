//! Wires every component together behind one shared, cloneable handle.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use sqlx::postgres::PgPoolOptions;

use crate::{
    config::Config,
    llm::{HttpLlmProvider, LlmGroupGenerator},
    observability::Telemetry,
    pipeline::{PipelineGenerator, PipelineService},
    scheduler::Scheduler,
    store::dao::{
        ConnectionTypeStore, FeedbackStore, GroupStore, PipelineConfigStore, PuzzleStore,
        postgres::{PgConnectionTypeStore, PgFeedbackStore, PgGroupStore, PgPipelineConfigStore, PgPuzzleStore},
    },
    verify::{HttpCatalogClient, VerifierFactory},
    web,
};

#[derive(Clone)]
pub(crate) struct AppState {
    registry: Arc<ComponentRegistry>,
}

pub struct ComponentRegistry {
    config: Arc<Config>,
    telemetry: Telemetry,
    scheduler: Scheduler,
    service: Arc<PipelineService>,
    // Built here so the admin surface (out of this core's scope, spec §1)
    // can be wired against them without touching `ComponentRegistry::build`.
    #[allow(dead_code)]
    connection_types: Arc<dyn ConnectionTypeStore>,
    #[allow(dead_code)]
    pipeline_config: Arc<dyn PipelineConfigStore>,
    #[allow(dead_code)]
    feedback: Arc<dyn FeedbackStore>,
}

impl AppState {
    pub(crate) fn new(registry: ComponentRegistry) -> Self {
        Self { registry: Arc::new(registry) }
    }

    pub(crate) fn telemetry(&self) -> &Telemetry {
        &self.registry.telemetry
    }

    pub(crate) fn scheduler(&self) -> &Scheduler {
        &self.registry.scheduler
    }

    pub(crate) fn service(&self) -> &PipelineService {
        &self.registry.service
    }

    pub(crate) fn config(&self) -> &Config {
        &self.registry.config
    }
}

impl ComponentRegistry {
    /// Builds every dependency and wires them into the shared registry.
    ///
    /// # Errors
    /// Returns an error if telemetry or an HTTP client fails to initialize.
    pub async fn build(config: Config) -> Result<Self> {
        let config = Arc::new(config);
        let telemetry = Telemetry::new()?;

        let pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections())
            .min_connections(config.db_min_connections())
            .acquire_timeout(config.db_acquire_timeout())
            .idle_timeout(Some(config.db_idle_timeout()))
            .max_lifetime(Some(config.db_max_lifetime()))
            .test_before_acquire(true)
            .connect_lazy(config.database_url())
            .context("failed to configure database connection pool")?;

        let group_store: Arc<dyn GroupStore> = Arc::new(PgGroupStore::new(pool.clone()));
        let puzzle_store: Arc<dyn PuzzleStore> = Arc::new(PgPuzzleStore::new(pool.clone()));
        let feedback: Arc<dyn FeedbackStore> = Arc::new(PgFeedbackStore::new(pool.clone()));
        let connection_types: Arc<dyn ConnectionTypeStore> = Arc::new(PgConnectionTypeStore::new(pool.clone()));
        let default_config = crate::store::models::PipelineConfig {
            enabled: false,
            rolling_window_days: config.default_rolling_window_days(),
            min_groups_per_color: config.default_min_groups_per_color(),
            ai_generation_batch_size: config.default_ai_generation_batch_size(),
        };
        let pipeline_config: Arc<dyn PipelineConfigStore> =
            Arc::new(PgPipelineConfigStore::new(pool.clone(), default_config));

        let film_catalog = config
            .film_catalog_api_key()
            .map(|key| -> Result<_> {
                Ok(Arc::new(HttpCatalogClient::new(
                    config.film_catalog_base_url(),
                    key,
                    config.verifier_request_timeout(),
                )?) as Arc<dyn crate::verify::CatalogClient>)
            })
            .transpose()
            .context("failed to configure film catalog client")?;
        let music_catalog = config
            .music_catalog_api_key()
            .map(|key| -> Result<_> {
                Ok(Arc::new(HttpCatalogClient::new(
                    config.music_catalog_base_url(),
                    key,
                    config.verifier_request_timeout(),
                )?) as Arc<dyn crate::verify::CatalogClient>)
            })
            .transpose()
            .context("failed to configure music catalog client")?;
        let verifiers = Arc::new(VerifierFactory::new(film_catalog, music_catalog));

        let mut service = PipelineService::new(Arc::clone(&group_store), Arc::clone(&puzzle_store));
        if config.llm_api_key().is_some() {
            let provider = Arc::new(HttpLlmProvider::new(config.llm_base_url(), config.llm_request_timeout())?);
            let llm_generator = Arc::new(LlmGroupGenerator::new(provider));
            let generator = Arc::new(PipelineGenerator::new(
                llm_generator,
                Arc::clone(&verifiers),
                Arc::clone(&group_store),
                Arc::clone(&connection_types),
                Arc::clone(&feedback),
                config.feedback_exemplar_limit() as i64,
            ));
            service = service.with_llm(generator);
        }
        let service = Arc::new(service);

        let scheduler = Scheduler::new(Arc::clone(&service), Arc::clone(&pipeline_config), telemetry.clone());

        Ok(Self {
            config,
            telemetry,
            scheduler,
            service,
            connection_types,
            pipeline_config,
            feedback,
        })
    }

    #[must_use]
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    #[must_use]
    pub fn config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }
}

pub fn build_router(registry: ComponentRegistry) -> Router {
    let state = AppState::new(registry);
    web::router(state)
}
