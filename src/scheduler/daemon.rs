//! Spawns the background task that runs `FillWindow` for every enabled
//! genre once a day at a fixed UTC trigger time.

use std::sync::Arc;

use chrono::{FixedOffset, Utc};
use tokio::{task::JoinHandle, time::sleep};
use tracing::{error, info};

use crate::llm::EnvCredentialSource;
use crate::scheduler::{Scheduler, cadence::DailyCadence};

const BATCH_HOUR: u32 = 4;
const BATCH_MINUTE: u32 = 0;

pub fn spawn_daily_batch_daemon(scheduler: Scheduler, llm_api_key: Option<String>) -> JoinHandle<()> {
    let tz = FixedOffset::east_opt(0).expect("valid UTC offset");
    let cadence = DailyCadence::new(tz, BATCH_HOUR, BATCH_MINUTE);
    BatchDaemon { scheduler, cadence, llm_api_key: Arc::new(llm_api_key) }.spawn()
}

struct BatchDaemon {
    scheduler: Scheduler,
    cadence: DailyCadence,
    llm_api_key: Arc<Option<String>>,
}

impl BatchDaemon {
    fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move { self.run().await })
    }

    async fn run(self) {
        let shutdown = self.scheduler.shutdown_token();
        loop {
            let now = Utc::now();
            let next = self.cadence.next_run_from(now);
            let wait = duration_until(next, now);
            info!(next_run = %next.to_rfc3339(), wait_seconds = wait.as_secs(), "scheduled daily fill batch");

            tokio::select! {
                () = sleep(wait) => {}
                () = shutdown.cancelled() => {
                    info!("scheduler shutting down before next scheduled run");
                    return;
                }
            }

            let credentials: Arc<dyn crate::llm::LlmCredentialSource> =
                Arc::new(EnvCredentialSource::new((*self.llm_api_key).clone()));
            match self.scheduler.fill_all_enabled(credentials).await {
                Ok(results) => {
                    for (genre, outcome) in results {
                        match outcome {
                            Ok(result) => info!(genre = %genre, puzzles_created = result.puzzles_created, "daily fill completed"),
                            Err(err) => error!(genre = %genre, error = %err, "daily fill failed"),
                        }
                    }
                }
                Err(err) => error!(error = %err, "failed to list enabled pipeline configs"),
            }
        }
    }
}

fn duration_until(next: chrono::DateTime<Utc>, now: chrono::DateTime<Utc>) -> std::time::Duration {
    (next - now).to_std().unwrap_or(std::time::Duration::from_secs(0))
}
