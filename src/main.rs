use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use puzzle_pipeline::{
    app::{ComponentRegistry, build_router},
    config::Config,
    scheduler::daemon::spawn_daily_batch_daemon,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    std::panic::set_hook(Box::new(|panic_info| {
        let thread = std::thread::current();
        let thread_name = thread.name().unwrap_or("unnamed");
        let message = panic_info
            .payload()
            .downcast_ref::<&str>()
            .copied()
            .or_else(|| panic_info.payload().downcast_ref::<String>().map(String::as_str))
            .unwrap_or("unknown panic payload");

        if let Some(location) = panic_info.location() {
            error!(
                thread = thread_name,
                file = location.file(),
                line = location.line(),
                column = location.column(),
                message,
                "panic occurred"
            );
        } else {
            error!(thread = thread_name, message, "panic occurred without location information");
        }
    }));

    let config = Config::from_env().context("failed to load configuration")?;
    let bind_addr = config.http_bind();
    let llm_api_key = config.llm_api_key().map(str::to_string);

    let registry = ComponentRegistry::build(config)
        .await
        .context("failed to build component registry")?;
    let scheduler = registry.scheduler().clone();

    if llm_api_key.is_none() {
        warn!("no LLM API key configured; the daily batch will record InsufficientGroups for any deficient color");
    }
    let _batch_daemon = spawn_daily_batch_daemon(scheduler, llm_api_key);

    let router = build_router(registry);

    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind listener on {bind_addr}"))?;

    info!(%bind_addr, "listening");

    if let Err(error) = axum::serve(listener, router).await {
        warn!(error = %error, "server exited with error");
    }

    Ok(())
}
