use std::sync::Arc;

use ai_client::Claude;
use anyhow::Result;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use filing_api::{router, AppState};
use filing_common::Config;
use filing_monitor::extractor::ClaudeExtractor;
use filing_monitor::source::ClerkSource;
use filing_monitor::store::PgFilingStore;
use filing_monitor::{run_scheduler, Broadcaster, Monitor, RetryPolicy};

async fn wait_for_shutdown(mut rx: watch::Receiver<bool>) {
    let _ = rx.wait_for(|stop| *stop).await;
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("filing=info".parse()?))
        .init();

    let config = Config::from_env();
    config.log_redacted();

    let store = Arc::new(PgFilingStore::connect(&config.database_url).await?);
    store.migrate().await?;

    let broadcaster = Broadcaster::new();

    let claude = Claude::new(&config.anthropic_api_key, &config.extraction_model);
    let monitor = Monitor::new(
        Arc::new(ClerkSource::new(&config.disclosure_base_url)?),
        Arc::new(ClaudeExtractor::new(claude)),
        store.clone(),
        Arc::new(broadcaster.clone()),
    )
    .with_retry_policy(RetryPolicy::default().with_attempt_timeout(config.attempt_timeout));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Shutdown requested"),
            Err(e) => error!(error = %e, "Failed to listen for Ctrl-C, shutting down"),
        }
        let _ = shutdown_tx.send(true);
    });

    let scheduler = tokio::spawn(run_scheduler(
        monitor,
        config.check_interval,
        wait_for_shutdown(shutdown_rx.clone()),
    ));

    let state = Arc::new(AppState {
        store,
        broadcaster: broadcaster.clone(),
    });
    let app = router(state);

    let addr = format!("{}:{}", config.web_host, config.web_port);
    info!("Filing API starting on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            wait_for_shutdown(shutdown_rx).await;
            // Open event streams would otherwise hold the server open.
            let closed = broadcaster.close_all();
            info!(subscribers = closed, "Closed event streams");
        })
        .await?;

    if let Err(e) = scheduler.await {
        error!(error = %e, "Scheduler task panicked");
    }
    info!("Filing API stopped");

    Ok(())
}
