use anyhow::Result;
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

mod api;
mod config;
mod db;
mod live_scores;
mod notifier;

use api::AppState;
use config::Config;
use db::Database;
use live_scores::{start_sync_scheduler, HttpScoreProvider, MatchUpdater, ScoreProvider};
use notifier::BroadcastNotifier;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise tracing / logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    config.validate()?;

    // Open database
    let db = Database::open(&config.database_path)?;
    info!("Database opened: {}", config.database_path);

    if config.cricket_api_key.is_none() {
        warn!("CRICKET_API_KEY not set – live cricket matches will fail to update");
    }

    let provider: Arc<dyn ScoreProvider> =
        Arc::new(HttpScoreProvider::new(config.provider_settings())?);
    info!("Score provider: {}", provider.name());

    let notifier = Arc::new(BroadcastNotifier::new(config.notifier_capacity));
    let updater = Arc::new(MatchUpdater::new(
        provider,
        Arc::new(db.clone()),
        notifier.clone(),
        config.provider_timeout(),
    ));

    let scheduler = start_sync_scheduler(updater.clone(), config.sync_settings()?);

    let app = api::router(AppState {
        db,
        updater,
        notifier,
    });
    let addr: SocketAddr = config.listen_addr.parse()?;
    info!("API listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Run the API server until ctrl-c
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown requested");
        })
        .await?;

    scheduler.shutdown();
    Ok(())
}
