mod api;
mod bot;
mod config;
mod db;
mod engine;
mod error;
mod feed;
mod notify;
mod types;

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::api::{router, ApiState, HealthState, ScanLatency};
use crate::bot::CommandListener;
use crate::config::Config;
use crate::db::{SqliteStore, StateStore};
use crate::engine::{system_clock, ScanCoordinator, SpikeScanner};
use crate::error::Result;
use crate::feed::{FeedSource, OpinionClient};
use crate::notify::{Formatter, NotificationSink, Notifier, TelegramClient};

#[tokio::main]
async fn main() {
    let env_file = config::load_env_file();
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    match env_file {
        Ok(Some(path)) => info!("Loaded environment from {}", path.display()),
        Ok(None) => debug!("No .env file found; using process environment"),
        Err(e) => warn!("Failed to load .env file: {e}"),
    }

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
    info!("Bot stopped");
}

async fn run(cfg: Config) -> Result<()> {
    // --- Storage ---
    let sqlite = SqliteStore::open(&cfg.db_path).await?;
    let store: Arc<dyn StateStore> = Arc::new(sqlite.clone());

    // --- Outbound clients ---
    let feed: Arc<dyn FeedSource> = Arc::new(OpinionClient::new(&cfg)?);
    let telegram = Arc::new(TelegramClient::new(&cfg.telegram_api_url, &cfg.bot_token)?);
    let sink: Arc<dyn NotificationSink> = telegram.clone();

    if cfg.channel_id.is_none() {
        warn!("CHANNEL_ID not set; notifications go to subscribers only");
    }
    let notifier = Arc::new(Notifier::new(
        sink,
        cfg.channel_id.clone(),
        Formatter::new(cfg.app_url.clone()),
    ));

    let clock = system_clock();
    let health = Arc::new(HealthState::new());
    let latency = Arc::new(ScanLatency::new());

    // --- Engine ---
    let scanner = Arc::new(SpikeScanner::new(
        Arc::clone(&feed),
        Arc::clone(&store),
        Arc::clone(&notifier),
        cfg.spike_threshold_pct,
        Duration::from_millis(cfg.scan_pacing_ms),
        clock.clone(),
    ));
    let coordinator = ScanCoordinator::new(
        feed,
        Arc::clone(&store),
        notifier,
        scanner,
        Duration::from_secs(cfg.poll_interval_secs),
        clock.clone(),
        Arc::clone(&health),
        Arc::clone(&latency),
    );
    info!(
        threshold_pct = cfg.spike_threshold_pct,
        pacing_ms = cfg.scan_pacing_ms,
        "Spike scanner configured",
    );
    tokio::spawn(coordinator.run());

    // --- Subscriber commands ---
    let listener = CommandListener::new(telegram, store, clock);
    tokio::spawn(listener.run());

    // --- HTTP API server ---
    let app = router(ApiState { store: sqlite, health, latency });
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let tcp = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(tcp, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}
