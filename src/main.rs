mod api;
mod config;
mod db;
mod engine;
mod error;
mod export;
mod notify;
mod poller;
mod sim;
mod state;
mod types;

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::api::health::HealthState;
use crate::api::latency::CycleLatency;
use crate::api::routes::{router, ApiState};
use crate::config::{Config, CHANNEL_CAPACITY, NOTIFICATION_FEED_LEN};
use crate::db::open_cache_store;
use crate::engine::Engine;
use crate::error::{AppError, Result};
use crate::notify::{NotificationDispatcher, NotificationFeed};
use crate::poller::PollingHub;
use crate::sim::{RandomSource, SeededSource, SystemClock};
use crate::state::EventCatalog;

#[tokio::main]
async fn main() {
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

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    // --- Database setup ---
    let (store, pool) = open_cache_store(&format!("sqlite:{}?mode=rwc", cfg.db_path)).await;
    info!("Dashboard cache backend: {} ({})", store.backend(), cfg.db_path);

    // --- Simulation engine ---
    let catalog = EventCatalog::new();
    if catalog.is_empty() {
        return Err(AppError::Config("event catalog is empty".to_string()));
    }
    match cfg.sim_seed {
        Some(seed) => info!("Simulation seeded with {seed}: runs are reproducible"),
        None => info!("Simulation seeded from entropy"),
    }
    let engine = Arc::new(Engine::new(
        Arc::clone(&catalog),
        store,
        Arc::new(SeededSource::new(cfg.sim_seed)),
        Arc::new(SystemClock),
    ));
    info!(
        "Engine ready: {} events (board every {}s, dashboard every {}s, simulated latency {}-{}ms)",
        catalog.len(),
        cfg.event_poll_secs,
        cfg.dashboard_poll_secs,
        cfg.sim_latency_min_ms,
        cfg.sim_latency_max_ms,
    );

    // Simulated network delay draws from its own stream.
    let latency_rng: Arc<dyn RandomSource> =
        Arc::new(SeededSource::new(cfg.sim_seed.map(|s| s.wrapping_add(1))));

    // --- Shared observability state ---
    let health = Arc::new(HealthState::new());
    let latency = Arc::new(CycleLatency::new());

    // --- Channels ---
    let (notify_tx, notify_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // --- Spawn tasks ---

    // Notification dispatcher
    let feed = NotificationFeed::new(NOTIFICATION_FEED_LEN);
    let dispatcher = NotificationDispatcher::new(notify_rx, Arc::clone(&feed), Arc::clone(&health));
    tokio::spawn(async move { dispatcher.run().await });

    // Polling hub (board every EVENT_POLL_SECS, dashboard every DASHBOARD_POLL_SECS)
    let (hub, subscriptions) = PollingHub::new(
        Arc::clone(&engine),
        notify_tx.clone(),
        Arc::clone(&health),
        Arc::clone(&latency),
        Duration::from_secs(cfg.event_poll_secs),
        Duration::from_secs(cfg.dashboard_poll_secs),
    );
    let metrics_tx = hub.metrics_publisher();
    let hub_handle = tokio::spawn(async move { hub.run(shutdown_rx).await });

    // HTTP API server
    let api_state = ApiState {
        engine,
        subscriptions,
        feed,
        health,
        latency,
        notify_tx,
        metrics_tx,
        latency_rng,
        latency_min_ms: cfg.sim_latency_min_ms,
        latency_max_ms: cfg.sim_latency_max_ms,
    };
    let app = router(api_state);
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Stop the poll timers before the pool goes away.
    let _ = shutdown_tx.send(true);
    if let Err(e) = hub_handle.await {
        warn!("Polling hub ended abnormally: {e}");
    }
    if let Some(pool) = pool {
        pool.close().await;
    }
    info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for ctrl-c: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
