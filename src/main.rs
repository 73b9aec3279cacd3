//! Railway Video Surveillance Camserver
//!
//! Main entry point.

use railvss::{
    broadcast_hub::BroadcastHub,
    camera_registry::CameraRegistry,
    event_store::{EventStore, MySqlEventStore},
    event_trigger::EventSink,
    state::{AppConfig, AppState, SystemHealth},
    stream_orchestrator::StreamOrchestrator,
    web_api,
};
use sqlx::mysql::MySqlPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "railvss=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting railvss camserver v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = AppConfig::default();
    tracing::info!(
        database_url = %config.database_url,
        host = %config.host,
        port = config.port,
        tick_ms = config.tick.as_millis() as u64,
        "Configuration loaded"
    );

    // Create database pool
    let pool = MySqlPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(10))
        .connect(&config.database_url)
        .await?;

    tracing::info!("Database connected");

    // Initialize components
    let store: Arc<dyn EventStore> = Arc::new(MySqlEventStore::new(pool.clone()));
    let registry = Arc::new(CameraRegistry::new(config.capture_timeout));
    let hub = Arc::new(BroadcastHub::new());
    let sink = EventSink::new(store.clone(), hub.clone());
    let orchestrator = Arc::new(StreamOrchestrator::new(
        registry.clone(),
        hub.clone(),
        sink,
        config.tick,
    ));
    let system_health = Arc::new(RwLock::new(SystemHealth::default()));

    let state = AppState {
        pool,
        config,
        store,
        registry: registry.clone(),
        hub: hub.clone(),
        orchestrator: orchestrator.clone(),
        system_health: system_health.clone(),
    };

    // Start system health monitoring
    tokio::spawn(async move {
        use sysinfo::System;
        let mut sys = System::new_all();
        let mut interval = tokio::time::interval(Duration::from_secs(30));

        loop {
            interval.tick().await;
            sys.refresh_all();

            let cpu = {
                let cpus = sys.cpus();
                if cpus.is_empty() {
                    0.0
                } else {
                    cpus.iter().map(|c| c.cpu_usage()).sum::<f32>() / cpus.len() as f32
                }
            };
            let memory = if sys.total_memory() > 0 {
                (sys.used_memory() as f32 / sys.total_memory() as f32) * 100.0
            } else {
                0.0
            };

            let mut health = system_health.write().await;
            health.update(cpu, memory);
        }
    });

    // Start the fan-out loop
    orchestrator.start().await;
    tracing::info!("Stream orchestrator started");

    // Create router
    let app = web_api::create_router(state.clone())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = format!("{}:{}", state.config.host, state.config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Drain everything before exiting: stop the loop, stop every unit,
    // close every observer channel.
    orchestrator.stop().await;
    registry.teardown_all().await;
    hub.close_all().await;
    tracing::info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install shutdown signal handler");
        return;
    }
    tracing::info!("Shutdown requested");
}
