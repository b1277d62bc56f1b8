//! shipment-hub service binary.
//!
//! Loads configuration, connects and migrates the tracking database,
//! registers the configured couriers and serves the REST API until
//! Ctrl-C.

use anyhow::Context;
use shipment_hub::api::rest::{AppState, create_router};
use shipment_hub::config::{AppConfig, LogFormat, LoggingConfig};
use shipment_hub::infrastructure::persistence::postgres::PostgresTrackingStore;
use shipment_hub::{ShipmentAggregationService, TrackingService};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("failed to load configuration")?;
    init_tracing(&config.logging);

    let store = PostgresTrackingStore::connect(
        &config.database.url,
        config.database.max_connections,
    )
    .await
    .context("failed to connect to tracking database")?;
    store
        .run_migrations()
        .await
        .context("failed to run migrations")?;

    let registry = config
        .courier_registry()
        .context("failed to build courier registry")?;
    if registry.is_empty() {
        tracing::warn!("No couriers registered");
    }

    let tracking = TrackingService::new(Arc::new(store))
        .with_policy(config.tracking_event_policy);
    let service = ShipmentAggregationService::new(Arc::new(registry), tracking)
        .with_config(config.aggregation_config());

    let app = create_router(Arc::new(AppState::new(Arc::new(service))));

    let listener = tokio::net::TcpListener::bind(&config.server_address)
        .await
        .with_context(|| format!("failed to bind {}", config.server_address))?;
    tracing::info!(address = %config.server_address, "http server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("http server stopped");
    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_new(&logging.level).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);
    match logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Compact => builder.compact().init(),
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
