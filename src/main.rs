use anyhow::Context;
use geofence_config_api::{app, config::AppConfig, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_* settings
    let _ = dotenvy::dotenv();
    geofence_config_api::init_tracing();

    let config = AppConfig::from_env();
    tracing::info!(
        "Starting Indoor Geofence API in {:?} mode ({:?} backend)",
        config.environment,
        config.database.backend
    );

    let state = AppState::from_config(&config).context("invalid database configuration")?;
    let router = app(state, &config);

    let bind_addr = format!("{}:{}", config.api.host, config.api.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Indoor Geofence API listening on http://{}", bind_addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
