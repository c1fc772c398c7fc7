use anyhow::Context;
use serde_json::json;

use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::database;

pub async fn init_db(config: &AppConfig, output_format: &OutputFormat) -> anyhow::Result<()> {
    let store = database::store_from_config(&config.database)?;
    store
        .ensure_schema()
        .await
        .context("failed to create tables")?;

    output_success(
        output_format,
        &format!("Schema '{}' ready with tables assets and gateways", config.database.schema),
        Some(json!({ "schema": config.database.schema })),
    )
}

pub async fn ping(config: &AppConfig, output_format: &OutputFormat) -> anyhow::Result<()> {
    let store = database::store_from_config(&config.database)?;
    let started = std::time::Instant::now();
    let session = store.open().await.context("failed to connect")?;
    session.close().await.context("failed to close connection")?;
    let elapsed_ms = started.elapsed().as_millis() as u64;

    output_success(
        output_format,
        &format!("Database reachable ({} ms)", elapsed_ms),
        Some(json!({ "backend": config.database.backend, "elapsed_ms": elapsed_ms })),
    )
}
