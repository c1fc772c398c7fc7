#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::{json, Value};
use tokio::task::JoinHandle;

use geofence_config_api::config::AppConfig;
use geofence_config_api::database::{MemoryStore, Store};
use geofence_config_api::{app, AppState};

/// In-process API server on a free port. Aborted when dropped.
pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    pub client: reqwest::Client,
    handle: JoinHandle<()>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            if let Ok(resp) = self.client.get(self.url("/health")).send().await {
                if resp.status() == StatusCode::OK || resp.status() == StatusCode::SERVICE_UNAVAILABLE {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Server backed by a fresh in-memory store
pub async fn spawn_server() -> Result<(TestServer, MemoryStore)> {
    let store = MemoryStore::new();
    let server = spawn_with_store(Arc::new(store.clone())).await?;
    Ok((server, store))
}

pub async fn spawn_with_store(store: Arc<dyn Store>) -> Result<TestServer> {
    let config = AppConfig::from_lookup(|key| match key {
        "DATABASE_BACKEND" => Some("memory".to_string()),
        "API_ENABLE_REQUEST_LOGGING" => Some("false".to_string()),
        _ => None,
    });
    let router = app(AppState::new(store, true), &config);

    let port = portpicker::pick_unused_port().context("failed to pick free port")?;
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
        .await
        .context("failed to bind test listener")?;
    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });

    let server = TestServer {
        port,
        base_url: format!("http://127.0.0.1:{}", port),
        client: reqwest::Client::new(),
        handle,
    };
    server.wait_ready(Duration::from_secs(10)).await?;
    Ok(server)
}

pub fn sample_asset(id: &str) -> Value {
    json!({
        "asset_id": id,
        "asset_type": "sensor",
        "asset_name": "n",
        "asset_description": "d",
        "asset_location": "loc",
        "asset_status": "active",
        "asset_tags": "t1"
    })
}

pub fn sample_gateway(id: &str) -> Value {
    json!({
        "gateway_id": id,
        "gateway_name": "lobby anchor",
        "gateway_description": "ceiling mounted",
        "gateway_location": "floor 1",
        "gateway_coverage_area": "20m radius",
        "gateway_connectivity_info": "wifi",
        "gateway_status": "online",
        "gateway_firmware_version": "1.4.2",
        "gateway_power_source": "poe",
        "gateway_config_params": "{\"scan_interval\": 5}"
    })
}

pub async fn message_of(resp: reqwest::Response) -> Result<String> {
    let body = resp.json::<Value>().await?;
    body.get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
        .with_context(|| format!("missing message field: {}", body))
}
