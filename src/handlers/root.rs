// handlers/root.rs - public endpoints outside /api

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::error::ApiError;

pub async fn home() -> Json<Value> {
    Json(json!({ "Message from Author": "This is Indoor Geofence System" }))
}

/// Paths no route matches
pub async fn not_found() -> ApiError {
    ApiError::not_found("Not Found")
}

/// Opens and closes one connection to prove the store is reachable
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    let probe = match state.store.open().await {
        Ok(session) => session.close().await,
        Err(e) => Err(e),
    };

    match probe {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "timestamp": now,
                "database": "ok"
            })),
        ),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "degraded",
                    "timestamp": now,
                    "message": "database unavailable"
                })),
            )
        }
    }
}
