// handlers/gateways.rs - anchor gateway configuration endpoints

use axum::extract::{rejection::JsonRejection, Path, State};
use axum::Json;
use serde_json::Value;

use crate::app::AppState;
use crate::database::models::{NewGateway, GATEWAY, GATEWAY_CONNECTIONS, GATEWAY_STATUSES};
use crate::database::Record;
use crate::middleware::{ApiResult, Message};
use crate::services::{resource_service, Listing};

pub async fn list(State(state): State<AppState>) -> ApiResult<Listing> {
    resource_service::list(&state, &GATEWAY).await
}

pub async fn create(
    State(state): State<AppState>,
    payload: Result<Json<NewGateway>, JsonRejection>,
) -> ApiResult<Message> {
    let Json(gateway) = payload?;
    resource_service::create(&state, gateway).await
}

pub async fn show(State(state): State<AppState>, Path(gateway_id): Path<String>) -> ApiResult<Record> {
    resource_service::show(&state, &GATEWAY, &gateway_id).await
}

pub async fn update(
    State(state): State<AppState>,
    Path(gateway_id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Message> {
    let Json(body) = payload?;
    resource_service::update(&state, &GATEWAY, &gateway_id, body).await
}

pub async fn delete(State(state): State<AppState>, Path(gateway_id): Path<String>) -> ApiResult<Message> {
    resource_service::delete(&state, &GATEWAY, &gateway_id).await
}

/// GET /api/gateway-statuses
pub async fn statuses(State(state): State<AppState>) -> ApiResult<Listing> {
    resource_service::project(&state, &GATEWAY_STATUSES).await
}

/// GET /api/gateway-connections - connectivity method per gateway
pub async fn connections(State(state): State<AppState>) -> ApiResult<Listing> {
    resource_service::project(&state, &GATEWAY_CONNECTIONS).await
}
