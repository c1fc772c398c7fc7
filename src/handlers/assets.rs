// handlers/assets.rs - asset configuration endpoints

use axum::extract::{rejection::JsonRejection, Path, State};
use axum::Json;
use serde_json::Value;

use crate::app::AppState;
use crate::database::models::{NewAsset, ASSET, ASSET_STATUSES, ASSET_TYPES};
use crate::database::Record;
use crate::middleware::{ApiResult, Message};
use crate::services::{resource_service, Listing};

/// GET /api/assets - every registered asset
pub async fn list(State(state): State<AppState>) -> ApiResult<Listing> {
    resource_service::list(&state, &ASSET).await
}

/// POST /api/assets - register a new asset
pub async fn create(
    State(state): State<AppState>,
    payload: Result<Json<NewAsset>, JsonRejection>,
) -> ApiResult<Message> {
    let Json(asset) = payload?;
    resource_service::create(&state, asset).await
}

/// GET /api/assets/:asset_id
pub async fn show(State(state): State<AppState>, Path(asset_id): Path<String>) -> ApiResult<Record> {
    resource_service::show(&state, &ASSET, &asset_id).await
}

/// PUT /api/assets/:asset_id - partial update of mutable fields
pub async fn update(
    State(state): State<AppState>,
    Path(asset_id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Message> {
    let Json(body) = payload?;
    resource_service::update(&state, &ASSET, &asset_id, body).await
}

/// DELETE /api/assets/:asset_id
pub async fn delete(State(state): State<AppState>, Path(asset_id): Path<String>) -> ApiResult<Message> {
    resource_service::delete(&state, &ASSET, &asset_id).await
}

/// GET /api/asset-types
pub async fn types(State(state): State<AppState>) -> ApiResult<Listing> {
    resource_service::project(&state, &ASSET_TYPES).await
}

/// GET /api/asset-statuses
pub async fn statuses(State(state): State<AppState>) -> ApiResult<Listing> {
    resource_service::project(&state, &ASSET_STATUSES).await
}
