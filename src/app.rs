use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{middleware, routing::get, Router};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::AppConfig;
use crate::database::{self, DatabaseError, Session, Store};
use crate::error::ApiError;
use crate::handlers::{assets, gateways, root};

/// Shared by every handler. Holds no connection: sessions are opened per
/// request from `store`.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub expose_error_details: bool,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, expose_error_details: bool) -> Self {
        Self {
            store,
            expose_error_details,
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, DatabaseError> {
        let store = database::store_from_config(&config.database)?;
        Ok(Self::new(store, config.api.expose_error_details))
    }

    /// Open a session for the current request
    pub async fn open(&self) -> Result<Box<dyn Session>, ApiError> {
        self.store.open().await.map_err(|e| self.fail(e))
    }

    pub fn fail(&self, err: DatabaseError) -> ApiError {
        ApiError::from_database(err, self.expose_error_details)
    }
}

pub fn app(state: AppState, config: &AppConfig) -> Router {
    let router = Router::new()
        // Public
        .route("/", get(root::home))
        .route("/health", get(root::health))
        .merge(asset_routes())
        .merge(gateway_routes())
        .fallback(root::not_found)
        .layer(middleware::map_response(method_not_allowed_body))
        .with_state(state);

    let router = if config.security.enable_cors {
        router.layer(CorsLayer::permissive())
    } else {
        router
    };

    if config.api.enable_request_logging {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Give the router's bare 405 the same `{"message"}` body as every other error
async fn method_not_allowed_body(response: Response) -> Response {
    if response.status() != StatusCode::METHOD_NOT_ALLOWED {
        return response;
    }
    let allow = response.headers().get(header::ALLOW).cloned();
    let mut rendered = ApiError::method_not_allowed("Method Not Allowed").into_response();
    if let Some(allow) = allow {
        rendered.headers_mut().insert(header::ALLOW, allow);
    }
    rendered
}

fn asset_routes() -> Router<AppState> {
    Router::new()
        .route("/api/assets", get(assets::list).post(assets::create))
        .route(
            "/api/assets/:asset_id",
            get(assets::show).put(assets::update).delete(assets::delete),
        )
        .route("/api/asset-types", get(assets::types))
        .route("/api/asset-statuses", get(assets::statuses))
}

fn gateway_routes() -> Router<AppState> {
    Router::new()
        .route("/api/gateways", get(gateways::list).post(gateways::create))
        .route(
            "/api/gateways/:gateway_id",
            get(gateways::show).put(gateways::update).delete(gateways::delete),
        )
        .route("/api/gateway-statuses", get(gateways::statuses))
        .route("/api/gateway-connections", get(gateways::connections))
}
