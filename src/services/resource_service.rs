use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::app::AppState;
use crate::database::models::NewRecord;
use crate::database::{ChangeSet, DatabaseError, Projection, Record, Resource, Session};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, Message};

/// Collection body: the rows, or a message when there are none
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Listing {
    Rows(Vec<Record>),
    Empty(Message),
}

/// Close a session, logging rather than surfacing a failure: the response
/// is already decided by the time this runs.
async fn release(session: Box<dyn Session>) {
    if let Err(e) = session.close().await {
        warn!("Failed to close database connection: {}", e);
    }
}

fn listing(rows: Vec<Record>, empty_message: String) -> ApiResponse<Listing> {
    if rows.is_empty() {
        ApiResponse::success(Listing::Empty(Message {
            message: empty_message,
        }))
    } else {
        ApiResponse::success(Listing::Rows(rows))
    }
}

/// `GET /api/<plural>`
pub async fn list(state: &AppState, resource: &'static Resource) -> ApiResult<Listing> {
    let columns = resource.full_row();
    let mut session = state.open().await?;
    let outcome = session.fetch_all(resource, &columns).await;
    release(session).await;

    let rows = outcome.map_err(|e| state.fail(e))?;
    debug!(table = resource.table, rows = rows.len(), "listed");
    Ok(listing(rows, resource.none_found_message()))
}

/// Two-column projection endpoints
pub async fn project(state: &AppState, projection: &'static Projection) -> ApiResult<Listing> {
    let columns = projection.columns();
    let mut session = state.open().await?;
    let outcome = session.fetch_all(projection.resource, &columns).await;
    release(session).await;

    let rows = outcome.map_err(|e| state.fail(e))?;
    debug!(table = projection.resource.table, column = projection.column, rows = rows.len(), "projected");
    Ok(listing(rows, projection.none_found_message()))
}

/// `POST /api/<plural>`
pub async fn create<R: NewRecord>(state: &AppState, record: R) -> ApiResult<Message> {
    let resource = R::resource();
    let id = record.id().to_string();

    let mut session = state.open().await?;
    let outcome = insert_new(&mut *session, resource, &id, record.into_values()).await;
    release(session).await;

    match outcome {
        Ok(true) => {
            info!(table = resource.table, %id, "registered");
            Ok(ApiResponse::created_message(resource.added_message()))
        }
        Ok(false) => Err(ApiError::bad_request(resource.already_exists_message())),
        Err(e) => Err(state.fail(e)),
    }
}

/// Existence check then insert. `Ok(false)` means the key is taken,
/// including when another request inserted it between the two statements.
async fn insert_new(
    session: &mut dyn Session,
    resource: &Resource,
    id: &str,
    values: Vec<String>,
) -> Result<bool, DatabaseError> {
    if session.exists(resource, id).await? {
        return Ok(false);
    }
    match session.insert(resource, values, Utc::now()).await {
        Ok(()) => Ok(true),
        Err(DatabaseError::UniqueViolation(detail)) => {
            warn!(table = resource.table, %id, "concurrent insert won: {}", detail);
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

/// `GET /api/<plural>/:id`
pub async fn show(state: &AppState, resource: &'static Resource, id: &str) -> ApiResult<Record> {
    let columns = resource.full_row();
    let mut session = state.open().await?;
    let outcome = session.fetch_one(resource, &columns, id).await;
    release(session).await;

    match outcome.map_err(|e| state.fail(e))? {
        Some(record) => Ok(ApiResponse::success(record)),
        None => Err(ApiError::not_found(resource.not_found_message())),
    }
}

/// `PUT /api/<plural>/:id`. The body is validated before a connection is
/// opened.
pub async fn update(state: &AppState, resource: &'static Resource, id: &str, body: Value) -> ApiResult<Message> {
    debug!(table = resource.table, %id, %body, "update request");
    let changes = ChangeSet::from_json(resource, body)?;

    let mut session = state.open().await?;
    let outcome = apply_update(&mut *session, resource, id, &changes).await;
    release(session).await;

    if outcome.map_err(|e| state.fail(e))? {
        info!(table = resource.table, %id, columns = changes.len(), "updated");
        Ok(ApiResponse::message(resource.updated_message()))
    } else {
        Err(ApiError::not_found(resource.not_found_message()))
    }
}

async fn apply_update(
    session: &mut dyn Session,
    resource: &Resource,
    id: &str,
    changes: &ChangeSet,
) -> Result<bool, DatabaseError> {
    if !session.exists(resource, id).await? {
        return Ok(false);
    }
    Ok(session.update(resource, id, changes).await? > 0)
}

/// `DELETE /api/<plural>/:id`
pub async fn delete(state: &AppState, resource: &'static Resource, id: &str) -> ApiResult<Message> {
    let mut session = state.open().await?;
    let outcome = apply_delete(&mut *session, resource, id).await;
    release(session).await;

    if outcome.map_err(|e| state.fail(e))? {
        info!(table = resource.table, %id, "deleted");
        Ok(ApiResponse::message(resource.deleted_message()))
    } else {
        Err(ApiError::not_found(resource.not_found_message()))
    }
}

async fn apply_delete(session: &mut dyn Session, resource: &Resource, id: &str) -> Result<bool, DatabaseError> {
    if !session.exists(resource, id).await? {
        return Ok(false);
    }
    Ok(session.delete(resource, id).await? > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{NewAsset, ASSET, ASSET_TYPES};
    use crate::database::{MemoryStore, Store};
    use async_trait::async_trait;
    use axum::http::StatusCode;
    use chrono::DateTime;
    use serde_json::json;
    use std::sync::Arc;

    fn state_with(store: MemoryStore) -> AppState {
        AppState::new(Arc::new(store), true)
    }

    fn asset(id: &str) -> NewAsset {
        NewAsset {
            asset_id: id.into(),
            asset_type: "sensor".into(),
            asset_name: "n".into(),
            asset_description: "d".into(),
            asset_location: "loc".into(),
            asset_status: "active".into(),
            asset_tags: "t1".into(),
        }
    }

    #[tokio::test]
    async fn every_request_closes_its_session() {
        let store = MemoryStore::new();
        let state = state_with(store.clone());

        create(&state, asset("A1")).await.unwrap();
        assert!(create(&state, asset("A1")).await.is_err());
        show(&state, &ASSET, "A1").await.unwrap();
        assert!(show(&state, &ASSET, "nope").await.is_err());
        list(&state, &ASSET).await.unwrap();

        assert_eq!(store.opened_sessions(), 5);
        assert_eq!(store.closed_sessions(), 5);
    }

    #[tokio::test]
    async fn invalid_update_never_opens_a_session() {
        let store = MemoryStore::new();
        let state = state_with(store.clone());

        let err = update(&state, &ASSET, "A1", json!({ "asset_id": "A2" }))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.message(), "Invalid key in request body");

        let err = update(&state, &ASSET, "A1", json!({})).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        assert_eq!(store.opened_sessions(), 0);
    }

    #[tokio::test]
    async fn empty_projection_reports_message() {
        let state = state_with(MemoryStore::new());
        let response = project(&state, &ASSET_TYPES).await.unwrap();
        let body = serde_json::to_value(&response.data).unwrap();
        assert_eq!(body, json!({ "message": "No asset types found" }));
    }

    /// Store whose existence check misses a row a concurrent request
    /// already inserted.
    struct RacingStore(MemoryStore);

    struct RacingSession(Box<dyn Session>);

    #[async_trait]
    impl Store for RacingStore {
        async fn open(&self) -> Result<Box<dyn Session>, DatabaseError> {
            Ok(Box::new(RacingSession(self.0.open().await?)))
        }

        async fn ensure_schema(&self) -> Result<(), DatabaseError> {
            Ok(())
        }
    }

    #[async_trait]
    impl Session for RacingSession {
        async fn fetch_all(&mut self, r: &Resource, c: &[&str]) -> Result<Vec<Record>, DatabaseError> {
            self.0.fetch_all(r, c).await
        }
        async fn fetch_one(&mut self, r: &Resource, c: &[&str], id: &str) -> Result<Option<Record>, DatabaseError> {
            self.0.fetch_one(r, c, id).await
        }
        async fn exists(&mut self, _: &Resource, _: &str) -> Result<bool, DatabaseError> {
            Ok(false)
        }
        async fn insert(&mut self, r: &Resource, v: Vec<String>, at: DateTime<Utc>) -> Result<(), DatabaseError> {
            self.0.insert(r, v, at).await
        }
        async fn update(&mut self, r: &Resource, id: &str, c: &ChangeSet) -> Result<u64, DatabaseError> {
            self.0.update(r, id, c).await
        }
        async fn delete(&mut self, r: &Resource, id: &str) -> Result<u64, DatabaseError> {
            self.0.delete(r, id).await
        }
        async fn close(self: Box<Self>) -> Result<(), DatabaseError> {
            self.0.close().await
        }
    }

    #[tokio::test]
    async fn lost_insert_race_is_reported_as_conflict() {
        let inner = MemoryStore::new();
        let state = AppState::new(Arc::new(RacingStore(inner.clone())), true);

        create(&state, asset("A1")).await.unwrap();
        let err = create(&state, asset("A1")).await.unwrap_err();
        assert_eq!(err, ApiError::bad_request("Asset already exists"));
    }

    /// Store whose listing query fails and whose connections fail to close
    struct FlakyStore(MemoryStore);

    struct FlakySession(Box<dyn Session>);

    #[async_trait]
    impl Store for FlakyStore {
        async fn open(&self) -> Result<Box<dyn Session>, DatabaseError> {
            Ok(Box::new(FlakySession(self.0.open().await?)))
        }

        async fn ensure_schema(&self) -> Result<(), DatabaseError> {
            Ok(())
        }
    }

    #[async_trait]
    impl Session for FlakySession {
        async fn fetch_all(&mut self, _: &Resource, _: &[&str]) -> Result<Vec<Record>, DatabaseError> {
            Err(DatabaseError::Query("relation \"assets\" does not exist".into()))
        }
        async fn fetch_one(&mut self, r: &Resource, c: &[&str], id: &str) -> Result<Option<Record>, DatabaseError> {
            self.0.fetch_one(r, c, id).await
        }
        async fn exists(&mut self, r: &Resource, id: &str) -> Result<bool, DatabaseError> {
            self.0.exists(r, id).await
        }
        async fn insert(&mut self, r: &Resource, v: Vec<String>, at: DateTime<Utc>) -> Result<(), DatabaseError> {
            self.0.insert(r, v, at).await
        }
        async fn update(&mut self, r: &Resource, id: &str, c: &ChangeSet) -> Result<u64, DatabaseError> {
            self.0.update(r, id, c).await
        }
        async fn delete(&mut self, r: &Resource, id: &str) -> Result<u64, DatabaseError> {
            self.0.delete(r, id).await
        }
        async fn close(self: Box<Self>) -> Result<(), DatabaseError> {
            self.0.close().await?;
            Err(DatabaseError::Connection("close failed: connection reset".into()))
        }
    }

    #[tokio::test]
    async fn failed_close_never_reaches_the_client() {
        let inner = MemoryStore::new();
        let state = AppState::new(Arc::new(FlakyStore(inner.clone())), true);

        let err = show(&state, &ASSET, "A1").await.unwrap_err();
        assert_eq!(err, ApiError::not_found("Asset details not found"));

        create(&state, asset("A1")).await.unwrap();
        let response = show(&state, &ASSET, "A1").await.unwrap();
        assert_eq!(response.data["asset_id"], json!("A1"));

        assert_eq!(inner.opened_sessions(), 3);
        assert_eq!(inner.closed_sessions(), 3);
    }

    #[tokio::test]
    async fn query_failure_after_open_is_a_500() {
        let inner = MemoryStore::new();
        let state = AppState::new(Arc::new(FlakyStore(inner.clone())), true);

        let err = list(&state, &ASSET).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            err.message(),
            "Internal Server Error: Some error occurred while executing query: relation \"assets\" does not exist"
        );
        assert_eq!(inner.closed_sessions(), 1);
    }

    /// Store that cannot be reached
    struct DownStore;

    #[async_trait]
    impl Store for DownStore {
        async fn open(&self) -> Result<Box<dyn Session>, DatabaseError> {
            Err(DatabaseError::Connection("connection refused".into()))
        }

        async fn ensure_schema(&self) -> Result<(), DatabaseError> {
            Err(DatabaseError::Connection("connection refused".into()))
        }
    }

    #[tokio::test]
    async fn unreachable_store_is_a_500() {
        let state = AppState::new(Arc::new(DownStore), true);
        let err = list(&state, &ASSET).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.message().starts_with("Internal Server Error: "));
        assert!(err.message().contains("connection refused"));

        let hidden = AppState::new(Arc::new(DownStore), false);
        let err = delete(&hidden, &ASSET, "A1").await.unwrap_err();
        assert_eq!(err.message(), "Internal Server Error");
    }
}
