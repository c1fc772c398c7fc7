use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use thiserror::Error;

use super::record::{ChangeSet, Record};
use super::resource::Resource;

/// Errors from the data access layer
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Some error occurred while connecting to PostgreSQL: {0}")]
    Connection(String),

    #[error("Some error occurred while executing query: {0}")]
    Query(String),

    #[error("Duplicate key: {0}")]
    UniqueViolation(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Source of per-request sessions. Implementations must not share a
/// session between callers.
#[async_trait]
pub trait Store: Send + Sync {
    /// Open a fresh connection to the backing store
    async fn open(&self) -> Result<Box<dyn Session>, DatabaseError>;

    /// Create the schema and both tables when missing
    async fn ensure_schema(&self) -> Result<(), DatabaseError>;
}

/// One open connection. Every write commits on its own; nothing spans
/// two calls.
#[async_trait]
pub trait Session: Send {
    /// All rows, `columns` in the given order
    async fn fetch_all(
        &mut self,
        resource: &Resource,
        columns: &[&str],
    ) -> Result<Vec<Record>, DatabaseError>;

    /// The row with this primary key, or `None`
    async fn fetch_one(
        &mut self,
        resource: &Resource,
        columns: &[&str],
        id: &str,
    ) -> Result<Option<Record>, DatabaseError>;

    async fn exists(&mut self, resource: &Resource, id: &str) -> Result<bool, DatabaseError>;

    /// Insert `values` (declared column order) stamped with `registered_at`.
    /// A duplicate primary key fails with `UniqueViolation`.
    async fn insert(
        &mut self,
        resource: &Resource,
        values: Vec<String>,
        registered_at: DateTime<Utc>,
    ) -> Result<(), DatabaseError>;

    /// Returns the number of rows changed
    async fn update(
        &mut self,
        resource: &Resource,
        id: &str,
        changes: &ChangeSet,
    ) -> Result<u64, DatabaseError>;

    /// Returns the number of rows removed
    async fn delete(&mut self, resource: &Resource, id: &str) -> Result<u64, DatabaseError>;

    /// Release the connection. Safe to call after earlier failures.
    async fn close(self: Box<Self>) -> Result<(), DatabaseError>;
}

/// Wire format for registration timestamps
pub fn timestamp_value(at: DateTime<Utc>) -> Value {
    Value::String(at.to_rfc3339_opts(SecondsFormat::Micros, true))
}
