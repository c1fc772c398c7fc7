use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{Connection, PgConnection, Postgres, Row};
use std::time::Duration;
use tracing::{debug, info};

use super::models::{ASSET, GATEWAY};
use super::query_builder::QueryBuilder;
use super::record::{ChangeSet, Record};
use super::resource::Resource;
use super::store::{timestamp_value, DatabaseError, Session, Store};
use crate::config::DatabaseConfig;

/// SQLSTATE for unique_violation
const UNIQUE_VIOLATION: &str = "23505";

/// PostgreSQL-backed store. Every `open` dials a new connection; nothing
/// is pooled or reused between requests.
pub struct PgStore {
    url: String,
    builder: QueryBuilder,
    connect_timeout: Duration,
}

impl PgStore {
    pub fn from_config(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        Ok(Self {
            url: connection_url(config)?,
            builder: QueryBuilder::new(config.schema.clone())?,
            connect_timeout: Duration::from_secs(config.connection_timeout.max(1)),
        })
    }

    async fn connect(&self) -> Result<PgSession, DatabaseError> {
        let conn = match tokio::time::timeout(self.connect_timeout, PgConnection::connect(&self.url)).await {
            Ok(Ok(conn)) => conn,
            Ok(Err(e)) => return Err(DatabaseError::Connection(e.to_string())),
            Err(_) => {
                return Err(DatabaseError::Connection(format!(
                    "timed out after {}s",
                    self.connect_timeout.as_secs()
                )))
            }
        };
        info!("Connection Successful to PostgreSQL DB");
        Ok(PgSession {
            conn,
            builder: self.builder.clone(),
        })
    }
}

#[async_trait]
impl Store for PgStore {
    async fn open(&self) -> Result<Box<dyn Session>, DatabaseError> {
        Ok(Box::new(self.connect().await?))
    }

    async fn ensure_schema(&self) -> Result<(), DatabaseError> {
        let mut session = self.connect().await?;
        let mut statements = vec![session.builder.create_schema()];
        for resource in [&ASSET, &GATEWAY] {
            statements.push(session.builder.create_table(resource));
        }

        let mut outcome = Ok(());
        for sql in &statements {
            if let Err(e) = session.execute(sql, &[]).await {
                outcome = Err(e);
                break;
            }
        }
        Box::new(session).close().await?;
        outcome?;

        info!("Schema ready");
        Ok(())
    }
}

/// Build the connection string from `DATABASE_URL` or from its parts
pub fn connection_url(config: &DatabaseConfig) -> Result<String, DatabaseError> {
    if let Some(raw) = &config.url {
        let url = url::Url::parse(raw).map_err(|_| DatabaseError::InvalidDatabaseUrl)?;
        return Ok(url.to_string());
    }

    if config.host.trim().is_empty() {
        return Err(DatabaseError::ConfigMissing("DATABASE_HOST"));
    }
    if config.name.trim().is_empty() {
        return Err(DatabaseError::ConfigMissing("DATABASE_NAME"));
    }

    let mut url = url::Url::parse("postgres://localhost").map_err(|_| DatabaseError::InvalidDatabaseUrl)?;
    url.set_host(Some(config.host.as_str()))
        .map_err(|_| DatabaseError::InvalidDatabaseUrl)?;
    url.set_port(Some(config.port))
        .map_err(|_| DatabaseError::InvalidDatabaseUrl)?;
    url.set_username(&config.user)
        .map_err(|_| DatabaseError::InvalidDatabaseUrl)?;
    url.set_password(config.password.as_deref())
        .map_err(|_| DatabaseError::InvalidDatabaseUrl)?;
    url.set_path(&format!("/{}", config.name));
    Ok(url.to_string())
}

/// Bound statement parameter
#[derive(Debug, Clone, Copy)]
pub enum Param<'a> {
    Text(&'a str),
    Timestamp(DateTime<Utc>),
}

/// One PostgreSQL connection, opened per request and closed by the caller
pub struct PgSession {
    conn: PgConnection,
    builder: QueryBuilder,
}

impl PgSession {
    /// Run a read statement and return every row
    pub async fn query_many(&mut self, sql: &str, params: &[Param<'_>]) -> Result<Vec<PgRow>, DatabaseError> {
        debug!(%sql, "query_many");
        bind_all(sqlx::query(sql), params)
            .fetch_all(&mut self.conn)
            .await
            .map_err(query_error)
    }

    /// Run a read statement and return its first row, if any
    pub async fn query_one(&mut self, sql: &str, params: &[Param<'_>]) -> Result<Option<PgRow>, DatabaseError> {
        debug!(%sql, "query_one");
        bind_all(sqlx::query(sql), params)
            .fetch_optional(&mut self.conn)
            .await
            .map_err(query_error)
    }

    /// Run a write statement; it commits immediately
    pub async fn execute(&mut self, sql: &str, params: &[Param<'_>]) -> Result<u64, DatabaseError> {
        debug!(%sql, "execute");
        bind_all(sqlx::query(sql), params)
            .execute(&mut self.conn)
            .await
            .map(|done| done.rows_affected())
            .map_err(query_error)
    }
}

#[async_trait]
impl Session for PgSession {
    async fn fetch_all(&mut self, resource: &Resource, columns: &[&str]) -> Result<Vec<Record>, DatabaseError> {
        let sql = self.builder.select_all(resource, columns);
        let rows = self.query_many(&sql, &[]).await?;
        rows.iter().map(|row| decode_row(row, resource, columns)).collect()
    }

    async fn fetch_one(
        &mut self,
        resource: &Resource,
        columns: &[&str],
        id: &str,
    ) -> Result<Option<Record>, DatabaseError> {
        let sql = self.builder.select_by_id(resource, columns);
        match self.query_one(&sql, &[Param::Text(id)]).await? {
            Some(row) => Ok(Some(decode_row(&row, resource, columns)?)),
            None => Ok(None),
        }
    }

    async fn exists(&mut self, resource: &Resource, id: &str) -> Result<bool, DatabaseError> {
        let sql = self.builder.exists(resource);
        Ok(self.query_one(&sql, &[Param::Text(id)]).await?.is_some())
    }

    async fn insert(
        &mut self,
        resource: &Resource,
        values: Vec<String>,
        registered_at: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        if values.len() != resource.columns.len() {
            return Err(DatabaseError::Query(format!(
                "expected {} values for {}, got {}",
                resource.columns.len(),
                resource.table,
                values.len()
            )));
        }
        let sql = self.builder.insert(resource);
        let mut params: Vec<Param<'_>> = values.iter().map(|v| Param::Text(v)).collect();
        params.push(Param::Timestamp(registered_at));
        self.execute(&sql, &params).await?;
        Ok(())
    }

    async fn update(&mut self, resource: &Resource, id: &str, changes: &ChangeSet) -> Result<u64, DatabaseError> {
        let sql = self.builder.update(resource, changes)?;
        let mut params: Vec<Param<'_>> = changes
            .assignments()
            .iter()
            .map(|(_, value)| Param::Text(value))
            .collect();
        params.push(Param::Text(id));
        self.execute(&sql, &params).await
    }

    async fn delete(&mut self, resource: &Resource, id: &str) -> Result<u64, DatabaseError> {
        let sql = self.builder.delete(resource);
        self.execute(&sql, &[Param::Text(id)]).await
    }

    async fn close(self: Box<Self>) -> Result<(), DatabaseError> {
        self.conn
            .close()
            .await
            .map_err(|e| DatabaseError::Connection(format!("close failed: {}", e)))?;
        info!("Connection Closed to PostgreSQL");
        Ok(())
    }
}

fn bind_all<'q>(
    mut q: Query<'q, Postgres, PgArguments>,
    params: &[Param<'q>],
) -> Query<'q, Postgres, PgArguments> {
    for param in params {
        q = match *param {
            Param::Text(s) => q.bind(s),
            Param::Timestamp(at) => q.bind(at),
        };
    }
    q
}

fn query_error(err: sqlx::Error) -> DatabaseError {
    if let sqlx::Error::Database(db) = &err {
        if db.code().as_deref() == Some(UNIQUE_VIOLATION) {
            return DatabaseError::UniqueViolation(db.message().to_string());
        }
    }
    DatabaseError::Query(err.to_string())
}

/// Map a row to a record keyed by `columns`. Registration time decodes
/// as a timestamp, everything else as text.
fn decode_row(row: &PgRow, resource: &Resource, columns: &[&str]) -> Result<Record, DatabaseError> {
    let mut record = Record::new();
    for (i, column) in columns.iter().enumerate() {
        let value = if *column == resource.registration_column {
            row.try_get::<Option<DateTime<Utc>>, _>(i)?
                .map(timestamp_value)
                .unwrap_or(Value::Null)
        } else {
            row.try_get::<Option<String>, _>(i)?
                .map(Value::String)
                .unwrap_or(Value::Null)
        };
        record.insert(column.to_string(), value);
    }
    Ok(record)
}
